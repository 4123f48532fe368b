//! Role names recognised by elevated endpoints.

pub const ROLE_ADMIN: &str = "ADMIN";
pub const ROLE_POWER_USER: &str = "POWER_USER";

/// Whether `role` grants access to power-user endpoints (case-insensitive).
pub fn is_power_user(role: Option<&str>) -> bool {
    role.map(str::trim)
        .is_some_and(|r| r.eq_ignore_ascii_case(ROLE_POWER_USER) || r.eq_ignore_ascii_case(ROLE_ADMIN))
}
