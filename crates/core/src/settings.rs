//! Helpers for reading optional credentials from the environment.

/// Template values shipped in `.env.example` files that must not be
/// mistaken for real credentials.
pub fn is_placeholder(value: &str) -> bool {
    let v = value.trim();
    v.is_empty()
        || v.starts_with("your-")
        || v.starts_with("your_")
        || v.eq_ignore_ascii_case("changeme")
}

/// Read an optional credential, treating blanks and placeholders as unset.
pub fn credential_from_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !is_placeholder(v))
        .map(|v| v.trim().to_string())
}

/// Read an optional value, falling back to `default` when unset or blank.
pub fn string_from_env(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Parse a value, falling back to `default` when unset or unparsable.
pub fn parsed_from_env<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_values_are_placeholders() {
        assert!(is_placeholder(""));
        assert!(is_placeholder("  "));
        assert!(is_placeholder("your-access-key-id"));
        assert!(is_placeholder("your_bucket"));
        assert!(is_placeholder("CHANGEME"));
        assert!(!is_placeholder("AKIAEXAMPLE"));
    }

    #[test]
    fn missing_variables_use_defaults() {
        assert_eq!(string_from_env("FEEDBACK_TEST_UNSET_STRING", "dflt"), "dflt");
        assert_eq!(parsed_from_env("FEEDBACK_TEST_UNSET_NUMBER", 42u16), 42);
        assert_eq!(credential_from_env("FEEDBACK_TEST_UNSET_SECRET"), None);
    }
}
