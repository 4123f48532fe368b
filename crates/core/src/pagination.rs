//! Page/limit clamping for list endpoints.

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_LIMIT: i64 = 50;

/// Largest page a caller may request.
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Parse a raw query value, treating absent or non-numeric input as `None`.
pub fn parse_lenient(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
}

/// Clamp a requested page number to `>= 1` (default 1).
pub fn clamp_page(page: Option<i64>) -> i64 {
    page.unwrap_or(1).max(1)
}

/// Clamp a requested page size to `[1, MAX_PAGE_LIMIT]`.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).max(1).min(max)
}

/// Row offset for a 1-based page.
pub fn offset_for(page: i64, limit: i64) -> i64 {
    (page - 1).max(0) * limit
}

/// Number of pages needed to show `total` rows.
pub fn total_pages(total: i64, limit: i64) -> i64 {
    if limit <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_clamped_into_range() {
        assert_eq!(clamp_limit(Some(0), DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT), 1);
        assert_eq!(clamp_limit(Some(-5), DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT), 1);
        assert_eq!(clamp_limit(Some(101), DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT), 100);
        assert_eq!(clamp_limit(None, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT), 50);
    }

    #[test]
    fn page_floors_at_one() {
        assert_eq!(clamp_page(Some(0)), 1);
        assert_eq!(clamp_page(Some(-3)), 1);
        assert_eq!(clamp_page(None), 1);
        assert_eq!(clamp_page(Some(4)), 4);
    }

    #[test]
    fn lenient_parse_ignores_garbage() {
        assert_eq!(parse_lenient(Some("12")), Some(12));
        assert_eq!(parse_lenient(Some("abc")), None);
        assert_eq!(parse_lenient(None), None);
    }

    #[test]
    fn offsets_and_page_counts() {
        assert_eq!(offset_for(1, 50), 0);
        assert_eq!(offset_for(3, 20), 40);
        assert_eq!(total_pages(0, 50), 0);
        assert_eq!(total_pages(101, 50), 3);
        assert_eq!(total_pages(100, 50), 2);
    }
}
