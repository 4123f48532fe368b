pub mod feedback;
pub mod logs;
pub mod screenshot;
pub mod uploads;

use feedback_core::types::DbId;

use crate::error::AppError;

/// Parse a positive integer path id, answering 400 otherwise.
pub(crate) fn parse_db_id(raw: &str, entity: &str) -> Result<DbId, AppError> {
    raw.trim()
        .parse::<DbId>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid {entity} ID: {raw}")))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parses_positive_ids_only() {
        assert_eq!(parse_db_id("42", "feedback").unwrap(), 42);
        assert_eq!(parse_db_id(" 7 ", "feedback").unwrap(), 7);
        assert_matches!(parse_db_id("0", "feedback"), Err(AppError::BadRequest(_)));
        assert_matches!(parse_db_id("-3", "feedback"), Err(AppError::BadRequest(_)));
        assert_matches!(parse_db_id("abc", "feedback"), Err(AppError::BadRequest(_)));
        assert_matches!(parse_db_id("1.5", "feedback"), Err(AppError::BadRequest(_)));
    }
}
