//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest team id accepted from clients.
const MAX_TEAM_ID_LEN: usize = 64;

/// Validates that a team id is non-blank, reasonably short and free of control characters.
///
/// # Examples
///
/// ```ignore
/// validate_team_id("team1") // Ok
/// validate_team_id("  ")    // Err - blank
/// ```
pub fn validate_team_id(id: &str) -> Result<(), ValidationError> {
    if id.trim().is_empty() {
        let mut err = ValidationError::new("team_id_blank");
        err.message = Some("Team ID must not be empty".into());
        return Err(err);
    }

    if id.len() > MAX_TEAM_ID_LEN {
        let mut err = ValidationError::new("team_id_length");
        err.message = Some(
            format!(
                "Team ID must be at most {MAX_TEAM_ID_LEN} characters (got {})",
                id.len()
            )
            .into(),
        );
        return Err(err);
    }

    if id.chars().any(char::is_control) {
        let mut err = ValidationError::new("team_id_format");
        err.message = Some("Team ID must not contain control characters".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_team_id_valid() {
        assert!(validate_team_id("team1").is_ok());
        assert!(validate_team_id("Red Arrows").is_ok());
    }

    #[test]
    fn test_validate_team_id_blank() {
        assert!(validate_team_id("").is_err());
        assert!(validate_team_id("   ").is_err());
    }

    #[test]
    fn test_validate_team_id_invalid_format() {
        assert!(validate_team_id(&"x".repeat(65)).is_err()); // too long
        assert!(validate_team_id("team\n1").is_err()); // newline
    }
}
