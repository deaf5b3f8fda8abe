//! Validation helpers for DTOs.

use validator::ValidationError;

/// Validates that a team number is one to five ASCII digits.
///
/// # Examples
///
/// ```ignore
/// validate_team_number("254")    // Ok
/// validate_team_number("12345")  // Ok
/// validate_team_number("123456") // Err - too long
/// validate_team_number("12a")    // Err - not a number
/// ```
pub fn validate_team_number(team_number: &str) -> Result<(), ValidationError> {
    if team_number.is_empty() || team_number.len() > 5 {
        let mut err = ValidationError::new("team_number_length");
        err.message = Some(
            format!(
                "Team number must be one to five digits (got {})",
                team_number.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !team_number.chars().all(|c| c.is_ascii_digit()) {
        let mut err = ValidationError::new("team_number_format");
        err.message = Some("Team number must contain only digits".into());
        return Err(err);
    }

    Ok(())
}

/// Validates every team number handed to a match start, requiring at least one.
pub fn validate_team_roster(team_numbers: &[String]) -> Result<(), ValidationError> {
    if team_numbers.is_empty() {
        let mut err = ValidationError::new("team_roster_empty");
        err.message = Some("At least one team number is required".into());
        return Err(err);
    }

    for team_number in team_numbers {
        validate_team_number(team_number)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_team_number_valid() {
        assert!(validate_team_number("1").is_ok());
        assert!(validate_team_number("254").is_ok());
        assert!(validate_team_number("00001").is_ok());
        assert!(validate_team_number("99999").is_ok());
    }

    #[test]
    fn test_validate_team_number_invalid_length() {
        assert!(validate_team_number("").is_err()); // empty
        assert!(validate_team_number("123456").is_err()); // too long
    }

    #[test]
    fn test_validate_team_number_invalid_format() {
        assert!(validate_team_number("12a").is_err()); // trailing letter
        assert!(validate_team_number("-254").is_err()); // sign
        assert!(validate_team_number("2 54").is_err()); // space
        assert!(validate_team_number("２５４").is_err()); // non-ascii digits
    }

    #[test]
    fn test_validate_team_roster() {
        assert!(validate_team_roster(&["100".into(), "200".into()]).is_ok());
        assert!(validate_team_roster(&[]).is_err());
        assert!(validate_team_roster(&["100".into(), "".into()]).is_err());
        assert!(validate_team_roster(&["100".into(), "team2".into()]).is_err());
    }
}
