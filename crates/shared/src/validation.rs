//! Common validation utilities.

use validator::ValidationError;

/// Maximum accepted length of a push provider token.
///
/// FCM registration tokens are ~160 characters; anything far beyond that is garbage.
pub const MAX_PUSH_TOKEN_LENGTH: usize = 4096;

/// Validates that a string contains at least one non-whitespace character.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}

/// Validates a push provider token: non-blank, bounded length, no whitespace.
pub fn validate_push_token(token: &str) -> Result<(), ValidationError> {
    validate_not_blank(token)?;

    if token.len() > MAX_PUSH_TOKEN_LENGTH {
        let mut err = ValidationError::new("token_length");
        err.message = Some("Token is too long".into());
        return Err(err);
    }

    if token.chars().any(char::is_whitespace) {
        let mut err = ValidationError::new("token_whitespace");
        err.message = Some("Token must not contain whitespace".into());
        return Err(err);
    }

    Ok(())
}
