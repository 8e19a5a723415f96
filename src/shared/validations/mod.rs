//! Validators shared by HTTP extractors.

use validator::ValidationError;

/// Longest pipeline, stage, job or agent identifier accepted.
pub const MAX_NAME_LENGTH: usize = 255;

/// Pipeline, stage and job names: ASCII letters, digits, `_`, `-` and `.`.
pub fn validate_name(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || value.len() > MAX_NAME_LENGTH {
        return Err(ValidationError::new("name_length")
            .with_message(format!("must be 1-{} characters", MAX_NAME_LENGTH).into()));
    }

    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(ValidationError::new("name_format")
            .with_message("may only contain letters, digits, '_', '-' and '.'".into()));
    }

    Ok(())
}
