//! Validation helpers for DTOs.

use validator::ValidationError;

/// Minimum number of options a poll must offer.
pub const MIN_POLL_OPTIONS: usize = 2;

/// Validates that a text field contains something other than whitespace.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be empty".into());
        return Err(err);
    }

    Ok(())
}

/// Validates the option list of a poll: at least [`MIN_POLL_OPTIONS`] entries, none blank.
///
/// # Examples
///
/// ```ignore
/// validate_poll_options(&["Yes".into(), "No".into()]) // Ok
/// validate_poll_options(&["Yes".into()])              // Err - too few
/// validate_poll_options(&["Yes".into(), " ".into()])  // Err - blank entry
/// ```
pub fn validate_poll_options(options: &[String]) -> Result<(), ValidationError> {
    if options.len() < MIN_POLL_OPTIONS {
        let mut err = ValidationError::new("options_count");
        err.message = Some(
            format!(
                "a poll needs at least {MIN_POLL_OPTIONS} options (got {})",
                options.len()
            )
            .into(),
        );
        return Err(err);
    }

    if let Some(position) = options.iter().position(|text| text.trim().is_empty()) {
        let mut err = ValidationError::new("option_blank");
        err.message = Some(format!("option {position} must not be empty").into());
        return Err(err);
    }

    Ok(())
}

/// Validates that a poll duration is at least one second.
pub fn validate_duration(duration_secs: u64) -> Result<(), ValidationError> {
    if duration_secs == 0 {
        let mut err = ValidationError::new("duration_range");
        err.message = Some("duration must be at least one second".into());
        return Err(err);
    }

    Ok(())
}
