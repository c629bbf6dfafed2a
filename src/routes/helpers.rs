//! Request shape validation shared by the roster handlers.

use crate::error::ApiError;
use crate::models::OneOrMany;
use crate::roster::mentions::is_valid_email;

/// Reject `value` unless it is a syntactically valid email address.
pub fn require_email(field: &str, value: &str) -> Result<(), ApiError> {
    if is_valid_email(value) {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "'{field}' must be a valid email address, got '{value}'"
        )))
    }
}

pub fn require_emails(field: &str, values: &[String]) -> Result<(), ApiError> {
    values
        .iter()
        .try_for_each(|value| require_email(field, value))
}

/// Collapse a scalar-or-array field to the single address it must hold.
pub fn single_email(field: &str, value: OneOrMany) -> Result<String, ApiError> {
    let email = match value {
        OneOrMany::One(email) => email,
        OneOrMany::Many(mut emails) if emails.len() == 1 => emails.remove(0),
        OneOrMany::Many(emails) => {
            return Err(ApiError::BadRequest(format!(
                "'{field}' must hold exactly one email address, got {}",
                emails.len()
            )));
        }
    };

    require_email(field, &email)?;
    Ok(email)
}
