/// Field validators shared by the request types
///
/// These plug into `validator`'s `custom(function = ...)` attribute and use
/// the same messages for the same problems everywhere.

use std::borrow::Cow;
use taskhub_shared::models::{category, task, user};
use validator::ValidationError;

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";
pub const NULL: &str = "This field may not be null.";

fn error(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Non-blank text of at most `max` characters
pub fn bounded_text(value: &str, max: usize) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(error("blank", BLANK));
    }
    if value.chars().count() > max {
        return Err(error(
            "max_length",
            format!("Ensure this field has no more than {} characters.", max),
        ));
    }
    Ok(())
}

pub fn validate_username(value: &str) -> Result<(), ValidationError> {
    bounded_text(value, user::USERNAME_MAX_LEN)?;
    if !user::is_valid_username(value) {
        return Err(error(
            "invalid_username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        ));
    }
    Ok(())
}

pub fn validate_bio(value: &str) -> Result<(), ValidationError> {
    if value.chars().count() > user::BIO_MAX_LEN {
        return Err(error(
            "max_length",
            format!(
                "Ensure this field has no more than {} characters.",
                user::BIO_MAX_LEN
            ),
        ));
    }
    Ok(())
}

pub fn validate_category_name(value: &str) -> Result<(), ValidationError> {
    bounded_text(value, category::NAME_MAX_LEN)
}

pub fn validate_title(value: &str) -> Result<(), ValidationError> {
    bounded_text(value, task::TITLE_MAX_LEN)
}
