//! Form field validation.
//!
//! Form bodies arrive as loose JSON, so validators take `serde_json::Value`
//! and report the first problem as `JbsError::Validation`.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::constants::{MESSAGE_MAX_CHARS, MESSAGE_MIN_CHARS};
use crate::error::{JbsError, JbsResult};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

pub struct Validators;

impl Validators {
    /// Present, not null, and not blank when it is a string.
    pub fn required(value: Option<&Value>, field: &str) -> JbsResult<()> {
        match value {
            None | Some(Value::Null) => Err(required_error(field)),
            Some(Value::String(s)) if s.trim().is_empty() => Err(required_error(field)),
            Some(_) => Ok(()),
        }
    }

    pub fn string<'a>(value: Option<&'a Value>, field: &str) -> JbsResult<&'a str> {
        value
            .and_then(Value::as_str)
            .ok_or_else(|| JbsError::Validation(format!("{field} must be a string")))
    }

    pub fn email(value: Option<&Value>) -> JbsResult<&str> {
        let email = Self::string(value, "Email")?;
        if EMAIL_RE.is_match(email.trim()) {
            Ok(email)
        } else {
            Err(JbsError::Validation("Invalid email address".into()))
        }
    }

    pub fn min_length(value: &str, min: usize, field: &str) -> JbsResult<()> {
        if value.trim().chars().count() < min {
            return Err(JbsError::Validation(format!(
                "{field} must be at least {min} characters"
            )));
        }
        Ok(())
    }

    pub fn max_length(value: &str, max: usize, field: &str) -> JbsResult<()> {
        if value.chars().count() > max {
            return Err(JbsError::Validation(format!(
                "{field} must be at most {max} characters"
            )));
        }
        Ok(())
    }

    /// A required, non-blank string field.
    pub fn required_string<'a>(value: Option<&'a Value>, field: &str) -> JbsResult<&'a str> {
        Self::required(value, field)?;
        Self::string(value, field)
    }

    /// An optional free-text message; blank counts as absent.
    pub fn optional_message(value: Option<&Value>) -> JbsResult<Option<String>> {
        match value {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(_) => {
                let message = Self::string(value, "Message")?;
                Self::message_bounds(message)?;
                Ok(Some(message.to_string()))
            }
        }
    }

    fn message_bounds(message: &str) -> JbsResult<()> {
        Self::min_length(message, MESSAGE_MIN_CHARS, "Message")?;
        Self::max_length(message, MESSAGE_MAX_CHARS, "Message")
    }

    pub fn validate_contact(body: &Value) -> JbsResult<ContactInput> {
        let first_name = Self::required_string(body.get("firstName"), "First Name")?;
        let last_name = Self::required_string(body.get("lastName"), "Last Name")?;
        Self::required(body.get("email"), "Email")?;
        let email = Self::email(body.get("email"))?;
        let message = Self::required_string(body.get("message"), "Message")?;
        Self::message_bounds(message)?;

        Ok(ContactInput {
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            email: email.trim().to_string(),
            message: message.to_string(),
        })
    }

    pub fn validate_booking(body: &Value) -> JbsResult<BookingInput> {
        let date = Self::required_string(body.get("date"), "Date")?;
        let time = Self::required_string(body.get("time"), "Time")?;
        let first_name = Self::required_string(body.get("firstName"), "First Name")?;
        let last_name = Self::required_string(body.get("lastName"), "Last Name")?;
        Self::required(body.get("email"), "Email")?;
        let email = Self::email(body.get("email"))?;
        let message = Self::optional_message(body.get("message"))?;

        let phone = body
            .get("phone")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        Ok(BookingInput {
            date: date.to_string(),
            time: time.to_string(),
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            email: email.trim().to_string(),
            phone,
            message,
        })
    }
}

fn required_error(field: &str) -> JbsError {
    JbsError::Validation(format!("{field} is required"))
}

/// A validated contact form submission.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub message: String,
}

/// A validated booking form submission.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingInput {
    pub date: String,
    pub time: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: Option<String>,
}
