use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::flows::states::BuyerField;

pub const MIN_NAME_CHARS: usize = 3;
pub const MIN_ADDRESS_CHARS: usize = 6;

/// Rejected buyer input. The customer is re-prompted and the funnel keeps its state.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FieldValidationError {
    #[error("{field:?} must have at least {min_chars} characters")]
    TooShort { field: BuyerField, min_chars: usize },
    #[error("email does not look like an address")]
    MalformedEmail,
    #[error("{0:?} must not be empty")]
    Empty(BuyerField),
}

impl FieldValidationError {
    pub fn field(&self) -> BuyerField {
        match self {
            Self::TooShort { field, .. } => *field,
            Self::MalformedEmail => BuyerField::Email,
            Self::Empty(field) => *field,
        }
    }
}

pub fn validate_field(field: BuyerField, input: &str) -> Result<String, FieldValidationError> {
    match field {
        BuyerField::Name => validate_name(input),
        BuyerField::Email => validate_email(input),
        BuyerField::Address => validate_address(input),
        BuyerField::City => validate_city(input),
    }
}

pub fn validate_name(input: &str) -> Result<String, FieldValidationError> {
    min_chars(BuyerField::Name, input, MIN_NAME_CHARS)
}

pub fn validate_email(input: &str) -> Result<String, FieldValidationError> {
    let trimmed = input.trim();
    if email_pattern().is_match(trimmed) {
        Ok(trimmed.to_owned())
    } else {
        Err(FieldValidationError::MalformedEmail)
    }
}

pub fn validate_address(input: &str) -> Result<String, FieldValidationError> {
    min_chars(BuyerField::Address, input, MIN_ADDRESS_CHARS)
}

pub fn validate_city(input: &str) -> Result<String, FieldValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(FieldValidationError::Empty(BuyerField::City));
    }
    Ok(trimmed.to_owned())
}

fn min_chars(
    field: BuyerField,
    input: &str,
    min_chars: usize,
) -> Result<String, FieldValidationError> {
    let trimmed = input.trim();
    if trimmed.chars().count() < min_chars {
        return Err(FieldValidationError::TooShort { field, min_chars });
    }
    Ok(trimmed.to_owned())
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid email regex"))
}
