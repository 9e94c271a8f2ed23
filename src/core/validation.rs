//! Validation of user-supplied values, shared by the chat dialogue and
//! the web mini-app API.

use chrono::NaiveDate;
use thiserror::Error;

/// Maximum category name length, in characters
pub const MAX_CATEGORY_NAME_LEN: usize = 100;

/// Why an amount string from the chat was rejected
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountParseError {
    #[error("not a number")]
    NotANumber,
    #[error("amount is negative")]
    Negative,
    #[error("amount is not a finite number")]
    NotFinite,
}

/// Parses a decimal amount entered in chat.
///
/// Accepts standard decimal notation ("100", "1500.75"). Rejects text
/// that is not a number, negative values, and non-finite values
/// ("inf" and "NaN" parse as floats but make no sense as money).
/// Zero is allowed: a category may cost nothing this month.
///
/// # Examples
///
/// ```
/// use kopilka::core::validation::parse_amount;
///
/// assert_eq!(parse_amount("1500.75"), Ok(1500.75));
/// assert!(parse_amount("-5").is_err());
/// assert!(parse_amount("сто").is_err());
/// ```
pub fn parse_amount(text: &str) -> Result<f64, AmountParseError> {
    let value: f64 = text
        .trim()
        .parse()
        .map_err(|_| AmountParseError::NotANumber)?;
    if !value.is_finite() {
        return Err(AmountParseError::NotFinite);
    }
    if value < 0.0 {
        return Err(AmountParseError::Negative);
    }
    Ok(value)
}

/// Why a category name was rejected
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CategoryNameError {
    #[error("Category name must not be empty")]
    Empty,
    #[error("Category name must be at most {} characters", MAX_CATEGORY_NAME_LEN)]
    TooLong,
}

/// Checks a category name: 1–100 characters.
///
/// Length is counted in characters rather than bytes, so Cyrillic
/// names get the full hundred.
pub fn validate_category_name(name: &str) -> Result<(), CategoryNameError> {
    if name.is_empty() {
        return Err(CategoryNameError::Empty);
    }
    if name.chars().count() > MAX_CATEGORY_NAME_LEN {
        return Err(CategoryNameError::TooLong);
    }
    Ok(())
}

/// Why an expense amount was rejected by the API
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("Amount must be greater than 0")]
    NotPositive,
}

/// API-side amount check: expenses are strictly positive.
pub fn validate_expense_amount(amount: f64) -> Result<(), AmountError> {
    if amount > 0.0 {
        Ok(())
    } else {
        Err(AmountError::NotPositive)
    }
}

/// Why an expense date was rejected
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateParseError {
    #[error("Invalid expense_date, expected YYYY-MM-DD")]
    BadFormat,
}

/// Parses an expense date in ISO `YYYY-MM-DD` form.
pub fn parse_expense_date(raw: &str) -> Result<NaiveDate, DateParseError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| DateParseError::BadFormat)
}
