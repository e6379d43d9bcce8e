use crate::error::EvalError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};

/// A value produced by evaluating an expression, or bound to a variable.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absence of a meaningful value
    Null,
    /// `true` or `false`
    Boolean(bool),
    /// Integer literals, and integer arithmetic which did not overflow
    Integer(i64),
    /// Floating point numbers
    Float(f64),
    /// Text, from string literals or variables
    String(String),
    /// Date and time, without time zone
    DateTime(NaiveDateTime),
}

/// Formats accepted when a string is used as a date.
const DATE_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// Parse `text` as a date, with or without a time part.
///
/// ```
/// # use expressive::parse_datetime;
/// assert!(parse_datetime("2024-02-29 12:30:00").is_some());
/// assert!(parse_datetime("2024-02-30").is_none());
/// ```
#[must_use]
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    for format in &DATE_TIME_FORMATS {
        if let Ok(date) = NaiveDateTime::parse_from_str(text, format) {
            return Some(date);
        }
    }
    for format in &DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|date| date.naive_utc())
}

impl Value {
    /// Name of the value type, as used in error messages
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::DateTime(_) => "date",
        }
    }

    /// Check if this is `Value::Null`
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Render the value for error messages: strings are quoted, other values
    /// are followed by their type.
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Null => "null".into(),
            Self::String(string) => format!("'{}'", string),
            other => format!("{} {}", other.type_name(), other),
        }
    }

    /// Convert to a float. Strings are parsed; booleans, dates and null are
    /// rejected.
    pub fn to_f64(&self) -> Result<f64, EvalError> {
        match self {
            Self::Integer(value) => Ok(*value as f64),
            Self::Float(value) => Ok(*value),
            Self::String(string) => string
                .trim()
                .parse()
                .map_err(|_| EvalError::coercion(self, "number")),
            _ => Err(EvalError::coercion(self, "number")),
        }
    }

    /// Convert to an integer. Floats are accepted only when they hold an
    /// integral value within the `i64` range.
    pub fn to_integer(&self) -> Result<i64, EvalError> {
        match self {
            Self::Integer(value) => Ok(*value),
            Self::Float(value) => float_to_integer(*value).ok_or_else(|| EvalError::coercion(self, "integer")),
            Self::String(string) => {
                let string = string.trim();
                if let Ok(value) = string.parse() {
                    return Ok(value);
                }
                string
                    .parse()
                    .ok()
                    .and_then(float_to_integer)
                    .ok_or_else(|| EvalError::coercion(self, "integer"))
            }
            _ => Err(EvalError::coercion(self, "integer")),
        }
    }

    /// Convert to a boolean. Only booleans and the strings `true`/`false`
    /// (in any case) are accepted.
    pub fn to_bool(&self) -> Result<bool, EvalError> {
        match self {
            Self::Boolean(value) => Ok(*value),
            Self::String(string) if string.trim().eq_ignore_ascii_case("true") => Ok(true),
            Self::String(string) if string.trim().eq_ignore_ascii_case("false") => Ok(false),
            _ => Err(EvalError::coercion(self, "boolean")),
        }
    }

    /// Convert to a date. Strings are parsed with [`parse_datetime`].
    pub fn to_datetime(&self) -> Result<NaiveDateTime, EvalError> {
        match self {
            Self::DateTime(date) => Ok(*date),
            Self::String(string) => {
                parse_datetime(string).ok_or_else(|| EvalError::coercion(self, "date"))
            }
            _ => Err(EvalError::coercion(self, "date")),
        }
    }

    /// Convert to a string. Every value except null has a textual form.
    pub fn to_text(&self) -> Result<String, EvalError> {
        match self {
            Self::Null => Err(EvalError::coercion(self, "string")),
            Self::String(string) => Ok(string.clone()),
            other => Ok(other.to_string()),
        }
    }

    /// Equality used by `=` and `!=`. Never fails: values of unrelated types
    /// are simply different, and `null` only equals `null`.
    #[must_use]
    pub fn loose_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Null, _) | (_, Self::Null) => false,
            (Self::Integer(lhs), Self::Integer(rhs)) => lhs == rhs,
            (Self::String(lhs), Self::String(rhs)) => lhs == rhs,
            (Self::Boolean(lhs), Self::Boolean(rhs)) => lhs == rhs,
            (Self::DateTime(lhs), Self::DateTime(rhs)) => lhs == rhs,
            (Self::DateTime(_), Self::String(_)) | (Self::String(_), Self::DateTime(_)) => {
                match (self.to_datetime(), other.to_datetime()) {
                    (Ok(lhs), Ok(rhs)) => lhs == rhs,
                    _ => false,
                }
            }
            (Self::Boolean(_), _) | (_, Self::Boolean(_)) => false,
            (Self::DateTime(_), _) | (_, Self::DateTime(_)) => false,
            _ => match (self.to_f64(), other.to_f64()) {
                (Ok(lhs), Ok(rhs)) => lhs == rhs,
                _ => false,
            },
        }
    }

    /// Ordering used by the relational operators.
    ///
    /// Returns `Ok(None)` when the values are of comparable types but
    /// unordered (a `NaN` is involved). Null operands must be handled by the
    /// caller.
    pub fn compare(&self, other: &Self, operator: &'static str) -> Result<Option<Ordering>, EvalError> {
        let mismatch = || EvalError::TypeMismatch {
            operator,
            lhs: self.type_name(),
            rhs: other.type_name(),
        };
        match (self, other) {
            (Self::Integer(lhs), Self::Integer(rhs)) => Ok(Some(lhs.cmp(rhs))),
            (Self::String(lhs), Self::String(rhs)) => Ok(Some(lhs.cmp(rhs))),
            (Self::Boolean(lhs), Self::Boolean(rhs)) => Ok(Some(lhs.cmp(rhs))),
            (Self::DateTime(lhs), Self::DateTime(rhs)) => Ok(Some(lhs.cmp(rhs))),
            (Self::DateTime(_), Self::String(_)) | (Self::String(_), Self::DateTime(_)) => {
                let lhs = self.to_datetime()?;
                let rhs = other.to_datetime()?;
                Ok(Some(lhs.cmp(&rhs)))
            }
            (Self::Integer(_) | Self::Float(_) | Self::String(_), Self::Integer(_) | Self::Float(_) | Self::String(_)) => {
                Ok(self.to_f64()?.partial_cmp(&other.to_f64()?))
            }
            _ => Err(mismatch()),
        }
    }
}

fn float_to_integer(value: f64) -> Option<i64> {
    // i64::MAX is not representable as f64, the bound is exclusive
    if value.fract() == 0.0 && value >= -9.223_372_036_854_776e18 && value < 9.223_372_036_854_776e18 {
        Some(value as i64)
    } else {
        None
    }
}

impl Display for Value {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        match self {
            Self::Null => write!(fmt, "null"),
            Self::Boolean(value) => write!(fmt, "{}", value),
            Self::Integer(value) => write!(fmt, "{}", value),
            Self::Float(value) => write!(fmt, "{}", value),
            Self::String(value) => write!(fmt, "{}", value),
            Self::DateTime(value) => write!(fmt, "{}", value.format("%Y-%m-%d %H:%M:%S%.f")),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        value.and_hms_opt(0, 0, 0).map_or(Self::Null, Self::DateTime)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
