//! Per-field validation rules.
//!
//! A rule runs three stages on the sanitized input: a syntactic pattern, a
//! semantic check (only when the pattern passes), and a normalizing transform.
//! Every failing stage is reported; rules never stop at the first problem.

use chrono::NaiveDate;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use crate::error::ValidationError;
use crate::security::sanitize::{sanitize, sanitize_value};

static PRODUCT_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,50}$").unwrap());
static DATE_DD_MM_YYYY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]{2})/([0-9]{2})/([0-9]{4})$").unwrap());

pub const PRODUCT_CODE_FIELD: &str = "productCode";
pub const DATE_FIELD: &str = "date";

pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 2100;
pub const MAX_PRICE: f64 = 999_999_999.0;
pub const MIN_PERCENTAGE: f64 = -100.0;
pub const MAX_PERCENTAGE: f64 = 1000.0;

/// A normalized field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Number(_) => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(_) => None,
        }
    }
}

/// How a raw JSON value is turned into text before checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Only strings are accepted; anything else sanitizes to `""`.
    Text,
    /// JSON numbers are rendered as-is; strings are sanitized.
    Numeric,
}

impl InputKind {
    fn render(self, value: &Value) -> String {
        match (self, value) {
            (_, Value::Null) => String::new(),
            (InputKind::Text, v) => sanitize_value(v),
            (InputKind::Numeric, Value::Number(n)) => n.to_string(),
            (InputKind::Numeric, Value::String(s)) => sanitize(s),
            (InputKind::Numeric, v) => sanitize(&v.to_string()),
        }
    }
}

/// Returns the messages of every semantic failure.
pub type SemanticCheck = fn(&str) -> Vec<String>;
pub type Normalizer = fn(&str) -> FieldValue;

/// One field's validation contract.
#[derive(Clone)]
pub struct ValidationRule {
    /// Request field name (wire name).
    pub field: &'static str,
    /// Human-readable field label used in messages.
    pub label: &'static str,
    pub required: bool,
    pub input: InputKind,
    pub pattern: Option<&'static Regex>,
    pub semantic: SemanticCheck,
    pub normalize: Normalizer,
    /// Reported when the pattern does not match.
    pub message: &'static str,
}

impl std::fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationRule")
            .field("field", &self.field)
            .field("required", &self.required)
            .field("input", &self.input)
            .field("pattern", &self.pattern.map(Regex::as_str))
            .finish()
    }
}

impl ValidationRule {
    /// Apply this rule to a raw (possibly absent) value.
    ///
    /// Returns `Ok(None)` for an absent optional field.
    pub fn apply(&self, raw: Option<&Value>) -> Result<Option<FieldValue>, Vec<ValidationError>> {
        let text = raw.map(|v| self.input.render(v)).unwrap_or_default();

        if text.is_empty() {
            if self.required {
                let rejected = match raw {
                    Some(v) if !v.is_null() && !v.is_string() => v.to_string(),
                    _ => String::new(),
                };
                return Err(vec![ValidationError::new(
                    self.field,
                    format!("{} is required", self.label),
                    rejected,
                )]);
            }
            return Ok(None);
        }

        let messages = match self.pattern {
            Some(pattern) if !pattern.is_match(&text) => vec![self.message.to_string()],
            _ => (self.semantic)(&text),
        };

        if messages.is_empty() {
            Ok(Some((self.normalize)(&text)))
        } else {
            Err(messages
                .into_iter()
                .map(|m| ValidationError::new(self.field, m, text.clone()))
                .collect())
        }
    }

    /// Required product code: letters, digits, `-` and `_`, upper-cased.
    pub fn product_code() -> Self {
        Self {
            field: PRODUCT_CODE_FIELD,
            label: "Product code",
            required: true,
            input: InputKind::Text,
            pattern: Some(&*PRODUCT_CODE),
            semantic: no_semantic_check,
            normalize: |s| FieldValue::Text(s.to_uppercase()),
            message: "Product code must be 1-50 characters long and contain only letters, digits, '-' or '_'",
        }
    }

    /// Optional `DD/MM/YYYY` date that must exist on the calendar.
    pub fn date() -> Self {
        Self {
            field: DATE_FIELD,
            label: "Date",
            required: false,
            input: InputKind::Text,
            pattern: Some(&*DATE_DD_MM_YYYY),
            semantic: check_calendar_date,
            normalize: |s| FieldValue::Text(s.to_string()),
            message: "Date must use the DD/MM/YYYY format",
        }
    }

    /// Required price in `[0, 999999999]`, rounded to cents.
    pub fn price() -> Self {
        Self {
            field: "price",
            label: "Price",
            required: true,
            input: InputKind::Numeric,
            pattern: None,
            semantic: check_price,
            normalize: |s| FieldValue::Number(round2(parse_number(s).unwrap_or_default())),
            message: "Price must be a number",
        }
    }

    /// Optional percentage in `[-100, 1000]`, rounded to 2 decimals.
    pub fn percentage() -> Self {
        Self {
            field: "percentage",
            label: "Percentage",
            required: false,
            input: InputKind::Numeric,
            pattern: None,
            semantic: check_percentage,
            normalize: |s| FieldValue::Number(round2(parse_number(s).unwrap_or_default())),
            message: "Percentage must be a number",
        }
    }
}

fn no_semantic_check(_: &str) -> Vec<String> {
    Vec::new()
}

fn check_calendar_date(s: &str) -> Vec<String> {
    let Some(caps) = DATE_DD_MM_YYYY.captures(s) else {
        return vec!["Date must use the DD/MM/YYYY format".to_string()];
    };
    // The pattern guarantees ASCII digits of bounded width.
    let day: u32 = caps[1].parse().unwrap_or(0);
    let month: u32 = caps[2].parse().unwrap_or(0);
    let year: i32 = caps[3].parse().unwrap_or(0);

    let mut errors = Vec::new();
    if NaiveDate::from_ymd_opt(year, month, day).is_none() {
        errors.push(format!("Date '{}' is not a valid calendar date", s));
    }
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        errors.push(format!("Date year must be between {} and {}", MIN_YEAR, MAX_YEAR));
    }
    errors
}

fn check_price(s: &str) -> Vec<String> {
    check_range(s, "Price", 0.0, MAX_PRICE)
}

fn check_percentage(s: &str) -> Vec<String> {
    check_range(s, "Percentage", MIN_PERCENTAGE, MAX_PERCENTAGE)
}

fn check_range(s: &str, label: &str, min: f64, max: f64) -> Vec<String> {
    match parse_number(s) {
        None => vec![format!("{} must be a number", label)],
        Some(n) if n < min => vec![format!("{} must be at least {}", label, min)],
        Some(n) if n > max => vec![format!("{} must be at most {}", label, max)],
        Some(_) => Vec::new(),
    }
}

fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

fn round2(n: f64) -> f64 {
    (n * 100.0).round() / 100.0
}
