// src/coerce/mod.rs

pub mod date;

use crate::catalog::FieldKind;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use tracing::debug;

/// A coerced field value. Coercion is total: every raw string maps to a
/// value of the field's kind, falling back to the kind's empty value so
/// downstream arithmetic never observes an absent value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl Value {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Int(v) => serde_json::json!(v),
            Value::Float(v) => serde_json::json!(v),
            Value::Bool(v) => serde_json::json!(v),
            Value::Text(v) => serde_json::json!(v),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Tokens accepted as true, case-insensitive. Everything else is false.
static TRUTHY: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["true", "yes", "ja", "1", "x", "v", "waar", "j", "y", "t"]
        .into_iter()
        .collect()
});

/// Strip every non-digit character and parse base-10. Empty → 0.
pub fn coerce_integer(raw: &str) -> i64 {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return 0;
    }
    digits.parse().unwrap_or_else(|_| {
        debug!(raw, "integer out of range, defaulting to 0");
        0
    })
}

/// Like [`coerce_integer`] but a leading minus sign is preserved.
pub fn coerce_signed(raw: &str) -> i64 {
    let magnitude = coerce_integer(raw);
    if raw.trim_start().starts_with('-') {
        -magnitude
    } else {
        magnitude
    }
}

/// Locale decimal: `.` is a thousands separator, `,` the decimal point.
/// Falls back to 0 on failure.
pub fn coerce_decimal(raw: &str) -> f64 {
    let normalized = raw.trim().replace('.', "").replace(',', ".");
    if normalized.is_empty() {
        return 0.0;
    }
    normalized.parse().unwrap_or_else(|_| {
        debug!(raw, "unparseable decimal, defaulting to 0");
        0.0
    })
}

/// A `%`-suffixed value is divided by 100; anything else is already a
/// fraction and parses as a locale decimal.
pub fn coerce_percentage(raw: &str) -> f64 {
    let s = raw.trim();
    match s.strip_suffix('%') {
        Some(rest) => coerce_decimal(rest) / 100.0,
        None => coerce_decimal(s),
    }
}

pub fn coerce_boolean(raw: &str) -> bool {
    TRUTHY.contains(raw.trim().to_lowercase().as_str())
}

/// The empty value a field of `kind` coerces to when unmapped.
pub fn empty_value(kind: FieldKind) -> Value {
    match kind {
        FieldKind::Integer | FieldKind::SignedInteger => Value::Int(0),
        FieldKind::Decimal | FieldKind::Percentage => Value::Float(0.0),
        FieldKind::Boolean => Value::Bool(false),
        FieldKind::Text | FieldKind::Date => Value::Text(String::new()),
    }
}

/// Apply the fixed coercion rule for `kind` to a raw cell.
pub fn coerce(kind: FieldKind, raw: &str) -> Value {
    match kind {
        FieldKind::Text => Value::Text(raw.trim().to_string()),
        FieldKind::Integer => Value::Int(coerce_integer(raw)),
        FieldKind::SignedInteger => Value::Int(coerce_signed(raw)),
        FieldKind::Decimal => Value::Float(coerce_decimal(raw)),
        FieldKind::Percentage => Value::Float(coerce_percentage(raw)),
        FieldKind::Boolean => Value::Bool(coerce_boolean(raw)),
        FieldKind::Date => Value::Text(date::coerce_date(raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_strips_thousands_separator() {
        assert_eq!(coerce_integer("24.022"), 24022);
        assert_eq!(coerce_integer("1001"), 1001);
        assert_eq!(coerce_integer(""), 0);
        assert_eq!(coerce_integer("n/a"), 0);
    }

    #[test]
    fn signed_integer_preserves_leading_minus() {
        assert_eq!(coerce_signed("-1.234"), -1234);
        assert_eq!(coerce_signed("1.234"), 1234);
        assert_eq!(coerce_signed(" -42"), -42);
        assert_eq!(coerce_signed(""), 0);
    }

    #[test]
    fn decimal_uses_locale_separators() {
        assert_eq!(coerce_decimal("136.026"), 136026.0);
        assert_eq!(coerce_decimal("4,2"), 4.2);
        assert_eq!(coerce_decimal("1.234,5"), 1234.5);
        assert_eq!(coerce_decimal(""), 0.0);
        assert_eq!(coerce_decimal("abc"), 0.0);
    }

    #[test]
    fn percentage_only_divides_when_suffixed() {
        assert!((coerce_percentage("42%") - 0.42).abs() < 1e-12);
        assert!((coerce_percentage("4,2%") - 0.042).abs() < 1e-12);
        // No suffix: already a fraction.
        assert_eq!(coerce_percentage("4,2"), 4.2);
        assert_eq!(coerce_percentage(""), 0.0);
    }

    #[test]
    fn boolean_token_set() {
        for raw in ["ja", "X", "1", "waar", "TRUE", "y"] {
            assert!(coerce_boolean(raw), "{raw:?} should be true");
        }
        for raw in ["", "nee", "0", "false", "no"] {
            assert!(!coerce_boolean(raw), "{raw:?} should be false");
        }
    }

    #[test]
    fn empty_values_per_kind() {
        assert_eq!(empty_value(FieldKind::Integer), Value::Int(0));
        assert_eq!(empty_value(FieldKind::Decimal), Value::Float(0.0));
        assert_eq!(empty_value(FieldKind::Boolean), Value::Bool(false));
        assert_eq!(empty_value(FieldKind::Date), Value::Text(String::new()));
    }
}
