//! Numeric and sign normalization for Brazilian-formatted currency cells.
//!
//! Cells look like `R$ 1.234,56`, `-10` or `(500,00)`: periods group thousands,
//! the comma is the decimal separator and parentheses mark accounting negatives.
//! Normalization never fails. A cell that does not parse keeps its raw text,
//! carries no numeric value, and still gets a sign.

use serde::{Deserialize, Serialize};

const CURRENCY_MARKERS: [&str; 2] = ["R$", "$"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedValue {
    /// The input, unchanged.
    pub raw_text: String,
    pub numeric_value: Option<f64>,
    pub is_negative_text: bool,
}

impl NormalizedValue {
    /// Parsed magnitude with the textual sign applied, so `(500,00)` yields `-500.0`.
    pub fn signed_value(&self) -> Option<f64> {
        self.numeric_value.map(|value| {
            if self.is_negative_text && value > 0.0 {
                -value
            } else {
                value
            }
        })
    }
}

pub fn normalize_value(raw: &str) -> NormalizedValue {
    let cleaned = clean_numeric_text(raw);
    let is_negative_text = cleaned.starts_with('-') || cleaned.starts_with('(');

    NormalizedValue {
        raw_text: raw.to_string(),
        numeric_value: parse_cleaned(&cleaned),
        is_negative_text,
    }
}

/// Strips currency markers and whitespace, drops thousands separators and
/// turns the decimal comma into a period.
pub fn clean_numeric_text(raw: &str) -> String {
    let mut text = raw.to_string();
    for marker in CURRENCY_MARKERS {
        text = text.replace(marker, "");
    }

    text.chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .map(|c| if c == ',' { '.' } else { c })
        .collect()
}

fn parse_cleaned(cleaned: &str) -> Option<f64> {
    let unwrapped: String = cleaned.chars().filter(|c| *c != '(' && *c != ')').collect();
    if unwrapped.is_empty() {
        return None;
    }

    // Non-finite values ("inf", "NaN") would not survive JSON serialization.
    unwrapped.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// True if the text contains at least one digit, period or comma.
pub fn looks_numeric(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit() || c == '.' || c == ',')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_with_thousands_and_decimal_comma() {
        let value = normalize_value("R$ 1.234,56");
        assert_eq!(value.numeric_value, Some(1234.56));
        assert!(!value.is_negative_text);
        assert_eq!(value.raw_text, "R$ 1.234,56");
    }

    #[test]
    fn test_accounting_parentheses_are_negative() {
        let value = normalize_value("(500,00)");
        assert!(value.is_negative_text);
        assert_eq!(value.numeric_value, Some(500.0));
        assert_eq!(value.signed_value(), Some(-500.0));
    }

    #[test]
    fn test_leading_minus() {
        let value = normalize_value("-10");
        assert!(value.is_negative_text);
        assert_eq!(value.numeric_value, Some(-10.0));
        assert_eq!(value.signed_value(), Some(-10.0));

        let value = normalize_value("R$ -2.500,00");
        assert!(value.is_negative_text);
        assert_eq!(value.numeric_value, Some(-2500.0));
    }

    #[test]
    fn test_unparseable_text_keeps_raw_and_sign() {
        let value = normalize_value("abc");
        assert_eq!(value.numeric_value, None);
        assert!(!value.is_negative_text);
        assert_eq!(value.raw_text, "abc");

        let value = normalize_value("-pendente");
        assert_eq!(value.numeric_value, None);
        assert!(value.is_negative_text);
    }

    #[test]
    fn test_empty_and_non_finite() {
        let value = normalize_value("   ");
        assert_eq!(value.numeric_value, None);
        assert!(!value.is_negative_text);

        assert_eq!(normalize_value("inf").numeric_value, None);
        assert_eq!(normalize_value("NaN").numeric_value, None);
    }

    #[test]
    fn test_non_breaking_space_is_ignored() {
        let value = normalize_value("R$\u{a0}12.345,00");
        assert_eq!(value.numeric_value, Some(12345.0));
    }

    #[test]
    fn test_looks_numeric() {
        assert!(looks_numeric("R$ 10"));
        assert!(looks_numeric(","));
        assert!(!looks_numeric("SETEMBRO"));
    }
}
