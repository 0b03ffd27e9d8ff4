//! Field classification and value normalization.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::dates::{is_null_like, normalize_date};

/// Closed set of field categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Date,
    Amount,
    Generic,
}

/// Keyword-based field classifier.
///
/// The value normalizer and the comparison engine both classify through
/// this type, so a field is never a date in one place and generic in the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldClassifier {
    date_keywords: Vec<String>,
    amount_keywords: Vec<String>,
}

impl Default for FieldClassifier {
    fn default() -> Self {
        Self::new(
            ["date", "received", "incident", "effective", "expiry", "birth", "dob"],
            ["amount", "premium", "limit", "deductible", "price", "cost"],
        )
    }
}

impl FieldClassifier {
    /// Build a classifier from keyword lists. Keywords are lowercased.
    pub fn new<D, A, S>(date_keywords: D, amount_keywords: A) -> Self
    where
        D: IntoIterator<Item = S>,
        A: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            date_keywords: lowercase_all(date_keywords),
            amount_keywords: lowercase_all(amount_keywords),
        }
    }

    pub fn date_keywords(&self) -> &[String] {
        &self.date_keywords
    }

    pub fn amount_keywords(&self) -> &[String] {
        &self.amount_keywords
    }

    /// Classify a field name by case-insensitive keyword containment.
    /// Date keywords are checked before amount keywords.
    pub fn classify(&self, field: &str) -> FieldKind {
        let field = field.to_lowercase();
        if self.date_keywords.iter().any(|kw| field.contains(kw.as_str())) {
            FieldKind::Date
        } else if self.amount_keywords.iter().any(|kw| field.contains(kw.as_str())) {
            FieldKind::Amount
        } else {
            FieldKind::Generic
        }
    }
}

fn lowercase_all<I, S>(keywords: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    keywords
        .into_iter()
        .map(|kw| kw.as_ref().trim().to_lowercase())
        .filter(|kw| !kw.is_empty())
        .collect()
}

/// A value reduced to a comparable form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum NormalizedValue {
    Null,
    Text(String),
    Amount(Decimal),
}

/// Normalize a raw value according to the field it belongs to.
///
/// Dates become `YYYY-MM-DD` when they parse, amounts become decimals once
/// currency symbols and thousands separators are removed. Anything else is
/// the trimmed original.
pub fn normalize_value(
    value: Option<&str>,
    field: &str,
    classifier: &FieldClassifier,
) -> NormalizedValue {
    let Some(value) = value.filter(|v| !is_null_like(v)) else {
        return NormalizedValue::Null;
    };
    let trimmed = value.trim();

    match classifier.classify(field) {
        FieldKind::Date => {
            NormalizedValue::Text(normalize_date(trimmed).unwrap_or_else(|| trimmed.to_string()))
        }
        FieldKind::Amount => match parse_amount(trimmed) {
            Some(amount) => NormalizedValue::Amount(amount),
            None => NormalizedValue::Text(trimmed.to_string()),
        },
        FieldKind::Generic => NormalizedValue::Text(trimmed.to_string()),
    }
}

/// Parse "$1,250.50" style amounts.
pub fn parse_amount(value: &str) -> Option<Decimal> {
    let cleaned: String = value
        .chars()
        .filter(|c| !matches!(*c, '$' | '£' | '€' | '¥' | ',') && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}
