//! Reconciliation of extracted key-value pairs against ground truth.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use tracing::debug;

use super::fuzzy::{fuzzy_match, similarity, FuzzyOptions};
use super::value::{normalize_value, FieldClassifier, FieldKind};
use crate::dates::dates_equivalent;
use crate::models::FieldMap;

/// Reason recorded when ground truth is null but a value was extracted.
pub const EXPECTED_NULL_BUT_EXTRACTED: &str = "expected_null_but_extracted";

/// Outcome of one expected key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Match,
    Mismatch,
    Missing,
}

/// How a match was established.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchMethod {
    BothNull,
    ExactMatchNormalized,
    DateMatch,
    Fuzzy { similarity: f64 },
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMethod::BothNull => f.write_str("both_null"),
            MatchMethod::ExactMatchNormalized => f.write_str("exact_match_normalized"),
            MatchMethod::DateMatch => f.write_str("date_match"),
            MatchMethod::Fuzzy { similarity } => write!(f, "fuzzy_match_{:.2}", similarity),
        }
    }
}

impl Serialize for MatchMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Per-key comparison detail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldComparison {
    pub status: MatchStatus,
    pub expected: Option<String>,
    pub extracted: Option<String>,
    #[serde(rename = "match_method", skip_serializing_if = "Option::is_none")]
    pub method: Option<MatchMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Result of comparing one extracted mapping against one expected mapping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub matches: usize,
    pub mismatches: usize,
    pub missing: usize,
    pub total_expected: usize,
    /// Extracted keys with a non-null value.
    pub total_extracted: usize,
    pub details: BTreeMap<String, FieldComparison>,
    /// Method used for each matched key.
    pub match_types: BTreeMap<String, MatchMethod>,
    /// Percentage of expected keys that matched.
    pub accuracy: f64,
}

impl ComparisonResult {
    /// Keys in a given status, in key order.
    pub fn keys_with_status(&self, status: MatchStatus) -> impl Iterator<Item = &str> {
        self.details
            .iter()
            .filter(move |(_, d)| d.status == status)
            .map(|(k, _)| k.as_str())
    }
}

/// Compares extracted values with ground truth using normalization, date
/// equivalence and fuzzy matching.
#[derive(Debug, Clone, Default)]
pub struct ComparisonEngine {
    classifier: FieldClassifier,
    fuzzy: FuzzyOptions,
    date_fields: Option<Vec<String>>,
}

impl ComparisonEngine {
    pub fn new(classifier: FieldClassifier, fuzzy: FuzzyOptions) -> Self {
        Self {
            classifier,
            fuzzy,
            date_fields: None,
        }
    }

    /// Treat exactly these keys as dates instead of classifying by name.
    pub fn with_date_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.date_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn fuzzy_options(&self) -> &FuzzyOptions {
        &self.fuzzy
    }

    pub fn classifier(&self) -> &FieldClassifier {
        &self.classifier
    }

    /// Whether `key` is compared as a date: the explicit date-field list
    /// when one was given, otherwise the classifier.
    pub fn is_date_field(&self, key: &str) -> bool {
        match &self.date_fields {
            Some(fields) => fields.iter().any(|f| f == key),
            None => self.classifier.classify(key) == FieldKind::Date,
        }
    }

    /// Compare `extracted` against `expected`.
    ///
    /// Every expected key lands in exactly one of match, mismatch or missing.
    /// A key absent from `extracted` counts as null.
    pub fn compare(&self, extracted: &FieldMap, expected: &FieldMap) -> ComparisonResult {
        let mut result = ComparisonResult {
            matches: 0,
            mismatches: 0,
            missing: 0,
            total_expected: expected.len(),
            total_extracted: extracted.values().filter(|v| v.is_some()).count(),
            details: BTreeMap::new(),
            match_types: BTreeMap::new(),
            accuracy: 0.0,
        };

        for (key, expected_value) in expected {
            let extracted_value = extracted.get(key).and_then(|v| v.as_deref());
            let expected_value = expected_value.as_deref();

            let detail = self.compare_field(key, extracted_value, expected_value);
            match detail.status {
                MatchStatus::Match => {
                    result.matches += 1;
                    if let Some(method) = detail.method {
                        result.match_types.insert(key.clone(), method);
                    }
                }
                MatchStatus::Mismatch => result.mismatches += 1,
                MatchStatus::Missing => result.missing += 1,
            }
            result.details.insert(key.clone(), detail);
        }

        if result.total_expected > 0 {
            result.accuracy = result.matches as f64 / result.total_expected as f64 * 100.0;
        }

        debug!(
            "Compared {} keys: {} match, {} mismatch, {} missing",
            result.total_expected, result.matches, result.mismatches, result.missing
        );

        result
    }

    fn compare_field(
        &self,
        key: &str,
        extracted: Option<&str>,
        expected: Option<&str>,
    ) -> FieldComparison {
        let mut detail = FieldComparison {
            status: MatchStatus::Mismatch,
            expected: expected.map(str::to_string),
            extracted: extracted.map(str::to_string),
            method: None,
            similarity: None,
            reason: None,
        };

        let (extracted, expected) = match (extracted, expected) {
            (None, None) => {
                detail.status = MatchStatus::Match;
                detail.method = Some(MatchMethod::BothNull);
                return detail;
            }
            (None, Some(_)) => {
                detail.status = MatchStatus::Missing;
                return detail;
            }
            (Some(_), None) => {
                detail.reason = Some(EXPECTED_NULL_BUT_EXTRACTED.to_string());
                detail.similarity = Some(0.0);
                return detail;
            }
            (Some(extracted), Some(expected)) => (extracted, expected),
        };

        let method = if normalize_value(Some(extracted), key, &self.classifier)
            == normalize_value(Some(expected), key, &self.classifier)
        {
            Some(MatchMethod::ExactMatchNormalized)
        } else if self.is_date_field(key) {
            dates_equivalent(Some(extracted), Some(expected)).then_some(MatchMethod::DateMatch)
        } else if fuzzy_match(extracted, expected, &self.fuzzy) {
            Some(MatchMethod::Fuzzy {
                similarity: similarity(extracted, expected),
            })
        } else {
            None
        };

        match method {
            Some(method) => {
                detail.status = MatchStatus::Match;
                detail.method = Some(method);
            }
            None => {
                detail.similarity = Some(similarity(extracted, expected));
            }
        }

        detail
    }
}

/// Compare with default classifier and fuzzy options.
pub fn compare_extracted_with_expected(extracted: &FieldMap, expected: &FieldMap) -> ComparisonResult {
    ComparisonEngine::default().compare(extracted, expected)
}
