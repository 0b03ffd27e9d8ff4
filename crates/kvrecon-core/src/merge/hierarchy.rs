//! Document-type hierarchy merge of per-source extractions.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{ExtractionRecord, FieldMap};

/// Default ranking of insurance document classes, highest priority first.
pub const DEFAULT_DOCUMENT_TYPES: [&str; 12] = [
    "Email",
    "Claim Notification / Acord / Notice of Loss / Loss Report / Incident Report",
    "Notice of Claim / Complaint / Claim Letter / Acknowledgement",
    "Court Document / Legal Document",
    "Medical Document",
    "Police Report / Accident Report",
    "Bordereau",
    "Policy Schedule / Slip / Endorsement / Binder / Certificate",
    "Claimant List",
    "Adjuster Report",
    "Interim Invoice",
    "Other",
];

/// Ordered document-type labels. Lower rank wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentTypeHierarchy {
    labels: Vec<String>,
}

impl Default for DocumentTypeHierarchy {
    fn default() -> Self {
        Self::new(DEFAULT_DOCUMENT_TYPES)
    }
}

impl DocumentTypeHierarchy {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Position of `label`; unknown labels rank after every known one.
    pub fn rank(&self, label: &str) -> usize {
        self.labels
            .iter()
            .position(|l| l == label)
            .unwrap_or(self.labels.len())
    }
}

/// One non-null value offered for a key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub value: String,
    pub confidence: f64,
    pub source: String,
    pub document_type: String,
    #[serde(skip)]
    pub rank: usize,
}

/// Merge outcome for one key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedField {
    pub value: Option<String>,
    pub confidence: f64,
    pub source: Option<String>,
    pub document_type: Option<String>,
    /// Human-readable account of the decision.
    pub note: String,
    /// The winner's own extraction note, if it had one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_note: Option<String>,
    /// Non-winning candidates in priority order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub losing: Vec<Candidate>,
}

impl MergedField {
    fn not_found() -> Self {
        Self {
            value: None,
            confidence: 0.0,
            source: None,
            document_type: None,
            note: "not found in any source".to_string(),
            extraction_note: None,
            losing: Vec::new(),
        }
    }
}

/// Merged view over several extraction records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    pub fields: BTreeMap<String, MergedField>,
}

impl MergedRecord {
    /// Plain key to value mapping, ready for comparison.
    pub fn extracted_data(&self) -> FieldMap {
        self.fields
            .iter()
            .map(|(k, f)| (k.clone(), f.value.clone()))
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&MergedField> {
        self.fields.get(key)
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(|f| f.value.as_deref())
    }

    /// Keys where more than one source offered a value.
    pub fn conflicts(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|(_, f)| !f.losing.is_empty())
            .map(|(k, _)| k.as_str())
    }
}

/// Resolves per-key conflicts using a [`DocumentTypeHierarchy`].
#[derive(Debug, Clone, Default)]
pub struct HierarchyMerger {
    hierarchy: DocumentTypeHierarchy,
}

impl HierarchyMerger {
    pub fn new(hierarchy: DocumentTypeHierarchy) -> Self {
        Self { hierarchy }
    }

    pub fn hierarchy(&self) -> &DocumentTypeHierarchy {
        &self.hierarchy
    }

    /// Merge `records` for the given keys.
    ///
    /// Non-null always beats null. Among non-null values the lowest rank
    /// wins, ties going to the earlier record.
    pub fn merge(&self, records: &[ExtractionRecord], keys: &[String]) -> MergedRecord {
        let mut merged = MergedRecord::default();

        for key in keys {
            let field = self.merge_key(records, key);
            merged.fields.insert(key.clone(), field);
        }

        debug!(
            "Merged {} keys from {} records ({} conflicts)",
            keys.len(),
            records.len(),
            merged.conflicts().count()
        );

        merged
    }

    /// Merge every key seen in any record.
    pub fn merge_all_keys(&self, records: &[ExtractionRecord]) -> MergedRecord {
        let keys: BTreeSet<&String> = records.iter().flat_map(|r| r.extracted_data.keys()).collect();
        let keys: Vec<String> = keys.into_iter().cloned().collect();
        self.merge(records, &keys)
    }

    fn merge_key(&self, records: &[ExtractionRecord], key: &str) -> MergedField {
        let mut candidates: Vec<(Candidate, Option<&String>)> = records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| {
                let value = record.value(key)?;
                let source = if record.source.is_empty() {
                    format!("attachment_{}", index)
                } else {
                    record.source.clone()
                };
                let candidate = Candidate {
                    value: value.to_string(),
                    confidence: record.confidence(key),
                    source,
                    document_type: record.document_type.clone(),
                    rank: self.hierarchy.rank(&record.document_type),
                };
                Some((candidate, record.extraction_notes.get(key)))
            })
            .collect();

        if candidates.is_empty() {
            return MergedField::not_found();
        }

        // Stable: equal ranks keep input order.
        candidates.sort_by_key(|(c, _)| c.rank);

        let mut iter = candidates.into_iter();
        let Some((winner, winner_note)) = iter.next() else {
            return MergedField::not_found();
        };
        let losing: Vec<Candidate> = iter.map(|(c, _)| c).collect();

        let note = if losing.is_empty() {
            format!("found in {} ({})", winner.source, winner.document_type)
        } else {
            let others = losing
                .iter()
                .map(|c| format!("'{}' from {}", c.value, c.document_type))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "selected '{}' from {} (highest priority); also found: {}",
                winner.value, winner.document_type, others
            )
        };

        MergedField {
            value: Some(winner.value),
            confidence: winner.confidence,
            source: Some(winner.source),
            document_type: Some(winner.document_type),
            note,
            extraction_note: winner_note.filter(|n| !n.is_empty()).cloned(),
            losing,
        }
    }
}

/// Merge with an explicit hierarchy.
pub fn merge_extractions_by_hierarchy(
    records: &[ExtractionRecord],
    keys: &[String],
    hierarchy: &DocumentTypeHierarchy,
) -> MergedRecord {
    HierarchyMerger::new(hierarchy.clone()).merge(records, keys)
}
