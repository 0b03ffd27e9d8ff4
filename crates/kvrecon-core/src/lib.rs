//! Core library for reconciling key-value extractions against ground truth.
//!
//! This crate provides:
//! - Date format inference with locale hints and a run-scoped format registry
//! - Date normalization and equivalence for comparison
//! - Field classification, value normalization and fuzzy string matching
//! - Per-key comparison of extracted values with expected values
//! - Document-type hierarchy merge of multi-source extractions

pub mod error;
pub mod dates;
pub mod matching;
pub mod merge;
pub mod models;

pub use error::{FormatError, ReconError, Result};
pub use dates::{
    detect_date_format, dates_equivalent, normalize_date, DateFormatDetector, FormatDescriptor,
    FormatRegistry, Locale, Template,
};
pub use matching::{
    compare_extracted_with_expected, ComparisonEngine, ComparisonResult, FieldClassifier,
    FieldKind, FuzzyOptions, MatchMethod, MatchStatus,
};
pub use merge::{merge_extractions_by_hierarchy, DocumentTypeHierarchy, HierarchyMerger, MergedRecord};
pub use models::{ExtractionRecord, FieldMap, ReconConfig};
