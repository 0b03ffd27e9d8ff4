//! Value normalization, fuzzy matching and comparison.

pub mod compare;
pub mod fuzzy;
pub mod value;

pub use compare::{
    compare_extracted_with_expected, ComparisonEngine, ComparisonResult, FieldComparison,
    MatchMethod, MatchStatus,
};
pub use fuzzy::{
    fuzzy_match, similarity, FuzzyOptions, DEFAULT_FUZZY_THRESHOLD, DEFAULT_MIN_SUBSTRING_RATIO,
};
pub use value::{normalize_value, parse_amount, FieldClassifier, FieldKind, NormalizedValue};
