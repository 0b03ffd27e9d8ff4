//! Data models and configuration.

pub mod config;
pub mod record;

pub use config::{DateConfig, HierarchyConfig, MatchingConfig, ReconConfig};
pub use record::{ExtractionRecord, FieldMap};
