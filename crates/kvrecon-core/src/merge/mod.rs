//! Multi-source merging.

pub mod hierarchy;

pub use hierarchy::{
    merge_extractions_by_hierarchy, Candidate, DocumentTypeHierarchy, HierarchyMerger, MergedField,
    MergedRecord, DEFAULT_DOCUMENT_TYPES,
};
