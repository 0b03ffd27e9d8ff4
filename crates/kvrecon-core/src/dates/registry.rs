//! Run-scoped accumulator of detected date templates.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::template::Template;
use crate::error::FormatError;

/// Set of template strings discovered during one batch run.
///
/// Only grows. Serializes as a plain JSON array of template strings, which is
/// the format for persisted "known formats" lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FormatRegistry {
    templates: BTreeSet<String>,
}

impl FormatRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from persisted template strings.
    ///
    /// Fails on the first string that is not a valid template.
    pub fn from_templates<I, S>(templates: I) -> Result<Self, FormatError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut registry = Self::new();
        for template in templates {
            registry.insert(&Template::parse(template.as_ref())?);
        }
        Ok(registry)
    }

    /// Add a template; returns `true` if it was not already present.
    pub fn insert(&mut self, template: &Template) -> bool {
        self.templates.insert(template.as_str().to_string())
    }

    /// Whether a template string is already registered.
    pub fn contains(&self, template: &str) -> bool {
        self.templates.contains(template)
    }

    /// Number of distinct templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Registered template strings in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.templates.iter().map(String::as_str)
    }

    /// Parsed templates in sorted order. Entries that no longer parse are skipped.
    pub fn templates(&self) -> impl Iterator<Item = Template> + '_ {
        self.templates.iter().filter_map(|s| Template::parse(s).ok())
    }

    /// Fold another registry into this one (e.g. one per worker).
    pub fn extend(&mut self, other: FormatRegistry) {
        self.templates.extend(other.templates);
    }
}

impl TryFrom<Vec<String>> for FormatRegistry {
    type Error = FormatError;

    fn try_from(templates: Vec<String>) -> Result<Self, Self::Error> {
        Self::from_templates(templates)
    }
}

impl From<FormatRegistry> for Vec<String> {
    fn from(registry: FormatRegistry) -> Self {
        registry.templates.into_iter().collect()
    }
}
