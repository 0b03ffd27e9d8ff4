//! Configuration structures for reconciliation.

use serde::{Deserialize, Serialize};

use crate::dates::{DateFormatDetector, Locale, Template};
use crate::error::{ReconError, Result};
use crate::matching::{
    ComparisonEngine, FieldClassifier, FuzzyOptions, DEFAULT_FUZZY_THRESHOLD,
    DEFAULT_MIN_SUBSTRING_RATIO,
};
use crate::merge::{DocumentTypeHierarchy, HierarchyMerger, DEFAULT_DOCUMENT_TYPES};

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconConfig {
    /// Date detection configuration.
    pub dates: DateConfig,

    /// Comparison configuration.
    pub matching: MatchingConfig,

    /// Document-type hierarchy configuration.
    pub hierarchy: HierarchyConfig,
}

/// Date detection and rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DateConfig {
    /// Locale hint for ambiguous numeric dates.
    pub locale: Locale,

    /// Template used when re-rendering dates.
    pub canonical_format: String,
}

impl Default for DateConfig {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            canonical_format: "%Y-%m-%d".to_string(),
        }
    }
}

/// Field classification and fuzzy matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Similarity threshold for fuzzy matches (0.0 - 1.0).
    pub fuzzy_threshold: f64,

    /// Accept substring matches.
    pub allow_substring: bool,

    /// Minimum shorter/longer length ratio for substring matches.
    pub min_substring_ratio: f64,

    /// Explicit date fields. When unset, fields are classified by keyword.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_fields: Option<Vec<String>>,

    /// Keywords marking a field as a date.
    pub date_keywords: Vec<String>,

    /// Keywords marking a field as an amount.
    pub amount_keywords: Vec<String>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        let classifier = FieldClassifier::default();
        Self {
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            allow_substring: true,
            min_substring_ratio: DEFAULT_MIN_SUBSTRING_RATIO,
            date_fields: None,
            date_keywords: classifier.date_keywords().to_vec(),
            amount_keywords: classifier.amount_keywords().to_vec(),
        }
    }
}

impl MatchingConfig {
    pub fn classifier(&self) -> FieldClassifier {
        FieldClassifier::new(&self.date_keywords, &self.amount_keywords)
    }

    pub fn fuzzy_options(&self) -> FuzzyOptions {
        FuzzyOptions {
            threshold: self.fuzzy_threshold,
            allow_substring: self.allow_substring,
            min_substring_ratio: self.min_substring_ratio,
        }
    }
}

/// Document-type ranking used by the merger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchyConfig {
    /// Labels, highest priority first.
    pub document_types: Vec<String>,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            document_types: DEFAULT_DOCUMENT_TYPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ReconConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> std::result::Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> std::result::Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Check value ranges and the canonical template.
    pub fn validate(&self) -> Result<()> {
        let m = &self.matching;
        if !(0.0..=1.0).contains(&m.fuzzy_threshold) {
            return Err(ReconError::Config(format!(
                "matching.fuzzy_threshold must be within 0.0 - 1.0, got {}",
                m.fuzzy_threshold
            )));
        }
        if !(0.0..=1.0).contains(&m.min_substring_ratio) {
            return Err(ReconError::Config(format!(
                "matching.min_substring_ratio must be within 0.0 - 1.0, got {}",
                m.min_substring_ratio
            )));
        }
        self.canonical_template()?;
        Ok(())
    }

    /// Value at a dotted key such as `matching.fuzzy_threshold`.
    pub fn get_key(&self, key: &str) -> Result<serde_json::Value> {
        let mut current = serde_json::to_value(self)?;
        for part in key.split('.') {
            current = current
                .get_mut(part)
                .map(serde_json::Value::take)
                .ok_or_else(|| ReconError::Config(format!("unknown configuration key '{}'", key)))?;
        }
        Ok(current)
    }

    /// Copy with the value at a dotted key replaced. The copy is validated,
    /// so an out-of-range threshold or a bad template is rejected here.
    pub fn with_key(&self, key: &str, value: serde_json::Value) -> Result<Self> {
        let unknown = || ReconError::Config(format!("unknown configuration key '{}'", key));
        let mut root = serde_json::to_value(self)?;

        let (parents, leaf) = match key.rsplit_once('.') {
            Some((parents, leaf)) => (Some(parents), leaf),
            None => (None, key),
        };
        let mut section = &mut root;
        for part in parents.into_iter().flat_map(|p| p.split('.')) {
            section = section.get_mut(part).ok_or_else(unknown)?;
        }
        let section = section.as_object_mut().ok_or_else(unknown)?;
        // `date_fields` is omitted while unset, so it may be absent.
        if !section.contains_key(leaf) && key != "matching.date_fields" {
            return Err(unknown());
        }
        section.insert(leaf.to_string(), value);

        let updated: ReconConfig = serde_json::from_value(root)?;
        updated.validate()?;
        Ok(updated)
    }

    /// Parsed `dates.canonical_format`.
    pub fn canonical_template(&self) -> Result<Template> {
        Ok(Template::parse(&self.dates.canonical_format)?)
    }

    pub fn detector(&self) -> DateFormatDetector {
        DateFormatDetector::new(self.dates.locale)
    }

    pub fn comparison_engine(&self) -> ComparisonEngine {
        let engine = ComparisonEngine::new(self.matching.classifier(), self.matching.fuzzy_options());
        match &self.matching.date_fields {
            Some(fields) => engine.with_date_fields(fields.iter().cloned()),
            None => engine,
        }
    }

    pub fn merger(&self) -> HierarchyMerger {
        HierarchyMerger::new(DocumentTypeHierarchy::new(
            self.hierarchy.document_types.iter().cloned(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ReconConfig::default();
        assert_eq!(config.dates.locale, Locale::Us);
        assert_eq!(config.matching.fuzzy_threshold, 0.85);
        assert_eq!(config.matching.min_substring_ratio, 0.60);
        assert_eq!(config.hierarchy.document_types.len(), 12);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: ReconConfig =
            serde_json::from_str(r#"{"dates": {"locale": "UK"}, "matching": {"fuzzy_threshold": 0.9}}"#)
                .unwrap();

        assert_eq!(config.dates.locale, Locale::Uk);
        assert_eq!(config.dates.canonical_format, "%Y-%m-%d");
        assert_eq!(config.matching.fuzzy_threshold, 0.9);
        assert!(config.matching.allow_substring);
        assert_eq!(config.matching.date_keywords.len(), 7);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ReconConfig::default();
        config.matching.fuzzy_threshold = 1.5;
        assert!(matches!(config.validate(), Err(ReconError::Config(_))));

        let mut config = ReconConfig::default();
        config.dates.canonical_format = "%Y-%Q".to_string();
        assert!(matches!(config.validate(), Err(ReconError::Format(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = ReconConfig::default();
        config.dates.locale = Locale::Eu;
        config.matching.date_fields = Some(vec!["inception".to_string()]);
        config.save(&path).unwrap();

        let loaded = ReconConfig::from_file(&path).unwrap();
        assert_eq!(loaded.dates.locale, Locale::Eu);
        assert_eq!(loaded.matching.date_fields, Some(vec!["inception".to_string()]));
    }

    #[test]
    fn test_get_key() {
        let config = ReconConfig::default();
        assert_eq!(config.get_key("dates.locale").unwrap(), serde_json::json!("US"));
        assert_eq!(config.get_key("matching.fuzzy_threshold").unwrap(), serde_json::json!(0.85));
        assert!(config.get_key("hierarchy").unwrap().is_object());
        assert!(matches!(config.get_key("dates.nope"), Err(ReconError::Config(_))));
    }

    #[test]
    fn test_with_key() {
        let config = ReconConfig::default();

        let uk = config.with_key("dates.locale", serde_json::json!("UK")).unwrap();
        assert_eq!(uk.dates.locale, Locale::Uk);
        assert_eq!(config.dates.locale, Locale::Us);

        let fields = config
            .with_key("matching.date_fields", serde_json::json!(["inception"]))
            .unwrap();
        assert_eq!(fields.matching.date_fields, Some(vec!["inception".to_string()]));

        assert!(matches!(
            config.with_key("matching.fuzzy_threshold", serde_json::json!(3)),
            Err(ReconError::Config(_))
        ));
        assert!(matches!(
            config.with_key("matching.threshold", serde_json::json!(0.5)),
            Err(ReconError::Config(_))
        ));
        assert!(config.with_key("dates.locale", serde_json::json!("Mars")).is_err());
    }

    #[test]
    fn test_builders_use_config() {
        let mut config = ReconConfig::default();
        config.hierarchy.document_types = vec!["Invoice".to_string(), "Email".to_string()];
        config.dates.locale = Locale::Uk;

        assert_eq!(config.merger().hierarchy().rank("Email"), 1);
        assert_eq!(config.detector().locale(), Locale::Uk);
        assert_eq!(config.comparison_engine().fuzzy_options().threshold, 0.85);
    }
}
