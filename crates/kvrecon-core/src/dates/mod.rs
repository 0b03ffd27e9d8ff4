//! Date format inference and normalization.

pub mod detector;
pub mod normalizer;
pub mod patterns;
pub mod registry;
pub mod template;

pub use detector::{detect_date_format, DateFormatDetector, DetectionSource, FormatDescriptor};
pub use normalizer::{canonical_date, dates_equivalent, is_null_like, normalize_date};
pub use registry::FormatRegistry;
pub use template::{ParsedDate, Template, Token};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Locale hint used to order ambiguous numeric dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Locale {
    /// Day first (27/06/2023).
    #[serde(rename = "UK")]
    Uk,
    /// Day first (27.06.2023).
    #[serde(rename = "EU")]
    Eu,
    /// Month first (06/27/2023).
    #[default]
    #[serde(rename = "US")]
    Us,
}

impl Locale {
    /// Whether ambiguous numeric dates are read day-first.
    pub fn is_day_first(self) -> bool {
        matches!(self, Locale::Uk | Locale::Eu)
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Locale::Uk => "UK",
            Locale::Eu => "EU",
            Locale::Us => "US",
        };
        f.write_str(s)
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UK" | "GB" => Ok(Locale::Uk),
            "EU" => Ok(Locale::Eu),
            "US" => Ok(Locale::Us),
            other => Err(format!("unknown locale '{}', expected UK, EU or US", other)),
        }
    }
}
