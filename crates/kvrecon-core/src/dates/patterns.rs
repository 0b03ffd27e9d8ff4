//! Regex tables for date layout recognition.

use lazy_static::lazy_static;
use regex::Regex;

/// One entry of the ordered structural layout table.
#[derive(Debug)]
pub struct DateLayout {
    /// Anchored pattern the whole input must match.
    pub regex: Regex,
    /// Fixed template, or `None` when day/month order needs the locale.
    pub template: Option<&'static str>,
    /// Delimiter between day, month and year for ambiguous layouts.
    pub delimiter: char,
}

impl DateLayout {
    fn fixed(pattern: &str, template: &'static str) -> Self {
        Self {
            regex: Regex::new(pattern).unwrap(),
            template: Some(template),
            delimiter: '-',
        }
    }

    fn ambiguous(pattern: &str, delimiter: char) -> Self {
        Self {
            regex: Regex::new(pattern).unwrap(),
            template: None,
            delimiter,
        }
    }
}

lazy_static! {
    // Text layouts: "13 October 2024", "13th Oct 2024"
    pub static ref TEXT_DAY_MONTH_YEAR: Regex = Regex::new(
        r"^(\d{1,2})(?i:st|nd|rd|th)?\s+([A-Za-z]+)\s+(\d{4})$"
    ).unwrap();

    // "October 13th, 2024", "Oct 13 2024"
    pub static ref TEXT_MONTH_DAY_YEAR: Regex = Regex::new(
        r"^([A-Za-z]+)\s+(\d{1,2})(?i:st|nd|rd|th)?(,)?\s+(\d{4})$"
    ).unwrap();

    pub static ref ORDINAL_SUFFIX: Regex = Regex::new(
        r"(?i)(\d+)(?:st|nd|rd|th)"
    ).unwrap();

    pub static ref STANDALONE_OF: Regex = Regex::new(
        r"(?i)\bof\b"
    ).unwrap();

    // Ordered most specific first: a timestamp with offset must never be
    // taken for a bare date.
    pub static ref DATE_LAYOUTS: Vec<DateLayout> = vec![
        // ISO with offset and fractional seconds
        DateLayout::fixed(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\.\d{6}[+-]\d{2}:\d{2}$", "%Y-%m-%d %H:%M:%S.%f%z"),
        DateLayout::fixed(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\.\d{3,6}[+-]\d{2}:\d{2}$", "%Y-%m-%d %H:%M:%S.%f%z"),
        DateLayout::fixed(r"^\d{4}\.\d{2}\.\d{2} \d{2}:\d{2}:\d{2}\.\d{6}[+-]\d{2}:\d{2}$", "%Y.%m.%d %H:%M:%S.%f%z"),
        DateLayout::fixed(r"^\d{4}\.\d{2}\.\d{2} \d{2}:\d{2}:\d{2}\.\d{3,6}[+-]\d{2}:\d{2}$", "%Y.%m.%d %H:%M:%S.%f%z"),

        // ISO with offset, no fraction
        DateLayout::fixed(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}[+-]\d{2}:\d{2}$", "%Y-%m-%d %H:%M:%S%z"),
        DateLayout::fixed(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}[+-]\d{2}:\d{2}$", "%Y-%m-%dT%H:%M:%S%z"),
        DateLayout::fixed(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d{6}Z$", "%Y-%m-%dT%H:%M:%S.%fZ"),
        DateLayout::fixed(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}Z$", "%Y-%m-%dT%H:%M:%SZ"),

        // Bare ISO
        DateLayout::fixed(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\.\d{6}$", "%Y-%m-%d %H:%M:%S.%f"),
        DateLayout::fixed(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}$", "%Y-%m-%d %H:%M:%S"),
        DateLayout::fixed(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}$", "%Y-%m-%dT%H:%M:%S"),
        DateLayout::fixed(r"^\d{4}-\d{2}-\d{2}$", "%Y-%m-%d"),

        // Dotted
        DateLayout::fixed(r"^\d{4}\.\d{2}\.\d{2}$", "%Y.%m.%d"),
        DateLayout::ambiguous(r"^\d{2}\.\d{2}\.\d{4}$", '.'),

        // Slashed
        DateLayout::ambiguous(r"^\d{2}/\d{2}/\d{4}$", '/'),
        DateLayout::ambiguous(r"^\d{1,2}/\d{1,2}/\d{4}$", '/'),
        DateLayout::fixed(r"^\d{4}/\d{2}/\d{2}$", "%Y/%m/%d"),
    ];
}

/// Remove ordinal suffixes: "13th" becomes "13".
pub fn strip_ordinals(s: &str) -> String {
    ORDINAL_SUFFIX.replace_all(s, "$1").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_layouts() {
        assert!(TEXT_DAY_MONTH_YEAR.is_match("13 October 2024"));
        assert!(TEXT_DAY_MONTH_YEAR.is_match("1st Jan 2020"));
        assert!(TEXT_MONTH_DAY_YEAR.is_match("October 13th, 2024"));
        assert!(TEXT_MONTH_DAY_YEAR.is_match("July 8th 2022"));
        assert!(!TEXT_MONTH_DAY_YEAR.is_match("July 8th 22"));
    }

    #[test]
    fn test_layout_table_is_anchored() {
        let bare_date = DATE_LAYOUTS
            .iter()
            .find(|l| l.template == Some("%Y-%m-%d"))
            .unwrap();
        assert!(bare_date.regex.is_match("2023-06-27"));
        assert!(!bare_date.regex.is_match("2023-06-27 15:37:38+00:00"));
    }

    #[test]
    fn test_strip_ordinals() {
        assert_eq!(strip_ordinals("October 13th, 2024"), "October 13, 2024");
        assert_eq!(strip_ordinals("1ST of May"), "1 of May");
        assert_eq!(strip_ordinals("August 2024"), "August 2024");
    }
}
