//! Canonical date normalization for comparison.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use tracing::trace;

use super::patterns::{strip_ordinals, STANDALONE_OF};
use super::template::Template;

lazy_static! {
    // Tried in order; the first that parses the whole string wins.
    static ref NORMALIZE_TEMPLATES: Vec<Template> = [
        "%Y-%m-%d",
        "%d-%m-%Y",
        "%m-%d-%Y",
        "%d.%m.%Y",
        "%m.%d.%Y",
        "%d/%m/%Y",
        "%m/%d/%Y",
        "%Y/%m/%d",
        "%B %d, %Y",
        "%d %B %Y",
        "%b %d, %Y",
        "%d %b %Y",
        "%m/%d/%y",
        "%d-%m-%y",
        "%d.%m.%y",
    ]
    .iter()
    .map(|s| Template::parse(s).unwrap())
    .collect();

    static ref LOOSE_MONTH_DAY_YEAR: Template = Template::parse("%B %d %Y").unwrap();
}

/// Whether a value counts as absent: empty, "null", "None" or "N/A".
pub fn is_null_like(value: &str) -> bool {
    matches!(value.trim(), "" | "null" | "None" | "N/A")
}

/// Parse a date written in any common layout.
///
/// Ordinal suffixes and a standalone "of" are removed first, so
/// "13th of October 2024" parses. Day-first layouts win over month-first
/// ones when both would parse.
pub fn canonical_date(value: &str) -> Option<NaiveDate> {
    if is_null_like(value) {
        return None;
    }

    let stripped = strip_ordinals(value);
    let without_of = STANDALONE_OF.replace_all(&stripped, "");
    let cleaned = without_of.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        return None;
    }

    if let Some(parsed) = NORMALIZE_TEMPLATES.iter().find_map(|t| t.parse_date(&cleaned)) {
        return Some(parsed.date());
    }

    let loose = loose_month_day_year(&cleaned);
    if loose.is_none() {
        trace!("No date layout matched '{}'", value);
    }
    loose
}

/// Normalize a date to `YYYY-MM-DD`, or `None` when it cannot be parsed.
pub fn normalize_date(value: &str) -> Option<String> {
    canonical_date(value).map(|d| d.format("%Y-%m-%d").to_string())
}

/// Compare two optional date values.
///
/// Only an absent value or the empty string counts as empty; two empty
/// values are equal. When both parse, the canonical dates are compared;
/// otherwise the trimmed, lowercased strings are, so "N/A" equals "n/a" but
/// not "".
pub fn dates_equivalent(a: Option<&str>, b: Option<&str>) -> bool {
    let a = a.filter(|v| !v.is_empty());
    let b = b.filter(|v| !v.is_empty());

    match (a, b) {
        (None, None) => true,
        (Some(_), None) | (None, Some(_)) => false,
        (Some(a), Some(b)) => match (canonical_date(a), canonical_date(b)) {
            (Some(da), Some(db)) => da == db,
            _ => a.trim().to_lowercase() == b.trim().to_lowercase(),
        },
    }
}

// "July 8 2022 at noon": take the first two and the last part.
fn loose_month_day_year(cleaned: &str) -> Option<NaiveDate> {
    let mut parts: Vec<&str> = cleaned.split(' ').collect();
    if parts.len() < 3 {
        parts = cleaned.split(", ").collect();
    }
    if parts.len() < 3 {
        return None;
    }

    let candidate = format!(
        "{} {} {}",
        parts[0].trim_end_matches(','),
        parts[1].trim_end_matches(','),
        parts[parts.len() - 1]
    );
    LOOSE_MONTH_DAY_YEAR.parse_date(&candidate).map(|p| p.date())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_like_values() {
        for value in ["", "  ", "null", "None", "N/A", " N/A "] {
            assert!(is_null_like(value), "{:?}", value);
        }
        assert!(!is_null_like("0"));
        assert!(!is_null_like("none of the above"));
    }

    #[test]
    fn test_normalize_common_layouts() {
        let cases = [
            ("2024-10-13", "2024-10-13"),
            ("13-10-2024", "2024-10-13"),
            ("10-13-2024", "2024-10-13"),
            ("13.10.2024", "2024-10-13"),
            ("13/10/2024", "2024-10-13"),
            ("10/13/2024", "2024-10-13"),
            ("2024/10/13", "2024-10-13"),
            ("October 13, 2024", "2024-10-13"),
            ("13 October 2024", "2024-10-13"),
            ("Oct 13, 2024", "2024-10-13"),
            ("13 Oct 2024", "2024-10-13"),
            ("10/13/24", "2024-10-13"),
            ("13.10.24", "2024-10-13"),
        ];

        for (input, expected) in cases {
            assert_eq!(normalize_date(input).as_deref(), Some(expected), "input {}", input);
        }
    }

    #[test]
    fn test_day_first_wins_when_both_parse() {
        assert_eq!(normalize_date("05/06/2023").as_deref(), Some("2023-06-05"));
        assert_eq!(normalize_date("05-06-2023").as_deref(), Some("2023-06-05"));
    }

    #[test]
    fn test_ordinals_and_of_are_ignored() {
        assert_eq!(normalize_date("13th of October 2024").as_deref(), Some("2024-10-13"));
        assert_eq!(normalize_date("October 13th, 2024").as_deref(), Some("2024-10-13"));
        assert_eq!(normalize_date("1st Jan 2020").as_deref(), Some("2020-01-01"));
    }

    #[test]
    fn test_loose_month_day_year() {
        assert_eq!(normalize_date("July 8th 2022").as_deref(), Some("2022-07-08"));
        assert_eq!(normalize_date("July 8, at noon 2022").as_deref(), Some("2022-07-08"));
    }

    #[test]
    fn test_unparseable_dates() {
        assert_eq!(normalize_date("N/A"), None);
        assert_eq!(normalize_date("soon"), None);
        assert_eq!(normalize_date("31/02/2024"), None);
    }

    #[test]
    fn test_dates_equivalent() {
        assert!(dates_equivalent(Some("1990-05-15"), Some("15/05/1990")));
        assert!(dates_equivalent(Some("October 13, 2024"), Some("13th of October 2024")));
        assert!(dates_equivalent(None, None));
        assert!(dates_equivalent(Some(""), None));
        assert!(!dates_equivalent(Some("1990-05-15"), Some("")));
        assert!(!dates_equivalent(Some("1990-05-15"), None));
        assert!(!dates_equivalent(Some("1990-05-15"), Some("1990-05-16")));
    }

    #[test]
    fn test_placeholder_text_is_not_empty() {
        assert!(!dates_equivalent(Some("N/A"), Some("")));
        assert!(!dates_equivalent(Some("null"), None));
        assert!(!dates_equivalent(Some("null"), Some("N/A")));
        assert!(dates_equivalent(Some("N/A"), Some("n/a")));
    }

    #[test]
    fn test_dates_equivalent_falls_back_to_text() {
        assert!(dates_equivalent(Some("Upon Renewal"), Some(" upon renewal ")));
        assert!(!dates_equivalent(Some("Upon Renewal"), Some("2024-01-01")));
    }
}
