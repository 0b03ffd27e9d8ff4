//! Date format detection under locale ambiguity.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::patterns::{strip_ordinals, DATE_LAYOUTS, TEXT_DAY_MONTH_YEAR, TEXT_MONTH_DAY_YEAR};
use super::registry::FormatRegistry;
use super::template::{month_from_name, ParsedDate, Template, Token};
use super::Locale;
use crate::error::FormatError;

/// How a template was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionSource {
    /// Month-name layout such as "13 October 2024".
    TextLayout,
    /// Entry of the structural layout table.
    StructuralPattern,
    /// Generic delimiter-based inference.
    Inferred,
}

/// Result of detecting the layout of one date string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatDescriptor {
    /// Template that parses the input.
    pub template: Template,
    /// Which stage produced the template.
    pub source: DetectionSource,
    /// Structural regex that matched, for table hits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Set when day/month order was chosen from the locale hint.
    pub ambiguous: bool,
}

/// Infers date templates and records them in a [`FormatRegistry`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DateFormatDetector {
    locale: Locale,
}

impl DateFormatDetector {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Detect the template of `input` and add it to `registry`.
    ///
    /// Stages run in order: text layouts, the structural layout table, then
    /// delimiter-based inference. Every candidate is validated by re-parsing
    /// the input before it is accepted.
    pub fn detect(
        &self,
        input: &str,
        registry: &mut FormatRegistry,
    ) -> Result<FormatDescriptor, FormatError> {
        let trimmed = input.trim();

        let descriptor = self
            .detect_text_layout(trimmed)
            .or_else(|| self.detect_structural(trimmed))
            .or_else(|| self.infer(trimmed))
            .ok_or_else(|| FormatError::Undetected {
                input: input.to_string(),
            })?;

        if registry.insert(&descriptor.template) {
            debug!("Registered date template '{}'", descriptor.template);
        }

        Ok(descriptor)
    }

    /// Re-render `input` through `desired`.
    ///
    /// Registered templates are tried first; if none parses the input the
    /// template is detected, which may grow the registry. When several
    /// registered templates parse the input, one whose day/month order
    /// agrees with the locale wins.
    pub fn reformat(
        &self,
        input: &str,
        registry: &mut FormatRegistry,
        desired: &Template,
    ) -> Result<String, FormatError> {
        let trimmed = input.trim();

        let candidates: Vec<(Template, ParsedDate)> = registry
            .templates()
            .filter_map(|template| {
                let parsed = parse_lenient(&template, trimmed)?;
                Some((template, parsed))
            })
            .collect();
        let known = candidates
            .iter()
            .find(|(template, _)| self.agrees_with_locale(template))
            .or_else(|| candidates.first())
            .map(|(_, parsed)| *parsed);

        let parsed = match known {
            Some(parsed) => parsed,
            None => {
                let descriptor = self.detect(trimmed, registry)?;
                parse_lenient(&descriptor.template, trimmed).ok_or_else(|| {
                    FormatError::Undetected {
                        input: input.to_string(),
                    }
                })?
            }
        };

        Ok(desired.render(&parsed))
    }

    fn detect_text_layout(&self, input: &str) -> Option<FormatDescriptor> {
        let (month_word, day_first, comma) = if let Some(caps) = TEXT_DAY_MONTH_YEAR.captures(input) {
            (caps.get(2)?.as_str(), true, false)
        } else if let Some(caps) = TEXT_MONTH_DAY_YEAR.captures(input) {
            (caps.get(1)?.as_str(), false, caps.get(3).is_some())
        } else {
            return None;
        };

        month_from_name(month_word)?;

        let cleaned = strip_ordinals(input);
        let variants = if month_word.len() > 3 {
            ["%B", "%b"]
        } else {
            ["%b", "%B"]
        };

        for month in variants {
            let source = if day_first {
                format!("%d {} %Y", month)
            } else if comma {
                format!("{} %d, %Y", month)
            } else {
                format!("{} %d %Y", month)
            };

            let template = Template::parse(&source).ok()?;
            match template.validate(&cleaned) {
                Ok(_) => {
                    return Some(FormatDescriptor {
                        template,
                        source: DetectionSource::TextLayout,
                        pattern: None,
                        ambiguous: false,
                    });
                }
                Err(err) => debug!("{}", err),
            }
        }

        None
    }

    fn detect_structural(&self, input: &str) -> Option<FormatDescriptor> {
        for layout in DATE_LAYOUTS.iter() {
            if !layout.regex.is_match(input) {
                continue;
            }
            trace!("'{}' matches layout {}", input, layout.regex.as_str());

            let (source, ambiguous) = match layout.template {
                Some(fixed) => (fixed.to_string(), false),
                None => (self.numeric_triple(layout.delimiter, "%Y"), true),
            };

            let Ok(template) = Template::parse(&source) else {
                continue;
            };

            match template.validate(input) {
                Ok(_) => {
                    return Some(FormatDescriptor {
                        template,
                        source: DetectionSource::StructuralPattern,
                        pattern: Some(layout.regex.as_str().to_string()),
                        ambiguous,
                    });
                }
                Err(err) => debug!("{}", err),
            }
        }

        None
    }

    fn infer(&self, input: &str) -> Option<FormatDescriptor> {
        let delimiter = ['-', '/', '.'].into_iter().find(|d| input.contains(*d))?;

        let time_suffix = match input.split(' ').nth(1) {
            Some(time) => {
                let offset = if input.contains('+') || input.ends_with('Z') {
                    "%z"
                } else {
                    ""
                };
                if time.contains('.') {
                    format!(" %H:%M:%S.%f{}", offset)
                } else {
                    format!(" %H:%M:%S{}", offset)
                }
            }
            None => String::new(),
        };

        for year in ["%Y", "%y"] {
            let source = self.numeric_triple(delimiter, year) + &time_suffix;
            let Ok(template) = Template::parse(&source) else {
                continue;
            };

            match template.validate(input) {
                Ok(_) => {
                    if template.tokens().contains(&Token::ShortYear) {
                        debug!(
                            "Inferred two-digit year template '{}' for '{}'; century is assumed",
                            template, input
                        );
                    }
                    return Some(FormatDescriptor {
                        template,
                        source: DetectionSource::Inferred,
                        pattern: None,
                        ambiguous: true,
                    });
                }
                Err(err) => debug!("{}", err),
            }
        }

        None
    }

    /// Whether a template's numeric day and month come in locale order.
    /// Templates without both are neutral.
    fn agrees_with_locale(&self, template: &Template) -> bool {
        let tokens = template.tokens();
        let day = tokens.iter().position(|t| *t == Token::Day);
        let month = tokens.iter().position(|t| *t == Token::Month);
        match (day, month) {
            (Some(day), Some(month)) => (day < month) == self.locale.is_day_first(),
            _ => true,
        }
    }

    /// Day/month/year template in locale order with the given delimiter.
    fn numeric_triple(&self, delimiter: char, year: &str) -> String {
        if self.locale.is_day_first() {
            format!("%d{d}%m{d}{y}", d = delimiter, y = year)
        } else {
            format!("%m{d}%d{d}{y}", d = delimiter, y = year)
        }
    }
}

/// Detect the template of `input` for `locale`, recording it in `registry`.
pub fn detect_date_format(
    input: &str,
    registry: &mut FormatRegistry,
    locale: Locale,
) -> Result<FormatDescriptor, FormatError> {
    DateFormatDetector::new(locale).detect(input, registry)
}

/// Parse as-is, then with ordinal suffixes removed.
fn parse_lenient(template: &Template, input: &str) -> Option<ParsedDate> {
    template
        .parse_date(input)
        .or_else(|| template.parse_date(&strip_ordinals(input)))
}
