//! Date format templates built from strftime-style placeholders.
//!
//! A template is the wire format for a detected date layout, e.g.
//! `%d/%m/%Y` or `%Y-%m-%d %H:%M:%S.%f%z`. Supported placeholders:
//!
//! | Placeholder | Meaning                                   |
//! |-------------|-------------------------------------------|
//! | `%Y`        | 4-digit year                              |
//! | `%y`        | 2-digit year (00-68 → 20xx, 69-99 → 19xx) |
//! | `%m`        | month number, 1 or 2 digits               |
//! | `%d`        | day number, 1 or 2 digits                 |
//! | `%H` `%M` `%S` | hour, minute, second                   |
//! | `%f`        | fractional seconds, 1-6 digits            |
//! | `%z`        | UTC offset (`+HH:MM`, `+HHMM` or `Z`)     |
//! | `%B` / `%b` | full / abbreviated English month name     |
//! | `%%`        | literal percent sign                      |
//!
//! Any other character is a literal (so a trailing `Z` is just a literal),
//! and a run of whitespace matches one or more whitespace characters.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::FormatError;

/// English month names with their abbreviations, January first.
const MONTHS: [(&str, &str); 12] = [
    ("january", "jan"),
    ("february", "feb"),
    ("march", "mar"),
    ("april", "apr"),
    ("may", "may"),
    ("june", "jun"),
    ("july", "jul"),
    ("august", "aug"),
    ("september", "sep"),
    ("october", "oct"),
    ("november", "nov"),
    ("december", "dec"),
];

/// A single element of a parsed template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    /// `%Y`
    Year,
    /// `%y`
    ShortYear,
    /// `%m`
    Month,
    /// `%d`
    Day,
    /// `%H`
    Hour,
    /// `%M`
    Minute,
    /// `%S`
    Second,
    /// `%f`
    Fraction,
    /// `%z`
    Offset,
    /// `%B`
    MonthName,
    /// `%b`
    MonthAbbr,
    /// One or more whitespace characters.
    Whitespace,
    /// Any other character, matched as-is.
    Literal(char),
}

impl Token {
    /// Minimum and maximum digit count for numeric tokens.
    fn digit_width(self) -> Option<(usize, usize)> {
        match self {
            Token::Year => Some((4, 4)),
            Token::ShortYear => Some((2, 2)),
            Token::Month | Token::Day | Token::Hour | Token::Minute | Token::Second => {
                Some((1, 2))
            }
            Token::Fraction => Some((1, 6)),
            _ => None,
        }
    }
}

/// A date/time value recovered by matching a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedDate {
    /// Wall-clock date and time as written.
    pub datetime: NaiveDateTime,
    /// UTC offset, when the template carried `%z`.
    pub offset: Option<FixedOffset>,
}

impl ParsedDate {
    /// Calendar date part.
    pub fn date(&self) -> NaiveDate {
        self.datetime.date()
    }

    /// Canonical `YYYY-MM-DD` rendering used for equality testing.
    pub fn canonical(&self) -> String {
        self.date().format("%Y-%m-%d").to_string()
    }
}

/// Raw fields collected while walking the tokens.
#[derive(Debug, Clone, Copy, Default)]
struct Fields {
    year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
    hour: u32,
    minute: u32,
    second: u32,
    nanos: u32,
    offset: Option<i32>,
}

/// A validated date format template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Template {
    source: String,
    tokens: Vec<Token>,
}

impl Template {
    /// Parse a template string into tokens.
    pub fn parse(source: &str) -> Result<Self, FormatError> {
        let invalid = |reason: String| FormatError::InvalidTemplate {
            template: source.to_string(),
            reason,
        };

        let mut tokens = Vec::new();
        let mut chars = source.chars();

        while let Some(c) = chars.next() {
            if c == '%' {
                let token = match chars.next() {
                    Some('Y') => Token::Year,
                    Some('y') => Token::ShortYear,
                    Some('m') => Token::Month,
                    Some('d') => Token::Day,
                    Some('H') => Token::Hour,
                    Some('M') => Token::Minute,
                    Some('S') => Token::Second,
                    Some('f') => Token::Fraction,
                    Some('z') => Token::Offset,
                    Some('B') => Token::MonthName,
                    Some('b') => Token::MonthAbbr,
                    Some('%') => Token::Literal('%'),
                    Some(other) => return Err(invalid(format!("unknown placeholder '%{}'", other))),
                    None => return Err(invalid("dangling '%' at end".to_string())),
                };
                tokens.push(token);
            } else if c.is_whitespace() {
                if tokens.last() != Some(&Token::Whitespace) {
                    tokens.push(Token::Whitespace);
                }
            } else {
                tokens.push(Token::Literal(c));
            }
        }

        if tokens.is_empty() {
            return Err(invalid("template is empty".to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            tokens,
        })
    }

    /// The template string as given.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Parsed tokens.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Whether the template carries a UTC offset placeholder.
    pub fn has_offset(&self) -> bool {
        self.tokens.contains(&Token::Offset)
    }

    /// Match the whole input against the template.
    ///
    /// Returns `None` when the input does not fit the layout or names an
    /// impossible calendar date (e.g. 30 February).
    pub fn parse_date(&self, input: &str) -> Option<ParsedDate> {
        let fields = match_tokens(&self.tokens, input, Fields::default())?;
        build_date(&fields)
    }

    /// Whether the input parses with this template.
    pub fn matches(&self, input: &str) -> bool {
        self.parse_date(input).is_some()
    }

    /// Like [`Template::parse_date`] but reports a validation error.
    pub fn validate(&self, input: &str) -> Result<ParsedDate, FormatError> {
        self.parse_date(input)
            .ok_or_else(|| FormatError::ValidationFailed {
                input: input.to_string(),
                template: self.source.clone(),
            })
    }

    /// Render a parsed date through this template.
    ///
    /// `%z` renders as `+HHMM`, or as nothing for a value without offset.
    pub fn render(&self, date: &ParsedDate) -> String {
        let dt = date.datetime;
        let mut out = String::new();

        for token in &self.tokens {
            match token {
                Token::Year => out.push_str(&format!("{:04}", dt.year())),
                Token::ShortYear => out.push_str(&format!("{:02}", dt.year().rem_euclid(100))),
                Token::Month => out.push_str(&format!("{:02}", dt.month())),
                Token::Day => out.push_str(&format!("{:02}", dt.day())),
                Token::Hour => out.push_str(&format!("{:02}", dt.hour())),
                Token::Minute => out.push_str(&format!("{:02}", dt.minute())),
                Token::Second => out.push_str(&format!("{:02}", dt.second())),
                Token::Fraction => out.push_str(&format!("{:06}", dt.nanosecond() / 1_000)),
                Token::Offset => {
                    if let Some(offset) = date.offset {
                        let seconds = offset.local_minus_utc();
                        let sign = if seconds < 0 { '-' } else { '+' };
                        let minutes = seconds.abs() / 60;
                        out.push_str(&format!("{}{:02}{:02}", sign, minutes / 60, minutes % 60));
                    }
                }
                Token::MonthName => out.push_str(&capitalize(MONTHS[dt.month0() as usize].0)),
                Token::MonthAbbr => out.push_str(&capitalize(MONTHS[dt.month0() as usize].1)),
                Token::Whitespace => out.push(' '),
                Token::Literal(c) => out.push(*c),
            }
        }

        out
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for Template {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Template {
    type Error = FormatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Template> for String {
    fn from(template: Template) -> Self {
        template.source
    }
}

/// Look up a month number (1-12) by full name or abbreviation.
pub fn month_from_name(name: &str) -> Option<u32> {
    let lower = name.to_ascii_lowercase();
    if lower == "sept" {
        return Some(9);
    }
    MONTHS
        .iter()
        .position(|(full, abbr)| *full == lower || *abbr == lower)
        .map(|i| i as u32 + 1)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

fn match_tokens(tokens: &[Token], input: &str, fields: Fields) -> Option<Fields> {
    let Some((&token, rest_tokens)) = tokens.split_first() else {
        return input.is_empty().then_some(fields);
    };

    if let Some((min, max)) = token.digit_width() {
        let available = input
            .bytes()
            .take(max)
            .take_while(|b| b.is_ascii_digit())
            .count();

        // Longest run first, shorter runs on backtrack.
        for width in (min..=available).rev() {
            let (digits, rest) = input.split_at(width);
            let Some(next) = assign_number(token, digits, fields) else {
                continue;
            };
            if let Some(done) = match_tokens(rest_tokens, rest, next) {
                return Some(done);
            }
        }
        return None;
    }

    match token {
        Token::Literal(expected) => {
            let mut chars = input.chars();
            let actual = chars.next()?;
            let same = actual == expected
                || (expected.is_ascii_alphabetic() && actual.eq_ignore_ascii_case(&expected));
            if !same {
                return None;
            }
            match_tokens(rest_tokens, chars.as_str(), fields)
        }
        Token::Whitespace => {
            let rest = input.trim_start();
            if rest.len() == input.len() {
                return None;
            }
            match_tokens(rest_tokens, rest, fields)
        }
        Token::Offset => {
            let (offset, rest) = scan_offset(input)?;
            match_tokens(rest_tokens, rest, Fields { offset: Some(offset), ..fields })
        }
        Token::MonthName | Token::MonthAbbr => {
            for (month, len) in month_name_candidates(token, input) {
                let next = Fields { month: Some(month), ..fields };
                if let Some(done) = match_tokens(rest_tokens, &input[len..], next) {
                    return Some(done);
                }
            }
            None
        }
        _ => None,
    }
}

fn assign_number(token: Token, digits: &str, fields: Fields) -> Option<Fields> {
    let value: u32 = digits.parse().ok()?;
    let mut next = fields;

    match token {
        Token::Year => next.year = Some(value as i32),
        Token::ShortYear => {
            next.year = Some(if value < 69 { 2000 + value as i32 } else { 1900 + value as i32 })
        }
        Token::Month if (1..=12).contains(&value) => next.month = Some(value),
        Token::Day if (1..=31).contains(&value) => next.day = Some(value),
        Token::Hour if value <= 23 => next.hour = value,
        Token::Minute if value <= 59 => next.minute = value,
        Token::Second if value <= 59 => next.second = value,
        Token::Fraction => {
            // "013" means 13 milliseconds: right-pad to nanoseconds.
            next.nanos = value * 10u32.pow(9 - digits.len() as u32);
        }
        _ => return None,
    }

    Some(next)
}

/// Month names that prefix the input, longest first, as (month, byte length).
fn month_name_candidates(token: Token, input: &str) -> Vec<(u32, usize)> {
    let mut candidates = Vec::new();

    for (i, (full, abbr)) in MONTHS.iter().enumerate() {
        let mut names = Vec::with_capacity(2);
        if token == Token::MonthName {
            names.push(*full);
        } else {
            if i == 8 {
                names.push("sept");
            }
            names.push(*abbr);
        }
        for name in names {
            let matched = input
                .get(..name.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(name));
            if matched {
                candidates.push((i as u32 + 1, name.len()));
            }
        }
    }

    candidates.sort_by(|a, b| b.1.cmp(&a.1));
    candidates
}

/// Scan `Z`, `+HH:MM`, `+HHMM` and return offset seconds east of UTC.
fn scan_offset(input: &str) -> Option<(i32, &str)> {
    if let Some(rest) = input.strip_prefix('Z') {
        return Some((0, rest));
    }

    let sign = match input.as_bytes().first()? {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let body = &input[1..];

    let (hours, rest) = take_two_digits(body)?;
    let rest = rest.strip_prefix(':').unwrap_or(rest);
    let (minutes, rest) = take_two_digits(rest)?;

    if hours > 23 || minutes > 59 {
        return None;
    }

    Some((sign * (hours as i32 * 3600 + minutes as i32 * 60), rest))
}

fn take_two_digits(input: &str) -> Option<(u32, &str)> {
    let head = input.get(..2)?;
    if !head.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((head.parse().ok()?, &input[2..]))
}

fn build_date(fields: &Fields) -> Option<ParsedDate> {
    let date = NaiveDate::from_ymd_opt(
        fields.year.unwrap_or(1900),
        fields.month.unwrap_or(1),
        fields.day.unwrap_or(1),
    )?;
    let time = NaiveTime::from_hms_nano_opt(fields.hour, fields.minute, fields.second, fields.nanos)?;
    let offset = match fields.offset {
        Some(seconds) => Some(FixedOffset::east_opt(seconds)?),
        None => None,
    };

    Some(ParsedDate {
        datetime: NaiveDateTime::new(date, time),
        offset,
    })
}
