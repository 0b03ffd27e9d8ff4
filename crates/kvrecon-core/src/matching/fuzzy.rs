//! String similarity and fuzzy match decisions.

use serde::{Deserialize, Serialize};

/// Similarity at or above which two strings are a fuzzy match.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.85;

/// Minimum shorter/longer length ratio for a substring match.
pub const DEFAULT_MIN_SUBSTRING_RATIO: f64 = 0.60;

/// Tunables for [`fuzzy_match`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuzzyOptions {
    /// Minimum similarity ratio (0.0 - 1.0).
    pub threshold: f64,

    /// Also accept when one string contains the other.
    pub allow_substring: bool,

    /// Minimum length ratio for substring acceptance.
    pub min_substring_ratio: f64,
}

impl Default for FuzzyOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_FUZZY_THRESHOLD,
            allow_substring: true,
            min_substring_ratio: DEFAULT_MIN_SUBSTRING_RATIO,
        }
    }
}

/// Similarity ratio between two strings in `[0.0, 1.0]`.
///
/// Case and surrounding whitespace are ignored. Uses the Ratcliff/Obershelp
/// measure `2*M / (|a| + |b|)`, where `M` counts characters in matching
/// blocks found by recursively taking the longest common block. The pair is
/// put in a fixed order first so `similarity(a, b) == similarity(b, a)`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();

    match (a.is_empty(), b.is_empty()) {
        (true, true) => return 1.0,
        (true, false) | (false, true) => return 0.0,
        _ => {}
    }
    if a == b {
        return 1.0;
    }

    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    let first: Vec<char> = first.chars().collect();
    let second: Vec<char> = second.chars().collect();

    let matched = matching_chars(&first, &second);
    (2 * matched) as f64 / (first.len() + second.len()) as f64
}

/// Fuzzy equality decision.
///
/// Empty and exact (normalized) rules apply first, then the similarity
/// threshold, then the optional substring rule.
pub fn fuzzy_match(a: &str, b: &str, options: &FuzzyOptions) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();

    match (a.is_empty(), b.is_empty()) {
        (true, true) => return true,
        (true, false) | (false, true) => return false,
        _ => {}
    }
    if a == b {
        return true;
    }

    if similarity(&a, &b) >= options.threshold {
        return true;
    }

    if options.allow_substring && (a.contains(&b) || b.contains(&a)) {
        let (len_a, len_b) = (a.chars().count(), b.chars().count());
        let ratio = len_a.min(len_b) as f64 / len_a.max(len_b) as f64;
        return ratio >= options.min_substring_ratio;
    }

    false
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let (i, j, len) = longest_common_block(a, b);
    if len == 0 {
        return 0;
    }
    len + matching_chars(&a[..i], &b[..j]) + matching_chars(&a[i + len..], &b[j + len..])
}

/// Longest common contiguous block as `(start_a, start_b, len)`.
/// Ties go to the earliest block in `a`, then in `b`.
fn longest_common_block(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb { prev[j] + 1 } else { 0 };
            let len = curr[j + 1];
            if len > best.2 {
                best = (i + 1 - len, j + 1 - len, len);
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    best
}
