//! Fuzzy "did you mean" suggestions for switch names and parameter keys
//!
//! Scoring combines Jaro-Winkler (70%) with normalized Levenshtein (30%), plus a
//! prefix bonus for candidates sharing the first few characters with the input.

use strsim::{jaro_winkler, normalized_levenshtein};

/// Minimum score a candidate needs to be suggested.
///
/// Tuned so that single transpositions ("--write-pfb") and dropped characters
/// ("--read-shap") are caught while unrelated words stay unmatched.
const MIN_SCORE: f64 = 0.75;

/// Switch names all start with dashes; comparing them would inflate every score.
fn normalize(s: &str) -> String {
    s.trim_start_matches('-').to_lowercase()
}

fn score(input: &str, candidate: &str) -> f64 {
    let jw = jaro_winkler(input, candidate);
    let lev = normalized_levenshtein(input, candidate);
    let mut total = jw * 0.7 + lev * 0.3;

    let prefix_len = input.chars().count().min(4);
    if prefix_len >= 2 {
        let a: String = input.chars().take(prefix_len).collect();
        let b: String = candidate.chars().take(prefix_len).collect();
        if a == b {
            total += 0.05;
        }
    }

    total
}

/// Find the closest candidate to `input`, if any is close enough.
///
/// Returns `None` for an exact (case-insensitive) match, since there is nothing to correct.
pub fn suggest_correction<'a, I>(input: &str, candidates: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let needle = normalize(input);
    if needle.is_empty() {
        return None;
    }

    let mut best: Option<(&str, f64)> = None;
    for candidate in candidates {
        let normalized = normalize(candidate);
        if normalized == needle {
            return None;
        }
        let s = score(&needle, &normalized);
        if s >= MIN_SCORE && best.map_or(true, |(_, b)| s > b) {
            best = Some((candidate, s));
        }
    }

    best.map(|(c, _)| c.to_string())
}
