//! Similarity scores for long text fields.

use std::collections::{HashMap, HashSet};

use super::config::TextMethod;
use super::normalize::{comparison_key, extract_numbers};

/// Jaccard score above which the full comparison is skipped.
const QUICK_EXIT: f64 = 0.95;
/// Relative length difference beyond which the quick check gives up.
const QUICK_LENGTH_SLACK: f64 = 0.05;

/// Similarity in `[0, 1]` using `method`.
///
/// Texts that pass the cheap word-set pre-check score 1.0 without running
/// the full comparison.
#[must_use]
pub fn similarity(a: &str, b: &str, method: TextMethod) -> f64 {
    if quick_similarity(a, b) > QUICK_EXIT {
        return 1.0;
    }
    match method {
        TextMethod::Levenshtein => levenshtein_similarity(a, b),
        TextMethod::NumberFrequency => number_frequency_similarity(a, b),
    }
}

/// `1 - distance / max_len` over the alphanumeric comparison keys.
///
/// Two empty inputs score 1.0; exactly one empty input scores 0.0.
#[must_use]
pub fn levenshtein_similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = comparison_key(a).chars().collect();
    let b: Vec<char> = comparison_key(b).chars().collect();

    match (a.is_empty(), b.is_empty()) {
        (true, true) => return 1.0,
        (true, false) | (false, true) => return 0.0,
        (false, false) => {}
    }

    let distance = levenshtein(&a, &b);
    let max_len = a.len().max(b.len());
    #[allow(clippy::cast_precision_loss)]
    let score = 1.0 - distance as f64 / max_len as f64;
    score.clamp(0.0, 1.0)
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// Cosine similarity of the number-frequency vectors of both texts.
///
/// Ignores all wording, so only the figures a provider read count.
#[must_use]
pub fn number_frequency_similarity(a: &str, b: &str) -> f64 {
    let fa = frequencies(&extract_numbers(a));
    let fb = frequencies(&extract_numbers(b));

    match (fa.is_empty(), fb.is_empty()) {
        (true, true) => return 1.0,
        (true, false) | (false, true) => return 0.0,
        (false, false) => {}
    }

    let dot: f64 = fa
        .iter()
        .map(|(k, &x)| fb.get(k).map_or(0.0, |&y| f64::from(x) * f64::from(y)))
        .sum();
    let norm = |f: &HashMap<String, u32>| f.values().map(|&v| f64::from(v).powi(2)).sum::<f64>().sqrt();
    let denominator = norm(&fa) * norm(&fb);
    if denominator == 0.0 {
        return 0.0;
    }
    (dot / denominator).clamp(0.0, 1.0)
}

fn frequencies(numbers: &[f64]) -> HashMap<String, u32> {
    let mut map = HashMap::new();
    for n in numbers {
        *map.entry(format!("{n}")).or_insert(0) += 1;
    }
    map
}

/// Word-set Jaccard score, or 0.0 when lengths differ by more than 5%.
#[must_use]
pub fn quick_similarity(a: &str, b: &str) -> f64 {
    let (la, lb) = (a.chars().count(), b.chars().count());
    if la == 0 || lb == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let length_diff = la.abs_diff(lb) as f64 / la.max(lb) as f64;
    if length_diff > QUICK_LENGTH_SLACK {
        return 0.0;
    }

    let wa: HashSet<&str> = a.split_whitespace().collect();
    let wb: HashSet<&str> = b.split_whitespace().collect();
    if wa.is_empty() || wb.is_empty() {
        return 0.0;
    }
    let intersection = wa.intersection(&wb).count();
    let union = wa.union(&wb).count();
    #[allow(clippy::cast_precision_loss)]
    let score = intersection as f64 / union as f64;
    score
}
