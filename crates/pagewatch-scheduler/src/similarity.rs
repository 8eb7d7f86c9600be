//! Word-similarity gate for notification filtering.
//!
//! A filter matches when at least one trigger word is close enough to
//! some token of the extracted text. Closeness is a normalized
//! Levenshtein ratio in [0, 1]: 1.0 requires the exact token, 0.0
//! matches anything (for a non-empty word set). Case-insensitive,
//! deterministic, and independent of word-list order.

/// Does `text` match any of `words` at the given threshold?
pub fn matches(text: &str, words: &[String], threshold: f64) -> bool {
    if words.is_empty() {
        return false;
    }
    if threshold <= 0.0 {
        return true;
    }

    let tokens = tokenize(text);
    words.iter().any(|word| {
        let word = word.to_lowercase();
        tokens
            .iter()
            .any(|token| similarity(&word, token) >= threshold)
    })
}

/// Lowercased alphanumeric tokens.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Normalized similarity: `1 - distance / max_len`. Two empty strings
/// are identical.
fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(&a, &b) as f64 / longest as f64
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(prev[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut prev, &mut current);
    }

    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_word_set_never_matches() {
        assert!(!matches("anything at all", &[], 0.0));
        assert!(!matches("anything at all", &[], 0.5));
        assert!(!matches("anything at all", &[], 1.0));
    }

    #[test]
    fn zero_threshold_always_matches_nonempty_set() {
        assert!(matches("completely unrelated", &words(&["zzz"]), 0.0));
        assert!(matches("", &words(&["zzz"]), 0.0));
    }

    #[test]
    fn full_threshold_requires_exact_presence() {
        assert!(matches("price drop announced", &words(&["price"]), 1.0));
        assert!(!matches("prices dropped", &words(&["price"]), 1.0));
    }

    #[test]
    fn near_match_passes_below_full_threshold() {
        // "prices" vs "price": distance 1 over length 6 → 0.833…
        assert!(matches("prices dropped", &words(&["price"]), 0.8));
        assert!(!matches("prices dropped", &words(&["price"]), 0.9));
    }

    #[test]
    fn word_order_is_irrelevant() {
        let forward = words(&["alpha", "beta"]);
        let backward = words(&["beta", "alpha"]);
        for text in ["beta release", "alpha release", "gamma release"] {
            assert_eq!(
                matches(text, &forward, 0.9),
                matches(text, &backward, 0.9),
            );
        }
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert!(matches("BREAKING News", &words(&["breaking"]), 1.0));
        assert!(matches("breaking news", &words(&["BREAKING"]), 1.0));
    }

    #[test]
    fn levenshtein_basics() {
        let chars = |s: &str| s.chars().collect::<Vec<_>>();
        assert_eq!(levenshtein(&chars("kitten"), &chars("sitting")), 3);
        assert_eq!(levenshtein(&chars(""), &chars("abc")), 3);
        assert_eq!(levenshtein(&chars("abc"), &chars("abc")), 0);
    }
}
