//! Normalization of sentences into index tokens.
//!
//! Both `store` and `lookup` depend on this producing the same token
//! sequence and token count for the same input, because the token count
//! is part of every word-index key.

use std::collections::HashSet;

/// Per-locale stop-word tables: high-frequency function words that carry
/// no retrieval signal and would bloat the index. Closed lists.
static STOP_WORDS: &[(&str, &[&str])] = &[
    ("en", &["a", "an", "have", "of", "the", "will"]),
    ("de", &["der", "die", "das", "ein", "eine", "und", "von"]),
    ("fr", &["le", "la", "les", "un", "une", "des", "de", "du", "et"]),
    ("es", &["el", "la", "los", "las", "un", "una", "de", "del"]),
    ("cs", &["se", "na", "je", "to", "že"]),
];

/// Deterministic, stateless tokenizer.
#[derive(Debug)]
pub struct Tokenizer {
    stop_words: HashSet<&'static str>,
    min_token_chars: usize,
}

impl Tokenizer {
    /// Build a tokenizer for a locale ("en", "en_US", "de-AT", ...).
    /// Unknown locales get an empty stop-word set.
    pub fn new(locale: &str, min_token_chars: usize) -> Self {
        let lang = locale.split(['_', '-']).next().unwrap_or(locale);
        let stop_words = STOP_WORDS
            .iter()
            .find(|&&(l, _)| l == lang)
            .map(|&(_, words)| words.iter().copied().collect())
            .unwrap_or_default();
        Self {
            stop_words,
            min_token_chars,
        }
    }

    /// Normalize a sentence into ordered, distinct index tokens.
    ///
    /// Pipeline: case-fold, split on non-alphanumeric boundaries, drop
    /// short tokens and stop words, drop repeated words keeping the first
    /// occurrence. The length of the returned sequence is the sentence
    /// length used for index bucketing.
    pub fn normalize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let mut tokens: Vec<String> = Vec::new();
        for raw in lowered.split(|c: char| !c.is_alphanumeric()) {
            if raw.chars().count() < self.min_token_chars {
                continue;
            }
            if self.stop_words.contains(raw) {
                continue;
            }
            if tokens.iter().any(|t| t == raw) {
                continue;
            }
            tokens.push(raw.to_string());
        }
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn english() -> Tokenizer {
        Tokenizer::new("en", 2)
    }

    #[test]
    fn splits_and_lowercases() {
        let t = english();
        assert_eq!(t.normalize("The cat sat."), vec!["cat", "sat"]);
        assert_eq!(t.normalize("Hello, World!"), vec!["hello", "world"]);
    }

    #[test]
    fn drops_stop_words() {
        let t = english();
        // "the", "of" are stop words; "on" is not.
        assert_eq!(
            t.normalize("The end of the world"),
            vec!["end", "world"]
        );
        assert_eq!(
            t.normalize("The cat sat on the mat."),
            vec!["cat", "sat", "on", "mat"]
        );
    }

    #[test]
    fn drops_short_tokens() {
        let t = english();
        assert_eq!(t.normalize("I a m x here"), vec!["here"]);
    }

    #[test]
    fn deduplicates_preserving_order() {
        let t = english();
        assert_eq!(
            t.normalize("really really long long sentence"),
            vec!["really", "long", "sentence"]
        );
    }

    #[test]
    fn deterministic() {
        let t = english();
        let a = t.normalize("Open the file \"%s\" for writing");
        let b = t.normalize("Open the file \"%s\" for writing");
        assert_eq!(a, b);
    }

    #[test]
    fn empty_and_punctuation_only() {
        let t = english();
        assert!(t.normalize("").is_empty());
        assert!(t.normalize("... !!! ???").is_empty());
        // All stop words.
        assert!(t.normalize("the of a").is_empty());
    }

    #[test]
    fn locale_selects_stop_words() {
        let de = Tokenizer::new("de", 2);
        assert_eq!(de.normalize("der Hund und die Katze"), vec!["hund", "katze"]);
        // "der" is not an English stop word.
        assert_eq!(
            english().normalize("der Hund und die Katze"),
            vec!["der", "hund", "und", "die", "katze"]
        );
    }

    #[test]
    fn region_suffix_ignored() {
        let t = Tokenizer::new("en_US", 2);
        assert_eq!(t.normalize("the cat"), vec!["cat"]);
        let t2 = Tokenizer::new("de-AT", 2);
        assert_eq!(t2.normalize("die Katze"), vec!["katze"]);
    }

    #[test]
    fn unknown_locale_keeps_everything() {
        let t = Tokenizer::new("xx", 2);
        assert_eq!(t.normalize("the cat"), vec!["the", "cat"]);
    }

    #[test]
    fn unicode_case_folding() {
        let t = Tokenizer::new("xx", 2);
        assert_eq!(t.normalize("ÜBER Straße"), vec!["über", "straße"]);
    }
}
