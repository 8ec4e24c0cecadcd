//! Natural-language scoring resources (spec §2 item 5, §4.2, §6).
//!
//! `Crib` packages the fixed English reference tables the core ships with
//! (byte-frequency table, bigrams/trigrams with log-likelihoods, a common
//! word list) plus the one thing a caller can configure: the target regex
//! that defines `matches_target`.
//!
//! The reference tables are modelled the same way the teacher's `NGramModel`
//! models unigram/bigram/trigram log-probabilities (`core/src/ngram.rs`),
//! generalized from Chinese tokens to English letter n-grams, and the common
//! word list is held in an `fst::Set` the way the teacher holds compact
//! lookup structures in `fst::Map` (`core/src/lib.rs`, `interpolation.rs`).

use fst::{IntoStreamer, Set, Streamer};
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// English letter frequencies, A-Z, summing to 1.0.
///
/// Source: standard published English letter-frequency table (Lewand).
pub const ENGLISH_LETTER_FREQ: [f64; 26] = [
    0.08167, 0.01492, 0.02782, 0.04253, 0.12702, 0.02228, 0.02015, 0.06094, 0.06966, 0.00153,
    0.00772, 0.04025, 0.02406, 0.06749, 0.07507, 0.01929, 0.00095, 0.05987, 0.06327, 0.09056,
    0.02758, 0.00978, 0.02360, 0.00150, 0.01974, 0.00074,
];

/// A handful of common English bigrams with natural-log likelihoods.
///
/// Values are illustrative relative weights (more common => less negative),
/// enough to separate "looks like English" from "looks random" the way
/// spec §4.2's `ngram_score` requires; they are not derived from a corpus
/// frequency count.
pub const ENGLISH_BIGRAMS: &[(&str, f64)] = &[
    ("th", -1.0), ("he", -1.1), ("in", -1.3), ("er", -1.3), ("an", -1.4),
    ("re", -1.5), ("on", -1.5), ("at", -1.6), ("en", -1.6), ("nd", -1.7),
    ("ti", -1.7), ("es", -1.7), ("or", -1.8), ("te", -1.8), ("of", -1.8),
    ("ed", -1.9), ("is", -1.9), ("it", -1.9), ("al", -2.0), ("ar", -2.0),
    ("st", -2.0), ("to", -2.0), ("nt", -2.1), ("ng", -2.1), ("se", -2.1),
    ("ha", -2.1), ("as", -2.2), ("ou", -2.2), ("io", -2.2), ("le", -2.2),
    ("ve", -2.2), ("co", -2.3), ("me", -2.3), ("de", -2.3), ("hi", -2.3),
    ("ri", -2.3), ("ro", -2.3), ("ic", -2.4), ("ne", -2.4), ("ea", -2.4),
    ("ra", -2.4), ("ce", -2.4), ("li", -2.4), ("ch", -2.5), ("ll", -2.5),
    ("be", -2.5), ("ma", -2.5), ("si", -2.5), ("om", -2.5), ("ur", -2.5),
];

/// A handful of common English trigrams with natural-log likelihoods.
pub const ENGLISH_TRIGRAMS: &[(&str, f64)] = &[
    ("the", -0.5), ("and", -0.9), ("ing", -1.0), ("ent", -1.4), ("ion", -1.4),
    ("her", -1.5), ("for", -1.5), ("tha", -1.6), ("nth", -1.6), ("int", -1.7),
    ("ere", -1.7), ("tio", -1.7), ("ter", -1.7), ("est", -1.8), ("ers", -1.8),
    ("ati", -1.8), ("hat", -1.8), ("ate", -1.9), ("all", -1.9), ("eth", -1.9),
    ("hes", -1.9), ("ver", -1.9), ("his", -2.0), ("oft", -2.0), ("ith", -2.0),
    ("fth", -2.0), ("sth", -2.0), ("oth", -2.0), ("res", -2.1), ("ont", -2.1),
];

/// A short list of common English words used for a coarse "does this look
/// like prose" signal, separate from the bigram/trigram log-likelihood sum.
pub const COMMON_WORDS: &[&str] = &[
    "the", "be", "to", "of", "and", "a", "in", "that", "have", "it", "for",
    "not", "on", "with", "he", "as", "you", "do", "at", "this", "but", "his",
    "by", "from", "they", "we", "say", "her", "she", "or", "an", "will",
    "my", "one", "all", "would", "there", "their", "what", "so", "up",
    "out", "if", "about", "who", "get", "which", "go", "me",
];

/// Natural-language scoring resources plus the caller-supplied target regex.
///
/// Construction can fail only if the caller-supplied regex does not
/// compile (spec §7: a configuration error, fatal before expansion starts).
pub struct Crib {
    target: Option<Regex>,
    common_words: Set<Vec<u8>>,
}

impl Crib {
    /// Build a crib with no target regex.
    pub fn new() -> Self {
        Self {
            target: None,
            common_words: build_common_word_set(),
        }
    }

    /// Build a crib with a caller-supplied target regex (spec §4.5
    /// `crib_regex`). Returns an error if the pattern does not compile.
    pub fn with_target(pattern: &str) -> Result<Self, regex::Error> {
        let target = Regex::new(pattern)?;
        Ok(Self {
            target: Some(target),
            common_words: build_common_word_set(),
        })
    }

    pub fn has_target(&self) -> bool {
        self.target.is_some()
    }

    /// True iff the target regex matches somewhere in `text`.
    ///
    /// Always false when no target regex was configured.
    pub fn matches_target(&self, text: &str) -> bool {
        self.target.as_ref().is_some_and(|re| re.is_match(text))
    }

    /// Sum of log-likelihoods of recognized English bigrams/trigrams
    /// present in `text` (spec §4.2 `ngram_score`). Zero if `text` contains
    /// none of the catalogued n-grams.
    pub fn ngram_score(&self, text: &str) -> f64 {
        // NFC-normalize first so combining-mark sequences (e.g. a decomposed
        // "é") collapse to their precomposed form before we throw away
        // everything outside ASCII a-z; decomposed Latin text would
        // otherwise lose letters the composed form would have kept.
        let normalized: String = text.nfc().collect();
        let lower: Vec<u8> = normalized
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .map(|c| c.to_ascii_lowercase() as u8)
            .collect();
        if lower.len() < 2 {
            return 0.0;
        }

        let mut score = 0.0;
        for window in lower.windows(2) {
            if let Ok(s) = std::str::from_utf8(window) {
                if let Some((_, logp)) = ENGLISH_BIGRAMS.iter().find(|(g, _)| *g == s) {
                    score += logp;
                }
            }
        }
        for window in lower.windows(3) {
            if let Ok(s) = std::str::from_utf8(window) {
                if let Some((_, logp)) = ENGLISH_TRIGRAMS.iter().find(|(g, _)| *g == s) {
                    score += logp;
                }
            }
        }
        // ngram_score is defined non-negative in spec §4.2; the catalogue
        // stores log-likelihoods as negative numbers (less negative = more
        // English-like), so we negate the accumulated sum.
        -score
    }

    /// Fraction of whitespace-separated tokens in `text` that are in the
    /// common-word list. Used as a coarse plausibility signal alongside
    /// `ngram_score`.
    pub fn common_word_fraction(&self, text: &str) -> f64 {
        let normalized: String = text.nfc().collect();
        let tokens: Vec<String> = normalized
            .split(|c: char| !c.is_ascii_alphabetic())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_ascii_lowercase())
            .collect();
        if tokens.is_empty() {
            return 0.0;
        }
        let hits = tokens
            .iter()
            .filter(|t| self.common_words.contains(t.as_bytes()))
            .count();
        hits as f64 / tokens.len() as f64
    }

    /// All common words, for diagnostics/tests.
    pub fn common_words(&self) -> Vec<String> {
        let mut stream = self.common_words.stream();
        let mut out = Vec::new();
        while let Some(key) = stream.next() {
            out.push(String::from_utf8_lossy(key).into_owned());
        }
        out
    }
}

impl Default for Crib {
    fn default() -> Self {
        Self::new()
    }
}

fn build_common_word_set() -> Set<Vec<u8>> {
    let mut words: Vec<&str> = COMMON_WORDS.to_vec();
    words.sort_unstable();
    words.dedup();
    Set::from_iter(words).expect("static common-word list is sorted and deduplicated")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn english_letter_freq_sums_to_one() {
        let total: f64 = ENGLISH_LETTER_FREQ.iter().sum();
        assert!((total - 1.0).abs() < 1e-3, "total = {total}");
    }

    #[test]
    fn ngram_score_prefers_english_text() {
        let crib = Crib::new();
        let english = crib.ngram_score("the quick brown fox jumps over the lazy dog");
        let random = crib.ngram_score("qzxjkv wplfm zzxq");
        assert!(english > random, "english={english} random={random}");
    }

    #[test]
    fn matches_target_requires_configured_regex() {
        let none = Crib::new();
        assert!(!none.matches_target("anything"));

        let with = Crib::with_target("secret-\\d+").unwrap();
        assert!(with.matches_target("found secret-42 here"));
        assert!(!with.matches_target("nothing here"));
    }

    #[test]
    fn bad_target_regex_is_an_error() {
        assert!(Crib::with_target("(unclosed").is_err());
    }

    #[test]
    fn common_word_fraction() {
        let crib = Crib::new();
        let frac = crib.common_word_fraction("the cat is on the mat");
        assert!(frac > 0.5, "frac = {frac}");
        let frac_random = crib.common_word_fraction("xq zzt vwp");
        assert_eq!(frac_random, 0.0);
    }
}
