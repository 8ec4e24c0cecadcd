//! Pure statistical scoring functions over a [`ByteBuffer`] (spec §4.2).
//!
//! Every function here is O(n) in the buffer length and has no side
//! effects — the same shape as the teacher's `NGramModel::score_sequence`
//! and the `counts_to_*_logprob` helpers in `core/src/ngram.rs`, just
//! operating on raw bytes instead of tokenized Chinese phrases.

use crate::bytebuffer::ByteBuffer;
use crate::crib::{Crib, ENGLISH_LETTER_FREQ};

/// A detected natural-language tag with a confidence in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LanguageMatch {
    pub language_tag: String,
    pub confidence: f64,
}

/// Aggregate score for one buffer (spec §3 "Score").
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Score {
    pub entropy: f64,
    pub chi_squared_english: f64,
    pub printable_fraction: f64,
    pub valid_utf8: bool,
    pub english_ngram_score: f64,
    pub matches_target: bool,
    /// Languages detected on this buffer, highest confidence first.
    /// `Score::compute` always leaves this empty — language detection is
    /// driven by [`crate::signature::SignatureCatalogue`]'s encoding
    /// detectors, which `compute` has no access to. `MagicEngine` fills
    /// this in per final candidate from its own encoding-detection pass
    /// (spec §4.5 `extensive_language_support`, §6 `Candidate`).
    pub languages_detected: Vec<LanguageMatch>,
}

impl Score {
    /// Compute every component for `buffer` against `crib`. `languages_detected`
    /// is left empty here; see the field's doc comment.
    pub fn compute(buffer: &ByteBuffer, crib: &Crib) -> Self {
        let valid_utf8 = buffer.is_valid_utf8();
        let text = buffer.try_as_utf8().unwrap_or("");
        Score {
            entropy: entropy(buffer),
            chi_squared_english: chi_squared_english(buffer),
            printable_fraction: printable_fraction(buffer),
            valid_utf8,
            english_ngram_score: if valid_utf8 { crib.ngram_score(text) } else { 0.0 },
            matches_target: valid_utf8 && crib.matches_target(text),
            languages_detected: Vec::new(),
        }
    }

    /// The weighted rank used to order candidates; lower is "more
    /// interesting" (spec §4.2).
    pub fn rank(&self) -> f64 {
        if self.matches_target {
            // matches_target dominates: force this node to sort ahead of
            // everything that doesn't match, regardless of other components.
            return f64::NEG_INFINITY;
        }
        weighted_rank(
            self.chi_squared_english,
            self.printable_fraction,
            self.english_ngram_score,
            self.entropy,
            self.matches_target,
            self.valid_utf8,
        )
    }

    /// The "interesting?" verdict (spec §4.2).
    pub fn is_interesting(&self) -> bool {
        if self.matches_target {
            return true;
        }
        self.valid_utf8
            && self.printable_fraction >= PRINTABLE_THRESHOLD
            && self.chi_squared_english <= CHI_SQUARED_ENGLISH_THRESHOLD
            && self.english_ngram_score >= NGRAM_SCORE_THRESHOLD
    }
}

// --- Fixed weights and thresholds (spec §6, §9 open question: these are
// implicit in the source and must be named constants here, tuned against
// the scenarios in spec §8). ---

/// Weight on `chi_squared_english` in the rank formula.
pub const W1_CHI_SQUARED: f64 = 1.0;
/// Weight on `printable_fraction`.
pub const W2_PRINTABLE: f64 = 20.0;
/// Weight on `english_ngram_score`.
pub const W3_NGRAM: f64 = 2.0;
/// Weight on `|entropy - 4.5|`.
pub const W4_ENTROPY_DISTANCE: f64 = 1.0;
/// Weight (additive bonus, applied as subtraction) for `matches_target`.
pub const W5_MATCHES_TARGET: f64 = 1_000_000.0;
/// Weight (additive bonus, applied as subtraction) for `valid_utf8`.
pub const W6_VALID_UTF8: f64 = 5.0;

/// Midpoint entropy (bits/byte) that scoring treats as "neither clearly
/// structured nor clearly encrypted/compressed".
pub const ENTROPY_MIDPOINT: f64 = 4.5;

/// Threshold Tχ: chi-squared at or below this is "English-like enough".
pub const CHI_SQUARED_ENGLISH_THRESHOLD: f64 = 50.0;
/// Threshold Tn: ngram score at or above this is "English-like enough".
pub const NGRAM_SCORE_THRESHOLD: f64 = 1.0;
/// Threshold for `printable_fraction` in the "interesting" predicate.
pub const PRINTABLE_THRESHOLD: f64 = 0.9;

#[allow(clippy::too_many_arguments)]
fn weighted_rank(
    chi_squared_english: f64,
    printable_fraction: f64,
    ngram_score: f64,
    entropy: f64,
    matches_target: bool,
    valid_utf8: bool,
) -> f64 {
    let chi = if chi_squared_english.is_finite() {
        chi_squared_english
    } else {
        // Infinite chi-squared (no letters at all) sorts last, per spec §4.5,
        // unless matches_target is true (handled by the caller before this
        // function is ever reached for that case).
        return f64::INFINITY;
    };

    W1_CHI_SQUARED * chi - W2_PRINTABLE * printable_fraction - W3_NGRAM * ngram_score
        + W4_ENTROPY_DISTANCE * (entropy - ENTROPY_MIDPOINT).abs()
        - W5_MATCHES_TARGET * (matches_target as u8 as f64)
        - W6_VALID_UTF8 * (valid_utf8 as u8 as f64)
}

/// Shannon entropy of the byte histogram, in bits. Range `[0, 8]`.
/// Empty buffer yields 0.
pub fn entropy(buffer: &ByteBuffer) -> f64 {
    let bytes = buffer.as_bytes();
    if bytes.is_empty() {
        return 0.0;
    }
    let mut counts = [0u64; 256];
    for &b in bytes {
        counts[b as usize] += 1;
    }
    let len = bytes.len() as f64;
    let mut h = 0.0;
    for &c in counts.iter() {
        if c == 0 {
            continue;
        }
        let p = c as f64 / len;
        h -= p * p.log2();
    }
    h
}

/// Chi-squared statistic of the case-folded A-Z letter histogram against
/// the fixed English letter-frequency table. Non-letter bytes are ignored.
/// `+inf` if the buffer contains no ASCII letters (spec §4.2).
pub fn chi_squared_english(buffer: &ByteBuffer) -> f64 {
    let mut counts = [0u64; 26];
    let mut total: u64 = 0;
    for &b in buffer.as_bytes() {
        if b.is_ascii_alphabetic() {
            let idx = (b.to_ascii_uppercase() - b'A') as usize;
            counts[idx] += 1;
            total += 1;
        }
    }
    if total == 0 {
        return f64::INFINITY;
    }
    let total = total as f64;
    let mut chi = 0.0;
    for (observed, expected_freq) in counts.iter().zip(ENGLISH_LETTER_FREQ.iter()) {
        let expected = expected_freq * total;
        if expected > 0.0 {
            let diff = *observed as f64 - expected;
            chi += diff * diff / expected;
        }
    }
    chi
}

/// Fraction of bytes in the printable ranges `0x09-0x0D` and `0x20-0x7E`.
pub fn printable_fraction(buffer: &ByteBuffer) -> f64 {
    let bytes = buffer.as_bytes();
    if bytes.is_empty() {
        return 0.0;
    }
    let printable = bytes
        .iter()
        .filter(|&&b| (0x09..=0x0D).contains(&b) || (0x20..=0x7E).contains(&b))
        .count();
    printable as f64 / bytes.len() as f64
}

/// Whether the buffer is valid UTF-8.
pub fn valid_utf8(buffer: &ByteBuffer) -> bool {
    buffer.is_valid_utf8()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entropy_of_empty_is_zero() {
        assert_eq!(entropy(&ByteBuffer::new(Vec::new())), 0.0);
    }

    #[test]
    fn entropy_of_constant_buffer_is_zero() {
        let b = ByteBuffer::new(vec![b'a'; 100]);
        assert_eq!(entropy(&b), 0.0);
    }

    #[test]
    fn entropy_of_uniform_bytes_is_near_eight() {
        let bytes: Vec<u8> = (0..=255u8).collect();
        let b = ByteBuffer::new(bytes);
        let h = entropy(&b);
        assert!((h - 8.0).abs() < 1e-9, "entropy = {h}");
    }

    #[test]
    fn chi_squared_no_letters_is_infinite() {
        let b = ByteBuffer::new(vec![0, 1, 2, 3]);
        assert!(chi_squared_english(&b).is_infinite());
    }

    #[test]
    fn chi_squared_lower_for_english_like_text() {
        let english = ByteBuffer::new(b"the quick brown fox jumps over the lazy dog".to_vec());
        let skewed = ByteBuffer::new(b"zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz".to_vec());
        assert!(chi_squared_english(&english) < chi_squared_english(&skewed));
    }

    #[test]
    fn printable_fraction_bounds() {
        let all_printable = ByteBuffer::new(b"hello world".to_vec());
        assert_eq!(printable_fraction(&all_printable), 1.0);
        let all_binary = ByteBuffer::new(vec![0x00, 0x01, 0x02, 0xff]);
        assert_eq!(printable_fraction(&all_binary), 0.0);
    }

    #[test]
    fn matches_target_forces_negative_infinite_rank() {
        let crib = Crib::with_target("ABCDE").unwrap();
        let buf = ByteBuffer::new(b"ABCDE".to_vec());
        let score = Score::compute(&buf, &crib);
        assert!(score.matches_target);
        assert_eq!(score.rank(), f64::NEG_INFINITY);
        assert!(score.is_interesting());
    }

    #[test]
    fn interesting_requires_all_conditions_without_target() {
        let crib = Crib::new();
        let plain_english =
            ByteBuffer::new(b"the quick brown fox jumps over the lazy dog".to_vec());
        let score = Score::compute(&plain_english, &crib);
        assert!(score.valid_utf8);
        assert!(score.printable_fraction >= PRINTABLE_THRESHOLD);

        let binary = ByteBuffer::new(vec![0xde, 0xad, 0xbe, 0xef, 0x00, 0xff]);
        let binary_score = Score::compute(&binary, &crib);
        assert!(!binary_score.is_interesting());
    }
}
