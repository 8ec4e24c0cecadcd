//! Byte-pattern and encoding signature catalogue (spec §4.3).
//!
//! Two read-only tables, built once at engine construction and never
//! mutated afterwards — the same "compiled once, queried many times" shape
//! the teacher uses for its `fst::Map`-backed lexicons (`core/src/lib.rs`,
//! `lexicon.rs`), just keyed by byte patterns and codepage names instead of
//! pinyin syllables.

use regex::bytes::Regex as BytesRegex;

use crate::bytebuffer::ByteBuffer;
use crate::crib::Crib;
use crate::error::MagicError;
use crate::scorekit::Score;

/// One row of the file-type signature table.
pub struct FileSignature {
    pub extension: &'static str,
    pub mime: &'static str,
    pub description: &'static str,
    pub offset_min: usize,
    pub offset_max: usize,
    matcher: BytesRegex,
}

/// A detected file type (spec §3 OperationDescriptor-adjacent, §6 `Candidate.detected_type`).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DetectedType {
    pub extension: String,
    pub mime: String,
    pub description: String,
}

/// Result of running one encoding detector against a buffer (spec §4.3).
pub enum EncodingHit {
    Miss,
    Hit { confidence: f64, decoded: String },
}

/// One row of the encoding-signature table: a name plus a detector fn.
pub struct EncodingSignature {
    pub name: &'static str,
    /// Only the brute-force mojibake detectors need the crib/rescoring
    /// path; simple BOM/validity detectors ignore it.
    detect: fn(&ByteBuffer, &Crib) -> EncodingHit,
    /// Detectors gated behind `extensive_language_support` (spec §4.5).
    pub extensive_only: bool,
}

/// A positive encoding detection surfaced on a `Candidate` (spec §6).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EncodingDetection {
    pub name: String,
    pub confidence: f64,
}

/// Read-only catalogue of file-type and encoding signatures.
pub struct SignatureCatalogue {
    file_signatures: Vec<FileSignature>,
    encoding_signatures: Vec<EncodingSignature>,
}

impl SignatureCatalogue {
    /// Compile the built-in catalogue. Fails only if one of the packaged
    /// regex patterns itself fails to compile, which is a fatal startup
    /// error per spec §7/§9 ("catalogue/regex compile errors at startup
    /// are fatal").
    pub fn build() -> Result<Self, MagicError> {
        let mut file_signatures = Vec::new();
        for (pattern, offset_min, offset_max, ext, mime, desc) in FILE_SIGNATURE_ROWS {
            let matcher = BytesRegex::new(pattern).map_err(MagicError::CatalogueCompile)?;
            file_signatures.push(FileSignature {
                extension: ext,
                mime,
                description: desc,
                offset_min: *offset_min,
                offset_max: *offset_max,
                matcher,
            });
        }

        Ok(Self {
            file_signatures,
            encoding_signatures: built_in_encoding_signatures(),
        })
    }

    /// Identify the file type of `buffer`'s leading bytes. Returns the
    /// first match: lowest offset, leftmost in the table as tiebreak
    /// (spec §4.3).
    pub fn identify(&self, buffer: &ByteBuffer) -> Option<DetectedType> {
        let leading = buffer.leading(MAX_SIGNATURE_SCAN_WINDOW);
        let mut best: Option<(usize, &FileSignature)> = None;
        for sig in &self.file_signatures {
            let window_end = leading.len().min(sig.offset_max + 64);
            if sig.offset_min >= window_end {
                continue;
            }
            let window = &leading[sig.offset_min..window_end];
            if let Some(m) = sig.matcher.find(window) {
                let absolute_offset = sig.offset_min + m.start();
                match best {
                    Some((best_offset, _)) if absolute_offset >= best_offset => {}
                    _ => best = Some((absolute_offset, sig)),
                }
            }
        }
        best.map(|(_, sig)| DetectedType {
            extension: sig.extension.to_string(),
            mime: sig.mime.to_string(),
            description: sig.description.to_string(),
        })
    }

    /// Run every encoding detector (plus the extensive set, if enabled)
    /// and return every positive hit, highest confidence first.
    pub fn detect_encodings(
        &self,
        buffer: &ByteBuffer,
        crib: &Crib,
        extensive: bool,
    ) -> Vec<EncodingDetection> {
        let mut hits: Vec<EncodingDetection> = Vec::new();
        for sig in &self.encoding_signatures {
            if sig.extensive_only && !extensive {
                continue;
            }
            if let EncodingHit::Hit { confidence, .. } = (sig.detect)(buffer, crib) {
                hits.push(EncodingDetection {
                    name: sig.name.to_string(),
                    confidence,
                });
            }
        }
        hits.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap());
        hits
    }

    /// Attempt every mojibake codepage transcode and return the decoded
    /// buffers that rescore as "better" (higher `ngram_score`, lower
    /// `chi_squared_english`) than the original — the "Text Encoding Brute
    /// Force" path from spec §4.3/§4.5, used under `intensive`.
    pub fn brute_force_transcodes(
        &self,
        buffer: &ByteBuffer,
        crib: &Crib,
        extensive: bool,
    ) -> Vec<(String, ByteBuffer)> {
        let original_score = Score::compute(buffer, crib);
        let mut out = Vec::new();
        for sig in &self.encoding_signatures {
            if sig.extensive_only && !extensive {
                continue;
            }
            if let EncodingHit::Hit { decoded, .. } = (sig.detect)(buffer, crib) {
                let candidate = ByteBuffer::new(decoded.clone().into_bytes());
                if candidate.as_bytes() == buffer.as_bytes() {
                    continue;
                }
                let candidate_score = Score::compute(&candidate, crib);
                if is_better(&candidate_score, &original_score) {
                    out.push((sig.name.to_string(), candidate));
                }
            }
        }
        out
    }
}

fn is_better(candidate: &Score, original: &Score) -> bool {
    // A transcode that turns invalid UTF-8 into valid UTF-8 is unconditionally
    // worth surfacing — the defining symptom of mojibake is that the bytes
    // don't even decode as text yet. Once both sides are valid UTF-8 (or
    // both invalid), fall back to the English-specific signal; non-English
    // scripts only clear that bar by luck, but the UTF-8 transition above is
    // what spec §4.3's "re-score to decide if a transcode is better" is
    // mainly guarding against.
    if candidate.valid_utf8 != original.valid_utf8 {
        return candidate.valid_utf8;
    }
    candidate.english_ngram_score > original.english_ngram_score
        && candidate.chi_squared_english <= original.chi_squared_english
}

/// Natural-language tag most strongly associated with an encoding/codepage
/// name surfaced by [`SignatureCatalogue::detect_encodings`], for
/// `Score::languages_detected` (spec §3 Score "languages-detected"). BOM
/// and plain-UTF-8 detectors have no single dominant language and return
/// `None`; CP437 is a codepage, not a language, and is excluded too.
pub fn language_tag_for_encoding(name: &str) -> Option<&'static str> {
    match name {
        "Windows-1251" | "KOI8-R" | "ISO-8859-5" => Some("ru"),
        "Windows-1253" => Some("el"),
        "Windows-1250" => Some("pl"),
        "ISO-8859-2" => Some("pl"),
        "ISO-8859-15" => Some("fr"),
        _ => None,
    }
}

const MAX_SIGNATURE_SCAN_WINDOW: usize = 512;

/// `(pattern, offset_min, offset_max, extension, mime, description)`.
///
/// Patterns are byte regexes matched against a window starting at
/// `offset_min`. Ordering matters for the leftmost-tiebreak rule in
/// `identify`.
type FileSignatureRow = (&'static str, usize, usize, &'static str, &'static str, &'static str);

const FILE_SIGNATURE_ROWS: &[FileSignatureRow] = &[
    (r"^\xff\xd8\xff", 0, 0, "jpg", "image/jpeg", "JPEG image"),
    (r"^\x89PNG\r\n\x1a\n", 0, 0, "png", "image/png", "PNG image"),
    (r"^GIF8[79]a", 0, 0, "gif", "image/gif", "GIF image"),
    (r"^%PDF-", 0, 0, "pdf", "application/pdf", "PDF document"),
    (r"^PK\x03\x04", 0, 0, "zip", "application/zip", "ZIP archive"),
    (r"^Rar!\x1a\x07", 0, 0, "rar", "application/x-rar-compressed", "RAR archive"),
    (r"^\x1f\x8b", 0, 0, "gz", "application/gzip", "gzip compressed data"),
    (r"^BZh", 0, 0, "bz2", "application/x-bzip2", "bzip2 compressed data"),
    (r"^\x7fELF", 0, 0, "elf", "application/x-elf", "ELF executable"),
    (r"^MZ", 0, 0, "exe", "application/x-msdownload", "DOS/PE executable"),
    (r"^\xca\xfe\xba\xbe", 0, 0, "class", "application/java-vm", "Java class file"),
    (r"^\x00\x00\x01\x00", 0, 0, "ico", "image/x-icon", "ICO image"),
    (r"^OggS", 0, 0, "ogg", "audio/ogg", "Ogg container"),
    (r"^ID3", 0, 0, "mp3", "audio/mpeg", "MP3 audio (ID3 tag)"),
    (r"(?s)^RIFF....WAVE", 0, 16, "wav", "audio/wav", "WAVE audio"),
    (r"^\{\s*\x22", 0, 4, "json", "application/json", "JSON document"),
];

fn built_in_encoding_signatures() -> Vec<EncodingSignature> {
    vec![
        EncodingSignature { name: "UTF-8 BOM", detect: detect_utf8_bom, extensive_only: false },
        EncodingSignature { name: "UTF-16LE BOM", detect: detect_utf16le_bom, extensive_only: false },
        EncodingSignature { name: "UTF-16BE BOM", detect: detect_utf16be_bom, extensive_only: false },
        EncodingSignature { name: "UTF-8 (no BOM)", detect: detect_plain_utf8, extensive_only: false },
        EncodingSignature { name: "Windows-1251", detect: detect_windows1251, extensive_only: false },
        EncodingSignature { name: "Windows-1252", detect: detect_windows1252, extensive_only: false },
        EncodingSignature { name: "ISO-8859-1", detect: detect_iso8859_1, extensive_only: false },
        EncodingSignature { name: "ISO-8859-2", detect: detect_iso8859_2, extensive_only: false },
        EncodingSignature { name: "CP437", detect: detect_cp437, extensive_only: false },
        EncodingSignature { name: "KOI8-R", detect: detect_koi8_r, extensive_only: true },
        EncodingSignature { name: "Windows-1250", detect: detect_windows1250, extensive_only: true },
        EncodingSignature { name: "Windows-1253", detect: detect_windows1253, extensive_only: true },
        EncodingSignature { name: "ISO-8859-5", detect: detect_iso8859_5, extensive_only: true },
        EncodingSignature { name: "ISO-8859-15", detect: detect_iso8859_15, extensive_only: true },
    ]
}

fn detect_utf8_bom(buffer: &ByteBuffer, _crib: &Crib) -> EncodingHit {
    let bytes = buffer.as_bytes();
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        let decoded = String::from_utf8_lossy(&bytes[3..]).into_owned();
        EncodingHit::Hit { confidence: 1.0, decoded }
    } else {
        EncodingHit::Miss
    }
}

fn detect_utf16le_bom(buffer: &ByteBuffer, _crib: &Crib) -> EncodingHit {
    let bytes = buffer.as_bytes();
    if bytes.starts_with(&[0xFF, 0xFE]) {
        let decoded = decode_utf16(&bytes[2..], false);
        EncodingHit::Hit { confidence: 1.0, decoded }
    } else {
        EncodingHit::Miss
    }
}

fn detect_utf16be_bom(buffer: &ByteBuffer, _crib: &Crib) -> EncodingHit {
    let bytes = buffer.as_bytes();
    if bytes.starts_with(&[0xFE, 0xFF]) {
        let decoded = decode_utf16(&bytes[2..], true);
        EncodingHit::Hit { confidence: 1.0, decoded }
    } else {
        EncodingHit::Miss
    }
}

fn decode_utf16(bytes: &[u8], big_endian: bool) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| {
            if big_endian {
                u16::from_be_bytes([c[0], c[1]])
            } else {
                u16::from_le_bytes([c[0], c[1]])
            }
        })
        .collect();
    String::from_utf16_lossy(&units)
}

fn detect_plain_utf8(buffer: &ByteBuffer, _crib: &Crib) -> EncodingHit {
    if !buffer.is_empty() && buffer.is_valid_utf8() {
        EncodingHit::Hit {
            confidence: 0.5,
            decoded: buffer.try_as_utf8().unwrap_or("").to_string(),
        }
    } else {
        EncodingHit::Miss
    }
}

/// Builds a mojibake detector: decode every byte through `decode_byte`
/// and hand the result to the caller as a Hit for rescoring. Confidence
/// is a placeholder; `brute_force_transcodes` is what actually decides
/// whether the transcode is worth keeping, via `is_better`.
fn mojibake_detect(buffer: &ByteBuffer, decode_byte: impl Fn(u8) -> char) -> EncodingHit {
    if buffer.is_empty() {
        return EncodingHit::Miss;
    }
    let decoded: String = buffer.as_bytes().iter().map(|&b| decode_byte(b)).collect();
    EncodingHit::Hit { confidence: 0.3, decoded }
}

fn detect_windows1251(buffer: &ByteBuffer, _crib: &Crib) -> EncodingHit {
    decode_with_encoding_rs(buffer, encoding_rs::WINDOWS_1251)
}

fn detect_windows1252(buffer: &ByteBuffer, _crib: &Crib) -> EncodingHit {
    decode_with_encoding_rs(buffer, encoding_rs::WINDOWS_1252)
}

fn detect_windows1250(buffer: &ByteBuffer, _crib: &Crib) -> EncodingHit {
    decode_with_encoding_rs(buffer, encoding_rs::WINDOWS_1250)
}

fn detect_windows1253(buffer: &ByteBuffer, _crib: &Crib) -> EncodingHit {
    decode_with_encoding_rs(buffer, encoding_rs::WINDOWS_1253)
}

fn detect_iso8859_2(buffer: &ByteBuffer, _crib: &Crib) -> EncodingHit {
    decode_with_encoding_rs(buffer, encoding_rs::ISO_8859_2)
}

fn detect_iso8859_5(buffer: &ByteBuffer, _crib: &Crib) -> EncodingHit {
    decode_with_encoding_rs(buffer, encoding_rs::ISO_8859_5)
}

fn detect_iso8859_15(buffer: &ByteBuffer, _crib: &Crib) -> EncodingHit {
    decode_with_encoding_rs(buffer, encoding_rs::ISO_8859_15)
}

fn detect_koi8_r(buffer: &ByteBuffer, _crib: &Crib) -> EncodingHit {
    decode_with_encoding_rs(buffer, encoding_rs::KOI8_R)
}

fn decode_with_encoding_rs(buffer: &ByteBuffer, encoding: &'static encoding_rs::Encoding) -> EncodingHit {
    if buffer.is_empty() {
        return EncodingHit::Miss;
    }
    let (decoded, _, had_errors) = encoding.decode(buffer.as_bytes());
    if had_errors {
        return EncodingHit::Miss;
    }
    EncodingHit::Hit { confidence: 0.3, decoded: decoded.into_owned() }
}

/// ISO-8859-1 is the identity mapping from byte value to Unicode scalar
/// value for 0x00-0xFF; `encoding_rs` deliberately doesn't expose it as a
/// distinct label (it treats "ISO-8859-1" labels as Windows-1252 per the
/// WHATWG encoding standard), so the true Latin-1 mapping is done by hand.
fn detect_iso8859_1(buffer: &ByteBuffer, _crib: &Crib) -> EncodingHit {
    mojibake_detect(buffer, |b| b as char)
}

/// Code page 437 (original IBM PC), for the `CP437` detector spec §4.3
/// names explicitly. Not part of the WHATWG encoding standard, so not in
/// `encoding_rs`; table below covers the high half (0x80-0xFF), the low
/// half is ASCII-identical.
fn detect_cp437(buffer: &ByteBuffer, _crib: &Crib) -> EncodingHit {
    mojibake_detect(buffer, cp437_to_char)
}

fn cp437_to_char(byte: u8) -> char {
    if byte < 0x80 {
        return byte as char;
    }
    CP437_HIGH_HALF[(byte - 0x80) as usize]
}

#[rustfmt::skip]
const CP437_HIGH_HALF: [char; 128] = [
    'Ç','ü','é','â','ä','à','å','ç','ê','ë','è','ï','î','ì','Ä','Å',
    'É','æ','Æ','ô','ö','ò','û','ù','ÿ','Ö','Ü','¢','£','¥','₧','ƒ',
    'á','í','ó','ú','ñ','Ñ','ª','º','¿','⌐','¬','½','¼','¡','«','»',
    '░','▒','▓','│','┤','╡','╢','╖','╕','╣','║','╗','╝','╜','╛','┐',
    '└','┴','┬','├','─','┼','╞','╟','╚','╔','╩','╦','╠','═','╬','╧',
    '╨','╤','╥','╙','╘','╒','╓','╫','╪','┘','┌','█','▄','▌','▐','▀',
    'α','ß','Γ','π','Σ','σ','µ','τ','Φ','Θ','Ω','δ','∞','φ','ε','∩',
    '≡','±','≥','≤','⌠','⌡','÷','≈','°','∙','·','√','ⁿ','²','■','\u{00A0}',
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifies_jpeg_header() {
        let cat = SignatureCatalogue::build().unwrap();
        let buf = ByteBuffer::new(vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10]);
        let detected = cat.identify(&buf).expect("jpeg detected");
        assert_eq!(detected.mime, "image/jpeg");
    }

    #[test]
    fn identifies_png_header() {
        let cat = SignatureCatalogue::build().unwrap();
        let buf = ByteBuffer::new(vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]);
        let detected = cat.identify(&buf).expect("png detected");
        assert_eq!(detected.extension, "png");
    }

    #[test]
    fn no_signature_matches_plain_text() {
        let cat = SignatureCatalogue::build().unwrap();
        let buf = ByteBuffer::new(b"just some ordinary text".to_vec());
        assert!(cat.identify(&buf).is_none());
    }

    #[test]
    fn utf8_bom_is_detected() {
        let cat = SignatureCatalogue::build().unwrap();
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"hello");
        let buf = ByteBuffer::new(bytes);
        let crib = Crib::new();
        let hits = cat.detect_encodings(&buf, &crib, false);
        assert!(hits.iter().any(|h| h.name == "UTF-8 BOM"));
    }

    #[test]
    fn windows1251_mojibake_rescoring_prefers_cyrillic() {
        let cat = SignatureCatalogue::build().unwrap();
        let crib = Crib::new();
        // "Привет" (hello) encoded as Windows-1251 bytes.
        let cyrillic_bytes: &[u8] = &[0xCF, 0xF0, 0xE8, 0xE2, 0xE5, 0xF2];
        let buf = ByteBuffer::new(cyrillic_bytes.to_vec());
        let transcodes = cat.brute_force_transcodes(&buf, &crib, true);
        let names: Vec<&String> = transcodes.iter().map(|(n, _)| n).collect();
        assert!(
            transcodes.iter().any(|(name, _)| name == "Windows-1251"),
            "expected a Windows-1251 transcode, got {names:?}"
        );
    }

    #[test]
    fn extensive_only_detectors_gated_by_flag() {
        let cat = SignatureCatalogue::build().unwrap();
        let crib = Crib::new();
        let buf = ByteBuffer::new(b"hello".to_vec());
        let hits_basic = cat.detect_encodings(&buf, &crib, false);
        assert!(!hits_basic.iter().any(|h| h.name == "KOI8-R"));
    }

    #[test]
    fn language_tag_for_encoding_maps_known_codepages() {
        assert_eq!(language_tag_for_encoding("Windows-1251"), Some("ru"));
        assert_eq!(language_tag_for_encoding("KOI8-R"), Some("ru"));
        assert_eq!(language_tag_for_encoding("Windows-1253"), Some("el"));
        assert_eq!(language_tag_for_encoding("UTF-8 BOM"), None);
        assert_eq!(language_tag_for_encoding("CP437"), None);
    }
}
