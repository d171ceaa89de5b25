//! Text normalization and exclusion-aware hashing (spec §4.2).

use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;

use crate::error::{Error, Result};

/// A byte range, in NFC-normalized UTF-8 bytes, excluded from a hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExclusionRange {
    pub start: usize,
    pub length: usize,
}

impl ExclusionRange {
    pub fn end(&self) -> usize {
        self.start + self.length
    }
}

/// Outcome of [`hash`]: the normalized text, its raw UTF-8 bytes, and the
/// lowercase hex digest of the filtered bytes.
#[derive(Debug, Clone)]
pub struct HashResult {
    pub normalized: String,
    pub bytes: Vec<u8>,
    pub hex: String,
}

/// NFC-normalize `text`.
pub fn normalize(text: &str) -> String {
    text.nfc().collect()
}

/// UTF-8 bytes of already-normalized text.
pub fn utf8(normalized: &str) -> Vec<u8> {
    normalized.as_bytes().to_vec()
}

fn validate_exclusions(exclusions: &[ExclusionRange], len: usize) -> Result<()> {
    let mut last_end: Option<usize> = None;
    for range in exclusions {
        if range.end() > len {
            return Err(Error::InvalidExclusion(format!(
                "range {{start: {}, length: {}}} exceeds buffer length {len}",
                range.start, range.length
            )));
        }
        if let Some(prev_end) = last_end {
            if range.start < prev_end {
                return Err(Error::InvalidExclusion(
                    "exclusion ranges overlap or are unsorted".to_string(),
                ));
            }
        }
        last_end = Some(range.end());
    }
    Ok(())
}

fn remove_excluded(bytes: &[u8], exclusions: &[ExclusionRange]) -> Vec<u8> {
    if exclusions.is_empty() {
        return bytes.to_vec();
    }
    let mut out = Vec::with_capacity(bytes.len());
    let mut cursor = 0usize;
    for range in exclusions {
        if range.start > cursor {
            out.extend_from_slice(&bytes[cursor..range.start]);
        }
        cursor = range.end();
    }
    if cursor < bytes.len() {
        out.extend_from_slice(&bytes[cursor..]);
    }
    out
}

/// Normalize, encode, exclude, and hash `text`.
///
/// Exclusion ranges must be non-overlapping, sorted ascending by `start`,
/// and within bounds of the normalized UTF-8 byte sequence, or this returns
/// `InvalidExclusion`.
pub fn hash(text: &str, exclusions: &[ExclusionRange]) -> Result<HashResult> {
    let normalized = normalize(text);
    let bytes = utf8(&normalized);
    validate_exclusions(exclusions, bytes.len())?;
    let filtered = remove_excluded(&bytes, exclusions);
    let digest = Sha256::digest(&filtered);
    Ok(HashResult {
        normalized,
        bytes,
        hex: hex::encode(digest),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_exclusions_hash_the_whole_buffer() {
        let r1 = hash("hello", &[]).unwrap();
        let r2 = hash("hello", &[]).unwrap();
        assert_eq!(r1.hex, r2.hex);
    }

    #[test]
    fn excluded_bytes_change_the_digest() {
        let whole = hash("hello world", &[]).unwrap();
        let partial = hash("hello world", &[ExclusionRange { start: 5, length: 6 }]).unwrap();
        assert_ne!(whole.hex, partial.hex);
    }

    #[test]
    fn out_of_bounds_exclusion_is_rejected() {
        let err = hash("hi", &[ExclusionRange { start: 0, length: 100 }]).unwrap_err();
        assert!(matches!(err, Error::InvalidExclusion(_)));
    }

    #[test]
    fn overlapping_exclusions_are_rejected() {
        let err = hash(
            "hello world",
            &[
                ExclusionRange { start: 0, length: 5 },
                ExclusionRange { start: 3, length: 4 },
            ],
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidExclusion(_)));
    }

    #[test]
    fn nfc_normalization_changes_byte_length() {
        // "e" + combining acute accent normalizes to a single precomposed codepoint.
        let decomposed = "e\u{0301}";
        let composed = normalize(decomposed);
        assert_eq!(composed, "\u{00e9}");
        assert!(utf8(&composed).len() < decomposed.as_bytes().len());
    }
}
