//! Variation-selector byte codec (spec §4.1).
//!
//! A bijection between byte values `0..=255` and two disjoint ranges of
//! Unicode variation selectors, plus a linear scanning primitive used by the
//! wrapper codec and the legacy extractor.

/// First variation-selector range: bytes `0..=15`.
pub const VS_START: u32 = 0xFE00;
pub const VS_END: u32 = 0xFE0F;
/// Second ("supplementary") variation-selector range: bytes `16..=255`.
pub const VS_SUP_START: u32 = 0xE0100;
pub const VS_SUP_END: u32 = 0xE01EF;

/// Encode a byte as its variation-selector scalar.
pub fn to_selector(byte: u8) -> char {
    if byte <= 15 {
        char::from_u32(VS_START + byte as u32).expect("VS range is valid scalar range")
    } else {
        char::from_u32(VS_SUP_START + (byte as u32) - 16).expect("VS-SUP range is valid scalar range")
    }
}

/// Decode a scalar back into its byte, or `None` if it isn't a variation
/// selector at all.
pub fn from_selector(c: char) -> Option<u8> {
    let code = c as u32;
    if (VS_START..=VS_END).contains(&code) {
        Some((code - VS_START) as u8)
    } else if (VS_SUP_START..=VS_SUP_END).contains(&code) {
        Some(((code - VS_SUP_START) + 16) as u8)
    } else {
        None
    }
}

/// The result of scanning a run of contiguous variation selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectorRun {
    /// Byte offset in the source text where the run starts.
    pub start: usize,
    /// Byte offset just past the last selector in the run.
    pub end: usize,
    /// Number of selector scalars in the run.
    pub count: usize,
}

impl SelectorRun {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Scan `text[start..]` for the largest contiguous prefix made entirely of
/// variation selectors. Linear in the remaining text length; no allocation.
pub fn read_selector_run(text: &str, start: usize) -> SelectorRun {
    let mut count = 0usize;
    let mut end = start;
    for (offset, c) in text[start..].char_indices() {
        if from_selector(c).is_some() {
            count += 1;
            end = start + offset + c.len_utf8();
        } else {
            break;
        }
    }
    SelectorRun { start, end, count }
}

/// Decode a run of selector scalars (as produced by [`read_selector_run`])
/// back into the byte string they carry.
pub fn decode_run(text: &str, run: SelectorRun) -> Vec<u8> {
    text[run.start..run.end]
        .chars()
        .filter_map(from_selector)
        .collect()
}

/// Encode a byte slice as a string of variation selectors, in order.
pub fn encode_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        out.push(to_selector(b));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_byte() {
        for b in 0..=255u8 {
            let c = to_selector(b);
            assert_eq!(from_selector(c), Some(b), "byte {b} did not round-trip");
        }
    }

    #[test]
    fn non_selector_scalars_are_rejected() {
        assert_eq!(from_selector('a'), None);
        assert_eq!(from_selector('\u{FEFF}'), None);
        assert_eq!(from_selector('\u{E0000}'), None);
    }

    #[test]
    fn read_selector_run_stops_at_first_non_selector() {
        let encoded = encode_bytes(&[1, 2, 3]);
        let text = format!("{encoded}x");
        let run = read_selector_run(&text, 0);
        assert_eq!(run.count, 3);
        assert_eq!(decode_run(&text, run), vec![1, 2, 3]);
    }

    #[test]
    fn read_selector_run_on_plain_text_is_empty() {
        let run = read_selector_run("hello", 0);
        assert!(run.is_empty());
    }
}
