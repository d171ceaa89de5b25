//! Wire encoding for the two legacy (non-C2PA) payload carriers.
//!
//! Unlike the C2PA wrapper, a legacy blob has no FEFF sentinel requirement
//! — the "end-of-text-with-FEFF-prefix" site target is just one of several
//! placement policies (§4.6). Instead the blob carries its own magic so the
//! legacy extractor can recognize a selector run as "one of ours" wherever
//! it finds one.

use crate::error::{Error, Result};
use crate::selector;
use crate::signer::LegacyEnvelope;

const LEGACY_MAGIC: &[u8; 4] = b"ECXT";

fn format_code(format_tag: &str) -> Result<u8> {
    match format_tag {
        "basic" => Ok(0),
        "manifest-json" => Ok(1),
        "manifest-cbor" => Ok(2),
        other => Err(Error::UnsupportedFormat(other.to_string())),
    }
}

fn format_tag_from_code(code: u8) -> Result<&'static str> {
    match code {
        0 => Ok("basic"),
        1 => Ok("manifest-json"),
        2 => Ok("manifest-cbor"),
        other => Err(Error::MalformedEnvelope(format!("unknown format code {other}"))),
    }
}

/// Encode a signed legacy envelope into the raw byte blob carried by
/// variation selectors.
pub fn encode(envelope: &LegacyEnvelope) -> Result<Vec<u8>> {
    if envelope.signer_id.len() > u16::MAX as usize {
        return Err(Error::InvalidInput("signer id too long".to_string()));
    }
    if envelope.payload_bytes.len() > u32::MAX as usize {
        return Err(Error::InvalidInput("payload too long".to_string()));
    }
    let mut out = Vec::new();
    out.extend_from_slice(LEGACY_MAGIC);
    out.push(format_code(&envelope.format_tag)?);
    out.extend_from_slice(&(envelope.signer_id.len() as u16).to_be_bytes());
    out.extend_from_slice(envelope.signer_id.as_bytes());
    out.extend_from_slice(&(envelope.payload_bytes.len() as u32).to_be_bytes());
    out.extend_from_slice(&envelope.payload_bytes);
    out.extend_from_slice(&envelope.signature);
    Ok(out)
}

/// Decode a legacy byte blob back into its envelope. Returns `None` if the
/// bytes don't start with the legacy magic at all (the caller's job to
/// decide whether that means "not our payload" vs. a hard error).
pub fn decode(bytes: &[u8]) -> Result<LegacyEnvelope> {
    if bytes.len() < 4 || &bytes[0..4] != LEGACY_MAGIC {
        return Err(Error::MalformedEnvelope("missing legacy magic".to_string()));
    }
    let mut cursor = 4usize;
    let format_tag = format_tag_from_code(*bytes.get(cursor).ok_or_else(too_short)?)?;
    cursor += 1;

    let signer_id_len = read_u16(bytes, cursor)? as usize;
    cursor += 2;
    let signer_id_bytes = bytes
        .get(cursor..cursor + signer_id_len)
        .ok_or_else(too_short)?;
    let signer_id = String::from_utf8(signer_id_bytes.to_vec())
        .map_err(|_| Error::MalformedEnvelope("signer id is not UTF-8".to_string()))?;
    cursor += signer_id_len;

    let payload_len = read_u32(bytes, cursor)? as usize;
    cursor += 4;
    let payload_bytes = bytes
        .get(cursor..cursor + payload_len)
        .ok_or_else(too_short)?
        .to_vec();
    cursor += payload_len;

    let signature = bytes.get(cursor..).ok_or_else(too_short)?.to_vec();
    if signature.len() != 64 {
        return Err(Error::MalformedEnvelope(format!(
            "signature is {} bytes, expected 64",
            signature.len()
        )));
    }

    Ok(LegacyEnvelope {
        payload_bytes,
        signature,
        signer_id,
        format_tag: format_tag.to_string(),
    })
}

/// Scan `text` for every variation-selector run, concatenate their decoded
/// bytes in left-to-right order, and try to decode the result as a legacy
/// envelope. This is how distributed placements (§4.6) are reassembled: the
/// blob was split across several sites in ascending order, so reading the
/// runs back in the order they appear reconstructs it. A lone FEFF sentinel
/// before a run (the "end-of-text-with-FEFF-prefix" site) is skipped, not
/// treated as a run boundary marker — it carries no data of its own.
pub fn scan_and_decode(text: &str) -> Option<LegacyEnvelope> {
    let mut bytes = Vec::new();
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut i = 0;
    while i < chars.len() {
        let (offset, c) = chars[i];
        if selector::from_selector(c).is_none() {
            i += 1;
            continue;
        }
        let run = selector::read_selector_run(text, offset);
        bytes.extend(selector::decode_run(text, run));
        while i < chars.len() && chars[i].0 < run.end {
            i += 1;
        }
    }
    if bytes.is_empty() {
        return None;
    }
    decode(&bytes).ok()
}

fn too_short() -> Error {
    Error::MalformedEnvelope("legacy blob truncated".to_string())
}

fn read_u16(bytes: &[u8], at: usize) -> Result<u16> {
    let slice = bytes.get(at..at + 2).ok_or_else(too_short)?;
    Ok(u16::from_be_bytes([slice[0], slice[1]]))
}

fn read_u32(bytes: &[u8], at: usize) -> Result<u32> {
    let slice = bytes.get(at..at + 4).ok_or_else(too_short)?;
    Ok(u32::from_be_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trips() {
        let envelope = LegacyEnvelope {
            payload_bytes: b"hello payload".to_vec(),
            signature: vec![9u8; 64],
            signer_id: "signer-1".to_string(),
            format_tag: "manifest-cbor".to_string(),
        };
        let bytes = encode(&envelope).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.payload_bytes, envelope.payload_bytes);
        assert_eq!(decoded.signature, envelope.signature);
        assert_eq!(decoded.signer_id, envelope.signer_id);
        assert_eq!(decoded.format_tag, envelope.format_tag);
    }

    #[test]
    fn decode_rejects_missing_magic() {
        let err = decode(b"not a legacy blob at all").unwrap_err();
        assert!(matches!(err, Error::MalformedEnvelope(_)));
    }

    #[test]
    fn decode_rejects_truncated_blob() {
        let envelope = LegacyEnvelope {
            payload_bytes: b"x".to_vec(),
            signature: vec![1u8; 64],
            signer_id: "s".to_string(),
            format_tag: "basic".to_string(),
        };
        let bytes = encode(&envelope).unwrap();
        let err = decode(&bytes[..bytes.len() - 10]).unwrap_err();
        assert!(matches!(err, Error::MalformedEnvelope(_)));
    }
}
