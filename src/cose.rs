//! COSE_Sign1 envelope plumbing (spec §4.5, §6.1, RFC 8152 §4.4).
//!
//! This module only knows how to build and parse the COSE_Sign1 structure
//! and its `Sig_structure`; it never touches key material. [`crate::signer`]
//! is the layer that actually calls into `ed25519-dalek`.

use ciborium::value::{Integer, Value as Cbor};

use crate::error::{Error, Result};

const HEADER_ALG: i64 = 1;
const HEADER_KID: i64 = 4;
const ALG_EDDSA: i64 = -8;

/// A decoded (but not yet verified) COSE_Sign1 structure.
#[derive(Debug, Clone)]
pub struct CoseSign1 {
    pub protected: Vec<u8>,
    pub payload: Vec<u8>,
    pub signature: Vec<u8>,
}

fn cbor_bytes(v: &Cbor) -> Result<Vec<u8>> {
    match v {
        Cbor::Bytes(b) => Ok(b.clone()),
        other => Err(Error::MalformedEnvelope(format!(
            "expected byte string, found {other:?}"
        ))),
    }
}

/// Build the canonical CBOR protected header: `{1: -8, 4: signer_id}`.
pub fn build_protected_header(signer_id: &str) -> Result<Vec<u8>> {
    let map = Cbor::Map(vec![
        (
            Cbor::Integer(Integer::from(HEADER_ALG)),
            Cbor::Integer(Integer::from(ALG_EDDSA)),
        ),
        (
            Cbor::Integer(Integer::from(HEADER_KID)),
            Cbor::Bytes(signer_id.as_bytes().to_vec()),
        ),
    ]);
    let mut out = Vec::new();
    ciborium::ser::into_writer(&map, &mut out)
        .map_err(|e| Error::MalformedEnvelope(format!("protected header encode failed: {e}")))?;
    Ok(out)
}

/// Recover the `kid` (signer id) from an encoded protected header.
pub fn kid_from_protected(protected: &[u8]) -> Result<String> {
    let parsed: Cbor = ciborium::de::from_reader(protected)
        .map_err(|e| Error::MalformedEnvelope(format!("invalid protected header: {e}")))?;
    let entries = match parsed {
        Cbor::Map(m) => m,
        other => {
            return Err(Error::MalformedEnvelope(format!(
                "protected header is not a map: {other:?}"
            )))
        }
    };
    for (k, v) in entries {
        if let Cbor::Integer(i) = k {
            let key: i128 = i.into();
            if key == HEADER_KID as i128 {
                return match v {
                    Cbor::Bytes(b) => String::from_utf8(b)
                        .map_err(|_| Error::MalformedEnvelope("kid is not UTF-8".to_string())),
                    other => Err(Error::MalformedEnvelope(format!(
                        "kid has unexpected type: {other:?}"
                    ))),
                };
            }
        }
    }
    Err(Error::MalformedEnvelope(
        "protected header missing kid (label 4)".to_string(),
    ))
}

/// Build the RFC 8152 §4.4 `Sig_structure` bytes to sign or verify, with
/// `external_aad = h''` (empty).
pub fn sig_structure(protected: &[u8], payload: &[u8]) -> Result<Vec<u8>> {
    let structure = Cbor::Array(vec![
        Cbor::Text("Signature1".to_string()),
        Cbor::Bytes(protected.to_vec()),
        Cbor::Bytes(Vec::new()),
        Cbor::Bytes(payload.to_vec()),
    ]);
    let mut out = Vec::new();
    ciborium::ser::into_writer(&structure, &mut out)
        .map_err(|e| Error::MalformedEnvelope(format!("Sig_structure encode failed: {e}")))?;
    Ok(out)
}

/// Pack a COSE_Sign1 structure: `[protected, unprotected, payload, signature]`.
/// The unprotected header is always an empty map.
pub fn pack(cose: &CoseSign1) -> Result<Vec<u8>> {
    let array = Cbor::Array(vec![
        Cbor::Bytes(cose.protected.clone()),
        Cbor::Map(Vec::new()),
        Cbor::Bytes(cose.payload.clone()),
        Cbor::Bytes(cose.signature.clone()),
    ]);
    let mut out = Vec::new();
    ciborium::ser::into_writer(&array, &mut out)
        .map_err(|e| Error::MalformedEnvelope(format!("COSE_Sign1 encode failed: {e}")))?;
    Ok(out)
}

/// Parse a packed COSE_Sign1 structure back into its four fields.
pub fn unpack(bytes: &[u8]) -> Result<CoseSign1> {
    let parsed: Cbor = ciborium::de::from_reader(bytes)
        .map_err(|e| Error::MalformedEnvelope(format!("invalid COSE_Sign1: {e}")))?;
    let items = match parsed {
        Cbor::Array(items) if items.len() == 4 => items,
        other => {
            return Err(Error::MalformedEnvelope(format!(
                "COSE_Sign1 must be a 4-element array, found {other:?}"
            )))
        }
    };
    Ok(CoseSign1 {
        protected: cbor_bytes(&items[0])?,
        payload: cbor_bytes(&items[2])?,
        signature: cbor_bytes(&items[3])?,
    })
}
