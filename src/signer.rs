//! Signer / Verifier (spec §4.5, §6.2).
//!
//! Two signing paths share one primitive (Ed25519) but differ in what gets
//! signed: C2PA signs a COSE `Sig_structure`; legacy formats sign
//! `format_tag || 0x00 || payload_bytes` directly. Key resolution is a
//! caller-supplied capability — this module never closes over private-key
//! material beyond the call that needs it.

use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};

use crate::cose::{self, CoseSign1};
use crate::error::{Error, Result};

/// The key material a [`KeyResolver`] hands back for a given signer id.
///
/// Certificate-chain resolution (parsing X.509, walking a trust anchor) is
/// explicitly out of scope (spec §1, §6.5) — that's the surrounding
/// environment's job. If a resolver returns a `CertificateChain`, this
/// crate treats it as `InvalidPublicKey`: it has no way to extract a raw
/// Ed25519 key from it without certificate-chain validation machinery,
/// which is a separate concern from this crate.
#[derive(Debug, Clone)]
pub enum VerificationKey {
    Raw(VerifyingKey),
    CertificateChain(Vec<Vec<u8>>),
}

impl VerificationKey {
    fn into_ed25519(self) -> Result<VerifyingKey> {
        match self {
            VerificationKey::Raw(key) => Ok(key),
            VerificationKey::CertificateChain(_) => Err(Error::InvalidPublicKey),
        }
    }
}

/// `resolver(signer_id) -> verification_key?` (spec §6.2). Resolvers must be
/// pure with respect to any one verify call.
pub trait KeyResolver {
    fn resolve(&self, signer_id: &str) -> Option<VerificationKey>;
}

impl<F> KeyResolver for F
where
    F: Fn(&str) -> Option<VerificationKey>,
{
    fn resolve(&self, signer_id: &str) -> Option<VerificationKey> {
        self(signer_id)
    }
}

/// A resolver backed by a fixed table, handy for tests and simple callers.
#[derive(Debug, Clone, Default)]
pub struct StaticKeyResolver {
    keys: Vec<(String, VerificationKey)>,
}

impl StaticKeyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, signer_id: impl Into<String>, key: VerifyingKey) -> Self {
        self.keys.push((signer_id.into(), VerificationKey::Raw(key)));
        self
    }
}

impl KeyResolver for StaticKeyResolver {
    fn resolve(&self, signer_id: &str) -> Option<VerificationKey> {
        self.keys
            .iter()
            .find(|(id, _)| id == signer_id)
            .map(|(_, key)| key.clone())
    }
}

/// Build a `SigningKey` from raw bytes, surfacing `InvalidPrivateKey` rather
/// than panicking on a malformed caller-supplied key.
pub fn signing_key_from_bytes(bytes: &[u8]) -> Result<SigningKey> {
    let array: [u8; 32] = bytes.try_into().map_err(|_| Error::InvalidPrivateKey)?;
    Ok(SigningKey::from_bytes(&array))
}

/// Build a `VerifyingKey` from raw bytes, surfacing `InvalidPublicKey`
/// rather than panicking.
pub fn verifying_key_from_bytes(bytes: &[u8]) -> Result<VerifyingKey> {
    let array: [u8; 32] = bytes.try_into().map_err(|_| Error::InvalidPublicKey)?;
    VerifyingKey::from_bytes(&array).map_err(|_| Error::InvalidPublicKey)
}

/// Sign `payload_cbor` (canonical CBOR of a `C2paManifest`) into a full
/// COSE_Sign1 byte string: `[protected, {}, payload, signature]`.
#[tracing::instrument(skip(signing_key, payload_cbor), fields(signer_id))]
pub fn sign_cose(payload_cbor: &[u8], signing_key: &SigningKey, signer_id: &str) -> Result<Vec<u8>> {
    let protected = cose::build_protected_header(signer_id)?;
    let to_sign = cose::sig_structure(&protected, payload_cbor)?;
    let signature = signing_key.sign(&to_sign);
    cose::pack(&CoseSign1 {
        protected,
        payload: payload_cbor.to_vec(),
        signature: signature.to_bytes().to_vec(),
    })
}

/// Verify a packed COSE_Sign1 byte string. Returns the resolved signer id
/// and the raw payload bytes (canonical CBOR of the manifest) for the
/// caller to parse further.
#[tracing::instrument(skip(cose_bytes, resolver))]
pub fn verify_cose(cose_bytes: &[u8], resolver: &dyn KeyResolver) -> Result<(String, Vec<u8>)> {
    let parsed = cose::unpack(cose_bytes)?;
    let signer_id = cose::kid_from_protected(&parsed.protected)?;
    let key = resolver
        .resolve(&signer_id)
        .ok_or_else(|| Error::UnknownSigner(signer_id.clone()))?
        .into_ed25519()?;

    let to_verify = cose::sig_structure(&parsed.protected, &parsed.payload)?;
    let sig_bytes: [u8; 64] = parsed
        .signature
        .as_slice()
        .try_into()
        .map_err(|_| Error::MalformedEnvelope("signature is not 64 bytes".to_string()))?;
    let signature = Signature::from_bytes(&sig_bytes);

    key.verify(&to_verify, &signature)
        .map_err(|_| Error::BadSignature)?;

    Ok((signer_id, parsed.payload))
}

/// §3 Signed Envelope (legacy path).
#[derive(Debug, Clone)]
pub struct LegacyEnvelope {
    pub payload_bytes: Vec<u8>,
    pub signature: Vec<u8>,
    pub signer_id: String,
    pub format_tag: String,
}

fn legacy_message(format_tag: &str, payload_bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(format_tag.len() + 1 + payload_bytes.len());
    out.extend_from_slice(format_tag.as_bytes());
    out.push(0x00);
    out.extend_from_slice(payload_bytes);
    out
}

/// Sign `payload_bytes` for a legacy format, over
/// `format_tag || 0x00 || payload_bytes`.
pub fn sign_legacy(
    payload_bytes: &[u8],
    signing_key: &SigningKey,
    signer_id: &str,
    format_tag: &str,
) -> Result<LegacyEnvelope> {
    let message = legacy_message(format_tag, payload_bytes);
    let signature = signing_key.sign(&message);
    Ok(LegacyEnvelope {
        payload_bytes: payload_bytes.to_vec(),
        signature: signature.to_bytes().to_vec(),
        signer_id: signer_id.to_string(),
        format_tag: format_tag.to_string(),
    })
}

/// Verify a legacy envelope's signature and return its payload bytes.
pub fn verify_legacy(envelope: &LegacyEnvelope, resolver: &dyn KeyResolver) -> Result<Vec<u8>> {
    let key = resolver
        .resolve(&envelope.signer_id)
        .ok_or_else(|| Error::UnknownSigner(envelope.signer_id.clone()))?
        .into_ed25519()?;

    let message = legacy_message(&envelope.format_tag, &envelope.payload_bytes);
    let sig_bytes: [u8; 64] = envelope
        .signature
        .as_slice()
        .try_into()
        .map_err(|_| Error::MalformedEnvelope("signature is not 64 bytes".to_string()))?;
    let signature = Signature::from_bytes(&sig_bytes);

    key.verify(&message, &signature)
        .map_err(|_| Error::BadSignature)?;
    Ok(envelope.payload_bytes.clone())
}
