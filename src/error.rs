//! Error taxonomy for the embedding/verification core.
//!
//! Every variant here is one of the kinds a caller may observe crossing the
//! crate boundary. No variant carries source text or key material.

use thiserror::Error;

/// The single error type returned by every fallible public operation.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid exclusion ranges: {0}")]
    InvalidExclusion(String),

    #[error("invalid private key")]
    InvalidPrivateKey,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("unknown signer: {0}")]
    UnknownSigner(String),

    #[error("signature verification failed")]
    BadSignature,

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("corrupted wrapper: {0}")]
    CorruptedWrapper(String),

    #[error("multiple wrappers detected")]
    MultipleWrappers,

    #[error("no viable site for payload placement")]
    NoViableSite,

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("exclusion fixed-point iteration did not converge")]
    ExclusionFixedPointDivergence,

    #[error("soft binding mismatch")]
    SoftBindingMismatch,

    #[error("hard binding mismatch")]
    HardBindingMismatch,
}

pub type Result<T> = std::result::Result<T, Error>;
