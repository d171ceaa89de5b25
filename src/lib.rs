//! C2PA-compliant provenance manifests, carried invisibly inside text.
//!
//! This crate embeds and verifies cryptographically-signed provenance
//! metadata inside Unicode text without altering how that text renders. A
//! payload is encoded as a run of Unicode variation selectors — scalars
//! whose only defined effect is to request a glyph variant of the preceding
//! character — so it survives copy/paste through anything that preserves
//! UTF-8 text while remaining invisible to a human reader.
//!
//! Three payload carriers share the same codec and signing primitives:
//!
//! - **C2PA**: a full C2PA manifest (actions, soft binding, optional hard
//!   binding) signed as a COSE_Sign1 structure and packaged in a minimal
//!   JUMBF container, appended as a suffix wrapper (see [`wrapper`]).
//! - **Basic**: a flat key/value payload for lightweight metadata.
//! - **Legacy Manifest**: a JSON- or CBOR-serialized manifest predating the
//!   full C2PA model, placed at caller-chosen sites in the body text rather
//!   than as a trailing wrapper (see [`sites`]).
//!
//! [`embed`], [`extract`], and [`verify`] are the top-level entry points;
//! everything else is exposed for callers who need to work a layer down
//! (custom site policies, direct manifest assembly, the streaming embedder).

pub mod canonical;
pub mod config;
pub mod cose;
pub mod embed;
pub mod error;
pub mod hasher;
pub mod interop;
pub mod jumbf;
pub mod legacy;
pub mod manifest;
pub mod payload;
pub mod selector;
pub mod signer;
pub mod sites;
pub mod stream;
pub mod validator;
pub mod wrapper;

pub use embed::{embed, extract, verify, EmbedOptions, ExtractedPayload, PayloadInput, VerifyOptions, VerifyOutcome};
pub use error::{Error, Result};
