//! Streaming Embedder (spec §4.8).
//!
//! A value-owned handler with no hidden global state: construct, drive with
//! `process_chunk`, call `finalize` exactly once. C2PA streaming is
//! explicitly unsupported — hard binding can't be computed over an
//! unfinished stream — so this only ever places a legacy payload.

use ed25519_dalek::SigningKey;

use crate::config::EngineConfig;
use crate::embed::{self, EmbedOptions, PayloadInput};
use crate::error::{Error, Result};

/// Per-session state for one streaming embed (spec §4.8). Not `Sync`; the
/// caller drives it synchronously from one thread.
pub struct StreamingEmbedder {
    buffer: String,
    embedded: bool,
    input: PayloadInput,
    signing_key: SigningKey,
    signer_id: String,
    options: EmbedOptions,
    config: EngineConfig,
}

impl StreamingEmbedder {
    /// Construct a session for the Basic or Legacy Manifest carrier.
    ///
    /// C2PA streaming is explicitly unsupported (spec §4.8): hard binding
    /// can't be computed over an unfinished stream, so a `PayloadInput::C2pa`
    /// is rejected here rather than silently embedded without one.
    pub fn new(
        input: PayloadInput,
        signing_key: SigningKey,
        signer_id: impl Into<String>,
        options: EmbedOptions,
        config: EngineConfig,
    ) -> Result<Self> {
        if matches!(input, PayloadInput::C2pa(_)) {
            return Err(Error::UnsupportedFormat(
                "C2PA streaming is not supported; use Basic or Legacy Manifest".to_string(),
            ));
        }
        Ok(Self {
            buffer: String::new(),
            embedded: false,
            input,
            signing_key,
            signer_id: signer_id.into(),
            options,
            config,
        })
    }

    /// Append `chunk` and either drain it through (once the payload is
    /// already embedded) or attempt an embed against the buffered text.
    #[tracing::instrument(skip(self, chunk), fields(embedded = self.embedded))]
    pub fn process_chunk(&mut self, chunk: &str) -> Result<String> {
        self.buffer.push_str(chunk);

        if self.embedded {
            return Ok(std::mem::take(&mut self.buffer));
        }

        match self.try_embed_buffer()? {
            Some(emitted) => {
                self.embedded = true;
                self.buffer.clear();
                Ok(emitted)
            }
            None => Ok(String::new()),
        }
    }

    /// Attempt one last embed if it hasn't happened yet, then reset.
    /// Returns the raw buffered text, unembedded, if no site ever became
    /// viable — the stream will lack provenance, per spec.
    pub fn finalize(&mut self) -> Result<String> {
        let result = if self.embedded {
            std::mem::take(&mut self.buffer)
        } else {
            match self.try_embed_buffer()? {
                Some(emitted) => emitted,
                None => std::mem::take(&mut self.buffer),
            }
        };
        self.reset();
        Ok(result)
    }

    /// Clear buffered state. The only supported in-band cancellation;
    /// nothing already emitted can be retracted.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.embedded = false;
    }

    fn try_embed_buffer(&mut self) -> Result<Option<String>> {
        match embed::embed(
            &self.buffer,
            self.input.clone(),
            &self.signing_key,
            &self.signer_id,
            &self.options,
            &self.config,
        ) {
            Ok(emitted) => Ok(Some(emitted)),
            Err(crate::error::Error::NoViableSite) => Ok(None),
            Err(other) => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::BasicPayload;
    use crate::signer::StaticKeyResolver;
    use crate::sites::Target;
    use ed25519_dalek::SigningKey;
    use rand::rngs::OsRng;

    fn keypair() -> (SigningKey, ed25519_dalek::VerifyingKey) {
        let signing = SigningKey::generate(&mut OsRng);
        let verifying = signing.verifying_key();
        (signing, verifying)
    }

    #[test]
    fn embeds_on_first_viable_chunk_then_passes_the_rest_through() {
        let (signing, verifying) = keypair();
        let resolver = StaticKeyResolver::new().with_key("s1", verifying);
        let payload = BasicPayload {
            model_id: Some("m".to_string()),
            ..Default::default()
        };
        let options = EmbedOptions {
            target: Target::Whitespace,
            ..Default::default()
        };
        let config = EngineConfig::streaming_default();
        let mut handler = StreamingEmbedder::new(
            PayloadInput::Basic(payload),
            signing,
            "s1",
            options,
            config.clone(),
        )
        .unwrap();

        let out1 = handler.process_chunk("alpha ").unwrap();
        assert!(out1.starts_with("alpha "));
        assert!(out1.len() > "alpha ".len());

        let out2 = handler.process_chunk("beta ").unwrap();
        assert_eq!(out2, "beta ");

        let out3 = handler.process_chunk("gamma").unwrap();
        assert_eq!(out3, "gamma");

        let out4 = handler.finalize().unwrap();
        assert_eq!(out4, "");

        let concatenated = format!("{out1}{out2}{out3}{out4}");
        let outcome = embed::verify(
            &concatenated,
            &resolver,
            &crate::embed::VerifyOptions {
                require_hard_binding: Some(false),
                return_payload_on_failure: false,
            },
            &config,
        );
        assert!(outcome.is_valid);
    }

    #[test]
    fn finalize_without_a_viable_site_returns_raw_buffer() {
        let (signing, _verifying) = keypair();
        let payload = BasicPayload::default();
        let options = EmbedOptions {
            target: Target::Whitespace,
            ..Default::default()
        };
        let mut handler = StreamingEmbedder::new(
            PayloadInput::Basic(payload),
            signing,
            "s1",
            options,
            EngineConfig::streaming_default(),
        )
        .unwrap();

        let out1 = handler.process_chunk("nospaceshere").unwrap();
        assert_eq!(out1, "");

        let out2 = handler.finalize().unwrap();
        assert_eq!(out2, "nospaceshere");
    }

    #[test]
    fn c2pa_input_is_rejected_at_construction() {
        let (signing, _verifying) = keypair();
        let options = EmbedOptions {
            target: Target::Whitespace,
            ..Default::default()
        };
        let err = StreamingEmbedder::new(
            PayloadInput::C2pa(crate::manifest::C2paFields::default()),
            signing,
            "s1",
            options,
            EngineConfig::streaming_default(),
        )
        .unwrap_err();
        assert!(matches!(err, crate::error::Error::UnsupportedFormat(_)));
    }
}
