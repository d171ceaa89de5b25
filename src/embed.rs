//! Embedder / Extractor (spec §4.7) — the public entry points.
//!
//! This is the only module that knows about all three payload carriers at
//! once. C2PA delegates straight to [`crate::manifest`]; Basic and Legacy
//! Manifest share the wire codec in [`crate::legacy`] and the placement
//! policy in [`crate::sites`].

use ed25519_dalek::SigningKey;

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::legacy::{self, LegacyEnvelope};
use crate::manifest::{self, C2paFields};
use crate::payload::{BasicPayload, C2paManifest, LegacyManifestPayload, Serialization, Timestamp, Value};
use crate::signer::{self, KeyResolver};
use crate::sites::{self, Site, Target};

/// Which payload carrier an `embed`/`extract`/`verify` call targets, and the
/// caller-supplied fields for it.
#[derive(Debug, Clone)]
pub enum PayloadInput {
    C2pa(C2paFields),
    Basic(BasicPayload),
    Legacy {
        payload: LegacyManifestPayload,
        serialization: Serialization,
    },
}

/// Options for [`embed`] (spec §4.7).
#[derive(Debug, Clone)]
pub struct EmbedOptions {
    /// C2PA only. `None` defers to `config.hard_binding_default`.
    pub add_hard_binding: Option<bool>,
    /// Legacy only: where candidate sites are searched for.
    pub target: Target,
    /// Legacy only: spread the blob across every matching site instead of
    /// the first one.
    pub distribute_across_targets: bool,
    /// Basic only: keys stripped from `custom_metadata` before signing.
    pub omit_keys: Vec<String>,
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self {
            add_hard_binding: None,
            target: Target::Whitespace,
            distribute_across_targets: false,
            omit_keys: Vec::new(),
        }
    }
}

/// Options for [`verify`] (spec §4.7).
#[derive(Debug, Clone, Default)]
pub struct VerifyOptions {
    /// `None` defers to `config.hard_binding_default`. C2PA only.
    pub require_hard_binding: Option<bool>,
    pub return_payload_on_failure: bool,
}

/// A typed view of whatever payload carrier `extract`/`verify` recovered.
#[derive(Debug, Clone)]
pub enum ExtractedPayload {
    C2pa(C2paManifest),
    Basic(BasicPayload),
    Legacy(LegacyManifestPayload),
}

/// Result of [`verify`].
#[derive(Debug, Clone)]
pub struct VerifyOutcome {
    pub is_valid: bool,
    pub signer_id: Option<String>,
    pub payload: Option<ExtractedPayload>,
}

fn basic_to_value(payload: &BasicPayload) -> Value {
    let mut entries = Vec::new();
    if let Some(id) = &payload.model_id {
        entries.push(("model_id".to_string(), Value::Text(id.clone())));
    }
    if let Some(org) = &payload.organization {
        entries.push(("organization".to_string(), Value::Text(org.clone())));
    }
    if let Some(meta) = &payload.custom_metadata {
        entries.push(("custom_metadata".to_string(), Value::Map(meta.clone())));
    }
    if let Some(ts) = &payload.timestamp {
        let v = match ts {
            Timestamp::Epoch(e) => Value::Integer(*e),
            Timestamp::Text(t) => Value::Text(t.clone()),
        };
        entries.push(("timestamp".to_string(), v));
    }
    if let Some(version) = &payload.version {
        entries.push(("version".to_string(), Value::Text(version.clone())));
    }
    Value::Map(entries)
}

fn basic_from_value(value: &Value) -> Result<BasicPayload> {
    Ok(BasicPayload {
        model_id: value.map_get("model_id").and_then(Value::as_text).map(str::to_string),
        organization: value.map_get("organization").and_then(Value::as_text).map(str::to_string),
        custom_metadata: value.map_get("custom_metadata").and_then(Value::as_map).map(|m| m.to_vec()),
        timestamp: value.map_get("timestamp").and_then(|v| match v {
            Value::Integer(i) => Some(Timestamp::Epoch(*i)),
            Value::Text(t) => Some(Timestamp::Text(t.clone())),
            _ => None,
        }),
        version: value.map_get("version").and_then(Value::as_text).map(str::to_string),
    })
}

fn legacy_assertion_to_value(a: &crate::payload::LegacyAssertion) -> Value {
    let mut entries = vec![("label".to_string(), Value::Text(a.label.clone()))];
    if let Some(when) = &a.when {
        entries.push(("when".to_string(), Value::Text(when.clone())));
    }
    entries.push(("data".to_string(), Value::Map(a.data.clone())));
    Value::Map(entries)
}

fn legacy_assertion_from_value(value: &Value) -> Result<crate::payload::LegacyAssertion> {
    let label = value
        .map_get("label")
        .and_then(Value::as_text)
        .ok_or_else(|| Error::MalformedEnvelope("legacy assertion missing label".to_string()))?
        .to_string();
    let when = value.map_get("when").and_then(Value::as_text).map(str::to_string);
    let data = value
        .map_get("data")
        .and_then(Value::as_map)
        .map(|m| m.to_vec())
        .unwrap_or_default();
    Ok(crate::payload::LegacyAssertion { label, when, data })
}

fn legacy_manifest_to_value(payload: &LegacyManifestPayload) -> Value {
    let mut entries = vec![
        (
            "claim_generator".to_string(),
            Value::Text(payload.claim_generator.clone()),
        ),
        (
            "assertions".to_string(),
            Value::Array(payload.assertions.iter().map(legacy_assertion_to_value).collect()),
        ),
        ("ai_assertion".to_string(), Value::Map(payload.ai_assertion.clone())),
        ("custom_claims".to_string(), Value::Map(payload.custom_claims.clone())),
    ];
    if let Some(ts) = &payload.timestamp {
        entries.push(("timestamp".to_string(), Value::Text(ts.clone())));
    }
    Value::Map(entries)
}

fn legacy_manifest_from_value(value: &Value) -> Result<LegacyManifestPayload> {
    let claim_generator = value
        .map_get("claim_generator")
        .and_then(Value::as_text)
        .ok_or_else(|| Error::MalformedEnvelope("legacy manifest missing claim_generator".to_string()))?
        .to_string();
    let assertions = value
        .map_get("assertions")
        .and_then(|v| match v {
            Value::Array(items) => Some(items),
            _ => None,
        })
        .ok_or_else(|| Error::MalformedEnvelope("legacy manifest missing assertions".to_string()))?
        .iter()
        .map(legacy_assertion_from_value)
        .collect::<Result<Vec<_>>>()?;
    let ai_assertion = value.map_get("ai_assertion").and_then(Value::as_map).map(|m| m.to_vec()).unwrap_or_default();
    let custom_claims = value.map_get("custom_claims").and_then(Value::as_map).map(|m| m.to_vec()).unwrap_or_default();
    let timestamp = value.map_get("timestamp").and_then(Value::as_text).map(str::to_string);
    Ok(LegacyManifestPayload {
        claim_generator,
        assertions,
        ai_assertion,
        custom_claims,
        timestamp,
    })
}

fn format_tag_and_bytes(input: &PayloadInput) -> Result<(&'static str, Vec<u8>)> {
    match input {
        PayloadInput::C2pa(_) => unreachable!("C2PA never reaches the legacy wire path"),
        PayloadInput::Basic(payload) => {
            let value = basic_to_value(payload);
            Ok(("basic", crate::canonical::to_canonical_cbor(&value)?))
        }
        PayloadInput::Legacy { payload, serialization } => {
            let value = legacy_manifest_to_value(payload);
            match serialization {
                Serialization::Json => Ok(("manifest-json", crate::canonical::to_canonical_json(&value)?)),
                Serialization::Cbor => Ok(("manifest-cbor", crate::canonical::to_canonical_cbor(&value)?)),
            }
        }
    }
}

fn chunked(bytes: &[u8], size: usize) -> Vec<&[u8]> {
    if size == 0 {
        return vec![bytes];
    }
    bytes.chunks(size).collect()
}

fn splice_insertions(text: &str, mut insertions: Vec<(usize, String)>) -> String {
    insertions.sort_by_key(|(offset, _)| *offset);
    let extra: usize = insertions.iter().map(|(_, s)| s.len()).sum();
    let mut out = String::with_capacity(text.len() + extra);
    let mut cursor = 0usize;
    for (offset, insertion) in insertions {
        out.push_str(&text[cursor..offset]);
        out.push_str(&insertion);
        cursor = offset;
    }
    out.push_str(&text[cursor..]);
    out
}

fn place_legacy_blob(
    text: &str,
    blob: &[u8],
    target: Target,
    distribute: bool,
    config: &EngineConfig,
) -> Result<String> {
    let sites = sites::find_sites(text, target);
    if sites.is_empty() {
        return Err(Error::NoViableSite);
    }

    if !distribute {
        let site = sites[0];
        let insertion = site_insertion(site, blob);
        return Ok(splice_insertions(text, vec![(site.offset, insertion)]));
    }

    let chunks = chunked(blob, config.distribution_fanout);
    if sites.len() < chunks.len() {
        return Err(Error::NoViableSite);
    }
    let insertions: Vec<(usize, String)> = sites
        .into_iter()
        .zip(chunks.into_iter())
        .map(|(site, chunk)| (site.offset, site_insertion(site, chunk)))
        .collect();
    Ok(splice_insertions(text, insertions))
}

fn site_insertion(site: Site, bytes: &[u8]) -> String {
    let mut out = String::new();
    if site.needs_feff {
        out.push('\u{FEFF}');
    }
    out.push_str(&crate::selector::encode_bytes(bytes));
    out
}

/// Embed `input` into `text` (spec §4.7 `embed`).
pub fn embed(
    text: &str,
    input: PayloadInput,
    signing_key: &SigningKey,
    signer_id: &str,
    options: &EmbedOptions,
    config: &EngineConfig,
) -> Result<String> {
    match input {
        PayloadInput::C2pa(fields) => {
            let add_hard_binding = options.add_hard_binding.unwrap_or(config.hard_binding_default);
            let outcome = manifest::assemble_and_sign(text, fields, add_hard_binding, signing_key, signer_id, config)?;
            Ok(outcome.text)
        }
        PayloadInput::Basic(payload) => {
            let filtered = payload.without_keys(&options.omit_keys);
            let input = PayloadInput::Basic(filtered);
            let (format_tag, bytes) = format_tag_and_bytes(&input)?;
            let envelope = signer::sign_legacy(&bytes, signing_key, signer_id, format_tag)?;
            let blob = legacy::encode(&envelope)?;
            place_legacy_blob(text, &blob, options.target, options.distribute_across_targets, config)
        }
        legacy_input @ PayloadInput::Legacy { .. } => {
            let (format_tag, bytes) = format_tag_and_bytes(&legacy_input)?;
            let envelope = signer::sign_legacy(&bytes, signing_key, signer_id, format_tag)?;
            let blob = legacy::encode(&envelope)?;
            place_legacy_blob(text, &blob, options.target, options.distribute_across_targets, config)
        }
    }
}

fn parse_legacy_payload(envelope: &LegacyEnvelope) -> Option<ExtractedPayload> {
    match envelope.format_tag.as_str() {
        "basic" => {
            let value = crate::canonical::from_canonical_cbor(&envelope.payload_bytes).ok()?;
            Some(ExtractedPayload::Basic(basic_from_value(&value).ok()?))
        }
        "manifest-json" => {
            let value = crate::canonical::from_canonical_json(&envelope.payload_bytes).ok()?;
            Some(ExtractedPayload::Legacy(legacy_manifest_from_value(&value).ok()?))
        }
        "manifest-cbor" => {
            let value = crate::canonical::from_canonical_cbor(&envelope.payload_bytes).ok()?;
            Some(ExtractedPayload::Legacy(legacy_manifest_from_value(&value).ok()?))
        }
        _ => None,
    }
}

/// Parse whatever payload is embedded in `text`, without verifying anything
/// (spec §4.7 `extract`). Never errors.
pub fn extract(text: &str) -> Option<ExtractedPayload> {
    if let Some(manifest) = manifest::extract(text) {
        return Some(ExtractedPayload::C2pa(manifest));
    }
    let envelope = legacy::scan_and_decode(text)?;
    parse_legacy_payload(&envelope)
}

/// Verify whatever payload is embedded in `text` (spec §4.7 `verify`).
pub fn verify(
    text: &str,
    resolver: &dyn KeyResolver,
    options: &VerifyOptions,
    config: &EngineConfig,
) -> VerifyOutcome {
    let invalid = || VerifyOutcome {
        is_valid: false,
        signer_id: None,
        payload: None,
    };

    if matches!(crate::wrapper::find_and_decode(text), Ok(Some(_))) {
        let require_hard_binding = options.require_hard_binding.unwrap_or(config.hard_binding_default);
        let outcome = match manifest::verify(text, resolver, require_hard_binding, options.return_payload_on_failure, config) {
            Ok(o) => o,
            Err(_) => return invalid(),
        };
        return VerifyOutcome {
            is_valid: outcome.is_valid,
            signer_id: outcome.signer_id,
            payload: outcome.manifest.map(ExtractedPayload::C2pa),
        };
    }

    let envelope = match legacy::scan_and_decode(text) {
        Some(e) => e,
        None => return invalid(),
    };
    let payload_for_failure = if options.return_payload_on_failure {
        parse_legacy_payload(&envelope)
    } else {
        None
    };
    if signer::verify_legacy(&envelope, resolver).is_err() {
        return VerifyOutcome {
            is_valid: false,
            signer_id: None,
            payload: payload_for_failure,
        };
    }
    let payload = parse_legacy_payload(&envelope);
    VerifyOutcome {
        is_valid: true,
        signer_id: Some(envelope.signer_id.clone()),
        payload,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::StaticKeyResolver;
    use rand::rngs::OsRng;

    fn keypair() -> (SigningKey, ed25519_dalek::VerifyingKey) {
        let signing = SigningKey::generate(&mut OsRng);
        let verifying = signing.verifying_key();
        (signing, verifying)
    }

    #[test]
    fn basic_embed_fails_without_a_viable_site_then_succeeds_with_all_characters() {
        let (signing, verifying) = keypair();
        let resolver = StaticKeyResolver::new().with_key("s1", verifying);
        let config = EngineConfig::default();

        let payload = BasicPayload {
            model_id: Some("m".to_string()),
            custom_metadata: Some(vec![
                ("user_id".to_string(), Value::Text("u".to_string())),
                ("other".to_string(), Value::Text("v".to_string())),
            ]),
            ..Default::default()
        };
        let options = EmbedOptions {
            target: Target::Whitespace,
            omit_keys: vec!["user_id".to_string()],
            ..Default::default()
        };
        let err = embed("x", PayloadInput::Basic(payload.clone()), &signing, "s1", &options, &config).unwrap_err();
        assert!(matches!(err, Error::NoViableSite));

        let options = EmbedOptions {
            target: Target::AllCharacters,
            omit_keys: vec!["user_id".to_string()],
            ..Default::default()
        };
        let embedded = embed("x", PayloadInput::Basic(payload), &signing, "s1", &options, &config).unwrap();

        let extracted = extract(&embedded).unwrap();
        match extracted {
            ExtractedPayload::Basic(basic) => {
                assert_eq!(
                    basic.custom_metadata.unwrap(),
                    vec![("other".to_string(), Value::Text("v".to_string()))]
                );
            }
            other => panic!("expected Basic payload, got {other:?}"),
        }

        let verify_options = VerifyOptions::default();
        let outcome = verify(&embedded, &resolver, &verify_options, &config);
        assert!(outcome.is_valid);
        assert_eq!(outcome.signer_id.as_deref(), Some("s1"));
    }

    #[test]
    fn legacy_manifest_round_trips_through_distributed_sites() {
        let (signing, verifying) = keypair();
        let resolver = StaticKeyResolver::new().with_key("s1", verifying);
        let mut config = EngineConfig::default();
        config.distribution_fanout = 3;

        let payload = LegacyManifestPayload {
            claim_generator: "tester/1.0".to_string(),
            assertions: vec![crate::payload::LegacyAssertion {
                label: "c2pa.created".to_string(),
                when: None,
                data: Vec::new(),
            }],
            ai_assertion: Vec::new(),
            custom_claims: Vec::new(),
            timestamp: None,
        };
        let input = PayloadInput::Legacy {
            payload: payload.clone(),
            serialization: Serialization::Cbor,
        };
        let options = EmbedOptions {
            target: Target::Whitespace,
            distribute_across_targets: true,
            ..Default::default()
        };
        let text = "one two three four five six seven";
        let embedded = embed(text, input, &signing, "s1", &options, &config).unwrap();
        assert!(embedded.starts_with("one"));

        let outcome = verify(&embedded, &resolver, &VerifyOptions::default(), &config);
        assert!(outcome.is_valid);
        match outcome.payload.unwrap() {
            ExtractedPayload::Legacy(recovered) => assert_eq!(recovered, payload),
            other => panic!("expected Legacy payload, got {other:?}"),
        }
    }

    #[test]
    fn verify_on_plain_text_is_false_not_an_error() {
        let resolver = StaticKeyResolver::new();
        let config = EngineConfig::default();
        let outcome = verify("nothing embedded here", &resolver, &VerifyOptions::default(), &config);
        assert!(!outcome.is_valid);
        assert!(outcome.signer_id.is_none());
        assert!(outcome.payload.is_none());
    }

    #[test]
    fn tampered_legacy_signature_is_rejected() {
        let (signing, verifying) = keypair();
        let resolver = StaticKeyResolver::new().with_key("s1", verifying);
        let config = EngineConfig::default();
        let payload = BasicPayload {
            model_id: Some("m".to_string()),
            ..Default::default()
        };
        let options = EmbedOptions {
            target: Target::EndOfTextWithFeffPrefix,
            ..Default::default()
        };
        let embedded = embed("hello", PayloadInput::Basic(payload), &signing, "s1", &options, &config).unwrap();
        let tampered = embedded.replacen('h', "H", 1);
        let outcome = verify(&tampered, &resolver, &VerifyOptions::default(), &config);
        assert!(!outcome.is_valid);
    }
}
