//! End-to-end coverage of the seed scenarios in the embed/verify contract:
//! empty-text and ASCII C2PA round trips, body/wrapper tampering, a Basic
//! embed that falls back across site targets, and a streaming session.

use c2pa_text::config::EngineConfig;
use c2pa_text::manifest::C2paFields;
use c2pa_text::payload::{Action, BasicPayload, Value};
use c2pa_text::signer::StaticKeyResolver;
use c2pa_text::sites::Target;
use c2pa_text::stream::StreamingEmbedder;
use c2pa_text::{embed, extract, verify, EmbedOptions, ExtractedPayload, PayloadInput, VerifyOptions};
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;

fn keypair() -> (SigningKey, ed25519_dalek::VerifyingKey) {
    let signing = SigningKey::generate(&mut OsRng);
    let verifying = signing.verifying_key();
    (signing, verifying)
}

#[test]
fn empty_text_c2pa_round_trips_with_hard_binding() {
    let (signing, verifying) = keypair();
    let resolver = StaticKeyResolver::new().with_key("signer-1", verifying);
    let config = EngineConfig::default();

    let embedded = embed(
        "",
        PayloadInput::C2pa(C2paFields::default()),
        &signing,
        "signer-1",
        &EmbedOptions::default(),
        &config,
    )
    .unwrap();
    assert!(!embedded.is_empty());

    let outcome = verify(&embedded, &resolver, &VerifyOptions::default(), &config);
    assert!(outcome.is_valid);
    assert_eq!(outcome.signer_id.as_deref(), Some("signer-1"));
}

#[test]
fn ascii_round_trip_preserves_a_custom_action() {
    let (signing, verifying) = keypair();
    let resolver = StaticKeyResolver::new().with_key("signer-1", verifying);
    let config = EngineConfig::default();

    let fields = C2paFields {
        actions: Some(vec![Action {
            label: "c2pa.edited".to_string(),
            software_agent: Some("example-tool/1.0".to_string()),
            when: Some("2026-01-01T00:00:00Z".to_string()),
            description: None,
        }]),
        ..Default::default()
    };
    let embedded = embed(
        "The quick brown fox jumps over the lazy dog.",
        PayloadInput::C2pa(fields),
        &signing,
        "signer-1",
        &EmbedOptions::default(),
        &config,
    )
    .unwrap();
    assert!(embedded.starts_with("The quick brown fox jumps over the lazy dog."));

    let outcome = verify(&embedded, &resolver, &VerifyOptions::default(), &config);
    assert!(outcome.is_valid);
    match outcome.payload.unwrap() {
        ExtractedPayload::C2pa(manifest) => {
            assert_eq!(manifest.actions[0].label, "c2pa.edited");
            assert_eq!(manifest.actions[0].software_agent.as_deref(), Some("example-tool/1.0"));
        }
        other => panic!("expected C2pa payload, got {other:?}"),
    }
}

#[test]
fn tampering_the_body_is_caught_by_hard_binding() {
    let (signing, verifying) = keypair();
    let resolver = StaticKeyResolver::new().with_key("signer-1", verifying);
    let config = EngineConfig::default();

    let embedded = embed(
        "Original caption text.",
        PayloadInput::C2pa(C2paFields::default()),
        &signing,
        "signer-1",
        &EmbedOptions::default(),
        &config,
    )
    .unwrap();
    let tampered = embedded.replacen("Original", "Falsified", 1);

    let outcome = verify(&tampered, &resolver, &VerifyOptions::default(), &config);
    assert!(!outcome.is_valid);
}

#[test]
fn tampering_the_wrapper_is_caught_as_a_bad_signature() {
    let (signing, verifying) = keypair();
    let resolver = StaticKeyResolver::new().with_key("signer-1", verifying);
    let config = EngineConfig::default();

    let embedded = embed(
        "Original caption text.",
        PayloadInput::C2pa(C2paFields::default()),
        &signing,
        "signer-1",
        &EmbedOptions::default(),
        &config,
    )
    .unwrap();

    let mut chars: Vec<char> = embedded.chars().collect();
    let last = chars.len() - 1;
    let flipped = (chars[last] as u32) ^ 1;
    chars[last] = char::from_u32(flipped).unwrap_or(chars[last]);
    let tampered: String = chars.into_iter().collect();

    let outcome = verify(&tampered, &resolver, &VerifyOptions::default(), &config);
    assert!(!outcome.is_valid);
}

#[test]
fn basic_embed_with_omit_keys_falls_back_from_whitespace_to_all_characters() {
    let (signing, verifying) = keypair();
    let resolver = StaticKeyResolver::new().with_key("signer-1", verifying);
    let config = EngineConfig::default();

    let payload = BasicPayload {
        model_id: Some("example-model".to_string()),
        custom_metadata: Some(vec![
            ("user_id".to_string(), Value::Text("redact-me".to_string())),
            ("session".to_string(), Value::Text("keep-me".to_string())),
        ]),
        ..Default::default()
    };

    // No whitespace in this text, so the default Whitespace target has
    // nowhere to place the payload.
    let dense_text = "no-spaces-anywhere-in-this-string";
    let whitespace_options = EmbedOptions {
        target: Target::Whitespace,
        omit_keys: vec!["user_id".to_string()],
        ..Default::default()
    };
    let err = embed(
        dense_text,
        PayloadInput::Basic(payload.clone()),
        &signing,
        "signer-1",
        &whitespace_options,
        &config,
    )
    .unwrap_err();
    assert!(matches!(err, c2pa_text::Error::NoViableSite));

    // Falling back to AllCharacters always finds a site.
    let all_characters_options = EmbedOptions {
        target: Target::AllCharacters,
        omit_keys: vec!["user_id".to_string()],
        ..Default::default()
    };
    let embedded = embed(
        dense_text,
        PayloadInput::Basic(payload),
        &signing,
        "signer-1",
        &all_characters_options,
        &config,
    )
    .unwrap();

    let extracted = extract(&embedded).unwrap();
    match extracted {
        ExtractedPayload::Basic(basic) => {
            let metadata = basic.custom_metadata.unwrap();
            assert!(metadata.iter().all(|(k, _)| k != "user_id"));
            assert!(metadata.iter().any(|(k, _)| k == "session"));
        }
        other => panic!("expected Basic payload, got {other:?}"),
    }

    let outcome = verify(&embedded, &resolver, &VerifyOptions::default(), &config);
    assert!(outcome.is_valid);
}

#[test]
fn streaming_session_embeds_once_then_passes_remaining_chunks_through() {
    let (signing, verifying) = keypair();
    let resolver = StaticKeyResolver::new().with_key("signer-1", verifying);
    let config = EngineConfig::streaming_default();

    let payload = BasicPayload {
        organization: Some("Example Org".to_string()),
        ..Default::default()
    };
    let options = EmbedOptions {
        target: Target::Whitespace,
        ..Default::default()
    };
    let mut session = StreamingEmbedder::new(
        PayloadInput::Basic(payload),
        signing,
        "signer-1",
        options,
        config.clone(),
    )
    .unwrap();

    let mut out = String::new();
    out.push_str(&session.process_chunk("The model generated this ").unwrap());
    out.push_str(&session.process_chunk("sentence across several ").unwrap());
    out.push_str(&session.process_chunk("streamed chunks.").unwrap());
    out.push_str(&session.finalize().unwrap());

    assert!(out.starts_with("The model generated this "));

    let outcome = verify(
        &out,
        &resolver,
        &VerifyOptions {
            require_hard_binding: Some(false),
            return_payload_on_failure: false,
        },
        &config,
    );
    assert!(outcome.is_valid);
    assert_eq!(outcome.signer_id.as_deref(), Some("signer-1"));
}
