//! Manifest Assembler (spec §4.6) — builds the C2PA assertion graph, signs
//! it, and iterates the hard-binding exclusion to a fixed point because the
//! exclusion covers the wrapper itself, which depends on the manifest size.

use ed25519_dalek::SigningKey;
use sha2::Digest;
use uuid::Uuid;

use crate::config::{EngineConfig, MAX_FIXED_POINT_ITERATIONS};
use crate::error::{Error, Result};
use crate::hasher::{self, ExclusionRange};
use crate::jumbf;
use crate::payload::{
    Action, Assertion, C2paManifest, ExclusionEntry, Value, ACTIONS_V1, HASH_DATA_V1,
    SOFT_BINDING_ALGORITHM_ID, SOFT_BINDING_V1,
};
use crate::signer::{self, KeyResolver};
use crate::wrapper;
use crate::{canonical, cose};

/// Caller-supplied fields for a C2PA embed call; anything left `None` is
/// given an engine-derived default.
#[derive(Debug, Clone, Default)]
pub struct C2paFields {
    pub claim_generator: Option<String>,
    pub actions: Option<Vec<Action>>,
    pub ai_assertion: Option<Vec<(String, Value)>>,
    pub custom_claims: Option<Vec<(String, Value)>>,
}

fn default_claim_generator() -> String {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_actions() -> Vec<Action> {
    vec![Action {
        label: "c2pa.created".to_string(),
        software_agent: None,
        when: None,
        description: None,
    }]
}

fn action_to_value(action: &Action) -> Value {
    let mut entries = vec![("label".to_string(), Value::Text(action.label.clone()))];
    if let Some(agent) = &action.software_agent {
        entries.push(("softwareAgent".to_string(), Value::Text(agent.clone())));
    }
    if let Some(when) = &action.when {
        entries.push(("when".to_string(), Value::Text(when.clone())));
    }
    if let Some(description) = &action.description {
        entries.push(("description".to_string(), Value::Text(description.clone())));
    }
    Value::Map(entries)
}

fn action_from_value(value: &Value) -> Result<Action> {
    value
        .as_map()
        .ok_or_else(|| Error::MalformedEnvelope("action entry is not a map".to_string()))?;
    let label = value
        .map_get("label")
        .and_then(Value::as_text)
        .ok_or_else(|| Error::MalformedEnvelope("action missing label".to_string()))?
        .to_string();
    Ok(Action {
        label,
        software_agent: value.map_get("softwareAgent").and_then(Value::as_text).map(str::to_string),
        when: value.map_get("when").and_then(Value::as_text).map(str::to_string),
        description: value.map_get("description").and_then(Value::as_text).map(str::to_string),
    })
}

fn exclusion_to_value(e: &ExclusionEntry) -> Value {
    Value::Map(vec![
        ("start".to_string(), Value::Integer(e.start as i64)),
        ("length".to_string(), Value::Integer(e.length as i64)),
    ])
}

fn exclusion_from_value(value: &Value) -> Result<ExclusionEntry> {
    let start = value
        .map_get("start")
        .and_then(|v| match v {
            Value::Integer(i) => Some(*i),
            _ => None,
        })
        .ok_or_else(|| Error::MalformedEnvelope("exclusion missing start".to_string()))?;
    let length = value
        .map_get("length")
        .and_then(|v| match v {
            Value::Integer(i) => Some(*i),
            _ => None,
        })
        .ok_or_else(|| Error::MalformedEnvelope("exclusion missing length".to_string()))?;
    Ok(ExclusionEntry {
        start: start as usize,
        length: length as usize,
    })
}

fn assertion_to_value(assertion: &Assertion) -> Value {
    let data = match assertion {
        Assertion::Actions { actions } => Value::Map(vec![(
            "actions".to_string(),
            Value::Array(actions.iter().map(action_to_value).collect()),
        )]),
        Assertion::SoftBinding {
            alg,
            hash,
            algorithm_id,
        } => Value::Map(vec![
            ("alg".to_string(), Value::Text(alg.clone())),
            ("hash".to_string(), Value::Text(hash.clone())),
            ("algorithm_id".to_string(), Value::Text(algorithm_id.clone())),
        ]),
        Assertion::HashData {
            alg,
            hash,
            exclusions,
        } => Value::Map(vec![
            ("alg".to_string(), Value::Text(alg.clone())),
            ("hash".to_string(), Value::Text(hash.clone())),
            (
                "exclusions".to_string(),
                Value::Array(exclusions.iter().map(exclusion_to_value).collect()),
            ),
        ]),
        Assertion::Other { data, .. } => Value::Map(data.clone()),
    };
    Value::Map(vec![
        ("label".to_string(), Value::Text(assertion.label().to_string())),
        ("data".to_string(), data),
    ])
}

fn assertion_from_value(value: &Value) -> Result<Assertion> {
    let label = value
        .map_get("label")
        .and_then(Value::as_text)
        .ok_or_else(|| Error::MalformedEnvelope("assertion missing label".to_string()))?
        .to_string();
    let data = value
        .map_get("data")
        .ok_or_else(|| Error::MalformedEnvelope("assertion missing data".to_string()))?;

    Ok(match label.as_str() {
        ACTIONS_V1 => {
            let actions = data
                .map_get("actions")
                .and_then(|v| match v {
                    Value::Array(items) => Some(items),
                    _ => None,
                })
                .ok_or_else(|| Error::MalformedEnvelope("actions assertion malformed".to_string()))?;
            let actions = actions.iter().map(action_from_value).collect::<Result<Vec<_>>>()?;
            Assertion::Actions { actions }
        }
        SOFT_BINDING_V1 => Assertion::SoftBinding {
            alg: data.map_get("alg").and_then(Value::as_text).unwrap_or_default().to_string(),
            hash: data.map_get("hash").and_then(Value::as_text).unwrap_or_default().to_string(),
            algorithm_id: data
                .map_get("algorithm_id")
                .and_then(Value::as_text)
                .unwrap_or_default()
                .to_string(),
        },
        HASH_DATA_V1 => {
            let exclusions = data
                .map_get("exclusions")
                .and_then(|v| match v {
                    Value::Array(items) => Some(items),
                    _ => None,
                })
                .ok_or_else(|| Error::MalformedEnvelope("hash.data assertion malformed".to_string()))?;
            let exclusions = exclusions
                .iter()
                .map(exclusion_from_value)
                .collect::<Result<Vec<_>>>()?;
            Assertion::HashData {
                alg: data.map_get("alg").and_then(Value::as_text).unwrap_or_default().to_string(),
                hash: data.map_get("hash").and_then(Value::as_text).unwrap_or_default().to_string(),
                exclusions,
            }
        }
        other => Assertion::Other {
            label: other.to_string(),
            data: data.as_map().map(|m| m.to_vec()).unwrap_or_default(),
        },
    })
}

/// Exposed `pub(crate)` so [`crate::interop`] can reuse the canonical
/// internal shape as the basis for its external-dict translation.
pub(crate) fn manifest_to_value(manifest: &C2paManifest) -> Value {
    let mut entries = vec![
        (
            "claim_generator".to_string(),
            Value::Text(manifest.claim_generator.clone()),
        ),
        (
            "actions".to_string(),
            Value::Array(manifest.actions.iter().map(action_to_value).collect()),
        ),
        (
            "assertions".to_string(),
            Value::Array(manifest.assertions.iter().map(assertion_to_value).collect()),
        ),
        (
            "instance_id".to_string(),
            Value::Text(manifest.instance_id.clone()),
        ),
    ];
    if let Some(ai) = &manifest.ai_assertion {
        entries.push(("ai_assertion".to_string(), Value::Map(ai.clone())));
    }
    if let Some(claims) = &manifest.custom_claims {
        entries.push(("custom_claims".to_string(), Value::Map(claims.clone())));
    }
    if let Some(context) = &manifest.context {
        entries.push(("@context".to_string(), Value::Text(context.clone())));
    }
    Value::Map(entries)
}

pub(crate) fn manifest_from_value(value: &Value) -> Result<C2paManifest> {
    let claim_generator = value
        .map_get("claim_generator")
        .and_then(Value::as_text)
        .ok_or_else(|| Error::MalformedEnvelope("manifest missing claim_generator".to_string()))?
        .to_string();
    let actions = value
        .map_get("actions")
        .and_then(|v| match v {
            Value::Array(items) => Some(items),
            _ => None,
        })
        .ok_or_else(|| Error::MalformedEnvelope("manifest missing actions".to_string()))?
        .iter()
        .map(action_from_value)
        .collect::<Result<Vec<_>>>()?;
    let assertions = value
        .map_get("assertions")
        .and_then(|v| match v {
            Value::Array(items) => Some(items),
            _ => None,
        })
        .ok_or_else(|| Error::MalformedEnvelope("manifest missing assertions".to_string()))?
        .iter()
        .map(assertion_from_value)
        .collect::<Result<Vec<_>>>()?;
    let instance_id = value
        .map_get("instance_id")
        .and_then(Value::as_text)
        .ok_or_else(|| Error::MalformedEnvelope("manifest missing instance_id".to_string()))?
        .to_string();
    let ai_assertion = value.map_get("ai_assertion").and_then(Value::as_map).map(|m| m.to_vec());
    let custom_claims = value.map_get("custom_claims").and_then(Value::as_map).map(|m| m.to_vec());
    let context = value.map_get("@context").and_then(Value::as_text).map(str::to_string);

    Ok(C2paManifest {
        claim_generator,
        actions,
        assertions,
        instance_id,
        ai_assertion,
        custom_claims,
        context,
    })
}

fn soft_binding_hash(actions: &[Action]) -> Result<String> {
    let value = Value::Array(actions.iter().map(action_to_value).collect());
    let bytes = canonical::to_canonical_cbor(&value)?;
    Ok(hex::encode(sha2::Sha256::digest(&bytes)))
}

/// Output of a successful C2PA embed: the text to emit (original text, not
/// re-normalized, followed by the wrapper) and the manifest that was signed.
#[derive(Debug, Clone)]
pub struct EmbedOutcome {
    pub text: String,
    pub manifest: C2paManifest,
}

/// Build, sign, and wrap a C2PA manifest for `text` (spec §4.6 embed).
///
/// `text` is kept verbatim in the output — only its normalized bytes feed
/// the hash computations, matching the invariant that `embed(text, ...)`
/// always starts with the caller's original `text`.
pub fn assemble_and_sign(
    text: &str,
    fields: C2paFields,
    add_hard_binding: bool,
    signing_key: &SigningKey,
    signer_id: &str,
    config: &EngineConfig,
) -> Result<EmbedOutcome> {
    let claim_generator = fields.claim_generator.unwrap_or_else(default_claim_generator);
    let actions = fields.actions.unwrap_or_else(default_actions);
    let instance_id = Uuid::new_v4().to_string();

    let actions_assertion = Assertion::Actions {
        actions: actions.clone(),
    };
    let soft_binding_assertion = Assertion::SoftBinding {
        alg: "sha256".to_string(),
        hash: soft_binding_hash(&actions)?,
        algorithm_id: SOFT_BINDING_ALGORITHM_ID.to_string(),
    };

    let mut manifest = C2paManifest {
        claim_generator,
        actions,
        assertions: vec![actions_assertion.clone(), soft_binding_assertion.clone()],
        instance_id,
        ai_assertion: fields.ai_assertion,
        custom_claims: fields.custom_claims,
        context: Some(config.c2pa_context_url.clone()),
    };

    if !add_hard_binding {
        let payload_cbor = canonical::to_canonical_cbor(&manifest_to_value(&manifest))?;
        let cose_bytes = signer::sign_cose(&payload_cbor, signing_key, signer_id)?;
        let manifest_store = jumbf::pack(&cose_bytes);
        let wrapper_text = wrapper::encode_wrapper(&manifest_store)?;
        return Ok(EmbedOutcome {
            text: format!("{text}{wrapper_text}"),
            manifest,
        });
    }

    // The exclusion recorded in `c2pa.hash.data.v1` must cover exactly the
    // wrapper's *rendered* byte span in the final emitted text, not the raw
    // `H || M` byte count — each manifest byte costs 3 or 4 UTF-8 bytes
    // depending on which selector range it falls into (§4.1, §6.1). Until a
    // manifest store exists, guess the length an empty-manifest wrapper
    // would render to; the loop below corrects this against reality.
    let normalized_len = hasher::hash(text, &[])?.bytes.len();
    let mut wrapper_len_guess = wrapper::encoded_byte_len(&[])?;

    for _ in 0..MAX_FIXED_POINT_ITERATIONS {
        // The wrapper is always a pure suffix appended after `text`, so the
        // bytes that actually get hashed here never include it — the
        // exclusion below only needs to *declare* the span it will occupy
        // once rendered, for a verifier reconstructing this same hash from
        // the full emitted text.
        let hash_result = hasher::hash(text, &[])?;

        manifest.assertions = vec![
            actions_assertion.clone(),
            soft_binding_assertion.clone(),
            Assertion::HashData {
                alg: "sha256".to_string(),
                hash: hash_result.hex,
                exclusions: vec![ExclusionEntry {
                    start: normalized_len,
                    length: wrapper_len_guess,
                }],
            },
        ];

        let payload_cbor = canonical::to_canonical_cbor(&manifest_to_value(&manifest))?;
        let cose_bytes = signer::sign_cose(&payload_cbor, signing_key, signer_id)?;
        let manifest_store = jumbf::pack(&cose_bytes);
        let real_len = wrapper::encoded_byte_len(&manifest_store)?;

        if real_len == wrapper_len_guess {
            let wrapper_text = wrapper::encode_wrapper(&manifest_store)?;
            return Ok(EmbedOutcome {
                text: format!("{text}{wrapper_text}"),
                manifest,
            });
        }
        wrapper_len_guess = real_len;
    }

    Err(Error::ExclusionFixedPointDivergence)
}

/// Result of a C2PA verify call (spec §4.6 verify / §4.7 `verify`).
#[derive(Debug, Clone)]
pub struct VerifyOutcome {
    pub is_valid: bool,
    pub signer_id: Option<String>,
    pub manifest: Option<C2paManifest>,
}

/// Verify a C2PA-embedded text (spec §4.6 verify algorithm).
pub fn verify(
    text_in: &str,
    resolver: &dyn KeyResolver,
    require_hard_binding: bool,
    return_payload_on_failure: bool,
    config: &EngineConfig,
) -> Result<VerifyOutcome> {
    let invalid = |manifest: Option<C2paManifest>| VerifyOutcome {
        is_valid: false,
        signer_id: None,
        manifest: if return_payload_on_failure { manifest } else { None },
    };

    let decoded = match wrapper::find_and_decode(text_in) {
        Ok(Some(d)) => d,
        Ok(None) => return Ok(invalid(None)),
        Err(_) => return Ok(invalid(None)),
    };

    let cose_bytes = match jumbf::unpack(&decoded.manifest_bytes) {
        Ok(b) => b,
        Err(_) => return Ok(invalid(None)),
    };

    let (signer_id, payload_bytes) = match signer::verify_cose(&cose_bytes, resolver) {
        Ok(v) => v,
        Err(_) => return Ok(invalid(None)),
    };

    let manifest_value = match canonical::from_canonical_cbor(&payload_bytes) {
        Ok(v) => v,
        Err(_) => return Ok(invalid(None)),
    };
    let manifest = match manifest_from_value(&manifest_value) {
        Ok(m) => m,
        Err(_) => return Ok(invalid(None)),
    };

    let recomputed_soft = match soft_binding_hash(&manifest.actions) {
        Ok(h) => h,
        Err(_) => return Ok(invalid(Some(manifest))),
    };
    let soft_ok = match manifest.assertion(SOFT_BINDING_V1) {
        Some(Assertion::SoftBinding { hash, .. }) => *hash == recomputed_soft,
        _ => false,
    };
    if !soft_ok {
        return Ok(invalid(Some(manifest)));
    }

    if let Some(context) = &manifest.context {
        if !config.accepted_contexts.iter().any(|c| c == context) {
            return Ok(invalid(Some(manifest)));
        }
    }

    if require_hard_binding {
        match manifest.assertion(HASH_DATA_V1) {
            Some(Assertion::HashData { hash, exclusions, .. }) => {
                let ranges: Vec<ExclusionRange> = exclusions
                    .iter()
                    .map(|e| ExclusionRange {
                        start: e.start,
                        length: e.length,
                    })
                    .collect();
                // Hash the *full* input text (wrapper still attached), per
                // spec §4.6 step 7 — the recorded exclusion declares the
                // wrapper's own rendered byte span, so this reduces to the
                // hash the embedder computed over `text` alone as long as
                // nothing else in the text changed.
                let recomputed = match hasher::hash(text_in, &ranges) {
                    Ok(r) => r,
                    Err(_) => return Ok(invalid(Some(manifest))),
                };
                if recomputed.hex != *hash {
                    return Ok(invalid(Some(manifest)));
                }
            }
            _ => return Ok(invalid(Some(manifest))),
        }
    }

    Ok(VerifyOutcome {
        is_valid: true,
        signer_id: Some(signer_id),
        manifest: Some(manifest),
    })
}

/// Parse an embedded payload back out without verifying the signature
/// (spec §4.7 `extract`). Never errors: malformed or missing payloads
/// resolve to `None`.
pub fn extract(text: &str) -> Option<C2paManifest> {
    let decoded = wrapper::find_and_decode(text).ok().flatten()?;
    let cose_bytes = jumbf::unpack(&decoded.manifest_bytes).ok()?;
    let cose = cose::unpack(&cose_bytes).ok()?;
    let value = canonical::from_canonical_cbor(&cose.payload).ok()?;
    manifest_from_value(&value).ok()
}
