//! Interop Bridge (spec §4.9) — lossless conversion between a C2PA-shaped
//! external dictionary and the internal manifest model.
//!
//! The external shape accepts two historical aliases on ingest
//! (`ai_info` for `ai_assertion`; a top-level `actions` field duplicated
//! from the `c2pa.actions.v1` assertion when the caller only supplied one
//! of the two) but always emits the canonical internal names on the way
//! back out, per §9's note that "the signing path MUST use the canonical
//! internal names regardless of what the caller supplied". A per-assertion
//! `data_encoding: "cbor_base64"` marker is decoded transparently on
//! ingest: `data` becomes the real nested structure, not a base64 string.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::canonical;
use crate::error::{Error, Result};
use crate::manifest;
use crate::payload::{C2paManifest, Value, ACTIONS_V1};

fn decode_data_encoding(entry: &Value) -> Result<Value> {
    let Some(encoding) = entry.map_get("data_encoding").and_then(Value::as_text) else {
        return Ok(entry.clone());
    };
    if encoding != "cbor_base64" {
        return Err(Error::MalformedEnvelope(format!(
            "unsupported data_encoding: {encoding}"
        )));
    }
    let encoded = entry
        .map_get("data")
        .and_then(Value::as_text)
        .ok_or_else(|| Error::MalformedEnvelope("data_encoding set but data is not a string".to_string()))?;
    let cbor_bytes = BASE64
        .decode(encoded)
        .map_err(|e| Error::MalformedEnvelope(format!("invalid base64 in data_encoding: {e}")))?;
    let decoded_data = canonical::from_canonical_cbor(&cbor_bytes)?;

    let mut entries: Vec<(String, Value)> = entry
        .as_map()
        .ok_or_else(|| Error::MalformedEnvelope("assertion entry is not a map".to_string()))?
        .iter()
        .filter(|(k, _)| k != "data" && k != "data_encoding")
        .cloned()
        .collect();
    entries.push(("data".to_string(), decoded_data));
    Ok(Value::Map(entries))
}

/// Normalize an external C2PA-like dict into the internal canonical shape
/// ([`manifest::manifest_from_value`]'s input), resolving field aliases and
/// transparent `cbor_base64` encodings.
fn normalize_external(dict: &Value) -> Result<Value> {
    let claim_generator = dict
        .map_get("claim_generator")
        .cloned()
        .ok_or_else(|| Error::MalformedEnvelope("external dict missing claim_generator".to_string()))?;
    let instance_id = dict
        .map_get("instance_id")
        .cloned()
        .ok_or_else(|| Error::MalformedEnvelope("external dict missing instance_id".to_string()))?;

    let raw_assertions = dict
        .map_get("assertions")
        .and_then(|v| match v {
            Value::Array(items) => Some(items.clone()),
            _ => None,
        })
        .unwrap_or_default();
    let assertions: Vec<Value> = raw_assertions
        .iter()
        .map(decode_data_encoding)
        .collect::<Result<Vec<_>>>()?;

    let actions = if let Some(top_level) = dict.map_get("actions") {
        top_level.clone()
    } else {
        assertions
            .iter()
            .find(|a| a.map_get("label").and_then(Value::as_text) == Some(ACTIONS_V1))
            .and_then(|a| a.map_get("data"))
            .and_then(|d| d.map_get("actions"))
            .cloned()
            .unwrap_or(Value::Array(Vec::new()))
    };

    let mut entries = vec![
        ("claim_generator".to_string(), claim_generator),
        ("actions".to_string(), actions),
        ("assertions".to_string(), Value::Array(assertions)),
        ("instance_id".to_string(), instance_id),
    ];
    let ai_assertion = dict.map_get("ai_assertion").or_else(|| dict.map_get("ai_info"));
    if let Some(ai) = ai_assertion {
        entries.push(("ai_assertion".to_string(), ai.clone()));
    }
    if let Some(claims) = dict.map_get("custom_claims") {
        entries.push(("custom_claims".to_string(), claims.clone()));
    }
    if let Some(context) = dict.map_get("@context") {
        entries.push(("@context".to_string(), context.clone()));
    }
    Ok(Value::Map(entries))
}

/// External dict → internal manifest model (spec §4.9 `external_to_internal`).
pub fn external_to_internal(dict: &Value) -> Result<C2paManifest> {
    let normalized = normalize_external(dict)?;
    manifest::manifest_from_value(&normalized)
}

/// Internal manifest model → external dict (spec §4.9 `internal_to_external`).
/// Always emits canonical field names — see module docs.
pub fn internal_to_external(manifest: &C2paManifest) -> Value {
    manifest::manifest_to_value(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::Action;

    fn sample_dict() -> Value {
        Value::Map(vec![
            ("claim_generator".to_string(), Value::Text("tester/1.0".to_string())),
            (
                "actions".to_string(),
                Value::Array(vec![Value::Map(vec![("label".to_string(), Value::Text("c2pa.created".to_string()))])]),
            ),
            ("assertions".to_string(), Value::Array(Vec::new())),
            ("instance_id".to_string(), Value::Text("11111111-1111-4111-8111-111111111111".to_string())),
        ])
    }

    #[test]
    fn external_to_internal_reads_claim_generator_and_actions() {
        let manifest = external_to_internal(&sample_dict()).unwrap();
        assert_eq!(manifest.claim_generator, "tester/1.0");
        assert_eq!(manifest.actions, vec![Action { label: "c2pa.created".to_string(), ..Default::default() }]);
    }

    #[test]
    fn ai_info_alias_is_accepted_as_ai_assertion() {
        let mut dict = sample_dict();
        if let Value::Map(entries) = &mut dict {
            entries.push(("ai_info".to_string(), Value::Map(vec![("generated".to_string(), Value::Bool(true))])));
        }
        let manifest = external_to_internal(&dict).unwrap();
        assert_eq!(
            manifest.ai_assertion,
            Some(vec![("generated".to_string(), Value::Bool(true))])
        );
    }

    #[test]
    fn round_trip_is_identity_on_the_image_of_internal_to_external() {
        let manifest = external_to_internal(&sample_dict()).unwrap();
        let external = internal_to_external(&manifest);
        let recovered = external_to_internal(&external).unwrap();
        assert_eq!(recovered, manifest);
    }

    #[test]
    fn context_survives_a_round_trip_through_the_bridge() {
        let mut manifest = external_to_internal(&sample_dict()).unwrap();
        manifest.context = Some("https://c2pa.org/2.3/context".to_string());
        let external = internal_to_external(&manifest);
        let recovered = external_to_internal(&external).unwrap();
        assert_eq!(recovered.context.as_deref(), Some("https://c2pa.org/2.3/context"));
    }

    #[test]
    fn cbor_base64_data_encoding_is_decoded_transparently() {
        let nested = Value::Map(vec![("hello".to_string(), Value::Text("world".to_string()))]);
        let cbor = canonical::to_canonical_cbor(&nested).unwrap();
        let encoded = BASE64.encode(&cbor);

        let dict = Value::Map(vec![
            ("claim_generator".to_string(), Value::Text("tester/1.0".to_string())),
            ("actions".to_string(), Value::Array(Vec::new())),
            (
                "assertions".to_string(),
                Value::Array(vec![Value::Map(vec![
                    ("label".to_string(), Value::Text("com.example.custom".to_string())),
                    ("data_encoding".to_string(), Value::Text("cbor_base64".to_string())),
                    ("data".to_string(), Value::Text(encoded)),
                ])]),
            ),
            ("instance_id".to_string(), Value::Text("11111111-1111-4111-8111-111111111111".to_string())),
        ]);

        let manifest = external_to_internal(&dict).unwrap();
        let assertion = manifest.assertion("com.example.custom").unwrap();
        match assertion {
            crate::payload::Assertion::Other { data, .. } => {
                assert_eq!(data, &vec![("hello".to_string(), Value::Text("world".to_string()))]);
            }
            other => panic!("expected Other assertion, got {other:?}"),
        }
    }
}
