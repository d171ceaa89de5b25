//! Canonical JSON and canonical CBOR serializers (spec §4.4).
//!
//! Both paths must be byte-stable: two semantically equal [`Value`] trees
//! serialize to identical bytes. Map keys sort ascending by code point;
//! JSON carries no insignificant whitespace; CBOR uses ciborium's
//! shortest-form integer/length encoding with keys pre-sorted before
//! handing the tree to the encoder (ciborium preserves map insertion
//! order, so sorting happens entirely on our side).

use crate::error::{Error, Result};
use crate::payload::Value;

/// JSON canonical ordering (spec §4.4): "mapping keys sorted ascending by
/// code point" — plain lexicographic order of the key text.
fn sort_entries_json(mut entries: Vec<(String, Value)>) -> Vec<(String, Value)> {
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    entries
}

/// CBOR canonical ordering (spec §4.4): "map keys sorted by byte-wise
/// canonical order", i.e. RFC 7049 §3.9 canonical CBOR — keys are compared
/// by their *encoded* bytes, which for a CBOR text string means length
/// first, then content. This differs from plain lexicographic order
/// whenever one key is lexicographically smaller but longer than another
/// (e.g. `"b"` encodes shorter than `"aa"` and so sorts first, even though
/// `"aa" < "b"` as plain strings).
fn sort_entries_cbor(mut entries: Vec<(String, Value)>) -> Vec<(String, Value)> {
    entries.sort_by(|a, b| (a.0.len(), &a.0).cmp(&(b.0.len(), &b.0)));
    entries
}

fn escape_json_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

fn write_json(value: &Value, out: &mut String) -> Result<()> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Integer(i) => out.push_str(&i.to_string()),
        Value::Text(s) => escape_json_string(s, out),
        Value::Bytes(b) => escape_json_string(&hex::encode(b), out),
        Value::Array(items) => {
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_json(item, out)?;
            }
            out.push(']');
        }
        Value::Map(entries) => {
            out.push('{');
            for (idx, (k, v)) in sort_entries_json(entries.clone()).into_iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                escape_json_string(&k, out);
                out.push(':');
                write_json(&v, out)?;
            }
            out.push('}');
        }
    }
    Ok(())
}

/// Serialize `value` as canonical JSON bytes.
pub fn to_canonical_json(value: &Value) -> Result<Vec<u8>> {
    let mut out = String::new();
    write_json(value, &mut out)?;
    Ok(out.into_bytes())
}

fn from_serde_json(value: serde_json::Value) -> Result<Value> {
    Ok(match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else {
                return Err(Error::MalformedEnvelope(
                    "floats are not permitted in signed payloads".to_string(),
                ));
            }
        }
        serde_json::Value::String(s) => Value::Text(s),
        serde_json::Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(from_serde_json(item)?);
            }
            Value::Array(out)
        }
        serde_json::Value::Object(map) => {
            let mut out = Vec::with_capacity(map.len());
            for (k, v) in map {
                out.push((k, from_serde_json(v)?));
            }
            Value::Map(out)
        }
    })
}

/// Parse canonical (or otherwise conformant) JSON bytes back into a [`Value`].
pub fn from_canonical_json(bytes: &[u8]) -> Result<Value> {
    let parsed: serde_json::Value = serde_json::from_slice(bytes)
        .map_err(|e| Error::MalformedEnvelope(format!("invalid JSON: {e}")))?;
    from_serde_json(parsed)
}

fn to_ciborium(value: &Value) -> ciborium::value::Value {
    use ciborium::value::Value as C;
    match value {
        Value::Null => C::Null,
        Value::Bool(b) => C::Bool(*b),
        Value::Integer(i) => C::Integer((*i).into()),
        Value::Text(s) => C::Text(s.clone()),
        Value::Bytes(b) => C::Bytes(b.clone()),
        Value::Array(items) => C::Array(items.iter().map(to_ciborium).collect()),
        Value::Map(entries) => {
            let sorted = sort_entries_cbor(entries.clone());
            C::Map(
                sorted
                    .into_iter()
                    .map(|(k, v)| (C::Text(k), to_ciborium(&v)))
                    .collect(),
            )
        }
    }
}

/// Serialize `value` as canonical CBOR bytes.
pub fn to_canonical_cbor(value: &Value) -> Result<Vec<u8>> {
    let cbor = to_ciborium(value);
    let mut out = Vec::new();
    ciborium::ser::into_writer(&cbor, &mut out)
        .map_err(|e| Error::MalformedEnvelope(format!("CBOR encode failed: {e}")))?;
    Ok(out)
}

fn from_ciborium(value: ciborium::value::Value) -> Result<Value> {
    use ciborium::value::Value as C;
    Ok(match value {
        C::Null => Value::Null,
        C::Bool(b) => Value::Bool(b),
        C::Integer(i) => {
            let as_i128: i128 = i.into();
            let as_i64 = i64::try_from(as_i128)
                .map_err(|_| Error::MalformedEnvelope("integer out of range".to_string()))?;
            Value::Integer(as_i64)
        }
        C::Text(s) => Value::Text(s),
        C::Bytes(b) => Value::Bytes(b),
        C::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(from_ciborium(item)?);
            }
            Value::Array(out)
        }
        C::Map(entries) => {
            let mut out = Vec::with_capacity(entries.len());
            for (k, v) in entries {
                let key = match k {
                    C::Text(s) => s,
                    other => {
                        return Err(Error::MalformedEnvelope(format!(
                            "non-text map key: {other:?}"
                        )))
                    }
                };
                out.push((key, from_ciborium(v)?));
            }
            Value::Map(out)
        }
        C::Float(_) => {
            return Err(Error::MalformedEnvelope(
                "floats are not permitted in signed payloads".to_string(),
            ))
        }
        other => {
            return Err(Error::MalformedEnvelope(format!(
                "unsupported CBOR item: {other:?}"
            )))
        }
    })
}

/// Parse canonical (or otherwise conformant) CBOR bytes back into a [`Value`].
pub fn from_canonical_cbor(bytes: &[u8]) -> Result<Value> {
    let parsed: ciborium::value::Value = ciborium::de::from_reader(bytes)
        .map_err(|e| Error::MalformedEnvelope(format!("invalid CBOR: {e}")))?;
    from_ciborium(parsed)
}
