//! Payload models (spec §3, §4.4).
//!
//! [`Value`] is the open, recursively-serializable structure that backs the
//! free-form parts of every payload shape (`custom_metadata`, assertion
//! `data`, `custom_claims`, ...). Floats are not representable by design —
//! §4.4 forbids them in signed payloads.

/// An open value usable anywhere a payload shape has a free-form mapping.
///
/// `Map` preserves insertion order; [`crate::canonical`] is responsible for
/// sorting keys when it serializes a `Value` to bytes; nothing upstream of
/// that needs to think about ordering.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Text(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Map(Vec<(String, Value)>),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn map_get<'a>(&'a self, key: &str) -> Option<&'a Value> {
        self.as_map()?.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

/// `timestamp` is optional and, per spec, may be either an integer (epoch)
/// or a string (ISO 8601) in any payload variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Timestamp {
    Epoch(i64),
    Text(String),
}

/// §3 Basic Payload. All fields optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BasicPayload {
    pub model_id: Option<String>,
    pub organization: Option<String>,
    pub custom_metadata: Option<Vec<(String, Value)>>,
    pub timestamp: Option<Timestamp>,
    pub version: Option<String>,
}

impl BasicPayload {
    /// Remove the named keys from `custom_metadata`, matching §9's decision
    /// that a missing-but-unstated field is implicit absence, not an error.
    pub fn without_keys(mut self, omit_keys: &[String]) -> Self {
        if let Some(meta) = self.custom_metadata.take() {
            let filtered: Vec<_> = meta
                .into_iter()
                .filter(|(k, _)| !omit_keys.iter().any(|o| o == k))
                .collect();
            self.custom_metadata = Some(filtered);
        }
        self
    }
}

/// §3 Legacy Manifest Payload assertion entry.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyAssertion {
    pub label: String,
    pub when: Option<String>,
    pub data: Vec<(String, Value)>,
}

/// §3 Legacy Manifest Payload.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyManifestPayload {
    pub claim_generator: String,
    pub assertions: Vec<LegacyAssertion>,
    pub ai_assertion: Vec<(String, Value)>,
    pub custom_claims: Vec<(String, Value)>,
    pub timestamp: Option<String>,
}

/// Serialization mode for the legacy manifest (and, by extension, Basic).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Serialization {
    Json,
    Cbor,
}

/// §3 C2PA Manifest Payload action entry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Action {
    pub label: String,
    pub software_agent: Option<String>,
    pub when: Option<String>,
    pub description: Option<String>,
}

pub const ACTIONS_V1: &str = "c2pa.actions.v1";
pub const SOFT_BINDING_V1: &str = "c2pa.soft_binding.v1";
pub const HASH_DATA_V1: &str = "c2pa.hash.data.v1";
pub const SOFT_BINDING_ALGORITHM_ID: &str = "encypher.unicode_variation_selector.v1";

/// A single exclusion range as stored in `c2pa.hash.data.v1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExclusionEntry {
    pub start: usize,
    pub length: usize,
}

/// §3 C2PA Manifest Payload assertions. Unrecognized labels round-trip via
/// `Other` so the interop bridge and parser never lose caller-supplied data.
#[derive(Debug, Clone, PartialEq)]
pub enum Assertion {
    Actions {
        actions: Vec<Action>,
    },
    SoftBinding {
        alg: String,
        hash: String,
        algorithm_id: String,
    },
    HashData {
        alg: String,
        hash: String,
        exclusions: Vec<ExclusionEntry>,
    },
    Other {
        label: String,
        data: Vec<(String, Value)>,
    },
}

impl Assertion {
    pub fn label(&self) -> &str {
        match self {
            Assertion::Actions { .. } => ACTIONS_V1,
            Assertion::SoftBinding { .. } => SOFT_BINDING_V1,
            Assertion::HashData { .. } => HASH_DATA_V1,
            Assertion::Other { label, .. } => label,
        }
    }
}

/// §3 C2PA Manifest Payload — the primary data model of the whole system.
#[derive(Debug, Clone, PartialEq)]
pub struct C2paManifest {
    pub claim_generator: String,
    pub actions: Vec<Action>,
    pub assertions: Vec<Assertion>,
    pub instance_id: String,
    pub ai_assertion: Option<Vec<(String, Value)>>,
    pub custom_claims: Option<Vec<(String, Value)>>,
    /// `@context` URL (spec §6.3 `C2PA_CONTEXT_URL`). `None` when the
    /// manifest came from an external dict that didn't carry one.
    pub context: Option<String>,
}

impl C2paManifest {
    pub fn assertion(&self, label: &str) -> Option<&Assertion> {
        self.assertions.iter().find(|a| a.label() == label)
    }
}
