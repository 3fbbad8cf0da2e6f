//! Request fingerprints.
//!
//! A fingerprint addresses a cache entry. It is derived from the endpoint
//! name and a canonical serialization of the arguments after the endpoint's
//! declared defaults have been filled in, so `{}` and the explicit defaults
//! address the same entry.
//!
//! # Canonical Form
//!
//! `endpointName(<json>)` where object keys are sorted at every depth and
//! `null` fields are treated as omitted.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

use crate::error::FingerprintError;
use crate::Tag;

/// A query endpoint with declared argument defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryEndpoint {
    pub name: &'static str,
    pub path: &'static str,
    pub tag: Tag,
    pub defaults: Value,
}

impl QueryEndpoint {
    pub fn new(name: &'static str, path: &'static str, tag: Tag) -> Self {
        Self {
            name,
            path,
            tag,
            defaults: Value::Object(Map::new()),
        }
    }

    pub fn with_defaults(mut self, defaults: Value) -> Self {
        self.defaults = defaults;
        self
    }

    /// Overlay `args` on the declared defaults.
    ///
    /// Object arguments are merged key by key; `null` values fall back to
    /// the default. Non-object arguments are kept as-is.
    pub fn normalize<A: Serialize + ?Sized>(&self, args: &A) -> Result<Value, FingerprintError> {
        let value = serde_json::to_value(args).map_err(|e| FingerprintError::Unserializable {
            endpoint: self.name.to_string(),
            reason: e.to_string(),
        })?;

        let mut merged = match &self.defaults {
            Value::Object(defaults) => defaults.clone(),
            _ => Map::new(),
        };
        match value {
            Value::Null => {}
            Value::Object(fields) => {
                for (key, field) in fields {
                    if !field.is_null() {
                        merged.insert(key, field);
                    }
                }
            }
            other if merged.is_empty() => return Ok(other),
            other => {
                return Err(FingerprintError::Unserializable {
                    endpoint: self.name.to_string(),
                    reason: format!("expected an argument object, got {}", other),
                })
            }
        }
        Ok(Value::Object(merged))
    }

    /// Fingerprint `args` for this endpoint.
    pub fn fingerprint<A: Serialize + ?Sized>(&self, args: &A) -> Result<Fingerprint, FingerprintError> {
        fingerprint(self, args)
    }
}

/// Stable cache key derived from an endpoint and its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Build from an endpoint name and already-normalized arguments.
    pub fn from_normalized(endpoint_name: &str, normalized: &Value) -> Self {
        let mut key = String::with_capacity(endpoint_name.len() + 32);
        key.push_str(endpoint_name);
        key.push('(');
        write_canonical(normalized, &mut key);
        key.push(')');
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the endpoint this fingerprint belongs to.
    pub fn endpoint_name(&self) -> &str {
        self.0.split_once('(').map(|(name, _)| name).unwrap_or(&self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the fingerprint for `(endpoint, args)`.
pub fn fingerprint<A: Serialize + ?Sized>(
    endpoint: &QueryEndpoint,
    args: &A,
) -> Result<Fingerprint, FingerprintError> {
    let normalized = endpoint.normalize(args)?;
    Ok(Fingerprint::from_normalized(endpoint.name, &normalized))
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, _)| k)
                .collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

// ============================================================================
// TESTS
// ============================================================================
