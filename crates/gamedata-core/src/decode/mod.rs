//! Decoding of untrusted remote JSON into typed records.
//!
//! Every payload first passes through a declared [`Schema`]; only a document
//! that matches is handed to serde. A mismatch surfaces as a
//! [`ValidationError`] naming the key path, the expected type and what was
//! actually found. Types are never coerced.

pub mod schema;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ValidationError;

pub use schema::{optional, required, Field, Schema};

/// A record that can be decoded from a remote JSON payload.
pub trait Decode: DeserializeOwned {
    fn schema() -> Schema;
}

/// Decode raw bytes into `T`, validating the shape first.
pub fn decode<T: Decode>(raw: &[u8]) -> Result<T, ValidationError> {
    let value: Value = serde_json::from_slice(raw).map_err(|e| {
        ValidationError::new("$", "valid JSON", format!("syntax error ({})", e))
    })?;
    decode_value(value)
}

pub fn decode_value<T: Decode>(value: Value) -> Result<T, ValidationError> {
    T::schema().validate(&value)?;
    // Schema and serde model are declared together; a failure here means they
    // disagree, which is still reported as a validation error.
    serde_json::from_value(value).map_err(|e| {
        ValidationError::new("$", format!("{} record", short_type_name::<T>()), e.to_string())
    })
}

/// `type_name` with module paths removed, e.g. `Envelope<Item>`.
fn short_type_name<T>() -> String {
    fn last_segment(path: &str) -> &str {
        path.rsplit("::").next().unwrap_or(path)
    }

    let full = std::any::type_name::<T>();
    let mut out = String::with_capacity(full.len());
    let mut segment = String::new();
    for c in full.chars() {
        if c.is_alphanumeric() || c == '_' || c == ':' {
            segment.push(c);
        } else {
            out.push_str(last_segment(&segment));
            segment.clear();
            out.push(c);
        }
    }
    out.push_str(last_segment(&segment));
    out
}
