//! Payload encoding.
//!
//! Objects are stored as JSON text holding their full field set. Decoding
//! starts from a factory-made instance and overlays the stored payload on
//! it, so fields the payload lacks keep the factory's values. Nested objects
//! are merged key by key. A stored `null` leaves a factory object in place,
//! so an `Option` of a struct whose factory value is `Some` stays `Some`.
//! Every other value is replaced outright.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::record::Factory;

/// Encodes an object into its stored payload.
pub fn encode<T: Serialize + ?Sized>(object: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(object)
}

/// Decodes a stored payload into a fresh instance made by `factory`.
pub fn decode<T, F>(payload: &str, factory: &F) -> Result<T, serde_json::Error>
where
    T: Serialize + DeserializeOwned,
    F: Factory<T> + ?Sized,
{
    let stored: Value = serde_json::from_str(payload)?;
    let base = serde_json::to_value(factory.create())?;
    serde_json::from_value(overlay(base, stored))
}

fn overlay(base: Value, stored: Value) -> Value {
    match (base, stored) {
        (Value::Object(mut base), Value::Object(stored)) => {
            for (key, value) in stored {
                let merged = match base.remove(&key) {
                    Some(prev) => overlay(prev, value),
                    None => value,
                };
                base.insert(key, merged);
            }
            Value::Object(base)
        }
        (base @ Value::Object(_), Value::Null) => base,
        (_, stored) => stored,
    }
}
