//! Pluggable (de)serialization for opaque task and event payloads.
//!
//! The core never assumes a concrete payload type: it stores and retrieves
//! byte blobs and defers to a [`Codec`] to turn them into (and back from)
//! whatever type the embedder's task registry expects. A failed decode never
//! propagates as a hard error out of the store or worker — it is downgraded
//! to a [`Legacy`] placeholder that still carries the original bytes.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("could not decode stored blob: {reason}")]
pub struct DecodeError {
    pub reason: String,
    /// The original bytes, preserved verbatim so callers can still display
    /// or re-persist them even though they couldn't be typed.
    pub bytes: Vec<u8>,
}

/// A decoded value, or a passthrough placeholder when decoding failed.
///
/// Never loses the original bytes: `Legacy` carries them so a round-trip
/// write-back (e.g. cleanup, priority reshuffle) is still byte-exact.
#[derive(Debug, Clone)]
pub enum Decoded<T> {
    Value(T),
    Legacy(Vec<u8>),
}

impl<T> Decoded<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Decoded::Value(v) => Some(v),
            Decoded::Legacy(_) => None,
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, Decoded::Legacy(_))
    }
}

/// Encodes and decodes opaque payloads to and from byte blobs.
pub trait Codec: Send + Sync + 'static {
    fn encode<T: Serialize>(&self, value: &T) -> Vec<u8>;
    fn try_decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, DecodeError>;

    /// Decode, falling back to [`Decoded::Legacy`] instead of erroring.
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Decoded<T> {
        match self.try_decode(bytes) {
            Ok(value) => Decoded::Value(value),
            Err(_) => Decoded::Legacy(bytes.to_vec()),
        }
    }
}

/// The default codec: JSON via `serde_json`, matching the teacher crate's
/// `auto_serialize!()` convention of deriving straight through serde.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Vec<u8> {
        serde_json::to_vec(value).expect("payload serialization is infallible for well-formed types")
    }

    fn try_decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, DecodeError> {
        serde_json::from_slice(bytes).map_err(|e| DecodeError {
            reason: e.to_string(),
            bytes: bytes.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn round_trips_well_formed_payloads() {
        let codec = JsonCodec;
        let original = Sample {
            name: "widget".into(),
            count: 7,
        };
        let bytes = codec.encode(&original);
        let decoded: Sample = codec.try_decode(&bytes).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn falls_back_to_legacy_on_garbage_bytes() {
        let codec = JsonCodec;
        let garbage = b"not json at all".to_vec();
        let decoded: Decoded<Sample> = codec.decode(&garbage);
        assert!(decoded.is_legacy());
        match decoded {
            Decoded::Legacy(bytes) => assert_eq!(bytes, garbage),
            Decoded::Value(_) => panic!("expected legacy placeholder"),
        }
    }
}
