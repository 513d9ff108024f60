//! Document codec
//!
//! The engine works on typed documents; turning them into bytes (and back)
//! is delegated to a [`Codec`]. Typed documents are converted to and from
//! [`serde_json::Value`] first, so a codec only has to map a value tree onto
//! its wire format.

use crate::error::{AzureError, Result};
use crate::transport::{CONTENT_TYPE_JSON, CONTENT_TYPE_XML};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

pub trait Codec: Send + Sync {
    fn encode(&self, value: &Value) -> Result<Vec<u8>>;

    fn decode(&self, bytes: &[u8]) -> Result<Value>;

    /// Content type of the documents this codec writes
    fn content_type(&self) -> &'static str {
        CONTENT_TYPE_XML
    }
}

/// `serde_json`-backed codec
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        Ok(serde_json::from_slice(bytes)?)
    }

    fn content_type(&self) -> &'static str {
        CONTENT_TYPE_JSON
    }
}

/// Encode a typed document with `codec`
pub fn encode_document<T: Serialize>(codec: &dyn Codec, document: &T) -> Result<Vec<u8>> {
    let value = serde_json::to_value(document)
        .map_err(|e| AzureError::Codec(format!("failed to serialize document: {}", e)))?;
    codec.encode(&value)
}

/// Decode a typed document with `codec`
pub fn decode_document<T: DeserializeOwned>(codec: &dyn Codec, bytes: &[u8]) -> Result<T> {
    let value = codec.decode(bytes)?;
    serde_json::from_value(value)
        .map_err(|e| AzureError::Codec(format!("unexpected document shape: {}", e)))
}
