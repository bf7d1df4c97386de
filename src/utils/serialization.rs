// src/utils/serialization.rs
//! Serialization utilities for the registry service.
//!
//! Thin wrappers over `serde_json` shared by the file store and the API layer
//! so every persisted or transmitted structure goes through one code path.

use serde::{Deserialize, Serialize};
use serde_json;

/// Serializes a value to a compact JSON string.
///
/// # Arguments
/// * `data` - The value to serialize (must implement `Serialize`)
///
/// # Returns
/// - `Ok(String)` with JSON representation on success
/// - `Err(serde_json::Error)` if serialization fails
pub fn serialize<T: Serialize>(data: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(data)
}

/// Serializes a value to indented JSON, used for files meant to be inspected
/// by operators.
pub fn serialize_pretty<T: Serialize>(data: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(data)
}

/// Deserializes a value from a JSON string.
///
/// # Arguments
/// * `data` - JSON string to deserialize
///
/// # Returns
/// - `Ok(T)` with deserialized value on success
/// - `Err(serde_json::Error)` if deserialization fails
///
/// # Note
/// The function uses a lifetime parameter to ensure the deserialized value
/// doesn't outlive the input data. This allows borrowing data from the input string.
pub fn deserialize<'a, T: Deserialize<'a>>(data: &'a str) -> Result<T, serde_json::Error> {
    serde_json::from_str(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers_core::types::H256;

    #[test]
    fn test_hash_serializes_as_prefixed_hex() {
        let hash = H256::repeat_byte(0xaa);
        let json = serialize(&hash).unwrap();
        assert_eq!(json, format!("\"0x{}\"", "aa".repeat(32)));

        let back: H256 = deserialize(&json).unwrap();
        assert_eq!(back, hash);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let result: Result<Vec<u32>, _> = deserialize("[1, 2,");
        assert!(result.is_err());
    }
}
