// src/utils/crypto.rs
//! Cryptographic utilities optimized for blockchain compatibility.
//!
//! Uses Keccak-256 (Ethereum's standard hash function) for all operations.

use ethers_core::types::H256;
use ethers_core::utils::keccak256;

/// Computes a Keccak-256 hash of the input data (Ethereum-compatible).
///
/// # Arguments
/// * `data` - Binary data to hash (as bytes slice)
///
/// # Returns
/// Fixed-size 32-byte array (`[u8; 32]`) containing the hash.
///
/// # Why Keccak-256?
/// - Ethereum's native hash function (used in Solidity's `keccak256()`)
/// - Matches the digests produced by the on-chain registries
pub fn hash_data(data: &[u8]) -> [u8; 32] {
    keccak256(data)
}

/// Integrity digest of an off-chain document or credential payload, in the
/// form stored by the registries.
pub fn digest(data: &[u8]) -> H256 {
    H256::from(hash_data(data))
}
