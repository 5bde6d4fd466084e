use std::hash::Hasher as _;
use twox_hash::XxHash64;

/// 64-bit xxHash of `data` (seed 0).
pub fn twox_64(data: &[u8]) -> [u8; 8] {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(data);
    hasher.finish().to_le_bytes()
}

/// 128-bit hash made of two 64-bit xxHashes with seeds 0 and 1.
pub fn twox_128(data: &[u8]) -> [u8; 16] {
    let mut out = [0u8; 16];
    for (seed, chunk) in out.chunks_exact_mut(8).enumerate() {
        let mut hasher = XxHash64::with_seed(seed as u64);
        hasher.write(data);
        chunk.copy_from_slice(&hasher.finish().to_le_bytes());
    }
    out
}

/// Maps an encoded map key to the suffix appended to the map's storage prefix.
pub trait StorageHasher {
    fn hash(encoded_key: &[u8]) -> Vec<u8>;
}

/// `twox_64(key) ++ key`: cheap, and the key stays recoverable from storage.
pub struct Twox64Concat;

impl StorageHasher for Twox64Concat {
    fn hash(encoded_key: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + encoded_key.len());
        out.extend_from_slice(&twox_64(encoded_key));
        out.extend_from_slice(encoded_key);
        out
    }
}

/// Uses the encoded key as is. Only safe for keys users cannot choose.
pub struct Identity;

impl StorageHasher for Identity {
    fn hash(encoded_key: &[u8]) -> Vec<u8> {
        encoded_key.to_vec()
    }
}

/// `twox_128(prefix) ++ twox_128(name)`, the base key of every typed storage item.
pub fn storage_prefix(prefix: &str, name: &str) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[..16].copy_from_slice(&twox_128(prefix.as_bytes()));
    out[16..].copy_from_slice(&twox_128(name.as_bytes()));
    out
}
