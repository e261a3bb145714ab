use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

/// Stable 64-bit seed for a string key: the first eight bytes of its SHA-256
/// digest, little-endian. Unlike `std::hash`, the value is identical across
/// processes, builds and platforms.
pub fn seed_for_key(key: &str) -> u64 {
    let digest = Sha256::digest(key.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

pub fn rng_for_key(key: &str) -> ChaCha8Rng { ChaCha8Rng::seed_from_u64(seed_for_key(key)) }
