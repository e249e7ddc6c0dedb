//! 32-byte SHA-256 hash type with allocation-free hex rendering.

use sha2::{Digest, Sha256};
use std::fmt;

/// SHA-256 hash length in bytes.
pub const HASH_LEN: usize = 32;

/// Length of the lowercase hexadecimal rendering of a [`Hash`].
pub const HEX_LEN: usize = HASH_LEN * 2;

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Fixed-size 32-byte SHA-256 digest.
///
/// `Copy` so digests can be passed by value through the Merkle reduction
/// and the nonce search without heap traffic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash, Ord, PartialOrd)]
pub struct Hash(pub [u8; HASH_LEN]);

impl Hash {
    /// Returns the hash as a byte slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Creates a new SHA-256 builder for incremental hashing.
    pub fn sha256() -> HashBuilder {
        HashBuilder::new()
    }

    /// Hashes `data` in one shot.
    pub fn digest(data: impl AsRef<[u8]>) -> Hash {
        Self::sha256().chain(data).finalize()
    }

    /// Writes the lowercase hex digest into a fixed buffer.
    pub fn encode_hex(&self) -> [u8; HEX_LEN] {
        let mut out = [0u8; HEX_LEN];
        for (i, byte) in self.0.iter().enumerate() {
            out[i * 2] = HEX_DIGITS[(byte >> 4) as usize];
            out[i * 2 + 1] = HEX_DIGITS[(byte & 0x0f) as usize];
        }
        out
    }

    /// Returns the lowercase hex digest as an owned string.
    pub fn to_hex(&self) -> String {
        self.to_string()
    }

    /// Counts consecutive zero nibbles from the start of the digest.
    pub fn leading_zero_nibbles(&self) -> u32 {
        let mut count = 0;
        for byte in &self.0 {
            if *byte == 0 {
                count += 2;
                continue;
            }
            if byte >> 4 == 0 {
                count += 1;
            }
            break;
        }
        count
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Incremental SHA-256 hash builder.
///
/// Feeding `a` then `b` yields the same digest as hashing `a ++ b`.
/// Cloning forks the state, so a shared prefix is only hashed once.
#[derive(Clone)]
pub struct HashBuilder {
    hasher: Sha256,
}

impl HashBuilder {
    /// Creates a new hash builder with empty state.
    pub fn new() -> Self {
        Self {
            hasher: Sha256::new(),
        }
    }

    /// Feeds data into the hash computation.
    pub fn update(&mut self, data: impl AsRef<[u8]>) {
        self.hasher.update(data.as_ref());
    }

    /// Builder-style variant of [`update`](Self::update).
    pub fn chain(mut self, data: impl AsRef<[u8]>) -> Self {
        self.update(data);
        self
    }

    /// Consumes the builder and returns the final hash.
    pub fn finalize(self) -> Hash {
        Hash(self.hasher.finalize().into())
    }
}

impl Default for HashBuilder {
    fn default() -> Self {
        Self::new()
    }
}
