//! Merkle root builder over string leaves.
//!
//! Behavior:
//! - An empty list of leaves yields the digest of the empty byte string.
//! - Each leaf is the SHA-256 of the element's UTF-8 bytes.
//! - A parent is the SHA-256 of the two children's lowercase hex digests
//!   concatenated as text (128 ASCII bytes), not of their raw bytes.
//! - Odd layers are padded by duplicating the last node before hashing the pair.
//! - A single leaf is already the root.

use crate::types::hash::{HEX_LEN, Hash};

/// SHA-256 of the empty input, returned for an empty leaf list.
pub const EMPTY_ROOT: Hash = Hash([
    0xe3, 0xb0, 0xc4, 0x42, 0x98, 0xfc, 0x1c, 0x14, 0x9a, 0xfb, 0xf4, 0xc8, 0x99, 0x6f, 0xb9, 0x24,
    0x27, 0xae, 0x41, 0xe4, 0x64, 0x9b, 0x93, 0x4c, 0xa4, 0x95, 0x99, 0x1b, 0x78, 0x52, 0xb8, 0x55,
]);

/// Utility functions to build Merkle roots from leaves or leaf hashes.
pub struct MerkleTree;

impl MerkleTree {
    /// Hashes one leaf element.
    pub fn hash_leaf(data: impl AsRef<[u8]>) -> Hash {
        Hash::digest(data)
    }

    /// Hashes the hex renderings of `left` and `right` joined together.
    pub fn hash_pair(left: Hash, right: Hash) -> Hash {
        let mut joined = [0u8; HEX_LEN * 2];
        joined[..HEX_LEN].copy_from_slice(&left.encode_hex());
        joined[HEX_LEN..].copy_from_slice(&right.encode_hex());
        Hash::digest(joined)
    }

    /// Computes a Merkle root from already-hashed leaves.
    ///
    /// This performs an in-place reduction; when a level has an odd number
    /// of nodes the last node is duplicated for hashing that pair.
    /// Returns [`EMPTY_ROOT`] when `nodes` is empty.
    pub fn from_raw(mut nodes: Vec<Hash>) -> Hash {
        if nodes.is_empty() {
            return EMPTY_ROOT;
        }

        let mut len = nodes.len();

        while len > 1 {
            let mut write = 0;
            let mut read = 0;

            while read < len {
                let left = nodes[read];
                let right = if read + 1 < len {
                    nodes[read + 1]
                } else {
                    left
                };

                nodes[write] = Self::hash_pair(left, right);

                write += 1;
                read += 2;
            }

            len = write;
        }

        nodes[0]
    }

    /// Computes the Merkle root of an ordered list of strings.
    pub fn compute_root<S: AsRef<str>>(items: &[S]) -> Hash {
        let leaves = items
            .iter()
            .map(|item| {
                let item: &str = item.as_ref();
                Self::hash_leaf(item)
            })
            .collect();
        Self::from_raw(leaves)
    }
}
