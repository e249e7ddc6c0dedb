//! Hashing primitives.
//!
//! - `Hash`: fixed-size 32-byte SHA-256 digest with hex rendering
//! - `MerkleTree`: root builder over hex-concatenated SHA-256 nodes

pub mod hash;
pub mod merkle_tree;
