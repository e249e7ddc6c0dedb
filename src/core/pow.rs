//! Brute-force proof-of-work nonce search.
//!
//! The candidate for nonce `n` is `SHA-256(prefix ++ decimal(n) ++ suffix)`,
//! where `decimal(n)` is the base-10 rendering of `n` without padding or
//! sign. Nonces are tried in order from 0, so the first proof returned is the
//! smallest one. Difficulty counts leading zero hex digits of the digest.

use crate::types::hash::{HEX_LEN, Hash, HashBuilder};
use crate::{debug, warn};
use pidgeon_derive::Error;
use std::sync::atomic::{AtomicBool, Ordering};

/// A digest has 64 hex digits, so no higher difficulty can be met.
pub const MAX_DIFFICULTY: u32 = HEX_LEN as u32;

/// The interrupt source is polled each time the nonce reaches a multiple of this.
pub const INTERRUPT_CHECK_INTERVAL: i64 = 100_000;

/// Longest decimal rendering of a non-negative `i64`.
const MAX_NONCE_DIGITS: usize = 19;

/// A nonce and the digest it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Proof {
    pub nonce: i64,
    pub hash: Hash,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PowError {
    #[error("difficulty {requested} exceeds the maximum of {max}")]
    DifficultyTooHigh { requested: u32, max: u32 },
    #[error("proof search interrupted after {attempts} attempts")]
    Interrupted { attempts: i64 },
}

/// Cooperative cancellation for long searches.
pub trait Interrupt {
    fn is_interrupted(&self) -> bool;
}

impl Interrupt for AtomicBool {
    fn is_interrupted(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

/// An interrupt source that never fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverInterrupt;

impl Interrupt for NeverInterrupt {
    fn is_interrupted(&self) -> bool {
        false
    }
}

/// Searches for the smallest nonce meeting `difficulty`.
///
/// Returns `Ok(None)` only if the nonce counter would overflow `i64`.
pub fn find_proof(
    prefix: impl AsRef<[u8]>,
    suffix: impl AsRef<[u8]>,
    difficulty: u32,
) -> Result<Option<Proof>, PowError> {
    find_proof_with_interrupt(prefix, suffix, difficulty, &NeverInterrupt)
}

/// Like [`find_proof`], polling `interrupt` every
/// [`INTERRUPT_CHECK_INTERVAL`] nonces.
pub fn find_proof_with_interrupt<I: Interrupt + ?Sized>(
    prefix: impl AsRef<[u8]>,
    suffix: impl AsRef<[u8]>,
    difficulty: u32,
    interrupt: &I,
) -> Result<Option<Proof>, PowError> {
    if difficulty > MAX_DIFFICULTY {
        return Err(PowError::DifficultyTooHigh {
            requested: difficulty,
            max: MAX_DIFFICULTY,
        });
    }

    let base = Hash::sha256().chain(prefix);
    let suffix = suffix.as_ref();
    let mut digits = [0u8; MAX_NONCE_DIGITS];
    let mut nonce: i64 = 0;

    loop {
        let hash = candidate(&base, &mut digits, nonce, suffix);
        if meets_difficulty(&hash, difficulty) {
            debug!("proof found at nonce {nonce} (difficulty {difficulty})");
            return Ok(Some(Proof { nonce, hash }));
        }

        nonce = match nonce.checked_add(1) {
            Some(next) => next,
            None => return Ok(None),
        };

        if nonce % INTERRUPT_CHECK_INTERVAL == 0 && interrupt.is_interrupted() {
            warn!("proof search interrupted after {nonce} attempts");
            return Err(PowError::Interrupted { attempts: nonce });
        }
    }
}

/// Digest for one nonce.
pub fn proof_hash(prefix: impl AsRef<[u8]>, suffix: impl AsRef<[u8]>, nonce: i64) -> Hash {
    let mut digits = [0u8; MAX_NONCE_DIGITS];
    candidate(&Hash::sha256().chain(prefix), &mut digits, nonce, suffix.as_ref())
}

/// Returns true when `hash` starts with at least `difficulty` zero hex digits.
pub fn meets_difficulty(hash: &Hash, difficulty: u32) -> bool {
    hash.leading_zero_nibbles() >= difficulty
}

/// Recomputes the digest for `proof.nonce` and checks it against the claim.
pub fn verify_proof(
    prefix: impl AsRef<[u8]>,
    suffix: impl AsRef<[u8]>,
    difficulty: u32,
    proof: &Proof,
) -> bool {
    proof.nonce >= 0
        && meets_difficulty(&proof.hash, difficulty)
        && proof_hash(prefix, suffix, proof.nonce) == proof.hash
}

#[inline(always)]
fn candidate(
    base: &HashBuilder,
    digits: &mut [u8; MAX_NONCE_DIGITS],
    nonce: i64,
    suffix: &[u8],
) -> Hash {
    base.clone()
        .chain(format_decimal(nonce.unsigned_abs(), digits))
        .chain(suffix)
        .finalize()
}

/// Renders `n` in base 10 into the tail of `buf`.
fn format_decimal(mut n: u64, buf: &mut [u8; MAX_NONCE_DIGITS]) -> &[u8] {
    let mut start = buf.len();
    loop {
        start -= 1;
        buf[start] = b'0' + (n % 10) as u8;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    &buf[start..]
}
