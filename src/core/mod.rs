//! Hashing and validation helpers that sit beside the VM.
//!
//! - [`pow`]: smallest-nonce proof-of-work search over SHA-256
//! - [`validator`]: `.2pg` filename check

pub mod pow;
pub mod validator;
