//! Derive macros for the pidgeon crate.
//!
//! Provides:
//! - `#[derive(Error)]` - `Display` and `std::error::Error` boilerplate

mod error;

use proc_macro::TokenStream;

/// Implements `Display` and `Error` for an error enum or struct.
///
/// Every variant needs an `#[error("...")]` message. `source()` keeps the
/// default `None`.
#[proc_macro_derive(Error, attributes(error))]
pub fn derive_error(input: TokenStream) -> TokenStream {
    error::derive_error(input)
}
