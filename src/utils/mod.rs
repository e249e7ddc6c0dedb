//! Cross-cutting helpers: logging macros and environment configuration.

pub mod config;
pub mod log;
