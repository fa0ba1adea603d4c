//! Unified error types for the deck toolkit.
//!
//! Subsystem errors convert into [`Error`] through the `From` implementations
//! in [`conversions`].

// Submodule declarations
pub mod conversions;
pub mod types;

// Re-exports
pub use types::{Error, Result};
