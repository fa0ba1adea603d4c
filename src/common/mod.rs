//! Common types and utilities shared across the deck toolkit.
//!
//! This module provides the unified error type and the XML text helpers used
//! by the archive template renderer.

// Submodule declarations
pub mod error;
pub mod xml;

// Re-exports for convenience
pub use error::{Error, Result};
