//! Shared foundational types used across the Glint shader cache.
//!
//! This crate provides content hashing and source checksums for cache keys,
//! byte-size values for cache budgets, and the internal error type used when
//! an IR tree is found to be malformed.

#![warn(missing_docs)]

pub mod hash;
pub mod result;
pub mod size;

pub use hash::{ContentHash, SourceChecksum};
pub use result::{GlintResult, InternalError};
pub use size::{ByteSize, ParseByteSizeError};
