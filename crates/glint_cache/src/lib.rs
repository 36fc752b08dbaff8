//! On-disk cache of compiled shaders and linked programs.
//!
//! This crate serializes GlintIR trees and their link metadata into
//! self-validating entry files, reads them back into fresh trees, and keeps
//! the cache directory within its size budget. Entries from another build
//! or driver are rejected, and corrupt or half-written files are treated as
//! misses rather than errors.

#![warn(missing_docs)]

pub mod cache;
pub mod directory;
pub mod entry;
pub mod error;
pub mod fingerprint;
pub mod inspect;
pub mod ir_reader;
pub mod ir_writer;
pub mod node;
pub mod reader;
pub mod writer;

pub use cache::{ShaderCache, StoreOutcome};
pub use directory::{cache_key, CacheKey, CacheKind, EvictionReport};
pub use error::{CacheError, DecodeError};
pub use fingerprint::Fingerprint;
pub use reader::MappedBuffer;
pub use writer::WriteBuffer;
