//! Error types for cache operations.

use crate::node::NodeKind;
use glint_common::InternalError;
use std::path::PathBuf;

/// Structural failures while decoding bytes.
///
/// Produced by the bounds-checked reader and the IR deserializer. Any of
/// these aborts the whole entry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    /// A read would pass the end of the buffer.
    #[error("read of {len} bytes at offset {offset} overruns buffer of {size} bytes")]
    OutOfBounds {
        /// Cursor position of the failed read.
        offset: usize,
        /// Bytes requested.
        len: usize,
        /// Total buffer size.
        size: usize,
    },

    /// An earlier read already failed; the reader refuses further reads.
    #[error("reader is in a failed state")]
    Poisoned,

    /// A string's final byte is not a NUL terminator.
    #[error("string at offset {offset} is not NUL-terminated")]
    UnterminatedString {
        /// Offset of the string's length field.
        offset: usize,
    },

    /// A string is not valid UTF-8.
    #[error("string at offset {offset} is not valid UTF-8")]
    InvalidUtf8 {
        /// Offset of the string's length field.
        offset: usize,
    },

    /// An enum code is not recognized.
    #[error("unknown {what} code {code}")]
    UnknownCode {
        /// Which enum was being decoded.
        what: &'static str,
        /// The offending code.
        code: u64,
    },

    /// A record kind appeared where it is not allowed.
    #[error("unexpected {found:?} record where {expected} was expected")]
    UnexpectedKind {
        /// What the decoder was looking for.
        expected: &'static str,
        /// What it found.
        found: NodeKind,
    },

    /// A record body did not occupy exactly its declared length.
    #[error("{kind:?} record declares {declared} bytes but its body spans {consumed}")]
    LengthMismatch {
        /// The record kind.
        kind: NodeKind,
        /// Length from the record header.
        declared: usize,
        /// Bytes actually consumed by the body.
        consumed: usize,
    },

    /// A variable claims more state slots than any real variable has.
    #[error("{count} state slots exceeds the limit of {max}")]
    TooManyStateSlots {
        /// The stored count.
        count: u32,
        /// The limit.
        max: u32,
    },

    /// A dereference names a variable id that has not been declared.
    #[error("dereference of undeclared variable id {id}")]
    DanglingVariable {
        /// The serialized variable id.
        id: i64,
    },

    /// Two declarations share one variable id.
    #[error("variable id {id} declared twice")]
    DuplicateVariable {
        /// The serialized variable id.
        id: i64,
    },

    /// A call matches no builtin and no collected prototype.
    #[error("call of `{name}` matches no known signature")]
    UnresolvedCall {
        /// The callee name.
        name: String,
    },

    /// A builtin signature is unknown to the builtin table.
    #[error("builtin `{name}` is not in the builtin table")]
    UnknownBuiltin {
        /// The function name.
        name: String,
    },

    /// Records or type descriptors nest deeper than allowed.
    #[error("nesting deeper than {max} levels")]
    TooDeep {
        /// The limit that was hit.
        max: u32,
    },

    /// A decoded value is out of range or inconsistent.
    #[error("invalid data: {reason}")]
    Invalid {
        /// Description of the problem.
        reason: String,
    },

    /// The reconstructed tree failed IR validation.
    #[error("reconstructed IR is malformed: {0}")]
    Malformed(#[from] InternalError),
}

impl DecodeError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        DecodeError::Invalid {
            reason: reason.into(),
        }
    }
}

/// Errors that can occur during cache operations.
///
/// Most cache operations are fail-safe: errors result in cache misses
/// rather than hard failures. This enum is used for internal error
/// propagation within the cache subsystem and for logging.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing cache files.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The completeness sentinel is zero: the writer never finished.
    #[error("cache entry is incomplete")]
    Incomplete,

    /// The entry was produced by a different build or driver.
    #[error("cache entry fingerprint mismatch in {field}")]
    FingerprintMismatch {
        /// The first validation field that differed.
        field: &'static str,
    },

    /// The object uses features this format cannot represent.
    #[error("not cacheable: {reason}")]
    Ineligible {
        /// Which feature made the object ineligible.
        reason: String,
    },

    /// The entry bytes are structurally corrupt.
    #[error("cache entry is corrupt: {0}")]
    Decode(#[from] DecodeError),

    /// A header block could not be encoded or decoded.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },

    /// The in-memory object is not well-formed and cannot be written.
    #[error("refusing to cache: {0}")]
    Validation(InternalError),
}

impl CacheError {
    /// Returns `true` if the offending file can never become valid for this
    /// build and should be deleted.
    pub fn is_stale(&self) -> bool {
        matches!(
            self,
            CacheError::Incomplete | CacheError::FingerprintMismatch { .. }
        )
    }
}
