//! Content hashing and shader source checksums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// XXH3-128 of a whole entry file, shown by `glint inspect`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    /// Hashes `data`.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(xxhash_rust::xxh3::xxh3_128(data).to_be_bytes())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", u128::from_be_bytes(self.0))
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_string();
        write!(f, "ContentHash({}..)", &hex[..8])
    }
}

/// Checksum of one shader's source text, used to build cache keys.
///
/// Combines an XXH3-64 content hash with a rolling XOR-and-rotate pass over
/// every byte. The second pass makes small local edits (renaming a type,
/// flipping one digit) move bits that the content hash alone might map onto
/// an unrelated entry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SourceChecksum {
    hash: u64,
    rolling: u32,
}

impl SourceChecksum {
    /// Number of characters in the [`Display`](fmt::Display) rendering.
    pub const HEX_LEN: usize = 24;

    /// Computes the checksum of a source string.
    pub fn of(source: &str) -> Self {
        let bytes = source.as_bytes();
        let hash = xxhash_rust::xxh3::xxh3_64(bytes);
        let rolling = bytes
            .iter()
            .fold(0u32, |acc, &b| (acc ^ u32::from(b)).rotate_left(7));
        Self { hash, rolling }
    }

    /// Returns the content hash component.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Returns the rolling XOR-and-rotate component.
    pub fn rolling(&self) -> u32 {
        self.rolling
    }
}

impl fmt::Display for SourceChecksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}{:08x}", self.hash, self.rolling)
    }
}
