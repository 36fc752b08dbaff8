//! Byte-size values with unit parsing and display.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A size in bytes.
///
/// Parses strings like `"64MB"`, `"512K"`, `"1GiB"`, and bare numbers
/// (interpreted as bytes). All unit prefixes are binary: `K` is 1024.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ByteSize(u64);

impl ByteSize {
    /// Creates a size from a byte count.
    pub fn new(bytes: u64) -> Self {
        Self(bytes)
    }

    /// Returns the size in bytes.
    pub fn bytes(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteSize({self})")
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const UNITS: [(u64, &str); 3] = [(1 << 30, "GB"), (1 << 20, "MB"), (1 << 10, "KB")];
        for (scale, unit) in UNITS {
            if self.0 >= scale && self.0 % scale == 0 {
                return write!(f, "{}{unit}", self.0 / scale);
            }
        }
        write!(f, "{}B", self.0)
    }
}

/// Error type for parsing byte-size strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseByteSizeError {
    /// The input string that failed to parse.
    pub input: String,
}

impl fmt::Display for ParseByteSizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid byte size: '{}'", self.input)
    }
}

impl std::error::Error for ParseByteSizeError {}

impl FromStr for ByteSize {
    type Err = ParseByteSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || ParseByteSizeError {
            input: s.to_string(),
        };

        let lower = s.to_ascii_lowercase();
        // Longest suffixes first so "mb" is not read as "b".
        const SUFFIXES: [(&str, u64); 10] = [
            ("gib", 1 << 30),
            ("mib", 1 << 20),
            ("kib", 1 << 10),
            ("gb", 1 << 30),
            ("mb", 1 << 20),
            ("kb", 1 << 10),
            ("g", 1 << 30),
            ("m", 1 << 20),
            ("k", 1 << 10),
            ("b", 1),
        ];
        for (suffix, scale) in SUFFIXES {
            if let Some(num) = lower.strip_suffix(suffix) {
                let val: u64 = num.trim().parse().map_err(|_| err())?;
                return val.checked_mul(scale).map(ByteSize).ok_or_else(err);
            }
        }

        let val: u64 = s.parse().map_err(|_| err())?;
        Ok(ByteSize(val))
    }
}
