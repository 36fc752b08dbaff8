//! Bounds-checked reading over a memory-mapped file or caller memory.
//!
//! Every read checks the remaining length first and returns a
//! [`DecodeError`] instead of touching memory past the end. The first
//! failure also poisons the reader: every later read fails without moving
//! the cursor, so a caller that forgets to check one result still cannot
//! decode garbage after it.

use crate::error::DecodeError;
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

/// A fixed-width little-endian value.
pub trait Primitive: Copy {
    /// Encoded width in bytes.
    const SIZE: usize;

    /// Decodes from exactly [`SIZE`](Self::SIZE) bytes.
    fn from_le(bytes: &[u8]) -> Self;

    /// Appends the encoding to `out`.
    fn write_le(self, out: &mut Vec<u8>);
}

macro_rules! impl_primitive {
    ($($t:ty),*) => {
        $(
            impl Primitive for $t {
                const SIZE: usize = std::mem::size_of::<$t>();

                fn from_le(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$t>()];
                    raw.copy_from_slice(&bytes[..Self::SIZE]);
                    <$t>::from_le_bytes(raw)
                }

                fn write_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

impl_primitive!(u8, u16, u32, i32, u64, i64, f32);

enum Backing<'a> {
    Mapped(Mmap),
    Owned(Vec<u8>),
    Borrowed(&'a [u8]),
}

/// A read cursor over an immutable byte buffer.
pub struct MappedBuffer<'a> {
    backing: Backing<'a>,
    pos: usize,
    failed: bool,
}

impl MappedBuffer<'static> {
    /// Maps `path` read-only.
    ///
    /// Empty files cannot be mapped on every platform and are read as an
    /// empty owned buffer instead.
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Ok(Self::from_vec(Vec::new()));
        }
        // SAFETY: the mapping is read-only and private to this reader. A
        // concurrent writer truncating the file is outside the cache's
        // contract (entries are never rewritten in place), and eviction
        // unlinking it leaves the mapping valid.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self {
            backing: Backing::Mapped(mmap),
            pos: 0,
            failed: false,
        })
    }

    /// Reads from an owned buffer.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self {
            backing: Backing::Owned(bytes),
            pos: 0,
            failed: false,
        }
    }
}

impl<'a> MappedBuffer<'a> {
    /// Reads from caller memory; the reader never frees it.
    pub fn from_slice(bytes: &'a [u8]) -> Self {
        Self {
            backing: Backing::Borrowed(bytes),
            pos: 0,
            failed: false,
        }
    }

    /// The whole underlying buffer.
    pub fn as_bytes(&self) -> &[u8] {
        match &self.backing {
            Backing::Mapped(m) => m,
            Backing::Owned(v) => v,
            Backing::Borrowed(s) => s,
        }
    }

    /// Total buffer size in bytes.
    pub fn size(&self) -> usize {
        self.as_bytes().len()
    }

    /// Current cursor position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes between the cursor and the end (zero if the cursor is past it).
    pub fn remaining(&self) -> usize {
        self.size().saturating_sub(self.pos)
    }

    /// Returns `true` once any read has failed.
    pub fn has_errors(&self) -> bool {
        self.failed
    }

    /// Moves the cursor to an absolute position. Not bounds-checked; the
    /// next read is.
    pub fn seek(&mut self, pos: usize) {
        if !self.failed {
            self.pos = pos;
        }
    }

    /// Moves the cursor forward. Not bounds-checked; the next read is.
    pub fn advance(&mut self, len: usize) {
        if !self.failed {
            self.pos = self.pos.saturating_add(len);
        }
    }

    fn fail<T>(&mut self, err: DecodeError) -> Result<T, DecodeError> {
        self.failed = true;
        Err(err)
    }

    /// Reads `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&[u8], DecodeError> {
        if self.failed {
            return Err(DecodeError::Poisoned);
        }
        let start = self.pos;
        let size = self.size();
        match start.checked_add(len).filter(|end| *end <= size) {
            Some(end) => {
                self.pos = end;
                Ok(&self.as_bytes()[start..end])
            }
            None => self.fail(DecodeError::OutOfBounds {
                offset: start,
                len,
                size,
            }),
        }
    }

    /// Reads a fixed-width value.
    pub fn read<T: Primitive>(&mut self) -> Result<T, DecodeError> {
        self.read_bytes(T::SIZE).map(T::from_le)
    }

    /// Reads a byte that must be `0` or `1`.
    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        let offset = self.pos;
        match self.read::<u8>()? {
            0 => Ok(false),
            1 => Ok(true),
            other => self.fail(DecodeError::Invalid {
                reason: format!("boolean byte {other} at offset {offset}"),
            }),
        }
    }

    /// Reads a length-prefixed, NUL-terminated string.
    ///
    /// A length of `0` is an absent string; an empty string has length `1`.
    pub fn read_string(&mut self) -> Result<Option<String>, DecodeError> {
        let offset = self.pos;
        let len = self.read::<u32>()? as usize;
        if len == 0 {
            return Ok(None);
        }
        let bytes = self.read_bytes(len)?;
        let Some((&0, text)) = bytes.split_last() else {
            return self.fail(DecodeError::UnterminatedString { offset });
        };
        match std::str::from_utf8(text) {
            Ok(s) => Ok(Some(s.to_string())),
            Err(_) => self.fail(DecodeError::InvalidUtf8 { offset }),
        }
    }

    /// Reads a string that must be present.
    pub fn read_required_string(&mut self, what: &str) -> Result<String, DecodeError> {
        match self.read_string()? {
            Some(s) => Ok(s),
            None => self.fail(DecodeError::invalid(format!("missing {what}"))),
        }
    }

    /// Reads a `u32` count of items that each occupy at least `min_item_size`
    /// bytes, rejecting counts the remaining buffer cannot possibly hold.
    pub fn read_count(&mut self, min_item_size: usize) -> Result<u32, DecodeError> {
        let offset = self.pos;
        let count = self.read::<u32>()?;
        let needed = (count as usize).saturating_mul(min_item_size.max(1));
        if needed > self.remaining() {
            return self.fail(DecodeError::OutOfBounds {
                offset,
                len: needed,
                size: self.size(),
            });
        }
        Ok(count)
    }
}
