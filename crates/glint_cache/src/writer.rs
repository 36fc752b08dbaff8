//! Growable binary writer with backpatching.

use crate::reader::Primitive;

/// A reserved `u32` length field, filled in by [`WriteBuffer::end_length`].
#[derive(Debug)]
#[must_use = "a length slot must be closed with end_length"]
pub struct LengthSlot {
    at: usize,
}

/// An append-only byte buffer.
///
/// All values are written little-endian. Strings are `(u32 len, bytes, NUL)`
/// where `len` counts the terminator, so an absent string is length `0`.
#[derive(Debug, Default)]
pub struct WriteBuffer {
    bytes: Vec<u8>,
}

impl WriteBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a fixed-width value.
    pub fn write<T: Primitive>(&mut self, value: T) {
        value.write_le(&mut self.bytes);
    }

    /// Appends a boolean as one byte.
    pub fn write_bool(&mut self, value: bool) {
        self.bytes.push(u8::from(value));
    }

    /// Appends a length-prefixed, NUL-terminated string.
    pub fn write_string(&mut self, s: Option<&str>) {
        match s {
            None => self.write(0u32),
            Some(s) => {
                self.write((s.len() + 1) as u32);
                self.bytes.extend_from_slice(s.as_bytes());
                self.bytes.push(0);
            }
        }
    }

    /// Appends raw bytes.
    pub fn write_block(&mut self, data: &[u8]) {
        self.bytes.extend_from_slice(data);
    }

    /// Copies `data` over already-written bytes starting at `at`.
    ///
    /// Never changes the buffer length.
    ///
    /// # Panics
    ///
    /// Panics if `at + data.len()` is past [`position`](Self::position):
    /// only reserved regions may be overwritten.
    pub fn overwrite(&mut self, data: &[u8], at: usize) {
        let end = at
            .checked_add(data.len())
            .filter(|end| *end <= self.bytes.len());
        match end {
            Some(end) => self.bytes[at..end].copy_from_slice(data),
            None => panic!(
                "overwrite of {} bytes at {at} past written length {}",
                data.len(),
                self.bytes.len()
            ),
        }
    }

    /// Current length in bytes.
    pub fn position(&self) -> usize {
        self.bytes.len()
    }

    /// Writes a placeholder `u32` to be backpatched with the number of bytes
    /// written after it.
    pub fn begin_length(&mut self) -> LengthSlot {
        let at = self.position();
        self.write(0u32);
        LengthSlot { at }
    }

    /// Backpatches `slot` with the bytes written since it was reserved.
    pub fn end_length(&mut self, slot: LengthSlot) {
        let len = self.position() - slot.at - std::mem::size_of::<u32>();
        self.overwrite(&(len as u32).to_le_bytes(), slot.at);
    }

    /// The bytes written so far.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Hands the written bytes to the caller, leaving the writer empty.
    pub fn release(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.bytes)
    }
}
