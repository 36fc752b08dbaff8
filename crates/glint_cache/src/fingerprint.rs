//! The validation block stamped at the front of every cache entry.
//!
//! An entry may only be loaded by the build that wrote it. The block records
//! the record-layout values this build was compiled with, a build magic
//! string, and the driver identity from configuration. Any difference makes
//! the entry stale.

use crate::error::{CacheError, DecodeError};
use crate::node::NodeKind;
use crate::reader::MappedBuffer;
use crate::writer::WriteBuffer;
use glint_config::CacheConfig;
use glint_ir::{ExprOp, StateSlot, TextureOp, VariableFlags, MAX_STATE_SLOTS};
use serde::Serialize;

/// Version of the record layouts. Bump whenever any record body changes.
pub const SCHEMA_VERSION: u32 = 1;

/// Identifies the build that wrote an entry.
pub const BUILD_MAGIC: &str = concat!("glint-", env!("CARGO_PKG_VERSION"));

/// Most layout values a validation block may declare.
const MAX_LAYOUT_VALUES: u32 = 64;

/// The identity an entry must match to be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fingerprint {
    /// Record-layout values, [`SCHEMA_VERSION`] first.
    pub layout: Vec<u32>,
    /// Build magic string.
    pub magic: String,
    /// Driver vendor string.
    pub vendor: String,
    /// Driver renderer string.
    pub renderer: String,
}

impl Fingerprint {
    /// The fingerprint of this build for the given driver identity.
    pub fn current(vendor: &str, renderer: &str) -> Self {
        Self {
            layout: Self::layout_values(),
            magic: BUILD_MAGIC.to_string(),
            vendor: vendor.to_string(),
            renderer: renderer.to_string(),
        }
    }

    /// The fingerprint of this build for a configured driver identity.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::current(&config.vendor, &config.renderer)
    }

    /// Layout values of this build.
    pub fn layout_values() -> Vec<u32> {
        vec![
            SCHEMA_VERSION,
            NodeKind::COUNT as u32,
            ExprOp::COUNT as u32,
            TextureOp::COUNT as u32,
            VariableFlags::RAW_LEN as u32,
            StateSlot::RAW_LEN as u32,
            MAX_STATE_SLOTS,
        ]
    }

    /// Appends the validation block.
    pub fn write(&self, out: &mut WriteBuffer) {
        out.write(self.layout.len() as u32);
        for value in &self.layout {
            out.write(*value);
        }
        out.write_string(Some(&self.magic));
        out.write_string(Some(&self.vendor));
        out.write_string(Some(&self.renderer));
    }

    /// Reads a validation block.
    pub fn read(input: &mut MappedBuffer<'_>) -> Result<Self, DecodeError> {
        let count = input.read_count(4)?;
        if count > MAX_LAYOUT_VALUES {
            return Err(DecodeError::invalid(format!(
                "validation block declares {count} layout values"
            )));
        }
        let mut layout = Vec::with_capacity(count as usize);
        for _ in 0..count {
            layout.push(input.read::<u32>()?);
        }
        Ok(Self {
            layout,
            magic: input.read_required_string("build magic")?,
            vendor: input.read_required_string("vendor")?,
            renderer: input.read_required_string("renderer")?,
        })
    }

    /// Reads a validation block and compares it with `self`.
    ///
    /// A block that cannot even be read counts as a mismatch: the bytes
    /// there were not written by any build that agrees with this one.
    pub fn check(&self, input: &mut MappedBuffer<'_>) -> Result<(), CacheError> {
        let found = Self::read(input).map_err(|_| CacheError::FingerprintMismatch {
            field: "validation block",
        })?;
        let field = if found.layout != self.layout {
            "layout"
        } else if found.magic != self.magic {
            "build magic"
        } else if found.vendor != self.vendor {
            "vendor"
        } else if found.renderer != self.renderer {
            "renderer"
        } else {
            return Ok(());
        };
        Err(CacheError::FingerprintMismatch { field })
    }
}
