//! Variable declarations.

use crate::constant::Constant;
use crate::ids::TypeId;

/// Upper bound on [`Variable::state_slots`].
///
/// The largest built-in state uniforms (the fixed-function light and
/// material arrays) need well under this; anything above it is corruption.
pub const MAX_STATE_SLOTS: u32 = 256;

wire_enum! {
    /// Storage qualifier of a variable.
    pub enum VariableMode: u8 {
        /// Function-local or global temporary declared by the user.
        Auto = 0,
        /// `uniform`.
        Uniform = 1,
        /// Stage input (`in`, `attribute`, `varying` in fragment).
        ShaderIn = 2,
        /// Stage output (`out`, `varying` in vertex).
        ShaderOut = 3,
        /// Function `in` parameter.
        FunctionIn = 4,
        /// Function `out` parameter.
        FunctionOut = 5,
        /// Function `inout` parameter.
        FunctionInOut = 6,
        /// Function `const in` parameter.
        ConstIn = 7,
        /// Built-in system value (`gl_VertexID`).
        SystemValue = 8,
        /// Compiler-generated temporary.
        Temporary = 9,
    }
}

wire_enum! {
    /// Interpolation qualifier of a varying.
    pub enum Interpolation: u8 {
        /// `smooth` (perspective-correct).
        Smooth = 0,
        /// `flat`.
        Flat = 1,
        /// `noperspective`.
        NoPerspective = 2,
    }
}

/// Packed qualifier and layout flags of a variable.
///
/// The cache stores this block verbatim ([`to_raw`](Self::to_raw) /
/// [`from_raw`](Self::from_raw)) rather than field by field, so adding a
/// flag bit does not change the record layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VariableFlags {
    bits: u32,
    /// Explicit or assigned location, `-1` when unset.
    pub location: i32,
    /// Dual-source blend index.
    pub index: i32,
    /// Explicit binding point.
    pub binding: i32,
    /// Highest constant array index seen by the front end.
    pub max_array_access: i32,
}

impl VariableFlags {
    /// Length of the raw block in bytes.
    pub const RAW_LEN: usize = 20;

    /// Declared `const` or otherwise read-only.
    pub const READ_ONLY: u32 = 1 << 0;
    /// `centroid` qualifier.
    pub const CENTROID: u32 = 1 << 1;
    /// `sample` qualifier.
    pub const SAMPLE: u32 = 1 << 2;
    /// `invariant` qualifier.
    pub const INVARIANT: u32 = 1 << 3;
    /// `layout(location = ..)` was given.
    pub const EXPLICIT_LOCATION: u32 = 1 << 4;
    /// `layout(index = ..)` was given.
    pub const EXPLICIT_INDEX: u32 = 1 << 5;
    /// `layout(binding = ..)` was given.
    pub const EXPLICIT_BINDING: u32 = 1 << 6;
    /// `gl_FragCoord` uses an upper-left origin.
    pub const ORIGIN_UPPER_LEFT: u32 = 1 << 7;
    /// `gl_FragCoord` uses integer pixel centers.
    pub const PIXEL_CENTER_INTEGER: u32 = 1 << 8;
    /// The variable is written somewhere in the shader.
    pub const ASSIGNED: u32 = 1 << 9;
    /// The variable is read somewhere in the shader.
    pub const USED: u32 = 1 << 10;

    const INTERP_SHIFT: u32 = 16;
    const INTERP_MASK: u32 = 0b11 << Self::INTERP_SHIFT;

    /// Flags with no bits set and no location.
    pub fn new() -> Self {
        Self {
            location: -1,
            ..Self::default()
        }
    }

    /// Returns `true` if every bit of `flag` is set.
    pub fn contains(&self, flag: u32) -> bool {
        self.bits & flag == flag
    }

    /// Sets or clears `flag`.
    pub fn set(&mut self, flag: u32, on: bool) {
        if on {
            self.bits |= flag;
        } else {
            self.bits &= !flag;
        }
    }

    /// Builder form of [`set`](Self::set) with `on = true`.
    pub fn with(mut self, flag: u32) -> Self {
        self.set(flag, true);
        self
    }

    /// Returns the raw flag bits.
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Decodes the interpolation qualifier, `None` if the bits are invalid.
    pub fn interpolation(&self) -> Option<Interpolation> {
        let code = ((self.bits & Self::INTERP_MASK) >> Self::INTERP_SHIFT) as u8;
        Interpolation::try_from(code).ok()
    }

    /// Stores the interpolation qualifier.
    pub fn set_interpolation(&mut self, interp: Interpolation) {
        self.bits = (self.bits & !Self::INTERP_MASK)
            | (u32::from(interp.code()) << Self::INTERP_SHIFT);
    }

    /// Encodes the block as little-endian bytes.
    pub fn to_raw(&self) -> [u8; Self::RAW_LEN] {
        let mut raw = [0u8; Self::RAW_LEN];
        raw[0..4].copy_from_slice(&self.bits.to_le_bytes());
        raw[4..8].copy_from_slice(&self.location.to_le_bytes());
        raw[8..12].copy_from_slice(&self.index.to_le_bytes());
        raw[12..16].copy_from_slice(&self.binding.to_le_bytes());
        raw[16..20].copy_from_slice(&self.max_array_access.to_le_bytes());
        raw
    }

    /// Decodes a block produced by [`to_raw`](Self::to_raw), bit for bit.
    pub fn from_raw(raw: &[u8; Self::RAW_LEN]) -> Self {
        let word = |i: usize| [raw[i], raw[i + 1], raw[i + 2], raw[i + 3]];
        Self {
            bits: u32::from_le_bytes(word(0)),
            location: i32::from_le_bytes(word(4)),
            index: i32::from_le_bytes(word(8)),
            binding: i32::from_le_bytes(word(12)),
            max_array_access: i32::from_le_bytes(word(16)),
        }
    }
}

/// One built-in state reference backing a state uniform (`gl_ModelViewMatrix`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSlot {
    /// Swizzle applied to the fetched state vector.
    pub swizzle: i32,
    /// State token tuple identifying the driver state.
    pub tokens: [i32; 5],
}

impl StateSlot {
    /// Encoded size of one slot: the swizzle plus five tokens.
    pub const RAW_LEN: usize = 24;
}

/// A declared variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// Variable name (may be empty for anonymous temporaries).
    pub name: String,
    /// Declared type.
    pub ty: TypeId,
    /// Storage qualifier.
    pub mode: VariableMode,
    /// Packed qualifier and layout flags.
    pub flags: VariableFlags,
    /// Built-in state references for state uniforms.
    pub state_slots: Vec<StateSlot>,
    /// Folded value of a `const` variable.
    pub constant_value: Option<Constant>,
    /// Declared initializer of a `const` or `uniform` variable.
    pub constant_initializer: Option<Constant>,
    /// Block type for members of an interface block.
    pub interface_type: Option<TypeId>,
}

impl Variable {
    /// Creates a variable with default flags and no optional parts.
    pub fn new(name: impl Into<String>, ty: TypeId, mode: VariableMode) -> Self {
        Self {
            name: name.into(),
            ty,
            mode,
            flags: VariableFlags::new(),
            state_slots: Vec::new(),
            constant_value: None,
            constant_initializer: None,
            interface_type: None,
        }
    }

    /// Returns `true` for function parameter modes.
    pub fn is_parameter(&self) -> bool {
        matches!(
            self.mode,
            VariableMode::FunctionIn
                | VariableMode::FunctionOut
                | VariableMode::FunctionInOut
                | VariableMode::ConstIn
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_raw_roundtrip_is_bitwise() {
        let mut flags = VariableFlags::new()
            .with(VariableFlags::CENTROID)
            .with(VariableFlags::EXPLICIT_LOCATION);
        flags.location = 3;
        flags.binding = -7;
        flags.max_array_access = 11;
        flags.set_interpolation(Interpolation::Flat);
        let raw = flags.to_raw();
        assert_eq!(VariableFlags::from_raw(&raw), flags);
        assert_eq!(VariableFlags::from_raw(&raw).to_raw(), raw);
    }

    #[test]
    fn flags_set_and_clear() {
        let mut flags = VariableFlags::new();
        assert!(!flags.contains(VariableFlags::INVARIANT));
        flags.set(VariableFlags::INVARIANT, true);
        assert!(flags.contains(VariableFlags::INVARIANT));
        flags.set(VariableFlags::INVARIANT, false);
        assert_eq!(flags.bits(), 0);
        assert_eq!(flags.location, -1);
    }

    #[test]
    fn interpolation_decoding() {
        let mut flags = VariableFlags::new();
        assert_eq!(flags.interpolation(), Some(Interpolation::Smooth));
        flags.set_interpolation(Interpolation::NoPerspective);
        assert_eq!(flags.interpolation(), Some(Interpolation::NoPerspective));
        // Code 3 is not a valid qualifier.
        let raw_bits = 3u32 << 16;
        let mut raw = [0u8; VariableFlags::RAW_LEN];
        raw[0..4].copy_from_slice(&raw_bits.to_le_bytes());
        assert_eq!(VariableFlags::from_raw(&raw).interpolation(), None);
    }

    #[test]
    fn parameter_modes() {
        let ty = TypeId::from_raw(0);
        assert!(Variable::new("a", ty, VariableMode::FunctionInOut).is_parameter());
        assert!(!Variable::new("b", ty, VariableMode::Uniform).is_parameter());
    }
}
