//! Record kind tags and nesting limits of the IR stream.

/// Deepest record nesting the reader accepts.
pub const MAX_NESTING_DEPTH: u32 = 256;

/// Deepest type-descriptor nesting the reader accepts.
pub const MAX_TYPE_DEPTH: u32 = 32;

macro_rules! node_kinds {
    ($($variant:ident = $value:literal),+ $(,)?) => {
        /// Tag byte at the start of every IR record.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum NodeKind {
            $(
                #[allow(missing_docs)]
                $variant = $value,
            )+
        }

        impl NodeKind {
            /// Every kind, in tag order.
            pub const ALL: &'static [NodeKind] = &[$(NodeKind::$variant),+];

            /// Number of kinds.
            pub const COUNT: usize = Self::ALL.len();

            /// The tag byte.
            pub fn code(self) -> u8 {
                self as u8
            }
        }

        impl TryFrom<u8> for NodeKind {
            type Error = u8;

            fn try_from(value: u8) -> Result<Self, u8> {
                match value {
                    $($value => Ok(NodeKind::$variant),)+
                    other => Err(other),
                }
            }
        }
    };
}

node_kinds! {
    Variable = 0,
    Assignment = 1,
    Call = 2,
    Constant = 3,
    DerefVariable = 4,
    DerefArray = 5,
    DerefRecord = 6,
    Discard = 7,
    Expression = 8,
    Function = 9,
    FunctionSignature = 10,
    If = 11,
    Loop = 12,
    LoopJump = 13,
    Return = 14,
    Swizzle = 15,
    Texture = 16,
    EmitVertex = 17,
    EndPrimitive = 18,
}

impl NodeKind {
    /// Kinds that produce a value.
    pub fn is_rvalue(self) -> bool {
        matches!(
            self,
            NodeKind::Constant
                | NodeKind::DerefVariable
                | NodeKind::DerefArray
                | NodeKind::DerefRecord
                | NodeKind::Expression
                | NodeKind::Swizzle
                | NodeKind::Texture
        )
    }

    /// Kinds that may appear in a statement list.
    pub fn is_statement(self) -> bool {
        !self.is_rvalue() && self != NodeKind::FunctionSignature
    }
}

/// Tag byte of a type descriptor.
pub(crate) mod type_tag {
    pub const VOID: u8 = 0;
    pub const ERROR: u8 = 1;
    pub const NUMERIC: u8 = 2;
    pub const SAMPLER: u8 = 3;
    pub const ARRAY: u8 = 4;
    pub const STRUCT: u8 = 5;
    pub const INTERFACE: u8 = 6;
}
