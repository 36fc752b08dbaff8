//! Opaque ID newtypes for arena-owned IR entities.
//!
//! Each ID is a thin `u32` wrapper that is `Copy` and `Hash`. IDs are created
//! by [`Arena::alloc`](crate::arena::Arena::alloc) or [`TypeDb::intern`](crate::types::TypeDb::intern)
//! and are only meaningful within the shader that produced them.

use crate::arena::ArenaId;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl ArenaId for $name {
            fn from_raw(index: u32) -> Self {
                Self(index)
            }

            fn as_raw(self) -> u32 {
                self.0
            }
        }
    };
}

define_id!(
    /// Opaque, copyable ID for a variable owned by a shader.
    VariableId
);

define_id!(
    /// Opaque, copyable ID for a function (a name with one or more overloads).
    FunctionId
);

define_id!(
    /// Opaque, copyable ID for one overload of a function.
    SignatureId
);

define_id!(
    /// Opaque, copyable ID for an interned type in the [`TypeDb`](crate::types::TypeDb).
    TypeId
);
