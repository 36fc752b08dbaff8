//! GlintIR, the shader intermediate representation persisted by the cache.
//!
//! A [`Shader`] owns its variables, functions, and signatures in arenas and
//! refers to them by ID, so shared references (many dereferences of one
//! variable, many calls of one signature) survive serialization as plain
//! integers. A [`Program`] groups linked per-stage shaders with the uniform
//! and binding metadata produced by the linker.

#![warn(missing_docs)]

#[macro_use]
mod macros;

pub mod arena;
pub mod builtins;
pub mod constant;
pub mod expr;
pub mod function;
pub mod ids;
pub mod print;
pub mod program;
pub mod shader;
pub mod stmt;
pub mod types;
pub mod validate;
pub mod variable;

pub use arena::{Arena, ArenaId};
pub use builtins::{BuiltinParam, BuiltinSignature, BuiltinTable, StandardBuiltins};
pub use constant::{Constant, ConstantValue};
pub use expr::{ExprOp, Expression, LodInfo, LodKind, Rvalue, Swizzle, Texture, TextureOp};
pub use function::{Function, Signature};
pub use ids::{FunctionId, SignatureId, TypeId, VariableId};
pub use program::{
    Program, ProgramHeader, UniformBlock, UniformStorage, UniformStorageHeader, UniformTypeRef,
};
pub use shader::{Extension, ExtensionSet, Shader, ShaderHeader, ShaderStage};
pub use stmt::{Assignment, Call, IfStmt, Instruction, Loop, LoopJumpMode};
pub use types::{InterfacePacking, SamplerDim, ScalarKind, StructField, Type, TypeDb};
pub use variable::{
    Interpolation, StateSlot, Variable, VariableFlags, VariableMode, MAX_STATE_SLOTS,
};
