//! Functions and their overloads.

use crate::ids::{FunctionId, SignatureId, TypeId, VariableId};
use crate::stmt::Instruction;

/// A named function: the set of overloads sharing one name.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    /// Function name.
    pub name: String,
    /// Overloads in declaration order.
    pub signatures: Vec<SignatureId>,
}

/// One overload of a [`Function`].
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    /// The owning function.
    pub function: FunctionId,
    /// Declared return type.
    pub return_type: TypeId,
    /// Formal parameters, in order. Each is a variable in the shader arena.
    pub parameters: Vec<VariableId>,
    /// Function body. Empty for prototypes and for builtins imported from
    /// a [`BuiltinTable`](crate::builtins::BuiltinTable).
    pub body: Vec<Instruction>,
    /// Provided by the builtin table rather than user source.
    pub is_builtin: bool,
    /// A body has been seen (as opposed to a bare prototype).
    pub is_defined: bool,
}

impl Signature {
    /// A user-defined signature with no parameters and an empty body.
    pub fn new(function: FunctionId, return_type: TypeId) -> Self {
        Self {
            function,
            return_type,
            parameters: Vec::new(),
            body: Vec::new(),
            is_builtin: false,
            is_defined: false,
        }
    }
}
