//! Statements: the instruction lists that make up shader and function bodies.

use crate::expr::Rvalue;
use crate::ids::{FunctionId, SignatureId, VariableId};

wire_enum! {
    /// Target of a [`Instruction::LoopJump`].
    pub enum LoopJumpMode: u8 {
        /// `break`.
        Break = 0,
        /// `continue`.
        Continue = 1,
    }
}

/// A (possibly conditional, possibly masked) store.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Destination dereference.
    pub lhs: Rvalue,
    /// Stored value.
    pub rhs: Rvalue,
    /// The store only happens when this evaluates true.
    pub condition: Option<Rvalue>,
    /// Written components of a vector destination (bit `i` = component `i`),
    /// `0` for whole-value stores.
    pub write_mask: u8,
}

/// Two-way branch.
#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    /// Branch condition.
    pub condition: Rvalue,
    /// Taken when the condition is true.
    pub then_body: Vec<Instruction>,
    /// Taken otherwise.
    pub else_body: Vec<Instruction>,
}

/// Infinite loop; exits via [`LoopJumpMode::Break`] or a return.
#[derive(Debug, Clone, PartialEq)]
pub struct Loop {
    /// Loop body.
    pub body: Vec<Instruction>,
}

/// A call of a user or builtin function.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// The called overload.
    pub callee: SignatureId,
    /// Actual arguments, one per formal parameter.
    pub actual_parameters: Vec<Rvalue>,
    /// Receives the return value, absent for `void` callees.
    pub return_deref: Option<Rvalue>,
}

/// A statement in a body.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Declaration of a variable; the variable is owned by the shader arena.
    Variable(VariableId),
    /// A store.
    Assignment(Assignment),
    /// Declaration of a function with all of its overloads. Only valid at
    /// the top level.
    Function(FunctionId),
    /// A branch.
    If(IfStmt),
    /// A loop.
    Loop(Loop),
    /// `break` or `continue`.
    LoopJump(LoopJumpMode),
    /// `return` with an optional value.
    Return(Option<Rvalue>),
    /// `discard`, optionally conditional.
    Discard(Option<Rvalue>),
    /// A function call.
    Call(Call),
    /// Geometry-stage vertex emission.
    EmitVertex {
        /// Output stream index.
        stream: u32,
    },
    /// Geometry-stage primitive end.
    EndPrimitive {
        /// Output stream index.
        stream: u32,
    },
}

impl Instruction {
    /// Nested statement lists (branches, loop bodies) in storage order.
    pub fn child_lists(&self) -> Vec<&[Instruction]> {
        match self {
            Instruction::If(stmt) => vec![stmt.then_body.as_slice(), stmt.else_body.as_slice()],
            Instruction::Loop(l) => vec![l.body.as_slice()],
            _ => Vec::new(),
        }
    }

    /// Rvalues directly held by this statement, in storage order.
    pub fn rvalues(&self) -> Vec<&Rvalue> {
        match self {
            Instruction::Assignment(a) => {
                let mut out = vec![&a.lhs];
                out.extend(a.condition.as_ref());
                out.push(&a.rhs);
                out
            }
            Instruction::If(stmt) => vec![&stmt.condition],
            Instruction::Return(v) | Instruction::Discard(v) => v.iter().collect(),
            Instruction::Call(call) => {
                let mut out: Vec<&Rvalue> = call.return_deref.iter().collect();
                out.extend(call.actual_parameters.iter());
                out
            }
            _ => Vec::new(),
        }
    }
}
