//! IR well-formedness checks.
//!
//! [`validate_shader`] is run by the cache on every reconstructed shader
//! before it is handed back, and may be run by a front end on its own
//! output. A failure is an [`InternalError`]: the tree is unusable.

use crate::constant::{Constant, ConstantValue};
use crate::expr::Rvalue;
use crate::ids::{FunctionId, SignatureId, TypeId, VariableId};
use crate::shader::{Shader, ShaderStage};
use crate::stmt::Instruction;
use crate::types::Type;
use crate::variable::MAX_STATE_SLOTS;
use glint_common::{GlintResult, InternalError};
use petgraph::algo::is_cyclic_directed;
use petgraph::graphmap::DiGraphMap;
use std::collections::HashSet;

/// Checks the structural invariants of a shader's IR.
///
/// Variables must be declared (by an [`Instruction::Variable`] or as a
/// parameter) exactly once and before any dereference of them in traversal
/// order; function declarations appear only at the top level; loop jumps
/// only inside loops; returns only inside function bodies; user functions
/// may not recurse.
pub fn validate_shader(shader: &Shader) -> GlintResult<()> {
    let top_level_functions = shader
        .body
        .iter()
        .filter_map(|inst| match inst {
            Instruction::Function(f) => Some(*f),
            _ => None,
        })
        .collect();

    let mut validator = Validator {
        shader,
        declared: HashSet::new(),
        seen_functions: HashSet::new(),
        top_level_functions,
        calls: DiGraphMap::new(),
        current: None,
        loop_depth: 0,
    };
    validator.check_list(&shader.body, true)?;

    if is_cyclic_directed(&validator.calls) {
        return Err(InternalError::new("recursive function call"));
    }
    Ok(())
}

struct Validator<'a> {
    shader: &'a Shader,
    declared: HashSet<VariableId>,
    seen_functions: HashSet<FunctionId>,
    top_level_functions: HashSet<FunctionId>,
    calls: DiGraphMap<SignatureId, ()>,
    current: Option<SignatureId>,
    loop_depth: u32,
}

fn fail<T>(message: String) -> GlintResult<T> {
    Err(InternalError::new(message))
}

impl Validator<'_> {
    fn check_type(&self, ty: TypeId) -> GlintResult<&Type> {
        match self.shader.types.try_get(ty) {
            Some(t) => Ok(t),
            None => fail(format!("unknown type id {}", ty.as_raw())),
        }
    }

    fn declare(&mut self, var: VariableId) -> GlintResult<()> {
        let Some(v) = self.shader.variables.try_get(var) else {
            return fail(format!("declaration of unknown variable id {}", var.as_raw()));
        };
        if !self.declared.insert(var) {
            return fail(format!("variable `{}` declared twice", v.name));
        }
        self.check_type(v.ty)?;
        if v.state_slots.len() > MAX_STATE_SLOTS as usize {
            return fail(format!(
                "variable `{}` has {} state slots (max {MAX_STATE_SLOTS})",
                v.name,
                v.state_slots.len()
            ));
        }
        if let Some(iface) = v.interface_type {
            self.check_type(iface)?;
        }
        for constant in [&v.constant_value, &v.constant_initializer].into_iter().flatten() {
            self.check_constant(constant)?;
        }
        Ok(())
    }

    fn check_list(&mut self, list: &[Instruction], top_level: bool) -> GlintResult<()> {
        for inst in list {
            self.check_instruction(inst, top_level)?;
        }
        Ok(())
    }

    fn check_instruction(&mut self, inst: &Instruction, top_level: bool) -> GlintResult<()> {
        match inst {
            Instruction::Variable(var) => self.declare(*var),
            Instruction::Assignment(a) => {
                if !a.lhs.is_dereference() {
                    return fail("assignment to a non-dereference".to_string());
                }
                if a.write_mask > 0xF {
                    return fail(format!("write mask {:#x} out of range", a.write_mask));
                }
                self.check_rvalue(&a.lhs)?;
                if let Some(cond) = &a.condition {
                    self.check_rvalue(cond)?;
                }
                self.check_rvalue(&a.rhs)
            }
            Instruction::Function(f) => {
                if !top_level {
                    return fail("function declared inside a body".to_string());
                }
                self.check_function(*f)
            }
            Instruction::If(stmt) => {
                self.check_rvalue(&stmt.condition)?;
                self.check_list(&stmt.then_body, false)?;
                self.check_list(&stmt.else_body, false)
            }
            Instruction::Loop(l) => {
                self.loop_depth += 1;
                let result = self.check_list(&l.body, false);
                self.loop_depth -= 1;
                result
            }
            Instruction::LoopJump(mode) => {
                if self.loop_depth == 0 {
                    return fail(format!("{mode:?} outside of a loop"));
                }
                Ok(())
            }
            Instruction::Return(value) => {
                let Some(sig) = self.current else {
                    return fail("return outside of a function".to_string());
                };
                let returns_void =
                    matches!(self.check_type(self.shader.signatures[sig].return_type)?, Type::Void);
                if returns_void && value.is_some() {
                    return fail("value returned from a void function".to_string());
                }
                match value {
                    Some(v) => self.check_rvalue(v),
                    None => Ok(()),
                }
            }
            Instruction::Discard(cond) => {
                if self.shader.stage != ShaderStage::Fragment {
                    return fail(format!("discard in a {} shader", self.shader.stage.name()));
                }
                match cond {
                    Some(c) => self.check_rvalue(c),
                    None => Ok(()),
                }
            }
            Instruction::Call(call) => {
                let shader = self.shader;
                let Some(callee) = shader.signatures.try_get(call.callee) else {
                    return fail(format!("call of unknown signature id {}", call.callee.as_raw()));
                };
                if !callee.is_builtin && !self.top_level_functions.contains(&callee.function) {
                    return fail("call of a function that is never declared".to_string());
                }
                if callee.parameters.len() != call.actual_parameters.len() {
                    return fail(format!(
                        "call passes {} arguments to a signature taking {}",
                        call.actual_parameters.len(),
                        callee.parameters.len()
                    ));
                }
                if let Some(caller) = self.current {
                    self.calls.add_edge(caller, call.callee, ());
                }
                if let Some(ret) = &call.return_deref {
                    if !ret.is_dereference() {
                        return fail("call result stored to a non-dereference".to_string());
                    }
                    self.check_rvalue(ret)?;
                }
                for arg in &call.actual_parameters {
                    self.check_rvalue(arg)?;
                }
                Ok(())
            }
            Instruction::EmitVertex { .. } | Instruction::EndPrimitive { .. } => {
                if self.shader.stage != ShaderStage::Geometry {
                    return fail(format!(
                        "primitive emission in a {} shader",
                        self.shader.stage.name()
                    ));
                }
                Ok(())
            }
        }
    }

    fn check_function(&mut self, id: FunctionId) -> GlintResult<()> {
        let shader = self.shader;
        let Some(function) = shader.functions.try_get(id) else {
            return fail(format!("unknown function id {}", id.as_raw()));
        };
        if !self.seen_functions.insert(id) {
            return fail(format!("function `{}` declared twice", function.name));
        }
        for &sig_id in &function.signatures {
            let Some(sig) = shader.signatures.try_get(sig_id) else {
                return fail(format!("unknown signature id {}", sig_id.as_raw()));
            };
            if sig.function != id {
                return fail(format!("signature of `{}` owned by another function", function.name));
            }
            self.check_type(sig.return_type)?;
            for &param in &sig.parameters {
                self.declare(param)?;
            }
            self.calls.add_node(sig_id);
            self.current = Some(sig_id);
            let result = self.check_list(&sig.body, false);
            self.current = None;
            result?;
        }
        Ok(())
    }

    fn check_rvalue(&mut self, value: &Rvalue) -> GlintResult<()> {
        match value {
            Rvalue::Constant(c) => self.check_constant(c)?,
            Rvalue::Expression(expr) => {
                self.check_type(expr.ty)?;
                if expr.operands.len() != expr.op.arity() {
                    return fail(format!(
                        "`{}` takes {} operands, got {}",
                        expr.op.mnemonic(),
                        expr.op.arity(),
                        expr.operands.len()
                    ));
                }
            }
            Rvalue::Swizzle(swizzle) => {
                if !(1..=4).contains(&swizzle.count) {
                    return fail(format!("swizzle of {} components", swizzle.count));
                }
                if swizzle.components.iter().any(|c| *c > 3) {
                    return fail("swizzle component out of range".to_string());
                }
            }
            Rvalue::Texture(tex) => {
                self.check_type(tex.ty)?;
            }
            Rvalue::DerefVariable(var) => {
                if !self.declared.contains(var) {
                    return fail(format!("dereference of undeclared variable id {}", var.as_raw()));
                }
            }
            Rvalue::DerefArray { .. } | Rvalue::DerefRecord { .. } => {}
        }
        for child in value.children() {
            self.check_rvalue(child)?;
        }
        Ok(())
    }

    fn check_constant(&self, constant: &Constant) -> GlintResult<()> {
        let ty = self.check_type(constant.ty)?;
        match (&constant.value, ty) {
            (ConstantValue::Components(words), Type::Numeric { .. }) => {
                let expected = ty.components().unwrap_or(0) as usize;
                if words.len() != expected {
                    return fail(format!(
                        "constant has {} components, type needs {expected}",
                        words.len()
                    ));
                }
                Ok(())
            }
            (ConstantValue::Array(elements), Type::Array { element, length }) => {
                if elements.len() != *length as usize {
                    return fail(format!(
                        "array constant has {} elements, type needs {length}",
                        elements.len()
                    ));
                }
                for e in elements {
                    if e.ty != *element {
                        return fail("array constant element of the wrong type".to_string());
                    }
                    self.check_constant(e)?;
                }
                Ok(())
            }
            (ConstantValue::Struct(members), Type::Struct { fields, .. }) => {
                if members.len() != fields.len() {
                    return fail(format!(
                        "struct constant has {} members, type has {}",
                        members.len(),
                        fields.len()
                    ));
                }
                for (m, f) in members.iter().zip(fields) {
                    if m.ty != f.ty {
                        return fail(format!("struct constant member `{}` of the wrong type", f.name));
                    }
                    self.check_constant(m)?;
                }
                Ok(())
            }
            _ => fail(format!(
                "constant shape does not match type {}",
                self.shader.types.display_name(constant.ty)
            )),
        }
    }
}
