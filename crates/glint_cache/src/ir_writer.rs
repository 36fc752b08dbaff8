//! Depth-first serialization of a shader's IR into a record stream.
//!
//! Every statement or rvalue becomes `(kind: u8, body_len: u32, body)`.
//! Variables are written in full once, at their declaration; every
//! dereference writes only the variable's serial id. Serial ids come from a
//! counter assigned on first encounter, so they are dense and independent of
//! arena order.

use crate::node::{type_tag, NodeKind, MAX_TYPE_DEPTH};
use crate::writer::WriteBuffer;
use glint_common::{GlintResult, InternalError};
use glint_ir::{
    Constant, ConstantValue, FunctionId, Instruction, Rvalue, Shader, SignatureId, StructField,
    Type, TypeId, VariableId,
};
use std::collections::HashMap;

/// Appends the shader body as a record stream (`u32` count, then records).
///
/// Fails if the tree refers to an id missing from the shader's arenas, or
/// holds a constant whose shape does not match its type.
pub fn serialize_ir(shader: &Shader, out: &mut WriteBuffer) -> GlintResult<()> {
    let mut writer = IrWriter {
        shader,
        out,
        serials: HashMap::new(),
    };
    writer.list(&shader.body)
}

struct IrWriter<'a> {
    shader: &'a Shader,
    out: &'a mut WriteBuffer,
    serials: HashMap<VariableId, i64>,
}

fn missing<T>(what: &str, raw: u32) -> GlintResult<T> {
    Err(InternalError::new(format!("unknown {what} id {raw}")))
}

impl IrWriter<'_> {
    fn serial(&mut self, id: VariableId) -> i64 {
        let next = self.serials.len() as i64;
        *self.serials.entry(id).or_insert(next)
    }

    fn record(
        &mut self,
        kind: NodeKind,
        body: impl FnOnce(&mut Self) -> GlintResult<()>,
    ) -> GlintResult<()> {
        self.out.write(kind.code());
        let slot = self.out.begin_length();
        body(self)?;
        self.out.end_length(slot);
        Ok(())
    }

    fn ty(&mut self, id: TypeId) -> GlintResult<()> {
        self.type_at_depth(id, 0)
    }

    fn type_at_depth(&mut self, id: TypeId, depth: u32) -> GlintResult<()> {
        if depth > MAX_TYPE_DEPTH {
            return Err(InternalError::new(format!(
                "type nests deeper than {MAX_TYPE_DEPTH} levels"
            )));
        }
        let shader = self.shader;
        let Some(ty) = shader.types.try_get(id) else {
            return missing("type", id.as_raw());
        };
        match ty {
            Type::Void => self.out.write(type_tag::VOID),
            Type::Error => self.out.write(type_tag::ERROR),
            Type::Numeric {
                base,
                vector_elements,
                matrix_columns,
            } => {
                self.out.write(type_tag::NUMERIC);
                self.out.write(base.code());
                self.out.write(*vector_elements);
                self.out.write(*matrix_columns);
            }
            Type::Sampler {
                dim,
                base,
                shadow,
                array,
            } => {
                self.out.write(type_tag::SAMPLER);
                self.out.write(dim.code());
                self.out.write(base.code());
                self.out.write_bool(*shadow);
                self.out.write_bool(*array);
            }
            Type::Array { element, length } => {
                self.out.write(type_tag::ARRAY);
                self.out.write(*length);
                self.type_at_depth(*element, depth + 1)?;
            }
            Type::Struct { name, fields } => {
                self.out.write(type_tag::STRUCT);
                self.out.write_string(Some(name));
                self.fields(fields, depth)?;
            }
            Type::Interface {
                name,
                packing,
                fields,
            } => {
                self.out.write(type_tag::INTERFACE);
                self.out.write_string(Some(name));
                self.out.write(packing.code());
                self.fields(fields, depth)?;
            }
        }
        Ok(())
    }

    fn fields(&mut self, fields: &[StructField], depth: u32) -> GlintResult<()> {
        self.out.write(fields.len() as u32);
        for field in fields {
            self.out.write_string(Some(&field.name));
            self.type_at_depth(field.ty, depth + 1)?;
        }
        Ok(())
    }

    fn list(&mut self, list: &[Instruction]) -> GlintResult<()> {
        self.out.write(list.len() as u32);
        for inst in list {
            self.instruction(inst)?;
        }
        Ok(())
    }

    fn instruction(&mut self, inst: &Instruction) -> GlintResult<()> {
        match inst {
            Instruction::Variable(id) => self.variable(*id),
            Instruction::Assignment(a) => self.record(NodeKind::Assignment, |w| {
                w.out.write(a.write_mask);
                w.rvalue(&a.lhs)?;
                w.optional_rvalue(a.condition.as_ref())?;
                w.rvalue(&a.rhs)
            }),
            Instruction::Function(id) => self.function(*id),
            Instruction::If(stmt) => self.record(NodeKind::If, |w| {
                w.rvalue(&stmt.condition)?;
                w.list(&stmt.then_body)?;
                w.list(&stmt.else_body)
            }),
            Instruction::Loop(l) => self.record(NodeKind::Loop, |w| w.list(&l.body)),
            Instruction::LoopJump(mode) => self.record(NodeKind::LoopJump, |w| {
                w.out.write(mode.code());
                Ok(())
            }),
            Instruction::Return(value) => {
                self.record(NodeKind::Return, |w| w.optional_rvalue(value.as_ref()))
            }
            Instruction::Discard(cond) => {
                self.record(NodeKind::Discard, |w| w.optional_rvalue(cond.as_ref()))
            }
            Instruction::Call(call) => {
                let shader = self.shader;
                let Some(callee) = shader.signatures.try_get(call.callee) else {
                    return missing("signature", call.callee.as_raw());
                };
                let Some(function) = shader.functions.try_get(callee.function) else {
                    return missing("function", callee.function.as_raw());
                };
                let mut param_types = Vec::with_capacity(callee.parameters.len());
                for param in &callee.parameters {
                    match shader.variables.try_get(*param) {
                        Some(var) => param_types.push(var.ty),
                        None => return missing("variable", param.as_raw()),
                    }
                }
                self.record(NodeKind::Call, |w| {
                    w.out.write_string(Some(&function.name));
                    w.out.write_bool(callee.is_builtin);
                    w.ty(callee.return_type)?;
                    w.out.write(param_types.len() as u32);
                    for ty in &param_types {
                        w.ty(*ty)?;
                    }
                    w.optional_rvalue(call.return_deref.as_ref())?;
                    w.out.write(call.actual_parameters.len() as u32);
                    for arg in &call.actual_parameters {
                        w.rvalue(arg)?;
                    }
                    Ok(())
                })
            }
            Instruction::EmitVertex { stream } => self.record(NodeKind::EmitVertex, |w| {
                w.out.write(*stream);
                Ok(())
            }),
            Instruction::EndPrimitive { stream } => self.record(NodeKind::EndPrimitive, |w| {
                w.out.write(*stream);
                Ok(())
            }),
        }
    }

    fn variable(&mut self, id: VariableId) -> GlintResult<()> {
        let shader = self.shader;
        let Some(var) = shader.variables.try_get(id) else {
            return missing("variable", id.as_raw());
        };
        let serial = self.serial(id);
        self.record(NodeKind::Variable, |w| {
            w.ty(var.ty)?;
            w.out.write_string(Some(&var.name));
            w.out.write(serial);
            w.out.write(var.mode.code());
            w.out.write_block(&var.flags.to_raw());
            w.out.write(var.state_slots.len() as u32);
            for slot in &var.state_slots {
                w.out.write(slot.swizzle);
                for token in slot.tokens {
                    w.out.write(token);
                }
            }
            w.optional_constant(var.constant_value.as_ref())?;
            w.optional_constant(var.constant_initializer.as_ref())?;
            match var.interface_type {
                Some(iface) => {
                    w.out.write_bool(true);
                    w.ty(iface)
                }
                None => {
                    w.out.write_bool(false);
                    Ok(())
                }
            }
        })
    }

    fn function(&mut self, id: FunctionId) -> GlintResult<()> {
        let shader = self.shader;
        let Some(function) = shader.functions.try_get(id) else {
            return missing("function", id.as_raw());
        };
        self.record(NodeKind::Function, |w| {
            w.out.write_string(Some(&function.name));
            w.out.write(function.signatures.len() as u32);
            for sig in &function.signatures {
                w.signature(*sig)?;
            }
            Ok(())
        })
    }

    /// Builtin signatures keep their parameters (the lookup key) but get an
    /// empty body: the reader always takes the builtin table's version.
    fn signature(&mut self, id: SignatureId) -> GlintResult<()> {
        let shader = self.shader;
        let Some(sig) = shader.signatures.try_get(id) else {
            return missing("signature", id.as_raw());
        };
        self.record(NodeKind::FunctionSignature, |w| {
            w.out.write_bool(sig.is_builtin);
            w.out.write_bool(sig.is_defined);
            w.ty(sig.return_type)?;
            w.out.write(sig.parameters.len() as u32);
            for param in &sig.parameters {
                w.variable(*param)?;
            }
            if sig.is_builtin {
                w.out.write(0u32);
                Ok(())
            } else {
                w.list(&sig.body)
            }
        })
    }

    fn optional_rvalue(&mut self, value: Option<&Rvalue>) -> GlintResult<()> {
        self.out.write_bool(value.is_some());
        match value {
            Some(v) => self.rvalue(v),
            None => Ok(()),
        }
    }

    fn optional_constant(&mut self, value: Option<&Constant>) -> GlintResult<()> {
        self.out.write_bool(value.is_some());
        match value {
            Some(c) => self.record(NodeKind::Constant, |w| w.constant_body(c)),
            None => Ok(()),
        }
    }

    fn constant_body(&mut self, c: &Constant) -> GlintResult<()> {
        let shader = self.shader;
        let shape_ok = matches!(
            (&c.value, shader.types.try_get(c.ty)),
            (ConstantValue::Components(_), Some(Type::Numeric { .. }))
                | (ConstantValue::Array(_), Some(Type::Array { .. }))
                | (ConstantValue::Struct(_), Some(Type::Struct { .. }))
        );
        if !shape_ok {
            return Err(InternalError::new(format!(
                "constant shape does not match type id {}",
                c.ty.as_raw()
            )));
        }
        self.ty(c.ty)?;
        match &c.value {
            ConstantValue::Components(words) => {
                self.out.write(words.len() as u32);
                for word in words {
                    self.out.write(*word);
                }
            }
            ConstantValue::Array(items) | ConstantValue::Struct(items) => {
                self.out.write(items.len() as u32);
                for item in items {
                    self.record(NodeKind::Constant, |w| w.constant_body(item))?;
                }
            }
        }
        Ok(())
    }

    fn rvalue(&mut self, value: &Rvalue) -> GlintResult<()> {
        match value {
            Rvalue::Constant(c) => self.record(NodeKind::Constant, |w| w.constant_body(c)),
            Rvalue::Expression(expr) => self.record(NodeKind::Expression, |w| {
                w.ty(expr.ty)?;
                w.out.write(expr.op.code());
                w.out.write(expr.operands.len() as u32);
                for operand in &expr.operands {
                    w.rvalue(operand)?;
                }
                Ok(())
            }),
            Rvalue::Swizzle(swizzle) => self.record(NodeKind::Swizzle, |w| {
                w.rvalue(&swizzle.value)?;
                w.out.write_block(&swizzle.components);
                w.out.write(swizzle.count);
                Ok(())
            }),
            Rvalue::Texture(tex) => self.record(NodeKind::Texture, |w| {
                w.out.write(tex.op.code());
                w.ty(tex.ty)?;
                w.rvalue(&tex.sampler)?;
                for operand in [
                    &tex.coordinate,
                    &tex.projector,
                    &tex.shadow_comparator,
                    &tex.offset,
                ] {
                    w.optional_rvalue(operand.as_deref())?;
                }
                w.out.write(tex.lod.kind().code());
                for operand in tex.lod.operands() {
                    w.rvalue(operand)?;
                }
                Ok(())
            }),
            Rvalue::DerefVariable(id) => {
                if !self.shader.variables.contains(*id) {
                    return missing("variable", id.as_raw());
                }
                let serial = self.serial(*id);
                self.record(NodeKind::DerefVariable, |w| {
                    w.out.write(serial);
                    Ok(())
                })
            }
            Rvalue::DerefArray { array, index } => self.record(NodeKind::DerefArray, |w| {
                w.rvalue(array)?;
                w.rvalue(index)
            }),
            Rvalue::DerefRecord { record, field } => self.record(NodeKind::DerefRecord, |w| {
                w.rvalue(record)?;
                w.out.write_string(Some(field));
                Ok(())
            }),
        }
    }
}
