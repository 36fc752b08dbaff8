//! S-expression dump of a shader's IR.
//!
//! Variables print as `name@N`, where `N` counts distinct variables in the
//! order the printer first meets them. Two dumps are equal exactly when the
//! trees have the same shape, the same values, and the same sharing.
//! Declarations list every flag bit, layout field, and state slot that
//! differs from a fresh variable, so `glint inspect` shows all of them.

use crate::constant::{Constant, ConstantValue};
use crate::expr::{LodInfo, Rvalue};
use crate::ids::{FunctionId, TypeId, VariableId};
use crate::shader::Shader;
use crate::stmt::Instruction;
use crate::types::{ScalarKind, Type};
use crate::variable::{Interpolation, VariableFlags, VariableMode};
use std::collections::HashMap;
use std::fmt::Write;

/// Renders the shader body (with function bodies inline) as text.
pub fn dump(shader: &Shader) -> String {
    let mut printer = Printer {
        shader,
        names: HashMap::new(),
        out: String::new(),
        depth: 0,
    };
    printer.list(&shader.body);
    printer.out
}

struct Printer<'a> {
    shader: &'a Shader,
    names: HashMap<VariableId, usize>,
    out: String,
    depth: usize,
}

fn mode_name(mode: VariableMode) -> &'static str {
    match mode {
        VariableMode::Auto => "auto",
        VariableMode::Uniform => "uniform",
        VariableMode::ShaderIn => "shader_in",
        VariableMode::ShaderOut => "shader_out",
        VariableMode::FunctionIn => "in",
        VariableMode::FunctionOut => "out",
        VariableMode::FunctionInOut => "inout",
        VariableMode::ConstIn => "const_in",
        VariableMode::SystemValue => "sys",
        VariableMode::Temporary => "temporary",
    }
}

/// Qualifier words for every flag bit and layout field that differs from
/// [`VariableFlags::new`].
fn flag_words(flags: &VariableFlags) -> Vec<String> {
    const NAMED: [(u32, &str); 11] = [
        (VariableFlags::READ_ONLY, "read_only"),
        (VariableFlags::CENTROID, "centroid"),
        (VariableFlags::SAMPLE, "sample"),
        (VariableFlags::INVARIANT, "invariant"),
        (VariableFlags::EXPLICIT_LOCATION, "explicit_location"),
        (VariableFlags::EXPLICIT_INDEX, "explicit_index"),
        (VariableFlags::EXPLICIT_BINDING, "explicit_binding"),
        (VariableFlags::ORIGIN_UPPER_LEFT, "origin_upper_left"),
        (VariableFlags::PIXEL_CENTER_INTEGER, "pixel_center_integer"),
        (VariableFlags::ASSIGNED, "assigned"),
        (VariableFlags::USED, "used"),
    ];
    let mut words = Vec::new();
    let mut rest = flags.bits();
    for (flag, word) in NAMED {
        if flags.contains(flag) {
            words.push(word.to_string());
        }
        rest &= !flag;
    }
    let mut plain = *flags;
    plain.set_interpolation(Interpolation::Smooth);
    rest &= plain.bits();
    match flags.interpolation() {
        Some(Interpolation::Smooth) => {}
        Some(Interpolation::Flat) => words.push("flat".to_string()),
        Some(Interpolation::NoPerspective) => words.push("noperspective".to_string()),
        None => words.push("interpolation=?".to_string()),
    }
    if rest != 0 {
        words.push(format!("bits={rest:#x}"));
    }
    for (value, unset, word) in [
        (flags.location, -1, "location"),
        (flags.index, 0, "index"),
        (flags.binding, 0, "binding"),
        (flags.max_array_access, 0, "max_array_access"),
    ] {
        if value != unset {
            words.push(format!("{word}={value}"));
        }
    }
    words
}

impl Printer<'_> {
    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn ty(&self, ty: TypeId) -> String {
        match self.shader.types.try_get(ty) {
            Some(_) => self.shader.types.display_name(ty),
            None => format!("<type {}>", ty.as_raw()),
        }
    }

    fn var_name(&mut self, id: VariableId) -> String {
        let next = self.names.len();
        let n = *self.names.entry(id).or_insert(next);
        match self.shader.variables.try_get(id) {
            Some(var) => format!("{}@{n}", var.name),
            None => format!("<dangling {}>", id.as_raw()),
        }
    }

    fn declaration(&mut self, id: VariableId) -> String {
        let name = self.var_name(id);
        let Some(var) = self.shader.variables.try_get(id) else {
            return format!("(declare {name})");
        };
        let mut quals = vec![mode_name(var.mode).to_string()];
        quals.extend(flag_words(&var.flags));
        for slot in &var.state_slots {
            let tokens: Vec<String> = slot.tokens.iter().map(i32::to_string).collect();
            quals.push(format!("(state {:#x} {})", slot.swizzle, tokens.join(" ")));
        }
        let mut text = format!("(declare ({}) {} {name}", quals.join(" "), self.ty(var.ty));
        if let Some(c) = &var.constant_value {
            let _ = write!(text, " (value {})", self.constant(c));
        }
        if let Some(c) = &var.constant_initializer {
            let _ = write!(text, " (initializer {})", self.constant(c));
        }
        if let Some(iface) = var.interface_type {
            let _ = write!(text, " (interface {})", self.ty(iface));
        }
        text.push(')');
        text
    }

    fn constant(&self, c: &Constant) -> String {
        let body = match &c.value {
            ConstantValue::Components(words) => {
                let base = match self.shader.types.try_get(c.ty) {
                    Some(Type::Numeric { base, .. }) => Some(*base),
                    _ => None,
                };
                words
                    .iter()
                    .map(|w| match base {
                        Some(ScalarKind::Float) => format!("{:?}", f32::from_bits(*w)),
                        Some(ScalarKind::Int) => (*w as i32).to_string(),
                        Some(ScalarKind::Bool) => (*w != 0).to_string(),
                        _ => w.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(" ")
            }
            ConstantValue::Array(items) | ConstantValue::Struct(items) => items
                .iter()
                .map(|item| self.constant(item))
                .collect::<Vec<_>>()
                .join(" "),
        };
        format!("(constant {} ({body}))", self.ty(c.ty))
    }

    fn rvalue(&mut self, value: &Rvalue) -> String {
        match value {
            Rvalue::Constant(c) => self.constant(c),
            Rvalue::Expression(expr) => {
                let operands: Vec<String> = expr.operands.iter().map(|o| self.rvalue(o)).collect();
                format!(
                    "(expression {} {} {})",
                    self.ty(expr.ty),
                    expr.op.mnemonic(),
                    operands.join(" ")
                )
            }
            Rvalue::Swizzle(swizzle) => {
                format!("(swiz {} {})", swizzle.mask(), self.rvalue(&swizzle.value))
            }
            Rvalue::Texture(tex) => {
                let mut text = format!(
                    "({} {} {}",
                    tex.op.mnemonic(),
                    self.ty(tex.ty),
                    self.rvalue(&tex.sampler)
                );
                for opt in [
                    &tex.coordinate,
                    &tex.projector,
                    &tex.shadow_comparator,
                    &tex.offset,
                ] {
                    let part = match opt {
                        Some(v) => self.rvalue(v),
                        None => "()".to_string(),
                    };
                    text.push(' ');
                    text.push_str(&part);
                }
                let lod = match &tex.lod {
                    LodInfo::None => String::new(),
                    LodInfo::Grad { dpdx, dpdy } => {
                        format!(" (grad {} {})", self.rvalue(dpdx), self.rvalue(dpdy))
                    }
                    LodInfo::Bias(v)
                    | LodInfo::Lod(v)
                    | LodInfo::SampleIndex(v)
                    | LodInfo::Component(v) => {
                        format!(" ({:?} {})", tex.lod.kind(), self.rvalue(v))
                    }
                };
                text.push_str(&lod);
                text.push(')');
                text
            }
            Rvalue::DerefVariable(id) => format!("(var_ref {})", self.var_name(*id)),
            Rvalue::DerefArray { array, index } => {
                format!("(array_ref {} {})", self.rvalue(array), self.rvalue(index))
            }
            Rvalue::DerefRecord { record, field } => {
                format!("(record_ref {} {field})", self.rvalue(record))
            }
        }
    }

    fn list(&mut self, list: &[Instruction]) {
        for inst in list {
            self.instruction(inst);
        }
    }

    fn block(&mut self, header: &str, list: &[Instruction]) {
        self.line(&format!("({header}"));
        self.depth += 1;
        self.list(list);
        self.depth -= 1;
        self.line(")");
    }

    fn function(&mut self, id: FunctionId) {
        let shader = self.shader;
        let Some(function) = shader.functions.try_get(id) else {
            self.line(&format!("(function <dangling {}>)", id.as_raw()));
            return;
        };
        self.line(&format!("(function {}", function.name));
        self.depth += 1;
        for &sig_id in &function.signatures {
            let Some(sig) = shader.signatures.try_get(sig_id) else {
                continue;
            };
            let kind = if sig.is_builtin { "builtin" } else { "signature" };
            let header = format!("({kind} {}", self.ty(sig.return_type));
            self.line(&header);
            self.depth += 1;
            let params: Vec<String> = sig.parameters.iter().map(|p| self.declaration(*p)).collect();
            self.line(&format!("(parameters {})", params.join(" ")));
            if !sig.is_builtin {
                self.block("body", &sig.body);
            }
            self.depth -= 1;
            self.line(")");
        }
        self.depth -= 1;
        self.line(")");
    }

    fn instruction(&mut self, inst: &Instruction) {
        match inst {
            Instruction::Variable(id) => {
                let text = self.declaration(*id);
                self.line(&text);
            }
            Instruction::Assignment(a) => {
                let lhs = self.rvalue(&a.lhs);
                let cond = match &a.condition {
                    Some(c) => format!(" (if {})", self.rvalue(c)),
                    None => String::new(),
                };
                let rhs = self.rvalue(&a.rhs);
                self.line(&format!("(assign{cond} ({:#x}) {lhs} {rhs})", a.write_mask));
            }
            Instruction::Function(id) => self.function(*id),
            Instruction::If(stmt) => {
                let cond = self.rvalue(&stmt.condition);
                self.line(&format!("(if {cond}"));
                self.depth += 1;
                self.block("then", &stmt.then_body);
                self.block("else", &stmt.else_body);
                self.depth -= 1;
                self.line(")");
            }
            Instruction::Loop(l) => self.block("loop", &l.body),
            Instruction::LoopJump(mode) => self.line(&format!("({mode:?})").to_lowercase()),
            Instruction::Return(value) => {
                let text = match value {
                    Some(v) => format!("(return {})", self.rvalue(v)),
                    None => "(return)".to_string(),
                };
                self.line(&text);
            }
            Instruction::Discard(cond) => {
                let text = match cond {
                    Some(c) => format!("(discard {})", self.rvalue(c)),
                    None => "(discard)".to_string(),
                };
                self.line(&text);
            }
            Instruction::Call(call) => {
                let shader = self.shader;
                let name = shader
                    .signatures
                    .try_get(call.callee)
                    .and_then(|sig| shader.functions.try_get(sig.function))
                    .map_or("<dangling>", |f| f.name.as_str());
                let ret = match &call.return_deref {
                    Some(r) => self.rvalue(r),
                    None => "()".to_string(),
                };
                let args: Vec<String> = call
                    .actual_parameters
                    .iter()
                    .map(|a| self.rvalue(a))
                    .collect();
                self.line(&format!("(call {name} {ret} ({}))", args.join(" ")));
            }
            Instruction::EmitVertex { stream } => self.line(&format!("(emit-vertex {stream})")),
            Instruction::EndPrimitive { stream } => {
                self.line(&format!("(end-primitive {stream})"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::ShaderStage;
    use crate::stmt::Assignment;
    use crate::variable::{StateSlot, Variable};

    fn x_assign(shader: &mut Shader, name: &str) {
        let float = shader.types.intern(Type::float());
        let x = shader.declare_variable(Variable::new(name, float, VariableMode::Auto));
        shader.body.push(Instruction::Variable(x));
        shader.body.push(Instruction::Assignment(Assignment {
            lhs: Rvalue::var(x),
            rhs: Rvalue::Constant(Constant::floats(float, &[1.0])),
            condition: None,
            write_mask: 0x1,
        }));
    }

    #[test]
    fn dump_numbers_variables_by_first_use() {
        let mut shader = Shader::new(ShaderStage::Vertex);
        x_assign(&mut shader, "x");
        let text = dump(&shader);
        assert_eq!(
            text,
            "(declare (auto) float x@0)\n(assign (0x1) (var_ref x@0) (constant float (1.0)))\n"
        );
    }

    #[test]
    fn dump_ignores_arena_order() {
        let mut a = Shader::new(ShaderStage::Vertex);
        x_assign(&mut a, "x");

        // Same tree, but with an unrelated variable allocated first.
        let mut b = Shader::new(ShaderStage::Vertex);
        let int = b.types.intern(Type::int());
        b.declare_variable(Variable::new("unused", int, VariableMode::Auto));
        x_assign(&mut b, "x");

        assert_eq!(dump(&a), dump(&b));
    }

    #[test]
    fn distinct_variables_get_distinct_numbers() {
        let mut shader = Shader::new(ShaderStage::Vertex);
        x_assign(&mut shader, "x");
        x_assign(&mut shader, "x");
        let text = dump(&shader);
        assert!(text.contains("x@0"));
        assert!(text.contains("x@1"));
    }

    #[test]
    fn declarations_show_layout_and_state() {
        let mut shader = Shader::new(ShaderStage::Vertex);
        let vec4 = shader.types.intern(Type::vec(4));
        let mut var = Variable::new("mvp_row", vec4, VariableMode::Uniform);
        var.flags = VariableFlags::new()
            .with(VariableFlags::EXPLICIT_BINDING)
            .with(VariableFlags::USED);
        var.flags.set_interpolation(Interpolation::Flat);
        var.flags.binding = 3;
        var.flags.max_array_access = 2;
        var.state_slots.push(StateSlot {
            swizzle: 0x688,
            tokens: [6, 0, 1, 1, 0],
        });
        let id = shader.declare_variable(var);
        shader.body.push(Instruction::Variable(id));

        assert_eq!(
            dump(&shader),
            "(declare (uniform explicit_binding used flat binding=3 max_array_access=2 \
             (state 0x688 6 0 1 1 0)) vec4 mvp_row@0)\n"
        );

        let before = dump(&shader);
        shader.variables[id].flags.index = 1;
        assert_ne!(dump(&shader), before);
        shader.variables[id].state_slots[0].tokens[4] = 9;
        assert!(dump(&shader).contains("(state 0x688 6 0 1 1 9)"));
    }

    #[test]
    fn fresh_flags_print_nothing() {
        assert!(flag_words(&VariableFlags::new()).is_empty());
        let mut odd = VariableFlags::new();
        odd.set(1 << 12, true);
        assert_eq!(flag_words(&odd), vec!["bits=0x1000".to_string()]);
    }
}
