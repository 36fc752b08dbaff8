//! Reconstruction of a shader's IR from a record stream.
//!
//! Reading happens in two passes over the top-level records. The prototype
//! pass creates every function and signature (declaring user parameters and
//! importing builtins from the table) while skipping everything else by
//! length. The main pass then reads the whole stream into the body, binding
//! each function record to the shells made in the first pass and checking
//! that its parameter records name the variables declared there. Calls are
//! resolved against those shells, so a body may call a function whose record
//! comes later in the stream.
//!
//! Any failure aborts the read and the partial shader is dropped. A
//! successfully rebuilt shader has passed [`validate_shader`].

use crate::error::DecodeError;
use crate::node::{type_tag, NodeKind, MAX_NESTING_DEPTH, MAX_TYPE_DEPTH};
use crate::reader::MappedBuffer;
use glint_ir::validate::validate_shader;
use glint_ir::{
    Assignment, BuiltinTable, Call, Constant, ConstantValue, ExprOp, Expression, ExtensionSet,
    FunctionId, IfStmt, Instruction, LodInfo, LodKind, Loop, Rvalue, Shader, ShaderStage,
    Signature, SignatureId, StateSlot, StructField, Swizzle, Texture, Type, TypeId, Variable,
    VariableFlags, VariableId, MAX_STATE_SLOTS,
};
use std::collections::{HashMap, VecDeque};

/// Bytes taken by a record's kind tag and length field.
const RECORD_HEADER_LEN: usize = 5;

/// Reads a record stream written by
/// [`serialize_ir`](crate::ir_writer::serialize_ir) at the reader's
/// current position.
///
/// The returned shader has every known extension enabled, since entries do
/// not record which ones the original compile used. Its header and source
/// are left for the caller to fill in.
pub fn deserialize_ir(
    input: &mut MappedBuffer<'_>,
    stage: ShaderStage,
    builtins: &dyn BuiltinTable,
) -> Result<Shader, DecodeError> {
    let mut shader = Shader::new(stage);
    shader.extensions = ExtensionSet::all();

    let mut reader = IrReader {
        input,
        builtins,
        shader,
        serials: HashMap::new(),
        shells: VecDeque::new(),
        depth: 0,
    };

    let count = reader.input.read_count(RECORD_HEADER_LEN)?;
    let first = reader.input.position();
    reader.prototypes(count)?;
    let end = reader.input.position();

    reader.input.seek(first);
    let mut body = Vec::with_capacity(count as usize);
    for _ in 0..count {
        body.push(reader.statement()?);
    }
    if reader.input.position() != end {
        return Err(DecodeError::invalid("record stream length differs between passes"));
    }
    if !reader.shells.is_empty() {
        return Err(DecodeError::invalid("function prototype without a function record"));
    }

    let mut shader = reader.shader;
    shader.body = body;
    validate_shader(&shader)?;
    Ok(shader)
}

/// Framing of one record.
struct Record {
    kind: NodeKind,
    start: usize,
    len: usize,
}

impl Record {
    fn end(&self) -> usize {
        self.start + self.len
    }
}

fn decode_enum<T, R>(what: &'static str, raw: R) -> Result<T, DecodeError>
where
    T: TryFrom<R, Error = R>,
    R: Into<u64>,
{
    T::try_from(raw).map_err(|code| DecodeError::UnknownCode {
        what,
        code: code.into(),
    })
}

fn expect_kind(record: &Record, kind: NodeKind, expected: &'static str) -> Result<(), DecodeError> {
    if record.kind == kind {
        Ok(())
    } else {
        Err(DecodeError::UnexpectedKind {
            expected,
            found: record.kind,
        })
    }
}

enum ConstantShape {
    Components,
    Array,
    Struct,
}

struct IrReader<'r, 'b> {
    input: &'r mut MappedBuffer<'b>,
    builtins: &'r dyn BuiltinTable,
    shader: Shader,
    serials: HashMap<i64, VariableId>,
    /// Signature shells of each function record, in stream order.
    shells: VecDeque<Vec<SignatureId>>,
    depth: u32,
}

impl IrReader<'_, '_> {
    fn header(&mut self) -> Result<Record, DecodeError> {
        let code = self.input.read::<u8>()?;
        let kind = decode_enum("node kind", code)?;
        let len = self.input.read::<u32>()? as usize;
        let start = self.input.position();
        if len > self.input.remaining() {
            return Err(DecodeError::OutOfBounds {
                offset: start,
                len,
                size: self.input.size(),
            });
        }
        Ok(Record { kind, start, len })
    }

    fn finish(&self, record: &Record) -> Result<(), DecodeError> {
        let consumed = self.input.position() - record.start;
        if consumed != record.len {
            return Err(DecodeError::LengthMismatch {
                kind: record.kind,
                declared: record.len,
                consumed,
            });
        }
        Ok(())
    }

    fn skip(&mut self, record: &Record) {
        self.input.seek(record.end());
    }

    fn enter(&mut self) -> Result<(), DecodeError> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(DecodeError::TooDeep {
                max: MAX_NESTING_DEPTH,
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn declare(&mut self, serial: i64, var: Variable) -> Result<VariableId, DecodeError> {
        if self.serials.contains_key(&serial) {
            return Err(DecodeError::DuplicateVariable { id: serial });
        }
        let id = self.shader.declare_variable(var);
        self.serials.insert(serial, id);
        Ok(id)
    }

    // Types

    fn ty(&mut self) -> Result<TypeId, DecodeError> {
        let ty = self.type_desc(0)?;
        Ok(self.shader.types.intern(ty))
    }

    fn type_desc(&mut self, depth: u32) -> Result<Type, DecodeError> {
        if depth > MAX_TYPE_DEPTH {
            return Err(DecodeError::TooDeep {
                max: MAX_TYPE_DEPTH,
            });
        }
        let tag = self.input.read::<u8>()?;
        let ty = match tag {
            type_tag::VOID => Type::Void,
            type_tag::ERROR => Type::Error,
            type_tag::NUMERIC => {
                let base = decode_enum("scalar kind", self.input.read::<u8>()?)?;
                let vector_elements = self.input.read::<u8>()?;
                let matrix_columns = self.input.read::<u8>()?;
                if !(1..=4).contains(&vector_elements) || !(1..=4).contains(&matrix_columns) {
                    return Err(DecodeError::invalid(format!(
                        "numeric type of {matrix_columns}x{vector_elements} components"
                    )));
                }
                Type::Numeric {
                    base,
                    vector_elements,
                    matrix_columns,
                }
            }
            type_tag::SAMPLER => Type::Sampler {
                dim: decode_enum("sampler dimension", self.input.read::<u8>()?)?,
                base: decode_enum("scalar kind", self.input.read::<u8>()?)?,
                shadow: self.input.read_bool()?,
                array: self.input.read_bool()?,
            },
            type_tag::ARRAY => {
                let length = self.input.read::<u32>()?;
                let element = self.type_desc(depth + 1)?;
                Type::Array {
                    element: self.shader.types.intern(element),
                    length,
                }
            }
            type_tag::STRUCT => Type::Struct {
                name: self.input.read_required_string("struct name")?,
                fields: self.fields(depth)?,
            },
            type_tag::INTERFACE => Type::Interface {
                name: self.input.read_required_string("interface name")?,
                packing: decode_enum("interface packing", self.input.read::<u8>()?)?,
                fields: self.fields(depth)?,
            },
            other => {
                return Err(DecodeError::UnknownCode {
                    what: "type tag",
                    code: other.into(),
                })
            }
        };
        Ok(ty)
    }

    fn fields(&mut self, depth: u32) -> Result<Vec<StructField>, DecodeError> {
        // A field is at least an absent name and a one-byte type tag.
        let count = self.input.read_count(5)?;
        let mut fields = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let name = self.input.read_required_string("field name")?;
            let ty = self.type_desc(depth + 1)?;
            fields.push(StructField {
                name,
                ty: self.shader.types.intern(ty),
            });
        }
        Ok(fields)
    }

    // Prototype pass

    fn prototypes(&mut self, count: u32) -> Result<(), DecodeError> {
        for _ in 0..count {
            let record = self.header()?;
            if !record.kind.is_statement() {
                return Err(DecodeError::UnexpectedKind {
                    expected: "statement",
                    found: record.kind,
                });
            }
            if record.kind == NodeKind::Function {
                self.function_prototype()?;
                self.finish(&record)?;
            } else {
                self.skip(&record);
            }
        }
        Ok(())
    }

    fn function_prototype(&mut self) -> Result<(), DecodeError> {
        let name = self.input.read_required_string("function name")?;
        let count = self.input.read_count(RECORD_HEADER_LEN)?;
        let function = self.shader.add_function(&name);
        let mut shells = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let record = self.header()?;
            expect_kind(&record, NodeKind::FunctionSignature, "function signature")?;
            let is_builtin = self.input.read_bool()?;
            let is_defined = self.input.read_bool()?;
            let return_type = self.ty()?;
            let params = self.input.read_count(RECORD_HEADER_LEN)?;

            let sig = if is_builtin {
                let mut types = Vec::with_capacity(params as usize);
                for _ in 0..params {
                    let (_, var) = self.parameter()?;
                    types.push(var.ty);
                }
                self.import_builtin(&name, &types, return_type)?
            } else {
                let mut sig = Signature::new(function, return_type);
                sig.is_defined = is_defined;
                for _ in 0..params {
                    let (serial, var) = self.parameter()?;
                    sig.parameters.push(self.declare(serial, var)?);
                }
                self.shader.add_signature(sig)
            };
            shells.push(sig);
            // Skip the body; the main pass reads it.
            self.skip(&record);
        }
        self.shells.push_back(shells);
        Ok(())
    }

    fn parameter(&mut self) -> Result<(i64, Variable), DecodeError> {
        let record = self.header()?;
        expect_kind(&record, NodeKind::Variable, "parameter")?;
        self.enter()?;
        let param = self.variable_body()?;
        self.leave();
        self.finish(&record)?;
        Ok(param)
    }

    fn import_builtin(
        &mut self,
        name: &str,
        args: &[TypeId],
        return_type: TypeId,
    ) -> Result<SignatureId, DecodeError> {
        let unknown = || DecodeError::UnknownBuiltin {
            name: name.to_string(),
        };
        let sig = self
            .shader
            .import_builtin(self.builtins, name, args)
            .ok_or_else(unknown)?;
        if self.shader.signatures[sig].return_type != return_type {
            return Err(unknown());
        }
        Ok(sig)
    }

    // Main pass

    fn list(&mut self) -> Result<Vec<Instruction>, DecodeError> {
        let count = self.input.read_count(RECORD_HEADER_LEN)?;
        let mut list = Vec::with_capacity(count as usize);
        for _ in 0..count {
            list.push(self.statement()?);
        }
        Ok(list)
    }

    fn statement(&mut self) -> Result<Instruction, DecodeError> {
        let record = self.header()?;
        if !record.kind.is_statement() {
            return Err(DecodeError::UnexpectedKind {
                expected: "statement",
                found: record.kind,
            });
        }
        self.enter()?;
        let inst = match record.kind {
            NodeKind::Variable => {
                let (serial, var) = self.variable_body()?;
                Instruction::Variable(self.declare(serial, var)?)
            }
            NodeKind::Assignment => {
                let write_mask = self.input.read::<u8>()?;
                let lhs = self.rvalue()?;
                let condition = self.optional_rvalue()?;
                let rhs = self.rvalue()?;
                Instruction::Assignment(Assignment {
                    lhs,
                    rhs,
                    condition,
                    write_mask,
                })
            }
            NodeKind::Call => Instruction::Call(self.call_body()?),
            NodeKind::Discard => Instruction::Discard(self.optional_rvalue()?),
            NodeKind::Function => Instruction::Function(self.function_body()?),
            NodeKind::If => {
                let condition = self.rvalue()?;
                let then_body = self.list()?;
                let else_body = self.list()?;
                Instruction::If(IfStmt {
                    condition,
                    then_body,
                    else_body,
                })
            }
            NodeKind::Loop => Instruction::Loop(Loop { body: self.list()? }),
            NodeKind::LoopJump => {
                Instruction::LoopJump(decode_enum("loop jump mode", self.input.read::<u8>()?)?)
            }
            NodeKind::Return => Instruction::Return(self.optional_rvalue()?),
            NodeKind::EmitVertex => Instruction::EmitVertex {
                stream: self.input.read::<u32>()?,
            },
            NodeKind::EndPrimitive => Instruction::EndPrimitive {
                stream: self.input.read::<u32>()?,
            },
            other => {
                return Err(DecodeError::UnexpectedKind {
                    expected: "statement",
                    found: other,
                })
            }
        };
        self.leave();
        self.finish(&record)?;
        Ok(inst)
    }

    fn variable_body(&mut self) -> Result<(i64, Variable), DecodeError> {
        let ty = self.ty()?;
        let name = self.input.read_required_string("variable name")?;
        let serial = self.input.read::<i64>()?;
        let mode = decode_enum("variable mode", self.input.read::<u8>()?)?;
        let mut raw = [0u8; VariableFlags::RAW_LEN];
        raw.copy_from_slice(self.input.read_bytes(VariableFlags::RAW_LEN)?);

        let slot_count = self.input.read::<u32>()?;
        if slot_count > MAX_STATE_SLOTS {
            return Err(DecodeError::TooManyStateSlots {
                count: slot_count,
                max: MAX_STATE_SLOTS,
            });
        }
        let mut state_slots = Vec::with_capacity(slot_count as usize);
        for _ in 0..slot_count {
            let swizzle = self.input.read::<i32>()?;
            let mut tokens = [0i32; 5];
            for token in &mut tokens {
                *token = self.input.read::<i32>()?;
            }
            state_slots.push(StateSlot { swizzle, tokens });
        }

        let constant_value = self.optional_constant()?;
        let constant_initializer = self.optional_constant()?;
        let interface_type = if self.input.read_bool()? {
            Some(self.ty()?)
        } else {
            None
        };

        Ok((
            serial,
            Variable {
                name,
                ty,
                mode,
                flags: VariableFlags::from_raw(&raw),
                state_slots,
                constant_value,
                constant_initializer,
                interface_type,
            },
        ))
    }

    fn function_body(&mut self) -> Result<FunctionId, DecodeError> {
        let name = self.input.read_required_string("function name")?;
        let count = self.input.read_count(RECORD_HEADER_LEN)?;
        let shells = self
            .shells
            .pop_front()
            .ok_or_else(|| DecodeError::invalid(format!("no prototype for function `{name}`")))?;
        if shells.len() != count as usize {
            return Err(DecodeError::invalid(format!(
                "function `{name}` has {count} signatures but its prototype has {}",
                shells.len()
            )));
        }
        let function = self
            .shader
            .find_function(&name)
            .ok_or_else(|| DecodeError::invalid(format!("no prototype for function `{name}`")))?;

        for sig in shells {
            let record = self.header()?;
            expect_kind(&record, NodeKind::FunctionSignature, "function signature")?;
            self.enter()?;
            let is_builtin = self.input.read_bool()?;
            let _is_defined = self.input.read_bool()?;
            if is_builtin {
                // The canonical body was imported from the table.
                self.skip(&record);
            } else {
                self.ty()?;
                let params = self.input.read_count(RECORD_HEADER_LEN)?;
                let declared = self.shader.signatures[sig].parameters.clone();
                if declared.len() != params as usize {
                    return Err(DecodeError::invalid(format!(
                        "signature of `{name}` has {params} parameters but its prototype has {}",
                        declared.len()
                    )));
                }
                for expected in declared {
                    let (serial, _) = self.parameter()?;
                    if self.serials.get(&serial) != Some(&expected) {
                        return Err(DecodeError::invalid(format!(
                            "parameter {serial} of `{name}` does not match its prototype"
                        )));
                    }
                }
                let body = self.list()?;
                self.shader.signatures[sig].body = body;
            }
            self.leave();
            self.finish(&record)?;
        }
        Ok(function)
    }

    fn call_body(&mut self) -> Result<Call, DecodeError> {
        let name = self.input.read_required_string("callee name")?;
        let is_builtin = self.input.read_bool()?;
        let return_type = self.ty()?;
        let param_count = self.input.read_count(1)?;
        let mut param_types = Vec::with_capacity(param_count as usize);
        for _ in 0..param_count {
            param_types.push(self.ty()?);
        }
        let return_deref = self.optional_rvalue()?;
        let arg_count = self.input.read_count(RECORD_HEADER_LEN)?;
        let mut actual_parameters = Vec::with_capacity(arg_count as usize);
        for _ in 0..arg_count {
            actual_parameters.push(self.rvalue()?);
        }

        let callee = if is_builtin {
            self.import_builtin(&name, &param_types, return_type)?
        } else {
            match self.shader.find_signature(&name, &param_types, return_type) {
                Some(sig) if !self.shader.signatures[sig].is_builtin => sig,
                _ => return Err(DecodeError::UnresolvedCall { name }),
            }
        };
        Ok(Call {
            callee,
            actual_parameters,
            return_deref,
        })
    }

    // Rvalues

    fn optional_rvalue(&mut self) -> Result<Option<Rvalue>, DecodeError> {
        if self.input.read_bool()? {
            Ok(Some(self.rvalue()?))
        } else {
            Ok(None)
        }
    }

    fn boxed_rvalue(&mut self) -> Result<Box<Rvalue>, DecodeError> {
        self.rvalue().map(Box::new)
    }

    fn optional_boxed(&mut self) -> Result<Option<Box<Rvalue>>, DecodeError> {
        Ok(self.optional_rvalue()?.map(Box::new))
    }

    fn rvalue(&mut self) -> Result<Rvalue, DecodeError> {
        let record = self.header()?;
        if !record.kind.is_rvalue() {
            return Err(DecodeError::UnexpectedKind {
                expected: "rvalue",
                found: record.kind,
            });
        }
        self.enter()?;
        let value = match record.kind {
            NodeKind::Constant => Rvalue::Constant(self.constant_body()?),
            NodeKind::DerefVariable => {
                let serial = self.input.read::<i64>()?;
                match self.serials.get(&serial) {
                    Some(id) => Rvalue::DerefVariable(*id),
                    None => return Err(DecodeError::DanglingVariable { id: serial }),
                }
            }
            NodeKind::DerefArray => Rvalue::DerefArray {
                array: self.boxed_rvalue()?,
                index: self.boxed_rvalue()?,
            },
            NodeKind::DerefRecord => Rvalue::DerefRecord {
                record: self.boxed_rvalue()?,
                field: self.input.read_required_string("field name")?,
            },
            NodeKind::Expression => {
                let ty = self.ty()?;
                let op: ExprOp = decode_enum("expression op", self.input.read::<u32>()?)?;
                let count = self.input.read_count(RECORD_HEADER_LEN)?;
                let mut operands = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    operands.push(self.rvalue()?);
                }
                Rvalue::Expression(Expression { ty, op, operands })
            }
            NodeKind::Swizzle => {
                let value = self.boxed_rvalue()?;
                let mut components = [0u8; 4];
                components.copy_from_slice(self.input.read_bytes(4)?);
                let count = self.input.read::<u8>()?;
                Rvalue::Swizzle(Swizzle {
                    value,
                    components,
                    count,
                })
            }
            NodeKind::Texture => Rvalue::Texture(Box::new(self.texture_body()?)),
            other => {
                return Err(DecodeError::UnexpectedKind {
                    expected: "rvalue",
                    found: other,
                })
            }
        };
        self.leave();
        self.finish(&record)?;
        Ok(value)
    }

    fn texture_body(&mut self) -> Result<Texture, DecodeError> {
        let op = decode_enum("texture op", self.input.read::<u8>()?)?;
        let ty = self.ty()?;
        let sampler = self.boxed_rvalue()?;
        let coordinate = self.optional_boxed()?;
        let projector = self.optional_boxed()?;
        let shadow_comparator = self.optional_boxed()?;
        let offset = self.optional_boxed()?;
        let lod_kind: LodKind = decode_enum("lod kind", self.input.read::<u8>()?)?;
        let lod = match lod_kind {
            LodKind::None => LodInfo::None,
            LodKind::Bias => LodInfo::Bias(self.boxed_rvalue()?),
            LodKind::Lod => LodInfo::Lod(self.boxed_rvalue()?),
            LodKind::Grad => LodInfo::Grad {
                dpdx: self.boxed_rvalue()?,
                dpdy: self.boxed_rvalue()?,
            },
            LodKind::SampleIndex => LodInfo::SampleIndex(self.boxed_rvalue()?),
            LodKind::Component => LodInfo::Component(self.boxed_rvalue()?),
        };
        Ok(Texture {
            op,
            ty,
            sampler,
            coordinate,
            projector,
            shadow_comparator,
            offset,
            lod,
        })
    }

    fn optional_constant(&mut self) -> Result<Option<Constant>, DecodeError> {
        if !self.input.read_bool()? {
            return Ok(None);
        }
        self.constant_record().map(Some)
    }

    fn constant_record(&mut self) -> Result<Constant, DecodeError> {
        let record = self.header()?;
        expect_kind(&record, NodeKind::Constant, "constant")?;
        self.enter()?;
        let constant = self.constant_body()?;
        self.leave();
        self.finish(&record)?;
        Ok(constant)
    }

    fn constant_body(&mut self) -> Result<Constant, DecodeError> {
        let ty = self.ty()?;
        let shape = match self.shader.types.try_get(ty) {
            Some(Type::Numeric { .. }) => ConstantShape::Components,
            Some(Type::Array { .. }) => ConstantShape::Array,
            Some(Type::Struct { .. }) => ConstantShape::Struct,
            _ => {
                return Err(DecodeError::invalid(format!(
                    "constant of type {}",
                    self.shader.types.display_name(ty)
                )))
            }
        };
        let value = match shape {
            ConstantShape::Components => {
                let count = self.input.read_count(4)?;
                let mut words = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    words.push(self.input.read::<u32>()?);
                }
                ConstantValue::Components(words)
            }
            ConstantShape::Array => ConstantValue::Array(self.constant_list()?),
            ConstantShape::Struct => ConstantValue::Struct(self.constant_list()?),
        };
        Ok(Constant { ty, value })
    }

    fn constant_list(&mut self) -> Result<Vec<Constant>, DecodeError> {
        let count = self.input.read_count(RECORD_HEADER_LEN)?;
        let mut items = Vec::with_capacity(count as usize);
        for _ in 0..count {
            items.push(self.constant_record()?);
        }
        Ok(items)
    }
}
