//! Whole-entry encoding of shaders and programs.
//!
//! Every entry starts with a completeness sentinel, a `u32` that holds the
//! entry's total length once writing finished and zero before. The
//! [`Fingerprint`] follows, then the object itself. Program entries nest one
//! complete shader entry (sentinel and fingerprint included) per stage.
//!
//! Plain metadata headers are stored as bincode blocks with a `u32` length
//! prefix; everything else uses the cache's own record layout.

use crate::error::{CacheError, DecodeError};
use crate::fingerprint::Fingerprint;
use crate::ir_reader::deserialize_ir;
use crate::ir_writer::serialize_ir;
use crate::reader::MappedBuffer;
use crate::writer::WriteBuffer;
use glint_ir::validate::validate_shader;
use glint_ir::{
    BuiltinTable, Program, Shader, ShaderStage, UniformStorage, UniformStorageHeader,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;

/// Builtin calls whose presence in a source makes it uncacheable: their IR
/// lowering depends on driver state that the entry does not capture.
pub const UNSUPPORTED_SOURCE_CALLS: &[&str] = &["textureQueryLod", "textureGather"];

/// Most shaders a program entry may declare.
const MAX_PROGRAM_SHADERS: u8 = ShaderStage::COUNT as u8;

/// Checks that a single shader can be represented in an entry.
pub fn shader_eligibility(shader: &Shader) -> Result<(), CacheError> {
    if shader.stage == ShaderStage::Geometry {
        return Err(ineligible("geometry shader"));
    }
    if let Some(source) = &shader.source {
        if let Some(call) = UNSUPPORTED_SOURCE_CALLS
            .iter()
            .find(|call| source.contains(*call))
        {
            return Err(ineligible(format!("source calls {call}")));
        }
    }
    Ok(())
}

/// Checks that a program and all of its shaders can be represented in an
/// entry.
pub fn check_eligibility(program: &Program) -> Result<(), CacheError> {
    if program.stage(ShaderStage::Geometry).is_some() {
        return Err(ineligible("geometry stage"));
    }
    if !program.uniform_blocks.is_empty() {
        return Err(ineligible("uniform blocks"));
    }
    if !program.transform_feedback_varyings.is_empty() {
        return Err(ineligible("transform feedback"));
    }
    if let Some(storage) = program.uniform_storage.iter().find(|s| s.name.contains('.')) {
        return Err(ineligible(format!("structured uniform {}", storage.name)));
    }
    program.shaders().try_for_each(shader_eligibility)
}

fn ineligible(reason: impl Into<String>) -> CacheError {
    CacheError::Ineligible {
        reason: reason.into(),
    }
}

fn write_header_block<T: Serialize>(value: &T, out: &mut WriteBuffer) -> Result<(), CacheError> {
    let bytes = bincode::serde::encode_to_vec(value, bincode::config::standard()).map_err(|e| {
        CacheError::Serialization {
            reason: e.to_string(),
        }
    })?;
    out.write(bytes.len() as u32);
    out.write_block(&bytes);
    Ok(())
}

/// Decodes a header block and positions the reader after its declared end,
/// even if the decoder used fewer bytes.
fn read_header_block<T: DeserializeOwned>(input: &mut MappedBuffer<'_>) -> Result<T, CacheError> {
    let len = input.read::<u32>()? as usize;
    let bytes = input.read_bytes(len)?;
    let (value, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())
        .map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;
    Ok(value)
}

/// Checks the completeness sentinel and the fingerprint, returning the
/// sentinel.
fn read_preamble(input: &mut MappedBuffer<'_>, fp: &Fingerprint) -> Result<u32, CacheError> {
    let sentinel = input.read::<u32>()?;
    if sentinel == 0 {
        return Err(CacheError::Incomplete);
    }
    fp.check(input)?;
    Ok(sentinel)
}

fn check_sentinel(
    input: &MappedBuffer<'_>,
    start: usize,
    sentinel: u32,
) -> Result<(), DecodeError> {
    let len = input.position() - start;
    if len != sentinel as usize {
        return Err(DecodeError::invalid(format!(
            "entry is {len} bytes but its sentinel says {sentinel}"
        )));
    }
    Ok(())
}

fn write_shader_entry(
    shader: &Shader,
    fp: &Fingerprint,
    out: &mut WriteBuffer,
) -> Result<(), CacheError> {
    let start = out.position();
    out.write(0u32);
    fp.write(out);

    let record = out.begin_length();
    out.write(shader.stage.gl_enum());
    write_header_block(&shader.header, out)?;
    out.write_string(shader.source.as_deref());
    serialize_ir(shader, out).map_err(CacheError::Validation)?;
    out.end_length(record);

    let total = (out.position() - start) as u32;
    out.overwrite(&total.to_le_bytes(), start);
    Ok(())
}

fn read_shader_entry(
    input: &mut MappedBuffer<'_>,
    fp: &Fingerprint,
    builtins: &dyn BuiltinTable,
) -> Result<Shader, CacheError> {
    let start = input.position();
    let sentinel = read_preamble(input, fp)?;

    let record_len = input.read::<u32>()? as usize;
    let record_start = input.position();
    let kind = input.read::<u32>()?;
    let stage = ShaderStage::from_gl_enum(kind).ok_or(DecodeError::UnknownCode {
        what: "shader kind",
        code: kind.into(),
    })?;
    let header = read_header_block(input)?;
    let source = input.read_string()?;
    let mut shader = deserialize_ir(input, stage, builtins)?;

    let consumed = input.position() - record_start;
    if consumed != record_len {
        return Err(DecodeError::invalid(format!(
            "shader record is {consumed} bytes but declares {record_len}"
        ))
        .into());
    }
    check_sentinel(input, start, sentinel)?;

    shader.header = header;
    shader.source = source;
    shader_eligibility(&shader)?;
    Ok(shader)
}

/// Encodes a shader as a standalone entry.
///
/// The shader must be eligible and pass validation; nothing is encoded
/// otherwise.
pub fn encode_shader(shader: &Shader, fp: &Fingerprint) -> Result<Vec<u8>, CacheError> {
    shader_eligibility(shader)?;
    validate_shader(shader).map_err(CacheError::Validation)?;
    let mut out = WriteBuffer::new();
    write_shader_entry(shader, fp, &mut out)?;
    Ok(out.release())
}

/// Decodes a standalone shader entry.
pub fn decode_shader(
    input: &mut MappedBuffer<'_>,
    fp: &Fingerprint,
    builtins: &dyn BuiltinTable,
) -> Result<Shader, CacheError> {
    read_shader_entry(input, fp, builtins)
}

fn write_table(table: &BTreeMap<String, u32>, out: &mut WriteBuffer) {
    out.write(table.len() as u32);
    for (name, value) in table {
        out.write_string(Some(name));
        out.write(*value);
    }
}

fn read_table(input: &mut MappedBuffer<'_>) -> Result<BTreeMap<String, u32>, DecodeError> {
    // An entry is at least an absent-string length and a value.
    let count = input.read_count(8)?;
    let mut table = BTreeMap::new();
    for _ in 0..count {
        let name = input.read_required_string("binding name")?;
        let value = input.read::<u32>()?;
        table.insert(name, value);
    }
    Ok(table)
}

fn write_storage(storage: &UniformStorage, out: &mut WriteBuffer) -> Result<(), CacheError> {
    if storage.values.len() != storage.value_slots() {
        return Err(CacheError::Validation(glint_common::InternalError::new(
            format!(
                "uniform {} has {} values for {} slots",
                storage.name,
                storage.values.len(),
                storage.value_slots()
            ),
        )));
    }
    out.write_string(Some(&storage.name));
    out.write(storage.data_size() as u32);
    write_header_block(&storage.header, out)?;
    for value in &storage.values {
        out.write(*value);
    }
    Ok(())
}

fn read_storage(input: &mut MappedBuffer<'_>) -> Result<UniformStorage, CacheError> {
    let name = input.read_required_string("uniform name")?;
    let data_size = input.read::<u32>()?;
    let header: UniformStorageHeader = read_header_block(input)?;

    let expected = u64::from(header.array_elements.max(1))
        .checked_mul(u64::from(header.component_slots))
        .and_then(|slots| slots.checked_mul(4));
    if expected != Some(u64::from(data_size)) {
        return Err(DecodeError::invalid(format!(
            "uniform {name} stores {data_size} bytes, header implies {expected:?}"
        ))
        .into());
    }
    let values = input
        .read_bytes(data_size as usize)?
        .chunks_exact(4)
        .map(|word| u32::from_le_bytes([word[0], word[1], word[2], word[3]]))
        .collect();
    Ok(UniformStorage {
        name,
        header,
        values,
        ty: None,
    })
}

/// Encodes a linked program and its shaders as one entry.
pub fn encode_program(program: &Program, fp: &Fingerprint) -> Result<Vec<u8>, CacheError> {
    check_eligibility(program)?;
    for shader in program.shaders() {
        validate_shader(shader).map_err(CacheError::Validation)?;
    }

    let mut out = WriteBuffer::new();
    out.write(0u32);
    fp.write(&mut out);
    write_header_block(&program.header, &mut out)?;

    write_table(&program.attribute_bindings, &mut out);
    write_table(&program.frag_data_bindings, &mut out);
    write_table(&program.frag_data_index_bindings, &mut out);
    write_table(&program.uniform_locations, &mut out);

    out.write(program.uniform_storage.len() as u32);
    for storage in &program.uniform_storage {
        write_storage(storage, &mut out)?;
    }

    out.write(program.shaders().count() as u8);
    for shader in program.shaders() {
        out.write(shader.stage.code());
        write_shader_entry(shader, fp, &mut out)?;
    }

    let total = out.position() as u32;
    out.overwrite(&total.to_le_bytes(), 0);
    Ok(out.release())
}

/// Decodes a program entry, re-resolving uniform types against the
/// reconstructed shaders.
pub fn decode_program(
    input: &mut MappedBuffer<'_>,
    fp: &Fingerprint,
    builtins: &dyn BuiltinTable,
) -> Result<Program, CacheError> {
    let start = input.position();
    let sentinel = read_preamble(input, fp)?;

    let mut program = Program::new();
    program.header = read_header_block(input)?;
    program.attribute_bindings = read_table(input)?;
    program.frag_data_bindings = read_table(input)?;
    program.frag_data_index_bindings = read_table(input)?;
    program.uniform_locations = read_table(input)?;

    // A storage entry is at least a name length, a size, and a block length.
    let storage_count = input.read_count(12)?;
    for _ in 0..storage_count {
        program.uniform_storage.push(read_storage(input)?);
    }

    let shader_count = input.read::<u8>()?;
    if shader_count > MAX_PROGRAM_SHADERS {
        return Err(DecodeError::invalid(format!("program declares {shader_count} shaders")).into());
    }
    for _ in 0..shader_count {
        let code = input.read::<u32>()?;
        let stage = ShaderStage::try_from(code).map_err(|code| DecodeError::UnknownCode {
            what: "stage index",
            code: code.into(),
        })?;
        let shader = read_shader_entry(input, fp, builtins)?;
        if shader.stage != stage {
            return Err(DecodeError::invalid(format!(
                "{} shader stored in the {} slot",
                shader.stage.name(),
                stage.name()
            ))
            .into());
        }
        if program.stage(stage).is_some() {
            return Err(
                DecodeError::invalid(format!("duplicate {} shader", stage.name())).into(),
            );
        }
        program.attach(shader);
    }
    check_sentinel(input, start, sentinel)?;

    check_eligibility(&program)?;
    program.resolve_uniform_types();
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_ir::{
        Assignment, Constant, Instruction, ProgramHeader, Rvalue, ShaderHeader, StandardBuiltins,
        Type, Variable, VariableMode,
    };

    fn fp() -> Fingerprint {
        Fingerprint::current("Mesa", "llvmpipe")
    }

    fn shader(stage: ShaderStage, source: &str) -> Shader {
        let mut shader = Shader::with_source(stage, source);
        shader.header = ShaderHeader {
            name: 3,
            version: 130,
            compile_status: true,
            info_log: "ok".to_string(),
            ..Default::default()
        };
        let vec4 = shader.types.intern(Type::vec(4));
        let color = shader.declare_variable(Variable::new("color", vec4, VariableMode::Uniform));
        let out = shader.declare_variable(Variable::new("frag", vec4, VariableMode::ShaderOut));
        shader.body.push(Instruction::Variable(color));
        shader.body.push(Instruction::Variable(out));
        shader.body.push(Instruction::Assignment(Assignment {
            lhs: Rvalue::var(out),
            rhs: Rvalue::var(color),
            condition: None,
            write_mask: 0xF,
        }));
        shader
    }

    fn program() -> Program {
        let mut program = Program::new();
        program.header = ProgramHeader {
            name: 9,
            link_status: true,
            num_user_uniforms: 1,
            ..Default::default()
        };
        program.attribute_bindings.insert("position".to_string(), 0);
        program.uniform_locations.insert("color".to_string(), 2);
        program.uniform_storage.push(UniformStorage {
            name: "color".to_string(),
            header: UniformStorageHeader {
                component_slots: 4,
                initialized: true,
                ..Default::default()
            },
            values: vec![1, 2, 3, 4],
            ty: None,
        });
        program.attach(shader(ShaderStage::Vertex, "void main() { gl_Position = vec4(0.0); }"));
        program.attach(shader(ShaderStage::Fragment, "void main() { frag = color; }"));
        program
    }

    #[test]
    fn sentinel_holds_total_length() {
        let bytes = encode_shader(&shader(ShaderStage::Vertex, "v"), &fp()).unwrap();
        assert_eq!(
            u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize,
            bytes.len()
        );
    }

    #[test]
    fn shader_entry_roundtrip() {
        let original = shader(ShaderStage::Fragment, "void main() { frag = color; }");
        let bytes = encode_shader(&original, &fp()).unwrap();
        let mut input = MappedBuffer::from_slice(&bytes);
        let back = decode_shader(&mut input, &fp(), &StandardBuiltins).unwrap();
        assert_eq!(back.stage, ShaderStage::Fragment);
        assert_eq!(back.header, original.header);
        assert_eq!(back.source, original.source);
        assert_eq!(glint_ir::print::dump(&back), glint_ir::print::dump(&original));
    }

    #[test]
    fn program_entry_roundtrip() {
        let original = program();
        let bytes = encode_program(&original, &fp()).unwrap();
        let mut input = MappedBuffer::from_slice(&bytes);
        let back = decode_program(&mut input, &fp(), &StandardBuiltins).unwrap();

        assert!(back.linked);
        assert_eq!(back.header, original.header);
        assert_eq!(back.attribute_bindings, original.attribute_bindings);
        assert_eq!(back.uniform_locations, original.uniform_locations);
        assert_eq!(back.sources(), original.sources());
        let storage = &back.uniform_storage[0];
        assert_eq!(storage.values, vec![1, 2, 3, 4]);
        let resolved = storage.ty.as_ref().unwrap();
        assert_eq!(resolved.stage, ShaderStage::Vertex);
        let vertex = back.stage(ShaderStage::Vertex).unwrap();
        assert_eq!(vertex.types.get(resolved.ty), &Type::vec(4));
    }

    #[test]
    fn zero_sentinel_is_incomplete() {
        let mut bytes = encode_program(&program(), &fp()).unwrap();
        bytes[..4].copy_from_slice(&[0; 4]);
        let mut input = MappedBuffer::from_slice(&bytes);
        let err = decode_program(&mut input, &fp(), &StandardBuiltins).unwrap_err();
        assert!(matches!(err, CacheError::Incomplete));
        assert!(err.is_stale());
    }

    #[test]
    fn other_driver_is_stale() {
        let bytes = encode_program(&program(), &fp()).unwrap();
        let other = Fingerprint::current("Mesa", "softpipe");
        let err = decode_program(&mut MappedBuffer::from_slice(&bytes), &other, &StandardBuiltins)
            .unwrap_err();
        assert!(err.is_stale());
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut bytes = encode_shader(&shader(ShaderStage::Vertex, "v"), &fp()).unwrap();
        let len = bytes.len() as u32 + 4;
        bytes[..4].copy_from_slice(&len.to_le_bytes());
        bytes.extend_from_slice(&[0; 4]);
        let err = decode_shader(&mut MappedBuffer::from_slice(&bytes), &fp(), &StandardBuiltins)
            .unwrap_err();
        assert!(matches!(err, CacheError::Decode(_)));
    }

    #[test]
    fn geometry_and_blocks_are_ineligible() {
        let mut p = program();
        p.uniform_blocks.push(glint_ir::UniformBlock {
            name: "Lights".to_string(),
            uniforms: Vec::new(),
        });
        assert!(matches!(
            encode_program(&p, &fp()),
            Err(CacheError::Ineligible { .. })
        ));

        let geometry = Shader::with_source(ShaderStage::Geometry, "void main() {}");
        assert!(matches!(
            encode_shader(&geometry, &fp()),
            Err(CacheError::Ineligible { .. })
        ));
    }

    #[test]
    fn unsupported_source_call_is_ineligible() {
        let s = shader(ShaderStage::Fragment, "vec4 c = textureGather(s, uv);");
        let err = encode_shader(&s, &fp()).unwrap_err();
        assert!(err.to_string().contains("textureGather"));
    }

    #[test]
    fn structured_uniform_is_ineligible() {
        let mut p = program();
        p.uniform_storage[0].name = "light.color".to_string();
        assert!(matches!(
            check_eligibility(&p),
            Err(CacheError::Ineligible { .. })
        ));
    }

    #[test]
    fn storage_value_count_must_match_header() {
        let mut p = program();
        p.uniform_storage[0].values.pop();
        assert!(matches!(
            encode_program(&p, &fp()),
            Err(CacheError::Validation(_))
        ));
    }

    #[test]
    fn malformed_shader_is_not_encoded() {
        let mut s = Shader::with_source(ShaderStage::Vertex, "v");
        let float = s.types.intern(Type::float());
        let x = s.declare_variable(Variable::new("x", float, VariableMode::Auto));
        // Dereference without a declaration.
        s.body.push(Instruction::Assignment(Assignment {
            lhs: Rvalue::var(x),
            rhs: Rvalue::Constant(Constant::floats(float, &[1.0])),
            condition: None,
            write_mask: 1,
        }));
        assert!(matches!(
            encode_shader(&s, &fp()),
            Err(CacheError::Validation(_))
        ));
    }
}
