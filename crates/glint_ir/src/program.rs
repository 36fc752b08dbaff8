//! Linked programs: per-stage shaders plus linker metadata.

use crate::ids::TypeId;
use crate::shader::{Shader, ShaderStage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Plain link metadata of a program, stored as one block in cache entries.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgramHeader {
    /// GL object name.
    pub name: u32,
    /// Link succeeded.
    pub link_status: bool,
    /// Last `glValidateProgram` result.
    pub validate_status: bool,
    /// Bit mask of texture units referenced by samplers.
    pub samplers_used: u32,
    /// Number of uniforms declared by user code (excludes builtin state).
    pub num_user_uniforms: u32,
    /// Number of entries in the uniform location remap table.
    pub num_uniform_remap_entries: u32,
    /// Linker info log.
    pub info_log: String,
}

/// Plain layout fields of one uniform storage entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UniformStorageHeader {
    /// Array length, `0` for non-arrays.
    pub array_elements: u32,
    /// 32-bit slots per element.
    pub component_slots: u32,
    /// Set once the uniform has been written by the application or an initializer.
    pub initialized: bool,
    /// Texture unit for sampler uniforms.
    pub sampler_index: Option<u8>,
    /// First location in the remap table.
    pub remap_location: u32,
    /// Owning uniform block, `-1` for the default block.
    pub block_index: i32,
    /// Byte offset within the owning block, `-1` for the default block.
    pub offset: i32,
    /// Row-major matrix layout.
    pub row_major: bool,
}

/// Where a uniform's type was found after loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformTypeRef {
    /// The stage whose declaration supplied the type.
    pub stage: ShaderStage,
    /// The type in that stage's [`TypeDb`](crate::TypeDb).
    pub ty: TypeId,
}

/// Backing storage for one active uniform.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformStorage {
    /// Uniform name as queried by the application.
    pub name: String,
    /// Layout fields.
    pub header: UniformStorageHeader,
    /// Current values as raw 32-bit words.
    pub values: Vec<u32>,
    /// Resolved type; live state, not persisted.
    pub ty: Option<UniformTypeRef>,
}

impl UniformStorage {
    /// Number of 32-bit value slots implied by the header.
    pub fn value_slots(&self) -> usize {
        self.header.array_elements.max(1) as usize * self.header.component_slots as usize
    }

    /// Size of the value data in bytes.
    pub fn data_size(&self) -> usize {
        self.value_slots() * std::mem::size_of::<u32>()
    }
}

/// A uniform block and its member names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformBlock {
    /// Block name.
    pub name: String,
    /// Member uniform names.
    pub uniforms: Vec<String>,
}

/// A linked program.
#[derive(Debug, Clone, Default)]
pub struct Program {
    /// Link metadata.
    pub header: ProgramHeader,
    /// `glBindAttribLocation` bindings.
    pub attribute_bindings: BTreeMap<String, u32>,
    /// `glBindFragDataLocation` bindings.
    pub frag_data_bindings: BTreeMap<String, u32>,
    /// `glBindFragDataLocationIndexed` index bindings.
    pub frag_data_index_bindings: BTreeMap<String, u32>,
    /// Uniform name to location.
    pub uniform_locations: BTreeMap<String, u32>,
    /// Active uniform storage.
    pub uniform_storage: Vec<UniformStorage>,
    /// Active uniform blocks.
    pub uniform_blocks: Vec<UniformBlock>,
    /// Captured transform feedback varyings.
    pub transform_feedback_varyings: Vec<String>,
    /// Linked shaders, indexed by [`ShaderStage::index`].
    pub stages: [Option<Shader>; ShaderStage::COUNT],
    /// Live state: the program is ready to use.
    pub linked: bool,
}

impl Program {
    /// Creates an empty, unlinked program.
    pub fn new() -> Self {
        Self::default()
    }

    /// Places `shader` in its stage slot, replacing any previous one.
    pub fn attach(&mut self, shader: Shader) {
        let index = shader.stage.index();
        self.stages[index] = Some(shader);
    }

    /// The shader for `stage`, if linked.
    pub fn stage(&self, stage: ShaderStage) -> Option<&Shader> {
        self.stages[stage.index()].as_ref()
    }

    /// Linked shaders in stage order.
    pub fn shaders(&self) -> impl Iterator<Item = &Shader> {
        self.stages.iter().flatten()
    }

    /// Source text of each linked shader in stage order; a missing source
    /// yields `""`.
    pub fn sources(&self) -> Vec<&str> {
        self.shaders()
            .map(|s| s.source.as_deref().unwrap_or(""))
            .collect()
    }

    /// Resolves each storage entry's type by name against the top-level
    /// uniform declarations of the linked shaders (first stage wins), then
    /// marks the program linked.
    pub fn resolve_uniform_types(&mut self) {
        for storage in &mut self.uniform_storage {
            storage.ty = self.stages.iter().flatten().find_map(|shader| {
                shader.find_uniform(&storage.name).map(|var| UniformTypeRef {
                    stage: shader.stage,
                    ty: shader.variables[var].ty,
                })
            });
        }
        self.linked = true;
    }
}
