//! Compiled shaders: one pipeline stage's IR plus its compile metadata.

use crate::arena::Arena;
use crate::builtins::BuiltinTable;
use crate::function::{Function, Signature};
use crate::ids::{FunctionId, SignatureId, TypeId, VariableId};
use crate::stmt::Instruction;
use crate::types::{Type, TypeDb};
use crate::variable::{Variable, VariableMode};
use serde::{Deserialize, Serialize};

wire_enum! {
    /// Pipeline stage. The code doubles as the stage index in programs.
    pub enum ShaderStage: u32 {
        /// Vertex stage.
        Vertex = 0,
        /// Geometry stage.
        Geometry = 1,
        /// Fragment stage.
        Fragment = 2,
    }
}

impl ShaderStage {
    /// The GL shader-type enum (`GL_VERTEX_SHADER` etc.).
    pub fn gl_enum(self) -> u32 {
        match self {
            ShaderStage::Vertex => 0x8B31,
            ShaderStage::Fragment => 0x8B30,
            ShaderStage::Geometry => 0x8DD9,
        }
    }

    /// Inverse of [`gl_enum`](Self::gl_enum).
    pub fn from_gl_enum(value: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.gl_enum() == value)
    }

    /// Index into [`Program::stages`](crate::Program::stages).
    pub fn index(self) -> usize {
        self.code() as usize
    }

    /// Short lower-case name (`vertex`).
    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Geometry => "geometry",
            ShaderStage::Fragment => "fragment",
        }
    }
}

wire_enum! {
    /// A GLSL language extension known to the front end.
    pub enum Extension: u8 {
        /// `GL_ARB_draw_buffers`.
        ArbDrawBuffers = 0,
        /// `GL_ARB_explicit_attrib_location`.
        ArbExplicitAttribLocation = 1,
        /// `GL_ARB_fragment_coord_conventions`.
        ArbFragmentCoordConventions = 2,
        /// `GL_ARB_shader_texture_lod`.
        ArbShaderTextureLod = 3,
        /// `GL_ARB_texture_rectangle`.
        ArbTextureRectangle = 4,
        /// `GL_ARB_uniform_buffer_object`.
        ArbUniformBufferObject = 5,
        /// `GL_EXT_texture_array`.
        ExtTextureArray = 6,
        /// `GL_OES_standard_derivatives`.
        OesStandardDerivatives = 7,
        /// `GL_OES_EGL_image_external`.
        OesEglImageExternal = 8,
        /// `GL_OES_texture_3D`.
        OesTexture3d = 9,
    }
}

impl Extension {
    /// The extension's `#extension` name.
    pub fn name(self) -> &'static str {
        match self {
            Extension::ArbDrawBuffers => "GL_ARB_draw_buffers",
            Extension::ArbExplicitAttribLocation => "GL_ARB_explicit_attrib_location",
            Extension::ArbFragmentCoordConventions => "GL_ARB_fragment_coord_conventions",
            Extension::ArbShaderTextureLod => "GL_ARB_shader_texture_lod",
            Extension::ArbTextureRectangle => "GL_ARB_texture_rectangle",
            Extension::ArbUniformBufferObject => "GL_ARB_uniform_buffer_object",
            Extension::ExtTextureArray => "GL_EXT_texture_array",
            Extension::OesStandardDerivatives => "GL_OES_standard_derivatives",
            Extension::OesEglImageExternal => "GL_OES_EGL_image_external",
            Extension::OesTexture3d => "GL_OES_texture_3D",
        }
    }
}

/// Set of enabled extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtensionSet(u32);

impl ExtensionSet {
    /// No extensions enabled.
    pub fn empty() -> Self {
        Self(0)
    }

    /// Every known extension enabled.
    pub fn all() -> Self {
        Extension::ALL
            .iter()
            .fold(Self::empty(), |set, ext| set.with(*ext))
    }

    /// Returns the set with `ext` added.
    pub fn with(self, ext: Extension) -> Self {
        Self(self.0 | (1 << ext.code()))
    }

    /// Enables `ext`.
    pub fn insert(&mut self, ext: Extension) {
        *self = self.with(ext);
    }

    /// Returns `true` if `ext` is enabled.
    pub fn contains(&self, ext: Extension) -> bool {
        self.0 & (1 << ext.code()) != 0
    }

    /// Iterates over the enabled extensions.
    pub fn iter(&self) -> impl Iterator<Item = Extension> + '_ {
        Extension::ALL.iter().copied().filter(|e| self.contains(*e))
    }
}

/// Plain compile metadata of a shader, stored as one block in cache entries.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShaderHeader {
    /// GL object name.
    pub name: u32,
    /// `#version` number.
    pub version: u32,
    /// GLSL ES rather than desktop GLSL.
    pub is_es: bool,
    /// Compilation succeeded.
    pub compile_status: bool,
    /// Any `discard` statement.
    pub uses_discard: bool,
    /// Any builtin call.
    pub uses_builtin_functions: bool,
    /// Number of sampler uniforms.
    pub num_samplers: u32,
    /// Compiler info log.
    pub info_log: String,
}

/// One compiled stage.
///
/// Variables, functions and signatures live in arenas; [`body`](Self::body)
/// and signature bodies refer to them by ID.
#[derive(Debug, Clone)]
pub struct Shader {
    /// Pipeline stage.
    pub stage: ShaderStage,
    /// Compile metadata.
    pub header: ShaderHeader,
    /// GLSL source text; the cache key is derived from it.
    pub source: Option<String>,
    /// Extensions enabled while compiling.
    pub extensions: ExtensionSet,
    /// Interned types.
    pub types: TypeDb,
    /// All variables, including parameters and locals.
    pub variables: Arena<VariableId, Variable>,
    /// All functions.
    pub functions: Arena<FunctionId, Function>,
    /// All overloads of all functions.
    pub signatures: Arena<SignatureId, Signature>,
    /// Top-level instruction list.
    pub body: Vec<Instruction>,
}

impl Shader {
    /// Creates an empty shader for `stage`.
    pub fn new(stage: ShaderStage) -> Self {
        Self {
            stage,
            header: ShaderHeader::default(),
            source: None,
            extensions: ExtensionSet::empty(),
            types: TypeDb::new(),
            variables: Arena::new(),
            functions: Arena::new(),
            signatures: Arena::new(),
            body: Vec::new(),
        }
    }

    /// Creates an empty shader with source text.
    pub fn with_source(stage: ShaderStage, source: impl Into<String>) -> Self {
        let mut shader = Self::new(stage);
        shader.source = Some(source.into());
        shader
    }

    /// Adds a variable to the arena. The caller places its
    /// [`Instruction::Variable`] declaration.
    pub fn declare_variable(&mut self, var: Variable) -> VariableId {
        self.variables.alloc(var)
    }

    /// Returns the function named `name`, creating it if needed.
    pub fn add_function(&mut self, name: &str) -> FunctionId {
        if let Some(id) = self.find_function(name) {
            return id;
        }
        self.functions.alloc(Function {
            name: name.to_string(),
            signatures: Vec::new(),
        })
    }

    /// Adds an overload to its function.
    pub fn add_signature(&mut self, sig: Signature) -> SignatureId {
        let function = sig.function;
        let id = self.signatures.alloc(sig);
        self.functions[function].signatures.push(id);
        id
    }

    /// Looks up a function by name.
    pub fn find_function(&self, name: &str) -> Option<FunctionId> {
        self.functions
            .iter()
            .find(|(_, f)| f.name == name)
            .map(|(id, _)| id)
    }

    /// Parameter types of an overload, in order.
    pub fn parameter_types(&self, sig: SignatureId) -> Vec<TypeId> {
        self.signatures[sig]
            .parameters
            .iter()
            .map(|p| self.variables[*p].ty)
            .collect()
    }

    /// Finds the overload of `name` with exactly these parameter and return
    /// types, builtin or not.
    pub fn find_signature(
        &self,
        name: &str,
        parameter_types: &[TypeId],
        return_type: TypeId,
    ) -> Option<SignatureId> {
        let function = self.find_function(name)?;
        self.functions[function]
            .signatures
            .iter()
            .copied()
            .find(|sig| {
                self.signatures[*sig].return_type == return_type
                    && self.parameter_types(*sig) == parameter_types
            })
    }

    /// The top-level `uniform` declaration named `name`.
    pub fn find_uniform(&self, name: &str) -> Option<VariableId> {
        self.body.iter().find_map(|inst| match inst {
            Instruction::Variable(id) => {
                let var = &self.variables[*id];
                (var.mode == VariableMode::Uniform && var.name == name).then_some(*id)
            }
            _ => None,
        })
    }

    /// Imports the canonical builtin overload of `name` for `args`.
    ///
    /// Reuses an already imported overload; otherwise asks `table`, declares
    /// the parameters, and adds a builtin signature with an empty body.
    /// Returns `None` if the table has no such overload or an argument type
    /// is not interned in this shader.
    pub fn import_builtin(
        &mut self,
        table: &dyn BuiltinTable,
        name: &str,
        args: &[TypeId],
    ) -> Option<SignatureId> {
        let arg_types = args
            .iter()
            .map(|id| self.types.try_get(*id).cloned())
            .collect::<Option<Vec<Type>>>()?;
        let builtin = table.find(name, &arg_types)?;
        let return_type = self.types.intern(builtin.return_type);

        if let Some(existing) = self.find_signature(name, args, return_type) {
            if self.signatures[existing].is_builtin {
                return Some(existing);
            }
        }

        let function = self.add_function(name);
        let mut sig = Signature::new(function, return_type);
        sig.is_builtin = true;
        sig.is_defined = true;
        for param in builtin.parameters {
            let ty = self.types.intern(param.ty);
            sig.parameters
                .push(self.declare_variable(Variable::new(param.name, ty, param.mode)));
        }
        Some(self.add_signature(sig))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::StandardBuiltins;

    #[test]
    fn gl_enum_roundtrip() {
        for stage in ShaderStage::ALL {
            assert_eq!(ShaderStage::from_gl_enum(stage.gl_enum()), Some(*stage));
        }
        assert_eq!(ShaderStage::from_gl_enum(0x1234), None);
        assert_eq!(ShaderStage::Fragment.gl_enum(), 0x8B30);
        assert_eq!(ShaderStage::Fragment.index(), 2);
    }

    #[test]
    fn extension_set() {
        let mut set = ExtensionSet::empty();
        assert!(!set.contains(Extension::OesStandardDerivatives));
        set.insert(Extension::OesStandardDerivatives);
        assert!(set.contains(Extension::OesStandardDerivatives));
        assert_eq!(set.iter().count(), 1);
        assert_eq!(ExtensionSet::all().iter().count(), Extension::COUNT);
    }

    #[test]
    fn functions_are_unique_by_name() {
        let mut shader = Shader::new(ShaderStage::Vertex);
        let a = shader.add_function("main");
        let b = shader.add_function("main");
        assert_eq!(a, b);
        assert_eq!(shader.functions.len(), 1);
    }

    #[test]
    fn find_signature_by_types() {
        let mut shader = Shader::new(ShaderStage::Fragment);
        let float = shader.types.intern(Type::float());
        let vec2 = shader.types.intern(Type::vec(2));
        let f = shader.add_function("scale");
        let mut sig = Signature::new(f, float);
        let p = shader.declare_variable(Variable::new("v", vec2, VariableMode::FunctionIn));
        sig.parameters.push(p);
        let id = shader.add_signature(sig);

        assert_eq!(shader.find_signature("scale", &[vec2], float), Some(id));
        assert_eq!(shader.find_signature("scale", &[float], float), None);
        assert_eq!(shader.find_signature("other", &[vec2], float), None);
    }

    #[test]
    fn import_builtin_is_cached() {
        let mut shader = Shader::new(ShaderStage::Fragment);
        let vec3 = shader.types.intern(Type::vec(3));
        let a = shader
            .import_builtin(&StandardBuiltins, "normalize", &[vec3])
            .unwrap();
        let b = shader
            .import_builtin(&StandardBuiltins, "normalize", &[vec3])
            .unwrap();
        assert_eq!(a, b);
        assert!(shader.signatures[a].is_builtin);
        assert_eq!(shader.parameter_types(a), vec![vec3]);
        assert!(shader
            .import_builtin(&StandardBuiltins, "no_such_builtin", &[vec3])
            .is_none());
    }

    #[test]
    fn find_uniform_top_level_only() {
        let mut shader = Shader::new(ShaderStage::Vertex);
        let mat4 = shader.types.intern(Type::mat(4, 4));
        let u = shader.declare_variable(Variable::new("mvp", mat4, VariableMode::Uniform));
        let t = shader.declare_variable(Variable::new("tmp", mat4, VariableMode::Auto));
        shader.body.push(Instruction::Variable(u));
        shader.body.push(Instruction::Variable(t));
        assert_eq!(shader.find_uniform("mvp"), Some(u));
        assert_eq!(shader.find_uniform("tmp"), None);
    }
}
