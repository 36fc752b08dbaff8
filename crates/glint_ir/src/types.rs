//! GLSL types and the per-shader type database.
//!
//! All types in a shader are interned into a [`TypeDb`], which assigns each
//! unique type a [`TypeId`] for cheap comparison. The deserializer relies on
//! interning as its type cache: a descriptor read a thousand times resolves
//! to one entry.

use crate::ids::TypeId;
use std::collections::HashMap;

wire_enum! {
    /// Scalar component kind of numeric and sampler types.
    pub enum ScalarKind: u8 {
        /// 32-bit float.
        Float = 0,
        /// 32-bit signed integer.
        Int = 1,
        /// 32-bit unsigned integer.
        Uint = 2,
        /// Boolean.
        Bool = 3,
    }
}

wire_enum! {
    /// Dimensionality of a sampler.
    pub enum SamplerDim: u8 {
        /// `sampler1D`.
        D1 = 0,
        /// `sampler2D`.
        D2 = 1,
        /// `sampler3D`.
        D3 = 2,
        /// `samplerCube`.
        Cube = 3,
        /// `sampler2DRect`.
        Rect = 4,
        /// `samplerBuffer`.
        Buffer = 5,
        /// `samplerExternalOES`.
        External = 6,
    }
}

wire_enum! {
    /// Memory layout of an interface block.
    pub enum InterfacePacking: u8 {
        /// `layout(std140)`.
        Std140 = 0,
        /// `layout(shared)`.
        Shared = 1,
        /// `layout(packed)`.
        Packed = 2,
    }
}

/// A named member of a struct or interface block.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructField {
    /// The field name.
    pub name: String,
    /// The field type.
    pub ty: TypeId,
}

/// A GLSL type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// `void`, the return type of procedures.
    Void,
    /// A placeholder for types that failed resolution.
    Error,
    /// Scalars, vectors, and matrices.
    Numeric {
        /// Component kind.
        base: ScalarKind,
        /// Rows (1 for scalars).
        vector_elements: u8,
        /// Columns (1 for scalars and vectors).
        matrix_columns: u8,
    },
    /// An opaque sampler.
    Sampler {
        /// Texture dimensionality.
        dim: SamplerDim,
        /// Kind of the sampled values.
        base: ScalarKind,
        /// Shadow (depth comparison) sampler.
        shadow: bool,
        /// Array sampler.
        array: bool,
    },
    /// A fixed-length array.
    Array {
        /// Element type.
        element: TypeId,
        /// Number of elements.
        length: u32,
    },
    /// A user-declared struct.
    Struct {
        /// Struct name.
        name: String,
        /// Members in declaration order.
        fields: Vec<StructField>,
    },
    /// A uniform or varying interface block.
    Interface {
        /// Block name.
        name: String,
        /// Memory layout.
        packing: InterfacePacking,
        /// Members in declaration order.
        fields: Vec<StructField>,
    },
}

impl Type {
    /// The `float` type.
    pub fn float() -> Self {
        Self::vector(ScalarKind::Float, 1)
    }

    /// The `int` type.
    pub fn int() -> Self {
        Self::vector(ScalarKind::Int, 1)
    }

    /// The `bool` type.
    pub fn bool() -> Self {
        Self::vector(ScalarKind::Bool, 1)
    }

    /// A scalar (`n == 1`) or vector type.
    pub fn vector(base: ScalarKind, n: u8) -> Self {
        Type::Numeric {
            base,
            vector_elements: n,
            matrix_columns: 1,
        }
    }

    /// A float `vecN`.
    pub fn vec(n: u8) -> Self {
        Self::vector(ScalarKind::Float, n)
    }

    /// A float matrix with `columns` columns of `rows` rows.
    pub fn mat(columns: u8, rows: u8) -> Self {
        Type::Numeric {
            base: ScalarKind::Float,
            vector_elements: rows,
            matrix_columns: columns,
        }
    }

    /// A non-shadow, non-array float sampler.
    pub fn sampler(dim: SamplerDim) -> Self {
        Type::Sampler {
            dim,
            base: ScalarKind::Float,
            shadow: false,
            array: false,
        }
    }

    /// Number of scalar components for numeric types, `None` otherwise.
    pub fn components(&self) -> Option<u32> {
        match self {
            Type::Numeric {
                vector_elements,
                matrix_columns,
                ..
            } => Some(u32::from(*vector_elements) * u32::from(*matrix_columns)),
            _ => None,
        }
    }

    /// Returns `true` for scalars and vectors of a single column.
    pub fn is_scalar_or_vector(&self) -> bool {
        matches!(self, Type::Numeric { matrix_columns: 1, vector_elements: 1..=4, .. })
    }
}

/// Central type database: interned types for cheap comparison.
///
/// Each unique [`Type`] is stored once and referenced by [`TypeId`].
#[derive(Debug, Clone, Default)]
pub struct TypeDb {
    types: Vec<Type>,
    index: HashMap<Type, TypeId>,
}

impl TypeDb {
    /// Creates a new, empty type database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns a type, returning its [`TypeId`].
    ///
    /// If an identical type already exists, returns the existing ID.
    pub fn intern(&mut self, ty: Type) -> TypeId {
        if let Some(&id) = self.index.get(&ty) {
            return id;
        }
        let id = TypeId::from_raw(self.types.len() as u32);
        self.types.push(ty.clone());
        self.index.insert(ty, id);
        id
    }

    /// Returns a reference to the type with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if the ID is out of bounds.
    pub fn get(&self, id: TypeId) -> &Type {
        &self.types[id.as_raw() as usize]
    }

    /// Returns the type with the given ID, or `None` if it is not interned here.
    pub fn try_get(&self, id: TypeId) -> Option<&Type> {
        self.types.get(id.as_raw() as usize)
    }

    /// Returns the number of uniform storage slots (scalar components) the
    /// type occupies. Samplers take one slot; `void` and errors take none.
    pub fn component_slots(&self, id: TypeId) -> u32 {
        match self.get(id) {
            Type::Numeric { .. } => self.get(id).components().unwrap_or(0),
            Type::Sampler { .. } => 1,
            Type::Array { element, length } => self.component_slots(*element) * length,
            Type::Struct { fields, .. } | Type::Interface { fields, .. } => {
                fields.iter().map(|f| self.component_slots(f.ty)).sum()
            }
            Type::Void | Type::Error => 0,
        }
    }

    /// Looks up the type of a named struct or interface field.
    pub fn field_type(&self, id: TypeId, field: &str) -> Option<TypeId> {
        match self.get(id) {
            Type::Struct { fields, .. } | Type::Interface { fields, .. } => {
                fields.iter().find(|f| f.name == field).map(|f| f.ty)
            }
            _ => None,
        }
    }

    /// Returns the GLSL spelling of a type (`vec3`, `mat4x2`, `float[8]`).
    pub fn display_name(&self, id: TypeId) -> String {
        match self.get(id) {
            Type::Void => "void".to_string(),
            Type::Error => "error".to_string(),
            Type::Numeric {
                base,
                vector_elements,
                matrix_columns,
            } => {
                let (scalar, prefix) = match base {
                    ScalarKind::Float => ("float", ""),
                    ScalarKind::Int => ("int", "i"),
                    ScalarKind::Uint => ("uint", "u"),
                    ScalarKind::Bool => ("bool", "b"),
                };
                match (*matrix_columns, *vector_elements) {
                    (1, 1) => scalar.to_string(),
                    (1, n) => format!("{prefix}vec{n}"),
                    (c, r) if c == r => format!("mat{c}"),
                    (c, r) => format!("mat{c}x{r}"),
                }
            }
            Type::Sampler {
                dim,
                base,
                shadow,
                array,
            } => {
                let prefix = match base {
                    ScalarKind::Int => "i",
                    ScalarKind::Uint => "u",
                    _ => "",
                };
                let dim = match dim {
                    SamplerDim::D1 => "1D",
                    SamplerDim::D2 => "2D",
                    SamplerDim::D3 => "3D",
                    SamplerDim::Cube => "Cube",
                    SamplerDim::Rect => "2DRect",
                    SamplerDim::Buffer => "Buffer",
                    SamplerDim::External => "ExternalOES",
                };
                let array = if *array { "Array" } else { "" };
                let shadow = if *shadow { "Shadow" } else { "" };
                format!("{prefix}sampler{dim}{array}{shadow}")
            }
            Type::Array { element, length } => {
                format!("{}[{length}]", self.display_name(*element))
            }
            Type::Struct { name, .. } | Type::Interface { name, .. } => name.clone(),
        }
    }

    /// Returns the number of interned types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if no types have been interned.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
