//! The builtin function table consulted when importing builtin signatures.
//!
//! The cache never trusts an encoded builtin body: it looks the signature up
//! by name and argument types and imports the table's canonical version.
//! Types here are self-contained (scalars, vectors, matrices, samplers), so
//! a table does not need access to any shader's [`TypeDb`](crate::TypeDb).

use crate::types::{SamplerDim, ScalarKind, Type};
use crate::variable::VariableMode;

/// One formal parameter of a builtin overload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinParam {
    /// Parameter name.
    pub name: String,
    /// Parameter type.
    pub ty: Type,
    /// Parameter direction.
    pub mode: VariableMode,
}

/// A builtin overload as provided by a [`BuiltinTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinSignature {
    /// Return type.
    pub return_type: Type,
    /// Formal parameters, in order.
    pub parameters: Vec<BuiltinParam>,
}

/// Resolves builtin overloads by name and exact argument types.
pub trait BuiltinTable {
    /// Returns the overload of `name` whose parameter types equal `args`.
    fn find(&self, name: &str, args: &[Type]) -> Option<BuiltinSignature>;
}

/// A table covering the common GLSL ES 1.00 / GLSL 1.30 builtins.
///
/// Enough for tooling and tests; a driver front end supplies its own table.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardBuiltins;

const UNARY_GENTYPE: &[&str] = &[
    "radians",
    "degrees",
    "sin",
    "cos",
    "tan",
    "asin",
    "acos",
    "exp",
    "log",
    "exp2",
    "log2",
    "sqrt",
    "inversesqrt",
    "abs",
    "sign",
    "floor",
    "ceil",
    "fract",
    "normalize",
    "dFdx",
    "dFdy",
    "fwidth",
];

const BINARY_GENTYPE: &[&str] = &["pow", "atan", "step", "reflect"];

/// Functions that also accept a scalar float as their last argument(s).
const SCALAR_TAIL: &[&str] = &["mod", "min", "max"];

fn float_vector_size(ty: &Type) -> Option<u8> {
    match ty {
        Type::Numeric {
            base: ScalarKind::Float,
            vector_elements: n @ 1..=4,
            matrix_columns: 1,
        } => Some(*n),
        _ => None,
    }
}

fn params(args: &[Type], names: &[&str]) -> Vec<BuiltinParam> {
    args.iter()
        .zip(names)
        .map(|(ty, name)| BuiltinParam {
            name: (*name).to_string(),
            ty: ty.clone(),
            mode: VariableMode::FunctionIn,
        })
        .collect()
}

fn overload(return_type: Type, args: &[Type], names: &[&str]) -> BuiltinSignature {
    BuiltinSignature {
        return_type,
        parameters: params(args, names),
    }
}

impl StandardBuiltins {
    fn find_math(name: &str, args: &[Type]) -> Option<BuiltinSignature> {
        let n = float_vector_size(args.first()?)?;
        let gen = Type::vec(n);
        let float = Type::float();
        let all_gen = args.iter().all(|a| *a == gen);

        match (name, args.len()) {
            (name, 1) if UNARY_GENTYPE.contains(&name) => Some(overload(gen, args, &["x"])),
            ("length", 1) => Some(overload(float, args, &["x"])),
            (name, 2) if BINARY_GENTYPE.contains(&name) && all_gen => {
                Some(overload(gen, args, &["x", "y"]))
            }
            (name, 2) if SCALAR_TAIL.contains(&name) && (all_gen || args[1] == float) => {
                Some(overload(gen, args, &["x", "y"]))
            }
            ("distance" | "dot", 2) if all_gen => Some(overload(float, args, &["x", "y"])),
            ("cross", 2) if n == 3 && all_gen => Some(overload(gen, args, &["x", "y"])),
            ("clamp", 3) if all_gen || (args[1] == float && args[2] == float) => {
                Some(overload(gen, args, &["x", "minVal", "maxVal"]))
            }
            ("mix", 3) if args[1] == gen && (args[2] == gen || args[2] == float) => {
                Some(overload(gen, args, &["x", "y", "a"]))
            }
            ("smoothstep", 3) if all_gen || (args[0] == float && args[1] == float) => {
                let ret = args[2].clone();
                float_vector_size(&ret)?;
                Some(overload(ret, args, &["edge0", "edge1", "x"]))
            }
            _ => None,
        }
    }

    fn find_texture(name: &str, args: &[Type]) -> Option<BuiltinSignature> {
        let (dim, coord) = match args.first()? {
            Type::Sampler {
                dim,
                base: ScalarKind::Float,
                shadow: false,
                array: false,
            } => (*dim, float_vector_size(args.get(1)?)?),
            _ => return None,
        };
        let bias_ok = match args.get(2) {
            None => true,
            Some(bias) => *bias == Type::float() && args.len() == 3,
        };
        if !bias_ok {
            return None;
        }
        let matches = match name {
            "texture2D" => dim == SamplerDim::D2 && coord == 2,
            "texture2DProj" => dim == SamplerDim::D2 && (coord == 3 || coord == 4),
            "textureCube" => dim == SamplerDim::Cube && coord == 3,
            "texture" => match dim {
                SamplerDim::D1 => coord == 1,
                SamplerDim::D2 | SamplerDim::Rect | SamplerDim::External => coord == 2,
                SamplerDim::D3 | SamplerDim::Cube => coord == 3,
                SamplerDim::Buffer => false,
            },
            _ => false,
        };
        matches.then(|| overload(Type::vec(4), args, &["sampler", "coord", "bias"]))
    }
}

impl BuiltinTable for StandardBuiltins {
    fn find(&self, name: &str, args: &[Type]) -> Option<BuiltinSignature> {
        if name.starts_with("texture") {
            Self::find_texture(name, args)
        } else {
            Self::find_math(name, args)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unary_gentype() {
        let sig = StandardBuiltins.find("normalize", &[Type::vec(3)]).unwrap();
        assert_eq!(sig.return_type, Type::vec(3));
        assert_eq!(sig.parameters.len(), 1);
        assert_eq!(sig.parameters[0].mode, VariableMode::FunctionIn);
    }

    #[test]
    fn dot_returns_scalar() {
        let sig = StandardBuiltins
            .find("dot", &[Type::vec(4), Type::vec(4)])
            .unwrap();
        assert_eq!(sig.return_type, Type::float());
        assert!(StandardBuiltins
            .find("dot", &[Type::vec(4), Type::vec(3)])
            .is_none());
    }

    #[test]
    fn scalar_tail_overloads() {
        assert!(StandardBuiltins
            .find("max", &[Type::vec(2), Type::float()])
            .is_some());
        assert!(StandardBuiltins
            .find("clamp", &[Type::vec(3), Type::float(), Type::float()])
            .is_some());
        assert!(StandardBuiltins
            .find("mix", &[Type::vec(3), Type::vec(3), Type::float()])
            .is_some());
    }

    #[test]
    fn texture_lookups() {
        let s2d = Type::sampler(SamplerDim::D2);
        let cube = Type::sampler(SamplerDim::Cube);
        let sig = StandardBuiltins
            .find("texture2D", &[s2d.clone(), Type::vec(2)])
            .unwrap();
        assert_eq!(sig.return_type, Type::vec(4));
        assert_eq!(sig.parameters[0].name, "sampler");
        assert!(StandardBuiltins
            .find("texture2D", &[s2d.clone(), Type::vec(2), Type::float()])
            .is_some());
        assert!(StandardBuiltins
            .find("textureCube", &[cube, Type::vec(3)])
            .is_some());
        assert!(StandardBuiltins
            .find("textureCube", &[s2d, Type::vec(3)])
            .is_none());
    }

    #[test]
    fn unknown_or_mistyped() {
        assert!(StandardBuiltins.find("frobnicate", &[Type::float()]).is_none());
        assert!(StandardBuiltins.find("sin", &[Type::int()]).is_none());
        assert!(StandardBuiltins.find("sin", &[]).is_none());
    }
}
