//! Rvalue trees: expressions, swizzles, texture lookups, and dereferences.
//!
//! Every dereference of a variable is a [`VariableId`] into the owning
//! shader's arena, so two uses of one variable share identity by value.

use crate::constant::Constant;
use crate::ids::{TypeId, VariableId};

wire_enum! {
    /// Operation performed by an [`Expression`].
    ///
    /// Codes `0..32` are unary, `32..64` binary, `64..` ternary.
    pub enum ExprOp: u32 {
        /// Bitwise complement (`~`).
        BitNot = 0,
        /// Logical not (`!`).
        LogicNot = 1,
        /// Arithmetic negation.
        Neg = 2,
        /// Absolute value.
        Abs = 3,
        /// Sign.
        Sign = 4,
        /// Reciprocal.
        Rcp = 5,
        /// Reciprocal square root.
        Rsq = 6,
        /// Square root.
        Sqrt = 7,
        /// Natural exponent.
        Exp = 8,
        /// Natural log.
        Log = 9,
        /// Base-2 exponent.
        Exp2 = 10,
        /// Base-2 log.
        Log2 = 11,
        /// Float to int.
        F2i = 12,
        /// Int to float.
        I2f = 13,
        /// Float to bool.
        F2b = 14,
        /// Bool to float.
        B2f = 15,
        /// Int to bool.
        I2b = 16,
        /// Bool to int.
        B2i = 17,
        /// Truncate toward zero.
        Trunc = 18,
        /// Round up.
        Ceil = 19,
        /// Round down.
        Floor = 20,
        /// Fractional part.
        Fract = 21,
        /// Sine.
        Sin = 22,
        /// Cosine.
        Cos = 23,
        /// Screen-space x derivative.
        Dfdx = 24,
        /// Screen-space y derivative.
        Dfdy = 25,
        /// True if any component is true.
        Any = 26,
        /// Addition.
        Add = 32,
        /// Subtraction.
        Sub = 33,
        /// Multiplication (component-wise or matrix product).
        Mul = 34,
        /// Division.
        Div = 35,
        /// Modulus.
        Mod = 36,
        /// Component-wise `<`.
        Less = 37,
        /// Component-wise `>`.
        Greater = 38,
        /// Component-wise `<=`.
        LessEqual = 39,
        /// Component-wise `>=`.
        GreaterEqual = 40,
        /// Component-wise `==`.
        Equal = 41,
        /// Component-wise `!=`.
        NotEqual = 42,
        /// Whole-value `==`.
        AllEqual = 43,
        /// Whole-value `!=`.
        AnyNotEqual = 44,
        /// Left shift.
        Lshift = 45,
        /// Right shift.
        Rshift = 46,
        /// Bitwise and.
        BitAnd = 47,
        /// Bitwise xor.
        BitXor = 48,
        /// Bitwise or.
        BitOr = 49,
        /// Logical and.
        LogicAnd = 50,
        /// Logical xor.
        LogicXor = 51,
        /// Logical or.
        LogicOr = 52,
        /// Dot product.
        Dot = 53,
        /// Component-wise minimum.
        Min = 54,
        /// Component-wise maximum.
        Max = 55,
        /// Power.
        Pow = 56,
        /// Linear interpolation.
        Lrp = 64,
        /// Conditional select.
        Csel = 65,
    }
}

impl ExprOp {
    /// Number of operands the operation takes.
    pub fn arity(self) -> usize {
        match self.code() {
            0..=31 => 1,
            32..=63 => 2,
            _ => 3,
        }
    }

    /// Lower-case mnemonic used by the IR printer.
    pub fn mnemonic(self) -> &'static str {
        match self {
            ExprOp::BitNot => "~",
            ExprOp::LogicNot => "!",
            ExprOp::Neg => "neg",
            ExprOp::Abs => "abs",
            ExprOp::Sign => "sign",
            ExprOp::Rcp => "rcp",
            ExprOp::Rsq => "rsq",
            ExprOp::Sqrt => "sqrt",
            ExprOp::Exp => "exp",
            ExprOp::Log => "log",
            ExprOp::Exp2 => "exp2",
            ExprOp::Log2 => "log2",
            ExprOp::F2i => "f2i",
            ExprOp::I2f => "i2f",
            ExprOp::F2b => "f2b",
            ExprOp::B2f => "b2f",
            ExprOp::I2b => "i2b",
            ExprOp::B2i => "b2i",
            ExprOp::Trunc => "trunc",
            ExprOp::Ceil => "ceil",
            ExprOp::Floor => "floor",
            ExprOp::Fract => "fract",
            ExprOp::Sin => "sin",
            ExprOp::Cos => "cos",
            ExprOp::Dfdx => "dFdx",
            ExprOp::Dfdy => "dFdy",
            ExprOp::Any => "any",
            ExprOp::Add => "+",
            ExprOp::Sub => "-",
            ExprOp::Mul => "*",
            ExprOp::Div => "/",
            ExprOp::Mod => "%",
            ExprOp::Less => "<",
            ExprOp::Greater => ">",
            ExprOp::LessEqual => "<=",
            ExprOp::GreaterEqual => ">=",
            ExprOp::Equal => "==",
            ExprOp::NotEqual => "!=",
            ExprOp::AllEqual => "all_equal",
            ExprOp::AnyNotEqual => "any_nequal",
            ExprOp::Lshift => "<<",
            ExprOp::Rshift => ">>",
            ExprOp::BitAnd => "&",
            ExprOp::BitXor => "^",
            ExprOp::BitOr => "|",
            ExprOp::LogicAnd => "&&",
            ExprOp::LogicXor => "^^",
            ExprOp::LogicOr => "||",
            ExprOp::Dot => "dot",
            ExprOp::Min => "min",
            ExprOp::Max => "max",
            ExprOp::Pow => "pow",
            ExprOp::Lrp => "lrp",
            ExprOp::Csel => "csel",
        }
    }
}

wire_enum! {
    /// Texture instruction opcode.
    pub enum TextureOp: u8 {
        /// Regular sample.
        Tex = 0,
        /// Sample with LOD bias.
        Txb = 1,
        /// Sample at explicit LOD.
        Txl = 2,
        /// Sample with explicit gradients.
        Txd = 3,
        /// Texel fetch.
        Txf = 4,
        /// Texture size query.
        Txs = 5,
        /// LOD query.
        Lod = 6,
        /// Gather.
        Tg4 = 7,
    }
}

impl TextureOp {
    /// Lower-case mnemonic used by the IR printer.
    pub fn mnemonic(self) -> &'static str {
        match self {
            TextureOp::Tex => "tex",
            TextureOp::Txb => "txb",
            TextureOp::Txl => "txl",
            TextureOp::Txd => "txd",
            TextureOp::Txf => "txf",
            TextureOp::Txs => "txs",
            TextureOp::Lod => "lod",
            TextureOp::Tg4 => "tg4",
        }
    }
}

wire_enum! {
    /// Discriminant of [`LodInfo`] as stored on disk.
    pub enum LodKind: u8 {
        /// No level-of-detail operand.
        None = 0,
        /// LOD bias.
        Bias = 1,
        /// Explicit LOD.
        Lod = 2,
        /// Explicit gradients.
        Grad = 3,
        /// Multisample index.
        SampleIndex = 4,
        /// Gather component.
        Component = 5,
    }
}

/// Level-of-detail operands of a [`Texture`] lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum LodInfo {
    /// No LOD operand.
    None,
    /// Bias added to the computed LOD.
    Bias(Box<Rvalue>),
    /// Explicit LOD.
    Lod(Box<Rvalue>),
    /// Explicit partial derivatives.
    Grad {
        /// d(coord)/dx.
        dpdx: Box<Rvalue>,
        /// d(coord)/dy.
        dpdy: Box<Rvalue>,
    },
    /// Sample index for multisample fetches.
    SampleIndex(Box<Rvalue>),
    /// Component selector for gathers.
    Component(Box<Rvalue>),
}

impl LodInfo {
    /// Returns the on-disk discriminant.
    pub fn kind(&self) -> LodKind {
        match self {
            LodInfo::None => LodKind::None,
            LodInfo::Bias(_) => LodKind::Bias,
            LodInfo::Lod(_) => LodKind::Lod,
            LodInfo::Grad { .. } => LodKind::Grad,
            LodInfo::SampleIndex(_) => LodKind::SampleIndex,
            LodInfo::Component(_) => LodKind::Component,
        }
    }

    /// Returns the operands in storage order.
    pub fn operands(&self) -> Vec<&Rvalue> {
        match self {
            LodInfo::None => Vec::new(),
            LodInfo::Bias(v)
            | LodInfo::Lod(v)
            | LodInfo::SampleIndex(v)
            | LodInfo::Component(v) => vec![&**v],
            LodInfo::Grad { dpdx, dpdy } => vec![&**dpdx, &**dpdy],
        }
    }
}

/// An n-ary operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    /// Result type.
    pub ty: TypeId,
    /// The operation.
    pub op: ExprOp,
    /// Operands; the count matches [`ExprOp::arity`] in a well-formed tree.
    pub operands: Vec<Rvalue>,
}

/// Component selection (`v.xzy`).
#[derive(Debug, Clone, PartialEq)]
pub struct Swizzle {
    /// The swizzled value.
    pub value: Box<Rvalue>,
    /// Source component index per output component; only `count` are used.
    pub components: [u8; 4],
    /// Number of output components (1 to 4).
    pub count: u8,
}

impl Swizzle {
    /// Returns the swizzle as a GLSL mask (`xzy`).
    pub fn mask(&self) -> String {
        self.components[..usize::from(self.count.min(4))]
            .iter()
            .map(|c| match c {
                0 => 'x',
                1 => 'y',
                2 => 'z',
                3 => 'w',
                _ => '?',
            })
            .collect()
    }
}

/// A texture lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    /// Texture opcode.
    pub op: TextureOp,
    /// Result type.
    pub ty: TypeId,
    /// Sampler dereference.
    pub sampler: Box<Rvalue>,
    /// Texture coordinate (absent for size queries).
    pub coordinate: Option<Box<Rvalue>>,
    /// Projective divisor.
    pub projector: Option<Box<Rvalue>>,
    /// Depth reference for shadow samplers.
    pub shadow_comparator: Option<Box<Rvalue>>,
    /// Constant texel offset.
    pub offset: Option<Box<Rvalue>>,
    /// Level-of-detail operands.
    pub lod: LodInfo,
}

/// A value-producing IR node.
#[derive(Debug, Clone, PartialEq)]
pub enum Rvalue {
    /// A literal.
    Constant(Constant),
    /// An operation on other rvalues.
    Expression(Expression),
    /// Component selection.
    Swizzle(Swizzle),
    /// A texture lookup.
    Texture(Box<Texture>),
    /// A whole variable.
    DerefVariable(VariableId),
    /// An array element.
    DerefArray {
        /// The array being indexed.
        array: Box<Rvalue>,
        /// The element index.
        index: Box<Rvalue>,
    },
    /// A struct member.
    DerefRecord {
        /// The struct value.
        record: Box<Rvalue>,
        /// Field name.
        field: String,
    },
}

impl Rvalue {
    /// Dereference of `var`.
    pub fn var(var: VariableId) -> Self {
        Rvalue::DerefVariable(var)
    }

    /// Returns `true` for the three dereference forms (valid assignment targets).
    pub fn is_dereference(&self) -> bool {
        matches!(
            self,
            Rvalue::DerefVariable(_) | Rvalue::DerefArray { .. } | Rvalue::DerefRecord { .. }
        )
    }

    /// The variable at the root of a dereference chain, if any.
    pub fn root_variable(&self) -> Option<VariableId> {
        match self {
            Rvalue::DerefVariable(var) => Some(*var),
            Rvalue::DerefArray { array, .. } => array.root_variable(),
            Rvalue::DerefRecord { record, .. } => record.root_variable(),
            Rvalue::Swizzle(swizzle) => swizzle.value.root_variable(),
            _ => None,
        }
    }

    /// Direct child rvalues in storage order.
    pub fn children(&self) -> Vec<&Rvalue> {
        match self {
            Rvalue::Constant(_) | Rvalue::DerefVariable(_) => Vec::new(),
            Rvalue::Expression(expr) => expr.operands.iter().collect(),
            Rvalue::Swizzle(swizzle) => vec![&*swizzle.value],
            Rvalue::Texture(tex) => {
                let mut out = vec![&*tex.sampler];
                out.extend(
                    [
                        &tex.coordinate,
                        &tex.projector,
                        &tex.shadow_comparator,
                        &tex.offset,
                    ]
                    .into_iter()
                    .flatten()
                    .map(|v| &**v),
                );
                out.extend(tex.lod.operands());
                out
            }
            Rvalue::DerefArray { array, index } => vec![&**array, &**index],
            Rvalue::DerefRecord { record, .. } => vec![&**record],
        }
    }
}
