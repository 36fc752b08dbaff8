//! Constant values embedded in the IR.

use crate::ids::TypeId;

/// The payload of a [`Constant`], shaped by its type.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    /// Scalar, vector, or matrix components as raw 32-bit words
    /// (`f32` bits for floats, two's complement for ints, 0/1 for bools).
    Components(Vec<u32>),
    /// One constant per array element.
    Array(Vec<Constant>),
    /// One constant per struct field, in declaration order.
    Struct(Vec<Constant>),
}

/// A typed constant.
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    /// The constant's type.
    pub ty: TypeId,
    /// The constant's value.
    pub value: ConstantValue,
}

impl Constant {
    /// A float scalar or vector constant.
    pub fn floats(ty: TypeId, values: &[f32]) -> Self {
        Self {
            ty,
            value: ConstantValue::Components(values.iter().map(|v| v.to_bits()).collect()),
        }
    }

    /// An int scalar or vector constant.
    pub fn ints(ty: TypeId, values: &[i32]) -> Self {
        Self {
            ty,
            value: ConstantValue::Components(values.iter().map(|&v| v as u32).collect()),
        }
    }

    /// A bool scalar or vector constant.
    pub fn bools(ty: TypeId, values: &[bool]) -> Self {
        Self {
            ty,
            value: ConstantValue::Components(values.iter().map(|&v| u32::from(v)).collect()),
        }
    }

    /// Returns component `i` interpreted as a float.
    pub fn float_at(&self, i: usize) -> Option<f32> {
        match &self.value {
            ConstantValue::Components(words) => words.get(i).map(|w| f32::from_bits(*w)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_constant_bits() {
        let c = Constant::floats(TypeId::from_raw(0), &[1.0, -2.5]);
        assert_eq!(c.float_at(0), Some(1.0));
        assert_eq!(c.float_at(1), Some(-2.5));
        assert_eq!(c.float_at(2), None);
    }

    #[test]
    fn int_and_bool_words() {
        let i = Constant::ints(TypeId::from_raw(0), &[-1]);
        assert_eq!(i.value, ConstantValue::Components(vec![u32::MAX]));
        let b = Constant::bools(TypeId::from_raw(1), &[true, false]);
        assert_eq!(b.value, ConstantValue::Components(vec![1, 0]));
    }

    #[test]
    fn aggregate_has_no_float_view() {
        let inner = Constant::floats(TypeId::from_raw(0), &[0.5]);
        let arr = Constant {
            ty: TypeId::from_raw(1),
            value: ConstantValue::Array(vec![inner]),
        };
        assert_eq!(arr.float_at(0), None);
    }
}
