//! Constant values of hardware data types.

use crate::types::DataType;
use serde::{Deserialize, Serialize};

/// A value of a [`DataType`].
///
/// Integer values are kept in range for their width: construct them with
/// [`Value::int`], which wraps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    /// A boolean or single-wire value.
    Bool(bool),
    /// An integer vector value.
    Int {
        /// The numeric value.
        value: i128,
        /// Width in bits.
        width: u16,
        /// Whether the vector is signed.
        signed: bool,
    },
    /// An enumeration variant, by name.
    Enum(String),
    /// Array elements in index order.
    Array(Vec<Value>),
    /// Record fields in declaration order.
    Record(Vec<(String, Value)>),
}

impl Value {
    /// An integer value wrapped into `width` bits.
    pub fn int(value: i128, width: u16, signed: bool) -> Self {
        Value::Int {
            value: wrap(value, width, signed),
            width,
            signed,
        }
    }

    /// The reset value of a type: zero, `false`, the first variant, or an
    /// aggregate of those.
    pub fn default_for(ty: &DataType) -> Self {
        match ty {
            DataType::StdLogic | DataType::Boolean => Value::Bool(false),
            DataType::Unsigned(w) => Value::int(0, *w, false),
            DataType::Signed(w) => Value::int(0, *w, true),
            DataType::Array {
                element, length, ..
            } => Value::Array(vec![Value::default_for(element); *length as usize]),
            DataType::Record { fields, .. } => Value::Record(
                fields
                    .iter()
                    .map(|(name, ty)| (name.clone(), Value::default_for(ty)))
                    .collect(),
            ),
            DataType::Enum { variants, .. } => {
                Value::Enum(variants.first().cloned().unwrap_or_default())
            }
        }
    }

    /// The integer value, if this is an integer.
    pub fn as_int(&self) -> Option<i128> {
        match self {
            Value::Int { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// The boolean value, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// An array element.
    pub fn element(&self, index: usize) -> Option<&Value> {
        match self {
            Value::Array(items) => items.get(index),
            _ => None,
        }
    }

    /// A mutable array element.
    pub fn element_mut(&mut self, index: usize) -> Option<&mut Value> {
        match self {
            Value::Array(items) => items.get_mut(index),
            _ => None,
        }
    }

    /// A record field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Record(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// A mutable record field.
    pub fn field_mut(&mut self, name: &str) -> Option<&mut Value> {
        match self {
            Value::Record(fields) => fields
                .iter_mut()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v),
            _ => None,
        }
    }
}

/// Wraps `value` into a two's-complement vector of `width` bits.
pub fn wrap(value: i128, width: u16, signed: bool) -> i128 {
    if width >= 128 {
        return value;
    }
    let modulus = 1i128 << width;
    let masked = value.rem_euclid(modulus);
    if signed && masked >= modulus / 2 {
        masked - modulus
    } else {
        masked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_values_wrap() {
        assert_eq!(Value::int(300, 8, false).as_int(), Some(44));
        assert_eq!(Value::int(200, 8, true).as_int(), Some(-56));
        assert_eq!(Value::int(-1, 16, false).as_int(), Some(65_535));
    }

    #[test]
    fn defaults_follow_type_shape() {
        let ty = DataType::Record {
            name: "R".into(),
            fields: vec![
                ("flag".into(), DataType::Boolean),
                ("data".into(), DataType::array(DataType::Unsigned(8), 2)),
            ],
        };
        let value = Value::default_for(&ty);
        assert_eq!(value.field("flag"), Some(&Value::Bool(false)));
        assert_eq!(
            value.field("data").and_then(|d| d.element(1)),
            Some(&Value::int(0, 8, false))
        );
    }

    #[test]
    fn enum_default_is_first_variant() {
        let ty = DataType::Enum {
            name: "S".into(),
            variants: vec!["S0".into(), "S1".into()],
        };
        assert_eq!(Value::default_for(&ty), Value::Enum("S0".into()));
    }

    #[test]
    fn nested_mutation() {
        let mut v = Value::Array(vec![Value::int(0, 8, false); 3]);
        *v.element_mut(2).unwrap() = Value::int(7, 8, false);
        assert_eq!(v.element(2).and_then(Value::as_int), Some(7));
    }
}
