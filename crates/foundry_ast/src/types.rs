//! Type references of the source language.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A fixed-width two's-complement integer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IntType {
    /// Width in bits (8, 16, 32 or 64).
    pub bits: u16,
    /// Whether the type is signed.
    pub signed: bool,
}

impl IntType {
    /// `sbyte`.
    pub const I8: IntType = IntType::new(8, true);
    /// `byte`.
    pub const U8: IntType = IntType::new(8, false);
    /// `short`.
    pub const I16: IntType = IntType::new(16, true);
    /// `ushort`.
    pub const U16: IntType = IntType::new(16, false);
    /// `int`.
    pub const I32: IntType = IntType::new(32, true);
    /// `uint`.
    pub const U32: IntType = IntType::new(32, false);
    /// `long`.
    pub const I64: IntType = IntType::new(64, true);
    /// `ulong`.
    pub const U64: IntType = IntType::new(64, false);

    /// Creates an integer type.
    pub const fn new(bits: u16, signed: bool) -> Self {
        Self { bits, signed }
    }

    /// The common type two operands are converted to before a binary operation.
    ///
    /// Same signedness widens to the wider operand. Mixed signedness yields a
    /// signed type wide enough for the unsigned operand, capped at 64 bits.
    pub fn promote(self, other: IntType) -> IntType {
        if self == other {
            return self;
        }
        if self.signed == other.signed {
            return IntType::new(self.bits.max(other.bits), self.signed);
        }
        let (signed, unsigned) = if self.signed {
            (self, other)
        } else {
            (other, self)
        };
        IntType::new(signed.bits.max(unsigned.bits * 2).min(64), true)
    }

    /// Smallest representable value.
    pub fn min_value(self) -> i128 {
        if self.signed {
            -(1i128 << (self.bits - 1))
        } else {
            0
        }
    }

    /// Largest representable value.
    pub fn max_value(self) -> i128 {
        if self.signed {
            (1i128 << (self.bits - 1)) - 1
        } else {
            (1i128 << self.bits) - 1
        }
    }

    /// Wraps an arbitrary value into this type with two's-complement semantics.
    pub fn wrap(self, value: i128) -> i128 {
        let modulus = 1i128 << self.bits;
        let masked = value.rem_euclid(modulus);
        if self.signed && masked > self.max_value() {
            masked - modulus
        } else {
            masked
        }
    }
}

impl fmt::Display for IntType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = if self.signed { 'i' } else { 'u' };
        write!(f, "{prefix}{}", self.bits)
    }
}

/// A reference to a type in a declaration or expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeRef {
    /// No value (`void`).
    Void,
    /// `bool`.
    Bool,
    /// A fixed-width integer.
    Int(IntType),
    /// An array; `rank` > 1 denotes a multi-dimensional array.
    Array {
        /// Element type.
        element: Box<TypeRef>,
        /// Number of dimensions.
        rank: u8,
    },
    /// A user-declared class, struct or interface, by full name.
    Named(String),
    /// A handle to a started task producing a value of the inner type.
    Task(Box<TypeRef>),
    /// The shared memory handle passed to entry points.
    Memory,
}

impl TypeRef {
    /// A one-dimensional array of `element`.
    pub fn array(element: TypeRef) -> Self {
        TypeRef::Array {
            element: Box::new(element),
            rank: 1,
        }
    }

    /// Returns the integer type, if this is an integer.
    pub fn as_int(&self) -> Option<IntType> {
        match self {
            TypeRef::Int(t) => Some(*t),
            _ => None,
        }
    }

    /// Returns `true` for arrays.
    pub fn is_array(&self) -> bool {
        matches!(self, TypeRef::Array { .. })
    }

    /// Returns the element type of an array.
    pub fn element(&self) -> Option<&TypeRef> {
        match self {
            TypeRef::Array { element, .. } => Some(element),
            _ => None,
        }
    }

    /// Collects every user type named anywhere inside this reference.
    pub fn named_types(&self, out: &mut Vec<String>) {
        match self {
            TypeRef::Named(name) => out.push(name.clone()),
            TypeRef::Array { element, .. } | TypeRef::Task(element) => element.named_types(out),
            TypeRef::Void | TypeRef::Bool | TypeRef::Int(_) | TypeRef::Memory => {}
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Void => write!(f, "void"),
            TypeRef::Bool => write!(f, "bool"),
            TypeRef::Int(t) => write!(f, "{t}"),
            TypeRef::Array { element, rank } => {
                write!(f, "{element}[{}]", ",".repeat(rank.saturating_sub(1) as usize))
            }
            TypeRef::Named(name) => write!(f, "{name}"),
            TypeRef::Task(inner) => write!(f, "Task<{inner}>"),
            TypeRef::Memory => write!(f, "Memory"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promote_same_type() {
        assert_eq!(IntType::I32.promote(IntType::I32), IntType::I32);
    }

    #[test]
    fn promote_same_signedness_widens() {
        assert_eq!(IntType::U8.promote(IntType::U32), IntType::U32);
        assert_eq!(IntType::I64.promote(IntType::I16), IntType::I64);
    }

    #[test]
    fn promote_mixed_signedness() {
        assert_eq!(IntType::I32.promote(IntType::U32), IntType::I64);
        assert_eq!(IntType::U8.promote(IntType::I32), IntType::I32);
        assert_eq!(IntType::U64.promote(IntType::I64), IntType::I64);
    }

    #[test]
    fn wrap_two_complement() {
        assert_eq!(IntType::U8.wrap(256), 0);
        assert_eq!(IntType::U8.wrap(-1), 255);
        assert_eq!(IntType::I8.wrap(128), -128);
        assert_eq!(IntType::I32.wrap(i128::from(i32::MAX) + 1), i128::from(i32::MIN));
        assert_eq!(IntType::U64.wrap(-1), i128::from(u64::MAX));
    }

    #[test]
    fn ranges() {
        assert_eq!(IntType::I8.min_value(), -128);
        assert_eq!(IntType::U16.max_value(), 65_535);
    }

    #[test]
    fn display() {
        assert_eq!(TypeRef::array(TypeRef::Int(IntType::U32)).to_string(), "u32[]");
        assert_eq!(
            TypeRef::Array {
                element: Box::new(TypeRef::Bool),
                rank: 2
            }
            .to_string(),
            "bool[,]"
        );
        assert_eq!(TypeRef::Task(Box::new(TypeRef::Bool)).to_string(), "Task<bool>");
    }

    #[test]
    fn named_types_are_collected() {
        let mut out = Vec::new();
        TypeRef::array(TypeRef::Named("Ns.Point".to_string())).named_types(&mut out);
        assert_eq!(out, vec!["Ns.Point"]);
    }
}
