//! IR type system
//!
//! Types have value semantics and are compared structurally; there is no
//! uniquing context. The module owns everything built inside it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// IR Type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    /// Void type (function returns only)
    Void,

    /// Integer types with bit width
    I1,  // Boolean
    I8,
    I16,
    I32,
    I64,

    /// Pointer type
    Ptr(Box<Type>),

    /// Function type
    Function {
        return_type: Box<Type>,
        param_types: Vec<Type>,
    },
}

impl Type {
    /// Check if this is an integer type
    pub fn is_integer(&self) -> bool {
        matches!(self, Type::I1 | Type::I8 | Type::I16 | Type::I32 | Type::I64)
    }

    /// Check if this is a pointer type
    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Ptr(_))
    }

    /// Get the bit width of integer types
    pub fn bit_width(&self) -> Option<u32> {
        match self {
            Type::I1 => Some(1),
            Type::I8 => Some(8),
            Type::I16 => Some(16),
            Type::I32 => Some(32),
            Type::I64 => Some(64),
            _ => None,
        }
    }

    /// Get the element type for pointers
    pub fn pointee(&self) -> Option<&Type> {
        match self {
            Type::Ptr(elem) => Some(elem),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::I1 => write!(f, "i1"),
            Type::I8 => write!(f, "i8"),
            Type::I16 => write!(f, "i16"),
            Type::I32 => write!(f, "i32"),
            Type::I64 => write!(f, "i64"),
            Type::Ptr(target) => write!(f, "{}*", target),
            Type::Function {
                return_type,
                param_types,
            } => {
                write!(f, "{} (", return_type)?;
                for (i, param) in param_types.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", param)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_widths() {
        assert_eq!(Type::I1.bit_width(), Some(1));
        assert_eq!(Type::I32.bit_width(), Some(32));
        assert_eq!(Type::Void.bit_width(), None);
        assert_eq!(Type::Ptr(Box::new(Type::I32)).bit_width(), None);
    }

    #[test]
    fn test_predicates() {
        assert!(Type::I32.is_integer());
        assert!(!Type::Void.is_integer());
        assert!(Type::Ptr(Box::new(Type::I8)).is_pointer());
        assert_eq!(
            Type::Ptr(Box::new(Type::I16)).pointee(),
            Some(&Type::I16)
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Type::I32), "i32");
        assert_eq!(format!("{}", Type::Ptr(Box::new(Type::I32))), "i32*");
        let func = Type::Function {
            return_type: Box::new(Type::I32),
            param_types: vec![Type::I32, Type::I8],
        };
        assert_eq!(format!("{}", func), "i32 (i32, i8)");
    }
}
