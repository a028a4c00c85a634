//! Type AST nodes

use serde::{Deserialize, Serialize};

/// Declared type of a variable, parameter or function result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Type {
    /// 64-bit signed integer (`int`)
    Int,
    /// 64-bit floating point (`float`)
    Float,
    /// No value; only valid as a function return type
    Void,
    /// Single-level pointer (`T*`)
    Pointer(Box<Type>),
    /// Fixed-size array (`T[N]`)
    Array(Box<Type>, usize),
}

impl Type {
    pub fn pointer_to(inner: Type) -> Self {
        Type::Pointer(Box::new(inner))
    }

    pub fn array_of(element: Type, len: usize) -> Self {
        Type::Array(Box::new(element), len)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array(..))
    }

    /// Number of sub-values held by a variable of this type (1 for scalars)
    pub fn length(&self) -> usize {
        match self {
            Type::Array(_, len) => *len,
            _ => 1,
        }
    }

    /// Type reached by one dereference or one index step
    pub fn pointee(&self) -> Option<&Type> {
        match self {
            Type::Pointer(inner) | Type::Array(inner, _) => Some(inner),
            _ => None,
        }
    }

    /// Array types decay to pointers when passed as parameters
    pub fn decayed(&self) -> Type {
        match self {
            Type::Array(element, _) => Type::Pointer(element.clone()),
            other => other.clone(),
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Float => write!(f, "float"),
            Type::Void => write!(f, "void"),
            Type::Pointer(inner) => write!(f, "{inner}*"),
            Type::Array(element, len) => write!(f, "{element}[{len}]"),
        }
    }
}
