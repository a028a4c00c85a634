//! Runtime values and the arithmetic shared by the evaluator and the folder

use super::error::{InterpResult, RuntimeError};
use super::store::Address;
use crate::ast::{BinOp, Literal, Type, UnOp};
use std::fmt;

/// Runtime value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// 64-bit integer
    Int(i64),
    /// 64-bit floating point
    Float(f64),
    /// Result of a comparison
    Bool(bool),
    /// Address of a cell in the value store
    Pointer(Address),
    /// Whole array; `None` marks an element that was never assigned
    Array(Vec<Option<Value>>),
}

impl Value {
    /// Get type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Pointer(_) => "pointer",
            Value::Array(_) => "array",
        }
    }

    /// Integer view; booleans count as 0/1
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Try to convert to f64
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            Value::Int(n) => Some(*n as f64),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_pointer(&self) -> Option<Address> {
        match self {
            Value::Pointer(addr) => Some(*addr),
            _ => None,
        }
    }

    pub fn to_literal(&self) -> Option<Literal> {
        match self {
            Value::Int(n) => Some(Literal::Int(*n)),
            Value::Float(x) => Some(Literal::Float(*x)),
            Value::Bool(b) => Some(Literal::Bool(*b)),
            Value::Pointer(_) | Value::Array(_) => None,
        }
    }

    /// Convert to the declared type before storing: int truncates, float widens.
    pub fn coerce_to(self, ty: &Type) -> InterpResult<Value> {
        match (ty, self) {
            (Type::Int, Value::Float(x)) => Ok(Value::Int(x.trunc() as i64)),
            (Type::Int, v @ (Value::Int(_) | Value::Bool(_))) => {
                Ok(Value::Int(v.as_int().unwrap_or_default()))
            }
            (Type::Float, v @ (Value::Int(_) | Value::Float(_) | Value::Bool(_))) => {
                Ok(Value::Float(v.as_float().unwrap_or_default()))
            }
            (Type::Pointer(_), v @ Value::Pointer(_)) => Ok(v),
            (Type::Array(_, len), Value::Array(items)) if items.len() == *len => {
                Ok(Value::Array(items))
            }
            (ty, v) => Err(RuntimeError::type_error(&ty.to_string(), v.type_name())),
        }
    }
}

impl From<Literal> for Value {
    fn from(lit: Literal) -> Self {
        match lit {
            Literal::Int(n) => Value::Int(n),
            Literal::Float(x) => Value::Float(x),
            Literal::Bool(b) => Value::Bool(b),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Pointer(addr) => write!(f, "{addr}"),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match item {
                        Some(v) => write!(f, "{v}")?,
                        None => write!(f, "N/A")?,
                    }
                }
                write!(f, "]")
            }
        }
    }
}

/// Apply a binary operator. Two integers stay integral (division truncates);
/// any float operand promotes the operation to floating point.
pub fn binary_op(op: BinOp, lhs: &Value, rhs: &Value) -> InterpResult<Value> {
    if let (Value::Pointer(a), Value::Pointer(b)) = (lhs, rhs) {
        return match op {
            BinOp::Eq => Ok(Value::Bool(a == b)),
            BinOp::Ne => Ok(Value::Bool(a != b)),
            _ => Err(RuntimeError::type_error("number", "pointer")),
        };
    }

    if let (Some(a), Some(b)) = (lhs.as_int(), rhs.as_int()) {
        return int_op(op, a, b);
    }

    match (lhs.as_float(), rhs.as_float()) {
        (Some(a), Some(b)) => Ok(float_op(op, a, b)),
        (None, _) => Err(RuntimeError::type_error("number", lhs.type_name())),
        (_, None) => Err(RuntimeError::type_error("number", rhs.type_name())),
    }
}

fn int_op(op: BinOp, a: i64, b: i64) -> InterpResult<Value> {
    let value = match op {
        BinOp::Add => Value::Int(a.wrapping_add(b)),
        BinOp::Sub => Value::Int(a.wrapping_sub(b)),
        BinOp::Mul => Value::Int(a.wrapping_mul(b)),
        BinOp::Div if b == 0 => return Err(RuntimeError::division_by_zero()),
        BinOp::Div => Value::Int(a.wrapping_div(b)),
        BinOp::Mod if b == 0 => return Err(RuntimeError::division_by_zero()),
        BinOp::Mod => Value::Int(a.wrapping_rem(b)),
        BinOp::Lt => Value::Bool(a < b),
        BinOp::Gt => Value::Bool(a > b),
        BinOp::Le => Value::Bool(a <= b),
        BinOp::Ge => Value::Bool(a >= b),
        BinOp::Eq => Value::Bool(a == b),
        BinOp::Ne => Value::Bool(a != b),
    };
    Ok(value)
}

fn float_op(op: BinOp, a: f64, b: f64) -> Value {
    match op {
        BinOp::Add => Value::Float(a + b),
        BinOp::Sub => Value::Float(a - b),
        BinOp::Mul => Value::Float(a * b),
        BinOp::Div => Value::Float(a / b),
        BinOp::Mod => Value::Float(a % b),
        BinOp::Lt => Value::Bool(a < b),
        BinOp::Gt => Value::Bool(a > b),
        BinOp::Le => Value::Bool(a <= b),
        BinOp::Ge => Value::Bool(a >= b),
        BinOp::Eq => Value::Bool(a == b),
        BinOp::Ne => Value::Bool(a != b),
    }
}

/// Apply a pure unary operator (`-` or `+`). Operators that touch the store
/// are handled by the evaluator.
pub fn unary_op(op: UnOp, operand: &Value) -> InterpResult<Value> {
    match (op, operand) {
        (UnOp::Neg, Value::Float(x)) => Ok(Value::Float(-x)),
        (UnOp::Neg, v) => match v.as_int() {
            Some(n) => Ok(Value::Int(n.wrapping_neg())),
            None => Err(RuntimeError::type_error("number", v.type_name())),
        },
        (UnOp::Plus, Value::Float(x)) => Ok(Value::Float(*x)),
        (UnOp::Plus, v) => match v.as_int() {
            Some(n) => Ok(Value::Int(n)),
            None => Err(RuntimeError::type_error("number", v.type_name())),
        },
        (op, v) => Err(RuntimeError::type_error(
            &format!("operand for `{op}` with a storage location"),
            v.type_name(),
        )),
    }
}
