//! Per-expression evaluation results and compile-time constants.

use std::fmt;

use crate::span::Span;
use crate::types::{DataType, Prim};

/// Host-side payload of a compile-time constant.
#[derive(Debug, Clone, PartialEq)]
pub enum Const {
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Bool(bool),
    Nil,
}

impl Const {
    pub fn as_i64(&self) -> i64 {
        match self {
            Const::Int(v) => *v,
            Const::UInt(v) => *v as i64,
            Const::Float(v) => *v as i64,
            Const::Bool(v) => i64::from(*v),
            Const::Str(_) | Const::Nil => 0,
        }
    }

    pub fn as_u64(&self) -> u64 {
        match self {
            Const::Int(v) => *v as u64,
            Const::UInt(v) => *v,
            Const::Float(v) => *v as u64,
            Const::Bool(v) => u64::from(*v),
            Const::Str(_) | Const::Nil => 0,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            Const::Int(v) => *v as f64,
            Const::UInt(v) => *v as f64,
            Const::Float(v) => *v,
            Const::Bool(v) => f64::from(u8::from(*v)),
            Const::Str(_) | Const::Nil => 0.0,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Const::Int(_) | Const::UInt(_) | Const::Float(_))
    }

    pub fn is_negative(&self) -> bool {
        match self {
            Const::Int(v) => *v < 0,
            Const::Float(v) => *v < 0.0,
            _ => false,
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Const::Int(v) => *v == 0,
            Const::UInt(v) => *v == 0,
            Const::Float(v) => *v == 0.0,
            _ => false,
        }
    }

    /// Whether the value is representable in `prim` without change.
    /// Floats never fit an integer type implicitly.
    pub fn fits(&self, prim: Prim) -> bool {
        let bits = prim.bit_size();
        if prim.is_integer() {
            let wide: i128 = match self {
                Const::Int(v) => i128::from(*v),
                Const::UInt(v) => i128::from(*v),
                _ => return false,
            };
            let (min, max) = integer_bounds(prim.is_signed_integer(), bits);
            return (min..=max).contains(&wide);
        }
        match prim {
            Prim::F64 => self.is_numeric(),
            Prim::F32 => match self {
                Const::Float(v) => !v.is_finite() || v.abs() <= f64::from(f32::MAX),
                Const::Int(_) | Const::UInt(_) => true,
                _ => false,
            },
            _ => false,
        }
    }

    /// Narrow or widen to `prim`.
    ///
    /// Integer targets wrap with two's-complement truncation. Floats are
    /// truncated toward zero first (saturating at the 128-bit range, NaN
    /// becomes zero) and then wrapped. Non-numeric targets keep the value.
    pub fn cast_to(&self, prim: Prim) -> Const {
        let bits = prim.bit_size();
        if prim.is_integer() {
            let wide: i128 = match self {
                Const::Int(v) => i128::from(*v),
                Const::UInt(v) => i128::from(*v),
                Const::Float(v) => v.trunc() as i128,
                Const::Bool(v) => i128::from(*v),
                Const::Str(_) | Const::Nil => 0,
            };
            let low = wide as u64;
            return if prim.is_signed_integer() {
                let shift = 64 - bits;
                Const::Int(((low as i64) << shift) >> shift)
            } else if bits == 64 {
                Const::UInt(low)
            } else {
                Const::UInt(low & ((1u64 << bits) - 1))
            };
        }
        match prim {
            Prim::F32 => Const::Float(f64::from(self.as_f64() as f32)),
            Prim::F64 => Const::Float(self.as_f64()),
            _ => self.clone(),
        }
    }

    /// Default type of an integer literal: `i32` when it fits, then `i64`,
    /// then `u64`.
    pub fn literal_prim(&self) -> Prim {
        match self {
            Const::Int(_) if self.fits(Prim::I32) => Prim::I32,
            Const::Int(_) => Prim::I64,
            Const::UInt(v) if i64::try_from(*v).is_ok() => Prim::I64,
            Const::UInt(_) => Prim::U64,
            Const::Float(_) => Prim::F64,
            Const::Str(_) => Prim::Str,
            Const::Bool(_) => Prim::Bool,
            Const::Nil => Prim::Nil,
        }
    }
}

fn integer_bounds(signed: bool, bits: u32) -> (i128, i128) {
    if signed {
        (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1)
    } else {
        (0, (1i128 << bits) - 1)
    }
}

impl fmt::Display for Const {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Const::Int(v) => write!(f, "{v}"),
            Const::UInt(v) => write!(f, "{v}"),
            Const::Float(v) => write!(f, "{v}"),
            Const::Str(v) => write!(f, "{v:?}"),
            Const::Bool(v) => write!(f, "{v}"),
            Const::Nil => f.write_str("nil"),
        }
    }
}

/// Result of evaluating one sub-expression.
///
/// Created fresh for every operand and consumed by the step that asked
/// for it.
#[derive(Debug, Clone)]
pub struct Value {
    pub ty: DataType,
    pub constant: Option<Const>,
    pub lvalue: bool,
    /// A `xs...` spread argument.
    pub variadic: bool,
    /// The expression names a type (struct or enum) rather than a value.
    pub is_type: bool,
    pub span: Span,
}

impl Value {
    pub fn of(ty: DataType, span: Span) -> Self {
        Value {
            ty,
            constant: None,
            lvalue: false,
            variadic: false,
            is_type: false,
            span,
        }
    }

    pub fn void(span: Span) -> Self {
        Value::of(DataType::void(), span)
    }

    pub fn constant(ty: DataType, constant: Const, span: Span) -> Self {
        Value {
            constant: Some(constant),
            ..Value::of(ty, span)
        }
    }

    pub fn is_constant(&self) -> bool {
        self.constant.is_some()
    }

    /// Constant numeric payload, if any.
    pub fn numeric_constant(&self) -> Option<&Const> {
        self.constant.as_ref().filter(|c| c.is_numeric())
    }
}
