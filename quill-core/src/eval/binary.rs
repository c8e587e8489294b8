use std::cmp::Ordering;

use tracing::trace;

use crate::compat::types_are_compatible;
use crate::error::SemanticError;
use crate::lexer::Token;
use crate::literal::render_const;
use crate::render::RenderNode;
use crate::types::{DataType, Prim};
use crate::value::{Const, Value};

use super::Evaluator;

type Operand = (Value, RenderNode);

fn is_shift(op: &str) -> bool {
    op == "<<" || op == ">>"
}

fn is_comparison(op: &str) -> bool {
    matches!(op, "==" | "!=" | "<" | "<=" | ">" | ">=")
}

/// Literal-typed integer results grow from `i32` to `i64` instead of
/// wrapping; every other type wraps to its own width.
pub(super) fn settle_literal(prim: Prim, c: Const) -> (Prim, Const) {
    match (prim, &c) {
        (Prim::I32 | Prim::I64, Const::Int(_)) => {
            let settled = if c.fits(Prim::I32) { Prim::I32 } else { Prim::I64 };
            (settled, c)
        }
        _ => (prim, c.cast_to(prim)),
    }
}

impl Evaluator<'_> {
    /// Combine two evaluated operands with a binary operator.
    pub(super) fn solve_binary(&mut self, op: &Token, left: Operand, right: Operand) -> Operand {
        let (mut l, mut ln) = left;
        let (mut r, mut rn) = right;
        let span = l.span;
        let operator = op.text.as_str();

        if is_shift(operator) {
            for side in [&l, &r] {
                if !side.ty.resolve_alias().is_integer() {
                    let kind = side.ty.kind_text();
                    return self.binary_error(op, SemanticError::OperatorNotFor { operator: operator.to_string(), kind });
                }
            }
        } else {
            self.adopt_constant_types(&mut l, &mut ln, &mut r, &mut rn);
            if !types_are_compatible(&l.ty, &r.ty, false) {
                let error = SemanticError::IncompatibleTypes {
                    left: l.ty.kind_text(),
                    right: r.ty.kind_text(),
                };
                return self.binary_error(op, error);
            }
        }

        let ty = l.ty.resolve_alias();
        let allowed = match operator {
            "+" => ty.is_numeric() || ty.is_str(),
            "-" | "*" | "/" => ty.is_numeric(),
            "%" | "&" | "|" | "^" | "<<" | ">>" => ty.is_integer(),
            "==" | "!=" => true,
            "<" | "<=" | ">" | ">=" => ty.is_numeric() || ty.is_str(),
            "&&" | "||" => ty.is_bool(),
            _ => {
                return self.binary_error(op, SemanticError::InvalidOperator);
            }
        };
        if !allowed {
            let kind = l.ty.kind_text();
            return self.binary_error(op, SemanticError::OperatorNotFor { operator: operator.to_string(), kind });
        }

        let mut result_ty = if is_comparison(operator) {
            DataType::prim(Prim::Bool).with_span(l.ty.span)
        } else {
            l.ty.clone()
        };

        if let (Some(a), Some(b)) = (&l.constant, &r.constant) {
            match fold(operator, ty.as_prim(), a, b) {
                Ok((prim, constant)) => {
                    if let Some(prim) = prim {
                        if result_ty.as_prim() != Some(prim) {
                            result_ty = DataType::prim(prim).with_span(result_ty.span);
                        }
                    }
                    trace!(op = operator, value = %constant, "folded constant");
                    let node = RenderNode::Text(render_const(&constant, &result_ty));
                    return (Value::constant(result_ty, constant, span), node);
                }
                Err(error) => return self.binary_error(op, error),
            }
        }

        let node = RenderNode::Binary {
            left: Box::new(ln),
            op: operator.to_string(),
            right: Box::new(rn),
        };
        (Value::of(result_ty, span), node)
    }

    fn binary_error(&mut self, op: &Token, error: SemanticError) -> Operand {
        self.error(error, op.span);
        (Value::void(op.span), RenderNode::text(""))
    }

    /// A constant numeric operand takes the type of the other side when its
    /// value fits there.
    fn adopt_constant_types(&self, l: &mut Value, ln: &mut RenderNode, r: &mut Value, rn: &mut RenderNode) {
        let adopt = |from: &mut Value, node: &mut RenderNode, to: &DataType| -> bool {
            let (Some(c), Some(prim)) = (from.numeric_constant(), to.resolve_alias().as_prim()) else {
                return false;
            };
            if !prim.is_numeric() || !from.ty.is_numeric() || !c.fits(prim) {
                return false;
            }
            let c = c.cast_to(prim);
            *node = RenderNode::Text(render_const(&c, to));
            from.constant = Some(c);
            from.ty = to.clone();
            true
        };
        if types_are_compatible(&l.ty, &r.ty, false) {
            return;
        }
        match (l.is_constant(), r.is_constant()) {
            (true, false) => {
                adopt(l, ln, &r.ty.clone());
            }
            (false, true) => {
                adopt(r, rn, &l.ty.clone());
            }
            (true, true) => {
                if !adopt(l, ln, &r.ty.clone()) {
                    adopt(r, rn, &l.ty.clone());
                }
            }
            (false, false) => {}
        }
    }
}

/// Fold two constants. Returns the primitive the result settles in when
/// it differs by value (literal widening), together with the value.
fn fold(op: &str, prim: Option<Prim>, a: &Const, b: &Const) -> Result<(Option<Prim>, Const), SemanticError> {
    if is_comparison(op) {
        let ordering = compare(a, b);
        let result = match op {
            "==" => ordering == Some(Ordering::Equal),
            "!=" => ordering != Some(Ordering::Equal),
            "<" => ordering == Some(Ordering::Less),
            "<=" => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
            ">" => ordering == Some(Ordering::Greater),
            _ => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        };
        return Ok((Some(Prim::Bool), Const::Bool(result)));
    }
    match (a, b) {
        (Const::Bool(x), Const::Bool(y)) => {
            let v = if op == "&&" { *x && *y } else { *x || *y };
            return Ok((Some(Prim::Bool), Const::Bool(v)));
        }
        (Const::Str(x), Const::Str(y)) => return Ok((Some(Prim::Str), Const::Str(format!("{x}{y}")))),
        _ => {}
    }

    let Some(prim) = prim else {
        return Err(SemanticError::InvalidExpr);
    };
    if matches!(op, "/" | "%") && b.is_zero() {
        return Err(SemanticError::DivideByZero);
    }
    if prim.is_float() {
        let (x, y) = (a.as_f64(), b.as_f64());
        let v = match op {
            "+" => x + y,
            "-" => x - y,
            "*" => x * y,
            "/" => x / y,
            _ => return Err(SemanticError::InvalidOperator),
        };
        return Ok((Some(prim), Const::Float(v).cast_to(prim)));
    }
    if prim.is_unsigned_integer() {
        let (x, y) = (a.as_u64(), b.as_u64());
        let v = match op {
            "+" => x.wrapping_add(y),
            "-" => x.wrapping_sub(y),
            "*" => x.wrapping_mul(y),
            "/" => x / y,
            "%" => x % y,
            "&" => x & y,
            "|" => x | y,
            "^" => x ^ y,
            "<<" => shift_amount(b).and_then(|s| x.checked_shl(s)).unwrap_or(0),
            ">>" => shift_amount(b).and_then(|s| x.checked_shr(s)).unwrap_or(0),
            _ => return Err(SemanticError::InvalidOperator),
        };
        return Ok((Some(prim), Const::UInt(v).cast_to(prim)));
    }
    let (x, y) = (a.as_i64(), b.as_i64());
    let v = match op {
        "+" => x.wrapping_add(y),
        "-" => x.wrapping_sub(y),
        "*" => x.wrapping_mul(y),
        "/" => x.wrapping_div(y),
        "%" => x.wrapping_rem(y),
        "&" => x & y,
        "|" => x | y,
        "^" => x ^ y,
        "<<" => shift_amount(b).and_then(|s| x.checked_shl(s)).unwrap_or(0),
        ">>" => shift_amount(b)
            .and_then(|s| x.checked_shr(s))
            .unwrap_or(if x < 0 { -1 } else { 0 }),
        _ => return Err(SemanticError::InvalidOperator),
    };
    let (settled, c) = settle_literal(prim, Const::Int(v));
    Ok((Some(settled), c))
}

/// Negative shift counts shift everything out.
fn shift_amount(c: &Const) -> Option<u32> {
    if c.is_negative() {
        return None;
    }
    u32::try_from(c.as_u64()).ok()
}

fn compare(a: &Const, b: &Const) -> Option<Ordering> {
    match (a, b) {
        (Const::Str(x), Const::Str(y)) => Some(x.cmp(y)),
        (Const::Bool(x), Const::Bool(y)) => Some(x.cmp(y)),
        (Const::Nil, Const::Nil) => Some(Ordering::Equal),
        (Const::Float(_), _) | (_, Const::Float(_)) => a.as_f64().partial_cmp(&b.as_f64()),
        (Const::Int(_) | Const::UInt(_), Const::Int(_) | Const::UInt(_)) => {
            Some(wide(a).cmp(&wide(b)))
        }
        _ => None,
    }
}

fn wide(c: &Const) -> i128 {
    match c {
        Const::Int(v) => i128::from(*v),
        Const::UInt(v) => i128::from(*v),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_integers_widen_instead_of_wrapping() {
        let (prim, c) = fold("*", Some(Prim::I32), &Const::Int(1 << 20), &Const::Int(1 << 20)).expect("fold");
        assert_eq!(prim, Some(Prim::I64));
        assert_eq!(c, Const::Int(1 << 40));
    }

    #[test]
    fn sized_integers_wrap() {
        let (_, c) = fold("+", Some(Prim::U8), &Const::Int(250), &Const::Int(10)).expect("fold");
        assert_eq!(c, Const::UInt(4));
        let (_, c) = fold("+", Some(Prim::I8), &Const::Int(127), &Const::Int(1)).expect("fold");
        assert_eq!(c, Const::Int(-128));
    }

    #[test]
    fn division_by_zero_is_rejected() {
        assert_eq!(
            fold("/", Some(Prim::Int), &Const::Int(1), &Const::Int(0)),
            Err(SemanticError::DivideByZero)
        );
        assert_eq!(
            fold("%", Some(Prim::U32), &Const::UInt(1), &Const::UInt(0)),
            Err(SemanticError::DivideByZero)
        );
    }

    #[test]
    fn compares_mixed_representations() {
        let (_, c) = fold("<", Some(Prim::I64), &Const::Int(-1), &Const::UInt(u64::MAX)).expect("fold");
        assert_eq!(c, Const::Bool(true));
        let (_, c) = fold("==", Some(Prim::Str), &Const::Str("a".into()), &Const::Str("a".into())).expect("fold");
        assert_eq!(c, Const::Bool(true));
    }

    #[test]
    fn concatenates_strings() {
        let (prim, c) = fold("+", Some(Prim::Str), &Const::Str("ab".into()), &Const::Str("c".into())).expect("fold");
        assert_eq!(prim, Some(Prim::Str));
        assert_eq!(c, Const::Str("abc".into()));
    }
}
