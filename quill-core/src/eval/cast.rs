use crate::error::SemanticError;
use crate::lexer::{Token, TokenKind};
use crate::literal::render_const;
use crate::render::ExprModel;
use crate::span::Span;
use crate::tokens::matching_close;
use crate::types::{DataType, Prim};
use crate::value::Value;

use super::Evaluator;

/// Whether a value of `from` may be converted to `to` explicitly.
pub(super) fn castable(from: &DataType, to: &DataType) -> bool {
    let from = from.resolve_alias();
    let to = to.resolve_alias();
    let is_bytes = |t: &DataType| t.component().is_some_and(|e| e.resolve_alias().is_prim(Prim::U8)) && t.is_slice();
    if to.is_slice() {
        return is_bytes(&to) && from.is_str();
    }
    if to.is_str() {
        return from.is_str() || is_bytes(&from);
    }
    if to.is_enum() {
        return from.is_numeric() || from.canonical_kind() == to.canonical_kind();
    }
    match to.as_prim() {
        Some(p) if p.is_integer() => {
            from.is_numeric() || from.is_enum() || (from.is_ptr() && p == Prim::UIntptr)
        }
        Some(p) if p.is_float() => from.is_numeric() || from.is_enum(),
        _ => false,
    }
}

/// Target types a cast may name at all.
fn cast_target(to: &DataType) -> bool {
    let to = to.resolve_alias();
    to.is_numeric() || to.is_enum() || to.is_str() || to.is_slice()
}

impl Evaluator<'_> {
    /// `(T)(expr)`. Returns `None` when the first parenthesis does not hold
    /// a type, so the caller can treat the tokens as a call.
    pub(super) fn try_cast(&mut self, tokens: &[Token], m: &mut ExprModel) -> Option<Value> {
        let first_close = matching_close(tokens, 0)?;
        let second = tokens.get(first_close + 1).filter(|t| t.kind == TokenKind::LParen)?;
        if matching_close(tokens, first_close + 1)? != tokens.len() - 1 {
            return None;
        }
        let target = self.parse_type(&tokens[1..first_close], false)?;
        let expr = &tokens[first_close + 2..tokens.len() - 1];
        Some(self.cast_expr(target, expr, second.span, m))
    }

    /// Convert `expr` into `target`. Constant numerics fold, wrapping to
    /// the target width.
    pub(super) fn cast_expr(&mut self, target: DataType, expr: &[Token], span: Span, m: &mut ExprModel) -> Value {
        if !cast_target(&target) {
            self.error(SemanticError::TypeNotSupportsCasting(target.kind_text()), span);
            return Value::void(span);
        }
        if expr.is_empty() {
            self.error(SemanticError::MissingExpr, span);
            return Value::void(span);
        }
        let (value, node, failed) = self.eval_isolated(expr);
        if failed {
            return Value::void(span);
        }
        if !castable(&value.ty, &target) {
            self.error(
                SemanticError::TypeNotSupportsCastingTo {
                    from: value.ty.kind_text(),
                    to: target.kind_text(),
                },
                span,
            );
            return Value::void(span);
        }

        let resolved = target.resolve_alias();
        if let (Some(c), Some(prim)) = (value.numeric_constant(), resolved.as_prim()) {
            let constant = c.cast_to(prim);
            m.push_text(render_const(&constant, &resolved));
            return Value::constant(target, constant, span);
        }
        m.push_text(format!("({})(", target.render()));
        m.push(node);
        m.push_text(")");
        Value::of(target, span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_slices_and_strings_convert_both_ways() {
        let bytes = DataType::slice_of(DataType::prim(Prim::U8));
        let text = DataType::prim(Prim::Str);
        assert!(castable(&bytes, &text));
        assert!(castable(&text, &bytes));
        assert!(!castable(&DataType::slice_of(DataType::prim(Prim::I32)), &text));
    }

    #[test]
    fn only_uintptr_takes_pointers() {
        let p = DataType::prim(Prim::Int).with_ptr(1);
        assert!(castable(&p, &DataType::prim(Prim::UIntptr)));
        assert!(!castable(&p, &DataType::prim(Prim::U64)));
        assert!(!cast_target(&DataType::prim(Prim::Bool)));
    }
}
