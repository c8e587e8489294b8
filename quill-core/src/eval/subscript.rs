use crate::error::SemanticError;
use crate::lexer::{Token, TokenKind};
use crate::render::{ExprModel, RenderNode};
use crate::span::Span;
use crate::tokens::{inner, range_last, top_level_colon};
use crate::types::{DataType, Prim};
use crate::value::Value;

use super::Evaluator;

impl Evaluator<'_> {
    /// `x[i]` or `x[lo:hi]`.
    pub(super) fn bracket_range(&mut self, tokens: &[Token], m: &mut ExprModel) -> Value {
        let (before, range) = range_last(tokens);
        let span = tokens[tokens.len() - 1].span;
        if before.is_empty() || range.first().is_none_or(|t| t.kind != TokenKind::LBracket) {
            self.error(SemanticError::InvalidSyntax, span);
            return Value::void(span);
        }
        let owner = self.process(before, m);
        if self.has_error {
            return Value::void(span);
        }
        let subscript = inner(range);
        match top_level_colon(subscript) {
            Some(colon) => self.slice(owner, &subscript[..colon], &subscript[colon + 1..], range[0].span, m),
            None => self.index(owner, subscript, range[0].span, m),
        }
    }

    fn index(&mut self, owner: Value, index: &[Token], span: Span, m: &mut ExprModel) -> Value {
        if index.is_empty() {
            self.error(SemanticError::MissingExpr, span);
            return Value::void(span);
        }
        let ty = owner.ty.resolve_alias();
        let (elem, key) = if let Some(elem) = ty.component() {
            (elem.clone(), None)
        } else if let Some((key, value)) = ty.map_types() {
            (value.clone(), Some(key.clone()))
        } else if ty.is_str() {
            (DataType::prim(Prim::U8), None)
        } else {
            self.error(SemanticError::NotSupportsIndexing(owner.ty.kind_text()), span);
            return Value::void(span);
        };

        let (value, mut node, failed) = self.eval_isolated(index);
        if failed {
            return Value::void(span);
        }
        match key {
            Some(key) => {
                if !self.check_assign(&key, &value, value.span) {
                    return Value::void(span);
                }
                node = self.coerce_node(&key, &value, node);
            }
            None => {
                if !self.check_bound(&value, ty.array_size().map(|size| size.n), false) {
                    return Value::void(span);
                }
            }
        }
        m.push_text("[");
        m.push(node);
        m.push_text("]");

        let mut result = Value::of(elem, span);
        result.lvalue = !ty.is_str();
        result
    }

    fn slice(&mut self, owner: Value, lo: &[Token], hi: &[Token], span: Span, m: &mut ExprModel) -> Value {
        let ty = owner.ty.resolve_alias();
        let result_ty = if let Some(elem) = ty.component() {
            DataType::slice_of(elem.clone())
        } else if ty.is_str() {
            DataType::prim(Prim::Str)
        } else {
            self.error(SemanticError::NotSupportsSlicing(owner.ty.kind_text()), span);
            return Value::void(span);
        };
        let limit = ty.array_size().map(|size| size.n);

        let lo = self.slice_bound(lo, limit);
        let hi = self.slice_bound(hi, limit);
        let (Some(lo), Some(hi)) = (lo, hi) else {
            return Value::void(span);
        };
        if let (Bound::Const(a), Bound::Const(b)) = (&lo, &hi) {
            if a > b {
                self.report(SemanticError::OverflowLimits, span);
                return Value::void(span);
            }
        }

        m.push_text(".slice(");
        m.push(lo.into_node().unwrap_or_else(|| size_const(0)));
        let hi = hi.into_node().or_else(|| limit.map(|n| size_const(n as u64)));
        if let Some(hi) = hi {
            m.push_text(", ");
            m.push(hi);
        }
        m.push_text(")");
        Value::of(result_ty.with_span(owner.ty.span), span)
    }

    fn slice_bound(&mut self, tokens: &[Token], limit: Option<usize>) -> Option<Bound> {
        if tokens.is_empty() {
            return Some(Bound::Default);
        }
        let (value, node, failed) = self.eval_isolated(tokens);
        if failed || !self.check_bound(&value, limit, true) {
            return None;
        }
        Some(match value.numeric_constant() {
            Some(c) => Bound::Const(c.as_u64()),
            None => Bound::Expr(node),
        })
    }

    /// Bounds must be integers; constant bounds must be non-negative and
    /// within a fixed array. A slice bound may equal the array size.
    fn check_bound(&mut self, value: &Value, limit: Option<usize>, inclusive: bool) -> bool {
        if !value.ty.resolve_alias().is_integer() {
            self.report(SemanticError::InvalidExpr, value.span);
            return false;
        }
        let Some(c) = value.numeric_constant() else {
            return true;
        };
        if c.is_negative() {
            self.report(SemanticError::InvalidExpr, value.span);
            return false;
        }
        if let Some(limit) = limit {
            let n = c.as_u64();
            let out = if inclusive { n > limit as u64 } else { n >= limit as u64 };
            if out {
                self.report(SemanticError::OverflowLimits, value.span);
                return false;
            }
        }
        true
    }
}

enum Bound {
    Default,
    Const(u64),
    Expr(RenderNode),
}

impl Bound {
    fn into_node(self) -> Option<RenderNode> {
        match self {
            Bound::Default => None,
            Bound::Const(n) => Some(size_const(n)),
            Bound::Expr(node) => Some(node),
        }
    }
}

fn size_const(n: u64) -> RenderNode {
    RenderNode::Text(format!("uint{{{n}}}"))
}
