use std::sync::Arc;

use crate::defs::Var;
use crate::error::SemanticError;
use crate::lexer::{Token, TokenKind};
use crate::render::{ExprModel, RenderNode};
use crate::span::Span;
use crate::tokens::{inner, range_last, split_parts, top_level_colon};
use crate::types::{DataType, FuncSig, Param, TypeShape};
use crate::value::Value;

use super::Evaluator;

impl Evaluator<'_> {
    /// `T{...}` composite literals and `(params) ret {...}` function literals.
    pub(super) fn brace_range(&mut self, tokens: &[Token], m: &mut ExprModel) -> Value {
        let (before, range) = range_last(tokens);
        let span = tokens[0].span;
        if before.is_empty() || range.first().is_none_or(|t| t.kind != TokenKind::LBrace) {
            self.error(SemanticError::InvalidSyntax, span);
            return Value::void(span);
        }
        match before[0].kind {
            TokenKind::LParen => self.anon_func(tokens, m),
            TokenKind::LBracket | TokenKind::Ident | TokenKind::DataType | TokenKind::Operator => {
                let Some(ty) = self.parse_type(before, true) else {
                    return Value::void(span);
                };
                let parts = inner(range);
                let resolved = ty.resolve_alias();
                match &resolved.shape {
                    TypeShape::Struct(_) if resolved.ptr == 0 => self.construct(ty, parts, span, m),
                    _ => self.enumerable(ty, parts, span, m),
                }
            }
            _ => {
                self.error(SemanticError::InvalidSyntax, span);
                Value::void(span)
            }
        }
    }

    /// Slice, array and map literals.
    fn enumerable(&mut self, ty: DataType, tokens: &[Token], span: Span, m: &mut ExprModel) -> Value {
        let resolved = ty.resolve_alias();
        let mut parts = split_parts(tokens, TokenKind::Comma);
        if parts.last().is_some_and(|p| p.is_empty()) {
            parts.pop();
        }

        match &resolved.shape {
            TypeShape::Slice(elem) if resolved.ptr == 0 => {
                let elems = self.elements(elem, &parts);
                m.push(RenderNode::SliceLit {
                    ty: resolved.render(),
                    elems,
                });
                Value::of(ty, span)
            }
            TypeShape::Array { elem, size } if resolved.ptr == 0 => {
                let n = if size.auto { parts.len() } else { size.n };
                if parts.len() > n {
                    self.report(SemanticError::OverflowLimits, span);
                    return Value::void(span);
                }
                let sized = DataType::array_of((**elem).clone(), n).with_span(ty.span);
                let elems = self.elements(elem, &parts);
                m.push(RenderNode::SliceLit {
                    ty: sized.render(),
                    elems,
                });
                Value::of(sized, span)
            }
            TypeShape::Map { key, value } if resolved.ptr == 0 => {
                let mut entries = Vec::with_capacity(parts.len());
                for part in &parts {
                    let colon = top_level_colon(part).filter(|&c| c > 0 && c + 1 < part.len());
                    let Some(colon) = colon else {
                        let at = part.first().map(|t| t.span).unwrap_or(span);
                        self.report(SemanticError::MissingExpr, at);
                        continue;
                    };
                    let k = self.element(key, &part[..colon]);
                    let v = self.element(value, &part[colon + 1..]);
                    if let (Some(k), Some(v)) = (k, v) {
                        entries.push((k, v));
                    }
                }
                m.push(RenderNode::MapLit {
                    ty: resolved.render(),
                    entries,
                });
                Value::of(ty, span)
            }
            _ => {
                self.error(SemanticError::InvalidTypeSource, span);
                Value::void(span)
            }
        }
    }

    fn elements(&mut self, elem: &DataType, parts: &[&[Token]]) -> Vec<RenderNode> {
        parts.iter().filter_map(|part| self.element(elem, part)).collect()
    }

    /// One element checked against and coerced into `target`.
    fn element(&mut self, target: &DataType, tokens: &[Token]) -> Option<RenderNode> {
        let (value, node, failed) = self.eval_isolated(tokens);
        if failed || !self.check_assign(target, &value, value.span) {
            return None;
        }
        Some(self.coerce_node(target, &value, node))
    }

    /// `S{a, b}` or `S{x: a}`: fields bound like call arguments.
    fn construct(&mut self, ty: DataType, tokens: &[Token], span: Span, m: &mut ExprModel) -> Value {
        let resolved = ty.resolve_alias();
        let TypeShape::Struct(s) = &resolved.shape else {
            return Value::void(span);
        };
        let bindings: Vec<(String, DataType)> =
            s.def.generics.iter().cloned().zip(s.generics.iter().cloned()).collect();
        let params: Vec<Param> = s
            .def
            .constructor_params()
            .into_iter()
            .map(|p| Param {
                ty: p.ty.substitute(&bindings),
                ..p
            })
            .collect();
        let Some(args) = self.bind_positional(&params, tokens, span) else {
            return Value::void(span);
        };
        let mut nodes = vec![RenderNode::text(ty.render()), RenderNode::text("{")];
        for (i, arg) in args.into_iter().enumerate() {
            if i > 0 {
                nodes.push(RenderNode::text(", "));
            }
            nodes.push(arg.node);
        }
        nodes.push(RenderNode::text("}"));
        m.push(RenderNode::Seq(nodes));
        Value::of(ty, span)
    }

    /// `(params) ret { body }` with params visible as locals in the body.
    fn anon_func(&mut self, tokens: &[Token], m: &mut ExprModel) -> Value {
        let span = tokens[0].span;
        let syntax = match self.sub.anon_func(tokens) {
            Ok(syntax) => syntax,
            Err(diagnostic) => {
                self.push_diagnostic(diagnostic);
                return Value::void(span);
            }
        };
        let mut params = Vec::with_capacity(syntax.params.len());
        for param in &syntax.params {
            let Some(ty) = self.resolve_type(&param.ty, true) else {
                return Value::void(span);
            };
            params.push(Param { ty, ..param.clone() });
        }
        let Some(ret) = self.resolve_type(&syntax.ret, true) else {
            return Value::void(span);
        };

        self.push_scope();
        for param in &params {
            self.declare(Var::new(param.name.clone(), param.received_type()).with_span(param.span));
        }
        let saved_ret = self.ret_type.replace(ret.clone());
        let outer_error = self.has_error;
        let mut failed = false;
        let mut body = Vec::with_capacity(syntax.body.len());
        for stmt in &syntax.body {
            if let Some(node) = self.statement(stmt) {
                body.push(node);
            }
            failed |= self.has_error;
        }
        self.has_error = outer_error || failed;
        self.ret_type = saved_ret;
        self.pop_scope();

        m.push(RenderNode::AnonFunc {
            params: params.iter().map(Param::prototype).collect(),
            ret: ret.render(),
            body: Box::new(RenderNode::Block(body)),
        });
        let sig = FuncSig::new(params, ret);
        Value::of(DataType::new(TypeShape::Func(Arc::new(sig))).with_span(span), span)
    }
}
