use crate::defs::Var;
use crate::error::SemanticError;
use crate::foreach::{ForeachBinding, check_foreach, render_foreach};
use crate::lexer::{Token, TokenKind};
use crate::render::RenderNode;
use crate::span::Span;
use crate::tokens::{range_last, split_parts};
use crate::types::DataType;

use super::Evaluator;

impl Evaluator<'_> {
    /// Render one statement. Expression statements end in `;`. Each
    /// statement starts with a fresh error latch.
    pub fn statement(&mut self, tokens: &[Token]) -> Option<RenderNode> {
        self.has_error = false;
        let first = tokens.first()?;
        if first.kind == TokenKind::Return {
            return Some(self.return_stmt(tokens));
        }
        if first.kind == TokenKind::Ident && first.text == "for" {
            return Some(self.foreach_stmt(tokens));
        }
        if let Some(eq) = assignment_at(tokens) {
            return Some(self.assign_stmt(&tokens[..eq], &tokens[eq + 1..], tokens[eq].span));
        }
        let (_, node) = self.eval_tokens(tokens);
        Some(RenderNode::Stmt(Box::new(node)))
    }

    fn assign_stmt(&mut self, left: &[Token], right: &[Token], span: Span) -> RenderNode {
        let (target, target_node) = self.eval_tokens(left);
        let (value, node, failed) = self.eval_isolated(right);
        if self.has_error || failed {
            return RenderNode::text("");
        }
        if !target.lvalue {
            self.error(SemanticError::InvalidExpr, span);
            return RenderNode::text("");
        }
        if !self.check_assign(&target.ty, &value, value.span) {
            return RenderNode::text("");
        }
        let node = self.coerce_node(&target.ty, &value, node);
        RenderNode::Stmt(Box::new(RenderNode::Seq(vec![
            target_node,
            RenderNode::text(" = "),
            node,
        ])))
    }

    fn return_stmt(&mut self, tokens: &[Token]) -> RenderNode {
        let span = tokens[0].span;
        let Some(ret) = self.ret_type.clone() else {
            self.error(SemanticError::InvalidSyntax, span);
            return RenderNode::Return(None);
        };
        let parts = split_parts(&tokens[1..], TokenKind::Comma);
        if parts.is_empty() {
            if !ret.is_void() {
                self.error(SemanticError::MissingExpr, span);
            }
            return RenderNode::Return(None);
        }

        let mut values = Vec::with_capacity(parts.len());
        for part in &parts {
            if part.is_empty() {
                self.error(SemanticError::MissingExpr, span);
                return RenderNode::Return(None);
            }
            let (value, node, failed) = self.eval_isolated(part);
            if failed {
                return RenderNode::Return(None);
            }
            values.push((value, node));
        }

        if ret.is_void() {
            let given = values[0].0.ty.kind_text();
            self.error(SemanticError::IncompatibleDatatype { expected: "void".into(), given }, span);
            return RenderNode::Return(None);
        }
        if values.len() == 1 {
            let (value, node) = values.remove(0);
            if !self.check_assign(&ret, &value, value.span) {
                return RenderNode::Return(None);
            }
            let node = self.coerce_node(&ret, &value, node);
            return RenderNode::Return(Some(Box::new(node)));
        }

        let Some(targets) = ret.tuple_types().filter(|t| t.len() == values.len()).map(<[DataType]>::to_vec) else {
            let given = DataType::tuple(values.iter().map(|(v, _)| v.ty.clone()).collect()).kind_text();
            self.error(SemanticError::IncompatibleDatatype { expected: ret.kind_text(), given }, span);
            return RenderNode::Return(None);
        };
        let mut nodes = Vec::with_capacity(values.len());
        for (target, (value, node)) in targets.iter().zip(values) {
            if !self.check_assign(target, &value, value.span) {
                return RenderNode::Return(None);
            }
            nodes.push(self.coerce_node(target, &value, node));
        }
        RenderNode::Return(Some(Box::new(RenderNode::Tuple(nodes))))
    }

    /// `for k[ T][, v[ T]] in expr { ... }`
    fn foreach_stmt(&mut self, tokens: &[Token]) -> RenderNode {
        let span = tokens[0].span;
        let (head, block) = range_last(tokens);
        let Some(in_at) = head.iter().position(|t| t.kind == TokenKind::Ident && t.text == "in") else {
            self.error(SemanticError::InvalidSyntax, span);
            return RenderNode::text("");
        };
        if block.first().is_none_or(|t| t.kind != TokenKind::LBrace) || in_at < 2 {
            self.error(SemanticError::InvalidSyntax, span);
            return RenderNode::text("");
        }

        let mut bindings = Vec::new();
        for part in split_parts(&head[1..in_at], TokenKind::Comma) {
            let Some((name, ty_tokens)) = part.split_first().filter(|(n, _)| n.kind == TokenKind::Ident) else {
                self.error(SemanticError::InvalidSyntax, span);
                return RenderNode::text("");
            };
            let mut binding = ForeachBinding::new(name.text.clone(), name.span);
            if !ty_tokens.is_empty() {
                let Some(ty) = self.parse_type(ty_tokens, true) else {
                    return RenderNode::text("");
                };
                binding = binding.with_type(ty);
            }
            bindings.push(binding);
        }
        let mut bindings = bindings.into_iter();
        let (Some(key), value, None) = (bindings.next(), bindings.next(), bindings.next()) else {
            self.error(SemanticError::InvalidSyntax, span);
            return RenderNode::text("");
        };

        let (collection, expr_node, failed) = self.eval_isolated(&head[in_at + 1..]);
        if failed {
            return RenderNode::text("");
        }
        let profile = match check_foreach(&collection.ty, key, value) {
            Ok(profile) => profile,
            Err(diagnostic) => {
                self.push_diagnostic(diagnostic);
                return RenderNode::text("");
            }
        };

        self.push_scope();
        for binding in [Some(&profile.key), profile.value.as_ref()].into_iter().flatten() {
            if let (false, Some(ty)) = (binding.is_blank(), &binding.ty) {
                self.declare(Var::new(binding.name.clone(), ty.clone()).with_span(binding.span));
            }
        }
        let outer_error = self.has_error;
        let mut failed = false;
        let mut body = Vec::new();
        for stmt in split_parts(&block[1..block.len() - 1], TokenKind::Semi) {
            if let Some(node) = self.statement(stmt) {
                body.push(node);
            }
            failed |= self.has_error;
        }
        self.has_error = outer_error || failed;
        self.pop_scope();

        render_foreach(&profile, expr_node, RenderNode::Block(body))
    }
}

/// Index of a top-level `=` that follows an operand.
fn assignment_at(tokens: &[Token]) -> Option<usize> {
    let mut depth = 0usize;
    for (i, tok) in tokens.iter().enumerate() {
        if tok.is_open_brace() {
            depth += 1;
        } else if tok.is_close_brace() {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && tok.is_operator("=") && i > 0 {
            return Some(i);
        }
    }
    None
}
