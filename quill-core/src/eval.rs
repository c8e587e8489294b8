//! Expression evaluator.
//!
//! Turns the token run of one expression into a typed [`Value`] and the
//! [`RenderNode`] producing its C++ text. Binary operators are folded by
//! precedence over the processes of the expression; every process is an
//! operand chain handled by recursive descent on its leading and trailing
//! tokens.

mod access;
mod args;
mod binary;
mod call;
mod cast;
mod composite;
mod stmt;
mod subscript;
mod unary;

use std::sync::Arc;

use tracing::{debug, trace};

use crate::compat::types_are_compatible;
use crate::defs::{Def, Defmap, Var};
use crate::diagnostic::{Diagnostic, DiagnosticSink};
use crate::error::SemanticError;
use crate::lexer::{Token, TokenKind};
use crate::literal::{eval_literal, render_const};
use crate::render::{ExprModel, RenderNode, out_id};
use crate::span::{FileId, Span};
use crate::subparse::SubParser;
use crate::tokens::{is_operator_process, split_processes};
use crate::types::{DataType, StructRef, TypeShape};
use crate::value::Value;

pub use args::BoundArg;

/// Binding power of a binary operator; `None` for unknown operators.
pub fn precedence(op: &str) -> Option<u8> {
    Some(match op {
        "*" | "%" | "/" | ">>" | "<<" | "&" => 5,
        "+" | "-" | "|" | "^" => 4,
        "==" | "!=" | "<" | "<=" | ">" | ">=" => 3,
        "&&" => 2,
        "||" => 1,
        _ => return None,
    })
}

pub struct Evaluator<'a> {
    /// Table identifiers resolve against; swapped during `::` walks.
    defs: &'a Defmap,
    file: FileId,
    sub: &'a dyn SubParser,
    sink: DiagnosticSink,
    scopes: Vec<Vec<Arc<Var>>>,
    /// Set once the current chain reported an error.
    has_error: bool,
    allow_builtin: bool,
    /// Declared return type of the function literal being checked.
    ret_type: Option<DataType>,
}

impl<'a> Evaluator<'a> {
    pub fn new(defs: &'a Defmap, file: FileId, sub: &'a dyn SubParser, sink: DiagnosticSink) -> Self {
        Evaluator {
            defs,
            file,
            sub,
            sink,
            scopes: vec![Vec::new()],
            has_error: false,
            allow_builtin: true,
            ret_type: None,
        }
    }

    pub fn sink(&self) -> &DiagnosticSink {
        &self.sink
    }

    pub fn file(&self) -> FileId {
        self.file
    }

    // -----------------------------------------------------------------
    // Scopes
    // -----------------------------------------------------------------

    pub fn push_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    /// Close the innermost scope, warning about locals nothing read.
    pub fn pop_scope(&mut self) {
        if self.scopes.len() < 2 {
            return;
        }
        for var in self.scopes.pop().into_iter().flatten() {
            if !var.is_used() && var.name != "_" {
                self.sink.warning(SemanticError::UnusedVariable(var.name.clone()), var.span);
            }
        }
    }

    /// Declare a local in the innermost scope.
    pub fn declare(&mut self, var: Var) -> Arc<Var> {
        let var = Arc::new(var);
        if let Some(scope) = self.scopes.last_mut() {
            scope.push(Arc::clone(&var));
        }
        var
    }

    fn local(&self, name: &str) -> Option<Arc<Var>> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .find(|var| var.name == name)
            .cloned()
    }

    // -----------------------------------------------------------------
    // Diagnostics
    // -----------------------------------------------------------------

    /// Report once per chain.
    fn error(&mut self, error: SemanticError, span: Span) {
        if self.has_error {
            return;
        }
        self.has_error = true;
        self.sink.error(error, span);
    }

    /// Report regardless of the chain latch.
    fn report(&mut self, error: SemanticError, span: Span) {
        self.has_error = true;
        self.sink.error(error, span);
    }

    fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        if self.has_error {
            return;
        }
        self.has_error = true;
        self.sink.push(diagnostic);
    }

    // -----------------------------------------------------------------
    // Entry points
    // -----------------------------------------------------------------

    /// Evaluate a whole expression with a fresh error latch.
    pub fn eval_expr(&mut self, tokens: &[Token]) -> (Value, RenderNode) {
        debug!(tokens = tokens.len(), "evaluating expression");
        self.has_error = false;
        self.eval_tokens(tokens)
    }

    /// Evaluate a sub-expression on its own latch. The returned flag tells
    /// whether it reported an error; the outer latch absorbs it.
    fn eval_isolated(&mut self, tokens: &[Token]) -> (Value, RenderNode, bool) {
        let outer = std::mem::replace(&mut self.has_error, false);
        let (value, node) = self.eval_tokens(tokens);
        let failed = self.has_error;
        self.has_error = outer || failed;
        (value, node, failed)
    }

    fn eval_tokens(&mut self, tokens: &[Token]) -> (Value, RenderNode) {
        let span = tokens.first().map(|t| t.span).unwrap_or_default();
        if tokens.is_empty() {
            self.error(SemanticError::MissingExpr, span);
            return (Value::void(span), RenderNode::text(""));
        }
        let processes = match split_processes(tokens) {
            Ok(processes) => processes,
            Err(diagnostic) => {
                self.push_diagnostic(diagnostic);
                return (Value::void(span), RenderNode::text(""));
            }
        };
        if processes.len() == 1 {
            let mut model = ExprModel::new();
            let mut value = self.process(processes[0], &mut model);
            if value.ty.is_void() {
                value.constant = None;
            }
            let node = match &value.constant {
                Some(constant) => RenderNode::Text(render_const(constant, &value.ty)),
                None => model.into_node(),
            };
            return (value, node);
        }
        self.fold_processes(&processes)
    }

    /// Evaluate every operand, then fold the highest-precedence operator
    /// (leftmost on ties) until one operand is left.
    fn fold_processes(&mut self, processes: &[&[Token]]) -> (Value, RenderNode) {
        let span = processes[0].first().map(|t| t.span).unwrap_or_default();
        let mut operands = Vec::new();
        let mut operators = Vec::new();
        let mut failed = false;
        for process in processes {
            if is_operator_process(process) {
                operators.push(&process[0]);
                continue;
            }
            let (value, node, err) = self.eval_isolated(process);
            failed |= err;
            operands.push((value, node));
        }
        if failed || operands.len() != operators.len() + 1 {
            self.has_error = true;
            return (Value::void(span), RenderNode::text(""));
        }

        while !operators.is_empty() {
            let mut best: Option<(usize, u8)> = None;
            for (i, op) in operators.iter().enumerate() {
                let Some(level) = precedence(&op.text) else {
                    self.error(SemanticError::InvalidOperator, op.span);
                    return (Value::void(op.span), RenderNode::text(""));
                };
                if best.is_none_or(|(_, b)| level > b) {
                    best = Some((i, level));
                }
            }
            let Some((i, _)) = best else { break };
            let op = operators.remove(i);
            let right = operands.remove(i + 1);
            let left = operands.remove(i);
            trace!(op = %op.text, "folding binary operator");
            let folded = self.solve_binary(op, left, right);
            operands.insert(i, folded);
        }
        match operands.pop() {
            Some(result) => result,
            None => (Value::void(span), RenderNode::text("")),
        }
    }

    /// One operand chain.
    fn process(&mut self, tokens: &[Token], m: &mut ExprModel) -> Value {
        let mut value = self.process_inner(tokens, m);
        if value.ty.is_void() {
            value.constant = None;
        }
        value
    }

    fn process_inner(&mut self, tokens: &[Token], m: &mut ExprModel) -> Value {
        let Some(first) = tokens.first() else {
            self.error(SemanticError::MissingExpr, Span::default());
            return Value::void(Span::default());
        };
        if tokens.len() == 1 {
            return self.single(first, m);
        }
        if first.kind == TokenKind::Operator && first.text != "..." {
            return self.unary(tokens, m);
        }
        let Some(last) = tokens.last() else {
            return Value::void(first.span);
        };
        match last.kind {
            TokenKind::Ident => self.id_chain(tokens, m),
            TokenKind::Operator if last.text == "..." => self.spread(tokens, m),
            TokenKind::RParen => self.paren_range(tokens, m),
            TokenKind::RBrace => self.brace_range(tokens, m),
            TokenKind::RBracket => self.bracket_range(tokens, m),
            _ => {
                self.error(SemanticError::InvalidSyntax, first.span);
                Value::void(first.span)
            }
        }
    }

    fn single(&mut self, tok: &Token, m: &mut ExprModel) -> Value {
        match tok.kind {
            TokenKind::Literal => match eval_literal(tok) {
                Ok((value, node)) => {
                    m.push(node);
                    value
                }
                Err(err) => {
                    self.error(err, tok.span);
                    Value::void(tok.span)
                }
            },
            TokenKind::Ident | TokenKind::SelfKw => self.identifier(tok, m),
            _ => {
                self.error(SemanticError::InvalidSyntax, tok.span);
                Value::void(tok.span)
            }
        }
    }

    /// Locals first, then the active table, then builtins.
    fn lookup(&self, name: &str) -> Option<Def> {
        if let Some(var) = self.local(name) {
            var.mark_used();
            return Some(Def::Global(var));
        }
        if let Some(def) = self.defs.find(name, Some(self.file)) {
            return Some(def);
        }
        if self.allow_builtin {
            return Defmap::builtin().find(name, None);
        }
        None
    }

    fn identifier(&mut self, tok: &Token, m: &mut ExprModel) -> Value {
        let name = tok.text.as_str();
        let Some(def) = self.lookup(name) else {
            self.error(SemanticError::IdNotExist(name.to_string()), tok.span);
            return Value::void(tok.span);
        };
        match def {
            Def::Global(var) => {
                let ty = self.resolve_type(&var.ty, false).unwrap_or_else(|| var.ty.clone());
                let mut value = Value::of(ty, tok.span);
                value.lvalue = true;
                value.constant = var.constant.clone();
                if tok.kind == TokenKind::SelfKw && var.ty.is_ptr() {
                    m.push_text("this");
                } else {
                    m.push_text(var.out_name());
                }
                value
            }
            Def::Function(f) => {
                m.push_text(f.out_name());
                let ty = f.data_type();
                let ty = if f.sig.generics.is_empty() {
                    self.resolve_type(&ty, false).unwrap_or(ty)
                } else {
                    ty
                };
                Value::of(ty, tok.span)
            }
            Def::Enum(e) => {
                m.push_text(out_id(&e.name, e.span));
                let mut value = Value::of(DataType::new(TypeShape::Enum(Arc::clone(&e))), tok.span);
                value.is_type = true;
                value
            }
            Def::Struct(s) => self.struct_type_value(s, Vec::new(), tok.span, m),
            Def::Trait(t) => {
                m.push_text(out_id(&t.name, t.span));
                let mut value = Value::of(DataType::new(TypeShape::Trait(t)), tok.span);
                value.is_type = true;
                value
            }
            Def::TypeAlias(alias) => match self.resolve_type(&alias.ty, true) {
                Some(ty) => match &ty.resolve_alias().shape {
                    TypeShape::Struct(s) => {
                        self.struct_type_value(Arc::clone(&s.def), s.generics.clone(), tok.span, m)
                    }
                    _ => {
                        self.error(SemanticError::InvalidExpr, tok.span);
                        Value::void(tok.span)
                    }
                },
                None => Value::void(tok.span),
            },
        }
    }

    fn struct_type_value(
        &mut self,
        def: Arc<crate::defs::StructDef>,
        generics: Vec<DataType>,
        span: Span,
        m: &mut ExprModel,
    ) -> Value {
        m.push_text(out_id(&def.name, def.span));
        let ty = DataType::new(TypeShape::Struct(StructRef { def, generics }));
        let mut value = Value::of(ty, span);
        value.is_type = true;
        value
    }

    /// `x...`: a slice spread into a variadic parameter.
    fn spread(&mut self, tokens: &[Token], m: &mut ExprModel) -> Value {
        let op = &tokens[tokens.len() - 1];
        let mut value = self.process(&tokens[..tokens.len() - 1], m);
        let elem = value.ty.resolve_alias().component().cloned().filter(|_| value.ty.is_variadicable());
        match elem {
            Some(elem) => {
                value.ty = elem;
                value.variadic = true;
                value.constant = None;
            }
            None => self.error(
                SemanticError::VariadicWithNonVariadicable(value.ty.kind_text()),
                op.span,
            ),
        }
        value
    }

    // -----------------------------------------------------------------
    // Types
    // -----------------------------------------------------------------

    /// Resolve identifier types against the definition tables. Errors are
    /// only reported with `report` set.
    pub fn resolve_type(&mut self, ty: &DataType, report: bool) -> Option<DataType> {
        if ty.original.is_some() {
            return Some(ty.clone());
        }
        let shape = match &ty.shape {
            TypeShape::Prim(_) | TypeShape::Enum(_) | TypeShape::Trait(_) => return Some(ty.clone()),
            TypeShape::Id { name, generics } => return self.resolve_named(ty, name, generics, report),
            TypeShape::Slice(elem) => TypeShape::Slice(Box::new(self.resolve_type(elem, report)?)),
            TypeShape::Array { elem, size } => TypeShape::Array {
                elem: Box::new(self.resolve_type(elem, report)?),
                size: *size,
            },
            TypeShape::Map { key, value } => TypeShape::Map {
                key: Box::new(self.resolve_type(key, report)?),
                value: Box::new(self.resolve_type(value, report)?),
            },
            TypeShape::Func(sig) => {
                let mut params = Vec::with_capacity(sig.params.len());
                for param in &sig.params {
                    let mut param = param.clone();
                    param.ty = self.resolve_type(&param.ty, report)?;
                    params.push(param);
                }
                let ret = self.resolve_type(&sig.ret, report)?;
                TypeShape::Func(Arc::new(crate::types::FuncSig {
                    params,
                    ret,
                    generics: sig.generics.clone(),
                }))
            }
            TypeShape::Tuple(types) => {
                let mut resolved = Vec::with_capacity(types.len());
                for t in types {
                    resolved.push(self.resolve_type(t, report)?);
                }
                TypeShape::Tuple(resolved)
            }
            TypeShape::Struct(s) => {
                let mut generics = Vec::with_capacity(s.generics.len());
                for g in &s.generics {
                    generics.push(self.resolve_type(g, report)?);
                }
                TypeShape::Struct(StructRef {
                    def: Arc::clone(&s.def),
                    generics,
                })
            }
        };
        Some(DataType {
            shape,
            ..ty.clone()
        })
    }

    fn resolve_named(
        &mut self,
        ty: &DataType,
        name: &str,
        generics: &[DataType],
        report: bool,
    ) -> Option<DataType> {
        let mut table = self.defs;
        let mut segments: Vec<&str> = name.split("::").collect();
        let base = segments.pop().unwrap_or(name);
        for ns in &segments {
            match table.namespace(ns) {
                Some(inner) => table = &**inner,
                None => {
                    if report {
                        self.error(SemanticError::NamespaceNotExist((*ns).to_string()), ty.span);
                    }
                    return None;
                }
            }
        }
        let found = table.find(base, Some(self.file)).or_else(|| {
            (segments.is_empty() && self.allow_builtin)
                .then(|| Defmap::builtin().find(base, None))
                .flatten()
        });
        let Some(def) = found else {
            if report {
                self.error(SemanticError::IdNotExist(name.to_string()), ty.span);
            }
            return None;
        };
        let mut resolved_generics = Vec::with_capacity(generics.len());
        for g in generics {
            resolved_generics.push(self.resolve_type(g, report)?);
        }
        let shape = match def {
            Def::Struct(def) => {
                if def.generics.len() != resolved_generics.len() {
                    if report {
                        self.error(
                            SemanticError::GenericsOverflow {
                                expected: def.generics.len(),
                                found: resolved_generics.len(),
                            },
                            ty.span,
                        );
                    }
                    return None;
                }
                TypeShape::Struct(StructRef {
                    def,
                    generics: resolved_generics,
                })
            }
            Def::Enum(def) => TypeShape::Enum(def),
            Def::Trait(def) => TypeShape::Trait(def),
            Def::TypeAlias(alias) => {
                let target = self.resolve_type(&alias.ty, report)?.resolve_alias();
                return Some(DataType {
                    span: ty.span,
                    ptr: ty.ptr,
                    shape: TypeShape::Id {
                        name: name.to_string(),
                        generics: Vec::new(),
                    },
                    original: Some(Box::new(target)),
                });
            }
            Def::Global(_) | Def::Function(_) => {
                if report {
                    self.error(SemanticError::InvalidType(name.to_string()), ty.span);
                }
                return None;
            }
        };
        Some(DataType {
            span: ty.span,
            ptr: ty.ptr,
            shape,
            original: None,
        })
    }

    /// Parse and resolve a type spanning exactly `tokens`.
    pub fn parse_type(&mut self, tokens: &[Token], report: bool) -> Option<DataType> {
        let mut index = 0;
        let parsed = match self.sub.data_type(tokens, &mut index) {
            Ok(ty) => ty,
            Err(diagnostic) => {
                if report {
                    self.push_diagnostic(diagnostic);
                }
                return None;
            }
        };
        if index != tokens.len() {
            if report {
                let span = tokens.get(index).map(|t| t.span).unwrap_or_default();
                self.error(SemanticError::InvalidSyntax, span);
            }
            return None;
        }
        self.resolve_type(&parsed, report)
    }

    // -----------------------------------------------------------------
    // Assignment checks
    // -----------------------------------------------------------------

    /// Whether `value` may be stored into `target`. Constant numerics are
    /// accepted when they fit the target width.
    pub fn check_assign(&mut self, target: &DataType, value: &Value, span: Span) -> bool {
        let target_resolved = target.resolve_alias();
        if let (Some(constant), Some(prim)) = (value.numeric_constant(), target_resolved.as_prim()) {
            if prim.is_numeric() && value.ty.is_numeric() {
                if constant.fits(prim) {
                    return true;
                }
                if prim.is_integer() && value.ty.is_integer() {
                    self.report(
                        SemanticError::ConstOverflow {
                            value: constant.to_string(),
                            kind: target.kind_text(),
                        },
                        span,
                    );
                    return false;
                }
            }
        }
        if target_resolved.is_any() || types_are_compatible(target, &value.ty, false) {
            return true;
        }
        self.report(
            SemanticError::IncompatibleDatatype {
                expected: target.kind_text(),
                given: value.ty.kind_text(),
            },
            span,
        );
        false
    }

    /// Re-render a constant numeric in the type it is stored into.
    pub fn coerce_node(&self, target: &DataType, value: &Value, node: RenderNode) -> RenderNode {
        let target = target.resolve_alias();
        match (value.numeric_constant(), target.as_prim()) {
            (Some(constant), Some(prim)) if prim.is_numeric() && constant.fits(prim) => {
                RenderNode::Text(render_const(&constant.cast_to(prim), &target))
            }
            _ => node,
        }
    }
}

/// Evaluate `src` as one expression of file 0 against `defs`.
#[cfg(test)]
fn eval_source(defs: &Defmap, src: &str) -> (Value, String, Vec<Diagnostic>) {
    let sink = DiagnosticSink::new();
    let mut ev = Evaluator::new(defs, FileId(0), &crate::subparse::TokenSubParser, sink.clone());
    let lexed = crate::lexer::lex(FileId(0), src);
    let (value, node) = ev.eval_expr(lexed.significant());
    (value, node.to_string(), sink.take())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::subparse::TokenSubParser;
    use crate::types::Prim;
    use crate::value::Const;

    use super::eval_source as eval;

    #[test]
    fn folds_by_precedence() {
        let (v, code, diags) = eval(&Defmap::new(), "2 + 3 * 4");
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(v.constant, Some(Const::Int(14)));
        assert_eq!(code, "i32{14}");
    }

    #[test]
    fn equal_precedence_folds_left_first() {
        let (v, _, _) = eval(&Defmap::new(), "10 - 4 - 3");
        assert_eq!(v.constant, Some(Const::Int(3)));
    }

    #[test]
    fn renders_non_constant_operands_in_parentheses() {
        let mut defs = Defmap::new();
        defs.push(Var::new("x", DataType::prim(Prim::Int)).with_span(Span::new(FileId(0), 0, 1)));
        let (v, code, diags) = eval(&defs, "x * 2 + 1");
        assert!(diags.is_empty(), "{diags:?}");
        assert!(v.ty.is_prim(Prim::Int));
        assert_eq!(code, "((x_0 * int{2}) + int{1})");
    }

    #[test]
    fn unknown_identifier_is_reported_once() {
        let (_, _, diags) = eval(&Defmap::new(), "missing.a.b");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].key(), "id_noexist");
    }

    #[test]
    fn locals_shadow_globals() {
        let mut defs = Defmap::new();
        defs.push(Var::new("x", DataType::prim(Prim::Str)).with_span(Span::new(FileId(0), 0, 1)));
        let sink = DiagnosticSink::new();
        let mut ev = Evaluator::new(&defs, FileId(0), &TokenSubParser, sink.clone());
        ev.push_scope();
        ev.declare(Var::new("x", DataType::prim(Prim::F64)).with_span(Span::new(FileId(0), 9, 10)));
        let lexed = lex(FileId(0), "x");
        let (v, _) = ev.eval_expr(lexed.significant());
        assert!(v.ty.is_prim(Prim::F64));
        ev.pop_scope();
        let (v, _) = ev.eval_expr(lexed.significant());
        assert!(v.ty.is_str());
    }

    #[test]
    fn pointer_self_renders_this() {
        let defs = Defmap::new();
        let sink = DiagnosticSink::new();
        let mut ev = Evaluator::new(&defs, FileId(0), &TokenSubParser, sink);
        ev.declare(Var::new("self", DataType::prim(Prim::Int).with_ptr(1)));
        let lexed = lex(FileId(0), "self");
        let (_, node) = ev.eval_expr(lexed.significant());
        assert_eq!(node.to_string(), "this");
    }
}
