use std::sync::Arc;

use tracing::trace;

use crate::defs::{Def, str_conversion_sig};
use crate::error::SemanticError;
use crate::lexer::{Token, TokenKind};
use crate::render::{ExprModel, RenderNode};
use crate::span::Span;
use crate::tokens::{inner, range_last, split_parts};
use crate::types::{DataType, FuncSig, Prim};
use crate::value::Value;

use super::Evaluator;
use super::args::{Binding, Generics};

impl Evaluator<'_> {
    /// A chain ending in `)`: a cast, a parenthesized expression or a call.
    pub(super) fn paren_range(&mut self, tokens: &[Token], m: &mut ExprModel) -> Value {
        let span = tokens[0].span;
        if tokens[0].kind == TokenKind::LParen {
            if let Some(value) = self.try_cast(tokens, m) {
                return value;
            }
        }
        let (before, range) = range_last(tokens);
        if range.first().is_none_or(|t| t.kind != TokenKind::LParen) {
            self.error(SemanticError::InvalidSyntax, span);
            return Value::void(span);
        }
        let args = inner(range);
        if before.is_empty() {
            return self.parenthesized(args, range[0].span, m);
        }

        if let [tok] = before {
            if let Some(value) = self.conversion(tok, args, m) {
                return value;
            }
        }

        let (callee_tokens, explicit) = self.split_generics(before);
        let mut callee_model = ExprModel::new();
        let callee = self.process(callee_tokens, &mut callee_model);
        if self.has_error {
            return Value::void(span);
        }
        let Some(sig) = callee.ty.resolve_alias().func_sig().cloned() else {
            self.error(SemanticError::InvalidExpr, callee.span);
            return Value::void(span);
        };
        self.call_func(&sig, callee_model.into_node(), explicit, args, range[0].span, m)
    }

    fn parenthesized(&mut self, tokens: &[Token], span: Span, m: &mut ExprModel) -> Value {
        if tokens.is_empty() {
            self.error(SemanticError::MissingExpr, span);
            return Value::void(span);
        }
        let (value, node) = self.eval_tokens(tokens);
        if matches!(node, RenderNode::Binary { .. }) || value.is_constant() {
            m.push(node);
        } else {
            m.push_text("(");
            m.push(node);
            m.push_text(")");
        }
        value
    }

    /// `T(x)` on a primitive or alias is a cast; `str(x)` renders through
    /// the runtime's string conversion.
    fn conversion(&mut self, tok: &Token, args: &[Token], m: &mut ExprModel) -> Option<Value> {
        let target = match tok.kind {
            TokenKind::DataType => DataType::prim(Prim::from_name(&tok.text)?).with_span(tok.span),
            TokenKind::Ident if self.local(&tok.text).is_none() => match self.lookup(&tok.text) {
                Some(Def::TypeAlias(_)) => self.parse_type(std::slice::from_ref(tok), true)?,
                _ => return None,
            },
            _ => return None,
        };
        if target.is_str() {
            let sig = Arc::new(str_conversion_sig());
            let callee = RenderNode::text("tostr");
            return Some(self.call_func(&sig, callee, Vec::new(), args, tok.span, m));
        }
        Some(self.cast_expr(target, args, tok.span, m))
    }

    /// Split `f[T, U]` into the callee and its explicit generic arguments.
    /// A trailing bracket that does not hold types is an index instead.
    fn split_generics<'t>(&mut self, tokens: &'t [Token]) -> (&'t [Token], Vec<DataType>) {
        let (callee, range) = range_last(tokens);
        if callee.is_empty() || range.first().is_none_or(|t| t.kind != TokenKind::LBracket) {
            return (tokens, Vec::new());
        }
        let mut generics = Vec::new();
        for part in split_parts(inner(range), TokenKind::Comma) {
            match self.parse_type(part, false) {
                Some(ty) => generics.push(ty),
                None => return (tokens, Vec::new()),
            }
        }
        if generics.is_empty() {
            return (tokens, Vec::new());
        }
        (callee, generics)
    }

    /// Bind and render a call of a value of function type `sig`.
    pub(super) fn call_func(
        &mut self,
        sig: &Arc<FuncSig>,
        callee: RenderNode,
        explicit: Vec<DataType>,
        args: &[Token],
        span: Span,
        m: &mut ExprModel,
    ) -> Value {
        if !explicit.is_empty() && explicit.len() != sig.generics.len() {
            self.error(
                SemanticError::GenericsOverflow {
                    expected: sig.generics.len(),
                    found: explicit.len(),
                },
                span,
            );
            return Value::void(span);
        }
        let mut bindings: Generics = sig.generics.iter().cloned().zip(explicit).collect();
        let Some(binding) = self.bind_args(&sig.params, &sig.generics, &mut bindings, args, span) else {
            self.has_error = true;
            return Value::void(span);
        };
        trace!(generics = bindings.len(), "call bound");

        let generics: Vec<String> = sig
            .generics
            .iter()
            .filter_map(|g| bindings.iter().find(|(name, _)| name == g))
            .map(|(_, ty)| ty.render())
            .collect();
        let node = match binding {
            Binding::Args(bound) => RenderNode::Call {
                callee: Box::new(callee),
                generics,
                args: bound.into_iter().map(|arg| arg.node).collect(),
            },
            Binding::Expanded(tuple) => {
                let callee = if generics.is_empty() {
                    callee
                } else {
                    RenderNode::Seq(vec![callee, RenderNode::Text(format!("<{}>", generics.join(",")))])
                };
                RenderNode::Call {
                    callee: Box::new(RenderNode::text("tuple_as_args")),
                    generics: Vec::new(),
                    args: vec![callee, tuple],
                }
            }
        };
        m.push(node);

        let ret = sig.ret.substitute(&bindings).with_span(span);
        let mut value = Value::of(ret, span);
        value.lvalue = value.ty.is_lvalue_type();
        value
    }
}

#[cfg(test)]
mod tests {
    use crate::defs::{Defmap, FuncDef, Var};
    use crate::eval::eval_source;
    use crate::span::{FileId, Span};
    use crate::types::{DataType, FuncSig, Param, Prim};

    fn span() -> Span {
        Span::new(FileId(0), 0, 1)
    }

    fn keys(defs: &Defmap, src: &str) -> Vec<&'static str> {
        eval_source(defs, src).2.iter().map(|d| d.key()).collect()
    }

    fn defs() -> Defmap {
        let t = DataType::id("T");
        let mut defs = Defmap::new();
        defs.push(
            FuncDef::new(
                "first",
                FuncSig::new(vec![Param::new("xs", DataType::slice_of(t.clone()))], t.clone())
                    .with_generics(vec!["T".to_string()]),
            )
            .with_span(span()),
        )
        .push(
            FuncDef::new("make", FuncSig::new(Vec::new(), t).with_generics(vec!["T".to_string()]))
                .with_span(span()),
        )
        .push(Var::new("names", DataType::slice_of(DataType::prim(Prim::Str))).with_span(span()));
        defs
    }

    #[test]
    fn generics_are_inferred_from_arguments() {
        let (value, code, diags) = eval_source(&defs(), "first(names)");
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(code, "first_0<str>(names_0)");
        assert!(value.ty.is_str());
    }

    #[test]
    fn explicit_generics_take_precedence() {
        let (value, code, diags) = eval_source(&defs(), "make[f32]()");
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(code, "make_0<f32>()");
        assert!(value.ty.is_prim(Prim::F32));

        assert_eq!(keys(&defs(), "first[int](names)"), vec!["incompatible_datatype"]);
        assert_eq!(keys(&defs(), "make[int, str]()"), vec!["generics_overflow"]);
        assert_eq!(keys(&defs(), "make()"), vec!["generics_not_inferred"]);
    }

    #[test]
    fn primitive_names_convert_their_argument() {
        let defs = defs();
        assert_eq!(eval_source(&defs, "u8(300)").1, "u8{44}");
        assert!(eval_source(&defs, "str(names)").1.starts_with("tostr("));
    }
}
