//! Binding call-site arguments to parameters.

use tracing::debug;

use crate::compat::types_are_compatible;
use crate::error::SemanticError;
use crate::lexer::{Token, TokenKind};
use crate::render::RenderNode;
use crate::span::Span;
use crate::tokens::split_parts;
use crate::types::{DataType, Param, TypeShape};
use crate::value::Value;

use super::Evaluator;

/// An argument bound to its parameter, in parameter order.
#[derive(Debug, Clone)]
pub struct BoundArg {
    pub param: String,
    /// Type the parameter receives after generic substitution; `[]T` for
    /// variadics.
    pub ty: DataType,
    pub node: RenderNode,
}

pub(super) enum Binding {
    Args(Vec<BoundArg>),
    /// A single tuple-valued argument spread over every parameter.
    Expanded(RenderNode),
}

struct CallArg<'t> {
    name: Option<&'t Token>,
    value: Value,
    node: RenderNode,
}

/// Generic parameter bindings collected while matching arguments.
pub(super) type Generics = Vec<(String, DataType)>;

/// Bind generic parameter names occurring in `param` from the shape of
/// `arg`. The first binding of a name wins.
fn infer(param: &DataType, arg: &DataType, generics: &[String], bindings: &mut Generics) {
    match (&param.shape, &arg.shape) {
        (TypeShape::Id { name, generics: args }, _) if args.is_empty() && generics.contains(name) => {
            if bindings.iter().any(|(bound, _)| bound == name) {
                return;
            }
            if arg.ptr < param.ptr {
                if arg.original.is_some() {
                    infer(param, &arg.resolve_alias(), generics, bindings);
                }
                return;
            }
            let mut bound = arg.clone();
            bound.ptr -= param.ptr;
            bindings.push((name.clone(), bound));
        }
        (_, TypeShape::Id { .. }) if arg.original.is_some() => {
            infer(param, &arg.resolve_alias(), generics, bindings)
        }
        (TypeShape::Slice(p), TypeShape::Slice(a)) => infer(p, a, generics, bindings),
        (TypeShape::Array { elem: p, .. }, TypeShape::Array { elem: a, .. }) => infer(p, a, generics, bindings),
        (TypeShape::Map { key: pk, value: pv }, TypeShape::Map { key: ak, value: av }) => {
            infer(pk, ak, generics, bindings);
            infer(pv, av, generics, bindings);
        }
        (TypeShape::Func(p), TypeShape::Func(a)) => {
            for (pp, ap) in p.params.iter().zip(&a.params) {
                infer(&pp.ty, &ap.ty, generics, bindings);
            }
            infer(&p.ret, &a.ret, generics, bindings);
        }
        (TypeShape::Tuple(p), TypeShape::Tuple(a)) => {
            for (pt, at) in p.iter().zip(a) {
                infer(pt, at, generics, bindings);
            }
        }
        (TypeShape::Struct(p), TypeShape::Struct(a)) => {
            for (pt, at) in p.generics.iter().zip(&a.generics) {
                infer(pt, at, generics, bindings);
            }
        }
        _ => {}
    }
}

fn slice_literal(elem: &DataType, elems: Vec<RenderNode>) -> RenderNode {
    RenderNode::SliceLit {
        ty: DataType::slice_of(elem.clone()).render(),
        elems,
    }
}

impl Evaluator<'_> {
    /// Bind arguments of a non-generic parameter list.
    pub(super) fn bind_positional(&mut self, params: &[Param], tokens: &[Token], span: Span) -> Option<Vec<BoundArg>> {
        let mut bindings = Generics::new();
        match self.bind_args(params, &[], &mut bindings, tokens, span)? {
            Binding::Args(args) => Some(args),
            Binding::Expanded(node) => Some(vec![BoundArg {
                param: String::new(),
                ty: DataType::void(),
                node,
            }]),
        }
    }

    /// Match the comma-separated arguments in `tokens` to `params`.
    ///
    /// Arguments are positional unless written `name: expr`. A variadic
    /// parameter takes every following positional argument, folded into one
    /// slice literal, or a single `xs...` spread as is. Generic names in
    /// `generics` not already in `bindings` are inferred from the
    /// arguments.
    pub(super) fn bind_args(
        &mut self,
        params: &[Param],
        generics: &[String],
        bindings: &mut Generics,
        tokens: &[Token],
        span: Span,
    ) -> Option<Binding> {
        let args = self.eval_args(tokens, span)?;
        debug!(params = params.len(), args = args.len(), "binding call arguments");

        if let [arg] = args.as_slice() {
            if arg.name.is_none() && params.len() > 1 {
                if let Some(types) = arg.value.ty.tuple_types() {
                    return self.expand_tuple(params, generics, bindings, types, arg, span);
                }
            }
        }

        let mut slots: Vec<Option<BoundArg>> = params.iter().map(|_| None).collect();
        let mut next = 0usize;
        let mut args = args.into_iter().peekable();
        while let Some(arg) = args.next() {
            let index = match arg.name {
                Some(name) => {
                    let Some(index) = params.iter().position(|p| p.name == name.text) else {
                        self.report(SemanticError::IdNotExist(name.text.clone()), name.span);
                        return None;
                    };
                    if slots[index].is_some() {
                        self.report(SemanticError::AlreadyHasExpr(name.text.clone()), name.span);
                        return None;
                    }
                    index
                }
                None => {
                    if next >= params.len() {
                        self.report(SemanticError::ArgumentOverflow, arg.value.span);
                        return None;
                    }
                    next += 1;
                    if slots[next - 1].is_some() {
                        let param = params[next - 1].name.clone();
                        self.report(SemanticError::AlreadyHasExpr(param), arg.value.span);
                        return None;
                    }
                    next - 1
                }
            };
            let param = &params[index];

            if !param.variadic {
                if arg.value.variadic {
                    self.report(SemanticError::VariadicWithNonVariadicable(param.ty.kind_text()), arg.value.span);
                    return None;
                }
                let node = self.bind_one(param, generics, bindings, arg)?;
                slots[index] = Some(BoundArg {
                    param: param.name.clone(),
                    ty: param.ty.substitute(bindings),
                    node,
                });
                continue;
            }

            // variadic: gather until the next named argument
            let mut group = vec![arg];
            if group[0].name.is_none() {
                while let Some(more) = args.next_if(|a| a.name.is_none()) {
                    group.push(more);
                }
            }
            let node = self.bind_variadic(param, generics, bindings, group)?;
            slots[index] = Some(BoundArg {
                param: param.name.clone(),
                ty: param.received_type().substitute(bindings),
                node,
            });
        }

        for g in generics {
            if !bindings.iter().any(|(bound, _)| bound == g) {
                self.report(SemanticError::GenericsNotInferred(g.clone()), span);
                return None;
            }
        }

        let mut bound = Vec::with_capacity(params.len());
        for (param, slot) in params.iter().zip(slots) {
            match slot {
                Some(arg) => bound.push(arg),
                None if param.variadic => {
                    let elem = param.ty.substitute(bindings);
                    bound.push(BoundArg {
                        param: param.name.clone(),
                        ty: DataType::slice_of(elem.clone()),
                        node: slice_literal(&elem, Vec::new()),
                    });
                }
                None => {
                    self.report(SemanticError::MissingExprFor(param.name.clone()), span);
                    return None;
                }
            }
        }
        Some(Binding::Args(bound))
    }

    fn eval_args<'t>(&mut self, tokens: &'t [Token], span: Span) -> Option<Vec<CallArg<'t>>> {
        let mut args = Vec::new();
        let mut failed = false;
        for part in split_parts(tokens, TokenKind::Comma) {
            let (name, expr) = match part {
                [name, colon, rest @ ..] if name.kind == TokenKind::Ident && colon.kind == TokenKind::Colon => {
                    (Some(name), rest)
                }
                _ => (None, part),
            };
            if expr.is_empty() {
                let at = part.first().map(|t| t.span).unwrap_or(span);
                self.report(SemanticError::MissingExpr, at);
                return None;
            }
            let (value, node, err) = self.eval_isolated(expr);
            failed |= err;
            args.push(CallArg { name, value, node });
        }
        if failed {
            return None;
        }
        Some(args)
    }

    fn bind_one(
        &mut self,
        param: &Param,
        generics: &[String],
        bindings: &mut Generics,
        arg: CallArg<'_>,
    ) -> Option<RenderNode> {
        infer(&param.ty, &arg.value.ty, generics, bindings);
        let target = param.ty.substitute(bindings);
        if !self.check_assign(&target, &arg.value, arg.value.span) {
            return None;
        }
        Some(self.coerce_node(&target, &arg.value, arg.node))
    }

    fn bind_variadic(
        &mut self,
        param: &Param,
        generics: &[String],
        bindings: &mut Generics,
        group: Vec<CallArg<'_>>,
    ) -> Option<RenderNode> {
        if group.len() == 1 && group[0].value.variadic {
            let arg = group.into_iter().next()?;
            infer(&param.ty, &arg.value.ty, generics, bindings);
            let target = param.ty.substitute(bindings);
            if !target.is_any() && !types_are_compatible(&target, &arg.value.ty, false) {
                self.report(
                    SemanticError::IncompatibleDatatype {
                        expected: target.kind_text(),
                        given: arg.value.ty.kind_text(),
                    },
                    arg.value.span,
                );
                return None;
            }
            return Some(arg.node);
        }
        if let Some(spread) = group.iter().find(|a| a.value.variadic) {
            self.report(SemanticError::MoreArgsWithVariadiced, spread.value.span);
            return None;
        }
        let mut elems = Vec::with_capacity(group.len());
        for arg in group {
            elems.push(self.bind_one(param, generics, bindings, arg)?);
        }
        Some(slice_literal(&param.ty.substitute(bindings), elems))
    }

    /// Spread a tuple-valued argument over the parameter list. Component
    /// checks run on scoped threads and report straight into the sink.
    fn expand_tuple(
        &mut self,
        params: &[Param],
        generics: &[String],
        bindings: &mut Generics,
        types: &[DataType],
        arg: &CallArg<'_>,
        span: Span,
    ) -> Option<Binding> {
        if types.len() > params.len() {
            self.report(SemanticError::ArgumentOverflow, arg.value.span);
            return None;
        }
        if types.len() < params.len() {
            self.report(SemanticError::MissingExprFor(params[types.len()].name.clone()), span);
            return None;
        }
        for (param, ty) in params.iter().zip(types) {
            infer(&param.ty, ty, generics, bindings);
        }
        let targets: Vec<DataType> = params.iter().map(|p| p.received_type().substitute(bindings)).collect();

        debug!(components = types.len(), "checking expanded tuple argument");
        let before = self.sink.len();
        let at = arg.value.span;
        std::thread::scope(|scope| {
            for (target, given) in targets.iter().zip(types) {
                let sink = self.sink.clone();
                scope.spawn(move || {
                    if target.is_any() || types_are_compatible(target, given, false) {
                        return;
                    }
                    sink.error(
                        SemanticError::IncompatibleDatatype {
                            expected: target.kind_text(),
                            given: given.kind_text(),
                        },
                        at,
                    );
                });
            }
        });
        if self.sink.len() != before {
            self.has_error = true;
            return None;
        }
        for g in generics {
            if !bindings.iter().any(|(bound, _)| bound == g) {
                self.report(SemanticError::GenericsNotInferred(g.clone()), span);
                return None;
            }
        }
        Some(Binding::Expanded(arg.node.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FuncSig, Prim};

    #[test]
    fn infers_through_containers_and_pointers() {
        let generics = vec!["T".to_string(), "U".to_string()];
        let mut bindings = Generics::new();
        let param = DataType::map_of(DataType::id("T"), DataType::slice_of(DataType::id("U").with_ptr(1)));
        let arg = DataType::map_of(
            DataType::prim(Prim::Str),
            DataType::slice_of(DataType::prim(Prim::F64).with_ptr(2)),
        );
        infer(&param, &arg, &generics, &mut bindings);
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].1.kind_text(), "str");
        assert_eq!(bindings[1].1.kind_text(), "*f64");
    }

    #[test]
    fn first_binding_wins() {
        let generics = vec!["T".to_string()];
        let mut bindings = Generics::new();
        let sig = FuncSig::new(
            vec![Param::new("a", DataType::id("T")), Param::new("b", DataType::id("T"))],
            DataType::void(),
        );
        infer(&sig.params[0].ty, &DataType::prim(Prim::Int), &generics, &mut bindings);
        infer(&sig.params[1].ty, &DataType::prim(Prim::Str), &generics, &mut bindings);
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].1.kind_text(), "int");
    }
}
