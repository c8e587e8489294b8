use std::sync::Arc;

use crate::defs::{Def, Defmap, map_members, prim_statics, sequence_members, str_members};
use crate::error::SemanticError;
use crate::lexer::{Token, TokenKind};
use crate::literal::render_const;
use crate::render::{ExprModel, RenderNode, out_id};
use crate::types::{DataType, Prim, TypeShape};
use crate::value::Value;

use super::Evaluator;

/// Member table of a value, borrowed from a static table or built for the
/// value's type.
enum Members<'t> {
    Static(&'t Defmap),
    Owned(Defmap),
}

impl Members<'_> {
    fn table(&self) -> &Defmap {
        match self {
            Members::Static(defs) => defs,
            Members::Owned(defs) => defs,
        }
    }
}

impl<'a> Evaluator<'a> {
    /// A chain ending in an identifier: `a.b`, `.b` or `ns::b`.
    pub(super) fn id_chain(&mut self, tokens: &[Token], m: &mut ExprModel) -> Value {
        let name = &tokens[tokens.len() - 1];
        let left = &tokens[..tokens.len() - 2];
        match tokens[tokens.len() - 2].kind {
            TokenKind::Dot => self.sub_id(left, name, m),
            TokenKind::DoubleColon => self.namespace_id(tokens, m),
            _ => {
                self.error(SemanticError::InvalidSyntax, name.span);
                Value::void(name.span)
            }
        }
    }

    /// `a::b::c` resolves `c` in nested namespace tables. Builtins are not
    /// reachable through a namespace.
    fn namespace_id(&mut self, tokens: &[Token], m: &mut ExprModel) -> Value {
        let mut table: &'a Defmap = self.defs;
        let last = &tokens[tokens.len() - 1];
        for pair in tokens[..tokens.len() - 1].chunks(2) {
            let [ns, sep] = pair else {
                self.error(SemanticError::InvalidSyntax, last.span);
                return Value::void(last.span);
            };
            if ns.kind != TokenKind::Ident || sep.kind != TokenKind::DoubleColon {
                self.error(SemanticError::InvalidSyntax, ns.span);
                return Value::void(ns.span);
            }
            match table.namespace(&ns.text) {
                Some(inner) => table = &**inner,
                None => {
                    self.error(SemanticError::NamespaceNotExist(ns.text.clone()), ns.span);
                    return Value::void(ns.span);
                }
            }
        }
        let saved_defs = std::mem::replace(&mut self.defs, table);
        let saved_builtin = std::mem::replace(&mut self.allow_builtin, false);
        let saved_scopes = std::mem::replace(&mut self.scopes, vec![Vec::new()]);
        let value = self.identifier(last, m);
        self.scopes = saved_scopes;
        self.allow_builtin = saved_builtin;
        self.defs = saved_defs;
        value
    }

    fn sub_id(&mut self, left: &[Token], name: &Token, m: &mut ExprModel) -> Value {
        if left.is_empty() {
            let self_tok = Token::new(TokenKind::SelfKw, "self", name.span);
            return self.member_of(std::slice::from_ref(&self_tok), name, m);
        }
        if let [tok] = left {
            if let Some(prim) = self.static_prim(tok) {
                return self.prim_static(prim, tok, name, m);
            }
        }
        self.member_of(left, name, m)
    }

    /// Primitive named directly or through an alias, for `T.max` style access.
    fn static_prim(&self, tok: &Token) -> Option<Prim> {
        match tok.kind {
            TokenKind::DataType => Prim::from_name(&tok.text),
            TokenKind::Ident if self.local(&tok.text).is_none() => match self.lookup(&tok.text) {
                Some(Def::TypeAlias(alias)) => alias.ty.resolve_alias().as_prim(),
                _ => None,
            },
            _ => None,
        }
    }

    fn prim_static(&mut self, prim: Prim, tok: &Token, name: &Token, m: &mut ExprModel) -> Value {
        let Some(statics) = prim_statics(prim) else {
            self.error(SemanticError::ObjNotSupportSubFields(prim.name().to_string()), tok.span);
            return Value::void(name.span);
        };
        match statics.find(&name.text, None) {
            Some(Def::Global(var)) => {
                let ty = DataType::prim(prim).with_span(name.span);
                let Some(constant) = var.constant.clone() else {
                    return Value::of(ty, name.span);
                };
                m.push_text(render_const(&constant, &ty));
                Value::constant(ty, constant, name.span)
            }
            _ => {
                self.error(SemanticError::ObjHaveNotId(name.text.clone()), name.span);
                Value::void(name.span)
            }
        }
    }

    fn member_of(&mut self, left: &[Token], name: &Token, m: &mut ExprModel) -> Value {
        let owner = self.process(left, m);
        if self.has_error {
            return Value::void(name.span);
        }
        let ty = owner.ty.resolve_alias();
        let kind = owner.ty.kind_text();

        if owner.is_type {
            let TypeShape::Enum(e) = &ty.shape else {
                self.error(SemanticError::ObjNotSupportSubFields(kind), name.span);
                return Value::void(name.span);
            };
            if e.item(&name.text).is_none() {
                self.error(SemanticError::ObjHaveNotId(name.text.clone()), name.span);
                return Value::void(name.span);
            }
            m.push_text(format!("::{}", out_id(&name.text, e.span)));
            let enum_ty = DataType::new(TypeShape::Enum(Arc::clone(e))).with_span(name.span);
            return Value::of(enum_ty, name.span);
        }

        if ty.ptr > 1 {
            self.error(SemanticError::ObjNotSupportSubFields(kind), name.span);
            return Value::void(name.span);
        }
        let accessor = if ty.is_ptr() { "->" } else { "." };
        let base = ty.unptr();

        let (members, bindings, is_builtin) = match &base.shape {
            TypeShape::Prim(Prim::Str) => (Members::Static(str_members()), Vec::new(), true),
            TypeShape::Slice(_) | TypeShape::Array { .. } => {
                (Members::Static(sequence_members()), Vec::new(), true)
            }
            TypeShape::Map { key, value } => (Members::Owned(map_members(key, value)), Vec::new(), true),
            TypeShape::Struct(s) => {
                if let Some(field) = s.def.fields.iter().find(|f| f.name == name.text) {
                    if !field.public && field.span.file != self.file && !field.span.is_builtin() {
                        self.error(SemanticError::ObjHaveNotId(name.text.clone()), name.span);
                        return Value::void(name.span);
                    }
                    field.mark_used();
                    let bindings: Vec<(String, DataType)> =
                        s.def.generics.iter().cloned().zip(s.generics.iter().cloned()).collect();
                    m.push_text(accessor);
                    m.push_text(field.out_name());
                    let mut value = Value::of(field.ty.substitute(&bindings), name.span);
                    value.lvalue = true;
                    return value;
                }
                let bindings = s.def.generics.iter().cloned().zip(s.generics.iter().cloned()).collect();
                (Members::Static(&s.def.members), bindings, false)
            }
            TypeShape::Trait(t) => {
                m.push(RenderNode::text(".get()"));
                return self.method_of(&t.members, Vec::new(), "->", name, m, false);
            }
            _ => {
                self.error(SemanticError::ObjNotSupportSubFields(kind), name.span);
                return Value::void(name.span);
            }
        };
        self.method_of(members.table(), bindings, accessor, name, m, is_builtin)
    }

    /// Look `name` up in a member table and render the access.
    fn method_of(
        &mut self,
        members: &Defmap,
        bindings: Vec<(String, DataType)>,
        accessor: &str,
        name: &Token,
        m: &mut ExprModel,
        is_builtin: bool,
    ) -> Value {
        let found = members.find(&name.text, Some(self.file));
        match found {
            Some(Def::Global(var)) => {
                m.push_text(accessor);
                m.push_text(var.out_name());
                let mut value = Value::of(var.ty.substitute(&bindings), name.span);
                value.lvalue = !is_builtin;
                value
            }
            Some(Def::Function(f)) => {
                m.push_text(accessor);
                m.push_text(f.name.clone());
                Value::of(f.data_type().substitute(&bindings).with_span(name.span), name.span)
            }
            _ => {
                self.error(SemanticError::ObjHaveNotId(name.text.clone()), name.span);
                Value::void(name.span)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::defs::{Def, Defmap, EnumDef, FuncDef, StructDef, TraitDef, Var};
    use crate::eval::eval_source;
    use crate::span::{FileId, Span};
    use crate::types::{DataType, FuncSig, Prim, StructRef, TypeShape};
    use crate::value::Const;

    fn span() -> Span {
        Span::new(FileId(0), 0, 1)
    }

    fn keys(defs: &Defmap, src: &str) -> Vec<&'static str> {
        eval_source(defs, src).2.iter().map(|d| d.key()).collect()
    }

    fn point() -> Arc<StructDef> {
        Arc::new(
            StructDef::new("Point", span())
                .with_field(Var::new("x", DataType::prim(Prim::Int)).with_span(span()))
                .with_method(
                    FuncDef::new("norm", FuncSig::new(Vec::new(), DataType::prim(Prim::F64))).with_span(span()),
                ),
        )
    }

    #[test]
    fn builtin_members_of_strings_maps_and_slices() {
        let str_ty = DataType::prim(Prim::Str);
        let mut defs = Defmap::new();
        defs.push(Var::new("s", str_ty.clone()).with_span(span()))
            .push(Var::new("m", DataType::map_of(str_ty, DataType::prim(Prim::Int))).with_span(span()))
            .push(Var::new("xs", DataType::slice_of(DataType::prim(Prim::U8))).with_span(span()));

        let (len, code, diags) = eval_source(&defs, "s.len");
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(code, "s_0.len()");
        assert!(len.ty.is_prim(Prim::Int));
        assert!(!len.lvalue);

        let (prefix, code, _) = eval_source(&defs, "s.has_prefix(\"a\")");
        assert_eq!(code, "s_0.has_prefix(str{\"a\"})");
        assert!(prefix.ty.is_bool());

        let (keys_value, code, _) = eval_source(&defs, "m.keys()");
        assert_eq!(code, "m_0.keys()");
        assert_eq!(keys_value.ty.kind_text(), "[]str");
        assert_eq!(eval_source(&defs, "xs.empty()").1, "xs_0.empty()");
        assert_eq!(keys(&defs, "xs.keys()"), vec!["obj_have_not_id"]);
    }

    #[test]
    fn enum_items_render_through_the_enum() {
        let mut defs = Defmap::new();
        defs.push(EnumDef::new("Color", span()).with_item("Red").with_item("Green"));
        let (value, code, diags) = eval_source(&defs, "Color.Green");
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(code, "Color_0::Green_0");
        assert!(value.ty.is_enum());
        assert_eq!(keys(&defs, "Color.Blue"), vec!["obj_have_not_id"]);
    }

    #[test]
    fn struct_fields_and_methods() {
        let def = point();
        let ty = DataType::new(TypeShape::Struct(StructRef { def: Arc::clone(&def), generics: Vec::new() }));
        let mut defs = Defmap::new();
        defs.insert(Def::Struct(def));
        defs.push(Var::new("p", ty.clone()).with_span(span()))
            .push(Var::new("pp", ty.with_ptr(1)).with_span(span()));

        let (field, code, _) = eval_source(&defs, "p.x");
        assert_eq!(code, "p_0.x_0");
        assert!(field.lvalue);
        assert_eq!(eval_source(&defs, "pp.x").1, "pp_0->x_0");

        let (norm, code, _) = eval_source(&defs, "p.norm()");
        assert_eq!(code, "p_0.norm()");
        assert!(norm.ty.is_prim(Prim::F64));
        assert_eq!(keys(&defs, "p.y"), vec!["obj_have_not_id"]);
    }

    #[test]
    fn trait_members_go_through_the_holder() {
        let shape = Arc::new(
            TraitDef::new("Shape", span())
                .with_method(FuncDef::new("area", FuncSig::new(Vec::new(), DataType::prim(Prim::F64))).public()),
        );
        let mut defs = Defmap::new();
        defs.push(Var::new("s", DataType::new(TypeShape::Trait(shape))).with_span(span()));
        let (area, code, diags) = eval_source(&defs, "s.area()");
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(code, "s_0.get()->area()");
        assert!(area.ty.is_prim(Prim::F64));
    }

    #[test]
    fn namespaces_hide_locals_and_builtins() {
        let mut geo = Defmap::new();
        geo.push(Var::new("origin", DataType::prim(Prim::Int)).with_span(span()));
        let mut defs = Defmap::new();
        defs.push_namespace("geo", geo);

        let (origin, code, diags) = eval_source(&defs, "geo::origin");
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(code, "origin_0");
        assert!(origin.ty.is_prim(Prim::Int));
        assert_eq!(keys(&defs, "geo::out"), vec!["id_noexist"]);
        assert_eq!(keys(&defs, "astro::origin"), vec!["namespace_not_exist"]);
    }

    #[test]
    fn primitive_statics_are_constants() {
        let defs = Defmap::new();
        let (max, code, _) = eval_source(&defs, "i8.max");
        assert_eq!(code, "i8{127}");
        assert_eq!(max.constant, Some(Const::Int(127)));
        assert_eq!(eval_source(&defs, "byte.max").1, "u8{255}");
        assert_eq!(keys(&defs, "u16.min"), vec!["obj_have_not_id"]);
        assert_eq!(keys(&defs, "bool.max"), vec!["obj_not_support_sub_fields"]);
    }
}
