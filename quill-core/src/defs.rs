//! Definition tables.
//!
//! A [`Defmap`] maps identifiers of one scope to their definitions. Each
//! definition lives behind an `Arc` so that types can point back at the
//! struct, enum or trait they were declared from, and carries an atomic
//! `used` flag that lookups set.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};

use crate::render::out_id;
use crate::span::{FileId, Span};
use crate::types::{DataType, FuncSig, Param, Prim};
use crate::value::Const;

/// Variable, constant or struct field.
#[derive(Debug)]
pub struct Var {
    pub name: String,
    pub public: bool,
    pub span: Span,
    pub ty: DataType,
    pub constant: Option<Const>,
    /// Fixed output text replacing the generated identifier.
    pub render: Option<String>,
    used: AtomicBool,
}

impl Var {
    pub fn new(name: impl Into<String>, ty: DataType) -> Self {
        Var {
            name: name.into(),
            public: false,
            span: Span::builtin(),
            ty,
            constant: None,
            render: None,
            used: AtomicBool::new(false),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn public(mut self) -> Self {
        self.public = true;
        self
    }

    pub fn with_constant(mut self, constant: Const) -> Self {
        self.constant = Some(constant);
        self
    }

    pub fn with_render(mut self, render: impl Into<String>) -> Self {
        self.render = Some(render.into());
        self
    }

    pub fn mark_used(&self) {
        self.used.store(true, Ordering::Relaxed);
    }

    pub fn is_used(&self) -> bool {
        self.used.load(Ordering::Relaxed)
    }

    pub fn out_name(&self) -> String {
        match &self.render {
            Some(render) => render.clone(),
            None => out_id(&self.name, self.span),
        }
    }
}

#[derive(Debug)]
pub struct FuncDef {
    pub name: String,
    pub public: bool,
    pub span: Span,
    pub sig: Arc<FuncSig>,
    used: AtomicBool,
}

impl FuncDef {
    pub fn new(name: impl Into<String>, sig: FuncSig) -> Self {
        FuncDef {
            name: name.into(),
            public: false,
            span: Span::builtin(),
            sig: Arc::new(sig),
            used: AtomicBool::new(false),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn public(mut self) -> Self {
        self.public = true;
        self
    }

    pub fn is_used(&self) -> bool {
        self.used.load(Ordering::Relaxed)
    }

    pub fn data_type(&self) -> DataType {
        DataType::new(crate::types::TypeShape::Func(Arc::clone(&self.sig))).with_span(self.span)
    }

    pub fn out_name(&self) -> String {
        out_id(&self.name, self.span)
    }
}

#[derive(Debug, Clone)]
pub struct EnumItem {
    pub name: String,
    pub value: Const,
}

#[derive(Debug)]
pub struct EnumDef {
    pub name: String,
    pub public: bool,
    pub span: Span,
    pub underlying: DataType,
    pub items: Vec<EnumItem>,
    used: AtomicBool,
}

impl EnumDef {
    /// Enum over `u32` with no items.
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        EnumDef {
            name: name.into(),
            public: false,
            span,
            underlying: DataType::prim(Prim::U32),
            items: Vec::new(),
            used: AtomicBool::new(false),
        }
    }

    pub fn with_underlying(mut self, ty: DataType) -> Self {
        self.underlying = ty;
        self
    }

    /// Append an item valued one past the previous item.
    pub fn with_item(mut self, name: impl Into<String>) -> Self {
        let value = match self.items.last() {
            Some(last) => Const::Int(last.value.as_i64().wrapping_add(1)),
            None => Const::Int(0),
        };
        self.items.push(EnumItem {
            name: name.into(),
            value,
        });
        self
    }

    pub fn public(mut self) -> Self {
        self.public = true;
        self
    }

    pub fn item(&self, name: &str) -> Option<&EnumItem> {
        self.items.iter().find(|item| item.name == name)
    }

    pub fn is_used(&self) -> bool {
        self.used.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
pub struct StructDef {
    pub name: String,
    pub public: bool,
    pub span: Span,
    pub generics: Vec<String>,
    pub traits: Vec<Arc<TraitDef>>,
    /// Fields in declaration order.
    pub fields: Vec<Arc<Var>>,
    /// Fields and methods.
    pub members: Defmap,
    used: AtomicBool,
}

impl StructDef {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        StructDef {
            name: name.into(),
            public: false,
            span,
            generics: Vec::new(),
            traits: Vec::new(),
            fields: Vec::new(),
            members: Defmap::new(),
            used: AtomicBool::new(false),
        }
    }

    pub fn public(mut self) -> Self {
        self.public = true;
        self
    }

    pub fn with_generics(mut self, generics: Vec<String>) -> Self {
        self.generics = generics;
        self
    }

    pub fn with_field(mut self, field: Var) -> Self {
        let field = Arc::new(field);
        self.fields.push(Arc::clone(&field));
        self.members.insert(Def::Global(field));
        self
    }

    pub fn with_method(mut self, method: FuncDef) -> Self {
        self.members.push(method);
        self
    }

    pub fn with_trait(mut self, tr: Arc<TraitDef>) -> Self {
        self.traits.push(tr);
        self
    }

    pub fn has_trait(&self, tr: &Arc<TraitDef>) -> bool {
        self.traits.iter().any(|t| Arc::ptr_eq(t, tr))
    }

    /// Parameter list a `S{...}` constructor binds against: the fields in
    /// declaration order.
    pub fn constructor_params(&self) -> Vec<Param> {
        self.fields
            .iter()
            .map(|f| {
                let mut p = Param::new(f.name.clone(), f.ty.clone());
                p.span = f.span;
                p
            })
            .collect()
    }

    pub fn is_used(&self) -> bool {
        self.used.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
pub struct TraitDef {
    pub name: String,
    pub public: bool,
    pub span: Span,
    pub members: Defmap,
    used: AtomicBool,
}

impl TraitDef {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        TraitDef {
            name: name.into(),
            public: false,
            span,
            members: Defmap::new(),
            used: AtomicBool::new(false),
        }
    }

    pub fn public(mut self) -> Self {
        self.public = true;
        self
    }

    pub fn with_method(mut self, method: FuncDef) -> Self {
        self.members.push(method);
        self
    }

    pub fn is_used(&self) -> bool {
        self.used.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
pub struct TypeAlias {
    pub name: String,
    pub public: bool,
    pub span: Span,
    pub ty: DataType,
    used: AtomicBool,
}

impl TypeAlias {
    pub fn new(name: impl Into<String>, ty: DataType) -> Self {
        TypeAlias {
            name: name.into(),
            public: false,
            span: Span::builtin(),
            ty,
            used: AtomicBool::new(false),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn public(mut self) -> Self {
        self.public = true;
        self
    }

    pub fn is_used(&self) -> bool {
        self.used.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefKind {
    Global,
    Function,
    Enum,
    Struct,
    Trait,
    TypeAlias,
}

/// A definition found in a [`Defmap`].
#[derive(Debug, Clone)]
pub enum Def {
    Global(Arc<Var>),
    Function(Arc<FuncDef>),
    Enum(Arc<EnumDef>),
    Struct(Arc<StructDef>),
    Trait(Arc<TraitDef>),
    TypeAlias(Arc<TypeAlias>),
}

impl Def {
    pub fn kind(&self) -> DefKind {
        match self {
            Def::Global(_) => DefKind::Global,
            Def::Function(_) => DefKind::Function,
            Def::Enum(_) => DefKind::Enum,
            Def::Struct(_) => DefKind::Struct,
            Def::Trait(_) => DefKind::Trait,
            Def::TypeAlias(_) => DefKind::TypeAlias,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Def::Global(d) => &d.name,
            Def::Function(d) => &d.name,
            Def::Enum(d) => &d.name,
            Def::Struct(d) => &d.name,
            Def::Trait(d) => &d.name,
            Def::TypeAlias(d) => &d.name,
        }
    }

    fn visibility(&self) -> (bool, Span) {
        match self {
            Def::Global(d) => (d.public, d.span),
            Def::Function(d) => (d.public, d.span),
            Def::Enum(d) => (d.public, d.span),
            Def::Struct(d) => (d.public, d.span),
            Def::Trait(d) => (d.public, d.span),
            Def::TypeAlias(d) => (d.public, d.span),
        }
    }

    fn used_flag(&self) -> &AtomicBool {
        match self {
            Def::Global(d) => &d.used,
            Def::Function(d) => &d.used,
            Def::Enum(d) => &d.used,
            Def::Struct(d) => &d.used,
            Def::Trait(d) => &d.used,
            Def::TypeAlias(d) => &d.used,
        }
    }

    /// Private definitions are only visible from their own file.
    pub fn visible_from(&self, file: Option<FileId>) -> bool {
        let (public, span) = self.visibility();
        match file {
            None => true,
            Some(file) => public || span.is_builtin() || span.file == file,
        }
    }

    pub fn is_used(&self) -> bool {
        self.used_flag().load(Ordering::Relaxed)
    }
}

impl From<Var> for Def {
    fn from(v: Var) -> Self {
        Def::Global(Arc::new(v))
    }
}

impl From<FuncDef> for Def {
    fn from(f: FuncDef) -> Self {
        Def::Function(Arc::new(f))
    }
}

impl From<EnumDef> for Def {
    fn from(e: EnumDef) -> Self {
        Def::Enum(Arc::new(e))
    }
}

impl From<StructDef> for Def {
    fn from(s: StructDef) -> Self {
        Def::Struct(Arc::new(s))
    }
}

impl From<TraitDef> for Def {
    fn from(t: TraitDef) -> Self {
        Def::Trait(Arc::new(t))
    }
}

impl From<TypeAlias> for Def {
    fn from(t: TypeAlias) -> Self {
        Def::TypeAlias(Arc::new(t))
    }
}

/// Identifier table of one scope.
#[derive(Debug, Default)]
pub struct Defmap {
    defs: HashMap<String, Def>,
    namespaces: HashMap<String, Arc<Defmap>>,
}

impl Defmap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition, replacing any earlier one of the same name.
    pub fn push(&mut self, def: impl Into<Def>) -> &mut Self {
        self.insert(def.into());
        self
    }

    pub fn insert(&mut self, def: Def) {
        self.defs.insert(def.name().to_string(), def);
    }

    pub fn push_namespace(&mut self, name: impl Into<String>, defs: Defmap) -> &mut Self {
        self.namespaces.insert(name.into(), Arc::new(defs));
        self
    }

    pub fn namespace(&self, name: &str) -> Option<&Arc<Defmap>> {
        self.namespaces.get(name)
    }

    /// Look up `id` as seen from `file` and mark it used. `None` sees
    /// every definition.
    pub fn find(&self, id: &str, file: Option<FileId>) -> Option<Def> {
        let def = self.defs.get(id)?;
        if !def.visible_from(file) {
            return None;
        }
        def.used_flag().store(true, Ordering::Relaxed);
        Some(def.clone())
    }

    /// Look up `id` restricted to one kind.
    pub fn find_kind(&self, id: &str, kind: DefKind, file: Option<FileId>) -> Option<Def> {
        self.find(id, file).filter(|def| def.kind() == kind)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// The builtin table shared by every compilation.
    pub fn builtin() -> &'static Defmap {
        &BUILTINS
    }
}

static BUILTINS: LazyLock<Defmap> = LazyLock::new(|| {
    let error_trait = Arc::new(
        TraitDef::new("Error", Span::builtin())
            .public()
            .with_method(FuncDef::new("error", FuncSig::new(Vec::new(), DataType::prim(Prim::Str))).public()),
    );
    let error_ty = DataType::new(crate::types::TypeShape::Trait(Arc::clone(&error_trait)));
    let handler = DataType::func(FuncSig::new(
        vec![Param::new("error", error_ty.clone())],
        DataType::void(),
    ));

    let mut defs = Defmap::new();
    defs.insert(Def::Trait(error_trait));
    defs.push(TypeAlias::new("byte", DataType::prim(Prim::U8)).public())
        .push(TypeAlias::new("rune", DataType::prim(Prim::I32)).public())
        .push(builtin_fn("out", vec![Param::new("expr", DataType::prim(Prim::Any))], DataType::void()))
        .push(builtin_fn("outln", vec![Param::new("expr", DataType::prim(Prim::Any))], DataType::void()))
        .push(builtin_fn("panic", vec![Param::new("error", error_ty)], DataType::void()))
        .push(builtin_fn("recover", vec![Param::new("handler", handler)], DataType::void()));
    defs
});

fn builtin_fn(name: &str, params: Vec<Param>, ret: DataType) -> FuncDef {
    FuncDef::new(name, FuncSig::new(params, ret)).public()
}

fn str_param(name: &str) -> Param {
    Param::new(name, DataType::prim(Prim::Str))
}

static STR_MEMBERS: LazyLock<Defmap> = LazyLock::new(|| {
    let str_ty = DataType::prim(Prim::Str);
    let int = DataType::prim(Prim::Int);
    let boolean = DataType::prim(Prim::Bool);
    let mut defs = Defmap::new();
    defs.push(Var::new("len", int.clone()).public().with_render("len()"))
        .push(builtin_fn("empty", Vec::new(), boolean.clone()))
        .push(builtin_fn("has_prefix", vec![str_param("sub")], boolean.clone()))
        .push(builtin_fn("has_suffix", vec![str_param("sub")], boolean))
        .push(builtin_fn("find", vec![str_param("sub")], int.clone()))
        .push(builtin_fn("rfind", vec![str_param("sub")], int.clone()))
        .push(builtin_fn("trim", vec![str_param("bytes")], str_ty.clone()))
        .push(builtin_fn("rtrim", vec![str_param("bytes")], str_ty.clone()))
        .push(builtin_fn(
            "split",
            vec![str_param("sub"), Param::new("n", int.clone())],
            DataType::slice_of(str_ty.clone()),
        ))
        .push(builtin_fn(
            "replace",
            vec![str_param("sub"), str_param("new"), Param::new("n", int)],
            str_ty,
        ));
    defs
});

static SEQUENCE_MEMBERS: LazyLock<Defmap> = LazyLock::new(|| {
    let mut defs = Defmap::new();
    defs.push(Var::new("len", DataType::prim(Prim::Int)).public().with_render("len()"))
        .push(builtin_fn("empty", Vec::new(), DataType::prim(Prim::Bool)));
    defs
});

/// Members of `str` values.
pub fn str_members() -> &'static Defmap {
    &STR_MEMBERS
}

/// Members shared by slices and arrays.
pub fn sequence_members() -> &'static Defmap {
    &SEQUENCE_MEMBERS
}

/// Members of a map with the given key and value types.
pub fn map_members(key: &DataType, value: &DataType) -> Defmap {
    let mut defs = Defmap::new();
    defs.push(Var::new("len", DataType::prim(Prim::Int)).public().with_render("len()"))
        .push(builtin_fn("clear", Vec::new(), DataType::void()))
        .push(builtin_fn("keys", Vec::new(), DataType::slice_of(key.clone())))
        .push(builtin_fn("values", Vec::new(), DataType::slice_of(value.clone())))
        .push(builtin_fn("empty", Vec::new(), DataType::prim(Prim::Bool)))
        .push(builtin_fn("has", vec![Param::new("key", key.clone())], DataType::prim(Prim::Bool)))
        .push(builtin_fn("del", vec![Param::new("key", key.clone())], DataType::void()));
    defs
}

/// `max`/`min` constants reachable as `T.max` on numeric primitives.
/// Unsigned types have no `min`.
pub fn prim_statics(prim: Prim) -> Option<Defmap> {
    let mut defs = Defmap::new();
    let ty = DataType::prim(prim);
    let mut constant = |name: &str, value: Const| {
        defs.push(Var::new(name, ty.clone()).public().with_constant(value));
    };
    match prim {
        Prim::I8 => {
            constant("max", Const::Int(i64::from(i8::MAX)));
            constant("min", Const::Int(i64::from(i8::MIN)));
        }
        Prim::I16 => {
            constant("max", Const::Int(i64::from(i16::MAX)));
            constant("min", Const::Int(i64::from(i16::MIN)));
        }
        Prim::I32 => {
            constant("max", Const::Int(i64::from(i32::MAX)));
            constant("min", Const::Int(i64::from(i32::MIN)));
        }
        Prim::I64 | Prim::Int => {
            constant("max", Const::Int(i64::MAX));
            constant("min", Const::Int(i64::MIN));
        }
        Prim::U8 => constant("max", Const::UInt(u64::from(u8::MAX))),
        Prim::U16 => constant("max", Const::UInt(u64::from(u16::MAX))),
        Prim::U32 => constant("max", Const::UInt(u64::from(u32::MAX))),
        Prim::U64 | Prim::UInt => constant("max", Const::UInt(u64::MAX)),
        Prim::F32 => {
            constant("max", Const::Float(f64::from(f32::MAX)));
            constant("min", Const::Float(f64::from(f32::MIN_POSITIVE)));
        }
        Prim::F64 => {
            constant("max", Const::Float(f64::MAX));
            constant("min", Const::Float(f64::MIN_POSITIVE));
        }
        _ => return None,
    }
    Some(defs)
}

/// Signature of the builtin `str(x)` conversion.
pub fn str_conversion_sig() -> FuncSig {
    FuncSig::new(vec![Param::new("obj", DataType::prim(Prim::Any))], DataType::prim(Prim::Str))
}
