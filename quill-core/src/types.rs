//! Resolved types of Quill values and their C++ rendering.
//!
//! A [`DataType`] is a shape plus a pointer depth. Pointer markers stack
//! uniformly over every shape, so they are a count rather than a wrapper
//! variant. Aliases keep their target in `original` until
//! [`DataType::resolve_alias`] folds it back in.

use std::fmt;
use std::sync::Arc;

use crate::defs::{EnumDef, StructDef, TraitDef};
use crate::render::out_id;
use crate::span::Span;

/// Primitive types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prim {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    Int,
    UInt,
    UIntptr,
    F32,
    F64,
    Bool,
    Str,
    Any,
    Void,
    Nil,
}

impl Prim {
    pub fn from_name(name: &str) -> Option<Prim> {
        Some(match name {
            "i8" => Prim::I8,
            "i16" => Prim::I16,
            "i32" => Prim::I32,
            "i64" => Prim::I64,
            "u8" => Prim::U8,
            "u16" => Prim::U16,
            "u32" => Prim::U32,
            "u64" => Prim::U64,
            "int" => Prim::Int,
            "uint" => Prim::UInt,
            "uintptr" => Prim::UIntptr,
            "f32" => Prim::F32,
            "f64" => Prim::F64,
            "bool" => Prim::Bool,
            "str" => Prim::Str,
            "any" => Prim::Any,
            "void" => Prim::Void,
            "nil" => Prim::Nil,
            _ => return None,
        })
    }

    /// Source spelling, which is also the runtime library's type name.
    pub fn name(self) -> &'static str {
        match self {
            Prim::I8 => "i8",
            Prim::I16 => "i16",
            Prim::I32 => "i32",
            Prim::I64 => "i64",
            Prim::U8 => "u8",
            Prim::U16 => "u16",
            Prim::U32 => "u32",
            Prim::U64 => "u64",
            Prim::Int => "int",
            Prim::UInt => "uint",
            Prim::UIntptr => "uintptr",
            Prim::F32 => "f32",
            Prim::F64 => "f64",
            Prim::Bool => "bool",
            Prim::Str => "str",
            Prim::Any => "any",
            Prim::Void => "void",
            Prim::Nil => "nil",
        }
    }

    /// Width in bits of numeric primitives; platform integers are 64-bit.
    pub fn bit_size(self) -> u32 {
        match self {
            Prim::I8 | Prim::U8 => 8,
            Prim::I16 | Prim::U16 => 16,
            Prim::I32 | Prim::U32 | Prim::F32 => 32,
            Prim::I64 | Prim::U64 | Prim::F64 => 64,
            Prim::Int | Prim::UInt | Prim::UIntptr => 64,
            _ => 0,
        }
    }

    pub fn is_signed_integer(self) -> bool {
        matches!(self, Prim::I8 | Prim::I16 | Prim::I32 | Prim::I64 | Prim::Int)
    }

    pub fn is_unsigned_integer(self) -> bool {
        matches!(
            self,
            Prim::U8 | Prim::U16 | Prim::U32 | Prim::U64 | Prim::UInt | Prim::UIntptr
        )
    }

    pub fn is_integer(self) -> bool {
        self.is_signed_integer() || self.is_unsigned_integer()
    }

    pub fn is_float(self) -> bool {
        matches!(self, Prim::F32 | Prim::F64)
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }
}

impl fmt::Display for Prim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Declared size of a fixed array. `auto` arrays (`[...]T`) take their
/// size from the composite literal that builds them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArraySize {
    pub n: usize,
    pub auto: bool,
}

/// A struct type instantiated with concrete generic arguments.
#[derive(Debug, Clone)]
pub struct StructRef {
    pub def: Arc<StructDef>,
    pub generics: Vec<DataType>,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: DataType,
    pub variadic: bool,
    pub span: Span,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: DataType) -> Self {
        Param {
            name: name.into(),
            span: ty.span,
            ty,
            variadic: false,
        }
    }

    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    /// Type the callee actually receives: variadics arrive as a slice.
    pub fn received_type(&self) -> DataType {
        if self.variadic {
            DataType::slice_of(self.ty.clone())
        } else {
            self.ty.clone()
        }
    }

    /// `T name` as written in a C++ parameter list.
    pub fn prototype(&self) -> String {
        format!("{} {}", self.received_type().render(), out_id(&self.name, self.span))
    }
}

/// Parameter list, return type and generic parameter names of a function.
#[derive(Debug, Clone)]
pub struct FuncSig {
    pub params: Vec<Param>,
    pub ret: DataType,
    pub generics: Vec<String>,
}

impl FuncSig {
    pub fn new(params: Vec<Param>, ret: DataType) -> Self {
        FuncSig {
            params,
            ret,
            generics: Vec::new(),
        }
    }

    pub fn with_generics(mut self, generics: Vec<String>) -> Self {
        self.generics = generics;
        self
    }

    pub fn kind_text(&self) -> String {
        self.kind(DataType::kind_text)
    }

    fn kind(&self, spell: fn(&DataType) -> String) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| {
                if p.variadic {
                    format!("...{}", spell(&p.ty))
                } else {
                    spell(&p.ty)
                }
            })
            .collect();
        let mut kind = format!("({})", params.join(", "));
        if !self.ret.is_void() {
            kind.push(' ');
            kind.push_str(&spell(&self.ret));
        }
        kind
    }
}

/// Shape of a type, carrying exactly the payload that shape needs.
#[derive(Debug, Clone)]
pub enum TypeShape {
    Prim(Prim),
    Slice(Box<DataType>),
    Array {
        elem: Box<DataType>,
        size: ArraySize,
    },
    Map {
        key: Box<DataType>,
        value: Box<DataType>,
    },
    Func(Arc<FuncSig>),
    Struct(StructRef),
    Enum(Arc<EnumDef>),
    Trait(Arc<TraitDef>),
    /// An identifier not yet resolved against the definition table, or a
    /// generic parameter.
    Id {
        name: String,
        generics: Vec<DataType>,
    },
    /// Multiple return values.
    Tuple(Vec<DataType>),
}

#[derive(Debug, Clone)]
pub struct DataType {
    pub span: Span,
    pub ptr: usize,
    pub shape: TypeShape,
    pub original: Option<Box<DataType>>,
}

impl DataType {
    pub fn new(shape: TypeShape) -> Self {
        DataType {
            span: Span::builtin(),
            ptr: 0,
            shape,
            original: None,
        }
    }

    pub fn prim(prim: Prim) -> Self {
        DataType::new(TypeShape::Prim(prim))
    }

    pub fn void() -> Self {
        DataType::prim(Prim::Void)
    }

    pub fn slice_of(elem: DataType) -> Self {
        DataType::new(TypeShape::Slice(Box::new(elem)))
    }

    pub fn array_of(elem: DataType, n: usize) -> Self {
        DataType::new(TypeShape::Array {
            elem: Box::new(elem),
            size: ArraySize { n, auto: false },
        })
    }

    pub fn auto_array_of(elem: DataType) -> Self {
        DataType::new(TypeShape::Array {
            elem: Box::new(elem),
            size: ArraySize { n: 0, auto: true },
        })
    }

    pub fn map_of(key: DataType, value: DataType) -> Self {
        DataType::new(TypeShape::Map {
            key: Box::new(key),
            value: Box::new(value),
        })
    }

    pub fn func(sig: FuncSig) -> Self {
        DataType::new(TypeShape::Func(Arc::new(sig)))
    }

    pub fn tuple(types: Vec<DataType>) -> Self {
        DataType::new(TypeShape::Tuple(types))
    }

    pub fn id(name: impl Into<String>) -> Self {
        DataType::new(TypeShape::Id {
            name: name.into(),
            generics: Vec::new(),
        })
    }

    pub fn with_ptr(mut self, ptr: usize) -> Self {
        self.ptr = ptr;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    // -----------------------------------------------------------------
    // Shape queries
    // -----------------------------------------------------------------

    /// Shape and pointer depth with an alias looked through. Struct aliases
    /// already carry their instantiated payload in `shape`.
    fn base(&self) -> (&TypeShape, usize) {
        match &self.original {
            Some(original) if !matches!(self.shape, TypeShape::Struct(_)) => {
                (&original.shape, original.ptr + self.ptr)
            }
            _ => (&self.shape, self.ptr),
        }
    }

    /// The primitive, when this is an unpointed primitive type.
    pub fn as_prim(&self) -> Option<Prim> {
        match self.base() {
            (TypeShape::Prim(p), 0) => Some(*p),
            _ => None,
        }
    }

    pub fn is_prim(&self, prim: Prim) -> bool {
        self.as_prim() == Some(prim)
    }

    pub fn is_void(&self) -> bool {
        self.is_prim(Prim::Void)
    }

    pub fn is_nil(&self) -> bool {
        self.is_prim(Prim::Nil)
    }

    pub fn is_any(&self) -> bool {
        self.is_prim(Prim::Any)
    }

    pub fn is_str(&self) -> bool {
        self.is_prim(Prim::Str)
    }

    pub fn is_bool(&self) -> bool {
        self.is_prim(Prim::Bool)
    }

    pub fn is_numeric(&self) -> bool {
        self.as_prim().is_some_and(Prim::is_numeric)
    }

    pub fn is_integer(&self) -> bool {
        self.as_prim().is_some_and(Prim::is_integer)
    }

    pub fn is_ptr(&self) -> bool {
        self.base().1 > 0
    }

    pub fn is_slice(&self) -> bool {
        matches!(self.base(), (TypeShape::Slice(_), 0))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.base(), (TypeShape::Array { .. }, 0))
    }

    pub fn is_map(&self) -> bool {
        matches!(self.base(), (TypeShape::Map { .. }, 0))
    }

    pub fn is_func(&self) -> bool {
        matches!(self.base(), (TypeShape::Func(_), 0))
    }

    pub fn is_struct(&self) -> bool {
        matches!(self.base().0, TypeShape::Struct(_))
    }

    pub fn is_enum(&self) -> bool {
        matches!(self.base().0, TypeShape::Enum(_))
    }

    pub fn is_trait(&self) -> bool {
        matches!(self.base().0, TypeShape::Trait(_))
    }

    pub fn is_tuple(&self) -> bool {
        matches!(self.base().0, TypeShape::Tuple(_))
    }

    /// Neither a pointer nor a container nor a function.
    pub fn is_pure(&self) -> bool {
        !self.is_ptr() && !self.is_slice() && !self.is_array() && !self.is_map() && !self.is_func()
    }

    /// Types that accept the `nil` literal.
    pub fn is_nil_compatible(&self) -> bool {
        self.is_nil()
            || self.is_func()
            || self.is_ptr()
            || self.is_slice()
            || self.is_trait()
            || self.is_map()
    }

    /// Types whose values alias storage when copied.
    pub fn is_lvalue_type(&self) -> bool {
        self.is_ptr() || self.is_slice() || self.is_map()
    }

    pub fn is_variadicable(&self) -> bool {
        self.is_slice()
    }

    /// Element type of slices and arrays.
    pub fn component(&self) -> Option<&DataType> {
        match self.base() {
            (TypeShape::Slice(elem) | TypeShape::Array { elem, .. }, 0) => Some(&**elem),
            _ => None,
        }
    }

    pub fn map_types(&self) -> Option<(&DataType, &DataType)> {
        match self.base() {
            (TypeShape::Map { key, value }, 0) => Some((&**key, &**value)),
            _ => None,
        }
    }

    pub fn func_sig(&self) -> Option<&Arc<FuncSig>> {
        match self.base() {
            (TypeShape::Func(sig), 0) => Some(sig),
            _ => None,
        }
    }

    pub fn tuple_types(&self) -> Option<&[DataType]> {
        match self.base().0 {
            TypeShape::Tuple(types) => Some(types),
            _ => None,
        }
    }

    pub fn array_size(&self) -> Option<ArraySize> {
        match self.base() {
            (TypeShape::Array { size, .. }, 0) => Some(*size),
            _ => None,
        }
    }

    /// One pointer level removed. Non-pointers are returned unchanged; an
    /// alias whose own markers are exhausted gives up its target's.
    pub fn unptr(&self) -> DataType {
        if self.ptr == 0 && self.original.is_some() && self.is_ptr() {
            return self.resolve_alias().unptr();
        }
        let mut t = self.clone();
        t.ptr = t.ptr.saturating_sub(1);
        t
    }

    /// Whether generic parameter `name` occurs anywhere inside this type.
    pub fn mentions_generic(&self, name: &str) -> bool {
        if self.original.is_some() {
            return false;
        }
        match &self.shape {
            TypeShape::Id { name: id, generics } => {
                id == name || generics.iter().any(|g| g.mentions_generic(name))
            }
            TypeShape::Slice(elem) | TypeShape::Array { elem, .. } => elem.mentions_generic(name),
            TypeShape::Map { key, value } => {
                key.mentions_generic(name) || value.mentions_generic(name)
            }
            TypeShape::Func(sig) => {
                sig.params.iter().any(|p| p.ty.mentions_generic(name))
                    || sig.ret.mentions_generic(name)
            }
            TypeShape::Tuple(types) => types.iter().any(|t| t.mentions_generic(name)),
            TypeShape::Struct(s) => s.generics.iter().any(|t| t.mentions_generic(name)),
            TypeShape::Prim(_) | TypeShape::Enum(_) | TypeShape::Trait(_) => false,
        }
    }

    /// Replace generic parameters by their bound types.
    pub fn substitute(&self, bindings: &[(String, DataType)]) -> DataType {
        if self.original.is_some() {
            return self.clone();
        }
        let shape = match &self.shape {
            TypeShape::Id { name, generics } if generics.is_empty() => {
                match bindings.iter().find(|(g, _)| g == name) {
                    Some((_, bound)) => {
                        let mut t = bound.clone();
                        t.ptr += self.ptr;
                        return t;
                    }
                    None => self.shape.clone(),
                }
            }
            TypeShape::Id { name, generics } => TypeShape::Id {
                name: name.clone(),
                generics: generics.iter().map(|g| g.substitute(bindings)).collect(),
            },
            TypeShape::Slice(elem) => TypeShape::Slice(Box::new(elem.substitute(bindings))),
            TypeShape::Array { elem, size } => TypeShape::Array {
                elem: Box::new(elem.substitute(bindings)),
                size: *size,
            },
            TypeShape::Map { key, value } => TypeShape::Map {
                key: Box::new(key.substitute(bindings)),
                value: Box::new(value.substitute(bindings)),
            },
            TypeShape::Func(sig) => {
                let params = sig
                    .params
                    .iter()
                    .map(|p| Param {
                        ty: p.ty.substitute(bindings),
                        ..p.clone()
                    })
                    .collect();
                TypeShape::Func(Arc::new(FuncSig {
                    params,
                    ret: sig.ret.substitute(bindings),
                    generics: sig.generics.clone(),
                }))
            }
            TypeShape::Tuple(types) => {
                TypeShape::Tuple(types.iter().map(|t| t.substitute(bindings)).collect())
            }
            TypeShape::Struct(s) => TypeShape::Struct(StructRef {
                def: Arc::clone(&s.def),
                generics: s.generics.iter().map(|t| t.substitute(bindings)).collect(),
            }),
            other => other.clone(),
        };
        DataType {
            shape,
            ..self.clone()
        }
    }

    // -----------------------------------------------------------------
    // Kind text and aliases
    // -----------------------------------------------------------------

    /// Source-level spelling of the type, e.g. `*[]map_key` or `[5]int`.
    pub fn kind_text(&self) -> String {
        self.kind(DataType::kind_text)
    }

    /// Kind text with every alias replaced by its target, for comparing
    /// types by spelling.
    pub fn canonical_kind(&self) -> String {
        if self.original.is_some() && !matches!(self.shape, TypeShape::Struct(_)) {
            return self.resolve_alias().canonical_kind();
        }
        self.kind(DataType::canonical_kind)
    }

    fn kind(&self, spell: fn(&DataType) -> String) -> String {
        let mut kind = "*".repeat(self.ptr);
        match &self.shape {
            TypeShape::Prim(p) => kind.push_str(p.name()),
            TypeShape::Slice(elem) => {
                kind.push_str("[]");
                kind.push_str(&spell(elem));
            }
            TypeShape::Array { elem, size } => {
                if size.auto {
                    kind.push_str("[...]");
                } else {
                    kind.push_str(&format!("[{}]", size.n));
                }
                kind.push_str(&spell(elem));
            }
            TypeShape::Map { key, value } => {
                kind.push_str(&format!("[{}:{}]", spell(key), spell(value)));
            }
            TypeShape::Func(sig) => kind.push_str(&sig.kind(spell)),
            TypeShape::Struct(s) => {
                kind.push_str(&s.def.name);
                push_generic_kinds(&mut kind, &s.generics, spell);
            }
            TypeShape::Enum(e) => kind.push_str(&e.name),
            TypeShape::Trait(t) => kind.push_str(&t.name),
            TypeShape::Id { name, generics } => {
                kind.push_str(name);
                push_generic_kinds(&mut kind, generics, spell);
            }
            TypeShape::Tuple(types) => {
                let kinds: Vec<String> = types.iter().map(spell).collect();
                kind.push('(');
                kind.push_str(&kinds.join(", "));
                kind.push(')');
            }
        }
        kind
    }

    /// Splits the kind text into its base identifier and the prefix of
    /// pointer and container markers in front of it.
    ///
    /// Maps and functions have no single base identifier; their whole kind
    /// is returned with an empty prefix.
    pub fn kind_identifier(&self) -> (String, String) {
        let kind = self.kind_text();
        if self.is_map() || self.is_func() {
            return (kind, String::new());
        }
        let Some(start) = kind.find(|c: char| c == '_' || c.is_alphabetic()) else {
            return (kind, String::new());
        };
        let prefix = kind[..start].to_string();
        let rest = &kind[start..];
        if Prim::from_name(rest).is_some() {
            return (rest.to_string(), prefix);
        }
        let bytes = rest.as_bytes();
        let mut end = rest.len();
        let mut i = 0;
        while i < bytes.len() {
            let c = bytes[i];
            if c == b':' && bytes.get(i + 1) == Some(&b':') {
                i += 2;
                continue;
            }
            if c != b'_' && !c.is_ascii_alphanumeric() {
                end = i;
                break;
            }
            i += 1;
        }
        (rest[..end].to_string(), prefix)
    }

    /// Follow `original` one level. The source span and pointer markers of
    /// the alias are kept, and so is an instantiated struct payload.
    pub fn resolve_alias(&self) -> DataType {
        let Some(original) = &self.original else {
            return self.clone();
        };
        let mut resolved = (**original).clone();
        resolved.ptr += self.ptr;
        resolved.span = self.span;
        if let TypeShape::Struct(s) = &self.shape {
            resolved.shape = TypeShape::Struct(s.clone());
        }
        resolved
    }

    // -----------------------------------------------------------------
    // Rendering
    // -----------------------------------------------------------------

    /// C++ spelling of the type.
    pub fn render(&self) -> String {
        let t = self.resolve_alias();
        let inner = match &t.shape {
            TypeShape::Prim(p) => p.name().to_string(),
            TypeShape::Slice(elem) => format!("slice<{}>", elem.render()),
            TypeShape::Array { elem, size } => format!("array<{},{}>", elem.render(), size.n),
            TypeShape::Map { key, value } => format!("map<{},{}>", key.render(), value.render()),
            TypeShape::Func(sig) => {
                let params: Vec<String> =
                    sig.params.iter().map(|p| p.received_type().render()).collect();
                let params = if params.is_empty() {
                    "void".to_string()
                } else {
                    params.join(",")
                };
                format!("std::function<{}({})>", sig.ret.render(), params)
            }
            TypeShape::Struct(s) => {
                let mut out = out_id(&s.def.name, s.def.span);
                push_generic_renders(&mut out, &s.generics);
                out
            }
            TypeShape::Enum(e) => out_id(&e.name, e.span),
            TypeShape::Trait(tr) => format!("trait<{}>", out_id(&tr.name, tr.span)),
            TypeShape::Id { name, generics } => {
                let base = name.rsplit("::").next().unwrap_or(name);
                let mut out = out_id(base, t.span);
                push_generic_renders(&mut out, generics);
                out
            }
            TypeShape::Tuple(types) => {
                let rendered: Vec<String> = types.iter().map(DataType::render).collect();
                format!("std::tuple<{}>", rendered.join(","))
            }
        };
        wrap_pointers(inner, t.ptr)
    }
}

/// Wrap `inner` in `ptr<...>` once per pointer level, innermost first.
pub fn wrap_pointers(inner: String, depth: usize) -> String {
    let mut out = String::with_capacity(inner.len() + depth * 5);
    for _ in 0..depth {
        out.push_str("ptr<");
    }
    out.push_str(&inner);
    for _ in 0..depth {
        out.push('>');
    }
    out
}

fn push_generic_kinds(out: &mut String, generics: &[DataType], spell: fn(&DataType) -> String) {
    if generics.is_empty() {
        return;
    }
    let kinds: Vec<String> = generics.iter().map(spell).collect();
    out.push('[');
    out.push_str(&kinds.join(","));
    out.push(']');
}

fn push_generic_renders(out: &mut String, generics: &[DataType]) {
    if generics.is_empty() {
        return;
    }
    let rendered: Vec<String> = generics.iter().map(DataType::render).collect();
    out.push('<');
    out.push_str(&rendered.join(","));
    out.push('>');
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.kind_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_rendering_wraps_outside_in() {
        let base = DataType::slice_of(DataType::prim(Prim::I32));
        for depth in 0..5 {
            let rendered = base.clone().with_ptr(depth).render();
            let expected = format!("{}{}{}", "ptr<".repeat(depth), base.render(), ">".repeat(depth));
            assert_eq!(rendered, expected);
        }
    }

    #[test]
    fn renders_containers() {
        let m = DataType::map_of(DataType::prim(Prim::Str), DataType::array_of(DataType::prim(Prim::U8), 4));
        assert_eq!(m.render(), "map<str,array<u8,4>>");
        assert_eq!(m.kind_text(), "[str:[4]u8]");
    }

    #[test]
    fn renders_function_types() {
        let sig = FuncSig::new(
            vec![
                Param::new("a", DataType::prim(Prim::Int)),
                Param::new("rest", DataType::prim(Prim::Str)).variadic(),
            ],
            DataType::prim(Prim::Bool),
        );
        let f = DataType::func(sig);
        assert_eq!(f.render(), "std::function<bool(int,slice<str>)>");
        assert_eq!(f.kind_text(), "(int, ...str) bool");

        let empty = DataType::func(FuncSig::new(Vec::new(), DataType::void()));
        assert_eq!(empty.render(), "std::function<void(void)>");
    }

    #[test]
    fn renders_tuples() {
        let t = DataType::tuple(vec![DataType::prim(Prim::Int), DataType::prim(Prim::Str)]);
        assert_eq!(t.render(), "std::tuple<int,str>");
        assert!(!t.is_void());
    }

    #[test]
    fn kind_identifier_splits_prefix() {
        let t = DataType::slice_of(DataType::id("Point")).with_ptr(1);
        assert_eq!(t.kind_identifier(), ("Point".to_string(), "*[]".to_string()));
        let p = DataType::prim(Prim::U8).with_ptr(2);
        assert_eq!(p.kind_identifier(), ("u8".to_string(), "**".to_string()));
    }

    #[test]
    fn resolve_alias_keeps_alias_pointers() {
        let mut alias = DataType::id("byte").with_ptr(1);
        alias.original = Some(Box::new(DataType::prim(Prim::U8)));
        let resolved = alias.resolve_alias();
        assert_eq!(resolved.kind_text(), "*u8");
        assert_eq!(alias.render(), "ptr<u8>");
    }

    #[test]
    fn aliases_answer_shape_queries_for_their_target() {
        let mut byte = DataType::id("byte");
        byte.original = Some(Box::new(DataType::prim(Prim::U8)));
        assert!(byte.is_integer());
        assert_eq!(byte.as_prim(), Some(Prim::U8));
        assert_eq!(byte.kind_text(), "byte");
        assert_eq!(DataType::slice_of(byte.clone()).canonical_kind(), "[]u8");

        let mut handle = DataType::id("handle");
        handle.original = Some(Box::new(DataType::prim(Prim::Int).with_ptr(1)));
        assert!(handle.is_ptr());
        assert_eq!(handle.unptr().kind_text(), "int");
        assert_eq!(handle.clone().with_ptr(1).unptr().kind_text(), "handle");
    }

    #[test]
    fn substitutes_generics() {
        let t = DataType::slice_of(DataType::id("T"));
        let bound = t.substitute(&[("T".to_string(), DataType::prim(Prim::F64))]);
        assert_eq!(bound.kind_text(), "[]f64");
        assert!(t.mentions_generic("T"));
        assert!(!bound.mentions_generic("T"));
    }
}
