//! Type compatibility.
//!
//! Shape rules run before the primitive table: once either side is a
//! pointer, slice, array, map or trait, the primitive table is never
//! consulted.

use std::sync::Arc;

use crate::types::{DataType, Prim, TypeShape};

/// Whether values of `t1` and `t2` may be assigned, compared or cast
/// between each other. Symmetric in its two type arguments.
///
/// `ignore_any` lets `any` on either side match every other type.
pub fn types_are_compatible(t1: &DataType, t2: &DataType, ignore_any: bool) -> bool {
    let t1 = t1.resolve_alias();
    let t2 = t2.resolve_alias();
    if ignore_any && (t1.is_any() || t2.is_any()) {
        return true;
    }

    if t1.is_ptr() || t2.is_ptr() {
        let (a, b) = normalize(&t1, &t2, DataType::is_ptr);
        return check_nilable(a, b);
    }
    if t1.is_slice() || t2.is_slice() {
        let (a, b) = normalize(&t1, &t2, DataType::is_slice);
        return check_nilable(a, b);
    }
    if t1.is_array() || t2.is_array() {
        let (a, b) = normalize(&t1, &t2, DataType::is_array);
        return check_array(a, b);
    }
    if t1.is_map() || t2.is_map() {
        let (a, b) = normalize(&t1, &t2, DataType::is_map);
        return check_nilable(a, b);
    }
    if t1.is_trait() || t2.is_trait() {
        let (a, b) = normalize(&t1, &t2, DataType::is_trait);
        return check_trait(a, b);
    }
    if t1.is_func() && t2.is_func() {
        return t1.canonical_kind() == t2.canonical_kind();
    }
    if t1.is_nil_compatible() {
        return t2.is_nil();
    }
    if t2.is_nil_compatible() {
        return t1.is_nil();
    }
    if t1.is_enum() || t2.is_enum() {
        return check_enum(&t1, &t2);
    }
    if t1.is_struct() || t2.is_struct() {
        return check_struct(&t1, &t2);
    }

    match (&t1.shape, &t2.shape) {
        (TypeShape::Tuple(a), TypeShape::Tuple(b)) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b)
                    .all(|(x, y)| types_are_compatible(x, y, ignore_any))
        }
        (TypeShape::Id { name: a, .. }, TypeShape::Id { name: b, .. }) => a == b,
        (TypeShape::Prim(a), TypeShape::Prim(b)) => prims_are_compatible(*a, *b, ignore_any),
        _ => false,
    }
}

/// Kind-level equality used where generic arguments are compared.
pub fn types_are_equal(t1: &DataType, t2: &DataType) -> bool {
    let (t1, t2) = (t1.resolve_alias(), t2.resolve_alias());
    std::mem::discriminant(&t1.shape) == std::mem::discriminant(&t2.shape)
        && t1.canonical_kind() == t2.canonical_kind()
}

fn prims_are_compatible(a: Prim, b: Prim, ignore_any: bool) -> bool {
    a == b || (ignore_any && (a == Prim::Any || b == Prim::Any))
}

/// Order the pair so the side matching `shape` comes first.
fn normalize<'a>(
    t1: &'a DataType,
    t2: &'a DataType,
    shape: fn(&DataType) -> bool,
) -> (&'a DataType, &'a DataType) {
    if shape(t2) { (t2, t1) } else { (t1, t2) }
}

/// Pointers, slices and maps accept `nil` or their exact kind.
fn check_nilable(t: &DataType, other: &DataType) -> bool {
    other.is_nil() || t.canonical_kind() == other.canonical_kind()
}

fn check_array(t: &DataType, other: &DataType) -> bool {
    match (t.array_size(), other.array_size(), t.component(), other.component()) {
        (Some(a), Some(b), Some(ea), Some(eb)) => {
            a.n == b.n && ea.canonical_kind() == eb.canonical_kind()
        }
        _ => false,
    }
}

fn check_trait(t: &DataType, other: &DataType) -> bool {
    let TypeShape::Trait(tr) = &t.shape else {
        return false;
    };
    if other.is_nil() {
        return true;
    }
    match &other.shape {
        TypeShape::Trait(other_tr) => Arc::ptr_eq(tr, other_tr),
        TypeShape::Struct(s) if other.ptr == 0 => s.def.has_trait(tr),
        _ => false,
    }
}

fn check_enum(t1: &DataType, t2: &DataType) -> bool {
    match (&t1.shape, &t2.shape) {
        (TypeShape::Enum(a), TypeShape::Enum(b)) => {
            a.name == b.name && a.span.file == b.span.file && t1.canonical_kind() == t2.canonical_kind()
        }
        _ => false,
    }
}

/// Same declared name, same declaring file, and equal generic arguments.
fn check_struct(t1: &DataType, t2: &DataType) -> bool {
    let (TypeShape::Struct(s1), TypeShape::Struct(s2)) = (&t1.shape, &t2.shape) else {
        return false;
    };
    if s1.def.name != s2.def.name || s1.def.span.file != s2.def.span.file {
        return false;
    }
    if s1.def.generics.is_empty() {
        return true;
    }
    s1.generics.len() == s2.generics.len()
        && s1
            .generics
            .iter()
            .zip(&s2.generics)
            .all(|(a, b)| types_are_equal(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::{StructDef, TraitDef};
    use crate::span::{FileId, Span};
    use crate::types::{FuncSig, StructRef};

    fn prim(p: Prim) -> DataType {
        DataType::prim(p)
    }

    #[test]
    fn nil_and_slice_are_symmetric() {
        let nil = prim(Prim::Nil);
        let slice = DataType::slice_of(prim(Prim::Int));
        assert!(types_are_compatible(&nil, &slice, false));
        assert!(types_are_compatible(&slice, &nil, false));
    }

    #[test]
    fn pointer_never_matches_its_pointee() {
        let ptr = prim(Prim::Int).with_ptr(1);
        assert!(!types_are_compatible(&ptr, &prim(Prim::Int), false));
        assert!(!types_are_compatible(&prim(Prim::Int), &ptr, false));
        assert!(types_are_compatible(&ptr, &prim(Prim::Nil), false));
    }

    #[test]
    fn arrays_compare_sizes() {
        let a = DataType::array_of(prim(Prim::U8), 4);
        let b = DataType::array_of(prim(Prim::U8), 4);
        let c = DataType::array_of(prim(Prim::U8), 5);
        assert!(types_are_compatible(&a, &b, false));
        assert!(!types_are_compatible(&a, &c, false));
        assert!(!types_are_compatible(&a, &prim(Prim::Nil), false));
    }

    #[test]
    fn any_matches_only_when_ignored() {
        assert!(types_are_compatible(&prim(Prim::Any), &prim(Prim::I8), true));
        assert!(!types_are_compatible(&prim(Prim::Any), &prim(Prim::I8), false));
    }

    #[test]
    fn primitives_match_exactly() {
        assert!(types_are_compatible(&prim(Prim::I32), &prim(Prim::I32), false));
        assert!(!types_are_compatible(&prim(Prim::I32), &prim(Prim::I64), false));
    }

    #[test]
    fn functions_compare_kinds() {
        let f = DataType::func(FuncSig::new(Vec::new(), prim(Prim::Int)));
        let g = DataType::func(FuncSig::new(Vec::new(), prim(Prim::Int)));
        let h = DataType::func(FuncSig::new(Vec::new(), prim(Prim::Str)));
        assert!(types_are_compatible(&f, &g, false));
        assert!(!types_are_compatible(&f, &h, false));
        assert!(types_are_compatible(&f, &prim(Prim::Nil), false));
    }

    #[test]
    fn structs_conform_to_declared_traits() {
        let span = Span::new(FileId(0), 0, 1);
        let error = Arc::new(TraitDef::new("Error", span));
        let other = Arc::new(TraitDef::new("Other", span));
        let def = Arc::new(StructDef::new("MyErr", span).with_trait(Arc::clone(&error)));
        let s = DataType::new(TypeShape::Struct(StructRef {
            def,
            generics: Vec::new(),
        }));
        let tr = DataType::new(TypeShape::Trait(error));
        let other = DataType::new(TypeShape::Trait(other));
        assert!(types_are_compatible(&tr, &s, false));
        assert!(types_are_compatible(&s, &tr, false));
        assert!(!types_are_compatible(&other, &s, false));
    }

    #[test]
    fn structs_from_other_files_differ() {
        let a = Arc::new(StructDef::new("P", Span::new(FileId(0), 0, 1)));
        let b = Arc::new(StructDef::new("P", Span::new(FileId(1), 0, 1)));
        let ta = DataType::new(TypeShape::Struct(StructRef { def: a, generics: Vec::new() }));
        let tb = DataType::new(TypeShape::Struct(StructRef { def: b, generics: Vec::new() }));
        assert!(types_are_compatible(&ta, &ta.clone(), false));
        assert!(!types_are_compatible(&ta, &tb, false));
    }

    #[test]
    fn aliases_match_their_targets() {
        let mut byte = DataType::id("byte");
        byte.original = Some(Box::new(prim(Prim::U8)));
        assert!(types_are_compatible(&byte, &prim(Prim::U8), false));
        assert!(!types_are_compatible(&byte, &prim(Prim::I8), false));

        let bytes = DataType::slice_of(byte.clone());
        assert_eq!(bytes.kind_text(), "[]byte");
        assert!(types_are_compatible(&bytes, &DataType::slice_of(prim(Prim::U8)), false));
        assert!(types_are_equal(&byte, &prim(Prim::U8)));
    }
}
