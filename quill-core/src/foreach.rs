//! Key/value bindings of iteration over strings, slices, arrays and maps.

use crate::compat::types_are_compatible;
use crate::diagnostic::Diagnostic;
use crate::error::SemanticError;
use crate::render::{RenderNode, out_id};
use crate::span::Span;
use crate::types::{DataType, Prim};

/// One loop variable, optionally typed at the source.
#[derive(Debug, Clone)]
pub struct ForeachBinding {
    pub name: String,
    pub ty: Option<DataType>,
    pub span: Span,
}

impl ForeachBinding {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        ForeachBinding {
            name: name.into(),
            ty: None,
            span,
        }
    }

    pub fn with_type(mut self, ty: DataType) -> Self {
        self.ty = Some(ty);
        self
    }

    /// `_` binds nothing.
    pub fn is_blank(&self) -> bool {
        self.name == "_"
    }

    fn out_name(&self) -> String {
        if self.is_blank() {
            "_".to_string()
        } else {
            out_id(&self.name, self.span)
        }
    }
}

/// Checked bindings of one loop. Both bindings carry a type afterwards.
#[derive(Debug, Clone)]
pub struct ForeachProfile {
    pub key: ForeachBinding,
    pub value: Option<ForeachBinding>,
    pub collection: DataType,
}

impl ForeachProfile {
    fn key_type(&self) -> String {
        self.key.ty.as_ref().map(DataType::render).unwrap_or_default()
    }

    fn value_type(&self) -> Option<String> {
        self.value.as_ref().and_then(|v| v.ty.as_ref()).map(DataType::render)
    }
}

fn mismatch(expected: impl Into<String>, given: &DataType, span: Span) -> Diagnostic {
    Diagnostic::error(
        SemanticError::IncompatibleDatatype {
            expected: expected.into(),
            given: given.kind_text(),
        },
        span,
    )
}

/// Fill in or check the binding types for iterating `collection`.
///
/// Strings, slices and arrays iterate `uint` indexes with the element (a
/// byte for strings) as value; maps iterate their key and value types. An
/// explicit type is checked, never replaced; `any` accepts every element.
pub fn check_foreach(
    collection: &DataType,
    mut key: ForeachBinding,
    mut value: Option<ForeachBinding>,
) -> Result<ForeachProfile, Diagnostic> {
    let resolved = collection.resolve_alias();
    let (default_key, default_value, is_map) = if resolved.is_str() {
        (DataType::prim(Prim::UInt), DataType::prim(Prim::U8), false)
    } else if let Some(elem) = resolved.component() {
        (DataType::prim(Prim::UInt), elem.clone(), false)
    } else if let Some((k, v)) = resolved.map_types() {
        (k.clone(), v.clone(), true)
    } else {
        return Err(mismatch("enumerable", collection, key.span));
    };

    match &key.ty {
        Some(ty) if !is_map && !ty.resolve_alias().is_numeric() => {
            return Err(mismatch("numeric", ty, key.span));
        }
        Some(ty) if is_map && !types_are_compatible(ty, &default_key, true) => {
            return Err(mismatch(default_key.kind_text(), ty, key.span));
        }
        Some(_) => {}
        None => key.ty = Some(default_key),
    }

    if let Some(value) = value.as_mut() {
        match &value.ty {
            Some(ty) if !types_are_compatible(ty, &default_value, true) => {
                return Err(mismatch(default_value.kind_text(), ty, value.span));
            }
            Some(_) => {}
            None => value.ty = Some(default_value),
        }
    }

    Ok(ForeachProfile {
        key,
        value,
        collection: collection.clone(),
    })
}

/// Render a checked loop around `body`.
///
/// A blank key with a value becomes a range-for; everything else calls the
/// runtime `foreach` helper with a callback taking the bindings. Maps always
/// name both their key and value types; a blank value takes no parameter.
pub fn render_foreach(profile: &ForeachProfile, expr: RenderNode, body: RenderNode) -> RenderNode {
    if let Some(value) = profile.value.as_ref().filter(|v| profile.key.is_blank() && !v.is_blank()) {
        return RenderNode::Seq(vec![
            RenderNode::Text(format!("for (auto {} : ", value.out_name())),
            expr,
            RenderNode::text(") "),
            body,
        ]);
    }

    let key_ty = profile.key_type();
    let value = profile
        .value
        .as_ref()
        .filter(|v| !v.is_blank())
        .zip(profile.value_type());
    let mut generics = Vec::with_capacity(3);
    match profile.collection.resolve_alias().map_types() {
        Some((k, v)) => {
            generics.push(k.render());
            generics.push(v.render());
        }
        None => {
            generics.push(profile.collection.render());
            generics.push(key_ty.clone());
            if let Some((_, value_ty)) = &value {
                generics.push(value_ty.clone());
            }
        }
    }
    let mut params = vec![format!("{} {}", key_ty, profile.key.out_name())];
    if let Some((value, value_ty)) = &value {
        params.push(format!("{} {}", value_ty, value.out_name()));
    }

    RenderNode::Stmt(Box::new(RenderNode::Seq(vec![
        RenderNode::Text(format!("foreach<{}>(", generics.join(", "))),
        expr,
        RenderNode::Text(format!(", [&]({}) -> void ", params.join(", "))),
        body,
        RenderNode::text(")"),
    ])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::FileId;

    fn binding(name: &str) -> ForeachBinding {
        ForeachBinding::new(name, Span::new(FileId(0), 0, 1))
    }

    #[test]
    fn sequences_default_to_uint_index_and_element() {
        let ty = DataType::slice_of(DataType::prim(Prim::F64));
        let profile = check_foreach(&ty, binding("i"), Some(binding("x"))).expect("profile");
        assert_eq!(profile.key.ty.map(|t| t.kind_text()).as_deref(), Some("uint"));
        assert_eq!(profile.value.and_then(|v| v.ty).map(|t| t.kind_text()).as_deref(), Some("f64"));
    }

    #[test]
    fn strings_iterate_bytes() {
        let profile = check_foreach(&DataType::prim(Prim::Str), binding("i"), Some(binding("c"))).expect("profile");
        assert_eq!(profile.value.and_then(|v| v.ty).map(|t| t.kind_text()).as_deref(), Some("u8"));
    }

    #[test]
    fn maps_use_key_and_value_types() {
        let ty = DataType::map_of(DataType::prim(Prim::Str), DataType::prim(Prim::Int));
        let profile = check_foreach(&ty, binding("k"), Some(binding("v"))).expect("profile");
        assert_eq!(profile.key.ty.map(|t| t.kind_text()).as_deref(), Some("str"));
    }

    #[test]
    fn explicit_types_are_checked_not_replaced() {
        let ty = DataType::array_of(DataType::prim(Prim::I32), 3);
        let key = binding("i").with_type(DataType::prim(Prim::Str));
        let err = check_foreach(&ty, key, None).expect_err("string index");
        assert_eq!(err.key(), "incompatible_datatype");

        let value = binding("x").with_type(DataType::prim(Prim::Str));
        let err = check_foreach(&ty, binding("i"), Some(value)).expect_err("wrong element");
        assert_eq!(err.key(), "incompatible_datatype");

        let err = check_foreach(&DataType::prim(Prim::Int), binding("i"), None).expect_err("not enumerable");
        assert_eq!(err.key(), "incompatible_datatype");
    }

    #[test]
    fn renders_helper_call_and_range_for() {
        let ty = DataType::slice_of(DataType::prim(Prim::Int));
        let profile = check_foreach(&ty, binding("i"), Some(binding("x"))).expect("profile");
        let code = render_foreach(&profile, RenderNode::text("xs_0"), RenderNode::Block(Vec::new())).to_string();
        assert_eq!(code, "foreach<slice<int>, uint, int>(xs_0, [&](uint i_0, int x_0) -> void {});");

        let profile = check_foreach(&ty, binding("_"), Some(binding("x"))).expect("profile");
        let code = render_foreach(&profile, RenderNode::text("xs_0"), RenderNode::Block(Vec::new())).to_string();
        assert_eq!(code, "for (auto x_0 : xs_0) {}");
    }

    #[test]
    fn maps_always_name_key_and_value_types() {
        let ty = DataType::map_of(DataType::prim(Prim::Str), DataType::prim(Prim::Int));
        let render = |profile: &ForeachProfile| {
            render_foreach(profile, RenderNode::text("m_0"), RenderNode::Block(Vec::new())).to_string()
        };

        let profile = check_foreach(&ty, binding("k"), None).expect("key only");
        assert_eq!(render(&profile), "foreach<str, int>(m_0, [&](str k_0) -> void {});");

        let profile = check_foreach(&ty, binding("k"), Some(binding("_"))).expect("blank value");
        assert_eq!(render(&profile), "foreach<str, int>(m_0, [&](str k_0) -> void {});");

        let profile = check_foreach(&ty, binding("_"), Some(binding("_"))).expect("both blank");
        assert_eq!(render(&profile), "foreach<str, int>(m_0, [&](str _) -> void {});");
    }

    #[test]
    fn blank_values_leave_sequence_helper_arguments() {
        let ty = DataType::slice_of(DataType::prim(Prim::Int));
        let profile = check_foreach(&ty, binding("i"), Some(binding("_"))).expect("profile");
        let code = render_foreach(&profile, RenderNode::text("xs_0"), RenderNode::Block(Vec::new())).to_string();
        assert_eq!(code, "foreach<slice<int>, uint>(xs_0, [&](uint i_0) -> void {});");
    }

    #[test]
    fn any_typed_bindings_accept_every_element() {
        let ty = DataType::slice_of(DataType::prim(Prim::Int));
        let value = binding("x").with_type(DataType::prim(Prim::Any));
        let profile = check_foreach(&ty, binding("i"), Some(value)).expect("any value");
        assert_eq!(profile.value.and_then(|v| v.ty).map(|t| t.kind_text()).as_deref(), Some("any"));

        let map = DataType::map_of(DataType::prim(Prim::Str), DataType::prim(Prim::Int));
        let key = binding("k").with_type(DataType::prim(Prim::Any));
        assert!(check_foreach(&map, key, None).is_ok());
    }
}
