use std::path::PathBuf;

use thiserror::Error;

use crate::diagnostic::Diagnostic;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to read source {path}: {source}")]
    SourceIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("lex error at byte {position}: {message}")]
    LexError { position: usize, message: String },
    #[error("parse error: {0}")]
    ParseError(String),
    #[error("semantic analysis failed with {} error(s)", .0.len())]
    Semantic(Vec<Diagnostic>),
}

impl CoreError {
    /// Diagnostics carried by a semantic failure, empty otherwise.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            CoreError::Semantic(diagnostics) => diagnostics,
            _ => &[],
        }
    }
}

/// Every failure the evaluator can report.
///
/// `key()` is the stable machine-readable identifier; the `Display`
/// message is what users read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemanticError {
    // lexical
    #[error("unexpected character `{0}`")]
    UnexpectedChar(char),
    #[error("unterminated literal")]
    UnterminatedLiteral,

    // syntax
    #[error("invalid syntax")]
    InvalidSyntax,
    #[error("invalid expression")]
    InvalidExpr,
    #[error("missing expression")]
    MissingExpr,
    #[error("invalid operator")]
    InvalidOperator,
    #[error("expected type, found `{0}`")]
    InvalidType(String),

    // type mismatch
    #[error("incompatible types: `{left}` and `{right}`")]
    IncompatibleTypes { left: String, right: String },
    #[error("incompatible data type: `{given}`, expected `{expected}`")]
    IncompatibleDatatype { expected: String, given: String },
    #[error("operator `{operator}` is not defined for `{kind}`")]
    OperatorNotFor { operator: String, kind: String },
    #[error("type `{0}` does not support casting")]
    TypeNotSupportsCasting(String),
    #[error("type `{from}` cannot be cast to `{to}`")]
    TypeNotSupportsCastingTo { from: String, to: String },
    #[error("type `{0}` does not support indexing")]
    NotSupportsIndexing(String),
    #[error("type `{0}` does not support slicing")]
    NotSupportsSlicing(String),
    #[error("type `{0}` cannot be used as a variadic spread")]
    VariadicWithNonVariadicable(String),
    #[error("invalid type for a composite literal")]
    InvalidTypeSource,
    #[error("cannot take the address of this expression")]
    InvalidAddressOf,

    // identifier resolution
    #[error("identifier `{0}` does not exist")]
    IdNotExist(String),
    #[error("object has no member `{0}`")]
    ObjHaveNotId(String),
    #[error("type `{0}` has no members")]
    ObjNotSupportSubFields(String),
    #[error("namespace `{0}` does not exist")]
    NamespaceNotExist(String),

    // arity and shape
    #[error("too many arguments")]
    ArgumentOverflow,
    #[error("missing argument for parameter `{0}`")]
    MissingExprFor(String),
    #[error("a spread argument cannot be combined with other variadic arguments")]
    MoreArgsWithVariadiced,
    #[error("parameter `{0}` already has an argument")]
    AlreadyHasExpr(String),
    #[error("composite literal exceeds the declared size")]
    OverflowLimits,
    #[error("generic type `{0}` could not be inferred")]
    GenericsNotInferred(String),
    #[error("wrong number of generic arguments: expected {expected}, found {found}")]
    GenericsOverflow { expected: usize, found: usize },

    // constant evaluation
    #[error("constant division by zero")]
    DivideByZero,
    #[error("constant `{value}` overflows `{kind}`")]
    ConstOverflow { value: String, kind: String },

    // warnings
    #[error("`{0}` is declared but never used")]
    UnusedVariable(String),
}

impl SemanticError {
    /// Stable error key reported alongside the message.
    pub fn key(&self) -> &'static str {
        use SemanticError::*;
        match self {
            UnexpectedChar(_) => "unexpected_char",
            UnterminatedLiteral => "unterminated_literal",
            InvalidSyntax => "invalid_syntax",
            InvalidExpr => "invalid_expr",
            MissingExpr => "missing_expr",
            InvalidOperator => "invalid_operator",
            InvalidType(_) => "invalid_type",
            IncompatibleTypes { .. } => "incompatible_types",
            IncompatibleDatatype { .. } => "incompatible_datatype",
            OperatorNotFor { .. } => "operator_notfor",
            TypeNotSupportsCasting(_) => "type_notsupports_casting",
            TypeNotSupportsCastingTo { .. } => "type_notsupports_casting_to",
            NotSupportsIndexing(_) => "not_supports_indexing",
            NotSupportsSlicing(_) => "not_supports_slicing",
            VariadicWithNonVariadicable(_) => "variadic_with_nonvariadicable",
            InvalidTypeSource => "invalid_type_source",
            InvalidAddressOf => "invalid_address_of",
            IdNotExist(_) => "id_noexist",
            ObjHaveNotId(_) => "obj_have_not_id",
            ObjNotSupportSubFields(_) => "obj_not_support_sub_fields",
            NamespaceNotExist(_) => "namespace_not_exist",
            ArgumentOverflow => "argument_overflow",
            MissingExprFor(_) => "missing_expr_for",
            MoreArgsWithVariadiced => "more_args_with_variadiced",
            AlreadyHasExpr(_) => "already_has_expr",
            OverflowLimits => "overflow_limits",
            GenericsNotInferred(_) => "generics_not_inferred",
            GenericsOverflow { .. } => "generics_overflow",
            DivideByZero => "divide_by_zero",
            ConstOverflow { .. } => "const_overflow",
            UnusedVariable(_) => "unused_variable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_stable() {
        assert_eq!(SemanticError::IdNotExist("x".into()).key(), "id_noexist");
        assert_eq!(SemanticError::MoreArgsWithVariadiced.key(), "more_args_with_variadiced");
    }

    #[test]
    fn messages_include_arguments() {
        let err = SemanticError::IncompatibleTypes {
            left: "i32".into(),
            right: "str".into(),
        };
        assert_eq!(err.to_string(), "incompatible types: `i32` and `str`");
    }
}
