use std::fs;
use std::path::Path;

use tracing::debug;

use crate::defs::Defmap;
use crate::diagnostic::{Diagnostic, DiagnosticSink};
use crate::error::CoreError;
use crate::eval::Evaluator;
use crate::lexer::{LexResult, TokenKind, lex};
use crate::render::{RenderConfig, RenderContext};
use crate::span::FileId;
use crate::subparse::{SubParser, TokenSubParser};
use crate::tokens::split_parts;
use crate::types::DataType;
use crate::value::Const;

#[derive(Debug, Clone, PartialEq)]
pub struct CompilationArtifact {
    /// Generated C++ text.
    pub code: String,
    /// Source spelling of the result type; `void` for statements.
    pub value_kind: String,
    pub constant: Option<Const>,
    /// Non-fatal diagnostics.
    pub diagnostics: Vec<Diagnostic>,
}

/// Read a source file from disk.
pub fn load_source(path: &Path) -> Result<String, CoreError> {
    fs::read_to_string(path).map_err(|source| CoreError::SourceIo {
        path: path.to_path_buf(),
        source,
    })
}

fn lex_checked(source: &str, file: FileId) -> Result<LexResult, CoreError> {
    let lexed = lex(file, source);
    if let Some(diagnostic) = lexed.diagnostics.iter().find(|d| d.is_error()) {
        return Err(CoreError::LexError {
            position: diagnostic.span.start as usize,
            message: diagnostic.error.to_string(),
        });
    }
    Ok(lexed)
}

fn finish(sink: DiagnosticSink) -> Result<Vec<Diagnostic>, CoreError> {
    let diagnostics = sink.take();
    if diagnostics.iter().any(Diagnostic::is_error) {
        return Err(CoreError::Semantic(diagnostics));
    }
    Ok(diagnostics)
}

/// Translate one Quill expression.
pub fn transpile_expr(
    source: &str,
    file: FileId,
    defs: &Defmap,
    config: &RenderConfig,
) -> Result<CompilationArtifact, CoreError> {
    let lexed = lex_checked(source, file)?;
    let tokens = lexed.significant();
    debug!(file = file.index(), tokens = tokens.len(), "transpiling expression");

    let sink = DiagnosticSink::new();
    let sub = TokenSubParser;
    let mut evaluator = Evaluator::new(defs, file, &sub, sink.clone());
    let (value, node) = evaluator.eval_expr(tokens);
    let code = node.render(&RenderContext::new(config));
    let diagnostics = finish(sink)?;

    Ok(CompilationArtifact {
        code,
        value_kind: value.ty.kind_text(),
        constant: value.constant,
        diagnostics,
    })
}

/// Translate `;`-separated statements, one output line each.
pub fn transpile_statements(
    source: &str,
    file: FileId,
    defs: &Defmap,
    config: &RenderConfig,
) -> Result<CompilationArtifact, CoreError> {
    let lexed = lex_checked(source, file)?;
    let statements = split_parts(lexed.significant(), TokenKind::Semi);
    debug!(file = file.index(), statements = statements.len(), "transpiling statements");

    let sink = DiagnosticSink::new();
    let sub = TokenSubParser;
    let mut evaluator = Evaluator::new(defs, file, &sub, sink.clone());
    let ctx = RenderContext::new(config);
    let lines: Vec<String> = statements
        .into_iter()
        .filter_map(|stmt| evaluator.statement(stmt))
        .map(|node| node.render(&ctx))
        .collect();
    let diagnostics = finish(sink)?;

    Ok(CompilationArtifact {
        code: lines.join("\n"),
        value_kind: DataType::void().kind_text(),
        constant: None,
        diagnostics,
    })
}

/// Parse a type written in Quill syntax. Identifiers stay unresolved.
pub fn parse_type(source: &str, file: FileId) -> Result<DataType, CoreError> {
    let lexed = lex_checked(source, file)?;
    let tokens = lexed.significant();
    let mut index = 0;
    let ty = TokenSubParser
        .data_type(tokens, &mut index)
        .map_err(|diagnostic| CoreError::Semantic(vec![diagnostic]))?;
    if let Some(extra) = tokens.get(index) {
        return Err(CoreError::ParseError(format!("unexpected `{}` after type", extra.text)));
    }
    Ok(ty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::{FuncDef, Var};
    use crate::span::Span;
    use crate::types::{FuncSig, Param, Prim};

    fn defs() -> Defmap {
        let span = Span::new(FileId(0), 0, 1);
        let mut defs = Defmap::new();
        defs.push(Var::new("xs", DataType::slice_of(DataType::prim(Prim::Int))).with_span(span))
            .push(
                FuncDef::new(
                    "sum",
                    FuncSig::new(vec![Param::new("nums", DataType::prim(Prim::Int)).variadic()], DataType::prim(Prim::Int)),
                )
                .with_span(span),
            );
        defs
    }

    #[test]
    fn transpiles_constant_expression() {
        let artifact = transpile_expr("(1 + 2) * 3", FileId(0), &Defmap::new(), &RenderConfig::default())
            .expect("transpile");
        assert_eq!(artifact.code, "i32{9}");
        assert_eq!(artifact.value_kind, "i32");
        assert_eq!(artifact.constant, Some(Const::Int(9)));
    }

    #[test]
    fn reports_semantic_errors_together() {
        let err = transpile_statements("missing; xs[\"a\"]", FileId(0), &defs(), &RenderConfig::default())
            .expect_err("errors");
        let keys: Vec<&str> = err.diagnostics().iter().map(Diagnostic::key).collect();
        assert_eq!(keys, vec!["id_noexist", "invalid_expr"]);
    }

    #[test]
    fn lex_errors_stop_before_evaluation() {
        let err = transpile_expr("1 $ 2", FileId(0), &Defmap::new(), &RenderConfig::default()).expect_err("lex");
        assert!(matches!(err, CoreError::LexError { position: 2, .. }));
    }

    #[test]
    fn renders_statement_lines() {
        let artifact = transpile_statements("sum(xs...); sum()", FileId(0), &defs(), &RenderConfig::default())
            .expect("transpile");
        assert_eq!(artifact.code, "sum_0(xs_0);\nsum_0(slice<int>({}));");
    }

    #[test]
    fn parses_standalone_types() {
        let ty = parse_type("*[str:[]u8]", FileId(0)).expect("type");
        assert_eq!(ty.kind_text(), "*[str:[]u8]");
        assert!(parse_type("int int", FileId(0)).is_err());
    }
}
