//! Diagnostics and the shared sink they are collected into.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::SemanticError;
use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A single reported problem, anchored at the token that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub error: SemanticError,
    pub span: Span,
    pub code: Option<&'static str>,
}

impl Diagnostic {
    pub fn error(error: SemanticError, span: Span) -> Self {
        Diagnostic {
            severity: Severity::Error,
            error,
            span,
            code: None,
        }
    }

    pub fn warning(error: SemanticError, span: Span) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            error,
            span,
            code: None,
        }
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub fn key(&self) -> &'static str {
        self.error.key()
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(
            f,
            "{}:{}:{}: {}[{}]: {}",
            self.span.file.index(),
            self.span.line,
            self.span.column,
            level,
            self.code.unwrap_or_else(|| self.key()),
            self.error
        )
    }
}

/// Thread-safe diagnostic collector.
///
/// Clones share one underlying list, so the tuple-argument checks that run
/// on scoped threads can report into the same sink as the evaluator.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticSink {
    inner: Arc<Mutex<Vec<Diagnostic>>>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Diagnostic>> {
        // A panicking checker must not take every later report down with it.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, diagnostic: Diagnostic) {
        tracing::trace!(key = diagnostic.key(), "diagnostic reported");
        self.lock().push(diagnostic);
    }

    pub fn error(&self, error: SemanticError, span: Span) {
        self.push(Diagnostic::error(error, span));
    }

    pub fn warning(&self, error: SemanticError, span: Span) {
        self.push(Diagnostic::warning(error, span));
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.lock().iter().any(Diagnostic::is_error)
    }

    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.lock().clone()
    }

    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::FileId;

    #[test]
    fn clones_share_storage() {
        let sink = DiagnosticSink::new();
        let other = sink.clone();
        other.error(SemanticError::InvalidSyntax, Span::new(FileId(0), 0, 1));
        assert_eq!(sink.len(), 1);
        assert!(sink.has_errors());
    }

    #[test]
    fn accepts_concurrent_appends() {
        let sink = DiagnosticSink::new();
        std::thread::scope(|scope| {
            for i in 0..8 {
                let sink = sink.clone();
                scope.spawn(move || {
                    sink.error(SemanticError::MissingExpr, Span::new(FileId(0), i, i + 1));
                });
            }
        });
        assert_eq!(sink.len(), 8);
    }

    #[test]
    fn displays_location_and_key() {
        let span = Span::new(FileId(2), 4, 5).with_position(3, 7);
        let diag = Diagnostic::error(SemanticError::IdNotExist("foo".into()), span);
        assert_eq!(
            diag.to_string(),
            "2:3:7: error[id_noexist]: identifier `foo` does not exist"
        );
    }

    #[test]
    fn warnings_are_not_errors() {
        let sink = DiagnosticSink::new();
        let span = Span::new(FileId(0), 0, 1).with_position(1, 2);
        sink.warning(SemanticError::UnusedVariable("i".into()), span);
        assert!(!sink.has_errors());
        let diags = sink.take();
        assert_eq!(diags[0].to_string(), "0:1:2: warning[unused_variable]: `i` is declared but never used");
    }
}
