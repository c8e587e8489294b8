//! Semantic core of the Quill to C++ transpiler.
//!
//! The pipeline for a single expression or statement is roughly:
//!
//!   source text
//!     -> lexer      (tokens)
//!     -> eval       (processes, precedence folding, typed values)
//!     -> render     (C++ render tree and text)
//!
//! Declarations come in through a [`defs::Defmap`] built by the caller; the
//! sub-parser seam in [`subparse`] covers type and anonymous function syntax.
//! Higher-level tools (the CLI) should depend on this crate rather than
//! reimplementing the pipeline.

// ---------------------------------------------------------------------
// Error handling and diagnostics
// ---------------------------------------------------------------------

pub mod span;
pub mod diagnostic;
pub mod error;

// ---------------------------------------------------------------------
// Front-end: lexing and token utilities
// ---------------------------------------------------------------------

pub mod lexer;
pub mod tokens;
pub mod subparse;

// ---------------------------------------------------------------------
// Semantic layers: types, definitions, values
// ---------------------------------------------------------------------

pub mod types;
pub mod compat;
pub mod defs;
pub mod value;
pub mod literal;

// ---------------------------------------------------------------------
// Evaluation and C++ rendering
// ---------------------------------------------------------------------

pub mod render;
pub mod eval;
pub mod foreach;
pub mod compiler;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use compiler::{CompilationArtifact, load_source, parse_type, transpile_expr, transpile_statements};
pub use error::CoreError;
pub use eval::Evaluator;
