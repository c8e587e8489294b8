use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use quill_core::defs::{Defmap, FuncDef, Var};
use quill_core::render::RenderConfig;
use quill_core::span::{FileId, Span};
use quill_core::{
    CompilationArtifact, CoreError, load_source, parse_type, transpile_expr, transpile_statements,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const SOURCE_FILE: FileId = FileId(0);

/// Translate Quill expressions and statements into C++.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Read the source from a file.
    #[arg(short, long, conflicts_with = "expr")]
    input: Option<String>,

    /// Translate the given text instead of reading a file or stdin.
    #[arg(short, long)]
    expr: Option<String>,

    /// Write the generated code here instead of stdout.
    #[arg(short, long)]
    output: Option<String>,

    #[arg(long, help = "Treat the source as `;`-separated statements")]
    statements: bool,

    #[arg(
        long,
        value_name = "N",
        help = "Indent generated blocks with N spaces (tab when omitted)"
    )]
    indent_width: Option<usize>,

    #[arg(
        long = "var",
        value_name = "NAME=TYPE",
        value_parser = parse_declaration,
        help = "Declare a global variable visible to the source"
    )]
    vars: Vec<(String, String)>,

    #[arg(
        long = "func",
        value_name = "NAME=TYPE",
        value_parser = parse_declaration,
        help = "Declare a function, e.g. `sum=(...int) int`"
    )]
    funcs: Vec<(String, String)>,

    #[arg(short, long, help = "Log evaluation details to stderr")]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    execute(cli)
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn parse_declaration(raw: &str) -> std::result::Result<(String, String), String> {
    let (name, ty) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=TYPE, got `{raw}`"))?;
    let name = name.trim();
    if name.is_empty() || ty.trim().is_empty() {
        return Err(format!("expected NAME=TYPE, got `{raw}`"));
    }
    Ok((name.to_string(), ty.trim().to_string()))
}

fn execute(cli: Cli) -> Result<()> {
    let source = match (&cli.expr, &cli.input) {
        (Some(expr), _) => expr.clone(),
        (None, Some(path)) => {
            load_source(Path::new(path)).with_context(|| format!("failed to read input file {path}"))?
        }
        (None, None) => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read source from stdin")?;
            buffer
        }
    };

    let defs = declarations(&cli.vars, &cli.funcs)?;
    let config = match cli.indent_width {
        Some(width) => RenderConfig::spaces(width),
        None => RenderConfig::default(),
    };
    debug!(bytes = source.len(), statements = cli.statements, "translating source");

    let result = if cli.statements {
        transpile_statements(&source, SOURCE_FILE, &defs, &config)
    } else {
        transpile_expr(source.trim(), SOURCE_FILE, &defs, &config)
    };
    let artifact = result.map_err(report)?;
    for warning in &artifact.diagnostics {
        eprintln!("{warning}");
    }
    info!(kind = %artifact.value_kind, constant = artifact.constant.is_some(), "translated");

    match &cli.output {
        Some(path) => write_output(path, &artifact)?,
        None => println!("{}", artifact.code),
    }
    Ok(())
}

/// Print the diagnostics of a failed translation and turn it into an error.
fn report(err: CoreError) -> anyhow::Error {
    for diagnostic in err.diagnostics() {
        eprintln!("{diagnostic}");
    }
    anyhow!(err)
}

fn declarations(vars: &[(String, String)], funcs: &[(String, String)]) -> Result<Defmap> {
    let span = Span::new(SOURCE_FILE, 0, 0);
    let mut defs = Defmap::new();
    for (name, ty) in vars {
        let ty = parse_type(ty, SOURCE_FILE).with_context(|| format!("invalid type for variable {name}"))?;
        defs.push(Var::new(name.clone(), ty).with_span(span));
    }
    for (name, ty) in funcs {
        let parsed = parse_type(ty, SOURCE_FILE).with_context(|| format!("invalid type for function {name}"))?;
        let Some(sig) = parsed.func_sig() else {
            bail!("function {name} needs a function type, got `{}`", parsed.kind_text());
        };
        defs.push(FuncDef::new(name.clone(), sig.as_ref().clone()).with_span(span));
    }
    Ok(defs)
}

fn write_output(path: &str, artifact: &CompilationArtifact) -> Result<()> {
    if let Some(parent) = PathBuf::from(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {parent:?}"))?;
        }
    }
    let mut code = artifact.code.clone();
    code.push('\n');
    fs::write(path, code).with_context(|| format!("failed to write output file {path}"))?;
    Ok(())
}
