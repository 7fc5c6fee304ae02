//! corvus-drv - the compiler driver binary `corvusc`.
//!
//! Wires every phase crate into a single pipeline: parse, resolve (name
//! resolution + type checking + ownership analysis, all interleaved in
//! `corvus_sem::Resolver`), monomorphize, lower to IR, verify, optimize.
//! Everything past optimization (register allocation, native code
//! emission) is the external collaborator boundary `corvus-lir`/
//! `corvus-gen` sketch; this driver only crosses that boundary when asked
//! to (`--emit-lir`/`--emit-llvm-ir`), for debugging.
//!
//! Diagnostics from every phase converge on one contract: the first error
//! reported stops the pipeline and is printed as a single
//! `error: <message> at <line>:<col>` line on stderr, exit code 1.

use corvus_ir::{lower_module, optimize_module, print_module, verify_module, IRModule};
use corvus_mono::Monomorphizer;
use corvus_par::Parser;
use corvus_sem::Resolver;
use corvus_util::{Handler, Level};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// What to print to stdout after a successful compile, beyond the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmitMode {
    /// Nothing beyond the exit code (default).
    #[default]
    None,
    /// The IR text format, after lowering/verification/optimization.
    Ir,
    /// `{:#?}`-formatted LIR, one function at a time.
    Lir,
    /// LLVM IR text, via the `corvus-gen` sketch backend.
    LlvmIr,
}

/// Driver configuration, built from CLI flags by `main`.
#[derive(Debug, Clone)]
pub struct Config {
    pub source_file: PathBuf,
    pub emit: EmitMode,
    /// Skip the three IR passes (fold/DCE/inline); the verifier still runs.
    pub no_opt: bool,
    pub target: String,
}

impl Config {
    pub fn new(source_file: PathBuf) -> Self {
        Self {
            source_file,
            emit: EmitMode::None,
            no_opt: false,
            target: default_target(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("error: could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A diagnostic was already formatted and is ready to print verbatim.
    #[error("{0}")]
    Diagnostic(String),
}

/// Runs the full pipeline for one source file. On success, prints whatever
/// `config.emit` asked for to stdout and returns `Ok(())`; on the first
/// diagnostic from any phase, returns a [`DriverError::Diagnostic`] already
/// formatted per the single-line stderr contract.
pub fn run(config: &Config) -> Result<(), DriverError> {
    let source = std::fs::read_to_string(&config.source_file).map_err(|e| DriverError::Io {
        path: config.source_file.clone(),
        source: e,
    })?;

    let mut handler = Handler::new();

    debug!(file = %config.source_file.display(), "parsing");
    let ast = Parser::new(&source, &mut handler).parse();
    if let Some(line) = first_diagnostic_line(&handler) {
        return Err(DriverError::Diagnostic(line));
    }

    debug!("resolving");
    let resolved = Resolver::new(&handler).resolve(&ast);
    if let Some(line) = first_diagnostic_line(&handler) {
        return Err(DriverError::Diagnostic(line));
    }

    debug!(instantiations = resolved.instantiations.len(), "monomorphizing");
    let items = Monomorphizer::new().run(resolved);

    let module_name = module_name_for(&config.source_file);
    debug!(module = %module_name, "lowering to IR");
    let mut module = lower_module(&module_name, &items)
        .map_err(|e| DriverError::Diagnostic(format!("error: {}", e)))?;

    let verify_errors = verify_module(&module);
    if let Some(first) = verify_errors.first() {
        return Err(DriverError::Diagnostic(format!("error: {}", first)));
    }

    if !config.no_opt {
        let rewrites = optimize_module(&mut module);
        debug!(rewrites, "optimization passes converged");
    }

    emit(config, &module)?;

    Ok(())
}

fn emit(config: &Config, module: &IRModule) -> Result<(), DriverError> {
    match config.emit {
        EmitMode::None => {}
        EmitMode::Ir => println!("{}", print_module(module)),
        EmitMode::Lir => {
            for function in &module.functions {
                let lir = corvus_lir::lower_ir_function(function);
                println!("{:#?}", lir);
            }
        }
        EmitMode::LlvmIr => {
            let ir_text = emit_llvm_ir(module, &config.target)
                .map_err(|e| DriverError::Diagnostic(format!("error: {}", e)))?;
            println!("{}", ir_text);
        }
    }
    Ok(())
}

/// Crosses the lowering-to-LIR and LLVM-emission boundary for every
/// function in `module`, producing the textual LLVM IR the external
/// native-code emitter would consume. Only reachable via `--emit-llvm-ir`;
/// the core pipeline never calls this.
fn emit_llvm_ir(module: &IRModule, target: &str) -> corvus_gen::Result<String> {
    let context = inkwell::context::Context::create();
    let mut backend = corvus_gen::LlvmBackend::new(
        &context,
        &module.name,
        target.to_string(),
        inkwell::OptimizationLevel::Default,
    );

    for function in &module.functions {
        let lir = corvus_lir::lower_ir_function(function);
        backend.compile_function(&lir)?;
    }

    Ok(backend.emit_llvm_ir())
}

/// Formats the first reported error, if any, as `error: <message> at
/// <line>:<col>` per the single-line stderr contract. Warnings are
/// collected but never stop compilation or appear on this path.
fn first_diagnostic_line(handler: &Handler) -> Option<String> {
    handler
        .diagnostics()
        .into_iter()
        .find(|d| d.level == Level::Error)
        .map(|d| format!("error: {} at {}:{}", d.message, d.span.line, d.span.column))
}

fn module_name_for(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("module")
        .to_string()
}

fn default_target() -> String {
    std::env::var("TARGET").unwrap_or_else(|_| {
        if cfg!(target_os = "macos") {
            "x86_64-apple-darwin".to_string()
        } else if cfg!(target_os = "windows") {
            "x86_64-pc-windows-msvc".to_string()
        } else {
            "x86_64-unknown-linux-gnu".to_string()
        }
    })
}
