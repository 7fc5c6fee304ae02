//! `corvusc` - compile a single source file.
//!
//! Usage: `corvusc <source-file> [--emit-ir|--emit-lir|--emit-llvm-ir] [--no-opt] [-v]`

use clap::Parser as ClapParser;
use corvus_drv::{run, Config, EmitMode};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// The `corvus` compiler core: parse, resolve, monomorphize, lower to IR,
/// verify, optimize.
#[derive(ClapParser, Debug)]
#[command(name = "corvusc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compiles a single corvus source file", long_about = None)]
struct Cli {
    /// Source file to compile.
    source_file: PathBuf,

    /// Print the IR text format after optimization.
    #[arg(long)]
    emit_ir: bool,

    /// Print the lowered LIR for each function.
    #[arg(long)]
    emit_lir: bool,

    /// Print LLVM IR, via the sketch backend in `corvus-gen`.
    #[arg(long)]
    emit_llvm_ir: bool,

    /// Skip the constant-folding/DCE/inlining passes; the verifier still runs.
    #[arg(long)]
    no_opt: bool,

    /// Enable internal pass logging (equivalent to `RUST_LOG=debug`).
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let emit = match (cli.emit_ir, cli.emit_lir, cli.emit_llvm_ir) {
        (true, false, false) => EmitMode::Ir,
        (false, true, false) => EmitMode::Lir,
        (false, false, true) => EmitMode::LlvmIr,
        (false, false, false) => EmitMode::None,
        _ => {
            eprintln!("error: at most one of --emit-ir, --emit-lir, --emit-llvm-ir may be given");
            std::process::exit(1);
        }
    };

    let mut config = Config::new(cli.source_file);
    config.emit = emit;
    config.no_opt = cli.no_opt;

    if let Err(e) = run(&config) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_new("debug").unwrap()
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .try_init()
        .ok();
}
