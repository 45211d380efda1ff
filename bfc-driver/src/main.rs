//! Compiler driver
//!
//! Command-line front door: compiles a source file to bytecode,
//! optionally optimizes it, then either executes it against stdin and
//! stdout or writes the bytecode out as an annotated listing or JSON.

use bfc_bytecode::{listing, Program};
use bfc_frontend::Compiler;
use bfc_opt::Optimizer;
use bvm::{Cpu, Memory};
use clap::{Parser, Subcommand};
use log::info;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "bfc")]
#[command(about = "Optimizing tape-machine compiler and interpreter")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a source file and execute it
    Run {
        /// Input source file
        input: PathBuf,

        /// Execute the raw compiler output without optimizing it
        #[arg(long)]
        no_optimize: bool,
    },

    /// Compile a source file and write out the bytecode
    Compile {
        /// Input source file
        input: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format: "listing" or "json"
        #[arg(short, long, default_value = "listing")]
        format: String,

        /// Skip the optimizer
        #[arg(long)]
        no_optimize: bool,

        /// Drop source spans from the emitted bytecode
        #[arg(long)]
        strip_debug_info: bool,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { input, no_optimize } => {
            if let Err(e) = run_file(&input, no_optimize) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Compile {
            input,
            output,
            format,
            no_optimize,
            strip_debug_info,
        } => {
            if let Err(e) = compile_file(
                &input,
                output.as_deref(),
                &format,
                no_optimize,
                strip_debug_info,
            ) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn compile_source(path: &Path, no_optimize: bool) -> Result<Program, Box<dyn std::error::Error>> {
    let source = fs::read_to_string(path)?;
    let program = Compiler::new().compile(&source)?;
    info!(
        "compiled {}: {} instructions",
        path.display(),
        program.len()
    );
    if no_optimize {
        return Ok(program);
    }
    let optimized = Optimizer::new().optimize(&program)?;
    info!("optimized down to {} instructions", optimized.len());
    Ok(optimized)
}

fn run_file(path: &Path, no_optimize: bool) -> Result<(), Box<dyn std::error::Error>> {
    let program = compile_source(path, no_optimize)?;
    let mut memory = Memory::new();
    let stdin = io::stdin();
    let stdout = io::stdout();
    Cpu::new().run(&program, &mut memory, &mut stdin.lock(), &mut stdout.lock())?;
    Ok(())
}

fn render_program(program: &Program, format: &str) -> Result<String, Box<dyn std::error::Error>> {
    match format {
        "listing" => Ok(listing::render(program)),
        "json" => {
            let mut text = serde_json::to_string_pretty(program)?;
            text.push('\n');
            Ok(text)
        }
        _ => Err(format!("unknown output format: {}", format).into()),
    }
}

fn compile_file(
    input_path: &Path,
    output_path: Option<&Path>,
    format: &str,
    no_optimize: bool,
    strip_debug_info: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut program = compile_source(input_path, no_optimize)?;
    if strip_debug_info {
        program.strip_debug_info();
    }
    let text = render_program(&program, format)?;
    match output_path {
        Some(path) => {
            fs::write(path, &text)?;
            info!("bytecode written to {}", path.display());
        }
        None => print!("{}", text),
    }
    Ok(())
}
