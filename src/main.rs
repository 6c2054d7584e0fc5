use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser as ClapParser, Subcommand};

use pascalc::config::CompilerConfig;
use pascalc::{compile_source, CompileResult};

#[derive(ClapParser)]
#[command(name = "pascalc", version, about = "Turbo Pascal 7 to C++ source-to-source compiler")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Translate a single Pascal source file to C++.
    Build {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Command::Build { input, output, config } => run_build(&input, output.as_deref(), config.as_deref()),
    }
}

fn run_build(input: &std::path::Path, output: Option<&std::path::Path>, config_path: Option<&std::path::Path>) -> ExitCode {
    let source = match fs::read_to_string(input) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("error: cannot read {}: {}", input.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let config = match config_path {
        Some(path) => match CompilerConfig::load(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => CompilerConfig::default(),
    };

    let base_dir = input.parent().unwrap_or_else(|| std::path::Path::new("."));
    match compile_source(&source, None, base_dir, &config) {
        CompileResult::Success { cpp_source, warnings } => {
            for w in &warnings {
                eprintln!("warning: {}", w.message);
            }
            match output {
                Some(path) => {
                    if let Err(e) = fs::write(path, cpp_source) {
                        eprintln!("error: cannot write {}: {}", path.display(), e);
                        return ExitCode::FAILURE;
                    }
                }
                None => print!("{}", cpp_source),
            }
            ExitCode::SUCCESS
        }
        CompileResult::Failure { diagnostics } => {
            for d in &diagnostics {
                eprintln!("error: {}", d.message);
            }
            ExitCode::FAILURE
        }
    }
}
