//! rxgen CLI
//!
//! Generates reactive model code from declaration files, or checks them
//! without writing anything.

use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use rxgen::{codes, Builder, GenerationOutput, GeneratorConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rxgen")]
#[command(about = "rxgen - reactive model compiler")]
#[command(version)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate model code into a directory
    Generate(GenerateArgs),
    /// Report diagnostics without generating
    Check(CheckArgs),
    /// List every diagnostic code
    Codes,
}

#[derive(Args)]
struct GenerateArgs {
    /// Declaration files or directories
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    out_dir: PathBuf,

    /// Path to rxgen.toml
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct CheckArgs {
    /// Declaration files or directories
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Human)]
    format: Format,

    /// Path to rxgen.toml
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Human,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::from(2)
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Run one command; `Ok(false)` means diagnostics failed the run.
fn run(command: Commands) -> anyhow::Result<bool> {
    match command {
        Commands::Generate(args) => {
            let config = load_config(args.config.as_ref())?;
            let deny_warnings = config.deny_warnings;
            let output = builder(&args.inputs, config)
                .out_dir(&args.out_dir)
                .compile()
                .with_context(|| format!("generating into {}", args.out_dir.display()))?;
            eprint!("{}", output.render_human());
            Ok(!output.is_failure(deny_warnings))
        }
        Commands::Check(args) => {
            let config = load_config(args.config.as_ref())?;
            let deny_warnings = config.deny_warnings;
            let output = builder(&args.inputs, config).check()?;
            report(&output, args.format)?;
            Ok(!output.is_failure(deny_warnings))
        }
        Commands::Codes => {
            for code in codes::ALL {
                println!("{}  {:<7}  {}", code.id, code.severity.to_string(), code.title);
            }
            Ok(true)
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<GeneratorConfig> {
    match path {
        Some(path) => GeneratorConfig::load(path)
            .with_context(|| format!("loading {}", path.display())),
        None => Ok(GeneratorConfig::default()),
    }
}

fn builder(inputs: &[PathBuf], config: GeneratorConfig) -> Builder {
    inputs
        .iter()
        .fold(Builder::new().config(config).cargo_directives(false), |b, input| {
            if input.is_dir() {
                b.source_dir(input)
            } else {
                b.source_file(input)
            }
        })
}

fn report(output: &GenerationOutput, format: Format) -> anyhow::Result<()> {
    match format {
        Format::Human => print!("{}", output.render_human()),
        Format::Json => println!("{}", output.to_json()?),
    }
    Ok(())
}
