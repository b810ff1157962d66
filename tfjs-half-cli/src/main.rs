//! tfjs-half CLI: narrow a TensorFlow.js model directory to float16.

mod report;
mod settings;

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use settings::SettingsOverrides;

/// Convert float32 TensorFlow.js weights to float16
#[derive(Parser, Debug)]
#[command(name = "tfjs-half", version, about, long_about = None)]
struct Cli {
    /// Source model directory (holds model.json and *.bin)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Destination directory for the converted model
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Settings file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print the resolved settings and exit
    Config,
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = match verbose {
        0 if quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    // RUST_LOG takes precedence over -v / -q
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(filter);

    tracing_subscriber::registry().with(stderr_layer).init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let working_dir = std::env::current_dir().context("Cannot determine working directory")?;
    let overrides = SettingsOverrides {
        input_dir: cli.input,
        output_dir: cli.output,
    };
    let settings = settings::load_settings(&working_dir, cli.config.as_deref(), &overrides)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    if let Some(Commands::Config) = cli.command {
        print!("{}", toml::to_string_pretty(&settings)?);
        return Ok(());
    }

    let summary = tfjs_half_core::convert_model(&settings.converter_config())?;

    if cli.json {
        println!("{}", report::render_json(&summary)?);
    } else {
        let output_dir =
            std::path::absolute(&summary.output_dir).unwrap_or_else(|_| summary.output_dir.clone());
        print!("{}", report::render_text(&summary, &output_dir));
    }
    Ok(())
}

fn main() -> ExitCode {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
