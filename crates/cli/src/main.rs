use anyhow::{Context, Result};
use browser::chromium::ChromiumSession;
use clap::{Parser, Subcommand};
use cli::report;
use fetchlog_core::config::{self, AppConfig};
use fetchlog_core::models::RunOutcome;
use fetchlog_core::pipeline::{self, PipelineSummary};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let mut cfg = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { dir, json, strict } => {
            apply_dir(&mut cfg, dir);
            let session = ChromiumSession::launch(&cfg.launch_options())
                .await
                .context("launching browser")?;
            let summary = pipeline::run(&cfg, session).await?;
            finish(&summary, json, strict)
        }
        Commands::Process { dir, json, strict } => {
            apply_dir(&mut cfg, dir);
            let summary = pipeline::process(&cfg)?;
            finish(&summary, json, strict)
        }
        Commands::Convert {
            input,
            output,
            json,
        } => {
            let output = output.unwrap_or_else(|| input.with_extension("xlsx"));
            let outcome = pipeline::convert_outcome(&input, &output);
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                println!("{}", report::render_outcome(&outcome));
            }
            Ok(ExitCode::from(match outcome {
                RunOutcome::Converted(_) => 0,
                _ => 1,
            }))
        }
    }
}

#[derive(Parser)]
#[command(name = "fetchlog")]
#[command(about = "Download a log file with a headless browser and convert it to a spreadsheet", long_about = None)]
struct Cli {
    /// Path to config TOML
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download, rename and convert
    Run {
        /// Target directory (overrides config and GITHUB_WORKSPACE)
        #[arg(long)]
        dir: Option<String>,
        /// Output JSON summary
        #[arg(long)]
        json: bool,
        /// Exit non-zero when no file is found (2) or conversion fails (3)
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
    /// Rename and convert the newest file already in the directory
    Process {
        /// Target directory (overrides config and GITHUB_WORKSPACE)
        #[arg(long)]
        dir: Option<String>,
        /// Output JSON summary
        #[arg(long)]
        json: bool,
        /// Exit non-zero when no file is found (2) or conversion fails (3)
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
    /// Convert a single JSON text file
    Convert {
        /// File containing a JSON document
        input: PathBuf,
        /// Spreadsheet to write; defaults to INPUT with an .xlsx extension
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
}

fn apply_dir(cfg: &mut AppConfig, dir: Option<String>) {
    if let Some(d) = dir {
        cfg.workspace.dir = d;
    }
    info!("Target directory: {}", cfg.workspace.dir);
}

fn finish(summary: &PipelineSummary, json: bool, strict: bool) -> Result<ExitCode> {
    if json {
        println!("{}", report::render_json(summary)?);
    } else {
        println!("{}", report::render_text(summary));
    }
    Ok(report::exit_code(&summary.outcome, strict))
}
