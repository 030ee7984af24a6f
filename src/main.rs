use audit_rdd::config::{AnalysisConfig, DEFAULT_TOP_N};
use audit_rdd::event::analyze_lag;
use audit_rdd::pipeline::analyze_cardinality;
use audit_rdd::storage::AuditSource;
use audit_rdd::AuditError;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "audit-rdd")]
#[command(about = "Cardinality and lag analysis for metric audit dumps", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Find prefixes and path positions with exploding cardinality.
    Cardinality {
        /// Audit file (<metric_name> <value> <timestamp> per line)
        #[arg(default_value = "audit.txt")]
        file: PathBuf,
        /// TOML file with report tuning (threshold, limits, jobs)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Flag positions with more unique values than this
        #[arg(long)]
        threshold: Option<usize>,
        /// Worker count (default: adaptive, bounded by CPU cores)
        #[arg(short, long)]
        jobs: Option<usize>,
        /// Output JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Report out-of-order (lagging) timestamps.
    Lag {
        /// Audit file; first field is the metric, last field the timestamp
        file: PathBuf,
        /// Max lag events to show
        #[arg(default_value_t = DEFAULT_TOP_N as i64, allow_negative_numbers = true)]
        top_n: i64,
        /// Output JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

impl Command {
    fn failure_code(&self) -> i32 {
        match self {
            Command::Cardinality { .. } => 1,
            Command::Lag { .. } => 2,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let code = cli.command.failure_code();
    if let Err(e) = run(cli.command) {
        eprintln!("Error: {:#}", e);
        std::process::exit(code);
    }
}

fn run(command: Command) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match command {
        Command::Cardinality {
            file,
            config,
            threshold,
            jobs,
            json,
        } => {
            let mut cfg = match config {
                Some(path) => AnalysisConfig::load(&path)?,
                None => AnalysisConfig::default(),
            };
            if let Some(t) = threshold {
                cfg.threshold = t;
            }
            if jobs.is_some() {
                cfg.jobs = jobs;
            }

            let run = analyze_cardinality(&file, &cfg)?;
            if json {
                serde_json::to_writer_pretty(&mut out, &run)?;
                writeln!(out)?;
            } else {
                write!(out, "{}", run)?;
            }
        }
        Command::Lag { file, top_n, json } => {
            let top_n = usize::try_from(top_n)
                .ok()
                .filter(|n| *n >= 1)
                .ok_or_else(|| {
                    AuditError::InvalidArgument(format!(
                        "topN must be a positive integer, got: {}",
                        top_n
                    ))
                })?;
            let source = AuditSource::open(&file)?;
            let report = analyze_lag(&source, top_n)?;
            if json {
                serde_json::to_writer_pretty(&mut out, &report)?;
                writeln!(out)?;
            } else {
                write!(out, "{}", report)?;
            }
        }
    }

    out.flush()?;
    Ok(())
}
