//! Streaming GeoJSON pipeline CLI.
//!
//! Usage:
//!   geopipe run <pipeline-file>
//!   geopipe run -e "open | bounds --explode | close"
//!   geopipe bounds --precision 2 < features.jsonl
//!   geopipe buffer 1.5 --lenient < features.jsonl
//!
//! Records are read from stdin (newline-delimited JSON or RS-delimited
//! JSON text sequences, auto-detected) and written to stdout. Exit code
//! is 0 on a full drain, 1 on any failure.

use std::fs;
use std::process;

use anyhow::{Context, Result, bail, ensure};
use clap::{ArgAction, Parser, Subcommand};
use log::error;

use geopipe_rs::dsl;
use geopipe_rs::executor::{self, DriveStats, RunContext};
use geopipe_rs::pipeline;
use geopipe_rs::stage::{BoundsConfig, BufferConfig, CloseConfig, Stage};

#[derive(Parser)]
#[command(name = "geopipe", version, about = "Streaming GeoJSON record pipelines")]
struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a stage pipeline read from a file or inline expression
    Run {
        /// Pipeline definition file
        #[arg(required_unless_present = "expr")]
        pipeline: Option<String>,

        /// Inline pipeline expression, e.g. "open | bounds | close"
        #[arg(short, long, conflicts_with = "pipeline")]
        expr: Option<String>,
    },

    /// Print bounding boxes of GeoJSON objects read from stdin
    Bounds {
        /// Decimal precision of coordinates
        #[arg(long)]
        precision: Option<u32>,

        /// Explode collections into features
        #[arg(long)]
        explode: bool,

        /// Print ids and bounding boxes together
        #[arg(long)]
        with_id: bool,

        /// Print input objects and bounding boxes together
        #[arg(long)]
        with_obj: bool,

        /// Prefix each output record with an RS byte
        #[arg(long)]
        seq: bool,

        /// Log bad records and continue instead of aborting
        #[arg(long)]
        lenient: bool,
    },

    /// Buffer feature geometries by a constant distance
    Buffer {
        /// Buffer distance
        distance: f64,

        /// Prefix each output record with an RS byte
        #[arg(long)]
        seq: bool,

        /// Log bad records and continue instead of aborting
        #[arg(long)]
        lenient: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli.command) {
        error!("{err:#}");
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp(None)
        .init();
}

fn run(command: Command) -> Result<DriveStats> {
    match command {
        Command::Run { pipeline, expr } => {
            let text = match (pipeline, expr) {
                (_, Some(expr)) => expr,
                (Some(path), None) => fs::read_to_string(&path)
                    .with_context(|| format!("reading pipeline file '{path}'"))?,
                (None, None) => bail!("a pipeline file or --expr is required"),
            };
            let stages = dsl::parse_pipeline(&text)?;
            execute(stages, RunContext::default())
        }
        Command::Bounds {
            precision,
            explode,
            with_id,
            with_obj,
            seq,
            lenient,
        } => {
            let stages = vec![
                Stage::Open,
                Stage::Bounds(BoundsConfig {
                    precision,
                    explode,
                    with_id,
                    with_obj,
                }),
                Stage::Close(CloseConfig { rs: seq }),
            ];
            execute(stages, RunContext { lenient })
        }
        Command::Buffer {
            distance,
            seq,
            lenient,
        } => {
            ensure!(distance.is_finite(), "buffer distance must be finite");
            let stages = vec![
                Stage::Open,
                Stage::Buffer(BufferConfig { distance }),
                Stage::Close(CloseConfig { rs: seq }),
            ];
            execute(stages, RunContext { lenient })
        }
    }
}

fn execute(stages: Vec<Stage>, ctx: RunContext) -> Result<DriveStats> {
    let chain = pipeline::assemble(pipeline::empty(), stages);
    Ok(executor::drive(chain, &ctx)?)
}
