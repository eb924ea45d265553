//! Pipeline-text parser.
//!
//! Pipeline format:
//! ```text
//! # bounding boxes of everything on stdin, RS-framed output
//! open
//! | bounds --explode --precision 2
//! | close --seq
//! ```
//!
//! - stages are separated by `|`, across lines or within one line
//! - lines starting with `#` are comments
//! - `open` streams records parsed from stdin
//! - `close [--seq]` writes records to stdout
//! - `bounds [--precision N] [--explode] [--with-id] [--with-obj]`
//! - `buffer <distance>`
//! - `noop` is an identity marker, skipped at assembly
//!
//! All parsing happens before any data flows: an unknown stage name,
//! unknown option, or bad value is a configuration error raised here,
//! never mid-stream.

use crate::error::PipelineError;
use crate::stage::{BoundsConfig, BufferConfig, CloseConfig, Stage};

/// Parse pipeline text into an ordered list of configured stages.
pub fn parse_pipeline(text: &str) -> Result<Vec<Stage>, PipelineError> {
    let mut stages = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        for segment in line.split('|') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let stage = parse_stage(segment)
                .map_err(|e| PipelineError::config(format!("line {}: {}", line_no + 1, e)))?;
            stages.push(stage);
        }
    }

    if stages.is_empty() {
        return Err(PipelineError::config("pipeline is empty"));
    }
    Ok(stages)
}

/// Parse a single stage segment, e.g. `bounds --explode`.
fn parse_stage(segment: &str) -> Result<Stage, String> {
    let mut tokens = segment.split_whitespace();
    let name = tokens.next().unwrap_or_default();
    let args: Vec<&str> = tokens.collect();

    match name {
        "open" => {
            expect_no_options("open", &args)?;
            Ok(Stage::Open)
        }
        "close" => parse_close(&args),
        "bounds" => parse_bounds(&args),
        "buffer" => parse_buffer(&args),
        "noop" => {
            expect_no_options("noop", &args)?;
            Ok(Stage::Noop)
        }
        other => Err(format!("unknown stage: {other}")),
    }
}

fn expect_no_options(name: &str, args: &[&str]) -> Result<(), String> {
    match args.first() {
        None => Ok(()),
        Some(arg) => Err(format!("{name}: unknown option '{arg}'")),
    }
}

fn parse_close(args: &[&str]) -> Result<Stage, String> {
    let mut cfg = CloseConfig::default();
    for arg in args {
        match *arg {
            "--seq" => cfg.rs = true,
            other => return Err(format!("close: unknown option '{other}'")),
        }
    }
    Ok(Stage::Close(cfg))
}

fn parse_bounds(args: &[&str]) -> Result<Stage, String> {
    let mut cfg = BoundsConfig::default();
    let mut it = args.iter();
    while let Some(arg) = it.next() {
        match *arg {
            "--precision" => {
                let value = it
                    .next()
                    .ok_or_else(|| "bounds: --precision needs a value".to_string())?;
                let digits: u32 = value
                    .parse()
                    .map_err(|_| format!("bounds: invalid precision '{value}'"))?;
                cfg.precision = Some(digits);
            }
            "--explode" => cfg.explode = true,
            "--with-id" => cfg.with_id = true,
            "--with-obj" => cfg.with_obj = true,
            other => return Err(format!("bounds: unknown option '{other}'")),
        }
    }
    Ok(Stage::Bounds(cfg))
}

fn parse_buffer(args: &[&str]) -> Result<Stage, String> {
    let mut distance: Option<f64> = None;
    for arg in args {
        if arg.starts_with("--") {
            return Err(format!("buffer: unknown option '{arg}'"));
        }
        if distance.is_some() {
            return Err("buffer takes exactly one distance".to_string());
        }
        let d: f64 = arg
            .parse()
            .map_err(|_| format!("buffer: invalid distance '{arg}'"))?;
        if !d.is_finite() {
            return Err("buffer distance must be finite".to_string());
        }
        distance = Some(d);
    }
    let distance = distance.ok_or_else(|| "buffer requires a distance".to_string())?;
    Ok(Stage::Buffer(BufferConfig { distance }))
}
