//! Pipeline driver.
//!
//! Forces full evaluation of an assembled stream. Nothing upstream
//! runs until the driver pulls, and each pull recursively draws just
//! one element through the whole chain, so memory stays bounded by the
//! stages' own per-record needs.

use log::{info, warn};

use crate::error::PipelineError;
use crate::stage::RecordStream;

/// Behavioral knobs threaded from the runner into the drive.
/// Explicit value, never ambient state.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunContext {
    /// Skip and log bad records instead of aborting the drive.
    pub lenient: bool,
}

/// Counters from a completed drive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriveStats {
    /// Records that reached the end of the chain.
    pub records: usize,
    /// Records skipped under the lenient policy.
    pub skipped: usize,
}

/// Iterate the stream to exhaustion, discarding elements.
///
/// Terminal stages perform their output side effect while producing
/// each element, so discarding here loses nothing observable. Strict
/// drives abort on the first failure with no partial-result salvage;
/// lenient drives log recoverable failures and keep pulling.
/// Configuration and I/O failures abort either way.
pub fn drive(stream: RecordStream, ctx: &RunContext) -> Result<DriveStats, PipelineError> {
    let mut stats = DriveStats::default();
    for item in stream {
        match item {
            Ok(_) => stats.records += 1,
            Err(err) if ctx.lenient && err.is_recoverable() => {
                warn!("skipping record: {err}");
                stats.skipped += 1;
            }
            Err(err) => return Err(err),
        }
    }
    info!("drained {} records ({} skipped)", stats.records, stats.skipped);
    Ok(stats)
}
