//! Stage contract and adapters.
//!
//! A stage is one composable unit of the pipeline: a function from a
//! lazy record stream to a lazy record stream. The closed set of
//! stages lives in [`Stage`]; each variant holds its validated
//! configuration, captured at construction, and is applied to its
//! input exactly once. Applying a stage composes iterators only: it
//! performs no I/O and pulls nothing from upstream.
//!
//! The adapter helpers lift the two author-facing shapes into the
//! uniform contract: fallible per-record functions ([`map_records`],
//! [`flat_map_records`]) and upstream-independent producers
//! ([`pass_through_then`], which passes upstream through unchanged and
//! then appends the produced records).

use std::io::{self, Write};

use serde_json::json;

use crate::error::PipelineError;
use crate::geom::{self, Bbox};
use crate::record::{self, Record};
use crate::seq;

/// A lazy, single-pass sequence of records. Errors surface as elements
/// at the point of production.
pub type RecordStream = Box<dyn Iterator<Item = Result<Record, PipelineError>>>;

/// Lift a fallible one-to-one record function into a stream transform.
/// Failures already in the stream pass through untouched.
pub fn map_records<F>(input: RecordStream, mut f: F) -> RecordStream
where
    F: FnMut(Record) -> Result<Record, PipelineError> + 'static,
{
    Box::new(input.map(move |item| item.and_then(&mut f)))
}

/// Lift a fallible one-to-many record function into a stream transform.
pub fn flat_map_records<F>(input: RecordStream, mut f: F) -> RecordStream
where
    F: FnMut(Record) -> Result<Vec<Record>, PipelineError> + 'static,
{
    Box::new(input.flat_map(move |item| match item.and_then(&mut f) {
        Ok(records) => records.into_iter().map(Ok).collect::<Vec<_>>(),
        Err(e) => vec![Err(e)],
    }))
}

/// Generator adapter: every upstream record passes through unchanged,
/// then the source's records are appended. Lets a producing stage sit
/// anywhere in a chain without reordering upstream output.
pub fn pass_through_then(input: RecordStream, source: RecordStream) -> RecordStream {
    Box::new(input.chain(source))
}

/// Configuration of the bounds stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundsConfig {
    /// Decimal digits to round bounds to.
    pub precision: Option<u32>,
    /// One output record per contained feature instead of one per object.
    pub explode: bool,
    /// Attach identifiers to the computed bounds.
    pub with_id: bool,
    /// Echo the input object with the bounds merged in.
    pub with_obj: bool,
}

/// Configuration of the buffer stage.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferConfig {
    pub distance: f64,
}

/// Configuration of the close stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CloseConfig {
    /// Prefix each output record with an ASCII Record Separator.
    pub rs: bool,
}

/// The closed set of pipeline stages.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Source: stream parsed records from stdin, after passing any
    /// upstream records through.
    Open,
    /// Sink: write each record to stdout as it is pulled, passing it
    /// downstream unchanged.
    Close(CloseConfig),
    /// Replace each object with its bounding-box record(s).
    Bounds(BoundsConfig),
    /// Dilate each feature's geometry by a constant distance.
    Buffer(BufferConfig),
    /// Identity marker, skipped at assembly.
    Noop,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Open => "open",
            Stage::Close(_) => "close",
            Stage::Bounds(_) => "bounds",
            Stage::Buffer(_) => "buffer",
            Stage::Noop => "noop",
        }
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, Stage::Noop)
    }

    /// Apply this stage to its input stream, producing the successor
    /// stream. Composition only: no I/O happens and no element is
    /// pulled until the result is iterated.
    pub fn apply(self, input: RecordStream) -> RecordStream {
        match self {
            Stage::Open => pass_through_then(input, open_stdin()),
            Stage::Close(cfg) => map_records(input, move |rec| {
                write_stdout(&rec, cfg.rs)?;
                Ok(rec)
            }),
            Stage::Bounds(cfg) => {
                let mut index = 0usize;
                flat_map_records(input, move |obj| {
                    let out = bounds_records(obj, index, &cfg)
                        .map_err(|msg| PipelineError::transform(index, msg));
                    index += 1;
                    out
                })
            }
            Stage::Buffer(cfg) => {
                let mut index = 0usize;
                map_records(input, move |mut feat| {
                    let result = buffer_record(&mut feat, cfg.distance)
                        .map_err(|msg| PipelineError::transform(index, msg));
                    index += 1;
                    result.map(|()| feat)
                })
            }
            Stage::Noop => input,
        }
    }
}

/// Stdin record source. The lock is taken on first pull, not at
/// composition time.
fn open_stdin() -> RecordStream {
    Box::new(std::iter::once(()).flat_map(|()| seq::records(io::stdin().lock())))
}

fn write_stdout(rec: &Record, rs: bool) -> Result<(), PipelineError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_record(&mut out, rec, rs)
}

/// Serialize one record as a single output line, optionally prefixed
/// with an ASCII Record Separator.
pub fn write_record<W: Write>(out: &mut W, rec: &Record, rs: bool) -> Result<(), PipelineError> {
    if rs {
        out.write_all(b"\x1e")?;
    }
    serde_json::to_writer(&mut *out, rec).map_err(io::Error::from)?;
    out.write_all(b"\n")?;
    Ok(())
}

fn rounded(bbox: Bbox, precision: Option<u32>) -> Bbox {
    match precision {
        Some(digits) => bbox.rounded(digits),
        None => bbox,
    }
}

/// Bounding-box record(s) for one input object.
///
/// Plain features behave as a one-feature collection. Non-exploded
/// output reduces the contained features' boxes by min/max union;
/// exploded output yields one record per feature with its own box.
fn bounds_records(obj: Record, index: usize, cfg: &BoundsConfig) -> Result<Vec<Record>, String> {
    let obj_id = record::object_id(&obj, index);
    let features = record::contained_features(&obj);

    if cfg.explode {
        let mut out = Vec::with_capacity(features.len());
        for (j, mut feat) in features.into_iter().enumerate() {
            let bbox = rounded(geom::feature_bounds(&feat)?, cfg.precision);
            if cfg.with_obj {
                if cfg.with_id {
                    let fid = record::feature_id(&feat, j);
                    record::annotate(&mut feat, "id", fid)?;
                }
                record::annotate(&mut feat, "parent", obj_id.clone())?;
                record::annotate(&mut feat, "bbox", bbox.to_value())?;
                out.push(feat);
            } else if cfg.with_id {
                out.push(json!({
                    "parent": obj_id,
                    "id": record::feature_id(&feat, j),
                    "bbox": bbox.to_value(),
                }));
            } else {
                out.push(bbox.to_value());
            }
        }
        Ok(out)
    } else {
        let mut acc: Option<Bbox> = None;
        for feat in &features {
            let b = geom::feature_bounds(feat)?;
            acc = Some(acc.map_or(b, |a| a.union(b)));
        }
        let Some(bbox) = acc else {
            return Err("object contains no features".to_string());
        };
        let bbox = rounded(bbox, cfg.precision);
        if cfg.with_obj {
            let mut obj = obj;
            record::annotate(&mut obj, "id", obj_id)?;
            record::annotate(&mut obj, "bbox", bbox.to_value())?;
            Ok(vec![obj])
        } else if cfg.with_id {
            Ok(vec![json!({"id": obj_id, "bbox": bbox.to_value()})])
        } else {
            Ok(vec![bbox.to_value()])
        }
    }
}

/// Replace a feature's geometry with its dilation, in place.
fn buffer_record(feat: &mut Record, distance: f64) -> Result<(), String> {
    let geometry = feat
        .get("geometry")
        .ok_or_else(|| "feature has no geometry".to_string())?;
    if geometry.is_null() {
        return Err("feature has null geometry".to_string());
    }
    let buffered = geom::buffer(geometry, distance)?;
    record::annotate(feat, "geometry", buffered)
}
