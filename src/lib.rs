//! # geopipe-rs
//!
//! A streaming pipeline engine for GeoJSON-shaped JSON records.
//!
//! Text arrives on one stream (newline-delimited JSON, or RS-delimited
//! JSON text sequences where records may span lines), is parsed into a
//! lazy record sequence, and flows through a chain of configured
//! stages composed at runtime. Nothing is materialized: every element
//! is pulled on demand from stdin through the whole chain, so memory
//! stays bounded no matter how much data passes.
//!
//! ## Overview
//!
//! - [`seq`] parses lines into records, detecting the framing from the
//!   first line
//! - [`stage`] defines the closed set of pipeline stages and the
//!   adapters that lift per-record functions into stream transforms
//! - [`pipeline`] composes configured stages into one lazy stream
//! - [`executor`] drives the stream to exhaustion and applies the
//!   strict or lenient failure policy
//! - [`dsl`] parses pipeline text such as `open | bounds | close`
//!
//! ## Example
//!
//! ```
//! use geopipe_rs::pipeline::assemble;
//! use geopipe_rs::stage::{BoundsConfig, RecordStream, Stage};
//! use serde_json::json;
//!
//! let feature = json!({
//!     "type": "Feature",
//!     "geometry": {"type": "Point", "coordinates": [2.0, 1.0]},
//! });
//! let source: RecordStream = Box::new(std::iter::once(Ok(feature)));
//!
//! let chain = assemble(source, vec![Stage::Bounds(BoundsConfig::default())]);
//! let out: Vec<_> = chain.collect::<Result<_, _>>().unwrap();
//! assert_eq!(out, vec![json!([2.0, 1.0, 2.0, 1.0])]);
//! ```

pub mod dsl;
pub mod error;
pub mod executor;
pub mod geom;
pub mod pipeline;
pub mod record;
pub mod seq;
pub mod stage;

pub use dsl::parse_pipeline;
pub use error::PipelineError;
pub use executor::{DriveStats, RunContext, drive};
pub use geom::Bbox;
pub use pipeline::{assemble, empty};
pub use record::Record;
pub use seq::{RS, RecordSeq, records};
pub use stage::{BoundsConfig, BufferConfig, CloseConfig, RecordStream, Stage};
