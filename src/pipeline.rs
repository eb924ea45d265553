//! Pipeline assembler.
//!
//! Folds an ordered list of configured stages into one end-to-end lazy
//! stream. Assembly composes closures only; no stream is iterated, so
//! building a chain costs the same whether it will carry three records
//! or three billion.

use log::debug;

use crate::stage::{RecordStream, Stage};

/// An empty record stream, the runner's initial pipeline input.
/// Sources are stages, so a pipeline starts from nothing.
pub fn empty() -> RecordStream {
    Box::new(std::iter::empty())
}

/// Compose configured stages left-to-right over an initial stream.
/// No-op pass-through markers contribute nothing and are skipped.
pub fn assemble(source: RecordStream, stages: Vec<Stage>) -> RecordStream {
    let mut stream = source;
    for stage in stages {
        if stage.is_noop() {
            continue;
        }
        debug!("chaining stage: {}", stage.name());
        stream = stage.apply(stream);
    }
    stream
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use crate::stage::{BoundsConfig, BufferConfig};
    use serde_json::json;
    use std::cell::Cell;
    use std::rc::Rc;

    fn stream_of(recs: Vec<Record>) -> RecordStream {
        Box::new(recs.into_iter().map(Ok))
    }

    fn point_feature(x: f64, y: f64) -> Record {
        json!({"type": "Feature", "geometry": {"type": "Point", "coordinates": [x, y]}})
    }

    #[test]
    fn test_all_noop_pipeline_reproduces_input() {
        let input = vec![json!({"a": 1}), json!({"b": 2}), json!({"c": 3})];
        let out: Vec<Record> =
            assemble(stream_of(input.clone()), vec![Stage::Noop, Stage::Noop])
                .collect::<Result<_, _>>()
                .unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_empty_stage_list_passes_source_through() {
        let out: Vec<Record> = assemble(stream_of(vec![json!(1)]), vec![])
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(out, vec![json!(1)]);
    }

    #[test]
    fn test_empty_source_and_stages_is_empty() {
        assert_eq!(assemble(empty(), vec![]).count(), 0);
    }

    #[test]
    fn test_assembly_is_associative() {
        let stages = || {
            (
                Stage::Buffer(BufferConfig { distance: 1.0 }),
                Stage::Bounds(BoundsConfig::default()),
                Stage::Noop,
            )
        };
        let input = || stream_of(vec![point_feature(0.0, 0.0), point_feature(5.0, 5.0)]);

        let (a, b, c) = stages();
        let flat: Vec<Record> = assemble(input(), vec![a, b, c])
            .collect::<Result<_, _>>()
            .unwrap();

        let (a, b, c) = stages();
        let head = assemble(input(), vec![a]);
        let nested: Vec<Record> = assemble(head, vec![b, c])
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(flat, nested);
        assert_eq!(flat, vec![json!([-1.0, -1.0, 1.0, 1.0]), json!([4.0, 4.0, 6.0, 6.0])]);
    }

    #[test]
    fn test_assembly_pulls_nothing() {
        let pulled = Rc::new(Cell::new(0usize));
        let counter = Rc::clone(&pulled);
        let source: RecordStream = Box::new((0..100).map(move |_| {
            counter.set(counter.get() + 1);
            Ok(point_feature(0.0, 0.0))
        }));
        let stream = assemble(
            source,
            vec![
                Stage::Buffer(BufferConfig { distance: 2.0 }),
                Stage::Bounds(BoundsConfig::default()),
            ],
        );
        assert_eq!(pulled.get(), 0);
        drop(stream);
    }
}
