//! JSON record type and field accessors.
//!
//! Records are opaque to the pipeline core: any JSON value flows. The
//! helpers here are the few field reads the domain stages share,
//! identifiers and contained features of GeoJSON-shaped objects.

use serde_json::Value;

/// One element of a record stream: an arbitrary JSON value, in practice
/// a GeoJSON Feature, FeatureCollection, or derived bounds record.
pub type Record = Value;

/// Identifier of a top-level object: its `id` field when present and
/// non-null, otherwise a synthesized `collection:<index>` id.
pub fn object_id(obj: &Record, index: usize) -> Value {
    obj.get("id")
        .filter(|v| !v.is_null())
        .cloned()
        .unwrap_or_else(|| Value::String(format!("collection:{index}")))
}

/// Identifier of a contained feature: its `id` field when present and
/// non-null, otherwise a synthesized `feature:<index>` id.
pub fn feature_id(feat: &Record, index: usize) -> Value {
    feat.get("id")
        .filter(|v| !v.is_null())
        .cloned()
        .unwrap_or_else(|| Value::String(format!("feature:{index}")))
}

/// The features contained in an object: the `features` array when
/// present and non-empty, otherwise the object itself as a single
/// trivial collection of one.
pub fn contained_features(obj: &Record) -> Vec<Record> {
    match obj.get("features").and_then(Value::as_array) {
        Some(features) if !features.is_empty() => features.clone(),
        _ => vec![obj.clone()],
    }
}

/// Insert a key into an object record. Errors on non-object records.
pub fn annotate(rec: &mut Record, key: &str, value: Value) -> Result<(), String> {
    match rec.as_object_mut() {
        Some(map) => {
            map.insert(key.to_string(), value);
            Ok(())
        }
        None => Err("cannot annotate a non-object record".to_string()),
    }
}
