//! Per-record geometry operations.
//!
//! These are the domain collaborators the pipeline stages call: each
//! takes one record or geometry value and returns a deterministic,
//! serializable result or an error message. Errors are plain strings
//! here; the calling stage attributes them to a record index.

use serde::Serialize;
use serde_json::{Value, json};

/// A bounding box as `(west, south, east, north)`, serialized as a
/// four-element JSON array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bbox(pub f64, pub f64, pub f64, pub f64);

impl Bbox {
    /// Degenerate box around a single position.
    pub fn of_position(x: f64, y: f64) -> Self {
        Bbox(x, y, x, y)
    }

    /// Min/max union of two boxes.
    pub fn union(self, other: Bbox) -> Self {
        Bbox(
            self.0.min(other.0),
            self.1.min(other.1),
            self.2.max(other.2),
            self.3.max(other.3),
        )
    }

    /// Grow (or shrink, for negative distances) every side by `d`.
    pub fn expanded(self, d: f64) -> Self {
        Bbox(self.0 - d, self.1 - d, self.2 + d, self.3 + d)
    }

    /// Round every bound to `digits` decimal digits.
    pub fn rounded(self, digits: u32) -> Self {
        Bbox(
            round_to(self.0, digits),
            round_to(self.1, digits),
            round_to(self.2, digits),
            round_to(self.3, digits),
        )
    }

    /// True when `other` lies strictly inside this box on every side.
    pub fn strictly_contains(&self, other: &Bbox) -> bool {
        self.0 < other.0 && self.1 < other.1 && self.2 > other.2 && self.3 > other.3
    }

    pub fn to_value(self) -> Value {
        json!([self.0, self.1, self.2, self.3])
    }
}

fn round_to(v: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits as i32);
    (v * factor).round() / factor
}

/// Bounding box of a GeoJSON geometry value.
///
/// Handles any geometry with a `coordinates` member plus
/// `GeometryCollection`. The nesting depth of `coordinates` is not
/// checked against the geometry type; every position found contributes.
pub fn geometry_bounds(geom: &Value) -> Result<Bbox, String> {
    let obj = geom
        .as_object()
        .ok_or_else(|| "geometry must be a JSON object".to_string())?;

    if obj.get("type").and_then(Value::as_str) == Some("GeometryCollection") {
        let geometries = obj
            .get("geometries")
            .and_then(Value::as_array)
            .ok_or_else(|| "geometry collection has no geometries".to_string())?;
        let mut acc: Option<Bbox> = None;
        for g in geometries {
            let b = geometry_bounds(g)?;
            acc = Some(acc.map_or(b, |a| a.union(b)));
        }
        return acc.ok_or_else(|| "geometry collection is empty".to_string());
    }

    let coordinates = obj
        .get("coordinates")
        .ok_or_else(|| "geometry has no coordinates".to_string())?;
    let mut acc: Option<Bbox> = None;
    fold_positions(coordinates, &mut acc)?;
    acc.ok_or_else(|| "geometry has no positions".to_string())
}

fn fold_positions(value: &Value, acc: &mut Option<Bbox>) -> Result<(), String> {
    let arr = value
        .as_array()
        .ok_or_else(|| "coordinates must be nested arrays of positions".to_string())?;
    match arr.first() {
        None => Ok(()),
        Some(first) if first.is_number() => {
            let x = first
                .as_f64()
                .ok_or_else(|| "coordinate is not a number".to_string())?;
            let y = arr
                .get(1)
                .and_then(Value::as_f64)
                .ok_or_else(|| "position needs at least two coordinates".to_string())?;
            let b = Bbox::of_position(x, y);
            *acc = Some(acc.map_or(b, |a| a.union(b)));
            Ok(())
        }
        Some(_) => {
            for v in arr {
                fold_positions(v, acc)?;
            }
            Ok(())
        }
    }
}

/// Bounding box of a GeoJSON object: a Feature's geometry, or the
/// object itself when it already is a geometry.
pub fn feature_bounds(obj: &Value) -> Result<Bbox, String> {
    if let Some(geom) = obj.get("geometry") {
        if geom.is_null() {
            return Err("feature has null geometry".to_string());
        }
        return geometry_bounds(geom);
    }
    if obj.get("coordinates").is_some()
        || obj.get("type").and_then(Value::as_str) == Some("GeometryCollection")
    {
        return geometry_bounds(obj);
    }
    Err("object has no geometry".to_string())
}

/// Dilate a geometry by a constant distance.
///
/// The result is the geometry's envelope grown by `distance` on every
/// side, as a Polygon ring.
pub fn buffer(geom: &Value, distance: f64) -> Result<Value, String> {
    if !distance.is_finite() {
        return Err("buffer distance must be finite".to_string());
    }
    let Bbox(w, s, e, n) = geometry_bounds(geom)?.expanded(distance);
    if e < w || n < s {
        return Err("buffer distance collapses the geometry".to_string());
    }
    Ok(json!({
        "type": "Polygon",
        "coordinates": [[[w, s], [e, s], [e, n], [w, n], [w, s]]],
    }))
}

/// Apply a coordinate transform to every position of a geometry,
/// preserving its structure.
pub fn map_positions<F>(geom: &Value, f: &F) -> Result<Value, String>
where
    F: Fn(f64, f64) -> (f64, f64),
{
    let obj = geom
        .as_object()
        .ok_or_else(|| "geometry must be a JSON object".to_string())?;

    let mut out = obj.clone();
    if obj.get("type").and_then(Value::as_str) == Some("GeometryCollection") {
        let geometries = obj
            .get("geometries")
            .and_then(Value::as_array)
            .ok_or_else(|| "geometry collection has no geometries".to_string())?;
        let mapped = geometries
            .iter()
            .map(|g| map_positions(g, f))
            .collect::<Result<Vec<_>, _>>()?;
        out.insert("geometries".to_string(), Value::Array(mapped));
    } else {
        let coordinates = obj
            .get("coordinates")
            .ok_or_else(|| "geometry has no coordinates".to_string())?;
        out.insert("coordinates".to_string(), map_coordinate_tree(coordinates, f)?);
    }
    Ok(Value::Object(out))
}

fn map_coordinate_tree<F>(value: &Value, f: &F) -> Result<Value, String>
where
    F: Fn(f64, f64) -> (f64, f64),
{
    let arr = value
        .as_array()
        .ok_or_else(|| "coordinates must be nested arrays of positions".to_string())?;
    match arr.first() {
        None => Ok(Value::Array(vec![])),
        Some(first) if first.is_number() => {
            let x = first
                .as_f64()
                .ok_or_else(|| "coordinate is not a number".to_string())?;
            let y = arr
                .get(1)
                .and_then(Value::as_f64)
                .ok_or_else(|| "position needs at least two coordinates".to_string())?;
            let (x, y) = f(x, y);
            Ok(json!([x, y]))
        }
        Some(_) => {
            let mapped = arr
                .iter()
                .map(|v| map_coordinate_tree(v, f))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Array(mapped))
        }
    }
}
