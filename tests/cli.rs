//! End-to-end tests for the geopipe binary.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{Value, json};
use std::io::Write;

fn geopipe() -> Command {
    Command::cargo_bin("geopipe").unwrap()
}

fn unit_square_feature() -> String {
    json!({
        "type": "Feature",
        "geometry": {"type": "Polygon",
            "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]},
    })
    .to_string()
}

fn two_feature_collection() -> String {
    json!({
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "geometry": {"type": "Polygon",
                "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]}},
            {"type": "Feature", "geometry": {"type": "Polygon",
                "coordinates": [[[2.0, 2.0], [3.0, 2.0], [3.0, 3.0], [2.0, 3.0], [2.0, 2.0]]]}},
        ],
    })
    .to_string()
}

fn stdout_records(output: &std::process::Output) -> Vec<Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line.trim_start_matches('\u{1e}')).unwrap())
        .collect()
}

#[test]
fn bounds_of_plain_feature() {
    let output = geopipe()
        .arg("bounds")
        .write_stdin(format!("{}\n", unit_square_feature()))
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_records(&output), vec![json!([0.0, 0.0, 1.0, 1.0])]);
}

#[test]
fn bounds_reduces_collection_by_union() {
    let output = geopipe()
        .arg("bounds")
        .write_stdin(format!("{}\n", two_feature_collection()))
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_records(&output), vec![json!([0.0, 0.0, 3.0, 3.0])]);
}

#[test]
fn bounds_explode_emits_one_record_per_feature() {
    let output = geopipe()
        .args(["bounds", "--explode"])
        .write_stdin(format!("{}\n", two_feature_collection()))
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(
        stdout_records(&output),
        vec![json!([0.0, 0.0, 1.0, 1.0]), json!([2.0, 2.0, 3.0, 3.0])]
    );
}

#[test]
fn bounds_with_id_annotates_output() {
    let output = geopipe()
        .args(["bounds", "--with-id"])
        .write_stdin(format!("{}\n", two_feature_collection()))
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(
        stdout_records(&output),
        vec![json!({"id": "collection:0", "bbox": [0.0, 0.0, 3.0, 3.0]})]
    );
}

#[test]
fn bounds_with_obj_echoes_input() {
    let output = geopipe()
        .args(["bounds", "--with-obj"])
        .write_stdin(format!("{}\n", unit_square_feature()))
        .output()
        .unwrap();
    assert!(output.status.success());
    let records = stdout_records(&output);
    assert_eq!(records[0]["type"], json!("Feature"));
    assert_eq!(records[0]["bbox"], json!([0.0, 0.0, 1.0, 1.0]));
    assert_eq!(records[0]["id"], json!("collection:0"));
}

#[test]
fn bounds_precision_rounds_exactly() {
    let feature = json!({
        "type": "Feature",
        "geometry": {"type": "Point", "coordinates": [1.23456, 1.23456]},
    });
    let output = geopipe()
        .args(["bounds", "--precision", "2"])
        .write_stdin(format!("{feature}\n"))
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), "[1.23,1.23,1.23,1.23]");
}

#[test]
fn rs_framed_input_spanning_lines_is_detected() {
    let input = format!(
        "\u{1e}{{\"type\": \"Feature\",\n \"geometry\": {{\"type\": \"Point\", \"coordinates\": [5.0, 6.0]}}}}\n\u{1e}{}\n",
        unit_square_feature()
    );
    let output = geopipe().arg("bounds").write_stdin(input).output().unwrap();
    assert!(output.status.success());
    assert_eq!(
        stdout_records(&output),
        vec![json!([5.0, 6.0, 5.0, 6.0]), json!([0.0, 0.0, 1.0, 1.0])]
    );
}

#[test]
fn seq_flag_prefixes_output_with_rs() {
    let output = geopipe()
        .args(["bounds", "--seq"])
        .write_stdin(format!("{}\n", unit_square_feature()))
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(output.stdout.starts_with(b"\x1e"));
}

#[test]
fn strict_mode_stops_at_first_malformed_record() {
    let input = format!(
        "{}\nnot json\n{}\n",
        unit_square_feature(),
        unit_square_feature()
    );
    let output = geopipe().arg("bounds").write_stdin(input).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    // Output already written stays written; nothing after the failure.
    assert_eq!(stdout_records(&output).len(), 1);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("malformed"), "stderr: {stderr}");
}

#[test]
fn lenient_mode_skips_malformed_record_and_continues() {
    let input = format!(
        "{}\nnot json\n{}\n",
        unit_square_feature(),
        unit_square_feature()
    );
    let output = geopipe()
        .args(["bounds", "--lenient"])
        .write_stdin(input)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_records(&output).len(), 2);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("skipping record").count(), 1, "stderr: {stderr}");
}

#[test]
fn buffer_dilates_geometry() {
    let output = geopipe()
        .args(["buffer", "1.0"])
        .write_stdin(format!("{}\n", unit_square_feature()))
        .output()
        .unwrap();
    assert!(output.status.success());
    let records = stdout_records(&output);
    assert_eq!(records[0]["geometry"]["type"], json!("Polygon"));
    assert_eq!(
        records[0]["geometry"]["coordinates"][0][0],
        json!([-1.0, -1.0])
    );
}

#[test]
fn empty_input_drains_cleanly_in_both_framings() {
    for input in ["", "\u{1e}"] {
        let output = geopipe().arg("bounds").write_stdin(input).output().unwrap();
        assert!(output.status.success(), "input {input:?}");
        assert!(output.stdout.is_empty());
    }
}

#[test]
fn run_executes_inline_expression() {
    let output = geopipe()
        .args(["run", "--expr", "open | bounds | close"])
        .write_stdin(format!("{}\n", unit_square_feature()))
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_records(&output), vec![json!([0.0, 0.0, 1.0, 1.0])]);
}

#[test]
fn run_executes_pipeline_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "# bounds with ids").unwrap();
    writeln!(file, "open").unwrap();
    writeln!(file, "| bounds --with-id").unwrap();
    writeln!(file, "| close").unwrap();

    let output = geopipe()
        .args(["run", file.path().to_str().unwrap()])
        .write_stdin(format!("{}\n", two_feature_collection()))
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(
        stdout_records(&output),
        vec![json!({"id": "collection:0", "bbox": [0.0, 0.0, 3.0, 3.0]})]
    );
}

#[test]
fn run_rejects_unknown_stage_before_reading_input() {
    geopipe()
        .args(["run", "--expr", "open | frobnicate | close"])
        .write_stdin(format!("{}\n", unit_square_feature()))
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("unknown stage"));
}

#[test]
fn run_missing_pipeline_file_reports_context() {
    geopipe()
        .args(["run", "/no/such/pipeline.pipe"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("pipeline file"));
}

#[test]
fn noop_stages_change_nothing() {
    let output = geopipe()
        .args(["run", "--expr", "open | noop | bounds | noop | close"])
        .write_stdin(format!("{}\n", unit_square_feature()))
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_records(&output), vec![json!([0.0, 0.0, 1.0, 1.0])]);
}
