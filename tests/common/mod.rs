//! Shared test helpers for integration tests

#![allow(dead_code)]

use assert_cmd::cargo;
use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A `ridge` command isolated in `tmp`
///
/// The working directory, home and XDG directories all point into `tmp`, so
/// no real user configuration or catalog store is read.
pub fn ridge(tmp: &TempDir) -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("ridge"));
    cmd.current_dir(tmp.path())
        .env("HOME", tmp.path())
        .env("XDG_CONFIG_HOME", tmp.path().join(".config"))
        .env("XDG_DATA_HOME", tmp.path().join(".local/share"))
        .env_remove("RIDGE_CONFIG")
        .env_remove("RIDGE_CATALOG")
        .env_remove("RIDGE_USER")
        .env_remove("RIDGE_MARGIN_PERCENT")
        .env_remove("RUST_LOG");
    cmd
}

pub const SIMPLE_JOB: &str = "\
customer:
  name: Dana Whitfield
  address: 14 Larch Lane
buildings:
  - id: house
    name: Main House
    roof_system: brava
    measurements:
      total_squares: 20
      eave_length: 120
    selections:
      - item_id: brava-field-tile
        quantity: 28
      - item_id: drip-edge
        quantity: 10
optional_selections:
  - item_id: snow-guards
    quantity: 20
";

pub const AUTO_JOB: &str = "\
customer:
  name: Sam Ortega
  address: 3 Quarry Road
description: Tear off and install asphalt shingles
buildings:
  - id: house
    name: House
    measurements:
      total_squares: 30
      ridge_length: 40
      eave_length: 150
      rake_length: 80
      penetrations: 2
";

pub const SIMPLE_SHEET: &str = "\
Item,Quantity,Unit,Unit Price,Total,Category,Notes
Brava Field Tile,28,bundle,43.25,1211,materials
";

/// Write `content` to `name` inside `tmp`
pub fn write_file(tmp: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = tmp.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// Run `ridge quote` on `job` and save the estimate as `estimate.json`
pub fn quote_to_file(tmp: &TempDir, job: &str) -> PathBuf {
    let job_path = write_file(tmp, "job.yaml", job);
    let out = tmp.path().join("estimate.json");
    ridge(tmp)
        .args(["quote", "-f", "json", "-o"])
        .arg(&out)
        .arg(&job_path)
        .assert()
        .success();
    out
}

pub fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 0.01
}
