//! Tests d'intégration du binaire `geofiddle`

use std::io::Write;
use std::process::{Command, Output, Stdio};

fn run(args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_geofiddle"))
        .args(args)
        .env_remove("GEOFIDDLE_CONFIG")
        .env("RUST_LOG", "off")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(stdin.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

#[test]
fn test_info_lists_formats_and_projections() {
    let output = run(&["info"], "");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("polyline6"));
    assert!(stdout.contains("British National Grid"));
    assert!(stdout.contains("+proj=tmerc"));
}

#[test]
fn test_convert_stdin_bng_to_wkt() {
    let output = run(&["-q", "convert", "--to", "wkt"], "530000,180000");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("POINT (-0.12"), "{}", stdout);
}

#[test]
fn test_convert_with_preset() {
    let output = run(
        &["-q", "convert", "--config", "web", "--to", "ewkt"],
        "POINT (0 0)",
    );
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("SRID=3857;POINT (0 "), "{}", stdout);
}

#[test]
fn test_convert_failure_exit_code() {
    let output = run(&["-q", "convert"], "not geometry at all");
    assert!(!output.status.success());

    let output = run(&["-q", "convert", "--to", "shp2"], "1,2");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unsupported format: shp2"));
}

#[test]
fn test_detect() {
    let output = run(&["detect"], "SRID=27700;POINT(500000 200000)");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Format: ewkt (EWKT)"));
    assert!(stdout.contains("Projection: EPSG:27700"));
    assert!(stdout.contains("Features: 1"));
}

#[test]
fn test_detect_prints_feature_metrics() {
    let output = run(&["detect"], "LINESTRING (0 0, 1 0)\n\nPOINT (10 95)");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("feature-0: Line String, 2 coordinates, length 111.32 km"), "{}", stdout);
    assert!(stdout.contains("Warning: coordinate (10, 95) is outside WGS84 bounds"), "{}", stdout);
}

#[test]
fn test_convert_rejects_colliding_outputs() {
    let root = std::env::temp_dir().join(format!("geofiddle-collide-{}", std::process::id()));
    let out = root.join("out");
    for dir in ["a", "b"] {
        std::fs::create_dir_all(root.join(dir)).unwrap();
        std::fs::write(root.join(dir).join("x.csv"), "0,0").unwrap();
    }
    let a = root.join("a").join("x.csv");
    let b = root.join("b").join("x.csv");

    let output = run(
        &[
            "-q",
            "convert",
            a.to_str().unwrap(),
            b.to_str().unwrap(),
            "--output",
            out.to_str().unwrap(),
        ],
        "",
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("would both be written to"));
    assert!(!out.join("x.geojson").exists());

    std::fs::remove_dir_all(&root).unwrap();
}
