use std::fs;
use std::process::{Command, Output};

use tempfile::TempDir;

fn sketchview(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sketchview"))
        .env_remove("SKETCH_CONFIG")
        .args(args)
        .output()
        .expect("failed to run sketchview")
}

#[test]
fn help_lists_sketch_flags() {
    let output = sketchview(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for flag in ["--fragment", "--vertex", "--antialias", "--no-vsync", "--demo"] {
        assert!(stdout.contains(flag), "help output is missing {flag}");
    }
}

#[test]
fn rejects_unsupported_antialias_before_opening_a_window() {
    let output = sketchview(&["--antialias", "3"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid antialias setting"), "stderr: {stderr}");
}

#[test]
fn rejects_malformed_size() {
    let output = sketchview(&["--size", "wide"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("expected WIDTHxHEIGHT"), "stderr: {stderr}");
}

#[test]
fn reports_invalid_config_files() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("sketch.toml");
    fs::write(&config, "[uniforms]\nu_mouse = [1.0, 2.0]\n").unwrap();

    let output = sketchview(&["--config", config.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("u_mouse"), "stderr: {stderr}");
}
