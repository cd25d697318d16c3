// CLI entry point tests

use std::process::Command;

use image::{Rgba, RgbaImage};

fn cargo_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_pdf_layering"))
}

// ============================================================
// 1. No arguments shows usage and exits with failure
// ============================================================

#[test]
fn test_main_no_args_shows_usage() {
    let output = cargo_bin().output().expect("failed to execute binary");

    assert!(
        !output.status.success(),
        "should exit with failure when no args given"
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Usage"),
        "stderr should contain 'Usage', got: {stderr}"
    );
}

// ============================================================
// 2. --help flag shows usage and exits with success
// ============================================================

#[test]
fn test_main_help_flag() {
    let output = cargo_bin()
        .arg("--help")
        .output()
        .expect("failed to execute binary");

    assert!(
        output.status.success(),
        "should exit with success for --help"
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Usage"),
        "stderr should contain 'Usage', got: {stderr}"
    );
}

// ============================================================
// 3. --version flag shows version and exits with success
// ============================================================

#[test]
fn test_main_version_flag() {
    let output = cargo_bin()
        .arg("--version")
        .output()
        .expect("failed to execute binary");

    assert!(
        output.status.success(),
        "should exit with success for --version"
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    let version = env!("CARGO_PKG_VERSION");
    assert!(
        stderr.contains(version),
        "stderr should contain version '{version}', got: {stderr}"
    );
}

// ============================================================
// 4. Nonexistent job file produces error
// ============================================================

#[test]
fn test_main_nonexistent_job_file() {
    let unique_path = std::env::temp_dir().join(format!(
        "nonexistent_job_file_{}.yaml",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system clock error")
            .as_nanos()
    ));
    let output = cargo_bin()
        .arg(unique_path.as_os_str())
        .output()
        .expect("failed to execute binary");

    assert!(
        !output.status.success(),
        "should exit with failure for nonexistent file"
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("ERROR") || stderr.contains("error") || stderr.contains("Error"),
        "stderr should contain error message, got: {stderr}"
    );
}

// ============================================================
// 5. A job file runs end to end
// ============================================================

fn write_job_dir(dir: &std::path::Path, settings: &str) {
    let img = RgbaImage::from_fn(60, 80, |x, y| Rgba([x as u8, y as u8, 128, 255]));
    img.save(dir.join("page.png")).expect("save page");
    std::fs::write(
        dir.join("pages.json"),
        r#"{"page.png": [{"X0": 10, "Y0": 10, "X1": 40, "Y1": 30}]}"#,
    )
    .expect("write rect map");
    std::fs::write(
        dir.join("jobs.yaml"),
        "jobs:\n  - input: pages.json\n    output: out.pdf\n",
    )
    .expect("write job file");
    std::fs::write(dir.join("settings.yaml"), settings).expect("write settings");
}

#[test]
fn test_main_runs_job_file() {
    let dir = tempfile::tempdir().expect("create temp dir");
    write_job_dir(dir.path(), "variants: [masked, unmasked_lossless]\n");

    let output = cargo_bin()
        .arg(dir.path().join("jobs.yaml"))
        .output()
        .expect("failed to execute binary");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "job should succeed, got: {stderr}");
    assert!(stderr.contains("OK:"), "stderr should report OK, got: {stderr}");

    for name in ["out.masked.pdf", "out.unmasked.png.pdf"] {
        let bytes = std::fs::read(dir.path().join(name)).expect("output written");
        assert!(bytes.starts_with(b"%PDF"));
    }
}

#[test]
fn test_main_failing_job_exits_with_failure() {
    let dir = tempfile::tempdir().expect("create temp dir");
    // 30x20 region eroded by 10 per side leaves no height.
    write_job_dir(dir.path(), "background_margin: -10\n");

    let output = cargo_bin()
        .arg(dir.path().join("jobs.yaml"))
        .output()
        .expect("failed to execute binary");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR"), "got: {stderr}");
    assert!(!dir.path().join("out.pdf").exists());
}

#[test]
fn test_main_rejects_invalid_settings() {
    let dir = tempfile::tempdir().expect("create temp dir");
    write_job_dir(dir.path(), "bg_quality: 0\n");

    let output = cargo_bin()
        .arg(dir.path().join("jobs.yaml"))
        .output()
        .expect("failed to execute binary");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("bg_quality"), "got: {stderr}");
}

#[test]
fn test_main_rejects_jobs_sharing_an_output() {
    let dir = tempfile::tempdir().expect("create temp dir");
    write_job_dir(dir.path(), "variants: [masked]\n");
    std::fs::write(
        dir.path().join("jobs.yaml"),
        "jobs:\n  - input: pages.json\n    output: out.pdf\n  - input: pages.json\n    output: out.pdf\n    canvas: a4\n",
    )
    .expect("write job file");

    let output = cargo_bin()
        .arg(dir.path().join("jobs.yaml"))
        .output()
        .expect("failed to execute binary");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR"), "got: {stderr}");
    assert!(stderr.contains("out.pdf"), "got: {stderr}");
    assert!(!dir.path().join("out.pdf").exists());
}
