use std::{fs, process::Command};

const BIN: &str = env!("CARGO_BIN_EXE_dust-storm");

#[test]
fn bundled_scenario_prints_a_summary() {
    let output = Command::new(BIN)
        .args(["--until", "1200", "--log", "warn"])
        .output()
        .expect("failed to launch the dust-storm binary");

    assert!(output.status.success(), "dust-storm exited with {}", output.status);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("nauvis"));
    assert!(stdout.contains("fulgora"));
    assert!(stdout.contains("storms: 1 created"));
}

#[test]
fn seed_override_is_reproducible() {
    let run = || {
        Command::new(BIN)
            .args(["--seed", "42", "--log", "off"])
            .output()
            .expect("failed to launch the dust-storm binary")
            .stdout
    };
    assert_eq!(run(), run());
}

#[test]
fn broken_scenario_file_fails_with_context() {
    let path = std::env::temp_dir().join(format!("dust-storm-broken-{}.toml", std::process::id()));
    fs::write(&path, "[[surfaces]]\nname = 7\n").expect("temp file is writable");

    let output = Command::new(BIN)
        .arg("--scenario")
        .arg(&path)
        .output()
        .expect("failed to launch the dust-storm binary");
    let _ = fs::remove_file(&path);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("dust-storm-broken"), "stderr was: {stderr}");
}
