use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

const NOTES: &str = "Volcanoes form where tectonic plates diverge or converge beneath the crust. \
Magma rises through fissures and erupts as lava during volcanic eruptions. \
Basalt is a common rock that forms when lava cools quickly at the surface. \
Granite forms when magma cools slowly deep underground over long periods. \
Earthquakes often accompany eruptions because magma movement cracks rock. \
Geologists monitor tectonic activity with seismometers placed near volcanoes.";

fn studycoach() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("studycoach"));
    cmd.env_remove("STUDYCOACH_ENV_FILE")
        .env_remove("STUDYCOACH_CONFIG")
        .env_remove("STUDYCOACH_MIN_TEXT_CHARS");
    cmd
}

fn notes_file(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let p = dir.path().join("volcanoes.txt");
    std::fs::write(&p, NOTES).unwrap();
    p
}

#[test]
fn version_prints_json() {
    let out = studycoach().arg("version").output().unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["name"], "studycoach");
    assert!(!v["version"].as_str().unwrap_or("").is_empty());
}

#[test]
fn analyze_defaults_to_flat_summary_and_cloze() {
    let dir = tempfile::tempdir().unwrap();
    let out = studycoach()
        .arg("analyze")
        .arg(notes_file(&dir))
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert!(v["summary"].as_str().unwrap().starts_with("Volcanoes form where"));
    assert!(v["quiz"].is_array());
    assert!(v.get("mcq").is_none());
}

#[test]
fn analyze_with_seed_is_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    let path = notes_file(&dir);
    let run = || {
        studycoach()
            .args(["analyze", "--mcq", "--blocks", "--seed", "11"])
            .arg(&path)
            .output()
            .unwrap()
    };
    let a = run();
    let b = run();
    assert!(a.status.success());
    assert_eq!(a.stdout, b.stdout);
    let v: serde_json::Value = serde_json::from_slice(&a.stdout).unwrap();
    assert!(v["summary_blocks"].is_array());
    assert!(!v["mcq"].as_array().unwrap().is_empty());
}

#[test]
fn analyze_reads_a_toml_config() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = dir.path().join("studycoach.toml");
    let mut f = std::fs::File::create(&cfg).unwrap();
    writeln!(f, "cloze_questions = 1\nmask = \"[blank]\"").unwrap();
    let out = studycoach()
        .arg("analyze")
        .arg(notes_file(&dir))
        .arg("--config")
        .arg(&cfg)
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let quiz = v["quiz"].as_array().unwrap();
    assert_eq!(quiz.len(), 1);
    assert!(quiz[0]["stem"].as_str().unwrap().contains("[blank]"));
}

#[test]
fn analyze_rejects_short_documents() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("short.txt");
    std::fs::write(&p, "Too short to study.").unwrap();
    studycoach()
        .arg("analyze")
        .arg(&p)
        .assert()
        .failure()
        .stderr(predicate::str::contains("too little text"));
}

#[test]
fn env_file_supplies_defaults_without_overriding() {
    let dir = tempfile::tempdir().unwrap();
    let env = dir.path().join(".env");
    std::fs::write(&env, "# local settings\nSTUDYCOACH_MIN_TEXT_CHARS=5000\n").unwrap();
    studycoach()
        .env("STUDYCOACH_ENV_FILE", &env)
        .arg("analyze")
        .arg(notes_file(&dir))
        .assert()
        .failure()
        .stderr(predicate::str::contains("need at least 5000"));

    studycoach()
        .env("STUDYCOACH_ENV_FILE", &env)
        .env("STUDYCOACH_MIN_TEXT_CHARS", "10")
        .arg("analyze")
        .arg(notes_file(&dir))
        .assert()
        .success();
}
