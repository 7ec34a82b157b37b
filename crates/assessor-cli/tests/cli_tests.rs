//! CLI integration tests using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn assessor(dir: &TempDir) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("assessor").unwrap();
    cmd.current_dir(dir.path())
        .env("HOME", dir.path())
        .env("ASSESSOR_STORE_PATH", dir.path().join("store.json"))
        .env("ASSESSOR_ENFORCE_TIME_LIMITS", "false")
        .env_remove("RUST_LOG");
    cmd
}

const ALL_CORRECT_READING: &str = r#"{
  "fillblanks": {
    "1": [true, true, true, true, true, true, true, true, true, true],
    "2": [true, true, true, true, true, true, true, true, true, true]
  },
  "daily1": { "1": [true, true], "2": [true, true] },
  "daily2": { "1": [true, true, true], "2": [true, true, true] },
  "academic": { "1": [true, true, true, true, true] }
}"#;

/// Sample sheet from `init` with question 1 also wrong.
const REGRESSED_READING: &str = r#"{
  "fillblanks": {
    "1": [false, true, true, true, true, true, true, true, true, true],
    "2": [true, true, true, true, true, true, true, true, true, true]
  },
  "daily1": { "1": [true, true], "2": [true, true] },
  "daily2": { "1": [true, true, true], "2": [true, true, true] },
  "academic": { "1": [true, true, true, true, true] }
}"#;

/// Answers for just the components the `init` sample sheet gets wrong.
const MISSED_ONLY_READING: &str = r#"{
  "fillblanks": {
    "1": [true, true, true, true, true, true, true, true, true, true],
    "2": [true, true, true, true, true, true, true, true, true, true]
  },
  "daily1": { "2": [true, true] },
  "academic": { "1": [true, true, true, true, true] }
}"#;

fn init_and_run_first(dir: &TempDir) {
    assessor(dir).arg("init").assert().success();
    assessor(dir)
        .args(["run", "--section", "reading", "--number", "1"])
        .args(["--answers", "answers/reading-1.json"])
        .assert()
        .success();
}

#[test]
fn module_prints_components() {
    let dir = TempDir::new().unwrap();

    assessor(&dir)
        .args(["module", "--section", "reading", "--number", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Reading Module 2 (reading_module_2)"))
        .stdout(predicate::str::contains("35 questions, time limit 30:00"))
        .stdout(predicate::str::contains("Read an Academic Passage"));
}

#[test]
fn module_json_carries_content_set_ids() {
    let dir = TempDir::new().unwrap();

    let output = assessor(&dir)
        .args(["module", "--section", "listening", "--number", "2", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let module: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let components = module["components"].as_array().unwrap();
    assert_eq!(components.len(), 17);
    assert_eq!(components[0]["componentType"], "response");
    assert_eq!(components[0]["contentSetId"], 11);
    assert_eq!(components[10]["componentType"], "conversation");
    assert_eq!(components[10]["contentSetId"], 4);
    assert!(module["timeLimitSecs"].is_null());
}

#[test]
fn unknown_section_blocks_session() {
    let dir = TempDir::new().unwrap();

    assessor(&dir)
        .args(["module", "--section", "mathematics"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot start session"))
        .stderr(predicate::str::contains("unknown section: mathematics"));
}

#[test]
fn module_number_zero_is_rejected() {
    let dir = TempDir::new().unwrap();

    assessor(&dir)
        .args(["module", "--section", "writing", "--number", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot start session"));
}

#[test]
fn levels_table_for_reading() {
    let dir = TempDir::new().unwrap();

    assessor(&dir)
        .args(["levels", "--section", "reading"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0-3"))
        .stdout(predicate::str::contains("31-32"))
        .stdout(predicate::str::contains("33+"))
        .stdout(predicate::str::contains("6.0"));
}

#[test]
fn writing_is_not_leveled() {
    let dir = TempDir::new().unwrap();

    assessor(&dir)
        .args(["levels", "--section", "writing"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Writing is not leveled."));
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    assessor(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created assessor.toml"))
        .stdout(predicate::str::contains("Created answers/reading-1.json"));

    assert!(dir.path().join("assessor.toml").exists());
    assert!(dir.path().join("answers/reading-1.json").exists());

    assessor(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists, skipping"));
}

#[test]
fn run_records_first_attempt() {
    let dir = TempDir::new().unwrap();
    assessor(&dir).arg("init").assert().success();

    assessor(&dir)
        .args(["run", "--section", "reading", "--number", "1"])
        .args(["--answers", "answers/reading-1.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Reading: 30/35 correct (86%), level 5.0"))
        .stderr(predicate::str::contains("Next: assessor retake --section reading"));

    let store = std::fs::read_to_string(dir.path().join("store.json")).unwrap();
    assert!(store.contains("reading_firstAttempt"));

    assessor(&dir)
        .args(["show", "--section", "reading"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Reading first attempt: 30/35 (86%), level 5.0"))
        .stdout(predicate::str::contains("Module: reading_module_1"))
        .stdout(predicate::str::contains("Missed: 4, 9, 16, 24, 33"));
}

#[test]
fn run_uses_default_section_from_config() {
    let dir = TempDir::new().unwrap();
    assessor(&dir).arg("init").assert().success();

    assessor(&dir)
        .args(["run", "--answers", "answers/reading-1.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Reading: 30/35"));
}

#[test]
fn perfect_run_points_to_explanations() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("perfect.json"), ALL_CORRECT_READING).unwrap();

    assessor(&dir)
        .args(["run", "--section", "reading", "--answers", "perfect.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("35/35 correct (100%), level 6.0"))
        .stderr(predicate::str::contains("Perfect score"));
}

#[test]
fn run_with_missing_sheet_fails() {
    let dir = TempDir::new().unwrap();

    assessor(&dir)
        .args(["run", "--section", "reading", "--answers", "nope.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read answer sheet"));

    assert!(!dir.path().join("store.json").exists());
}

#[test]
fn show_without_attempt() {
    let dir = TempDir::new().unwrap();

    assessor(&dir)
        .args(["show", "--section", "speaking"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No first attempt recorded for speaking."));
}

#[test]
fn retake_compares_against_first_attempt() {
    let dir = TempDir::new().unwrap();
    init_and_run_first(&dir);
    std::fs::write(dir.path().join("retake.json"), ALL_CORRECT_READING).unwrap();

    assessor(&dir)
        .args(["retake", "--section", "reading", "--answers", "retake.json"])
        .args(["--html", "out/retake.html"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Reading retake: 30/35 -> 35/35 (86% -> 100%)"))
        .stdout(predicate::str::contains("Comparison: 5 improved, 0 still wrong, 30 unchanged"))
        .stdout(predicate::str::contains("Q33 improved"))
        .stdout(predicate::str::contains(
            "Great progress! You answered 5 more questions correctly (86% -> 100%, +14 points).",
        ));

    let html = std::fs::read_to_string(dir.path().join("out/retake.html")).unwrap();
    assert!(html.contains("Reading retake comparison"));

    // The retake does not replace the first attempt.
    assessor(&dir)
        .args(["show", "--section", "reading"])
        .assert()
        .success()
        .stdout(predicate::str::contains("30/35"));
}

#[test]
fn retake_with_same_answers_reports_same_score() {
    let dir = TempDir::new().unwrap();
    init_and_run_first(&dir);

    assessor(&dir)
        .args(["retake", "--section", "reading", "--answers", "answers/reading-1.json"])
        .args(["--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"scoreDiff\": 0"));
}

#[test]
fn retake_without_first_attempt_fails() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("retake.json"), ALL_CORRECT_READING).unwrap();

    assessor(&dir)
        .args(["retake", "--section", "reading", "--answers", "retake.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no first attempt recorded for reading"));
}

#[test]
fn retake_keeps_first_attempt_correct_answers() {
    let dir = TempDir::new().unwrap();
    init_and_run_first(&dir);
    std::fs::write(dir.path().join("worse.json"), REGRESSED_READING).unwrap();

    assessor(&dir)
        .args(["retake", "--section", "reading", "--answers", "worse.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Reading retake: 30/35 -> 35/35"))
        .stdout(predicate::str::contains("Q1 still wrong").not());
}

#[test]
fn retake_with_only_missed_components_answered() {
    let dir = TempDir::new().unwrap();
    init_and_run_first(&dir);
    std::fs::write(dir.path().join("missed.json"), MISSED_ONLY_READING).unwrap();

    assessor(&dir)
        .args(["retake", "--section", "reading", "--answers", "missed.json"])
        .assert()
        .success()
        .stderr(predicate::str::contains("5 question(s) missed last time, 4 component(s) to redo"))
        .stdout(predicate::str::contains("Reading retake: 30/35 -> 35/35 (86% -> 100%)"))
        .stdout(predicate::str::contains("Comparison: 5 improved, 0 still wrong, 30 unchanged"));
}

#[test]
fn compare_exported_attempts() {
    let dir = TempDir::new().unwrap();
    init_and_run_first(&dir);
    assessor(&dir)
        .args(["show", "--section", "reading", "--export", "first.json"])
        .assert()
        .success();

    std::fs::write(dir.path().join("perfect.json"), ALL_CORRECT_READING).unwrap();
    assessor(&dir)
        .args(["run", "--section", "reading", "--answers", "perfect.json"])
        .assert()
        .success();
    assessor(&dir)
        .args(["show", "--section", "reading", "--export", "second.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("35/35"));

    assessor(&dir)
        .args(["compare", "--first", "first.json", "--second", "second.json"])
        .args(["--format", "markdown"])
        .assert()
        .success()
        .stdout(predicate::str::contains("## Reading retake comparison"))
        .stdout(predicate::str::contains("| Change | +5 | +14% | +1.0 |"));
}

#[test]
fn compare_reports_regressed_questions() {
    let dir = TempDir::new().unwrap();
    init_and_run_first(&dir);
    assessor(&dir)
        .args(["show", "--section", "reading", "--export", "first.json"])
        .assert()
        .success();

    std::fs::write(dir.path().join("perfect.json"), ALL_CORRECT_READING).unwrap();
    assessor(&dir)
        .args(["run", "--section", "reading", "--answers", "perfect.json"])
        .assert()
        .success();
    assessor(&dir)
        .args(["show", "--section", "reading", "--export", "second.json"])
        .assert()
        .success();

    assessor(&dir)
        .args(["compare", "--first", "second.json", "--second", "first.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "previously correct questions became incorrect at [3, 8, 15, 23, 32]",
        ));
}

#[test]
fn compare_rejects_mismatched_sections() {
    let dir = TempDir::new().unwrap();
    init_and_run_first(&dir);
    assessor(&dir)
        .args(["show", "--section", "reading", "--export", "reading.json"])
        .assert()
        .success();

    let mut record: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("reading.json")).unwrap())
            .unwrap();
    record["sectionType"] = "listening".into();
    std::fs::write(
        dir.path().join("listening.json"),
        serde_json::to_string(&record).unwrap(),
    )
    .unwrap();

    assessor(&dir)
        .args(["compare", "--first", "reading.json", "--second", "listening.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("different sections"));
}

#[test]
fn explicit_missing_config_fails() {
    let dir = TempDir::new().unwrap();

    assessor(&dir)
        .args(["levels", "--config", "missing.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}
