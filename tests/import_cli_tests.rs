//! End-to-end runs of the `lotto6` importer binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const GOOD_DRAWS: &str = r#"[
    {
        "date": "2025-06-14",
        "draw_day": "Samstag",
        "numbers": "3, 9, 21, 27, 35, 48",
        "super_number": 2,
        "spiel77": "1 2 3 4 5 6 7",
        "super6": "9 8 7 6 5 4"
    },
    {
        "date": "2025-06-21",
        "draw_day": "Samstag",
        "numbers": "7, 12, 16, 19, 30, 36",
        "super_number": 4,
        "spiel77": "3 1 6 8 5 3 4",
        "super6": "8 5 3 8 4 9"
    }
]"#;

const BAD_DRAW: &str = r#"{
    "date": "2025-06-18",
    "draw_day": "Freitag",
    "numbers": "1, 1, 2, 3, 4, 5",
    "super_number": 4,
    "spiel77": "3 1 6 8 5 3 4",
    "super6": "8 5 3 8 4 9"
}"#;

fn importer(temp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("lotto6").unwrap();
    cmd.env("LOTTO6_DB_PATH", temp.path().join("db/lotto6.db"))
        .env("RUST_LOG", "off");
    cmd
}

#[test]
fn imports_valid_draws_and_reports_rejections() {
    let temp = TempDir::new().unwrap();
    let data = temp.path().join("json_data");
    fs::create_dir(&data).unwrap();
    fs::write(data.join("a_good.json"), GOOD_DRAWS).unwrap();
    fs::write(data.join("b_bad.json"), BAD_DRAW).unwrap();
    fs::write(data.join("notes.txt"), "ignored").unwrap();

    importer(&temp)
        .arg(&data)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "2 files read: 2 inserted, 0 already stored, 1 rejected",
        ))
        .stdout(predicate::str::contains("draw_day"))
        .stdout(predicate::str::contains("18.06.2025"));

    assert!(temp.path().join("db/lotto6.db").exists());
}

#[test]
fn second_import_counts_duplicates() {
    let temp = TempDir::new().unwrap();
    let data = temp.path().join("json_data");
    fs::create_dir(&data).unwrap();
    fs::write(data.join("draws.json"), GOOD_DRAWS).unwrap();

    importer(&temp).arg(&data).assert().success();
    importer(&temp)
        .arg(&data)
        .assert()
        .success()
        .stdout(predicate::str::contains("0 inserted, 2 already stored"));
}

#[test]
fn missing_directory_fails() {
    let temp = TempDir::new().unwrap();
    importer(&temp)
        .arg(temp.path().join("nowhere"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("importing from"));
}
