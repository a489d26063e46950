use assert_cmd::Command;
use predicates::prelude::*;

fn bin() -> Command {
    Command::cargo_bin("shift-engine").unwrap()
}

#[test]
fn preview_prints_ordered_occurrences() {
    bin()
        .args([
            "preview",
            "--start",
            "2026-03-02T08:00:00Z",
            "--end",
            "2026-03-02T16:00:00Z",
            "--rule",
            "FREQ=DAILY;INTERVAL=1;COUNT=3",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("2026-03-02T08:00:00+00:00"))
        .stdout(predicate::str::contains("2026-03-04T08:00:00+00:00"))
        .stdout(predicate::str::contains("2026-03-05").not())
        .stdout(predicate::str::contains("\"truncated\": false"));
}

#[test]
fn preview_reports_truncation_at_max() {
    bin()
        .args([
            "preview",
            "--start",
            "2026-03-02T08:00:00Z",
            "--end",
            "2026-03-02T16:00:00Z",
            "--rule",
            "FREQ=DAILY;INTERVAL=1",
            "--max",
            "3",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"truncated\": true"));
}

#[test]
fn preview_rejects_malformed_rule() {
    bin()
        .args([
            "preview",
            "--start",
            "2026-03-02T08:00:00Z",
            "--end",
            "2026-03-02T16:00:00Z",
            "--rule",
            "FREQ=FORTNIGHTLY",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid recurrence rule"));
}

#[test]
fn expand_merges_schedule_and_applies_exceptions() {
    bin()
        .args([
            "expand",
            "--schedule",
            "tests/fixtures/schedule.json",
            "--from",
            "2026-03-01T00:00:00Z",
            "--to",
            "2026-03-15T00:00:00Z",
        ])
        .assert()
        .success()
        // Recurring Mon/Wed occurrences plus the one-time shift...
        .stdout(predicate::str::contains(
            "lathe-morning_2026-03-02T08:00:00+00:00",
        ))
        .stdout(predicate::str::contains(
            "lathe-morning_2026-03-11T08:00:00+00:00",
        ))
        .stdout(predicate::str::contains("paint-booth-demo"))
        .stdout(predicate::str::contains("\"confirmed\": 3"))
        // ...with the cancelled March 9 occurrence suppressed.
        .stdout(predicate::str::contains("2026-03-09").not());
}

#[test]
fn expand_rejects_unknown_timezone() {
    bin()
        .args([
            "expand",
            "--schedule",
            "tests/fixtures/schedule.json",
            "--from",
            "2026-03-01T00:00:00Z",
            "--to",
            "2026-03-15T00:00:00Z",
            "--timezone",
            "Mars/Olympus_Mons",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid timezone"));
}

#[test]
fn check_admits_qualified_worker() {
    bin()
        .args(["check", "--request", "tests/fixtures/signup.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Admissible"));
}

#[test]
fn check_rejects_missing_skills() {
    bin()
        .args([
            "check",
            "--request",
            "tests/fixtures/signup_missing_skills.json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("MissingSkills"))
        .stdout(predicate::str::contains("lathe-certified"));
}

#[test]
fn check_rejects_date_with_no_occurrence() {
    // March 3, 2026 is a Tuesday; the fixture's rule only covers Mon/Wed.
    let mut cmd = bin();
    let request = std::fs::read_to_string("tests/fixtures/signup.json").unwrap();
    let request = request.replace("2026-03-04", "2026-03-03");
    let dir = std::env::temp_dir().join("shift-engine-cli-test");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("signup_tuesday.json");
    std::fs::write(&path, request).unwrap();

    cmd.args(["check", "--request", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no occurrence on 2026-03-03"));
}
