use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Build a `roll` command pointed at a temp data dir with a fixed clock.
fn roll_cmd(data_dir: &TempDir) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("roll").unwrap();
    cmd.env("ROLL_DATA_DIR", data_dir.path());
    cmd.args(["--now", "2025-03-05T12:00"]);
    cmd
}

fn run(dir: &TempDir, args: &[&str]) -> String {
    let output = roll_cmd(dir).args(args).output().unwrap();
    assert!(
        output.status.success(),
        "roll {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn school(dir: &TempDir) {
    run(dir, &["person", "add", "Alice Baker"]);
    run(dir, &["person", "add", "Bob Cohen"]);
    run(dir, &["person", "add", "Carol Diaz", "--role", "staff"]);
    run(dir, &["period", "add", "Math", "--start", "09:00"]);
    run(dir, &["period", "add", "Art", "--start", "10:30", "--duration", "45"]);
}

#[test]
fn people_and_periods_listed() {
    let dir = TempDir::new().unwrap();
    school(&dir);

    let people = run(&dir, &["person", "list"]);
    let alice = people.find("Alice Baker").unwrap();
    let bob = people.find("Bob Cohen").unwrap();
    assert!(alice < bob, "sorted by last name:\n{people}");

    roll_cmd(&dir)
        .args(["person", "list", "--role", "staff"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Carol Diaz"))
        .stdout(predicate::str::contains("Alice").not());

    roll_cmd(&dir)
        .args(["period", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("09:00"))
        .stdout(predicate::str::contains("45m"));
}

#[test]
fn marks_feed_report_and_dashboard() {
    let dir = TempDir::new().unwrap();
    school(&dir);

    roll_cmd(&dir)
        .args(["mark", "2025-03-03", "Alice", "Math", "on-time"])
        .assert()
        .success()
        .stdout(predicate::str::contains("marked Alice Baker Math: On Time"));
    roll_cmd(&dir)
        .args(["mark", "2025-03-04", "Alice", "Math", "late", "--minutes", "15"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Late (15m)"));

    let report = run(&dir, &["report", "Alice"]);
    assert!(
        report.contains("Overall: 87.5% (good) [105 of 120 minutes]"),
        "{report}"
    );
    assert!(report.contains("Total late: 15m"), "{report}");
    assert!(report.contains("2025-W10  87.5%  105/120"), "{report}");

    roll_cmd(&dir)
        .args(["dashboard"])
        .assert()
        .success()
        .stdout(predicate::str::contains("87.5%"))
        .stdout(predicate::str::contains("N/A"));
}

#[test]
fn unmark_clears_a_cell() {
    let dir = TempDir::new().unwrap();
    school(&dir);
    run(&dir, &["mark", "2025-03-04", "Bob", "Art", "absent"]);

    roll_cmd(&dir)
        .args(["unmark", "2025-03-04", "Bob", "Art"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cleared Bob Cohen Art"));
    roll_cmd(&dir)
        .args(["unmark", "2025-03-04", "Bob", "Art"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing to change"));
}

#[test]
fn absence_blocks_marks_and_shows_in_grid() {
    let dir = TempDir::new().unwrap();
    school(&dir);
    run(
        &dir,
        &["absence", "add", "Bob", "--from", "2025-03-04", "--note", "field trip"],
    );

    roll_cmd(&dir)
        .args(["mark", "2025-03-04", "Bob", "Math", "absent"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not saved: Bob Cohen is marked out"));

    run(&dir, &["mark", "2025-03-04", "Alice", "Math", "on-time"]);
    let grid = run(&dir, &["grid", "2025-03-04"]);
    assert!(grid.contains("Excused (field trip)"), "{grid}");
    assert!(grid.contains("On Time"), "{grid}");

    roll_cmd(&dir)
        .args(["absence", "list", "--person", "Bob"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2025-03-04 Math-Art"));
}

#[test]
fn group_lifecycle() {
    let dir = TempDir::new().unwrap();
    school(&dir);

    let created = run(
        &dir,
        &[
            "group", "create", "--person", "Alice", "--person", "Bob", "--from", "2025-03-10",
            "--to", "2025-03-12", "--note", "Museum",
        ],
    );
    assert!(created.contains("for 2 people"), "{created}");
    let group_id = created.split_whitespace().nth(2).unwrap().to_string();

    let listed = run(&dir, &["group", "list"]);
    assert!(listed.contains("Museum"), "{listed}");
    assert!(listed.contains("Bob Cohen"), "{listed}");

    roll_cmd(&dir)
        .args(["group", "edit", &group_id, "--person", "Carol"])
        .assert()
        .success()
        .stdout(predicate::str::contains("for 1 people"));

    roll_cmd(&dir)
        .args(["group", "delete", &group_id])
        .assert()
        .success()
        .stdout(predicate::str::contains("(1 records)"));

    roll_cmd(&dir)
        .args(["group", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Museum").not());
}

#[test]
fn shell_marks_with_undo() {
    let dir = TempDir::new().unwrap();
    school(&dir);

    roll_cmd(&dir)
        .args(["shell", "2025-03-04"])
        .write_stdin("mark Alice Math absent\nundo\nredo\ngrid\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("marked Alice Baker Math: Absent"))
        .stdout(predicate::str::contains("undone"))
        .stdout(predicate::str::contains("redone"));

    let grid = run(&dir, &["grid", "2025-03-04"]);
    assert!(grid.contains("Absent"), "{grid}");
}

#[test]
fn export_import_roundtrip() {
    let dir = TempDir::new().unwrap();
    school(&dir);
    run(&dir, &["mark", "2025-03-04", "Alice", "Math", "absent"]);

    let export_path = dir.path().join("export.json");
    roll_cmd(&dir)
        .arg("export")
        .arg(&export_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("exported to"));
    assert!(export_path.exists(), "export file should exist");

    let other = TempDir::new().unwrap();
    roll_cmd(&other)
        .arg("import")
        .arg(&export_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("imported from"));

    assert_eq!(
        run(&dir, &["grid", "2025-03-04"]),
        run(&other, &["grid", "2025-03-04"])
    );
}

#[test]
fn invalid_input_fails() {
    let dir = TempDir::new().unwrap();
    school(&dir);

    roll_cmd(&dir).args(["person", "add"]).assert().failure();
    roll_cmd(&dir)
        .args(["mark", "2025-03-04", "Alice", "Math", "sleeping"])
        .assert()
        .failure();
    roll_cmd(&dir)
        .args(["mark", "2025-03-04", "Nobody", "Math", "late"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no person matches"));
    roll_cmd(&dir)
        .args([
            "absence", "add", "Alice", "--from", "2025-03-05", "--to", "2025-03-04",
        ])
        .assert()
        .failure();
    roll_cmd(&dir)
        .args(["period", "add", "Marathon", "--start", "08:00", "--duration", "1441"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("longer than a day"));
}
