use assert_cmd::Command;
use predicates::prelude::*;

fn padloop() -> Command {
    let mut cmd = Command::cargo_bin("padloop").expect("binary");
    cmd.env_remove("PADLOOP_DEFAULT_PAD_STEPS").env_remove("PADLOOP_HISTORY");
    cmd
}

#[test]
fn exec_runs_chained_commands() {
    padloop()
        .args([
            "--pad-steps",
            "4",
            "--exec",
            "track Drums; seq 1 p0 ~8 p1; select 1 2; drag 1 8; drop; seq 1",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("insert into gap"))
        .stdout(predicate::str::contains("p0 ~4 p1 ~4"));
}

#[test]
fn pad_steps_flag_sets_track_default() {
    padloop()
        .args(["--pad-steps", "8", "--exec", "track Keys; seq 1 p0 p1; show 1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("16 steps"));
}

#[test]
fn failing_command_fails_the_run() {
    padloop()
        .args(["--exec", "show 3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no such track"));
}

#[test]
fn rejected_move_is_logged() {
    padloop()
        .args(["--pad-steps", "4", "--exec", "track A; seq 1 p0 p1 p2 p3; move 1 0 0 8"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no change"))
        .stderr(predicate::str::contains("rejected"));
}

#[test]
fn save_then_open_between_runs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("song.yaml");
    let path_str = path.to_str().expect("utf8 path");

    padloop()
        .args([
            "--exec",
            &format!(r#"bpm 98; track Lead; seq 1 p3 p4; select 1 0..1; group 1; save "{}""#, path_str),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("saved"));

    padloop()
        .args(["--open", path_str, "--exec", "seq 1; seq 1.g1; list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[g1]"))
        .stdout(predicate::str::contains("p3 p4"))
        .stdout(predicate::str::contains("Lead"));
}

#[test]
fn script_file_runs_line_by_line() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = dir.path().join("build.pl");
    std::fs::write(
        &script,
        "# two pads, one grouped\ntrack Bass\nseq 1 p0 p1\nselect 1 1\nsupergroup 1\ncheck 1\n",
    )
    .expect("write script");

    padloop()
        .args(["--script", script.to_str().expect("utf8 path")])
        .assert()
        .success()
        .stdout(predicate::str::contains("super-group s1 created"))
        .stdout(predicate::str::contains("no dangling or cyclic references"));
}

#[test]
fn help_lists_flags() {
    padloop()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--exec"))
        .stdout(predicate::str::contains("--watch"));
}
