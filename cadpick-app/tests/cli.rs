use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

const SURVEY_DXF: &str = "  0
SECTION
  2
ENTITIES
  0
LINE
  8
ROAD
 10
0
 20
0
 30
0
 11
3
 21
4
 31
12
  0
POLYLINE
  8
SURVEY
 66
1
 70
8
  0
SEQEND
  0
POLYLINE
  8
SURVEY
 66
1
 70
8
  0
VERTEX
 10
-1.5
 20
2
 30
0.25
 70
32
  0
SEQEND
  0
ENDSEC
  0
EOF
";

fn cadpick() -> Command {
    let mut cmd = Command::cargo_bin("cadpick-app").expect("binary");
    cmd.env_remove("CADPICK_CONFIG");
    cmd
}

fn write_dxf(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("survey.dxf");
    fs::write(&path, SURVEY_DXF).expect("write dxf");
    path
}

#[test]
fn demo_session_reports_lines_and_polylines() {
    cadpick()
        .write_stdin("PICKREPORT\n0,2\nQUIT\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Drawing: built-in demo"))
        .stdout(predicate::str::contains(
            "You picked a line which length is: 100",
        ))
        .stdout(predicate::str::contains(
            "You picked a 3D polyline with StartPoint: (10,5,2)",
        ))
        .stdout(predicate::str::contains(
            "[PICKREPORT] 2 reported, 0 skipped, 0 failed",
        ));
}

#[test]
fn cancelled_selection_prints_no_report() {
    cadpick()
        .write_stdin("PICKREPORT\n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("You picked").not())
        .stdout(predicate::str::contains("Error:").not());
}

#[test]
fn failing_entity_does_not_stop_the_others() {
    let dir = tempfile::tempdir().expect("temp dir");
    let dxf = write_dxf(dir.path());

    cadpick()
        .arg("--dxf")
        .arg(&dxf)
        .args(["--command", "pickreport"])
        .write_stdin("ALL\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "You picked a line which length is: 13",
        ))
        .stdout(predicate::str::contains(
            "Error: entity with id 1 has degenerate geometry: 3D polyline has no vertices",
        ))
        .stdout(predicate::str::contains(
            "You picked a 3D polyline with StartPoint: (-1.5,2,0.25)",
        ))
        .stdout(predicate::str::contains("2 reported, 0 skipped, 1 failed"));
}

#[test]
fn config_file_selects_the_drawing() {
    let dir = tempfile::tempdir().expect("temp dir");
    let dxf = write_dxf(dir.path());
    let config = dir.path().join("cadpick.toml");
    fs::write(
        &config,
        format!(
            "[logging]\nlevel = \"warn\"\n\n[document]\ndxf_path = {:?}\n",
            dxf.to_string_lossy()
        ),
    )
    .expect("write config");

    cadpick()
        .arg("--config")
        .arg(&config)
        .write_stdin("exit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("#0 Line [ROAD]"))
        .stdout(predicate::str::contains("#2 Polyline3d [SURVEY]"));
}

#[test]
fn unreadable_drawing_falls_back_to_demo() {
    cadpick()
        .args(["--dxf", "no/such/drawing.dxf"])
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("Drawing: built-in demo"));
}

#[test]
fn unknown_single_command_exits_with_failure() {
    cadpick()
        .args(["--command", "REGEN"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("Unknown command \"REGEN\"."));
}
