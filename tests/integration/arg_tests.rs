//! These tests are mostly here just to ensure that invalid results will be
//! caught when passing arguments.

use assert_cmd::prelude::*;
use predicates::prelude::*;

use crate::util::{no_cfg_utop_command, utop_command};

#[test]
fn test_small_rate() {
    utop_command(&["-C", "./tests/valid_configs/empty_config.toml"])
        .arg("-r")
        .arg("50")
        .assert()
        .failure()
        .stderr(predicate::str::contains("refresh rate to be at least 100 ms"));
}

#[test]
fn test_large_rate() {
    no_cfg_utop_command()
        .arg("-r")
        .arg("18446744073709551616")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "'--rate' was set with an invalid value",
        ));
}

#[test]
fn test_invalid_rate() {
    no_cfg_utop_command()
        .arg("-r")
        .arg("sometimes")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "'--rate' was set with an invalid value",
        ));
}

#[test]
fn test_negative_rate() {
    // This test should auto fail due to how clap works
    no_cfg_utop_command()
        .arg("-r")
        .arg("-1000")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unexpected argument"));
}

#[test]
fn test_rescan_faster_than_refresh() {
    no_cfg_utop_command()
        .args(["--rate", "2s", "--rescan_rate", "1s"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "rescan rate to be at least the refresh rate",
        ));
}

#[test]
fn test_invalid_rescan_rate() {
    no_cfg_utop_command()
        .args(["--rescan_rate", "never"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "'--rescan_rate' was set with an invalid value",
        ));
}

#[test]
fn test_unknown_flag() {
    no_cfg_utop_command()
        .arg("--sort_by_memory")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unexpected argument"));
}

#[test]
fn test_missing_config_file() {
    utop_command(&["-C", "./tests/valid_configs/does_not_exist.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not read the config file"));
}

#[test]
fn test_help() {
    utop_command(&["--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Process Options"))
        .stdout(predicate::str::contains("--kernel_threads"));
}

#[test]
fn test_version() {
    utop_command(&["-v"])
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
