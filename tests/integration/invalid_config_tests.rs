//! These tests are for testing some invalid config-file-specific options.

use assert_cmd::prelude::*;
use predicates::prelude::*;

use crate::util::utop_command;

#[test]
fn test_toml_mismatch_type() {
    utop_command(&["-C", "./tests/invalid_configs/toml_mismatch_type.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid type"));
}

/// This test isn't really needed as this is technically covered by TOML spec.
/// However, I feel like it's worth checking anyways - not like it takes long.
#[test]
fn test_duplicate_key() {
    utop_command(&["-C", "./tests/invalid_configs/duplicate_key.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("duplicate key"));
}

#[test]
fn test_invalid_rate() {
    utop_command(&["-C", "./tests/invalid_configs/invalid_rate.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("'rate' was set with an invalid value"));
}

#[test]
fn test_small_rate() {
    utop_command(&["-C", "./tests/invalid_configs/small_rate.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("refresh rate to be at least 100 ms"));
}

#[test]
fn test_small_rescan_rate() {
    utop_command(&["-C", "./tests/invalid_configs/small_rescan_rate.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "rescan rate to be at least the refresh rate",
        ));
}

/// The arguments are checked before the config, so a bad rate argument wins even when
/// the config is fine.
#[test]
fn test_args_checked_with_config() {
    utop_command(&["-C", "./tests/valid_configs/all_options.toml", "-r", "oops"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("'--rate' was set with an invalid value"));
}
