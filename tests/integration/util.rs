use std::{ffi::OsString, path::Path, process::Command};

#[cfg(all(target_arch = "x86_64", target_os = "linux"))]
use portable_pty::{Child, CommandBuilder, MasterPty, PtySize, native_pty_system};

const UTOP_EXE_PATH: &str = env!("CARGO_BIN_EXE_utop");
const DEFAULT_CFG: [&str; 2] = ["-C", "./tests/valid_configs/empty_config.toml"];

/// Flags whose value is a path relative to the crate root.
const PATH_FLAGS: [&str; 2] = ["-C", "-l"];

pub fn abs_path(path: &str) -> OsString {
    let path = Path::new(path);

    if path.exists() {
        path.canonicalize().unwrap().into_os_string()
    } else {
        // We are going to trust that the path given is valid...
        path.to_owned().into_os_string()
    }
}

/// Rewrites path arguments to absolute paths, leaving everything else alone.
fn resolve_args(args: &[&str]) -> Vec<OsString> {
    let mut prev = "";
    let mut resolved = Vec::with_capacity(args.len());

    for arg in args {
        if PATH_FLAGS.contains(&prev) {
            resolved.push(abs_path(arg));
        } else {
            resolved.push(OsString::from(arg));
        }
        prev = arg;
    }

    resolved
}

/// Returns the [`Command`] of a binary invocation of utop.
pub fn utop_command(args: &[&str]) -> Command {
    let mut cmd = Command::new(UTOP_EXE_PATH);
    cmd.env("NO_COLOR", "1");
    cmd.args(resolve_args(args));

    cmd
}

/// Returns the [`Command`] of a binary invocation of utop with the default, empty config
/// file.
pub fn no_cfg_utop_command() -> Command {
    utop_command(&DEFAULT_CFG)
}

/// Spawns `utop` in a pty, returning the pair alongside a handle to the child.
#[cfg(all(target_arch = "x86_64", target_os = "linux"))]
pub fn spawn_utop_in_pty(args: &[&str]) -> (Box<dyn MasterPty>, Box<dyn Child>) {
    let native_pty = native_pty_system();

    let pair = native_pty
        .openpty(PtySize {
            rows: 100,
            cols: 100,
            pixel_width: 1,
            pixel_height: 1,
        })
        .unwrap();

    let mut cmd = CommandBuilder::new(UTOP_EXE_PATH);
    cmd.env("NO_COLOR", "1");

    let args = if args.is_empty() { &DEFAULT_CFG[..] } else { args };
    for arg in resolve_args(args) {
        cmd.arg(arg);
    }

    (pair.master, pair.slave.spawn_command(cmd).unwrap())
}
