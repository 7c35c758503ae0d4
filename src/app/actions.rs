//! External actions on the selected process: signals, renicing, and handing the terminal
//! over to a diagnostic tool.

use std::{
    ffi::OsString,
    os::unix::process::ExitStatusExt,
    path::PathBuf,
    process::{Command, ExitStatus},
    sync::atomic::{AtomicBool, Ordering},
};

use crate::{
    collection::processes::Pid,
    constants::{PID_ENV_VAR, PID_PLACEHOLDER},
    utils::error::{Result, UtopError},
};

/// The lowest and highest nice values a renice can land on.
pub const NICE_RANGE: (i32, i32) = (-20, 19);

/// Signal numbers above this are rejected outright.
const MAX_SIGNAL: i32 = 64;

/// Signals accepted by name, without the `SIG` prefix.
const SIGNALS: &[(&str, i32)] = &[
    ("HUP", libc::SIGHUP),
    ("INT", libc::SIGINT),
    ("QUIT", libc::SIGQUIT),
    ("ILL", libc::SIGILL),
    ("TRAP", libc::SIGTRAP),
    ("ABRT", libc::SIGABRT),
    ("IOT", libc::SIGABRT),
    ("BUS", libc::SIGBUS),
    ("FPE", libc::SIGFPE),
    ("KILL", libc::SIGKILL),
    ("USR1", libc::SIGUSR1),
    ("SEGV", libc::SIGSEGV),
    ("USR2", libc::SIGUSR2),
    ("PIPE", libc::SIGPIPE),
    ("ALRM", libc::SIGALRM),
    ("TERM", libc::SIGTERM),
    ("CHLD", libc::SIGCHLD),
    ("CONT", libc::SIGCONT),
    ("STOP", libc::SIGSTOP),
    ("TSTP", libc::SIGTSTP),
    ("TTIN", libc::SIGTTIN),
    ("TTOU", libc::SIGTTOU),
    ("URG", libc::SIGURG),
    ("XCPU", libc::SIGXCPU),
    ("XFSZ", libc::SIGXFSZ),
    ("VTALRM", libc::SIGVTALRM),
    ("PROF", libc::SIGPROF),
    ("WINCH", libc::SIGWINCH),
    ("IO", libc::SIGIO),
    ("SYS", libc::SIGSYS),
    #[cfg(any(target_os = "linux", target_os = "android"))]
    ("PWR", libc::SIGPWR),
];

/// The actions bound to a single key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Signal,
    Renice,
    ListOpenFiles,
    Trace,
    Debugger,
    Shell,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::Signal,
        Action::Renice,
        Action::ListOpenFiles,
        Action::Trace,
        Action::Debugger,
        Action::Shell,
    ];

    pub fn from_key(key: char) -> Option<Action> {
        Action::ALL.into_iter().find(|action| action.key() == key)
    }

    pub fn key(self) -> char {
        match self {
            Action::Signal => 'd',
            Action::Renice => 'r',
            Action::ListOpenFiles => 'Q',
            Action::Trace => 's',
            Action::Debugger => 'a',
            Action::Shell => '!',
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Action::Signal => "signal",
            Action::Renice => "renice",
            Action::ListOpenFiles => "list open files",
            Action::Trace => "trace",
            Action::Debugger => "debug",
            Action::Shell => "shell",
        }
    }

    /// The prompt for actions that need a typed argument.
    pub fn prompt(self) -> Option<&'static str> {
        match self {
            Action::Signal => Some("Signal [TERM]: "),
            Action::Renice => Some("Nice increment: "),
            _ => None,
        }
    }

    /// Whether the action takes over the terminal with an external tool, and so is
    /// confirmed first unless forced.
    pub fn launches_tool(self) -> bool {
        matches!(self, Action::ListOpenFiles | Action::Trace | Action::Debugger)
    }
}

/// Parses a signal given by name (with or without `SIG`, in any case) or number. An
/// empty input is `TERM`.
pub fn parse_signal(input: &str) -> Result<i32> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(libc::SIGTERM);
    }

    if let Ok(number) = input.parse::<i32>() {
        return if (0..=MAX_SIGNAL).contains(&number) {
            Ok(number)
        } else {
            Err(UtopError::input(format!("'{input}' is not a valid signal number")))
        };
    }

    let upper = input.to_ascii_uppercase();
    let name = upper.strip_prefix("SIG").unwrap_or(&upper);

    SIGNALS
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, number)| *number)
        .ok_or_else(|| UtopError::input(format!("'{input}' is not a known signal")))
}

/// The canonical name of a signal number, if it has one.
pub fn signal_name(signal: i32) -> Option<&'static str> {
    SIGNALS
        .iter()
        .find(|(_, number)| *number == signal)
        .map(|(name, _)| *name)
}

fn last_os_error_code() -> Option<i32> {
    std::io::Error::last_os_error().raw_os_error()
}

/// Pids of zero or less name process groups or every process to `kill` and the caller
/// to `setpriority`, never a single row.
fn check_target(pid: Pid) -> Result<()> {
    if pid <= 0 {
        Err(UtopError::action(format!("refusing to act on pid {pid}")))
    } else {
        Ok(())
    }
}

/// Sends a signal to a process.
pub fn send_signal(pid: Pid, signal: i32) -> Result<()> {
    check_target(pid)?;

    // SAFETY: kill has no memory safety requirements; bad pids and signals are reported
    // through errno.
    let output = unsafe { libc::kill(pid, signal) };
    if output != 0 {
        let err_code = last_os_error_code();
        let err = match err_code {
            Some(libc::ESRCH) => "the target process did not exist.",
            Some(libc::EPERM) => "the calling process does not have the permissions to signal the target process.",
            Some(libc::EINVAL) => "an invalid signal was specified.",
            _ => "Unknown error occurred.",
        };

        return Err(UtopError::action(match err_code {
            Some(code) => format!("Error code {code} - {err}"),
            None => format!("Error code ??? - {err}"),
        }));
    }

    log::debug!("sent signal {signal} to {pid}");
    Ok(())
}

/// Parses a signed nice increment.
pub fn parse_nice_increment(input: &str) -> Result<i32> {
    let input = input.trim();
    input
        .strip_prefix('+')
        .unwrap_or(input)
        .parse()
        .map_err(|_| UtopError::input(format!("'{input}' is not a valid nice increment")))
}

/// The nice value a renice by `increment` lands on.
pub fn target_nice(current: i32, increment: i32) -> i32 {
    current
        .saturating_add(increment)
        .clamp(NICE_RANGE.0, NICE_RANGE.1)
}

/// Changes a process' nice value by `increment`, returning the new value.
pub fn renice(pid: Pid, current: i32, increment: i32) -> Result<i32> {
    check_target(pid)?;
    let nice = target_nice(current, increment);

    // SAFETY: setpriority has no memory safety requirements.
    let output = unsafe { libc::setpriority(libc::PRIO_PROCESS, pid as libc::id_t, nice) };
    if output != 0 {
        let err = match last_os_error_code() {
            Some(libc::ESRCH) => "the target process did not exist.",
            Some(libc::EPERM) | Some(libc::EACCES) => {
                "the calling process does not have the permissions to change the target's priority."
            }
            _ => "Unknown error occurred.",
        };

        return Err(UtopError::action(format!("Could not renice {pid} - {err}")));
    }

    log::debug!("reniced {pid} to {nice}");
    Ok(nice)
}

/// Command line templates for the external tools. `{pid}` is replaced by the selected pid
/// and the result is run by `sh -c`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommands {
    pub list_open_files: String,
    pub trace: String,
    pub debugger: String,
}

impl Default for ToolCommands {
    fn default() -> Self {
        let (trace, debugger) = if cfg!(target_os = "macos") {
            ("dtruss -p {pid}", "lldb -p {pid}")
        } else if cfg!(any(target_os = "freebsd", target_os = "netbsd", target_os = "dragonfly")) {
            ("truss -p {pid}", "gdb -p {pid}")
        } else {
            ("strace -p {pid}", "gdb -p {pid}")
        };

        Self {
            list_open_files: "lsof -p {pid} | ${PAGER:-less}".to_string(),
            trace: trace.to_string(),
            debugger: debugger.to_string(),
        }
    }
}

impl ToolCommands {
    fn template(&self, action: Action) -> Option<&str> {
        match action {
            Action::ListOpenFiles => Some(&self.list_open_files),
            Action::Trace => Some(&self.trace),
            Action::Debugger => Some(&self.debugger),
            _ => None,
        }
    }
}

/// Fills in a tool template for a pid.
pub fn fill_template(template: &str, pid: Pid) -> String {
    template.replace(PID_PLACEHOLDER, &pid.to_string())
}

/// Whether a program was killed by SIGINT, either directly or as reported by a shell
/// wrapping it.
fn died_from_interrupt(status: ExitStatus) -> bool {
    status.signal() == Some(libc::SIGINT) || status.code() == Some(128 + libc::SIGINT)
}

/// A program to hand the terminal to. Kept as plain data so it can be inspected before
/// it is turned into a [`Command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launch {
    pub program: OsString,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

impl Launch {
    /// Builds the launch for a tool action on `pid`, or `None` if `action` isn't one.
    pub fn for_action(action: Action, tools: &ToolCommands, pid: Pid) -> Option<Launch> {
        if action == Action::Shell {
            return Some(Launch::shell(pid));
        }

        let command_line = fill_template(tools.template(action)?, pid);
        Some(Launch {
            program: OsString::from("/bin/sh"),
            args: vec!["-c".to_string(), command_line],
            cwd: None,
            env: vec![(PID_ENV_VAR.to_string(), pid.to_string())],
        })
    }

    /// An interactive shell, in the process' working directory if we can see it.
    pub fn shell(pid: Pid) -> Launch {
        let program = std::env::var_os("SHELL")
            .filter(|shell| !shell.is_empty())
            .unwrap_or_else(|| OsString::from("/bin/sh"));

        let cwd = PathBuf::from(format!("/proc/{pid}/cwd"));
        let cwd = cwd.read_dir().is_ok().then_some(cwd);

        Launch {
            program,
            args: Vec::new(),
            cwd,
            env: vec![(PID_ENV_VAR.to_string(), pid.to_string())],
        }
    }

    pub fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args).envs(self.env.iter().cloned());
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }

        command
    }

    /// Runs the program to completion. The caller is expected to have released the
    /// terminal first.
    ///
    /// A Ctrl-C typed at the program also lands in `is_terminated`. That request is
    /// dropped only if the program itself died from the interrupt; anything else, such as
    /// a SIGTERM sent to us meanwhile, stays pending.
    pub fn run(&self, is_terminated: &AtomicBool) -> Result<()> {
        log::debug!("launching {self:?}");

        let status: ExitStatus = self.command().status().map_err(|err| {
            UtopError::action(format!("Could not run {:?}: {err}", self.program))
        })?;

        if died_from_interrupt(status) {
            log::debug!("{:?} was interrupted, staying up", self.program);
            is_terminated.store(false, Ordering::SeqCst);
        }

        if status.success() {
            Ok(())
        } else {
            Err(UtopError::action(format!("{:?} exited with {status}", self.program)))
        }
    }
}
