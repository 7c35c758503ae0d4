//! Linux process code for getting process data via `/proc/`.
//! Based on the [procfs](https://github.com/eminence/procfs) crate.

use std::{
    fs::File,
    io::{self, Read},
    path::PathBuf,
    sync::OnceLock,
    time::Duration,
};

use anyhow::anyhow;
use rustix::{
    fd::OwnedFd,
    fs::{Mode, OFlags},
};

use crate::collection::processes::{Gid, Pid, Uid};

static PAGESIZE: OnceLock<u64> = OnceLock::new();
static CLOCK_TICKS: OnceLock<u64> = OnceLock::new();

/// `PF_KTHREAD` from `include/linux/sched.h`.
const PF_KTHREAD: u32 = 0x0020_0000;

#[inline]
fn next_part<'a>(iter: &mut impl Iterator<Item = &'a str>) -> Result<&'a str, io::Error> {
    iter.next()
        .ok_or_else(|| io::Error::from(io::ErrorKind::InvalidData))
}

/// Converts clock ticks into a [`Duration`].
pub(crate) fn ticks_to_duration(ticks: u64) -> Duration {
    let per_sec = *CLOCK_TICKS.get_or_init(|| rustix::param::clock_ticks_per_second());

    if per_sec == 0 {
        Duration::ZERO
    } else {
        Duration::from_millis(ticks.saturating_mul(1000) / per_sec)
    }
}

/// A wrapper around the data in `/proc/<PID>/stat`. For documentation, see:
/// - <https://manpages.ubuntu.com/manpages/noble/man5/proc_pid_stat.5.html>
/// - <https://man7.org/linux/man-pages/man5/proc_pid_status.5.html>
///
/// Note this does not necessarily get all fields, only the ones we use.
pub(crate) struct Stat {
    /// The filename of the executable without parentheses.
    pub comm: String,

    /// The current process state, represented by a char.
    pub state: char,

    /// The parent process PID.
    pub ppid: Pid,

    /// The controlling terminal, encoded as a device number.
    pub tty_nr: i32,

    /// The amount of time this process has been scheduled in user mode in clock
    /// ticks.
    pub utime: u64,

    /// The amount of time this process has been scheduled in kernel mode in
    /// clock ticks.
    pub stime: u64,

    /// Waited-for children's user time in clock ticks.
    pub cutime: u64,

    /// Waited-for children's kernel time in clock ticks.
    pub cstime: u64,

    /// The nice value, from 19 (low priority) to -20 (high priority).
    pub nice: i32,

    /// The resident set size, or the number of pages the process has in real
    /// memory.
    rss: u64,

    /// Kernel thread
    pub is_kernel_thread: bool,
}

impl Stat {
    /// Get process stats from a file; this assumes the file is located at
    /// `/proc/<PID>/stat`.
    fn from_file(mut f: File, buffer: &mut String) -> anyhow::Result<Stat> {
        // Since this is just one line, we can read it all at once. However, since it
        // (technically) might have non-utf8 characters, we can't just use read_to_string.
        let mut bytes = Vec::new();
        f.read_to_end(&mut bytes)?;
        buffer.push_str(&String::from_utf8_lossy(&bytes));

        Self::from_line(buffer.trim())
    }

    fn from_line(line: &str) -> anyhow::Result<Stat> {
        // The name may itself contain parentheses, so the last closing one ends it.
        let (comm, rest) = {
            let start_paren = line
                .find('(')
                .ok_or_else(|| anyhow!("start paren missing"))?;
            let end_paren = line.rfind(')').ok_or_else(|| anyhow!("end paren missing"))?;

            (
                line[start_paren + 1..end_paren].to_string(),
                line.get(end_paren + 2..).unwrap_or_default(),
            )
        };

        let mut rest = rest.split(' ');
        let state = next_part(&mut rest)?
            .chars()
            .next()
            .ok_or_else(|| anyhow!("missing state"))?;
        let ppid: Pid = next_part(&mut rest)?.parse()?;

        // Skip 2 fields (pgrp, session)
        let mut rest = rest.skip(2);
        let tty_nr: i32 = next_part(&mut rest)?.parse()?;

        // Skip tpgid
        let mut rest = rest.skip(1);
        let flags: u32 = next_part(&mut rest)?.parse()?;
        let is_kernel_thread = flags & PF_KTHREAD != 0;

        // Skip 4 fields (minflt, cminflt, majflt, cmajflt)
        let mut rest = rest.skip(4);
        let utime: u64 = next_part(&mut rest)?.parse()?;
        let stime: u64 = next_part(&mut rest)?.parse()?;

        // These two are signed in the kernel.
        let cutime: i64 = next_part(&mut rest)?.parse()?;
        let cstime: i64 = next_part(&mut rest)?.parse()?;

        // Skip priority
        let mut rest = rest.skip(1);
        let nice: i32 = next_part(&mut rest)?.parse()?;

        // Skip 4 fields (num_threads, itrealvalue, starttime, vsize)
        let mut rest = rest.skip(4);
        let rss: u64 = next_part(&mut rest)?.parse()?;

        Ok(Stat {
            comm,
            state,
            ppid,
            tty_nr,
            utime,
            stime,
            cutime: cutime.max(0) as u64,
            cstime: cstime.max(0) as u64,
            nice,
            rss,
            is_kernel_thread,
        })
    }

    /// Returns the Resident Set Size in bytes.
    #[inline]
    pub fn rss_bytes(&self) -> u64 {
        self.rss * PAGESIZE.get_or_init(|| rustix::param::page_size() as u64)
    }

    /// Total CPU time in clock ticks, used for the per-cycle CPU% delta.
    #[inline]
    pub fn cpu_ticks(&self) -> u64 {
        self.utime + self.stime
    }

    /// Decodes `tty_nr` into a device name. See `Documentation/admin-guide/devices.txt`.
    pub fn tty_name(&self) -> Option<String> {
        if self.tty_nr == 0 {
            return None;
        }

        let tty_nr = self.tty_nr as u32;
        let major = (tty_nr >> 8) & 0xfff;
        let minor = (tty_nr & 0xff) | ((tty_nr >> 12) & 0xfff00);

        Some(match major {
            136..=143 => format!("pts/{}", minor + (major - 136) * 256),
            4 if minor < 64 => format!("tty{minor}"),
            4 => format!("ttyS{}", minor - 64),
            _ => format!("{major}:{minor}"),
        })
    }
}

/// A wrapper around a Linux process operations in `/proc/<PID>`.
///
/// Core documentation based on [proc's manpages](https://man7.org/linux/man-pages/man5/proc.5.html).
pub(crate) struct Process {
    pub uid: Uid,
    pub gid: Gid,
    pub stat: Stat,
    pub argv: Option<Vec<String>>,
}

#[inline]
fn reset(root: &mut PathBuf, buffer: &mut String) {
    root.pop();
    buffer.clear();
}

impl Process {
    /// Creates a new [`Process`] given a `/proc/<PID>` path. This may fail if
    /// the process no longer exists or there are permissions issues.
    ///
    /// The command line is only read if `with_argv` is set.
    ///
    /// This takes in a buffer to avoid allocs; this function will clear the buffer.
    #[inline]
    pub(crate) fn from_path(
        pid_path: PathBuf, buffer: &mut String, with_argv: bool,
    ) -> anyhow::Result<Process> {
        buffer.clear();

        let pid_dir = rustix::fs::openat(
            rustix::fs::CWD,
            pid_path.as_path(),
            OFlags::PATH | OFlags::DIRECTORY | OFlags::CLOEXEC,
            Mode::empty(),
        )?;

        // The owner of the pid directory is the process' effective uid and gid.
        let (uid, gid) = {
            let metadata = rustix::fs::fstat(&pid_dir)?;
            (metadata.st_uid, metadata.st_gid)
        };

        let mut root = pid_path;

        // NB: Whenever you add a new stat, make sure to pop the root and clear the
        // buffer!
        let stat =
            open_at(&mut root, "stat", &pid_dir).and_then(|file| Stat::from_file(file, buffer))?;
        reset(&mut root, buffer);

        let argv = if with_argv {
            let argv = cmdline(&mut root, &pid_dir).ok();
            reset(&mut root, buffer);
            Some(argv.unwrap_or_default())
        } else {
            None
        };

        Ok(Process {
            uid,
            gid,
            stat,
            argv,
        })
    }
}

/// Reads `/proc/<PID>/cmdline`, which is a list of NUL-terminated arguments.
#[inline]
fn cmdline(root: &mut PathBuf, fd: &OwnedFd) -> anyhow::Result<Vec<String>> {
    let mut bytes = Vec::new();
    open_at(root, "cmdline", fd)?.read_to_end(&mut bytes)?;

    Ok(split_cmdline(&bytes))
}

pub(crate) fn split_cmdline(bytes: &[u8]) -> Vec<String> {
    let bytes = bytes.strip_suffix(b"\0").unwrap_or(bytes);

    if bytes.is_empty() {
        return Vec::new();
    }

    bytes
        .split(|b| *b == 0)
        .map(|arg| String::from_utf8_lossy(arg).into_owned())
        .collect()
}

/// Opens a path. Note that this function takes in a mutable root - this will
/// mutate it to avoid allocations. You probably will want to pop the most
/// recent child after if you need to use the buffer again.
#[inline]
fn open_at(root: &mut PathBuf, child: &str, fd: &OwnedFd) -> anyhow::Result<File> {
    root.push(child);
    let new_fd = rustix::fs::openat(fd, &*root, OFlags::RDONLY | OFlags::CLOEXEC, Mode::empty())?;

    Ok(File::from(new_fd))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_STAT: &str = "1234 (tmux: server) S 1 1234 1234 34817 1234 4194560 120 0 0 0 \
                               250 75 10 -2 20 5 1 0 4242 10000000 512 18446744073709551615";

    #[test]
    fn parses_stat_line() {
        let stat = Stat::from_line(SAMPLE_STAT).unwrap();

        assert_eq!(stat.comm, "tmux: server");
        assert_eq!(stat.state, 'S');
        assert_eq!(stat.ppid, 1);
        assert_eq!(stat.utime, 250);
        assert_eq!(stat.stime, 75);
        assert_eq!(stat.cutime, 10);
        assert_eq!(stat.cstime, 0);
        assert_eq!(stat.nice, 5);
        assert_eq!(stat.rss, 512);
        assert_eq!(stat.cpu_ticks(), 325);
        assert!(!stat.is_kernel_thread);
    }

    #[test]
    fn parses_names_with_parens() {
        let line = "77 (a) b) R 2 0 0 0 -1 2129984 0 0 0 0 0 0 0 0 20 0 1 0 5 0 0 0";
        let stat = Stat::from_line(line).unwrap();

        assert_eq!(stat.comm, "a) b");
        assert_eq!(stat.state, 'R');
        assert_eq!(stat.ppid, 2);
        assert!(stat.is_kernel_thread);
        assert_eq!(stat.tty_name(), None);
    }

    #[test]
    fn truncated_stat_is_an_error() {
        assert!(Stat::from_line("1 (init) S 0 1 1").is_err());
        assert!(Stat::from_line("garbage").is_err());
    }

    #[test]
    fn decodes_terminals() {
        let mut stat = Stat::from_line(SAMPLE_STAT).unwrap();
        // 34817 = major 136, minor 1.
        assert_eq!(stat.tty_name().as_deref(), Some("pts/1"));

        stat.tty_nr = (4 << 8) | 2;
        assert_eq!(stat.tty_name().as_deref(), Some("tty2"));

        stat.tty_nr = (4 << 8) | 65;
        assert_eq!(stat.tty_name().as_deref(), Some("ttyS1"));
    }

    #[test]
    fn splits_cmdline() {
        assert_eq!(
            split_cmdline(b"/bin/sh\0-c\0echo hi\0"),
            vec!["/bin/sh", "-c", "echo hi"]
        );
        assert!(split_cmdline(b"").is_empty());
        assert_eq!(split_cmdline(b"single"), vec!["single"]);
    }
}
