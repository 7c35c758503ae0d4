//! Process data collection for Linux.

mod process;

use std::{
    fs::{self, File},
    io::{BufRead, BufReader},
    path::PathBuf,
};

use concat_string::concat_string;
use hashbrown::{HashMap, HashSet};
use process::*;

use super::{Pid, ProcessSnapshot, ProcessState, UserTable};
use crate::collection::{
    Collector, MachineStats,
    error::{CollectionError, CollectionResult},
    machine::MachineSampler,
};

/// Given `/proc/stat` file contents, determine the idle and non-idle values of
/// the CPU used to calculate CPU usage.
fn fetch_cpu_usage(line: &str) -> (f64, f64) {
    /// Converts a `Option<&str>` value to an f64. If it fails to parse or is
    /// `None`, it will return `0_f64`.
    fn str_to_f64(val: Option<&str>) -> f64 {
        val.and_then(|v| v.parse::<f64>().ok()).unwrap_or(0_f64)
    }

    let mut val = line.split_whitespace();
    let user = str_to_f64(val.next());
    let nice: f64 = str_to_f64(val.next());
    let system: f64 = str_to_f64(val.next());
    let idle: f64 = str_to_f64(val.next());
    let iowait: f64 = str_to_f64(val.next());
    let irq: f64 = str_to_f64(val.next());
    let softirq: f64 = str_to_f64(val.next());
    let steal: f64 = str_to_f64(val.next());

    // Note we do not get guest/guest_nice, as they are calculated as part of
    // user/nice respectively See https://github.com/htop-dev/htop/blob/main/linux/LinuxProcessList.c
    let idle = idle + iowait;
    let non_idle = user + nice + system + irq + softirq + steal;

    (idle, non_idle)
}

/// Returns the total number of jiffies that passed since the last call, across all CPUs.
fn total_delta_since(prev_idle: &mut f64, prev_non_idle: &mut f64) -> CollectionResult<f64> {
    let (idle, non_idle) = {
        // From SO answer: https://stackoverflow.com/a/23376195
        let first_line = {
            // We just need a single line from this file. Read it and return it.
            let mut reader = BufReader::new(File::open("/proc/stat")?);
            let mut buffer = String::new();
            reader.read_line(&mut buffer)?;

            buffer
        };

        // Skip the leading "cpu" label.
        fetch_cpu_usage(first_line.trim_start_matches("cpu"))
    };

    let total = idle + non_idle;
    let prev_total = *prev_idle + *prev_non_idle;

    *prev_idle = idle;
    *prev_non_idle = non_idle;

    Ok(total - prev_total)
}

/// Returns a process' CPU usage as a percentage of the whole machine.
fn cpu_percent(new_ticks: u64, prev_ticks: Option<u64>, total_delta: f64) -> f32 {
    match prev_ticks {
        Some(prev) if total_delta > 0.0 => {
            let diff = new_ticks.saturating_sub(prev) as f64;
            ((diff / total_delta) * 100.0) as f32
        }
        _ => 0.0,
    }
}

fn is_str_numeric(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

/// Reads processes straight out of `/proc`.
pub struct LinuxCollector {
    user_table: UserTable,
    machine: MachineSampler,
    prev_idle: f64,
    prev_non_idle: f64,
    total_delta: f64,
    /// Per-process CPU ticks from the previous read.
    prev_cpu_ticks: HashMap<Pid, u64>,
    buffer: String,
}

impl Default for LinuxCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl LinuxCollector {
    pub fn new() -> Self {
        Self {
            user_table: UserTable::default(),
            machine: MachineSampler::new(),
            prev_idle: 0.0,
            prev_non_idle: 0.0,
            total_delta: 0.0,
            prev_cpu_ticks: HashMap::new(),
            buffer: String::new(),
        }
    }

    fn pid_path(pid: Pid) -> PathBuf {
        PathBuf::from(concat_string!("/proc/", pid.to_string()))
    }
}

impl Collector for LinuxCollector {
    fn name(&self) -> &'static str {
        "procfs"
    }

    fn prepare(&mut self) -> CollectionResult<()> {
        self.total_delta = total_delta_since(&mut self.prev_idle, &mut self.prev_non_idle)?;

        Ok(())
    }

    fn exists(&self, pid: Pid) -> bool {
        rustix::fs::access(Self::pid_path(pid), rustix::fs::Access::EXISTS).is_ok()
    }

    fn read(&mut self, pid: Pid, with_argv: bool) -> CollectionResult<ProcessSnapshot> {
        let Process {
            uid,
            gid,
            stat,
            argv,
        } = match Process::from_path(Self::pid_path(pid), &mut self.buffer, with_argv) {
            Ok(process) => process,
            Err(_) if !self.exists(pid) => return Err(CollectionError::NotFound(pid)),
            Err(err) => return Err(err.into()),
        };

        let ticks = stat.cpu_ticks();
        let cpu_percent = cpu_percent(
            ticks,
            self.prev_cpu_ticks.insert(pid, ticks),
            self.total_delta,
        );

        Ok(ProcessSnapshot {
            pid,
            ppid: stat.ppid,
            uid,
            gid,
            user: self.user_table.user_or_uid(uid),
            group: self.user_table.group_or_gid(gid),
            jail_id: None,
            state: ProcessState::from_char(stat.state),
            tty: stat.tty_name(),
            nice: stat.nice,
            cpu_percent,
            utime: ticks_to_duration(stat.utime),
            stime: ticks_to_duration(stat.stime),
            cutime: ticks_to_duration(stat.cutime),
            cstime: ticks_to_duration(stat.cstime),
            mem_bytes: stat.rss_bytes(),
            argv,
            is_kernel_thread: stat.is_kernel_thread,
            comm: stat.comm,
        })
    }

    fn enumerate(&mut self) -> CollectionResult<Vec<Pid>> {
        // Note this will only return PIDs of _processes_, not threads.
        let pids: Vec<Pid> = fs::read_dir("/proc")?
            .flatten()
            .filter_map(|dir| {
                let name = dir.file_name();
                let name = name.to_string_lossy();
                let name = name.trim();

                if is_str_numeric(name) {
                    name.parse().ok()
                } else {
                    None
                }
            })
            .collect();

        // Clean up values we don't care about anymore.
        let seen: HashSet<Pid> = pids.iter().copied().collect();
        self.prev_cpu_ticks.retain(|pid, _| seen.contains(pid));

        Ok(pids)
    }

    fn machine_stats(&mut self) -> Option<MachineStats> {
        Some(self.machine.sample())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proc_cpu_parse() {
        assert_eq!(
            (100_f64, 200_f64),
            fetch_cpu_usage("100 0 100 100 0 0 0 0 0 0"),
            "Failed to pass the first test."
        );
        assert_eq!(
            (120_f64, 200_f64),
            fetch_cpu_usage("100 0 100 100 20 0 0 0 0 0"),
            "Failed to pass the second test."
        );
        assert_eq!(
            (100_f64, 200_f64),
            fetch_cpu_usage("  100 0 100 100 0 0 0 0 0 0"),
            "Leading whitespace should be ignored."
        );
    }

    #[test]
    fn cpu_percent_needs_history() {
        assert_eq!(cpu_percent(500, None, 100.0), 0.0);
        assert_eq!(cpu_percent(500, Some(450), 100.0), 50.0);
        assert_eq!(cpu_percent(500, Some(450), 0.0), 0.0);
        assert_eq!(cpu_percent(400, Some(450), 100.0), 0.0);
    }

    #[test]
    fn numeric_names_only() {
        assert!(is_str_numeric("1234"));
        assert!(!is_str_numeric("self"));
        assert!(!is_str_numeric(""));
    }

    #[test]
    fn reads_own_process() {
        let mut collector = LinuxCollector::new();
        collector.prepare().unwrap();

        let pid = std::process::id() as Pid;
        assert!(collector.exists(pid));
        assert!(collector.enumerate().unwrap().contains(&pid));

        let snapshot = collector.read(pid, true).unwrap();
        assert_eq!(snapshot.pid, pid);
        assert!(!snapshot.is_kernel_thread);
        assert!(snapshot.argv.is_some_and(|argv| !argv.is_empty()));

        let without_argv = collector.read(pid, false).unwrap();
        assert!(without_argv.argv.is_none());
    }

    #[test]
    fn missing_process_is_not_found() {
        let mut collector = LinuxCollector::new();

        // Pids are capped well below this on Linux.
        let pid: Pid = Pid::MAX;
        assert!(!collector.exists(pid));
        assert!(collector.read(pid, true).is_err_and(|err| err.is_not_found()));
    }
}
