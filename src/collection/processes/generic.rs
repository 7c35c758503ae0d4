//! Process data collection through sysinfo, for Unix-likes without a custom reader.

use std::time::Duration;

use sysinfo::{ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System, UpdateKind};

use super::{Pid, ProcessSnapshot, ProcessState, UserTable};
use crate::collection::{
    Collector, MachineStats,
    error::{CollectionError, CollectionResult},
    machine::MachineSampler,
};

impl From<ProcessStatus> for ProcessState {
    fn from(status: ProcessStatus) -> Self {
        match status {
            ProcessStatus::Run => ProcessState::Running,
            ProcessStatus::Sleep | ProcessStatus::Idle => ProcessState::Sleeping,
            ProcessStatus::UninterruptibleDiskSleep => ProcessState::DiskWait,
            ProcessStatus::Stop => ProcessState::Stopped,
            ProcessStatus::Zombie => ProcessState::Zombie,
            ProcessStatus::Dead => ProcessState::Dead,
            ProcessStatus::Tracing => ProcessState::Traced,
            _ => ProcessState::Other,
        }
    }
}

pub struct GenericCollector {
    sys: System,
    user_table: UserTable,
    machine: MachineSampler,
}

impl Default for GenericCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl GenericCollector {
    pub fn new() -> Self {
        Self {
            sys: System::new(),
            user_table: UserTable::default(),
            machine: MachineSampler::new(),
        }
    }

    fn sysinfo_pid(pid: Pid) -> sysinfo::Pid {
        sysinfo::Pid::from_u32(pid as u32)
    }
}

/// Reads the nice value; sysinfo does not expose it.
fn nice_of(pid: Pid) -> i32 {
    // SAFETY: getpriority has no memory safety requirements. A failed lookup returns -1,
    // which is also a valid nice value, so it is just shown as such.
    unsafe { libc::getpriority(libc::PRIO_PROCESS, pid as libc::id_t) }
}

impl Collector for GenericCollector {
    fn name(&self) -> &'static str {
        "sysinfo"
    }

    fn prepare(&mut self) -> CollectionResult<()> {
        self.sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing()
                .with_cpu()
                .with_memory()
                .with_user(UpdateKind::OnlyIfNotSet)
                .with_cmd(UpdateKind::OnlyIfNotSet),
        );

        Ok(())
    }

    fn exists(&self, pid: Pid) -> bool {
        self.sys.process(Self::sysinfo_pid(pid)).is_some()
    }

    fn read(&mut self, pid: Pid, with_argv: bool) -> CollectionResult<ProcessSnapshot> {
        let sysinfo_pid = Self::sysinfo_pid(pid);

        // The sweep in `prepare` only fills the command and owner in once. A process can
        // exec or change users under the same pid, so a full read fetches both again.
        if with_argv {
            self.sys.refresh_processes_specifics(
                ProcessesToUpdate::Some(&[sysinfo_pid]),
                false,
                ProcessRefreshKind::nothing()
                    .with_user(UpdateKind::Always)
                    .with_cmd(UpdateKind::Always),
            );
        }

        let process = self
            .sys
            .process(sysinfo_pid)
            .ok_or(CollectionError::NotFound(pid))?;

        let uid = process.user_id().map(|u| **u).unwrap_or_default();
        let gid = process.group_id().map(|g| *g).unwrap_or_default();
        let argv = with_argv.then(|| {
            process
                .cmd()
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned())
                .collect::<Vec<_>>()
        });

        Ok(ProcessSnapshot {
            pid,
            ppid: process.parent().map(|p| p.as_u32() as Pid).unwrap_or(0),
            uid,
            gid,
            user: self.user_table.user_or_uid(uid),
            group: self.user_table.group_or_gid(gid),
            jail_id: None,
            state: process.status().into(),
            tty: None,
            nice: nice_of(pid),
            cpu_percent: process.cpu_usage(),
            utime: Duration::from_millis(process.accumulated_cpu_time()),
            stime: Duration::ZERO,
            cutime: Duration::ZERO,
            cstime: Duration::ZERO,
            mem_bytes: process.memory(),
            argv,
            comm: process.name().to_string_lossy().into_owned(),
            is_kernel_thread: false,
        })
    }

    fn enumerate(&mut self) -> CollectionResult<Vec<Pid>> {
        Ok(self
            .sys
            .processes()
            .keys()
            .map(|pid| pid.as_u32() as Pid)
            .collect())
    }

    fn machine_stats(&mut self) -> Option<MachineStats> {
        Some(self.machine.sample())
    }
}
