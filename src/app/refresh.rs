//! Reconciles the store against a [`Collector`] once per refresh cycle.

use std::time::{Duration, Instant};

use crate::{
    app::{
        store::{ProcessRecord, ProcessStore},
        summary::{SystemSnapshot, summarize},
    },
    collection::{Collector, processes::Uid},
    utils::error::Result,
};

/// What a single refresh did, for the debug log.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RefreshStats {
    pub removed: usize,
    pub reparented: usize,
    pub added: usize,
    pub rescanned: bool,
}

/// Runs one refresh cycle. A rescan re-reads every argument vector.
///
/// Only whole-collector failures are returned. Records that vanish or fail to read are
/// dropped (or skipped, if new) for this cycle.
pub fn refresh_store(
    store: &mut ProcessStore, collector: &mut dyn Collector, current_uid: Uid, rescan: bool,
) -> Result<(SystemSnapshot, RefreshStats)> {
    let mut stats = RefreshStats {
        rescanned: rescan,
        ..Default::default()
    };

    collector.prepare()?;

    // Sweep.
    for pid in store.pids() {
        if !collector.exists(pid) {
            store.remove(pid);
            stats.removed += 1;
            continue;
        }

        let Some(record) = store.get_mut(pid) else {
            continue;
        };
        let old_ppid = record.ppid();

        match collector.update(record, rescan) {
            Ok(ppid) if ppid != old_ppid => {
                store.reparent(pid, ppid);
                stats.reparented += 1;
            }
            Ok(_) => {}
            Err(err) => {
                log::trace!("dropping {pid} after a failed update: {err}");
                store.remove(pid);
                stats.removed += 1;
            }
        }
    }

    let processes = summarize(store, current_uid);

    // Discovery.
    for pid in collector.enumerate()? {
        if store.contains(pid) {
            continue;
        }

        match collector.read(pid, true) {
            Ok(snapshot) => {
                store.insert(ProcessRecord::from_snapshot(snapshot))?;
                stats.added += 1;
            }
            Err(err) => log::trace!("skipping new process {pid}: {err}"),
        }
    }

    let snapshot = SystemSnapshot {
        processes,
        machine: collector.machine_stats(),
    };

    Ok((snapshot, stats))
}

/// Decides when to refresh and when a refresh should also be a rescan.
#[derive(Debug)]
pub struct Refresher {
    interval: Duration,
    rescan_interval: Duration,
    last_refresh: Option<Instant>,
    last_rescan: Option<Instant>,
    force_rescan: bool,
}

impl Refresher {
    pub fn new(interval: Duration, rescan_interval: Duration) -> Self {
        Self {
            interval,
            rescan_interval,
            last_refresh: None,
            last_rescan: None,
            force_rescan: false,
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.time_until_due(now).is_zero()
    }

    /// How long the input loop may wait before the next refresh.
    pub fn time_until_due(&self, now: Instant) -> Duration {
        match self.last_refresh {
            Some(last) => (last + self.interval).saturating_duration_since(now),
            None => Duration::ZERO,
        }
    }

    /// Makes the next refresh a rescan.
    pub fn force_rescan(&mut self) {
        self.force_rescan = true;
    }

    fn rescan_due(&self, now: Instant) -> bool {
        self.force_rescan
            || match self.last_rescan {
                Some(last) => now.saturating_duration_since(last) >= self.rescan_interval,
                None => true,
            }
    }

    /// Refreshes the store, rescanning if one is due.
    pub fn refresh(
        &mut self, now: Instant, store: &mut ProcessStore, collector: &mut dyn Collector,
        current_uid: Uid,
    ) -> Result<SystemSnapshot> {
        let rescan = self.rescan_due(now);
        let (snapshot, stats) = refresh_store(store, collector, current_uid, rescan)?;

        log::debug!(
            "refreshed {} processes via {}: {stats:?}",
            store.len(),
            collector.name()
        );

        self.last_refresh = Some(now);
        if rescan {
            self.last_rescan = Some(now);
            self.force_rescan = false;
        }

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use rand::{Rng, SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{
        app::{forest::ForestIndex, store::tests::assert_consistent},
        collection::{
            processes::{Pid, ProcessSnapshot, ProcessState, listing::ListingCollector},
            testing::ScriptedCollector,
        },
        utils::error::UtopError,
    };

    fn snapshot(pid: Pid, ppid: Pid, cmd: &str) -> ProcessSnapshot {
        ProcessSnapshot::new(pid, ppid, cmd).with_command(cmd)
    }

    fn scenario() -> ScriptedCollector {
        ScriptedCollector::with([
            snapshot(1, 0, "init"),
            snapshot(10, 1, "sshd"),
            snapshot(11, 1, "cron"),
            snapshot(20, 11, "sh"),
        ])
    }

    fn refresh(store: &mut ProcessStore, collector: &mut ScriptedCollector) -> SystemSnapshot {
        refresh_store(store, collector, 0, false).unwrap().0
    }

    #[test]
    fn discovers_everything_on_the_first_cycle() {
        let mut store = ProcessStore::new();
        let mut collector = scenario();

        let (_, stats) = refresh_store(&mut store, &mut collector, 0, true).unwrap();

        assert_eq!(stats.added, 4);
        assert_eq!(store.children_of(1), &[10, 11]);
        assert_eq!(store.children_of(11), &[20]);
        assert_consistent(&store);
    }

    #[test]
    fn first_cycle_orders_the_tree_depth_first() {
        let mut store = ProcessStore::new();
        let mut collector = scenario();
        refresh_store(&mut store, &mut collector, 0, true).unwrap();

        let index = ForestIndex::build(&store, true);
        let order: Vec<Pid> = (0..=3)
            .filter_map(|row| index.from_index(row))
            .map(ProcessRecord::pid)
            .collect();

        assert_eq!(order, vec![1, 10, 11, 20]);
        assert_eq!(index.len(), 4);
        assert_eq!(index.depth(3), Some(2));
        assert!(index.from_index(4).is_none());
    }

    #[test]
    fn random_churn_keeps_the_store_consistent() {
        let mut rng = StdRng::seed_from_u64(0x7f0c);
        let mut store = ProcessStore::new();
        let mut collector = scenario();
        let mut next_pid: Pid = 100;

        for cycle in 0..200 {
            let rescan = cycle % 10 == 0;
            refresh_store(&mut store, &mut collector, 0, rescan).unwrap();
            assert_consistent(&store);

            let pids: Vec<Pid> = collector.table.keys().copied().collect();
            let mut kept: Vec<Pid> = store.pids();
            kept.sort_unstable();
            let mut expected = pids.clone();
            expected.sort_unstable();
            assert_eq!(kept, expected, "cycle {cycle}");
            for pid in &pids {
                assert_eq!(store.get(*pid).unwrap().ppid(), collector.table[pid].ppid);
            }
            assert_eq!(ForestIndex::build(&store, true).len(), store.len());

            for _ in 0..rng.gen_range(0..4) {
                let pid = pids[rng.gen_range(0..pids.len())];
                if pid != 1 {
                    collector.kill(pid);
                }
            }

            let pids: Vec<Pid> = collector.table.keys().copied().collect();
            for _ in 0..rng.gen_range(0..4) {
                // Parents are sometimes pids that never existed.
                let ppid = if rng.gen_bool(0.1) {
                    rng.gen_range(5_000..6_000)
                } else {
                    pids[rng.gen_range(0..pids.len())]
                };
                collector.put(snapshot(next_pid, ppid, "worker"));
                next_pid += 1;
            }

            let pids: Vec<Pid> = collector.table.keys().copied().collect();
            for _ in 0..rng.gen_range(0..3) {
                let pid = pids[rng.gen_range(0..pids.len())];
                let ppid = pids[rng.gen_range(0..pids.len())];
                if pid != 1 {
                    let cmd = format!("worker {cycle}");
                    collector.put(snapshot(pid, ppid, &cmd));
                }
            }
        }
    }

    #[test]
    fn vanished_processes_are_removed() {
        let mut store = ProcessStore::new();
        let mut collector = scenario();
        refresh(&mut store, &mut collector);

        collector.kill(10);
        refresh(&mut store, &mut collector);

        assert_eq!(store.children_of(1), &[11]);
        assert!(store.get(10).is_none());
        assert_consistent(&store);
    }

    #[test]
    fn changed_parents_are_relinked() {
        let mut store = ProcessStore::new();
        let mut collector = scenario();
        refresh(&mut store, &mut collector);

        collector.put(snapshot(20, 10, "sh"));
        let (_, stats) = refresh_store(&mut store, &mut collector, 0, false).unwrap();

        assert_eq!(stats.reparented, 1);
        assert!(store.children_of(11).is_empty());
        assert_eq!(store.children_of(10), &[20]);
        assert_consistent(&store);
    }

    #[test]
    fn failed_updates_count_as_gone() {
        let mut store = ProcessStore::new();
        let mut collector = scenario();
        refresh(&mut store, &mut collector);

        // 11 still exists but can't be read, so it is dropped and stays undiscovered.
        collector.unreadable.push(11);
        refresh(&mut store, &mut collector);

        assert!(!store.contains(11));
        assert!(store.roots().any(|r| r.pid() == 20));
        assert_consistent(&store);

        // Once readable again it is rediscovered and takes its child back.
        collector.unreadable.clear();
        refresh(&mut store, &mut collector);

        assert_eq!(store.children_of(11), &[20]);
        assert!(store.roots().all(|r| r.pid() == 1));
        assert_consistent(&store);
    }

    #[test]
    fn summary_reflects_the_swept_store() {
        let mut store = ProcessStore::new();
        let mut collector = scenario();

        let first = refresh(&mut store, &mut collector);
        assert_eq!(first.processes.total, 0);

        collector.put(snapshot(30, 1, "zombie").with_state(ProcessState::Zombie));
        let second = refresh(&mut store, &mut collector);
        assert_eq!(second.processes.total, 4);
        assert_eq!(second.processes.zombies, 0);

        let third = refresh(&mut store, &mut collector);
        assert_eq!(third.processes.total, 5);
        assert_eq!(third.processes.zombies, 1);
        assert_eq!(third.processes.count(ProcessState::Zombie), 1);
    }

    #[test]
    fn argv_is_only_reread_on_rescans() {
        let mut store = ProcessStore::new();
        let mut collector = scenario();
        let mut refresher = Refresher::new(Duration::from_millis(500), Duration::from_secs(30));
        let start = Instant::now();

        refresher.refresh(start, &mut store, &mut collector, 0).unwrap();
        assert_eq!(collector.reads[&10], 1);

        collector.put(snapshot(10, 1, "sshd: alice [priv]"));
        refresher
            .refresh(start + Duration::from_secs(1), &mut store, &mut collector, 0)
            .unwrap();
        assert_eq!(store.get(10).unwrap().shell_cmd(), "sshd");

        refresher.force_rescan();
        refresher
            .refresh(start + Duration::from_secs(2), &mut store, &mut collector, 0)
            .unwrap();
        assert_eq!(store.get(10).unwrap().shell_cmd(), "sshd: alice [priv]");
    }

    #[test]
    fn rescans_follow_their_own_interval() {
        let mut store = ProcessStore::new();
        let mut collector = scenario();
        let mut refresher = Refresher::new(Duration::from_millis(500), Duration::from_secs(30));
        let start = Instant::now();

        refresher.refresh(start, &mut store, &mut collector, 0).unwrap();
        collector.put(snapshot(11, 1, "crond -n"));

        refresher
            .refresh(start + Duration::from_secs(29), &mut store, &mut collector, 0)
            .unwrap();
        assert_eq!(store.get(11).unwrap().shell_cmd(), "cron");

        refresher
            .refresh(start + Duration::from_secs(30), &mut store, &mut collector, 0)
            .unwrap();
        assert_eq!(store.get(11).unwrap().shell_cmd(), "crond -n");
    }

    #[test]
    fn refresh_timing() {
        let mut store = ProcessStore::new();
        let mut collector = scenario();
        let mut refresher = Refresher::new(Duration::from_millis(500), Duration::from_secs(30));
        let start = Instant::now();

        assert!(refresher.is_due(start));

        refresher.refresh(start, &mut store, &mut collector, 0).unwrap();
        assert!(!refresher.is_due(start));
        assert_eq!(
            refresher.time_until_due(start + Duration::from_millis(200)),
            Duration::from_millis(300)
        );
        assert!(refresher.is_due(start + Duration::from_millis(500)));
        assert!(refresher.is_due(start + Duration::from_secs(5)));
    }

    #[test]
    fn broken_collectors_are_fatal() {
        let mut store = ProcessStore::new();
        let mut collector = scenario();
        refresh(&mut store, &mut collector);

        collector.fail_prepare = true;
        let err = refresh_store(&mut store, &mut collector, 0, false).unwrap_err();

        assert!(matches!(err, UtopError::Collection(_)));
        assert!(!err.is_recoverable());
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn replays_a_listing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "PID PPID COMMAND\n1 0 /sbin/init\n2 0 [kthreadd]\n7 2 [kworker/0:1]\n50 1 bash"
        )
        .unwrap();

        let mut store = ProcessStore::new();
        let mut collector = ListingCollector::new(file.path());
        refresh_store(&mut store, &mut collector, 0, true).unwrap();

        assert_eq!(store.len(), 4);
        assert_eq!(store.children_of(2), &[7]);
        assert_eq!(store.get(50).unwrap().basename(), "bash");

        // pid 50 moves under the kernel reaper, pid 7 exits.
        std::fs::write(
            file.path(),
            "PID PPID COMMAND\n1 0 /sbin/init\n2 0 [kthreadd]\n50 2 bash\n",
        )
        .unwrap();
        let (snapshot, _) = refresh_store(&mut store, &mut collector, 0, false).unwrap();

        assert!(!store.contains(7));
        assert_eq!(store.children_of(2), &[50]);
        assert_eq!(snapshot.processes.total, 3);
        assert_eq!(snapshot.processes.kernel, 2);
        assert_eq!(snapshot.machine, None);
        assert_consistent(&store);
    }
}
