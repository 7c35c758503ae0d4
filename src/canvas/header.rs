//! The summary lines at the top of the screen.

use concat_string::concat_string;
use itertools::Itertools;

use crate::{
    app::summary::{ProcessSummary, SystemSnapshot},
    collection::{MachineStats, processes::ProcessState},
    utils::data_units::binary_bytes_string,
};

/// Formats an uptime like `uptime` does: `3 days, 4:05`, `4:05`, or `12 min`.
pub fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3600;
    let minutes = (seconds % 3600) / 60;

    let clock = if hours > 0 {
        format!("{hours}:{minutes:02}")
    } else {
        format!("{minutes} min")
    };

    match days {
        0 => clock,
        1 => concat_string!("1 day, ", clock),
        _ => format!("{days} days, {clock}"),
    }
}

/// The process counts, then every non-empty state.
pub fn process_line(summary: &ProcessSummary) -> String {
    let states = ProcessState::ALL
        .iter()
        .filter(|state| summary.count(**state) > 0)
        .map(|state| format!("{} {}", summary.count(*state), state.name()))
        .join(", ");

    let totals = format!(
        "Processes: {} total, {} yours, {} kernel, {} zombie",
        summary.total, summary.owned, summary.kernel, summary.zombies
    );

    if states.is_empty() {
        totals
    } else {
        concat_string!(totals, " (", states, ")")
    }
}

/// The first line: clock, uptime and load.
pub fn clock_line(clock: &str, machine: Option<&MachineStats>, now_secs: u64) -> String {
    match machine {
        Some(machine) => {
            let [one, five, fifteen] = machine.load_avg;
            format!(
                "utop - {clock} up {}, load average: {one:.2}, {five:.2}, {fifteen:.2}",
                format_uptime(machine.uptime_at(now_secs))
            )
        }
        None => format!("utop - {clock}"),
    }
}

pub fn memory_line(machine: &MachineStats) -> String {
    format!(
        "Mem: {}/{}  Swap: {}/{}  CPU: {:.1}%",
        binary_bytes_string(machine.mem_used),
        binary_bytes_string(machine.mem_total),
        binary_bytes_string(machine.swap_used),
        binary_bytes_string(machine.swap_total),
        machine.cpu_percent
    )
}

/// Every header line for a snapshot.
pub fn header_lines(snapshot: &SystemSnapshot, clock: &str, now_secs: u64) -> Vec<String> {
    let mut lines = vec![
        clock_line(clock, snapshot.machine.as_ref(), now_secs),
        process_line(&snapshot.processes),
    ];
    if let Some(machine) = &snapshot.machine {
        lines.push(memory_line(machine));
    }

    lines
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn uptimes() {
        assert_eq!(format_uptime(59), "0 min");
        assert_eq!(format_uptime(12 * 60), "12 min");
        assert_eq!(format_uptime(4 * 3600 + 5 * 60), "4:05");
        assert_eq!(format_uptime(86_400 + 60), "1 day, 1 min");
        assert_eq!(format_uptime(3 * 86_400 + 4 * 3600 + 5 * 60), "3 days, 4:05");
    }

    #[test]
    fn process_counts() {
        let mut summary = ProcessSummary {
            total: 5,
            owned: 2,
            kernel: 1,
            zombies: 1,
            ..Default::default()
        };
        summary.per_state[ProcessState::Running.index()] = 1;
        summary.per_state[ProcessState::Sleeping.index()] = 3;
        summary.per_state[ProcessState::Zombie.index()] = 1;

        assert_eq!(
            process_line(&summary),
            format!(
                "Processes: 5 total, 2 yours, 1 kernel, 1 zombie (1 {}, 3 {}, 1 {})",
                ProcessState::Running.name(),
                ProcessState::Sleeping.name(),
                ProcessState::Zombie.name()
            )
        );
        assert_eq!(
            process_line(&ProcessSummary::default()),
            "Processes: 0 total, 0 yours, 0 kernel, 0 zombie"
        );
    }

    #[test]
    fn machine_lines() {
        let machine = MachineStats {
            load_avg: [0.5, 0.25, 1.0],
            mem_used: 1024,
            mem_total: 2048,
            boot_time: 1000,
            cpu_percent: 12.34,
            ..Default::default()
        };

        assert_eq!(
            clock_line("12:00:00", Some(&machine), 1000 + 3600),
            "utop - 12:00:00 up 1:00, load average: 0.50, 0.25, 1.00"
        );
        assert_eq!(clock_line("12:00:00", None, 0), "utop - 12:00:00");
        assert_eq!(memory_line(&machine), "Mem: 1.0KiB/2.0KiB  Swap: 0B/0B  CPU: 12.3%");

        let snapshot = SystemSnapshot {
            machine: Some(machine),
            ..Default::default()
        };
        assert_eq!(header_lines(&snapshot, "x", 0).len(), 3);
        assert_eq!(header_lines(&SystemSnapshot::default(), "x", 0).len(), 2);
    }
}
