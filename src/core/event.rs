use std::fmt;

use crate::core::{MemoryStatus, Pid, Priority, Ticks};

/// The line printed each time a process is put on the CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    pub time: Ticks,
    pub pid: Pid,
    pub memory: MemoryStatus,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "time {}, {} running, numprocesses={}, numholes={}, memusage={}%",
            self.time,
            self.pid,
            self.memory.resident,
            self.memory.holes,
            self.memory.usage_percent
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedCoreEvent {
    Admitted {
        pid: Pid,
        at: Ticks,
    },
    // Evicted images are listed in the order they left memory
    Dispatched {
        report: StatusReport,
        evicted: Vec<Pid>,
    },
    Preempted {
        pid: Pid,
        priority: Priority,
        at: Ticks,
    },
    Terminated {
        pid: Pid,
        at: Ticks,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_line_format() {
        let report = StatusReport {
            time: 4,
            pid: 2,
            memory: MemoryStatus {
                resident: 3,
                holes: 2,
                usage_percent: 61,
            },
        };
        assert_eq!(
            report.to_string(),
            "time 4, 2 running, numprocesses=3, numholes=2, memusage=61%"
        );
    }
}
