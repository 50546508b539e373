use crate::core::{Pid, Ticks};

/// One line of a workload file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledProcess {
    pub arrival_time: Ticks,
    pub pid: Pid,
    pub memory_size: usize,
    pub job_time: Ticks,
}

/// A scheduled process plus what happened to it during the run.
#[derive(Debug, Clone)]
pub struct JobInstance {
    pub job: ScheduledProcess,
    pub admitted_at: Option<Ticks>,
    pub start_time: Option<Ticks>,
    pub completion_time: Option<Ticks>,
    pub dispatches: u32,
}

impl JobInstance {
    pub fn new(job: ScheduledProcess) -> Self {
        Self {
            job,
            admitted_at: None,
            start_time: None,
            completion_time: None,
            dispatches: 0,
        }
    }

    pub fn turnaround(&self) -> Option<Ticks> {
        self.completion_time.map(|done| done - self.job.arrival_time)
    }

    /// Time spent admitted but off the CPU.
    pub fn waiting(&self) -> Option<Ticks> {
        self.turnaround().map(|t| t - self.job.job_time)
    }

    /// Time from arrival until admission. Non-zero when a job listed earlier
    /// in the workload arrives later and holds it back.
    pub fn admission_delay(&self) -> Option<Ticks> {
        self.admitted_at.map(|at| at - self.job.arrival_time)
    }

    /// Time from arrival to first dispatch.
    pub fn response(&self) -> Option<Ticks> {
        self.start_time.map(|start| start - self.job.arrival_time)
    }
}
