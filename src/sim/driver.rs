use std::fmt;

use average::{Estimate, Mean};
use rustc_hash::FxHashMap;

use super::job::{JobInstance, ScheduledProcess};
use crate::{
    core::{Pid, SchedCoreEvent, Ticks, driver::SchedCore},
    error::SimResult,
    scheduler::Scheduler,
};

pub struct Sim<S: Scheduler> {
    pub core: SchedCore<S>,
    pub jobs: Vec<JobInstance>,
    job_cursor: usize,
    // Pid --> jobs[index]; filled as processes arrive
    pids_to_jobs: FxHashMap<Pid, usize>,
    finished: bool,
}

impl<S: Scheduler> Sim<S> {
    /// Jobs are admitted in the order given; a job whose arrival time has
    /// passed still waits behind the ones listed before it.
    pub fn new(jobs: Vec<ScheduledProcess>, total_memory: usize) -> SimResult<Self> {
        Ok(Self {
            core: SchedCore::<S>::new(total_memory)?,
            jobs: jobs.into_iter().map(JobInstance::new).collect(),
            job_cursor: 0,
            pids_to_jobs: FxHashMap::default(),
            finished: false,
        })
    }

    /// One driver iteration. Sets `is_finished` instead of ticking once
    /// nothing is running, queued, or still to arrive.
    pub fn step(&mut self) -> SimResult<Vec<SchedCoreEvent>> {
        if self.finished {
            return Ok(Vec::new());
        }

        let mut events = self.handle_arrivals()?;

        let ctx = &self.core.ctx;
        if ctx.is_idle() && ctx.ready.is_empty() && self.job_cursor == self.jobs.len() {
            self.finished = true;
            return Ok(events);
        }

        let tick_events = self.core.tick()?;
        for event in &tick_events {
            self.record(event);
        }
        events.extend(tick_events);
        Ok(events)
    }

    fn handle_arrivals(&mut self) -> SimResult<Vec<SchedCoreEvent>> {
        let now = self.core.now();
        let mut events = Vec::new();

        while let Some(instance) = self.jobs.get_mut(self.job_cursor) {
            if instance.job.arrival_time > now {
                break;
            }
            let job = instance.job;
            instance.admitted_at = Some(now);

            self.core.admit(job.pid, job.memory_size, job.job_time)?;
            self.pids_to_jobs.insert(job.pid, self.job_cursor);
            events.push(SchedCoreEvent::Admitted { pid: job.pid, at: now });
            self.job_cursor += 1;
        }

        Ok(events)
    }

    fn record(&mut self, event: &SchedCoreEvent) {
        match event {
            SchedCoreEvent::Dispatched { report, .. } => {
                if let Some(instance) = self.job_mut(report.pid) {
                    instance.start_time.get_or_insert(report.time);
                    instance.dispatches += 1;
                }
            }
            SchedCoreEvent::Terminated { pid, at } => {
                if let Some(instance) = self.job_mut(*pid) {
                    instance.completion_time = Some(*at);
                }
            }
            SchedCoreEvent::Admitted { .. } | SchedCoreEvent::Preempted { .. } => {}
        }
    }

    fn job_mut(&mut self, pid: Pid) -> Option<&mut JobInstance> {
        let index = *self.pids_to_jobs.get(&pid)?;
        self.jobs.get_mut(index)
    }

    /// Step until finished, feeding every event to `on_event`. Returns the
    /// final simulated time.
    pub fn run(&mut self, mut on_event: impl FnMut(&SchedCoreEvent)) -> SimResult<Ticks> {
        while !self.finished {
            for event in self.step()? {
                on_event(&event);
            }
        }
        Ok(self.core.now())
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn now(&self) -> Ticks {
        self.core.now()
    }

    pub fn all_jobs_completed(&self) -> bool {
        self.jobs.iter().all(|job| job.completion_time.is_some())
    }

    pub fn jobs_map<'a, F>(&'a self, f: F) -> impl Iterator<Item = f64> + 'a
    where
        F: Fn(&JobInstance) -> Option<Ticks> + 'a,
    {
        self.jobs.iter().filter_map(move |job| f(job)).map(|t| t as f64)
    }

    pub fn summary(&self) -> Summary {
        Summary {
            makespan: self.core.now(),
            completed: self.jobs.iter().filter(|j| j.completion_time.is_some()).count(),
            mean_turnaround: avg(self.jobs_map(JobInstance::turnaround)),
            mean_waiting: avg(self.jobs_map(JobInstance::waiting)),
            mean_response: avg(self.jobs_map(JobInstance::response)),
            mean_admission_delay: avg(self.jobs_map(JobInstance::admission_delay)),
            dispatches: self.jobs.iter().map(|j| u64::from(j.dispatches)).sum(),
            swap_outs: self.core.ctx.memory.swap_outs(),
        }
    }
}

fn avg(iter: impl Iterator<Item = f64>) -> f64 {
    iter.collect::<Mean>().estimate()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub makespan: Ticks,
    pub completed: usize,
    pub mean_turnaround: f64,
    pub mean_waiting: f64,
    pub mean_response: f64,
    pub mean_admission_delay: f64,
    pub dispatches: u64,
    pub swap_outs: u64,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Completed processes: {}", self.completed)?;
        writeln!(f, "Makespan: {} ticks", self.makespan)?;
        writeln!(f, "Average turnaround time: {:.2} ticks", self.mean_turnaround)?;
        writeln!(f, "Average waiting time: {:.2} ticks", self.mean_waiting)?;
        writeln!(f, "Average response time: {:.2} ticks", self.mean_response)?;
        writeln!(f, "Average admission delay: {:.2} ticks", self.mean_admission_delay)?;
        writeln!(f, "Dispatches: {}", self.dispatches)?;
        write!(f, "Swap-outs: {}", self.swap_outs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::SimError, scheduler::FcfsScheduler, sim::workload};

    #[test]
    fn empty_workload_finishes_immediately() {
        let mut sim = Sim::<FcfsScheduler>::new(Vec::new(), 100).unwrap();
        assert_eq!(sim.run(|_| {}).unwrap(), 0);
        assert!(sim.is_finished());
    }

    #[test]
    fn idles_until_first_arrival() {
        let jobs = workload::parse("3 1 10 2\n");
        let mut sim = Sim::<FcfsScheduler>::new(jobs, 100).unwrap();

        let mut reports = Vec::new();
        let end = sim
            .run(|e| {
                if let SchedCoreEvent::Dispatched { report, .. } = e {
                    reports.push(report.to_string());
                }
            })
            .unwrap();

        assert_eq!(reports, vec!["time 3, 1 running, numprocesses=1, numholes=1, memusage=10%"]);
        assert_eq!(end, 5);
        assert_eq!(sim.jobs[0].turnaround(), Some(2));
        assert_eq!(sim.jobs[0].response(), Some(0));
    }

    #[test]
    fn all_arrivals_due_are_admitted_in_one_step() {
        let jobs = workload::parse("0 1 10 1\n0 2 10 1\n0 3 10 1\n");
        let mut sim = Sim::<FcfsScheduler>::new(jobs, 100).unwrap();
        let events = sim.step().unwrap();
        let admitted = events
            .iter()
            .filter(|e| matches!(e, SchedCoreEvent::Admitted { .. }))
            .count();
        assert_eq!(admitted, 3);
    }

    #[test]
    fn summary_averages_completed_jobs() {
        let jobs = workload::parse("0 1 10 2\n0 2 10 4\n");
        let mut sim = Sim::<FcfsScheduler>::new(jobs, 100).unwrap();
        sim.run(|_| {}).unwrap();

        let summary = sim.summary();
        assert!(sim.all_jobs_completed());
        assert_eq!(summary.makespan, 6);
        assert_eq!(summary.completed, 2);
        // Turnarounds 2 and 6, waits 0 and 2, responses 0 and 2.
        assert_eq!(summary.mean_turnaround, 4.0);
        assert_eq!(summary.mean_waiting, 1.0);
        assert_eq!(summary.mean_response, 1.0);
        assert_eq!(summary.mean_admission_delay, 0.0);
        assert_eq!(summary.dispatches, 2);
    }

    #[test]
    fn later_listed_arrival_waits_for_admission() {
        let jobs = workload::parse("5 1 10 1\n2 2 10 1\n");
        let mut sim = Sim::<FcfsScheduler>::new(jobs, 100).unwrap();
        sim.run(|_| {}).unwrap();

        assert_eq!(sim.jobs[0].admission_delay(), Some(0));
        assert_eq!(sim.jobs[1].admission_delay(), Some(3));
        assert_eq!(sim.summary().mean_admission_delay, 1.5);
    }

    #[test]
    fn duplicate_pid_aborts_the_run() {
        let jobs = workload::parse("0 1 10 2\n1 1 10 4\n");
        let mut sim = Sim::<FcfsScheduler>::new(jobs, 100).unwrap();
        let err = sim.run(|_| {}).unwrap_err();
        assert!(matches!(err, SimError::DuplicateProcess { pid: 1 }));
    }
}
