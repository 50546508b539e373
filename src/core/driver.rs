use log::info;

use super::{
    event::{SchedCoreEvent, StatusReport},
    observer::Observer,
    state::{KernelCtx, PcbKey, Pid, Ticks},
};
use crate::{
    error::SimResult,
    scheduler::{ENQ_PREEMPT, ENQ_WAKEUP, Scheduler},
};

/// One CPU, one memory, one scheduling policy.
pub struct SchedCore<S: Scheduler> {
    pub ctx: KernelCtx,
    pub scheduler: S,
    observer: Observer,
}

impl<S: Scheduler> SchedCore<S> {
    pub fn new(total_memory: usize) -> SimResult<Self> {
        let mut ctx = KernelCtx::new(total_memory)?;
        let scheduler = S::init(&mut ctx);
        let observer = Observer::new();
        Ok(Self {
            ctx,
            scheduler,
            observer,
        })
    }

    /// Create a process and hand it to the scheduler.
    pub fn admit(&mut self, pid: Pid, memory_size: usize, job_time: Ticks) -> SimResult<PcbKey> {
        let key = self.ctx.create_process(pid, memory_size, job_time)?;
        self.scheduler.enqueue(&mut self.ctx, key, ENQ_WAKEUP);
        Ok(key)
    }

    /// Advance the machine by one tick: fill an idle CPU, run whatever is on
    /// it, then retire or preempt it.
    pub fn tick(&mut self) -> SimResult<Vec<SchedCoreEvent>> {
        let mut events = Vec::new();

        if self.ctx.is_idle() {
            self.try_schedule(&mut events)?;
        }

        let current = self.ctx.run_current();
        self.ctx.advance_time(1);

        if let Some(key) = current {
            self.retire_or_preempt(key, &mut events)?;
        }

        self.observer.observe(&self.ctx);
        Ok(events)
    }

    fn try_schedule(&mut self, events: &mut Vec<SchedCoreEvent>) -> SimResult<()> {
        let Some(key) = self.scheduler.dispatch(&mut self.ctx) else {
            return Ok(());
        };

        let evicted = self.ctx.dispatch(key)?;
        let report = StatusReport {
            time: self.ctx.now,
            pid: self.ctx.task(key).pid,
            memory: self.ctx.memory_status(),
        };
        events.push(SchedCoreEvent::Dispatched { report, evicted });
        Ok(())
    }

    fn retire_or_preempt(&mut self, key: PcbKey, events: &mut Vec<SchedCoreEvent>) -> SimResult<()> {
        let now = self.ctx.now;
        let pid = self.ctx.task(key).pid;

        if self.ctx.current_finished() {
            self.ctx.finish_current()?;
            info!("t={now} pid={pid} terminated");
            events.push(SchedCoreEvent::Terminated { pid, at: now });
            return Ok(());
        }

        let slice_expired = self
            .scheduler
            .quantum(&self.ctx, key)
            .is_some_and(|quantum| self.ctx.task(key).burst_time >= quantum);
        if slice_expired {
            self.ctx.preempt_current()?;
            self.scheduler.enqueue(&mut self.ctx, key, ENQ_PREEMPT);
            events.push(SchedCoreEvent::Preempted {
                pid,
                priority: self.ctx.task(key).priority,
                at: now,
            });
        }
        Ok(())
    }

    pub fn now(&self) -> Ticks {
        self.ctx.now
    }

    pub fn observer(&self) -> &Observer {
        &self.observer
    }
}
