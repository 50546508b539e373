use log::info;

use super::{ENQ_PREEMPT, EnqueueFlags, KernelCtx, MIN_PRIORITY, PcbKey, Scheduler, quantum_for};
use crate::core::Ticks;

/// Multilevel feedback queue. Every process starts at the top level; one
/// that burns through its level's quantum drops a level and gets a longer
/// quantum next time. The ready queue stays sorted by `(priority, pid)`.
pub struct MultilevelScheduler {
    demotions: u64,
}

impl MultilevelScheduler {
    pub fn demotions(&self) -> u64 {
        self.demotions
    }
}

impl Scheduler for MultilevelScheduler {
    const NAME: &'static str = "multi";

    fn init(_ctx: &mut KernelCtx) -> Self {
        Self { demotions: 0 }
    }

    fn enqueue(&mut self, ctx: &mut KernelCtx, task: PcbKey, flags: EnqueueFlags) {
        if flags & ENQ_PREEMPT != 0 {
            let now = ctx.now;
            let pcb = ctx.task_mut(task);
            if pcb.priority < MIN_PRIORITY {
                pcb.priority += 1;
                self.demotions += 1;
            }
            pcb.burst_time = 0;
            info!("t={now} demote pid={} to priority {}", pcb.pid, pcb.priority);
        }
        ctx.enqueue_sorted(task);
    }

    fn quantum(&self, ctx: &KernelCtx, task: PcbKey) -> Option<Ticks> {
        Some(quantum_for(ctx.task(task).priority))
    }
}
