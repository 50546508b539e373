pub mod fcfs;
pub mod multi;

use crate::core::{
    Ticks,
    state::{KernelCtx, PcbKey, Priority},
};
pub use fcfs::FcfsScheduler;
pub use multi::MultilevelScheduler;

pub type EnqueueFlags = u64;

pub const ENQ_WAKEUP: EnqueueFlags = 1 << 0;
pub const ENQ_PREEMPT: EnqueueFlags = 1 << 1;

/// Lowest priority level a process can be demoted to.
pub const MIN_PRIORITY: Priority = 3;

/// Quantum per priority level, indexed by `priority - 1`.
pub const QUANTA: [Ticks; MIN_PRIORITY as usize] = [2, 4, 8];

pub trait Scheduler {
    const NAME: &'static str;

    fn init(ctx: &mut KernelCtx) -> Self;

    /// Place a Ready process on the ready queue, either because it just
    /// arrived (`ENQ_WAKEUP`) or because it was taken off the CPU
    /// (`ENQ_PREEMPT`).
    fn enqueue(&mut self, ctx: &mut KernelCtx, task: PcbKey, flags: EnqueueFlags);

    /// Choose the next process for an idle CPU.
    fn dispatch(&mut self, ctx: &mut KernelCtx) -> Option<PcbKey> {
        ctx.pop_ready()
    }

    /// How long `task` may stay on the CPU before it is preempted. `None`
    /// runs it to completion.
    fn quantum(&self, _ctx: &KernelCtx, _task: PcbKey) -> Option<Ticks> {
        None
    }
}

/// Quantum for a priority level; levels past the last share its quantum.
pub fn quantum_for(priority: Priority) -> Ticks {
    let level = (priority.max(1) as usize - 1).min(QUANTA.len() - 1);
    QUANTA[level]
}
