use super::{EnqueueFlags, KernelCtx, PcbKey, Scheduler};

/// First come, first served: arrivals queue at the tail and run to
/// completion.
pub struct FcfsScheduler;

impl Scheduler for FcfsScheduler {
    const NAME: &'static str = "fcfs";

    fn init(_ctx: &mut KernelCtx) -> Self {
        Self
    }

    fn enqueue(&mut self, ctx: &mut KernelCtx, task: PcbKey, _flags: EnqueueFlags) {
        ctx.enqueue_back(task);
    }
}
