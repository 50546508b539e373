use super::state::{KernelCtx, ProcessState};

#[derive(Debug, Default)]
pub struct Observer {
    step: u64,
}

impl Observer {
    pub fn new() -> Self {
        Self { step: 0 }
    }

    pub fn observe(&mut self, ctx: &KernelCtx) {
        self.step += 1;
        if cfg!(debug_assertions) {
            if let Err(violation) = check_invariants(ctx) {
                debug_assert!(false, "step {}: {violation}", self.step);
            }
        }
    }

    pub fn steps(&self) -> u64 {
        self.step
    }
}

/// Audit the whole machine. Returns the first broken invariant.
pub fn check_invariants(ctx: &KernelCtx) -> Result<(), String> {
    check_placement(ctx)?;
    check_memory(ctx)?;
    check_free_list(ctx)?;
    Ok(())
}

/// Every PCB sits in exactly one of: the CPU slot, the ready queue, the
/// terminated list.
fn check_placement(ctx: &KernelCtx) -> Result<(), String> {
    for (key, pcb) in &ctx.pcbs {
        let running = ctx.running == Some(key);
        let ready = ctx.ready.contains(key);
        let terminated = ctx.terminated.contains(key);
        let homes = [running, ready, terminated].iter().filter(|&&b| b).count();
        if homes != 1 {
            return Err(format!("pid {} is in {homes} places", pcb.pid));
        }

        let expected = if running {
            ProcessState::Running
        } else if ready {
            ProcessState::Ready
        } else {
            ProcessState::Terminated
        };
        if pcb.state != expected {
            return Err(format!(
                "pid {} is {:?} but placed as {expected:?}",
                pcb.pid, pcb.state
            ));
        }

        if pcb.cpu_time > pcb.job_time {
            return Err(format!("pid {} ran past its job time", pcb.pid));
        }
        if (pcb.state == ProcessState::Terminated) != pcb.is_finished() {
            return Err(format!(
                "pid {} is {:?} with {}/{} ticks served",
                pcb.pid, pcb.state, pcb.cpu_time, pcb.job_time
            ));
        }

        let on_disk = ctx
            .memory
            .get(pcb.pid)
            .map(|m| m.is_on_disk())
            .ok_or_else(|| format!("pid {} has no memory record", pcb.pid))?;
        if running && on_disk {
            return Err(format!("running pid {} is not resident", pcb.pid));
        }
        if terminated && !on_disk {
            return Err(format!("terminated pid {} still holds memory", pcb.pid));
        }
    }
    Ok(())
}

/// Free holes and resident images tile `[0, total)` exactly.
fn check_memory(ctx: &KernelCtx) -> Result<(), String> {
    let free = ctx.free.total_free();
    let used = ctx.memory.resident_total_size();
    if free + used != ctx.total_memory {
        return Err(format!(
            "free {free} + resident {used} != total {}",
            ctx.total_memory
        ));
    }
    if ctx.memory.resident().count() != ctx.memory.resident_count() {
        return Err("resident heap out of sync with records".to_string());
    }

    let mut ranges: Vec<(usize, usize)> = ctx
        .free
        .iter()
        .map(|s| (s.bottom(), s.top))
        .chain(ctx.memory.iter().filter_map(|m| m.range()))
        .collect();
    ranges.sort_unstable();

    let mut cursor = 0;
    for (bottom, top) in ranges {
        if bottom != cursor {
            return Err(format!(
                "range ({bottom}, {top}] leaves a gap or overlap at {cursor}"
            ));
        }
        cursor = top;
    }
    if cursor != ctx.total_memory {
        return Err(format!("ranges end at {cursor}, not {}", ctx.total_memory));
    }
    Ok(())
}

fn check_free_list(ctx: &KernelCtx) -> Result<(), String> {
    for segment in ctx.free.iter() {
        if segment.size == 0 {
            return Err(format!("empty free segment at {}", segment.top));
        }
    }
    for pair in ctx.free.as_slice().windows(2) {
        if pair[0].top <= pair[1].top {
            return Err(format!("free list out of order at {:?}", pair));
        }
        if pair[0].bottom() == pair[1].top {
            return Err(format!("free list not consolidated at {:?}", pair));
        }
    }
    Ok(())
}
