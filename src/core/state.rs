use log::{debug, trace};
use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};

use super::{
    memory::FreeSegmentList,
    queue::{PcbQueue, QueueRank},
    table::MemoryTable,
};
use crate::error::{SimError, SimResult};

pub type Pid = u64;
pub type Ticks = u64;
pub type Priority = u32;

new_key_type! {
    pub struct PcbKey;
}

/// Priority every process starts at.
pub const BASE_PRIORITY: Priority = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Ready,
    Running,
    Terminated,
}

#[derive(Debug, Clone)]
pub struct Pcb {
    pub pid: Pid,
    pub state: ProcessState,
    pub priority: Priority,
    pub job_time: Ticks,
    // Ticks since the last dispatch
    pub burst_time: Ticks,
    pub cpu_time: Ticks,
}

impl Pcb {
    pub fn is_finished(&self) -> bool {
        self.cpu_time >= self.job_time
    }

    pub fn rank(&self) -> QueueRank {
        QueueRank {
            priority: self.priority,
            pid: self.pid,
        }
    }

    fn expect_state(&self, expected: ProcessState) -> SimResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SimError::InvalidState {
                pid: self.pid,
                expected,
                found: self.state,
            })
        }
    }
}

/// Memory snapshot reported at every dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryStatus {
    pub resident: usize,
    pub holes: usize,
    pub usage_percent: usize,
}

/// Everything the simulated machine owns: the clock, the CPU slot, process
/// control blocks, their queues, and physical memory.
#[derive(Debug)]
pub struct KernelCtx {
    pub now: Ticks,
    pub total_memory: usize,
    pub running: Option<PcbKey>,
    pub pcbs: SlotMap<PcbKey, Pcb>,
    pub pids: FxHashMap<Pid, PcbKey>,
    pub ready: PcbQueue,
    pub terminated: PcbQueue,
    pub memory: MemoryTable,
    pub free: FreeSegmentList,
}

impl KernelCtx {
    pub fn new(total_memory: usize) -> SimResult<Self> {
        if total_memory == 0 {
            return Err(SimError::InvalidTotalMemory);
        }

        Ok(Self {
            now: 0,
            total_memory,
            running: None,
            pcbs: SlotMap::with_key(),
            pids: FxHashMap::default(),
            ready: PcbQueue::new(),
            terminated: PcbQueue::new(),
            memory: MemoryTable::new(),
            free: FreeSegmentList::new(total_memory),
        })
    }

    /// Build the PCB and on-disk memory image for a new arrival. The PCB is
    /// Ready but not yet queued; the scheduler decides where it goes.
    pub fn create_process(&mut self, pid: Pid, memory_size: usize, job_time: Ticks) -> SimResult<PcbKey> {
        if self.pids.contains_key(&pid) {
            return Err(SimError::DuplicateProcess { pid });
        }
        if memory_size == 0 {
            return Err(SimError::InvalidMemorySize { pid });
        }
        if memory_size > self.total_memory {
            return Err(SimError::ProcessTooLarge {
                pid,
                size: memory_size,
                total: self.total_memory,
            });
        }
        if job_time == 0 {
            return Err(SimError::InvalidJobTime { pid });
        }

        self.memory.register(pid, memory_size)?;
        let key = self.pcbs.insert(Pcb {
            pid,
            state: ProcessState::Ready,
            priority: BASE_PRIORITY,
            job_time,
            burst_time: 0,
            cpu_time: 0,
        });
        self.pids.insert(pid, key);
        trace!("t={} admit pid={pid} size={memory_size} job={job_time}", self.now);
        Ok(key)
    }

    pub fn advance_time(&mut self, delta: Ticks) {
        self.now = self.now.saturating_add(delta);
    }

    pub fn task(&self, key: PcbKey) -> &Pcb {
        &self.pcbs[key]
    }

    pub fn task_mut(&mut self, key: PcbKey) -> &mut Pcb {
        &mut self.pcbs[key]
    }

    pub fn key_of(&self, pid: Pid) -> Option<PcbKey> {
        self.pids.get(&pid).copied()
    }

    fn ready_pcb(&self, key: PcbKey) -> &Pcb {
        let pcb = self.task(key);
        debug_assert_eq!(
            pcb.state,
            ProcessState::Ready,
            "Queued pid {} must be Ready",
            pcb.pid
        );
        debug_assert!(
            self.running != Some(key) && !self.ready.contains(key),
            "pid {} is already scheduled",
            pcb.pid
        );
        pcb
    }

    /// Queue in `(priority, pid)` order.
    pub fn enqueue_sorted(&mut self, key: PcbKey) {
        let rank = self.ready_pcb(key).rank();
        self.ready.insert(key, rank);
    }

    /// Queue at the tail regardless of rank.
    pub fn enqueue_back(&mut self, key: PcbKey) {
        let rank = self.ready_pcb(key).rank();
        self.ready.append(key, rank);
    }

    pub fn pop_ready(&mut self) -> Option<PcbKey> {
        self.ready.pop_front()
    }

    /// Put `key` on the CPU, swapping its memory in first if needed.
    /// Returns the processes evicted to make room.
    pub fn dispatch(&mut self, key: PcbKey) -> SimResult<Vec<Pid>> {
        debug_assert!(self.running.is_none(), "CPU already running a task");
        let pcb = self.task(key);
        pcb.expect_state(ProcessState::Ready)?;
        let pid = pcb.pid;

        let evicted = if self.memory.is_on_disk(pid)? {
            self.memory
                .swap_in(pid, self.now, &mut self.free, self.total_memory)?
        } else {
            Vec::new()
        };

        let pcb = self.task_mut(key);
        pcb.state = ProcessState::Running;
        pcb.burst_time = 0;
        self.running = Some(key);
        debug!("t={} dispatch pid={pid} evicted={evicted:?}", self.now);
        Ok(evicted)
    }

    /// Give the running process one tick of CPU.
    pub fn run_current(&mut self) -> Option<PcbKey> {
        let key = self.running?;
        let pcb = self.task_mut(key);
        debug_assert_eq!(pcb.state, ProcessState::Running);
        pcb.burst_time += 1;
        pcb.cpu_time += 1;
        Some(key)
    }

    /// Take the running process off the CPU and mark it Ready. Its memory
    /// stays resident; the caller re-queues it.
    pub fn preempt_current(&mut self) -> SimResult<Option<PcbKey>> {
        let Some(key) = self.running else {
            return Ok(None);
        };
        let pcb = self.task_mut(key);
        pcb.expect_state(ProcessState::Running)?;
        pcb.state = ProcessState::Ready;
        self.running = None;
        Ok(Some(key))
    }

    /// Retire the running process: swap its memory out and move it to the
    /// terminated list.
    pub fn finish_current(&mut self) -> SimResult<Option<PcbKey>> {
        let Some(key) = self.running else {
            return Ok(None);
        };
        let pcb = self.task(key);
        pcb.expect_state(ProcessState::Running)?;
        if !pcb.is_finished() {
            return Err(SimError::NotFinished { pid: pcb.pid });
        }
        let (pid, rank) = (pcb.pid, pcb.rank());

        self.memory.swap_out(pid, &mut self.free)?;
        self.task_mut(key).state = ProcessState::Terminated;
        self.terminated.append(key, rank);
        self.running = None;
        Ok(Some(key))
    }

    pub fn current_finished(&self) -> bool {
        self.running.is_some_and(|key| self.task(key).is_finished())
    }

    pub fn memory_status(&self) -> MemoryStatus {
        let used = self.memory.resident_total_size();
        MemoryStatus {
            resident: self.memory.resident_count(),
            holes: self.free.count(),
            usage_percent: (100 * used as u128).div_ceil(self.total_memory as u128) as usize,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.running.is_none()
    }
}
