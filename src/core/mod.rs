pub mod driver;
pub mod event;
pub mod memory;
pub mod observer;
pub mod queue;
pub mod state;
pub mod table;

pub use driver::SchedCore;
pub use event::{SchedCoreEvent, StatusReport};
pub use memory::{Addr, FreeSegment, FreeSegmentList};
pub use queue::{PcbQueue, QueueRank};
pub use state::{
    BASE_PRIORITY, KernelCtx, MemoryStatus, Pcb, PcbKey, Pid, Priority, ProcessState, Ticks,
};
pub use table::{MemoryTable, Placement, ProcessMemory};
