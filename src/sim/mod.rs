pub mod driver;
pub mod job;
pub mod workload;

pub use driver::{Sim, Summary};
pub use job::{JobInstance, ScheduledProcess};
