use std::{fmt, io, path::PathBuf};

use crate::core::{Pid, ProcessState};

#[derive(Debug)]
pub enum SimError {
    /// Total memory must be at least one unit.
    InvalidTotalMemory,
    InvalidMemorySize {
        pid: Pid,
    },
    InvalidJobTime {
        pid: Pid,
    },
    /// The process could never be resident, even with every other process
    /// swapped out.
    ProcessTooLarge {
        pid: Pid,
        size: usize,
        total: usize,
    },
    DuplicateProcess {
        pid: Pid,
    },
    UnknownProcess {
        pid: Pid,
    },
    /// Swap-in ran out of resident processes to evict before a segment large
    /// enough appeared.
    NothingToEvict {
        pid: Pid,
        size: usize,
    },
    InvalidState {
        pid: Pid,
        expected: ProcessState,
        found: ProcessState,
    },
    NotFinished {
        pid: Pid,
    },
    Io {
        path: PathBuf,
        source: io::Error,
    },
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTotalMemory => write!(f, "total memory size must be positive"),
            Self::InvalidMemorySize { pid } => {
                write!(f, "process {pid} requests a non-positive memory size")
            }
            Self::InvalidJobTime { pid } => {
                write!(f, "process {pid} has a non-positive job time")
            }
            Self::ProcessTooLarge { pid, size, total } => write!(
                f,
                "process {pid} needs {size} units of memory but only {total} exist"
            ),
            Self::DuplicateProcess { pid } => write!(f, "process {pid} was admitted twice"),
            Self::UnknownProcess { pid } => write!(f, "no process with id {pid}"),
            Self::NothingToEvict { pid, size } => write!(
                f,
                "cannot place process {pid} ({size} units): no resident process left to evict"
            ),
            Self::InvalidState {
                pid,
                expected,
                found,
            } => write!(
                f,
                "process {pid} must be {expected:?} for this transition, found {found:?}"
            ),
            Self::NotFinished { pid } => {
                write!(f, "process {pid} cannot terminate before its job time elapses")
            }
            Self::Io { path, source } => {
                write!(f, "failed to read workload {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for SimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type SimResult<T> = Result<T, SimError>;
