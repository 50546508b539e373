use std::{fs, path::Path};

use log::warn;
use rand::{Rng, SeedableRng, rngs::StdRng};

use super::job::ScheduledProcess;
use crate::{
    core::Ticks,
    error::{SimError, SimResult},
};

const FIELDS: usize = 4;

pub fn from_file<P: AsRef<Path>>(path: P) -> SimResult<Vec<ScheduledProcess>> {
    let path = path.as_ref();
    let content = fs::read(path).map_err(|source| SimError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_bytes(&content))
}

/// Parse `arrival pid memory job` lines, keeping file order. Lines with fewer
/// than four integers are skipped; tokens past the fourth are ignored.
pub fn parse(content: &str) -> Vec<ScheduledProcess> {
    parse_bytes(content.as_bytes())
}

/// Like [`parse`], but a line that is not valid UTF-8 is skipped on its own
/// instead of rejecting the whole input.
pub fn parse_bytes(content: &[u8]) -> Vec<ScheduledProcess> {
    content
        .split(|&b| b == b'\n')
        .enumerate()
        .filter_map(|(n, raw)| {
            let Ok(line) = std::str::from_utf8(raw) else {
                warn!("skipping workload line {}: not valid UTF-8", n + 1);
                return None;
            };
            let parsed = parse_line(line);
            if parsed.is_none() && !line.trim().is_empty() {
                warn!("skipping workload line {}: {line:?}", n + 1);
            }
            parsed
        })
        .collect()
}

fn parse_line(line: &str) -> Option<ScheduledProcess> {
    let tokens: Vec<&str> = line.split_whitespace().take(FIELDS).collect();
    if tokens.len() < FIELDS {
        return None;
    }

    Some(ScheduledProcess {
        arrival_time: tokens[0].parse().ok()?,
        pid: tokens[1].parse().ok()?,
        memory_size: tokens[2].parse().ok()?,
        job_time: tokens[3].parse().ok()?,
    })
}

/// Random workload: at each tick a process arrives with probability
/// `p_arrival`, with a size in `1..=max_memory` and a job time in
/// `1..=max_job`. Process ids count up from 1 in arrival order. Bounds
/// below 1 are raised to 1.
pub fn bernoulli(
    ticks: Ticks,
    p_arrival: f64,
    max_memory: usize,
    max_job: Ticks,
    seed: u64,
) -> Vec<ScheduledProcess> {
    let max_memory = max_memory.max(1);
    let max_job = max_job.max(1);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut jobs = Vec::new();

    for t in 0..ticks {
        if rng.random::<f64>() < p_arrival {
            jobs.push(ScheduledProcess {
                arrival_time: t,
                pid: jobs.len() as u64 + 1,
                memory_size: rng.random_range(1..=max_memory),
                job_time: rng.random_range(1..=max_job),
            });
        }
    }

    jobs
}
