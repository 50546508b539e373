//! Swapping scheduler simulator
//!
//! Usage: swap_sched -f <file> -a <fcfs|multi> -m <memsize> [-v]
//!
//! Each workload line is `arrival pid memory-size job-time`. One status line
//! is printed per dispatch, followed by the time the simulation finished.

use std::env;
use std::process;

use log::info;
use swap_sched::{
    Scheduler, Sim, SimResult,
    core::SchedCoreEvent,
    scheduler::{FcfsScheduler, MultilevelScheduler},
    sim::workload,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Algorithm {
    Fcfs,
    Multi,
}

/// Command-line configuration
struct Config {
    file: String,
    algorithm: Algorithm,
    memsize: usize,
    verbose: bool,
}

fn main() {
    let config = match parse_args() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    let default_level = if config.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let result = match config.algorithm {
        Algorithm::Fcfs => run::<FcfsScheduler>(&config),
        Algorithm::Multi => run::<MultilevelScheduler>(&config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn print_help(program: &str) {
    eprintln!("Swapping scheduler simulator - single CPU, contiguous memory with swapping");
    eprintln!();
    eprintln!("Usage: {} -f <file> -a <fcfs|multi> -m <memsize> [-v]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -f <file>     Workload file, one 'arrival pid memory job' per line");
    eprintln!("  -a <algo>     Scheduling algorithm: fcfs or multi");
    eprintln!("  -m <memsize>  Total memory size in units");
    eprintln!("  -v            Log scheduling decisions and print a summary");
    eprintln!("  -h            Print this help message");
}

fn parse_args() -> Result<Config, String> {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("swap_sched");

    let mut file = None;
    let mut algorithm = None;
    let mut memsize = None;
    let mut verbose = false;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help(program);
                process::exit(0);
            }
            "-v" | "--verbose" => verbose = true,
            flag @ ("-f" | "-a" | "-m") => {
                let value = iter
                    .next()
                    .ok_or_else(|| format!("Option {} requires a value", flag))?;
                match flag {
                    "-f" => file = Some(value.clone()),
                    "-a" => algorithm = Some(parse_algorithm(value)?),
                    _ => memsize = Some(parse_memsize(value)?),
                }
            }
            _ => {
                print_help(program);
                return Err(format!("\nError: Unknown argument: {}", arg));
            }
        }
    }

    let missing = |flag: &str| {
        print_help(program);
        format!("\nError: Missing required option {}", flag)
    };

    Ok(Config {
        file: file.ok_or_else(|| missing("-f"))?,
        algorithm: algorithm.ok_or_else(|| missing("-a"))?,
        memsize: memsize.ok_or_else(|| missing("-m"))?,
        verbose,
    })
}

fn parse_algorithm(value: &str) -> Result<Algorithm, String> {
    match value {
        "fcfs" => Ok(Algorithm::Fcfs),
        "multi" => Ok(Algorithm::Multi),
        _ => Err(format!("Invalid algorithm argument: {}", value)),
    }
}

fn parse_memsize(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(size) if size > 0 => Ok(size),
        _ => Err(format!("Invalid memory size: {}", value)),
    }
}

fn run<S: Scheduler>(config: &Config) -> SimResult<()> {
    let jobs = workload::from_file(&config.file)?;
    info!(
        "{} workload: {} processes, {} units of memory",
        S::NAME,
        jobs.len(),
        config.memsize
    );

    let mut sim = Sim::<S>::new(jobs, config.memsize)?;
    let end = sim.run(|event| {
        if let SchedCoreEvent::Dispatched { report, .. } = event {
            println!("{}", report);
        }
    })?;
    println!("time {}, simulation finished.", end);

    if config.verbose {
        eprintln!();
        eprintln!("=== Summary ===");
        eprintln!("{}", sim.summary());
    }

    Ok(())
}
