/*
 * ossim CLI
 *
 * Headless runner: parses a process definition file, runs the simulation to
 * completion and prints the per-process timeline, the memory counters and
 * the aggregate metrics.
 */

use std::env;
use std::process::exit;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::LevelFilter;

use ossim::{
    parse_processes_from_file, Interval, Process, ReplacementKind, SchedulerKind,
    SimulationConfig, Simulator,
};

const USAGE: &str = "\
Usage: ossim <process-file> [options]

Options:
  --scheduler <FCFS|SJF|RR|Priority>   scheduling policy (default FCFS)
  --replacement <FIFO|LRU|Optimal>     page replacement policy (default FIFO)
  --frames <N>                         physical frame pool size (default 8)
  --quantum <N>                        Round-Robin quantum (default 2)
  --delay <MS>                         wall-clock delay per tick (default 0)
  --preserve                           keep terminated frames in snapshots
  --verbose                            print the event stream while running

Process file: one process per line, `# comments` and blank lines ignored:
  PID ARRIVAL BURSTS PRIORITY PAGE_COUNT
  P1  0       CPU(5),E/S(3),CPU(2) 1  4
";

struct CliArgs {
    file: String,
    config: SimulationConfig,
    verbose: bool,
}

fn parse_args(mut args: env::Args) -> Result<CliArgs> {
    args.next(); // program name
    let mut file = None;
    let mut config = SimulationConfig::default();
    let mut verbose = false;

    let mut next_value = |args: &mut env::Args, flag: &str| -> Result<String> {
        args.next()
            .with_context(|| format!("{} requires a value", flag))
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--scheduler" => {
                config.scheduler = SchedulerKind::from_str(&next_value(&mut args, "--scheduler")?)?;
            }
            "--replacement" => {
                config.page_replacement =
                    ReplacementKind::from_str(&next_value(&mut args, "--replacement")?)?;
            }
            "--frames" => {
                config.total_frames = next_value(&mut args, "--frames")?
                    .parse()
                    .context("--frames expects an integer")?;
            }
            "--quantum" => {
                config.quantum = next_value(&mut args, "--quantum")?
                    .parse()
                    .context("--quantum expects an integer")?;
            }
            "--delay" => {
                config.tick_delay_ms = next_value(&mut args, "--delay")?
                    .parse()
                    .context("--delay expects milliseconds")?;
            }
            "--preserve" => config.preserve_frames_on_termination = true,
            "--verbose" => verbose = true,
            "--help" | "-h" => {
                print!("{}", USAGE);
                exit(0);
            }
            other if file.is_none() && !other.starts_with('-') => {
                file = Some(other.to_string());
            }
            other => bail!("unrecognized argument {:?}", other),
        }
    }

    let Some(file) = file else {
        bail!("missing process file argument");
    };
    Ok(CliArgs {
        file,
        config,
        verbose,
    })
}

fn format_intervals(intervals: &[Interval]) -> String {
    if intervals.is_empty() {
        return "-".to_string();
    }
    intervals
        .iter()
        .map(|iv| format!("[{},{})", iv.start, iv.end))
        .collect::<Vec<_>>()
        .join(" ")
}

fn print_report(sim: &Simulator, processes: &[Arc<Process>]) {
    println!();
    println!("== Timeline ==");
    for p in processes {
        println!(
            "{:<8} state={:<18} start={:<4} end={:<4} wait={:<4} turnaround={:<4}",
            p.pid(),
            p.state().to_string(),
            p.start_time().map(|t| t.to_string()).unwrap_or_else(|| "-".into()),
            p.end_time().map(|t| t.to_string()).unwrap_or_else(|| "-".into()),
            p.waiting_time(),
            p.turnaround_time(),
        );
        println!("         cpu: {}", format_intervals(&p.cpu_intervals()));
        println!("         io:  {}", format_intervals(&p.io_intervals()));
    }

    let memory = sim.memory();
    println!();
    println!("== Memory ==");
    println!(
        "policy={} frames={} faults={} replacements={} references={}",
        memory.policy_name(),
        memory.total_frames(),
        memory.page_faults(),
        memory.replacements(),
        memory.max_access_sequence(),
    );
    for (frame, owner) in memory.frame_status_snapshot() {
        let page = memory
            .frame_to_page_snapshot()
            .get(&frame)
            .map(|p| p.to_string())
            .unwrap_or_else(|| "?".into());
        println!("frame {:<3} -> {} page {}", frame, owner.pid(), page);
    }

    let metrics = sim.metrics();
    println!();
    println!("== Metrics ==");
    println!(
        "cpu={} idle={} utilization={:.1}% context_switches={}",
        metrics.total_cpu_time(),
        metrics.total_idle_time(),
        metrics.cpu_utilization(),
        metrics.context_switches(),
    );
    println!(
        "avg_waiting={:.2} avg_turnaround={:.2} completed={}",
        metrics.average_waiting_time(),
        metrics.average_turnaround_time(),
        metrics.completed_processes().len(),
    );
}

fn run() -> Result<()> {
    let args = parse_args(env::args())?;
    ossim::utils::logger::init(if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });

    let processes = parse_processes_from_file(&args.file)?;
    if processes.is_empty() {
        bail!("no processes defined in {}", args.file);
    }
    log::info!("loaded {} process(es) from {}", processes.len(), args.file);

    let sim = Simulator::new(processes.clone(), args.config)?;
    sim.run();
    print_report(&sim, &processes);
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {:#}", err);
        eprintln!();
        eprint!("{}", USAGE);
        exit(1);
    }
}
