use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use u_capacity::analytics::FleetKpi;
use u_capacity::config::Config;
use u_capacity::ingest::{filter_by_labels, load_runs_file, read_label_file};
use u_capacity::models::{Run, RunTotals};
use u_capacity::packing::{compact, BinPacker};
use u_capacity::simulation::MonteCarlo;
use u_capacity::validation::validate_runs;

#[derive(Parser)]
#[command(
    name = "u-capacity",
    about = "Estimate how many servers a batch workload needs",
    version,
    propagate_version = true
)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack runs once in file order and report the fleet
    Pack {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        packing: PackingArgs,
        /// Consolidate servers after packing
        #[arg(long)]
        compact: bool,
        /// Print the packed servers as JSON
        #[arg(long)]
        json: bool,
    },
    /// Repack runs under random orderings and report running maxima
    Simulate {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        packing: PackingArgs,
        /// Number of trials
        #[arg(long)]
        trials: Option<usize>,
        /// Base RNG seed
        #[arg(long)]
        seed: Option<u64>,
        /// Consolidate servers in every trial
        #[arg(long)]
        compact: bool,
        /// Worker threads (0 = available parallelism)
        #[arg(long)]
        workers: Option<usize>,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Run table (CSV with cpus, mem, duration, pipeline_name)
    #[arg(short, long)]
    input: PathBuf,
    /// File with comma-separated pipeline names to keep
    #[arg(short, long)]
    labels: Option<PathBuf>,
}

#[derive(Args)]
struct PackingArgs {
    /// Standard server CPU capacity
    #[arg(long)]
    server_cpus: Option<f64>,
    /// Standard server memory capacity
    #[arg(long)]
    server_memory: Option<f64>,
    /// Reuse window in seconds
    #[arg(long)]
    reuse_window: Option<f64>,
    /// Let servers accept runs at any time
    #[arg(long, conflicts_with = "reuse_window")]
    no_reuse_window: bool,
}

impl PackingArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(cpus) = self.server_cpus {
            config.packing.server_cpus = cpus;
        }
        if let Some(memory) = self.server_memory {
            config.packing.server_memory = memory;
        }
        if let Some(window) = self.reuse_window {
            config.packing.reuse_window = Some(window);
            config.packing.reuse_window_enabled = true;
        }
        if self.no_reuse_window {
            config.packing.reuse_window_enabled = false;
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("u_capacity={level}").parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Pack {
            input,
            packing,
            compact: do_compact,
            json,
        } => {
            packing.apply(&mut config);
            config.validate()?;
            let runs = load_input(&input)?;
            pack(&config, &runs, do_compact, json)
        }
        Commands::Simulate {
            input,
            packing,
            trials,
            seed,
            compact: do_compact,
            workers,
        } => {
            packing.apply(&mut config);
            if let Some(trials) = trials {
                config.simulation.trials = trials;
            }
            if seed.is_some() {
                config.simulation.seed = seed;
            }
            if let Some(workers) = workers {
                config.simulation.workers = workers;
            }
            config.simulation.compact |= do_compact;
            config.validate()?;
            let runs = load_input(&input)?;
            simulate(&config, &runs)
        }
    }
}

/// Loads, filters and validates the run table, then prints its totals.
fn load_input(input: &InputArgs) -> anyhow::Result<Vec<Run>> {
    let loaded = load_runs_file(&input.input)
        .with_context(|| format!("reading runs from {}", input.input.display()))?;
    let total = loaded.runs.len() + loaded.dropped;

    let runs = match &input.labels {
        Some(path) => {
            let labels = read_label_file(path)
                .with_context(|| format!("reading labels from {}", path.display()))?;
            println!("Label list loaded with {} names", labels.len());
            let kept = filter_by_labels(loaded.runs, &labels);
            println!("Filtered runs: {} of {} rows", kept.len(), total);
            kept
        }
        None => loaded.runs,
    };

    if let Err(errors) = validate_runs(&runs) {
        for e in &errors {
            tracing::error!(kind = ?e.kind, "{}", e.message);
        }
        bail!("{} invalid runs in {}", errors.len(), input.input.display());
    }

    let totals = RunTotals::from_runs(&runs);
    println!("Total duration across {} runs: {}", totals.count, totals.total_duration);
    println!("Total memory across {} runs: {}", totals.count, totals.total_memory);
    println!("Total CPUs across {} runs: {}", totals.count, totals.total_cpus);
    Ok(runs)
}

fn pack(config: &Config, runs: &[Run], do_compact: bool, json: bool) -> anyhow::Result<()> {
    let packer = BinPacker::from_config(&config.packing);
    let mut set = packer.pack(runs)?;
    if do_compact {
        let before = set.len();
        set = compact(&set);
        info!(before, after = set.len(), "compacted servers");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&set)?);
        return Ok(());
    }

    for server in &set.servers {
        println!("{server}");
    }
    let kpi = FleetKpi::calculate(&set, &config.simulation.skip_concurrency_tags);
    println!();
    println!("EC2 servers: {}", kpi.ec2_servers);
    println!("Fargate servers: {}", kpi.fargate_servers);
    println!("Max concurrent jobs: {} (at t={})", kpi.max_concurrent_jobs, kpi.peak_time);
    println!("Total server span: {:.0}s, busy: {:.0}s", kpi.total_span, kpi.total_busy);
    println!("Average utilization: {:.1}%", kpi.avg_utilization * 100.0);
    Ok(())
}

fn simulate(config: &Config, runs: &[Run]) -> anyhow::Result<()> {
    let driver = MonteCarlo::new(
        BinPacker::from_config(&config.packing),
        config.simulation.clone(),
    );
    let summary = driver.run(runs)?;

    for (trial, max) in summary.running_maxima() {
        println!(
            "{trial}: ec2: {}, fargate: {}, concurrent: {}",
            max.ec2_servers, max.fargate_servers, max.max_concurrent_jobs
        );
    }
    println!();
    println!("Overall max EC2 servers across runs: {}", summary.overall.ec2_servers);
    println!("Overall max Fargate servers across runs: {}", summary.overall.fargate_servers);
    println!(
        "Overall max concurrent jobs (EC2 only) across runs: {}",
        summary.overall.max_concurrent_jobs
    );
    info!(seed = summary.seed, "rerun with --seed to reproduce");
    Ok(())
}
