use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use laserkit::{
    init_logging, is_candidate_port, list_all_ports, session_config, simulator_config, Config,
    DeviceSession, GcodeFileReader, Simulator,
};
use laserkit_core::units::format_feed_rate;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Preview and stream G-code to USB laser engravers
#[derive(Parser, Debug)]
#[command(name = "laserkit", version, about)]
struct Cli {
    /// Config file (.toml or .json); defaults to the platform config directory
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List serial ports, marking likely engravers with `*`
    Ports,
    /// Probe every candidate port for an engraver
    Discover,
    /// Simulate a program and print a summary
    Preview {
        file: PathBuf,
        /// Print every simulated step
        #[arg(long)]
        steps: bool,
    },
    /// Stream a program to an engraver
    Run {
        port: String,
        file: PathBuf,
        /// Give up if the device has not drained after this many seconds
        #[arg(long, default_value_t = 3600)]
        timeout: u64,
    },
    /// Write the default config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    init_logging(level, cli.log_json)?;

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::default_path()?,
    };

    let load_config = || {
        Config::load_or_default(&config_path)
            .with_context(|| format!("Failed to load {}", config_path.display()))
    };

    match cli.command {
        Commands::Ports => ports(),
        Commands::Discover => discover(&load_config()?),
        Commands::Preview { file, steps } => preview(&load_config()?, &file, steps),
        Commands::Run {
            port,
            file,
            timeout,
        } => run(&load_config()?, &port, &file, Duration::from_secs(timeout)),
        Commands::InitConfig { force } => init_config(&config_path, force),
    }
}

fn init_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    Config::default().save_to_file(path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn ports() -> anyhow::Result<()> {
    let ports = list_all_ports()?;
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in ports {
        let marker = if is_candidate_port(&port.port_name) { "*" } else { " " };
        println!("{} {:<24} {}", marker, port.port_name, port.description);
    }
    Ok(())
}

fn discover(config: &Config) -> anyhow::Result<()> {
    let sessions = DeviceSession::discover(&session_config(config))?;
    if sessions.is_empty() {
        println!("No engravers found");
    }
    for session in &sessions {
        println!("{}  {:<24} {}", session.id(), session.port_name(), session.model());
        session.disconnect();
    }
    Ok(())
}

fn preview(config: &Config, file: &Path, print_steps: bool) -> anyhow::Result<()> {
    let reader = GcodeFileReader::new(file)?;
    let program = reader.read_all()?;
    let stats = laserkit::program_statistics(&program);

    let mut simulator = Simulator::new(simulator_config(config));
    simulator.preview(&program);
    let duration = simulator.estimated_duration();

    let mut steps = 0usize;
    while let Some(step) = simulator.tick() {
        steps += 1;
        if print_steps {
            println!(
                "{:>8} {:>10.3} {:>10.3}  {:>6.1}%  {}",
                steps, step.position.x, step.position.y, step.laser.power, step.kind
            );
        }
    }

    let units = config.display.feed_rate_units;
    println!("File:            {}", reader.path().display());
    println!("Lines:           {}", stats.total_lines);
    println!(
        "Commands:        {} ({} rapid, {} linear)",
        stats.commands, stats.rapid_moves, stats.linear_moves
    );
    println!(
        "Skipped:         {} ({} rejected)",
        stats.skipped_lines, stats.rejected_lines
    );
    println!(
        "Feeds:           rapid {} {}, default {} {}",
        format_feed_rate(config.simulation.rapid_feed, units),
        units,
        format_feed_rate(config.simulation.default_feed, units),
        units
    );
    println!("Steps:           {}", steps);
    println!("Estimated time:  {:.1} s", duration);
    println!("Burn segments:   {}", simulator.burn_trace().len());
    println!("Final position:  {}", simulator.position());
    if !stats.has_program_end {
        warn!("{} has no M2 program end", file.display());
    }
    Ok(())
}

fn run(config: &Config, port: &str, file: &Path, timeout: Duration) -> anyhow::Result<()> {
    let program = GcodeFileReader::new(file)?.read_all()?;

    let Some(session) = DeviceSession::connect(port, &session_config(config))? else {
        bail!("No engraver answered on {}", port);
    };
    info!("Connected to {} on {}", session.model(), session.port_name());

    let queued = session.enqueue(&program)?;
    info!("Streaming {} lines", queued);

    let started = Instant::now();
    let mut last_reported = usize::MAX;
    loop {
        if session.wait_idle(Duration::from_millis(500))? {
            break;
        }
        if !session.is_connected() {
            bail!("Lost connection to {}", port);
        }
        if started.elapsed() >= timeout {
            let dropped = session.clear()?;
            bail!("Timed out after {:?}; dropped {} queued lines", timeout, dropped);
        }
        let status = session.status()?;
        if status.received != last_reported {
            last_reported = status.received;
            info!(
                "{}/{} acknowledged, {} in flight",
                status.received, queued, status.in_flight
            );
        }
    }

    info!("Done in {:.1} s", started.elapsed().as_secs_f64());
    session.disconnect();
    Ok(())
}
