//! Relay Deployment Simulator
//!
//! Deploys a relay chain from Earth toward a destination planet, then runs
//! the orbits forward and lets the chain grow wherever a hop opens up.
//!
//! Usage:
//!   relay-sim --gain 20 --sensitivity 150 --destination mars \
//!             --duration 60 --output data/mars_run.json

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use chrono::Utc;
use clap::Parser;
use nalgebra::Vector3;
use orbital_mechanics::presets::Planet;
use orbital_mechanics::propagation::{propagate_relays, CircularPrototype};
use orbital_mechanics::OrbitingBody;
use relay_chain::{
    Body, ChainBuilder, Convention, Frame, LinkBudgetModel, LinkConfig, ModelConstants,
    TickOutcome,
};
use tokio::sync::watch;
use tokio::time;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod report;
mod scheduler;

use report::{Published, SimulationReport, Trigger};
use scheduler::TickGate;

#[derive(Parser, Debug)]
#[command(name = "relay-sim", about = "Simulate relay chain deployment between planets")]
struct Args {
    /// Antenna gain in dB
    #[arg(short, long, default_value = "20")]
    gain: String,

    /// Receiver sensitivity in dB
    #[arg(short, long, default_value = "150")]
    sensitivity: String,

    /// Destination planet (mercury, venus, mars)
    #[arg(short, long, default_value = "mars")]
    destination: String,

    /// Simulated seconds between chain ticks
    #[arg(long, default_value_t = 0.1)]
    period: f64,

    /// Simulated seconds per frame
    #[arg(long, default_value_t = 0.02)]
    dt: f64,

    /// Simulated seconds to run
    #[arg(long, default_value_t = 60.0)]
    duration: f64,

    /// Simulated seconds between statistics reports
    #[arg(long, default_value_t = 5.0)]
    report_every: f64,

    /// Pause the simulation at this simulated time
    #[arg(long)]
    pause_at: Option<f64>,

    /// Frame-clock seconds to stay paused
    #[arg(long, default_value_t = 1.0)]
    pause_for: f64,

    /// Use the legacy margin and rounding convention
    #[arg(long)]
    legacy: bool,

    /// JSON file overriding model constants
    #[arg(short, long)]
    constants: Option<PathBuf>,

    /// Write a JSON report of the final chain
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pace frames against the wall clock
    #[arg(long)]
    realtime: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "relay_sim=debug,relay_chain=debug"
    } else {
        "relay_sim=info,relay_chain=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    ensure!(args.period > 0.0, "--period must be positive");
    ensure!(args.dt > 0.0, "--dt must be positive");
    ensure!(args.duration > 0.0, "--duration must be positive");
    ensure!(args.report_every > 0.0, "--report-every must be positive");

    info!("{}", "=".repeat(60));
    info!("Relay Chain Deployment Simulator");
    info!("{}", "=".repeat(60));

    let mut constants = load_constants(args.constants.as_deref())?;
    if args.legacy {
        constants.convention = Convention::Legacy;
    }
    let model = LinkBudgetModel::new(constants);

    let target: Planet = args.destination.parse()?;
    let sun = Frame::new("Sun", Vector3::zeros());
    let mut origin = Planet::Earth.body(sun.center);
    let mut destination = target.body(sun.center);

    let link = LinkConfig::parse(&args.gain, &args.sensitivity)?;
    let mut chain = ChainBuilder::new(model.clone(), CircularPrototype, sun.clone());
    let count = chain.populate(&origin, &destination, &link)?;
    let range_km = chain.range_km()?;
    info!(
        "Deployed {} relays from {} to {} (hop range {:.0} km, {:?} convention)",
        count,
        origin.name,
        destination.name,
        range_km,
        model.convention()
    );

    let (tx, rx) = watch::channel(Published {
        trigger: Trigger::Start,
        sim_time: 0.0,
        snapshot: chain.snapshot()?,
    });
    let reporter = tokio::spawn(report::run_reporter(rx, model.clone(), sun.clone()));

    let mut gate = TickGate::new(args.period);
    gate.resume();
    info!("Ticking every {:.2}s of simulated time", gate.period());
    let mut pacer = args
        .realtime
        .then(|| time::interval(Duration::from_secs_f64(args.dt)));

    let mut sim_time = 0.0;
    let mut frame_clock = 0.0;
    let mut next_report = args.report_every;
    let mut pause_pending = args.pause_at;
    let mut pause_until: Option<f64> = None;
    let mut ticks = 0u64;
    let mut insertions = 0u64;

    while sim_time < args.duration {
        if let Some(pacer) = pacer.as_mut() {
            pacer.tick().await;
        }
        frame_clock += args.dt;

        if pause_pending.is_some_and(|at| sim_time >= at) {
            pause_pending = None;
            gate.pause();
            pause_until = Some(frame_clock + args.pause_for);
            info!("Paused at t={:.2}s", sim_time);
            publish(&tx, Trigger::Pause, sim_time, &chain)?;
        }
        if pause_until.is_some_and(|until| frame_clock >= until) {
            pause_until = None;
            if !gate.toggle() {
                info!("Resumed at t={:.2}s", sim_time);
            }
        }
        if gate.is_paused() {
            continue;
        }

        sim_time += args.dt;
        origin.advance(args.dt);
        destination.advance(args.dt);
        let center = chain.frame().center;
        propagate_relays(chain.nodes_mut(), center, args.dt);

        if gate.due(sim_time) {
            ticks += 1;
            if let TickOutcome::Inserted { index, id } = chain.tick()? {
                insertions += 1;
                debug!(
                    "t={:.2}s inserted relay {} at {} ({} total)",
                    sim_time,
                    id,
                    index,
                    chain.len()
                );
            }
        }

        if sim_time >= next_report {
            next_report += args.report_every;
            info!(
                "t={:.2}s {}-{} separation {:.0} km",
                sim_time,
                origin.name,
                destination.name,
                endpoint_separation_km(&model, &origin, &destination)
            );
            publish(&tx, Trigger::Periodic, sim_time, &chain)?;
        }
    }

    publish(&tx, Trigger::Finish, sim_time, &chain)?;
    drop(tx);
    let statistics = reporter.await.context("reporter task failed")?;

    if let Some(path) = &args.output {
        info!("Writing report to {:?}", path);
        report::write_report(
            path,
            &SimulationReport {
                destination: destination.name.clone(),
                gain: &args.gain,
                sensitivity: &args.sensitivity,
                range_km,
                sim_time,
                ticks,
                insertions,
                statistics,
                nodes: chain.nodes(),
                generated_at: Utc::now(),
            },
        )?;
    }

    info!("{}", "=".repeat(60));
    info!("SUMMARY");
    info!("{}", "=".repeat(60));
    info!("Simulated {:.2}s, {} ticks", sim_time, ticks);
    info!("Relays: {} deployed, {} inserted, {} total", count, insertions, chain.len());

    Ok(())
}

fn load_constants(path: Option<&Path>) -> Result<ModelConstants> {
    let Some(path) = path else {
        return Ok(ModelConstants::default());
    };
    let file = File::open(path).with_context(|| format!("opening {:?}", path))?;
    let constants = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing model constants from {:?}", path))?;
    info!("Loaded model constants from {:?}", path);
    Ok(constants)
}

fn publish(
    tx: &watch::Sender<Published>,
    trigger: Trigger,
    sim_time: f64,
    chain: &ChainBuilder<CircularPrototype>,
) -> Result<()> {
    tx.send_replace(Published {
        trigger,
        sim_time,
        snapshot: chain.snapshot()?,
    });
    Ok(())
}

fn endpoint_separation_km(
    model: &LinkBudgetModel,
    origin: &OrbitingBody,
    destination: &OrbitingBody,
) -> f64 {
    model.to_real_world((destination.position() - origin.position()).norm())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["relay-sim"]);
        assert_eq!(args.destination, "mars");
        assert_eq!(args.period, 0.1);
        assert!(!args.legacy);
    }

    #[test]
    fn test_load_constants_from_file() {
        let path = std::env::temp_dir()
            .join(format!("relay-sim-constants-{}.json", std::process::id()));
        let mut file = File::create(&path).unwrap();
        write!(file, r#"{{"unit_km": 1000.0, "convention": "legacy"}}"#).unwrap();

        let constants = load_constants(Some(&path)).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(constants.unit_km, 1000.0);
        assert_eq!(constants.convention, Convention::Legacy);
        assert_eq!(constants.frequency_ghz, 8.4);
    }

    #[test]
    fn test_load_constants_missing_file() {
        assert!(load_constants(Some(Path::new("/nonexistent/constants.json"))).is_err());
        assert_eq!(load_constants(None).unwrap(), ModelConstants::default());
    }
}
