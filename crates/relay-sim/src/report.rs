//! Statistics reporting
//!
//! The reporter runs as its own task and only ever sees published
//! [`ChainSnapshot`]s, never the live chain.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use relay_chain::{ChainSnapshot, Frame, LinkBudgetModel, OrbitNode, Statistics};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};

/// Why a snapshot was published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Start,
    Periodic,
    Pause,
    Finish,
}

#[derive(Debug, Clone)]
pub struct Published {
    pub trigger: Trigger,
    pub sim_time: f64,
    pub snapshot: ChainSnapshot,
}

/// Logs statistics for every published snapshot until the sender is
/// dropped. Returns the statistics of the last snapshot it saw.
pub async fn run_reporter(
    mut rx: watch::Receiver<Published>,
    model: LinkBudgetModel,
    frame: Frame,
) -> Option<Statistics> {
    let mut last = None;
    loop {
        let published = rx.borrow_and_update().clone();
        match published.snapshot.statistics(&model, &frame) {
            Ok(stats) => {
                log_statistics(published.trigger, published.sim_time, &stats);
                last = Some(stats);
            }
            Err(e) => warn!("Statistics unavailable at t={:.2}s: {}", published.sim_time, e),
        }

        if rx.changed().await.is_err() {
            break;
        }
    }
    last
}

pub fn log_statistics(trigger: Trigger, sim_time: f64, stats: &Statistics) {
    info!(
        "[{:?} t={:.2}s] margin avg {:.3} dB / low {:.3} dB | relays {}",
        trigger,
        sim_time,
        stats.average_link_margin_db,
        stats.lowest_link_margin_db,
        stats.node_count,
    );
    info!(
        "[{:?} t={:.2}s] power avg {:.3e} / low {:.3e} | cost {:.3}",
        trigger,
        sim_time,
        stats.average_power,
        stats.lowest_power,
        stats.total_cost,
    );
}

/// Final run summary written with `--output`.
#[derive(Debug, Serialize)]
pub struct SimulationReport<'a> {
    pub destination: String,
    pub gain: &'a str,
    pub sensitivity: &'a str,
    pub range_km: f64,
    pub sim_time: f64,
    pub ticks: u64,
    pub insertions: u64,
    pub statistics: Option<Statistics>,
    pub nodes: &'a [OrbitNode],
    pub generated_at: DateTime<Utc>,
}

pub fn write_report(path: &Path, report: &SimulationReport<'_>) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {:?}", path))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, report)
        .with_context(|| format!("writing report to {:?}", path))?;
    Ok(())
}
