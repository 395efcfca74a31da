//! Chain Builder
//!
//! Owns the ordered relay sequence between two endpoint bodies. The chain is
//! populated once with evenly spaced relays, then grown one gap at a time:
//! each [`ChainBuilder::tick`] checks a single adjacent pair and cycles
//! through all gaps over successive calls. Relays are only ever inserted;
//! the sequence is emptied by [`ChainBuilder::reset`], which ends the run.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::config::LinkConfig;
use crate::link_budget::LinkBudgetModel;
use crate::node::{Body, Frame, NodePrototype, OrbitElements, OrbitNode};
use crate::stats::{self, Statistics};
use crate::{ChainError, Result};

/// Result of a single tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// A relay was inserted at `index`.
    Inserted { index: usize, id: Uuid },
    /// The examined gap was short enough.
    WithinRange { distance_km: f64 },
    /// Fewer than two relays; nothing to examine.
    Idle,
}

#[derive(Debug, Clone, Copy)]
struct RunState {
    gain_db: f64,
    sensitivity_db: f64,
    range_km: f64,
}

/// Immutable copy of the chain for readers outside the tick loop.
#[derive(Debug, Clone)]
pub struct ChainSnapshot {
    /// Bumped on every mutation of the chain
    pub version: u64,
    pub nodes: Arc<[OrbitNode]>,
    pub range_km: f64,
    pub link: LinkConfig,
}

impl ChainSnapshot {
    pub fn statistics(&self, model: &LinkBudgetModel, frame: &Frame) -> Result<Statistics> {
        let (gain_db, sensitivity_db) = self.link.resolved()?;
        Statistics::from_nodes(model, frame, &self.nodes, gain_db, sensitivity_db)
    }
}

pub struct ChainBuilder<P: NodePrototype> {
    model: LinkBudgetModel,
    prototype: P,
    frame: Frame,
    nodes: Vec<OrbitNode>,
    cursor: usize,
    run: Option<RunState>,
    version: u64,
}

impl<P: NodePrototype> ChainBuilder<P> {
    pub fn new(model: LinkBudgetModel, prototype: P, frame: Frame) -> Self {
        Self {
            model,
            prototype,
            frame,
            nodes: Vec::new(),
            cursor: 0,
            run: None,
            version: 0,
        }
    }

    /// Spawns the initial relays between `origin` and `destination`.
    ///
    /// Returns the number of relays created.
    pub fn populate(
        &mut self,
        origin: &dyn Body,
        destination: &dyn Body,
        config: &LinkConfig,
    ) -> Result<usize> {
        if self.run.is_some() {
            return Err(ChainError::AlreadyPopulated);
        }
        let (gain_db, sensitivity_db) = config.resolved()?;
        let range_km = self.model.max_range(gain_db, sensitivity_db)?;

        let total_km = self
            .model
            .to_real_world((destination.position() - origin.position()).norm());
        let count = self.model.required_node_count(total_km, range_km)?;

        let from = origin.radius();
        let to = destination.radius();
        let spacing = (to - from) / (count + 1) as f64;
        let step = if count == 0 {
            0.0
        } else {
            (from - to).abs() / count as f64
        };
        let angle_deg = self.model.constants().initial_angle_deg;
        let mut speed = self.model.constants().baseline_angular_speed;

        self.nodes.reserve(count);
        for i in 1..=count {
            speed -= step;
            let elements = OrbitElements::new(from + spacing * i as f64, angle_deg, speed);
            self.nodes.push(self.prototype.spawn(elements, &self.frame));
        }

        self.run = Some(RunState {
            gain_db,
            sensitivity_db,
            range_km,
        });
        self.cursor = 0;
        self.version += 1;

        info!(range_km, total_km, count, "Populated relay chain");
        Ok(count)
    }

    /// Examines one gap and inserts a relay into it if it is too long.
    pub fn tick(&mut self) -> Result<TickOutcome> {
        let range_km = self.run_state()?.range_km;
        if self.nodes.len() < 2 {
            return Ok(TickOutcome::Idle);
        }

        let a = &self.nodes[self.cursor];
        let b = &self.nodes[self.cursor + 1];
        let distance_km = self.model.to_real_world(a.distance_to(b));

        let outcome = if distance_km > range_km {
            let elements = a.elements.midpoint(&b.elements);
            let node = self.prototype.spawn(elements, &self.frame);
            let id = node.id;
            let index = self.cursor + 1;
            self.nodes.insert(index, node);
            self.version += 1;

            debug!(index, distance_km, range_km, len = self.nodes.len(), "Inserted relay");
            TickOutcome::Inserted { index, id }
        } else {
            TickOutcome::WithinRange { distance_km }
        };

        self.cursor += 1;
        if self.cursor > self.nodes.len() - 2 {
            self.cursor = 0;
        }
        Ok(outcome)
    }

    /// Ends the run, handing back the relays so the host can despawn them.
    pub fn reset(&mut self) -> Vec<OrbitNode> {
        self.run = None;
        self.cursor = 0;
        self.version += 1;
        let removed = std::mem::take(&mut self.nodes);
        info!(removed = removed.len(), "Reset relay chain");
        removed
    }

    pub fn average_link_margin(&self) -> Result<(f64, f64)> {
        let run = self.run_state()?;
        stats::average_link_margin(&self.model, &self.nodes, run.gain_db, run.sensitivity_db)
    }

    pub fn average_power(&self) -> Result<(f64, f64)> {
        self.run_state()?;
        stats::average_power(&self.model, &self.frame, &self.nodes)
    }

    pub fn total_cost(&self) -> Result<(f64, usize)> {
        self.run_state()?;
        Ok(stats::total_cost(&self.model, self.nodes.len()))
    }

    pub fn statistics(&self) -> Result<Statistics> {
        let run = self.run_state()?;
        Statistics::from_nodes(
            &self.model,
            &self.frame,
            &self.nodes,
            run.gain_db,
            run.sensitivity_db,
        )
    }

    pub fn snapshot(&self) -> Result<ChainSnapshot> {
        let run = self.run_state()?;
        Ok(ChainSnapshot {
            version: self.version,
            nodes: Arc::from(self.nodes.as_slice()),
            range_km: run.range_km,
            link: LinkConfig::new(run.gain_db, run.sensitivity_db),
        })
    }

    pub fn nodes(&self) -> &[OrbitNode] {
        &self.nodes
    }

    /// Mutable view for the host's position sync. Relays can be moved but
    /// not added, removed or reordered.
    pub fn nodes_mut(&mut self) -> &mut [OrbitNode] {
        self.version += 1;
        &mut self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_populated(&self) -> bool {
        self.run.is_some()
    }

    pub fn range_km(&self) -> Result<f64> {
        Ok(self.run_state()?.range_km)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn model(&self) -> &LinkBudgetModel {
        &self.model
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    fn run_state(&self) -> Result<RunState> {
        self.run.ok_or(ChainError::NotPopulated)
    }
}
