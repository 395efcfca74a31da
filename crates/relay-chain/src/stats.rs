//! Chain statistics
//!
//! Folds a node sequence into the summary the host displays. Works on any
//! slice, so it runs equally on the live chain and on a [`ChainSnapshot`].
//!
//! Averages divide by the node count, not by the number of samples: the
//! margin mean therefore runs over `n - 1` hops but is divided by `n`.
//!
//! [`ChainSnapshot`]: crate::ChainSnapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::Convention;
use crate::link_budget::LinkBudgetModel;
use crate::node::{Frame, OrbitNode};
use crate::{ChainError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statistics {
    pub average_link_margin_db: f64,
    pub lowest_link_margin_db: f64,
    pub average_power: f64,
    pub lowest_power: f64,
    pub total_cost: f64,
    pub node_count: usize,
    pub computed_at: DateTime<Utc>,
}

impl Statistics {
    pub fn from_nodes(
        model: &LinkBudgetModel,
        frame: &Frame,
        nodes: &[OrbitNode],
        gain_db: f64,
        sensitivity_db: f64,
    ) -> Result<Self> {
        let (average_link_margin_db, lowest_link_margin_db) =
            average_link_margin(model, nodes, gain_db, sensitivity_db)?;
        let (average_power, lowest_power) = average_power(model, frame, nodes)?;
        let (total_cost, node_count) = total_cost(model, nodes.len());

        Ok(Self {
            average_link_margin_db,
            lowest_link_margin_db,
            average_power,
            lowest_power,
            total_cost,
            node_count,
            computed_at: Utc::now(),
        })
    }
}

/// Margin (dB) of every adjacent hop, in chain order.
pub fn link_margins(
    model: &LinkBudgetModel,
    nodes: &[OrbitNode],
    gain_db: f64,
    sensitivity_db: f64,
) -> Result<Vec<f64>> {
    nodes
        .windows(2)
        .map(|pair| {
            let distance_km = model.to_real_world(pair[0].distance_to(&pair[1]));
            model.link_margin(distance_km, gain_db, sensitivity_db)
        })
        .collect()
}

/// `(average, lowest)` link margin in dB.
///
/// Under [`Convention::Legacy`] "lowest" is the second-smallest margin.
pub fn average_link_margin(
    model: &LinkBudgetModel,
    nodes: &[OrbitNode],
    gain_db: f64,
    sensitivity_db: f64,
) -> Result<(f64, f64)> {
    let mut margins = link_margins(model, nodes, gain_db, sensitivity_db)?;
    if margins.is_empty() {
        return Err(ChainError::NotEnoughNodes {
            needed: 2,
            found: nodes.len(),
        });
    }

    let average = margins.iter().sum::<f64>() / nodes.len() as f64;
    margins.sort_by(f64::total_cmp);

    let index = match model.convention() {
        Convention::Consistent => 0,
        Convention::Legacy => 1.min(margins.len() - 1),
    };
    let lowest = margins[index];
    if margins[0] < 0.0 {
        warn!(worst_margin_db = margins[0], "relay hop does not close");
    }

    Ok((average, lowest))
}

/// `(average, lowest)` flux received by the relays from the central body.
pub fn average_power(
    model: &LinkBudgetModel,
    frame: &Frame,
    nodes: &[OrbitNode],
) -> Result<(f64, f64)> {
    if nodes.is_empty() {
        return Err(ChainError::NotEnoughNodes {
            needed: 1,
            found: 0,
        });
    }

    let mut powers = nodes
        .iter()
        .map(|node| {
            let distance_km = model.to_real_world((node.position - frame.center).norm());
            model.received_power(distance_km)
        })
        .collect::<Result<Vec<f64>>>()?;

    let average = powers.iter().sum::<f64>() / nodes.len() as f64;
    powers.sort_by(f64::total_cmp);

    Ok((average, powers[0]))
}

/// `(cost, node_count)`
pub fn total_cost(model: &LinkBudgetModel, node_count: usize) -> (f64, usize) {
    let c = model.constants();
    (node_count as f64 * c.unit_cost + c.base_cost, node_count)
}
