//! Relay Chain Library
//!
//! Deploys a chain of relay satellites between two orbiting bodies and keeps
//! it closed: whenever two neighbouring relays drift further apart than the
//! achievable communication range, a new relay is inserted between them.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Model constants, numeric convention, per-run link inputs |
//! | [`link_budget`] | Range, link margin and received power formulas |
//! | [`node`] | Relay nodes, host-facing `Body` and `NodePrototype` traits |
//! | [`chain`] | `ChainBuilder`: population, one-gap-per-tick growth, snapshots |
//! | [`stats`] | Margin, power and cost summaries over a node sequence |
//!
//! The crate is passive. It never schedules itself and never computes a
//! node's 3D position; the host advances orbits, keeps positions in sync
//! and calls [`ChainBuilder::tick`] on its own timer.

use thiserror::Error;

pub mod chain;
pub mod config;
pub mod link_budget;
pub mod node;
pub mod stats;

pub use chain::{ChainBuilder, ChainSnapshot, TickOutcome};
pub use config::{Convention, LinkConfig, ModelConstants, MAX_RELAYS, NODE_COUNT_MULTIPLIER};
pub use link_budget::{LinkBudgetBreakdown, LinkBudgetModel};
pub use node::{Body, Frame, NodePrototype, OrbitElements, OrbitNode};
pub use stats::Statistics;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChainError {
    #[error("Could not parse {field} from {input:?}")]
    Parse { field: &'static str, input: String },
    #[error("Invalid range: {0} km")]
    InvalidRange(f64),
    #[error("Invalid distance: {0} km")]
    InvalidDistance(f64),
    #[error("Chain has not been populated")]
    NotPopulated,
    #[error("Chain is already populated")]
    AlreadyPopulated,
    #[error("Gain and sensitivity have not been resolved")]
    UnresolvedConfig,
    #[error("Not enough relay nodes: need {needed}, have {found}")]
    NotEnoughNodes { needed: usize, found: usize },
    #[error("Chain would need {needed} relays, limit is {limit}")]
    TooManyNodes { needed: f64, limit: usize },
}

pub type Result<T> = std::result::Result<T, ChainError>;
