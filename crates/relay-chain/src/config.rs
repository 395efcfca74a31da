//! Model configuration
//!
//! [`ModelConstants`] is the immutable value every [`crate::LinkBudgetModel`]
//! is built from. Its `Default` carries the deployment simulator's original
//! constants; a JSON file with any subset of the fields overrides them.

use serde::{Deserialize, Serialize};

use crate::{ChainError, Result};

/// Hop count is doubled when sizing a chain, as a safety margin.
pub const NODE_COUNT_MULTIPLIER: usize = 2;

/// Largest chain `populate` will build in one go.
pub const MAX_RELAYS: usize = 1_000_000;

/// Kilometres per simulation length unit.
pub const UNIT_KM: f64 = 8276.0;

/// X-band carrier (GHz).
pub const FREQUENCY_GHZ: f64 = 8.4;

/// Solar photosphere radius (km) and surface flux (W/m²).
pub const SOURCE_RADIUS_KM: f64 = 695_000.0;
pub const SOURCE_POWER: f64 = 64_000_000.0;

/// Cost model, in millions per relay plus a fixed programme cost.
pub const UNIT_COST: f64 = 0.252;
pub const BASE_COST: f64 = 10.0;

/// Numeric convention for the link statistics.
///
/// `Consistent` derives the margin constant from the same budget as the
/// range, so a hop of exactly `max_range` has zero margin, and reports the
/// true minimum margin. `Legacy` keeps the deployment simulator's margin
/// and sizing quirks: a literal 57.51 dB margin constant, the
/// second-smallest margin as "lowest", and half-to-even rounding when sizing
/// the chain. Power statistics are the same under both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Convention {
    #[default]
    Consistent,
    Legacy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConstants {
    /// Kilometres per simulation length unit
    pub unit_km: f64,
    pub frequency_ghz: f64,
    pub tx_power_db: f64,
    /// Fixed line/pointing loss
    pub system_loss_db: f64,
    /// FSPL constant for km and GHz
    pub fsl_constant_db: f64,
    pub calibration_db: f64,
    pub legacy_margin_constant_db: f64,
    pub source_radius_km: f64,
    pub source_power: f64,
    pub unit_cost: f64,
    pub base_cost: f64,
    /// Angular speed (deg/s) the first relay's speed is stepped down from
    pub baseline_angular_speed: f64,
    pub initial_angle_deg: f64,
    pub convention: Convention,
}

impl Default for ModelConstants {
    fn default() -> Self {
        Self {
            unit_km: UNIT_KM,
            frequency_ghz: FREQUENCY_GHZ,
            tx_power_db: 3.0,
            system_loss_db: 3.5,
            fsl_constant_db: 92.45,
            calibration_db: 50.51,
            legacy_margin_constant_db: 57.51,
            source_radius_km: SOURCE_RADIUS_KM,
            source_power: SOURCE_POWER,
            unit_cost: UNIT_COST,
            base_cost: BASE_COST,
            baseline_angular_speed: 10.0,
            initial_angle_deg: 0.0,
            convention: Convention::Consistent,
        }
    }
}

impl ModelConstants {
    pub fn legacy() -> Self {
        Self::default().with_convention(Convention::Legacy)
    }

    pub fn with_convention(mut self, convention: Convention) -> Self {
        self.convention = convention;
        self
    }
}

/// Per-run link inputs supplied by the host.
///
/// Starts unresolved; [`LinkConfig::parse`] resolves it from the two text
/// fields the user typed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LinkConfig {
    gain_db: Option<f64>,
    sensitivity_db: Option<f64>,
}

impl LinkConfig {
    pub fn new(gain_db: f64, sensitivity_db: f64) -> Self {
        Self {
            gain_db: Some(gain_db),
            sensitivity_db: Some(sensitivity_db),
        }
    }

    pub fn unresolved() -> Self {
        Self::default()
    }

    pub fn parse(gain: &str, sensitivity: &str) -> Result<Self> {
        Ok(Self::new(
            parse_decimal("gain", gain)?,
            parse_decimal("sensitivity", sensitivity)?,
        ))
    }

    pub fn is_resolved(&self) -> bool {
        self.gain_db.is_some() && self.sensitivity_db.is_some()
    }

    /// `(gain_db, sensitivity_db)`
    pub fn resolved(&self) -> Result<(f64, f64)> {
        match (self.gain_db, self.sensitivity_db) {
            (Some(gain), Some(sensitivity)) => Ok((gain, sensitivity)),
            _ => Err(ChainError::UnresolvedConfig),
        }
    }
}

pub(crate) fn parse_decimal(field: &'static str, input: &str) -> Result<f64> {
    input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ChainError::Parse {
            field,
            input: input.to_string(),
        })
}
