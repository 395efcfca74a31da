//! RF Link Budget Model
//!
//! Closed-form budget for an X-band crosslink between two identical relays.
//! Accounts for:
//! - Free space path loss (km, GHz form)
//! - Antenna gain at both ends of the hop
//! - Fixed transmit power and system loss
//!
//! Distances handed to this module are real-world kilometres; use
//! [`LinkBudgetModel::to_real_world`] to convert simulation units.
//! Every logarithm is base 10.

use crate::config::{
    parse_decimal, Convention, ModelConstants, MAX_RELAYS, NODE_COUNT_MULTIPLIER,
};
use crate::{ChainError, Result};

#[derive(Debug, Clone, Default)]
pub struct LinkBudgetModel {
    constants: ModelConstants,
}

impl LinkBudgetModel {
    pub fn new(constants: ModelConstants) -> Self {
        Self { constants }
    }

    pub fn constants(&self) -> &ModelConstants {
        &self.constants
    }

    pub fn convention(&self) -> Convention {
        self.constants.convention
    }

    pub fn to_real_world(&self, scene_distance: f64) -> f64 {
        scene_distance * self.constants.unit_km
    }

    /// Everything in the budget that does not depend on gain, sensitivity
    /// or distance, as a loss in dB.
    pub fn budget_constant_db(&self) -> f64 {
        let c = &self.constants;
        c.system_loss_db + 20.0 * c.frequency_ghz.log10() + c.fsl_constant_db
            - c.tx_power_db
            - c.calibration_db
    }

    fn margin_constant_db(&self) -> f64 {
        match self.constants.convention {
            Convention::Consistent => self.budget_constant_db(),
            Convention::Legacy => self.constants.legacy_margin_constant_db,
        }
    }

    /// Longest hop (km) that still closes with zero margin.
    pub fn max_range(&self, gain_db: f64, sensitivity_db: f64) -> Result<f64> {
        let exponent = (2.0 * gain_db + sensitivity_db - self.budget_constant_db()) / 20.0;
        let range_km = 10f64.powf(exponent);
        if range_km.is_finite() && range_km > 0.0 {
            Ok(range_km)
        } else {
            Err(ChainError::InvalidRange(range_km))
        }
    }

    /// [`Self::max_range`] from the raw text the user typed.
    pub fn max_range_from_inputs(&self, gain: &str, sensitivity: &str) -> Result<f64> {
        let gain_db = parse_decimal("gain", gain)?;
        let sensitivity_db = parse_decimal("sensitivity", sensitivity)?;
        self.max_range(gain_db, sensitivity_db)
    }

    /// Link margin in dB for a hop of `distance_km`.
    pub fn link_margin(&self, distance_km: f64, gain_db: f64, sensitivity_db: f64) -> Result<f64> {
        let d = check_distance(distance_km)?;
        Ok(sensitivity_db + 2.0 * gain_db - 20.0 * d.log10() - self.margin_constant_db())
    }

    /// Free space path loss in dB
    pub fn free_space_path_loss(&self, distance_km: f64) -> Result<f64> {
        let d = check_distance(distance_km)?;
        let c = &self.constants;
        Ok(20.0 * d.log10() + 20.0 * c.frequency_ghz.log10() + c.fsl_constant_db - c.calibration_db)
    }

    /// Inverse-square flux (W/m²) from the central body at `distance_km`.
    pub fn received_power(&self, distance_km: f64) -> Result<f64> {
        let d = check_distance(distance_km)?;
        let c = &self.constants;
        Ok(c.source_radius_km.powi(2) / d.powi(2) * c.source_power)
    }

    /// Relays needed to span `total_distance_km` with hops of `range_km`.
    /// Anything above [`MAX_RELAYS`] is refused with `TooManyNodes`.
    pub fn required_node_count(&self, total_distance_km: f64, range_km: f64) -> Result<usize> {
        if !(range_km.is_finite() && range_km > 0.0) {
            return Err(ChainError::InvalidRange(range_km));
        }
        let total = check_distance(total_distance_km)?;

        let hops = match self.constants.convention {
            Convention::Consistent => (total / range_km).ceil(),
            Convention::Legacy => (total / range_km).round_ties_even(),
        };
        let needed = hops * NODE_COUNT_MULTIPLIER as f64;
        let too_many = ChainError::TooManyNodes {
            needed,
            limit: MAX_RELAYS,
        };
        if needed > MAX_RELAYS as f64 {
            return Err(too_many);
        }
        (hops as usize)
            .checked_mul(NODE_COUNT_MULTIPLIER)
            .ok_or(too_many)
    }

    /// Detailed breakdown of one hop. Always follows the consistent budget,
    /// whatever the configured convention.
    pub fn detailed_budget(
        &self,
        distance_km: f64,
        gain_db: f64,
        sensitivity_db: f64,
    ) -> Result<LinkBudgetBreakdown> {
        let c = &self.constants;
        let fspl = self.free_space_path_loss(distance_km)?;
        let rx_power = c.tx_power_db + gain_db - fspl - c.system_loss_db + gain_db;
        let margin = rx_power + sensitivity_db;

        Ok(LinkBudgetBreakdown {
            distance_km,
            tx_power_db: c.tx_power_db,
            tx_gain_db: gain_db,
            fspl_db: fspl,
            system_loss_db: c.system_loss_db,
            rx_gain_db: gain_db,
            rx_power_db: rx_power,
            rx_sensitivity_db: sensitivity_db,
            link_margin_db: margin,
            link_viable: margin >= 0.0,
        })
    }
}

fn check_distance(distance_km: f64) -> Result<f64> {
    if distance_km.is_finite() && distance_km > 0.0 {
        Ok(distance_km)
    } else {
        Err(ChainError::InvalidDistance(distance_km))
    }
}

/// Detailed link budget breakdown
#[derive(Debug, Clone)]
pub struct LinkBudgetBreakdown {
    pub distance_km: f64,
    pub tx_power_db: f64,
    pub tx_gain_db: f64,
    pub fspl_db: f64,
    pub system_loss_db: f64,
    pub rx_gain_db: f64,
    pub rx_power_db: f64,
    pub rx_sensitivity_db: f64,
    pub link_margin_db: f64,
    pub link_viable: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn model() -> LinkBudgetModel {
        LinkBudgetModel::default()
    }

    #[test]
    fn test_required_node_count_doubles_hops() {
        assert_eq!(model().required_node_count(1000.0, 100.0).unwrap(), 20);
        assert_eq!(model().required_node_count(1001.0, 100.0).unwrap(), 22);
    }

    #[test]
    fn test_required_node_count_legacy_rounding() {
        let legacy = LinkBudgetModel::new(ModelConstants::legacy());
        assert_eq!(legacy.required_node_count(1000.0, 100.0).unwrap(), 20);
        assert_eq!(legacy.required_node_count(1040.0, 100.0).unwrap(), 20);
        // 10.5 rounds to even
        assert_eq!(legacy.required_node_count(1050.0, 100.0).unwrap(), 20);
        assert_eq!(legacy.required_node_count(1150.0, 100.0).unwrap(), 24);
    }

    #[test]
    fn test_required_node_count_rejects_bad_geometry() {
        assert_eq!(
            model().required_node_count(1000.0, 0.0),
            Err(ChainError::InvalidRange(0.0))
        );
        assert_eq!(
            model().required_node_count(0.0, 100.0),
            Err(ChainError::InvalidDistance(0.0))
        );
    }

    #[test]
    fn test_required_node_count_caps_tiny_range() {
        let model = model();
        let range = model.max_range(-1000.0, 0.0).unwrap();
        assert!(matches!(
            model.required_node_count(1.5e6, range),
            Err(ChainError::TooManyNodes { limit: MAX_RELAYS, .. })
        ));

        // Exactly at the limit is still allowed
        let hops = (MAX_RELAYS / NODE_COUNT_MULTIPLIER) as f64;
        assert_eq!(model.required_node_count(hops * 100.0, 100.0).unwrap(), MAX_RELAYS);
        assert!(model.required_node_count(hops * 100.0 + 1.0, 100.0).is_err());
    }

    #[test]
    fn test_link_margin_zero_distance() {
        assert_eq!(
            model().link_margin(0.0, 1.0, 1.0),
            Err(ChainError::InvalidDistance(0.0))
        );
        assert!(model().link_margin(-5.0, 1.0, 1.0).is_err());
    }

    #[test]
    fn test_margin_vanishes_at_max_range() {
        let m = model();
        let range = m.max_range(20.0, 150.0).unwrap();
        let margin = m.link_margin(range, 20.0, 150.0).unwrap();
        assert!(margin.abs() < 1e-6, "margin at max range: {} dB", margin);

        let closer = m.link_margin(range / 2.0, 20.0, 150.0).unwrap();
        assert!(closer > 0.0);
    }

    #[test]
    fn test_legacy_margin_constant() {
        let legacy = LinkBudgetModel::new(ModelConstants::legacy());
        let margin = legacy.link_margin(1000.0, 10.0, 100.0).unwrap();
        assert!((margin - (100.0 + 20.0 - 60.0 - 57.51)).abs() < EPS);
    }

    #[test]
    fn test_max_range_matches_legacy_formula() {
        let pow: f64 = 2.0 * 20.0 - 3.5 + 150.0 + 3.0 - 20.0 * 8.4f64.log10() - 92.45 + 50.51;
        let expected = 10f64.powf(pow / 20.0);
        let range = model().max_range(20.0, 150.0).unwrap();
        assert!((range - expected).abs() / expected < EPS);
    }

    #[test]
    fn test_max_range_from_inputs_parse_error() {
        let err = model().max_range_from_inputs("twenty", "150").unwrap_err();
        assert_eq!(
            err,
            ChainError::Parse {
                field: "gain",
                input: "twenty".to_string()
            }
        );
        assert!(model().max_range_from_inputs("20", "150").is_ok());
    }

    #[test]
    fn test_max_range_overflow_is_invalid() {
        assert!(matches!(
            model().max_range(1e6, 1e6),
            Err(ChainError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_received_power_inverse_square() {
        let m = model();
        let near = m.received_power(1.0e8).unwrap();
        let far = m.received_power(2.0e8).unwrap();
        assert!((near / far - 4.0).abs() < EPS);
        assert!(m.received_power(0.0).is_err());
    }

    #[test]
    fn test_received_power_at_one_au() {
        // ~1.4 kW/m² at Earth's distance
        let flux = model().received_power(1.496e8).unwrap();
        assert!(flux > 1300.0 && flux < 1450.0, "flux: {}", flux);
    }

    #[test]
    fn test_detailed_budget_agrees_with_margin() {
        let m = model();
        let breakdown = m.detailed_budget(5.0e5, 20.0, 150.0).unwrap();
        let margin = m.link_margin(5.0e5, 20.0, 150.0).unwrap();
        assert!((breakdown.link_margin_db - margin).abs() < 1e-9);
        assert_eq!(breakdown.link_viable, margin >= 0.0);
    }
}
