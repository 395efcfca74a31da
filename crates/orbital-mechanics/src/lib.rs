//! Orbital Mechanics Library
//!
//! Circular-orbit propagation in the ecliptic plane, planet presets for the
//! selectable destinations, and the host side of the relay chain: spawning
//! relays and keeping their positions in sync with their orbits.

use nalgebra::Vector3;
use relay_chain::{Body, OrbitElements};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrbitalError {
    #[error("Invalid orbit radius: {0}")]
    InvalidRadius(f64),
    #[error("Unknown body: {0}")]
    UnknownBody(String),
}

pub type Result<T> = std::result::Result<T, OrbitalError>;

/// Circular orbit. The phase is left unwrapped so that averaging two
/// phases always lands between them along the direction of travel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircularOrbit {
    pub radius: f64,
    pub angle_deg: f64,
    pub degrees_per_second: f64,
}

impl CircularOrbit {
    pub fn new(radius: f64, angle_deg: f64, degrees_per_second: f64) -> Result<Self> {
        if !radius.is_finite() || radius < 0.0 {
            return Err(OrbitalError::InvalidRadius(radius));
        }
        Ok(Self {
            radius,
            angle_deg,
            degrees_per_second,
        })
    }

    pub fn from_elements(elements: OrbitElements) -> Self {
        Self {
            radius: elements.radius,
            angle_deg: elements.angle_deg,
            degrees_per_second: elements.degrees_per_second,
        }
    }

    pub fn elements(&self) -> OrbitElements {
        OrbitElements::new(self.radius, self.angle_deg, self.degrees_per_second)
    }

    pub fn position(&self, center: Vector3<f64>) -> Vector3<f64> {
        transforms::ecliptic_position(center, self.radius, self.angle_deg)
    }

    pub fn advance(&mut self, dt: f64) {
        self.angle_deg += self.degrees_per_second * dt;
    }
}

/// A named body on a circular orbit around `center`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrbitingBody {
    pub name: String,
    pub orbit: CircularOrbit,
    pub center: Vector3<f64>,
}

impl OrbitingBody {
    pub fn new(name: impl Into<String>, orbit: CircularOrbit, center: Vector3<f64>) -> Self {
        Self {
            name: name.into(),
            orbit,
            center,
        }
    }

    pub fn advance(&mut self, dt: f64) {
        self.orbit.advance(dt);
    }
}

impl Body for OrbitingBody {
    fn position(&self) -> Vector3<f64> {
        self.orbit.position(self.center)
    }

    fn elements(&self) -> OrbitElements {
        self.orbit.elements()
    }
}

pub mod transforms {
    use super::*;

    /// Position on a circle of `radius` in the x/z plane (y up).
    pub fn ecliptic_position(center: Vector3<f64>, radius: f64, angle_deg: f64) -> Vector3<f64> {
        let theta = angle_deg.to_radians();
        center + Vector3::new(radius * theta.cos(), 0.0, radius * theta.sin())
    }
}

pub mod propagation {
    use super::*;
    use relay_chain::{Frame, NodePrototype, OrbitNode};

    /// Spawns relays on their circular orbit in the frame.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct CircularPrototype;

    impl NodePrototype for CircularPrototype {
        fn spawn(&mut self, elements: OrbitElements, frame: &Frame) -> OrbitNode {
            let position =
                transforms::ecliptic_position(frame.center, elements.radius, elements.angle_deg);
            OrbitNode::new(elements, position)
        }
    }

    /// Advances every relay by `dt` seconds and rewrites its position.
    pub fn propagate_relays(nodes: &mut [OrbitNode], center: Vector3<f64>, dt: f64) {
        for node in nodes.iter_mut() {
            let mut orbit = CircularOrbit::from_elements(node.elements);
            orbit.advance(dt);
            node.elements = orbit.elements();
            node.position = orbit.position(center);
        }
    }
}

pub mod presets {
    use std::fmt;
    use std::str::FromStr;

    use super::*;

    /// Scene radius of Earth's orbit; the other presets keep their ratio
    /// to 1 AU.
    pub const EARTH_SCENE_RADIUS: f64 = 10.0;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub enum Planet {
        Mercury,
        Venus,
        Earth,
        Mars,
    }

    impl Planet {
        pub fn semi_major_axis_au(&self) -> f64 {
            match self {
                Planet::Mercury => 0.387,
                Planet::Venus => 0.723,
                Planet::Earth => 1.0,
                Planet::Mars => 1.524,
            }
        }

        /// Scene angular speed, scaled so that Earth turns at 1 deg/s.
        pub fn degrees_per_second(&self) -> f64 {
            match self {
                Planet::Mercury => 4.152,
                Planet::Venus => 1.626,
                Planet::Earth => 1.0,
                Planet::Mars => 0.532,
            }
        }

        pub fn scene_radius(&self) -> f64 {
            self.semi_major_axis_au() * EARTH_SCENE_RADIUS
        }

        pub fn orbit(&self) -> CircularOrbit {
            CircularOrbit {
                radius: self.scene_radius(),
                angle_deg: 0.0,
                degrees_per_second: self.degrees_per_second(),
            }
        }

        pub fn body(&self, center: Vector3<f64>) -> OrbitingBody {
            OrbitingBody::new(self.to_string(), self.orbit(), center)
        }
    }

    impl fmt::Display for Planet {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let name = match self {
                Planet::Mercury => "Mercury",
                Planet::Venus => "Venus",
                Planet::Earth => "Earth",
                Planet::Mars => "Mars",
            };
            f.write_str(name)
        }
    }

    impl FromStr for Planet {
        type Err = OrbitalError;

        fn from_str(s: &str) -> Result<Self> {
            match s.trim().to_ascii_lowercase().as_str() {
                "mercury" => Ok(Planet::Mercury),
                "venus" => Ok(Planet::Venus),
                "earth" => Ok(Planet::Earth),
                "mars" => Ok(Planet::Mars),
                _ => Err(OrbitalError::UnknownBody(s.to_string())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::presets::Planet;
    use super::propagation::{propagate_relays, CircularPrototype};
    use super::*;
    use relay_chain::{Frame, NodePrototype};

    const EPS: f64 = 1e-9;

    #[test]
    fn test_rejects_negative_radius() {
        assert!(matches!(
            CircularOrbit::new(-1.0, 0.0, 1.0),
            Err(OrbitalError::InvalidRadius(_))
        ));
    }

    #[test]
    fn test_quarter_turn() {
        let mut orbit = CircularOrbit::new(10.0, 0.0, 9.0).unwrap();
        orbit.advance(10.0);
        let pos = orbit.position(Vector3::zeros());

        assert!((orbit.angle_deg - 90.0).abs() < EPS);
        assert!(pos.x.abs() < EPS);
        assert!((pos.z - 10.0).abs() < EPS);
    }

    #[test]
    fn test_angle_is_not_wrapped() {
        let mut orbit = CircularOrbit::new(1.0, 350.0, 20.0).unwrap();
        orbit.advance(1.0);
        assert!((orbit.angle_deg - 370.0).abs() < EPS);
    }

    #[test]
    fn test_prototype_places_relay_on_orbit() {
        let frame = Frame::new("Sun", Vector3::new(1.0, 2.0, 3.0));
        let node = CircularPrototype.spawn(OrbitElements::new(5.0, 0.0, 1.0), &frame);
        assert!((node.position - Vector3::new(6.0, 2.0, 3.0)).norm() < EPS);
    }

    #[test]
    fn test_propagate_relays_keeps_positions_in_sync() {
        let frame = Frame::new("Sun", Vector3::zeros());
        let mut nodes = vec![
            CircularPrototype.spawn(OrbitElements::new(5.0, 0.0, 45.0), &frame),
            CircularPrototype.spawn(OrbitElements::new(8.0, 10.0, -5.0), &frame),
        ];
        propagate_relays(&mut nodes, frame.center, 2.0);

        assert!((nodes[0].elements.angle_deg - 90.0).abs() < EPS);
        assert!((nodes[1].elements.angle_deg - 0.0).abs() < EPS);
        for node in &nodes {
            let expected = CircularOrbit::from_elements(node.elements).position(frame.center);
            assert!((node.position - expected).norm() < EPS);
        }
    }

    #[test]
    fn test_planet_presets() {
        assert_eq!("Mars".parse::<Planet>().unwrap(), Planet::Mars);
        assert_eq!(" venus ".parse::<Planet>().unwrap(), Planet::Venus);
        assert!(matches!(
            "pluto".parse::<Planet>(),
            Err(OrbitalError::UnknownBody(_))
        ));

        assert!((Planet::Earth.scene_radius() - 10.0).abs() < EPS);
        assert!(Planet::Mercury.degrees_per_second() > Planet::Mars.degrees_per_second());

        let mars = Planet::Mars.body(Vector3::zeros());
        assert_eq!(mars.name, "Mars");
        assert!((mars.position() - Vector3::new(15.24, 0.0, 0.0)).norm() < EPS);
    }
}
