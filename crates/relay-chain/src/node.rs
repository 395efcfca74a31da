//! Relay nodes and the host-facing seams
//!
//! The host renders bodies and moves them along their orbits. The chain only
//! reads positions through [`Body`] and asks a [`NodePrototype`] for new
//! relays; it never computes a position itself.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Circular-orbit elements about the frame's central body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitElements {
    /// Simulation length units
    pub radius: f64,
    pub angle_deg: f64,
    pub degrees_per_second: f64,
}

impl OrbitElements {
    pub fn new(radius: f64, angle_deg: f64, degrees_per_second: f64) -> Self {
        Self {
            radius,
            angle_deg,
            degrees_per_second,
        }
    }

    /// Element-wise mean of two orbits.
    pub fn midpoint(&self, other: &OrbitElements) -> OrbitElements {
        OrbitElements {
            radius: (self.radius + other.radius) / 2.0,
            angle_deg: (self.angle_deg + other.angle_deg) / 2.0,
            degrees_per_second: (self.degrees_per_second + other.degrees_per_second) / 2.0,
        }
    }
}

/// Read-only view of something orbiting in the scene (chain endpoints, the
/// central body, or a relay).
pub trait Body {
    /// Current position in simulation units, as last synchronised by the host.
    fn position(&self) -> Vector3<f64>;

    fn elements(&self) -> OrbitElements;

    fn radius(&self) -> f64 {
        self.elements().radius
    }

    fn angle(&self) -> f64 {
        self.elements().angle_deg
    }

    fn angular_speed(&self) -> f64 {
        self.elements().degrees_per_second
    }
}

/// Parent frame the relays are spawned into. Its center is the central
/// body, which is also the power source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub name: String,
    pub center: Vector3<f64>,
}

impl Frame {
    pub fn new(name: impl Into<String>, center: Vector3<f64>) -> Self {
        Self {
            name: name.into(),
            center,
        }
    }
}

/// A relay satellite owned by the chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrbitNode {
    pub id: Uuid,
    pub elements: OrbitElements,
    pub position: Vector3<f64>,
}

impl OrbitNode {
    pub fn new(elements: OrbitElements, position: Vector3<f64>) -> Self {
        Self {
            id: Uuid::new_v4(),
            elements,
            position,
        }
    }

    /// Straight-line distance in simulation units.
    pub fn distance_to(&self, other: &OrbitNode) -> f64 {
        (self.position - other.position).norm()
    }
}

impl Body for OrbitNode {
    fn position(&self) -> Vector3<f64> {
        self.position
    }

    fn elements(&self) -> OrbitElements {
        self.elements
    }
}

/// Factory for new relays. The host places the node in `frame` and is then
/// responsible for keeping its position in sync with its elements.
pub trait NodePrototype {
    fn spawn(&mut self, elements: OrbitElements, frame: &Frame) -> OrbitNode;
}

impl<F> NodePrototype for F
where
    F: FnMut(OrbitElements, &Frame) -> OrbitNode,
{
    fn spawn(&mut self, elements: OrbitElements, frame: &Frame) -> OrbitNode {
        self(elements, frame)
    }
}
