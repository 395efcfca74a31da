//! Relay deployment driven by the circular-orbit host.

use nalgebra::Vector3;
use orbital_mechanics::propagation::{propagate_relays, CircularPrototype};
use orbital_mechanics::{CircularOrbit, OrbitingBody};
use relay_chain::{
    Body, ChainBuilder, Frame, LinkBudgetModel, LinkConfig, ModelConstants, TickOutcome,
};

const EPS: f64 = 1e-9;

fn endpoints() -> (OrbitingBody, OrbitingBody) {
    let sun = Vector3::zeros();
    let origin = OrbitingBody::new("Earth", CircularOrbit::new(10.0, 0.0, 1.0).unwrap(), sun);
    let destination =
        OrbitingBody::new("Outer", CircularOrbit::new(200.0, 0.0, 0.1).unwrap(), sun);
    (origin, destination)
}

fn chain(constants: ModelConstants) -> ChainBuilder<CircularPrototype> {
    ChainBuilder::new(
        LinkBudgetModel::new(constants),
        CircularPrototype,
        Frame::new("Sun", Vector3::zeros()),
    )
}

#[test]
fn test_end_to_end_population() {
    let (origin, destination) = endpoints();
    // 190 units of 100 000 km over a ~2.84e6 km hop: 7 hops, 14 relays
    let mut chain = chain(ModelConstants {
        unit_km: 1.0e5,
        ..ModelConstants::default()
    });
    let link = LinkConfig::new(20.0, 150.0);

    let model = chain.model().clone();
    let range = model.max_range(20.0, 150.0).unwrap();
    let expected = model
        .required_node_count(model.to_real_world(190.0), range)
        .unwrap();

    let count = chain.populate(&origin, &destination, &link).unwrap();
    assert_eq!(count, expected);
    assert_eq!(count, 14);
    assert_eq!(chain.len(), count);

    let spacing = 190.0 / (count + 1) as f64;
    let nodes = chain.nodes();
    assert!((nodes[0].radius() - (10.0 + spacing)).abs() < EPS);
    assert!((nodes[count - 1].radius() - (200.0 - spacing)).abs() < EPS);

    // One pass over every gap brings the cursor home
    for _ in 0..count - 1 {
        assert!(matches!(chain.tick().unwrap(), TickOutcome::WithinRange { .. }));
    }
    assert_eq!(chain.cursor(), 0);
    assert_eq!(chain.len(), count);
}

#[test]
fn test_drifting_relays_grow_the_chain() {
    let (mut origin, mut destination) = endpoints();
    let mut chain = chain(ModelConstants {
        unit_km: 1.0e5,
        ..ModelConstants::default()
    });
    let initial = chain
        .populate(&origin, &destination, &LinkConfig::new(20.0, 150.0))
        .unwrap();
    assert!(initial > 4);

    let dt = 0.02;
    let mut len = chain.len();
    let mut insertions = 0;
    for frame in 0..400 {
        origin.advance(dt);
        destination.advance(dt);
        let center = chain.frame().center;
        propagate_relays(chain.nodes_mut(), center, dt);

        if frame % 5 == 0 {
            if let TickOutcome::Inserted { index, .. } = chain.tick().unwrap() {
                let nodes = chain.nodes();
                let mid = nodes[index - 1].elements.midpoint(&nodes[index + 1].elements);
                assert!((nodes[index].elements.radius - mid.radius).abs() < EPS);
                insertions += 1;
            }
        }

        assert!(chain.len() >= len);
        len = chain.len();
    }

    assert!(insertions > 0);
    assert_eq!(chain.len(), initial + insertions);

    let stats = chain.statistics().unwrap();
    assert_eq!(stats.node_count, chain.len());
    assert!(stats.lowest_power <= stats.average_power);
}
