//! Tree composition: chain arity, parallel mappings, parameter routing.

use pilot_common::motion::{PidGains, PlatformConfig, SpeedFilterParameters};
use pilot_control::control::chains::{names, platform_tree};
use pilot_control::control::{
    Controller, LeafController, LeafParameters, MetaController, ParallelMetaController, PidLayout,
};
use pilot_control::error::{ParameterError, WiringError};

use super::DT;

fn gain_leaf(name: &str, kp: f64) -> LeafController {
    LeafController::pid(
        name,
        1,
        PidLayout::Error,
        PidGains::proportional(kp),
        DT,
    )
    .unwrap()
}

/// Three independent gains fanned out from two inputs.
fn fan(order: &[usize]) -> Controller {
    let children = [
        (gain_leaf("double", 2.0), [0usize], [2usize]),
        (gain_leaf("triple", 3.0), [1], [0]),
        (gain_leaf("negate", -1.0), [0], [1]),
    ];
    let mut parallel = ParallelMetaController::new("fan", 2, 3).unwrap();
    for &i in order {
        let (leaf, input, output) = &children[i];
        parallel
            .add_controller(leaf.clone(), input, output)
            .unwrap();
    }
    let tree = Controller::from(parallel);
    tree.validate().unwrap();
    tree
}

#[test]
fn parallel_result_independent_of_child_order() {
    let mut merged = Vec::new();
    for order in [[0, 1, 2], [2, 1, 0], [1, 0, 2]] {
        let mut tree = fan(&order);
        tree.set_inputs(&[5.0, 7.0]);
        tree.compute();
        merged.push(tree.outputs().as_slice().to_vec());
    }
    assert_eq!(merged[0], vec![21.0, -5.0, 10.0]);
    assert!(merged.iter().all(|m| *m == merged[0]));
}

#[test]
fn chain_rejects_mismatched_stage() {
    let mut chain = MetaController::new("chain");
    chain
        .add_controller(LeafController::passthrough("wide", 3).unwrap())
        .unwrap();
    let err = chain.add_controller(gain_leaf("narrow", 1.0)).unwrap_err();
    assert_eq!(
        err,
        WiringError::StageMismatch {
            parent: "wide".into(),
            child: "narrow".into(),
            expected: 3,
            found: 1,
        }
    );
    // The rejected stage was not appended.
    assert_eq!(chain.children().len(), 1);
}

#[test]
fn incomplete_parallel_fails_validation() {
    let mut parallel = ParallelMetaController::new("half", 2, 2).unwrap();
    parallel
        .add_controller(gain_leaf("only", 1.0), &[0], &[0])
        .unwrap();
    let tree = Controller::from(parallel);
    assert!(matches!(
        tree.validate(),
        Err(WiringError::OutputUnclaimed { index: 1, .. })
    ));
}

#[test]
fn nested_chain_feeds_stages_in_order() {
    let mut inner = MetaController::new("inner");
    inner.add_controller(gain_leaf("x2", 2.0)).unwrap();
    inner.add_controller(gain_leaf("x5", 5.0)).unwrap();

    let mut outer = MetaController::new("outer");
    outer.add_controller(inner).unwrap();
    outer.add_controller(gain_leaf("neg", -1.0)).unwrap();

    let mut tree = Controller::from(outer);
    tree.validate().unwrap();
    tree.set_input(0, 1.5);
    tree.compute();
    assert_eq!(tree.get_output(0), -15.0);
}

#[test]
fn empty_chain_rejected_when_validated() {
    let tree = Controller::from(MetaController::new("nothing"));
    assert!(matches!(tree.validate(), Err(WiringError::Empty { .. })));
}

#[test]
fn platform_tree_parameters_routed_by_name() {
    let mut tree = platform_tree(&PlatformConfig::default(), DT).unwrap();

    let gains = PidGains::new(4.0, 0.5, 0.0, 100.0);
    tree.set_parameters(names::ANGULAR_POSITION_PID, LeafParameters::Pid(gains))
        .unwrap();
    assert_eq!(
        tree.parameters(names::ANGULAR_POSITION_PID),
        Some(LeafParameters::Pid(gains))
    );

    let err = tree
        .set_parameters(
            names::LINEAR_SPEED_PID,
            LeafParameters::SpeedRamp(SpeedFilterParameters::default()),
        )
        .unwrap_err();
    assert!(matches!(err, ParameterError::WrongKind { .. }));

    let err = tree
        .set_parameters("no_such_leaf", LeafParameters::Pid(gains))
        .unwrap_err();
    assert_eq!(err, ParameterError::UnknownController("no_such_leaf".into()));
}

#[test]
fn tree_dump_lists_every_node() {
    let tree = platform_tree(&PlatformConfig::default(), DT).unwrap();
    let dump = tree.to_string();
    assert!(dump.starts_with("platform"));
    for name in [
        names::POSE_STRAIGHT,
        names::LINEAR_SPEED_RAMP,
        names::ANGULAR_SPEED_PID,
    ] {
        assert!(dump.contains(name), "{name} missing from dump:\n{dump}");
    }
}
