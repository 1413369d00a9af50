use approx::assert_abs_diff_eq;
use skelarm_core::{
    Chain, LinkProperties, Method, Point, Simulator, SystemState, integrate, integrate_with,
    integrator::{ConstantTorque, JointPd, ZeroTorque},
    inverse_kinematics,
};

fn two_link() -> Chain {
    Chain::new(vec![
        LinkProperties::new(1.0, 1.0, 0.1),
        LinkProperties::new(1.0, 1.0, 0.1),
    ])
    .unwrap()
}

fn four_dof() -> Chain {
    Chain::new(vec![
        LinkProperties::new(1.0, 1.0, 0.1),
        LinkProperties::new(0.8, 0.8, 0.05),
        LinkProperties::new(0.6, 0.6, 0.03),
        LinkProperties::new(0.4, 0.4, 0.01),
    ])
    .unwrap()
}

#[test]
fn chain_at_rest_stays_at_rest() {
    let mut chain = four_dof();
    chain.set_q(&[0.1, -0.2, 0.3, -0.4]).unwrap();
    let trajectory = integrate(&mut chain, (0.0, 1.0), &ZeroTorque, 0.01).unwrap();

    assert_eq!(trajectory.len(), 101);
    for (q, dq) in trajectory.q.iter().zip(&trajectory.dq) {
        for (i, &qi) in q.iter().enumerate() {
            assert_abs_diff_eq!(qi, [0.1, -0.2, 0.3, -0.4][i], epsilon = 1e-12);
        }
        for &v in dq {
            assert_abs_diff_eq!(v, 0.0, epsilon = 1e-12);
        }
    }
}

#[test]
fn constant_torque_follows_parabola() {
    // joint inertia about the base is I + m·(l/2)² = 0.35, so q̈ = 1
    let mut chain = Chain::new(vec![LinkProperties::new(1.0, 1.0, 0.1)]).unwrap();
    let trajectory = integrate(&mut chain, (0.0, 1.0), &ConstantTorque(vec![0.35]), 0.01).unwrap();

    for (t, q) in trajectory.times.iter().zip(&trajectory.q) {
        assert_abs_diff_eq!(q[0], 0.5 * t * t, epsilon = 1e-9);
    }
    assert_abs_diff_eq!(chain.q()[0], 0.5, epsilon = 1e-9);
    assert_abs_diff_eq!(chain.dq()[0], 1.0, epsilon = 1e-9);
    assert_abs_diff_eq!(chain.ddq()[0], 1.0, epsilon = 1e-12);
}

#[test]
fn unit_torque_matches_closed_form() {
    let mut chain = Chain::new(vec![LinkProperties::new(1.0, 1.0, 0.1)]).unwrap();
    let h00 = 0.35;
    let tau = 1.0;
    let trajectory = integrate(&mut chain, (0.0, 1.0), &ConstantTorque(vec![tau]), 0.01).unwrap();

    assert_eq!(trajectory.len(), 101);
    for (t, q) in trajectory.times.iter().zip(&trajectory.q) {
        assert_abs_diff_eq!(q[0], 0.5 * (tau / h00) * t * t, epsilon = 1e-3);
    }
    assert_abs_diff_eq!(chain.q()[0], 0.5 * tau / h00, epsilon = 1e-3);
    assert_abs_diff_eq!(chain.dq()[0], tau / h00, epsilon = 1e-3);
    assert_abs_diff_eq!(chain.ddq()[0], tau / h00, epsilon = 1e-9);
}

#[test]
fn free_motion_conserves_energy() {
    let mut chain = two_link();
    chain.set_q(&[0.0, 0.5]).unwrap();
    chain.set_dq(&[1.0, -0.5]).unwrap();
    let initial = chain.kinetic_energy();

    integrate(&mut chain, (0.0, 1.0), &ZeroTorque, 1e-3).unwrap();
    let drift = (chain.kinetic_energy() - initial).abs() / initial;
    assert!(drift < 1e-7, "relative energy drift {drift}");
}

#[test]
fn rk4_beats_euler() {
    let start = SystemState::new(vec![0.0, 0.5], vec![1.0, -0.5]);
    let run = |method: Method, dt: f64| {
        let mut chain = two_link();
        chain.set_state(&start).unwrap();
        integrate_with(&mut chain, (0.0, 0.5), &ZeroTorque, dt, method).unwrap();
        chain.q().to_vec()
    };
    let reference = run(Method::RungeKutta4, 1e-4);
    let error = |q: Vec<f64>| {
        q.iter()
            .zip(&reference)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    };

    let rk4 = error(run(Method::RungeKutta4, 0.01));
    let euler = error(run(Method::Euler, 0.01));
    assert!(rk4 < 1e-6, "rk4 error {rk4}");
    assert!(rk4 * 100.0 < euler, "rk4 error {rk4}, euler error {euler}");
}

#[test]
fn pd_controller_settles_on_target() {
    let chain = two_link();
    let pd = JointPd::new(&chain, 20.0, 8.0, &[0.6, -0.4]).unwrap();
    let mut sim = Simulator::new(chain, pd, 0.005).unwrap();
    sim.run(10.0).unwrap();

    assert_abs_diff_eq!(sim.time(), 10.0, epsilon = 1e-9);
    assert_abs_diff_eq!(sim.chain().q()[0], 0.6, epsilon = 1e-4);
    assert_abs_diff_eq!(sim.chain().q()[1], -0.4, epsilon = 1e-4);
    assert!(sim.chain().within_limits());
}

#[test]
fn simulator_steps_match_one_shot_integration() {
    let start = SystemState::new(vec![0.2, -0.3], vec![0.5, 0.1]);
    let torque = ConstantTorque(vec![0.2, -0.1]);

    let mut chain = two_link();
    chain.set_state(&start).unwrap();
    integrate(&mut chain, (0.0, 0.1), &torque, 0.01).unwrap();

    let mut stepped = two_link();
    stepped.set_state(&start).unwrap();
    let mut sim = Simulator::new(stepped, torque, 0.01).unwrap();
    for _ in 0..10 {
        sim.step().unwrap();
    }

    for (a, b) in sim.chain().q().iter().zip(chain.q()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-12);
    }
}

#[test]
fn inverse_kinematics_round_trips_through_forward_kinematics() {
    let mut chain = four_dof();
    chain.set_q(&[0.3, 0.3, 0.3, 0.3]).unwrap();
    for target in [Point::new(1.8, 1.2), Point::new(1.2, 1.9), Point::new(2.0, 0.6)] {
        let q = inverse_kinematics(&chain, target).unwrap();
        let mut reached = chain.clone();
        reached.set_q(&q).unwrap();
        assert!(reached.end_effector().distance(&target) < 1e-6);
        assert!(reached.within_limits());
    }
}

fn scale(raw: i16, range: f64) -> f64 {
    raw as f64 / i16::MAX as f64 * range
}

/// Place the chain at `q`, solve for its end effector from the default pose
/// and check the solution lands on the same point within the limits.
fn assert_ik_round_trip(chain: &Chain, q: &[f64]) {
    let mut posed = chain.clone();
    posed.set_q(q).unwrap();
    let target = posed.end_effector();

    let solution = inverse_kinematics(chain, target)
        .unwrap_or_else(|err| panic!("q={q:?} target={target:?}: {err}"));
    posed.set_q(&solution).unwrap();
    assert!(posed.within_limits(), "q={q:?} solution={solution:?}");
    assert!(
        posed.end_effector().distance(&target) < 1e-6,
        "q={q:?} target={target:?} reached={:?}",
        posed.end_effector()
    );
}

#[test]
fn ik_round_trip_holds_across_two_link_poses() {
    let chain = two_link();
    bolero::check!()
        .with_type::<[i16; 2]>()
        .for_each(|raw| {
            let q: Vec<f64> = raw.iter().map(|&r| scale(r, 3.0)).collect();
            assert_ik_round_trip(&chain, &q);
        });
}

#[test]
fn ik_round_trip_holds_across_limited_four_dof_poses() {
    let chain = Chain::new(vec![
        LinkProperties::new(1.0, 1.0, 0.1),
        LinkProperties::new(0.8, 0.8, 0.05),
        LinkProperties::new(0.6, 0.6, 0.03).with_limits(-2.5, 2.5),
        LinkProperties::new(0.4, 0.4, 0.01).with_limits(-2.0, 2.0),
    ])
    .unwrap();
    bolero::check!()
        .with_type::<[i16; 4]>()
        .for_each(|raw| {
            let q: Vec<f64> = raw
                .iter()
                .zip(chain.links())
                .map(|(&r, link)| link.clamp(scale(r, link.qmax.min(3.0))))
                .collect();
            assert_ik_round_trip(&chain, &q);
        });
}
