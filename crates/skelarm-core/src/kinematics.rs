//! Recursive kinematics of a planar serial chain.
//!
//! State is kept in parallel slots indexed by link number: slot `0` is the
//! fixed base, slots `1..=n` are the links and slot `n + 1` is a virtual
//! link past the tip. The forward pass walks base to tip accumulating
//! angles, positions, velocities and accelerations; the backward pass walks
//! tip to base accumulating the end-effector Jacobian and its Coriolis
//! basis.

use crate::chain::{Chain, LinkProperties, LinkState};

/// A position in the plane of the chain.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Number of state slots needed for `links` links.
pub(crate) const fn slot_count(links: usize) -> usize {
    links + 2
}

/// Base-to-tip pass.
///
/// Fills angle, position, velocity and acceleration of every link tip and
/// center of mass. `states` must have [`slot_count`] entries; the base and
/// tip sentinels are reset to zero.
pub fn forward_pass(
    links: &[LinkProperties],
    q: &[f64],
    dq: &[f64],
    ddq: &[f64],
    states: &mut [LinkState],
) {
    let n = links.len();
    debug_assert_eq!(states.len(), slot_count(n));

    states[0] = LinkState::default();
    for (i, link) in links.iter().enumerate() {
        let prev = states[i];

        let theta = prev.theta + q[i];
        let omega = prev.omega + dq[i];
        let alpha = prev.alpha + ddq[i];
        let (sin, cos) = theta.sin_cos();
        let omega2 = omega * omega;

        // link vector and center-of-mass offset, both in the base frame
        let (lx, ly) = (link.length * cos, link.length * sin);
        let (gx, gy) = (
            link.rgx * cos - link.rgy * sin,
            link.rgx * sin + link.rgy * cos,
        );

        states[i + 1] = LinkState {
            theta,
            omega,
            alpha,
            x: prev.x + lx,
            y: prev.y + ly,
            vx: prev.vx - omega * ly,
            vy: prev.vy + omega * lx,
            ax: prev.ax - alpha * ly - omega2 * lx,
            ay: prev.ay + alpha * lx - omega2 * ly,
            xg: prev.x + gx,
            yg: prev.y + gy,
            vxg: prev.vx - omega * gy,
            vyg: prev.vy + omega * gx,
            axg: prev.ax - alpha * gy - omega2 * gx,
            ayg: prev.ay + alpha * gx - omega2 * gy,
            ..LinkState::default()
        };
    }
    states[n + 1] = LinkState::default();
}

/// Tip-to-base pass.
///
/// Requires the angles from [`forward_pass`]. Fills the end-effector
/// Jacobian column `(jx, jy)` and Coriolis basis `(hx, hy)` of each link so
/// that the tip acceleration is `Σ jx_i·q̈_i + hx_i·q̇_i` (resp. `y`).
pub fn backward_pass(links: &[LinkProperties], dq: &[f64], states: &mut [LinkState]) {
    let n = links.len();
    debug_assert_eq!(states.len(), slot_count(n));

    for i in (1..=n).rev() {
        let next = states[i + 1];
        let link = &links[i - 1];
        let s = &mut states[i];
        let (sin, cos) = s.theta.sin_cos();
        s.jx = next.jx - link.length * sin;
        s.jy = next.jy + link.length * cos;
        s.hx = next.hx - s.jy * dq[i - 1];
        s.hy = next.hy + s.jx * dq[i - 1];
    }
}

/// Run both passes into freshly allocated slots.
pub fn compute(links: &[LinkProperties], q: &[f64], dq: &[f64], ddq: &[f64]) -> Vec<LinkState> {
    let mut states = vec![LinkState::default(); slot_count(links.len())];
    forward_pass(links, q, dq, ddq, &mut states);
    backward_pass(links, dq, &mut states);
    states
}

/// Jacobian of a point rigidly attached to one link.
#[derive(Debug, Clone, PartialEq)]
pub struct PointJacobian {
    /// One `[∂x/∂q_i, ∂y/∂q_i]` column per joint; zero past the carrying link.
    pub columns: Vec<[f64; 2]>,
    /// Acceleration of the point due to joint velocities alone (`J̇·q̇`).
    pub velocity_product: [f64; 2],
}

/// Jacobian of `point`, attached to link `link` (zero-based), given slots
/// filled by [`forward_pass`].
pub fn point_jacobian(states: &[LinkState], dq: &[f64], link: usize, point: Point) -> PointJacobian {
    let mut columns = vec![[0.0; 2]; dq.len()];
    let (mut hx, mut hy) = (0.0, 0.0);
    let mut acc = [0.0; 2];

    for i in (0..=link).rev() {
        // slot i holds the proximal joint of link i
        let joint = &states[i];
        let jx = -(point.y - joint.y);
        let jy = point.x - joint.x;
        columns[i] = [jx, jy];
        hx -= jy * dq[i];
        hy += jx * dq[i];
        acc[0] += hx * dq[i];
        acc[1] += hy * dq[i];
    }

    PointJacobian {
        columns,
        velocity_product: acc,
    }
}

/// Joint positions from the base to the end effector (`n + 1` points).
pub fn forward_kinematics(chain: &Chain) -> Vec<Point> {
    chain.joint_positions()
}

pub fn end_effector(chain: &Chain) -> Point {
    chain.end_effector()
}

/// End-effector Jacobian, one `[jx, jy]` column per joint.
pub fn jacobian(chain: &Chain) -> Vec<[f64; 2]> {
    chain.link_states().iter().map(|s| [s.jx, s.jy]).collect()
}
