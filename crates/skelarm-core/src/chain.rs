//! Link properties, per-link derived state and the chain that owns them.

use crate::{
    dynamics,
    error::{ConfigurationError, Result, check_len},
    integrator::SystemState,
    kinematics::{self, Point},
    linsolve::LinearSolver,
};
use std::f64::consts::PI;

/// Physical description of one link.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkProperties {
    /// Distance from the proximal joint to the distal joint.
    pub length: f64,
    pub mass: f64,
    /// Moment of inertia about the center of mass.
    pub inertia: f64,
    /// Center-of-mass offset from the proximal joint, in the link frame.
    pub rgx: f64,
    pub rgy: f64,
    /// Joint angle limits; not enforced by the integrator.
    pub qmin: f64,
    pub qmax: f64,
}

impl LinkProperties {
    /// A link with its center of mass at the midpoint and limits of `[-π, π]`.
    pub fn new(length: f64, mass: f64, inertia: f64) -> Self {
        Self {
            length,
            mass,
            inertia,
            rgx: 0.5 * length,
            rgy: 0.0,
            qmin: -PI,
            qmax: PI,
        }
    }

    pub fn with_com(mut self, rgx: f64, rgy: f64) -> Self {
        self.rgx = rgx;
        self.rgy = rgy;
        self
    }

    pub fn with_limits(mut self, qmin: f64, qmax: f64) -> Self {
        self.qmin = qmin;
        self.qmax = qmax;
        self
    }

    /// Check the physical invariants; `link` is only used for reporting.
    pub fn validate(&self, link: usize) -> Result<(), ConfigurationError> {
        let fields = [
            ("length", self.length),
            ("mass", self.mass),
            ("inertia", self.inertia),
            ("rgx", self.rgx),
            ("rgy", self.rgy),
            ("qmin", self.qmin),
            ("qmax", self.qmax),
        ];
        if let Some((field, _)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ConfigurationError::NonFinite { link, field });
        }
        if self.length <= 0.0 {
            return Err(ConfigurationError::NonPositiveLength {
                link,
                value: self.length,
            });
        }
        if self.mass < 0.0 {
            return Err(ConfigurationError::NegativeMass {
                link,
                value: self.mass,
            });
        }
        if self.inertia < 0.0 {
            return Err(ConfigurationError::NegativeInertia {
                link,
                value: self.inertia,
            });
        }
        if self.qmin >= self.qmax {
            return Err(ConfigurationError::JointLimits {
                link,
                qmin: self.qmin,
                qmax: self.qmax,
            });
        }
        Ok(())
    }

    pub fn within_limits(&self, q: f64) -> bool {
        (self.qmin..=self.qmax).contains(&q)
    }

    pub fn clamp(&self, q: f64) -> f64 {
        q.clamp(self.qmin, self.qmax)
    }
}

/// Derived kinematic and dynamic quantities of one link.
///
/// `x, y` is the distal joint (the tip of the link); the proximal joint is
/// the previous slot's tip.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LinkState {
    /// Absolute angle and its derivatives.
    pub theta: f64,
    pub omega: f64,
    pub alpha: f64,

    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub ax: f64,
    pub ay: f64,

    /// Center of mass.
    pub xg: f64,
    pub yg: f64,
    pub vxg: f64,
    pub vyg: f64,
    pub axg: f64,
    pub ayg: f64,

    /// End-effector Jacobian column for this joint.
    pub jx: f64,
    pub jy: f64,
    /// Coriolis basis for this joint.
    pub hx: f64,
    pub hy: f64,

    /// Force exerted on this link by its parent, from inverse dynamics.
    pub fx: f64,
    pub fy: f64,
    /// Joint torque, from inverse dynamics.
    pub tau: f64,
}

/// Planar force applied to the last link.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExternalForce {
    pub fx: f64,
    pub fy: f64,
    /// Application point offset from the tip, in the last link's frame.
    pub rx: f64,
    pub ry: f64,
}

impl ExternalForce {
    pub fn new(fx: f64, fy: f64) -> Self {
        Self {
            fx,
            fy,
            ..Self::default()
        }
    }

    pub fn at(mut self, rx: f64, ry: f64) -> Self {
        self.rx = rx;
        self.ry = ry;
        self
    }

    pub fn is_zero(&self) -> bool {
        self.fx == 0.0 && self.fy == 0.0
    }
}

/// An open serial chain of revolute links attached to a fixed base.
#[derive(Debug, Clone)]
pub struct Chain {
    links: Vec<LinkProperties>,
    // base sentinel, one slot per link, tip sentinel
    states: Vec<LinkState>,
    q: Vec<f64>,
    dq: Vec<f64>,
    ddq: Vec<f64>,
    external: ExternalForce,
    solver: LinearSolver,
}

impl Chain {
    /// Build a chain at rest in the stretched-out configuration.
    pub fn new(links: Vec<LinkProperties>) -> Result<Self> {
        if links.is_empty() {
            return Err(ConfigurationError::EmptyChain.into());
        }
        for (i, link) in links.iter().enumerate() {
            link.validate(i)?;
        }

        let n = links.len();
        let mut chain = Self {
            states: vec![LinkState::default(); kinematics::slot_count(n)],
            links,
            q: vec![0.0; n],
            dq: vec![0.0; n],
            ddq: vec![0.0; n],
            external: ExternalForce::default(),
            solver: LinearSolver::default(),
        };
        chain.refresh();
        Ok(chain)
    }

    pub fn with_solver(mut self, solver: LinearSolver) -> Self {
        self.solver = solver;
        self
    }

    /// Number of links (and degrees of freedom).
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn links(&self) -> &[LinkProperties] {
        &self.links
    }

    pub fn solver(&self) -> &LinearSolver {
        &self.solver
    }

    pub fn q(&self) -> &[f64] {
        &self.q
    }

    pub fn dq(&self) -> &[f64] {
        &self.dq
    }

    pub fn ddq(&self) -> &[f64] {
        &self.ddq
    }

    pub fn set_q(&mut self, q: &[f64]) -> Result<()> {
        check_len("q", self.len(), q.len())?;
        self.q.copy_from_slice(q);
        self.refresh();
        Ok(())
    }

    pub fn set_dq(&mut self, dq: &[f64]) -> Result<()> {
        check_len("dq", self.len(), dq.len())?;
        self.dq.copy_from_slice(dq);
        self.refresh();
        Ok(())
    }

    pub fn set_ddq(&mut self, ddq: &[f64]) -> Result<()> {
        check_len("ddq", self.len(), ddq.len())?;
        self.ddq.copy_from_slice(ddq);
        self.refresh();
        Ok(())
    }

    /// Current `[q; dq]`.
    pub fn state(&self) -> SystemState {
        SystemState {
            q: self.q.clone(),
            dq: self.dq.clone(),
        }
    }

    /// Assign `q` and `dq` together; nothing changes if either is the wrong size.
    pub fn set_state(&mut self, state: &SystemState) -> Result<()> {
        check_len("q", self.len(), state.q.len())?;
        check_len("dq", self.len(), state.dq.len())?;
        self.q.copy_from_slice(&state.q);
        self.dq.copy_from_slice(&state.dq);
        self.refresh();
        Ok(())
    }

    pub fn external_force(&self) -> ExternalForce {
        self.external
    }

    pub fn set_external_force(&mut self, force: ExternalForce) {
        self.external = force;
    }

    /// Derived state of links `1..=n`.
    pub fn link_states(&self) -> &[LinkState] {
        &self.states[1..=self.len()]
    }

    /// All slots including the base and tip sentinels.
    pub(crate) fn slots(&self) -> &[LinkState] {
        &self.states
    }

    pub fn end_effector(&self) -> Point {
        let tip = &self.states[self.len()];
        Point::new(tip.x, tip.y)
    }

    /// Base, every intermediate joint and the end effector.
    pub fn joint_positions(&self) -> Vec<Point> {
        self.states[..=self.len()]
            .iter()
            .map(|s| Point::new(s.x, s.y))
            .collect()
    }

    pub fn within_limits(&self) -> bool {
        self.links
            .iter()
            .zip(&self.q)
            .all(|(link, &q)| link.within_limits(q))
    }

    pub fn kinetic_energy(&self) -> f64 {
        dynamics::kinetic_energy(&self.links, &self.states)
    }

    /// Install freshly computed slots, e.g. after inverse dynamics.
    pub(crate) fn install(&mut self, states: Vec<LinkState>) {
        debug_assert_eq!(states.len(), self.states.len());
        self.states = states;
    }

    /// Overwrite `ddq` after a successful forward-dynamics solve.
    pub(crate) fn install_ddq(&mut self, ddq: Vec<f64>) {
        debug_assert_eq!(ddq.len(), self.len());
        self.ddq = ddq;
        self.refresh();
    }

    /// Recompute every derived slot from `q, dq, ddq`.
    fn refresh(&mut self) {
        kinematics::forward_pass(&self.links, &self.q, &self.dq, &self.ddq, &mut self.states);
        kinematics::backward_pass(&self.links, &self.dq, &mut self.states);
    }
}
