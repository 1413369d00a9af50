//! Time integration of `X = [q; dq]`.
//!
//! Every step is a pure function of the chain parameters, the time, the
//! state, the step size and the torque command: nothing is retained
//! between calls and the chain is never mutated here.

use crate::{
    chain::Chain,
    dynamics,
    error::{Result, check_len},
};

/// Joint positions and rates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SystemState {
    pub q: Vec<f64>,
    pub dq: Vec<f64>,
}

impl SystemState {
    pub fn new(q: Vec<f64>, dq: Vec<f64>) -> Self {
        Self { q, dq }
    }

    /// State at rest in the stretched-out configuration.
    pub fn zeros(dof: usize) -> Self {
        Self {
            q: vec![0.0; dof],
            dq: vec![0.0; dof],
        }
    }

    pub fn dof(&self) -> usize {
        self.q.len()
    }

    /// `self + h·rate`, where `rate` is a state derivative `[dq; ddq]`.
    fn offset(&self, h: f64, rate: &SystemState) -> SystemState {
        SystemState {
            q: axpy(&self.q, h, &rate.q),
            dq: axpy(&self.dq, h, &rate.dq),
        }
    }
}

fn axpy(x: &[f64], h: f64, y: &[f64]) -> Vec<f64> {
    x.iter().zip(y).map(|(x, y)| x + h * y).collect()
}

/// Source of joint torques during integration.
pub trait TorqueCommand {
    fn torque(&self, t: f64, state: &SystemState) -> Vec<f64>;
}

impl<F> TorqueCommand for F
where
    F: Fn(f64, &SystemState) -> Vec<f64>,
{
    fn torque(&self, t: f64, state: &SystemState) -> Vec<f64> {
        self(t, state)
    }
}

/// No actuation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroTorque;

impl TorqueCommand for ZeroTorque {
    fn torque(&self, _t: f64, state: &SystemState) -> Vec<f64> {
        vec![0.0; state.dof()]
    }
}

/// The same torques at every instant.
#[derive(Debug, Clone, Default)]
pub struct ConstantTorque(pub Vec<f64>);

impl TorqueCommand for ConstantTorque {
    fn torque(&self, _t: f64, _state: &SystemState) -> Vec<f64> {
        self.0.clone()
    }
}

/// Joint-space PD controller holding a set-point.
///
/// The set-point is clamped to the joint limits when the controller is
/// built, which is how the simulation keeps joints in range.
#[derive(Debug, Clone)]
pub struct JointPd {
    kp: f64,
    kd: f64,
    target: Vec<f64>,
}

impl JointPd {
    pub fn new(chain: &Chain, kp: f64, kd: f64, target: &[f64]) -> Result<Self> {
        check_len("target", chain.len(), target.len())?;
        let target = chain
            .links()
            .iter()
            .zip(target)
            .map(|(link, &q)| link.clamp(q))
            .collect();
        Ok(Self { kp, kd, target })
    }

    pub fn target(&self) -> &[f64] {
        &self.target
    }
}

impl TorqueCommand for JointPd {
    fn torque(&self, _t: f64, state: &SystemState) -> Vec<f64> {
        self.target
            .iter()
            .zip(&state.q)
            .zip(&state.dq)
            .map(|((target, q), dq)| self.kp * (target - q) - self.kd * dq)
            .collect()
    }
}

/// `f(t, X) = [dq; FD(q, dq, τ(t, X))]`.
pub fn derivative<T: TorqueCommand + ?Sized>(
    chain: &Chain,
    t: f64,
    state: &SystemState,
    torque: &T,
) -> Result<SystemState> {
    let tau = torque.torque(t, state);
    check_len("tau", chain.len(), tau.len())?;
    let ddq = dynamics::accelerations(
        chain.links(),
        &chain.external_force(),
        chain.solver(),
        &state.q,
        &state.dq,
        &tau,
    )?;
    Ok(SystemState {
        q: state.dq.clone(),
        dq: ddq,
    })
}

/// Explicit Euler, global error `O(Δt)`. Meant for comparisons.
pub fn euler_step<T: TorqueCommand + ?Sized>(
    chain: &Chain,
    t: f64,
    state: &SystemState,
    dt: f64,
    torque: &T,
) -> Result<SystemState> {
    let k1 = derivative(chain, t, state, torque)?;
    Ok(state.offset(dt, &k1))
}

/// Classical fourth-order Runge–Kutta, global error `O(Δt⁴)`.
pub fn rk4_step<T: TorqueCommand + ?Sized>(
    chain: &Chain,
    t: f64,
    state: &SystemState,
    dt: f64,
    torque: &T,
) -> Result<SystemState> {
    let half = 0.5 * dt;
    let k1 = derivative(chain, t, state, torque)?;
    let k2 = derivative(chain, t + half, &state.offset(half, &k1), torque)?;
    let k3 = derivative(chain, t + half, &state.offset(half, &k2), torque)?;
    let k4 = derivative(chain, t + dt, &state.offset(dt, &k3), torque)?;

    let sixth = dt / 6.0;
    let combine = |x: &[f64], a: &[f64], b: &[f64], c: &[f64], d: &[f64]| -> Vec<f64> {
        (0..x.len())
            .map(|i| x[i] + sixth * (a[i] + 2.0 * b[i] + 2.0 * c[i] + d[i]))
            .collect()
    };

    Ok(SystemState {
        q: combine(&state.q, &k1.q, &k2.q, &k3.q, &k4.q),
        dq: combine(&state.dq, &k1.dq, &k2.dq, &k3.dq, &k4.dq),
    })
}

/// Integration scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Method {
    Euler,
    #[default]
    RungeKutta4,
}

impl Method {
    /// Parse a method name (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "euler" => Some(Method::Euler),
            "rk4" | "runge-kutta" | "runge_kutta" => Some(Method::RungeKutta4),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Method::Euler => "euler",
            Method::RungeKutta4 => "rk4",
        }
    }

    pub fn step<T: TorqueCommand + ?Sized>(
        &self,
        chain: &Chain,
        t: f64,
        state: &SystemState,
        dt: f64,
        torque: &T,
    ) -> Result<SystemState> {
        match self {
            Method::Euler => euler_step(chain, t, state, dt, torque),
            Method::RungeKutta4 => rk4_step(chain, t, state, dt, torque),
        }
    }
}
