//! Drives the integrator across a time span.

use crate::{
    chain::Chain,
    dynamics,
    error::{ConfigurationError, Result},
    integrator::{Method, SystemState, TorqueCommand},
};
use tracing::{debug, trace};

// Remainders shorter than this fraction of a step are folded into the last step.
const STEP_SLACK: f64 = 1e-9;

/// Most steps a single run may take. Every step is recorded in the
/// [`Trajectory`], so longer runs have to be split up.
pub const MAX_STEPS: usize = 10_000_000;

/// Sampled `q` and `dq` over time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trajectory {
    pub times: Vec<f64>,
    pub q: Vec<Vec<f64>>,
    pub dq: Vec<Vec<f64>>,
}

impl Trajectory {
    fn with_capacity(samples: usize) -> Self {
        Self {
            times: Vec::with_capacity(samples),
            q: Vec::with_capacity(samples),
            dq: Vec::with_capacity(samples),
        }
    }

    fn push(&mut self, t: f64, state: &SystemState) {
        self.times.push(t);
        self.q.push(state.q.clone());
        self.dq.push(state.dq.clone());
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Final sample, if any.
    pub fn last(&self) -> Option<(f64, SystemState)> {
        let t = *self.times.last()?;
        let q = self.q.last()?.clone();
        let dq = self.dq.last()?.clone();
        Some((t, SystemState { q, dq }))
    }
}

fn check_step(dt: f64) -> Result<()> {
    if dt.is_finite() && dt > 0.0 {
        Ok(())
    } else {
        Err(ConfigurationError::TimeStep(dt).into())
    }
}

/// Step sizes covering `[start, end]` with steps of at most `dt`.
fn step_plan(start: f64, end: f64, dt: f64) -> Result<Vec<f64>> {
    check_step(dt)?;
    if !(start.is_finite() && end.is_finite()) || end < start {
        return Err(ConfigurationError::TimeSpan { start, end }.into());
    }
    let span = end - start;
    let steps = (span / dt + STEP_SLACK).ceil();
    if steps > MAX_STEPS as f64 {
        return Err(ConfigurationError::TooManySteps {
            steps,
            limit: MAX_STEPS,
        }
        .into());
    }
    let full = (span / dt + STEP_SLACK).floor() as usize;
    let mut plan = vec![dt; full];
    let rest = span - full as f64 * dt;
    if rest > STEP_SLACK * dt {
        plan.push(rest);
    } else if let Some(last) = plan.last_mut() {
        // absorb rounding so the final sample lands on `end`
        *last += rest;
    }
    Ok(plan)
}

fn run_plan<T: TorqueCommand + ?Sized>(
    chain: &Chain,
    start: f64,
    plan: &[f64],
    method: Method,
    torque: &T,
) -> Result<(Trajectory, SystemState)> {
    let mut trajectory = Trajectory::with_capacity(plan.len() + 1);
    let mut state = chain.state();
    let mut t = start;
    trajectory.push(t, &state);

    for (i, &h) in plan.iter().enumerate() {
        state = method.step(chain, t, &state, h, torque)?;
        t = if i + 1 == plan.len() {
            start + plan.iter().sum::<f64>()
        } else {
            t + h
        };
        trace!(t, q = ?state.q, "step");
        trajectory.push(t, &state);
    }
    Ok((trajectory, state))
}

/// Write the final state back together with the acceleration it implies.
fn commit<T: TorqueCommand + ?Sized>(
    chain: &mut Chain,
    t: f64,
    state: &SystemState,
    torque: &T,
) -> Result<()> {
    let tau = torque.torque(t, state);
    let ddq = dynamics::accelerations(
        chain.links(),
        &chain.external_force(),
        chain.solver(),
        &state.q,
        &state.dq,
        &tau,
    )?;
    chain.set_state(state)?;
    chain.set_ddq(&ddq)
}

/// Integrate with RK4 over `time_span`.
///
/// The first sample is the chain's current state at `time_span.0`; the last
/// lands on `time_span.1`. On success the chain holds the final state; on
/// failure it is unchanged.
pub fn integrate<T: TorqueCommand + ?Sized>(
    chain: &mut Chain,
    time_span: (f64, f64),
    torque: &T,
    dt: f64,
) -> Result<Trajectory> {
    integrate_with(chain, time_span, torque, dt, Method::RungeKutta4)
}

/// [`integrate`] with an explicit scheme.
pub fn integrate_with<T: TorqueCommand + ?Sized>(
    chain: &mut Chain,
    time_span: (f64, f64),
    torque: &T,
    dt: f64,
    method: Method,
) -> Result<Trajectory> {
    let (start, end) = time_span;
    let plan = step_plan(start, end, dt)?;
    debug!(
        start,
        end,
        dt,
        steps = plan.len(),
        method = method.name(),
        "integrating"
    );
    let (trajectory, state) = run_plan(chain, start, &plan, method, torque)?;
    commit(chain, end, &state, torque)?;
    Ok(trajectory)
}

/// A chain together with the torque command driving it.
pub struct Simulator<T> {
    chain: Chain,
    torque: T,
    method: Method,
    dt: f64,
    time: f64,
}

impl<T: TorqueCommand> Simulator<T> {
    pub fn new(chain: Chain, torque: T, dt: f64) -> Result<Self> {
        check_step(dt)?;
        Ok(Self {
            chain,
            torque,
            method: Method::default(),
            dt,
            time: 0.0,
        })
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// For direct state assignment between runs.
    pub fn chain_mut(&mut self) -> &mut Chain {
        &mut self.chain
    }

    pub fn into_chain(self) -> Chain {
        self.chain
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Advance by one step of `dt`.
    pub fn step(&mut self) -> Result<()> {
        let state = self
            .method
            .step(&self.chain, self.time, &self.chain.state(), self.dt, &self.torque)?;
        let t = self.time + self.dt;
        commit(&mut self.chain, t, &state, &self.torque)?;
        self.time = t;
        Ok(())
    }

    /// Advance by `duration`, recording every step.
    pub fn run(&mut self, duration: f64) -> Result<Trajectory> {
        let end = self.time + duration;
        let plan = step_plan(self.time, end, self.dt)?;
        debug!(
            start = self.time,
            end,
            steps = plan.len(),
            method = self.method.name(),
            "running simulation"
        );
        let (trajectory, state) = run_plan(&self.chain, self.time, &plan, self.method, &self.torque)?;
        commit(&mut self.chain, end, &state, &self.torque)?;
        self.time = end;
        Ok(trajectory)
    }
}
