//! Damped least squares inverse kinematics for the end effector.
//!
//! Each iteration solves `Δq = Jᵀ(JJᵀ + λ²I)⁻¹·e` with the chain's linear
//! solver, limits the step length and clamps the result to the joint limits.
//! The damping `λ` shrinks after a step that reduces the error and grows
//! after one that does not. Joints pinned at a limit and pushed further out
//! are locked out of the Jacobian so the remaining joints carry the step.
//!
//! A start that stops making progress (the stretched pose, where the
//! Jacobian loses rank, or a local minimum against the limits) is abandoned
//! and the search continues from the next point of a low-discrepancy
//! sequence over the joint limits. All starts share one iteration budget.

use crate::{
    chain::{Chain, LinkProperties, LinkState},
    error::{Error, Result, check_len},
    kinematics::{self, Point},
    linsolve::{LinearSolver, SquareMatrix},
};
use tracing::trace;

// Largest change of any joint angle in one iteration, in radians.
const MAX_STEP: f64 = 0.5;
const MIN_DAMPING: f64 = 1e-6;
const MAX_DAMPING: f64 = 1e3;
const DAMPING_FACTOR: f64 = 10.0;
// Relative error reduction an iteration needs to count as progress.
const MIN_PROGRESS: f64 = 1e-3;
// Iterations without progress before a start is abandoned.
const STALL_LIMIT: u32 = 8;

/// Solver settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IkConfig {
    /// Iteration budget shared by the warm start and every restart.
    pub max_iterations: u32,
    /// Allowed end-effector position error.
    pub tolerance: f64,
    /// Initial damping factor λ, also used after every restart.
    pub damping: f64,
}

impl Default for IkConfig {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            tolerance: 1e-8,
            damping: 1e-2,
        }
    }
}

/// A converged solve.
#[derive(Debug, Clone, PartialEq)]
pub struct IkSolution {
    pub q: Vec<f64>,
    pub iterations: u32,
    /// Final end-effector position error.
    pub residual: f64,
}

#[derive(Debug, Clone, Default)]
pub struct DlsSolver {
    config: IkConfig,
}

impl DlsSolver {
    pub fn new(config: IkConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IkConfig {
        &self.config
    }

    /// Joint angles placing the end effector at `target`, starting from `q_init`.
    ///
    /// The 2×2 systems are solved with the chain's [`LinearSolver`]; a step
    /// it reports as singular is treated like a step that made things worse.
    pub fn solve(&self, chain: &Chain, target: Point, q_init: &[f64]) -> Result<IkSolution> {
        let n = chain.len();
        check_len("q", n, q_init.len())?;
        let links = chain.links();
        let initial_damping = self.config.damping.max(MIN_DAMPING);
        let mut seeds = Seeds::new(n);

        let mut q: Vec<f64> = links
            .iter()
            .zip(q_init)
            .map(|(link, &q)| link.clamp(q))
            .collect();
        let (mut states, mut e) = evaluate(links, &q, target);
        let mut residual = norm(e);
        let mut best = residual;
        let mut lambda = initial_damping;
        let mut stalled = 0;

        for iteration in 0..self.config.max_iterations {
            if residual < self.config.tolerance {
                return Ok(IkSolution {
                    q,
                    iterations: iteration,
                    residual,
                });
            }

            let step = damped_step(chain.solver(), links, &q, &states[1..=n], e, lambda);
            let progress = match step {
                Ok(delta) => {
                    let candidate: Vec<f64> = q
                        .iter()
                        .zip(&delta)
                        .zip(links)
                        .map(|((qi, d), link)| link.clamp(qi + d))
                        .collect();
                    let (candidate_states, candidate_e) = evaluate(links, &candidate, target);
                    let candidate_residual = norm(candidate_e);
                    if candidate_residual < residual {
                        let progress = 1.0 - candidate_residual / residual;
                        q = candidate;
                        states = candidate_states;
                        e = candidate_e;
                        residual = candidate_residual;
                        Some(progress)
                    } else {
                        None
                    }
                }
                Err(Error::SingularMatrix { .. }) => None,
                Err(err) => return Err(err),
            };

            match progress {
                Some(progress) => {
                    lambda = (lambda / DAMPING_FACTOR).max(MIN_DAMPING);
                    stalled = if progress < MIN_PROGRESS { stalled + 1 } else { 0 };
                }
                None => {
                    lambda *= DAMPING_FACTOR;
                    stalled += 1;
                }
            }
            best = best.min(residual);

            if stalled > STALL_LIMIT || lambda > MAX_DAMPING {
                trace!(iteration, residual, "restarting inverse kinematics");
                q = seeds.next(links);
                (states, e) = evaluate(links, &q, target);
                residual = norm(e);
                best = best.min(residual);
                lambda = initial_damping;
                stalled = 0;
            }
        }

        if residual < self.config.tolerance {
            return Ok(IkSolution {
                q,
                iterations: self.config.max_iterations,
                residual,
            });
        }

        Err(Error::Convergence {
            iterations: self.config.max_iterations,
            residual: best,
        })
    }
}

/// Link slots at `q` and the end-effector error towards `target`.
fn evaluate(links: &[LinkProperties], q: &[f64], target: Point) -> (Vec<LinkState>, [f64; 2]) {
    let rates = vec![0.0; q.len()];
    let states = kinematics::compute(links, q, &rates, &rates);
    let tip = &states[q.len()];
    let e = [target.x - tip.x, target.y - tip.y];
    (states, e)
}

fn norm(e: [f64; 2]) -> f64 {
    e[0].hypot(e[1])
}

fn at_limit(link: &LinkProperties, q: f64, delta: f64) -> bool {
    (q <= link.qmin && delta < 0.0) || (q >= link.qmax && delta > 0.0)
}

/// `Jᵀ(JJᵀ + λ²I)⁻¹·e` over the joints that are free to move, scaled so no
/// joint moves more than [`MAX_STEP`].
fn damped_step(
    solver: &LinearSolver,
    links: &[LinkProperties],
    q: &[f64],
    slots: &[LinkState],
    e: [f64; 2],
    lambda: f64,
) -> Result<Vec<f64>> {
    let lambda2 = lambda * lambda;
    let mut locked = vec![false; q.len()];

    // each pass locks at least one more joint, or returns
    loop {
        let mut jjt = SquareMatrix::zeros(2);
        jjt[(0, 0)] = lambda2;
        jjt[(1, 1)] = lambda2;
        for (s, _) in slots.iter().zip(&locked).filter(|(_, locked)| !**locked) {
            jjt[(0, 0)] += s.jx * s.jx;
            jjt[(0, 1)] += s.jx * s.jy;
            jjt[(1, 0)] += s.jy * s.jx;
            jjt[(1, 1)] += s.jy * s.jy;
        }
        let y = solver.solve(&jjt, &e)?;

        let mut delta: Vec<f64> = slots
            .iter()
            .zip(&locked)
            .map(|(s, &locked)| if locked { 0.0 } else { s.jx * y[0] + s.jy * y[1] })
            .collect();

        let mut pushed = false;
        for (i, link) in links.iter().enumerate() {
            if !locked[i] && at_limit(link, q[i], delta[i]) {
                locked[i] = true;
                pushed = true;
            }
        }
        if pushed {
            continue;
        }

        let largest = delta.iter().fold(0.0_f64, |m, d| m.max(d.abs()));
        if largest > MAX_STEP {
            let scale = MAX_STEP / largest;
            delta.iter_mut().for_each(|d| *d *= scale);
        }
        return Ok(delta);
    }
}

/// Restart points spread over the joint limits by an additive recurrence on
/// the generalized golden ratio, the positive root of `x^(n+1) = x + 1`.
struct Seeds {
    alpha: Vec<f64>,
    k: u32,
}

impl Seeds {
    fn new(n: usize) -> Self {
        let exponent = 1.0 / (n as f64 + 1.0);
        let mut phi = 2.0_f64;
        for _ in 0..32 {
            phi = (1.0 + phi).powf(exponent);
        }
        let alpha = (1..=n).map(|i| phi.powi(-(i as i32)).fract()).collect();
        Self { alpha, k: 0 }
    }

    fn next(&mut self, links: &[LinkProperties]) -> Vec<f64> {
        self.k += 1;
        let k = f64::from(self.k);
        links
            .iter()
            .zip(&self.alpha)
            .map(|(link, alpha)| {
                let u = (0.5 + k * alpha).fract();
                link.qmin + (link.qmax - link.qmin) * u
            })
            .collect()
    }
}

/// Joint angles reaching `target`, warm-started from the chain's current pose.
///
/// The chain itself is not modified.
pub fn inverse_kinematics(chain: &Chain, target: Point) -> Result<Vec<f64>> {
    DlsSolver::default()
        .solve(chain, target, chain.q())
        .map(|solution| solution.q)
}
