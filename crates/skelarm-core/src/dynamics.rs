//! Equation of motion `H(q)·q̈ + b(q, q̇) = τ + Jᴇᵀ·fᴇ` for a planar chain.
//!
//! There is no gravity term: the chain moves in a horizontal plane.
//! Inverse dynamics uses a Newton–Euler walk over the link slots; forward
//! dynamics assembles `H` and `b` and hands them to the [`LinearSolver`].

use crate::{
    chain::{Chain, ExternalForce, LinkProperties, LinkState},
    error::{Result, check_len},
    kinematics::{self, Point, point_jacobian},
    linsolve::{LinearSolver, SquareMatrix},
};

/// Joint-space inertia matrix from kinematic slots.
///
/// `H[i][j] = Σ_{k ≥ max(i,j)} m_k·(g_k − o_i)·(g_k − o_j) + I_k`, where `o_i`
/// is the proximal joint of link `i` and `g_k` the center of mass of link `k`.
pub fn inertia_matrix(links: &[LinkProperties], states: &[LinkState]) -> SquareMatrix {
    let mut h = SquareMatrix::zeros(links.len());
    for (k, link) in links.iter().enumerate() {
        let com = &states[k + 1];
        for i in 0..=k {
            let (dxi, dyi) = (com.xg - states[i].x, com.yg - states[i].y);
            for j in 0..=i {
                let (dxj, dyj) = (com.xg - states[j].x, com.yg - states[j].y);
                let v = link.mass * (dxi * dxj + dyi * dyj) + link.inertia;
                h[(i, j)] += v;
                if i != j {
                    h[(j, i)] += v;
                }
            }
        }
    }
    h
}

/// Velocity-product (Coriolis and centrifugal) generalized forces.
///
/// For each center of mass `k` the Jacobian columns and the acceleration
/// `J̇_k·q̇` are rebuilt from the slots, then projected back onto the joints:
/// `b[i] = Σ_{k ≥ i} m_k·jg_{k,i}·(J̇_k·q̇)`. Rotational terms vanish in the
/// plane because every angular Jacobian column is constant.
pub fn bias_vector(links: &[LinkProperties], states: &[LinkState], dq: &[f64]) -> Vec<f64> {
    let mut b = vec![0.0; links.len()];
    for (k, link) in links.iter().enumerate() {
        if link.mass == 0.0 {
            continue;
        }
        let com = Point::new(states[k + 1].xg, states[k + 1].yg);
        let jac = point_jacobian(states, dq, k, com);
        let [ax, ay] = jac.velocity_product;
        for (bi, col) in b.iter_mut().zip(&jac.columns).take(k + 1) {
            *bi += link.mass * (col[0] * ax + col[1] * ay);
        }
    }
    b
}

/// Where the external force acts, in the base frame.
pub fn external_point(links: &[LinkProperties], states: &[LinkState], force: &ExternalForce) -> Point {
    let tip = &states[links.len()];
    let (sin, cos) = tip.theta.sin_cos();
    Point::new(
        tip.x + force.rx * cos - force.ry * sin,
        tip.y + force.rx * sin + force.ry * cos,
    )
}

/// Joint torques equivalent to the external force, `Jᴇᵀ·fᴇ`.
pub fn external_torques(
    links: &[LinkProperties],
    states: &[LinkState],
    force: &ExternalForce,
) -> Vec<f64> {
    let n = links.len();
    if force.is_zero() {
        return vec![0.0; n];
    }
    let point = external_point(links, states, force);
    // only the Jacobian columns are needed, so rates are irrelevant
    point_jacobian(states, &vec![0.0; n], n - 1, point)
        .columns
        .iter()
        .map(|c| c[0] * force.fx + c[1] * force.fy)
        .collect()
}

/// Newton–Euler inward walk.
///
/// Expects slots from a full kinematic pass including accelerations.
/// Writes the parent force `(fx, fy)` and joint torque `tau` into every
/// link slot and returns the torques.
pub fn newton_euler(
    links: &[LinkProperties],
    states: &mut [LinkState],
    force: &ExternalForce,
) -> Vec<f64> {
    let n = links.len();
    let contact = external_point(links, states, force);
    let mut tau = vec![0.0; n];

    // force and torque the next link exerts back; zero past the tip
    let (mut fx_next, mut fy_next, mut tau_next) = (0.0, 0.0, 0.0);

    for i in (1..=n).rev() {
        let link = &links[i - 1];
        let (ox, oy) = (states[i - 1].x, states[i - 1].y);
        let s = &mut states[i];

        let (mx, my) = (link.mass * s.axg, link.mass * s.ayg);
        let (gx, gy) = (s.xg - ox, s.yg - oy);
        let (lx, ly) = (s.x - ox, s.y - oy);

        let mut fx = mx + fx_next;
        let mut fy = my + fy_next;
        let mut t =
            link.inertia * s.alpha + (gx * my - gy * mx) + tau_next + (lx * fy_next - ly * fx_next);

        if i == n {
            fx -= force.fx;
            fy -= force.fy;
            t -= (contact.x - ox) * force.fy - (contact.y - oy) * force.fx;
        }

        s.fx = fx;
        s.fy = fy;
        s.tau = t;
        tau[i - 1] = t;

        fx_next = fx;
        fy_next = fy;
        tau_next = t;
    }

    tau
}

/// Torques producing `ddq` at `(q, dq)`.
pub fn joint_torques(
    links: &[LinkProperties],
    force: &ExternalForce,
    q: &[f64],
    dq: &[f64],
    ddq: &[f64],
) -> Result<Vec<f64>> {
    let n = links.len();
    check_len("q", n, q.len())?;
    check_len("dq", n, dq.len())?;
    check_len("ddq", n, ddq.len())?;
    let mut states = kinematics::compute(links, q, dq, ddq);
    Ok(newton_euler(links, &mut states, force))
}

/// Accelerations produced by `tau` at `(q, dq)`.
pub fn accelerations(
    links: &[LinkProperties],
    force: &ExternalForce,
    solver: &LinearSolver,
    q: &[f64],
    dq: &[f64],
    tau: &[f64],
) -> Result<Vec<f64>> {
    let n = links.len();
    check_len("q", n, q.len())?;
    check_len("dq", n, dq.len())?;
    check_len("tau", n, tau.len())?;

    // accelerations do not enter H, b or Jᴇ
    let states = kinematics::compute(links, q, dq, &vec![0.0; n]);
    let mut h = inertia_matrix(links, &states);
    let b = bias_vector(links, &states, dq);
    let ext = external_torques(links, &states, force);

    let mut rhs: Vec<f64> = tau
        .iter()
        .zip(&b)
        .zip(&ext)
        .map(|((t, b), e)| t - b + e)
        .collect();
    solver.solve_in_place(&mut h, &mut rhs)?;
    Ok(rhs)
}

/// Inverse dynamics at the chain's current `(q, dq, ddq)`.
///
/// Also stores each link's parent force and joint torque in its state.
pub fn inverse_dynamics(chain: &mut Chain) -> Result<Vec<f64>> {
    let mut states = chain.slots().to_vec();
    let tau = newton_euler(chain.links(), &mut states, &chain.external_force());
    chain.install(states);
    Ok(tau)
}

/// Forward dynamics at the chain's current `(q, dq)`.
///
/// On success the chain's `ddq` is replaced by the result; on failure the
/// chain is left as it was.
pub fn forward_dynamics(chain: &mut Chain, tau: &[f64]) -> Result<Vec<f64>> {
    let ddq = accelerations(
        chain.links(),
        &chain.external_force(),
        chain.solver(),
        chain.q(),
        chain.dq(),
        tau,
    )?;
    chain.install_ddq(ddq.clone());
    Ok(ddq)
}

/// Inertia matrix at the chain's current configuration.
pub fn mass_matrix(chain: &Chain) -> SquareMatrix {
    inertia_matrix(chain.links(), chain.slots())
}

/// Velocity-product forces at the chain's current state.
pub fn bias_forces(chain: &Chain) -> Vec<f64> {
    bias_vector(chain.links(), chain.slots(), chain.dq())
}

/// `½·Σ m_k·|v_gk|² + I_k·ω_k²`.
pub fn kinetic_energy(links: &[LinkProperties], states: &[LinkState]) -> f64 {
    links
        .iter()
        .zip(&states[1..])
        .map(|(link, s)| {
            0.5 * (link.mass * (s.vxg * s.vxg + s.vyg * s.vyg) + link.inertia * s.omega * s.omega)
        })
        .sum()
}
