//! Kinematics and dynamics of planar open serial chains.
//!
//! This crate is the numerical core shared by the `skelarm` tooling. It
//! performs no I/O and keeps no state between calls beyond what a
//! [`Chain`] owns.

pub mod chain;
pub mod dynamics;
pub mod error;
pub mod ik;
pub mod integrator;
pub mod kinematics;
pub mod linsolve;
pub mod simulator;

pub use chain::{Chain, ExternalForce, LinkProperties, LinkState};
pub use dynamics::{forward_dynamics, inverse_dynamics};
pub use error::{ConfigurationError, Error, Result};
pub use ik::inverse_kinematics;
pub use integrator::{Method, SystemState, TorqueCommand};
pub use kinematics::{Point, end_effector, forward_kinematics};
pub use linsolve::{LinearSolver, SquareMatrix};
pub use simulator::{MAX_STEPS, Simulator, Trajectory, integrate, integrate_with};
