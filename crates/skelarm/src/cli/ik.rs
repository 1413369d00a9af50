use super::format_values;
use anyhow::{Context, Result};
use clap::Args;
use skelarm_core::{
    Point,
    ik::{DlsSolver, IkConfig},
};
use std::path::PathBuf;

#[derive(Args)]
pub struct IkArgs {
    /// Path to the chain configuration (TOML or JSON).
    pub config: PathBuf,

    /// Target x coordinate.
    #[arg(long, allow_hyphen_values = true)]
    pub x: f64,

    /// Target y coordinate.
    #[arg(long, allow_hyphen_values = true)]
    pub y: f64,

    /// Iterations shared by the warm start and every restart.
    #[arg(long, default_value_t = IkConfig::default().max_iterations)]
    pub max_iterations: u32,

    /// Allowed end-effector position error.
    #[arg(long, default_value_t = IkConfig::default().tolerance)]
    pub tolerance: f64,

    /// Initial damping factor of the least-squares step.
    #[arg(long, default_value_t = IkConfig::default().damping)]
    pub damping: f64,
}

impl IkArgs {
    pub fn run(&self) -> Result<()> {
        let (_, mut chain) = super::load(&self.config)?;
        let target = Point::new(self.x, self.y);

        let solver = DlsSolver::new(IkConfig {
            max_iterations: self.max_iterations,
            tolerance: self.tolerance,
            damping: self.damping,
        });
        let solution = solver
            .solve(&chain, target, chain.q())
            .with_context(|| format!("no solution reaching ({}, {})", self.x, self.y))?;
        tracing::debug!(
            iterations = solution.iterations,
            residual = solution.residual,
            "ik converged"
        );

        chain.set_q(&solution.q)?;
        let tip = chain.end_effector();
        println!("q: {}", format_values(&solution.q));
        println!("end effector: ({:.6}, {:.6})", tip.x, tip.y);
        println!(
            "iterations: {}, residual: {:.3e}",
            solution.iterations, solution.residual
        );

        Ok(())
    }
}
