use super::format_values;
use anyhow::Result;
use clap::Args;
use skelarm_core::dynamics::{bias_forces, inverse_dynamics, mass_matrix};
use std::path::PathBuf;

#[derive(Args)]
pub struct DynamicsArgs {
    /// Path to the chain configuration (TOML or JSON).
    pub config: PathBuf,

    /// Joint angles, comma separated. Defaults to `simulation.q0`.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub q: Option<Vec<f64>>,

    /// Joint rates, comma separated. Defaults to `simulation.dq0`.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub dq: Option<Vec<f64>>,

    /// Joint accelerations, comma separated. Defaults to zeros.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub ddq: Option<Vec<f64>>,
}

impl DynamicsArgs {
    pub fn run(&self) -> Result<()> {
        let (_, mut chain) = super::load(&self.config)?;
        if let Some(q) = &self.q {
            chain.set_q(q)?;
        }
        if let Some(dq) = &self.dq {
            chain.set_dq(dq)?;
        }
        if let Some(ddq) = &self.ddq {
            chain.set_ddq(ddq)?;
        }

        let h = mass_matrix(&chain);
        println!("H:");
        for i in 0..h.dim() {
            println!("  {}", format_values(h.row(i)));
        }
        println!("b: {}", format_values(&bias_forces(&chain)));

        let tau = inverse_dynamics(&mut chain)?;
        println!("tau: {}", format_values(&tau));
        println!("kinetic energy: {:.6}", chain.kinetic_energy());

        Ok(())
    }
}
