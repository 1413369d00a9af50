use super::format_values;
use anyhow::Result;
use clap::Args;
use skelarm_core::kinematics::{forward_kinematics, jacobian};
use std::path::PathBuf;

#[derive(Args)]
pub struct FkArgs {
    /// Path to the chain configuration (TOML or JSON).
    pub config: PathBuf,

    /// Joint angles in radians, comma separated.
    ///
    /// Defaults to `simulation.q0` from the configuration.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub q: Option<Vec<f64>>,

    /// Also print the end-effector Jacobian.
    #[arg(long)]
    pub jacobian: bool,
}

impl FkArgs {
    pub fn run(&self) -> Result<()> {
        let (_, mut chain) = super::load(&self.config)?;
        if let Some(q) = &self.q {
            chain.set_q(q)?;
        }

        println!("q: {}", format_values(chain.q()));
        for (i, p) in forward_kinematics(&chain).iter().enumerate() {
            println!("joint {i}: ({:.6}, {:.6})", p.x, p.y);
        }
        let tip = chain.end_effector();
        println!("end effector: ({:.6}, {:.6})", tip.x, tip.y);
        if !chain.within_limits() {
            println!("warning: joint angles outside limits");
        }

        if self.jacobian {
            let columns = jacobian(&chain);
            let xs: Vec<f64> = columns.iter().map(|c| c[0]).collect();
            let ys: Vec<f64> = columns.iter().map(|c| c[1]).collect();
            println!("J_x: {}", format_values(&xs));
            println!("J_y: {}", format_values(&ys));
        }

        Ok(())
    }
}
