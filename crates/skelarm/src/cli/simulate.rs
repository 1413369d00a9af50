use super::format_values;
use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use skelarm_core::{Method, Trajectory, integrate_with};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Args)]
pub struct SimulateArgs {
    /// Path to the chain configuration (TOML or JSON).
    pub config: PathBuf,

    /// Simulated time in seconds. Overrides `simulation.duration`.
    #[arg(long)]
    pub duration: Option<f64>,

    /// Step size. Overrides `simulation.dt`.
    #[arg(long)]
    pub dt: Option<f64>,

    /// `rk4` or `euler`. Overrides `simulation.method`.
    #[arg(long, value_parser = parse_method)]
    pub method: Option<Method>,

    /// Write the sampled trajectory here as JSON.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

fn parse_method(s: &str) -> Result<Method, String> {
    Method::parse(s).ok_or_else(|| format!("unknown method {s:?}, expected rk4 or euler"))
}

/// Trajectory file layout.
#[derive(Serialize)]
struct TrajectoryRecord<'a> {
    method: &'static str,
    dt: f64,
    time: &'a [f64],
    q: &'a [Vec<f64>],
    dq: &'a [Vec<f64>],
}

impl SimulateArgs {
    pub fn run(&self) -> Result<()> {
        let (config, mut chain) = super::load(&self.config)?;
        let duration = self.duration.unwrap_or(config.simulation.duration);
        let dt = self.dt.unwrap_or(config.simulation.dt);
        let method = match self.method {
            Some(method) => method,
            None => config.method()?,
        };
        let torque = config.torque_command(&chain)?;

        let initial_energy = chain.kinetic_energy();
        tracing::info!(duration, dt, method = method.name(), "starting simulation");
        let trajectory = integrate_with(&mut chain, (0.0, duration), torque.as_ref(), dt, method)
            .context("simulation failed")?;

        println!("samples: {}", trajectory.len());
        println!("q: {}", format_values(chain.q()));
        println!("dq: {}", format_values(chain.dq()));
        let tip = chain.end_effector();
        println!("end effector: ({:.6}, {:.6})", tip.x, tip.y);
        println!(
            "kinetic energy: {:.6} -> {:.6}",
            initial_energy,
            chain.kinetic_energy()
        );
        if !chain.within_limits() {
            println!("warning: final joint angles outside limits");
        }

        if let Some(output) = &self.output {
            write_trajectory(output, method, dt, &trajectory)?;
            println!("Wrote trajectory to {}", output.display());
        }

        Ok(())
    }
}

fn write_trajectory(path: &Path, method: Method, dt: f64, trajectory: &Trajectory) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory {}", parent.display()))?;
    }

    let record = TrajectoryRecord {
        method: method.name(),
        dt,
        time: &trajectory.times,
        q: &trajectory.q,
        dq: &trajectory.dq,
    };
    let json = serde_json::to_string_pretty(&record).context("failed to encode trajectory")?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
