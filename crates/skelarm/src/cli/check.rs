use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct CheckArgs {
    /// Path to the chain configuration (TOML or JSON).
    pub config: PathBuf,
}

impl CheckArgs {
    pub fn run(&self) -> Result<()> {
        let (config, chain) = super::load(&self.config)?;

        println!(
            "{:>4} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}",
            "link", "length", "mass", "inertia", "rgx", "rgy", "qmin", "qmax"
        );
        for (i, link) in chain.links().iter().enumerate() {
            println!(
                "{:>4} {:>8.3} {:>8.3} {:>8.3} {:>8.3} {:>8.3} {:>8.3} {:>8.3}",
                i,
                link.length,
                link.mass,
                link.inertia,
                link.rgx,
                link.rgy,
                link.qmin,
                link.qmax
            );
        }

        let reach: f64 = chain.links().iter().map(|l| l.length).sum();
        println!("reach: {reach:.6}");
        println!(
            "simulation: {} for {} s, dt = {}",
            config.method()?.name(),
            config.simulation.duration,
            config.simulation.dt
        );
        println!("{} is valid", self.config.display());

        Ok(())
    }
}
