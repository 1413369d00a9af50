use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use xshell::{Shell, cmd};

#[derive(Args)]
pub struct Demos {
    /// Directory holding the demo configurations
    #[arg(long, default_value = "demos")]
    dir: PathBuf,

    /// Where trajectories are written
    #[arg(long, default_value = "target/demos")]
    output: PathBuf,
}

impl Default for Demos {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("demos"),
            output: PathBuf::from("target/demos"),
        }
    }
}

impl Demos {
    pub fn run(&self, sh: &Shell) -> Result<()> {
        let mut configs: Vec<PathBuf> = sh
            .read_dir(&self.dir)
            .with_context(|| format!("failed to list {}", self.dir.display()))?
            .into_iter()
            .filter(|p| matches!(p.extension().and_then(|e| e.to_str()), Some("toml" | "json")))
            .collect();
        configs.sort();

        if configs.is_empty() {
            anyhow::bail!("no demo configurations found in {}", self.dir.display());
        }

        cmd!(sh, "cargo build -q -p skelarm").run()?;
        let skelarm = sh.current_dir().join("target/debug/skelarm");
        sh.create_dir(&self.output)?;

        for config in &configs {
            let name = config.file_stem().and_then(|s| s.to_str()).unwrap_or("demo");
            let trajectory = self.output.join(format!("{name}.json"));
            eprintln!("Simulating {}...", config.display());
            cmd!(sh, "{skelarm} check {config}").run()?;
            cmd!(sh, "{skelarm} simulate {config} --output {trajectory}").run()?;
        }

        eprintln!("{} demos simulated", configs.len());
        Ok(())
    }
}
