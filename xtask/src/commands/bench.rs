use anyhow::Result;
use clap::Args;
use xshell::{Shell, cmd};

#[derive(Args)]
pub struct Bench {
    /// Only run benchmarks whose name matches this filter
    filter: Option<String>,
}

impl Bench {
    pub fn run(&self, sh: &Shell) -> Result<()> {
        let filter = self.filter.as_deref();
        cmd!(sh, "cargo bench -p skelarm-core --bench dynamics -- {filter...}").run()?;
        Ok(())
    }
}
