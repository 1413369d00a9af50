use anyhow::Result;
use xshell::{Shell, cmd};

/// Run rustfmt check (does not modify files)
pub fn run_fmt_check(sh: &Shell) -> Result<()> {
    eprintln!("Running cargo fmt check...");
    cmd!(sh, "cargo fmt --all -- --check").run()?;
    Ok(())
}

/// Apply rustfmt to all files
pub fn run_fmt(sh: &Shell) -> Result<()> {
    eprintln!("Applying cargo fmt...");
    cmd!(sh, "cargo fmt --all").run()?;
    Ok(())
}

/// Run clippy with all warnings treated as errors
pub fn run_clippy(sh: &Shell) -> Result<()> {
    eprintln!("Running cargo clippy...");
    cmd!(sh, "cargo clippy --all-targets --workspace -- -D warnings").run()?;
    Ok(())
}

/// Run the test suite, forwarding extra arguments to `cargo test`
pub fn run_tests(sh: &Shell, release: bool, args: &[String]) -> Result<()> {
    eprintln!("Running cargo test...");
    let profile = if release { "release" } else { "dev" };
    cmd!(sh, "cargo test --workspace --profile {profile} {args...}").run()?;
    Ok(())
}
