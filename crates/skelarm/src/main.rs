use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cli;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Check(args) => args.run(),
        Command::Fk(args) => args.run(),
        Command::Ik(args) => args.run(),
        Command::Dynamics(args) => args.run(),
        Command::Simulate(args) => args.run(),
    }
}

#[derive(Parser)]
#[command(name = "skelarm", about = "Planar robot arm kinematics and dynamics")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load and validate a chain configuration.
    Check(cli::check::CheckArgs),
    /// Joint positions and end effector for a set of joint angles.
    Fk(cli::fk::FkArgs),
    /// Joint angles placing the end effector at a target.
    Ik(cli::ik::IkArgs),
    /// Inertia matrix, velocity forces and inverse dynamics torques.
    Dynamics(cli::dynamics::DynamicsArgs),
    /// Integrate the equations of motion and report the trajectory.
    Simulate(cli::simulate::SimulateArgs),
}
