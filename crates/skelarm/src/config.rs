use anyhow::{Context, Result, bail, ensure};
use serde::{Deserialize, Serialize};
use skelarm_core::{
    Chain, ExternalForce, LinearSolver, LinkProperties, MAX_STEPS, Method, TorqueCommand,
    integrator::{ConstantTorque, JointPd, ZeroTorque},
};
use std::{f64::consts::PI, fs, path::Path};

/// A chain description plus everything needed to simulate it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Links from the base outwards
    #[serde(rename = "link", default)]
    pub links: Vec<LinkConfig>,

    #[serde(default)]
    pub simulation: SimulationConfig,

    #[serde(default)]
    pub control: ControlConfig,

    #[serde(default)]
    pub external_force: ExternalForceConfig,

    #[serde(default)]
    pub solver: SolverConfig,
}

/// One link. The center of mass and the joint limits may be given either
/// as two-element arrays or as separate scalar keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    #[serde(alias = "l")]
    pub length: f64,

    #[serde(alias = "m")]
    pub mass: f64,

    /// Rotational inertia about the center of mass
    #[serde(alias = "i")]
    pub inertia: f64,

    /// Center of mass `[rgx, rgy]` in the link frame
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub com: Option<[f64; 2]>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rgx: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rgy: Option<f64>,

    /// Joint limits `[qmin, qmax]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<[f64; 2]>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qmin: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qmax: Option<f64>,
}

impl LinkConfig {
    /// Scalar keys win over the array forms; the center of mass defaults to
    /// the middle of the link and the limits to `[-π, π]`.
    pub fn properties(&self) -> LinkProperties {
        let [com_x, com_y] = self.com.unwrap_or([self.length / 2.0, 0.0]);
        let [lo, hi] = self.limits.unwrap_or([-PI, PI]);
        LinkProperties::new(self.length, self.mass, self.inertia)
            .with_com(self.rgx.unwrap_or(com_x), self.rgy.unwrap_or(com_y))
            .with_limits(self.qmin.unwrap_or(lo), self.qmax.unwrap_or(hi))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Simulated time in seconds
    #[serde(default = "default_duration")]
    pub duration: f64,

    #[serde(default = "default_dt")]
    pub dt: f64,

    /// `rk4` or `euler`
    #[serde(default = "default_method")]
    pub method: String,

    /// Initial joint angles, zeros when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q0: Option<Vec<f64>>,

    /// Initial joint rates, zeros when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dq0: Option<Vec<f64>>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            duration: default_duration(),
            dt: default_dt(),
            method: default_method(),
            q0: None,
            dq0: None,
        }
    }
}

fn default_duration() -> f64 {
    1.0
}

fn default_dt() -> f64 {
    0.01
}

fn default_method() -> String {
    Method::default().name().to_string()
}

/// Joint torque source during simulation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ControlConfig {
    #[default]
    Zero,
    Constant {
        torque: Vec<f64>,
    },
    /// Joint-space PD towards `target` (zeros when absent)
    Pd {
        kp: f64,
        kd: f64,
        #[serde(default)]
        target: Option<Vec<f64>>,
    },
}

/// Force applied at `tip + R(θ_n)·(rx, ry)`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ExternalForceConfig {
    #[serde(default)]
    pub fx: f64,
    #[serde(default)]
    pub fy: f64,
    #[serde(default)]
    pub rx: f64,
    #[serde(default)]
    pub ry: f64,
}

impl From<ExternalForceConfig> for ExternalForce {
    fn from(c: ExternalForceConfig) -> Self {
        ExternalForce::new(c.fx, c.fy).at(c.rx, c.ry)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Relative pivot threshold for the joint-space solve
    #[serde(default = "default_pivot_tolerance")]
    pub pivot_tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            pivot_tolerance: default_pivot_tolerance(),
        }
    }
}

fn default_pivot_tolerance() -> f64 {
    LinearSolver::DEFAULT_PIVOT_TOLERANCE
}

impl Config {
    /// Load configuration from a file, auto-detecting TOML or JSON format
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        let extension = path.extension().and_then(|s| s.to_str());

        let config = match extension {
            Some("toml") => Self::from_toml(&content),
            Some("json") => Self::from_json(&content),
            _ => Self::from_toml(&content).or_else(|_| Self::from_json(&content)),
        };
        config.with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("failed to parse config as TOML")
    }

    /// Parse configuration from JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("failed to parse config as JSON")
    }

    pub fn dof(&self) -> usize {
        self.links.len()
    }

    pub fn link_properties(&self) -> Vec<LinkProperties> {
        self.links.iter().map(LinkConfig::properties).collect()
    }

    pub fn method(&self) -> Result<Method> {
        Method::parse(&self.simulation.method).with_context(|| {
            format!(
                "simulation.method must be \"rk4\" or \"euler\", got {:?}",
                self.simulation.method
            )
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.links.is_empty(), "at least one [[link]] is required");
        for (i, props) in self.link_properties().iter().enumerate() {
            props
                .validate(i)
                .with_context(|| format!("link {i} is invalid"))?;
        }

        let n = self.dof();
        let sim = &self.simulation;
        ensure!(
            sim.dt.is_finite() && sim.dt > 0.0,
            "simulation.dt must be positive, got {}",
            sim.dt
        );
        ensure!(
            sim.duration.is_finite() && sim.duration >= 0.0,
            "simulation.duration must be non-negative, got {}",
            sim.duration
        );
        ensure!(
            sim.duration / sim.dt <= MAX_STEPS as f64,
            "simulation.duration of {} needs more than {MAX_STEPS} steps of {}",
            sim.duration,
            sim.dt
        );
        self.method()?;
        check_len("simulation.q0", n, sim.q0.as_deref())?;
        check_len("simulation.dq0", n, sim.dq0.as_deref())?;

        match &self.control {
            ControlConfig::Zero => {}
            ControlConfig::Constant { torque } => {
                check_len("control.torque", n, Some(torque.as_slice()))?
            }
            ControlConfig::Pd { kp, kd, target } => {
                ensure!(
                    kp.is_finite() && kd.is_finite(),
                    "control gains must be finite"
                );
                check_len("control.target", n, target.as_deref())?;
            }
        }

        ensure!(
            self.solver.pivot_tolerance.is_finite() && self.solver.pivot_tolerance >= 0.0,
            "solver.pivot_tolerance must be non-negative"
        );

        Ok(())
    }

    /// Build the chain in its initial state.
    pub fn build_chain(&self) -> Result<Chain> {
        self.validate()?;
        let mut chain = Chain::new(self.link_properties())?
            .with_solver(LinearSolver::new(self.solver.pivot_tolerance));
        chain.set_external_force(self.external_force.into());
        if let Some(q0) = &self.simulation.q0 {
            chain.set_q(q0)?;
        }
        if let Some(dq0) = &self.simulation.dq0 {
            chain.set_dq(dq0)?;
        }
        Ok(chain)
    }

    /// Torque command for `chain`, which must have been built from this config.
    pub fn torque_command(&self, chain: &Chain) -> Result<Box<dyn TorqueCommand>> {
        Ok(match &self.control {
            ControlConfig::Zero => Box::new(ZeroTorque),
            ControlConfig::Constant { torque } => Box::new(ConstantTorque(torque.clone())),
            ControlConfig::Pd { kp, kd, target } => {
                let target = target.clone().unwrap_or_else(|| vec![0.0; chain.len()]);
                Box::new(JointPd::new(chain, *kp, *kd, &target)?)
            }
        })
    }
}

fn check_len(what: &str, expected: usize, values: Option<&[f64]>) -> Result<()> {
    match values {
        Some(v) if v.len() != expected => {
            bail!("{what} has {} entries, expected {expected}", v.len())
        }
        _ => Ok(()),
    }
}
