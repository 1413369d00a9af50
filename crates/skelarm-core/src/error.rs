use thiserror::Error;

/// Invalid input detected while building a chain or a simulation run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("a chain needs at least one link")]
    EmptyChain,
    #[error("link {link}: {field} is not a finite number")]
    NonFinite { link: usize, field: &'static str },
    #[error("link {link}: length must be positive, got {value}")]
    NonPositiveLength { link: usize, value: f64 },
    #[error("link {link}: mass must not be negative, got {value}")]
    NegativeMass { link: usize, value: f64 },
    #[error("link {link}: inertia must not be negative, got {value}")]
    NegativeInertia { link: usize, value: f64 },
    #[error("link {link}: joint limits need qmin < qmax, got [{qmin}, {qmax}]")]
    JointLimits { link: usize, qmin: f64, qmax: f64 },
    #[error("time step must be positive and finite, got {0}")]
    TimeStep(f64),
    #[error("time span [{start}, {end}] is empty or not finite")]
    TimeSpan { start: f64, end: f64 },
    #[error("time span needs {steps} steps, more than the limit of {limit}")]
    TooManySteps { steps: f64, limit: usize },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("{what} has {actual} entries, expected {expected}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("singular matrix: pivot {pivot:e} in row {row} is below tolerance {tolerance:e}")]
    SingularMatrix {
        row: usize,
        pivot: f64,
        tolerance: f64,
    },
    #[error("inverse kinematics did not converge after {iterations} iterations (residual {residual:e})")]
    Convergence { iterations: u32, residual: f64 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Fails with [`Error::DimensionMismatch`] unless `actual == expected`.
pub(crate) fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::DimensionMismatch {
            what,
            expected,
            actual,
        })
    }
}
