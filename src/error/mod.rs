use thiserror::Error;

/// Errors raised while building the models, integrating them or writing reports.
#[derive(Error, Debug)]
pub enum EmissionError {
    /// A physical parameter is non-finite or outside its domain
    #[error("Invalid parameter '{name}' = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    /// The integrator gave up before reaching the requested time
    #[error("The ODE solver did not converge after t = {t} with relative tolerance {rel_tol}: {message}")]
    NonConvergence {
        t: f64,
        rel_tol: f64,
        message: String,
    },

    /// The integrator stopped for a reason other than reaching a stop time
    #[error("The ODE solver stopped unexpectedly at t = {t}")]
    UnexpectedStop { t: f64 },

    /// The time grid cannot be built or does not match the returned series
    #[error("Invalid time grid: {0}")]
    InvalidGrid(String),

    #[error("Solver error: {0}")]
    Solver(#[from] diffsol::error::DiffsolError),

    #[error("Error writing report: {0}")]
    Report(#[from] csv::Error),

    #[error("Error reading scenario file: {0}")]
    Config(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
