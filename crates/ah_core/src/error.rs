use thiserror::Error;

/// Faults reported by a controller channel.
///
/// Everything except `Disconnected` is recoverable: the loop keeps its
/// cadence, keeps the stale actuation and retries on the next tick.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActuatorError {
    #[error("Actuator timeout after {waited_ms} ms")]
    Timeout { waited_ms: u64 },

    #[error("Actuator not ready")]
    NotReady,

    #[error("Actuator not initialized")]
    NotInitialized,

    #[error("Actuator protocol error: {0}")]
    Protocol(String),

    #[error("Actuator disconnected: {0}")]
    Disconnected(String),
}

impl ActuatorError {
    pub fn is_recoverable(&self) -> bool {
        match self {
            ActuatorError::Timeout { .. } => true,
            ActuatorError::NotReady => true,
            ActuatorError::Protocol(_) => true,
            // Retried by re-initializing on the next tick
            ActuatorError::NotInitialized => true,
            ActuatorError::Disconnected(_) => false,
        }
    }
}

/// Fatal errors: the session cannot start or has to stop.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid table geometry: {0}")]
    InvalidTableGeometry(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Actuator channel lost: {0}")]
    ActuatorLost(String),
}

impl From<validator::ValidationErrors> for CoreError {
    fn from(err: validator::ValidationErrors) -> Self {
        CoreError::InvalidConfig(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
