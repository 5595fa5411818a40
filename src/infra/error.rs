use thiserror::Error;

/// Failures raised while wiring up or running the infrastructure layer:
/// filesystem access, the database pool, telemetry, and settings.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("filesystem failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("database failure: {message}")]
    Database { message: String },
    #[error("could not install telemetry: {0}")]
    Telemetry(String),
    #[error("bad configuration: {message}")]
    Configuration { message: String },
}

impl InfraError {
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}
