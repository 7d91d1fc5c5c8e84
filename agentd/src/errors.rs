use rst_common::with_errors::thiserror::{self, Error};

#[derive(Debug, Error)]
pub enum AgentdError {
    #[error("config error: {0}")]
    ConfigError(String),

    #[error("service error: {0}")]
    ServiceError(String),

    #[error("server error: {0}")]
    ServerError(String),
}
