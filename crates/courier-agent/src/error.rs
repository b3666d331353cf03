use courier_core::WorkflowStep;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    /// The service answered with a non-success status.
    #[error("{message}")]
    Rejected {
        status: u16,
        message: String,
        steps: Vec<WorkflowStep>,
    },
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(#[from] courier_config::ConfigError),
    #[error("auth error: {0}")]
    Auth(#[from] courier_security::AuthError),
}
