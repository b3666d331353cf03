use crate::AgentError;
use async_trait::async_trait;
use courier_config::ServiceConfig;
use courier_core::{AgentFailureBody, AgentRunRequest, AgentRunResponse};
use url::Url;

/// The remote automation service.
#[async_trait]
pub trait AgentClient: Send + Sync {
    /// Run one instruction. Non-success responses come back as
    /// [`AgentError::Rejected`].
    async fn run(&self, request: &AgentRunRequest) -> Result<AgentRunResponse, AgentError>;
}

#[derive(Debug, Clone)]
pub struct HttpAgentClient {
    endpoint: Url,
    http: reqwest::Client,
}

impl HttpAgentClient {
    pub fn new(service: &ServiceConfig) -> Result<Self, AgentError> {
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self {
            endpoint: service.agent_run_url()?,
            http,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl AgentClient for HttpAgentClient {
    async fn run(&self, request: &AgentRunRequest) -> Result<AgentRunResponse, AgentError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let failure = AgentFailureBody::from_slice(&body);
            let message = failure
                .message
                .filter(|message| !message.trim().is_empty())
                .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));
            tracing::warn!(status = status.as_u16(), "agent run rejected: {message}");
            return Err(AgentError::Rejected {
                status: status.as_u16(),
                message,
                steps: failure.steps,
            });
        }

        Ok(serde_json::from_slice(&body)?)
    }
}
