use crate::{AgentClient, AgentError, HttpAgentClient, SubmissionController};
use courier_config::AppConfig;
use courier_security::{
    auth_channel, AuthSessionSync, AuthSettings, MessageSubscription, SessionStore,
    StorageSubscription,
};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Root of the client: owns identity and submission state and hands them to
/// whatever renders the page.
pub struct CourierContext {
    auth: Arc<AuthSessionSync>,
    submissions: Arc<SubmissionController>,
}

/// Listener handles attached to a running [`AuthSessionSync`].
pub struct AuthListeners {
    pub messages: MessageSubscription,
    pub storage: StorageSubscription,
    pub task: JoinHandle<()>,
}

impl AuthListeners {
    /// Unsubscribe both handles and wait for the listener task to drain.
    pub async fn detach(self) {
        let Self {
            mut messages,
            mut storage,
            task,
        } = self;
        messages.unsubscribe();
        storage.unsubscribe();
        if let Err(err) = task.await {
            tracing::warn!("auth listener task ended abnormally: {err}");
        }
    }
}

impl CourierContext {
    /// Build the context and restore any persisted identity.
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn SessionStore>,
        client: Arc<dyn AgentClient>,
    ) -> Result<Self, AgentError> {
        let auth = Arc::new(AuthSessionSync::new(
            store,
            AuthSettings::from_config(config)?,
        ));
        auth.restore();

        let submissions = Arc::new(SubmissionController::new(client, auth.subscribe()));
        Ok(Self {
            auth,
            submissions,
        })
    }

    pub fn with_http_client(
        config: &AppConfig,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self, AgentError> {
        let client = HttpAgentClient::new(&config.service)?;
        Self::new(config, store, Arc::new(client))
    }

    pub fn auth(&self) -> &Arc<AuthSessionSync> {
        &self.auth
    }

    pub fn submissions(&self) -> &Arc<SubmissionController> {
        &self.submissions
    }

    /// Spawn the identity listener on the current tokio runtime.
    pub fn listen(&self) -> AuthListeners {
        let (messages, storage, events) = auth_channel();
        let auth = self.auth.clone();
        let task = tokio::spawn(async move { auth.run(events).await });
        AuthListeners {
            messages,
            storage,
            task,
        }
    }
}
