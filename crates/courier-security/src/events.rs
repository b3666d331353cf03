use tokio::sync::mpsc;

/// One input to identity reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    /// A message posted from another browsing context (the login popup).
    Message {
        origin: String,
        payload: serde_json::Value,
    },
    /// Another tab or process changed a persisted entry.
    StorageChange { key: String, value: Option<String> },
}

/// Create the two listener handles and the single stream they feed.
///
/// The stream ends once both handles have unsubscribed or been dropped.
pub fn auth_channel() -> (MessageSubscription, StorageSubscription, AuthEventStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        MessageSubscription {
            tx: Some(tx.clone()),
        },
        StorageSubscription { tx: Some(tx) },
        AuthEventStream { rx },
    )
}

#[derive(Debug)]
pub struct MessageSubscription {
    tx: Option<mpsc::UnboundedSender<AuthEvent>>,
}

impl MessageSubscription {
    /// Forward a cross-context message. Returns `false` once unsubscribed or
    /// when nobody is listening any more.
    pub fn deliver(&self, origin: impl Into<String>, payload: serde_json::Value) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };
        tx.send(AuthEvent::Message {
            origin: origin.into(),
            payload,
        })
        .is_ok()
    }

    pub fn unsubscribe(&mut self) {
        if self.tx.take().is_some() {
            tracing::debug!("message listener unsubscribed");
        }
    }

    pub fn is_active(&self) -> bool {
        self.tx.as_ref().is_some_and(|tx| !tx.is_closed())
    }
}

#[derive(Debug)]
pub struct StorageSubscription {
    tx: Option<mpsc::UnboundedSender<AuthEvent>>,
}

impl StorageSubscription {
    pub fn deliver(&self, key: impl Into<String>, value: Option<String>) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };
        tx.send(AuthEvent::StorageChange {
            key: key.into(),
            value,
        })
        .is_ok()
    }

    pub fn unsubscribe(&mut self) {
        if self.tx.take().is_some() {
            tracing::debug!("storage listener unsubscribed");
        }
    }

    pub fn is_active(&self) -> bool {
        self.tx.as_ref().is_some_and(|tx| !tx.is_closed())
    }
}

#[derive(Debug)]
pub struct AuthEventStream {
    rx: mpsc::UnboundedReceiver<AuthEvent>,
}

impl AuthEventStream {
    pub async fn recv(&mut self) -> Option<AuthEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<AuthEvent> {
        self.rx.try_recv().ok()
    }
}
