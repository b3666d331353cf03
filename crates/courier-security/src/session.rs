use crate::{
    AuthError, AuthEvent, AuthEventStream, PopupFeatures, SessionStore, WindowHost, POPUP_NAME,
};
use courier_config::AppConfig;
use courier_core::AuthPayload;
use std::sync::Arc;
use tokio::sync::watch;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSettings {
    pub session_key: String,
    /// Serialized origin messages must come from, e.g. `http://localhost:8000`.
    pub service_origin: String,
    pub login_url: Url,
    pub popup_width: u32,
    pub popup_height: u32,
}

impl AuthSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, AuthError> {
        Ok(Self {
            session_key: config.session.storage_key.clone(),
            service_origin: config.service.origin()?,
            login_url: config.service.login_url()?,
            popup_width: config.session.popup_width,
            popup_height: config.session.popup_height,
        })
    }
}

/// What the rest of the client sees of authentication.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthSnapshot {
    pub identity: Option<AuthPayload>,
    pub error: Option<String>,
}

/// Keeps one authoritative identity, fed by the persisted store, login
/// messages and cross-tab storage changes.
pub struct AuthSessionSync {
    store: Arc<dyn SessionStore>,
    settings: AuthSettings,
    state: watch::Sender<AuthSnapshot>,
}

impl AuthSessionSync {
    pub fn new(store: Arc<dyn SessionStore>, settings: AuthSettings) -> Self {
        let (state, _) = watch::channel(AuthSnapshot::default());
        Self {
            store,
            settings,
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.state.borrow().clone()
    }

    pub fn identity(&self) -> Option<AuthPayload> {
        self.state.borrow().identity.clone()
    }

    /// Publish whatever valid payload the store already holds.
    ///
    /// Missing, unreadable or malformed entries leave the state untouched.
    pub fn restore(&self) -> bool {
        let raw = match self.store.get(&self.settings.session_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return false,
            Err(err) => {
                tracing::warn!("failed to read persisted auth payload: {err}");
                return false;
            }
        };

        match AuthPayload::from_json_str(&raw) {
            Ok(payload) if payload.has_identity() => {
                tracing::info!(signed_in = true, "restored persisted identity");
                self.publish(payload);
                true
            }
            Ok(_) => {
                tracing::warn!("persisted auth payload has no email; ignoring");
                false
            }
            Err(err) => {
                tracing::warn!("persisted auth payload is malformed: {err}");
                false
            }
        }
    }

    /// Accept a login result posted by the service's own origin.
    pub fn on_external_message(&self, origin: &str, payload: serde_json::Value) -> bool {
        if origin != self.settings.service_origin {
            tracing::debug!(%origin, "ignoring message from foreign origin");
            return false;
        }

        let payload = match AuthPayload::from_value(payload) {
            Ok(payload) if payload.has_identity() => payload,
            Ok(_) => {
                tracing::debug!("ignoring login message without email");
                return false;
            }
            Err(err) => {
                tracing::warn!("login message payload is malformed: {err}");
                return false;
            }
        };

        match serde_json::to_string(&payload) {
            Ok(raw) => {
                if let Err(err) = self.store.set(&self.settings.session_key, &raw) {
                    tracing::warn!("failed to persist auth payload: {err}");
                }
            }
            Err(err) => tracing::warn!("failed to serialize auth payload: {err}"),
        }

        tracing::info!(signed_in = true, "signed in from login popup");
        self.publish(payload);
        true
    }

    /// Accept an identity another tab persisted. The store already holds it.
    ///
    /// A value equal to the current identity (this process's own write read
    /// back) is accepted without publishing again.
    pub fn on_cross_tab_change(&self, key: &str, raw_value: Option<&str>) -> bool {
        if key != self.settings.session_key {
            return false;
        }
        let Some(raw) = raw_value else {
            return false;
        };

        match AuthPayload::from_json_str(raw) {
            Ok(payload) if payload.has_identity() => {
                if self.state.borrow().identity.as_ref() == Some(&payload) {
                    return true;
                }
                tracing::info!(signed_in = true, "identity changed in another tab");
                self.publish(payload);
                true
            }
            Ok(_) => false,
            Err(err) => {
                tracing::warn!("cross-tab auth payload is malformed: {err}");
                false
            }
        }
    }

    pub fn handle_event(&self, event: AuthEvent) -> bool {
        match event {
            AuthEvent::Message { origin, payload } => self.on_external_message(&origin, payload),
            AuthEvent::StorageChange { key, value } => {
                self.on_cross_tab_change(&key, value.as_deref())
            }
        }
    }

    /// Apply events until every listener handle is gone.
    pub async fn run(&self, mut events: AuthEventStream) {
        while let Some(event) = events.recv().await {
            self.handle_event(event);
        }
        tracing::debug!("auth listeners detached");
    }

    /// Open the login popup and return right away. The result arrives later
    /// as a message.
    pub fn initiate_connect(&self, host: &dyn WindowHost) -> Result<(), AuthError> {
        let features = PopupFeatures::centered(
            host.frame(),
            self.settings.popup_width,
            self.settings.popup_height,
        );

        let Some(mut popup) = host.open_popup(&self.settings.login_url, POPUP_NAME, &features)
        else {
            let err = AuthError::PopupBlocked;
            tracing::warn!("login popup was blocked");
            self.state.send_modify(|state| state.error = Some(err.to_string()));
            return Err(err);
        };

        popup.focus();
        Ok(())
    }

    fn publish(&self, payload: AuthPayload) {
        self.state.send_modify(|state| {
            state.identity = Some(payload);
            state.error = None;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth_channel, MemoryStore, PopupWindow, WindowFrame};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const KEY: &str = "courier.auth";
    const ORIGIN: &str = "http://localhost:8000";

    fn settings() -> AuthSettings {
        AuthSettings::from_config(&AppConfig::default()).expect("settings")
    }

    fn session(store: &MemoryStore) -> AuthSessionSync {
        AuthSessionSync::new(Arc::new(store.clone()), settings())
    }

    fn ada() -> serde_json::Value {
        serde_json::json!({
            "email": "ada@example.com",
            "name": "Ada Lovelace",
            "access_token": "ya29.token",
            "expires_in": 3599
        })
    }

    #[test]
    fn restore_publishes_persisted_identity() {
        let store = MemoryStore::new();
        store.set(KEY, &ada().to_string()).expect("seed");

        let auth = session(&store);
        assert!(auth.restore());
        assert_eq!(
            auth.identity().and_then(|identity| identity.name),
            Some("Ada Lovelace".to_string())
        );
    }

    #[test]
    fn restore_ignores_malformed_entries() {
        for raw in ["{oops", "[1,2]", r#"{"email": 42}"#, r#"{"name":"No Email"}"#] {
            let store = MemoryStore::new();
            store.set(KEY, raw).expect("seed");

            let auth = session(&store);
            assert!(!auth.restore(), "accepted {raw}");
            assert_eq!(auth.snapshot(), AuthSnapshot::default());
        }
    }

    #[test]
    fn message_from_service_origin_is_published_and_persisted() {
        let store = MemoryStore::new();
        let auth = session(&store);

        assert!(auth.on_external_message(ORIGIN, ada()));
        assert_eq!(
            auth.identity().and_then(|identity| identity.email),
            Some("ada@example.com".to_string())
        );

        let persisted = store.get(KEY).expect("get").expect("persisted");
        let persisted = AuthPayload::from_json_str(&persisted).expect("parse");
        assert_eq!(persisted.access_token.as_deref(), Some("ya29.token"));
    }

    #[test]
    fn message_from_other_origin_is_ignored() {
        let store = MemoryStore::new();
        let auth = session(&store);

        for origin in ["https://evil.example", "http://localhost:8001", "http://localhost:8000/"] {
            assert!(!auth.on_external_message(origin, ada()));
        }
        assert_eq!(auth.snapshot(), AuthSnapshot::default());
        assert_eq!(store.get(KEY).expect("get"), None);
    }

    #[test]
    fn message_without_email_is_ignored() {
        let store = MemoryStore::new();
        let auth = session(&store);

        assert!(!auth.on_external_message(ORIGIN, serde_json::json!({"email": ""})));
        assert!(!auth.on_external_message(ORIGIN, serde_json::json!("ada@example.com")));
        assert_eq!(auth.identity(), None);
    }

    #[test]
    fn cross_tab_change_publishes_without_writing() {
        let store = MemoryStore::new();
        let auth = session(&store);

        assert!(auth.on_cross_tab_change(KEY, Some(&ada().to_string())));
        assert!(auth.identity().is_some());
        assert_eq!(store.get(KEY).expect("get"), None);
    }

    #[test]
    fn cross_tab_change_filters_key_and_payload() {
        let store = MemoryStore::new();
        let auth = session(&store);

        assert!(!auth.on_cross_tab_change("theme", Some(&ada().to_string())));
        assert!(!auth.on_cross_tab_change(KEY, None));
        assert!(!auth.on_cross_tab_change(KEY, Some("not json")));
        assert!(!auth.on_cross_tab_change(KEY, Some(r#"{"email":""}"#)));
        assert_eq!(auth.identity(), None);
    }

    #[test]
    fn own_write_read_back_does_not_republish() {
        let store = MemoryStore::new();
        let auth = session(&store);
        let mut identity = auth.subscribe();

        assert!(auth.on_external_message(ORIGIN, ada()));
        identity.borrow_and_update();

        let written = store.get(KEY).expect("get").expect("persisted");
        assert!(auth.on_cross_tab_change(KEY, Some(&written)));
        assert!(!identity.has_changed().expect("sender alive"));

        assert!(auth.on_cross_tab_change(KEY, Some(r#"{"email":"grace@example.com"}"#)));
        assert!(identity.has_changed().expect("sender alive"));
    }

    #[test]
    fn newer_payload_overwrites_identity() {
        let store = MemoryStore::new();
        let auth = session(&store);

        auth.on_external_message(ORIGIN, ada());
        auth.on_cross_tab_change(KEY, Some(r#"{"email":"grace@example.com"}"#));
        assert_eq!(
            auth.identity().and_then(|identity| identity.email),
            Some("grace@example.com".to_string())
        );
    }

    struct FakeHost {
        allow: bool,
        opened: Mutex<Vec<(String, String, PopupFeatures)>>,
        focused: Arc<AtomicUsize>,
    }

    struct FakePopup(Arc<AtomicUsize>);

    impl PopupWindow for FakePopup {
        fn focus(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl FakeHost {
        fn new(allow: bool) -> Self {
            Self {
                allow,
                opened: Mutex::new(Vec::new()),
                focused: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl WindowHost for FakeHost {
        fn frame(&self) -> WindowFrame {
            WindowFrame {
                x: 0,
                y: 0,
                width: 1500,
                height: 1000,
            }
        }

        fn open_popup(
            &self,
            url: &Url,
            name: &str,
            features: &PopupFeatures,
        ) -> Option<Box<dyn PopupWindow>> {
            self.opened
                .lock()
                .expect("lock")
                .push((url.to_string(), name.to_string(), *features));
            self.allow
                .then(|| Box::new(FakePopup(self.focused.clone())) as Box<dyn PopupWindow>)
        }
    }

    #[test]
    fn connect_opens_and_focuses_centered_popup() {
        let auth = session(&MemoryStore::new());
        let host = FakeHost::new(true);

        auth.initiate_connect(&host).expect("popup opened");

        let opened = host.opened.lock().expect("lock");
        assert_eq!(opened.len(), 1);
        assert_eq!(opened[0].0, "http://localhost:8000/auth/google/login");
        assert_eq!(opened[0].1, POPUP_NAME);
        assert_eq!(
            opened[0].2,
            PopupFeatures {
                width: 500,
                height: 600,
                left: 500,
                top: 200,
            }
        );
        assert_eq!(host.focused.load(Ordering::SeqCst), 1);
        assert_eq!(auth.snapshot().error, None);
    }

    #[test]
    fn blocked_popup_surfaces_error_until_next_identity() {
        let store = MemoryStore::new();
        store.set(KEY, &ada().to_string()).expect("seed");
        let auth = session(&store);
        auth.restore();

        let err = auth
            .initiate_connect(&FakeHost::new(false))
            .expect_err("blocked");
        assert!(matches!(err, AuthError::PopupBlocked));

        let snapshot = auth.snapshot();
        assert!(snapshot.identity.is_some());
        assert_eq!(snapshot.error, Some(err.to_string()));

        auth.on_external_message(ORIGIN, ada());
        assert_eq!(auth.snapshot().error, None);
    }

    #[tokio::test]
    async fn run_applies_events_until_listeners_detach() {
        let store = MemoryStore::new();
        let auth = session(&store);
        let mut identity = auth.subscribe();
        let (messages, mut storage, stream) = auth_channel();

        messages.deliver("https://evil.example", ada());
        storage.deliver(KEY, Some(r#"{"email":"grace@example.com"}"#.to_string()));
        drop(messages);
        storage.unsubscribe();

        auth.run(stream).await;

        assert!(identity.has_changed().expect("sender alive"));
        assert_eq!(
            identity
                .borrow_and_update()
                .identity
                .as_ref()
                .and_then(|identity| identity.email.clone()),
            Some("grace@example.com".to_string())
        );
    }
}
