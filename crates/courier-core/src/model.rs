use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    #[default]
    Idle,
    InProgress,
    Completed,
    Error,
}

impl WorkflowStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::InProgress => "In progress",
            Self::Completed => "Completed",
            Self::Error => "Error",
        }
    }
}

/// Stable key of one pipeline stage, as it appears in step `name` fields.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StageKey {
    Input,
    Processing,
    Sending,
    Completed,
}

impl StageKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Input => "Input",
            Self::Processing => "Processing",
            Self::Sending => "Sending",
            Self::Completed => "Completed",
        }
    }
}

/// Stage status as reported by the automation service or synthesized locally.
///
/// `name` stays a plain string: the service is trusted as-is, and names that
/// match no stage are carried along and never rendered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkflowStep {
    pub name: String,
    pub status: WorkflowStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl WorkflowStep {
    pub fn new(key: StageKey, status: WorkflowStatus) -> Self {
        Self {
            name: key.as_str().to_string(),
            status,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn is_stage(&self, key: StageKey) -> bool {
        self.name == key.as_str()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmailDraft {
    pub recipient_email: String,
    #[serde(default)]
    pub recipient_name: Option<String>,
    pub subject: String,
    pub body: String,
}

impl EmailDraft {
    /// Body split into display lines. The body itself is never rewritten.
    pub fn body_lines(&self) -> Vec<&str> {
        self.body.lines().collect()
    }
}

/// Identity and credentials delivered by the login flow.
///
/// Only `email` carries meaning here; every other field is passed through
/// untouched.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AuthPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_seconds"
    )]
    pub expires_in: Option<u64>,
}

impl std::fmt::Debug for AuthPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("AuthPayload")
            .field("email", &self.email)
            .field("name", &self.name)
            .field("picture", &self.picture)
            .field("id_token", &redact(&self.id_token))
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

impl AuthPayload {
    /// Parse a payload from a JSON value. Anything other than a JSON object is
    /// structurally invalid.
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        if !value.is_object() {
            return Err(serde::de::Error::custom("auth payload must be a JSON object"));
        }
        serde_json::from_value(value)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        Self::from_value(serde_json::from_str(raw)?)
    }

    /// The non-empty email that makes this payload an identity.
    pub fn identity_email(&self) -> Option<&str> {
        self.email.as_deref().filter(|email| !email.trim().is_empty())
    }

    pub fn has_identity(&self) -> bool {
        self.identity_email().is_some()
    }
}

fn lenient_seconds<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Seconds {
        Number(u64),
        Text(String),
    }

    match Option::<Seconds>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Seconds::Number(secs)) => Ok(Some(secs)),
        Some(Seconds::Text(text)) => text
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentRunRequest {
    pub instruction: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AgentRunResponse {
    #[serde(default)]
    pub status: WorkflowStatus,
    #[serde(default)]
    pub message: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub steps: Vec<WorkflowStep>,
    #[serde(default)]
    pub generated_email: Option<EmailDraft>,
}

/// What can be salvaged from a non-success response body. Every field is
/// optional since the body may not follow the schema at all.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
pub struct AgentFailureBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub steps: Vec<WorkflowStep>,
}

#[derive(Deserialize)]
struct FailureMessage {
    #[serde(default)]
    message: Option<String>,
}

impl AgentFailureBody {
    /// Parse leniently: off-schema steps are dropped, but a usable message
    /// is still kept.
    pub fn from_slice(body: &[u8]) -> Self {
        if let Ok(body) = serde_json::from_slice::<Self>(body) {
            return body;
        }
        let message = serde_json::from_slice::<FailureMessage>(body)
            .ok()
            .and_then(|body| body.message);
        Self {
            message,
            steps: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
pub struct SubmissionState {
    pub instruction: String,
    pub in_flight: bool,
    pub last_error: Option<String>,
    pub current_status: WorkflowStatus,
    pub generated_email: Option<EmailDraft>,
    pub steps: Vec<WorkflowStep>,
}
