mod client;
mod context;
mod controller;
mod error;

pub use client::{AgentClient, HttpAgentClient};
pub use context::{AuthListeners, CourierContext};
pub use controller::{optimistic_snapshot, RejectReason, SubmissionController, SubmitOutcome};
pub use error::AgentError;
