use crate::{AgentClient, AgentError};
use courier_core::{
    reconcile, AgentRunRequest, AgentRunResponse, RenderStep, StageKey, SubmissionState,
    WorkflowStatus, WorkflowStep,
};
use courier_security::AuthSnapshot;
use std::sync::Arc;
use tokio::sync::watch;

const GENERIC_FAILURE: &str = "Something went wrong while contacting the assistant.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    EmptyInstruction,
    InFlight,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Dropped before any state change or request.
    Rejected(RejectReason),
    /// The service answered successfully with this overall status.
    Completed(WorkflowStatus),
    /// The request failed; the text is what the user sees.
    Failed(String),
}

/// Steps shown while the request is on the wire.
pub fn optimistic_snapshot() -> Vec<WorkflowStep> {
    vec![
        WorkflowStep::new(StageKey::Input, WorkflowStatus::Completed)
            .with_detail("Instruction received."),
        WorkflowStep::new(StageKey::Processing, WorkflowStatus::InProgress),
        WorkflowStep::new(StageKey::Sending, WorkflowStatus::Idle),
        WorkflowStep::new(StageKey::Completed, WorkflowStatus::Idle),
    ]
}

/// Serializes submissions and folds each response into [`SubmissionState`].
///
/// At most one request is in flight; a second `submit` while one is pending
/// is dropped, not queued.
pub struct SubmissionController {
    client: Arc<dyn AgentClient>,
    auth: watch::Receiver<AuthSnapshot>,
    state: watch::Sender<SubmissionState>,
}

impl SubmissionController {
    pub fn new(client: Arc<dyn AgentClient>, auth: watch::Receiver<AuthSnapshot>) -> Self {
        let (state, _) = watch::channel(SubmissionState::default());
        Self {
            client,
            auth,
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SubmissionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SubmissionState {
        self.state.borrow().clone()
    }

    pub fn render_steps(&self) -> [RenderStep; 4] {
        reconcile(&self.state.borrow().steps)
    }

    pub fn status_label(&self) -> &'static str {
        self.state.borrow().current_status.label()
    }

    /// Mirror the instruction input box.
    pub fn set_instruction(&self, text: &str) {
        self.state.send_if_modified(|state| {
            if state.instruction == text {
                return false;
            }
            state.instruction = text.to_string();
            true
        });
    }

    pub async fn submit(&self, instruction: &str) -> SubmitOutcome {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            tracing::debug!("ignoring empty instruction");
            return SubmitOutcome::Rejected(RejectReason::EmptyInstruction);
        }

        let locked = self.state.send_if_modified(|state| {
            if state.in_flight {
                return false;
            }
            state.in_flight = true;
            state.last_error = None;
            state.generated_email = None;
            state.current_status = WorkflowStatus::InProgress;
            state.steps = optimistic_snapshot();
            true
        });
        if !locked {
            tracing::debug!("submission already in flight; dropping");
            return SubmitOutcome::Rejected(RejectReason::InFlight);
        }

        let request = {
            let auth = self.auth.borrow();
            let identity = auth.identity.as_ref();
            AgentRunRequest {
                instruction: instruction.to_string(),
                user_email: identity
                    .and_then(|identity| identity.identity_email())
                    .map(str::to_string),
                user_name: identity.and_then(|identity| identity.name.clone()),
            }
        };
        tracing::info!(
            signed_in = request.user_email.is_some(),
            "submitting instruction"
        );

        let result = self.client.run(&request).await;
        self.settle(result)
    }

    /// Apply the outcome and release the lock in one published update.
    fn settle(&self, result: Result<AgentRunResponse, AgentError>) -> SubmitOutcome {
        let mut outcome = SubmitOutcome::Failed(GENERIC_FAILURE.to_string());

        self.state.send_modify(|state| {
            match result {
                Ok(response) => {
                    tracing::info!(status = ?response.status, "agent run finished");
                    state.steps = response.steps;
                    state.current_status = response.status;
                    state.generated_email = response.generated_email;
                    state.instruction.clear();
                    outcome = SubmitOutcome::Completed(response.status);
                }
                Err(AgentError::Rejected { message, steps, .. }) => {
                    if !steps.is_empty() {
                        state.steps = steps;
                    }
                    state.current_status = WorkflowStatus::Error;
                    state.last_error = Some(message.clone());
                    outcome = SubmitOutcome::Failed(message);
                }
                Err(err) => {
                    tracing::warn!("agent run failed: {err}");
                    let message = err.to_string();
                    let message = if message.trim().is_empty() {
                        GENERIC_FAILURE.to_string()
                    } else {
                        message
                    };
                    state.current_status = WorkflowStatus::Error;
                    state.last_error = Some(message.clone());
                    outcome = SubmitOutcome::Failed(message);
                }
            }
            state.in_flight = false;
        });

        outcome
    }
}
