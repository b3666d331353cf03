mod model;
mod workflow;

pub use model::*;
pub use workflow::{reconcile, workflow_template, RenderStep, StageIcon, WorkflowTemplateEntry};
