use crate::{StageKey, WorkflowStatus, WorkflowStep};
use serde::Serialize;

/// Icon drawn next to a stage. Drawing itself belongs to the host.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StageIcon {
    Pencil,
    Sparkles,
    Send,
    CheckCircle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowTemplateEntry {
    pub key: StageKey,
    pub label: &'static str,
    pub caption: &'static str,
    pub icon: StageIcon,
}

const WORKFLOW_TEMPLATE: [WorkflowTemplateEntry; 4] = [
    WorkflowTemplateEntry {
        key: StageKey::Input,
        label: "Input",
        caption: "Describe the email you want sent",
        icon: StageIcon::Pencil,
    },
    WorkflowTemplateEntry {
        key: StageKey::Processing,
        label: "Processing",
        caption: "The assistant drafts your message",
        icon: StageIcon::Sparkles,
    },
    WorkflowTemplateEntry {
        key: StageKey::Sending,
        label: "Sending",
        caption: "Delivering through your mailbox",
        icon: StageIcon::Send,
    },
    WorkflowTemplateEntry {
        key: StageKey::Completed,
        label: "Completed",
        caption: "Draft ready for review",
        icon: StageIcon::CheckCircle,
    },
];

pub fn workflow_template() -> &'static [WorkflowTemplateEntry; 4] {
    &WORKFLOW_TEMPLATE
}

/// A template stage merged with whatever the service reported for it.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RenderStep {
    pub key: StageKey,
    pub label: &'static str,
    pub caption: &'static str,
    pub icon: StageIcon,
    pub status: WorkflowStatus,
    pub detail: Option<String>,
}

/// Project a server step list onto the fixed stage template.
///
/// Always returns one entry per template stage, in template order. The first
/// step named after a stage wins; stages nobody reported stay idle and show
/// their caption.
pub fn reconcile(steps: &[WorkflowStep]) -> [RenderStep; 4] {
    WORKFLOW_TEMPLATE.map(|entry| {
        match steps.iter().find(|step| step.is_stage(entry.key)) {
            Some(step) => RenderStep {
                key: entry.key,
                label: entry.label,
                caption: entry.caption,
                icon: entry.icon,
                status: step.status,
                detail: step.detail.clone(),
            },
            None => RenderStep {
                key: entry.key,
                label: entry.label,
                caption: entry.caption,
                icon: entry.icon,
                status: WorkflowStatus::Idle,
                detail: Some(entry.caption.to_string()),
            },
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn keys(steps: &[RenderStep]) -> Vec<StageKey> {
        steps.iter().map(|step| step.key).collect()
    }

    const ORDER: [StageKey; 4] = [
        StageKey::Input,
        StageKey::Processing,
        StageKey::Sending,
        StageKey::Completed,
    ];

    #[test]
    fn template_order_is_stable() {
        let labels: Vec<&str> = workflow_template().iter().map(|entry| entry.label).collect();
        assert_eq!(labels, vec!["Input", "Processing", "Sending", "Completed"]);
    }

    #[test]
    fn empty_steps_fall_back_to_captions() {
        let rendered = reconcile(&[]);
        assert_eq!(keys(&rendered), ORDER.to_vec());
        for (step, entry) in rendered.iter().zip(workflow_template()) {
            assert_eq!(step.status, WorkflowStatus::Idle);
            assert_eq!(step.detail.as_deref(), Some(entry.caption));
        }
    }

    #[test]
    fn unordered_steps_land_in_template_order() {
        let steps = vec![
            WorkflowStep::new(StageKey::Sending, WorkflowStatus::InProgress)
                .with_detail("Handing off to SMTP"),
            WorkflowStep::new(StageKey::Input, WorkflowStatus::Completed),
        ];
        let rendered = reconcile(&steps);

        assert_eq!(keys(&rendered), ORDER.to_vec());
        assert_eq!(rendered[0].status, WorkflowStatus::Completed);
        assert_eq!(rendered[0].detail, None);
        assert_eq!(rendered[1].status, WorkflowStatus::Idle);
        assert_eq!(rendered[1].detail.as_deref(), Some(rendered[1].caption));
        assert_eq!(rendered[2].status, WorkflowStatus::InProgress);
        assert_eq!(rendered[2].detail.as_deref(), Some("Handing off to SMTP"));
        assert_eq!(rendered[3].status, WorkflowStatus::Idle);
    }

    #[test]
    fn first_duplicate_wins() {
        let steps = vec![
            WorkflowStep::new(StageKey::Processing, WorkflowStatus::Error).with_detail("first"),
            WorkflowStep::new(StageKey::Processing, WorkflowStatus::Completed)
                .with_detail("second"),
        ];
        let rendered = reconcile(&steps);
        assert_eq!(rendered[1].status, WorkflowStatus::Error);
        assert_eq!(rendered[1].detail.as_deref(), Some("first"));
    }

    #[test]
    fn unknown_and_surplus_steps_are_ignored() {
        let mut steps = vec![WorkflowStep {
            name: "Archiving".to_string(),
            status: WorkflowStatus::Completed,
            detail: None,
        }];
        for key in ORDER {
            steps.push(WorkflowStep::new(key, WorkflowStatus::Completed));
        }
        steps.push(WorkflowStep::new(StageKey::Input, WorkflowStatus::Error));

        let rendered = reconcile(&steps);
        assert_eq!(rendered.len(), 4);
        assert!(rendered
            .iter()
            .all(|step| step.status == WorkflowStatus::Completed));
    }

    #[test]
    fn matching_is_case_sensitive() {
        let steps = vec![WorkflowStep {
            name: "input".to_string(),
            status: WorkflowStatus::Completed,
            detail: None,
        }];
        assert_eq!(reconcile(&steps)[0].status, WorkflowStatus::Idle);
    }
}
