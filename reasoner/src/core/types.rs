//! Shared deterministic types for the session engine.
//!
//! These types define stable contracts between the engine and its host. They
//! do not depend on external state or I/O. Values (recommendations, resolved
//! values, alternative ids) are opaque strings owned by the host.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-step lifecycle status.
///
/// `Pending -> Processing -> {Complete | Intervention}`, `Intervention -> Complete`.
/// `Complete` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Processing,
    Intervention,
    Complete,
}

impl StepStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Processing => "processing",
            StepStatus::Intervention => "intervention",
            StepStatus::Complete => "complete",
        }
    }

    /// True for the two statuses a step can hold while it is the in-flight step.
    pub fn is_active(self) -> bool {
        matches!(self, StepStatus::Processing | StepStatus::Intervention)
    }
}

/// Session-level status.
///
/// `Idle -> Running -> (Paused <-> Running) -> Complete`; `Idle` is reachable
/// from every state through a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Running,
    Paused,
    Complete,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Running => "running",
            SessionStatus::Paused => "paused",
            SessionStatus::Complete => "complete",
        }
    }
}

/// Human decision applied at an intervention point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionAction {
    Approve,
    Modify,
    Reject,
}

impl DecisionAction {
    pub fn as_str(self) -> &'static str {
        match self {
            DecisionAction::Approve => "approve",
            DecisionAction::Modify => "modify",
            DecisionAction::Reject => "reject",
        }
    }
}

/// An alternative the operator may pick instead of the recommended value.
///
/// The alternative's value is its `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alternative {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub value: String,
    #[serde(default)]
    pub alternatives: Vec<Alternative>,
}

impl Recommendation {
    pub fn alternative(&self, id: &str) -> Option<&Alternative> {
        self.alternatives.iter().find(|alt| alt.id == id)
    }
}

/// Host-supplied step definition (one entry of a step catalog).
///
/// The engine never interprets `reasoning_text`, `evidence_refs` or
/// `conclusion_text`; only the character count of `reasoning_text` matters
/// (it drives the thinking time).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub reasoning_text: String,
    #[serde(default)]
    pub evidence_refs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conclusion_text: Option<String>,
    /// Confidence in percent, `0..=100`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u8>,
    #[serde(default)]
    pub is_intervention_point: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<Recommendation>,
}

/// A catalog step plus its engine-owned run state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    #[serde(flatten)]
    pub definition: StepDefinition,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_value: Option<String>,
}

impl Step {
    pub(crate) fn pending(definition: StepDefinition) -> Self {
        Self {
            definition,
            status: StepStatus::Pending,
            resolved_value: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.definition.id
    }

    pub fn title(&self) -> &str {
        &self.definition.title
    }

    pub fn is_intervention_point(&self) -> bool {
        self.definition.is_intervention_point
    }

    pub fn recommendation(&self) -> Option<&Recommendation> {
        self.definition.recommendation.as_ref()
    }

    pub fn recommended_value(&self) -> Option<&str> {
        self.recommendation().map(|rec| rec.value.as_str())
    }
}

/// One resolved human decision, as stored in the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterventionRecord {
    pub step_id: String,
    pub action: DecisionAction,
    pub original_value: String,
    /// Present for `Modify` only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Opaque handle for one scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimerToken(pub u64);

/// Decision event delivered by the review surface.
///
/// `step_id`, when set, names the step the operator was looking at; a decision
/// aimed at a step that is no longer current is refused. `alternative_id` on a
/// `Modify` must match the staged alternative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub action: DecisionAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
}

impl Decision {
    fn new(action: DecisionAction) -> Self {
        Self {
            action,
            alternative_id: None,
            step_id: None,
        }
    }

    pub fn approve() -> Self {
        Self::new(DecisionAction::Approve)
    }

    /// Confirm whatever alternative is currently staged.
    pub fn modify() -> Self {
        Self::new(DecisionAction::Modify)
    }

    /// Confirm a specific alternative; it must already be staged.
    pub fn modify_to(alternative_id: impl Into<String>) -> Self {
        Self {
            alternative_id: Some(alternative_id.into()),
            ..Self::new(DecisionAction::Modify)
        }
    }

    pub fn reject() -> Self {
        Self::new(DecisionAction::Reject)
    }

    pub fn for_step(mut self, step_id: impl Into<String>) -> Self {
        self.step_id = Some(step_id.into());
        self
    }
}

/// Outcome of a decision handed to the `on_intervention` observer.
///
/// `value` is the recommended value for `Approve`, the alternative id for
/// `Modify`, and `None` for `Reject`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub step_id: String,
    pub action: DecisionAction,
    pub value: Option<String>,
}
