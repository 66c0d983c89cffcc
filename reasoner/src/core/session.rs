//! Session state over a step catalog.

use serde::{Deserialize, Serialize};

use crate::core::audit::AuditLog;
use crate::core::error::EngineError;
use crate::core::invariants::{validate_catalog, validate_session};
use crate::core::types::{SessionStatus, Step, StepDefinition, StepStatus, TimerToken};

/// One run over an ordered step catalog.
///
/// Sessions are plain values owned by the host. Engine operations take a
/// session by reference and hand back a new one; the fields are read-only from
/// outside the crate so a host cannot put a session into an unreachable state.
/// Deserializing goes through [`SessionRecord`] and the same checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SessionRecord")]
pub struct Session {
    pub(crate) id: String,
    pub(crate) context: String,
    pub(crate) steps: Vec<Step>,
    pub(crate) current_step_index: usize,
    pub(crate) status: SessionStatus,
    pub(crate) interventions: AuditLog,
    pub(crate) final_recommendation_value: Option<String>,
    /// Alternative selected for a pending `Modify`; never applied until confirmed.
    pub(crate) staged_alternative: Option<String>,
    /// Token of the outstanding scheduler timer, if any.
    pub(crate) pending_timer: Option<TimerToken>,
}

impl Session {
    /// Create an `Idle` session with every step `Pending`.
    ///
    /// Fails with `EmptyCatalog` for zero steps and `InvalidCatalog` when the
    /// definitions break catalog invariants (duplicate ids, intervention points
    /// without a recommendation, ...).
    pub fn new(
        id: impl Into<String>,
        context: impl Into<String>,
        definitions: Vec<StepDefinition>,
    ) -> Result<Self, EngineError> {
        if definitions.is_empty() {
            return Err(EngineError::EmptyCatalog);
        }
        let errors = validate_catalog(&definitions);
        if !errors.is_empty() {
            return Err(EngineError::InvalidCatalog(errors));
        }
        Ok(Self {
            id: id.into(),
            context: context.into(),
            steps: definitions.into_iter().map(Step::pending).collect(),
            current_step_index: 0,
            status: SessionStatus::Idle,
            interventions: AuditLog::default(),
            final_recommendation_value: None,
            staged_alternative: None,
            pending_timer: None,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn current_step_index(&self) -> usize {
        self.current_step_index
    }

    pub fn current_step(&self) -> &Step {
        &self.steps[self.current_step_index]
    }

    pub fn interventions(&self) -> &AuditLog {
        &self.interventions
    }

    pub fn final_recommendation_value(&self) -> Option<&str> {
        self.final_recommendation_value.as_deref()
    }

    pub fn staged_alternative(&self) -> Option<&str> {
        self.staged_alternative.as_deref()
    }

    pub fn pending_timer(&self) -> Option<TimerToken> {
        self.pending_timer
    }

    pub fn step(&self, step_id: &str) -> Option<&Step> {
        self.steps.iter().find(|step| step.id() == step_id)
    }

    /// Fraction of the catalog resolved so far, in `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        let done = self.current_step_index + usize::from(self.status == SessionStatus::Complete);
        done as f64 / self.steps.len() as f64
    }

    /// Fresh `Idle` value over the same catalog.
    pub(crate) fn fresh(&self) -> Self {
        Self {
            id: self.id.clone(),
            context: self.context.clone(),
            steps: self
                .steps
                .iter()
                .map(|step| Step::pending(step.definition.clone()))
                .collect(),
            current_step_index: 0,
            status: SessionStatus::Idle,
            interventions: AuditLog::default(),
            final_recommendation_value: None,
            staged_alternative: None,
            pending_timer: None,
        }
    }

    pub(crate) fn current_step_mut(&mut self) -> &mut Step {
        &mut self.steps[self.current_step_index]
    }

    pub(crate) fn is_last_step(&self) -> bool {
        self.current_step_index + 1 == self.steps.len()
    }

    /// True when the current step is the one a decision may resolve.
    pub(crate) fn awaiting_decision(&self) -> bool {
        self.status == SessionStatus::Paused
            && self.current_step().status == StepStatus::Intervention
    }
}

/// Wire shape of a saved session, checked before it becomes a [`Session`].
#[derive(Deserialize)]
struct SessionRecord {
    id: String,
    context: String,
    steps: Vec<Step>,
    current_step_index: usize,
    status: SessionStatus,
    interventions: AuditLog,
    final_recommendation_value: Option<String>,
    staged_alternative: Option<String>,
}

impl TryFrom<SessionRecord> for Session {
    type Error = EngineError;

    /// Rejects empty or invalid catalogs and unreachable run states. Timer
    /// tokens belong to the process that armed them, so a restored session has
    /// none; `start` re-arms a restored Running session.
    fn try_from(record: SessionRecord) -> Result<Self, Self::Error> {
        if record.steps.is_empty() {
            return Err(EngineError::EmptyCatalog);
        }
        let definitions: Vec<StepDefinition> = record
            .steps
            .iter()
            .map(|step| step.definition.clone())
            .collect();
        let errors = validate_catalog(&definitions);
        if !errors.is_empty() {
            return Err(EngineError::InvalidCatalog(errors));
        }
        let session = Self {
            id: record.id,
            context: record.context,
            steps: record.steps,
            current_step_index: record.current_step_index,
            status: record.status,
            interventions: record.interventions,
            final_recommendation_value: record.final_recommendation_value,
            staged_alternative: record.staged_alternative,
            pending_timer: None,
        };
        let errors = validate_session(&session);
        if !errors.is_empty() {
            return Err(EngineError::InvalidSession(errors));
        }
        Ok(session)
    }
}
