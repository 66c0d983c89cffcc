//! Timer-driven transitions ("thinking time").
//!
//! This module computes how long a Processing step thinks and what happens
//! when its timer fires. Arming and cancelling real timers is left to the
//! controller; nothing here touches a clock.

use std::time::Duration;

use crate::core::session::Session;
use crate::core::types::{SessionStatus, Step, StepStatus};

/// Pacing constants for simulated thinking time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Milliseconds of thinking per character of reasoning text.
    pub ms_per_char: u64,
    /// Upper bound on any single step's thinking time.
    pub max_thinking_ms: u64,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            ms_per_char: 20,
            max_thinking_ms: 3_000,
        }
    }
}

/// What a timer fire did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Current step hit an intervention point; session is Paused.
    Paused,
    /// Step completed and the next one is Processing.
    Advanced,
    /// Last step completed; session is Complete.
    Completed,
    /// Session was not Running a Processing step; nothing changed.
    Ignored,
}

/// `min(ms_per_char * chars(reasoning_text), max_thinking_ms)`.
pub fn thinking_duration(step: &Step, pacing: &Pacing) -> Duration {
    let chars = step.definition.reasoning_text.chars().count() as u64;
    let ms = pacing
        .ms_per_char
        .saturating_mul(chars)
        .min(pacing.max_thinking_ms);
    Duration::from_millis(ms)
}

/// `Idle -> Running` with step 0 Processing.
pub(crate) fn begin(session: &mut Session) {
    session.status = SessionStatus::Running;
    session.current_step_index = 0;
    session.current_step_mut().status = StepStatus::Processing;
}

/// Apply the transition for a fired timer on the current step.
pub(crate) fn complete_processing(session: &mut Session) -> TickOutcome {
    if session.status != SessionStatus::Running
        || session.current_step().status != StepStatus::Processing
    {
        return TickOutcome::Ignored;
    }

    if session.current_step().is_intervention_point() {
        session.status = SessionStatus::Paused;
        session.current_step_mut().status = StepStatus::Intervention;
        return TickOutcome::Paused;
    }

    let value = session.current_step().recommended_value().map(str::to_string);
    resolve_current(session, value)
}

/// Mark the current step Complete with `value` and move the session on.
///
/// Shared by the scheduler (auto-complete) and the gate (resolved decision).
pub(crate) fn resolve_current(session: &mut Session, value: Option<String>) -> TickOutcome {
    session.staged_alternative = None;
    let step = session.current_step_mut();
    step.status = StepStatus::Complete;
    step.resolved_value = value.clone();

    if session.is_last_step() {
        session.status = SessionStatus::Complete;
        session.final_recommendation_value = value;
        return TickOutcome::Completed;
    }

    session.current_step_index += 1;
    session.current_step_mut().status = StepStatus::Processing;
    session.status = SessionStatus::Running;
    TickOutcome::Advanced
}
