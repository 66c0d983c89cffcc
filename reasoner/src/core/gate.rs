//! Intervention gate: resolves a paused step from a human decision.

use chrono::{DateTime, Utc};

use crate::core::error::EngineError;
use crate::core::scheduler::resolve_current;
use crate::core::session::Session;
use crate::core::types::{
    Decision, DecisionAction, InterventionRecord, Recommendation, Resolution, SessionStatus,
};

/// Stage `alternative_id` for a later `Modify` confirmation.
///
/// Staging only records the selection; the step is untouched until the
/// decision is confirmed. Restaging replaces the previous selection.
pub(crate) fn stage_alternative(
    session: &mut Session,
    alternative_id: &str,
) -> Result<(), EngineError> {
    ensure_awaiting_decision(session)?;
    let step = session.current_step();
    let rec = recommendation_of(session)?;
    if rec.alternative(alternative_id).is_none() {
        return Err(EngineError::InvalidSelection(format!(
            "step '{}' has no alternative '{}'",
            step.id(),
            alternative_id
        )));
    }
    session.staged_alternative = Some(alternative_id.to_string());
    Ok(())
}

/// Apply `decision` to the paused step.
///
/// `Approve` and `Modify` append an audit record, complete the step, and hand
/// the session back to the scheduler (or complete it). `Reject` leaves the
/// session paused and only produces a resolution for the host.
pub(crate) fn apply_decision(
    session: &mut Session,
    decision: &Decision,
    now: DateTime<Utc>,
) -> Result<Resolution, EngineError> {
    ensure_awaiting_decision(session)?;

    let step_id = session.current_step().id().to_string();
    if let Some(target) = decision.step_id.as_deref().filter(|target| *target != step_id) {
        return Err(EngineError::DecisionNotAccepted(format!(
            "decision targets step '{}' but step '{}' is awaiting review",
            target, step_id
        )));
    }

    let original_value = recommendation_of(session)?.value.clone();
    let value = match decision.action {
        DecisionAction::Approve => original_value.clone(),
        DecisionAction::Modify => confirmed_alternative(session, decision)?,
        DecisionAction::Reject => {
            session.staged_alternative = None;
            return Ok(Resolution {
                step_id,
                action: DecisionAction::Reject,
                value: None,
            });
        }
    };

    let new_value = match decision.action {
        DecisionAction::Modify => Some(value.clone()),
        _ => None,
    };
    session.interventions.append(InterventionRecord {
        step_id: step_id.clone(),
        action: decision.action,
        original_value,
        new_value,
        timestamp: now,
    });
    resolve_current(session, Some(value.clone()));

    Ok(Resolution {
        step_id,
        action: decision.action,
        value: Some(value),
    })
}

fn confirmed_alternative(session: &Session, decision: &Decision) -> Result<String, EngineError> {
    let staged = session.staged_alternative.as_deref().ok_or_else(|| {
        EngineError::InvalidSelection(format!(
            "no alternative staged for step '{}'",
            session.current_step().id()
        ))
    })?;
    if let Some(requested) = decision.alternative_id.as_deref() {
        if requested != staged {
            return Err(EngineError::InvalidSelection(format!(
                "alternative '{}' was not staged (staged '{}')",
                requested, staged
            )));
        }
    }
    Ok(staged.to_string())
}

fn ensure_awaiting_decision(session: &Session) -> Result<(), EngineError> {
    match session.status {
        SessionStatus::Complete => Err(EngineError::DecisionNotAccepted(
            "session is already complete".to_string(),
        )),
        SessionStatus::Paused if session.awaiting_decision() => Ok(()),
        status => Err(EngineError::InvalidTransition(format!(
            "no step awaiting a decision (session {}, step '{}' {})",
            status.as_str(),
            session.current_step().id(),
            session.current_step().status.as_str()
        ))),
    }
}

fn recommendation_of(session: &Session) -> Result<&Recommendation, EngineError> {
    session.current_step().recommendation().ok_or_else(|| {
        EngineError::InvalidTransition(format!(
            "step '{}' has no recommendation to decide on",
            session.current_step().id()
        ))
    })
}
