//! Catalog and session invariants.

use std::collections::HashSet;

use crate::core::session::Session;
use crate::core::types::{SessionStatus, StepDefinition, StepStatus};

/// Check catalog invariants not expressible in JSON Schema:
/// - No duplicate step ids
/// - `confidence <= 100`
/// - Intervention points carry a recommendation
/// - Alternative ids are unique per step and differ from the recommended value
///
/// Emptiness is reported separately (`EmptyCatalog`).
pub fn validate_catalog(definitions: &[StepDefinition]) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (index, def) in definitions.iter().enumerate() {
        let label = format!("steps[{}] '{}'", index, def.id);
        if def.id.trim().is_empty() {
            errors.push(format!("steps[{}]: id must be non-empty", index));
        }
        if !seen.insert(def.id.as_str()) {
            errors.push(format!("duplicate step id '{}' at steps[{}]", def.id, index));
        }
        if let Some(confidence) = def.confidence.filter(|c| *c > 100) {
            errors.push(format!("{}: confidence {} exceeds 100", label, confidence));
        }
        if def.is_intervention_point && def.recommendation.is_none() {
            errors.push(format!(
                "{}: intervention point requires a recommendation",
                label
            ));
        }
        if let Some(rec) = &def.recommendation {
            let mut alt_ids = HashSet::new();
            for alt in &rec.alternatives {
                if !alt_ids.insert(alt.id.as_str()) {
                    errors.push(format!("{}: duplicate alternative id '{}'", label, alt.id));
                }
                if alt.id == rec.value {
                    errors.push(format!(
                        "{}: alternative '{}' repeats the recommended value",
                        label, alt.id
                    ));
                }
            }
        }
    }

    errors
}

/// Check the run-state invariants of a session:
/// - Running/Paused: exactly one active step at the current index, earlier
///   steps Complete, later steps Pending; Running pairs with Processing and
///   Paused with Intervention
/// - Idle: every step Pending at index 0 with an empty audit log
/// - Complete: every step Complete, a final value equal to the last resolved
///   value, no timer outstanding
/// - A staged alternative exists only while paused and is one the step offers
/// - The audit log never outgrows the number of completed steps
pub fn validate_session(session: &Session) -> Vec<String> {
    let mut errors = Vec::new();
    let steps = session.steps();
    let index = session.current_step_index();

    if index >= steps.len() {
        errors.push(format!(
            "current_step_index {} out of range for {} steps",
            index,
            steps.len()
        ));
        return errors;
    }

    match session.status() {
        SessionStatus::Idle => {
            if index != 0 {
                errors.push(format!("idle session at index {}", index));
            }
            if let Some(step) = steps.iter().find(|s| s.status != StepStatus::Pending) {
                errors.push(format!(
                    "idle session has step '{}' in status {}",
                    step.id(),
                    step.status.as_str()
                ));
            }
            if !session.interventions().is_empty() {
                errors.push("idle session has audit records".to_string());
            }
            if session.final_recommendation_value().is_some() {
                errors.push("idle session has a final value".to_string());
            }
        }
        SessionStatus::Running | SessionStatus::Paused => {
            let active = steps.iter().filter(|s| s.status.is_active()).count();
            if active != 1 {
                errors.push(format!("expected exactly one active step, found {}", active));
            }
            for (i, step) in steps.iter().enumerate() {
                let ok = match i.cmp(&index) {
                    std::cmp::Ordering::Less => step.status == StepStatus::Complete,
                    std::cmp::Ordering::Equal => step.status.is_active(),
                    std::cmp::Ordering::Greater => step.status == StepStatus::Pending,
                };
                if !ok {
                    errors.push(format!(
                        "step '{}' at {} has status {} (current index {})",
                        step.id(),
                        i,
                        step.status.as_str(),
                        index
                    ));
                }
            }
            let expected = match session.status() {
                SessionStatus::Running => StepStatus::Processing,
                _ => StepStatus::Intervention,
            };
            let current = session.current_step().status;
            if current != expected {
                errors.push(format!(
                    "{} session has current step in status {}",
                    session.status().as_str(),
                    current.as_str()
                ));
            }
            if session.final_recommendation_value().is_some() {
                errors.push("unfinished session has a final value".to_string());
            }
        }
        SessionStatus::Complete => {
            if let Some(step) = steps.iter().find(|s| s.status != StepStatus::Complete) {
                errors.push(format!(
                    "complete session has step '{}' in status {}",
                    step.id(),
                    step.status.as_str()
                ));
            }
            if index + 1 != steps.len() {
                errors.push(format!("complete session stopped at index {}", index));
            }
            let last = steps.last().and_then(|s| s.resolved_value.as_deref());
            if session.final_recommendation_value() != last {
                errors.push("final value differs from the last resolved value".to_string());
            }
            if session.pending_timer().is_some() {
                errors.push("complete session still has a timer outstanding".to_string());
            }
        }
    }

    if let Some(staged) = session.staged_alternative() {
        let offered = session.status() == SessionStatus::Paused
            && session
                .current_step()
                .recommendation()
                .and_then(|rec| rec.alternative(staged))
                .is_some();
        if !offered {
            errors.push(format!(
                "staged alternative '{}' is not offered by a paused step",
                staged
            ));
        }
    }

    let completed = steps
        .iter()
        .filter(|s| s.status == StepStatus::Complete)
        .count();
    if session.interventions().len() > completed {
        errors.push(format!(
            "{} audit records for {} completed steps",
            session.interventions().len(),
            completed
        ));
    }

    errors
}
