//! Test-only helpers for building catalogs and driving timers by hand.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::controller::Controller;
use crate::core::session::Session;
use crate::core::types::{Alternative, Recommendation, StepDefinition, TimerToken};
use crate::io::timer::Timer;

/// Non-intervention step recommending `value`, with 10 chars of reasoning.
pub fn plain(id: &str, value: &str) -> StepDefinition {
    StepDefinition {
        id: id.to_string(),
        title: format!("{} title", id),
        reasoning_text: "reasoning.".to_string(),
        evidence_refs: Vec::new(),
        conclusion_text: None,
        confidence: None,
        is_intervention_point: false,
        recommendation: Some(Recommendation {
            value: value.to_string(),
            alternatives: Vec::new(),
        }),
    }
}

/// Intervention point recommending `value` with the given alternative ids.
pub fn checkpoint(id: &str, value: &str, alternatives: &[&str]) -> StepDefinition {
    let mut def = plain(id, value);
    def.is_intervention_point = true;
    def.recommendation = Some(Recommendation {
        value: value.to_string(),
        alternatives: alternatives
            .iter()
            .map(|alt| Alternative {
                id: alt.to_string(),
                label: format!("{} label", alt),
                description: format!("{} description", alt),
            })
            .collect(),
    });
    def
}

/// Idle session `session-1` over `definitions`.
pub fn session_of(definitions: Vec<StepDefinition>) -> Session {
    Session::new("session-1", "test", definitions).expect("valid test catalog")
}

#[derive(Default)]
struct ManualState {
    next: u64,
    scheduled: Vec<(TimerToken, Duration)>,
    cancelled: Vec<TimerToken>,
    fired: Vec<TimerToken>,
}

/// Timer that never fires on its own; tests decide when a token expires.
#[derive(Default)]
pub struct ManualTimer {
    state: Mutex<ManualState>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `(token, delay)` ever scheduled, in order.
    pub fn scheduled(&self) -> Vec<(TimerToken, Duration)> {
        self.lock().scheduled.clone()
    }

    pub fn cancelled(&self) -> Vec<TimerToken> {
        self.lock().cancelled.clone()
    }

    /// Tokens scheduled but neither cancelled nor fired.
    pub fn live(&self) -> Vec<TimerToken> {
        let state = self.lock();
        state
            .scheduled
            .iter()
            .map(|(token, _)| *token)
            .filter(|token| !state.cancelled.contains(token) && !state.fired.contains(token))
            .collect()
    }

    /// Mark the oldest live token as expired and return it.
    pub fn expire_next(&self) -> Option<TimerToken> {
        let token = self.live().into_iter().next()?;
        self.lock().fired.push(token);
        Some(token)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Timer for ManualTimer {
    fn schedule(&self, delay: Duration) -> TimerToken {
        let mut state = self.lock();
        state.next += 1;
        let token = TimerToken(state.next);
        state.scheduled.push((token, delay));
        token
    }

    fn cancel(&self, token: TimerToken) {
        self.lock().cancelled.push(token);
    }
}

/// Expire the oldest live timer and feed it to the controller.
///
/// Panics when no timer is live, which in a test means the scheduler stalled.
pub fn fire(controller: &Controller<ManualTimer>, session: &Session) -> Session {
    let token = controller
        .timer()
        .expire_next()
        .expect("expected a live timer");
    controller.timer_fired(session, token)
}
