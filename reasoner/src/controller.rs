//! Public session API composing the scheduler and the intervention gate.
//!
//! Every operation takes the caller's session by reference and returns a new
//! value; the controller itself only holds pacing, the timer primitive, and an
//! optional decision observer. A failed operation leaves the input untouched.

use chrono::Utc;
use tracing::{debug, info};

use crate::core::error::EngineError;
use crate::core::gate;
use crate::core::scheduler::{self, Pacing, TickOutcome, thinking_duration};
use crate::core::session::Session;
use crate::core::types::{Decision, Resolution, SessionStatus, StepStatus, TimerToken};
use crate::io::timer::Timer;

type Observer = Box<dyn Fn(&Resolution) + Send + Sync>;

pub struct Controller<T: Timer> {
    pacing: Pacing,
    timer: T,
    on_intervention: Option<Observer>,
}

impl<T: Timer> Controller<T> {
    pub fn new(timer: T, pacing: Pacing) -> Self {
        Self {
            pacing,
            timer,
            on_intervention: None,
        }
    }

    /// Register the host callback fired once per resolved decision
    /// (including `Reject`).
    pub fn on_intervention(mut self, observer: impl Fn(&Resolution) + Send + Sync + 'static) -> Self {
        self.on_intervention = Some(Box::new(observer));
        self
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn pacing(&self) -> &Pacing {
        &self.pacing
    }

    /// `Idle -> Running` with step 0 Processing and its timer armed.
    ///
    /// A Running session that still has its timer, or a Complete session, is
    /// returned unchanged. A Running session whose timer was cancelled is
    /// re-armed. A Paused session needs a decision, not a start.
    pub fn start(&self, session: &Session) -> Result<Session, EngineError> {
        match session.status() {
            SessionStatus::Idle => {
                let mut next = session.clone();
                scheduler::begin(&mut next);
                info!(session_id = next.id(), steps = next.steps().len(), "session started");
                self.arm(&mut next);
                Ok(next)
            }
            SessionStatus::Running if session.pending_timer().is_none() => {
                let mut next = session.clone();
                debug!(session_id = next.id(), "re-arming cancelled session");
                self.arm(&mut next);
                Ok(next)
            }
            SessionStatus::Running | SessionStatus::Complete => Ok(session.clone()),
            SessionStatus::Paused => Err(EngineError::InvalidTransition(format!(
                "session '{}' is paused awaiting a decision on step '{}'",
                session.id(),
                session.current_step().id()
            ))),
        }
    }

    /// Cancel any outstanding timer, then return a fresh `Idle` session.
    pub fn reset(&self, session: &Session) -> Session {
        self.disarm(session);
        debug!(session_id = session.id(), "session reset");
        session.fresh()
    }

    /// Stop the scheduler without completing the session.
    pub fn cancel(&self, session: &Session) -> Session {
        self.disarm(session);
        let mut next = session.clone();
        next.pending_timer = None;
        next
    }

    /// First phase of `Modify`: select an alternative without applying it.
    pub fn stage_alternative(
        &self,
        session: &Session,
        alternative_id: &str,
    ) -> Result<Session, EngineError> {
        let mut next = session.clone();
        gate::stage_alternative(&mut next, alternative_id)?;
        debug!(
            session_id = next.id(),
            step_id = next.current_step().id(),
            alternative_id,
            "alternative staged"
        );
        Ok(next)
    }

    /// Resolve the paused step with `decision` and hand control back to the
    /// scheduler.
    pub fn apply_decision(
        &self,
        session: &Session,
        decision: &Decision,
    ) -> Result<Session, EngineError> {
        let mut next = session.clone();
        let resolution = gate::apply_decision(&mut next, decision, Utc::now())?;
        info!(
            session_id = next.id(),
            step_id = %resolution.step_id,
            action = resolution.action.as_str(),
            value = ?resolution.value,
            "decision resolved"
        );
        if next.status() == SessionStatus::Complete {
            info!(session_id = next.id(), value = ?next.final_recommendation_value(), "session complete");
        }
        self.arm(&mut next);
        if let Some(observer) = &self.on_intervention {
            observer(&resolution);
        }
        Ok(next)
    }

    /// Scheduler entry point: the timer identified by `token` expired.
    ///
    /// Only the session's own outstanding timer may move it; any other token
    /// (cancelled, superseded, or from before a reset) is ignored.
    pub fn timer_fired(&self, session: &Session, token: TimerToken) -> Session {
        if session.pending_timer() != Some(token) {
            debug!(
                session_id = session.id(),
                token = token.0,
                pending = ?session.pending_timer().map(|t| t.0),
                "stale timer ignored"
            );
            return session.clone();
        }

        let mut next = session.clone();
        next.pending_timer = None;
        match scheduler::complete_processing(&mut next) {
            TickOutcome::Paused => {
                info!(
                    session_id = next.id(),
                    step_id = next.current_step().id(),
                    "awaiting decision"
                );
            }
            TickOutcome::Advanced => {
                debug!(
                    session_id = next.id(),
                    step_id = next.current_step().id(),
                    "advanced"
                );
                self.arm(&mut next);
            }
            TickOutcome::Completed => {
                info!(session_id = next.id(), value = ?next.final_recommendation_value(), "session complete");
            }
            TickOutcome::Ignored => {}
        }
        next
    }

    /// Arm a timer for the current step if it is Processing.
    fn arm(&self, session: &mut Session) {
        if session.status() != SessionStatus::Running
            || session.current_step().status != StepStatus::Processing
        {
            return;
        }
        let delay = thinking_duration(session.current_step(), &self.pacing);
        let token = self.timer.schedule(delay);
        debug!(
            session_id = session.id(),
            step_id = session.current_step().id(),
            token = token.0,
            delay_ms = delay.as_millis() as u64,
            "thinking"
        );
        session.pending_timer = Some(token);
    }

    fn disarm(&self, session: &Session) {
        if let Some(token) = session.pending_timer() {
            self.timer.cancel(token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::invariants::validate_session;
    use crate::test_support::{ManualTimer, checkpoint, plain, session_of};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn controller() -> Controller<ManualTimer> {
        Controller::new(ManualTimer::new(), Pacing::default())
    }

    #[test]
    fn start_arms_timer_for_first_step() {
        let ctl = controller();
        let session = session_of(vec![plain("a", "x")]);
        let started = ctl.start(&session).expect("start");

        assert_eq!(started.status(), SessionStatus::Running);
        assert_eq!(started.current_step().status, StepStatus::Processing);
        let token = started.pending_timer().expect("timer armed");
        assert_eq!(ctl.timer().scheduled(), vec![(token, Duration::from_millis(200))]);
        assert_eq!(session.status(), SessionStatus::Idle);
    }

    #[test]
    fn start_on_paused_session_is_invalid() {
        let ctl = controller();
        let session = ctl.start(&session_of(vec![checkpoint("a", "x", &["y"])])).expect("start");
        let paused = ctl.timer_fired(&session, session.pending_timer().expect("timer"));

        let err = ctl.start(&paused).expect_err("error");
        assert!(matches!(err, EngineError::InvalidTransition(_)));
    }

    #[test]
    fn cancel_stops_scheduler_and_start_rearms() {
        let ctl = controller();
        let started = ctl.start(&session_of(vec![plain("a", "x")])).expect("start");
        let token = started.pending_timer().expect("timer");

        let cancelled = ctl.cancel(&started);
        assert_eq!(cancelled.status(), SessionStatus::Running);
        assert_eq!(cancelled.pending_timer(), None);
        assert_eq!(ctl.timer().cancelled(), vec![token]);
        assert_eq!(ctl.timer_fired(&cancelled, token), cancelled);

        let resumed = ctl.start(&cancelled).expect("resume");
        assert!(resumed.pending_timer().is_some_and(|t| t != token));
    }

    #[test]
    fn observer_sees_every_resolution() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let ctl = controller().on_intervention(move |res| {
            sink.lock().expect("lock").push((res.action, res.value.clone()));
        });
        let started = ctl
            .start(&session_of(vec![checkpoint("a", "x", &["y"])]))
            .expect("start");
        let paused = ctl.timer_fired(&started, started.pending_timer().expect("timer"));

        let rejected = ctl.apply_decision(&paused, &Decision::reject()).expect("reject");
        let staged = ctl.stage_alternative(&rejected, "y").expect("stage");
        let done = ctl.apply_decision(&staged, &Decision::modify()).expect("modify");

        assert_eq!(done.status(), SessionStatus::Complete);
        assert!(validate_session(&done).is_empty());
        let seen = seen.lock().expect("lock");
        assert_eq!(
            *seen,
            vec![
                (crate::core::types::DecisionAction::Reject, None),
                (crate::core::types::DecisionAction::Modify, Some("y".to_string())),
            ]
        );
    }

    /// Failed operations do not fire the observer or arm timers.
    #[test]
    fn failed_decision_has_no_side_effects() {
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        let ctl = controller().on_intervention(move |_| {
            *counter.lock().expect("lock") += 1;
        });
        let started = ctl.start(&session_of(vec![plain("a", "x")])).expect("start");
        let scheduled_before = ctl.timer().scheduled().len();

        let err = ctl.apply_decision(&started, &Decision::approve()).expect_err("error");
        assert!(matches!(err, EngineError::InvalidTransition(_)));
        assert_eq!(*calls.lock().expect("lock"), 0);
        assert_eq!(ctl.timer().scheduled().len(), scheduled_before);
    }
}
