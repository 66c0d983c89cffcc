//! Session-level lifecycle tests driven through the public controller API.
//!
//! Timers are driven by hand (`ManualTimer`) so every tick is explicit.

use reasoner::controller::Controller;
use reasoner::core::error::EngineError;
use reasoner::core::invariants::validate_session;
use reasoner::core::scheduler::Pacing;
use reasoner::core::session::Session;
use reasoner::core::types::{Decision, DecisionAction, SessionStatus, StepStatus};
use reasoner::test_support::{ManualTimer, checkpoint, fire, plain, session_of};

fn controller() -> Controller<ManualTimer> {
    Controller::new(ManualTimer::new(), Pacing::default())
}

fn paused_single_checkpoint(ctl: &Controller<ManualTimer>) -> Session {
    let session = ctl
        .start(&session_of(vec![checkpoint("pick", "X", &["Y"])]))
        .expect("start");
    fire(ctl, &session)
}

/// Scenario A: three plain steps complete after three ticks.
#[test]
fn plain_catalog_completes_after_one_tick_per_step() {
    let ctl = controller();
    let mut session = ctl
        .start(&session_of(vec![
            plain("a", "one"),
            plain("b", "two"),
            plain("c", "three"),
        ]))
        .expect("start");

    for expected_index in [1, 2] {
        session = fire(&ctl, &session);
        assert_eq!(session.status(), SessionStatus::Running);
        assert_eq!(session.current_step_index(), expected_index);
        assert!(validate_session(&session).is_empty());
    }
    session = fire(&ctl, &session);

    assert_eq!(session.status(), SessionStatus::Complete);
    assert_eq!(session.final_recommendation_value(), Some("three"));
    assert_eq!(session.progress(), 1.0);
    assert!(session.interventions().is_empty());
    assert!(ctl.timer().live().is_empty());
    assert!(validate_session(&session).is_empty());
}

/// Scenario A variant: last step without a recommendation leaves the final value unset.
#[test]
fn plain_catalog_without_final_recommendation() {
    let ctl = controller();
    let mut last = plain("c", "unused");
    last.recommendation = None;
    let mut session = ctl
        .start(&session_of(vec![plain("a", "one"), plain("b", "two"), last]))
        .expect("start");
    for _ in 0..3 {
        session = fire(&ctl, &session);
    }

    assert_eq!(session.status(), SessionStatus::Complete);
    assert_eq!(session.final_recommendation_value(), None);
}

/// Scenario B: approve at a single checkpoint.
#[test]
fn approve_completes_with_recommended_value() {
    let ctl = controller();
    let paused = paused_single_checkpoint(&ctl);
    assert_eq!(paused.status(), SessionStatus::Paused);
    assert_eq!(paused.current_step().status, StepStatus::Intervention);
    assert!(ctl.timer().live().is_empty(), "no auto-advance while paused");

    let done = ctl.apply_decision(&paused, &Decision::approve()).expect("approve");

    assert_eq!(done.status(), SessionStatus::Complete);
    assert_eq!(done.final_recommendation_value(), Some("X"));
    let records = done.interventions().records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].step_id, "pick");
    assert_eq!(records[0].action, DecisionAction::Approve);
    assert_eq!(records[0].original_value, "X");
    assert_eq!(records[0].new_value, None);
}

/// Scenario C: modify needs a staged alternative before confirming.
#[test]
fn modify_requires_staging_before_confirm() {
    let ctl = controller();
    let paused = paused_single_checkpoint(&ctl);

    let err = ctl
        .apply_decision(&paused, &Decision::modify_to("Y"))
        .expect_err("unstaged modify");
    assert!(matches!(err, EngineError::InvalidSelection(_)));

    let staged = ctl.stage_alternative(&paused, "Y").expect("stage");
    assert_eq!(staged.current_step().status, StepStatus::Intervention);
    let done = ctl
        .apply_decision(&staged, &Decision::modify_to("Y"))
        .expect("confirm");

    assert_eq!(done.status(), SessionStatus::Complete);
    assert_eq!(done.final_recommendation_value(), Some("Y"));
    let records = done.interventions().records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].action, DecisionAction::Modify);
    assert_eq!(records[0].original_value, "X");
    assert_eq!(records[0].new_value.as_deref(), Some("Y"));
    assert_eq!(done.staged_alternative(), None);
}

/// Scenario D: reject keeps the session paused and logs nothing.
#[test]
fn reject_leaves_session_paused() {
    let ctl = controller();
    let paused = paused_single_checkpoint(&ctl);

    let after = ctl.apply_decision(&paused, &Decision::reject()).expect("reject");

    assert_eq!(after.status(), SessionStatus::Paused);
    assert_eq!(after.current_step().status, StepStatus::Intervention);
    assert_eq!(after.final_recommendation_value(), None);
    assert!(after.interventions().is_empty());
    assert_eq!(after, paused);
}

/// A second approve for the same step is refused and changes nothing.
#[test]
fn double_decision_is_not_accepted() {
    let ctl = controller();
    let paused = paused_single_checkpoint(&ctl);
    let done = ctl.apply_decision(&paused, &Decision::approve()).expect("approve");

    let err = ctl
        .apply_decision(&done, &Decision::approve())
        .expect_err("second approve");
    assert!(matches!(err, EngineError::DecisionNotAccepted(_)));
    assert_eq!(done.interventions().len(), 1);
}

/// Misapplied decisions fail with InvalidTransition and leave the input untouched.
#[test]
fn decisions_outside_intervention_are_rejected() {
    let ctl = controller();
    let idle = session_of(vec![checkpoint("pick", "X", &["Y"])]);
    let running = ctl.start(&idle).expect("start");

    for session in [&idle, &running] {
        let before = session.clone();
        for decision in [Decision::approve(), Decision::modify(), Decision::reject()] {
            let err = ctl.apply_decision(session, &decision).expect_err("refused");
            assert!(matches!(err, EngineError::InvalidTransition(_)), "{err:?}");
        }
        let err = ctl.stage_alternative(session, "Y").expect_err("refused");
        assert!(matches!(err, EngineError::InvalidTransition(_)));
        assert_eq!(*session, before);
    }
}

#[test]
fn start_is_idempotent() {
    let ctl = controller();
    let running = ctl
        .start(&session_of(vec![plain("a", "x"), plain("b", "y")]))
        .expect("start");
    let again = ctl.start(&running).expect("start again");

    assert_eq!(again, running);
    assert_eq!(ctl.timer().scheduled().len(), 1);

    let complete = fire(&ctl, &fire(&ctl, &running));
    assert_eq!(ctl.start(&complete).expect("start complete"), complete);
}

/// Reset yields the same fresh Idle session from every reachable state.
#[test]
fn reset_from_any_state_yields_fresh_session() {
    let ctl = controller();
    let idle = session_of(vec![plain("a", "x"), checkpoint("b", "y", &["z"])]);
    let running = ctl.start(&idle).expect("start");
    let advanced = fire(&ctl, &running);
    let paused = fire(&ctl, &advanced);
    let staged = ctl.stage_alternative(&paused, "z").expect("stage");
    let complete = ctl.apply_decision(&staged, &Decision::modify()).expect("modify");
    assert_eq!(complete.status(), SessionStatus::Complete);

    for session in [&idle, &running, &advanced, &paused, &staged, &complete] {
        let fresh = ctl.reset(session);
        assert_eq!(fresh, idle);
        assert_eq!(fresh.status(), SessionStatus::Idle);
        assert_eq!(fresh.current_step_index(), 0);
        assert!(fresh.interventions().is_empty());
        assert_eq!(fresh.final_recommendation_value(), None);
        assert!(fresh.steps().iter().all(|s| s.status == StepStatus::Pending));
        assert_eq!(fresh.pending_timer(), None);
    }
}

/// A timer that fires after reset must not move the reset session.
#[test]
fn late_timer_after_reset_is_a_no_op() {
    let ctl = controller();
    let running = ctl.start(&session_of(vec![plain("a", "x")])).expect("start");
    let token = running.pending_timer().expect("timer armed");

    let reset = ctl.reset(&running);
    assert_eq!(ctl.timer().cancelled(), vec![token]);

    let after_late_tick = ctl.timer_fired(&reset, token);
    assert_eq!(after_late_tick, reset);
    assert_eq!(after_late_tick.status(), SessionStatus::Idle);

    // Restarting arms a new timer; the old token still does nothing.
    let restarted = ctl.start(&reset).expect("restart");
    assert_ne!(restarted.pending_timer(), Some(token));
    assert_eq!(ctl.timer_fired(&restarted, token), restarted);
}

/// Only the current timer advances a session; a superseded token is ignored.
#[test]
fn stale_token_from_previous_step_is_ignored() {
    let ctl = controller();
    let running = ctl
        .start(&session_of(vec![plain("a", "x"), plain("b", "y")]))
        .expect("start");
    let first = running.pending_timer().expect("first timer");
    let advanced = ctl.timer_fired(&running, first);
    assert_eq!(advanced.current_step_index(), 1);

    assert_eq!(ctl.timer_fired(&advanced, first), advanced);
}

/// Timer delay follows the reasoning length and the cap.
#[test]
fn each_step_is_armed_with_its_thinking_time() {
    let ctl = Controller::new(
        ManualTimer::new(),
        Pacing {
            ms_per_char: 10,
            max_thinking_ms: 150,
        },
    );
    let mut long = plain("b", "y");
    long.reasoning_text = "x".repeat(40);
    let session = ctl.start(&session_of(vec![plain("a", "x"), long])).expect("start");
    fire(&ctl, &session);

    let delays: Vec<u128> = ctl
        .timer()
        .scheduled()
        .iter()
        .map(|(_, delay)| delay.as_millis())
        .collect();
    assert_eq!(delays, vec![100, 150]);
}

#[derive(Debug, Clone, Copy)]
enum Event {
    Tick,
    Start,
    Approve,
    StageAndConfirm,
    Reject,
    Cancel,
    Reset,
}

const EVENTS: [Event; 7] = [
    Event::Tick,
    Event::Start,
    Event::Approve,
    Event::StageAndConfirm,
    Event::Reject,
    Event::Cancel,
    Event::Reset,
];

fn step(ctl: &Controller<ManualTimer>, session: &Session, event: Event) -> Session {
    let result = match event {
        Event::Tick => match session.pending_timer() {
            Some(token) => Ok(ctl.timer_fired(session, token)),
            None => Ok(session.clone()),
        },
        Event::Start => ctl.start(session),
        Event::Approve => ctl.apply_decision(session, &Decision::approve()),
        Event::StageAndConfirm => ctl
            .stage_alternative(session, "alt")
            .and_then(|staged| ctl.apply_decision(&staged, &Decision::modify())),
        Event::Reject => ctl.apply_decision(session, &Decision::reject()),
        Event::Cancel => Ok(ctl.cancel(session)),
        Event::Reset => Ok(ctl.reset(session)),
    };
    result.unwrap_or_else(|_| session.clone())
}

/// Every sequence of five events keeps the session invariants and the audit
/// log in step with applied Approve/Modify decisions.
#[test]
fn invariants_hold_over_all_short_event_sequences() {
    let ctl = controller();
    let initial = session_of(vec![
        checkpoint("a", "x", &["alt"]),
        plain("b", "y"),
        checkpoint("c", "z", &["alt"]),
    ]);

    let len = 5;
    let total = EVENTS.len().pow(len);
    for mut code in 0..total {
        let mut session = initial.clone();
        let mut trace = Vec::new();
        for _ in 0..len {
            let event = EVENTS[code % EVENTS.len()];
            code /= EVENTS.len();
            trace.push(event);

            let before = session.clone();
            session = step(&ctl, &session, event);

            let errors = validate_session(&session);
            assert!(errors.is_empty(), "{trace:?}: {errors:?}");
            if matches!(event, Event::Reset) {
                assert!(session.interventions().is_empty());
            } else {
                let (prev, now) = (before.interventions().len(), session.interventions().len());
                assert!(now == prev || now == prev + 1, "{trace:?}");
                assert_eq!(
                    &session.interventions().records()[..prev],
                    before.interventions().records(),
                    "audit log rewritten after {trace:?}"
                );
            }
        }
    }
}
