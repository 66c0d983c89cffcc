//! Single-consumer event loop owning one session.
//!
//! Host commands and timer expiries arrive on separate channels and are
//! applied one at a time by a single task, so a scheduler tick and a decision
//! can never interleave. Observers read snapshots from a `watch` channel and
//! only ever see fully applied transitions.

use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::controller::Controller;
use crate::core::error::EngineError;
use crate::core::scheduler::Pacing;
use crate::core::session::Session;
use crate::core::types::{Decision, Resolution, TimerToken};
use crate::io::timer::TokioTimer;

const COMMAND_BUFFER: usize = 32;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("session driver has stopped")]
    Closed,
}

/// Host-originated commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Reset,
    Cancel,
    Stage(String),
    Decide(Decision),
}

struct Request {
    command: Command,
    reply: oneshot::Sender<Result<(), EngineError>>,
}

/// Builder for a driver task.
pub struct SessionDriver {
    session: Session,
    controller: Controller<TokioTimer>,
    ticks: mpsc::UnboundedReceiver<TimerToken>,
}

impl SessionDriver {
    pub fn new(session: Session, pacing: Pacing) -> Self {
        let (timer, ticks) = TokioTimer::new();
        Self {
            session,
            controller: Controller::new(timer, pacing),
            ticks,
        }
    }

    pub fn on_intervention(
        mut self,
        observer: impl Fn(&Resolution) + Send + Sync + 'static,
    ) -> Self {
        self.controller = self.controller.on_intervention(observer);
        self
    }

    /// Spawn the event loop on the current tokio runtime.
    pub fn spawn(self) -> SessionHandle {
        let (requests_tx, requests) = mpsc::channel(COMMAND_BUFFER);
        let (snapshots_tx, snapshots) = watch::channel(self.session.clone());
        let task = tokio::spawn(run(
            self.session,
            self.controller,
            requests,
            self.ticks,
            snapshots_tx,
        ));
        SessionHandle {
            requests: requests_tx,
            snapshots,
            task,
        }
    }
}

/// Host-side handle to a running driver.
pub struct SessionHandle {
    requests: mpsc::Sender<Request>,
    snapshots: watch::Receiver<Session>,
    task: JoinHandle<Session>,
}

impl SessionHandle {
    pub async fn start(&self) -> Result<(), DriverError> {
        self.send(Command::Start).await
    }

    pub async fn reset(&self) -> Result<(), DriverError> {
        self.send(Command::Reset).await
    }

    pub async fn cancel(&self) -> Result<(), DriverError> {
        self.send(Command::Cancel).await
    }

    pub async fn stage(&self, alternative_id: impl Into<String>) -> Result<(), DriverError> {
        self.send(Command::Stage(alternative_id.into())).await
    }

    pub async fn decide(&self, decision: Decision) -> Result<(), DriverError> {
        self.send(Command::Decide(decision)).await
    }

    /// Apply `command` and wait until the new snapshot has been published.
    pub async fn send(&self, command: Command) -> Result<(), DriverError> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(Request { command, reply })
            .await
            .map_err(|_| DriverError::Closed)?;
        response.await.map_err(|_| DriverError::Closed)??;
        Ok(())
    }

    pub fn snapshot(&self) -> Session {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.snapshots.clone()
    }

    /// Stop the loop, cancelling any outstanding timer, and return the last session.
    pub async fn shutdown(self) -> Result<Session, DriverError> {
        drop(self.requests);
        self.task.await.map_err(|_| DriverError::Closed)
    }
}

async fn run(
    mut session: Session,
    controller: Controller<TokioTimer>,
    mut requests: mpsc::Receiver<Request>,
    mut ticks: mpsc::UnboundedReceiver<TimerToken>,
    snapshots: watch::Sender<Session>,
) -> Session {
    debug!(session_id = session.id(), "driver started");
    loop {
        let reply = tokio::select! {
            request = requests.recv() => {
                let Some(Request { command, reply }) = request else {
                    break;
                };
                match apply(&controller, &session, &command) {
                    Ok(next) => {
                        session = next;
                        Some((reply, Ok(())))
                    }
                    Err(err) => {
                        warn!(session_id = session.id(), ?command, error = %err, "command refused");
                        Some((reply, Err(err)))
                    }
                }
            }
            Some(token) = ticks.recv() => {
                session = controller.timer_fired(&session, token);
                None
            }
        };

        publish(&snapshots, &session);
        if let Some((reply, result)) = reply {
            // Caller may have stopped waiting; the transition stands either way.
            let _ = reply.send(result);
        }
    }

    let session = controller.cancel(&session);
    publish(&snapshots, &session);
    debug!(session_id = session.id(), status = session.status().as_str(), "driver stopped");
    session
}

fn apply(
    controller: &Controller<TokioTimer>,
    session: &Session,
    command: &Command,
) -> Result<Session, EngineError> {
    match command {
        Command::Start => controller.start(session),
        Command::Reset => Ok(controller.reset(session)),
        Command::Cancel => Ok(controller.cancel(session)),
        Command::Stage(alternative_id) => controller.stage_alternative(session, alternative_id),
        Command::Decide(decision) => controller.apply_decision(session, decision),
    }
}

fn publish(snapshots: &watch::Sender<Session>, session: &Session) {
    snapshots.send_if_modified(|current| {
        if current == session {
            return false;
        }
        *current = session.clone();
        true
    });
}
