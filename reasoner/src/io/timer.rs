//! Timer primitive used by the scheduler.
//!
//! A timer hands out a [`TimerToken`] per scheduled delay and reports expiry by
//! delivering that token back to whoever owns the session. Tokens are never
//! reused, so a late delivery for a cancelled timer can always be told apart
//! from the live one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::core::types::TimerToken;

/// `schedule(delay) -> token` / `cancel(token)`.
pub trait Timer {
    fn schedule(&self, delay: Duration) -> TimerToken;
    fn cancel(&self, token: TimerToken);
}

/// Tokio-backed timer delivering expired tokens on an unbounded channel.
///
/// Must be used from within a tokio runtime.
pub struct TokioTimer {
    ticks: mpsc::UnboundedSender<TimerToken>,
    next: AtomicU64,
    tasks: Mutex<HashMap<TimerToken, JoinHandle<()>>>,
}

impl TokioTimer {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TimerToken>) {
        let (ticks, rx) = mpsc::unbounded_channel();
        let timer = Self {
            ticks,
            next: AtomicU64::new(1),
            tasks: Mutex::new(HashMap::new()),
        };
        (timer, rx)
    }
}

impl Timer for TokioTimer {
    fn schedule(&self, delay: Duration) -> TimerToken {
        let token = TimerToken(self.next.fetch_add(1, Ordering::Relaxed));
        let ticks = self.ticks.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver gone means the driver shut down; nothing left to notify.
            let _ = ticks.send(token);
        });
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|_, task| !task.is_finished());
        tasks.insert(token, handle);
        debug!(token = token.0, delay_ms = delay.as_millis() as u64, "timer scheduled");
        token
    }

    fn cancel(&self, token: TimerToken) {
        let task = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&token);
        if let Some(task) = task {
            task.abort();
            debug!(token = token.0, "timer cancelled");
        }
    }
}

impl Drop for TokioTimer {
    fn drop(&mut self) {
        let tasks = self.tasks.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (_, task) in tasks.drain() {
            task.abort();
        }
    }
}
