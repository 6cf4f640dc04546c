//! One-shot reload timers.
//!
//! A timer never touches session state. When it fires it posts
//! [`SessionMessage::ReloadTimerExpired`] into the session mailbox and the
//! session loop handles it in order with everything else.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, trace};

use crate::control::SessionMessage;

/// Identifies one scheduled timer so stale expiries can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(pub u64);

/// A cancelable one-shot scheduler.
pub trait TimerScheduler {
    /// Arrange for `token` to expire after `delay`.
    fn schedule(&mut self, token: TimerToken, delay: Duration) -> std::io::Result<()>;

    /// Cancel `token`. Once this returns the timer will not fire.
    fn cancel(&mut self, token: TimerToken);
}

struct PendingTimer {
    token: TimerToken,
    cancel: Sender<()>,
    thread: JoinHandle<()>,
}

/// Thread-backed scheduler that posts expiries into a session mailbox.
pub struct ThreadTimer {
    mailbox: Sender<SessionMessage>,
    pending: Option<PendingTimer>,
}

impl ThreadTimer {
    pub fn new(mailbox: Sender<SessionMessage>) -> Self {
        Self {
            mailbox,
            pending: None,
        }
    }

    /// Token of the timer currently armed, if any.
    pub fn pending(&self) -> Option<TimerToken> {
        self.pending.as_ref().map(|p| p.token)
    }

    fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            // Dropping the sender wakes the timer thread early.
            drop(pending.cancel);
            if pending.thread.join().is_err() {
                debug!(token = pending.token.0, "reload timer thread panicked");
            }
            trace!(token = pending.token.0, "reload timer cancelled");
        }
    }
}

impl TimerScheduler for ThreadTimer {
    fn schedule(&mut self, token: TimerToken, delay: Duration) -> std::io::Result<()> {
        self.cancel_pending();

        let (cancel, cancelled) = mpsc::channel::<()>();
        let mailbox = self.mailbox.clone();
        let thread = std::thread::Builder::new()
            .name("reload-timer".to_string())
            .spawn(move || {
                if let Err(RecvTimeoutError::Timeout) = cancelled.recv_timeout(delay) {
                    let _ = mailbox.send(SessionMessage::ReloadTimerExpired(token));
                }
            })?;

        self.pending = Some(PendingTimer {
            token,
            cancel,
            thread,
        });
        Ok(())
    }

    fn cancel(&mut self, token: TimerToken) {
        if self.pending() == Some(token) {
            self.cancel_pending();
        }
    }
}

impl Drop for ThreadTimer {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
