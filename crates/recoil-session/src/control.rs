use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use recoil_frame::{FireMode, ShotMode};

use crate::timer::TimerToken;

/// Requests from outside the session loop (UI, CLI).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    ToggleRecoil,
    CycleFireMode,
    SetFireConfig { mode: FireMode, shot: ShotMode },
    Reload,
}

/// Everything the session loop consumes besides notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMessage {
    ReloadTimerExpired(TimerToken),
    User(UserAction),
    Stop,
}

/// Cloneable handle for talking to a running session or supervisor.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: Sender<SessionMessage>,
    stop: Arc<AtomicBool>,
}

impl SessionHandle {
    /// Queue a user action. Returns false if the loop is gone.
    pub fn send(&self, action: UserAction) -> bool {
        self.tx.send(SessionMessage::User(action)).is_ok()
    }

    /// Ask the loop to stop at its next poll.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        let _ = self.tx.send(SessionMessage::Stop);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    pub(crate) fn sender(&self) -> Sender<SessionMessage> {
        self.tx.clone()
    }
}

/// Create a mailbox: the handle side for producers, the receiver for the loop.
pub fn session_channel() -> (SessionHandle, Receiver<SessionMessage>) {
    let (tx, rx) = mpsc::channel();
    let handle = SessionHandle {
        tx,
        stop: Arc::new(AtomicBool::new(false)),
    };
    (handle, rx)
}
