use std::sync::mpsc::Sender;

use recoil_frame::{FireMode, ShotMode, TaggerIdentity};
use serde::Serialize;

use crate::ir::IrEvent;

/// State changes published to consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    Connected { identity: TaggerIdentity },
    Disconnected { reason: String },
    Message { text: String },
    AmmoChanged { count: u8 },
    IrEvent(IrEvent),
    FirePressed { ammo_empty: bool },
    ReloadStarted,
    ReloadFinished { ammo: u8 },
    RecoilToggled { enabled: bool },
    FireModeChanged { mode: FireMode, shot_mode: ShotMode },
}

impl SessionEvent {
    pub fn message(text: impl Into<String>) -> Self {
        SessionEvent::Message { text: text.into() }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Connected { .. } => "connected",
            SessionEvent::Disconnected { .. } => "disconnected",
            SessionEvent::Message { .. } => "message",
            SessionEvent::AmmoChanged { .. } => "ammo_changed",
            SessionEvent::IrEvent(_) => "ir_event",
            SessionEvent::FirePressed { .. } => "fire_pressed",
            SessionEvent::ReloadStarted => "reload_started",
            SessionEvent::ReloadFinished { .. } => "reload_finished",
            SessionEvent::RecoilToggled { .. } => "recoil_toggled",
            SessionEvent::FireModeChanged { .. } => "fire_mode_changed",
        }
    }
}

/// Receives published session events.
pub trait EventSink {
    fn publish(&mut self, event: SessionEvent);
}

impl EventSink for Sender<SessionEvent> {
    fn publish(&mut self, event: SessionEvent) {
        // A consumer that went away must not take the session down with it.
        let _ = self.send(event);
    }
}

impl EventSink for Vec<SessionEvent> {
    fn publish(&mut self, event: SessionEvent) {
        self.push(event);
    }
}

impl<T: EventSink + ?Sized> EventSink for &mut T {
    fn publish(&mut self, event: SessionEvent) {
        (**self).publish(event);
    }
}
