//! Reload state machine.
//!
//! ```text
//!            reload edge / StartReload + arm timer
//!   ┌──────┐ ─────────────────────────────────────▶ ┌───────────┐
//!   │ Idle │                                         │ Reloading │ ◀─┐ reload edge:
//!   └──────┘ ◀───────────────────────────────────── └───────────┘ ──┘ AlreadyReloading
//!        ▲     timer expiry / FinishReload(max_ammo)      │
//!        └────────────────── reset (no command) ──────────┘
//! ```
//! The local button edge is authoritative: the timer starts without waiting
//! for the device to acknowledge. The device stays the source of truth for
//! the actual ammo count, which arrives separately in telemetry.

use std::time::Duration;

use recoil_frame::Command;
use serde::Serialize;
use tracing::{debug, trace};

use crate::error::ReloadError;
use crate::timer::{TimerScheduler, TimerToken};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadState {
    #[default]
    Idle,
    Reloading,
}

pub struct ReloadStateMachine<S> {
    state: ReloadState,
    scheduler: S,
    interval: Duration,
    max_ammo: u8,
    next_token: u64,
    pending: Option<TimerToken>,
}

impl<S: TimerScheduler> ReloadStateMachine<S> {
    pub fn new(scheduler: S, interval: Duration, max_ammo: u8) -> Self {
        Self {
            state: ReloadState::Idle,
            scheduler,
            interval,
            max_ammo,
            next_token: 0,
            pending: None,
        }
    }

    pub fn state(&self) -> ReloadState {
        self.state
    }

    pub fn max_ammo(&self) -> u8 {
        self.max_ammo
    }

    /// Token of the armed timer while reloading.
    pub fn pending_timer(&self) -> Option<TimerToken> {
        self.pending
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Handle a reload button edge.
    ///
    /// Returns the command to send when a reload starts. A press during the
    /// cooldown is dropped, not queued.
    pub fn on_reload_pressed(&mut self) -> Result<Command, ReloadError> {
        if self.state == ReloadState::Reloading {
            return Err(ReloadError::AlreadyReloading);
        }

        self.next_token += 1;
        let token = TimerToken(self.next_token);
        self.scheduler
            .schedule(token, self.interval)
            .map_err(ReloadError::Timer)?;

        self.pending = Some(token);
        self.state = ReloadState::Reloading;
        debug!(token = token.0, interval = ?self.interval, "reload started");
        Ok(Command::StartReload)
    }

    /// Handle a timer expiry delivered through the session mailbox.
    ///
    /// Expiries for timers that were cancelled or superseded are ignored.
    pub fn on_timer_expired(&mut self, token: TimerToken) -> Option<Command> {
        if self.state != ReloadState::Reloading || self.pending != Some(token) {
            trace!(token = token.0, "ignoring stale reload timer");
            return None;
        }

        self.pending = None;
        self.state = ReloadState::Idle;
        debug!(ammo = self.max_ammo, "reload finished");
        Some(Command::FinishReload {
            ammo: self.max_ammo,
        })
    }

    /// Cancel any armed timer and return to idle without finishing the reload.
    pub fn reset(&mut self) {
        if let Some(token) = self.pending.take() {
            self.scheduler.cancel(token);
            debug!(token = token.0, "reload cancelled");
        }
        self.state = ReloadState::Idle;
    }
}
