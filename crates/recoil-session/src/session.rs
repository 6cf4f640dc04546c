use std::sync::mpsc::{Receiver, TryRecvError};

use recoil_frame::{
    decode_telemetry, to_hex, Command, CommandEncoder, FireMode, ShotMode, TaggerIdentity,
    TelemetryFrame,
};
use recoil_link::{Characteristic, Link, LinkError};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::config::SessionConfig;
use crate::control::{SessionHandle, SessionMessage, UserAction};
use crate::edge::{Button, ButtonEdge, EdgeTracker};
use crate::error::{ReloadError, Result};
use crate::events::{EventSink, SessionEvent};
use crate::ir::IrEventDecoder;
use crate::reload::{ReloadState, ReloadStateMachine};
use crate::timer::ThreadTimer;

/// Why a session loop returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// A stop was requested through the handle.
    Stopped,
    /// The link reported a fatal error.
    LinkLost(String),
}

/// Point-in-time view of session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub identity: TaggerIdentity,
    pub reload_state: ReloadState,
    pub recoil_enabled: bool,
    pub fire_mode: FireMode,
    pub shot_mode: ShotMode,
    pub ammo_count: Option<u8>,
    pub battery_level: Option<u8>,
    pub player_id: Option<u8>,
    pub frames_seen: u64,
    pub frames_dropped: u64,
}

/// One connected tagger, driven by a single control loop.
///
/// Owns every piece of mutable protocol state for the connection. Nothing
/// else writes to it: timer expiries and user actions arrive as
/// [`SessionMessage`]s and are applied by [`run`](Self::run).
pub struct TaggerSession<L: Link, E: EventSink> {
    link: L,
    events: E,
    config: SessionConfig,
    handle: SessionHandle,
    identity: TaggerIdentity,
    encoder: CommandEncoder,
    edges: EdgeTracker,
    ir: IrEventDecoder,
    reload: ReloadStateMachine<ThreadTimer>,
    recoil_enabled: bool,
    fire_mode: FireMode,
    shot_mode: ShotMode,
    ammo_count: Option<u8>,
    battery_level: Option<u8>,
    player_id: Option<u8>,
    frames_seen: u64,
    frames_dropped: u64,
    closed: bool,
}

impl<L: Link, E: EventSink> TaggerSession<L, E> {
    /// Identify the tagger, enable telemetry and publish `connected`.
    pub fn establish(
        mut link: L,
        mut events: E,
        config: &SessionConfig,
        handle: SessionHandle,
    ) -> Result<Self> {
        config.validate()?;

        let identity_raw = link.read(Characteristic::Identity)?;
        let identity = TaggerIdentity::decode(&identity_raw)?;
        info!(
            model = identity.tagger_type.model_name(),
            model_code = identity.model_code,
            "tagger identified"
        );
        events.publish(SessionEvent::message(identity.tagger_type.model_name()));

        link.subscribe(Characteristic::Telemetry)?;

        let reload = ReloadStateMachine::new(
            ThreadTimer::new(handle.sender()),
            config.reload_interval(),
            config.max_ammo,
        );

        let mut session = Self {
            link,
            events,
            config: config.clone(),
            handle,
            identity,
            encoder: CommandEncoder::new(identity.tagger_type),
            edges: EdgeTracker::new(),
            ir: IrEventDecoder::new(),
            reload,
            recoil_enabled: config.recoil_enabled,
            fire_mode: config.fire_mode,
            shot_mode: config.shot_mode,
            ammo_count: None,
            battery_level: None,
            player_id: None,
            frames_seen: 0,
            frames_dropped: 0,
            closed: false,
        };

        if config.sync_on_connect {
            session.sync_configuration();
        }

        session
            .events
            .publish(SessionEvent::Connected { identity });
        Ok(session)
    }

    pub fn identity(&self) -> TaggerIdentity {
        self.identity
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            identity: self.identity,
            reload_state: self.reload.state(),
            recoil_enabled: self.recoil_enabled,
            fire_mode: self.fire_mode,
            shot_mode: self.shot_mode,
            ammo_count: self.ammo_count,
            battery_level: self.battery_level,
            player_id: self.player_id,
            frames_seen: self.frames_seen,
            frames_dropped: self.frames_dropped,
        }
    }

    /// Run until stopped or the link is lost, then tear down.
    ///
    /// Each iteration first applies queued mailbox messages, then blocks on
    /// the link for at most the configured receive timeout.
    pub fn run(&mut self, inbox: &Receiver<SessionMessage>) -> SessionEnd {
        let timeout = self.config.receive_timeout();
        loop {
            if let Some(end) = self.drain_inbox(inbox) {
                return self.teardown(end);
            }

            match self.link.receive(timeout) {
                Ok(data) => self.handle_notification(&data),
                Err(LinkError::Timeout) => continue,
                Err(err) => {
                    warn!(error = %err, "link lost");
                    return self.teardown(SessionEnd::LinkLost(err.to_string()));
                }
            }
        }
    }

    /// Apply every queued message. Returns `Some` when the loop must end.
    pub fn drain_inbox(&mut self, inbox: &Receiver<SessionMessage>) -> Option<SessionEnd> {
        loop {
            if self.handle.is_stopped() {
                return Some(SessionEnd::Stopped);
            }
            match inbox.try_recv() {
                Ok(message) => {
                    if let Some(end) = self.handle_message(message) {
                        return Some(end);
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return None,
            }
        }
    }

    pub fn handle_message(&mut self, message: SessionMessage) -> Option<SessionEnd> {
        match message {
            SessionMessage::ReloadTimerExpired(token) => {
                if let Some(command) = self.reload.on_timer_expired(token) {
                    self.finish_reload(command);
                }
                None
            }
            SessionMessage::User(action) => {
                self.handle_action(action);
                None
            }
            SessionMessage::Stop => Some(SessionEnd::Stopped),
        }
    }

    /// Process one raw telemetry notification.
    pub fn handle_notification(&mut self, data: &[u8]) {
        let frame = match decode_telemetry(data) {
            Ok(frame) => frame,
            Err(err) => {
                self.frames_dropped += 1;
                debug!(error = %err, "dropping telemetry frame");
                return;
            }
        };
        self.frames_seen += 1;
        trace!(frame = %to_hex(frame.raw()), "telemetry");

        self.battery_level = Some(frame.battery_level);

        for edge in self.edges.observe(&frame) {
            self.handle_edge(edge);
        }

        if self.ammo_count != Some(frame.ammo_count) {
            debug!(ammo = frame.ammo_count, "ammo changed");
            self.ammo_count = Some(frame.ammo_count);
            self.events.publish(SessionEvent::AmmoChanged {
                count: frame.ammo_count,
            });
        }

        self.track_player(&frame);

        if let Some(hit) = self.ir.observe(&frame) {
            info!(
                gun_id = hit.gun_id,
                sensor = hit.sensor_source,
                counter = hit.event_counter,
                grenade = hit.is_grenade,
                "hit registered"
            );
            self.events.publish(SessionEvent::IrEvent(hit));
        }
    }

    pub fn handle_action(&mut self, action: UserAction) {
        match action {
            UserAction::ToggleRecoil => self.toggle_recoil(),
            UserAction::CycleFireMode => self.set_fire_config(self.fire_mode.next(), self.shot_mode),
            UserAction::SetFireConfig { mode, shot } => self.set_fire_config(mode, shot),
            UserAction::Reload => self.request_reload(),
        }
    }

    fn track_player(&mut self, frame: &TelemetryFrame) {
        match self.player_id {
            Some(old) if old != frame.player_id => {
                info!(old, new = frame.player_id, "player id changed");
            }
            _ => {}
        }
        self.player_id = Some(frame.player_id);
    }

    fn handle_edge(&mut self, edge: ButtonEdge) {
        debug!(button = ?edge.button, previous = edge.previous, current = edge.current, "button pressed");
        match edge.button {
            Button::Fire => {
                let ammo_empty = !matches!(self.ammo_count, Some(n) if n > 0);
                self.events
                    .publish(SessionEvent::FirePressed { ammo_empty });
            }
            Button::Reload => self.request_reload(),
            Button::Back => self.set_fire_config(self.fire_mode.next(), self.shot_mode),
            Button::Power => self.toggle_recoil(),
        }
    }

    fn request_reload(&mut self) {
        match self.reload.on_reload_pressed() {
            Ok(command) => {
                if let Err(err) = self.send_command(command) {
                    warn!(error = %err, "failed to send start reload");
                    self.events
                        .publish(SessionEvent::message(format!("Reload command failed: {err}")));
                }
                self.events.publish(SessionEvent::ReloadStarted);
            }
            Err(ReloadError::AlreadyReloading) => {
                info!("still reloading");
                self.events.publish(SessionEvent::message("Still Reloading!"));
            }
            Err(err) => {
                warn!(error = %err, "reload not started");
                self.events
                    .publish(SessionEvent::message(format!("Reload failed: {err}")));
            }
        }
    }

    fn finish_reload(&mut self, command: Command) {
        let Command::FinishReload { ammo } = command else {
            return;
        };
        if let Err(err) = self.send_command(command) {
            warn!(error = %err, "failed to send finish reload");
            self.events
                .publish(SessionEvent::message(format!("Reload command failed: {err}")));
        }
        self.events.publish(SessionEvent::ReloadFinished { ammo });
    }

    fn toggle_recoil(&mut self) {
        let enabled = !self.recoil_enabled;
        match self.send_command(Command::SetRecoil { enabled }) {
            Ok(()) => {
                self.recoil_enabled = enabled;
                self.events.publish(SessionEvent::RecoilToggled { enabled });
                self.events.publish(SessionEvent::message(format!(
                    "Recoil is {}",
                    if enabled { "ENABLED" } else { "DISABLED" }
                )));
            }
            Err(err) => {
                warn!(error = %err, enabled, "recoil write failed");
                self.events
                    .publish(SessionEvent::message(format!("Failed to set recoil: {err}")));
            }
        }
    }

    fn set_fire_config(&mut self, mode: FireMode, shot: ShotMode) {
        match self.send_command(Command::SetFireConfig { mode, shot }) {
            Ok(()) => {
                self.fire_mode = mode;
                self.shot_mode = shot;
                self.events.publish(SessionEvent::FireModeChanged {
                    mode,
                    shot_mode: shot,
                });
                self.events.publish(SessionEvent::message(mode.label()));
            }
            Err(err) => {
                warn!(error = %err, ?mode, ?shot, "fire config write failed");
                self.events.publish(SessionEvent::message(format!(
                    "Failed to set fire mode: {err}"
                )));
            }
        }
    }

    /// Push the current recoil and fire settings without changing them.
    fn sync_configuration(&mut self) {
        let commands = [
            Command::SetRecoil {
                enabled: self.recoil_enabled,
            },
            Command::SetFireConfig {
                mode: self.fire_mode,
                shot: self.shot_mode,
            },
        ];
        for command in commands {
            if let Err(err) = self.send_command(command) {
                warn!(error = %err, command = command.name(), "initial configuration write failed");
                self.events.publish(SessionEvent::message(format!(
                    "Failed to apply {}: {err}",
                    command.name()
                )));
            }
        }
    }

    fn send_command(&mut self, command: Command) -> std::result::Result<(), LinkError> {
        let data = self.encoder.encode(&command);
        debug!(
            command = command.name(),
            target = %command.target(),
            frame = %to_hex(&data),
            "writing command"
        );
        self.link.write(command.target(), &data)
    }

    fn teardown(&mut self, end: SessionEnd) -> SessionEnd {
        if self.closed {
            return end;
        }
        self.closed = true;

        // The timer must be gone before any other state is released.
        self.reload.reset();
        self.edges.reset();
        self.ir.reset();

        let reason = match &end {
            SessionEnd::Stopped => {
                if let Err(err) = self.link.unsubscribe(Characteristic::Telemetry) {
                    debug!(error = %err, "unsubscribe failed during shutdown");
                }
                "stopped".to_string()
            }
            SessionEnd::LinkLost(reason) => reason.clone(),
        };

        info!(
            %reason,
            frames = self.frames_seen,
            dropped = self.frames_dropped,
            "session closed"
        );
        self.events.publish(SessionEvent::Disconnected { reason });
        end
    }
}

impl<L: Link, E: EventSink> Drop for TaggerSession<L, E> {
    fn drop(&mut self) {
        if !self.closed {
            self.reload.reset();
        }
    }
}
