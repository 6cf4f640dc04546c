use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use recoil_link::{DeviceInfo, LinkProvider};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::control::{session_channel, SessionHandle, SessionMessage};
use crate::error::Result;
use crate::events::{EventSink, SessionEvent};
use crate::session::{SessionEnd, TaggerSession};

/// Why the supervisor returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorExit {
    /// A stop was requested through the handle.
    Stopped,
    /// The link was lost and reconnecting is disabled.
    Disconnected(String),
    /// Connecting or establishing a session failed and reconnecting is disabled.
    ConnectFailed(String),
}

/// Discovery, connection and reconnect loop around [`TaggerSession`].
///
/// Scanning repeats until a device whose name matches the configured prefix
/// shows up. After link loss the supervisor waits `reconnect_delay_ms` and
/// scans again, unless `reconnect` is off.
pub struct ConnectionSupervisor<P: LinkProvider, E: EventSink> {
    provider: P,
    events: E,
    config: SessionConfig,
    handle: SessionHandle,
    inbox: Receiver<SessionMessage>,
}

impl<P: LinkProvider, E: EventSink> ConnectionSupervisor<P, E> {
    pub fn new(provider: P, events: E, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let (handle, inbox) = session_channel();
        Ok(Self {
            provider,
            events,
            config,
            handle,
            inbox,
        })
    }

    /// Handle for user actions and stop requests. Valid across reconnects.
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Run until stopped, or until a connection ends with reconnect disabled.
    pub fn run(&mut self) -> SupervisorExit {
        loop {
            let Some(device) = self.discover() else {
                return SupervisorExit::Stopped;
            };

            self.events.publish(SessionEvent::message("Connecting"));
            info!(device = device.label(), "connecting");
            let link = match self.provider.connect(&device) {
                Ok(link) => link,
                Err(err) => {
                    warn!(device = device.label(), error = %err, "connect failed");
                    match self.retry_or(SupervisorExit::ConnectFailed(err.to_string())) {
                        Some(exit) => return exit,
                        None => continue,
                    }
                }
            };

            // Leftovers from a previous connection must not reach the new session.
            self.discard_stale_messages();
            if self.handle.is_stopped() {
                return SupervisorExit::Stopped;
            }

            // The session borrows the sink; it must be gone before either arm below publishes.
            let outcome = match TaggerSession::establish(
                link,
                &mut self.events,
                &self.config,
                self.handle.clone(),
            ) {
                Ok(mut session) => Ok(session.run(&self.inbox)),
                Err(err) => Err(err),
            };

            match outcome {
                Ok(SessionEnd::Stopped) => return SupervisorExit::Stopped,
                Ok(SessionEnd::LinkLost(reason)) => {
                    self.events.publish(SessionEvent::message("Disconnected"));
                    if let Some(exit) = self.retry_or(SupervisorExit::Disconnected(reason)) {
                        return exit;
                    }
                }
                Err(err) => {
                    warn!(device = device.label(), error = %err, "session setup failed");
                    self.events
                        .publish(SessionEvent::message(format!("Connection failed: {err}")));
                    if let Some(exit) = self.retry_or(SupervisorExit::ConnectFailed(err.to_string()))
                    {
                        return exit;
                    }
                }
            }
        }
    }

    /// Scan until a matching device is found. `None` means stop was requested.
    fn discover(&mut self) -> Option<DeviceInfo> {
        loop {
            if self.handle.is_stopped() {
                return None;
            }

            self.events.publish(SessionEvent::message("Scanning"));
            match self.provider.scan(self.config.scan_duration()) {
                Ok(devices) => {
                    debug!(count = devices.len(), "scan complete");
                    let found = devices.into_iter().find(|device| {
                        device
                            .name
                            .as_deref()
                            .is_some_and(|name| self.config.matches_device(name))
                    });
                    if let Some(device) = found {
                        info!(device = device.label(), rssi = ?device.rssi, "tagger found");
                        self.events.publish(SessionEvent::message("Tagger Found"));
                        return Some(device);
                    }
                }
                Err(err) => {
                    warn!(error = %err, "scan failed");
                    if !self.wait(self.config.reconnect_delay()) {
                        return None;
                    }
                }
            }
        }
    }

    /// With reconnect on, wait out the delay and return `None` to go again.
    fn retry_or(&mut self, exit: SupervisorExit) -> Option<SupervisorExit> {
        if !self.config.reconnect {
            return Some(exit);
        }
        if self.wait(self.config.reconnect_delay()) {
            debug!(delay = ?self.config.reconnect_delay(), "reconnecting");
            None
        } else {
            Some(SupervisorExit::Stopped)
        }
    }

    /// Sleep on the mailbox. Returns false if a stop arrived first.
    fn wait(&mut self, delay: Duration) -> bool {
        let deadline = Instant::now() + delay;
        loop {
            if self.handle.is_stopped() {
                return false;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return true;
            }
            match self.inbox.recv_timeout(remaining) {
                Ok(SessionMessage::Stop) => return false,
                Ok(message) => debug!(?message, "dropping message while disconnected"),
                Err(RecvTimeoutError::Timeout) => return true,
                // The supervisor holds a sender, so this cannot happen.
                Err(RecvTimeoutError::Disconnected) => return true,
            }
        }
    }

    fn discard_stale_messages(&mut self) {
        while let Ok(message) = self.inbox.try_recv() {
            match message {
                SessionMessage::Stop => {}
                other => debug!(message = ?other, "discarding stale message"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use recoil_link::{Capture, LinkError, ReplayLink, ReplayProvider};

    use super::*;

    fn fast_config() -> SessionConfig {
        SessionConfig {
            receive_timeout_ms: 5,
            scan_duration_ms: 5,
            reconnect_delay_ms: 5,
            reload_interval_ms: 20,
            ..SessionConfig::default()
        }
    }

    fn messages(events: &[SessionEvent]) -> Vec<&str> {
        events
            .iter()
            .filter_map(|event| match event {
                SessionEvent::Message { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn rejects_invalid_config() {
        let config = SessionConfig {
            max_ammo: 0,
            ..fast_config()
        };
        let provider = ReplayProvider::new(Capture::new());
        assert!(ConnectionSupervisor::new(provider, Vec::new(), config).is_err());
    }

    #[test]
    fn exits_after_link_loss_without_reconnect() {
        let capture = Capture::new().idle(1).disconnect("out of range");
        let config = SessionConfig {
            reconnect: false,
            ..fast_config()
        };
        let mut events = Vec::new();
        let mut supervisor =
            ConnectionSupervisor::new(ReplayProvider::new(capture), &mut events, config).unwrap();

        assert_eq!(
            supervisor.run(),
            SupervisorExit::Disconnected("link disconnected: out of range".to_string())
        );
        drop(supervisor);

        let texts = messages(&events);
        assert_eq!(
            texts,
            vec![
                "Scanning",
                "Tagger Found",
                "Connecting",
                "RK-45 Spitfire Pistol",
                "Disconnected"
            ]
        );
        assert!(events
            .iter()
            .any(|event| matches!(event, SessionEvent::Connected { .. })));
    }

    #[test]
    fn ignores_devices_without_tagger_prefix() {
        let capture = Capture::new().with_name("Headphones");
        let provider = ReplayProvider::new(capture).with_rescan(true);
        let (tx, rx) = mpsc::channel();
        let mut supervisor = ConnectionSupervisor::new(provider, tx, fast_config()).unwrap();
        let handle = supervisor.handle();

        let worker = std::thread::spawn(move || supervisor.run());
        let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(first, SessionEvent::message("Scanning"));
        handle.stop();

        assert_eq!(worker.join().unwrap(), SupervisorExit::Stopped);
        assert!(rx
            .try_iter()
            .all(|event| event == SessionEvent::message("Scanning")));
    }

    #[test]
    fn reconnects_after_link_loss() {
        let capture = Capture::new().disconnect("dropped");
        let provider = ReplayProvider::new(capture).with_rescan(true);
        let (tx, rx) = mpsc::channel();
        let mut supervisor = ConnectionSupervisor::new(provider, tx, fast_config()).unwrap();
        let handle = supervisor.handle();

        let worker = std::thread::spawn(move || supervisor.run());
        let mut connected = 0;
        while connected < 2 {
            let event = rx.recv_timeout(Duration::from_secs(2)).unwrap();
            if let SessionEvent::Connected { .. } = event {
                connected += 1;
            }
        }
        handle.stop();
        assert_eq!(worker.join().unwrap(), SupervisorExit::Stopped);
    }

    #[test]
    fn setup_failure_reports_and_exits_without_reconnect() {
        let capture = Capture::new().with_identity(vec![0u8; 5]);
        let config = SessionConfig {
            reconnect: false,
            ..fast_config()
        };
        let mut events = Vec::new();
        let mut supervisor =
            ConnectionSupervisor::new(ReplayProvider::new(capture), &mut events, config).unwrap();

        assert!(matches!(supervisor.run(), SupervisorExit::ConnectFailed(_)));
        drop(supervisor);

        let texts = messages(&events);
        assert_eq!(&texts[..3], &["Scanning", "Tagger Found", "Connecting"]);
        assert!(texts
            .last()
            .is_some_and(|text| text.starts_with("Connection failed")));
        assert!(!events
            .iter()
            .any(|event| matches!(event, SessionEvent::Connected { .. })));
    }

    struct RefusingProvider;

    impl LinkProvider for RefusingProvider {
        type Link = ReplayLink;

        fn scan(&mut self, _duration: Duration) -> recoil_link::Result<Vec<DeviceInfo>> {
            Ok(vec![DeviceInfo::new("AA:BB:CC:DD:EE:FF", Some("SRG1-0001".to_string()))])
        }

        fn connect(&mut self, device: &DeviceInfo) -> recoil_link::Result<ReplayLink> {
            Err(LinkError::DeviceNotFound(device.address.clone()))
        }
    }

    #[test]
    fn connect_failure_without_reconnect() {
        let config = SessionConfig {
            reconnect: false,
            ..fast_config()
        };
        let mut supervisor =
            ConnectionSupervisor::new(RefusingProvider, Vec::new(), config).unwrap();
        assert!(matches!(supervisor.run(), SupervisorExit::ConnectFailed(_)));
    }
}
