//! Capture replay link.
//!
//! Plays a recorded notification script back through the [`Link`] contract so
//! the session pipeline can run end-to-end without a radio.
//!
//! Script format, one directive per line:
//! ```text
//! # comment
//! name SRG1-demo              advertised name (default SRG1-replay)
//! identity <hex>              identity characteristic contents
//! reject config               writes to this characteristic fail
//! notify <hex>                one telemetry notification
//! idle                        one receive() that times out
//! disconnect [reason]         link loss
//! ```
//! Running off the end of the script is a disconnect.

use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info};

use crate::error::{LinkError, Result};
use crate::gatt::Characteristic;
use crate::hex;
use crate::traits::{DeviceInfo, Link, LinkProvider};

const DEFAULT_DEVICE_NAME: &str = "SRG1-replay";
const REPLAY_ADDRESS: &str = "00:00:00:00:00:00";
const IDENTITY_LEN: usize = 20;

/// One scripted receive outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureStep {
    Notify(Bytes),
    Idle,
    Disconnect(String),
}

/// A parsed capture script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    pub name: String,
    pub identity: Option<Bytes>,
    pub rejected_writes: HashSet<Characteristic>,
    pub steps: Vec<CaptureStep>,
}

impl Default for Capture {
    fn default() -> Self {
        Self {
            name: DEFAULT_DEVICE_NAME.to_string(),
            identity: None,
            rejected_writes: HashSet::new(),
            steps: Vec::new(),
        }
    }
}

impl Capture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_identity(mut self, identity: impl Into<Bytes>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    /// Make every write to `characteristic` fail with an I/O error.
    pub fn reject_writes(mut self, characteristic: Characteristic) -> Self {
        self.rejected_writes.insert(characteristic);
        self
    }

    pub fn notify(mut self, data: impl Into<Bytes>) -> Self {
        self.steps.push(CaptureStep::Notify(data.into()));
        self
    }

    pub fn idle(mut self, count: usize) -> Self {
        self.steps
            .extend(std::iter::repeat_n(CaptureStep::Idle, count));
        self
    }

    pub fn disconnect(mut self, reason: impl Into<String>) -> Self {
        self.steps.push(CaptureStep::Disconnect(reason.into()));
        self
    }

    /// Load a capture script from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parse a capture script.
    pub fn parse(text: &str) -> Result<Self> {
        let mut capture = Capture::default();

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = match raw.split_once('#') {
                Some((before, _)) => before.trim(),
                None => raw.trim(),
            };
            if line.is_empty() {
                continue;
            }

            let (directive, rest) = match line.split_once(char::is_whitespace) {
                Some((directive, rest)) => (directive, rest.trim()),
                None => (line, ""),
            };

            match directive {
                "name" => {
                    if rest.is_empty() {
                        return Err(capture_error(line_no, "name requires a value"));
                    }
                    capture.name = rest.to_string();
                }
                "identity" => {
                    let data = parse_payload(line_no, rest)?;
                    if data.len() != IDENTITY_LEN {
                        return Err(capture_error(
                            line_no,
                            format!("identity must be {IDENTITY_LEN} bytes, got {}", data.len()),
                        ));
                    }
                    capture.identity = Some(data);
                }
                "reject" => {
                    let characteristic = Characteristic::from_name(rest).ok_or_else(|| {
                        capture_error(line_no, format!("unknown characteristic '{rest}'"))
                    })?;
                    capture.rejected_writes.insert(characteristic);
                }
                "notify" => {
                    let data = parse_payload(line_no, rest)?;
                    capture.steps.push(CaptureStep::Notify(data));
                }
                "idle" => capture.steps.push(CaptureStep::Idle),
                "disconnect" => {
                    let reason = if rest.is_empty() {
                        "remote disconnect"
                    } else {
                        rest
                    };
                    capture
                        .steps
                        .push(CaptureStep::Disconnect(reason.to_string()));
                }
                other => {
                    return Err(capture_error(
                        line_no,
                        format!("unknown directive '{other}'"),
                    ))
                }
            }
        }

        Ok(capture)
    }
}

fn parse_payload(line: usize, text: &str) -> Result<Bytes> {
    if text.is_empty() {
        return Err(capture_error(line, "missing hex payload"));
    }
    hex::decode(text)
        .map(Bytes::from)
        .map_err(|message| capture_error(line, message))
}

fn capture_error(line: usize, message: impl Into<String>) -> LinkError {
    LinkError::Capture {
        line,
        message: message.into(),
    }
}

/// Shared record of every write performed on replay links.
#[derive(Debug, Clone, Default)]
pub struct WriteLog {
    entries: Arc<Mutex<Vec<(Characteristic, Bytes)>>>,
}

impl WriteLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, characteristic: Characteristic, data: Bytes) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((characteristic, data));
    }

    /// Snapshot of all writes so far, in order.
    pub fn entries(&self) -> Vec<(Characteristic, Bytes)> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Writes made to a single characteristic, in order.
    pub fn to(&self, characteristic: Characteristic) -> Vec<Bytes> {
        self.entries()
            .into_iter()
            .filter(|(c, _)| *c == characteristic)
            .map(|(_, data)| data)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Discovery over a single replayed device.
pub struct ReplayProvider {
    capture: Capture,
    writes: WriteLog,
    rescan: bool,
    discovered: bool,
}

impl ReplayProvider {
    pub fn new(capture: Capture) -> Self {
        Self {
            capture,
            writes: WriteLog::new(),
            rescan: false,
            discovered: false,
        }
    }

    /// Keep advertising after the first discovery, so reconnects replay the
    /// capture again from the start.
    pub fn with_rescan(mut self, rescan: bool) -> Self {
        self.rescan = rescan;
        self
    }

    /// Handle on the write log shared by every link this provider creates.
    pub fn writes(&self) -> WriteLog {
        self.writes.clone()
    }

    fn device(&self) -> DeviceInfo {
        DeviceInfo {
            address: REPLAY_ADDRESS.to_string(),
            name: Some(self.capture.name.clone()),
            rssi: Some(-40),
        }
    }
}

impl LinkProvider for ReplayProvider {
    type Link = ReplayLink;

    fn scan(&mut self, duration: Duration) -> Result<Vec<DeviceInfo>> {
        if self.discovered && !self.rescan {
            std::thread::sleep(duration);
            return Ok(Vec::new());
        }
        self.discovered = true;
        Ok(vec![self.device()])
    }

    fn connect(&mut self, device: &DeviceInfo) -> Result<ReplayLink> {
        if device.address != REPLAY_ADDRESS {
            return Err(LinkError::DeviceNotFound(device.address.clone()));
        }
        info!(device = device.label(), steps = self.capture.steps.len(), "replay link connected");
        Ok(ReplayLink::new(self.capture.clone(), self.writes.clone()))
    }
}

/// A connected replay peripheral.
#[derive(Debug)]
pub struct ReplayLink {
    identity: Option<Bytes>,
    rejected_writes: HashSet<Characteristic>,
    steps: VecDeque<CaptureStep>,
    writes: WriteLog,
    subscribed: bool,
    closed: Option<String>,
}

impl ReplayLink {
    pub fn new(capture: Capture, writes: WriteLog) -> Self {
        Self {
            identity: capture.identity,
            rejected_writes: capture.rejected_writes,
            steps: capture.steps.into(),
            writes,
            subscribed: false,
            closed: None,
        }
    }

    /// Whether telemetry notifications are currently enabled.
    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    fn ensure_open(&self) -> Result<()> {
        match &self.closed {
            Some(reason) => Err(LinkError::Disconnected(reason.clone())),
            None => Ok(()),
        }
    }

    fn close(&mut self, reason: String) -> LinkError {
        debug!(%reason, "replay link closed");
        self.subscribed = false;
        self.closed = Some(reason.clone());
        LinkError::Disconnected(reason)
    }
}

impl Link for ReplayLink {
    fn read(&mut self, characteristic: Characteristic) -> Result<Bytes> {
        self.ensure_open()?;
        if !characteristic.is_readable() {
            return Err(LinkError::UnsupportedCharacteristic(characteristic));
        }
        Ok(self
            .identity
            .clone()
            .unwrap_or_else(|| Bytes::from(vec![0u8; IDENTITY_LEN])))
    }

    fn write(&mut self, characteristic: Characteristic, data: &[u8]) -> Result<()> {
        self.ensure_open()?;
        if !characteristic.is_writable() {
            return Err(LinkError::UnsupportedCharacteristic(characteristic));
        }
        if self.rejected_writes.contains(&characteristic) {
            return Err(LinkError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("write to {characteristic} rejected"),
            )));
        }
        self.writes.push(characteristic, Bytes::copy_from_slice(data));
        Ok(())
    }

    fn subscribe(&mut self, characteristic: Characteristic) -> Result<()> {
        self.ensure_open()?;
        if !characteristic.is_notifying() {
            return Err(LinkError::UnsupportedCharacteristic(characteristic));
        }
        self.subscribed = true;
        Ok(())
    }

    fn unsubscribe(&mut self, characteristic: Characteristic) -> Result<()> {
        self.ensure_open()?;
        if !characteristic.is_notifying() {
            return Err(LinkError::UnsupportedCharacteristic(characteristic));
        }
        self.subscribed = false;
        Ok(())
    }

    fn receive(&mut self, timeout: Duration) -> Result<Bytes> {
        self.ensure_open()?;
        if !self.subscribed {
            std::thread::sleep(timeout);
            return Err(LinkError::Timeout);
        }

        match self.steps.pop_front() {
            Some(CaptureStep::Notify(data)) => Ok(data),
            Some(CaptureStep::Idle) => {
                std::thread::sleep(timeout);
                Err(LinkError::Timeout)
            }
            Some(CaptureStep::Disconnect(reason)) => Err(self.close(reason)),
            None => Err(self.close("end of capture".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: &str = "00050013000000640000000000001e0000000000";

    #[test]
    fn parse_full_script() {
        let script = format!(
            "# demo\nname SRG1-test\nidentity {}\nreject config\nnotify {FRAME}\nidle\ndisconnect battery died\n",
            "00".repeat(20)
        );
        let capture = Capture::parse(&script).unwrap();

        assert_eq!(capture.name, "SRG1-test");
        assert_eq!(capture.identity.as_ref().map(|b| b.len()), Some(20));
        assert!(capture.rejected_writes.contains(&Characteristic::Config));
        assert_eq!(capture.steps.len(), 3);
        assert_eq!(capture.steps[1], CaptureStep::Idle);
        assert_eq!(
            capture.steps[2],
            CaptureStep::Disconnect("battery died".to_string())
        );
    }

    #[test]
    fn parse_reports_line_numbers() {
        let err = Capture::parse("idle\nbogus\n").unwrap_err();
        assert!(matches!(err, LinkError::Capture { line: 2, .. }));

        let err = Capture::parse("identity 0011\n").unwrap_err();
        assert!(matches!(err, LinkError::Capture { line: 1, .. }));
    }

    #[test]
    fn receive_requires_subscription() {
        let capture = Capture::new().notify(vec![0u8; 20]);
        let mut link = ReplayLink::new(capture, WriteLog::new());

        let err = link.receive(Duration::from_millis(1)).unwrap_err();
        assert!(err.is_timeout());

        link.subscribe(Characteristic::Telemetry).unwrap();
        assert_eq!(link.receive(Duration::from_millis(1)).unwrap().len(), 20);
    }

    #[test]
    fn end_of_capture_disconnects_permanently() {
        let mut link = ReplayLink::new(Capture::new(), WriteLog::new());
        link.subscribe(Characteristic::Telemetry).unwrap();

        assert!(link.receive(Duration::from_millis(1)).unwrap_err().is_disconnect());
        assert!(link
            .write(Characteristic::Command, &[0u8; 20])
            .unwrap_err()
            .is_disconnect());
    }

    #[test]
    fn writes_are_logged_and_validated() {
        let writes = WriteLog::new();
        let capture = Capture::new().reject_writes(Characteristic::Config);
        let mut link = ReplayLink::new(capture, writes.clone());

        link.write(Characteristic::Command, &[0xF0; 20]).unwrap();
        assert!(matches!(
            link.write(Characteristic::Telemetry, &[0u8; 20]),
            Err(LinkError::UnsupportedCharacteristic(Characteristic::Telemetry))
        ));
        assert!(matches!(
            link.write(Characteristic::Config, &[0u8; 20]),
            Err(LinkError::Io(_))
        ));

        assert_eq!(writes.len(), 1);
        assert_eq!(writes.to(Characteristic::Command)[0].as_ref(), &[0xF0; 20]);
    }

    #[test]
    fn provider_discovers_once_without_rescan() {
        let mut provider = ReplayProvider::new(Capture::new());
        let first = provider.scan(Duration::from_millis(1)).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].label(), DEFAULT_DEVICE_NAME);
        assert!(provider.scan(Duration::from_millis(1)).unwrap().is_empty());

        let mut provider = ReplayProvider::new(Capture::new()).with_rescan(true);
        provider.scan(Duration::from_millis(1)).unwrap();
        assert_eq!(provider.scan(Duration::from_millis(1)).unwrap().len(), 1);
    }

    #[test]
    fn connect_rejects_unknown_device() {
        let mut provider = ReplayProvider::new(Capture::new());
        let stranger = DeviceInfo::new("11:22:33:44:55:66", None);
        assert!(matches!(
            provider.connect(&stranger),
            Err(LinkError::DeviceNotFound(_))
        ));
    }
}
