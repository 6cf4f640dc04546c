use std::time::Duration;

use bytes::Bytes;

use crate::error::Result;
use crate::gatt::Characteristic;

/// A peripheral seen during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Link-layer address (e.g. `AA:BB:CC:DD:EE:FF`).
    pub address: String,
    /// Advertised complete local name, if any.
    pub name: Option<String>,
    /// Signal strength at discovery time.
    pub rssi: Option<i16>,
}

impl DeviceInfo {
    pub fn new(address: impl Into<String>, name: Option<String>) -> Self {
        Self {
            address: address.into(),
            name,
            rssi: None,
        }
    }

    /// Name if advertised, otherwise the address.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.address)
    }
}

/// Discovery and connection capability of a wireless stack.
pub trait LinkProvider {
    type Link: Link;

    /// Scan for advertising peripherals for up to `duration`.
    fn scan(&mut self, duration: Duration) -> Result<Vec<DeviceInfo>>;

    /// Connect to a previously discovered peripheral.
    fn connect(&mut self, device: &DeviceInfo) -> Result<Self::Link>;
}

/// A connected peripheral.
///
/// All calls are blocking. Implementations report link loss as
/// [`LinkError::Disconnected`](crate::LinkError::Disconnected) from any call.
pub trait Link {
    /// Read the current value of a characteristic.
    fn read(&mut self, characteristic: Characteristic) -> Result<Bytes>;

    /// Write a value to a characteristic.
    fn write(&mut self, characteristic: Characteristic, data: &[u8]) -> Result<()>;

    /// Enable notifications on a characteristic.
    fn subscribe(&mut self, characteristic: Characteristic) -> Result<()>;

    /// Disable notifications on a characteristic.
    fn unsubscribe(&mut self, characteristic: Characteristic) -> Result<()>;

    /// Wait for the next notification.
    ///
    /// Returns [`LinkError::Timeout`](crate::LinkError::Timeout) when nothing
    /// arrives within `timeout`.
    fn receive(&mut self, timeout: Duration) -> Result<Bytes>;
}

impl<L: Link + ?Sized> Link for Box<L> {
    fn read(&mut self, characteristic: Characteristic) -> Result<Bytes> {
        (**self).read(characteristic)
    }

    fn write(&mut self, characteristic: Characteristic, data: &[u8]) -> Result<()> {
        (**self).write(characteristic, data)
    }

    fn subscribe(&mut self, characteristic: Characteristic) -> Result<()> {
        (**self).subscribe(characteristic)
    }

    fn unsubscribe(&mut self, characteristic: Characteristic) -> Result<()> {
        (**self).unsubscribe(characteristic)
    }

    fn receive(&mut self, timeout: Duration) -> Result<Bytes> {
        (**self).receive(timeout)
    }
}
