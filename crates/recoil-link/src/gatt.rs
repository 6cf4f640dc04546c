//! GATT layout of the tagger service.
//!
//! All characteristics live under a single vendor service. Telemetry is
//! notify-only; command and config are write-only; identity is read once
//! at connect time.

use std::fmt;

use uuid::Uuid;

/// Tagger vendor service.
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0xe6f59d10_8230_4a5c_b22f_c062b1d329e3);

/// Client characteristic configuration descriptor.
pub const CLIENT_CONFIG_UUID: Uuid = Uuid::from_u128(0x00002902_0000_1000_8000_00805f9b34fb);

/// CCCD value that enables notifications.
pub const NOTIFY_ENABLE: [u8; 2] = [0x01, 0x00];

/// CCCD value that disables notifications.
pub const NOTIFY_DISABLE: [u8; 2] = [0x00, 0x00];

/// Advertised local-name prefix of every tagger.
pub const DEVICE_NAME_PREFIX: &str = "SRG1";

/// Characteristics exposed by the tagger service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Characteristic {
    /// Model identification record (read).
    Identity,
    /// Periodic 20-byte status frames (notify).
    Telemetry,
    /// Reload commands (write).
    Command,
    /// Recoil and fire configuration (write).
    Config,
}

impl Characteristic {
    pub const ALL: [Characteristic; 4] = [
        Characteristic::Identity,
        Characteristic::Telemetry,
        Characteristic::Command,
        Characteristic::Config,
    ];

    pub fn uuid(self) -> Uuid {
        match self {
            Characteristic::Identity => Uuid::from_u128(0xe6f59d11_8230_4a5c_b22f_c062b1d329e3),
            Characteristic::Telemetry => Uuid::from_u128(0xe6f59d12_8230_4a5c_b22f_c062b1d329e3),
            Characteristic::Command => Uuid::from_u128(0xe6f59d13_8230_4a5c_b22f_c062b1d329e3),
            Characteristic::Config => Uuid::from_u128(0xe6f59d14_8230_4a5c_b22f_c062b1d329e3),
        }
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Characteristic::Identity => "IDENTITY",
            Characteristic::Telemetry => "TELEMETRY",
            Characteristic::Command => "COMMAND",
            Characteristic::Config => "CONFIG",
        }
    }

    /// Look up a characteristic by UUID.
    pub fn from_uuid(uuid: Uuid) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.uuid() == uuid)
    }

    /// Parse a UUID string in any form `uuid` accepts and look it up.
    pub fn parse_uuid(text: &str) -> Option<Self> {
        Uuid::parse_str(text.trim()).ok().and_then(Self::from_uuid)
    }

    /// Look up a characteristic by name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(name.trim()))
    }

    pub fn is_readable(self) -> bool {
        matches!(self, Characteristic::Identity)
    }

    pub fn is_writable(self) -> bool {
        matches!(self, Characteristic::Command | Characteristic::Config)
    }

    pub fn is_notifying(self) -> bool {
        matches!(self, Characteristic::Telemetry)
    }
}

impl fmt::Display for Characteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returns true if an advertised name belongs to a tagger.
pub fn is_tagger_name(name: &str) -> bool {
    name.starts_with(DEVICE_NAME_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuids_share_service_base() {
        let base = |uuid: Uuid| uuid.as_u128() & ((1u128 << 96) - 1);
        for c in Characteristic::ALL {
            assert_eq!(base(c.uuid()), base(SERVICE_UUID));
            assert_ne!(c.uuid(), SERVICE_UUID);
        }
    }

    #[test]
    fn uuid_lookup() {
        assert_eq!(
            Characteristic::parse_uuid("E6F59D12-8230-4A5C-B22F-C062B1D329E3"),
            Some(Characteristic::Telemetry)
        );
        assert_eq!(
            Characteristic::parse_uuid("e6f59d1482304a5cb22fc062b1d329e3"),
            Some(Characteristic::Config)
        );
        assert_eq!(Characteristic::parse_uuid("not-a-uuid"), None);
        assert_eq!(Characteristic::from_uuid(SERVICE_UUID), None);
        assert_eq!(
            Characteristic::from_uuid(Characteristic::Identity.uuid()),
            Some(Characteristic::Identity)
        );
        assert_eq!(Characteristic::from_name("config"), Some(Characteristic::Config));
    }

    #[test]
    fn access_flags() {
        assert!(Characteristic::Identity.is_readable());
        assert!(!Characteristic::Telemetry.is_writable());
        assert!(Characteristic::Config.is_writable());
        assert!(Characteristic::Telemetry.is_notifying());
    }

    #[test]
    fn tagger_name_prefix() {
        assert!(is_tagger_name("SRG1-4F2A"));
        assert!(!is_tagger_name("srg1"));
        assert!(!is_tagger_name("Keyboard"));
    }
}
