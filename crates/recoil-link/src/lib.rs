//! Wireless link abstraction for recoil taggers.
//!
//! This is the lowest layer of recoil. The radio stack itself lives outside
//! this workspace; everything above talks to it through the [`Link`] and
//! [`LinkProvider`] traits defined here:
//! - GATT characteristic table for the tagger service
//! - Blocking receive-with-timeout that reports link loss as an error
//! - A capture replay implementation for running the pipeline without a radio

pub mod error;
pub mod gatt;
pub mod hex;
pub mod replay;
pub mod traits;

pub use error::{LinkError, Result};
pub use gatt::{
    is_tagger_name, Characteristic, CLIENT_CONFIG_UUID, DEVICE_NAME_PREFIX, NOTIFY_DISABLE,
    NOTIFY_ENABLE, SERVICE_UUID,
};
pub use replay::{Capture, CaptureStep, ReplayLink, ReplayProvider, WriteLog};
pub use traits::{DeviceInfo, Link, LinkProvider};
