//! Session orchestration for a connected tagger.
//!
//! One [`TaggerSession`] drives one connected link from a single control loop:
//! notifications are decoded, button counters turned into edges, hit events
//! de-duplicated, and the reload state machine advanced. Timer expiries and
//! user actions enter the same loop through a mailbox, so session state has
//! exactly one writer. [`ConnectionSupervisor`] wraps discovery and reconnects
//! around it.

pub mod config;
pub mod control;
pub mod edge;
pub mod error;
pub mod events;
pub mod ir;
pub mod reload;
pub mod session;
pub mod supervisor;
pub mod timer;

pub use config::SessionConfig;
pub use control::{session_channel, SessionHandle, SessionMessage, UserAction};
pub use edge::{Button, ButtonEdge, EdgeTracker};
pub use error::{ReloadError, Result, SessionError};
pub use events::{EventSink, SessionEvent};
pub use ir::{IrEvent, IrEventDecoder};
pub use reload::{ReloadState, ReloadStateMachine};
pub use session::{SessionEnd, SessionSnapshot, TaggerSession};
pub use supervisor::{ConnectionSupervisor, SupervisorExit};
pub use timer::{ThreadTimer, TimerScheduler, TimerToken};
