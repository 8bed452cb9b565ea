//! joymacro-core - input events from polled control devices
//!
//! Turns continuously polled joystick state into discrete, timestamped
//! events that can be recorded, stored as text and replayed.
//!
//! ## Pieces
//!
//! - **event**: the event value type, its dispatch equality and line format
//! - **differ**: per-tick snapshot diffing into edge events
//! - **device**: the polled input source trait plus an in-memory device
//! - **clock**: the shared millisecond clock

pub mod clock;
pub mod device;
pub mod differ;
pub mod error;
pub mod event;

pub use clock::{Clock, ManualClock, SystemClock};
pub use device::{Device, VirtualDevice};
pub use differ::{DeviceSnapshot, EventSource, Inputs, SimulatedDevice, DEFAULT_DEADBAND};
pub use error::{Error, ErrorCode, Result};
pub use event::{DeviceId, EventData, EventKind, InputEvent, Millis, POV_CENTERED, POV_SLOT};

pub mod prelude {
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::device::{Device, VirtualDevice};
    pub use crate::differ::{EventSource, Inputs, SimulatedDevice};
    pub use crate::error::{Error, ErrorCode, Result};
    pub use crate::event::{DeviceId, EventData, EventKind, InputEvent, Millis};
}
