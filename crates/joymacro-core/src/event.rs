//! Discrete input events derived from polled device state
//!
//! An event is a single edge (button pressed/released) or value change (axis,
//! POV hat) on one device, stamped with the millisecond it was observed.
//!
//! Events compare and hash by *what* happened, never by *when*: two presses of
//! the same button on the same device are equal regardless of timestamp. This
//! is what lets a handler registered against a template event match every
//! live or replayed occurrence of it.

use crate::error::{Error, Result};
use chrono::TimeZone;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Identifier of a physical input device
pub type DeviceId = u32;

/// Milliseconds, absolute (wall clock) or relative to a session start
pub type Millis = i64;

/// POV value reported while the hat is not pushed in any direction
pub const POV_CENTERED: i32 = -1;

/// Slot written for POV events, which have no index of their own
pub const POV_SLOT: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Press,
    Release,
    Axis,
    Pov,
}

impl EventKind {
    /// Tag used in the line format
    pub fn tag(&self) -> &'static str {
        match self {
            EventKind::Press => "press",
            EventKind::Release => "release",
            EventKind::Axis => "axis",
            EventKind::Pov => "POV",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "press" => Some(EventKind::Press),
            "release" => Some(EventKind::Release),
            "axis" => Some(EventKind::Axis),
            "POV" | "pov" => Some(EventKind::Pov),
            _ => None,
        }
    }

    pub fn has_value(&self) -> bool {
        matches!(self, EventKind::Axis | EventKind::Pov)
    }
}

/// What changed
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "e", rename_all = "lowercase")]
pub enum EventData {
    Press { button: u32 },
    Release { button: u32 },
    Axis { axis: u32, value: f64 },
    /// Hat angle in degrees, or [`POV_CENTERED`]
    Pov { value: i32 },
}

/// Single event - device, change and time
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InputEvent {
    /// Milliseconds; absolute while live, relative once recorded
    pub t: Millis,
    pub device: DeviceId,
    #[serde(flatten)]
    pub data: EventData,
}

/// The part of an event that takes part in dispatch equality
#[derive(PartialEq, Eq, Hash)]
enum ValueKey {
    None,
    Axis(u64),
    Pov(i32),
}

impl InputEvent {
    pub fn new(device: DeviceId, data: EventData) -> Self {
        Self { t: 0, device, data }
    }

    pub fn press(device: DeviceId, button: u32) -> Self {
        Self::new(device, EventData::Press { button })
    }

    pub fn release(device: DeviceId, button: u32) -> Self {
        Self::new(device, EventData::Release { button })
    }

    pub fn axis_change(device: DeviceId, axis: u32, value: f64) -> Self {
        Self::new(device, EventData::Axis { axis, value })
    }

    pub fn pov_change(device: DeviceId, value: i32) -> Self {
        Self::new(device, EventData::Pov { value })
    }

    /// Same event, stamped with `t`
    pub fn at(mut self, t: Millis) -> Self {
        self.t = t;
        self
    }

    pub fn kind(&self) -> EventKind {
        match self.data {
            EventData::Press { .. } => EventKind::Press,
            EventData::Release { .. } => EventKind::Release,
            EventData::Axis { .. } => EventKind::Axis,
            EventData::Pov { .. } => EventKind::Pov,
        }
    }

    /// Button or axis index; [`POV_SLOT`] for POV events
    pub fn slot(&self) -> u32 {
        match self.data {
            EventData::Press { button } | EventData::Release { button } => button,
            EventData::Axis { axis, .. } => axis,
            EventData::Pov { .. } => POV_SLOT,
        }
    }

    /// Numeric payload, present only for axis and POV events
    pub fn value(&self) -> Option<f64> {
        match self.data {
            EventData::Axis { value, .. } => Some(value),
            EventData::Pov { value } => Some(value as f64),
            _ => None,
        }
    }

    pub fn button(&self) -> Option<u32> {
        match self.data {
            EventData::Press { button } | EventData::Release { button } => Some(button),
            _ => None,
        }
    }

    pub fn axis(&self) -> Option<u32> {
        match self.data {
            EventData::Axis { axis, .. } => Some(axis),
            _ => None,
        }
    }

    pub fn axis_value(&self) -> Option<f64> {
        match self.data {
            EventData::Axis { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn pov_value(&self) -> Option<i32> {
        match self.data {
            EventData::Pov { value } => Some(value),
            _ => None,
        }
    }

    /// Full equality, timestamp included
    pub fn identical(&self, other: &InputEvent) -> bool {
        self == other && self.t == other.t
    }

    fn value_key(&self) -> ValueKey {
        match self.data {
            // -0.0 and 0.0 compare equal, so they must hash equal too
            EventData::Axis { value, .. } if value == 0.0 => ValueKey::Axis(0f64.to_bits()),
            EventData::Axis { value, .. } => ValueKey::Axis(value.to_bits()),
            EventData::Pov { value } => ValueKey::Pov(value),
            _ => ValueKey::None,
        }
    }

    /// Serialize as one line of the macro text format, terminator included
    pub fn to_line(&self) -> String {
        format!("{}\n", self)
    }

    /// Human readable description with the timestamp rendered as local time
    pub fn readable(&self) -> String {
        let when = chrono::Local
            .timestamp_millis_opt(self.t)
            .single()
            .map(|dt| dt.format("%m/%d/%Y %H:%M:%S").to_string())
            .unwrap_or_else(|| self.t.to_string());
        format!("{}: {}", when, self.describe())
    }

    /// Human readable description without the timestamp
    pub fn describe(&self) -> String {
        match self.data {
            EventData::Press { button } => {
                format!("Device {}'s Button {} pressed.", self.device, button)
            }
            EventData::Release { button } => {
                format!("Device {}'s Button {} released.", self.device, button)
            }
            EventData::Axis { axis, value } => {
                format!("Device {}'s Axis {} set to {}.", self.device, axis, value)
            }
            EventData::Pov { value } if value == POV_CENTERED => {
                format!("Device {}'s POV centered.", self.device)
            }
            EventData::Pov { value } => {
                format!("Device {}'s POV set to {}.", self.device, value)
            }
        }
    }
}

impl PartialEq for InputEvent {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind()
            && self.device == other.device
            && self.slot() == other.slot()
            && self.value_key() == other.value_key()
    }
}

impl Eq for InputEvent {}

impl Hash for InputEvent {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        self.device.hash(state);
        self.slot().hash(state);
        self.value_key().hash(state);
    }
}

/// `<t>:<tag>,<device>,<slot>,[<value>,]`
impl fmt::Display for InputEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{},{},{},", self.t, self.kind().tag(), self.device, self.slot())?;
        match self.data {
            EventData::Axis { value, .. } => write!(f, "{},", value),
            EventData::Pov { value } => write!(f, "{},", value),
            _ => Ok(()),
        }
    }
}

impl FromStr for InputEvent {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (t, rest) = line
            .split_once(':')
            .ok_or_else(|| Error::parse(line, "missing ':' after timestamp"))?;
        let t: Millis = t
            .trim()
            .parse()
            .map_err(|_| Error::parse(line, "timestamp is not an integer"))?;

        let mut fields: Vec<&str> = rest.split(',').map(str::trim).collect();
        if fields.last() == Some(&"") {
            fields.pop();
        }

        let (tag, device, slot, value) = match fields.as_slice() {
            [tag, device, slot] => (*tag, *device, *slot, None),
            [tag, device, slot, value] => (*tag, *device, *slot, Some(*value)),
            _ => return Err(Error::parse(line, "wrong number of fields")),
        };

        let kind = EventKind::from_tag(tag)
            .ok_or_else(|| Error::parse(line, &format!("unknown event tag '{}'", tag)))?;
        let device: DeviceId = device
            .parse()
            .map_err(|_| Error::parse(line, "device id is not an integer"))?;
        let index = || -> Result<u32> {
            slot.parse()
                .map_err(|_| Error::parse(line, "slot is not an integer"))
        };

        if !kind.has_value() && value.is_some() {
            return Err(Error::parse(line, "button events carry no value"));
        }

        let data = match kind {
            EventKind::Press => EventData::Press { button: index()? },
            EventKind::Release => EventData::Release { button: index()? },
            EventKind::Axis => {
                let value = value
                    .ok_or_else(|| Error::parse(line, "axis event without value"))?
                    .parse::<f64>()
                    .map_err(|_| Error::parse(line, "axis value is not a number"))?;
                EventData::Axis { axis: index()?, value }
            }
            EventKind::Pov => {
                let value = match value {
                    Some(v) => {
                        index()?;
                        v.parse::<i32>()
                            .map_err(|_| Error::parse(line, "POV value is not an integer"))?
                    }
                    // older files stored the angle, centered included, in the slot position
                    None => slot
                        .parse::<i32>()
                        .map_err(|_| Error::parse(line, "POV angle is not an integer"))?,
                };
                EventData::Pov { value }
            }
        };

        Ok(InputEvent { t, device, data })
    }
}
