//! Macro recording and playback
//!
//! A [`Macro`] is one event log plus a three-state session machine:
//!
//! ```text
//! Idle --start_recording--> Recording --stop_recording--> Idle
//! Idle --start_playing----> Playing   --complete/abort--> Idle
//! ```
//!
//! While recording, events are rebased onto the session start. While playing,
//! a cursor walks the log and hands out every event whose offset has elapsed,
//! so playback keeps its timing no matter how irregular the caller's ticks are.

use joymacro_core::{Device, DeviceId, Error, EventSource, InputEvent, Millis, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Idle,
    Recording,
    Playing,
}

/// A recorded input session
#[derive(Debug, Clone, Default)]
pub struct Macro {
    /// Chronological, offsets from session start
    events: Vec<InputEvent>,
    devices: BTreeSet<DeviceId>,
    mode: Mode,
    started_at: Millis,
    cursor: usize,
}

impl Macro {
    /// Empty macro that records from `devices`
    pub fn new(devices: impl IntoIterator<Item = DeviceId>) -> Self {
        Self {
            devices: devices.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Macro ready to play, built from already-relative events.
    /// Target devices are the devices seen in the log.
    pub fn from_events(mut events: Vec<InputEvent>) -> Self {
        events.sort_by_key(|e| e.t);
        let devices = events.iter().map(|e| e.device).collect();
        Self {
            events,
            devices,
            ..Default::default()
        }
    }

    /// Add target devices known out of band
    pub fn with_devices(mut self, devices: impl IntoIterator<Item = DeviceId>) -> Self {
        self.devices.extend(devices);
        self
    }

    pub fn events(&self) -> &[InputEvent] {
        &self.events
    }

    pub fn devices(&self) -> &BTreeSet<DeviceId> {
        &self.devices
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn is_recording(&self) -> bool {
        self.mode == Mode::Recording
    }

    /// Offset of the last event, 0 for an empty macro
    pub fn duration_ms(&self) -> Millis {
        self.events.last().map_or(0, |e| e.t)
    }

    /// Time since the current session started
    pub fn elapsed(&self, now: Millis) -> Millis {
        now - self.started_at
    }

    pub fn start_recording(&mut self, now: Millis) -> Result<()> {
        if self.mode != Mode::Idle {
            return Err(Error::session_active("start recording"));
        }
        self.events.clear();
        self.cursor = 0;
        self.started_at = now;
        self.mode = Mode::Recording;
        debug!(devices = ?self.devices, "recording started");
        Ok(())
    }

    /// Append this tick's events from target devices, rebased to the
    /// session start. Returns how many were kept.
    pub fn capture(&mut self, events: &[InputEvent], now: Millis) -> usize {
        if self.mode != Mode::Recording {
            return 0;
        }
        let offset = now - self.started_at;
        let before = self.events.len();
        self.events.extend(
            events
                .iter()
                .filter(|e| self.devices.contains(&e.device))
                .map(|e| e.at(offset)),
        );
        self.events.len() - before
    }

    pub fn stop_recording(&mut self) -> Result<()> {
        if self.mode != Mode::Recording {
            return Err(Error::no_active_session("stop recording"));
        }
        self.mode = Mode::Idle;
        debug!(events = self.events.len(), duration_ms = self.duration_ms(), "recording stopped");
        Ok(())
    }

    pub fn start_playing(&mut self, now: Millis) -> Result<()> {
        if self.mode != Mode::Idle {
            return Err(Error::session_active("start playback"));
        }
        if self.events.is_empty() {
            return Err(Error::empty_macro());
        }
        self.started_at = now;
        self.cursor = 0;
        self.mode = Mode::Playing;
        debug!(events = self.events.len(), duration_ms = self.duration_ms(), "playback started");
        Ok(())
    }

    /// True strictly while playback has not yet reached the last event's offset
    pub fn is_playing(&self, now: Millis) -> bool {
        self.mode == Mode::Playing && self.elapsed(now) < self.duration_ms()
    }

    /// Stop playback early; nothing further is delivered
    pub fn abort(&mut self) -> Result<()> {
        if self.mode != Mode::Playing {
            return Err(Error::no_active_session("abort playback"));
        }
        self.mode = Mode::Idle;
        self.cursor = 0;
        debug!("playback aborted");
        Ok(())
    }

    /// Every undelivered event whose offset has elapsed, stamped back onto
    /// the wall clock. Late events are delayed, never dropped.
    fn due(&mut self, now: Millis) -> Vec<InputEvent> {
        if self.mode != Mode::Playing {
            return Vec::new();
        }
        let elapsed = self.elapsed(now);
        let first = self.cursor;
        while self.cursor < self.events.len() && self.events[self.cursor].t <= elapsed {
            self.cursor += 1;
        }
        let due = self.events[first..self.cursor]
            .iter()
            .map(|e| e.at(self.started_at + e.t))
            .collect();

        if self.cursor == self.events.len() && elapsed >= self.duration_ms() {
            self.mode = Mode::Idle;
            debug!(elapsed_ms = elapsed, "playback complete");
        }
        due
    }
}

impl EventSource for Macro {
    fn poll(&mut self, _device: &dyn Device, now: Millis) -> Vec<InputEvent> {
        self.due(now)
    }
}
