//! Polled input devices
//!
//! [`Device`] is the raw source: it answers "what is the state right now" for
//! any device id and is read once per tick. [`VirtualDevice`] is an in-memory
//! implementation whose state is set by hand, for simulation and tests.

use crate::event::{DeviceId, POV_CENTERED};
use std::collections::HashMap;

/// Raw per-tick input source. All calls must be non-blocking.
pub trait Device {
    /// Number of buttons on `device`; indices run `0..button_count`
    fn button_count(&self, device: DeviceId) -> u32;
    /// Number of axes on `device`; indices run `0..axis_count`
    fn axis_count(&self, device: DeviceId) -> u32;
    fn is_button_pressed(&self, device: DeviceId, index: u32) -> bool;
    fn axis(&self, device: DeviceId, index: u32) -> f64;
    /// Hat angle in degrees, or [`POV_CENTERED`]
    fn pov(&self, device: DeviceId) -> i32;
}

#[derive(Debug, Clone)]
struct DeviceState {
    buttons: Vec<bool>,
    axes: Vec<f64>,
    pov: i32,
}

impl DeviceState {
    fn new(buttons: u32, axes: u32) -> Self {
        Self {
            buttons: vec![false; buttons as usize],
            axes: vec![0.0; axes as usize],
            pov: POV_CENTERED,
        }
    }
}

/// Hand-driven device bank. Unknown ids read as a device with no buttons or
/// axes and a centered hat.
#[derive(Debug, Clone, Default)]
pub struct VirtualDevice {
    devices: HashMap<DeviceId, DeviceState>,
}

impl VirtualDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or reset) a device with the given layout
    pub fn with_device(mut self, device: DeviceId, buttons: u32, axes: u32) -> Self {
        self.devices.insert(device, DeviceState::new(buttons, axes));
        self
    }

    pub fn set_button(&mut self, device: DeviceId, index: u32, pressed: bool) {
        let state = self.state_mut(device);
        let i = index as usize;
        if state.buttons.len() <= i {
            state.buttons.resize(i + 1, false);
        }
        state.buttons[i] = pressed;
    }

    pub fn press(&mut self, device: DeviceId, index: u32) {
        self.set_button(device, index, true);
    }

    pub fn release(&mut self, device: DeviceId, index: u32) {
        self.set_button(device, index, false);
    }

    pub fn set_axis(&mut self, device: DeviceId, index: u32, value: f64) {
        let state = self.state_mut(device);
        let i = index as usize;
        if state.axes.len() <= i {
            state.axes.resize(i + 1, 0.0);
        }
        state.axes[i] = value;
    }

    pub fn set_pov(&mut self, device: DeviceId, value: i32) {
        self.state_mut(device).pov = value;
    }

    fn state_mut(&mut self, device: DeviceId) -> &mut DeviceState {
        self.devices
            .entry(device)
            .or_insert_with(|| DeviceState::new(0, 0))
    }
}

impl Device for VirtualDevice {
    fn button_count(&self, device: DeviceId) -> u32 {
        self.devices.get(&device).map_or(0, |s| s.buttons.len() as u32)
    }

    fn axis_count(&self, device: DeviceId) -> u32 {
        self.devices.get(&device).map_or(0, |s| s.axes.len() as u32)
    }

    fn is_button_pressed(&self, device: DeviceId, index: u32) -> bool {
        self.devices
            .get(&device)
            .and_then(|s| s.buttons.get(index as usize).copied())
            .unwrap_or(false)
    }

    fn axis(&self, device: DeviceId, index: u32) -> f64 {
        self.devices
            .get(&device)
            .and_then(|s| s.axes.get(index as usize).copied())
            .unwrap_or(0.0)
    }

    fn pov(&self, device: DeviceId) -> i32 {
        self.devices.get(&device).map_or(POV_CENTERED, |s| s.pov)
    }
}
