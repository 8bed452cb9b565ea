//! Per-tick state diffing
//!
//! A [`SimulatedDevice`] remembers what one real device looked like on the
//! previous tick and turns the difference into edge events. Events come out
//! in a fixed order: buttons ascending, then axes ascending, then the POV hat.

use crate::device::Device;
use crate::event::{DeviceId, InputEvent, Millis, POV_CENTERED};

/// Axis movement at or below this is treated as sensor noise
pub const DEFAULT_DEADBAND: f64 = 0.01;

/// Anything that yields the events due on the current tick.
///
/// Live diffing and macro playback both implement this, so code consuming
/// events does not need to know which one it is talking to.
pub trait EventSource {
    fn poll(&mut self, device: &dyn Device, now: Millis) -> Vec<InputEvent>;
}

/// Observed state of one device
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSnapshot {
    pub buttons: Vec<bool>,
    pub axes: Vec<f64>,
    pub pov: i32,
}

impl Default for DeviceSnapshot {
    fn default() -> Self {
        Self {
            buttons: Vec::new(),
            axes: Vec::new(),
            pov: POV_CENTERED,
        }
    }
}

impl DeviceSnapshot {
    pub fn read(device: &dyn Device, id: DeviceId) -> Self {
        Self {
            buttons: (0..device.button_count(id))
                .map(|i| device.is_button_pressed(id, i))
                .collect(),
            axes: (0..device.axis_count(id)).map(|i| device.axis(id, i)).collect(),
            pov: device.pov(id),
        }
    }
}

/// Edge detector for one device id
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    id: DeviceId,
    deadband: f64,
    last: DeviceSnapshot,
}

impl SimulatedDevice {
    pub fn new(id: DeviceId) -> Self {
        Self {
            id,
            deadband: DEFAULT_DEADBAND,
            last: DeviceSnapshot::default(),
        }
    }

    pub fn with_deadband(mut self, deadband: f64) -> Self {
        self.deadband = deadband;
        self
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn snapshot(&self) -> &DeviceSnapshot {
        &self.last
    }

    /// Diff `current` against the previous snapshot, then adopt `current`.
    ///
    /// Indices missing from either snapshot count as released / 0.0, so a
    /// device that drops out releases everything it was holding. Non-finite
    /// axis readings are ignored and the last good value is kept.
    pub fn diff(&mut self, mut current: DeviceSnapshot, now: Millis) -> Vec<InputEvent> {
        let mut events = Vec::new();

        let buttons = current.buttons.len().max(self.last.buttons.len());
        for i in 0..buttons {
            let was = self.last.buttons.get(i).copied().unwrap_or(false);
            let pressed = current.buttons.get(i).copied().unwrap_or(false);
            match (was, pressed) {
                (false, true) => events.push(InputEvent::press(self.id, i as u32).at(now)),
                (true, false) => events.push(InputEvent::release(self.id, i as u32).at(now)),
                _ => {}
            }
        }

        let axes = current.axes.len().max(self.last.axes.len());
        for i in 0..axes {
            let was = self.last.axes.get(i).copied().unwrap_or(0.0);
            let value = match current.axes.get_mut(i) {
                Some(v) if !v.is_finite() => {
                    *v = was;
                    continue;
                }
                Some(v) => *v,
                None => 0.0,
            };
            if (value - was).abs() > self.deadband {
                events.push(InputEvent::axis_change(self.id, i as u32, value).at(now));
            }
        }

        if current.pov != self.last.pov {
            events.push(InputEvent::pov_change(self.id, current.pov).at(now));
        }

        self.last = current;
        events
    }
}

impl EventSource for SimulatedDevice {
    fn poll(&mut self, device: &dyn Device, now: Millis) -> Vec<InputEvent> {
        let current = DeviceSnapshot::read(device, self.id);
        self.diff(current, now)
    }
}

/// One [`SimulatedDevice`] per device id, polled in the order given
#[derive(Debug, Clone)]
pub struct Inputs {
    devices: Vec<SimulatedDevice>,
}

impl Inputs {
    pub fn new(ids: &[DeviceId], deadband: f64) -> Self {
        Self {
            devices: ids
                .iter()
                .map(|&id| SimulatedDevice::new(id).with_deadband(deadband))
                .collect(),
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = DeviceId> + '_ {
        self.devices.iter().map(SimulatedDevice::id)
    }
}

impl EventSource for Inputs {
    fn poll(&mut self, device: &dyn Device, now: Millis) -> Vec<InputEvent> {
        self.devices
            .iter_mut()
            .flat_map(|d| d.poll(device, now))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::VirtualDevice;
    use crate::event::EventKind;
    use proptest::prelude::*;

    #[test]
    fn press_then_hold_then_release() {
        let mut dev = VirtualDevice::new().with_device(0, 6, 0);
        let mut sim = SimulatedDevice::new(0);

        dev.press(0, 3);
        let first = sim.poll(&dev, 100);
        assert_eq!(first.len(), 1);
        assert!(first[0].identical(&InputEvent::press(0, 3).at(100)));

        assert!(sim.poll(&dev, 120).is_empty());

        dev.release(0, 3);
        let last = sim.poll(&dev, 200);
        assert_eq!(last.len(), 1);
        assert!(last[0].identical(&InputEvent::release(0, 3).at(200)));
    }

    #[test]
    fn axis_deadband_suppresses_jitter() {
        let mut dev = VirtualDevice::new().with_device(1, 0, 2);
        let mut sim = SimulatedDevice::new(1).with_deadband(0.05);

        dev.set_axis(1, 0, 0.03);
        assert!(sim.poll(&dev, 0).is_empty());

        dev.set_axis(1, 0, 0.5);
        let events = sim.poll(&dev, 20);
        assert_eq!(events, vec![InputEvent::axis_change(1, 0, 0.5)]);
    }

    #[test]
    fn snapshot_updates_even_without_event() {
        let mut dev = VirtualDevice::new().with_device(0, 0, 1);
        let mut sim = SimulatedDevice::new(0).with_deadband(0.1);
        dev.set_axis(0, 0, 0.08);
        assert!(sim.poll(&dev, 0).is_empty());
        assert_eq!(sim.snapshot().axes, vec![0.08]);
        // 0.16 is 0.08 away from the last observed value, still inside the deadband
        dev.set_axis(0, 0, 0.16);
        assert!(sim.poll(&dev, 20).is_empty());
    }

    #[test]
    fn pov_change_and_center() {
        let mut dev = VirtualDevice::new().with_device(0, 0, 0);
        let mut sim = SimulatedDevice::new(0);
        dev.set_pov(0, 90);
        assert_eq!(sim.poll(&dev, 0), vec![InputEvent::pov_change(0, 90)]);
        assert!(sim.poll(&dev, 20).is_empty());
        dev.set_pov(0, POV_CENTERED);
        assert_eq!(sim.poll(&dev, 40), vec![InputEvent::pov_change(0, POV_CENTERED)]);
    }

    #[test]
    fn ordering_is_buttons_axes_pov() {
        let mut dev = VirtualDevice::new().with_device(0, 4, 2);
        dev.press(0, 2);
        dev.press(0, 0);
        dev.set_axis(0, 1, -1.0);
        dev.set_axis(0, 0, 1.0);
        dev.set_pov(0, 45);
        let kinds: Vec<_> = SimulatedDevice::new(0)
            .poll(&dev, 0)
            .iter()
            .map(|e| (e.kind(), e.slot()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (EventKind::Press, 0),
                (EventKind::Press, 2),
                (EventKind::Axis, 0),
                (EventKind::Axis, 1),
                (EventKind::Pov, 0),
            ]
        );
    }

    #[test]
    fn inputs_poll_devices_in_order() {
        let mut dev = VirtualDevice::new().with_device(0, 2, 0).with_device(1, 2, 0);
        dev.press(1, 0);
        dev.press(0, 1);
        let mut inputs = Inputs::new(&[0, 1], DEFAULT_DEADBAND);
        let events = inputs.poll(&dev, 5);
        assert_eq!(events, vec![InputEvent::press(0, 1), InputEvent::press(1, 0)]);
        assert_eq!(inputs.ids().collect::<Vec<_>>(), vec![0, 1]);
    }

    fn state(buttons: Vec<bool>, axes: Vec<f64>) -> DeviceSnapshot {
        DeviceSnapshot { buttons, axes, pov: POV_CENTERED }
    }

    #[test]
    fn shrinking_layout_releases_held_inputs() {
        let mut sim = SimulatedDevice::new(0);
        assert_eq!(
            sim.diff(state(vec![false, true], vec![0.7]), 0),
            vec![InputEvent::press(0, 1), InputEvent::axis_change(0, 0, 0.7)]
        );

        let dropped = sim.diff(state(vec![], vec![]), 20);
        assert_eq!(
            dropped,
            vec![InputEvent::release(0, 1), InputEvent::axis_change(0, 0, 0.0)]
        );

        let back = sim.diff(state(vec![false, true], vec![0.7]), 40);
        assert_eq!(
            back,
            vec![InputEvent::press(0, 1), InputEvent::axis_change(0, 0, 0.7)]
        );
    }

    #[test]
    fn shrinking_layout_with_idle_inputs_is_silent() {
        let mut sim = SimulatedDevice::new(0);
        assert!(sim.diff(state(vec![false; 4], vec![0.0; 2]), 0).is_empty());
        assert!(sim.diff(state(vec![false], vec![]), 20).is_empty());
    }

    #[test]
    fn nan_axis_reading_keeps_last_value() {
        let mut sim = SimulatedDevice::new(0);
        sim.diff(state(vec![], vec![0.2]), 0);

        assert!(sim.diff(state(vec![], vec![f64::NAN]), 20).is_empty());
        assert_eq!(sim.snapshot().axes, vec![0.2]);

        assert_eq!(
            sim.diff(state(vec![], vec![0.9]), 40),
            vec![InputEvent::axis_change(0, 0, 0.9)]
        );
        assert!(sim.diff(state(vec![], vec![0.9]), 60).is_empty());
    }

    fn snapshot(buttons: usize, axes: usize) -> impl Strategy<Value = DeviceSnapshot> {
        (
            prop::collection::vec(any::<bool>(), buttons),
            prop::collection::vec(-1.0f64..1.0, axes),
            prop_oneof![Just(POV_CENTERED), (0i32..8).prop_map(|d| d * 45)],
        )
            .prop_map(|(buttons, axes, pov)| DeviceSnapshot { buttons, axes, pov })
    }

    proptest! {
        #[test]
        fn diff_emits_exactly_the_transitions(prev in snapshot(8, 4), next in snapshot(8, 4)) {
            let mut sim = SimulatedDevice::new(3);
            sim.diff(prev.clone(), 0);
            let events = sim.diff(next.clone(), 20);

            for i in 0..8 {
                let presses = events.iter().filter(|e| e.kind() == EventKind::Press && e.slot() == i as u32).count();
                let releases = events.iter().filter(|e| e.kind() == EventKind::Release && e.slot() == i as u32).count();
                prop_assert_eq!(presses, usize::from(!prev.buttons[i] && next.buttons[i]));
                prop_assert_eq!(releases, usize::from(prev.buttons[i] && !next.buttons[i]));
            }
            for j in 0..4 {
                let moved = (next.axes[j] - prev.axes[j]).abs() > DEFAULT_DEADBAND;
                let axes = events.iter().filter(|e| e.kind() == EventKind::Axis && e.slot() == j as u32).count();
                prop_assert_eq!(axes, usize::from(moved));
            }
            let povs = events.iter().filter(|e| e.kind() == EventKind::Pov).count();
            prop_assert_eq!(povs, usize::from(prev.pov != next.pov));
            prop_assert!(events.iter().all(|e| e.t == 20 && e.device == 3));
            prop_assert_eq!(sim.snapshot(), &next);
        }
    }
}
