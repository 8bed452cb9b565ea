//! Tick-level glue between live input, recording, storage and playback
//!
//! The orchestrator owns the only macro slot. During teleoperation it polls
//! live devices, records while the trigger toggle is on and dispatches every
//! event to the registered handlers. During autonomous it replays the
//! selected macro through the same handlers. Nothing in here returns an
//! error to the caller: failures are logged and the tick carries on.

use crate::chooser::{parse_macro_tag, AutoChooser};
use crate::config::MacroConfig;
use crate::dispatch::Dispatcher;
use crate::session::{Macro, Mode};
use crate::storage::{FsStorage, MacroLibrary, Storage};
use joymacro_core::{
    Clock, Device, Error, EventKind, EventSource, InputEvent, Inputs, Millis, Result, SystemClock,
};
use tracing::{debug, error, info, warn};

/// What the caller should do with the current autonomous tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutonomousStep {
    /// A macro is playing; its events were dispatched this tick
    Replaying,
    /// The macro has finished; stop the actuators
    Finished,
    /// A built-in mode is selected; run it
    Builtin(String),
    /// Nothing to replay (none selected, or loading failed)
    NoMacro,
}

/// Decision taken on the first autonomous tick
#[derive(Debug, Clone)]
enum Plan {
    Replay,
    Builtin(String),
    NoMacro,
}

pub struct Orchestrator<S: Storage = FsStorage, C: Clock = SystemClock> {
    config: MacroConfig,
    library: Option<MacroLibrary<S>>,
    chooser: AutoChooser,
    inputs: Inputs,
    dispatcher: Dispatcher,
    clock: C,
    current: Option<Macro>,
    plan: Option<Plan>,
}

impl Orchestrator<FsStorage, SystemClock> {
    pub fn with_config(config: MacroConfig) -> Self {
        Self::new(config, FsStorage, SystemClock)
    }
}

impl<S: Storage, C: Clock> Orchestrator<S, C> {
    /// Set up storage and offer every stored macro in the chooser. A broken
    /// macro directory leaves recording and replay disabled.
    pub fn new(config: MacroConfig, storage: S, clock: C) -> Self {
        let inputs = Inputs::new(&config.polled_devices(), config.deadband);
        let mut orchestrator = Self {
            library: None,
            chooser: AutoChooser::new(),
            inputs,
            dispatcher: Dispatcher::new(),
            clock,
            current: None,
            plan: None,
            config,
        };

        match MacroLibrary::new(storage, &orchestrator.config.macro_dir) {
            Ok(library) => {
                match library.list() {
                    Ok(numbers) => numbers.into_iter().for_each(|n| orchestrator.chooser.add_macro(n)),
                    Err(e) => orchestrator.report("Could not list stored macros", &e),
                }
                orchestrator.library = Some(library);
            }
            Err(e) => orchestrator.report("Macro directory unavailable, macros disabled", &e),
        }
        orchestrator
    }

    pub fn config(&self) -> &MacroConfig {
        &self.config
    }

    pub fn chooser(&self) -> &AutoChooser {
        &self.chooser
    }

    pub fn chooser_mut(&mut self) -> &mut AutoChooser {
        &mut self.chooser
    }

    pub fn library(&self) -> Option<&MacroLibrary<S>> {
        self.library.as_ref()
    }

    pub fn current(&self) -> Option<&Macro> {
        self.current.as_ref()
    }

    pub fn is_recording(&self) -> bool {
        self.current.as_ref().is_some_and(Macro::is_recording)
    }

    /// Run `handler` for every live or replayed event equal to `template`
    pub fn on(&mut self, template: InputEvent, handler: impl FnMut(&InputEvent) + 'static) {
        self.dispatcher.on(template, handler);
    }

    /// Offer a built-in autonomous mode
    pub fn add_auto_mode(&mut self, name: impl Into<String>) {
        self.chooser.add_mode(name);
    }

    /// One teleoperation tick. Returns the events that were dispatched.
    pub fn teleop_tick(&mut self, device: &dyn Device) -> Vec<InputEvent> {
        let now = self.clock.now_ms();
        let polled = self.inputs.poll(device, now);

        let toggle = polled
            .iter()
            .any(|e| self.is_trigger(e) && e.kind() == EventKind::Press);
        let events: Vec<InputEvent> = polled.into_iter().filter(|e| !self.is_trigger(e)).collect();

        if let Some(m) = self.current.as_mut() {
            m.capture(&events, now);
        }
        if toggle {
            self.toggle_recording(now);
        }

        self.dispatcher.dispatch_all(&events);
        events
    }

    /// One autonomous tick. The selection is read once per autonomous
    /// period; call [`Orchestrator::end_autonomous`] when the period ends.
    pub fn autonomous_tick(&mut self, device: &dyn Device) -> AutonomousStep {
        let now = self.clock.now_ms();
        if self.plan.is_none() {
            self.plan = Some(self.plan_autonomous(now));
        }

        match &self.plan {
            Some(Plan::Replay) => {
                let Some(m) = self.current.as_mut() else {
                    return AutonomousStep::Finished;
                };
                let events = m.poll(device, now);
                let playing = m.is_playing(now);
                self.dispatcher.dispatch_all(&events);
                if playing {
                    AutonomousStep::Replaying
                } else {
                    AutonomousStep::Finished
                }
            }
            Some(Plan::Builtin(tag)) => AutonomousStep::Builtin(tag.clone()),
            Some(Plan::NoMacro) | None => AutonomousStep::NoMacro,
        }
    }

    /// Abort any playback and forget the autonomous decision
    pub fn end_autonomous(&mut self) {
        if let Some(m) = self.current.as_mut().filter(|m| !m.is_recording()) {
            if m.mode() == Mode::Playing {
                // cannot fail while playing
                m.abort().ok();
            }
            self.current = None;
        }
        self.plan = None;
    }

    fn is_trigger(&self, e: &InputEvent) -> bool {
        e.device == self.config.trigger_device && e.button() == Some(self.config.trigger_button)
    }

    fn toggle_recording(&mut self, now: Millis) {
        if self.is_recording() {
            self.finish_recording();
            return;
        }
        if self.library.is_none() {
            warn!("Macro storage unavailable, not recording");
            return;
        }
        let mut m = Macro::new(self.config.devices.iter().copied());
        match m.start_recording(now) {
            Ok(()) => {
                info!("Recording...");
                self.current = Some(m);
            }
            Err(e) => self.report("Could not start recording", &e),
        }
    }

    /// Stop the running recording, persist it, and offer it in the chooser
    fn finish_recording(&mut self) {
        let Some(mut m) = self.current.take() else {
            return;
        };
        if let Err(e) = m.stop_recording() {
            self.report("Could not stop recording", &e);
            return;
        }
        info!(events = m.len(), "Stopped recording.");
        if m.is_empty() {
            info!("Nothing recorded, not saving");
            return;
        }
        match self.persist(&m) {
            Ok(number) => self.chooser.add_macro(number),
            Err(e) => self.report("Could not save macro", &e),
        }
    }

    fn persist(&self, m: &Macro) -> Result<u32> {
        let library = self.library.as_ref().ok_or_else(|| Error::io("macro storage", "unavailable"))?;
        library.save(m)
    }

    fn plan_autonomous(&mut self, now: Millis) -> Plan {
        if self.is_recording() {
            self.finish_recording();
        }
        let Some(tag) = self.chooser.selected().map(str::to_string) else {
            debug!("No autonomous mode selected");
            return Plan::NoMacro;
        };
        let Some(number) = parse_macro_tag(&tag) else {
            return Plan::Builtin(tag);
        };

        match self.load_and_play(number, now) {
            Ok(()) => Plan::Replay,
            Err(e) => {
                self.report(&format!("Could not load macro {}", number), &e);
                Plan::NoMacro
            }
        }
    }

    fn load_and_play(&mut self, number: u32, now: Millis) -> Result<()> {
        let library = self.library.as_ref().ok_or_else(|| Error::io("macro storage", "unavailable"))?;
        let mut m = library.load(number)?;
        m.start_playing(now)?;
        info!(number, "Macro length: {:.3} seconds", m.duration_ms() as f64 / 1000.0);
        self.current = Some(m);
        Ok(())
    }

    fn report(&self, what: &str, e: &Error) {
        if e.is_benign() {
            debug!("{}: {}", what, e.message);
            return;
        }
        error!("{}: {}", what, e.message);
        if self.config.debug {
            error!(error = ?e, "{} (detail)", what);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use joymacro_core::{ManualClock, VirtualDevice};
    use std::cell::RefCell;
    use std::path::Path;
    use std::rc::Rc;

    const T0: Millis = 1_700_000_000_000;

    fn config(dir: &Path) -> MacroConfig {
        MacroConfig {
            macro_dir: dir.to_path_buf(),
            devices: vec![0],
            trigger_device: 0,
            trigger_button: 5,
            ..Default::default()
        }
    }

    fn device() -> VirtualDevice {
        VirtualDevice::new().with_device(0, 8, 2)
    }

    fn tap_trigger(o: &mut Orchestrator<FsStorage, ManualClock>, dev: &mut VirtualDevice, clock: &ManualClock) {
        dev.press(0, 5);
        o.teleop_tick(&*dev);
        clock.advance(20);
        dev.release(0, 5);
        o.teleop_tick(&*dev);
    }

    #[test]
    fn trigger_records_and_persists() {
        let tmp = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(T0);
        let mut o = Orchestrator::new(config(tmp.path()), FsStorage, clock.clone());
        let mut dev = device();

        tap_trigger(&mut o, &mut dev, &clock);
        assert!(o.is_recording());

        clock.advance(20);
        dev.press(0, 2);
        let dispatched = o.teleop_tick(&dev);
        assert_eq!(dispatched, vec![InputEvent::press(0, 2)]);

        clock.advance(20);
        tap_trigger(&mut o, &mut dev, &clock);
        assert!(!o.is_recording());
        assert_eq!(o.chooser().options()[0].tag, "macro0");

        let saved = o.library().unwrap().load(0).unwrap();
        assert_eq!(saved.events(), &[InputEvent::press(0, 2)]);
        assert_eq!(saved.events()[0].t, 40);
    }

    #[test]
    fn trigger_edges_are_not_dispatched() {
        let tmp = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(T0);
        let mut o = Orchestrator::new(config(tmp.path()), FsStorage, clock.clone());
        let hits = Rc::new(RefCell::new(0));
        let h = hits.clone();
        o.on(InputEvent::press(0, 5), move |_| *h.borrow_mut() += 1);

        let mut dev = device();
        dev.press(0, 5);
        assert!(o.teleop_tick(&dev).is_empty());
        assert_eq!(*hits.borrow(), 0);
    }

    #[test]
    fn existing_macros_are_offered() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("0"), "0:press,0,1,\n").unwrap();
        std::fs::write(tmp.path().join("2"), "0:press,0,1,\n").unwrap();
        let o = Orchestrator::new(config(tmp.path()), FsStorage, ManualClock::new(T0));
        let tags: Vec<_> = o.chooser().options().iter().map(|opt| opt.tag.as_str()).collect();
        assert_eq!(tags, vec!["macro0", "macro2"]);
    }

    #[test]
    fn autonomous_replays_through_handlers() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("0"), "0:press,0,3,\n60:release,0,3,\n").unwrap();
        let clock = ManualClock::new(T0);
        let mut o = Orchestrator::new(config(tmp.path()), FsStorage, clock.clone());
        let seen = Rc::new(RefCell::new(Vec::new()));
        for template in [InputEvent::press(0, 3), InputEvent::release(0, 3)] {
            let s = seen.clone();
            o.on(template, move |e| s.borrow_mut().push((e.kind(), e.t - T0)));
        }
        assert!(o.chooser_mut().select("macro0"));

        let dev = VirtualDevice::new();
        assert_eq!(o.autonomous_tick(&dev), AutonomousStep::Replaying);
        clock.advance(50);
        assert_eq!(o.autonomous_tick(&dev), AutonomousStep::Replaying);
        clock.advance(50);
        assert_eq!(o.autonomous_tick(&dev), AutonomousStep::Finished);
        assert_eq!(
            *seen.borrow(),
            vec![(EventKind::Press, 0), (EventKind::Release, 60)]
        );

        o.end_autonomous();
        assert!(o.current().is_none());
    }

    #[test]
    fn builtin_and_unselected_modes() {
        let tmp = tempfile::tempdir().unwrap();
        let mut o = Orchestrator::new(config(tmp.path()), FsStorage, ManualClock::new(T0));
        let dev = VirtualDevice::new();
        assert_eq!(o.autonomous_tick(&dev), AutonomousStep::NoMacro);
        o.end_autonomous();

        o.add_auto_mode("example");
        o.chooser_mut().select("example");
        assert_eq!(o.autonomous_tick(&dev), AutonomousStep::Builtin("example".into()));
    }

    #[test]
    fn missing_macro_degrades_once() {
        let tmp = tempfile::tempdir().unwrap();
        let mut o = Orchestrator::new(config(tmp.path()), FsStorage, ManualClock::new(T0));
        o.chooser_mut().add_macro(9);
        o.chooser_mut().select("macro9");
        let dev = VirtualDevice::new();
        assert_eq!(o.autonomous_tick(&dev), AutonomousStep::NoMacro);
        std::fs::write(tmp.path().join("9"), "0:press,0,1,\n10:release,0,1,\n").unwrap();
        // the decision holds for the rest of the period
        assert_eq!(o.autonomous_tick(&dev), AutonomousStep::NoMacro);
        o.end_autonomous();
        assert_eq!(o.autonomous_tick(&dev), AutonomousStep::Replaying);
    }

    #[test]
    fn autonomous_start_finishes_open_recording() {
        let tmp = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(T0);
        let mut o = Orchestrator::new(config(tmp.path()), FsStorage, clock.clone());
        let mut dev = device();

        tap_trigger(&mut o, &mut dev, &clock);
        clock.advance(20);
        dev.press(0, 1);
        o.teleop_tick(&dev);
        assert!(o.is_recording());

        assert_eq!(o.autonomous_tick(&VirtualDevice::new()), AutonomousStep::NoMacro);
        assert!(!o.is_recording());
        assert!(tmp.path().join("0").exists());
        assert_eq!(o.chooser().options()[0].tag, "macro0");
    }

    struct ReadOnly;

    impl Storage for ReadOnly {
        fn read_lines(&self, path: &Path) -> Result<Vec<String>> {
            Err(Error::io(&path.display().to_string(), "not found"))
        }
        fn write_whole(&self, path: &Path, _text: &str) -> Result<()> {
            Err(Error::io(&path.display().to_string(), "read-only"))
        }
        fn list(&self, _dir: &Path) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
        fn remove(&self, path: &Path) -> Result<()> {
            Err(Error::io(&path.display().to_string(), "read-only"))
        }
        fn create_dir(&self, _dir: &Path) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_save_drops_recording_without_panicking() {
        let clock = ManualClock::new(T0);
        let mut o = Orchestrator::new(config(Path::new("/ro")), ReadOnly, clock.clone());
        let mut dev = device();

        dev.press(0, 5);
        o.teleop_tick(&dev);
        dev.press(0, 1);
        clock.advance(20);
        o.teleop_tick(&dev);
        dev.release(0, 5);
        clock.advance(20);
        o.teleop_tick(&dev);
        dev.press(0, 5);
        clock.advance(20);
        o.teleop_tick(&dev);

        assert!(!o.is_recording());
        assert!(o.current().is_none());
        assert!(o.chooser().options().is_empty());
    }
}
