//! Event handlers keyed by template event
//!
//! A handler is registered once against a template such as
//! `InputEvent::press(0, 3)` and runs for every matching event, whatever its
//! timestamp and whether it came from a live device or from playback.

use joymacro_core::InputEvent;
use std::collections::HashMap;
use tracing::trace;

pub type Handler = Box<dyn FnMut(&InputEvent)>;

#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<InputEvent, Handler>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for events equal to `template`, replacing any
    /// previous handler for it
    pub fn on(&mut self, template: InputEvent, handler: impl FnMut(&InputEvent) + 'static) {
        self.handlers.insert(template, Box::new(handler));
    }

    pub fn remove(&mut self, template: &InputEvent) -> bool {
        self.handlers.remove(template).is_some()
    }

    pub fn contains(&self, event: &InputEvent) -> bool {
        self.handlers.contains_key(event)
    }

    /// Run the handler for `event`; returns false if none is registered
    pub fn dispatch(&mut self, event: &InputEvent) -> bool {
        match self.handlers.get_mut(event) {
            Some(handler) => {
                handler(event);
                true
            }
            None => {
                trace!(event = %event, "no handler");
                false
            }
        }
    }

    /// Dispatch in order; returns how many events had a handler
    pub fn dispatch_all(&mut self, events: &[InputEvent]) -> usize {
        events.iter().filter(|e| self.dispatch(e)).count()
    }
}
