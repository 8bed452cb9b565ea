//! # joymacro
//!
//! Record joystick input during a live session and replay it as autonomous
//! behavior.
//!
//! ## Features
//!
//! - **Diffing**: polled device state becomes edge-triggered events
//! - **Recording**: a trigger button starts and stops a session
//! - **Storage**: one numbered text file per macro
//! - **Replay**: wall-clock accurate playback through the live handlers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use joymacro::prelude::*;
//!
//! let mut robot = Orchestrator::with_config(MacroConfig::default());
//! robot.on(InputEvent::press(0, 1), |e| println!("{}", e.describe()));
//!
//! let sticks = VirtualDevice::new().with_device(0, 12, 4);
//! loop {
//!     robot.teleop_tick(&sticks);
//!     std::thread::sleep(std::time::Duration::from_millis(20));
//! }
//! ```

// Re-export the event model
pub use joymacro_core::*;

// Re-export recorder module
pub use joymacro_recorder as recorder;

pub use joymacro_recorder::{
    AutoChooser, AutonomousStep, FsStorage, Macro, MacroConfig, MacroLibrary, Mode, Orchestrator,
    Storage, Strictness,
};

/// Prelude - import everything you need
pub mod prelude {
    pub use joymacro_core::prelude::*;
    pub use joymacro_recorder::prelude::*;
}
