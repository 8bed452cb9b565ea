//! joymacro-recorder - record and replay joystick macros
//!
//! Records operator input on a periodic control loop, stores each session
//! as a numbered text file, and plays it back through the same handlers that
//! serve live input.
//!
//! ## Pieces
//!
//! - **session**: the record/play state machine
//! - **codec**: the line-per-event text format
//! - **storage**: numbered macro files on a [`Storage`] backend
//! - **orchestrator**: per-tick arbitration between live input and playback

pub mod chooser;
pub mod codec;
pub mod config;
pub mod dispatch;
pub mod orchestrator;
pub mod session;
pub mod storage;

pub use chooser::{macro_tag, parse_macro_tag, AutoChooser, AutoOption};
pub use codec::{Decoded, Strictness};
pub use config::MacroConfig;
pub use dispatch::Dispatcher;
pub use orchestrator::{AutonomousStep, Orchestrator};
pub use session::{Macro, Mode};
pub use storage::{FsStorage, MacroLibrary, Storage};

pub mod prelude {
    pub use crate::chooser::AutoChooser;
    pub use crate::codec::Strictness;
    pub use crate::config::MacroConfig;
    pub use crate::orchestrator::{AutonomousStep, Orchestrator};
    pub use crate::session::{Macro, Mode};
    pub use crate::storage::{FsStorage, MacroLibrary, Storage};
}
