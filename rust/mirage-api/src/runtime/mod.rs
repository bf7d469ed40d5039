//! Simulation runtime.
//!
//! - [`registry`]: machine catalog and selection
//! - [`boot`]: boot scripts and pure playback
//! - [`shell`]: prompt framing and reply interpretation
//! - [`controller`]: lifecycle/session state machine
//! - [`simulator`]: async service driving the controller

pub mod boot;
pub mod controller;
pub mod registry;
pub mod shell;
pub mod simulator;

pub use boot::{playback, BootScript, Playback};
pub use controller::{
    BootTicket, ControllerOptions, SessionPhase, ShellOutcome, ShellRequest, VmController,
};
pub use registry::{Registry, SettingsPatch};
pub use simulator::{SimulationTiming, Simulator};
