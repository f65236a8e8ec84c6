//! Light output state machine
//!
//! ## Key components:
//! - `state` - Flags set by game events
//! - `resolver` - Reduce the flags to one visible mode by fixed priority
//! - `color` - RGB to HSBK conversion and the command sent to bulbs
//! - `sink` - Output adapter trait
//! - `controller` - Event handlers tying the pieces together
//! - `lifx` - LIFX LAN protocol sink

pub mod color;
mod controller;
pub mod lifx;
mod resolver;
mod sink;
mod state;

pub use color::{rgb_to_hsv, Hsbk, LightCommand, Rgb, DEFAULT_KELVIN};
pub use controller::{LightController, Signal};
pub use lifx::{LifxSink, Light};
pub use resolver::{resolve, resolve_mode, Mode, Resolved, Transition};
pub use sink::{LightSink, LogSink};
pub use state::{DockingState, OutputState};
