//! Output sink abstraction
//!
//! Anything that can apply one colour to every managed light.

use super::color::LightCommand;
use crate::error::SinkError;

/// Trait for applying light commands (adapter pattern).
///
/// `LifxSink` drives real bulbs, `LogSink` only logs.
pub trait LightSink {
    fn set_all_lights(&mut self, command: &LightCommand) -> Result<(), SinkError>;
}

impl<S: LightSink + ?Sized> LightSink for Box<S> {
    fn set_all_lights(&mut self, command: &LightCommand) -> Result<(), SinkError> {
        (**self).set_all_lights(command)
    }
}

/// Sink that logs each command instead of sending it anywhere.
#[derive(Debug, Default)]
pub struct LogSink {
    sent: u64,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of commands logged so far
    pub fn sent(&self) -> u64 {
        self.sent
    }
}

impl LightSink for LogSink {
    fn set_all_lights(&mut self, command: &LightCommand) -> Result<(), SinkError> {
        self.sent += 1;
        tracing::info!(
            hue = command.color.hue,
            saturation = command.color.saturation,
            brightness = command.color.brightness,
            kelvin = command.color.kelvin,
            duration_ms = command.duration_millis(),
            "dry run: set all lights"
        );
        Ok(())
    }
}
