//! Priority resolution from `OutputState` to one visible mode
//!
//! Order, first match wins:
//!
//! | mode       | colour (r, g, b)   | smooth fade |
//! |------------|--------------------|-------------|
//! | beam       | 0.5, 0.5, 0.0      | never       |
//! | docking    | 0.0, 0.5, 0.0      | slow        |
//! | docked     | 0.0, 0.2, 0.0      | slow        |
//! | red alert  | 0.5, 0.0, 0.0      | fast        |
//! | shields    | 0.0, 0.0, 0.5      | slow        |
//! | game on    | 0.0, 0.0, 0.0      | slow        |
//! | idle       | 0.01, 0.01, 0.1    | slow        |

use std::fmt;
use std::time::Duration;

use super::color::Rgb;
use super::state::{DockingState, OutputState};
use crate::config::TransitionConfig;

/// The visual modes, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    BeamFiring,
    Docking,
    Docked,
    RedAlert,
    Shields,
    GameActive,
    Idle,
}

/// Named fade presets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Instant,
    Fast,
    Slow,
}

impl Mode {
    pub const ALL: [Mode; 7] = [
        Mode::BeamFiring,
        Mode::Docking,
        Mode::Docked,
        Mode::RedAlert,
        Mode::Shields,
        Mode::GameActive,
        Mode::Idle,
    ];

    pub fn color(self) -> Rgb {
        match self {
            Mode::BeamFiring => Rgb::new(0.5, 0.5, 0.0),
            Mode::Docking => Rgb::new(0.0, 0.5, 0.0),
            Mode::Docked => Rgb::new(0.0, 0.2, 0.0),
            Mode::RedAlert => Rgb::new(0.5, 0.0, 0.0),
            Mode::Shields => Rgb::new(0.0, 0.0, 0.5),
            // lights off while playing
            Mode::GameActive => Rgb::new(0.0, 0.0, 0.0),
            // dim glow between games
            Mode::Idle => Rgb::new(0.01, 0.01, 0.1),
        }
    }

    /// Fade used when the change is applied smoothly.
    pub fn transition(self) -> Transition {
        match self {
            Mode::BeamFiring => Transition::Instant,
            Mode::RedAlert => Transition::Fast,
            _ => Transition::Slow,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::BeamFiring => "Firing beam",
            Mode::Docking => "Start docking process",
            Mode::Docked => "Docked",
            Mode::RedAlert => "Red alert active",
            Mode::Shields => "Shields active",
            Mode::GameActive => "Default game active state",
            Mode::Idle => "Default game inactive state",
        };
        f.write_str(name)
    }
}

/// Result of resolving the state once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolved {
    pub mode: Mode,
    pub color: Rgb,
    pub duration: Option<Duration>,
}

/// Pick the single mode that `state` should display.
pub fn resolve_mode(state: &OutputState) -> Mode {
    if state.beam_firing {
        return Mode::BeamFiring;
    }
    match state.docking {
        DockingState::Docking => Mode::Docking,
        DockingState::Docked => Mode::Docked,
        DockingState::Undocked if state.red_alert_active => Mode::RedAlert,
        DockingState::Undocked if state.shields_active => Mode::Shields,
        DockingState::Undocked if state.game_active => Mode::GameActive,
        DockingState::Undocked => Mode::Idle,
    }
}

/// Resolve `state` to a colour and fade.
///
/// Non-smooth resolution is always instant; the beam is instant either way.
pub fn resolve(state: &OutputState, smooth: bool, transitions: &TransitionConfig) -> Resolved {
    let mode = resolve_mode(state);
    let duration = match (smooth, mode.transition()) {
        (false, _) | (_, Transition::Instant) => None,
        (true, Transition::Fast) => Some(transitions.fast),
        (true, Transition::Slow) => Some(transitions.slow),
    };

    Resolved {
        mode,
        color: mode.color(),
        duration,
    }
}
