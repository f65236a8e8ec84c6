//! LightController - game events in, one light command out
//!
//! Each handler flips one field of `OutputState` and re-resolves, so the sink
//! always receives the colour of the highest-priority active mode.

use super::color::{LightCommand, DEFAULT_KELVIN};
use super::resolver::{resolve, Resolved};
use super::sink::LightSink;
use super::state::{DockingState, OutputState};
use crate::config::TransitionConfig;
use crate::feed::{DispatchTable, Event, Handler};

/// The feed messages the controller reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    RedAlert,
    Shields,
    Game,
    Beam,
    Docking,
    Docked,
}

impl Signal {
    pub const ALL: [Signal; 6] = [
        Signal::RedAlert,
        Signal::Shields,
        Signal::Game,
        Signal::Beam,
        Signal::Docking,
        Signal::Docked,
    ];

    /// Feed message name (exact, case-sensitive)
    pub fn message(self) -> &'static str {
        match self {
            Signal::RedAlert => "RED_ALERT",
            Signal::Shields => "PLAYER_SHIELDS_ON",
            Signal::Game => "NORMAL_CONDITION_1",
            Signal::Beam => "BEAM_FIRED",
            Signal::Docking => "START_DOCKING",
            Signal::Docked => "COMPLETELY_DOCKED",
        }
    }

    pub fn from_message(message: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.message() == message)
    }

    pub fn handler<S: LightSink>(self) -> Handler<LightController<S>> {
        match self {
            Signal::RedAlert => LightController::red_alert,
            Signal::Shields => LightController::shields,
            Signal::Game => LightController::game,
            Signal::Beam => LightController::beam,
            Signal::Docking => LightController::docking,
            Signal::Docked => LightController::docked,
        }
    }
}

pub struct LightController<S> {
    state: OutputState,
    sink: S,
    transitions: TransitionConfig,
    kelvin: u16,
    last_output: Option<LightCommand>,
    sink_failures: u64,
}

impl<S: LightSink> LightController<S> {
    pub fn new(sink: S, transitions: TransitionConfig, kelvin: u16) -> Self {
        Self {
            state: OutputState::new(),
            sink,
            transitions,
            kelvin,
            last_output: None,
            sink_failures: 0,
        }
    }

    pub fn with_defaults(sink: S) -> Self {
        Self::new(sink, TransitionConfig::default(), DEFAULT_KELVIN)
    }

    /// Table routing every `Signal` message to its handler.
    pub fn dispatch_table() -> DispatchTable<Self> {
        let mut table = DispatchTable::new();
        for signal in Signal::ALL {
            table.register(signal.message(), signal.handler());
        }
        table
    }

    pub fn state(&self) -> &OutputState {
        &self.state
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Last command handed to the sink, whether or not it succeeded
    pub fn last_output(&self) -> Option<&LightCommand> {
        self.last_output.as_ref()
    }

    pub fn sink_failures(&self) -> u64 {
        self.sink_failures
    }

    pub fn red_alert(&mut self, event: &Event) {
        self.state.red_alert_active = event.value() == 1;
        self.update(true);
    }

    pub fn shields(&mut self, event: &Event) {
        self.state.shields_active = event.value() == 1;
        self.update(true);
    }

    pub fn game(&mut self, event: &Event) {
        self.state.game_active = event.value() == 1;
        self.update(true);
    }

    /// Flash the beam colour, then drop straight back to the previous mode.
    pub fn beam(&mut self, event: &Event) {
        if event.value() == 0 {
            return;
        }
        self.state.beam_firing = true;
        self.update(false);
        self.state.beam_firing = false;
        self.update(false);
    }

    pub fn docking(&mut self, event: &Event) {
        if event.value() == 0 {
            return;
        }
        self.state.docking = DockingState::Docking;
        self.update(true);
    }

    pub fn docked(&mut self, event: &Event) {
        self.state.docking = if event.value() == 1 {
            DockingState::Docked
        } else {
            DockingState::Undocked
        };
        self.update(true);
    }

    /// Resolve the current state and send it to the sink.
    ///
    /// Sink failures are logged and counted; the state is kept either way.
    pub fn update(&mut self, smooth: bool) -> Resolved {
        let resolved = resolve(&self.state, smooth, &self.transitions);
        tracing::info!(mode = ?resolved.mode, smooth, "{}", resolved.mode);

        let command = LightCommand::new(resolved.color, self.kelvin, resolved.duration);
        if let Err(e) = self.sink.set_all_lights(&command) {
            self.sink_failures += 1;
            tracing::warn!(error = %e, "failed to update lights");
        }
        self.last_output = Some(command);
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SinkError;
    use crate::lights::color::Rgb;
    use crate::lights::resolver::Mode;
    use std::io;
    use std::time::Duration;

    #[derive(Default)]
    struct TestSink {
        commands: Vec<LightCommand>,
        fail: bool,
    }

    impl LightSink for TestSink {
        fn set_all_lights(&mut self, command: &LightCommand) -> Result<(), SinkError> {
            self.commands.push(*command);
            if self.fail {
                return Err(SinkError::Io(io::Error::from(io::ErrorKind::ConnectionRefused)));
            }
            Ok(())
        }
    }

    fn controller() -> LightController<TestSink> {
        LightController::with_defaults(TestSink::default())
    }

    fn event(message: &str, value: i64) -> Event {
        Event::new(0.0, message, value)
    }

    fn expected(rgb: Rgb, ms: Option<u64>) -> LightCommand {
        LightCommand::new(rgb, DEFAULT_KELVIN, ms.map(Duration::from_millis))
    }

    #[test]
    fn test_red_alert_on_and_off() {
        let mut c = controller();
        c.red_alert(&event("RED_ALERT", 1));
        assert!(c.state().red_alert_active);
        c.red_alert(&event("RED_ALERT", 0));
        assert!(!c.state().red_alert_active);

        assert_eq!(
            c.sink().commands,
            [
                expected(Mode::RedAlert.color(), Some(200)),
                expected(Mode::Idle.color(), Some(1000)),
            ]
        );
    }

    #[test]
    fn test_flag_handlers_only_accept_one() {
        let mut c = controller();
        c.shields(&event("PLAYER_SHIELDS_ON", 2));
        assert!(!c.state().shields_active);
        c.game(&event("NORMAL_CONDITION_1", 1));
        assert!(c.state().game_active);
    }

    #[test]
    fn test_beam_flashes_and_restores() {
        let mut c = controller();
        c.shields(&event("PLAYER_SHIELDS_ON", 1));
        c.beam(&event("BEAM_FIRED", 1));

        assert!(!c.state().beam_firing);
        assert_eq!(
            c.sink().commands[1..],
            [
                expected(Mode::BeamFiring.color(), None),
                expected(Mode::Shields.color(), None),
            ]
        );
    }

    #[test]
    fn test_beam_zero_is_ignored() {
        let mut c = controller();
        c.beam(&event("BEAM_FIRED", 0));
        assert!(c.sink().commands.is_empty());
        assert!(c.last_output().is_none());
    }

    #[test]
    fn test_docking_sequence() {
        let mut c = controller();
        c.docking(&event("START_DOCKING", 0));
        assert!(c.sink().commands.is_empty());

        c.docking(&event("START_DOCKING", 1));
        assert_eq!(c.state().docking, DockingState::Docking);

        c.docked(&event("COMPLETELY_DOCKED", 1));
        assert_eq!(c.state().docking, DockingState::Docked);

        c.docked(&event("COMPLETELY_DOCKED", 0));
        assert_eq!(c.state().docking, DockingState::Undocked);

        assert_eq!(
            c.sink().commands,
            [
                expected(Mode::Docking.color(), Some(1000)),
                expected(Mode::Docked.color(), Some(1000)),
                expected(Mode::Idle.color(), Some(1000)),
            ]
        );
    }

    #[test]
    fn test_sink_failure_is_not_fatal() {
        let mut c = LightController::with_defaults(TestSink {
            fail: true,
            ..TestSink::default()
        });
        c.red_alert(&event("RED_ALERT", 1));
        c.shields(&event("PLAYER_SHIELDS_ON", 1));

        assert_eq!(c.sink_failures(), 2);
        assert!(c.state().red_alert_active && c.state().shields_active);
        assert_eq!(
            c.last_output(),
            Some(&expected(Mode::RedAlert.color(), Some(200)))
        );
    }

    #[test]
    fn test_update_twice_is_stable() {
        let mut c = controller();
        let first = c.update(true);
        let second = c.update(true);
        assert_eq!(first, second);
        assert_eq!(c.sink().commands[0], c.sink().commands[1]);
    }

    #[test]
    fn test_custom_kelvin_and_transitions() {
        let transitions = TransitionConfig {
            fast: Duration::from_millis(10),
            slow: Duration::from_millis(20),
        };
        let mut c = LightController::new(TestSink::default(), transitions, 4000);
        c.red_alert(&event("RED_ALERT", 1));

        let command = c.last_output().unwrap();
        assert_eq!(command.color.kelvin, 4000);
        assert_eq!(command.duration, Some(Duration::from_millis(10)));
    }

    #[test]
    fn test_dispatch_table_routes_all_signals() {
        let table = LightController::<TestSink>::dispatch_table();
        assert_eq!(table.len(), 6);
        for signal in Signal::ALL {
            assert!(table.contains(signal.message()));
            assert_eq!(Signal::from_message(signal.message()), Some(signal));
        }
        assert_eq!(Signal::from_message("red_alert"), None);

        let mut c = controller();
        table.dispatch(&mut c, &event("START_DOCKING", 1));
        table.dispatch(&mut c, &event("TORP_HOMING_FIRED", 1));
        assert_eq!(c.state().docking, DockingState::Docking);
        assert_eq!(c.sink().commands.len(), 1);
    }
}
