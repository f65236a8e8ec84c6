//! Flags driven by game events

/// Progress of the docking sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DockingState {
    #[default]
    Undocked,
    Docking,
    Docked,
}

/// Everything the resolver looks at. Several flags may be set at once; the
/// resolver decides which one is visible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputState {
    pub red_alert_active: bool,
    pub shields_active: bool,
    pub game_active: bool,
    pub beam_firing: bool,
    pub docking: DockingState,
}

impl OutputState {
    pub fn new() -> Self {
        Self::default()
    }
}
