//! Small shared types of the engine's public surface.

use serde::Serialize;

/// Lifecycle phase of a loaded scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    /// Host constructed, script not yet run.
    Initial,
    /// Init script loaded, preload events firing.
    Preload,
    /// Scenario assembled, prestart events firing.
    Prestart,
    /// Start-of-scenario events firing.
    Start,
    /// Normal play.
    Play,
    /// A side has won or lost.
    End,
}

/// Final outcome recorded for a side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SideResult {
    /// The side won.
    Victory,
    /// The side lost.
    Defeat,
    /// Nothing decided yet.
    #[default]
    None,
}

impl SideResult {
    /// Parse the script-side controller string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "victory" => Some(SideResult::Victory),
            "defeat" => Some(SideResult::Defeat),
            "none" => Some(SideResult::None),
            _ => None,
        }
    }
}

/// Who drives a side's turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Controller {
    /// A local human player.
    Human,
    /// The scripted AI.
    Ai,
    /// A remote human player.
    Network,
    /// A remote AI.
    NetworkAi,
    /// Nobody; the side is inert.
    #[default]
    Empty,
}

impl Controller {
    /// Parse the script-side controller string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "human" => Some(Controller::Human),
            "ai" => Some(Controller::Ai),
            "network" => Some(Controller::Network),
            "network_ai" => Some(Controller::NetworkAi),
            "empty" => Some(Controller::Empty),
            _ => None,
        }
    }
}

/// Outcome of firing an event, running a command, or executing script.
///
/// The flags are conservative appraisals: `game_state_changed` may be
/// falsely true but never falsely false, `undoable` may be falsely false
/// but never falsely true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventResult {
    /// Diagnostic message if something failed.
    pub error: Option<String>,
    /// Whether the game state may have changed.
    pub game_state_changed: bool,
    /// Whether the operation is known to be safely undoable.
    pub undoable: bool,
}

impl Default for EventResult {
    fn default() -> Self {
        Self {
            error: None,
            game_state_changed: false,
            undoable: true,
        }
    }
}

impl EventResult {
    /// A failure result that left the game untouched.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Fold another result into this one, keeping the first error and the
    /// conservative reading of both flag sets.
    #[must_use]
    pub fn merge(mut self, other: EventResult) -> Self {
        if self.error.is_none() {
            self.error = other.error;
        }
        self.game_state_changed |= other.game_state_changed;
        self.undoable &= other.undoable;
        self
    }
}

/// A capturable village.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Village {
    /// Owning side, if captured.
    pub owner: Option<super::SideId>,
}

/// A text label pinned to a hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    /// Label text.
    pub text: String,
    /// Side the label belongs to; unowned labels are visible to all.
    pub owner: Option<super::SideId>,
}

/// Split a comma-separated list, stripping whitespace and dropping empty
/// pieces.
#[must_use]
pub fn split_list(s: &str) -> Vec<&str> {
    s.split(',')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect()
}
