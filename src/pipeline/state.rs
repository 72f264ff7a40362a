/// Lifecycle of one stage within one run.
///
/// A stage only accepts and forwards data while [`State::Active`]. Leaving
/// `Active` is one-way until the chain resets every stage at the start of the
/// next run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum State {
    /// Never run.
    #[default]
    Uninitialized,
    Active,
    Completed,
    Errored,
    /// Halted by a stop request from a later stage.
    Stopped,
}

impl State {
    pub fn is_active(self) -> bool {
        self == State::Active
    }

    /// `Completed`, `Errored` or `Stopped`.
    pub fn is_terminal(self) -> bool {
        matches!(self, State::Completed | State::Errored | State::Stopped)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            State::Uninitialized => "uninitialized",
            State::Active => "active",
            State::Completed => "completed",
            State::Errored => "errored",
            State::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
