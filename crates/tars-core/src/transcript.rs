//! Conversation turns and the append-only transcript that holds them.

use crate::error::{CoreError, Result};

/// Lifecycle state of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TurnStatus {
    /// Created, no server event yet.
    #[default]
    Pending,
    /// Receiving ack, route or final fragments.
    Streaming,
    /// Closed by the `[DONE]` sentinel.
    Complete,
    /// Closed by an error.
    Failed,
}

impl TurnStatus {
    /// Whether no further server event may change the turn.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

/// One user input plus its (possibly partial) reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    /// What the user typed. `None` for server-originated turns.
    pub user_text: Option<String>,
    /// Reply text assembled so far.
    pub reply_text: String,
    /// Lifecycle state.
    pub status: TurnStatus,
}

impl Turn {
    /// Placeholder turn for a user submission.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            user_text: Some(text.into()),
            reply_text: String::new(),
            status: TurnStatus::Pending,
        }
    }

    /// Open turn that no user input produced.
    #[must_use]
    pub fn server() -> Self {
        Self {
            user_text: None,
            reply_text: String::new(),
            status: TurnStatus::Pending,
        }
    }

    /// Closed turn carrying an already formatted error.
    #[must_use]
    pub fn failed(reply_text: impl Into<String>) -> Self {
        Self {
            user_text: None,
            reply_text: reply_text.into(),
            status: TurnStatus::Failed,
        }
    }

    /// Whether the turn has been closed.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.status.is_terminal()
    }
}

/// What a reducer step did to the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptChange {
    /// A new turn was appended.
    Appended {
        /// The view should jump to the newest content. Only set for turns
        /// with user text.
        scroll_to_latest: bool,
    },
    /// The last turn changed in place.
    Updated,
    /// Nothing changed.
    Unchanged,
}

impl TranscriptChange {
    /// Whether the view needs a redraw.
    #[must_use]
    pub const fn is_changed(self) -> bool {
        !matches!(self, Self::Unchanged)
    }

    /// Whether the view should scroll to the newest content.
    #[must_use]
    pub const fn scroll_to_latest(self) -> bool {
        matches!(
            self,
            Self::Appended {
                scroll_to_latest: true
            }
        )
    }

    /// Combine two consecutive changes into the strongest one.
    #[must_use]
    pub const fn merge(self, next: Self) -> Self {
        match (self, next) {
            (Self::Appended { scroll_to_latest: a }, Self::Appended { scroll_to_latest: b }) => {
                Self::Appended {
                    scroll_to_latest: a || b,
                }
            }
            (appended @ Self::Appended { .. }, _) | (_, appended @ Self::Appended { .. }) => {
                appended
            }
            (Self::Updated, _) | (_, Self::Updated) => Self::Updated,
            (Self::Unchanged, Self::Unchanged) => Self::Unchanged,
        }
    }
}

/// Ordered history of turns for one session.
///
/// Append-only: only the last turn may be mutated, through
/// [`Transcript::update_last`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    /// Create an empty transcript.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn and report the change.
    pub fn append(&mut self, turn: Turn) -> TranscriptChange {
        let scroll_to_latest = turn.user_text.is_some();
        self.turns.push(turn);
        TranscriptChange::Appended { scroll_to_latest }
    }

    /// Mutate the last turn in place.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmptyTranscript`] if there are no turns.
    pub fn update_last<R>(&mut self, mutator: impl FnOnce(&mut Turn) -> R) -> Result<R> {
        self.turns
            .last_mut()
            .map(mutator)
            .ok_or(CoreError::EmptyTranscript)
    }

    /// Read-only view of all turns, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> &[Turn] {
        &self.turns
    }

    /// The most recent turn.
    #[must_use]
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// The last turn, if it is still open.
    #[must_use]
    pub fn open_turn(&self) -> Option<&Turn> {
        self.last().filter(|turn| !turn.is_complete())
    }

    /// Number of turns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether there are no turns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
