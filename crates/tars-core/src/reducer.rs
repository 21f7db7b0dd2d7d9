//! The streaming reduction state machine.
//!
//! A [`StreamReducer`] is the single consumer of events for one transcript.
//! Events are applied strictly in arrival order:
//!
//! - `ack` replaces the open turn's reply (acks are snapshots)
//! - `route_decision` / `final_response` append their formatted fragment
//! - either of those carrying `[DONE]` closes the open turn without touching its text
//! - `error` closes the open turn as failed, leaving its text as it was, and
//!   appends a new, already closed error turn
//! - unknown kinds are logged and ignored
//!
//! If a server event arrives while the transcript is empty, an open
//! server-originated turn is synthesized first.
//!
//! At most one turn is open at any time, and only the last one can be.

use crate::error::CoreError;
use crate::event::{classify, Event, EventKind};
use crate::format::format_chunk;
use crate::transcript::{Transcript, TranscriptChange, Turn, TurnStatus};

/// Folds classified events into a [`Transcript`].
#[derive(Debug, Clone, Default)]
pub struct StreamReducer {
    transcript: Transcript,
}

impl StreamReducer {
    /// Create a reducer with an empty transcript.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only access to the transcript.
    #[must_use]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Consume the reducer, returning its transcript.
    #[must_use]
    pub fn into_transcript(self) -> Transcript {
        self.transcript
    }

    /// Whether the last turn is still waiting for server events.
    #[must_use]
    pub fn has_open_turn(&self) -> bool {
        self.transcript.open_turn().is_some()
    }

    /// Record a user submission as a new open turn.
    ///
    /// A previous turn that is still open is superseded: it is closed as
    /// failed with its text kept.
    pub fn user_message(&mut self, text: impl Into<String>) -> TranscriptChange {
        let closed = if self.has_open_turn() {
            tracing::debug!("superseding open turn with new user message");
            self.close_open_turn(TurnStatus::Failed)
        } else {
            TranscriptChange::Unchanged
        };
        closed.merge(self.transcript.append(Turn::user(text)))
    }

    /// Classify a raw frame and apply it.
    ///
    /// Malformed frames are logged and leave the transcript unchanged.
    pub fn apply_raw(&mut self, raw: &str) -> TranscriptChange {
        match classify(raw) {
            Ok(event) => self.apply(event),
            Err(e) => {
                tracing::warn!(error = %e, frame = %raw, "ignoring malformed frame");
                TranscriptChange::Unchanged
            }
        }
    }

    /// Surface a connection-level failure as an error turn.
    pub fn transport_error(&mut self, message: impl Into<String>) -> TranscriptChange {
        let seeded = self.seed_if_empty(&EventKind::Error);
        seeded.merge(self.fail(&CoreError::Transport(message.into())))
    }

    /// Apply one classified event.
    pub fn apply(&mut self, event: Event) -> TranscriptChange {
        if let EventKind::Other(tag) = &event.kind {
            tracing::debug!(kind = %tag, "ignoring event of unknown kind");
            return TranscriptChange::Unchanged;
        }

        let seeded = self.seed_if_empty(&event.kind);

        let change = match event.kind {
            EventKind::Error => self.fail(&CoreError::Model(event.payload)),
            _ if event.is_done() => self.complete_open_turn(),
            EventKind::Ack => {
                let text = format_chunk(&event.kind, &event.payload);
                self.update_open_turn(|reply| *reply = text)
            }
            EventKind::RouteDecision | EventKind::FinalResponse => {
                let text = format_chunk(&event.kind, &event.payload);
                self.update_open_turn(|reply| reply.push_str(&text))
            }
            EventKind::Other(_) => TranscriptChange::Unchanged,
        };

        seeded.merge(change)
    }

    /// Synthesize an open server turn when nothing exists yet.
    fn seed_if_empty(&mut self, kind: &EventKind) -> TranscriptChange {
        if self.transcript.is_empty() {
            tracing::debug!(kind = %kind.as_str(), "server event before any turn, seeding one");
            self.transcript.append(Turn::server())
        } else {
            TranscriptChange::Unchanged
        }
    }

    /// Close the open turn. Repeated sentinels are no-ops.
    fn complete_open_turn(&mut self) -> TranscriptChange {
        if !self.has_open_turn() {
            tracing::debug!("[DONE] with no open turn, ignoring");
            return TranscriptChange::Unchanged;
        }
        self.close_open_turn(TurnStatus::Complete)
    }

    /// Set a terminal status on the open turn, leaving its text alone.
    fn close_open_turn(&mut self, status: TurnStatus) -> TranscriptChange {
        self.mutate_last(|turn| turn.status = status)
    }

    /// Fail the open turn, if any, and append the error turn.
    fn fail(&mut self, err: &CoreError) -> TranscriptChange {
        let closed = if self.has_open_turn() {
            self.close_open_turn(TurnStatus::Failed)
        } else {
            TranscriptChange::Unchanged
        };
        let text = format_chunk(&EventKind::Error, &err.user_message());
        closed.merge(self.transcript.append(Turn::failed(text)))
    }

    /// Edit the open turn's reply, opening a server turn if the last one is closed.
    fn update_open_turn(&mut self, edit: impl FnOnce(&mut String)) -> TranscriptChange {
        let opened = if self.has_open_turn() {
            TranscriptChange::Unchanged
        } else {
            tracing::debug!("fragment after turn closed, opening server turn");
            self.transcript.append(Turn::server())
        };

        let change = self.mutate_last(|turn| {
            edit(&mut turn.reply_text);
            turn.status = TurnStatus::Streaming;
        });

        opened.merge(change)
    }

    fn mutate_last(&mut self, mutator: impl FnOnce(&mut Turn)) -> TranscriptChange {
        match self.transcript.update_last(mutator) {
            Ok(()) => TranscriptChange::Updated,
            Err(e) => {
                tracing::error!(error = %e, "reducer mutated an empty transcript");
                TranscriptChange::Unchanged
            }
        }
    }
}
