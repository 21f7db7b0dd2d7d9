//! Headless one-shot mode.
//!
//! Sends a single prompt, prints the reply to a writer as it streams and
//! reports how the exchange ended.

use std::io::Write;

use tars_core::{StreamReducer, TurnStatus};

use crate::app::CONNECTION_CLOSED;
use crate::ws::{ConnectionManager, WsEvent};

/// How a one-shot exchange ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The reply closed with `[DONE]`.
    Complete,
    /// The server or the connection reported an error.
    Failed(String),
}

impl Outcome {
    /// Whether the exchange succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// Prints reply text incrementally as the reducer assembles it.
pub struct Printer<W> {
    reducer: StreamReducer,
    out: W,
    /// Index of the turn currently being printed.
    turn: usize,
    /// That turn's reply as last written.
    printed: String,
}

impl<W: Write> Printer<W> {
    /// Create a printer writing to `out`.
    pub fn new(out: W) -> Self {
        Self {
            reducer: StreamReducer::new(),
            out,
            turn: 0,
            printed: String::new(),
        }
    }

    /// Record the prompt as the first turn.
    pub fn user_message(&mut self, text: &str) {
        self.reducer.user_message(text);
        self.turn = self.reducer.transcript().len().saturating_sub(1);
        self.printed.clear();
    }

    /// Feed one raw server frame. Returns the outcome once the turn closes.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the output fails.
    pub fn frame(&mut self, raw: &str) -> std::io::Result<Option<Outcome>> {
        self.reducer.apply_raw(raw);
        self.flush_delta()
    }

    /// Close the exchange after the connection dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the output fails.
    pub fn connection_lost(&mut self, message: &str) -> std::io::Result<Outcome> {
        self.reducer.transport_error(message);
        let outcome = self.flush_delta()?;
        Ok(outcome.unwrap_or_else(|| Outcome::Failed(message.to_string())))
    }

    /// Consume the printer, returning its writer.
    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Write whatever the last turn gained since the previous call.
    fn flush_delta(&mut self) -> std::io::Result<Option<Outcome>> {
        let turns = self.reducer.transcript().snapshot();
        let Some(last) = turns.last() else {
            return Ok(None);
        };

        let index = turns.len() - 1;
        if index != self.turn {
            writeln!(self.out)?;
            self.turn = index;
            self.printed.clear();
        }

        // An ack overwrites the reply, so what was printed may no longer be a prefix.
        let reply = &last.reply_text;
        if let Some(delta) = reply.strip_prefix(self.printed.as_str()) {
            self.out.write_all(delta.as_bytes())?;
        } else {
            writeln!(self.out)?;
            self.out.write_all(reply.as_bytes())?;
        }
        self.out.flush()?;
        self.printed.clone_from(reply);

        Ok(match last.status {
            TurnStatus::Complete => {
                writeln!(self.out)?;
                Some(Outcome::Complete)
            }
            TurnStatus::Failed => Some(Outcome::Failed(reply.trim_end().to_string())),
            TurnStatus::Pending | TurnStatus::Streaming => None,
        })
    }
}

/// Send one prompt and stream the reply into `out`.
///
/// # Errors
///
/// Returns an error if the connection cannot be opened, the prompt cannot
/// be sent or writing to `out` fails.
pub async fn run<W: Write>(
    mut connection: ConnectionManager,
    prompt: &str,
    out: W,
) -> anyhow::Result<Outcome> {
    let mut events = connection.connect().await?;
    let mut printer = Printer::new(out);

    printer.user_message(prompt);
    connection.send(prompt).await?;
    tracing::info!(session_id = %connection.session_id(), "Prompt sent");

    let outcome = loop {
        match events.recv().await {
            Some(WsEvent::Connected) => {}
            Some(WsEvent::Frame(text)) => {
                if let Some(outcome) = printer.frame(&text)? {
                    break outcome;
                }
            }
            Some(WsEvent::TransportError(message)) => {
                break printer.connection_lost(&message)?;
            }
            Some(WsEvent::Disconnected) | None => {
                break printer.connection_lost(CONNECTION_CLOSED)?;
            }
        }
    };

    connection.disconnect();
    Ok(outcome)
}
