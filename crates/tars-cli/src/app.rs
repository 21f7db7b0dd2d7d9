//! Application state.
//!
//! This module manages the TUI state and coordinates between the UI, the
//! stream reducer and the WebSocket connection. The reducer is the only
//! thing that turns server frames into transcript changes; the app decides
//! what the view does with each change.

use tokio::sync::mpsc;

use tars_core::{SessionId, StreamReducer, Transcript, TranscriptChange};

use crate::ws::{ConnectionManager, WsEvent};

/// Message shown in the error turn when the socket drops mid-reply.
pub const CONNECTION_CLOSED: &str = "connection closed";

/// A connection event tagged with the connection it came from.
#[derive(Debug)]
pub struct ConnectionEvent {
    /// Connection generation that produced the event.
    pub generation: u64,
    /// The event itself.
    pub event: WsEvent,
}

/// Application state.
pub struct App {
    /// Folds server frames into the transcript.
    reducer: StreamReducer,
    /// Connection to the backend.
    connection: ConnectionManager,
    /// Where forwarded connection events go.
    events: mpsc::Sender<ConnectionEvent>,
    /// Bumped on every (re)connect so stale events can be dropped.
    generation: u64,
    /// Current input buffer.
    pub input: String,
    /// Cursor position in input, in characters.
    pub cursor_position: usize,
    /// Chat scroll position, in lines above the newest content.
    pub chat_scroll: usize,
    /// Status message to display.
    pub status_message: Option<String>,
    /// Error message to display.
    pub error_message: Option<String>,
    /// Whether the app should quit.
    pub should_quit: bool,
    /// Whether WebSocket is connected.
    pub ws_connected: bool,
    /// Animation frame counter for loading indicators.
    pub animation_frame: usize,
}

impl App {
    /// Create a new application.
    #[must_use]
    pub fn new(connection: ConnectionManager, events: mpsc::Sender<ConnectionEvent>) -> Self {
        Self {
            reducer: StreamReducer::new(),
            connection,
            events,
            generation: 0,
            input: String::new(),
            cursor_position: 0,
            chat_scroll: 0,
            status_message: None,
            error_message: None,
            should_quit: false,
            ws_connected: false,
            animation_frame: 0,
        }
    }

    /// Tick the animation frame (call on each render).
    pub fn tick_animation(&mut self) {
        self.animation_frame = self.animation_frame.wrapping_add(1);
    }

    /// Get current spinner character for loading animation.
    #[must_use]
    pub fn spinner_char(&self) -> &'static str {
        const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
        SPINNER[self.animation_frame % SPINNER.len()]
    }

    /// The conversation so far.
    #[must_use]
    pub fn transcript(&self) -> &Transcript {
        self.reducer.transcript()
    }

    /// Backend URL for display.
    #[must_use]
    pub fn url(&self) -> &str {
        self.connection.url()
    }

    /// Session this client talks in.
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        self.connection.session_id()
    }

    /// Whether a reply is still streaming.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.reducer.has_open_turn()
    }

    /// Set the status message (also clears any error).
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.error_message = None;
    }

    /// Set the error message.
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error_message = Some(message.into());
    }

    /// Clear the error message.
    pub fn clear_error(&mut self) {
        self.error_message = None;
    }

    // =========================================================================
    // Chat Scrolling
    // =========================================================================

    /// Scroll chat up (view older messages).
    pub fn scroll_chat_up(&mut self, amount: usize) {
        self.chat_scroll = self.chat_scroll.saturating_add(amount);
    }

    /// Scroll chat down (view newer messages).
    pub fn scroll_chat_down(&mut self, amount: usize) {
        self.chat_scroll = self.chat_scroll.saturating_sub(amount);
    }

    /// Act on a reducer result. Returns whether the view changed.
    fn apply_change(&mut self, change: TranscriptChange) -> bool {
        if change.scroll_to_latest() {
            self.chat_scroll = 0;
        }
        change.is_changed()
    }

    // =========================================================================
    // Input Handling
    // =========================================================================

    fn byte_index(&self, chars: usize) -> usize {
        self.input
            .char_indices()
            .nth(chars)
            .map_or(self.input.len(), |(i, _)| i)
    }

    /// Input text left of the cursor.
    #[must_use]
    pub fn input_before_cursor(&self) -> &str {
        &self.input[..self.byte_index(self.cursor_position)]
    }

    fn input_chars(&self) -> usize {
        self.input.chars().count()
    }

    /// Insert a character at the cursor position.
    pub fn insert_char(&mut self, c: char) {
        let at = self.byte_index(self.cursor_position);
        self.input.insert(at, c);
        self.cursor_position += 1;
    }

    /// Delete the character before the cursor.
    pub fn delete_char(&mut self) {
        if self.cursor_position > 0 {
            self.cursor_position -= 1;
            let at = self.byte_index(self.cursor_position);
            self.input.remove(at);
        }
    }

    /// Delete the character at the cursor.
    pub fn delete_char_forward(&mut self) {
        if self.cursor_position < self.input_chars() {
            let at = self.byte_index(self.cursor_position);
            self.input.remove(at);
        }
    }

    /// Delete back to the previous space.
    pub fn delete_word(&mut self) {
        while self.cursor_position > 0 {
            self.delete_char();
            let before = self
                .cursor_position
                .checked_sub(1)
                .and_then(|i| self.input.chars().nth(i));
            if before == Some(' ') {
                break;
            }
        }
    }

    /// Move cursor left.
    pub fn move_cursor_left(&mut self) {
        self.cursor_position = self.cursor_position.saturating_sub(1);
    }

    /// Move cursor right.
    pub fn move_cursor_right(&mut self) {
        if self.cursor_position < self.input_chars() {
            self.cursor_position += 1;
        }
    }

    /// Move cursor to the start.
    pub fn move_cursor_start(&mut self) {
        self.cursor_position = 0;
    }

    /// Move cursor to the end.
    pub fn move_cursor_end(&mut self) {
        self.cursor_position = self.input_chars();
    }

    /// Clear the input.
    pub fn clear_input(&mut self) {
        self.input.clear();
        self.cursor_position = 0;
    }

    /// Take the current input (clears it).
    pub fn take_input(&mut self) -> String {
        let input = std::mem::take(&mut self.input);
        self.cursor_position = 0;
        input
    }

    // =========================================================================
    // Connection
    // =========================================================================

    /// Open the connection.
    pub async fn connect(&mut self) -> bool {
        self.set_status(format!("Connecting to {}...", self.connection.url()));
        let result = self.connection.connect().await;
        self.finish_connect(result)
    }

    /// Reconnect with back-off after a lost connection.
    pub async fn reconnect(&mut self) -> bool {
        self.set_status("Reconnecting...");
        let result = self.connection.reconnect().await;
        self.finish_connect(result)
    }

    fn finish_connect(
        &mut self,
        result: Result<mpsc::Receiver<WsEvent>, crate::ws::WsError>,
    ) -> bool {
        match result {
            Ok(rx) => {
                self.generation += 1;
                self.spawn_forwarder(rx);
                true
            }
            Err(e) => {
                self.ws_connected = false;
                self.set_error(e.to_string());
                false
            }
        }
    }

    /// Pipe one connection's events into the app channel.
    fn spawn_forwarder(&self, mut rx: mpsc::Receiver<WsEvent>) {
        let events = self.events.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if events.send(ConnectionEvent { generation, event }).await.is_err() {
                    break;
                }
            }
        });
    }

    /// Disconnect from the backend.
    pub fn disconnect(&mut self) {
        self.connection.disconnect();
        self.ws_connected = false;
        self.set_status("Disconnected");
    }

    // =========================================================================
    // Conversation
    // =========================================================================

    /// Submit the input line.
    ///
    /// The user turn is appended before sending; a failed send closes the
    /// exchange with a transport error turn. Reconnects first when the
    /// connection is down.
    pub async fn submit(&mut self) -> bool {
        if self.input.trim().is_empty() {
            return false;
        }
        let text = self.take_input();

        let change = self.reducer.user_message(text.clone());
        let mut changed = self.apply_change(change);

        if !self.connection.is_connected() {
            self.reconnect().await;
        }

        match self.connection.send(&text).await {
            Ok(()) => self.set_status("Waiting for TARS..."),
            Err(e) => {
                tracing::warn!(error = %e, "Send failed");
                let change = self.reducer.transport_error(e.to_string());
                changed |= self.apply_change(change);
                self.set_error(e.to_string());
            }
        }

        changed
    }

    /// Handle an event from a forwarded connection, dropping stale ones.
    ///
    /// Returns `true` if the UI should be redrawn.
    pub fn handle_connection_event(&mut self, event: ConnectionEvent) -> bool {
        if event.generation != self.generation {
            tracing::debug!(
                generation = event.generation,
                current = self.generation,
                "Dropping event from old connection"
            );
            return false;
        }
        self.handle_ws_event(event.event)
    }

    /// Handle a WebSocket event.
    ///
    /// Returns `true` if the UI should be redrawn.
    pub fn handle_ws_event(&mut self, event: WsEvent) -> bool {
        match event {
            WsEvent::Connected => {
                self.ws_connected = true;
                self.set_status("Connected");
                true
            }
            WsEvent::Frame(text) => {
                let change = self.reducer.apply_raw(&text);
                if change.is_changed() && !self.reducer.has_open_turn() {
                    self.set_status("Ready");
                }
                self.apply_change(change)
            }
            WsEvent::TransportError(message) => {
                self.ws_connected = false;
                self.connection.mark_disconnected();
                self.fail_open_turn(&message);
                self.set_error(message);
                true
            }
            WsEvent::Disconnected => {
                self.ws_connected = false;
                self.connection.mark_disconnected();
                self.fail_open_turn(CONNECTION_CLOSED);
                if self.error_message.is_none() {
                    self.set_status("Disconnected (Ctrl+R to reconnect)");
                }
                true
            }
        }
    }

    fn fail_open_turn(&mut self, message: &str) {
        if self.reducer.has_open_turn() {
            let change = self.reducer.transport_error(message);
            self.apply_change(change);
        }
    }
}
