//! Core types and the streaming reduction protocol for TARS.
//!
//! This crate turns the stream of typed server frames produced by a
//! model-serving backend into an ordered transcript of conversation turns:
//!
//! - **Identifiers**: the opaque [`SessionId`] carried on every outbound send
//! - **Wire frames**: [`ClientFrame`] and [`ServerFrame`] as serialized on the socket
//! - **Classifier**: [`classify`] parses a raw frame into a typed [`Event`]
//! - **Formatter**: [`format_chunk`] maps an event to its display fragment
//! - **Transcript**: the append-only [`Transcript`] of [`Turn`]s
//! - **Reducer**: [`StreamReducer`] folds events into the transcript in arrival order
//!
//! # Example
//!
//! ```
//! use tars_core::{StreamReducer, ServerFrame};
//!
//! let mut reducer = StreamReducer::new();
//! reducer.user_message("hi");
//!
//! for frame in [
//!     ServerFrame::ack("thinking"),
//!     ServerFrame::final_response("Paris"),
//!     ServerFrame::done(),
//! ] {
//!     let raw = serde_json::to_string(&frame).unwrap();
//!     reducer.apply_raw(&raw);
//! }
//!
//! let turn = reducer.transcript().last().unwrap();
//! assert_eq!(turn.reply_text, "[ACK] thinking [/ACK]Paris");
//! assert!(turn.is_complete());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod event;
pub mod format;
pub mod ids;
pub mod protocol;
pub mod reducer;
pub mod transcript;

pub use error::{CoreError, Result};
pub use event::{classify, classify_value, Event, EventKind, DONE_SENTINEL};
pub use format::format_chunk;
pub use ids::{IdError, SessionId};
pub use protocol::{ClientFrame, ServerFrame};
pub use reducer::StreamReducer;
pub use transcript::{Transcript, TranscriptChange, Turn, TurnStatus};
