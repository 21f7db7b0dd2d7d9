//! Display fragments for classified events.

use crate::event::EventKind;

/// Map an event to the text appended to (or replacing) a reply.
///
/// | kind | output |
/// |---|---|
/// | ack | `[ACK] {payload} [/ACK]` |
/// | route_decision | `[ROUTER] {payload} [/ROUTER]\n\n` |
/// | final_response | `{payload}` |
/// | error | `⚠️ ERROR: {payload}\n` |
///
/// Unrecognized kinds return the payload unchanged. The `[DONE]` sentinel is
/// never passed here; the reducer intercepts it first.
#[must_use]
pub fn format_chunk(kind: &EventKind, payload: &str) -> String {
    match kind {
        EventKind::Ack => format!("[ACK] {payload} [/ACK]"),
        EventKind::RouteDecision => format!("[ROUTER] {payload} [/ROUTER]\n\n"),
        EventKind::FinalResponse | EventKind::Other(_) => payload.to_string(),
        EventKind::Error => format!("⚠️ ERROR: {payload}\n"),
    }
}
