//! UI rendering with ratatui.
//!
//! A single chat column: header bar, transcript, input line and status bar.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style, Stylize};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{
    Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap,
};
use ratatui::Frame;

use tars_core::{Turn, TurnStatus};

use crate::app::App;

/// Horizontal padding for chat content.
const CHAT_PADDING: u16 = 2;

/// Render the UI.
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header bar
            Constraint::Min(5),    // Chat
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    render_header_bar(frame, app, main_layout[0]);
    render_chat_column(frame, app, main_layout[1]);
    render_status_bar(frame, app, main_layout[2]);
}

/// Truncate a string in the middle with ellipsis if it exceeds `max_len` chars.
fn truncate_middle(s: &str, max_len: usize) -> String {
    let len = s.chars().count();
    if len <= max_len {
        return s.to_string();
    }
    if max_len < 5 {
        return s.chars().take(max_len).collect();
    }
    let keep = (max_len - 3) / 2;
    let start: String = s.chars().take(keep).collect();
    let end: String = s.chars().skip(len - keep).collect();
    format!("{start}...{end}")
}

/// Render the header bar with title, backend URL and connection state.
fn render_header_bar(frame: &mut Frame, app: &App, area: Rect) {
    let (status_text, status_style) = if app.ws_connected {
        ("connected", Style::default().fg(Color::Green))
    } else {
        ("disconnected", Style::default().fg(Color::Red))
    };

    let title = "TARS";
    let max_url_width = (area.width as usize / 2).saturating_sub(15);
    let display_url = truncate_middle(app.url(), max_url_width);
    let right_width = display_url.chars().count() + status_text.len() + 3;
    let padding = (area.width as usize).saturating_sub(title.len() + right_width);

    let line = Line::from(vec![
        Span::styled(title, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw(" ".repeat(padding)),
        Span::raw(display_url),
        Span::raw(" ["),
        Span::styled(status_text, status_style),
        Span::raw("]"),
    ]);

    let header = Paragraph::new(line).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

/// Build the display lines for one turn.
fn turn_lines<'a>(turn: &'a Turn, spinner: &'static str) -> Vec<Line<'a>> {
    let mut lines = Vec::new();

    if let Some(user_text) = &turn.user_text {
        lines.push(Line::from(vec![
            Span::styled("User: ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::styled(user_text.as_str(), Style::default().fg(Color::White)),
        ]));
    }

    let label_style = match turn.status {
        TurnStatus::Failed => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        _ => Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
    };
    let body_style = match turn.status {
        TurnStatus::Failed => Style::default().fg(Color::Red),
        _ => Style::default().fg(Color::White),
    };

    let mut label = vec![Span::styled("TARS:", label_style)];
    if !turn.is_complete() {
        label.push(Span::raw(" "));
        label.push(Span::styled(spinner, Style::default().fg(Color::Yellow)));
    }
    lines.push(Line::from(label));

    if turn.reply_text.is_empty() && !turn.is_complete() {
        lines.push(Line::from(Span::styled(
            "thinking...",
            Style::default().fg(Color::DarkGray),
        )));
    } else {
        lines.extend(
            turn.reply_text
                .lines()
                .map(|l| Line::from(Span::styled(l, body_style))),
        );
    }

    lines.push(Line::from(""));
    lines
}

/// Render the chat column: transcript above, input below.
fn render_chat_column(frame: &mut Frame, app: &App, area: Rect) {
    let title = format!(" Session {} ", app.session_id());
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner_area = block.inner(area);
    frame.render_widget(block, area);

    let inner_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),    // Chat messages
            Constraint::Length(1), // Separator line
            Constraint::Length(1), // Input line
        ])
        .split(inner_area);

    let chat_area_full = inner_layout[0];
    let separator_area = inner_layout[1];
    let input_area = inner_layout[2];

    let chat_area = Rect::new(
        chat_area_full.x + CHAT_PADDING,
        chat_area_full.y,
        chat_area_full.width.saturating_sub(CHAT_PADDING * 2 + 1), // +1 for scrollbar
        chat_area_full.height,
    );

    let transcript = app.transcript();
    if transcript.is_empty() {
        let help = if app.ws_connected {
            "Type a message and press Enter to send"
        } else {
            "Not connected. Press Ctrl+R to reconnect"
        };
        let text = Paragraph::new(help)
            .style(Style::default().fg(Color::DarkGray))
            .wrap(Wrap { trim: true });
        frame.render_widget(text, chat_area);
    } else {
        let spinner = app.spinner_char();
        let lines: Vec<Line> = transcript
            .snapshot()
            .iter()
            .flat_map(|turn| turn_lines(turn, spinner))
            .collect();

        let text = Text::from(lines);
        let visible_lines = chat_area.height as usize;
        let total_wrapped_lines = calculate_wrapped_line_count(&text, chat_area.width as usize);

        // chat_scroll counts lines up from the bottom; Paragraph wants lines down from the top.
        let max_scroll = total_wrapped_lines.saturating_sub(visible_lines);
        let effective_scroll = app.chat_scroll.min(max_scroll);
        let scroll_offset = max_scroll.saturating_sub(effective_scroll);

        let paragraph = Paragraph::new(text)
            .wrap(Wrap { trim: false })
            .scroll((u16::try_from(scroll_offset).unwrap_or(u16::MAX), 0));
        frame.render_widget(paragraph, chat_area);

        if total_wrapped_lines > visible_lines {
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("▲"))
                .end_symbol(Some("▼"));
            let mut scrollbar_state = ScrollbarState::new(total_wrapped_lines)
                .position(scroll_offset)
                .viewport_content_length(visible_lines);
            frame.render_stateful_widget(scrollbar, chat_area_full, &mut scrollbar_state);
        }
    }

    render_input_line(frame, app, separator_area, input_area);
}

/// Render the input line at the bottom of the chat column.
fn render_input_line(frame: &mut Frame, app: &App, separator_area: Rect, input_area: Rect) {
    let separator = Paragraph::new("─".repeat(separator_area.width as usize))
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(separator, separator_area);

    let prompt = "> ";
    let input_line = Line::from(vec![
        Span::styled(prompt, Style::default().fg(Color::Cyan)),
        Span::styled(app.input.as_str(), Style::default().fg(Color::White)),
    ]);
    frame.render_widget(Paragraph::new(input_line), input_area);

    // Hidden while streaming to prevent flicker.
    if !app.is_streaming() {
        let offset = prompt.len() + Span::raw(app.input_before_cursor()).width();
        frame.set_cursor_position((
            input_area.x + u16::try_from(offset).unwrap_or(u16::MAX),
            input_area.y,
        ));
    }
}

/// Render the status bar.
fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let status = if let Some(error) = &app.error_message {
        Line::from(vec![
            Span::styled(" ERROR: ", Style::default().fg(Color::Red).bold()),
            Span::styled(error.as_str(), Style::default().fg(Color::Red)),
        ])
    } else if let Some(status) = &app.status_message {
        Line::from(Span::styled(
            format!(" {status}"),
            Style::default().fg(Color::Green),
        ))
    } else {
        Line::from(vec![
            Span::raw(" "),
            Span::styled("Enter", Style::default().fg(Color::Yellow)),
            Span::raw(":send "),
            Span::styled("PgUp/PgDn", Style::default().fg(Color::Yellow)),
            Span::raw(":scroll "),
            Span::styled("Ctrl+R", Style::default().fg(Color::Yellow)),
            Span::raw(":reconnect "),
            Span::styled("Esc", Style::default().fg(Color::Yellow)),
            Span::raw(":quit"),
        ])
    };

    let status_bar = Paragraph::new(status).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(status_bar, area);
}

/// Calculate the number of visual lines after text wrapping.
fn calculate_wrapped_line_count(text: &Text, available_width: usize) -> usize {
    if available_width == 0 {
        return text.lines.len();
    }

    text.lines
        .iter()
        .map(|line| line.width().div_ceil(available_width).max(1))
        .sum()
}

#[cfg(test)]
mod tests {
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use tokio::sync::mpsc;

    use tars_core::SessionId;

    use super::*;
    use crate::ws::{ConnectionManager, WsEvent};

    fn app() -> App {
        let (tx, _rx) = mpsc::channel(8);
        let connection =
            ConnectionManager::new("ws://localhost:8000/ws/agent", SessionId::from(9), 1);
        App::new(connection, tx)
    }

    fn frame(kind: &str, message: &str) -> WsEvent {
        WsEvent::Frame(serde_json::json!({ "type": kind, "message": message }).to_string())
    }

    fn draw(app: &App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| render(f, app)).unwrap();
        let buffer = terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    #[test]
    fn truncate_middle_keeps_ends() {
        assert_eq!(truncate_middle("short", 10), "short");
        assert_eq!(truncate_middle("abcdefghijklmnop", 9), "abc...nop");
        assert_eq!(truncate_middle("abcdef", 3), "abc");
    }

    #[test]
    fn wrapped_line_count_rounds_up() {
        let text = Text::from(vec![Line::from("abcdefghij"), Line::from("")]);
        assert_eq!(calculate_wrapped_line_count(&text, 4), 4);
        assert_eq!(calculate_wrapped_line_count(&text, 0), 2);
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    #[test]
    fn empty_transcript_shows_hint() {
        let screen = draw(&app(), 60, 12);
        assert!(screen.contains("TARS"));
        assert!(screen.contains("Session 9"));
        assert!(screen.contains("disconnected"));
        assert!(screen.contains("Ctrl+R to reconnect"));
    }

    #[test]
    fn transcript_renders_turns() {
        let mut app = app();
        app.handle_ws_event(WsEvent::Connected);
        app.handle_ws_event(frame("ack", "hmm"));
        app.handle_ws_event(frame("final_response", "Paris"));
        app.handle_ws_event(frame("final_response", "[DONE]"));

        let screen = draw(&app, 70, 14);
        assert!(screen.contains("TARS:"));
        assert!(screen.contains("[ACK] hmm [/ACK]Paris"));
        assert!(screen.contains("[connected]"));
    }

    #[test]
    fn open_turn_shows_route_fragment() {
        let mut app = app();
        app.handle_ws_event(frame("route_decision", "checking"));
        let screen = draw(&app, 70, 14);
        assert!(screen.contains("[ROUTER] checking [/ROUTER]"));
    }

    #[test]
    fn failed_turn_shows_error_text() {
        let mut app = app();
        app.handle_ws_event(frame("ack", "x"));
        app.handle_ws_event(frame("error", "model down"));

        let screen = draw(&app, 70, 14);
        assert!(screen.contains("ERROR: model down"));
    }

    #[test]
    fn closed_turns_have_no_spinner() {
        let mut app = app();
        app.handle_ws_event(frame("error", "boom"));
        app.handle_ws_event(frame("ack", "x"));
        app.handle_ws_event(frame("error", "again"));
        assert!(!app.is_streaming());

        let screen = draw(&app, 70, 20);
        assert!(screen.contains("ERROR: again"));
        assert!(!screen.contains("thinking..."));
        assert!(!screen.contains(app.spinner_char()));
    }

    #[test]
    fn open_turn_shows_spinner() {
        let mut app = app();
        app.handle_ws_event(frame("ack", "x"));
        let screen = draw(&app, 70, 14);
        assert!(screen.contains(app.spinner_char()));
    }

    #[test]
    fn input_is_drawn_after_prompt() {
        let mut app = app();
        for c in "hi there".chars() {
            app.insert_char(c);
        }
        let screen = draw(&app, 60, 12);
        assert!(screen.contains("> hi there"));
    }
}
