//! TARS CLI - Terminal chat client for the TARS backend.
//!
//! This is the entry point for the `tars` binary.

mod app;
mod headless;
mod ui;
mod ws;

use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Duration;

use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc;

use tars_core::SessionId;

use app::{App, ConnectionEvent};
use ws::ConnectionManager;

/// TARS CLI - Terminal chat client for the TARS backend.
#[derive(Parser, Debug)]
#[command(name = "tars")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// WebSocket URL of the chat endpoint.
    #[arg(long, env = "TARS_URL", default_value = "ws://localhost:8000/ws/agent")]
    url: String,

    /// Session to talk in (a fresh one is generated if omitted).
    #[arg(long, env = "TARS_SESSION")]
    session: Option<SessionId>,

    /// Send one prompt, print the reply and exit.
    #[arg(long)]
    prompt: Option<String>,

    /// Connection attempts before giving up on a reconnect.
    #[arg(long, default_value_t = 3)]
    reconnect_attempts: u32,

    /// Enable debug logging.
    #[arg(long, default_value = "false")]
    debug: bool,

    /// Log file used with --debug.
    #[arg(long, default_value = "tars.log")]
    log_file: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    // Logs go to a file so they do not tear up the terminal UI.
    if args.debug {
        let file = File::create(&args.log_file)?;
        tracing_subscriber::fmt()
            .with_env_filter("tars_cli=debug,tars_core=debug,warn")
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init();
    }

    let session_id = args.session.unwrap_or_else(SessionId::generate);
    tracing::info!(url = %args.url, session_id = %session_id, "Starting client");
    let connection = ConnectionManager::new(&args.url, session_id, args.reconnect_attempts);

    if let Some(prompt) = args.prompt {
        let outcome = headless::run(connection, &prompt, io::stdout()).await?;
        if let headless::Outcome::Failed(message) = &outcome {
            tracing::warn!(error = %message, "Prompt failed");
        }
        return Ok(if outcome.is_success() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    let (events_tx, events_rx) = mpsc::channel::<ConnectionEvent>(128);
    let mut app = App::new(connection, events_tx);
    app.connect().await;

    // Setup terminal with mouse capture enabled
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_event_loop(&mut terminal, &mut app, events_rx).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result.map(|()| ExitCode::SUCCESS)
}

/// Main event loop.
///
/// Redraws immediately on every connection event so streaming feels live.
async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    mut events_rx: mpsc::Receiver<ConnectionEvent>,
) -> anyhow::Result<()> {
    loop {
        app.tick_animation();
        terminal.draw(|f| ui::render(f, app))?;

        let tick_rate = if app.is_streaming() {
            Duration::from_millis(80)
        } else {
            Duration::from_millis(100)
        };

        tokio::select! {
            () = tokio::time::sleep(tick_rate) => {
                while event::poll(Duration::from_millis(0)).unwrap_or(false) {
                    if let Ok(evt) = event::read() {
                        handle_input(app, evt).await;
                    }
                }
            }

            Some(event) = events_rx.recv() => {
                if app.handle_connection_event(event) {
                    terminal.draw(|f| ui::render(f, app))?;
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    app.disconnect();
    Ok(())
}

/// Handle terminal input events.
async fn handle_input(app: &mut App, event: Event) {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(app, key).await,
        Event::Mouse(mouse) => match mouse.kind {
            MouseEventKind::ScrollUp => app.scroll_chat_up(3),
            MouseEventKind::ScrollDown => app.scroll_chat_down(3),
            _ => {}
        },
        _ => {}
    }
}

async fn handle_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Char('c') if ctrl => app.should_quit = true,
        KeyCode::Char('r') if ctrl => {
            app.reconnect().await;
        }
        KeyCode::Char('w') if ctrl => app.delete_word(),
        KeyCode::Char('u') if ctrl => app.clear_input(),
        KeyCode::Char('a') if ctrl => app.move_cursor_start(),
        KeyCode::Char('e') if ctrl => app.move_cursor_end(),
        KeyCode::Esc => {
            if app.error_message.is_some() {
                app.clear_error();
            } else {
                app.should_quit = true;
            }
        }
        KeyCode::Enter => {
            app.submit().await;
        }
        KeyCode::Char(c) => app.insert_char(c),
        KeyCode::Backspace => app.delete_char(),
        KeyCode::Delete => app.delete_char_forward(),
        KeyCode::Left => app.move_cursor_left(),
        KeyCode::Right => app.move_cursor_right(),
        KeyCode::Home => app.move_cursor_start(),
        KeyCode::End => app.move_cursor_end(),
        KeyCode::PageUp => app.scroll_chat_up(10),
        KeyCode::PageDown => app.scroll_chat_down(10),
        KeyCode::Up => app.scroll_chat_up(1),
        KeyCode::Down => app.scroll_chat_down(1),
        _ => {}
    }
}
