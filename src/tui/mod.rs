//! Terminal browser for the catalog tree
//!
//! Browses the catalog through a running relay, one level at a time.
//! Features:
//! - Vim-style navigation over the visible rows
//! - Lazy expansion with a loading marker per node
//! - Detail panel for the selected record
//! - Fetches run off the UI thread so the tree stays responsive

pub mod app;
pub mod events;
pub mod ui;
pub mod views;

use std::io;
use std::time::{Duration, Instant};

use crossterm::{
    event::{poll, read, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;

use crate::tree::Msg;
pub use app::{App, SharedFetcher};
use events::handle_event;

/// Run the TUI application
pub fn run(mut app: App) -> Result<(), Box<dyn std::error::Error>> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app, ensuring cleanup happens even on error
    let result = run_event_loop(&mut terminal, &mut app);

    // Restore terminal - this MUST run even if app fails
    let _ = disable_raw_mode();
    let _ = execute!(terminal.backend_mut(), LeaveAlternateScreen);
    let _ = terminal.show_cursor();

    result
}

fn run_event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<(), Box<dyn std::error::Error>> {
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    app.dispatch(Msg::LoadRoots);

    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if poll(timeout)? {
            if let Event::Key(key) = read()? {
                if handle_event(app, key) {
                    return Ok(()); // Quit signal
                }
            }
        }

        // Apply finished fetches (non-blocking)
        app.poll_results();

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }
    }
}
