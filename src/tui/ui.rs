//! UI rendering for the TUI

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use super::app::App;
use super::views::{detail, tree};

/// Main draw function - orchestrates all rendering
pub fn draw(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let main_layout = Layout::vertical([
        Constraint::Length(1), // Header
        Constraint::Min(5),    // Content
        Constraint::Length(1), // Footer/status
    ])
    .split(area);

    draw_header(frame, app, main_layout[0]);

    let content = Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(main_layout[1]);
    tree::draw(frame, app, content[0]);
    detail::draw(frame, app, content[1]);

    draw_footer(frame, app, main_layout[2]);

    if app.show_help {
        draw_help_overlay(frame, area);
    }
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let model = app.model();
    let loading = if app.in_flight() > 0 {
        format!(" [loading {}]", app.in_flight())
    } else {
        String::new()
    };

    let header_text = format!(
        " Catalog Browser │ {} │ [{} nodes]{}",
        app.source,
        model.nodes.len(),
        loading
    );

    let header =
        Paragraph::new(header_text).style(Style::default().bg(Color::Blue).fg(Color::White).bold());

    frame.render_widget(header, area);
}

fn draw_footer(frame: &mut Frame, app: &App, area: Rect) {
    let keybinds = "j/k:move  l/→:expand  h/←:collapse  Enter:select  r:reload  ?:help  q:quit";

    // Errors win over keybinds until dismissed
    let footer = match &app.model().error {
        Some(error) => Paragraph::new(format!(" ✗ {}  (Esc to dismiss)", error))
            .style(Style::default().bg(Color::Red).fg(Color::White)),
        None => Paragraph::new(format!(" {}", keybinds))
            .style(Style::default().bg(Color::DarkGray).fg(Color::White)),
    };

    frame.render_widget(footer, area);
}

fn draw_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_width = 52.min(area.width.saturating_sub(4));
    let popup_height = 20.min(area.height.saturating_sub(4));

    let popup_area = Rect {
        x: (area.width - popup_width) / 2,
        y: (area.height - popup_height) / 2,
        width: popup_width,
        height: popup_height,
    };

    frame.render_widget(Clear, popup_area);

    let help_text = r#"
  Tree
  ─────────────────────────────────
  j/k, ↑/↓     Move up/down
  g/G          Jump to top/bottom
  l, →         Expand (or toggle open)
  h, ←         Collapse, or go to parent
  Enter/Space  Show details
  r            Reload roots
  Esc          Dismiss error / clear details
  q            Quit

  Markers
  ─────────────────────────────────
  ▸ closed  ▾ open  … loading  ! failed  · leaf

  Press ? or Esc to close
"#;

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(" Help ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .wrap(Wrap { trim: false })
        .style(Style::default().fg(Color::White).bg(Color::Black));

    frame.render_widget(help, popup_area);
}
