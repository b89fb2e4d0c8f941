//! Tree view - indented list of the visible part of the forest

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};

use crate::tree::model::{NodeState, RootsState};
use crate::tree::render::{roots_message, row_index, visible_rows, Affordance};
use crate::tui::app::App;

/// Draw the tree panel
pub fn draw(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Catalog ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));

    let model = app.model();

    if let Some(message) = roots_message(model) {
        let color = match model.roots_state {
            RootsState::Failed(_) => Color::Red,
            RootsState::Empty => Color::Yellow,
            _ => Color::DarkGray,
        };
        let paragraph = Paragraph::new(message)
            .block(block)
            .style(Style::default().fg(color))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
        return;
    }

    let rows = visible_rows(model);
    let items: Vec<ListItem> = rows
        .iter()
        .map(|row| {
            let mut spans = vec![
                Span::raw("  ".repeat(row.depth)),
                Span::styled(
                    format!("{} ", row.affordance.marker()),
                    affordance_style(row.affordance),
                ),
            ];

            let label_style = if row.selected {
                Style::default().fg(Color::Cyan).bold()
            } else {
                Style::default().fg(Color::White)
            };
            spans.push(Span::styled(row.label.clone(), label_style));

            if let Some(NodeState::Failed(e)) = model.node(row.key).map(|n| &n.state) {
                spans.push(Span::styled(
                    format!("  {}", e),
                    Style::default().fg(Color::Red),
                ));
            }

            ListItem::new(Line::from(spans))
        })
        .collect();

    let mut state = ListState::default();
    state.select(model.cursor.and_then(|key| row_index(&rows, key)));

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray));

    frame.render_stateful_widget(list, area, &mut state);
}

fn affordance_style(affordance: Affordance) -> Style {
    match affordance {
        Affordance::Leaf => Style::default().fg(Color::DarkGray),
        Affordance::Collapsed => Style::default().fg(Color::Green),
        Affordance::Open => Style::default().fg(Color::Green).bold(),
        Affordance::Loading => Style::default().fg(Color::Yellow),
        Affordance::Failed => Style::default().fg(Color::Red).bold(),
    }
}
