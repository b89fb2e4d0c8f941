//! Detail panel view - every field of the selected record

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::tree::render::selected_detail;
use crate::tui::app::App;

/// Draw the detail panel for the selected node
pub fn draw(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Detail ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner_area = block.inner(area);
    frame.render_widget(block, area);

    let Some(fields) = selected_detail(app.model()) else {
        let empty = Paragraph::new("Select a node to view details")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        frame.render_widget(empty, inner_area);
        return;
    };

    let mut lines: Vec<Line> = vec![];
    for field in &fields {
        let label = Span::styled(
            format!("{}: ", field.label),
            Style::default().fg(Color::Cyan).bold(),
        );
        if field.structured {
            // Nested values keep their pretty-printed layout
            lines.push(Line::from(label));
            for line in field.value.lines() {
                lines.push(Line::from(Span::styled(
                    format!("  {}", line),
                    Style::default().fg(Color::Gray),
                )));
            }
        } else {
            lines.push(Line::from(vec![
                label,
                Span::styled(field.value.clone(), Style::default().fg(Color::White)),
            ]));
        }
    }

    let detail = Paragraph::new(lines).wrap(Wrap { trim: false });
    frame.render_widget(detail, inner_area);
}
