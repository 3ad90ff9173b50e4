//! Popup for the selected marker

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use super::map_view::marker_color;
use crate::presenter::Marker;

/// Renders the popup for `marker`, or a placeholder when nothing is selected
pub fn render(frame: &mut Frame, area: Rect, marker: Option<&Marker>) {
    let block = Block::default()
        .title(" Details ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let Some(marker) = marker else {
        let empty = Paragraph::new(Line::from(Span::styled(
            "No source selected",
            Style::default().fg(Color::DarkGray),
        )))
        .block(block);
        frame.render_widget(empty, area);
        return;
    };

    let popup = &marker.popup;
    let mut lines = vec![Line::from(Span::styled(
        popup.title.clone(),
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    ))];

    for row in &popup.rows {
        let value_style = if row.label == "Status" {
            Style::default().fg(marker_color(marker.color))
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{:<10}", row.label), Style::default().fg(Color::Gray)),
            Span::styled(row.value.clone(), value_style),
        ]));
    }

    lines.push(Line::from(Span::styled(
        format!("{:.5}, {:.5}", marker.latitude, marker.longitude),
        Style::default().fg(Color::DarkGray),
    )));

    if let Some(ref image) = popup.image {
        lines.push(Line::from(vec![
            Span::styled(format!("{:<10}", "Image"), Style::default().fg(Color::Gray)),
            Span::styled(image.clone(), Style::default().fg(Color::Blue)),
        ]));
    }

    if let Some(ref description) = popup.description {
        lines.push(Line::from(""));
        lines.push(Line::from(description.clone()));
    }

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}
