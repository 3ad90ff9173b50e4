//! Key binding reference drawn over the map

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use super::centered_rect;

/// Key bindings grouped by the part of the screen they act on
const KEY_SECTIONS: &[(&str, &[(&str, &str)])] = &[
    (
        "Map",
        &[
            ("↑/k, ↓/j", "Select previous/next source"),
            ("+, -", "Zoom in/out around selection"),
            ("Tab", "Cycle focus: map, districts, types"),
        ],
    ),
    (
        "Filters",
        &[
            ("Space", "Toggle option under cursor"),
            ("o", "Toggle operational only"),
            ("Enter/a", "Apply filters"),
            ("x", "Reset filters"),
        ],
    ),
    (
        "Other",
        &[
            ("r", "Refresh data (skip cache)"),
            ("?", "Toggle this help"),
            ("Esc", "Back to map / Quit"),
            ("q", "Quit application"),
        ],
    ),
];

const WIDTH: u16 = 50;

/// Renders the help overlay on top of the current view
pub fn render(frame: &mut Frame) {
    let lines = lines();
    // Content plus the two border rows
    let height = lines.len() as u16 + 2;
    let area = centered_rect(WIDTH, height, frame.area());

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn lines() -> Vec<Line<'static>> {
    let heading = Style::default().add_modifier(Modifier::BOLD);
    let key_style = Style::default().fg(Color::Yellow);

    let mut lines = vec![Line::styled("Keyboard Shortcuts", heading.fg(Color::Cyan))];
    for (title, bindings) in KEY_SECTIONS {
        lines.push(Line::default());
        lines.push(Line::styled(*title, heading));
        lines.extend(bindings.iter().map(|(keys, action)| {
            Line::from(vec![
                Span::styled(format!("  {:<12}", keys), key_style),
                Span::raw(*action),
            ])
        }));
    }
    lines.push(Line::default());
    lines.push(Line::styled(
        "Press Esc or ? to close",
        Style::default().fg(Color::DarkGray),
    ));
    lines
}
