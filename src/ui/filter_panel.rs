//! Filter panel rendering
//!
//! Shows the district and type options with checkboxes from the draft
//! criteria, the operational-only toggle, and whether the draft differs from
//! what is currently applied.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use std::collections::BTreeSet;

use crate::app::{App, Focus};
use crate::presenter::Presenter;

/// Renders the filter panel into `area`
pub fn render<P: Presenter>(frame: &mut Frame, area: Rect, app: &App<P>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(50),
            Constraint::Percentage(50),
            Constraint::Length(3),
        ])
        .split(area);

    render_options(
        frame,
        chunks[0],
        " Districts ",
        app.district_options(),
        &app.draft.districts,
        app.district_cursor,
        app.focus == Focus::Districts,
    );
    render_options(
        frame,
        chunks[1],
        " Types ",
        app.type_options(),
        &app.draft.types,
        app.type_cursor,
        app.focus == Focus::Types,
    );
    render_toggles(frame, chunks[2], app);
}

/// Renders one multi-select option list
fn render_options(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    options: &[String],
    selected: &BTreeSet<String>,
    cursor: usize,
    focused: bool,
) {
    let border = if focused { Color::Yellow } else { Color::DarkGray };
    let block = Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border));

    // Keep the cursor row in view
    let rows = area.height.saturating_sub(2) as usize;
    let skip = if rows > 0 && cursor >= rows {
        cursor + 1 - rows
    } else {
        0
    };

    let lines: Vec<Line> = if options.is_empty() {
        vec![Line::from(Span::styled(
            "(none)",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        options
            .iter()
            .enumerate()
            .skip(skip)
            .map(|(i, option)| {
                let mark = if selected.contains(option) { "[x]" } else { "[ ]" };
                let style = if focused && i == cursor {
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                Line::from(Span::styled(format!("{} {}", mark, option), style))
            })
            .collect()
    };

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Renders the operational toggle and the pending-changes hint
fn render_toggles<P: Presenter>(frame: &mut Frame, area: Rect, app: &App<P>) {
    let mark = if app.draft.operational_only { "[x]" } else { "[ ]" };
    let mut spans = vec![Span::raw(format!("{} Operational only", mark))];
    if &app.draft != app.criteria() {
        spans.push(Span::styled(
            "  (Enter to apply)",
            Style::default().fg(Color::Yellow),
        ));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}
