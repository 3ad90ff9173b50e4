//! UI rendering module for Fountain Map
//!
//! This module contains all the rendering logic for the terminal user interface,
//! using the ratatui library for TUI components. The map itself is drawn by
//! [`MapView`], which is also the presenter the app renders markers into.

pub mod filter_panel;
pub mod help_overlay;
pub mod map_view;
pub mod popup;

pub use help_overlay::render as render_help_overlay;
pub use map_view::{MapView, Viewport};

use chrono::Local;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Flex, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

use crate::app::{App, AppState};
use crate::pipeline::DataOrigin;

/// Renders the UI based on the current application state
pub fn render_ui(frame: &mut Frame, app: &App<MapView>) {
    if app.dataset().is_none() {
        match app.notice() {
            Some(notice) => render_failure(frame, notice),
            None => render_loading(frame, &app.state),
        }
    } else {
        render_main(frame, app);
    }

    if app.show_help {
        render_help_overlay(frame);
    }
}

/// Area of at most `width` x `height` centered in `area`
pub(crate) fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    let [cell] = Layout::horizontal([Constraint::Length(width)])
        .flex(Flex::Center)
        .areas(row);
    cell
}

/// Renders a loading message while data is being fetched
fn render_loading(frame: &mut Frame, state: &AppState) {
    let message = match state {
        AppState::Fetching => "Fetching water sources...",
        _ => "Loading water sources...",
    };
    let area = centered_rect(40, 3, frame.area());
    let loading_text = Paragraph::new(message)
        .style(Style::default().fg(Color::Cyan))
        .alignment(Alignment::Center);

    frame.render_widget(loading_text, area);
}

/// Renders the notice shown when the first load failed
fn render_failure(frame: &mut Frame, notice: &str) {
    let area = centered_rect(70, 10, frame.area());
    let lines = vec![
        Line::from(Span::styled(notice.to_string(), Style::default().fg(Color::Red))),
        Line::from(""),
        Line::from(Span::styled(
            "Press r to retry, q to quit",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });

    frame.render_widget(paragraph, area);
}

fn render_main(frame: &mut Frame, app: &App<MapView>) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(10), Constraint::Length(1)])
        .split(frame.area());

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(rows[0]);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(9), Constraint::Length(10)])
        .split(columns[1]);

    map_view::render(frame, columns[0], app.presenter(), app.selected(), app.zoom);
    filter_panel::render(frame, side[0], app);
    popup::render(frame, side[1], app.selected());
    render_status_bar(frame, rows[1], app);
}

/// Renders the one-line status bar
fn render_status_bar(frame: &mut Frame, area: Rect, app: &App<MapView>) {
    let mut spans = Vec::new();

    if let Some(dataset) = app.dataset() {
        let origin = match dataset.origin {
            DataOrigin::Cache => "cache",
            DataOrigin::Primary => "live",
            DataOrigin::Fallback => "fallback",
        };
        spans.push(Span::raw(format!(
            " {} of {} sources | {} ({}) ",
            app.visible().len(),
            dataset.len(),
            origin,
            dataset.loaded_at.with_timezone(&Local).format("%H:%M"),
        )));
    }

    match &app.state {
        AppState::Failed(notice) => {
            spans.push(Span::styled(
                format!("| {} ", notice),
                Style::default().fg(Color::Red),
            ));
        }
        AppState::Loading | AppState::Fetching => {
            spans.push(Span::styled("| Refreshing... ", Style::default().fg(Color::Yellow)));
        }
        _ => {}
    }

    spans.push(Span::styled(
        "| ? help  q quit",
        Style::default().fg(Color::DarkGray),
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataSource, SourceFetcher};
    use crate::pipeline::Loader;
    use crate::refresh::RefreshMessage;
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::Arc;

    fn app(primary: DataSource, fallback: DataSource) -> App<MapView> {
        let loader = Loader::new(None, SourceFetcher::new(primary, fallback));
        App::new(Arc::new(loader), MapView::new())
    }

    fn draw(app: &App<MapView>) -> String {
        let backend = TestBackend::new(100, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| render_ui(frame, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_centered_rect_centers_and_clamps() {
        let area = Rect::new(0, 0, 100, 30);
        assert_eq!(centered_rect(40, 10, area), Rect::new(30, 10, 40, 10));

        let small = Rect::new(0, 0, 20, 5);
        let clamped = centered_rect(40, 10, small);
        assert!(clamped.width <= small.width);
        assert!(clamped.height <= small.height);
    }

    #[test]
    fn test_loading_screen_before_first_load() {
        let app = app(DataSource::Bundled, DataSource::Bundled);
        assert!(draw(&app).contains("Loading water sources"));
    }

    #[tokio::test]
    async fn test_main_screen_after_load() {
        let mut app = app(DataSource::Bundled, DataSource::Bundled);
        app.load().await;

        let content = draw(&app);

        assert!(content.contains("Map ("));
        assert!(content.contains("Districts"));
        assert!(content.contains("Details"));
        assert!(content.contains("10 of 10 sources"));
        assert!(content.contains("live"));
    }

    #[tokio::test]
    async fn test_failure_screen_without_data() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = DataSource::File(dir.path().join("missing.json"));
        let mut app = app(missing.clone(), missing);
        app.load().await;

        let content = draw(&app);

        assert!(content.contains("Could not load water sources"));
        assert!(content.contains("Press r to retry"));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_map_and_shows_notice() {
        let mut app = app(DataSource::Bundled, DataSource::Bundled);
        app.load().await;
        app.handle_refresh_message(RefreshMessage::Failed("offline".to_string()));

        let content = draw(&app);

        assert!(content.contains("Map ("));
        assert!(content.contains("| offline"));
    }

    #[tokio::test]
    async fn test_help_overlay_drawn_on_top() {
        let mut app = app(DataSource::Bundled, DataSource::Bundled);
        app.load().await;
        app.show_help = true;

        assert!(draw(&app).contains("Keyboard Shortcuts"));
    }
}
