//! Terminal map surface
//!
//! [`MapView`] is the [`Presenter`] used by the interactive UI. It keeps the
//! markers it was handed and draws them on a ratatui canvas, longitude on the
//! x axis and latitude on the y axis, inside a viewport fitted to the markers.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    text::Line as TextLine,
    widgets::{
        canvas::{Canvas, Circle, Points},
        Block, Borders,
    },
    Frame,
};

use tracing::debug;

use crate::presenter::{Marker, MarkerColor, MarkerHandle, Presenter};

/// Smallest span in degrees, so a single marker still gets an area
const MIN_SPAN: f64 = 0.005;

/// Margin added on each side of the fitted bounds, as a share of the span
const PADDING: f64 = 0.1;

/// Presenter that keeps markers for the terminal canvas
#[derive(Debug, Default)]
pub struct MapView {
    entries: Vec<(MarkerHandle, Marker)>,
    next_handle: usize,
}

impl MapView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Markers currently on the map, in render order
    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.entries.iter().map(|(_, marker)| marker)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Presenter for MapView {
    fn render_markers(&mut self, markers: &[Marker]) -> Vec<MarkerHandle> {
        markers
            .iter()
            .map(|marker| {
                let handle = MarkerHandle(self.next_handle);
                self.next_handle += 1;
                self.entries.push((handle, marker.clone()));
                handle
            })
            .collect()
    }

    fn clear_markers(&mut self, handles: &[MarkerHandle]) {
        self.entries.retain(|(handle, _)| !handles.contains(handle));
    }

    /// The status bar draws notices from the app state; markers stay as they are
    fn show_notice(&mut self, notice: &str) {
        debug!(notice, "Notice raised on map view");
    }
}

/// Visible region of the map in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Longitude bounds
    pub x: [f64; 2],
    /// Latitude bounds
    pub y: [f64; 2],
}

impl Viewport {
    /// Fits the viewport around `markers`
    ///
    /// At zoom 0 every marker is inside. Each zoom step halves the span and
    /// centers on `focus` when given.
    pub fn fit<'a>(
        markers: impl IntoIterator<Item = &'a Marker>,
        zoom: u8,
        focus: Option<&Marker>,
    ) -> Self {
        let mut bounds: Option<([f64; 2], [f64; 2])> = None;
        for marker in markers {
            let (x, y) = bounds.get_or_insert((
                [marker.longitude, marker.longitude],
                [marker.latitude, marker.latitude],
            ));
            x[0] = x[0].min(marker.longitude);
            x[1] = x[1].max(marker.longitude);
            y[0] = y[0].min(marker.latitude);
            y[1] = y[1].max(marker.latitude);
        }

        let Some((x, y)) = bounds else {
            return Self {
                x: [-180.0, 180.0],
                y: [-90.0, 90.0],
            };
        };

        let scale = (1.0 + 2.0 * PADDING) / f64::from(1u32 << zoom);
        let span_x = (x[1] - x[0]).max(MIN_SPAN) * scale;
        let span_y = (y[1] - y[0]).max(MIN_SPAN) * scale;

        let (center_x, center_y) = match focus {
            Some(marker) if zoom > 0 => (marker.longitude, marker.latitude),
            _ => ((x[0] + x[1]) / 2.0, (y[0] + y[1]) / 2.0),
        };

        Self {
            x: [center_x - span_x / 2.0, center_x + span_x / 2.0],
            y: [center_y - span_y / 2.0, center_y + span_y / 2.0],
        }
    }

    /// Whether a marker falls inside the viewport
    pub fn contains(&self, marker: &Marker) -> bool {
        (self.x[0]..=self.x[1]).contains(&marker.longitude)
            && (self.y[0]..=self.y[1]).contains(&marker.latitude)
    }
}

/// Terminal color for a marker
pub fn marker_color(color: MarkerColor) -> Color {
    match color {
        MarkerColor::Green => Color::Green,
        MarkerColor::Red => Color::Red,
        MarkerColor::Gray => Color::Gray,
    }
}

/// Draws the map canvas
pub fn render(frame: &mut Frame, area: Rect, view: &MapView, selected: Option<&Marker>, zoom: u8) {
    let viewport = Viewport::fit(view.markers(), zoom, selected);

    let title = format!(" Map ({} sources, zoom {}) ", view.len(), zoom);
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let groups: Vec<(Color, Vec<(f64, f64)>)> =
        [MarkerColor::Gray, MarkerColor::Red, MarkerColor::Green]
            .into_iter()
            .map(|color| {
                let coords = view
                    .markers()
                    .filter(|m| m.color == color)
                    .map(|m| (m.longitude, m.latitude))
                    .collect();
                (marker_color(color), coords)
            })
            .collect();

    let ring = (viewport.x[1] - viewport.x[0]) * 0.02;

    let canvas = Canvas::default()
        .block(block)
        .marker(symbols::Marker::Braille)
        .x_bounds(viewport.x)
        .y_bounds(viewport.y)
        .paint(|ctx| {
            for (color, coords) in &groups {
                ctx.draw(&Points {
                    coords,
                    color: *color,
                });
            }
            if let Some(marker) = selected {
                ctx.draw(&Circle {
                    x: marker.longitude,
                    y: marker.latitude,
                    radius: ring,
                    color: Color::Yellow,
                });
                ctx.print(
                    marker.longitude,
                    marker.latitude,
                    TextLine::styled(
                        format!(" {}", marker.popup.title),
                        Style::default().fg(Color::Yellow),
                    ),
                );
            }
        });

    frame.render_widget(canvas, area);
}
