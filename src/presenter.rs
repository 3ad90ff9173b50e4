//! Render contract between the pipeline and whatever draws the map
//!
//! The pipeline turns the visible records into [`Marker`]s and hands them to
//! a [`Presenter`]. Only mappable records become markers; each carries a
//! status color and the popup content shown when it is selected.

use std::io::{self, Write};

use crate::data::{StatusKind, WaterSourceRecord};

/// Marker color keyed to the record's status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerColor {
    Green,
    Red,
    Gray,
}

impl From<StatusKind> for MarkerColor {
    fn from(status: StatusKind) -> Self {
        match status {
            StatusKind::Operational => MarkerColor::Green,
            StatusKind::NonOperational => MarkerColor::Red,
            StatusKind::Unknown => MarkerColor::Gray,
        }
    }
}

/// One labelled line in a popup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupRow {
    pub label: &'static str,
    pub value: String,
}

/// Content shown for a selected marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Popup {
    /// Record name
    pub title: String,
    /// Optional image URL
    pub image: Option<String>,
    /// Type, district and status rows; rows with empty values are omitted
    pub rows: Vec<PopupRow>,
    /// Optional free-text description
    pub description: Option<String>,
}

impl Popup {
    /// Builds the popup for a record
    pub fn for_record(record: &WaterSourceRecord) -> Self {
        let rows = [
            ("Type", &record.kind),
            ("District", &record.district),
            ("Status", &record.status),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(label, value)| PopupRow {
            label,
            value: value.clone(),
        })
        .collect();

        Self {
            title: record.name.clone(),
            image: record.image.clone().filter(|s| !s.is_empty()),
            rows,
            description: record.description.clone().filter(|s| !s.is_empty()),
        }
    }
}

/// A drawable point on the map
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub latitude: f64,
    pub longitude: f64,
    pub status: StatusKind,
    pub color: MarkerColor,
    pub popup: Popup,
}

impl Marker {
    /// Builds a marker, or `None` if the record is not mappable
    pub fn from_record(record: &WaterSourceRecord) -> Option<Self> {
        let (latitude, longitude) = record.location.coordinates()?;
        let status = record.status_kind();
        Some(Self {
            latitude,
            longitude,
            status,
            color: status.into(),
            popup: Popup::for_record(record),
        })
    }
}

/// Builds markers for every mappable record, preserving order
pub fn build_markers(records: &[WaterSourceRecord]) -> Vec<Marker> {
    records.iter().filter_map(Marker::from_record).collect()
}

/// Opaque handle to a marker owned by a presenter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerHandle(pub usize);

/// Capability to show markers and notices
///
/// The pipeline depends only on this trait, never on a concrete toolkit.
pub trait Presenter {
    /// Shows `markers` and returns one handle per marker
    fn render_markers(&mut self, markers: &[Marker]) -> Vec<MarkerHandle>;

    /// Removes previously rendered markers
    fn clear_markers(&mut self, handles: &[MarkerHandle]);

    /// Shows a user-facing notice, e.g. when data is unavailable
    fn show_notice(&mut self, notice: &str);
}

/// Presenter that writes markers as plain text lines
///
/// Used by `--list`, where there is no terminal UI.
pub struct TextPresenter<W: Write> {
    out: W,
    next_handle: usize,
}

impl<W: Write> TextPresenter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            next_handle: 0,
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_marker(&mut self, marker: &Marker) -> io::Result<()> {
        let popup = &marker.popup;
        write!(
            self.out,
            "[{}] {} ({:.5}, {:.5})",
            marker.status.label(),
            popup.title,
            marker.latitude,
            marker.longitude
        )?;
        for row in &popup.rows {
            write!(self.out, " | {}: {}", row.label, row.value)?;
        }
        writeln!(self.out)
    }
}

impl<W: Write> Presenter for TextPresenter<W> {
    fn render_markers(&mut self, markers: &[Marker]) -> Vec<MarkerHandle> {
        let mut handles = Vec::with_capacity(markers.len());
        for marker in markers {
            if let Err(e) = self.write_marker(marker) {
                tracing::warn!(error = %e, "Failed to write marker");
                break;
            }
            handles.push(MarkerHandle(self.next_handle));
            self.next_handle += 1;
        }
        handles
    }

    fn clear_markers(&mut self, _handles: &[MarkerHandle]) {}

    fn show_notice(&mut self, notice: &str) {
        let _ = writeln!(self.out, "{}", notice);
    }
}
