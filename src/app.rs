//! Application state management for Fountain Map
//!
//! This module contains the load state machine, the applied and draft filter
//! criteria, and keyboard handling. The full record set lives in a
//! [`Dataset`] that is replaced wholesale on every successful load; the
//! visible subset and its markers are always derived from it.

use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent};
use tracing::{debug, warn};

use crate::data::WaterSourceRecord;
use crate::filter::{self, FilterCriteria};
use crate::pipeline::{Dataset, LoadError, Loader};
use crate::presenter::{build_markers, Marker, MarkerHandle, Presenter};
use crate::refresh::RefreshMessage;

/// Highest zoom step on the map
pub const MAX_ZOOM: u8 = 4;

/// Load lifecycle of the application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppState {
    /// Nothing requested yet
    Idle,
    /// Load cycle started
    Loading,
    /// Valid cache entry found, no fetch needed
    CacheHit,
    /// Fetching from the primary or fallback source
    Fetching,
    /// Records loaded and markers rendered
    Ready,
    /// Recomputing the visible subset
    Filtering,
    /// Last load attempt failed; carries the notice shown to the user
    Failed(String),
}

/// Which panel receives navigation keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Markers,
    Districts,
    Types,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::Markers => Focus::Districts,
            Focus::Districts => Focus::Types,
            Focus::Types => Focus::Markers,
        }
    }
}

/// Main application struct managing state and data
pub struct App<P: Presenter> {
    /// Current load state
    pub state: AppState,
    /// Panel with keyboard focus
    pub focus: Focus,
    /// Index of the selected marker
    pub selected_marker: usize,
    /// Cursor in the district option list
    pub district_cursor: usize,
    /// Cursor in the type option list
    pub type_cursor: usize,
    /// Criteria being edited in the filter panel, not yet applied
    pub draft: FilterCriteria,
    /// Map zoom step, 0 shows every marker
    pub zoom: u8,
    /// Flag indicating the application should quit
    pub should_quit: bool,
    /// Flag indicating a refresh has been requested
    pub refresh_requested: bool,
    /// Flag to show help overlay
    pub show_help: bool,
    /// Loader shared with the background refresh task
    loader: Arc<Loader>,
    /// Full record set from the last successful load
    dataset: Option<Dataset>,
    /// Criteria the visible set was computed with
    criteria: FilterCriteria,
    /// Records passing `criteria`
    visible: Vec<WaterSourceRecord>,
    /// Markers for the mappable visible records
    markers: Vec<Marker>,
    /// Handles returned by the presenter for `markers`
    handles: Vec<MarkerHandle>,
    /// Map surface
    presenter: P,
}

impl<P: Presenter> App<P> {
    /// Creates a new App with pass-through filters
    pub fn new(loader: Arc<Loader>, presenter: P) -> Self {
        Self::with_criteria(loader, presenter, FilterCriteria::default())
    }

    /// Creates a new App whose first render uses `criteria`
    pub fn with_criteria(loader: Arc<Loader>, presenter: P, criteria: FilterCriteria) -> Self {
        Self {
            state: AppState::Idle,
            focus: Focus::Markers,
            selected_marker: 0,
            district_cursor: 0,
            type_cursor: 0,
            draft: criteria.clone(),
            zoom: 0,
            should_quit: false,
            refresh_requested: false,
            show_help: false,
            loader,
            dataset: None,
            criteria,
            visible: Vec::new(),
            markers: Vec::new(),
            handles: Vec::new(),
            presenter,
        }
    }

    pub fn loader(&self) -> &Arc<Loader> {
        &self.loader
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn visible(&self) -> &[WaterSourceRecord] {
        &self.visible
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    /// Returns the currently selected marker, if any
    pub fn selected(&self) -> Option<&Marker> {
        self.markers.get(self.selected_marker)
    }

    /// District options for the filter panel
    pub fn district_options(&self) -> &[String] {
        self.dataset
            .as_ref()
            .map(|d| d.districts.as_slice())
            .unwrap_or_default()
    }

    /// Type options for the filter panel
    pub fn type_options(&self) -> &[String] {
        self.dataset
            .as_ref()
            .map(|d| d.types.as_slice())
            .unwrap_or_default()
    }

    /// Whether a failure notice is currently shown
    pub fn notice(&self) -> Option<&str> {
        match &self.state {
            AppState::Failed(notice) => Some(notice.as_str()),
            _ => None,
        }
    }

    /// Initial load: serve the cache when valid, otherwise fetch
    ///
    /// Transitions `Loading -> CacheHit | Fetching -> Ready | Failed`.
    pub async fn load(&mut self) {
        self.state = AppState::Loading;
        let loader = Arc::clone(&self.loader);
        let cycle = match loader.begin() {
            Ok(cycle) => cycle,
            Err(e) => return self.finish_fetch(Err(e)),
        };

        let cached = cycle.cached();
        if let Some(dataset) = cached {
            drop(cycle);
            self.state = AppState::CacheHit;
            self.install(dataset);
            return;
        }

        self.state = AppState::Fetching;
        let result = cycle.fetch().await;
        self.finish_fetch(result);
    }

    /// Forces a fetch that bypasses the cache
    pub async fn refresh(&mut self) {
        self.state = AppState::Loading;
        let loader = Arc::clone(&self.loader);
        let cycle = match loader.begin() {
            Ok(cycle) => cycle,
            Err(e) => return self.finish_fetch(Err(e)),
        };

        self.state = AppState::Fetching;
        let result = cycle.fetch().await;
        self.finish_fetch(result);
    }

    /// Applies a message from the background refresh task
    pub fn handle_refresh_message(&mut self, message: RefreshMessage) {
        match message {
            RefreshMessage::Started => {
                self.state = AppState::Fetching;
            }
            RefreshMessage::Completed(dataset) => self.install(dataset),
            RefreshMessage::Failed(notice) => self.fail(notice),
            RefreshMessage::Busy => {
                debug!("Refresh ignored, a load is already running");
            }
        }
    }

    fn finish_fetch(&mut self, result: Result<Dataset, LoadError>) {
        match result {
            Ok(dataset) => self.install(dataset),
            Err(LoadError::Busy) => {
                debug!("Load ignored, another one is running");
                self.state = if self.dataset.is_some() {
                    AppState::Ready
                } else {
                    AppState::Idle
                };
            }
            Err(e @ LoadError::Unavailable(_)) => self.fail(failure_notice(&e)),
        }
    }

    /// Replaces the dataset and renders it with the applied criteria
    fn install(&mut self, dataset: Dataset) {
        self.dataset = Some(dataset);
        self.district_cursor = 0;
        self.type_cursor = 0;
        self.recompute();
        self.state = AppState::Ready;
    }

    /// Records a failure; any previously rendered markers stay on screen
    fn fail(&mut self, notice: String) {
        warn!(%notice, "Load failed");
        self.presenter.show_notice(&notice);
        self.state = AppState::Failed(notice);
    }

    /// Replaces the applied criteria and re-renders; never fetches
    pub fn apply_filters(&mut self, criteria: FilterCriteria) {
        self.draft = criteria.clone();
        self.criteria = criteria;
        if self.dataset.is_none() {
            return;
        }
        self.state = AppState::Filtering;
        self.recompute();
        self.state = AppState::Ready;
    }

    /// Clears district and type selections, enables operational-only, re-applies
    pub fn reset_filters(&mut self) {
        self.apply_filters(FilterCriteria::reset());
    }

    fn recompute(&mut self) {
        let Some(dataset) = self.dataset.as_ref() else {
            return;
        };
        self.visible = filter::apply(&dataset.records, &self.criteria);

        self.presenter.clear_markers(&self.handles);
        self.markers = build_markers(&self.visible);
        self.handles = self.presenter.render_markers(&self.markers);

        if self.selected_marker >= self.markers.len() {
            self.selected_marker = 0;
        }
        debug!(
            visible = self.visible.len(),
            markers = self.markers.len(),
            "Visible set recomputed"
        );
    }

    /// Handles keyboard input and updates state accordingly
    ///
    /// # Key Bindings
    /// - `q`: Quit the application
    /// - `Tab`: Cycle focus between markers, districts and types
    /// - `Up`/`k`, `Down`/`j`: Move within the focused list
    /// - `Space`: Toggle the option under the cursor in the draft filter
    /// - `o`: Toggle operational-only in the draft filter
    /// - `Enter`/`a`: Apply the draft filter
    /// - `x`: Reset filters
    /// - `+`/`-`: Zoom the map
    /// - `r`: Refresh data, bypassing the cache
    /// - `?`: Toggle help
    pub fn handle_key(&mut self, key_event: KeyEvent) {
        if self.show_help {
            match key_event.code {
                KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q') => {
                    self.show_help = false;
                }
                _ => {}
            }
            return;
        }

        if matches!(
            self.state,
            AppState::Idle | AppState::Loading | AppState::CacheHit | AppState::Fetching
        ) && self.dataset.is_none()
        {
            // Only quit is allowed during the first load
            if key_event.code == KeyCode::Char('q') {
                self.should_quit = true;
            }
            return;
        }

        match key_event.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
            }
            KeyCode::Esc => {
                if self.focus == Focus::Markers {
                    self.should_quit = true;
                } else {
                    self.focus = Focus::Markers;
                }
            }
            KeyCode::Tab => {
                self.focus = self.focus.next();
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.move_cursor_up();
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.move_cursor_down();
            }
            KeyCode::Char(' ') => {
                self.toggle_option_under_cursor();
            }
            KeyCode::Char('o') => {
                self.draft.operational_only = !self.draft.operational_only;
            }
            KeyCode::Enter | KeyCode::Char('a') => {
                self.apply_filters(self.draft.clone());
            }
            KeyCode::Char('x') => {
                self.reset_filters();
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.zoom = (self.zoom + 1).min(MAX_ZOOM);
            }
            KeyCode::Char('-') => {
                self.zoom = self.zoom.saturating_sub(1);
            }
            KeyCode::Char('r') => {
                self.refresh_requested = true;
            }
            KeyCode::Char('?') => {
                self.show_help = true;
            }
            _ => {}
        }
    }

    fn focused_len(&self) -> usize {
        match self.focus {
            Focus::Markers => self.markers.len(),
            Focus::Districts => self.district_options().len(),
            Focus::Types => self.type_options().len(),
        }
    }

    fn focused_cursor(&mut self) -> &mut usize {
        match self.focus {
            Focus::Markers => &mut self.selected_marker,
            Focus::Districts => &mut self.district_cursor,
            Focus::Types => &mut self.type_cursor,
        }
    }

    /// Moves the focused cursor up, wrapping to bottom if at top
    fn move_cursor_up(&mut self) {
        let count = self.focused_len();
        if count == 0 {
            return;
        }
        let cursor = self.focused_cursor();
        *cursor = if *cursor == 0 { count - 1 } else { *cursor - 1 };
    }

    /// Moves the focused cursor down, wrapping to top if at bottom
    fn move_cursor_down(&mut self) {
        let count = self.focused_len();
        if count == 0 {
            return;
        }
        let cursor = self.focused_cursor();
        *cursor = (*cursor + 1) % count;
    }

    fn toggle_option_under_cursor(&mut self) {
        match self.focus {
            Focus::Markers => {}
            Focus::Districts => {
                if let Some(district) = self.district_options().get(self.district_cursor).cloned() {
                    self.draft.toggle_district(&district);
                }
            }
            Focus::Types => {
                if let Some(kind) = self.type_options().get(self.type_cursor).cloned() {
                    self.draft.toggle_type(&kind);
                }
            }
        }
    }
}

/// User-facing text for a failed load
fn failure_notice(error: &LoadError) -> String {
    format!("Could not load water sources: {}", error)
}
