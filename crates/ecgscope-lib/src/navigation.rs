use crate::config::ViewerConfig;
use serde::{Deserialize, Serialize};

/// Scroll position over a recording. Keeps the window start inside
/// `[0, max(0, max_time - window)]` so the requested range is always valid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub start: f64,
    pub window: f64,
    pub max_time: f64,
    /// Window length to restore after zooming onto an event.
    saved_window: Option<f64>,
}

impl Viewport {
    pub fn new(max_time: f64, window: f64) -> Self {
        Self {
            start: 0.0,
            window,
            max_time: max_time.max(0.0),
            saved_window: None,
        }
    }

    pub fn from_config(max_time: f64, cfg: &ViewerConfig) -> Self {
        Self::new(max_time, cfg.default_window_s)
    }

    pub fn end(&self) -> f64 {
        self.start + self.window
    }

    pub fn is_zoomed(&self) -> bool {
        self.saved_window.is_some()
    }

    fn clamp_start(&self, start: f64) -> f64 {
        let upper = (self.max_time - self.window).max(0.0);
        start.clamp(0.0, upper)
    }

    pub fn previous(&mut self) {
        self.start = self.clamp_start(self.start - self.window);
    }

    pub fn next(&mut self) {
        self.start = self.clamp_start(self.start + self.window);
    }

    pub fn go_to_start(&mut self) {
        self.start = 0.0;
    }

    pub fn go_to(&mut self, time: f64) {
        self.start = self.clamp_start(time);
    }

    pub fn set_window(&mut self, window: f64) {
        self.window = window;
        self.start = self.clamp_start(self.start);
    }

    /// Narrow to a short window just before `event_time`, remembering the current size.
    pub fn zoom_to_event(&mut self, event_time: f64, cfg: &ViewerConfig) {
        if self.saved_window.is_none() {
            self.saved_window = Some(self.window);
        }
        self.window = cfg.event_zoom_window_s;
        self.start = (event_time - cfg.event_zoom_lead_s).max(0.0);
    }

    pub fn reset_zoom(&mut self) {
        if let Some(window) = self.saved_window.take() {
            self.set_window(window);
        }
    }
}
