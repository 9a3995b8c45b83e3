use std::time::Duration;

use geo::Point;
use serde::Deserialize;

/// Where the viewport starts before any station is mounted.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct InitialView {
    pub latitude: f64,
    pub longitude: f64,
    pub zoom: u8,
}

impl Default for InitialView {
    fn default() -> Self {
        Self {
            latitude: 20.0,
            longitude: 0.0,
            zoom: 2,
        }
    }
}

impl InitialView {
    pub fn center(&self) -> Point {
        Point::new(self.longitude, self.latitude)
    }
}

/// Tuning knobs for the annotation layer.
///
/// The two delays are UX choices rather than correctness requirements, so
/// they are plain milliseconds that a deployment can override.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
    /// How long an eligible origin waits before opening its own overlay
    pub auto_reveal_delay_ms: u64,
    /// How long auto-reveal stays disabled after an origin overlay is closed
    pub suppression_window_ms: u64,
    /// Also refuse manual opens while the suppression window is running
    pub suppression_blocks_manual_open: bool,
    /// Shown on direct segments whose route carries no price
    pub default_direct_price: f64,
    pub initial_view: InitialView,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            auto_reveal_delay_ms: 7500,
            suppression_window_ms: 300,
            suppression_blocks_manual_open: false,
            default_direct_price: 250.0,
            initial_view: InitialView::default(),
        }
    }
}

impl AnnotationConfig {
    pub fn auto_reveal_delay(&self) -> Duration {
        Duration::from_millis(self.auto_reveal_delay_ms)
    }

    pub fn suppression_window(&self) -> Duration {
        Duration::from_millis(self.suppression_window_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnnotationConfig::default();
        assert_eq!(config.auto_reveal_delay(), Duration::from_millis(7500));
        assert_eq!(config.suppression_window(), Duration::from_millis(300));
        assert!(!config.suppression_blocks_manual_open);
        assert_eq!(config.initial_view.zoom, 2);
    }

    #[test]
    fn test_partial_override() {
        let json = r#"{ "auto_reveal_delay_ms": 1000, "initial_view": { "zoom": 4 } }"#;
        let config: AnnotationConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.auto_reveal_delay_ms, 1000);
        assert_eq!(config.suppression_window_ms, 300);
        assert_eq!(config.initial_view.zoom, 4);
        assert_eq!(config.initial_view.latitude, 20.0);
    }
}
