use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::Result;

const DEFAULT_DEBOUNCE_MS: u64 = 16;
const DEFAULT_RECONCILE_HZ: f64 = 15.0;

/// Top-level configuration for a [`crate::VisualizerEngine`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Window in which bursts of settings changes are coalesced.
    pub debounce_ms: u64,
    /// Reconciliation ticks per second, independent of the render rate.
    pub reconcile_hz: f64,
    pub settings: VisualizerSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            reconcile_hz: DEFAULT_RECONCILE_HZ,
            settings: VisualizerSettings::default(),
        }
    }
}

impl EngineConfig {
    /// Parses a configuration document. The nested settings go through the
    /// same clamping as runtime updates.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut config: Self = serde_json::from_str(json)?;
        config.settings =
            VisualizerSettings::default().merged(&SettingsPatch::from(&config.settings));
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Interval between reconciliation ticks. Falls back to the default
    /// cadence when the configured rate is not a positive number.
    pub fn reconcile_interval(&self) -> Duration {
        let hz = if self.reconcile_hz.is_finite() && self.reconcile_hz > 0.0 {
            self.reconcile_hz
        } else {
            warn!(hz = self.reconcile_hz, "invalid reconcile rate, using default");
            DEFAULT_RECONCILE_HZ
        };
        Duration::from_secs_f64(1.0 / hz)
    }
}

/// Immutable snapshot of every recognized visualizer option.
///
/// Updates never mutate a snapshot in place: [`VisualizerSettings::merged`]
/// produces the next snapshot from a [`SettingsPatch`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VisualizerSettings {
    pub ring_count: u32,
    pub ring_spacing: f64,
    pub base_radius: f64,
    pub radius_multiplier: f64,
    /// Spline samples emitted per control span.
    pub curve_resolution: u32,
    pub tube_radius: f64,
    pub dynamics_multiplier: f64,
    pub organic_noise: f64,
    pub crux_emphasis: f64,
    pub liquid_effect: f64,
    pub show_rings: bool,
    pub show_move_markers: bool,
    pub show_labels: bool,
    pub show_attempt_lines: bool,
    pub max_attempts: u32,
    pub attempt_waviness: f64,
    pub move_threshold: f64,
    pub min_move_duration: f64,
    pub depth_effect: f64,
    pub center_fade: f64,
    pub ring_opacity: f64,
    pub marker_opacity: f64,
    pub attempt_opacity: f64,
}

impl Default for VisualizerSettings {
    fn default() -> Self {
        Self {
            ring_count: 8,
            ring_spacing: 0.35,
            base_radius: 2.0,
            radius_multiplier: 1.0,
            curve_resolution: 8,
            tube_radius: 0.02,
            dynamics_multiplier: 1.5,
            organic_noise: 0.15,
            crux_emphasis: 1.5,
            liquid_effect: 0.0,
            show_rings: true,
            show_move_markers: true,
            show_labels: false,
            show_attempt_lines: true,
            max_attempts: 30,
            attempt_waviness: 0.15,
            move_threshold: 12.0,
            min_move_duration: 0.3,
            depth_effect: 0.3,
            center_fade: 0.5,
            ring_opacity: 0.8,
            marker_opacity: 0.9,
            attempt_opacity: 0.6,
        }
    }
}

impl VisualizerSettings {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let parsed: Self = serde_json::from_str(json)?;
        Ok(Self::default().merged(&SettingsPatch::from(&parsed)))
    }

    /// Radius of the innermost ring after the global multiplier.
    pub fn scaled_base_radius(&self) -> f64 {
        self.base_radius * self.radius_multiplier
    }

    /// Returns the next snapshot with `patch` applied on top of `self`.
    ///
    /// Out-of-range values are clamped and non-finite values keep the
    /// previous setting.
    pub fn merged(&self, patch: &SettingsPatch) -> Self {
        let mut next = self.clone();

        merge_count(&mut next.ring_count, patch.ring_count, 1, 32);
        merge_count(&mut next.curve_resolution, patch.curve_resolution, 1, 64);
        merge_count(&mut next.max_attempts, patch.max_attempts, 0, 500);

        merge_float(&mut next.ring_spacing, patch.ring_spacing, 0.01, 10.0);
        merge_float(&mut next.base_radius, patch.base_radius, 0.0, 100.0);
        merge_float(&mut next.radius_multiplier, patch.radius_multiplier, 0.05, 10.0);
        merge_float(&mut next.tube_radius, patch.tube_radius, 0.001, 1.0);
        merge_float(&mut next.dynamics_multiplier, patch.dynamics_multiplier, 0.0, 10.0);
        merge_float(&mut next.organic_noise, patch.organic_noise, 0.0, 2.0);
        merge_float(&mut next.crux_emphasis, patch.crux_emphasis, 0.0, 5.0);
        merge_float(&mut next.liquid_effect, patch.liquid_effect, 0.0, 2.0);
        merge_float(&mut next.attempt_waviness, patch.attempt_waviness, 0.0, 2.0);
        merge_float(&mut next.move_threshold, patch.move_threshold, 0.1, 1000.0);
        merge_float(&mut next.min_move_duration, patch.min_move_duration, 0.0, 60.0);
        merge_float(&mut next.depth_effect, patch.depth_effect, 0.0, 5.0);
        merge_float(&mut next.center_fade, patch.center_fade, 0.0, 1.0);
        merge_float(&mut next.ring_opacity, patch.ring_opacity, 0.0, 1.0);
        merge_float(&mut next.marker_opacity, patch.marker_opacity, 0.0, 1.0);
        merge_float(&mut next.attempt_opacity, patch.attempt_opacity, 0.0, 1.0);

        if let Some(value) = patch.show_rings {
            next.show_rings = value;
        }
        if let Some(value) = patch.show_move_markers {
            next.show_move_markers = value;
        }
        if let Some(value) = patch.show_labels {
            next.show_labels = value;
        }
        if let Some(value) = patch.show_attempt_lines {
            next.show_attempt_lines = value;
        }

        next
    }
}

/// Partial settings update. Missing keys leave the current value untouched
/// and unknown keys are ignored during deserialization.
///
/// Numeric fields are carried as `f64` so that out-of-range or fractional
/// counts can be clamped instead of rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    pub ring_count: Option<f64>,
    pub ring_spacing: Option<f64>,
    pub base_radius: Option<f64>,
    pub radius_multiplier: Option<f64>,
    pub curve_resolution: Option<f64>,
    pub tube_radius: Option<f64>,
    pub dynamics_multiplier: Option<f64>,
    pub organic_noise: Option<f64>,
    pub crux_emphasis: Option<f64>,
    pub liquid_effect: Option<f64>,
    pub show_rings: Option<bool>,
    pub show_move_markers: Option<bool>,
    pub show_labels: Option<bool>,
    pub show_attempt_lines: Option<bool>,
    pub max_attempts: Option<f64>,
    pub attempt_waviness: Option<f64>,
    pub move_threshold: Option<f64>,
    pub min_move_duration: Option<f64>,
    pub depth_effect: Option<f64>,
    pub center_fade: Option<f64>,
    pub ring_opacity: Option<f64>,
    pub marker_opacity: Option<f64>,
    pub attempt_opacity: Option<f64>,
}

impl SettingsPatch {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overlays `later` on top of `self`; keys present in `later` win.
    pub fn coalesce(&mut self, later: &SettingsPatch) {
        fn take<T: Copy>(slot: &mut Option<T>, later: Option<T>) {
            if later.is_some() {
                *slot = later;
            }
        }

        take(&mut self.ring_count, later.ring_count);
        take(&mut self.ring_spacing, later.ring_spacing);
        take(&mut self.base_radius, later.base_radius);
        take(&mut self.radius_multiplier, later.radius_multiplier);
        take(&mut self.curve_resolution, later.curve_resolution);
        take(&mut self.tube_radius, later.tube_radius);
        take(&mut self.dynamics_multiplier, later.dynamics_multiplier);
        take(&mut self.organic_noise, later.organic_noise);
        take(&mut self.crux_emphasis, later.crux_emphasis);
        take(&mut self.liquid_effect, later.liquid_effect);
        take(&mut self.show_rings, later.show_rings);
        take(&mut self.show_move_markers, later.show_move_markers);
        take(&mut self.show_labels, later.show_labels);
        take(&mut self.show_attempt_lines, later.show_attempt_lines);
        take(&mut self.max_attempts, later.max_attempts);
        take(&mut self.attempt_waviness, later.attempt_waviness);
        take(&mut self.move_threshold, later.move_threshold);
        take(&mut self.min_move_duration, later.min_move_duration);
        take(&mut self.depth_effect, later.depth_effect);
        take(&mut self.center_fade, later.center_fade);
        take(&mut self.ring_opacity, later.ring_opacity);
        take(&mut self.marker_opacity, later.marker_opacity);
        take(&mut self.attempt_opacity, later.attempt_opacity);
    }
}

impl From<&VisualizerSettings> for SettingsPatch {
    fn from(settings: &VisualizerSettings) -> Self {
        Self {
            ring_count: Some(settings.ring_count as f64),
            ring_spacing: Some(settings.ring_spacing),
            base_radius: Some(settings.base_radius),
            radius_multiplier: Some(settings.radius_multiplier),
            curve_resolution: Some(settings.curve_resolution as f64),
            tube_radius: Some(settings.tube_radius),
            dynamics_multiplier: Some(settings.dynamics_multiplier),
            organic_noise: Some(settings.organic_noise),
            crux_emphasis: Some(settings.crux_emphasis),
            liquid_effect: Some(settings.liquid_effect),
            show_rings: Some(settings.show_rings),
            show_move_markers: Some(settings.show_move_markers),
            show_labels: Some(settings.show_labels),
            show_attempt_lines: Some(settings.show_attempt_lines),
            max_attempts: Some(settings.max_attempts as f64),
            attempt_waviness: Some(settings.attempt_waviness),
            move_threshold: Some(settings.move_threshold),
            min_move_duration: Some(settings.min_move_duration),
            depth_effect: Some(settings.depth_effect),
            center_fade: Some(settings.center_fade),
            ring_opacity: Some(settings.ring_opacity),
            marker_opacity: Some(settings.marker_opacity),
            attempt_opacity: Some(settings.attempt_opacity),
        }
    }
}

fn merge_float(slot: &mut f64, value: Option<f64>, min: f64, max: f64) {
    match value {
        Some(value) if value.is_finite() => *slot = value.clamp(min, max),
        Some(value) => warn!(value, "ignoring non-finite setting value"),
        None => {}
    }
}

fn merge_count(slot: &mut u32, value: Option<f64>, min: u32, max: u32) {
    match value {
        Some(value) if value.is_finite() => {
            *slot = value.round().clamp(min as f64, max as f64) as u32;
        }
        Some(value) => warn!(value, "ignoring non-finite count setting"),
        None => {}
    }
}
