//! Routing of settings keys to invalidation classes and material parameters.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::VisualizerSettings;

const CENTER_FADE_EXPONENT: f64 = 1.5;
const INNER_RING_FLOOR: f64 = 0.85;

/// How much work a changed setting forces on the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeClass {
    /// Geometry is stale and must be regenerated.
    Structural,
    /// Only the appearance of existing primitives changes.
    Material,
    /// Regenerates like a structural change. Kept apart because it is the
    /// most frequent change while a control is being dragged.
    Immediate,
}

/// Every recognized key of [`VisualizerSettings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SettingKey {
    RingCount,
    RingSpacing,
    BaseRadius,
    RadiusMultiplier,
    CurveResolution,
    TubeRadius,
    DynamicsMultiplier,
    OrganicNoise,
    CruxEmphasis,
    LiquidEffect,
    ShowRings,
    ShowMoveMarkers,
    ShowLabels,
    ShowAttemptLines,
    MaxAttempts,
    AttemptWaviness,
    MoveThreshold,
    MinMoveDuration,
    DepthEffect,
    CenterFade,
    RingOpacity,
    MarkerOpacity,
    AttemptOpacity,
}

impl SettingKey {
    pub const ALL: [SettingKey; 23] = [
        Self::RingCount,
        Self::RingSpacing,
        Self::BaseRadius,
        Self::RadiusMultiplier,
        Self::CurveResolution,
        Self::TubeRadius,
        Self::DynamicsMultiplier,
        Self::OrganicNoise,
        Self::CruxEmphasis,
        Self::LiquidEffect,
        Self::ShowRings,
        Self::ShowMoveMarkers,
        Self::ShowLabels,
        Self::ShowAttemptLines,
        Self::MaxAttempts,
        Self::AttemptWaviness,
        Self::MoveThreshold,
        Self::MinMoveDuration,
        Self::DepthEffect,
        Self::CenterFade,
        Self::RingOpacity,
        Self::MarkerOpacity,
        Self::AttemptOpacity,
    ];

    pub fn class(self) -> ChangeClass {
        match self {
            Self::RadiusMultiplier => ChangeClass::Immediate,
            Self::DepthEffect
            | Self::CenterFade
            | Self::RingOpacity
            | Self::MarkerOpacity
            | Self::AttemptOpacity => ChangeClass::Material,
            _ => ChangeClass::Structural,
        }
    }

    /// Keys whose change invalidates the detected moves themselves.
    pub fn requires_detection(self) -> bool {
        matches!(self, Self::MoveThreshold | Self::MinMoveDuration)
    }

    /// Keys whose change invalidates the simulated attempt population.
    pub fn requires_simulation(self) -> bool {
        matches!(self, Self::MaxAttempts)
    }

    fn differs(self, a: &VisualizerSettings, b: &VisualizerSettings) -> bool {
        match self {
            Self::RingCount => a.ring_count != b.ring_count,
            Self::RingSpacing => a.ring_spacing != b.ring_spacing,
            Self::BaseRadius => a.base_radius != b.base_radius,
            Self::RadiusMultiplier => a.radius_multiplier != b.radius_multiplier,
            Self::CurveResolution => a.curve_resolution != b.curve_resolution,
            Self::TubeRadius => a.tube_radius != b.tube_radius,
            Self::DynamicsMultiplier => a.dynamics_multiplier != b.dynamics_multiplier,
            Self::OrganicNoise => a.organic_noise != b.organic_noise,
            Self::CruxEmphasis => a.crux_emphasis != b.crux_emphasis,
            Self::LiquidEffect => a.liquid_effect != b.liquid_effect,
            Self::ShowRings => a.show_rings != b.show_rings,
            Self::ShowMoveMarkers => a.show_move_markers != b.show_move_markers,
            Self::ShowLabels => a.show_labels != b.show_labels,
            Self::ShowAttemptLines => a.show_attempt_lines != b.show_attempt_lines,
            Self::MaxAttempts => a.max_attempts != b.max_attempts,
            Self::AttemptWaviness => a.attempt_waviness != b.attempt_waviness,
            Self::MoveThreshold => a.move_threshold != b.move_threshold,
            Self::MinMoveDuration => a.min_move_duration != b.min_move_duration,
            Self::DepthEffect => a.depth_effect != b.depth_effect,
            Self::CenterFade => a.center_fade != b.center_fade,
            Self::RingOpacity => a.ring_opacity != b.ring_opacity,
            Self::MarkerOpacity => a.marker_opacity != b.marker_opacity,
            Self::AttemptOpacity => a.attempt_opacity != b.attempt_opacity,
        }
    }
}

/// Work the scene needs after a settings change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidation {
    Regenerate { redetect: bool, resimulate: bool },
    PatchMaterials,
    RenderOnly,
}

/// Typed set of keys that differ between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    keys: BTreeSet<SettingKey>,
}

impl ChangeSet {
    /// Per-field comparison of two snapshots.
    pub fn between(previous: &VisualizerSettings, next: &VisualizerSettings) -> Self {
        Self {
            keys: SettingKey::ALL
                .iter()
                .copied()
                .filter(|key| key.differs(previous, next))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn contains(&self, key: SettingKey) -> bool {
        self.keys.contains(&key)
    }

    pub fn keys(&self) -> impl Iterator<Item = SettingKey> + '_ {
        self.keys.iter().copied()
    }

    pub fn has_class(&self, class: ChangeClass) -> bool {
        self.keys.iter().any(|key| key.class() == class)
    }

    pub fn invalidation(&self) -> Invalidation {
        if self.has_class(ChangeClass::Structural) || self.has_class(ChangeClass::Immediate) {
            Invalidation::Regenerate {
                redetect: self.keys.iter().any(|key| key.requires_detection()),
                resimulate: self.keys.iter().any(|key| key.requires_simulation()),
            }
        } else if self.has_class(ChangeClass::Material) {
            Invalidation::PatchMaterials
        } else {
            Invalidation::RenderOnly
        }
    }
}

/// Appearance values that can be patched onto live primitives.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialParams {
    pub ring_opacity: f64,
    pub marker_opacity: f64,
    pub attempt_opacity: f64,
    pub center_fade: f64,
    pub depth_effect: f64,
}

impl From<&VisualizerSettings> for MaterialParams {
    fn from(settings: &VisualizerSettings) -> Self {
        Self {
            ring_opacity: settings.ring_opacity,
            marker_opacity: settings.marker_opacity,
            attempt_opacity: settings.attempt_opacity,
            center_fade: settings.center_fade,
            depth_effect: settings.depth_effect,
        }
    }
}

impl MaterialParams {
    /// Opacity of ring `index` out of `count`: fades toward the centre with a
    /// slab-like power falloff, and inner rings sit slightly below outer ones.
    pub fn ring_opacity(&self, index: u32, count: u32) -> f64 {
        let fraction = (index as f64 + 1.0) / count.max(1) as f64;
        let center = 1.0 - self.center_fade * (1.0 - fraction).powf(CENTER_FADE_EXPONENT);
        let depth = INNER_RING_FLOOR + (1.0 - INNER_RING_FLOOR) * fraction;
        (self.ring_opacity * center * depth).clamp(0.0, 1.0)
    }

    /// Marker opacity; quieter moves are drawn fainter.
    pub fn marker_opacity(&self, emphasis: f64) -> f64 {
        (self.marker_opacity * (0.6 + 0.4 * emphasis.clamp(0.0, 1.0))).clamp(0.0, 1.0)
    }

    pub fn attempt_opacity(&self) -> f64 {
        self.attempt_opacity.clamp(0.0, 1.0)
    }
}
