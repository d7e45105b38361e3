//! Renderer-agnostic scene description.
//!
//! A [`Scene`] is an ordered list of typed primitives. Renderers only need to
//! know how to draw tubes, lines, points and labels.

use serde::{Deserialize, Serialize};

use crate::mapping::MaterialParams;

pub type Point3 = [f64; 3];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as f32 / 255.0,
            g: ((hex >> 8) & 0xff) as f32 / 255.0,
            b: (hex & 0xff) as f32 / 255.0,
        }
    }

    pub fn lerp(self, other: Color, t: f64) -> Self {
        let t = t.clamp(0.0, 1.0) as f32;
        Self {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
        }
    }
}

/// Start move accent.
pub const ACCENT_START: Color = Color::rgb(0.306, 0.804, 0.769);
/// Crux move accent.
pub const ACCENT_CRUX: Color = Color::rgb(1.0, 0.420, 0.420);
/// Regular move accent.
pub const ACCENT_MOVE: Color = Color::rgb(1.0, 0.902, 0.427);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub color: Color,
    pub opacity: f64,
}

/// Centre line plus constant radius. See [`TubeGeometry::extrude`] for the
/// mesh form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TubeGeometry {
    pub path: Vec<Point3>,
    pub radius: f64,
    pub radial_segments: u32,
    pub closed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RingPrimitive {
    pub ring_index: u32,
    pub ring_count: u32,
    pub tube: TubeGeometry,
    /// Unscaled Z of every path point; the live Z is this times the depth
    /// strength.
    pub depth_profile: Vec<f64>,
    pub material: Material,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkerRole {
    Start,
    Crux,
    Move,
}

impl MarkerRole {
    pub fn color(self) -> Color {
        match self {
            Self::Start => ACCENT_START,
            Self::Crux => ACCENT_CRUX,
            Self::Move => ACCENT_MOVE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerPrimitive {
    pub move_index: usize,
    pub role: MarkerRole,
    pub from: Point3,
    pub to: Point3,
    pub thickness: f64,
    /// Enhanced intensity that shaped this marker.
    pub emphasis: f64,
    pub material: Material,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptPrimitive {
    pub attempt_index: usize,
    pub completion_percent: f64,
    pub tube: TubeGeometry,
    /// Per-point alpha multiplier, 0 at the centre end and 1 at the tip.
    pub alpha_ramp: Vec<f64>,
    pub material: Material,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionPointPrimitive {
    pub attempt_index: usize,
    pub position: Point3,
    pub size: f64,
    pub material: Material,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelPrimitive {
    pub move_index: usize,
    pub position: Point3,
    pub text: String,
    pub material: Material,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveKind {
    Ring,
    Marker,
    Attempt,
    CompletionPoint,
    Label,
}

/// One renderable object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ScenePrimitive {
    Ring(RingPrimitive),
    Marker(MarkerPrimitive),
    Attempt(AttemptPrimitive),
    CompletionPoint(CompletionPointPrimitive),
    Label(LabelPrimitive),
}

impl ScenePrimitive {
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Self::Ring(_) => PrimitiveKind::Ring,
            Self::Marker(_) => PrimitiveKind::Marker,
            Self::Attempt(_) => PrimitiveKind::Attempt,
            Self::CompletionPoint(_) => PrimitiveKind::CompletionPoint,
            Self::Label(_) => PrimitiveKind::Label,
        }
    }

    pub fn material(&self) -> &Material {
        match self {
            Self::Ring(ring) => &ring.material,
            Self::Marker(marker) => &marker.material,
            Self::Attempt(attempt) => &attempt.material,
            Self::CompletionPoint(point) => &point.material,
            Self::Label(label) => &label.material,
        }
    }

    /// Every coordinate the primitive carries.
    pub fn points(&self) -> Vec<Point3> {
        match self {
            Self::Ring(ring) => ring.tube.path.clone(),
            Self::Marker(marker) => vec![marker.from, marker.to],
            Self::Attempt(attempt) => attempt.tube.path.clone(),
            Self::CompletionPoint(point) => vec![point.position],
            Self::Label(label) => vec![label.position],
        }
    }

    /// Patches appearance in place without touching the X/Y layout.
    pub fn apply_material(&mut self, params: &MaterialParams) {
        match self {
            Self::Ring(ring) => {
                ring.material.opacity = params.ring_opacity(ring.ring_index, ring.ring_count);
                for (point, unit) in ring.tube.path.iter_mut().zip(&ring.depth_profile) {
                    point[2] = unit * params.depth_effect;
                }
            }
            Self::Marker(marker) => {
                marker.material.opacity = params.marker_opacity(marker.emphasis);
            }
            Self::Attempt(attempt) => attempt.material.opacity = params.attempt_opacity(),
            Self::CompletionPoint(point) => point.material.opacity = params.attempt_opacity(),
            Self::Label(label) => label.material.opacity = params.marker_opacity(1.0),
        }
    }
}

/// Ordered collection of primitives produced by one generation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    primitives: Vec<ScenePrimitive>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, primitive: ScenePrimitive) {
        self.primitives.push(primitive);
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    pub fn primitives(&self) -> &[ScenePrimitive] {
        &self.primitives
    }

    pub fn count(&self, kind: PrimitiveKind) -> usize {
        self.primitives.iter().filter(|p| p.kind() == kind).count()
    }

    pub fn into_primitives(self) -> Vec<ScenePrimitive> {
        self.primitives
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors_decode_channels() {
        let color = Color::from_hex(0xff8000);
        assert_eq!(color.r, 1.0);
        assert!((color.g - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(color.b, 0.0);
    }

    #[test]
    fn ring_material_patch_rescales_depth() {
        let mut primitive = ScenePrimitive::Ring(RingPrimitive {
            ring_index: 0,
            ring_count: 1,
            tube: TubeGeometry {
                path: vec![[1.0, 0.0, 0.5], [0.0, 1.0, -0.5]],
                radius: 0.02,
                radial_segments: 8,
                closed: true,
            },
            depth_profile: vec![1.0, -1.0],
            material: Material {
                color: ACCENT_START,
                opacity: 1.0,
            },
        });

        let params = MaterialParams {
            ring_opacity: 0.4,
            marker_opacity: 1.0,
            attempt_opacity: 1.0,
            center_fade: 0.0,
            depth_effect: 2.0,
        };
        primitive.apply_material(&params);

        assert_eq!(primitive.points(), vec![[1.0, 0.0, 2.0], [0.0, 1.0, -2.0]]);
        assert!((primitive.material().opacity - 0.4).abs() < 1e-12);
    }

    #[test]
    fn serializes_with_kind_tag() {
        let primitive = ScenePrimitive::Label(LabelPrimitive {
            move_index: 2,
            position: [0.0, 0.0, 0.0],
            text: "M2".to_string(),
            material: Material {
                color: ACCENT_MOVE,
                opacity: 1.0,
            },
        });
        let json = serde_json::to_string(&primitive).unwrap();
        assert!(json.contains(r#""kind":"label""#));
    }
}
