//! Procedural scene generation.
//!
//! Moves are laid out clockwise around a full turn starting at twelve
//! o'clock. Concentric rings bulge outward where the interpolated move
//! intensity is high, radial markers point at each move, and simulated
//! attempts grow outward from the base radius.

mod markers;
mod paths;
mod rings;
pub mod spline;
mod tube;

use std::f64::consts::{FRAC_PI_2, TAU};

use tracing::{debug, warn};

use crate::{
    analysis::Move,
    attempts::Attempt,
    mapping::MaterialParams,
    prng::{SeededRandom, SineHash},
    render::{PrimitiveHandle, ResourceArena},
    scene::{Point3, Scene, ScenePrimitive},
    VisualizerSettings,
};

/// Fewest finite control points a closed ring curve can be built from.
pub const MIN_RING_POINTS: usize = 3;
/// Fewest finite control points an open attempt path can be built from.
pub const MIN_PATH_POINTS: usize = 4;

/// Per-pass inputs that are not settings.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerationContext {
    /// Boulder seed for per-ring noise phases.
    pub seed: f64,
    /// Seconds since the engine started; drives the liquid wave.
    pub time: f64,
}

/// Builds scenes from moves, attempts and one settings snapshot.
#[derive(Debug, Clone)]
pub struct GeometryGenerator<'a, R = SineHash> {
    settings: &'a VisualizerSettings,
    materials: MaterialParams,
    rng: R,
}

impl<'a> GeometryGenerator<'a, SineHash> {
    pub fn new(settings: &'a VisualizerSettings) -> Self {
        Self::with_rng(settings, SineHash)
    }
}

impl<'a, R: SeededRandom> GeometryGenerator<'a, R> {
    pub fn with_rng(settings: &'a VisualizerSettings, rng: R) -> Self {
        Self {
            settings,
            materials: MaterialParams::from(settings),
            rng,
        }
    }

    /// Generates a fresh scene. Fewer than two moves yields an empty scene.
    pub fn generate(
        &self,
        moves: &[Move],
        attempts: &[Attempt],
        context: &GenerationContext,
    ) -> Scene {
        let mut scene = Scene::new();
        if moves.len() < 2 {
            warn!(moves = moves.len(), "need at least two moves to generate geometry");
            return scene;
        }

        if self.settings.show_rings {
            rings::build(self, moves, context, &mut scene);
        }
        if self.settings.show_move_markers || self.settings.show_labels {
            markers::build(self, moves, &mut scene);
        }
        if self.settings.show_attempt_lines {
            paths::build(self, attempts, &mut scene);
        }

        debug!(primitives = scene.len(), "generated scene");
        scene
    }

    /// Disposes everything the arena holds, then installs a fresh scene.
    pub fn generate_into(
        &self,
        moves: &[Move],
        attempts: &[Attempt],
        context: &GenerationContext,
        arena: &mut ResourceArena,
    ) -> Vec<PrimitiveHandle> {
        arena.dispose_all();
        let scene = self.generate(moves, attempts, context);
        arena.install(scene)
    }

    /// Rebuilds only the rings for `context` and swaps them into the arena.
    /// Everything else the arena holds is left alone. Returns how many rings
    /// were replaced.
    pub fn animate_rings(
        &self,
        moves: &[Move],
        context: &GenerationContext,
        arena: &mut ResourceArena,
    ) -> usize {
        if !self.settings.show_rings || moves.len() < 2 {
            return 0;
        }
        let mut scene = Scene::new();
        rings::build(self, moves, context, &mut scene);
        let rings = scene
            .into_primitives()
            .into_iter()
            .filter_map(|primitive| match primitive {
                ScenePrimitive::Ring(ring) => Some(ring),
                _ => None,
            })
            .collect();
        arena.replace_rings(rings)
    }
}

/// Nonlinear response that keeps quiet moves flat and makes dynamic ones
/// spike: compressed below 0.3, moderately scaled to 0.6, superlinear above.
pub fn enhance(intensity: f64) -> f64 {
    let i = intensity.clamp(0.0, 1.0);
    if i < 0.3 {
        i * 0.5
    } else if i < 0.6 {
        0.15 + (i - 0.3) * 1.2
    } else {
        0.51 + (i - 0.6) * 1.2 + ((i - 0.6) / 0.4).powf(2.5) * 0.5
    }
}

/// Angle of move `index` out of `count`; move zero sits at twelve o'clock.
pub(crate) fn move_angle(index: usize, count: usize) -> f64 {
    FRAC_PI_2 - index as f64 / count.max(1) as f64 * TAU
}

/// Intensity at `progress` (fraction of a full turn), linearly interpolated
/// between the two nearest moves and wrapping back to the start move.
pub(crate) fn intensity_at(moves: &[Move], progress: f64) -> f64 {
    let n = moves.len();
    if n == 0 {
        return 0.0;
    }
    let position = progress.rem_euclid(1.0) * n as f64;
    let lower = position.floor();
    let k0 = (lower as usize) % n;
    let k1 = (k0 + 1) % n;
    let t = position - lower;
    moves[k0].intensity + (moves[k1].intensity - moves[k0].intensity) * t
}

/// Smallest absolute angle between two directions.
pub(crate) fn angular_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(TAU);
    d.min(TAU - d)
}

pub(crate) fn is_finite_point(point: &Point3) -> bool {
    point.iter().all(|v| v.is_finite())
}
