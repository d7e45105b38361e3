use std::f64::consts::{FRAC_PI_2, TAU};

use tracing::{debug, warn};

use super::{
    angular_distance, enhance, intensity_at, is_finite_point, move_angle, spline,
    GenerationContext, GeometryGenerator, MIN_RING_POINTS,
};
use crate::{
    analysis::Move,
    prng::SeededRandom,
    scene::{Color, Material, Point3, RingPrimitive, Scene, ScenePrimitive, TubeGeometry},
};

const MIN_DETAIL: usize = 8;
const MAX_DETAIL: usize = 32;
/// Angular half-width of the crux boost, radians.
const CRUX_WINDOW: f64 = 0.2;
const LIQUID_AMPLITUDE: f64 = 0.3;
const LIQUID_SPEED: f64 = 2.0;
const RADIAL_SEGMENTS: u32 = 8;

pub(super) fn build<R: SeededRandom>(
    generator: &GeometryGenerator<'_, R>,
    moves: &[Move],
    context: &GenerationContext,
    scene: &mut Scene,
) {
    let settings = generator.settings;
    let ring_count = settings.ring_count.max(1);
    let detail = (moves.len() * 4).clamp(MIN_DETAIL, MAX_DETAIL);
    let crux_angles: Vec<f64> = moves
        .iter()
        .filter(|m| m.is_crux)
        .map(|m| move_angle(m.index, moves.len()))
        .collect();

    let inner = Color::from_hex(0x1a535c);
    let outer = Color::from_hex(0x4ecdc4);

    for ring_index in 0..ring_count {
        let fraction = (ring_index as f64 + 1.0) / ring_count as f64;
        let radius = (settings.base_radius + ring_index as f64 * settings.ring_spacing)
            * settings.radius_multiplier;
        if !(radius.is_finite() && radius > 0.0) {
            warn!(ring_index, radius, "skipping ring with degenerate radius");
            continue;
        }

        let noise_phase = generator
            .rng
            .random_at(context.seed + ring_index as f64 * 13.37 + 101.0)
            * TAU;
        let spacing = settings.ring_spacing;
        let growth = 0.5 + 0.5 * fraction;

        let mut controls: Vec<Point3> = Vec::with_capacity(detail);
        for step in 0..detail {
            let progress = step as f64 / detail as f64;
            let theta = FRAC_PI_2 - progress * TAU;
            let enhanced = enhance(intensity_at(moves, progress));

            let spike = enhanced * settings.dynamics_multiplier * spacing * growth;
            let noise = settings.organic_noise * spacing * organic_noise(theta, noise_phase);
            let crux = crux_boost(theta, &crux_angles) * settings.crux_emphasis * spacing * growth;
            let liquid = settings.liquid_effect
                * spacing
                * LIQUID_AMPLITUDE
                * (4.0 * theta + context.time * LIQUID_SPEED + ring_index as f64 * 0.5).sin();

            let r = radius + (spike + noise + crux + liquid) * settings.radius_multiplier;
            let depth_unit = depth_profile(theta, ring_index, enhanced);
            let point = [r * theta.cos(), r * theta.sin(), depth_unit];

            if is_finite_point(&point) && r > 0.0 {
                controls.push(point);
            } else {
                debug!(ring_index, step, "skipping non-finite ring point");
            }
        }

        if controls.len() < MIN_RING_POINTS {
            warn!(
                ring_index,
                points = controls.len(),
                "dropping ring with too few valid points"
            );
            continue;
        }

        let curve: Vec<Point3> = spline::sample_closed(&controls, settings.curve_resolution as usize)
            .into_iter()
            .filter(is_finite_point)
            .collect();
        if curve.len() < MIN_RING_POINTS {
            warn!(ring_index, "dropping ring whose curve collapsed");
            continue;
        }

        let depth_profile: Vec<f64> = curve.iter().map(|p| p[2]).collect();
        let path = curve
            .iter()
            .map(|p| [p[0], p[1], p[2] * generator.materials.depth_effect])
            .collect();

        scene.push(ScenePrimitive::Ring(RingPrimitive {
            ring_index,
            ring_count,
            tube: TubeGeometry {
                path,
                radius: settings.tube_radius * settings.radius_multiplier,
                radial_segments: RADIAL_SEGMENTS,
                closed: true,
            },
            depth_profile,
            material: Material {
                color: inner.lerp(outer, fraction),
                opacity: generator.materials.ring_opacity(ring_index, ring_count),
            },
        }));
    }
}

/// Sum of four sine harmonics, amplitude at most one.
fn organic_noise(theta: f64, phase: f64) -> f64 {
    (3.0 * theta + phase).sin() * 0.5
        + (7.0 * theta + phase * 1.7).sin() * 0.25
        + (11.0 * theta + phase * 2.3).sin() * 0.15
        + (17.0 * theta + phase * 0.6).sin() * 0.1
}

/// Quadratic bump that is non-zero only within [`CRUX_WINDOW`] of a crux.
fn crux_boost(theta: f64, crux_angles: &[f64]) -> f64 {
    crux_angles
        .iter()
        .map(|&angle| {
            let d = angular_distance(theta, angle);
            if d < CRUX_WINDOW {
                0.5 * (1.0 - d / CRUX_WINDOW).powi(2)
            } else {
                0.0
            }
        })
        .sum()
}

/// Unscaled Z offset: a few sine and cosine harmonics, deeper where the
/// ring is more dynamic.
fn depth_profile(theta: f64, ring_index: u32, enhanced: f64) -> f64 {
    let r = ring_index as f64;
    let wave = (2.0 * theta + r * 0.4).sin() * 0.5
        + (3.0 * theta - r * 0.3).cos() * 0.3
        + (5.0 * theta + r * 0.7).sin() * 0.2;
    wave * (1.0 + enhanced * 0.5)
}
