use std::f64::consts::PI;

use tracing::warn;

use super::{is_finite_point, spline, GeometryGenerator, MIN_PATH_POINTS};
use crate::{
    attempts::Attempt,
    prng::SeededRandom,
    scene::{
        AttemptPrimitive, Color, CompletionPointPrimitive, Material, Point3, Scene,
        ScenePrimitive, TubeGeometry,
    },
    VisualizerSettings,
};

/// Short attempts shrink faster than linearly toward the centre.
const COMPLETION_EXPONENT: f64 = 1.8;
const CONTROL_POINTS: usize = 12;
const RADIAL_SEGMENTS: u32 = 6;
/// Completion at or above which an attempt counts as a top-out.
const TOP_OUT: f64 = 0.85;

/// Radius at which an attempt with full completion ends: one spacing past
/// the outermost ring.
pub(crate) fn attempt_reach(settings: &VisualizerSettings) -> f64 {
    (settings.base_radius + settings.ring_count as f64 * settings.ring_spacing)
        * settings.radius_multiplier
}

pub(super) fn build<R: SeededRandom>(
    generator: &GeometryGenerator<'_, R>,
    attempts: &[Attempt],
    scene: &mut Scene,
) {
    let settings = generator.settings;
    let inner = settings.scaled_base_radius().max(0.0);
    let reach = attempt_reach(settings);
    let amplitude = settings.attempt_waviness * settings.ring_spacing * settings.radius_multiplier;

    let failed = Color::from_hex(0x6c5b7b);
    let sent = Color::from_hex(0xc06c84);
    let top_out = Color::from_hex(0x95e06c);

    for attempt in attempts {
        let completion = attempt.completion_percent.clamp(0.0, 1.0);
        let end = inner + (reach - inner) * completion.powf(COMPLETION_EXPONENT);
        if !(end.is_finite() && end > inner) {
            warn!(attempt = attempt.index, end, "skipping attempt with degenerate length");
            continue;
        }

        let (sin, cos) = attempt.angle.sin_cos();
        let radial = [cos, sin];
        let tangent = [-sin, cos];

        let controls: Vec<Point3> = (0..=CONTROL_POINTS)
            .filter_map(|step| {
                let t = step as f64 / CONTROL_POINTS as f64;
                let r = inner + (end - inner) * t;
                let lateral = amplitude * waviness(t, attempt.phase) * t;
                let point = [
                    radial[0] * r + tangent[0] * lateral,
                    radial[1] * r + tangent[1] * lateral,
                    lateral * 0.3,
                ];
                is_finite_point(&point).then_some(point)
            })
            .collect();

        if controls.len() < MIN_PATH_POINTS {
            warn!(
                attempt = attempt.index,
                points = controls.len(),
                "dropping attempt with too few valid points"
            );
            continue;
        }

        let path: Vec<Point3> = spline::sample_open(&controls, settings.curve_resolution as usize)
            .into_iter()
            .filter(is_finite_point)
            .collect();
        if path.len() < MIN_PATH_POINTS {
            warn!(attempt = attempt.index, "dropping attempt whose curve collapsed");
            continue;
        }

        let last = path.len() - 1;
        let alpha_ramp = (0..path.len()).map(|i| i as f64 / last as f64).collect();
        let tip = path[last];
        let color = failed.lerp(sent, completion);

        scene.push(ScenePrimitive::Attempt(AttemptPrimitive {
            attempt_index: attempt.index,
            completion_percent: completion,
            tube: TubeGeometry {
                path,
                radius: settings.tube_radius * 0.5 * settings.radius_multiplier,
                radial_segments: RADIAL_SEGMENTS,
                closed: false,
            },
            alpha_ramp,
            material: Material {
                color,
                opacity: generator.materials.attempt_opacity(),
            },
        }));

        scene.push(ScenePrimitive::CompletionPoint(CompletionPointPrimitive {
            attempt_index: attempt.index,
            position: tip,
            size: settings.tube_radius * 3.0 * (1.0 + completion) * settings.radius_multiplier,
            material: Material {
                color: if completion >= TOP_OUT { top_out } else { color },
                opacity: generator.materials.attempt_opacity(),
            },
        }));
    }
}

/// Three harmonics phase-shifted per attempt so paths at the same angle
/// still diverge.
fn waviness(t: f64, phase: f64) -> f64 {
    (t * PI * 3.0 + phase).sin() * 0.5
        + (t * PI * 7.0 + phase * 1.7).sin() * 0.3
        + (t * PI * 13.0 + phase * 2.3).sin() * 0.2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{tests::moves, GenerationContext};

    fn attempt(index: usize, completion_percent: f64, phase: f64) -> Attempt {
        Attempt {
            index,
            angle: 0.3,
            completion_percent,
            phase,
        }
    }

    fn tubes(settings: &VisualizerSettings, attempts: &[Attempt]) -> Vec<AttemptPrimitive> {
        GeometryGenerator::new(settings)
            .generate(
                &moves(&[(0.0, false), (0.5, false)]),
                attempts,
                &GenerationContext::default(),
            )
            .into_primitives()
            .into_iter()
            .filter_map(|p| match p {
                ScenePrimitive::Attempt(tube) => Some(tube),
                _ => None,
            })
            .collect()
    }

    fn tip_radius(tube: &AttemptPrimitive) -> f64 {
        let tip = tube.tube.path.last().unwrap();
        (tip[0] * tip[0] + tip[1] * tip[1]).sqrt()
    }

    #[test]
    fn completion_maps_superlinearly_to_length() {
        let settings = VisualizerSettings {
            attempt_waviness: 0.0,
            ..Default::default()
        };
        let tubes = tubes(&settings, &[attempt(0, 0.5, 0.0), attempt(1, 1.0, 0.0)]);
        let inner = settings.scaled_base_radius();
        let reach = attempt_reach(&settings);

        let half = tip_radius(&tubes[0]);
        let full = tip_radius(&tubes[1]);
        assert!((full - reach).abs() < 1e-9);
        assert!((half - (inner + (reach - inner) * 0.5_f64.powf(1.8))).abs() < 1e-9);
        assert!(half - inner < (full - inner) * 0.5);
    }

    #[test]
    fn alpha_ramps_from_centre_to_tip() {
        let settings = VisualizerSettings::default();
        let tubes = tubes(&settings, &[attempt(0, 0.7, 1.0)]);
        let ramp = &tubes[0].alpha_ramp;
        assert_eq!(ramp.len(), tubes[0].tube.path.len());
        assert_eq!(ramp[0], 0.0);
        assert_eq!(*ramp.last().unwrap(), 1.0);
        assert!(ramp.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn phases_make_same_angle_attempts_diverge() {
        let settings = VisualizerSettings::default();
        let tubes = tubes(&settings, &[attempt(0, 0.9, 0.0), attempt(1, 0.9, 2.0)]);
        assert_ne!(tubes[0].tube.path, tubes[1].tube.path);
    }

    #[test]
    fn completion_point_sits_at_path_end() {
        let settings = VisualizerSettings::default();
        let scene = GeometryGenerator::new(&settings).generate(
            &moves(&[(0.0, false), (0.5, false)]),
            &[attempt(0, 0.95, 0.5)],
            &GenerationContext::default(),
        );
        let tube = scene.primitives().iter().find_map(|p| match p {
            ScenePrimitive::Attempt(tube) => Some(tube),
            _ => None,
        });
        let point = scene.primitives().iter().find_map(|p| match p {
            ScenePrimitive::CompletionPoint(point) => Some(point),
            _ => None,
        });
        let (tube, point) = (tube.unwrap(), point.unwrap());
        assert_eq!(Some(&point.position), tube.tube.path.last());
        assert_eq!(point.material.color, Color::from_hex(0x95e06c));
    }
}
