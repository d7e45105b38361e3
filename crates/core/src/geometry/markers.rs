use tracing::warn;

use super::{enhance, is_finite_point, move_angle, GeometryGenerator};
use crate::{
    analysis::Move,
    prng::SeededRandom,
    scene::{
        LabelPrimitive, MarkerPrimitive, MarkerRole, Material, Point3, Scene, ScenePrimitive,
    },
};

const CRUX_THICKNESS: f64 = 1.5;
const LABEL_OFFSET: f64 = 0.15;

pub(super) fn build<R: SeededRandom>(
    generator: &GeometryGenerator<'_, R>,
    moves: &[Move],
    scene: &mut Scene,
) {
    let settings = generator.settings;
    let base = settings.scaled_base_radius().max(0.0);
    let reach = settings.ring_spacing * settings.ring_count as f64 * settings.radius_multiplier;

    for m in moves {
        let role = if m.is_start() {
            MarkerRole::Start
        } else if m.is_crux {
            MarkerRole::Crux
        } else {
            MarkerRole::Move
        };

        let emphasis = enhance(m.intensity);
        let mut length = reach * (0.3 + 0.7 * emphasis.min(1.0));
        let mut thickness = settings.tube_radius * (1.5 + 3.0 * emphasis);
        if role == MarkerRole::Crux {
            length *= 1.0 + 0.2 * settings.crux_emphasis;
            thickness *= CRUX_THICKNESS;
        }

        let angle = move_angle(m.index, moves.len());
        let (sin, cos) = angle.sin_cos();
        let from: Point3 = [base * cos, base * sin, 0.0];
        let to: Point3 = [(base + length) * cos, (base + length) * sin, 0.0];

        if !(is_finite_point(&from) && is_finite_point(&to) && thickness.is_finite()) {
            warn!(move_index = m.index, "skipping marker with non-finite geometry");
            continue;
        }

        if settings.show_move_markers {
            scene.push(ScenePrimitive::Marker(MarkerPrimitive {
                move_index: m.index,
                role,
                from,
                to,
                thickness,
                emphasis,
                material: Material {
                    color: role.color(),
                    opacity: generator.materials.marker_opacity(emphasis),
                },
            }));
        }

        if settings.show_labels {
            let label_radius = base + length + LABEL_OFFSET * settings.radius_multiplier;
            scene.push(ScenePrimitive::Label(LabelPrimitive {
                move_index: m.index,
                position: [label_radius * cos, label_radius * sin, 0.0],
                text: label_text(m, role),
                material: Material {
                    color: role.color(),
                    opacity: generator.materials.marker_opacity(1.0),
                },
            }));
        }
    }
}

fn label_text(m: &Move, role: MarkerRole) -> String {
    match role {
        MarkerRole::Start => "Start".to_string(),
        MarkerRole::Crux => format!("M{} crux", m.index),
        MarkerRole::Move => format!("M{}", m.index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        geometry::{tests::moves, GenerationContext},
        VisualizerSettings,
    };

    fn markers(settings: &VisualizerSettings, moves: &[Move]) -> Vec<MarkerPrimitive> {
        GeometryGenerator::new(settings)
            .generate(moves, &[], &GenerationContext::default())
            .into_primitives()
            .into_iter()
            .filter_map(|p| match p {
                ScenePrimitive::Marker(marker) => Some(marker),
                _ => None,
            })
            .collect()
    }

    fn length(marker: &MarkerPrimitive) -> f64 {
        let d: Vec<f64> = (0..3).map(|i| marker.to[i] - marker.from[i]).collect();
        (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt()
    }

    #[test]
    fn markers_are_colored_by_role() {
        let settings = VisualizerSettings::default();
        let markers = markers(&settings, &moves(&[(0.0, false), (0.9, true), (0.4, false)]));

        assert_eq!(markers[0].role, MarkerRole::Start);
        assert_eq!(markers[1].role, MarkerRole::Crux);
        assert_eq!(markers[2].role, MarkerRole::Move);
        assert_eq!(markers[1].material.color, MarkerRole::Crux.color());
        assert_ne!(markers[0].material.color, markers[2].material.color);
    }

    #[test]
    fn start_marker_points_to_twelve_o_clock() {
        let settings = VisualizerSettings::default();
        let markers = markers(&settings, &moves(&[(0.0, false), (0.5, false)]));
        assert!(markers[0].from[0].abs() < 1e-12);
        assert!((markers[0].from[1] - settings.scaled_base_radius()).abs() < 1e-12);
    }

    #[test]
    fn intense_and_crux_moves_get_longer_thicker_markers() {
        let settings = VisualizerSettings::default();
        let markers = markers(
            &settings,
            &moves(&[(0.0, false), (0.2, false), (0.8, false), (0.8, true)]),
        );
        assert!(length(&markers[2]) > length(&markers[1]));
        assert!(markers[2].thickness > markers[1].thickness);
        assert!(length(&markers[3]) > length(&markers[2]));
        assert!(markers[3].thickness > markers[2].thickness);
    }

    #[test]
    fn labels_follow_marker_tips() {
        let settings = VisualizerSettings {
            show_move_markers: false,
            show_labels: true,
            ..Default::default()
        };
        let scene = GeometryGenerator::new(&settings).generate(
            &moves(&[(0.0, false), (0.9, true)]),
            &[],
            &GenerationContext::default(),
        );
        let labels: Vec<&LabelPrimitive> = scene
            .primitives()
            .iter()
            .filter_map(|p| match p {
                ScenePrimitive::Label(label) => Some(label),
                _ => None,
            })
            .collect();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].text, "Start");
        assert_eq!(labels[1].text, "M1 crux");
    }
}
