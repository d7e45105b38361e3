//! Signal normalisation and move detection.
//!
//! A raw accelerometer trace is reduced to a magnitude series, then scanned for
//! local maxima above a threshold. Each accepted peak becomes a [`Move`]; the
//! first entry is always a synthetic start move at `t = 0`.

mod rhythm;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{boulder::Sample, Result};

pub use rhythm::dominant_frequency;

/// Standard gravity, used as the resting magnitude baseline.
pub const GRAVITY: f64 = 9.81;
/// Below this many valid samples detection yields only the start move.
pub const MIN_VALID_SAMPLES: usize = 10;
/// Divisor mapping magnitude above gravity onto the `[0, 1]` intensity scale.
const INTENSITY_SCALE: f64 = 20.0;
const MIN_MOVE_INTENSITY: f64 = 0.1;
const CRUX_FACTOR: f64 = 1.5;
/// Half-width of the peak neighbourhood (two samples on each side).
const NEIGHBOURHOOD: usize = 2;

/// Finite point of the magnitude trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TracePoint {
    pub time: f64,
    pub magnitude: f64,
}

/// Minimum, maximum and mean magnitude observed while a move was active.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AccelerationRange {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

/// A detected climbing move. Created fresh on every detection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Move {
    pub index: usize,
    pub time: f64,
    pub end_time: f64,
    /// Normalised dynamics in `[0, 1]`; zero for the start move.
    pub intensity: f64,
    pub is_crux: bool,
    /// Raw peak magnitude that produced this move.
    pub magnitude: f64,
    pub acceleration_range: AccelerationRange,
}

impl Move {
    pub fn is_start(&self) -> bool {
        self.index == 0
    }
}

/// Parameters that drive [`MoveDetector`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionConfig {
    pub threshold: f64,
    pub min_move_duration: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            threshold: 12.0,
            min_move_duration: 0.3,
        }
    }
}

impl DetectionConfig {
    pub fn new(threshold: f64, min_move_duration: f64) -> Self {
        Self {
            threshold,
            min_move_duration,
        }
    }

    fn sanitised(self) -> Self {
        let defaults = Self::default();
        let threshold = if self.threshold.is_finite() && self.threshold > 0.0 {
            self.threshold
        } else {
            warn!(threshold = self.threshold, "invalid move threshold, using default");
            defaults.threshold
        };
        let min_move_duration = if self.min_move_duration.is_finite() {
            self.min_move_duration.max(0.0)
        } else {
            defaults.min_move_duration
        };
        Self {
            threshold,
            min_move_duration,
        }
    }
}

/// Drops non-finite samples and returns the time-ordered magnitude trace.
pub fn normalize(samples: &[Sample]) -> Vec<TracePoint> {
    let mut trace: Vec<TracePoint> = samples
        .iter()
        .filter(|sample| sample.is_finite())
        .map(|sample| TracePoint {
            time: sample.time,
            magnitude: sample.magnitude(),
        })
        .filter(|point| point.magnitude.is_finite())
        .collect();

    let dropped = samples.len() - trace.len();
    if dropped > 0 {
        debug!(dropped, "discarded non-finite samples");
    }

    if trace.windows(2).any(|pair| pair[1].time < pair[0].time) {
        debug!("sample trace out of order, sorting by time");
        trace.sort_by(|a, b| a.time.total_cmp(&b.time));
    }

    trace
}

/// Stateless peak detector. Identical input always yields identical moves.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveDetector {
    config: DetectionConfig,
}

impl MoveDetector {
    pub fn new(config: DetectionConfig) -> Self {
        Self {
            config: config.sanitised(),
        }
    }

    pub fn config(&self) -> DetectionConfig {
        self.config
    }

    pub fn detect(&self, samples: &[Sample]) -> Vec<Move> {
        let trace = normalize(samples);
        self.detect_trace(&trace)
    }

    pub fn detect_trace(&self, trace: &[TracePoint]) -> Vec<Move> {
        let start_magnitude = trace.first().map(|p| p.magnitude).unwrap_or(GRAVITY);
        let mut peaks = vec![TracePoint {
            time: 0.0,
            magnitude: start_magnitude,
        }];

        if trace.len() < MIN_VALID_SAMPLES {
            warn!(
                valid = trace.len(),
                required = MIN_VALID_SAMPLES,
                "too few valid samples for move detection"
            );
        } else {
            self.scan_peaks(trace, &mut peaks);
        }

        let moves = self.build_moves(trace, &peaks);
        debug!(moves = moves.len(), "move detection finished");
        moves
    }

    fn scan_peaks(&self, trace: &[TracePoint], peaks: &mut Vec<TracePoint>) {
        let DetectionConfig {
            threshold,
            min_move_duration,
        } = self.config;
        let mut last_time = 0.0;

        for i in NEIGHBOURHOOD..trace.len() - NEIGHBOURHOOD {
            let candidate = trace[i];
            if candidate.magnitude <= threshold {
                continue;
            }

            let is_local_max = (1..=NEIGHBOURHOOD).all(|offset| {
                candidate.magnitude > trace[i - offset].magnitude
                    && candidate.magnitude > trace[i + offset].magnitude
            });
            if !is_local_max {
                continue;
            }

            if candidate.time - last_time > min_move_duration {
                peaks.push(candidate);
                last_time = candidate.time;
            }
        }
    }

    fn build_moves(&self, trace: &[TracePoint], peaks: &[TracePoint]) -> Vec<Move> {
        let recording_end = trace.last().map(|p| p.time).unwrap_or(0.0);

        peaks
            .iter()
            .enumerate()
            .map(|(index, peak)| {
                let end_time = peaks
                    .get(index + 1)
                    .map(|next| next.time)
                    .unwrap_or(recording_end)
                    .max(peak.time);

                let (intensity, is_crux) = if index == 0 {
                    (0.0, false)
                } else {
                    (
                        intensity_for(peak.magnitude),
                        peak.magnitude > self.config.threshold * CRUX_FACTOR,
                    )
                };

                Move {
                    index,
                    time: peak.time,
                    end_time,
                    intensity,
                    is_crux,
                    magnitude: peak.magnitude,
                    acceleration_range: acceleration_range(
                        trace,
                        peak,
                        end_time,
                        index + 1 == peaks.len(),
                    ),
                }
            })
            .collect()
    }
}

/// Convenience wrapper around [`MoveDetector::detect`].
pub fn detect(samples: &[Sample], threshold: f64, min_move_duration: f64) -> Vec<Move> {
    MoveDetector::new(DetectionConfig::new(threshold, min_move_duration)).detect(samples)
}

fn intensity_for(magnitude: f64) -> f64 {
    ((magnitude - GRAVITY) / INTENSITY_SCALE).clamp(MIN_MOVE_INTENSITY, 1.0)
}

/// Magnitude statistics over `[peak.time, end_time)`. The final move keeps
/// its end sample so the window reaches the end of the recording.
fn acceleration_range(
    trace: &[TracePoint],
    peak: &TracePoint,
    end_time: f64,
    is_last: bool,
) -> AccelerationRange {
    let lo = trace.partition_point(|p| p.time < peak.time);
    let hi = if is_last {
        trace.partition_point(|p| p.time <= end_time)
    } else {
        trace.partition_point(|p| p.time < end_time)
    };
    let window: &[TracePoint] = if lo < hi { &trace[lo..hi] } else { &[] };

    if window.is_empty() {
        return AccelerationRange {
            min: peak.magnitude,
            max: peak.magnitude,
            avg: peak.magnitude,
        };
    }

    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    for point in window {
        min = min.min(point.magnitude);
        max = max.max(point.magnitude);
        sum += point.magnitude;
    }

    AccelerationRange {
        min,
        max,
        avg: sum / window.len() as f64,
    }
}

/// Statistics panel projection of a move list.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveSummary {
    /// Detected moves, excluding the synthetic start.
    pub move_count: usize,
    pub duration: f64,
    pub max_intensity: f64,
    pub avg_intensity: f64,
    pub crux_count: usize,
}

pub fn summarize(moves: &[Move]) -> MoveSummary {
    let real: Vec<&Move> = moves.iter().filter(|m| !m.is_start()).collect();
    let duration = match (moves.first(), moves.last()) {
        (Some(first), Some(last)) => (last.end_time - first.time).max(0.0),
        _ => 0.0,
    };

    let (max_intensity, avg_intensity) = if real.is_empty() {
        (0.0, 0.0)
    } else {
        let max = real.iter().map(|m| m.intensity).fold(0.0, f64::max);
        let sum: f64 = real.iter().map(|m| m.intensity).sum();
        (max, sum / real.len() as f64)
    };

    MoveSummary {
        move_count: real.len(),
        duration,
        max_intensity,
        avg_intensity,
        crux_count: real.iter().filter(|m| m.is_crux).count(),
    }
}

/// Everything the statistics side needs from one boulder recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub moves: Vec<Move>,
    pub summary: MoveSummary,
    /// Dominant movement rhythm of the magnitude trace.
    pub rhythm_hz: Option<f64>,
}

pub fn analyse(samples: &[Sample], config: DetectionConfig) -> Result<AnalysisReport> {
    let trace = normalize(samples);
    let moves = MoveDetector::new(config).detect_trace(&trace);
    let summary = summarize(&moves);
    let rhythm_hz = dominant_frequency(&trace)?;

    Ok(AnalysisReport {
        moves,
        summary,
        rhythm_hz,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prng::random_at;

    /// Baseline trace with gaussian bumps of the given heights.
    fn trace_with_peaks(count: usize, span: f64, peaks: &[(usize, f64)]) -> Vec<Sample> {
        let dt = span / count as f64;
        (0..count)
            .map(|i| {
                let magnitude = peaks.iter().fold(2.0_f64, |acc, &(center, height)| {
                    let d = i as f64 - center as f64;
                    acc.max(2.0 + (height - 2.0) * (-(d * d) / 18.0).exp())
                });
                Sample::new(i as f64 * dt, magnitude, 0.0, 0.0)
            })
            .collect()
    }

    #[test]
    fn detects_reference_scenario() {
        let samples = trace_with_peaks(200, 10.0, &[(40, 20.0), (90, 8.0), (150, 25.0)]);
        let moves = detect(&samples, 15.0, 0.5);

        assert_eq!(moves.len(), 3);
        assert_eq!(moves[0].time, 0.0);
        assert_eq!(moves[0].intensity, 0.0);
        assert!((moves[1].time - 2.0).abs() < 1e-9);
        assert!((moves[2].time - 7.5).abs() < 1e-9);
        assert!(!moves[1].is_crux);
        assert!(moves[2].is_crux);
        assert!((moves[1].intensity - (20.0 - GRAVITY) / 20.0).abs() < 1e-9);
        assert_eq!(moves[1].end_time, moves[2].time);
    }

    #[test]
    fn below_threshold_yields_only_start_move() {
        let samples = trace_with_peaks(100, 5.0, &[(30, 9.0), (60, 11.0)]);
        let moves = detect(&samples, 12.0, 0.3);
        assert_eq!(moves.len(), 1);
        assert!(moves[0].is_start());
    }

    #[test]
    fn empty_and_single_inputs_yield_start_move() {
        let empty = detect(&[], 12.0, 0.3);
        assert_eq!(empty.len(), 1);
        assert_eq!(empty[0].magnitude, GRAVITY);

        let single = detect(&[Sample::new(0.0, 0.0, 0.0, 9.0)], 12.0, 0.3);
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].magnitude, 9.0);
    }

    #[test]
    fn too_few_valid_samples_fail_soft() {
        let mut samples = trace_with_peaks(12, 1.2, &[(6, 30.0)]);
        samples[0].x = f64::NAN;
        samples[1].y = f64::INFINITY;
        samples[2].time = f64::NAN;

        let moves = detect(&samples, 12.0, 0.0);
        assert_eq!(moves.len(), 1);
    }

    #[test]
    fn non_finite_samples_are_discarded_before_scanning() {
        let mut samples = trace_with_peaks(100, 5.0, &[(50, 30.0)]);
        samples[49].x = f64::NAN;
        let trace = normalize(&samples);
        assert_eq!(trace.len(), 99);
        assert!(trace.iter().all(|p| p.magnitude.is_finite()));
    }

    #[test]
    fn hysteresis_rejects_peaks_inside_min_duration() {
        // Peaks 0.25 s apart; the second must be swallowed.
        let samples = trace_with_peaks(200, 10.0, &[(40, 20.0), (45, 22.0)]);
        let moves = detect(&samples, 15.0, 0.5);
        assert_eq!(moves.len(), 2);
        assert!((moves[1].time - 2.0).abs() < 1e-9);
    }

    #[test]
    fn crux_boundary_is_exclusive() {
        let samples = trace_with_peaks(100, 5.0, &[(50, 15.0)]);
        let moves = detect(&samples, 10.0, 0.3);
        assert_eq!(moves.len(), 2);
        assert_eq!(moves[1].magnitude, 15.0);
        assert!(!moves[1].is_crux);
    }

    #[test]
    fn randomised_traces_respect_detection_invariants() {
        for trial in 0..20 {
            let threshold = 12.0;
            let min_duration = 0.2 + trial as f64 * 0.02;
            let samples: Vec<Sample> = (0..300)
                .map(|i| {
                    let noise = random_at(trial as f64 * 1000.0 + i as f64);
                    Sample::new(i as f64 * 0.02, 5.0 + noise * 15.0, 0.0, 0.0)
                })
                .collect();

            let first = detect(&samples, threshold, min_duration);
            let second = detect(&samples, threshold, min_duration);
            assert_eq!(first, second);

            assert!(first[0].is_start());
            for pair in first.windows(2) {
                assert!(pair[1].time > pair[0].time);
                if !pair[0].is_start() {
                    assert!(pair[1].time - pair[0].time > min_duration);
                }
            }
            for m in first.iter().skip(1) {
                assert!(m.magnitude > threshold);
                assert_eq!(m.is_crux, m.magnitude > threshold * 1.5);
                assert!((0.1..=1.0).contains(&m.intensity));
            }
        }
    }

    #[test]
    fn acceleration_range_covers_move_window() {
        let samples = trace_with_peaks(200, 10.0, &[(40, 20.0), (150, 25.0)]);
        let moves = detect(&samples, 15.0, 0.5);
        let range = moves[1].acceleration_range;
        assert_eq!(range.max, 20.0);
        assert!(range.min <= range.avg && range.avg <= range.max);
    }

    #[test]
    fn acceleration_range_stops_before_next_move() {
        // Adjacent peaks with nothing in between: the next peak sample must
        // not leak into the previous move's window.
        let mut samples: Vec<Sample> = (0..40)
            .map(|i| Sample::new(i as f64 * 0.1, 2.0, 0.0, 0.0))
            .collect();
        samples[10].x = 20.0;
        samples[20].x = 25.0;
        let moves = detect(&samples, 15.0, 0.5);

        assert_eq!(moves.len(), 3);
        assert_eq!(moves[1].acceleration_range.max, 20.0);
        assert_eq!(moves[0].acceleration_range.max, 2.0);
        // The last move still covers the final sample.
        let last = moves[2].acceleration_range;
        assert_eq!(last.max, 25.0);
        assert_eq!(last.min, 2.0);
        assert!((last.avg - (25.0 + 19.0 * 2.0) / 20.0).abs() < 1e-12);
    }

    #[test]
    fn summary_projects_real_moves_only() {
        let samples = trace_with_peaks(200, 10.0, &[(40, 20.0), (150, 25.0)]);
        let moves = detect(&samples, 15.0, 0.5);
        let summary = summarize(&moves);

        assert_eq!(summary.move_count, 2);
        assert_eq!(summary.crux_count, 1);
        assert!((summary.max_intensity - moves[2].intensity).abs() < 1e-12);
        assert!(summary.duration > 9.0);

        let empty = summarize(&moves[..1]);
        assert_eq!(empty.move_count, 0);
        assert_eq!(empty.avg_intensity, 0.0);
    }

    #[test]
    fn analyse_reports_moves_and_rhythm() {
        let samples: Vec<Sample> = (0..400)
            .map(|i| {
                let t = i as f64 * 0.01;
                let magnitude = GRAVITY + 8.0 * (2.0 * std::f64::consts::PI * 2.5 * t).sin();
                Sample::new(t, magnitude, 0.0, 0.0)
            })
            .collect();

        let report = analyse(&samples, DetectionConfig::new(15.0, 0.3)).unwrap();
        assert!(report.summary.move_count >= 6);
        let rhythm = report.rhythm_hz.expect("rhythm should be detected");
        assert!((rhythm - 2.5).abs() < 0.3);
    }
}
