use std::f64::consts::PI;

use realfft::RealFftPlanner;
use tracing::debug;

use super::{TracePoint, MIN_VALID_SAMPLES};
use crate::Result;

const FLAT_VARIANCE: f64 = 1e-12;

/// Dominant frequency (Hz) of the magnitude trace.
///
/// The trace is resampled onto a uniform grid at its mean sample interval,
/// centred, Hann-windowed and transformed. Returns `None` for short or
/// flat traces.
pub fn dominant_frequency(trace: &[TracePoint]) -> Result<Option<f64>> {
    let len = trace.len();
    if len < MIN_VALID_SAMPLES {
        return Ok(None);
    }

    let (first, last) = (trace[0].time, trace[len - 1].time);
    let dt = (last - first) / (len - 1) as f64;
    if !(dt.is_finite() && dt > 0.0) {
        return Ok(None);
    }

    let uniform = resample(trace, first, dt);
    let mean = uniform.iter().sum::<f64>() / len as f64;
    let variance = uniform.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / len as f64;
    if variance <= FLAT_VARIANCE {
        return Ok(None);
    }

    let mut planner = RealFftPlanner::<f64>::new();
    let plan = planner.plan_fft_forward(len);
    let mut input = plan.make_input_vec();
    let mut spectrum = plan.make_output_vec();
    let mut scratch = plan.make_scratch_vec();

    for (index, value) in uniform.iter().enumerate() {
        input[index] = (value - mean) * hann_value(index, len);
    }

    plan.process_with_scratch(&mut input, &mut spectrum, &mut scratch)?;

    let peak = spectrum
        .iter()
        .enumerate()
        .skip(1)
        .map(|(bin, value)| (bin, value.norm()))
        .fold(None, |best: Option<(usize, f64)>, (bin, magnitude)| match best {
            Some((_, best_magnitude)) if best_magnitude >= magnitude => best,
            _ => Some((bin, magnitude)),
        });

    match peak {
        Some((bin, magnitude)) if magnitude > f64::EPSILON => {
            let hz = bin as f64 / (len as f64 * dt);
            debug!(hz, "dominant movement rhythm");
            Ok(Some(hz))
        }
        _ => Ok(None),
    }
}

/// Linear interpolation of the trace onto `len` evenly spaced instants.
fn resample(trace: &[TracePoint], start: f64, dt: f64) -> Vec<f64> {
    let mut cursor = 0;
    (0..trace.len())
        .map(|i| {
            let t = start + i as f64 * dt;
            while cursor + 1 < trace.len() - 1 && trace[cursor + 1].time < t {
                cursor += 1;
            }
            let a = trace[cursor];
            let b = trace[(cursor + 1).min(trace.len() - 1)];
            let span = b.time - a.time;
            if span <= f64::EPSILON {
                a.magnitude
            } else {
                let s = ((t - a.time) / span).clamp(0.0, 1.0);
                a.magnitude + (b.magnitude - a.magnitude) * s
            }
        })
        .collect()
}

fn hann_value(index: usize, len: usize) -> f64 {
    if len <= 1 {
        return 1.0;
    }

    0.5 - 0.5 * ((2.0 * PI * index as f64) / (len as f64 - 1.0)).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace(hz: f64, count: usize, dt: f64) -> Vec<TracePoint> {
        (0..count)
            .map(|i| {
                let time = i as f64 * dt;
                TracePoint {
                    time,
                    magnitude: 10.0 + 3.0 * (2.0 * PI * hz * time).sin(),
                }
            })
            .collect()
    }

    #[test]
    fn finds_dominant_rhythm() {
        let hz = dominant_frequency(&trace(1.0, 500, 0.02)).unwrap().unwrap();
        assert!((hz - 1.0).abs() < 0.15);
    }

    #[test]
    fn flat_and_short_traces_have_no_rhythm() {
        let flat: Vec<TracePoint> = (0..64)
            .map(|i| TracePoint {
                time: i as f64 * 0.1,
                magnitude: 9.81,
            })
            .collect();
        assert_eq!(dominant_frequency(&flat).unwrap(), None);
        assert_eq!(dominant_frequency(&flat[..5]).unwrap(), None);
    }
}
