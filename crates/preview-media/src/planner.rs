//! Time-based sample planning.
//!
//! Windows are spread evenly over `[0, duration)`: window `i` starts at
//! `i * duration / count`, pulled back so it ends inside the video. When the
//! source is no longer than one sample the whole video becomes a single
//! window. When the samples do not fit side by side they overlap; none are
//! dropped.

use preview_models::SampleWindow;

use crate::error::{MediaError, MediaResult};

/// Plan `sample_count` windows of `sample_duration` seconds over a video of
/// `duration` seconds.
///
/// The plan is a pure function of its inputs.
pub fn plan_samples(
    duration: f64,
    sample_count: u32,
    sample_duration: f64,
) -> MediaResult<Vec<SampleWindow>> {
    if !duration.is_finite() || duration <= 0.0 {
        return Err(MediaError::EmptySource);
    }
    if sample_count == 0 {
        return Err(MediaError::InvalidPlan(
            "sample count must be at least 1".to_string(),
        ));
    }
    if !sample_duration.is_finite() || sample_duration <= 0.0 {
        return Err(MediaError::InvalidPlan(format!(
            "sample duration must be positive, got {}",
            sample_duration
        )));
    }

    if duration <= sample_duration {
        return Ok(vec![SampleWindow::new(0, 0.0, duration)]);
    }

    let spacing = duration / sample_count as f64;
    let latest_start = duration - sample_duration;

    let windows = (0..sample_count)
        .map(|index| {
            let start = (index as f64 * spacing).min(latest_start);
            SampleWindow::new(index, start, fit_length(start, sample_duration, duration))
        })
        .collect();

    Ok(windows)
}

/// Largest length <= `wanted` with `start + length <= duration` in f64 arithmetic.
fn fit_length(start: f64, wanted: f64, duration: f64) -> f64 {
    let step = f64::EPSILON * duration.max(1.0);
    let mut length = wanted.min(duration - start);
    while start + length > duration {
        length -= step;
    }
    length
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_well_formed(windows: &[SampleWindow], duration: f64) {
        assert!(!windows.is_empty());
        for (i, window) in windows.iter().enumerate() {
            assert_eq!(window.index as usize, i);
            assert!(window.fits_within(duration), "{} outside [0, {}]", window, duration);
        }
        for pair in windows.windows(2) {
            assert!(pair[0].start <= pair[1].start);
        }
    }

    #[test]
    fn test_even_spacing() {
        let windows = plan_samples(100.0, 4, 2.0).unwrap();
        let starts: Vec<f64> = windows.iter().map(|w| w.start).collect();
        assert_eq!(windows.len(), 4);
        for (actual, expected) in starts.iter().zip([0.0, 25.0, 50.0, 75.0]) {
            assert!((actual - expected).abs() < 1e-9);
        }
        assert!(windows.iter().all(|w| (w.length - 2.0).abs() < 1e-9));
        assert_well_formed(&windows, 100.0);
    }

    #[test]
    fn test_no_overlap_when_samples_fit() {
        let windows = plan_samples(60.0, 6, 10.0).unwrap();
        for pair in windows.windows(2) {
            assert!(!pair[0].overlaps(&pair[1]));
        }
    }

    #[test]
    fn test_short_source_single_window() {
        let windows = plan_samples(1.5, 4, 2.0).unwrap();
        assert_eq!(windows, vec![SampleWindow::new(0, 0.0, 1.5)]);
    }

    #[test]
    fn test_source_equal_to_one_sample() {
        let windows = plan_samples(2.0, 4, 2.0).unwrap();
        assert_eq!(windows, vec![SampleWindow::new(0, 0.0, 2.0)]);
    }

    #[test]
    fn test_heavy_overlap_keeps_every_window() {
        let windows = plan_samples(10.0, 4, 5.0).unwrap();
        assert_eq!(windows.len(), 4);
        assert!((windows[3].start - 5.0).abs() < 1e-9);
        assert!(windows[1].overlaps(&windows[2]));
        assert_well_formed(&windows, 10.0);
    }

    #[test]
    fn test_last_window_clamped() {
        let windows = plan_samples(9.0, 3, 4.0).unwrap();
        // Unclamped starts would be 0, 3, 6; 6 + 4 > 9.
        assert!((windows[2].start - 5.0).abs() < 1e-9);
        assert!((windows[2].end() - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_sample() {
        let windows = plan_samples(30.0, 1, 3.0).unwrap();
        assert_eq!(windows, vec![SampleWindow::new(0, 0.0, 3.0)]);
    }

    #[test]
    fn test_invariants_across_inputs() {
        let durations = [0.04, 0.5, 1.0, 2.0, 7.3, 33.333, 100.0, 3600.5];
        let counts = [1, 2, 3, 4, 7, 16];
        let lengths = [0.1, 1.0, 2.0, 2.5, 10.0];

        for &duration in &durations {
            for &count in &counts {
                for &length in &lengths {
                    let windows = plan_samples(duration, count, length).unwrap();
                    assert_well_formed(&windows, duration);
                    if duration > length {
                        assert_eq!(windows.len(), count as usize);
                    } else {
                        assert_eq!(windows.len(), 1);
                    }
                }
            }
        }
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(
            plan_samples(123.4, 5, 1.7).unwrap(),
            plan_samples(123.4, 5, 1.7).unwrap()
        );
    }

    #[test]
    fn test_empty_source() {
        assert!(matches!(plan_samples(0.0, 4, 2.0), Err(MediaError::EmptySource)));
        assert!(matches!(plan_samples(f64::NAN, 4, 2.0), Err(MediaError::EmptySource)));
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(plan_samples(10.0, 0, 2.0), Err(MediaError::InvalidPlan(_))));
        assert!(matches!(plan_samples(10.0, 4, 0.0), Err(MediaError::InvalidPlan(_))));
    }
}
