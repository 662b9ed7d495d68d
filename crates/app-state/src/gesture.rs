//! Pointer gesture tracking
//!
//! Converts the stream of pointer-move samples delivered during a drag into
//! the two numbers the sheet controller decides on at release: total
//! vertical travel and release velocity. Velocity is a finite difference of
//! the last two samples rather than a whole-gesture average, so a slow drag
//! that ends in a quick flick still reads as a flick.

/// A single pointer-move sample
///
/// `dy` is the cumulative vertical delta since the gesture started
/// (positive = downward); `timestamp_ms` is the platform timestamp of the
/// sample in milliseconds. Platform timestamps are not guaranteed to be
/// monotonic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    /// Cumulative vertical delta since gesture start
    pub dy: f64,
    /// Platform timestamp in milliseconds
    pub timestamp_ms: f64,
}

impl PointerSample {
    /// Create a sample
    pub fn new(dy: f64, timestamp_ms: f64) -> Self {
        Self { dy, timestamp_ms }
    }
}

/// Summary of a finished gesture
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GestureEnd {
    /// Total vertical travel (positive = downward)
    pub total_dy: f64,
    /// Velocity at release in px/s (positive = downward)
    pub velocity_y: f64,
}

/// Accumulates pointer samples for one gesture
///
/// Pure value type: no timers, no side effects. Feed it samples with
/// [`push`](GestureTracker::push) and call
/// [`release`](GestureTracker::release) when the pointer lifts.
#[derive(Debug, Default)]
pub struct GestureTracker {
    current: Option<PointerSample>,
    last_velocity: f64,
}

impl GestureTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pointer-move sample
    ///
    /// Non-finite deltas are treated as zero travel; sample pairs with
    /// `dt <= 0` keep the previous non-degenerate velocity estimate.
    pub fn push(&mut self, sample: PointerSample) {
        let dy = if sample.dy.is_finite() {
            sample.dy
        } else {
            tracing::debug!("non-finite gesture delta treated as 0");
            0.0
        };
        let sample = PointerSample::new(dy, sample.timestamp_ms);

        if let Some(previous) = self.current {
            let dt = sample.timestamp_ms - previous.timestamp_ms;
            if dt > 0.0 && dt.is_finite() {
                self.last_velocity = (sample.dy - previous.dy) / dt * 1000.0;
            }
        }

        self.current = Some(sample);
    }

    /// Finish the gesture, yielding total travel and release velocity
    ///
    /// Resets the tracker so it can be reused for the next gesture.
    pub fn release(&mut self) -> GestureEnd {
        let end = GestureEnd {
            total_dy: self.current.map(|s| s.dy).unwrap_or(0.0),
            velocity_y: self.last_velocity,
        };
        self.reset();
        end
    }

    /// Discard any accumulated samples
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_without_samples_is_zero() {
        let mut tracker = GestureTracker::new();
        assert_eq!(tracker.release(), GestureEnd::default());
    }

    #[test]
    fn test_velocity_from_last_two_samples() {
        let mut tracker = GestureTracker::new();
        // Slow drag: 100 px over 1 s...
        tracker.push(PointerSample::new(0.0, 0.0));
        tracker.push(PointerSample::new(100.0, 1000.0));
        // ...ending in a flick: 60 px in the last 16 ms.
        tracker.push(PointerSample::new(160.0, 1016.0));

        let end = tracker.release();
        assert_eq!(end.total_dy, 160.0);
        assert!((end.velocity_y - 3750.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_dt_reuses_previous_velocity() {
        let mut tracker = GestureTracker::new();
        tracker.push(PointerSample::new(0.0, 0.0));
        tracker.push(PointerSample::new(50.0, 100.0)); // 500 px/s
        tracker.push(PointerSample::new(80.0, 100.0)); // duplicate timestamp

        let end = tracker.release();
        assert_eq!(end.total_dy, 80.0);
        assert_eq!(end.velocity_y, 500.0);
    }

    #[test]
    fn test_backwards_timestamp_reuses_previous_velocity() {
        let mut tracker = GestureTracker::new();
        tracker.push(PointerSample::new(0.0, 0.0));
        tracker.push(PointerSample::new(50.0, 100.0)); // 500 px/s
        tracker.push(PointerSample::new(90.0, 60.0)); // clock went backwards

        assert_eq!(tracker.release().velocity_y, 500.0);
    }

    #[test]
    fn test_nan_delta_recovers_to_zero() {
        let mut tracker = GestureTracker::new();
        tracker.push(PointerSample::new(f64::NAN, 0.0));
        tracker.push(PointerSample::new(40.0, 100.0));

        let end = tracker.release();
        assert_eq!(end.total_dy, 40.0);
        assert_eq!(end.velocity_y, 400.0);
    }

    #[test]
    fn test_single_sample_has_no_velocity() {
        let mut tracker = GestureTracker::new();
        tracker.push(PointerSample::new(30.0, 50.0));

        let end = tracker.release();
        assert_eq!(end.total_dy, 30.0);
        assert_eq!(end.velocity_y, 0.0);
    }

    #[test]
    fn test_release_resets_for_next_gesture() {
        let mut tracker = GestureTracker::new();
        tracker.push(PointerSample::new(0.0, 0.0));
        tracker.push(PointerSample::new(100.0, 100.0));
        tracker.release();

        tracker.push(PointerSample::new(10.0, 200.0));
        let end = tracker.release();
        assert_eq!(end.total_dy, 10.0);
        assert_eq!(end.velocity_y, 0.0);
    }

    #[test]
    fn test_upward_gesture_has_negative_velocity() {
        let mut tracker = GestureTracker::new();
        tracker.push(PointerSample::new(0.0, 0.0));
        tracker.push(PointerSample::new(-120.0, 100.0));

        let end = tracker.release();
        assert_eq!(end.total_dy, -120.0);
        assert_eq!(end.velocity_y, -1200.0);
    }
}
