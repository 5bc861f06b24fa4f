/// Millisecond timestamp on the page's monotonic clock (`performance.now()`
/// or the value handed to an animation-frame callback).
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
pub struct TimestampMs(pub f64);

impl TimestampMs {
    /// Milliseconds elapsed since `earlier`, never negative.
    pub fn since(self, earlier: TimestampMs) -> f64 {
        (self.0 - earlier.0).max(0.0)
    }
}
