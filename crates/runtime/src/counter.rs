use foundation::format::group_thousands;
use foundation::time::TimestampMs;

pub const DEFAULT_DURATION_MS: f64 = 2000.0;
pub const DEFAULT_VISIBILITY_THRESHOLD: f64 = 0.3;

/// Quartic ease-out: fast start, slow settle.
pub fn ease_out_quart(progress: f64) -> f64 {
    let p = progress.clamp(0.0, 1.0);
    1.0 - (1.0 - p).powi(4)
}

/// What a statistic widget counts up to and how it is decorated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterSpec {
    pub target: i64,
    pub prefix: String,
    pub suffix: String,
}

impl CounterSpec {
    /// Reads the widget attributes. The target is parsed like `parseInt`:
    /// leading whitespace, optional sign, then as many digits as are present.
    pub fn from_attributes(
        target: &str,
        prefix: Option<String>,
        suffix: Option<String>,
    ) -> Option<Self> {
        Some(Self {
            target: parse_leading_int(target)?,
            prefix: prefix.unwrap_or_default(),
            suffix: suffix.unwrap_or_default(),
        })
    }

    pub fn render(&self, value: i64) -> String {
        format!("{}{}{}", self.prefix, group_thousands(value), self.suffix)
    }
}

fn parse_leading_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }
    let magnitude: i64 = rest[..digits_len].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum CounterPhase {
    Pending,
    Animating { started: TimestampMs },
    Settled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CounterFrame {
    pub text: String,
    pub done: bool,
}

/// One-shot count-up animation: `Pending -> Animating -> Settled`.
///
/// Once settled the counter ignores further visibility changes.
#[derive(Debug, Clone)]
pub struct Counter {
    spec: CounterSpec,
    duration_ms: f64,
    threshold: f64,
    phase: CounterPhase,
}

impl Counter {
    pub fn new(spec: CounterSpec, duration_ms: f64, threshold: f64) -> Self {
        Self {
            spec,
            duration_ms,
            threshold,
            phase: CounterPhase::Pending,
        }
    }

    pub fn spec(&self) -> &CounterSpec {
        &self.spec
    }

    pub fn phase(&self) -> CounterPhase {
        self.phase
    }

    /// Feeds one intersection report. Returns `true` if this report started
    /// the animation.
    pub fn observe(&mut self, intersecting: bool, ratio: f64, now: TimestampMs) -> bool {
        if self.phase != CounterPhase::Pending || !intersecting || ratio < self.threshold {
            return false;
        }
        self.phase = CounterPhase::Animating { started: now };
        true
    }

    /// Produces the text for the frame at `now`, or `None` when not animating.
    ///
    /// The last frame always shows the exact target.
    pub fn tick(&mut self, now: TimestampMs) -> Option<CounterFrame> {
        let CounterPhase::Animating { started } = self.phase else {
            return None;
        };

        let progress = if self.duration_ms > 0.0 {
            (now.since(started) / self.duration_ms).min(1.0)
        } else {
            1.0
        };

        if progress >= 1.0 {
            self.phase = CounterPhase::Settled;
            return Some(CounterFrame {
                text: self.spec.render(self.spec.target),
                done: true,
            });
        }

        let value = (ease_out_quart(progress) * self.spec.target as f64).floor() as i64;
        Some(CounterFrame {
            text: self.spec.render(value),
            done: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter(target: &str) -> Counter {
        let spec = CounterSpec::from_attributes(target, Some("£".into()), Some("+".into()))
            .expect("numeric target");
        Counter::new(spec, DEFAULT_DURATION_MS, DEFAULT_VISIBILITY_THRESHOLD)
    }

    #[test]
    fn easing_endpoints() {
        assert_eq!(ease_out_quart(0.0), 0.0);
        assert_eq!(ease_out_quart(1.0), 1.0);
        assert_eq!(ease_out_quart(0.5), 0.9375);
        assert_eq!(ease_out_quart(7.0), 1.0);
    }

    #[test]
    fn parses_like_parse_int() {
        assert_eq!(parse_leading_int(" 1234.9"), Some(1234));
        assert_eq!(parse_leading_int("-42px"), Some(-42));
        assert_eq!(parse_leading_int("abc"), None);
        assert_eq!(parse_leading_int(""), None);
    }

    #[test]
    fn ignores_reports_below_threshold() {
        let mut c = counter("1234");
        assert!(!c.observe(true, 0.1, TimestampMs(0.0)));
        assert!(!c.observe(false, 0.9, TimestampMs(0.0)));
        assert_eq!(c.phase(), CounterPhase::Pending);
        assert!(c.tick(TimestampMs(10.0)).is_none());
    }

    #[test]
    fn settles_on_exact_grouped_target() {
        let mut c = counter("1234");
        assert!(c.observe(true, 0.3, TimestampMs(100.0)));

        let mid = c.tick(TimestampMs(1100.0)).expect("animating");
        assert!(!mid.done);
        assert_eq!(mid.text, "£1,156+");

        let last = c.tick(TimestampMs(2100.0)).expect("final frame");
        assert!(last.done);
        assert_eq!(last.text, "£1,234+");
        assert_eq!(c.phase(), CounterPhase::Settled);
    }

    #[test]
    fn settled_counter_does_not_restart() {
        let mut c = counter("1234");
        c.observe(true, 1.0, TimestampMs(0.0));
        c.tick(TimestampMs(5000.0));

        assert!(!c.observe(true, 1.0, TimestampMs(6000.0)));
        assert_eq!(c.phase(), CounterPhase::Settled);
        assert!(c.tick(TimestampMs(6500.0)).is_none());
    }

    #[test]
    fn frames_never_overshoot() {
        let mut c = counter("1000");
        c.observe(true, 0.5, TimestampMs(0.0));
        let mut last = -1;
        for t in (0..2000).step_by(100) {
            let frame = c.tick(TimestampMs(t as f64)).expect("animating");
            let digits: String = frame.text.chars().filter(char::is_ascii_digit).collect();
            let value: i64 = digits.parse().unwrap();
            assert!(value >= last && value <= 1000);
            last = value;
        }
    }
}
