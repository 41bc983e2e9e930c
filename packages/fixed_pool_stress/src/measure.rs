use std::panic::Location;
use std::time::{Duration, Instant};

use tracing::info;

/// Measures the wall-clock time from creation until drop and logs it at `info` level, tagged
/// with a label and the source location that created the guard.
///
/// # Examples
///
/// ```
/// use fixed_pool_stress::Measure;
///
/// {
///     let _measure = Measure::new("allocate");
///     // Work to be timed.
/// }
/// // The elapsed time has been logged here.
/// ```
#[derive(Debug)]
#[must_use = "the measurement ends when the guard is dropped"]
pub struct Measure {
    label: &'static str,
    location: &'static Location<'static>,
    start: Instant,
}

impl Measure {
    /// Starts a measurement.
    #[track_caller]
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            location: Location::caller(),
            start: Instant::now(),
        }
    }

    /// Time elapsed since the measurement started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Measure {
    #[cfg_attr(test, mutants::skip)] // Only logs.
    fn drop(&mut self) {
        let elapsed = self.elapsed();

        info!(
            label = self.label,
            file = self.location.file(),
            line = self.location.line(),
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "measured"
        );
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::thread;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Measure: Send, Sync);

    #[test]
    fn records_creation_site() {
        let measure = Measure::new("here");

        assert_eq!(measure.label, "here");
        assert_eq!(measure.location.file(), file!());
    }

    #[test]
    fn elapsed_grows() {
        let measure = Measure::new("sleep");

        thread::sleep(Duration::from_millis(5));

        assert!(measure.elapsed() >= Duration::from_millis(5));
    }
}
