//! Frame rate tracking
//!
//! `RateMonitor` counts arrivals in fixed windows on the relay side and logs
//! the observed throughput. `FrameRateWindow` keeps a sliding window of
//! inter-frame intervals for the capture side.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Default window after which the relay reports a camera's frame rate
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// Default number of samples in a `FrameRateWindow`
pub const DEFAULT_WINDOW_SIZE: usize = 30;

/// Windowed arrival counter for one camera
#[derive(Debug, Clone)]
pub struct RateMonitor {
    /// Arrivals since the window started
    count: u64,
    /// Start of the current window
    window_start: Instant,
    /// Window length
    interval: Duration,
    /// Most recently reported rate
    last_fps: Option<f64>,
}

impl RateMonitor {
    /// Create a monitor with the default 5 second window
    pub fn new() -> Self {
        Self::with_interval(DEFAULT_REPORT_INTERVAL)
    }

    /// Create a monitor with a custom window length
    pub fn with_interval(interval: Duration) -> Self {
        Self::starting_at(interval, Instant::now())
    }

    /// Create a monitor whose first window starts at `start`
    pub fn starting_at(interval: Duration, start: Instant) -> Self {
        Self {
            count: 0,
            window_start: start,
            interval,
            last_fps: None,
        }
    }

    /// Count one frame arrival in the current window
    pub fn record_arrival(&mut self) {
        self.count += 1;
    }

    /// Arrivals counted in the current window
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Rate computed at the last report, if any
    pub fn last_fps(&self) -> Option<f64> {
        self.last_fps
    }

    /// Report the frame rate if the window has elapsed
    ///
    /// The observation is logged; the returned value is informational only.
    pub fn maybe_report(&mut self, camera: &str) -> Option<f64> {
        self.maybe_report_at(camera, Instant::now())
    }

    /// Same as [`maybe_report`](Self::maybe_report) with an explicit clock
    pub fn maybe_report_at(&mut self, camera: &str, now: Instant) -> Option<f64> {
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.interval || elapsed.is_zero() {
            return None;
        }

        let fps = self.count as f64 / elapsed.as_secs_f64();
        tracing::info!(
            camera = camera,
            fps = (fps * 10.0).round() / 10.0,
            frames = self.count,
            window_secs = elapsed.as_secs_f64(),
            "Ingest frame rate"
        );

        self.count = 0;
        self.window_start = now;
        self.last_fps = Some(fps);
        Some(fps)
    }
}

impl Default for RateMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Sliding window of frame intervals
///
/// Reports the mean rate over the last `capacity` frames.
#[derive(Debug, Clone)]
pub struct FrameRateWindow {
    intervals: VecDeque<Duration>,
    capacity: usize,
    last_frame: Option<Instant>,
}

impl FrameRateWindow {
    /// Create a window over the last `capacity` intervals
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            intervals: VecDeque::with_capacity(capacity),
            capacity,
            last_frame: None,
        }
    }

    /// Record a frame at the current time
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// Record a frame at `now`
    pub fn tick_at(&mut self, now: Instant) {
        if let Some(last) = self.last_frame {
            if self.intervals.len() == self.capacity {
                self.intervals.pop_front();
            }
            self.intervals.push_back(now.saturating_duration_since(last));
        }
        self.last_frame = Some(now);
    }

    /// Mean frame rate over the window, 0 when there are no samples
    pub fn fps(&self) -> f64 {
        let total: Duration = self.intervals.iter().sum();
        if total.is_zero() {
            0.0
        } else {
            self.intervals.len() as f64 / total.as_secs_f64()
        }
    }

    /// Number of intervals in the window
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    /// Whether no intervals have been recorded
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }
}

impl Default for FrameRateWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_after_window() {
        let start = Instant::now();
        let mut monitor = RateMonitor::starting_at(Duration::from_secs(5), start);

        for _ in 0..60 {
            monitor.record_arrival();
        }

        let fps = monitor
            .maybe_report_at("cam1", start + Duration::from_secs(5))
            .unwrap();
        assert!((fps - 12.0).abs() < f64::EPSILON);

        // Window was reset
        assert_eq!(monitor.count(), 0);
        assert_eq!(monitor.last_fps(), Some(fps));
        assert!(monitor
            .maybe_report_at("cam1", start + Duration::from_secs(6))
            .is_none());
    }

    #[test]
    fn test_no_report_before_window() {
        let start = Instant::now();
        let mut monitor = RateMonitor::starting_at(Duration::from_secs(5), start);
        monitor.record_arrival();

        assert!(monitor
            .maybe_report_at("cam1", start + Duration::from_millis(4999))
            .is_none());
        assert_eq!(monitor.count(), 1);
        assert!(monitor.last_fps().is_none());
    }

    #[test]
    fn test_count_is_monotonic_within_window() {
        let mut monitor = RateMonitor::new();
        let mut previous = 0;
        for _ in 0..10 {
            monitor.record_arrival();
            assert!(monitor.count() > previous);
            previous = monitor.count();
        }
    }

    #[test]
    fn test_rate_window_fps() {
        let start = Instant::now();
        let mut window = FrameRateWindow::new(30);
        assert_eq!(window.fps(), 0.0);

        for i in 0..11 {
            window.tick_at(start + Duration::from_millis(100 * i));
        }

        assert_eq!(window.len(), 10);
        assert!((window.fps() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_rate_window_is_bounded() {
        let start = Instant::now();
        let mut window = FrameRateWindow::new(3);

        for i in 0..10 {
            window.tick_at(start + Duration::from_millis(50 * i));
        }

        assert_eq!(window.len(), 3);
        assert!((window.fps() - 20.0).abs() < 1e-9);
    }
}
