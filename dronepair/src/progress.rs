//! Dataset generation progress tracking.
//!
//! Watches a growing item count (typically the number of files in an output
//! folder) and reports throughput and an ETA each time it increases.

use std::fmt;
use std::time::{Duration, Instant};

/// Formats a duration with its two most significant units.
///
/// ```
/// use std::time::Duration;
/// use dronepair::progress::format_duration;
///
/// assert_eq!(format_duration(Duration::from_secs(42)), "42s");
/// assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
/// assert_eq!(format_duration(Duration::from_secs(7_380)), "2h 3m");
/// assert_eq!(format_duration(Duration::from_secs(93_600)), "1d 2h");
/// ```
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3_600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86_400 {
        format!("{}h {}m", secs / 3_600, (secs % 3_600) / 60)
    } else {
        format!("{}d {}h", secs / 86_400, (secs % 86_400) / 3_600)
    }
}

/// One progress line.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressReport {
    pub current: usize,
    pub target: usize,
    pub elapsed: Duration,
    pub eta: Duration,
    /// Average time per item produced since tracking started.
    pub avg_per_item: Duration,
}

impl ProgressReport {
    /// Fraction of the target reached, capped at 1.
    pub fn fraction(&self) -> f64 {
        if self.target == 0 {
            1.0
        } else {
            (self.current as f64 / self.target as f64).min(1.0)
        }
    }
}

impl fmt::Display for ProgressReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} items | Elapsed: {} | ETA: {} | Avg: {:.2}s/item",
            self.current,
            self.target,
            format_duration(self.elapsed),
            format_duration(self.eta),
            self.avg_per_item.as_secs_f64()
        )
    }
}

/// Turns count observations into [`ProgressReport`]s.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    start_count: usize,
    last_count: usize,
    target: usize,
    started_at: Instant,
}

impl ProgressTracker {
    pub fn new(start_count: usize, target: usize, now: Instant) -> Self {
        Self {
            start_count,
            last_count: start_count,
            target,
            started_at: now,
        }
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn last_count(&self) -> usize {
        self.last_count
    }

    /// Records `count` and reports when it grew since the last report.
    pub fn observe(&mut self, count: usize, now: Instant) -> Option<ProgressReport> {
        if count <= self.last_count {
            return None;
        }
        self.last_count = count;

        let produced = count.saturating_sub(self.start_count);
        let elapsed = now.saturating_duration_since(self.started_at);
        let avg_per_item = if produced == 0 {
            Duration::ZERO
        } else {
            elapsed.div_f64(produced as f64)
        };
        let remaining = self.target.saturating_sub(count);

        Some(ProgressReport {
            current: count,
            target: self.target,
            elapsed,
            eta: avg_per_item.mul_f64(remaining as f64),
            avg_per_item,
        })
    }

    pub fn is_complete(&self, count: usize) -> bool {
        count >= self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration_boundaries() {
        assert_eq!(format_duration(Duration::ZERO), "0s");
        assert_eq!(format_duration(Duration::from_millis(59_900)), "59s");
        assert_eq!(format_duration(Duration::from_secs(60)), "1m 0s");
        assert_eq!(format_duration(Duration::from_secs(3_599)), "59m 59s");
        assert_eq!(format_duration(Duration::from_secs(3_600)), "1h 0m");
        assert_eq!(format_duration(Duration::from_secs(86_399)), "23h 59m");
        assert_eq!(format_duration(Duration::from_secs(86_400)), "1d 0h");
        assert_eq!(format_duration(Duration::from_secs(10 * 86_400 + 5 * 3_600)), "10d 5h");
    }

    #[test]
    fn test_no_report_without_growth() {
        let start = Instant::now();
        let mut tracker = ProgressTracker::new(5, 20, start);
        assert!(tracker.observe(5, start + Duration::from_secs(1)).is_none());
        assert!(tracker.observe(3, start + Duration::from_secs(2)).is_none());
    }

    #[test]
    fn test_eta_from_average() {
        let start = Instant::now();
        let mut tracker = ProgressTracker::new(0, 10, start);

        let report = tracker.observe(2, start + Duration::from_secs(20)).unwrap();
        assert_eq!(report.avg_per_item, Duration::from_secs(10));
        assert_eq!(report.eta, Duration::from_secs(80));
        assert_eq!(report.elapsed, Duration::from_secs(20));
        assert_eq!(
            report.to_string(),
            "2/10 items | Elapsed: 20s | ETA: 1m 20s | Avg: 10.00s/item"
        );
        assert!((report.fraction() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_average_counts_only_new_items() {
        let start = Instant::now();
        let mut tracker = ProgressTracker::new(100, 110, start);

        let report = tracker.observe(104, start + Duration::from_secs(8)).unwrap();
        assert_eq!(report.avg_per_item, Duration::from_secs(2));
        assert_eq!(report.eta, Duration::from_secs(12));
    }

    #[test]
    fn test_overshoot_has_zero_eta() {
        let start = Instant::now();
        let mut tracker = ProgressTracker::new(0, 3, start);

        let report = tracker.observe(5, start + Duration::from_secs(5)).unwrap();
        assert_eq!(report.eta, Duration::ZERO);
        assert_eq!(report.fraction(), 1.0);
        assert!(tracker.is_complete(5));
        assert!(!tracker.is_complete(2));
    }
}
