//! Periodic progress reporting for long sweeps.

/// Format a duration in milliseconds for log output.
pub fn format_duration(millis: u64) -> String {
    const SECOND: u64 = 1000;
    const MINUTE: u64 = 60 * SECOND;
    const HOUR: u64 = 60 * MINUTE;
    const DAY: u64 = 24 * HOUR;

    let as_unit = |unit: u64| millis as f64 / unit as f64;
    if millis < SECOND {
        format!("{} ms", millis)
    } else if millis < MINUTE {
        format!("{:.2} s", as_unit(SECOND))
    } else if millis < HOUR {
        format!("{:.2} min", as_unit(MINUTE))
    } else if millis < DAY {
        format!("{:.2} h", as_unit(HOUR))
    } else {
        format!("{:.2} d", as_unit(DAY))
    }
}

fn rate_per_minute(count: u64, elapsed: u64) -> u64 {
    if elapsed == 0 {
        0
    } else {
        count.saturating_mul(60_000) / elapsed
    }
}

/// Counts scanned documents and logs throughput at most once per interval.
#[derive(Debug)]
pub(crate) struct ProgressReporter {
    cluster_id: u32,
    interval_ms: u64,
    total_count: u64,
    last_count: u64,
    start_of_scan: u64,
    last_log: u64,
}

impl ProgressReporter {
    pub(crate) fn new(cluster_id: u32, interval_ms: u64, now: u64) -> Self {
        ProgressReporter {
            cluster_id,
            interval_ms,
            total_count: 0,
            last_count: 0,
            start_of_scan: now,
            last_log: now,
        }
    }

    /// Record one scanned document. Returns true if a progress line was
    /// logged.
    pub(crate) fn document_scanned(&mut self, now: u64) -> bool {
        self.total_count += 1;
        self.last_count += 1;

        let last_elapsed = now.saturating_sub(self.last_log);
        if last_elapsed < self.interval_ms {
            return false;
        }

        let total_elapsed = now.saturating_sub(self.start_of_scan);
        tracing::info!(
            "Sweep on cluster node [{}]: {} nodes scanned in {} (~{}/m) - last interval {} nodes in {} (~{}/m)",
            self.cluster_id,
            self.total_count,
            format_duration(total_elapsed),
            rate_per_minute(self.total_count, total_elapsed),
            self.last_count,
            format_duration(last_elapsed),
            rate_per_minute(self.last_count, last_elapsed),
        );
        self.last_log = now;
        self.last_count = 0;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(250), "250 ms");
        assert_eq!(format_duration(1500), "1.50 s");
        assert_eq!(format_duration(90_000), "1.50 min");
        assert_eq!(format_duration(2 * 3_600_000), "2.00 h");
        assert_eq!(format_duration(36 * 3_600_000), "1.50 d");
    }

    #[test]
    fn test_rate_per_minute() {
        assert_eq!(rate_per_minute(100, 60_000), 100);
        assert_eq!(rate_per_minute(100, 30_000), 200);
        assert_eq!(rate_per_minute(5, 0), 0);
    }

    #[test]
    fn test_reports_once_per_interval() {
        let mut progress = ProgressReporter::new(1, 60_000, 0);
        assert!(!progress.document_scanned(10_000));
        assert!(!progress.document_scanned(59_999));
        assert!(progress.document_scanned(60_000));
        assert!(!progress.document_scanned(61_000));
        assert!(progress.document_scanned(120_000));
        assert_eq!(progress.total_count, 5);
        assert_eq!(progress.last_count, 0);
    }
}
