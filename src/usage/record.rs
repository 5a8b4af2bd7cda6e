//! Counter accounting engine.
//!
//! Converts raw, reset-prone absolute interface counters into a byte-exact
//! running total for the current UTC month. The rules:
//!
//! - month change resets the record and re-baselines on the fresh sample,
//!   so the first tick of a new month never attributes a cross-month delta;
//! - only positive deltas accumulate; a counter reset (reboot, driver
//!   reload) or negative wrap shows up as a non-positive delta and is
//!   dropped, trading a bounded undercount for never overcounting;
//! - `last_total_bytes` is updated every tick, which is what makes resuming
//!   from a persisted record restart-safe.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Calendar month (UTC, 1-12) this record accounts for.
    pub month: u32,
    /// Bytes attributed to the current month.
    pub used_bytes: u64,
    /// Absolute counter observed at the previous tick; None before the
    /// first successful sample.
    pub last_total_bytes: Option<u64>,
    /// Warning already fired this month; cleared only on rollover.
    pub alert_sent: bool,
}

/// What a tick did to the record, for the caller's log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Month changed: usage reset, sample became the new baseline.
    Rollover,
    /// First sample ever: baseline recorded, nothing accumulated.
    Baseline,
    /// Normal tick; the payload is the delta actually applied (zero when
    /// the counter regressed).
    Accumulated(u64),
}

impl UsageRecord {
    pub fn new(month: u32) -> Self {
        Self {
            month,
            used_bytes: 0,
            last_total_bytes: None,
            alert_sent: false,
        }
    }

    /// Fold one absolute counter sample into the monthly total.
    pub fn tick(&mut self, sampled_total: u64, current_month: u32) -> TickOutcome {
        if self.month != current_month {
            self.month = current_month;
            self.used_bytes = 0;
            self.alert_sent = false;
            self.last_total_bytes = Some(sampled_total);
            return TickOutcome::Rollover;
        }

        let outcome = match self.last_total_bytes {
            None => TickOutcome::Baseline,
            Some(last) => {
                let delta = sampled_total.saturating_sub(last);
                self.used_bytes += delta;
                TickOutcome::Accumulated(delta)
            }
        };

        self.last_total_bytes = Some(sampled_total);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GB: u64 = 1024 * 1024 * 1024;

    #[test]
    fn test_first_sample_is_baseline_only() {
        let mut record = UsageRecord::new(3);
        let outcome = record.tick(5 * GB, 3);
        assert_eq!(outcome, TickOutcome::Baseline);
        assert_eq!(record.used_bytes, 0);
        assert_eq!(record.last_total_bytes, Some(5 * GB));
    }

    #[test]
    fn test_positive_deltas_accumulate() {
        let mut record = UsageRecord::new(3);
        record.tick(1000, 3);
        assert_eq!(record.tick(1500, 3), TickOutcome::Accumulated(500));
        assert_eq!(record.tick(2100, 3), TickOutcome::Accumulated(600));
        assert_eq!(record.used_bytes, 1100);
    }

    #[test]
    fn test_counter_reset_drops_delta() {
        let mut record = UsageRecord::new(3);
        record.tick(10_000, 3);
        record.tick(12_000, 3);
        // Reboot zeroed the counter: the regression adds nothing but the
        // new value still becomes the baseline.
        assert_eq!(record.tick(300, 3), TickOutcome::Accumulated(0));
        assert_eq!(record.used_bytes, 2_000);
        assert_eq!(record.last_total_bytes, Some(300));
        // Traffic after the reset counts from the new baseline.
        assert_eq!(record.tick(800, 3), TickOutcome::Accumulated(500));
        assert_eq!(record.used_bytes, 2_500);
    }

    #[test]
    fn test_equal_sample_adds_nothing() {
        let mut record = UsageRecord::new(7);
        record.tick(4_000, 7);
        assert_eq!(record.tick(4_000, 7), TickOutcome::Accumulated(0));
        assert_eq!(record.used_bytes, 0);
    }

    #[test]
    fn test_month_rollover_resets_wholesale() {
        let mut record = UsageRecord::new(3);
        record.tick(1000, 3);
        record.tick(9000, 3);
        record.alert_sent = true;
        assert_eq!(record.used_bytes, 8000);

        let outcome = record.tick(9500, 4);
        assert_eq!(outcome, TickOutcome::Rollover);
        assert_eq!(record.month, 4);
        assert_eq!(record.used_bytes, 0);
        assert!(!record.alert_sent);
        assert_eq!(record.last_total_bytes, Some(9500));

        // The rollover tick applied no delta; the next one does.
        assert_eq!(record.tick(9800, 4), TickOutcome::Accumulated(300));
        assert_eq!(record.used_bytes, 300);
    }

    #[test]
    fn test_restart_resume_matches_uninterrupted_run() {
        let samples = [1000u64, 2500, 2500, 9000, 400, 1400, 50_000];

        let mut uninterrupted = UsageRecord::new(5);
        for s in samples {
            uninterrupted.tick(s, 5);
        }

        // Stop after tick 3, "persist", resume with the same record.
        let mut first_half = UsageRecord::new(5);
        for s in &samples[..3] {
            first_half.tick(*s, 5);
        }
        let serialized = serde_json::to_string(&first_half).unwrap();
        let mut resumed: UsageRecord = serde_json::from_str(&serialized).unwrap();
        for s in &samples[3..] {
            resumed.tick(*s, 5);
        }

        assert_eq!(resumed.used_bytes, uninterrupted.used_bytes);
        assert_eq!(resumed.last_total_bytes, uninterrupted.last_total_bytes);
    }
}
