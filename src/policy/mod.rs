//! Alert policy: a pure function of the current usage against the cap.

/// What the monitor should do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertAction {
    None,
    /// Send the approaching-limit warning (once per month).
    Warn,
    /// Cap met or exceeded: persist, notify, stop. Fires on every
    /// evaluation once true so a failed shutdown can be retried.
    ExceededStop,
}

/// `alarm_ratio` is a fraction in (0, 1]; at >= 1 the warning coincides
/// with the exceeded action and never fires separately.
pub fn evaluate(used_bytes: u64, cap_bytes: u64, alarm_ratio: f64, alert_sent: bool) -> AlertAction {
    if used_bytes >= cap_bytes {
        return AlertAction::ExceededStop;
    }
    if !alert_sent && used_bytes >= warn_threshold(cap_bytes, alarm_ratio) {
        return AlertAction::Warn;
    }
    AlertAction::None
}

pub fn warn_threshold(cap_bytes: u64, alarm_ratio: f64) -> u64 {
    (cap_bytes as f64 * alarm_ratio) as u64
}
