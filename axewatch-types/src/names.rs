//! Human-readable labels for the metrics a BitAxe reports.
//!
//! The table is for presentation only; nothing in the polling engine
//! depends on it.

/// Metric keys with a known display name, with their labels.
pub const KNOWN_METRICS: &[(&str, &str)] = &[
    ("power", "Power Consumption"),
    ("temp", "Temperature"),
    ("hashRate", "Hash Rate"),
    ("bestDiff", "All-Time Best Difficulty"),
    ("bestSessionDiff", "Best Difficulty Since System Boot"),
    ("sharesAccepted", "Shares Accepted"),
    ("sharesRejected", "Shares Rejected"),
    ("fanspeed", "Fan Speed"),
    ("fanrpm", "Fan RPM"),
    ("uptimeSeconds", "Uptime"),
];

/// Look up the display name for a metric key.
pub fn display_name(key: &str) -> Option<&'static str> {
    KNOWN_METRICS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, label)| *label)
}

/// Display name for a metric key, falling back to the key itself.
pub fn label(key: &str) -> &str {
    display_name(key).unwrap_or(key)
}
