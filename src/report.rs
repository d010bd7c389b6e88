//! Rendering device state for the terminal.

use axewatch_sdk::{label, Coordinator, RefreshState, Snapshot, KNOWN_METRICS};
use serde_json::{json, Value};

/// Short availability label for a refresh state.
pub fn status(state: &RefreshState) -> &'static str {
    if state.last_success {
        "available"
    } else if state.is_stale() {
        "stale"
    } else {
        "unavailable"
    }
}

/// Human-readable lines for one device.
///
/// The first line is the device status; then one line per known metric in
/// display-table order, followed by every other key when `all` is set.
pub fn render_lines(device_id: &str, coordinator: &Coordinator, all: bool) -> Vec<String> {
    let state = coordinator.state();

    let mut header = format!(
        "[{}] {} ({})",
        device_id,
        status(&state),
        coordinator.endpoint()
    );
    if let Some(error) = &state.last_error {
        header.push_str(&format!(" - {}", error));
    }

    let mut lines = vec![header];
    if let Some(snapshot) = &state.last_snapshot {
        lines.extend(metric_lines(device_id, snapshot, all));
    }
    lines
}

fn metric_lines(device_id: &str, snapshot: &Snapshot, all: bool) -> Vec<String> {
    let known = KNOWN_METRICS
        .iter()
        .filter_map(|(key, name)| snapshot.get(key).map(|value| (*name, value)));

    let mut lines: Vec<String> = known
        .map(|(name, value)| format!("[{}]   {}: {}", device_id, name, value))
        .collect();

    if all {
        lines.extend(
            snapshot
                .iter()
                .filter(|(key, _)| !KNOWN_METRICS.iter().any(|(k, _)| *k == key.as_str()))
                .map(|(key, value)| format!("[{}]   {}: {}", device_id, label(key), value)),
        );
    }

    lines
}

/// Machine-readable view of one device.
pub fn render_json(device_id: &str, coordinator: &Coordinator) -> Value {
    let state = coordinator.state();

    json!({
        "device": device_id,
        "endpoint": coordinator.endpoint(),
        "status": status(&state),
        "available": state.last_success,
        "error": state.last_error.as_ref().map(|e| e.to_string()),
        "consecutive_failures": state.consecutive_failures,
        "snapshot": state.last_snapshot.as_deref(),
    })
}
