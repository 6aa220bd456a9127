//! Stats formatting for different output formats

use super::RelayMetrics;
use crate::config::StatsFormat;

/// Format metrics according to the configured format
pub fn format_metrics(metrics: &RelayMetrics, format: StatsFormat) -> String {
    match format {
        StatsFormat::Pretty => format_pretty(metrics),
        StatsFormat::Json => format_json(metrics),
        StatsFormat::Compact => format_compact(metrics),
    }
}

fn status_str(m: &RelayMetrics) -> String {
    m.upstream_status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

/// Pretty box format for terminal output
fn format_pretty(m: &RelayMetrics) -> String {
    format!(
        r#"┌──────────────────────────────────────────────────────────────────┐
│ Upload Relay Request                                             │
├──────────────────────────────────────────────────────────────────┤
│ Request: {:56}│
│ Time:    {:56}│
├──────────────────────────────────────────────────────────────────┤
│ Files:    {:6} │ Uploaded: {:12} bytes                  │
│ Upstream: {:6} │ Returned: {:12} bytes                  │
├──────────────────────────────────────────────────────────────────┤
│ Outcome: {:56}│
│ Duration: {:53.1}ms│
└──────────────────────────────────────────────────────────────────┘
"#,
        m.request_id,
        m.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        m.file_count,
        m.upload_bytes,
        status_str(m),
        m.response_bytes,
        m.outcome.to_string(),
        m.duration_ms,
    )
}

/// JSON format for structured logging
fn format_json(m: &RelayMetrics) -> String {
    serde_json::to_string(m).unwrap_or_else(|_| "{}".to_string())
}

/// Compact single-line format
fn format_compact(m: &RelayMetrics) -> String {
    format!(
        "[{}] id={} files={} up={}B upstream={} down={}B {} dur={:.1}ms",
        m.timestamp.format("%H:%M:%S"),
        m.request_id,
        m.file_count,
        m.upload_bytes,
        status_str(m),
        m.response_bytes,
        m.outcome,
        m.duration_ms
    )
}
