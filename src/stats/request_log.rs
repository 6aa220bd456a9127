//! Upload logging formatter

/// Format an upload summary line in compact format
pub fn format_upload_log<'a, I>(file_names: I, total_bytes: u64) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let names: Vec<String> = file_names.into_iter().map(display_name).collect();

    let mut parts = vec![format!("files={}", names.len()), format!("bytes={}", total_bytes)];

    if !names.is_empty() {
        parts.push(format!("[{}]", truncate_list(&names.join(", "))));
    }

    format!("→ {}", parts.join(" "))
}

/// Collapse whitespace so a hostile filename cannot break the log line
fn display_name(name: &str) -> String {
    if name.is_empty() {
        return "<unnamed>".to_string();
    }
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate according to rules:
/// - If <= 100 chars: show all
/// - If > 100 chars: first 25 + " ... " + last 75
fn truncate_list(s: &str) -> String {
    const MAX_TOTAL: usize = 100;
    const PREFIX_LEN: usize = 25;
    const SUFFIX_LEN: usize = 75;
    const ELLIPSIS: &str = " ... ";

    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= MAX_TOTAL {
        return s.to_string();
    }

    let prefix: String = chars[..PREFIX_LEN].iter().collect();
    let suffix: String = chars[chars.len() - SUFFIX_LEN..].iter().collect();

    format!("{}{}{}", prefix, ELLIPSIS, suffix)
}
