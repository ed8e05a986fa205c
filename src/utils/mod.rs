/// Format duration in human-readable format
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0).round() as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Trim language codes, drop empties and repeats, keep order.
///
/// Codes are matched against the page verbatim, so case is left alone
/// (`zh-Hans` and `zh-hans` are different tracks upstream).
pub fn normalize_language_codes<I, S>(codes: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = Vec::new();
    for code in codes {
        let code = code.as_ref().trim();
        if !code.is_empty() && !normalized.iter().any(|c| c == code) {
            normalized.push(code.to_string());
        }
    }
    normalized
}
