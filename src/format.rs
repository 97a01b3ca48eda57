//! Display formatting helpers.

const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// Format a byte count with two decimals, e.g. `1.50 KB`.
///
/// Zero yields an empty string. Sizes of a terabyte and more stay in GB.
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return String::new();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

/// Format an optional byte count; absent sizes are empty.
pub fn format_size(size: Option<u64>) -> String {
    size.map(format_bytes).unwrap_or_default()
}

/// Child count label for a folder row, e.g. `3 item(s)`.
pub fn item_count(count: usize) -> String {
    format!("{count} item(s)")
}
