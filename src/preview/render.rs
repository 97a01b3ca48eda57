//! Text renderers for fetched preview content.

/// Marker appended to truncated JSON output.
pub const TRUNCATION_MARKER: &str = "\n... (truncated) ...";

/// A CSV file cut down for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvTable {
    /// Header cells; empty for an empty file.
    pub header: Vec<String>,
    /// Data rows, at most the configured maximum.
    pub rows: Vec<Vec<String>>,
    /// Whether data rows were dropped.
    pub truncated: bool,
    /// Maximum number of data rows shown.
    pub max_rows: usize,
}

impl CsvTable {
    /// Notice shown under a truncated table.
    pub fn notice(&self) -> Option<String> {
        self.truncated
            .then(|| format!("Showing first {} rows", self.max_rows))
    }
}

/// Split CSV text into a display table.
///
/// This is a naive split: lines break on `\n` or `\r\n`, blank lines are
/// dropped, cells split on every comma, and a single leading and trailing
/// quote is stripped from each cell. Quoted commas are not protected.
pub fn render_csv(text: &str, max_rows: usize) -> CsvTable {
    let mut lines = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.is_empty());

    let header = lines.next().map(split_cells).unwrap_or_default();
    let mut rows = Vec::new();
    let mut truncated = false;
    for line in lines {
        if rows.len() == max_rows {
            truncated = true;
            break;
        }
        rows.push(split_cells(line));
    }

    CsvTable {
        header,
        rows,
        truncated,
        max_rows,
    }
}

fn split_cells(line: &str) -> Vec<String> {
    line.split(',')
        .map(|cell| {
            let cell = cell.strip_prefix('"').unwrap_or(cell);
            cell.strip_suffix('"').unwrap_or(cell).to_string()
        })
        .collect()
}

/// JSON text prepared for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonText {
    /// Text to show, marker included when truncated.
    pub text: String,
    /// Whether the input parsed and was re-indented.
    pub pretty: bool,
    /// Whether the text was cut.
    pub truncated: bool,
}

/// Pretty-print JSON, or pass the raw text through if it does not parse.
///
/// Output longer than `max_chars` characters is cut to exactly `max_chars`
/// and [`TRUNCATION_MARKER`] is appended.
pub fn render_json(text: &str, max_chars: usize) -> JsonText {
    let pretty = serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok());
    let is_pretty = pretty.is_some();
    let full = pretty.unwrap_or_else(|| text.to_string());

    match full.char_indices().nth(max_chars) {
        Some((cut, _)) => JsonText {
            text: format!("{}{}", &full[..cut], TRUNCATION_MARKER),
            pretty: is_pretty,
            truncated: true,
        },
        None => JsonText {
            text: full,
            pretty: is_pretty,
            truncated: false,
        },
    }
}
