// Plain-text import/export of scalar values, used whenever a field is not a
// struct, container or tracked object reference.

pub fn export_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

pub fn import_bool(text: &str) -> Option<bool> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("true") || text == "1" {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") || text == "0" {
        Some(false)
    } else {
        None
    }
}

pub fn export_int(value: i64) -> String {
    value.to_string()
}

/// Integers saved from older float fields are truncated.
pub fn import_int(text: &str) -> Option<i64> {
    let text = text.trim();
    text.parse::<i64>()
        .ok()
        .or_else(|| text.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
}

/// Shortest text that parses back to the same value.
pub fn export_float(value: f64) -> String {
    format!("{value}")
}

pub fn import_float(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok()
}

/// Placeholder for a null object reference.
pub const NONE_TEXT: &str = "None";
