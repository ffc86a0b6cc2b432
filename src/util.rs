//! Small string helpers shared by error and log formatting

/// Shorten `text` for display, cutting on a UTF-8 boundary at or before
/// `max_bytes` and marking the cut with an ellipsis.
///
/// Upstream error pages can be whole HTML documents; this keeps messages
/// and log lines bounded.
pub fn preview(text: &str, max_bytes: usize) -> String {
    let text = text.trim();
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &text[..end])
}
