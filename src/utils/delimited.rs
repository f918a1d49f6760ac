// src/utils/delimited.rs

//! Line and field splitting for `<>`-delimited board payloads.

/// Separator between fields of one record line.
pub const FIELD_SEPARATOR: &str = "<>";

/// Split a payload into lines on `\r\n`, `\r` or `\n`.
///
/// Like a regex split, a trailing terminator yields a final empty line.
pub fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\r' => {
                lines.push(&text[start..i]);
                if bytes.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
                start = i + 1;
            }
            b'\n' => {
                lines.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    lines.push(&text[start..]);
    lines
}

/// Split into lines and drop a single trailing empty line.
pub fn split_lines_trimmed(text: &str) -> Vec<&str> {
    let mut lines = split_lines(text);
    if lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

/// Split one line into its fields, keeping empty segments.
pub fn split_fields(line: &str) -> Vec<&str> {
    line.split(FIELD_SEPARATOR).collect()
}

/// Join fields back into a line.
pub fn join_fields(fields: &[&str]) -> String {
    fields.join(FIELD_SEPARATOR)
}
