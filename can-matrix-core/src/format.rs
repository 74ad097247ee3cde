//! Human-readable rendering of model attributes
//!
//! Missing optional values resolve to fixed placeholders here, so callers
//! never need to special-case absence.

use crate::network::ChoiceTable;

/// Placeholder for absent values and empty tables
pub const NONE_TEXT: &str = "None";

/// Render a choice table as `0x<raw>: <label> ` pairs, or `None` if empty
///
/// Every pair carries a trailing space, so `{0: Off, 1: On}` renders as
/// `"0x0: Off 0x1: On "`.
pub fn format_choices(choices: &ChoiceTable) -> String {
    if choices.is_empty() {
        return NONE_TEXT.to_string();
    }
    choices
        .iter()
        .map(|(raw, label)| format!("{}: {} ", format_hex(*raw), label))
        .collect()
}

/// Hexadecimal with `0x` prefix; negatives keep their sign
pub fn format_hex(raw: i64) -> String {
    if raw < 0 {
        format!("-0x{:X}", raw.unsigned_abs())
    } else {
        format!("0x{:X}", raw)
    }
}

/// Frame identifier as `0x<HEX>`
pub fn format_frame_id(frame_id: u32) -> String {
    format!("0x{:X}", frame_id)
}

/// Comma-separated names, or `None` when there are none
pub fn format_names<I, S>(names: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let joined = names
        .into_iter()
        .map(|n| n.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    if joined.is_empty() {
        NONE_TEXT.to_string()
    } else {
        joined
    }
}

/// Optional value, or `None`
pub fn format_optional<T: std::fmt::Display>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| NONE_TEXT.to_string())
}

/// Optional text, or an empty string
pub fn format_comment(comment: Option<&str>) -> String {
    comment.unwrap_or_default().to_string()
}
