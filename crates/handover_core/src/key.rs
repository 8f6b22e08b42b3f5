//! Patient identity keys.
//!
//! Keys are comparison-only projections: stored fields keep their original
//! spelling (`49-3` stays `49-3`), only the key drops punctuation.

/// Lowercases and keeps letters/digits of any script; `None` becomes `""`.
pub fn normalize_key_part(value: Option<&str>) -> String {
    value
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Strict key: section + room + name. Keeps patients separate per section.
pub fn build_key(section: &str, room: Option<&str>, name: Option<&str>) -> String {
    format!(
        "{}|{}|{}",
        normalize_key_part(Some(section)),
        normalize_key_part(room),
        normalize_key_part(name)
    )
}

/// Loose key: room + name only. Detects transfers between sections.
pub fn build_loose_key(room: Option<&str>, name: Option<&str>) -> String {
    format!("{}|{}", normalize_key_part(room), normalize_key_part(name))
}
