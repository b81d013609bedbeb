use super::engine::Fragment;

/// Collapse recognized fragments into the caller's string: each piece
/// trimmed, empty pieces dropped, the rest joined with single spaces.
pub fn normalize(fragments: &[Fragment]) -> String {
    fragments
        .iter()
        .map(|f| f.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
