//! Text layout: greedy character-budget word wrapping.
//!
//! Line breaking is character based, not pixel based. Each font role gets an
//! empirically chosen budget (see [`factreel_models::TextBlock`]); pixel
//! measurement is only used afterwards, to center each line.

pub use factreel_models::TextBlock;

/// Greedily wrap `text` into lines of at most `max_chars_per_line` characters.
///
/// Words are accumulated while `len(line + " " + word) <= max`; otherwise a
/// new line starts. Words are never hyphenated, so a single word longer than
/// the budget occupies its own line unsplit. Runs of whitespace collapse to a
/// single space. Empty input yields a single empty line.
pub fn wrap(text: &str, max_chars_per_line: usize) -> Vec<String> {
    let max = max_chars_per_line.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if current.is_empty() {
            current.push_str(word);
            current_len = word_len;
        } else if current_len + 1 + word_len <= max {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }

    lines
}
