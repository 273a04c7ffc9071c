//! Terminal output sanitization.
//!
//! Message bodies come from imported files and model output, so anything that reaches a listing
//! or preview goes through [`strip_ansi_codes`] first. Full `cat` output is sanitized too; a
//! transcript should never be able to move the cursor or recolor the host terminal.

/// Strips ANSI CSI escape sequences and stray control characters.
///
/// Tab, newline and carriage return are kept.
///
/// ```
/// use chatfs::utils::terminal::strip_ansi_codes;
///
/// assert_eq!(strip_ansi_codes("\x1b[1mbold\x1b[0m text"), "bold text");
/// ```
pub fn strip_ansi_codes(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            // CSI sequences end at the first ASCII letter
            for next_ch in chars.by_ref() {
                if next_ch.is_ascii_alphabetic() {
                    break;
                }
            }
            continue;
        }

        if ch.is_control() && !matches!(ch, '\t' | '\n' | '\r') {
            continue;
        }

        result.push(ch);
    }

    result
}

/// First non-blank line of `text`, sanitized and cut to `width` characters (with `…`).
pub fn preview_line(text: &str, width: usize) -> String {
    let clean = strip_ansi_codes(text);
    let line = clean.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");

    if width == 0 {
        return String::new();
    }

    let char_count = line.chars().count();
    if char_count <= width {
        return line.to_string();
    }

    let mut truncated: String = line.chars().take(width.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}
