//! Logging utilities for sanitizing user-supplied strings so log lines stay
//! single-line. Escapes control characters that otherwise break log
//! readability.

/// Escape a string for single-line logging:
/// - `\n` => `\\n`
/// - `\r` => `\\r`
/// - `\t` => `\\t`
/// - backslash => `\\\\`
///   Truncates long strings (over `MAX_PREVIEW`) with an ellipsis; user ids
///   and item keys never legitimately get that long.
pub fn escape_log(s: &str) -> String {
    const MAX_PREVIEW: usize = 120;
    let mut out = String::with_capacity(s.len().min(MAX_PREVIEW) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= MAX_PREVIEW {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                // Represent other control chars as hex \xNN
                use std::fmt::Write;
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::escape_log;

    #[test]
    fn escapes_newlines() {
        let s = "user\nwith\r\tcontrols";
        assert_eq!(escape_log(s), "user\\nwith\\r\\tcontrols");
    }

    #[test]
    fn truncates_long_ids() {
        let s = "x".repeat(500);
        let escaped = escape_log(&s);
        assert!(escaped.chars().count() <= 121);
        assert!(escaped.ends_with('…'));
    }
}
