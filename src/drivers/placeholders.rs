//! Positional `?` placeholder scanning.
//!
//! A `?` counts as a placeholder unless it sits inside a quoted string or
//! identifier (`'..'`, `".."`, `` `..` ``, `[..]`) or a comment.

/// Split `sql` at every placeholder. A statement with `n` placeholders yields
/// `n + 1` segments.
fn split(sql: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut chars = sql.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '?' => {
                segments.push(&sql[start..i]);
                start = i + 1;
            }
            '\'' | '"' | '`' | '[' => {
                let close = if c == '[' { ']' } else { c };
                for (_, next) in chars.by_ref() {
                    if next == close {
                        break;
                    }
                }
            }
            '-' if matches!(chars.peek(), Some((_, '-'))) => {
                for (_, next) in chars.by_ref() {
                    if next == '\n' {
                        break;
                    }
                }
            }
            '/' if matches!(chars.peek(), Some((_, '*'))) => {
                chars.next();
                let mut prev = '\0';
                for (_, next) in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            _ => {}
        }
    }

    segments.push(&sql[start..]);
    segments
}

/// Number of positional placeholders in `sql`.
pub(crate) fn count(sql: &str) -> usize {
    split(sql).len() - 1
}

/// Rewrite `?` placeholders as `<prefix>1`, `<prefix>2`, ...
pub(crate) fn number(sql: &str, prefix: &str) -> String {
    let segments = split(sql);
    let mut out = String::with_capacity(sql.len() + segments.len() * (prefix.len() + 1));
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            out.push_str(prefix);
            out.push_str(&i.to_string());
        }
        out.push_str(segment);
    }
    out
}
