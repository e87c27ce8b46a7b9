//! Lexical helpers over raw SQL text

/// Regex alternation for one identifier: bare, `"quoted"`, `` `quoted` `` or `[bracketed]`
pub(crate) const IDENT_PATTERN: &str = r#"[A-Za-z_][A-Za-z0-9_$]*|"[^"]+"|`[^`]+`|\[[^\]]+\]"#;

/// Remove `--` line comments and `/* */` block comments.
///
/// String literals and quoted identifiers are left untouched. Newlines inside
/// removed comments are kept so that line numbers stay stable.
///
/// ```
/// use st_sql::text::strip_comments;
/// assert_eq!(strip_comments("SELECT 1 -- one\nFROM t"), "SELECT 1 \nFROM t");
/// assert_eq!(strip_comments("SELECT '--not' /* x */"), "SELECT '--not' ");
/// ```
pub fn strip_comments(sql: &str) -> String {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            '\'' | '"' | '`' => {
                let end = quoted_end(&chars, i, c);
                out.extend(&chars[i..end]);
                i = end;
            }
            '-' if next == Some('-') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if next == Some('*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    if chars[i] == '\n' {
                        out.push('\n');
                    }
                    i += 1;
                }
                i = (i + 2).min(chars.len());
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

/// Index one past the closing quote of the quoted run starting at `start`.
///
/// A doubled quote character is an escaped quote. Unterminated runs extend
/// to the end of the input.
fn quoted_end(chars: &[char], start: usize, quote: char) -> usize {
    let mut i = start + 1;
    while i < chars.len() {
        if chars[i] == quote {
            if chars.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    chars.len()
}

/// Byte offset of the `)` closing the `(` at byte offset `open`.
///
/// Parentheses inside string literals and quoted identifiers are ignored.
/// Returns `None` if `open` is not a `(` or the group is unbalanced.
pub fn find_matching_paren(text: &str, open: usize) -> Option<usize> {
    if text.as_bytes().get(open) != Some(&b'(') {
        return None;
    }
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (offset, c) in text[open..].char_indices() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => quote = Some(c),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}
