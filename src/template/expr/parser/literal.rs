//! Literal scanning for template expressions.

/// Scan a numeric literal starting at `start`. Returns the value and the
/// byte offset just past the literal.
///
/// Supported forms: integers, decimals with an optional leading dot, and an
/// optional exponent (`1e3`, `2.5E-2`).
pub fn scan_number(input: &str, start: usize) -> Option<(f64, usize)> {
    let bytes = input.as_bytes();
    let mut end = start;

    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end == digits_start {
            return None;
        }
        end = exp_end;
    }

    let text = &input[start..end];
    if text == "." || text.is_empty() {
        return None;
    }
    text.parse::<f64>().ok().map(|n| (n, end))
}

/// Scan a quoted string literal whose opening quote is at `start`.
///
/// Both `'` and `"` delimit strings; backslash escapes `\n`, `\t`, `\r`,
/// `\\`, the quotes, and `\uXXXX` are decoded. Returns `None` when the
/// literal is unterminated or holds a malformed escape.
pub fn scan_string(input: &str, start: usize) -> Option<(String, usize)> {
    let mut chars = input[start..].char_indices();
    let (_, quote) = chars.next()?;
    let mut out = String::new();

    while let Some((offset, ch)) = chars.next() {
        if ch == quote {
            return Some((out, start + offset + ch.len_utf8()));
        }
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        let (_, escaped) = chars.next()?;
        match escaped {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            'u' => {
                let mut code = 0u32;
                for _ in 0..4 {
                    let (_, h) = chars.next()?;
                    code = code * 16 + h.to_digit(16)?;
                }
                out.push(char::from_u32(code)?);
            },
            other => out.push(other),
        }
    }

    None
}
