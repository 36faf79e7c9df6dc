// Parenthesised struct and container text.
//
// `(a=1,b=(x=2,y=3),c="hi, there")` splits on commas at paren depth zero and
// outside double quotes. Nothing is escaped except `"` and `\` inside quoted
// strings.

/// Split the inside of a parenthesised group at top-level commas.
pub fn split_top_level(inner: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    if inner.is_empty() {
        return parts;
    }
    let mut depth: i32 = 0;
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;
    for (i, ch) in inner.char_indices() {
        if in_quotes {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_quotes = false;
            }
            continue;
        }
        match ch {
            '"' => in_quotes = true,
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&inner[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&inner[start..]);
    parts
}

/// Strip one pair of enclosing parentheses.
pub fn unwrap_parens(text: &str) -> Option<&str> {
    let text = text.trim();
    text.strip_prefix('(')?.strip_suffix(')')
}

/// Join already-encoded parts into `(p1,p2,...)`.
pub fn wrap_parens<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::from("(");
    for (i, part) in parts.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(part.as_ref());
    }
    out.push(')');
    out
}

/// Parse `(k=v,...)` into key/value pairs. Entries without `=` are dropped.
pub fn parse_struct(text: &str) -> Option<Vec<(&str, &str)>> {
    let inner = unwrap_parens(text)?;
    Some(
        split_top_level(inner)
            .into_iter()
            .filter_map(|entry| entry.split_once('='))
            .map(|(k, v)| (k.trim(), v))
            .filter(|(k, _)| !k.is_empty())
            .collect(),
    )
}

pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

/// Inverse of `quote`. Unquoted text is returned as-is.
pub fn unquote(text: &str) -> String {
    let Some(inner) = text
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        return text.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(ch);
        }
    }
    out
}
