//! Identifier quoting.

/// Wraps `ident` in double quotes, doubling embedded quotes.
pub fn quote_identifier(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len() + 2);
    push_quoted(&mut out, ident);
    out
}

/// Appends the quoted form of `ident` to `out`.
pub(crate) fn push_quoted(out: &mut String, ident: &str) {
    out.push('"');
    for ch in ident.chars() {
        if ch == '"' {
            out.push('"');
        }
        out.push(ch);
    }
    out.push('"');
}

/// Reverses [`quote_identifier`].
///
/// Returns `None` when `quoted` is not a single well-formed quoted
/// identifier.
pub fn unquote_identifier(quoted: &str) -> Option<String> {
    let inner = quoted.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '"' {
            // A lone quote would have terminated the identifier.
            if chars.next() != Some('"') {
                return None;
            }
        }
        out.push(ch);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_plain() {
        assert_eq!(quote_identifier("users"), "\"users\"");
        assert_eq!(quote_identifier(""), "\"\"");
    }

    #[test]
    fn test_quote_doubles_embedded_quotes() {
        let quoted = quote_identifier("we\"ird\"");
        assert_eq!(quoted, "\"we\"\"ird\"\"\"");
        // n embedded quotes become 2n, plus the two delimiters.
        assert_eq!(quoted.matches('"').count(), 2 * 2 + 2);
    }

    #[test]
    fn test_unquote_round_trip() {
        for ident in ["users", "a\"b", "\"", "\"\"", "with space", "ünï\"cødé"] {
            assert_eq!(unquote_identifier(&quote_identifier(ident)).as_deref(), Some(ident));
        }
    }

    #[test]
    fn test_unquote_rejects_malformed() {
        assert_eq!(unquote_identifier("users"), None);
        assert_eq!(unquote_identifier("\"a\"b\""), None);
        assert_eq!(unquote_identifier("\""), None);
    }
}
