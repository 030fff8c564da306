//! Quote-aware line tokenization.

/// Split one log line into ordered tokens.
///
/// Tokens are either whitespace-delimited runs of non-space characters, or
/// double-quote-delimited runs that may contain embedded whitespace. The enclosing
/// quotes are stripped from quoted tokens; interior characters are not un-escaped.
///
/// This is a single-pass state machine rather than a pattern match: the tokenizer
/// only ever tracks whether it is inside a quoted run.
///
/// A line with an odd number of quote characters does not error: an unterminated
/// quoted run is flushed as one token at end of line, with the opening quote
/// stripped. See the characterization tests for the exact boundaries.
pub fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        if in_quotes {
            if ch == '"' {
                in_quotes = false;
                tokens.push(std::mem::take(&mut current));
            } else {
                current.push(ch);
            }
        } else if ch == '"' {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            in_quotes = true;
        } else if ch.is_whitespace() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else {
            current.push(ch);
        }
    }

    if in_quotes || !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::tokenize;

    #[test]
    fn splits_on_whitespace() {
        assert_eq!(tokenize("http 200 1.2.3.4:80"), ["http", "200", "1.2.3.4:80"]);
    }

    #[test]
    fn quoted_tokens_keep_embedded_whitespace() {
        assert_eq!(
            tokenize(r#"200 "GET /index.html HTTP/1.1" "curl/7.0""#),
            ["200", "GET /index.html HTTP/1.1", "curl/7.0"]
        );
    }

    #[test]
    fn enclosing_quotes_are_stripped() {
        assert_eq!(tokenize(r#""a b""#), ["a b"]);
    }

    #[test]
    fn empty_quoted_token_is_preserved() {
        assert_eq!(tokenize(r#"a "" b"#), ["a", "", "b"]);
    }

    #[test]
    fn collapses_repeated_whitespace() {
        assert_eq!(tokenize("a   b\t c"), ["a", "b", "c"]);
    }

    #[test]
    fn empty_line_yields_no_tokens() {
        assert_eq!(tokenize(""), Vec::<String>::new());
        assert_eq!(tokenize("   "), Vec::<String>::new());
    }

    // Characterization: odd quote counts are not an error. An unterminated quoted
    // run extends to end of line, with the opening quote stripped.
    #[test]
    fn odd_quote_count_flushes_trailing_run() {
        assert_eq!(tokenize(r#"a "b c"#), ["a", "b c"]);
        assert_eq!(tokenize(r#"a b ""#), ["a", "b", ""]);
    }

    // Characterization: a quote abutting a bare token ends that token and opens a
    // quoted run, instead of being kept as part of the bare token.
    #[test]
    fn quote_adjacent_to_bare_token_starts_new_token() {
        assert_eq!(tokenize(r#"abc"def""#), ["abc", "def"]);
    }
}
