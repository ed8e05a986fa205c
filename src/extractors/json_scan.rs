//! Balanced-delimiter scanning for JSON values embedded in HTML/script text.
//!
//! The watch page inlines its player metadata as a JavaScript object literal
//! with no reliable terminator, so the end of the value is found by counting
//! nesting depth while skipping over string literals.

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ScanError {
    #[error("marker {0:?} not found")]
    MarkerNotFound(String),

    #[error("expected '{{' or '[' at byte {0}")]
    NotAnObject(usize),

    #[error("unterminated value starting at byte {0}")]
    Unterminated(usize),

    #[error("mismatched '{found}' at byte {at}")]
    Mismatched { found: char, at: usize },
}

/// Return the exact text of the JSON object or array starting at `start`.
///
/// Brackets inside double-quoted strings are ignored and backslash escapes
/// inside strings are honoured. Mismatched closers are an error rather than
/// something to guess around.
pub fn extract_balanced(text: &str, start: usize) -> Result<&str, ScanError> {
    let bytes = text.as_bytes();
    match bytes.get(start) {
        Some(b'{') | Some(b'[') => {}
        _ => return Err(ScanError::NotAnObject(start)),
    }

    let mut stack: Vec<u8> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    // Scanning bytes is safe for UTF-8: every delimiter we care about is ASCII
    // and never appears inside a multi-byte sequence.
    for (offset, &byte) in bytes[start..].iter().enumerate() {
        let at = start + offset;

        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => stack.push(b'}'),
            b'[' => stack.push(b']'),
            b'}' | b']' => {
                if stack.pop() != Some(byte) {
                    return Err(ScanError::Mismatched {
                        found: byte as char,
                        at,
                    });
                }
                if stack.is_empty() {
                    return Ok(&text[start..=at]);
                }
            }
            _ => {}
        }
    }

    Err(ScanError::Unterminated(start))
}

/// Find `marker`, skip whitespace, and extract the object that follows.
///
/// Occurrences of the marker not followed by an object or array (for
/// example inside a string) are skipped.
pub fn extract_after_marker<'a>(text: &'a str, marker: &str) -> Result<&'a str, ScanError> {
    let mut search_from = 0;
    let mut last_error = None;

    while let Some(found) = text[search_from..].find(marker) {
        let after = search_from + found + marker.len();
        let value_start = after
            + text[after..]
                .find(|c: char| !c.is_whitespace())
                .unwrap_or(text.len() - after);

        match extract_balanced(text, value_start) {
            Ok(value) => return Ok(value),
            Err(ScanError::NotAnObject(_)) => {}
            Err(e) => last_error = Some(e),
        }
        search_from = after;
    }

    Err(last_error.unwrap_or_else(|| ScanError::MarkerNotFound(marker.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_object() {
        let text = r#"var x = {"a":1,"b":{"c":[1,2,{"d":3}]}};var y = 2;"#;
        let start = text.find('{').unwrap();
        assert_eq!(
            extract_balanced(text, start).unwrap(),
            r#"{"a":1,"b":{"c":[1,2,{"d":3}]}}"#
        );
    }

    #[test]
    fn test_braces_inside_strings() {
        let text = r#"{"title":"curly } brace { and ] bracket","n":1} trailing }"#;
        assert_eq!(
            extract_balanced(text, 0).unwrap(),
            r#"{"title":"curly } brace { and ] bracket","n":1}"#
        );
    }

    #[test]
    fn test_escaped_quotes_and_backslashes() {
        let text = r#"{"q":"say \"hi}\"","path":"C:\\","x":{}}rest"#;
        assert_eq!(
            extract_balanced(text, 0).unwrap(),
            r#"{"q":"say \"hi}\"","path":"C:\\","x":{}}"#
        );
    }

    #[test]
    fn test_multibyte_text() {
        let text = r#"{"name":"日本語 {字幕}","k":"ü"};"#;
        assert_eq!(extract_balanced(text, 0).unwrap(), r#"{"name":"日本語 {字幕}","k":"ü"}"#);
    }

    #[test]
    fn test_unterminated_and_mismatched() {
        assert_eq!(
            extract_balanced(r#"{"a":{"b":1}"#, 0),
            Err(ScanError::Unterminated(0))
        );
        assert_eq!(
            extract_balanced(r#"{"a":[1}"#, 0),
            Err(ScanError::Mismatched { found: '}', at: 7 })
        );
        assert_eq!(extract_balanced("abc", 0), Err(ScanError::NotAnObject(0)));
        assert_eq!(extract_balanced("{", 5), Err(ScanError::NotAnObject(5)));
    }

    #[test]
    fn test_after_marker_skips_whitespace() {
        let text = "<script>var ytInitialPlayerResponse = \n {\"captions\": {}};</script>";
        assert_eq!(
            extract_after_marker(text, "ytInitialPlayerResponse =").unwrap(),
            "{\"captions\": {}}"
        );
    }

    #[test]
    fn test_after_marker_skips_non_object_occurrences() {
        let text = r#"{"label":"captions","captions":"none"} {"captions":{"ok":true}}"#;
        assert_eq!(
            extract_after_marker(text, r#""captions":"#).unwrap(),
            r#"{"ok":true}"#
        );
    }

    #[test]
    fn test_after_marker_missing() {
        assert_eq!(
            extract_after_marker("<html></html>", r#""captions":"#),
            Err(ScanError::MarkerNotFound(r#""captions":"#.to_string()))
        );
    }
}
