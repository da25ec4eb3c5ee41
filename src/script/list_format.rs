//! Canonical list syntax: splitting a string into elements and quoting
//! elements so that splitting the joined result gives them back.

use std::borrow::Cow;

use super::reader::CharReader;

fn is_list_space(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r' | '\u{b}' | '\u{c}')
}

/// Split `text` into list elements.
pub fn parse_list(text: &str) -> Result<Vec<String>, String> {
    let mut reader = CharReader::new(text);
    let mut elements = Vec::new();

    loop {
        reader.skip_while(is_list_space);
        let Some(first) = reader.current() else {
            return Ok(elements);
        };

        let element = match first {
            '{' => braced_element(&mut reader)?,
            '"' => quoted_element(&mut reader)?,
            _ => bare_element(&mut reader),
        };
        elements.push(element);
    }
}

fn braced_element(reader: &mut CharReader<'_>) -> Result<String, String> {
    reader.advance();
    let start = reader.index();
    let mut depth = 1;

    loop {
        match reader.current() {
            None => return Err("unmatched open brace in list".to_string()),
            Some('\\') => {
                reader.advance();
                reader.advance();
            }
            Some('{') => {
                depth += 1;
                reader.advance();
            }
            Some('}') => {
                depth -= 1;
                if depth == 0 {
                    let body = reader.slice(start, reader.index()).to_string();
                    reader.advance();
                    return match reader.current() {
                        Some(ch) if !is_list_space(ch) => Err(format!(
                            "list element in braces followed by \"{}\" instead of space",
                            trailing_word(reader)
                        )),
                        _ => Ok(body),
                    };
                }
                reader.advance();
            }
            Some(_) => {
                reader.advance();
            }
        }
    }
}

fn quoted_element(reader: &mut CharReader<'_>) -> Result<String, String> {
    reader.advance();
    let mut out = String::new();

    loop {
        match reader.current() {
            None => return Err("unmatched open quote in list".to_string()),
            Some('\\') => reader.backslash(&mut out),
            Some('"') => {
                reader.advance();
                return match reader.current() {
                    Some(ch) if !is_list_space(ch) => Err(format!(
                        "list element in quotes followed by \"{}\" instead of space",
                        trailing_word(reader)
                    )),
                    _ => Ok(out),
                };
            }
            Some(ch) => {
                out.push(ch);
                reader.advance();
            }
        }
    }
}

fn bare_element(reader: &mut CharReader<'_>) -> String {
    let mut out = String::new();
    while let Some(ch) = reader.current() {
        if is_list_space(ch) {
            break;
        }
        if ch == '\\' {
            reader.backslash(&mut out);
        } else {
            out.push(ch);
            reader.advance();
        }
    }
    out
}

fn trailing_word(reader: &CharReader<'_>) -> String {
    reader
        .rest()
        .chars()
        .take_while(|ch| !is_list_space(*ch))
        .collect()
}

/// Quote a single element so it survives [`parse_list`].
pub fn quote_element(element: &str) -> Cow<'_, str> {
    if element.is_empty() {
        return Cow::Borrowed("{}");
    }

    let needs_quoting = element.starts_with('#')
        || element.chars().any(|ch| {
            is_list_space(ch) || matches!(ch, '{' | '}' | '[' | ']' | '$' | '"' | ';' | '\\')
        });
    if !needs_quoting {
        return Cow::Borrowed(element);
    }

    if braces_balanced(element) && !element.ends_with('\\') {
        return Cow::Owned(format!("{{{element}}}"));
    }

    let mut out = String::with_capacity(element.len() + 8);
    for ch in element.chars() {
        match ch {
            '{' | '}' | '[' | ']' | '$' | '"' | ';' | '\\' | ' ' => {
                out.push('\\');
                out.push(ch);
            }
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\u{b}' => out.push_str("\\v"),
            '\u{c}' => out.push_str("\\f"),
            '#' if out.is_empty() => out.push_str("\\#"),
            _ => out.push(ch),
        }
    }
    Cow::Owned(out)
}

fn braces_balanced(element: &str) -> bool {
    let mut depth = 0i32;
    let mut escaped = false;
    for ch in element.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Join elements into a well-formed list string.
pub fn merge<S: AsRef<str>>(elements: &[S]) -> String {
    let mut out = String::new();
    for (i, element) in elements.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&quote_element(element.as_ref()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_plain_words() {
        assert_eq!(parse_list("a b  c").unwrap(), vec!["a", "b", "c"]);
        assert!(parse_list("   ").unwrap().is_empty());
    }

    #[test]
    fn splits_braced_and_quoted() {
        let items = parse_list(r#"{a b} "c d" {x {y z}} e\ f"#).unwrap();
        assert_eq!(items, vec!["a b", "c d", "x {y z}", "e f"]);
    }

    #[test]
    fn rejects_unbalanced_braces() {
        assert_eq!(
            parse_list("{a b").unwrap_err(),
            "unmatched open brace in list"
        );
        assert_eq!(
            parse_list("{a}b").unwrap_err(),
            "list element in braces followed by \"b\" instead of space"
        );
    }

    #[test]
    fn quotes_elements() {
        assert_eq!(quote_element("abc"), "abc");
        assert_eq!(quote_element(""), "{}");
        assert_eq!(quote_element("a b"), "{a b}");
        assert_eq!(quote_element("a}b"), "a\\}b");
        assert_eq!(quote_element("#x"), "{#x}");
    }

    #[test]
    fn merge_then_parse_is_identity() {
        let elements = vec!["plain", "with space", "", "{", "tail\\", "a\"b", "m {i i1}"];
        let merged = merge(&elements);
        assert_eq!(parse_list(&merged).unwrap(), elements);
    }
}
