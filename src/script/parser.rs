//! Command-language parser: scripts into commands, commands into words,
//! words into substitution parts.

use super::reader::CharReader;

/// One piece of a word.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    /// `$name` or `$name(index)`; the index is itself substituted.
    Var {
        name: String,
        index: Option<Vec<Part>>,
    },
    /// `[script]`
    Script(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub parts: Vec<Part>,
    /// Word prefixed with `{*}`.
    pub expand: bool,
}

#[derive(Debug, Clone)]
pub struct Command {
    pub words: Vec<Word>,
    /// Source text, used for error traces.
    pub text: String,
    pub line: usize,
}

/// Which substitutions `parse_template` performs.
#[derive(Debug, Clone, Copy)]
pub struct SubstFlags {
    pub backslashes: bool,
    pub commands: bool,
    pub variables: bool,
}

impl Default for SubstFlags {
    fn default() -> Self {
        SubstFlags {
            backslashes: true,
            commands: true,
            variables: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminator {
    /// Bare word: ends at whitespace or a command separator.
    Word,
    /// Inside `"..."`; consumes the closing quote.
    Quote,
    /// Inside an array index `(...)`; consumes the closing paren.
    Paren,
    /// Runs to end of input.
    End,
}

pub fn parse_script(source: &str) -> Result<Vec<Command>, String> {
    let mut reader = CharReader::new(source);
    let mut commands = Vec::new();

    loop {
        skip_separators(&mut reader);
        match reader.current() {
            None => break,
            Some('#') => {
                skip_comment(&mut reader);
                continue;
            }
            Some(_) => {}
        }

        let start = reader.index();
        let line = reader.line();
        let words = parse_command_words(&mut reader)?;
        if !words.is_empty() {
            commands.push(Command {
                words,
                text: reader.slice(start, reader.index()).to_string(),
                line,
            });
        }
    }

    Ok(commands)
}

/// Parse text for the `subst` command.
pub fn parse_template(source: &str, flags: SubstFlags) -> Result<Vec<Part>, String> {
    let mut reader = CharReader::new(source);
    parse_parts(&mut reader, Terminator::End, flags)
}

fn skip_separators(reader: &mut CharReader<'_>) {
    loop {
        match reader.current() {
            Some(ch) if ch.is_whitespace() || ch == ';' => {
                reader.advance();
            }
            Some('\\') if reader.peek() == Some('\n') => reader.advance_by(2),
            _ => return,
        }
    }
}

fn skip_comment(reader: &mut CharReader<'_>) {
    while let Some(ch) = reader.current() {
        match ch {
            '\\' => reader.advance_by(2),
            '\n' => return,
            _ => {
                reader.advance();
            }
        }
    }
}

fn at_word_end(reader: &CharReader<'_>) -> bool {
    match reader.current() {
        None | Some(' ' | '\t' | '\r' | '\n' | ';') => true,
        Some('\\') => reader.peek() == Some('\n'),
        Some(_) => false,
    }
}

fn parse_command_words(reader: &mut CharReader<'_>) -> Result<Vec<Word>, String> {
    let mut words = Vec::new();

    loop {
        loop {
            match reader.current() {
                Some(' ' | '\t' | '\r') => {
                    reader.advance();
                }
                Some('\\') if reader.peek() == Some('\n') => {
                    reader.advance_by(2);
                    reader.skip_while(|ch| ch == ' ' || ch == '\t');
                }
                _ => break,
            }
        }

        match reader.current() {
            None | Some('\n' | ';') => return Ok(words),
            Some(_) => words.push(parse_word(reader)?),
        }
    }
}

fn parse_word(reader: &mut CharReader<'_>) -> Result<Word, String> {
    let mut expand = false;
    if reader.starts_with("{*}") {
        let mut lookahead = reader.clone();
        lookahead.advance_by(3);
        if !at_word_end(&lookahead) {
            expand = true;
            reader.advance_by(3);
        }
    }

    let parts = match reader.current() {
        Some('{') => {
            let body = parse_braces(reader)?;
            if !at_word_end(reader) {
                return Err("extra characters after close-brace".to_string());
            }
            vec![Part::Text(body)]
        }
        Some('"') => {
            reader.advance();
            let parts = parse_parts(reader, Terminator::Quote, SubstFlags::default())?;
            if !at_word_end(reader) {
                return Err("extra characters after close-quote".to_string());
            }
            parts
        }
        _ => parse_parts(reader, Terminator::Word, SubstFlags::default())?,
    };

    Ok(Word { parts, expand })
}

fn parse_parts(
    reader: &mut CharReader<'_>,
    terminator: Terminator,
    flags: SubstFlags,
) -> Result<Vec<Part>, String> {
    let mut parts = Vec::new();
    let mut text = String::new();

    let flush = |text: &mut String, parts: &mut Vec<Part>| {
        if !text.is_empty() {
            parts.push(Part::Text(std::mem::take(text)));
        }
    };

    loop {
        let Some(ch) = reader.current() else {
            match terminator {
                Terminator::Quote => return Err("missing \"".to_string()),
                Terminator::Paren => return Err("missing )".to_string()),
                Terminator::Word | Terminator::End => break,
            }
        };

        match ch {
            ' ' | '\t' | '\r' | '\n' | ';' if terminator == Terminator::Word => break,
            '"' if terminator == Terminator::Quote => {
                reader.advance();
                break;
            }
            ')' if terminator == Terminator::Paren => {
                reader.advance();
                break;
            }
            '\\' if terminator == Terminator::Word && reader.peek() == Some('\n') => break,
            '\\' if flags.backslashes => reader.backslash(&mut text),
            '$' if flags.variables => match parse_variable(reader)? {
                Some(part) => {
                    flush(&mut text, &mut parts);
                    parts.push(part);
                }
                None => text.push('$'),
            },
            '[' if flags.commands => {
                flush(&mut text, &mut parts);
                parts.push(Part::Script(parse_brackets(reader)?));
            }
            _ => {
                text.push(ch);
                reader.advance();
            }
        }
    }

    flush(&mut text, &mut parts);
    Ok(parts)
}

fn is_name_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// Parse a variable reference; the reader sits on `$`. Returns `None` (with
/// the `$` consumed) when no name follows.
pub(crate) fn parse_variable(reader: &mut CharReader<'_>) -> Result<Option<Part>, String> {
    reader.advance();

    match reader.current() {
        Some('{') => {
            reader.advance();
            let start = reader.index();
            reader.skip_while(|ch| ch != '}');
            if reader.at_end() {
                return Err("missing close-brace for variable name".to_string());
            }
            let name = reader.slice(start, reader.index()).to_string();
            reader.advance();
            Ok(Some(Part::Var { name, index: None }))
        }
        Some(ch) if is_name_char(ch) || (ch == ':' && reader.peek() == Some(':')) => {
            let start = reader.index();
            loop {
                match reader.current() {
                    Some(ch) if is_name_char(ch) => {
                        reader.advance();
                    }
                    Some(':') if reader.peek() == Some(':') => {
                        reader.advance_by(2);
                        reader.skip_while(|ch| ch == ':');
                    }
                    _ => break,
                }
            }
            let name = reader.slice(start, reader.index()).to_string();

            let index = if reader.current() == Some('(') {
                reader.advance();
                Some(parse_parts(reader, Terminator::Paren, SubstFlags::default())?)
            } else {
                None
            };
            Ok(Some(Part::Var { name, index }))
        }
        _ => Ok(None),
    }
}

/// Parts of a `"..."` string; the reader sits on the opening quote.
pub(crate) fn parse_quoted(reader: &mut CharReader<'_>) -> Result<Vec<Part>, String> {
    reader.advance();
    parse_parts(reader, Terminator::Quote, SubstFlags::default())
}

/// Body of a `[...]` command substitution; the reader sits on `[`.
pub(crate) fn parse_brackets(reader: &mut CharReader<'_>) -> Result<String, String> {
    reader.advance();
    let start = reader.index();
    let mut depth = 1;

    loop {
        match reader.current() {
            None => return Err("missing close-bracket".to_string()),
            Some('\\') => reader.advance_by(2),
            Some('[') => {
                depth += 1;
                reader.advance();
            }
            Some(']') => {
                depth -= 1;
                if depth == 0 {
                    let body = reader.slice(start, reader.index()).to_string();
                    reader.advance();
                    return Ok(body);
                }
                reader.advance();
            }
            Some('{') => {
                parse_braces(reader)?;
            }
            Some('"') => {
                reader.advance();
                loop {
                    match reader.current() {
                        None => return Err("missing \"".to_string()),
                        Some('\\') => reader.advance_by(2),
                        Some('"') => {
                            reader.advance();
                            break;
                        }
                        Some(_) => {
                            reader.advance();
                        }
                    }
                }
            }
            Some(_) => {
                reader.advance();
            }
        }
    }
}

/// Body of a braced word, verbatim except for backslash-newline; the reader
/// sits on `{`.
pub(crate) fn parse_braces(reader: &mut CharReader<'_>) -> Result<String, String> {
    reader.advance();
    let mut body = String::new();
    let mut depth = 1;

    loop {
        match reader.current() {
            None => return Err("missing close-brace".to_string()),
            Some('\\') => {
                if reader.peek() == Some('\n') {
                    reader.advance_by(2);
                    reader.skip_while(|ch| ch == ' ' || ch == '\t');
                    body.push(' ');
                } else {
                    body.push('\\');
                    reader.advance();
                    if let Some(next) = reader.advance() {
                        body.push(next);
                    }
                }
            }
            Some('{') => {
                depth += 1;
                body.push('{');
                reader.advance();
            }
            Some('}') => {
                depth -= 1;
                reader.advance();
                if depth == 0 {
                    return Ok(body);
                }
                body.push('}');
            }
            Some(ch) => {
                body.push(ch);
                reader.advance();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Part {
        Part::Text(s.to_string())
    }

    #[test]
    fn splits_commands_and_words() {
        let commands = parse_script("set a 1; set b {x y}\n# comment\nputs $a").unwrap();
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[1].words[2].parts, vec![text("x y")]);
        assert_eq!(commands[2].line, 3);
        assert_eq!(commands[2].text, "puts $a");
    }

    #[test]
    fn parses_variables_and_commands() {
        let commands = parse_script("puts \"a$b(c$d)[list x]\"").unwrap();
        let parts = &commands[0].words[1].parts;
        assert_eq!(parts[0], text("a"));
        assert_eq!(
            parts[1],
            Part::Var {
                name: "b".to_string(),
                index: Some(vec![
                    text("c"),
                    Part::Var {
                        name: "d".to_string(),
                        index: None
                    }
                ]),
            }
        );
        assert_eq!(parts[2], Part::Script("list x".to_string()));
    }

    #[test]
    fn qualified_and_braced_names() {
        let commands = parse_script("puts $::ns::v ${odd name} $").unwrap();
        let words = &commands[0].words;
        assert_eq!(
            words[1].parts,
            vec![Part::Var {
                name: "::ns::v".to_string(),
                index: None
            }]
        );
        assert_eq!(
            words[2].parts,
            vec![Part::Var {
                name: "odd name".to_string(),
                index: None
            }]
        );
        assert_eq!(words[3].parts, vec![text("$")]);
    }

    #[test]
    fn expansion_prefix() {
        let commands = parse_script("list {*}$items {*}").unwrap();
        assert!(commands[0].words[1].expand);
        assert!(!commands[0].words[2].expand);
    }

    #[test]
    fn nested_brackets_with_braces() {
        let commands = parse_script("set x [expr {[llength {a ]b}] + 1}]").unwrap();
        assert_eq!(
            commands[0].words[2].parts,
            vec![Part::Script("expr {[llength {a ]b}] + 1}".to_string())]
        );
    }

    #[test]
    fn reports_structural_errors() {
        assert_eq!(parse_script("set x {a").unwrap_err(), "missing close-brace");
        assert_eq!(
            parse_script("set x {a}b").unwrap_err(),
            "extra characters after close-brace"
        );
        assert_eq!(parse_script("set x \"a").unwrap_err(), "missing \"");
        assert_eq!(parse_script("set x [a").unwrap_err(), "missing close-bracket");
    }

    #[test]
    fn template_respects_flags() {
        let flags = SubstFlags {
            commands: false,
            ..SubstFlags::default()
        };
        let parts = parse_template("$a [b]\\n", flags).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1], text(" [b]\n"));
    }
}
