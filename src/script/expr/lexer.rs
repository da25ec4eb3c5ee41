use crate::script::parser::{self, Part};
use crate::script::reader::CharReader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Op {
    Pow,
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    Shl,
    Shr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    StrEq,
    StrNe,
    In,
    Ni,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Or,
    Not,
    BitNot,
}

impl Op {
    pub(crate) fn symbol(self) -> &'static str {
        match self {
            Op::Pow => "**",
            Op::Mul => "*",
            Op::Div => "/",
            Op::Mod => "%",
            Op::Add => "+",
            Op::Sub => "-",
            Op::Shl => "<<",
            Op::Shr => ">>",
            Op::Lt => "<",
            Op::Gt => ">",
            Op::Le => "<=",
            Op::Ge => ">=",
            Op::Eq => "==",
            Op::Ne => "!=",
            Op::StrEq => "eq",
            Op::StrNe => "ne",
            Op::In => "in",
            Op::Ni => "ni",
            Op::BitAnd => "&",
            Op::BitXor => "^",
            Op::BitOr => "|",
            Op::And => "&&",
            Op::Or => "||",
            Op::Not => "!",
            Op::BitNot => "~",
        }
    }
}

/// A substitution that produces an operand at evaluation time.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Operand {
    Var(Part),
    Script(String),
    Quoted(Vec<Part>),
    Braced(String),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Number(String),
    Operand(Operand),
    Ident(String),
    Op(Op),
    LParen,
    RParen,
    Comma,
    Question,
    Colon,
    End,
}

const SYMBOLS: &[(&str, Op)] = &[
    ("**", Op::Pow),
    ("<<", Op::Shl),
    (">>", Op::Shr),
    ("<=", Op::Le),
    (">=", Op::Ge),
    ("==", Op::Eq),
    ("!=", Op::Ne),
    ("&&", Op::And),
    ("||", Op::Or),
    ("*", Op::Mul),
    ("/", Op::Div),
    ("%", Op::Mod),
    ("+", Op::Add),
    ("-", Op::Sub),
    ("<", Op::Lt),
    (">", Op::Gt),
    ("&", Op::BitAnd),
    ("^", Op::BitXor),
    ("|", Op::BitOr),
    ("!", Op::Not),
    ("~", Op::BitNot),
];

pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, String> {
    let mut reader = CharReader::new(source);
    let mut tokens = Vec::new();

    loop {
        reader.skip_while(char::is_whitespace);
        let Some(ch) = reader.current() else {
            tokens.push(Token::End);
            return Ok(tokens);
        };

        let token = match ch {
            '(' => {
                reader.advance();
                Token::LParen
            }
            ')' => {
                reader.advance();
                Token::RParen
            }
            ',' => {
                reader.advance();
                Token::Comma
            }
            '?' => {
                reader.advance();
                Token::Question
            }
            ':' => {
                reader.advance();
                Token::Colon
            }
            '$' => match parser::parse_variable(&mut reader)? {
                Some(part) => Token::Operand(Operand::Var(part)),
                None => return Err("invalid character \"$\" in expression".to_string()),
            },
            '[' => Token::Operand(Operand::Script(parser::parse_brackets(&mut reader)?)),
            '{' => Token::Operand(Operand::Braced(parser::parse_braces(&mut reader)?)),
            '"' => Token::Operand(Operand::Quoted(parser::parse_quoted(&mut reader)?)),
            c if c.is_ascii_digit() || (c == '.' && reader.peek().is_some_and(|p| p.is_ascii_digit())) => {
                Token::Number(number_literal(&mut reader))
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = reader.index();
                reader.skip_while(|c| c.is_alphanumeric() || c == '_' || c == ':');
                let word = reader.slice(start, reader.index());
                match word {
                    "eq" => Token::Op(Op::StrEq),
                    "ne" => Token::Op(Op::StrNe),
                    "in" => Token::Op(Op::In),
                    "ni" => Token::Op(Op::Ni),
                    _ => Token::Ident(word.to_string()),
                }
            }
            _ => {
                let Some((text, op)) = SYMBOLS.iter().find(|(text, _)| reader.starts_with(text))
                else {
                    return Err(format!("invalid character \"{ch}\" in expression"));
                };
                reader.advance_by(text.chars().count());
                Token::Op(*op)
            }
        };
        tokens.push(token);
    }
}

fn number_literal(reader: &mut CharReader<'_>) -> String {
    let start = reader.index();
    loop {
        match reader.current() {
            Some(c) if c.is_ascii_alphanumeric() || c == '.' => {
                let exponent = matches!(c, 'e' | 'E')
                    && !reader.slice(start, reader.index()).starts_with("0x");
                reader.advance();
                if exponent && matches!(reader.current(), Some('+' | '-')) {
                    reader.advance();
                }
            }
            _ => break,
        }
    }
    reader.slice(start, reader.index()).to_string()
}
