use super::lexer::{Op, Operand, Token};
use super::precedence::{Precedence, infix_op, rhs_precedence};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Number(String),
    Boolean(bool),
    Operand(Operand),
    Unary(Op, Box<Expr>),
    Binary(Op, Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

pub(crate) struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    pub(crate) fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            position: 0,
        }
    }

    pub(crate) fn parse(mut self) -> Result<Expr, String> {
        if self.peek() == &Token::End {
            return Err("empty expression".to_string());
        }
        let expr = self.parse_expression(Precedence::Lowest)?;
        match self.peek() {
            Token::End => Ok(expr),
            other => Err(format!("syntax error in expression: unexpected {other:?}")),
        }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&Token::End)
    }

    fn next(&mut self) -> Token {
        let token = self.peek().clone();
        if self.position < self.tokens.len() {
            self.position += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), String> {
        if self.next() == expected {
            Ok(())
        } else {
            Err(format!("syntax error in expression: missing {what}"))
        }
    }

    fn parse_expression(&mut self, precedence: Precedence) -> Result<Expr, String> {
        let mut left = self.parse_prefix()?;

        loop {
            match self.peek().clone() {
                Token::Question if precedence < Precedence::Ternary => {
                    self.next();
                    let then = self.parse_expression(Precedence::Lowest)?;
                    self.expect(Token::Colon, "\":\" in ternary")?;
                    let otherwise = self.parse_expression(Precedence::Lowest)?;
                    left = Expr::Ternary(Box::new(left), Box::new(then), Box::new(otherwise));
                }
                Token::Op(op) => {
                    let Some(info) = infix_op(op) else {
                        return Err(format!(
                            "syntax error in expression: unexpected operator {}",
                            op.symbol()
                        ));
                    };
                    if precedence >= info.precedence {
                        break;
                    }
                    self.next();
                    let right = self.parse_expression(rhs_precedence(info))?;
                    left = Expr::Binary(op, Box::new(left), Box::new(right));
                }
                _ => break,
            }
        }

        Ok(left)
    }

    fn parse_prefix(&mut self) -> Result<Expr, String> {
        match self.next() {
            Token::Number(text) => Ok(Expr::Number(text)),
            Token::Operand(operand) => Ok(Expr::Operand(operand)),
            Token::Op(op @ (Op::Sub | Op::Add | Op::Not | Op::BitNot)) => {
                let operand = self.parse_expression(Precedence::Prefix)?;
                Ok(Expr::Unary(op, Box::new(operand)))
            }
            Token::LParen => {
                let inner = self.parse_expression(Precedence::Lowest)?;
                self.expect(Token::RParen, "close parenthesis")?;
                Ok(inner)
            }
            Token::Ident(name) => {
                if self.peek() == &Token::LParen {
                    self.next();
                    return self.parse_call(name);
                }
                match crate::script::number::parse_bool(&name) {
                    Some(value) if !name.is_empty() => Ok(Expr::Boolean(value)),
                    _ => Err(format!("invalid bareword \"{name}\"")),
                }
            }
            Token::End => Err("syntax error in expression: premature end of expression".to_string()),
            other => Err(format!("syntax error in expression: unexpected {other:?}")),
        }
    }

    fn parse_call(&mut self, name: String) -> Result<Expr, String> {
        let mut args = Vec::new();
        if self.peek() == &Token::RParen {
            self.next();
            return Ok(Expr::Call(name, args));
        }
        loop {
            args.push(self.parse_expression(Precedence::Lowest)?);
            match self.next() {
                Token::Comma => continue,
                Token::RParen => return Ok(Expr::Call(name, args)),
                _ => return Err("syntax error in expression: missing close parenthesis".to_string()),
            }
        }
    }
}
