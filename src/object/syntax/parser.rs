use crate::object::builtins;
use crate::object::exception::{ExcKind, Exception};
use crate::object::native::{BinOp, CmpOp, UnaryOp};
use crate::object::value::Value;

use super::ast::{Argument, BoolOp, Comparison, Expr, Prefix, Statement, StatementKind};
use super::lexer::Lexer;
use super::token::{Token, TokenType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Lowest,
    Conditional, // x if c else y
    Or,
    And,
    Not,         // not x
    Comparison,  // <, ==, in, is, ...
    BitOr,
    BitXor,
    BitAnd,
    Shift,
    Sum,
    Product,
    Unary,       // -x, +x, ~x
    Power,       // x ** y
    Postfix,     // f(x), a[i], a.b
}

fn binary_operator(token_type: TokenType) -> Option<(BinOp, Precedence)> {
    let entry = match token_type {
        TokenType::Pipe => (BinOp::Or, Precedence::BitOr),
        TokenType::Caret => (BinOp::Xor, Precedence::BitXor),
        TokenType::Amp => (BinOp::And, Precedence::BitAnd),
        TokenType::LShift => (BinOp::LShift, Precedence::Shift),
        TokenType::RShift => (BinOp::RShift, Precedence::Shift),
        TokenType::Plus => (BinOp::Add, Precedence::Sum),
        TokenType::Minus => (BinOp::Sub, Precedence::Sum),
        TokenType::Star => (BinOp::Mul, Precedence::Product),
        TokenType::Slash => (BinOp::TrueDiv, Precedence::Product),
        TokenType::DoubleSlash => (BinOp::FloorDiv, Precedence::Product),
        TokenType::Percent => (BinOp::Mod, Precedence::Product),
        TokenType::DoubleStar => (BinOp::Pow, Precedence::Power),
        _ => return None,
    };
    Some(entry)
}

fn augmented_operator(token_type: TokenType) -> Option<BinOp> {
    let op = match token_type {
        TokenType::PlusAssign => BinOp::Add,
        TokenType::MinusAssign => BinOp::Sub,
        TokenType::StarAssign => BinOp::Mul,
        TokenType::SlashAssign => BinOp::TrueDiv,
        TokenType::DoubleSlashAssign => BinOp::FloorDiv,
        TokenType::PercentAssign => BinOp::Mod,
        TokenType::DoubleStarAssign => BinOp::Pow,
        TokenType::LShiftAssign => BinOp::LShift,
        TokenType::RShiftAssign => BinOp::RShift,
        TokenType::AmpAssign => BinOp::And,
        TokenType::PipeAssign => BinOp::Or,
        TokenType::CaretAssign => BinOp::Xor,
        _ => return None,
    };
    Some(op)
}

fn starts_expression(token_type: TokenType) -> bool {
    matches!(
        token_type,
        TokenType::Name
            | TokenType::Int
            | TokenType::Float
            | TokenType::Str
            | TokenType::Bytes
            | TokenType::LParen
            | TokenType::LBracket
            | TokenType::LBrace
            | TokenType::Minus
            | TokenType::Plus
            | TokenType::Tilde
            | TokenType::Not
            | TokenType::None
            | TokenType::True
            | TokenType::False
    )
}

/// Parse source holding a single expression (a bare tuple is allowed).
pub fn parse_expression(source: &str) -> Result<Expr, Exception> {
    let mut parser = Parser::new(source);
    parser.skip_newlines();
    let expr = parser.parse_expression_list()?;
    parser.skip_newlines();
    parser.expect(TokenType::Eof)?;
    Ok(expr)
}

/// Parse a sequence of simple statements.
pub fn parse_program(source: &str) -> Result<Vec<Statement>, Exception> {
    let mut parser = Parser::new(source);
    parser.parse_program()
}

pub struct Parser {
    lexer: Lexer,
    current_token: Token,
    peek_token: Token,
}

impl Parser {
    pub fn new(source: &str) -> Self {
        let mut lexer = Lexer::new(source);
        let current_token = lexer.next_token();
        let peek_token = lexer.next_token();
        Parser {
            lexer,
            current_token,
            peek_token,
        }
    }

    pub fn parse_program(&mut self) -> Result<Vec<Statement>, Exception> {
        let mut statements = Vec::new();
        loop {
            while matches!(
                self.current_token.token_type,
                TokenType::Newline | TokenType::Semicolon
            ) {
                self.next_token()?;
            }
            if self.is_current(TokenType::Eof) {
                return Ok(statements);
            }
            statements.push(self.parse_statement()?);
            match self.current_token.token_type {
                TokenType::Newline | TokenType::Semicolon | TokenType::Eof => {}
                _ => return Err(self.error_at_current("invalid syntax")),
            }
        }
    }

    /// Advance, surfacing lexer failures as syntax errors.
    fn next_token(&mut self) -> Result<Token, Exception> {
        let next = self.lexer.next_token();
        let previous = std::mem::replace(&mut self.current_token, std::mem::replace(&mut self.peek_token, next));
        if self.current_token.token_type == TokenType::Illegal {
            let message = self.current_token.literal.clone();
            return Err(self.error_at_current(&message));
        }
        Ok(previous)
    }

    fn is_current(&self, token_type: TokenType) -> bool {
        self.current_token.token_type == token_type
    }

    fn is_peek(&self, token_type: TokenType) -> bool {
        self.peek_token.token_type == token_type
    }

    fn eat(&mut self, token_type: TokenType) -> Result<bool, Exception> {
        if self.is_current(token_type) {
            self.next_token()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn expect(&mut self, token_type: TokenType) -> Result<Token, Exception> {
        if self.is_current(token_type) {
            return self.next_token();
        }
        let message = match (token_type, self.current_token.token_type) {
            (TokenType::RParen, TokenType::Eof) => "'(' was never closed".to_string(),
            (TokenType::RBracket, TokenType::Eof) => "'[' was never closed".to_string(),
            (TokenType::RBrace, TokenType::Eof) => "'{' was never closed".to_string(),
            _ => "invalid syntax".to_string(),
        };
        Err(self.error_at_current(&message))
    }

    fn expect_name(&mut self) -> Result<String, Exception> {
        Ok(self.expect(TokenType::Name)?.literal)
    }

    fn skip_newlines(&mut self) {
        while self.is_current(TokenType::Newline) {
            if self.next_token().is_err() {
                return;
            }
        }
    }

    fn error_at_current(&self, message: &str) -> Exception {
        syntax_error(message, self.current_token.line)
    }

    // ---------------------------------------------------------------------
    // Statements
    // ---------------------------------------------------------------------

    fn parse_statement(&mut self) -> Result<Statement, Exception> {
        let line = self.current_token.line;
        let kind = match self.current_token.token_type {
            TokenType::Pass => {
                self.next_token()?;
                StatementKind::Pass
            }
            TokenType::Del => self.parse_del_statement()?,
            TokenType::Raise => {
                self.next_token()?;
                if starts_expression(self.current_token.token_type) {
                    StatementKind::Raise(Some(self.parse_expression(Precedence::Lowest)?))
                } else {
                    StatementKind::Raise(None)
                }
            }
            TokenType::Import => self.parse_import_statement()?,
            TokenType::From => self.parse_from_statement()?,
            _ => self.parse_expression_statement()?,
        };
        Ok(Statement { kind, line })
    }

    fn parse_del_statement(&mut self) -> Result<StatementKind, Exception> {
        self.next_token()?;
        let mut targets = Vec::new();
        loop {
            let target = self.parse_expression(Precedence::Lowest)?;
            if !matches!(target, Expr::Name(_) | Expr::Attribute { .. } | Expr::Subscript { .. }) {
                return Err(self.error_at_current("cannot delete expression"));
            }
            targets.push(target);
            if !self.eat(TokenType::Comma)? || !starts_expression(self.current_token.token_type) {
                return Ok(StatementKind::Del(targets));
            }
        }
    }

    fn parse_import_statement(&mut self) -> Result<StatementKind, Exception> {
        self.next_token()?;
        let module = self.parse_module_name()?;
        let alias = if self.eat(TokenType::As)? {
            Some(self.expect_name()?)
        } else {
            None
        };
        Ok(StatementKind::Import { module, alias })
    }

    fn parse_from_statement(&mut self) -> Result<StatementKind, Exception> {
        self.next_token()?;
        let module = self.parse_module_name()?;
        self.expect(TokenType::Import)?;
        let parenthesized = self.eat(TokenType::LParen)?;
        let mut names = Vec::new();
        loop {
            let name = self.expect_name()?;
            let alias = if self.eat(TokenType::As)? {
                Some(self.expect_name()?)
            } else {
                None
            };
            names.push((name, alias));
            if !self.eat(TokenType::Comma)? || !self.is_current(TokenType::Name) {
                break;
            }
        }
        if parenthesized {
            self.expect(TokenType::RParen)?;
        }
        Ok(StatementKind::ImportFrom { module, names })
    }

    fn parse_module_name(&mut self) -> Result<String, Exception> {
        let mut name = self.expect_name()?;
        while self.eat(TokenType::Dot)? {
            name.push('.');
            name.push_str(&self.expect_name()?);
        }
        Ok(name)
    }

    fn parse_expression_statement(&mut self) -> Result<StatementKind, Exception> {
        let first = self.parse_expression_list()?;

        if let Some(operator) = augmented_operator(self.current_token.token_type) {
            if !matches!(first, Expr::Name(_) | Expr::Attribute { .. } | Expr::Subscript { .. }) {
                return Err(self.error_at_current("illegal expression for augmented assignment"));
            }
            self.next_token()?;
            let value = self.parse_expression_list()?;
            return Ok(StatementKind::AugAssign {
                target: first,
                operator,
                value,
            });
        }

        if !self.is_current(TokenType::Assign) {
            return Ok(StatementKind::Expression(first));
        }

        let mut targets = vec![first];
        let mut value = None;
        while self.eat(TokenType::Assign)? {
            let next = self.parse_expression_list()?;
            if let Some(previous) = value.replace(next) {
                targets.push(previous);
            }
        }
        if let Some(bad) = targets.iter().find(|target| !target.is_target()) {
            let what = match bad {
                Expr::Literal(_) => "literal",
                Expr::Call { .. } => "function call",
                _ => "expression",
            };
            return Err(self.error_at_current(&format!("cannot assign to {what}")));
        }
        let Some(value) = value else {
            return Err(self.error_at_current("invalid syntax"));
        };
        Ok(StatementKind::Assign { targets, value })
    }

    // ---------------------------------------------------------------------
    // Expressions
    // ---------------------------------------------------------------------

    /// An expression, or a tuple when commas separate several.
    fn parse_expression_list(&mut self) -> Result<Expr, Exception> {
        let first = self.parse_expression(Precedence::Lowest)?;
        if !self.is_current(TokenType::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(TokenType::Comma)? {
            if !starts_expression(self.current_token.token_type) {
                break;
            }
            items.push(self.parse_expression(Precedence::Lowest)?);
        }
        Ok(Expr::Tuple(items))
    }

    fn parse_expression(&mut self, precedence: Precedence) -> Result<Expr, Exception> {
        let mut left = self.parse_prefix()?;

        loop {
            let token_type = self.current_token.token_type;
            if let Some((operator, next)) = binary_operator(token_type) {
                if next <= precedence {
                    break;
                }
                self.next_token()?;
                // ** is right-associative and takes a unary operand.
                let right_precedence = if operator == BinOp::Pow { Precedence::Unary } else { next };
                let right = self.parse_expression(right_precedence)?;
                left = Expr::Infix {
                    operator,
                    left: Box::new(left),
                    right: Box::new(right),
                };
                continue;
            }

            match token_type {
                TokenType::LParen | TokenType::LBracket | TokenType::Dot
                    if precedence < Precedence::Postfix =>
                {
                    left = self.parse_postfix(left)?;
                }
                _ if self.comparison_ahead() && precedence < Precedence::Comparison => {
                    left = self.parse_comparison(left)?;
                }
                TokenType::And | TokenType::Or => {
                    let (operator, next) = if token_type == TokenType::And {
                        (BoolOp::And, Precedence::And)
                    } else {
                        (BoolOp::Or, Precedence::Or)
                    };
                    if next <= precedence {
                        break;
                    }
                    self.next_token()?;
                    let right = self.parse_expression(next)?;
                    left = Expr::Bool {
                        operator,
                        left: Box::new(left),
                        right: Box::new(right),
                    };
                }
                TokenType::If if precedence < Precedence::Conditional => {
                    self.next_token()?;
                    let condition = self.parse_expression(Precedence::Conditional)?;
                    self.expect(TokenType::Else)?;
                    let alternative = self.parse_expression(Precedence::Lowest)?;
                    left = Expr::Conditional {
                        condition: Box::new(condition),
                        consequence: Box::new(left),
                        alternative: Box::new(alternative),
                    };
                }
                _ => break,
            }
        }

        Ok(left)
    }

    fn comparison_ahead(&self) -> bool {
        match self.current_token.token_type {
            TokenType::Lt
            | TokenType::Lte
            | TokenType::Gt
            | TokenType::Gte
            | TokenType::Eq
            | TokenType::NotEq
            | TokenType::In
            | TokenType::Is => true,
            TokenType::Not => self.is_peek(TokenType::In),
            _ => false,
        }
    }

    fn read_comparison(&mut self) -> Result<Comparison, Exception> {
        let token = self.next_token()?;
        let comparison = match token.token_type {
            TokenType::Lt => Comparison::Op(CmpOp::Lt),
            TokenType::Lte => Comparison::Op(CmpOp::Le),
            TokenType::Gt => Comparison::Op(CmpOp::Gt),
            TokenType::Gte => Comparison::Op(CmpOp::Ge),
            TokenType::Eq => Comparison::Op(CmpOp::Eq),
            TokenType::NotEq => Comparison::Op(CmpOp::Ne),
            TokenType::In => Comparison::In,
            TokenType::Not => {
                self.expect(TokenType::In)?;
                Comparison::NotIn
            }
            _ => {
                if self.eat(TokenType::Not)? {
                    Comparison::IsNot
                } else {
                    Comparison::Is
                }
            }
        };
        Ok(comparison)
    }

    fn parse_comparison(&mut self, left: Expr) -> Result<Expr, Exception> {
        let mut chain = Vec::new();
        while self.comparison_ahead() {
            let comparison = self.read_comparison()?;
            let right = self.parse_expression(Precedence::Comparison)?;
            chain.push((comparison, right));
        }
        Ok(Expr::Compare {
            left: Box::new(left),
            chain,
        })
    }

    fn parse_prefix(&mut self) -> Result<Expr, Exception> {
        let token = self.next_token()?;
        let line = token.line;
        let expr = match token.token_type {
            TokenType::Name => Expr::Name(token.literal),
            TokenType::None => Expr::Literal(Value::None),
            TokenType::True => Expr::Literal(Value::Bool(true)),
            TokenType::False => Expr::Literal(Value::Bool(false)),
            TokenType::Int => {
                let value = builtins::parse_int(&token.literal, 0)
                    .map_err(|_| syntax_error("invalid integer literal", line))?;
                Expr::Literal(Value::Int(value))
            }
            TokenType::Float => {
                let value = token
                    .literal
                    .parse::<f64>()
                    .map_err(|_| syntax_error("invalid decimal literal", line))?;
                Expr::Literal(Value::Float(value))
            }
            TokenType::Str | TokenType::Bytes => self.parse_string_literal(token)?,
            TokenType::Minus => self.parse_unary(UnaryOp::Neg)?,
            TokenType::Plus => self.parse_unary(UnaryOp::Pos)?,
            TokenType::Tilde => self.parse_unary(UnaryOp::Invert)?,
            TokenType::Not => {
                let operand = self.parse_expression(Precedence::Not)?;
                Expr::Prefix {
                    operator: Prefix::Not,
                    operand: Box::new(operand),
                }
            }
            TokenType::LParen => self.parse_grouped()?,
            TokenType::LBracket => {
                let items = self.parse_sequence(TokenType::RBracket)?;
                Expr::List(items)
            }
            TokenType::LBrace => self.parse_braced()?,
            TokenType::Illegal => return Err(syntax_error(&token.literal, line)),
            TokenType::Eof | TokenType::Newline => {
                return Err(syntax_error("unexpected end of input", line));
            }
            _ => return Err(syntax_error("invalid syntax", line)),
        };
        Ok(expr)
    }

    fn parse_unary(&mut self, operator: UnaryOp) -> Result<Expr, Exception> {
        let operand = self.parse_expression(Precedence::Unary)?;
        Ok(Expr::Prefix {
            operator: Prefix::Op(operator),
            operand: Box::new(operand),
        })
    }

    /// Adjacent literals concatenate; mixing text and bytes is an error.
    fn parse_string_literal(&mut self, first: Token) -> Result<Expr, Exception> {
        let is_bytes = first.token_type == TokenType::Bytes;
        let mut text = first.literal;
        while matches!(self.current_token.token_type, TokenType::Str | TokenType::Bytes) {
            let next = self.next_token()?;
            if (next.token_type == TokenType::Bytes) != is_bytes {
                return Err(syntax_error("cannot mix bytes and nonbytes literals", next.line));
            }
            text.push_str(&next.literal);
        }
        if is_bytes {
            // Literal bytes were restricted to ASCII and \x escapes.
            let bytes: Vec<u8> = text.chars().map(|c| c as u32 as u8).collect();
            return Ok(Expr::Literal(Value::bytes(&bytes)));
        }
        Ok(Expr::Literal(Value::from(text)))
    }

    fn parse_grouped(&mut self) -> Result<Expr, Exception> {
        if self.eat(TokenType::RParen)? {
            return Ok(Expr::Tuple(Vec::new()));
        }
        let first = self.parse_expression(Precedence::Lowest)?;
        if self.eat(TokenType::RParen)? {
            return Ok(first);
        }
        if self.is_current(TokenType::Eof) {
            return Err(self.error_at_current("'(' was never closed"));
        }
        self.expect(TokenType::Comma)?;
        let mut items = vec![first];
        items.extend(self.parse_sequence(TokenType::RParen)?);
        Ok(Expr::Tuple(items))
    }

    /// Comma separated expressions up to `close`, trailing comma allowed.
    fn parse_sequence(&mut self, close: TokenType) -> Result<Vec<Expr>, Exception> {
        let mut items = Vec::new();
        while !self.is_current(close) {
            items.push(self.parse_expression(Precedence::Lowest)?);
            if !self.eat(TokenType::Comma)? {
                break;
            }
        }
        self.expect(close)?;
        Ok(items)
    }

    fn parse_braced(&mut self) -> Result<Expr, Exception> {
        if self.eat(TokenType::RBrace)? {
            return Ok(Expr::Dict(Vec::new()));
        }
        let first = self.parse_expression(Precedence::Lowest)?;
        if !self.eat(TokenType::Colon)? {
            let mut items = vec![first];
            if self.eat(TokenType::Comma)? {
                items.extend(self.parse_sequence(TokenType::RBrace)?);
            } else {
                self.expect(TokenType::RBrace)?;
            }
            return Ok(Expr::Set(items));
        }

        let mut entries = vec![(first, self.parse_expression(Precedence::Lowest)?)];
        while self.eat(TokenType::Comma)? {
            if self.is_current(TokenType::RBrace) {
                break;
            }
            let key = self.parse_expression(Precedence::Lowest)?;
            self.expect(TokenType::Colon)?;
            entries.push((key, self.parse_expression(Precedence::Lowest)?));
        }
        self.expect(TokenType::RBrace)?;
        Ok(Expr::Dict(entries))
    }

    fn parse_postfix(&mut self, left: Expr) -> Result<Expr, Exception> {
        let token = self.next_token()?;
        let expr = match token.token_type {
            TokenType::Dot => Expr::Attribute {
                object: Box::new(left),
                name: self.expect_name()?,
            },
            TokenType::LBracket => {
                let index = self.parse_subscript()?;
                self.expect(TokenType::RBracket)?;
                Expr::Subscript {
                    object: Box::new(left),
                    index: Box::new(index),
                }
            }
            _ => Expr::Call {
                function: Box::new(left),
                arguments: self.parse_arguments()?,
            },
        };
        Ok(expr)
    }

    fn parse_subscript(&mut self) -> Result<Expr, Exception> {
        let first = self.parse_subscript_item()?;
        if !self.is_current(TokenType::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(TokenType::Comma)? {
            if self.is_current(TokenType::RBracket) {
                break;
            }
            items.push(self.parse_subscript_item()?);
        }
        Ok(Expr::Tuple(items))
    }

    fn parse_subscript_item(&mut self) -> Result<Expr, Exception> {
        let start = self.parse_optional_bound()?;
        if !self.eat(TokenType::Colon)? {
            return start
                .map(|expr| *expr)
                .ok_or_else(|| self.error_at_current("invalid syntax"));
        }
        let stop = self.parse_optional_bound()?;
        let step = if self.eat(TokenType::Colon)? {
            self.parse_optional_bound()?
        } else {
            None
        };
        Ok(Expr::Slice { start, stop, step })
    }

    fn parse_optional_bound(&mut self) -> Result<Option<Box<Expr>>, Exception> {
        if starts_expression(self.current_token.token_type) {
            return Ok(Some(Box::new(self.parse_expression(Precedence::Lowest)?)));
        }
        Ok(None)
    }

    fn parse_arguments(&mut self) -> Result<Vec<Argument>, Exception> {
        let mut arguments = Vec::new();
        let mut seen_keyword = false;
        while !self.is_current(TokenType::RParen) {
            let line = self.current_token.line;
            let argument = if self.eat(TokenType::DoubleStar)? {
                seen_keyword = true;
                Argument::DoubleStar(self.parse_expression(Precedence::Lowest)?)
            } else if self.eat(TokenType::Star)? {
                Argument::Star(self.parse_expression(Precedence::Lowest)?)
            } else if self.is_current(TokenType::Name) && self.is_peek(TokenType::Assign) {
                let name = self.expect_name()?;
                self.next_token()?;
                if arguments
                    .iter()
                    .any(|a| matches!(a, Argument::Keyword(existing, _) if *existing == name))
                {
                    return Err(syntax_error(&format!("keyword argument repeated: {name}"), line));
                }
                seen_keyword = true;
                Argument::Keyword(name, self.parse_expression(Precedence::Lowest)?)
            } else {
                if seen_keyword {
                    return Err(syntax_error(
                        "positional argument follows keyword argument",
                        line,
                    ));
                }
                Argument::Positional(self.parse_expression(Precedence::Lowest)?)
            };
            arguments.push(argument);
            if !self.eat(TokenType::Comma)? {
                break;
            }
        }
        self.expect(TokenType::RParen)?;
        Ok(arguments)
    }
}

fn syntax_error(message: &str, line: usize) -> Exception {
    Exception::new(
        ExcKind::SyntaxError,
        format!("{message} (<string>, line {line})"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(source: &str) -> String {
        render(&parse_expression(source).unwrap())
    }

    // Fully parenthesized rendering to make grouping visible.
    fn render(expr: &Expr) -> String {
        match expr {
            Expr::Literal(value) => format!("{value:?}"),
            Expr::Name(name) => name.clone(),
            Expr::Tuple(items) => format!(
                "({})",
                items.iter().map(render).collect::<Vec<_>>().join(", ")
            ),
            Expr::Prefix { operator, operand } => format!("({operator:?} {})", render(operand)),
            Expr::Infix { operator, left, right } => {
                format!("({} {} {})", render(left), operator.symbol(), render(right))
            }
            Expr::Bool { operator, left, right } => {
                format!("({} {operator:?} {})", render(left), render(right))
            }
            Expr::Compare { left, chain } => {
                let mut out = format!("({}", render(left));
                for (comparison, right) in chain {
                    out.push_str(&format!(" {comparison:?} {}", render(right)));
                }
                out.push(')');
                out
            }
            Expr::Call { function, arguments } => {
                format!("{}/{}", render(function), arguments.len())
            }
            Expr::Attribute { object, name } => format!("{}.{name}", render(object)),
            Expr::Subscript { object, index } => format!("{}[{}]", render(object), render(index)),
            Expr::Slice { .. } => "slice".to_string(),
            Expr::Conditional {
                condition,
                consequence,
                alternative,
            } => format!(
                "({} if {} else {})",
                render(consequence),
                render(condition),
                render(alternative)
            ),
            other => format!("{other:?}"),
        }
    }

    #[test]
    fn arithmetic_precedence() {
        assert_eq!(shape("1 + 2 * 3"), "(1 + (2 * 3))");
        assert_eq!(shape("-2 ** 2"), "(Op(Neg) (2 ** 2))");
        assert_eq!(shape("2 ** 3 ** 2"), "(2 ** (3 ** 2))");
        assert_eq!(shape("2 ** -1"), "(2 ** (Op(Neg) 1))");
        assert_eq!(shape("a - b - c"), "((a - b) - c)");
        assert_eq!(shape("1 | 2 ^ 3 & 4 << 1"), "(1 | (2 ^ (3 & (4 << 1))))");
    }

    #[test]
    fn boolean_and_comparison_grouping() {
        assert_eq!(
            shape("not a == b and c"),
            "((Not (a Op(Eq) b)) And c)"
        );
        assert_eq!(shape("1 < x <= 3"), "(1 Op(Lt) x Op(Le) 3)");
        assert_eq!(shape("a not in b"), "(a NotIn b)");
        assert_eq!(shape("a is not None"), "(a IsNot None)");
        assert_eq!(shape("a or b and c"), "(a Or (b And c))");
    }

    #[test]
    fn conditional_expressions_bind_loosest() {
        assert_eq!(shape("1 + x if c else y"), "((1 + x) if c else y)");
    }

    #[test]
    fn postfix_chains() {
        assert_eq!(shape("a.b(1, k=2)[0]"), "a.b/2[0]");
        assert_eq!(shape("(1,)"), "(1)");
        assert_eq!(shape("1, 2"), "(1, 2)");
        assert!(matches!(
            parse_expression("x[1:2]").unwrap(),
            Expr::Subscript { index, .. } if matches!(*index, Expr::Slice { .. })
        ));
    }

    #[test]
    fn literals() {
        assert!(matches!(parse_expression("{}").unwrap(), Expr::Dict(e) if e.is_empty()));
        assert!(matches!(parse_expression("{1, 2}").unwrap(), Expr::Set(e) if e.len() == 2));
        assert!(matches!(parse_expression("'a' 'b'").unwrap(), Expr::Literal(Value::Str(s)) if &*s == "ab"));
        assert!(matches!(parse_expression("b'\\xff'").unwrap(), Expr::Literal(Value::Bytes(b)) if *b == [0xff]));
    }

    #[test]
    fn statements() {
        let program = parse_program("x = y = 1; x += 2\nimport math as m\nfrom math import pi, sqrt as root\ndel x\nraise\npass").unwrap();
        let kinds: Vec<&StatementKind> = program.iter().map(|s| &s.kind).collect();
        assert!(matches!(kinds[0], StatementKind::Assign { targets, .. } if targets.len() == 2));
        assert!(matches!(kinds[1], StatementKind::AugAssign { operator: BinOp::Add, .. }));
        assert!(matches!(kinds[2], StatementKind::Import { alias: Some(a), .. } if a == "m"));
        assert!(matches!(kinds[3], StatementKind::ImportFrom { names, .. } if names.len() == 2));
        assert!(matches!(kinds[4], StatementKind::Del(t) if t.len() == 1));
        assert!(matches!(kinds[5], StatementKind::Raise(None)));
        assert!(matches!(kinds[6], StatementKind::Pass));
        assert_eq!(program[2].line, 2);
    }

    #[test]
    fn syntax_errors_name_the_line() {
        let error = parse_program("x = 1\n1 = x").unwrap_err();
        assert!(error.is(ExcKind::SyntaxError));
        assert_eq!(error.message(), "cannot assign to literal (<string>, line 2)");

        let error = parse_expression("f(a=1, b)").unwrap_err();
        assert_eq!(
            error.message(),
            "positional argument follows keyword argument (<string>, line 1)"
        );
        assert_eq!(
            parse_expression("(1 + 2").unwrap_err().message(),
            "'(' was never closed (<string>, line 1)"
        );
        assert!(parse_program("x y").is_err());
        assert!(parse_expression("'open").is_err());
    }
}
