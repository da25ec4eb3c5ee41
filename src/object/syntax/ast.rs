use crate::object::native::{BinOp, CmpOp, UnaryOp};
use crate::object::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

/// Prefix operators; `not` has no slot of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefix {
    Op(UnaryOp),
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Op(CmpOp),
    In,
    NotIn,
    Is,
    IsNot,
}

#[derive(Debug, Clone)]
pub enum Argument {
    Positional(Expr),
    Keyword(String, Expr),
    Star(Expr),
    DoubleStar(Expr),
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Value),
    Name(String),
    List(Vec<Expr>),
    Tuple(Vec<Expr>),
    Set(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),
    Attribute {
        object: Box<Expr>,
        name: String,
    },
    Subscript {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Slice {
        start: Option<Box<Expr>>,
        stop: Option<Box<Expr>>,
        step: Option<Box<Expr>>,
    },
    Call {
        function: Box<Expr>,
        arguments: Vec<Argument>,
    },
    Prefix {
        operator: Prefix,
        operand: Box<Expr>,
    },
    Infix {
        operator: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Compare {
        left: Box<Expr>,
        chain: Vec<(Comparison, Expr)>,
    },
    Bool {
        operator: BoolOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        condition: Box<Expr>,
        consequence: Box<Expr>,
        alternative: Box<Expr>,
    },
}

impl Expr {
    /// Whether the expression may appear on the left of `=`.
    pub fn is_target(&self) -> bool {
        match self {
            Expr::Name(_) | Expr::Attribute { .. } | Expr::Subscript { .. } => true,
            Expr::Tuple(items) | Expr::List(items) => items.iter().all(Expr::is_target),
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum StatementKind {
    Expression(Expr),
    Assign {
        targets: Vec<Expr>,
        value: Expr,
    },
    AugAssign {
        target: Expr,
        operator: BinOp,
        value: Expr,
    },
    Import {
        module: String,
        alias: Option<String>,
    },
    ImportFrom {
        module: String,
        names: Vec<(String, Option<String>)>,
    },
    Del(Vec<Expr>),
    Raise(Option<Expr>),
    Pass,
}

#[derive(Debug, Clone)]
pub struct Statement {
    pub kind: StatementKind,
    pub line: usize,
}
