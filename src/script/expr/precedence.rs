use super::lexer::Op;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(super) enum Precedence {
    Lowest,
    Ternary,     // ?:
    LogicalOr,   // ||
    LogicalAnd,  // &&
    BitOr,       // |
    BitXor,      // ^
    BitAnd,      // &
    Equals,      // == != eq ne in ni
    LessGreater, // < > <= >=
    Shift,       // << >>
    Sum,         // + -
    Product,     // * / %
    Power,       // ** (right associative)
    Prefix,      // -x +x !x ~x
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Assoc {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct OpInfo {
    pub op: Op,
    pub precedence: Precedence,
    pub associativity: Assoc,
}

const fn left(op: Op, precedence: Precedence) -> OpInfo {
    OpInfo {
        op,
        precedence,
        associativity: Assoc::Left,
    }
}

// Single source of truth for binary operator precedence + associativity.
pub(super) const OPERATOR_TABLE: &[OpInfo] = &[
    left(Op::Or, Precedence::LogicalOr),
    left(Op::And, Precedence::LogicalAnd),
    left(Op::BitOr, Precedence::BitOr),
    left(Op::BitXor, Precedence::BitXor),
    left(Op::BitAnd, Precedence::BitAnd),
    left(Op::Eq, Precedence::Equals),
    left(Op::Ne, Precedence::Equals),
    left(Op::StrEq, Precedence::Equals),
    left(Op::StrNe, Precedence::Equals),
    left(Op::In, Precedence::Equals),
    left(Op::Ni, Precedence::Equals),
    left(Op::Lt, Precedence::LessGreater),
    left(Op::Gt, Precedence::LessGreater),
    left(Op::Le, Precedence::LessGreater),
    left(Op::Ge, Precedence::LessGreater),
    left(Op::Shl, Precedence::Shift),
    left(Op::Shr, Precedence::Shift),
    left(Op::Add, Precedence::Sum),
    left(Op::Sub, Precedence::Sum),
    left(Op::Mul, Precedence::Product),
    left(Op::Div, Precedence::Product),
    left(Op::Mod, Precedence::Product),
    OpInfo {
        op: Op::Pow,
        precedence: Precedence::Power,
        associativity: Assoc::Right,
    },
];

pub(super) fn infix_op(op: Op) -> Option<OpInfo> {
    OPERATOR_TABLE.iter().find(|info| info.op == op).copied()
}

fn precedence_below(precedence: Precedence) -> Precedence {
    match precedence {
        Precedence::Lowest | Precedence::Ternary => Precedence::Lowest,
        Precedence::LogicalOr => Precedence::Ternary,
        Precedence::LogicalAnd => Precedence::LogicalOr,
        Precedence::BitOr => Precedence::LogicalAnd,
        Precedence::BitXor => Precedence::BitOr,
        Precedence::BitAnd => Precedence::BitXor,
        Precedence::Equals => Precedence::BitAnd,
        Precedence::LessGreater => Precedence::Equals,
        Precedence::Shift => Precedence::LessGreater,
        Precedence::Sum => Precedence::Shift,
        Precedence::Product => Precedence::Sum,
        Precedence::Power => Precedence::Product,
        Precedence::Prefix => Precedence::Power,
    }
}

/// Binding power used when parsing the right operand of `info.op`.
pub(super) fn rhs_precedence(info: OpInfo) -> Precedence {
    match info.associativity {
        Assoc::Left => info.precedence,
        Assoc::Right => precedence_below(info.precedence),
    }
}
