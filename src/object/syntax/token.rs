use std::fmt;

macro_rules! define_tokens {
    (
        symbols { $($sym_name:ident => $sym_str:literal),* $(,)? }
        keywords { $($kw_name:ident => $kw_str:literal),* $(,)? }
    ) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum TokenType {
            // Special
            Illegal,
            Newline,
            Eof,

            // Identifiers & Literals
            Name,
            Int,
            Float,
            Str,
            Bytes,

            // Symbols (operators & delimiters)
            $($sym_name,)*

            // Keywords
            $($kw_name,)*
        }

        impl fmt::Display for TokenType {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let s = match self {
                    TokenType::Illegal => "ILLEGAL",
                    TokenType::Newline => "NEWLINE",
                    TokenType::Eof => "EOF",
                    TokenType::Name => "NAME",
                    TokenType::Int => "INT",
                    TokenType::Float => "FLOAT",
                    TokenType::Str => "STRING",
                    TokenType::Bytes => "BYTES",
                    $(TokenType::$sym_name => $sym_str,)*
                    $(TokenType::$kw_name => $kw_str,)*
                };
                write!(f, "{}", s)
            }
        }

        /// Called by the lexer to check if an identifier is a keyword
        pub fn lookup_name(name: &str) -> TokenType {
            match name {
                $($kw_str => TokenType::$kw_name,)*
                _ => TokenType::Name,
            }
        }

        /// Longest-first operator table used by the lexer.
        pub(super) const SYMBOLS: &[(&str, TokenType)] = &[
            $(($sym_str, TokenType::$sym_name),)*
        ];
    };
}

// Three-character operators precede their prefixes so the lexer can take
// the first match.
define_tokens! {
    symbols {
        DoubleStarAssign  => "**=",
        DoubleSlashAssign => "//=",
        LShiftAssign      => "<<=",
        RShiftAssign      => ">>=",

        DoubleStar  => "**",
        DoubleSlash => "//",
        LShift      => "<<",
        RShift      => ">>",
        Lte         => "<=",
        Gte         => ">=",
        Eq          => "==",
        NotEq       => "!=",
        PlusAssign    => "+=",
        MinusAssign   => "-=",
        StarAssign    => "*=",
        SlashAssign   => "/=",
        PercentAssign => "%=",
        AmpAssign     => "&=",
        PipeAssign    => "|=",
        CaretAssign   => "^=",

        Plus    => "+",
        Minus   => "-",
        Star    => "*",
        Slash   => "/",
        Percent => "%",
        Amp     => "&",
        Pipe    => "|",
        Caret   => "^",
        Tilde   => "~",
        Lt      => "<",
        Gt      => ">",
        Assign  => "=",

        LParen    => "(",
        RParen    => ")",
        LBracket  => "[",
        RBracket  => "]",
        LBrace    => "{",
        RBrace    => "}",
        Comma     => ",",
        Colon     => ":",
        Semicolon => ";",
        Dot       => ".",
    }

    keywords {
        And    => "and",
        Or     => "or",
        Not    => "not",
        In     => "in",
        Is     => "is",
        If     => "if",
        Else   => "else",
        None   => "None",
        True   => "True",
        False  => "False",
        Import => "import",
        From   => "from",
        As     => "as",
        Del    => "del",
        Raise  => "raise",
        Pass   => "pass",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub token_type: TokenType,
    /// Source text for names and symbols, decoded contents for string
    /// literals, the message for `Illegal`.
    pub literal: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(token_type: TokenType, literal: impl Into<String>, line: usize, column: usize) -> Self {
        Token {
            token_type,
            literal: literal.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.token_type {
            TokenType::Name | TokenType::Int | TokenType::Float => write!(f, "{}", self.literal),
            TokenType::Str | TokenType::Bytes => write!(f, "string literal"),
            other => write!(f, "{other}"),
        }
    }
}
