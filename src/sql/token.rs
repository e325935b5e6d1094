//! Statement token definitions
//!
//! Only the keywords the statement layer actually recognises are reserved;
//! everything else lexes as an identifier so field names such as `status`
//! or `role` never collide with the grammar.

use std::fmt;

/// One lexed unit of a statement
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // ========== Reserved words ==========
    Create,
    Select,
    Insert,
    Update,
    Delete,
    Table,
    If,
    Not,
    Exists,
    Into,
    Values,
    Set,
    From,
    As,
    Join,
    Inner,
    Left,
    Outer,
    On,
    Where,
    And,
    Or,
    Like,
    Coalesce,
    Null,
    True,
    False,
    Order,
    By,
    Asc,
    Desc,
    Group,
    Having,
    Limit,
    Offset,

    // ========== Literals ==========
    /// Integer literal
    IntegerLiteral(i64),
    /// Float literal
    FloatLiteral(f64),
    /// String literal (single-quoted)
    StringLiteral(String),
    /// Identifier (collection name, field name, alias)
    Identifier(String),
    /// Positional parameter placeholder `?`
    Placeholder,

    // ========== Operators ==========
    /// =
    Eq,
    /// <> or !=
    Neq,
    /// <
    Lt,
    /// >
    Gt,
    /// <=
    Lte,
    /// >=
    Gte,
    /// +
    Plus,
    /// -
    Minus,
    /// *
    Asterisk,
    /// /
    Slash,
    /// %
    Percent,
    /// ||
    Concat,

    // ========== Delimiters ==========
    /// (
    LParen,
    /// )
    RParen,
    /// ,
    Comma,
    /// ;
    Semicolon,
    /// .
    Dot,

    // ========== Special ==========
    /// End of input
    Eof,
}

/// Reserved words, in the order the statement layer meets them
const KEYWORDS: &[(&str, Token)] = &[
    // statement heads
    ("CREATE", Token::Create),
    ("SELECT", Token::Select),
    ("INSERT", Token::Insert),
    ("UPDATE", Token::Update),
    ("DELETE", Token::Delete),
    // collection declarations
    ("TABLE", Token::Table),
    ("IF", Token::If),
    ("NOT", Token::Not),
    ("EXISTS", Token::Exists),
    // targets and payloads
    ("INTO", Token::Into),
    ("VALUES", Token::Values),
    ("SET", Token::Set),
    ("FROM", Token::From),
    ("AS", Token::As),
    // joins
    ("JOIN", Token::Join),
    ("INNER", Token::Inner),
    ("LEFT", Token::Left),
    ("OUTER", Token::Outer),
    ("ON", Token::On),
    // filters
    ("WHERE", Token::Where),
    ("AND", Token::And),
    ("OR", Token::Or),
    ("LIKE", Token::Like),
    ("COALESCE", Token::Coalesce),
    ("NULL", Token::Null),
    ("TRUE", Token::True),
    ("FALSE", Token::False),
    // result shaping
    ("ORDER", Token::Order),
    ("BY", Token::By),
    ("ASC", Token::Asc),
    ("DESC", Token::Desc),
    ("GROUP", Token::Group),
    ("HAVING", Token::Having),
    ("LIMIT", Token::Limit),
    ("OFFSET", Token::Offset),
];

impl Token {
    /// Resolve a word case-insensitively; non-reserved words are identifiers
    pub fn from_keyword(word: &str) -> Option<Token> {
        KEYWORDS
            .iter()
            .find(|(reserved, _)| reserved.eq_ignore_ascii_case(word))
            .map(|(_, token)| token.clone())
    }

    /// Canonical spelling of a reserved word token
    pub fn keyword(&self) -> Option<&'static str> {
        KEYWORDS
            .iter()
            .find(|(_, token)| token == self)
            .map(|(reserved, _)| *reserved)
    }

    /// Tokens that open a new SELECT clause after WHERE
    pub fn ends_where_clause(&self) -> bool {
        matches!(
            self,
            Token::Order | Token::Group | Token::Having | Token::Limit | Token::Semicolon | Token::Eof
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(word) = self.keyword() {
            return f.write_str(word);
        }
        match self {
            Token::IntegerLiteral(n) => write!(f, "{}", n),
            Token::FloatLiteral(n) => write!(f, "{}", n),
            Token::StringLiteral(s) => write!(f, "'{}'", s),
            Token::Identifier(s) => write!(f, "{}", s),
            Token::Placeholder => write!(f, "?"),
            Token::Eq => write!(f, "="),
            Token::Neq => write!(f, "<>"),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::Lte => write!(f, "<="),
            Token::Gte => write!(f, ">="),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Asterisk => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::Concat => write!(f, "||"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Semicolon => write!(f, ";"),
            Token::Dot => write!(f, "."),
            Token::Eof => write!(f, "EOF"),
            _ => Ok(()),
        }
    }
}
