//! Token types for the MySQL lexer.

use super::Span;

/// Reserved MySQL words the parser treats structurally.
///
/// Non-reserved words such as `ENGINE`, `COMMENT` or type names are lexed as
/// identifiers and matched contextually, so they stay usable as column names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    // Queries
    Select,
    From,
    Where,
    Order,
    By,
    Group,
    Having,
    Limit,
    Distinct,
    All,
    For,
    Union,

    // Joins
    Join,
    Inner,
    Left,
    Right,
    Outer,
    Cross,
    On,
    Using,

    // Data manipulation
    Insert,
    Into,
    Values,
    Update,
    Set,
    Delete,
    Replace,
    Ignore,

    // Data definition
    Create,
    Drop,
    Alter,
    Table,
    Index,
    Key,
    Database,
    Schema,
    Use,
    Add,
    Column,
    Change,
    Rename,
    To,

    // Constraints and attributes
    Primary,
    Foreign,
    References,
    Unique,
    Fulltext,
    Check,
    Default,
    Constraint,
    Cascade,
    Restrict,
    Character,
    Collate,

    // Operators
    And,
    Or,
    Xor,
    Not,
    In,
    Between,
    Like,
    Is,
    Null,
    True,
    False,
    Exists,
    Div,
    Mod,

    // Misc
    Asc,
    Desc,
    As,
    Case,
    When,
    Then,
    Else,
    End,
    Cast,
    If,
}

impl Keyword {
    /// Attempts to parse a keyword from a string (case-insensitive).
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        let keyword = match s.to_ascii_uppercase().as_str() {
            "SELECT" => Self::Select,
            "FROM" => Self::From,
            "WHERE" => Self::Where,
            "ORDER" => Self::Order,
            "BY" => Self::By,
            "GROUP" => Self::Group,
            "HAVING" => Self::Having,
            "LIMIT" => Self::Limit,
            "DISTINCT" => Self::Distinct,
            "ALL" => Self::All,
            "FOR" => Self::For,
            "UNION" => Self::Union,
            "JOIN" => Self::Join,
            "INNER" => Self::Inner,
            "LEFT" => Self::Left,
            "RIGHT" => Self::Right,
            "OUTER" => Self::Outer,
            "CROSS" => Self::Cross,
            "ON" => Self::On,
            "USING" => Self::Using,
            "INSERT" => Self::Insert,
            "INTO" => Self::Into,
            "VALUES" => Self::Values,
            "UPDATE" => Self::Update,
            "SET" => Self::Set,
            "DELETE" => Self::Delete,
            "REPLACE" => Self::Replace,
            "IGNORE" => Self::Ignore,
            "CREATE" => Self::Create,
            "DROP" => Self::Drop,
            "ALTER" => Self::Alter,
            "TABLE" => Self::Table,
            "INDEX" => Self::Index,
            "KEY" => Self::Key,
            "DATABASE" => Self::Database,
            "SCHEMA" => Self::Schema,
            "USE" => Self::Use,
            "ADD" => Self::Add,
            "COLUMN" => Self::Column,
            "CHANGE" => Self::Change,
            "RENAME" => Self::Rename,
            "TO" => Self::To,
            "PRIMARY" => Self::Primary,
            "FOREIGN" => Self::Foreign,
            "REFERENCES" => Self::References,
            "UNIQUE" => Self::Unique,
            "FULLTEXT" => Self::Fulltext,
            "CHECK" => Self::Check,
            "DEFAULT" => Self::Default,
            "CONSTRAINT" => Self::Constraint,
            "CASCADE" => Self::Cascade,
            "RESTRICT" => Self::Restrict,
            "CHARACTER" => Self::Character,
            "COLLATE" => Self::Collate,
            "AND" => Self::And,
            "OR" => Self::Or,
            "XOR" => Self::Xor,
            "NOT" => Self::Not,
            "IN" => Self::In,
            "BETWEEN" => Self::Between,
            "LIKE" => Self::Like,
            "IS" => Self::Is,
            "NULL" => Self::Null,
            "TRUE" => Self::True,
            "FALSE" => Self::False,
            "EXISTS" => Self::Exists,
            "DIV" => Self::Div,
            "MOD" => Self::Mod,
            "ASC" => Self::Asc,
            "DESC" => Self::Desc,
            "AS" => Self::As,
            "CASE" => Self::Case,
            "WHEN" => Self::When,
            "THEN" => Self::Then,
            "ELSE" => Self::Else,
            "END" => Self::End,
            "CAST" => Self::Cast,
            "IF" => Self::If,
            _ => return None,
        };
        Some(keyword)
    }

    /// Returns the keyword as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::From => "FROM",
            Self::Where => "WHERE",
            Self::Order => "ORDER",
            Self::By => "BY",
            Self::Group => "GROUP",
            Self::Having => "HAVING",
            Self::Limit => "LIMIT",
            Self::Distinct => "DISTINCT",
            Self::All => "ALL",
            Self::For => "FOR",
            Self::Union => "UNION",
            Self::Join => "JOIN",
            Self::Inner => "INNER",
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
            Self::Outer => "OUTER",
            Self::Cross => "CROSS",
            Self::On => "ON",
            Self::Using => "USING",
            Self::Insert => "INSERT",
            Self::Into => "INTO",
            Self::Values => "VALUES",
            Self::Update => "UPDATE",
            Self::Set => "SET",
            Self::Delete => "DELETE",
            Self::Replace => "REPLACE",
            Self::Ignore => "IGNORE",
            Self::Create => "CREATE",
            Self::Drop => "DROP",
            Self::Alter => "ALTER",
            Self::Table => "TABLE",
            Self::Index => "INDEX",
            Self::Key => "KEY",
            Self::Database => "DATABASE",
            Self::Schema => "SCHEMA",
            Self::Use => "USE",
            Self::Add => "ADD",
            Self::Column => "COLUMN",
            Self::Change => "CHANGE",
            Self::Rename => "RENAME",
            Self::To => "TO",
            Self::Primary => "PRIMARY",
            Self::Foreign => "FOREIGN",
            Self::References => "REFERENCES",
            Self::Unique => "UNIQUE",
            Self::Fulltext => "FULLTEXT",
            Self::Check => "CHECK",
            Self::Default => "DEFAULT",
            Self::Constraint => "CONSTRAINT",
            Self::Cascade => "CASCADE",
            Self::Restrict => "RESTRICT",
            Self::Character => "CHARACTER",
            Self::Collate => "COLLATE",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Xor => "XOR",
            Self::Not => "NOT",
            Self::In => "IN",
            Self::Between => "BETWEEN",
            Self::Like => "LIKE",
            Self::Is => "IS",
            Self::Null => "NULL",
            Self::True => "TRUE",
            Self::False => "FALSE",
            Self::Exists => "EXISTS",
            Self::Div => "DIV",
            Self::Mod => "MOD",
            Self::Asc => "ASC",
            Self::Desc => "DESC",
            Self::As => "AS",
            Self::Case => "CASE",
            Self::When => "WHEN",
            Self::Then => "THEN",
            Self::Else => "ELSE",
            Self::End => "END",
            Self::Cast => "CAST",
            Self::If => "IF",
        }
    }
}

/// The kind of token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    /// Integer literal (e.g., 42)
    Integer(i64),
    /// Float literal (e.g., 3.14)
    Float(f64),
    /// String literal, single or double quoted (e.g., 'hello')
    String(String),
    /// Hex literal (e.g., X'1234')
    Blob(Vec<u8>),

    // Identifiers and keywords
    /// Identifier, bare or backtick-quoted
    Identifier(String),
    /// Reserved word
    Keyword(Keyword),
    /// User variable (`@name`)
    Variable(String),
    /// System variable (`@@name`, `@@global.name`)
    SystemVariable(String),

    // Operators
    /// +
    Plus,
    /// -
    Minus,
    /// *
    Star,
    /// /
    Slash,
    /// %
    Percent,
    /// =
    Eq,
    /// != or <>
    NotEq,
    /// <=>
    NullSafeEq,
    /// <
    Lt,
    /// <=
    LtEq,
    /// >
    Gt,
    /// >=
    GtEq,
    /// ||
    DoublePipe,
    /// &&
    DoubleAmpersand,
    /// !
    Bang,
    /// &
    BitAnd,
    /// |
    BitOr,
    /// ^
    BitXor,
    /// ~
    BitNot,
    /// <<
    LeftShift,
    /// >>
    RightShift,

    // Delimiters
    /// (
    LeftParen,
    /// )
    RightParen,
    /// ,
    Comma,
    /// ;
    Semicolon,
    /// .
    Dot,
    /// ?
    Question,

    // Special
    /// End of input
    Eof,
    /// Invalid/unknown token
    Error(String),
}

impl TokenKind {
    /// Returns the fixed source text of operator and delimiter tokens.
    #[must_use]
    pub const fn symbol(&self) -> Option<&'static str> {
        let text = match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::NullSafeEq => "<=>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::DoublePipe => "||",
            Self::DoubleAmpersand => "&&",
            Self::Bang => "!",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::BitNot => "~",
            Self::LeftShift => "<<",
            Self::RightShift => ">>",
            Self::LeftParen => "(",
            Self::RightParen => ")",
            Self::Comma => ",",
            Self::Semicolon => ";",
            Self::Dot => ".",
            Self::Question => "?",
            _ => return None,
        };
        Some(text)
    }

    /// Returns true for literal tokens (numbers, strings, hex blobs).
    #[must_use]
    pub const fn is_literal(&self) -> bool {
        matches!(
            self,
            Self::Integer(_) | Self::Float(_) | Self::String(_) | Self::Blob(_)
        )
    }
}

/// A token with its span in the source code.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token.
    pub kind: TokenKind,
    /// The location in the source code.
    pub span: Span,
}

impl Token {
    /// Creates a new token.
    #[must_use]
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Returns true if this is an EOF token.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    /// Returns the keyword if this is a keyword token.
    #[must_use]
    pub const fn as_keyword(&self) -> Option<Keyword> {
        match &self.kind {
            TokenKind::Keyword(kw) => Some(*kw),
            _ => None,
        }
    }
}
