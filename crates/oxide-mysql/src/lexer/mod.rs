//! MySQL lexer.
//!
//! A hand-written lexer producing a stream of spanned tokens. MySQL specifics
//! such as backtick identifiers, `#` comments, backslash escapes and `@@`
//! system variables are handled here so the parser never sees raw text.

mod span;
mod token;
mod tokenizer;

pub use span::Span;
pub use token::{Keyword, Token, TokenKind};
pub use tokenizer::Lexer;
