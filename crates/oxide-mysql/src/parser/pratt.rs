//! Pratt expression parser for operator precedence.
//!
//! Binding powers follow the MySQL operator precedence table, lowest first:
//! `OR ||`, `XOR`, `AND &&`, `NOT`, comparisons, `|`, `&`, shifts,
//! additive, multiplicative, `^`, unary.

use crate::ast::{BinaryOp, UnaryOp};
use crate::lexer::{Keyword, TokenKind};

/// Binding power of the comparison level, shared with IS/IN/LIKE/BETWEEN
/// and infix NOT.
pub const COMPARISON_BP: (u8, u8) = (9, 10);

/// Returns the prefix binding power for a unary operator token.
///
/// Returns `None` if the token is not a prefix operator.
#[must_use]
pub const fn prefix_binding_power(kind: &TokenKind) -> Option<u8> {
    match kind {
        // NOT binds looser than comparisons: NOT a = b is NOT (a = b)
        TokenKind::Keyword(Keyword::Not) => Some(7),
        TokenKind::Minus | TokenKind::BitNot | TokenKind::Bang => Some(23),
        _ => None,
    }
}

/// Returns the infix binding power for a token.
///
/// Returns `(left_bp, right_bp)` where:
/// - Higher binding power = binds tighter
/// - Left associative: left_bp < right_bp
///
/// Returns `None` if the token is not an infix operator.
#[must_use]
pub const fn infix_binding_power(kind: &TokenKind) -> Option<(u8, u8)> {
    match kind {
        TokenKind::Keyword(Keyword::Or) | TokenKind::DoublePipe => Some((1, 2)),
        TokenKind::Keyword(Keyword::Xor) => Some((3, 4)),
        TokenKind::Keyword(Keyword::And) | TokenKind::DoubleAmpersand => Some((5, 6)),

        TokenKind::Eq
        | TokenKind::NotEq
        | TokenKind::NullSafeEq
        | TokenKind::Lt
        | TokenKind::LtEq
        | TokenKind::Gt
        | TokenKind::GtEq
        | TokenKind::Keyword(
            Keyword::Is | Keyword::In | Keyword::Between | Keyword::Like | Keyword::Not,
        ) => Some(COMPARISON_BP),

        TokenKind::BitOr => Some((11, 12)),
        TokenKind::BitAnd => Some((13, 14)),
        TokenKind::LeftShift | TokenKind::RightShift => Some((15, 16)),
        TokenKind::Plus | TokenKind::Minus => Some((17, 18)),
        TokenKind::Star
        | TokenKind::Slash
        | TokenKind::Percent
        | TokenKind::Keyword(Keyword::Div | Keyword::Mod) => Some((19, 20)),
        TokenKind::BitXor => Some((21, 22)),

        _ => None,
    }
}

/// Converts a token to a binary operator.
#[must_use]
pub const fn token_to_binary_op(kind: &TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::Plus => Some(BinaryOp::Add),
        TokenKind::Minus => Some(BinaryOp::Sub),
        TokenKind::Star => Some(BinaryOp::Mul),
        TokenKind::Slash => Some(BinaryOp::Div),
        TokenKind::Keyword(Keyword::Div) => Some(BinaryOp::IntDiv),
        TokenKind::Percent | TokenKind::Keyword(Keyword::Mod) => Some(BinaryOp::Mod),
        TokenKind::Eq => Some(BinaryOp::Eq),
        TokenKind::NotEq => Some(BinaryOp::NotEq),
        TokenKind::NullSafeEq => Some(BinaryOp::NullSafeEq),
        TokenKind::Lt => Some(BinaryOp::Lt),
        TokenKind::LtEq => Some(BinaryOp::LtEq),
        TokenKind::Gt => Some(BinaryOp::Gt),
        TokenKind::GtEq => Some(BinaryOp::GtEq),
        TokenKind::Keyword(Keyword::Like) => Some(BinaryOp::Like),
        TokenKind::Keyword(Keyword::And) | TokenKind::DoubleAmpersand => Some(BinaryOp::And),
        TokenKind::Keyword(Keyword::Or) | TokenKind::DoublePipe => Some(BinaryOp::Or),
        TokenKind::Keyword(Keyword::Xor) => Some(BinaryOp::Xor),
        TokenKind::BitAnd => Some(BinaryOp::BitAnd),
        TokenKind::BitOr => Some(BinaryOp::BitOr),
        TokenKind::BitXor => Some(BinaryOp::BitXor),
        TokenKind::LeftShift => Some(BinaryOp::LeftShift),
        TokenKind::RightShift => Some(BinaryOp::RightShift),
        _ => None,
    }
}

/// Converts a token to a unary operator.
#[must_use]
pub const fn token_to_unary_op(kind: &TokenKind) -> Option<UnaryOp> {
    match kind {
        TokenKind::Minus => Some(UnaryOp::Neg),
        TokenKind::Keyword(Keyword::Not) | TokenKind::Bang => Some(UnaryOp::Not),
        TokenKind::BitNot => Some(UnaryOp::BitNot),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_ordering() {
        let add_bp = infix_binding_power(&TokenKind::Plus).unwrap();
        let mul_bp = infix_binding_power(&TokenKind::Star).unwrap();
        assert!(mul_bp.0 > add_bp.0);

        let and_bp = infix_binding_power(&TokenKind::Keyword(Keyword::And)).unwrap();
        let xor_bp = infix_binding_power(&TokenKind::Keyword(Keyword::Xor)).unwrap();
        let or_bp = infix_binding_power(&TokenKind::Keyword(Keyword::Or)).unwrap();
        assert!(and_bp.0 > xor_bp.0);
        assert!(xor_bp.0 > or_bp.0);

        let eq_bp = infix_binding_power(&TokenKind::Eq).unwrap();
        let not_bp = prefix_binding_power(&TokenKind::Keyword(Keyword::Not)).unwrap();
        assert!(eq_bp.0 > not_bp);
        assert!(not_bp > and_bp.0);
    }

    #[test]
    fn test_left_associativity() {
        let (left, right) = infix_binding_power(&TokenKind::Minus).unwrap();
        assert!(left < right);
    }

    #[test]
    fn test_symbolic_aliases() {
        assert_eq!(
            token_to_binary_op(&TokenKind::DoublePipe),
            Some(BinaryOp::Or)
        );
        assert_eq!(
            token_to_binary_op(&TokenKind::DoubleAmpersand),
            Some(BinaryOp::And)
        );
        assert_eq!(token_to_unary_op(&TokenKind::Bang), Some(UnaryOp::Not));
        assert_eq!(
            token_to_binary_op(&TokenKind::Keyword(Keyword::Div)),
            Some(BinaryOp::IntDiv)
        );
        assert_eq!(token_to_binary_op(&TokenKind::LeftParen), None);
    }
}
