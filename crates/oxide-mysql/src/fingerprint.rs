//! Statement fingerprints.
//!
//! A fingerprint is a normalized form of a statement in which every literal
//! is replaced by `?`, so that statements differing only in their values
//! share one fingerprint.

use crate::lexer::{Lexer, TokenKind};
use crate::parser::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AtomKind {
    Keyword,
    Word,
    Placeholder,
    Punct,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Atom {
    kind: AtomKind,
    text: String,
}

impl Atom {
    fn new(kind: AtomKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    fn is(&self, text: &str) -> bool {
        self.text == text
    }
}

/// Computes the fingerprint of a statement.
///
/// Literals and placeholders become `?`, lists of placeholders after `IN`
/// or `VALUES` collapse to `(?+)`, repeated VALUES tuples collapse to one,
/// reserved words are upper-cased and identifiers are lower-cased unless
/// `case_sensitive` is set. Comments, semicolons and whitespace are
/// normalized away.
///
/// # Errors
///
/// Returns a `ParseError` if the input contains an invalid token.
pub fn fingerprint(sql: &str, case_sensitive: bool) -> Result<String, ParseError> {
    let atoms = collapse_placeholder_lists(collapse_values(atomize(sql, case_sensitive)?));
    Ok(render(&atoms))
}

fn atomize(sql: &str, case_sensitive: bool) -> Result<Vec<Atom>, ParseError> {
    let mut lexer = Lexer::new(sql);
    let mut atoms: Vec<Atom> = Vec::new();

    loop {
        let token = lexer.next_token();
        let atom = match token.kind {
            TokenKind::Eof => break,
            TokenKind::Error(reason) => return Err(ParseError::new(reason, token.span)),
            TokenKind::Semicolon => continue,
            kind if kind.is_literal() || kind == TokenKind::Question => {
                // Fold a sign into the literal when it cannot be a binary minus.
                if atoms.last().is_some_and(|a| a.is("-"))
                    && atoms
                        .len()
                        .checked_sub(2)
                        .and_then(|i| atoms.get(i))
                        .map_or(true, |prev| {
                            prev.kind == AtomKind::Keyword
                                || (prev.kind == AtomKind::Punct && !prev.is(")"))
                        })
                {
                    atoms.pop();
                }
                Atom::new(AtomKind::Placeholder, "?")
            }
            TokenKind::Keyword(kw) => Atom::new(AtomKind::Keyword, kw.as_str()),
            TokenKind::Identifier(name) => {
                let name = if case_sensitive {
                    name
                } else {
                    name.to_lowercase()
                };
                Atom::new(AtomKind::Word, name)
            }
            TokenKind::Variable(name) => Atom::new(AtomKind::Word, format!("@{name}")),
            TokenKind::SystemVariable(name) => {
                Atom::new(AtomKind::Word, format!("@@{}", name.to_lowercase()))
            }
            other => match other.symbol() {
                Some(symbol) => Atom::new(AtomKind::Punct, symbol),
                None => return Err(ParseError::new("Unexpected token", token.span)),
            },
        };
        atoms.push(atom);
    }

    Ok(atoms)
}

/// Returns the index one past the parenthesized group starting at `start`.
fn group_end(atoms: &[Atom], start: usize) -> Option<usize> {
    if !atoms.get(start)?.is("(") {
        return None;
    }
    let mut depth = 0usize;
    for (offset, atom) in atoms[start..].iter().enumerate() {
        if atom.is("(") {
            depth += 1;
        } else if atom.is(")") {
            depth -= 1;
            if depth == 0 {
                return Some(start + offset + 1);
            }
        }
    }
    None
}

/// Drops VALUES tuples identical to the first one.
fn collapse_values(atoms: Vec<Atom>) -> Vec<Atom> {
    let mut out = Vec::with_capacity(atoms.len());
    let mut i = 0;
    while i < atoms.len() {
        let atom = &atoms[i];
        out.push(atom.clone());
        i += 1;

        let is_values = (atom.kind == AtomKind::Keyword && atom.is("VALUES"))
            || (atom.kind == AtomKind::Word && atom.text.eq_ignore_ascii_case("value"));
        if !is_values {
            continue;
        }
        let Some(first_end) = group_end(&atoms, i) else {
            continue;
        };
        let first = &atoms[i..first_end];
        out.extend_from_slice(first);
        i = first_end;

        while atoms.get(i).is_some_and(|a| a.is(",")) {
            match group_end(&atoms, i + 1) {
                Some(end) if atoms[i + 1..end] == *first => i = end,
                _ => break,
            }
        }
    }
    out
}

/// Replaces `(?, ?, ...)` after IN or VALUES with a single `(?+)` atom.
fn collapse_placeholder_lists(atoms: Vec<Atom>) -> Vec<Atom> {
    let mut out: Vec<Atom> = Vec::with_capacity(atoms.len());
    let mut i = 0;
    while i < atoms.len() {
        let after_list_keyword = out.last().is_some_and(|prev| {
            (prev.kind == AtomKind::Keyword && (prev.is("IN") || prev.is("VALUES")))
                || (prev.kind == AtomKind::Word && prev.text.eq_ignore_ascii_case("value"))
        });
        if after_list_keyword {
            if let Some(end) = group_end(&atoms, i) {
                let inner = &atoms[i + 1..end - 1];
                let only_placeholders = !inner.is_empty()
                    && inner.iter().enumerate().all(|(n, atom)| {
                        if n % 2 == 0 {
                            atom.kind == AtomKind::Placeholder
                        } else {
                            atom.is(",")
                        }
                    })
                    && inner.len() % 2 == 1;
                if only_placeholders {
                    out.push(Atom::new(AtomKind::Placeholder, "(?+)"));
                    i = end;
                    continue;
                }
            }
        }
        out.push(atoms[i].clone());
        i += 1;
    }
    out
}

fn render(atoms: &[Atom]) -> String {
    let mut out = String::new();
    let mut prev: Option<&Atom> = None;
    for atom in atoms {
        let glue = match prev {
            None => true,
            Some(p) => {
                p.is("(")
                    || p.is(".")
                    || atom.is(",")
                    || atom.is(")")
                    || atom.is(".")
                    || (atom.is("(") && p.kind == AtomKind::Word)
            }
        };
        if !glue {
            out.push(' ');
        }
        out.push_str(&atom.text);
        prev = Some(atom);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literals_become_placeholders() {
        assert_eq!(
            fingerprint("select * from users where id = 42 and name = 'bob'", false).unwrap(),
            "SELECT * FROM users WHERE id = ? AND name = ?"
        );
    }

    #[test]
    fn test_in_list_collapses() {
        assert_eq!(
            fingerprint("SELECT a FROM t WHERE b IN (1, 2, 3)", false).unwrap(),
            "SELECT a FROM t WHERE b IN (?+)"
        );
    }

    #[test]
    fn test_values_collapse() {
        assert_eq!(
            fingerprint("INSERT INTO t (a, b) VALUES (1, 'x'), (2, 'y'), (3, 'z');", false)
                .unwrap(),
            "INSERT INTO t(a, b) VALUES (?+)"
        );
    }

    #[test]
    fn test_negative_numbers() {
        assert_eq!(
            fingerprint("SELECT a - 1 FROM t WHERE b = -5", false).unwrap(),
            "SELECT a - ? FROM t WHERE b = ?"
        );
    }

    #[test]
    fn test_case_sensitivity() {
        let sql = "SELECT `Name` FROM `Users`";
        assert_eq!(fingerprint(sql, false).unwrap(), "SELECT name FROM users");
        assert_eq!(fingerprint(sql, true).unwrap(), "SELECT Name FROM Users");
    }

    #[test]
    fn test_comments_and_whitespace() {
        assert_eq!(
            fingerprint("SELECT /* hint */ a\n\tFROM t -- trailing\n", false).unwrap(),
            "SELECT a FROM t"
        );
    }

    #[test]
    fn test_invalid_token() {
        assert!(fingerprint("SELECT 'unterminated", false).is_err());
    }
}
