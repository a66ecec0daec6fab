//! Recursive-descent parser for the filter expression grammar
//!
//! ```text
//! expr    := or
//! or      := and ( 'or' and )*
//! and     := not ( 'and' not )*
//! not     := 'not' not | primary
//! primary := '(' expr ')' | cmp
//! cmp     := path op value | path
//! op      := '=' | '!=' | '<' | '<=' | '>' | '>=' | 'contains' | 'startsWith' | 'endsWith'
//! path    := ident ( '.' ident | '[' int ']' )*
//! value   := number | string | 'true' | 'false' | 'null' | ident
//! ```
//!
//! A bare identifier in value position is a string literal, so
//! `name contains foo` reads naturally on the command line.

use crate::{Error, Result};

use super::lexer::{Spanned, Token, tokenize};

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Cmp {
        path: Vec<PathSegment>,
        op: Option<(CmpOp, Literal)>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Contains,
    StartsWith,
    EndsWith,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    Str(String),
    Bool(bool),
    Null,
}

pub fn parse_expr(input: &str) -> Result<Expr> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        len: input.len(),
    };
    let expr = parser.expr()?;
    if let Some(spanned) = parser.peek() {
        return Err(Error::query(
            spanned.pos,
            format!("unexpected trailing input near {:?}", spanned.token),
        ));
    }
    Ok(expr)
}

/// Parse a bare projection path (the `-f` language).
pub fn parse_path(input: &str) -> Result<Vec<PathSegment>> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        len: input.len(),
    };
    let path = parser.path()?;
    if let Some(spanned) = parser.peek() {
        return Err(Error::query(
            spanned.pos,
            format!("unexpected trailing input near {:?}", spanned.token),
        ));
    }
    Ok(path)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    len: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Spanned> {
        let spanned = self.tokens.get(self.pos).cloned();
        if spanned.is_some() {
            self.pos += 1;
        }
        spanned
    }

    fn here(&self) -> usize {
        self.peek().map(|s| s.pos).unwrap_or(self.len)
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Some(Spanned { token: Token::Ident(word), .. }) if word == keyword)
        {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expr(&mut self) -> Result<Expr> {
        self.or()
    }

    fn or(&mut self) -> Result<Expr> {
        let mut left = self.and()?;
        while self.eat_keyword("or") {
            let right = self.and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr> {
        let mut left = self.not()?;
        while self.eat_keyword("and") {
            let right = self.not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn not(&mut self) -> Result<Expr> {
        if self.eat_keyword("not") {
            Ok(Expr::Not(Box::new(self.not()?)))
        } else {
            self.primary()
        }
    }

    fn primary(&mut self) -> Result<Expr> {
        if matches!(self.peek(), Some(Spanned { token: Token::LParen, .. })) {
            self.pos += 1;
            let inner = self.expr()?;
            match self.next() {
                Some(Spanned { token: Token::RParen, .. }) => Ok(inner),
                _ => Err(Error::query(self.here(), "expected ')'")),
            }
        } else {
            self.cmp()
        }
    }

    fn cmp(&mut self) -> Result<Expr> {
        let path = self.path()?;
        let op = match self.comparison_op() {
            Some(op) => {
                let literal = self.value()?;
                Some((op, literal))
            }
            None => None,
        };
        Ok(Expr::Cmp { path, op })
    }

    fn comparison_op(&mut self) -> Option<CmpOp> {
        let op = match self.peek()?.token {
            Token::Eq => CmpOp::Eq,
            Token::Ne => CmpOp::Ne,
            Token::Lt => CmpOp::Lt,
            Token::Le => CmpOp::Le,
            Token::Gt => CmpOp::Gt,
            Token::Ge => CmpOp::Ge,
            Token::Ident(ref word) => match word.as_str() {
                "contains" => CmpOp::Contains,
                "startsWith" => CmpOp::StartsWith,
                "endsWith" => CmpOp::EndsWith,
                _ => return None,
            },
            _ => return None,
        };
        self.pos += 1;
        Some(op)
    }

    fn path(&mut self) -> Result<Vec<PathSegment>> {
        let mut segments = Vec::new();
        match self.next() {
            Some(Spanned { token: Token::Ident(name), .. }) => {
                segments.push(PathSegment::Key(name));
            }
            other => {
                let pos = other.map(|s| s.pos).unwrap_or(self.len);
                return Err(Error::query(pos, "expected a path"));
            }
        }

        loop {
            match self.peek().map(|s| &s.token) {
                Some(Token::Dot) => {
                    self.pos += 1;
                    match self.next() {
                        Some(Spanned { token: Token::Ident(name), .. }) => {
                            segments.push(PathSegment::Key(name));
                        }
                        _ => return Err(Error::query(self.here(), "expected a key after '.'")),
                    }
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    let index = match self.next() {
                        Some(Spanned { token: Token::Number(n), pos }) => {
                            if n.fract() != 0.0 || n < 0.0 {
                                return Err(Error::query(pos, "index must be a non-negative integer"));
                            }
                            n as usize
                        }
                        other => {
                            let pos = other.map(|s| s.pos).unwrap_or(self.len);
                            return Err(Error::query(pos, "expected an index after '['"));
                        }
                    };
                    match self.next() {
                        Some(Spanned { token: Token::RBracket, .. }) => {
                            segments.push(PathSegment::Index(index));
                        }
                        _ => return Err(Error::query(self.here(), "expected ']'")),
                    }
                }
                _ => break,
            }
        }

        Ok(segments)
    }

    fn value(&mut self) -> Result<Literal> {
        match self.next() {
            Some(Spanned { token: Token::Number(n), .. }) => Ok(Literal::Number(n)),
            Some(Spanned { token: Token::Str(s), .. }) => Ok(Literal::Str(s)),
            Some(Spanned { token: Token::Ident(word), .. }) => Ok(match word.as_str() {
                "true" => Literal::Bool(true),
                "false" => Literal::Bool(false),
                "null" => Literal::Null,
                // Bare words are string literals.
                _ => Literal::Str(word),
            }),
            other => {
                let pos = other.map(|s| s.pos).unwrap_or(self.len);
                Err(Error::query(pos, "expected a value"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key(name: &str) -> PathSegment {
        PathSegment::Key(name.to_string())
    }

    #[test]
    fn parses_a_bare_path() {
        let expr = parse_expr("labels").unwrap();
        assert_eq!(
            expr,
            Expr::Cmp {
                path: vec![key("labels")],
                op: None,
            }
        );
    }

    #[test]
    fn parses_a_comparison_with_a_bare_word_value() {
        let expr = parse_expr("name contains foo").unwrap();
        assert_eq!(
            expr,
            Expr::Cmp {
                path: vec![key("name")],
                op: Some((CmpOp::Contains, Literal::Str("foo".into()))),
            }
        );
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let expr = parse_expr("a = 1 or b = 2 and c = 3").unwrap();
        match expr {
            Expr::Or(left, right) => {
                assert!(matches!(*left, Expr::Cmp { .. }));
                assert!(matches!(*right, Expr::And(_, _)));
            }
            other => panic!("expected Or at the top, got {other:?}"),
        }
    }

    #[test]
    fn not_and_parens_compose() {
        let expr = parse_expr("not (a = 1 or b = 2)").unwrap();
        match expr {
            Expr::Not(inner) => assert!(matches!(*inner, Expr::Or(_, _))),
            other => panic!("expected Not, got {other:?}"),
        }
    }

    #[test]
    fn parses_dotted_and_indexed_paths() {
        let expr = parse_expr("items[2].name = \"x\"").unwrap();
        assert_eq!(
            expr,
            Expr::Cmp {
                path: vec![key("items"), PathSegment::Index(2), key("name")],
                op: Some((CmpOp::Eq, Literal::Str("x".into()))),
            }
        );
    }

    #[test]
    fn parses_keyword_values() {
        let expr = parse_expr("active = true and meta = null").unwrap();
        match expr {
            Expr::And(left, right) => {
                assert_eq!(
                    *left,
                    Expr::Cmp {
                        path: vec![key("active")],
                        op: Some((CmpOp::Eq, Literal::Bool(true))),
                    }
                );
                assert_eq!(
                    *right,
                    Expr::Cmp {
                        path: vec![key("meta")],
                        op: Some((CmpOp::Eq, Literal::Null)),
                    }
                );
            }
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn reports_positions_for_parse_errors() {
        let err = parse_expr("a = ").unwrap_err();
        assert!(matches!(err, Error::Query { position: 4, .. }));

        let err = parse_expr("(a = 1").unwrap_err();
        assert!(matches!(err, Error::Query { .. }));
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(parse_expr("a = 1 b").is_err());
    }

    #[test]
    fn parse_path_accepts_only_a_path() {
        assert_eq!(
            parse_path("trinkets[0].age").unwrap(),
            vec![key("trinkets"), PathSegment::Index(0), key("age")]
        );
        assert!(parse_path("a = 1").is_err());
    }
}
