//! Recursive-descent parser for the query language.

use super::ast::{BinOp, Direction, Expr, Term};
use super::lexer::{tokenize, Token};
use crate::error::{EngineError, Result};

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

/// Parse a script into an [`Expr`]. Errors carry the byte offset of the
/// offending token.
pub fn parse(script: &str) -> Result<Expr> {
    let tokens = tokenize(script)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_expr()?;
    parser.expect_eof()?;
    Ok(expr)
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect_eof(&self) -> Result<()> {
        match self.peek() {
            Token::Eof(_) => Ok(()),
            other => Err(EngineError::ParseError {
                position: other.position(),
                message: "trailing input after expression".into(),
            }),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_term()?;

        loop {
            let op = match self.peek() {
                Token::Ident(word, _) if word.eq_ignore_ascii_case("or") => Some(BinOp::Or),
                Token::Ident(word, _) if word.eq_ignore_ascii_case("and") => Some(BinOp::And),
                Token::Ident(word, _) if word.eq_ignore_ascii_case("xor") => Some(BinOp::Xor),
                _ => None,
            };

            let Some(op) = op else { break };
            self.advance();
            let rhs = self.parse_term()?;
            lhs = Expr::BinOp(op, Box::new(lhs), Box::new(rhs));
        }

        Ok(lhs)
    }

    fn parse_term(&mut self) -> Result<Expr> {
        match self.advance() {
            Token::LParen(_) => {
                let inner = self.parse_expr()?;
                match self.advance() {
                    Token::RParen(_) => Ok(inner),
                    other => Err(EngineError::ParseError {
                        position: other.position(),
                        message: "expected ')'".into(),
                    }),
                }
            }
            Token::Ident(word, pos) if word.eq_ignore_ascii_case("dependencies") => {
                self.parse_atom(Direction::Dependencies, pos)
            }
            Token::Ident(word, pos) if word.eq_ignore_ascii_case("dependents") => {
                self.parse_atom(Direction::Dependents, pos)
            }
            other => Err(EngineError::ParseError {
                position: other.position(),
                message: "expected 'dependencies', 'dependents', or '('".into(),
            }),
        }
    }

    fn parse_atom(&mut self, direction: Direction, start: usize) -> Result<Expr> {
        let type_filter = match self.advance() {
            Token::Ident(word, _) => word,
            other => {
                return Err(EngineError::ParseError {
                    position: other.position(),
                    message: "expected a type tag".into(),
                })
            }
        };

        let name = match self.advance() {
            Token::Ident(word, _) => word,
            other => {
                return Err(EngineError::ParseError {
                    position: other.position(),
                    message: "expected a node name".into(),
                })
            }
        };

        let _ = start;
        Ok(Expr::Term(Term {
            direction,
            type_filter,
            name,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_atom() {
        let expr = parse("dependencies library A").unwrap();
        assert_eq!(
            expr,
            Expr::Term(Term {
                direction: Direction::Dependencies,
                type_filter: "library".into(),
                name: "A".into(),
            })
        );
    }

    #[test]
    fn parses_binary_operators_left_associative() {
        let expr = parse("dependencies * A and dependents * B or dependencies * C").unwrap();
        match expr {
            Expr::BinOp(BinOp::Or, lhs, rhs) => {
                assert!(matches!(*lhs, Expr::BinOp(BinOp::And, _, _)));
                assert!(matches!(*rhs, Expr::Term(_)));
            }
            _ => panic!("expected left-associative Or at the top"),
        }
    }

    #[test]
    fn parses_parentheses() {
        let expr = parse("(dependencies library A) and (dependents library D)").unwrap();
        assert!(matches!(expr, Expr::BinOp(BinOp::And, _, _)));
    }

    #[test]
    fn reports_position_on_malformed_input() {
        let err = parse("dependencies").unwrap_err();
        match err {
            EngineError::ParseError { position, .. } => assert_eq!(position, 13),
            other => panic!("expected ParseError, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_keyword() {
        let err = parse("frobnicate library A").unwrap_err();
        assert!(matches!(err, EngineError::ParseError { .. }));
    }

    #[test]
    fn rejects_trailing_input() {
        let err = parse("dependencies library A )").unwrap_err();
        assert!(matches!(err, EngineError::ParseError { .. }));
    }
}
