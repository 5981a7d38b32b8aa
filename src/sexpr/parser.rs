use std::iter::Peekable;

use crate::error::{line_of, ParseError};

use super::{
    lexer::{Token, TokenIter, TokenKind},
    SExpr,
};

pub(super) struct Parser<'a> {
    input: &'a str,
    iter: Peekable<TokenIter<'a>>,
}

type Span = logos::Span;

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ParsedSExpr {
    SExpr(Span, Vec<ParsedSExpr>),
    Atom(Span),
    String(Span),
}

impl ParsedSExpr {
    fn into_sexpr(self, input: &str) -> SExpr {
        match self {
            ParsedSExpr::SExpr(label_span, children) => {
                let label = &input[label_span];
                let children: Box<[SExpr]> =
                    children.into_iter().map(|c| c.into_sexpr(input)).collect();
                SExpr::SExpr(label, children)
            }
            ParsedSExpr::Atom(span) => SExpr::Atom(&input[span]),
            ParsedSExpr::String(span) => SExpr::String(&input[span]),
        }
    }
}

impl<'a> Parser<'a> {
    pub(super) fn new(input: &'a str) -> Self {
        Self {
            input,
            iter: TokenIter::new(input).peekable(),
        }
    }

    fn eof(&self) -> ParseError {
        let end = self.input.len();
        ParseError::UnexpectedEof {
            line: line_of(self.input, end),
            at: end..end,
        }
    }

    fn get(&mut self) -> Result<Token, ParseError> {
        self.iter.next().ok_or_else(|| self.eof())
    }

    fn peek(&mut self) -> Option<TokenKind> {
        self.iter.peek().map(|tok| tok.kind)
    }

    fn error_token(&self, tok: Token) -> ParseError {
        let line = line_of(self.input, tok.span.start);
        if self.input[tok.span.clone()].starts_with('"') {
            ParseError::UnterminatedString { line, at: tok.span }
        } else {
            ParseError::UnknownToken {
                found: self.input[tok.span.clone()].to_owned(),
                line,
                at: tok.span,
            }
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        let tok = self.get()?;
        if tok.kind == kind {
            Ok(tok)
        } else if tok.kind == TokenKind::Error {
            Err(self.error_token(tok))
        } else {
            Err(ParseError::UnexpectedToken {
                expected: format!("{:?}", kind),
                found: format!("{:?}", tok.kind),
                line: line_of(self.input, tok.span.start),
                at: tok.span.clone(),
            })
        }
    }

    fn parse_sexpr(&mut self) -> Result<ParsedSExpr, ParseError> {
        self.expect(TokenKind::LParen)?;
        let label = self.expect(TokenKind::Atom)?;

        let mut children = Vec::new();
        loop {
            match self.peek() {
                Some(TokenKind::RParen) => {
                    self.get()?;
                    break Ok(ParsedSExpr::SExpr(label.span.clone(), children));
                }
                Some(TokenKind::LParen) => {
                    children.push(self.parse_sexpr()?);
                }
                Some(TokenKind::Atom) => {
                    children.push(ParsedSExpr::Atom(self.get()?.span.clone()));
                }
                Some(TokenKind::String) => {
                    children.push(ParsedSExpr::String(self.get()?.span.clone()));
                }
                Some(TokenKind::Error) => {
                    let tok = self.get()?;
                    break Err(self.error_token(tok));
                }
                None => break Err(self.eof()),
            }
        }
    }

    /// Parses exactly one root list; anything after it is an error.
    fn parse_root(&mut self) -> Result<ParsedSExpr, ParseError> {
        let root = self.parse_sexpr()?;
        match self.iter.next() {
            None => Ok(root),
            Some(tok) if tok.kind == TokenKind::Error => Err(self.error_token(tok)),
            Some(tok) => Err(ParseError::UnexpectedToken {
                expected: "end of input".to_owned(),
                found: format!("{:?}", tok.kind),
                line: line_of(self.input, tok.span.start),
                at: tok.span,
            }),
        }
    }
}

impl<'a> TryFrom<&'a str> for SExpr<'a> {
    type Error = ParseError;

    fn try_from(input: &'a str) -> Result<Self, Self::Error> {
        let mut parser = Parser::new(input);
        let sexpr = parser.parse_root()?;
        let sexpr = sexpr.into_sexpr(input);
        Ok(sexpr)
    }
}
