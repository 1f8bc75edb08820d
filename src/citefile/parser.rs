//! Recursive-descent parser producing statements from tokens.

use super::lexer::{Spanned, Token};
use super::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Str(String),
    Num { value: f64, integer: bool },
    Ident(String),
    /// `target$field`
    Member { target: Box<Expr>, field: String },
    Call { name: String, args: Vec<Arg> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub line: usize,
}

/// A call argument, optionally named (`name = value`).
#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub name: Option<String>,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Assign { name: String, value: Expr },
    Expr(Expr),
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

/// Parses a token stream (as produced by `tokenize`) into statements.
pub fn parse(tokens: Vec<Spanned>) -> Result<Vec<Stmt>, ParseError> {
    let mut parser = Parser { tokens, pos: 0 };
    let mut statements = Vec::new();

    loop {
        parser.skip_separators();
        if parser.peek() == &Token::Eof {
            return Ok(statements);
        }
        statements.push(parser.statement()?);
    }
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.current().token
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens
            .get(self.pos + offset)
            .map_or(&Token::Eof, |s| &s.token)
    }

    fn current(&self) -> &Spanned {
        // tokenize always terminates the stream with Eof
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn line(&self) -> usize {
        self.current().line
    }

    fn advance(&mut self) -> Token {
        let token = self.current().token.clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn unexpected(&self) -> ParseError {
        ParseError::Syntax {
            line: self.line(),
            message: format!("unexpected {}", self.peek().describe()),
        }
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek(), Token::Newline | Token::Semicolon) {
            self.advance();
        }
    }

    fn skip_newlines(&mut self) {
        while self.peek() == &Token::Newline {
            self.advance();
        }
    }

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        let expr = self.expression()?;

        let stmt = if matches!(self.peek(), Token::Arrow | Token::Assign) {
            let ExprKind::Ident(name) = expr.kind else {
                return Err(ParseError::Syntax {
                    line: expr.line,
                    message: "invalid assignment target".to_string(),
                });
            };
            self.advance();
            self.skip_newlines();
            Stmt::Assign {
                name,
                value: self.expression()?,
            }
        } else {
            Stmt::Expr(expr)
        };

        match self.peek() {
            Token::Newline | Token::Semicolon | Token::Eof => Ok(stmt),
            _ => Err(self.unexpected()),
        }
    }

    fn expression(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;

        loop {
            match self.peek() {
                Token::Dollar => {
                    self.advance();
                    let line = self.line();
                    let field = match self.advance() {
                        Token::Ident(name) | Token::Str(name) => name,
                        _ => {
                            return Err(ParseError::Syntax {
                                line,
                                message: "expected a name after '$'".to_string(),
                            })
                        }
                    };
                    expr = Expr {
                        line: expr.line,
                        kind: ExprKind::Member {
                            target: Box::new(expr),
                            field,
                        },
                    };
                }
                Token::LParen => {
                    let ExprKind::Ident(name) = expr.kind else {
                        return Err(ParseError::Syntax {
                            line: expr.line,
                            message: "attempt to apply non-function".to_string(),
                        });
                    };
                    self.advance();
                    let args = self.arguments()?;
                    expr = Expr {
                        line: expr.line,
                        kind: ExprKind::Call { name, args },
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let line = self.line();
        let kind = match self.peek().clone() {
            Token::Str(s) => ExprKind::Str(s),
            Token::Num { value, integer } => ExprKind::Num { value, integer },
            Token::Ident(name) => ExprKind::Ident(name),
            Token::LParen => {
                self.advance();
                self.skip_newlines();
                let inner = self.expression()?;
                self.skip_newlines();
                if self.peek() != &Token::RParen {
                    return Err(self.unexpected());
                }
                self.advance();
                return Ok(inner);
            }
            _ => return Err(self.unexpected()),
        };
        self.advance();
        Ok(Expr { kind, line })
    }

    /// Parses arguments after the opening parenthesis, through the closing one.
    fn arguments(&mut self) -> Result<Vec<Arg>, ParseError> {
        let mut args = Vec::new();

        loop {
            self.skip_newlines();
            if self.peek() == &Token::RParen {
                self.advance();
                return Ok(args);
            }

            let name = match (self.peek(), self.peek_at(1)) {
                (Token::Ident(name) | Token::Str(name), Token::Assign) => Some(name.clone()),
                _ => None,
            };
            if name.is_some() {
                self.advance();
                self.advance();
                self.skip_newlines();
            }
            let value = self.expression()?;
            args.push(Arg { name, value });

            self.skip_newlines();
            match self.peek() {
                Token::Comma => {
                    self.advance();
                }
                Token::RParen => {}
                _ => return Err(self.unexpected()),
            }
        }
    }
}
