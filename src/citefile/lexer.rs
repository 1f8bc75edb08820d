//! Tokenizer for citation files.

use super::ParseError;
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Str(String),
    Num { value: f64, integer: bool },
    LParen,
    RParen,
    Comma,
    /// `=`
    Assign,
    /// `<-`
    Arrow,
    Dollar,
    Semicolon,
    Newline,
    Eof,
}

impl Token {
    pub fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("symbol '{}'", name),
            Token::Str(s) => format!("string \"{}\"", s),
            Token::Num { value, .. } => format!("numeric constant {}", value),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Assign => "'='".to_string(),
            Token::Arrow => "'<-'".to_string(),
            Token::Dollar => "'$'".to_string(),
            Token::Semicolon => "';'".to_string(),
            Token::Newline => "end of line".to_string(),
            Token::Eof => "end of input".to_string(),
        }
    }
}

/// A token and the 1-based line it starts on.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
}

/// Splits source text into tokens, ending with [`Token::Eof`].
pub fn tokenize(source: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut lexer = Lexer {
        chars: source.chars().peekable(),
        line: 1,
    };
    let mut tokens = Vec::new();

    loop {
        let line = lexer.line;
        let token = lexer.next_token()?;
        let done = token == Token::Eof;
        tokens.push(Spanned { token, line });
        if done {
            return Ok(tokens);
        }
    }
}

impl Lexer<'_> {
    fn syntax(&self, message: impl Into<String>) -> ParseError {
        ParseError::Syntax {
            line: self.line,
            message: message.into(),
        }
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        self.skip_blank();

        let Some(c) = self.chars.next() else {
            return Ok(Token::Eof);
        };

        match c {
            '\n' => {
                self.line += 1;
                Ok(Token::Newline)
            }
            '(' => Ok(Token::LParen),
            ')' => Ok(Token::RParen),
            ',' => Ok(Token::Comma),
            ';' => Ok(Token::Semicolon),
            '$' => Ok(Token::Dollar),
            '=' => {
                if self.chars.peek() == Some(&'=') {
                    Err(self.syntax("unexpected '=='"))
                } else {
                    Ok(Token::Assign)
                }
            }
            '<' => {
                if self.chars.next_if_eq(&'-').is_some() {
                    Ok(Token::Arrow)
                } else {
                    Err(self.syntax("unexpected '<'"))
                }
            }
            '"' | '\'' => self.string(c),
            c if c.is_ascii_digit() => self.number(c),
            c if c.is_alphabetic() || c == '.' => Ok(Token::Ident(self.identifier(c))),
            other => Err(self.syntax(format!("unexpected '{}'", other))),
        }
    }

    /// Skips spaces, tabs, carriage returns and `#` comments, but not newlines.
    fn skip_blank(&mut self) {
        while let Some(&c) = self.chars.peek() {
            match c {
                ' ' | '\t' | '\r' => {
                    self.chars.next();
                }
                '#' => {
                    while self.chars.next_if(|&c| c != '\n').is_some() {}
                }
                _ => break,
            }
        }
    }

    fn string(&mut self, quote: char) -> Result<Token, ParseError> {
        let start = self.line;
        let mut value = String::new();

        loop {
            let Some(c) = self.chars.next() else {
                return Err(ParseError::Syntax {
                    line: start,
                    message: "unterminated string".to_string(),
                });
            };
            match c {
                c if c == quote => return Ok(Token::Str(value)),
                '\\' => value.push(self.escape()?),
                '\n' => {
                    self.line += 1;
                    value.push('\n');
                }
                c => value.push(c),
            }
        }
    }

    fn escape(&mut self) -> Result<char, ParseError> {
        let Some(c) = self.chars.next() else {
            return Err(self.syntax("unterminated string"));
        };
        match c {
            'n' => Ok('\n'),
            't' => Ok('\t'),
            'r' => Ok('\r'),
            '0' => Ok('\0'),
            '\\' | '"' | '\'' | '`' | ' ' => Ok(c),
            'u' | 'U' => {
                let braced = self.chars.next_if_eq(&'{').is_some();
                let mut hex = String::new();
                while hex.len() < 8 {
                    match self.chars.next_if(|c| c.is_ascii_hexdigit()) {
                        Some(h) => hex.push(h),
                        None => break,
                    }
                }
                if braced && self.chars.next_if_eq(&'}').is_none() {
                    return Err(self.syntax("invalid \\u{xxxx} sequence"));
                }
                u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| self.syntax(format!("invalid unicode escape '\\u{}'", hex)))
            }
            other => Err(self.syntax(format!("'\\{}' is an unrecognized escape", other))),
        }
    }

    fn number(&mut self, first: char) -> Result<Token, ParseError> {
        let mut text = String::from(first);
        let mut integer = true;

        while let Some(c) = self.chars.next_if(|c| c.is_ascii_digit()) {
            text.push(c);
        }
        if let Some(dot) = self.chars.next_if_eq(&'.') {
            integer = false;
            text.push(dot);
            while let Some(c) = self.chars.next_if(|c| c.is_ascii_digit()) {
                text.push(c);
            }
        }
        if let Some(e) = self.chars.next_if(|c| *c == 'e' || *c == 'E') {
            integer = false;
            text.push(e);
            if let Some(sign) = self.chars.next_if(|c| *c == '+' || *c == '-') {
                text.push(sign);
            }
            while let Some(c) = self.chars.next_if(|c| c.is_ascii_digit()) {
                text.push(c);
            }
        }
        if self.chars.next_if_eq(&'L').is_some() {
            integer = true;
        }

        let value = text
            .parse::<f64>()
            .map_err(|_| self.syntax(format!("malformed number '{}'", text)))?;
        Ok(Token::Num { value, integer })
    }

    /// Reads a name; a `pkg::` or `pkg:::` qualifier is dropped.
    fn identifier(&mut self, first: char) -> String {
        let mut name = String::from(first);
        loop {
            while let Some(c) = self
                .chars
                .next_if(|c| c.is_alphanumeric() || *c == '.' || *c == '_')
            {
                name.push(c);
            }
            if self.chars.next_if_eq(&':').is_none() {
                return name;
            }
            self.chars.next_if_eq(&':');
            self.chars.next_if_eq(&':');
            name.clear();
        }
    }
}
