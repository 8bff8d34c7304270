//! SQL Lexer (Tokenizer)
//!
//! This module converts SQL strings into a stream of tokens.

use super::token::Token;
use crate::error::{Error, Result};

/// SQL Lexer
pub struct Lexer {
    /// Input characters
    input: Vec<char>,
    /// Current position in input
    position: usize,
}

impl Lexer {
    /// Create a new lexer for the given input
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            if token == Token::Eof {
                tokens.push(token);
                break;
            }
            tokens.push(token);
        }

        Ok(tokens)
    }

    /// Get the next token from the input
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();
        self.skip_comments();
        self.skip_whitespace();

        if self.is_at_end() {
            return Ok(Token::Eof);
        }

        let ch = self.current_char();

        if let Some(token) = punctuation(ch) {
            self.advance();
            return Ok(token);
        }

        match ch {
            '<' => {
                self.advance();
                if self.eat('=') {
                    return Ok(Token::Lte);
                }
                if self.eat('>') {
                    return Ok(Token::Neq);
                }
                return Ok(Token::Lt);
            }
            '>' => {
                self.advance();
                return Ok(if self.eat('=') { Token::Gte } else { Token::Gt });
            }
            '!' | '|' => {
                self.advance();
                let (second, token) = if ch == '!' { ('=', Token::Neq) } else { ('|', Token::Concat) };
                if self.eat(second) {
                    return Ok(token);
                }
                return Err(Error::UnexpectedCharacter(ch, self.position));
            }
            '\'' => return self.read_string(),
            '"' => return self.read_quoted_identifier(),
            _ => {}
        }

        // Numbers
        if ch.is_ascii_digit() {
            return self.read_number();
        }

        // Identifiers and keywords
        if ch.is_alphabetic() || ch == '_' {
            return self.read_identifier();
        }

        Err(Error::UnexpectedCharacter(ch, self.position))
    }

    /// Check if we've reached the end of input
    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    /// Get the current character
    fn current_char(&self) -> char {
        self.input[self.position]
    }

    /// Peek at the next character
    fn peek_char(&self) -> Option<char> {
        if self.position + 1 < self.input.len() {
            Some(self.input[self.position + 1])
        } else {
            None
        }
    }

    /// Advance to the next character
    fn advance(&mut self) {
        self.position += 1;
    }

    /// Consume `expected` if it is the current character
    fn eat(&mut self, expected: char) -> bool {
        if !self.is_at_end() && self.current_char() == expected {
            self.advance();
            return true;
        }
        false
    }

    /// Skip whitespace characters
    fn skip_whitespace(&mut self) {
        while !self.is_at_end() && self.current_char().is_whitespace() {
            self.advance();
        }
    }

    /// Skip SQL comments (-- and /* */)
    fn skip_comments(&mut self) {
        if self.is_at_end() {
            return;
        }

        // Single line comment: --
        if self.current_char() == '-' && self.peek_char() == Some('-') {
            while !self.is_at_end() && self.current_char() != '\n' {
                self.advance();
            }
            self.skip_whitespace();
            self.skip_comments();
        }

        // Multi-line comment: /* */
        if self.current_char() == '/' && self.peek_char() == Some('*') {
            self.advance(); // skip /
            self.advance(); // skip *

            while !self.is_at_end() {
                if self.current_char() == '*' && self.peek_char() == Some('/') {
                    self.advance(); // skip *
                    self.advance(); // skip /
                    break;
                }
                self.advance();
            }
            self.skip_whitespace();
            self.skip_comments();
        }
    }

    /// Read a string literal (single-quoted)
    fn read_string(&mut self) -> Result<Token> {
        let start_pos = self.position;
        self.advance(); // skip opening quote

        let mut value = String::new();

        while !self.is_at_end() {
            let ch = self.current_char();

            if ch == '\'' {
                // Check for escaped quote ''
                if self.peek_char() == Some('\'') {
                    value.push('\'');
                    self.advance();
                    self.advance();
                } else {
                    self.advance(); // skip closing quote
                    return Ok(Token::StringLiteral(value));
                }
            } else {
                value.push(ch);
                self.advance();
            }
        }

        Err(Error::UnterminatedString(start_pos))
    }

    /// Read a quoted identifier (double-quoted)
    fn read_quoted_identifier(&mut self) -> Result<Token> {
        let start_pos = self.position;
        self.advance(); // skip opening quote

        let mut value = String::new();

        while !self.is_at_end() {
            let ch = self.current_char();

            if ch == '"' {
                // Check for escaped quote ""
                if self.peek_char() == Some('"') {
                    value.push('"');
                    self.advance();
                    self.advance();
                } else {
                    self.advance(); // skip closing quote
                    if value.is_empty() {
                        return Err(Error::ParseError(format!(
                            "zero-length delimited identifier at position {}",
                            start_pos
                        )));
                    }
                    return Ok(Token::QuotedIdentifier(value));
                }
            } else {
                value.push(ch);
                self.advance();
            }
        }

        Err(Error::UnterminatedString(start_pos))
    }

    /// Read a number (integer or float)
    fn read_number(&mut self) -> Result<Token> {
        let start_pos = self.position;
        let mut value = String::new();
        let mut is_float = false;

        while !self.is_at_end() {
            let ch = self.current_char();

            if ch.is_ascii_digit() {
                value.push(ch);
                self.advance();
            } else if ch == '.' && !is_float {
                // Check if it's a float or a dot operator
                if let Some(next) = self.peek_char() {
                    if next.is_ascii_digit() {
                        is_float = true;
                        value.push(ch);
                        self.advance();
                    } else {
                        break;
                    }
                } else {
                    break;
                }
            } else if (ch == 'e' || ch == 'E') && !value.is_empty() {
                // Scientific notation
                is_float = true;
                value.push(ch);
                self.advance();

                if !self.is_at_end() && (self.current_char() == '+' || self.current_char() == '-') {
                    value.push(self.current_char());
                    self.advance();
                }
            } else {
                break;
            }
        }

        if is_float {
            value
                .parse::<f64>()
                .map(Token::FloatLiteral)
                .map_err(|_| Error::InvalidNumber(start_pos))
        } else {
            value
                .parse::<i64>()
                .map(Token::IntegerLiteral)
                .map_err(|_| Error::InvalidNumber(start_pos))
        }
    }

    /// Read an identifier or keyword. Unquoted identifiers fold to lower case.
    fn read_identifier(&mut self) -> Result<Token> {
        let mut value = String::new();

        while !self.is_at_end() {
            let ch = self.current_char();

            if ch.is_alphanumeric() || ch == '_' {
                value.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        // Check if it's a keyword
        if let Some(keyword) = Token::from_keyword(&value) {
            Ok(keyword)
        } else {
            Ok(Token::Identifier(value.to_lowercase()))
        }
    }
}

/// Tokens that are always exactly one character. `-` is always a minus;
/// negative literals are unary minus in the parser.
fn punctuation(ch: char) -> Option<Token> {
    Some(match ch {
        '(' => Token::LParen,
        ')' => Token::RParen,
        ',' => Token::Comma,
        ';' => Token::Semicolon,
        '.' => Token::Dot,
        '+' => Token::Plus,
        '-' => Token::Minus,
        '*' => Token::Asterisk,
        '/' => Token::Slash,
        '%' => Token::Percent,
        '=' => Token::Eq,
        _ => return None,
    })
}
