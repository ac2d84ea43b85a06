use std::str::Chars;

use peekmore::{PeekMore, PeekMoreIterator};

use crate::error::ScanError;
use crate::literal::Literal;
use crate::token::{Token, Type};

/// Scans source text into a flat list of tokens in a single forward pass.
/// Lex errors are reported as they are found and scanning continues, so a
/// run surfaces as many of them as possible at once.
pub struct Scanner<'a> {
    source: PeekMoreIterator<Chars<'a>>,
    tokens: Vec<Token>,
    line: usize,
    pub error_count: usize,
}

impl<'a> Scanner<'a> {
    /// Creates a new scanner.
    pub fn new(source: &'a str) -> Scanner<'a> {
        Scanner {
            source: source.chars().peekmore(),
            tokens: vec![],
            line: 1,
            error_count: 0,
        }
    }

    /// Scans the source code and returns the tokens, ending with EOF.
    pub fn scan_tokens(&mut self) -> Vec<Token> {
        while !self.is_at_end() {
            self.scan_token();
        }

        self.tokens.push(Token::new(Type::EOF, String::new(), None, self.line));
        self.tokens.clone()
    }

    /// Reports a lex error and keeps going.
    fn report(&mut self, line: usize, message: String) {
        self.error_count += 1;
        println!("{}", ScanError { line, message });
    }

    /// Consumes and returns the next character.
    fn advance(&mut self) -> char {
        self.source.next().expect("advanced past the end of the source")
    }

    /// Returns the next character without consuming it.
    fn peek(&mut self) -> char {
        *self.source.peek().unwrap_or(&'\0')
    }

    /// Returns the character after the next one without consuming anything.
    fn peek_next(&mut self) -> char {
        self.source.advance_cursor();
        let c = *self.source.peek().unwrap_or(&'\0');
        self.source.reset_cursor();
        c
    }

    /// Consumes the next character if it matches the expected one.
    fn match_next(&mut self, expected: char) -> bool {
        match self.source.peek() {
            Some(&c) if c == expected => {
                self.advance();
                true
            }
            _ => false,
        }
    }

    /// Returns if the scanner has consumed the entire source.
    fn is_at_end(&mut self) -> bool {
        self.source.peek().is_none()
    }

    /// Adds a new token to the list of tokens.
    fn add_token(&mut self, r#type: Type, lexeme: String, literal: Option<Literal>) {
        self.tokens.push(Token::new(r#type, lexeme, literal, self.line));
    }

    /// Handles a string literal. The literal value excludes the quotes;
    /// strings may span lines.
    fn string(&mut self) {
        let start_line = self.line;
        let mut value = String::new();

        loop {
            if self.is_at_end() {
                self.report(start_line, String::from("Unterminated string."));
                return;
            }

            let c = self.advance();
            if c == '"' {
                break;
            }
            if c == '\n' {
                self.line += 1;
            }
            value.push(c);
        }

        self.add_token(Type::String, format!("\"{value}\""), Some(Literal::String(value)));
    }

    /// Handles a number literal. A '.' not followed by a digit is not part
    /// of the number and is left for the next scan.
    fn number(&mut self, first: char) {
        let mut value = String::from(first);

        while self.peek().is_ascii_digit() {
            value.push(self.advance());
        }

        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            value.push(self.advance());

            while self.peek().is_ascii_digit() {
                value.push(self.advance());
            }
        }

        let number: f64 = value.parse().expect("scanned number to be a valid float");
        self.add_token(Type::Number, value, Some(Literal::Number(number)));
    }

    /// Handles an identifier or a keyword.
    fn identifier(&mut self, first: char) {
        let mut value = String::from(first);

        // is_alphanumeric does not include underscores.
        while matches!(self.peek(), c if c.is_alphanumeric() || c == '_') {
            value.push(self.advance());
        }

        let r#type = match value.as_str() {
            "and"    => Type::And,
            "class"  => Type::Class,
            "else"   => Type::Else,
            "false"  => Type::False,
            "for"    => Type::For,
            "fun"    => Type::Fun,
            "if"     => Type::If,
            "nil"    => Type::Nil,
            "or"     => Type::Or,
            "print"  => Type::Print,
            "return" => Type::Return,
            "this"   => Type::This,
            "true"   => Type::True,
            "var"    => Type::Var,
            "while"  => Type::While,
            _        => Type::Identifier,
        };

        self.add_token(r#type, value, None);
    }

    /// Skips a multiline comment. Not nested.
    fn multiline_comment(&mut self) {
        let start_line = self.line;

        loop {
            if self.is_at_end() {
                self.report(start_line, String::from("Unterminated multiline comment."));
                return;
            }

            let c = self.advance();
            if c == '\n' {
                self.line += 1;
            } else if c == '*' && self.peek() == '/' {
                self.advance();
                return;
            }
        }
    }

    /// Scans the next token.
    fn scan_token(&mut self) {
        let c = self.advance();
        match c {
            // One character tokens
            '(' => self.add_token(Type::LeftParen, c.to_string(), None),
            ')' => self.add_token(Type::RightParen, c.to_string(), None),
            '{' => self.add_token(Type::LeftBrace, c.to_string(), None),
            '}' => self.add_token(Type::RightBrace, c.to_string(), None),
            ',' => self.add_token(Type::Comma, c.to_string(), None),
            '.' => self.add_token(Type::Dot, c.to_string(), None),
            '-' => self.add_token(Type::Minus, c.to_string(), None),
            '+' => self.add_token(Type::Plus, c.to_string(), None),
            ';' => self.add_token(Type::Semicolon, c.to_string(), None),
            '*' => self.add_token(Type::Star, c.to_string(), None),

            // One or two character tokens
            '!' => {
                if self.match_next('=') {
                    self.add_token(Type::BangEqual, String::from("!="), None);
                } else {
                    self.add_token(Type::Bang, c.to_string(), None);
                }
            },
            '=' => {
                if self.match_next('=') {
                    self.add_token(Type::EqualEqual, String::from("=="), None);
                } else {
                    self.add_token(Type::Equal, c.to_string(), None);
                }
            },
            '<' => {
                if self.match_next('=') {
                    self.add_token(Type::LessEqual, String::from("<="), None);
                } else {
                    self.add_token(Type::Less, c.to_string(), None);
                }
            },
            '>' => {
                if self.match_next('=') {
                    self.add_token(Type::GreaterEqual, String::from(">="), None);
                } else {
                    self.add_token(Type::Greater, c.to_string(), None);
                }
            },
            '/' => {
                if self.match_next('/') {
                    while !self.is_at_end() && self.peek() != '\n' {
                        self.advance();
                    }
                } else if self.match_next('*') {
                    self.multiline_comment();
                } else {
                    self.add_token(Type::Slash, c.to_string(), None);
                }
            },

            // Ignore whitespace
            ' ' | '\r' | '\t' => (),

            '\n' => self.line += 1,

            '"' => self.string(),

            c if c.is_ascii_digit() => self.number(c),

            c if c.is_alphabetic() || c == '_' => self.identifier(c),

            _ => self.report(self.line, format!("Unexpected character '{c}'.")),
        }
    }
}
