use std::sync::LazyLock;

use regex::bytes::Regex;

/// #Notes
/// A leading `-` on a number is never part of the Number token: the lexer
///  always emits Minus and the parser decides whether it is a sign (directly
///  adjacent to a number in operand position) or a subtraction.
/// `null` and `count` are lexed as plain identifiers; the parser recognizes
///  them by comparing the identifier text case-insensitively.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TokenType {
    ParenLeft,
    ParenRight,
    Comma,
    Dot,
    Plus,
    Minus,
    Asterisk,
    ForwardSlash,
    DoubleEquals, // ==
    NotEquals,    // !=
    LT,           // <
    GT,           // >
    LTE,          // <=
    GTE,          // >=
    Number,
    String,
    Identifier,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub ty: TokenType,

    // Byte indexes into the source
    start: usize,
    end: usize,
}

impl Token {
    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    #[inline]
    pub fn end(&self) -> usize {
        self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("unterminated string literal starting at {0}")]
    UnterminatedStringLiteral(usize),
    #[error("invalid escape sequence at {0}, only \\\" and \\\\ are allowed")]
    InvalidEscape(usize),
    #[error("unexpected character at {0}")]
    UnexpectedCharacter(usize),
}

// Integer part is `0` or starts with a non-zero digit, then an optional
//  fraction and exponent. The sign is handled by the parser.
static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:0|[1-9][0-9]*)(?:\.[0-9]+)?(?:[eE][+-]?[0-9]+)?")
        .expect("number pattern is valid")
});

/// This type simply holds a reference to the source and an index, so it's
///  cheap to copy, making lookahead/rewind operations in the parser very easy.
#[derive(Clone)]
pub struct Lexer<'input> {
    source: &'input str,
    current: usize,
}

impl<'input> Lexer<'input> {
    pub fn new(source: &'input str) -> Self {
        Self { source, current: 0 }
    }

    #[inline]
    fn bytes(&self) -> &'input [u8] {
        self.source.as_bytes()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.current >= self.source.len()
    }

    /// Byte offset of the next unconsumed character.
    #[inline]
    pub fn position(&self) -> usize {
        self.current
    }

    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.bytes().get(self.current).copied()
    }

    #[inline]
    fn pop_unchecked(&mut self) -> u8 {
        let res = self.bytes()[self.current];
        self.current += 1;
        res
    }

    #[inline]
    pub fn remaining(&self) -> &'input [u8] {
        &self.bytes()[self.current..]
    }

    /// If current starts with [prefix], consume it and return true.
    pub fn consume1(&mut self, prefix: u8) -> bool {
        if let Some(c) = self.peek()
            && c == prefix
        {
            self.current += 1;
            true
        } else {
            false
        }
    }

    #[inline]
    fn consume_while(&mut self, predicate: impl Fn(u8) -> bool) {
        while let Some(c) = self.peek()
            && predicate(c)
        {
            self.current += 1;
        }
    }

    #[inline]
    fn consume_whitespace(&mut self) {
        self.consume_while(|b| b.is_ascii_whitespace());
    }

    /// Called with the opening quote already consumed. Stops after the
    ///  closing quote.
    fn consume_string(&mut self, start: usize) -> Result<(), Error> {
        loop {
            match self.peek() {
                None => return Err(Error::UnterminatedStringLiteral(start)),
                Some(b'"') => {
                    self.current += 1;
                    return Ok(());
                }
                Some(b'\\') => match self.bytes().get(self.current + 1) {
                    Some(b'"' | b'\\') => self.current += 2,
                    Some(_) => return Err(Error::InvalidEscape(self.current)),
                    None => return Err(Error::UnterminatedStringLiteral(start)),
                },
                Some(_) => self.current += 1,
            }
        }
    }

    /// Returns the slice of the source that this token was lexed from.
    #[inline]
    pub fn source_of(&self, token: &Token) -> &'input str {
        &self.source[token.start..token.end]
    }

    /// Source text between two byte offsets, both of which must fall on
    ///  token boundaries.
    #[inline]
    pub fn slice(&self, start: usize, end: usize) -> &'input str {
        &self.source[start..end]
    }

    /// Like [source_of] but omits the opening and closing quotes of string
    ///  literal tokens. Escape sequences are left untouched.
    #[inline]
    pub fn contents(&self, token: &Token) -> &'input str {
        let s = self.source_of(token);
        match token.ty {
            TokenType::String => &s[1..s.len() - 1],
            _ => s,
        }
    }

    /// Returns the next token without consuming it.
    pub fn peek_token(&self) -> Result<Option<Token>, Error> {
        self.clone().next_token()
    }

    /// Consumes the next token if it is of type [ty].
    pub fn consume(&mut self, ty: TokenType) -> Result<bool, Error> {
        let mut ahead = self.clone();
        match ahead.next_token()? {
            Some(tok) if tok.ty == ty => {
                *self = ahead;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub fn next_token(&mut self) -> Result<Option<Token>, Error> {
        self.consume_whitespace();

        if self.is_empty() {
            return Ok(None);
        }
        let start = self.current;

        // Convenience macro for returning a token from `start` to `self.current`
        // The match below will borrow self as mutable, so a simple closure won't
        //  do the trick.
        macro_rules! tok {
            ($name:ident) => {{
                Token {
                    ty: TokenType::$name,
                    start,
                    end: self.current,
                }
            }};
        }

        Ok(Some(match self.pop_unchecked() {
            b'(' => tok!(ParenLeft),
            b')' => tok!(ParenRight),
            b',' => tok!(Comma),
            b'.' => tok!(Dot),
            b'+' => tok!(Plus),
            b'-' => tok!(Minus),
            b'*' => tok!(Asterisk),
            b'/' => tok!(ForwardSlash),
            b'=' => {
                if self.consume1(b'=') {
                    tok!(DoubleEquals)
                } else {
                    return Err(Error::UnexpectedCharacter(start));
                }
            }
            b'!' => {
                if self.consume1(b'=') {
                    tok!(NotEquals)
                } else {
                    return Err(Error::UnexpectedCharacter(start));
                }
            }
            b'<' => {
                if self.consume1(b'=') {
                    tok!(LTE)
                } else {
                    tok!(LT)
                }
            }
            b'>' => {
                if self.consume1(b'=') {
                    tok!(GTE)
                } else {
                    tok!(GT)
                }
            }

            b'"' => {
                self.consume_string(start)?;
                tok!(String)
            }

            // Identifiers are letters and underscores only, digits are not
            //  part of an identifier
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                self.consume_while(|b| matches!(b, b'a'..=b'z' | b'A'..=b'Z' | b'_'));
                tok!(Identifier)
            }

            b'0'..=b'9' => {
                // Rewind so the pattern sees the first digit
                self.current = start;
                let len = NUMBER
                    .find(self.remaining())
                    .map(|m| m.end())
                    .ok_or(Error::UnexpectedCharacter(start))?;
                self.current += len;
                tok!(Number)
            }
            _ => return Err(Error::UnexpectedCharacter(start)),
        }))
    }
}
