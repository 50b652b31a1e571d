//! Reader for kale source text.
//!
//! Turns a character stream into [`Datum`] trees. Tokens are parentheses,
//! `.`, `'`, numbers and symbols; `;` comments run to end of line.

pub mod datum;
pub mod symbol;

pub use datum::Datum;
pub use symbol::{Interner, Symbol};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LParen,
    RParen,
    Dot,
    Quote,
    Number(f64),
    Symbol(String),
    Eof,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Dot => write!(f, "."),
            Token::Quote => write!(f, "'"),
            Token::Number(n) => write!(f, "{}", n),
            Token::Symbol(s) => write!(f, "{}", s),
            Token::Eof => write!(f, "end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{line}:{col}: {msg}")]
pub struct ReadError {
    pub msg: String,
    pub line: usize,
    pub col: usize,
}

const INCOMPLETE: &str = "reached end of input";

impl ReadError {
    /// True when the source ended in the middle of a datum, so more input
    /// could complete it.
    pub fn is_incomplete(&self) -> bool {
        self.msg.starts_with(INCOMPLETE)
    }
}

/// Read exactly one datum. Anything but whitespace and comments after it is
/// an error.
pub fn read(source: &str, interner: &mut Interner) -> Result<Datum, ReadError> {
    let mut reader = Reader::new(source, interner);
    let datum = reader.read()?;
    match reader.peek()? {
        Token::Eof => Ok(datum),
        tok => Err(reader.err(format!("unexpected {} after datum", tok))),
    }
}

/// Read every datum in `source`.
pub fn read_all(source: &str, interner: &mut Interner) -> Result<Vec<Datum>, ReadError> {
    let mut reader = Reader::new(source, interner);
    let mut out = Vec::new();
    while reader.peek()? != Token::Eof {
        out.push(reader.read()?);
    }
    Ok(out)
}

/// Split `source` into tokens, mostly useful for debugging.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ReadError> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let tok = lexer.next_token()?;
        if tok == Token::Eof {
            return Ok(tokens);
        }
        tokens.push(tok);
    }
}

struct Lexer<'a> {
    source: &'a [u8],
    pos: usize,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Lexer {
            source: source.as_bytes(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.source.get(self.pos).copied();
        if let Some(c) = ch {
            self.pos += 1;
            if c == b'\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
        ch
    }

    fn err(&self, msg: impl Into<String>) -> ReadError {
        ReadError {
            msg: msg.into(),
            line: self.line,
            col: self.col,
        }
    }

    fn skip_trivia(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_whitespace() {
                self.advance();
            } else if ch == b';' {
                while let Some(c) = self.advance() {
                    if c == b'\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn is_delimiter(ch: u8) -> bool {
        ch.is_ascii_whitespace() || matches!(ch, b'(' | b')' | b'\'' | b';')
    }

    fn next_token(&mut self) -> Result<Token, ReadError> {
        self.skip_trivia();
        let Some(ch) = self.peek() else {
            return Ok(Token::Eof);
        };
        match ch {
            b'(' => {
                self.advance();
                return Ok(Token::LParen);
            }
            b')' => {
                self.advance();
                return Ok(Token::RParen);
            }
            b'\'' => {
                self.advance();
                return Ok(Token::Quote);
            }
            _ => {}
        }

        let start = self.pos;
        while let Some(c) = self.peek() {
            if Self::is_delimiter(c) {
                break;
            }
            self.advance();
        }
        let text = std::str::from_utf8(&self.source[start..self.pos])
            .map_err(|_| self.err("invalid UTF-8 in token"))?;

        if text == "." {
            return Ok(Token::Dot);
        }
        Ok(classify_atom(text))
    }
}

/// An atom is a number when the whole token parses as one and it starts like
/// a number; `-`, `+` and names such as `inf` stay symbols.
fn classify_atom(text: &str) -> Token {
    let numeric_start = text
        .bytes()
        .next()
        .is_some_and(|b| b.is_ascii_digit() || matches!(b, b'-' | b'+' | b'.'));
    if numeric_start {
        if let Ok(n) = text.parse::<f64>() {
            if n.is_finite() {
                return Token::Number(n);
            }
        }
    }
    Token::Symbol(text.to_string())
}

struct Reader<'a, 'i> {
    lexer: Lexer<'a>,
    peeked: Option<Token>,
    interner: &'i mut Interner,
}

impl<'a, 'i> Reader<'a, 'i> {
    fn new(source: &'a str, interner: &'i mut Interner) -> Self {
        Reader {
            lexer: Lexer::new(source),
            peeked: None,
            interner,
        }
    }

    fn err(&self, msg: impl Into<String>) -> ReadError {
        self.lexer.err(msg)
    }

    fn peek(&mut self) -> Result<Token, ReadError> {
        if self.peeked.is_none() {
            self.peeked = Some(self.lexer.next_token()?);
        }
        Ok(self.peeked.clone().unwrap_or(Token::Eof))
    }

    fn next(&mut self) -> Result<Token, ReadError> {
        match self.peeked.take() {
            Some(tok) => Ok(tok),
            None => self.lexer.next_token(),
        }
    }

    fn atom(&mut self, name: &str) -> Datum {
        if name == "nil" {
            Datum::Nil
        } else {
            Datum::Symbol(self.interner.intern(name))
        }
    }

    fn read(&mut self) -> Result<Datum, ReadError> {
        match self.next()? {
            Token::Number(n) => Ok(Datum::Number(n)),
            Token::Symbol(s) => Ok(self.atom(&s)),
            Token::Quote => {
                let quoted = self.read()?;
                let quote = Datum::Symbol(self.interner.intern("quote"));
                Ok(Datum::list([quote, quoted]))
            }
            Token::LParen => self.read_list_tail(),
            Token::RParen => Err(self.err("unmatched parenthesis")),
            Token::Dot => Err(self.err("unexpected dot")),
            Token::Eof => Err(self.err(format!("{} while reading", INCOMPLETE))),
        }
    }

    /// Called after `(`; reads elements up to the closing `)`.
    fn read_list_tail(&mut self) -> Result<Datum, ReadError> {
        match self.peek()? {
            Token::RParen => {
                self.next()?;
                return Ok(Datum::Nil);
            }
            Token::Dot => return Err(self.err("unexpected dot at start of list")),
            _ => {}
        }

        let mut items = vec![self.read()?];
        let tail = loop {
            match self.peek()? {
                Token::RParen => {
                    self.next()?;
                    break Datum::Nil;
                }
                Token::Dot => {
                    self.next()?;
                    let tail = self.read()?;
                    match self.next()? {
                        Token::RParen => {}
                        Token::Eof => return Err(self.err(format!("{} inside list", INCOMPLETE))),
                        _ => return Err(self.err("expected ')' after dotted tail")),
                    }
                    break tail;
                }
                Token::Eof => return Err(self.err(format!("{} inside list", INCOMPLETE))),
                _ => items.push(self.read()?),
            }
        };

        Ok(items
            .into_iter()
            .rev()
            .fold(tail, |cdr, car| Datum::cons(car, cdr)))
    }
}
