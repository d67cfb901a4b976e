//! Tokenizer for include directives.
//!
//! The scanner walks a byte buffer once and yields [`Token`]s lazily. It knows
//! nothing about the filesystem; resolving `FileRef` tokens is the composer's
//! job.

use crate::config::Delimiters;
use memchr::memmem::Finder;
use std::borrow::Cow;

const UNCLOSED_DIRECTIVE: &[u8] = b"unclosed include directive";

/// Kind of a scanned token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Plain text between directives
    Text,
    /// The left delimiter of a directive
    LeftDelim,
    /// The right delimiter of a directive
    RightDelim,
    /// The path text between the delimiters
    FileRef,
    /// Input exhausted without errors
    EndOfInput,
    /// Scanning failed; the value holds a diagnostic
    Error,
}

/// A token produced by the [`Scanner`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Byte offset of the token in the source
    pub position: usize,
    pub value: &'a [u8],
}

impl Token<'_> {
    /// The token value as text, lossily decoded
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Text,
    LeftDelim,
    Filename,
    RightDelim,
    Done,
}

/// Single-pass, pull-based scanner over an input buffer
#[derive(Debug)]
pub struct Scanner<'a> {
    input: &'a [u8],
    left: Finder<'a>,
    right: Finder<'a>,
    start: usize,
    pos: usize,
    state: State,
}

/// Scans `input` for include directives wrapped in `delimiters`
pub fn scan<'a>(input: &'a [u8], delimiters: &'a Delimiters) -> Scanner<'a> {
    Scanner::new(input, delimiters)
}

impl<'a> Scanner<'a> {
    pub fn new(input: &'a [u8], delimiters: &'a Delimiters) -> Self {
        Self {
            input,
            left: Finder::new(delimiters.left()),
            right: Finder::new(delimiters.right()),
            start: 0,
            pos: 0,
            state: State::Text,
        }
    }

    fn emit(&mut self, kind: TokenKind) -> Token<'a> {
        let token = Token {
            kind,
            position: self.start,
            value: &self.input[self.start..self.pos],
        };
        self.start = self.pos;
        token
    }

    fn fail(&mut self) -> Token<'a> {
        self.state = State::Done;
        Token {
            kind: TokenKind::Error,
            position: self.start,
            value: UNCLOSED_DIRECTIVE,
        }
    }

    fn lex_text(&mut self) -> Option<Token<'a>> {
        match self.left.find(&self.input[self.pos..]) {
            Some(offset) => {
                self.pos += offset;
                self.state = State::LeftDelim;
                if self.pos > self.start {
                    return Some(self.emit(TokenKind::Text));
                }
                None
            }
            None => {
                self.pos = self.input.len();
                if self.pos > self.start {
                    return Some(self.emit(TokenKind::Text));
                }
                self.state = State::Done;
                Some(self.emit(TokenKind::EndOfInput))
            }
        }
    }

    fn lex_filename(&mut self) -> Token<'a> {
        let rest = &self.input[self.pos..];
        let line_end = memchr::memchr2(b'\n', b'\r', rest);
        // A closing delimiter may start at the line break itself
        let window = match line_end {
            Some(end) => &rest[..(end + self.right.needle().len()).min(rest.len())],
            None => rest,
        };
        match self.right.find(window) {
            Some(offset) if line_end.is_none_or(|end| offset <= end) => {
                self.pos += offset;
                self.state = State::RightDelim;
                self.emit(TokenKind::FileRef)
            }
            _ => self.fail(),
        }
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        loop {
            match self.state {
                State::Text => {
                    if let Some(token) = self.lex_text() {
                        return Some(token);
                    }
                }
                State::LeftDelim => {
                    self.pos += self.left.needle().len();
                    self.state = State::Filename;
                    return Some(self.emit(TokenKind::LeftDelim));
                }
                State::Filename => return Some(self.lex_filename()),
                State::RightDelim => {
                    self.pos += self.right.needle().len();
                    self.state = State::Text;
                    return Some(self.emit(TokenKind::RightDelim));
                }
                State::Done => return None,
            }
        }
    }
}

impl std::iter::FusedIterator for Scanner<'_> {}
