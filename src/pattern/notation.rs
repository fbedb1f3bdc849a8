//! Compact text notation for container sequences.
//!
//! ```text
//! p0 ~8 p1 | [g1] {s1} ~   # pads, pauses, group and super-group refs
//! ```
//!
//! `~` alone is one grid quantum of rest. Bars (`|`) and comments are
//! ignored.

use thiserror::Error;

use crate::model::pattern::{Item, GRID_QUANTUM, PAD_COUNT};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotationError {
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("unexpected character '{found}' at position {position}")]
    UnexpectedChar { position: usize, found: char },
    #[error("expected number at position {position}")]
    ExpectedNumber { position: usize },
    #[error("invalid number at position {position}")]
    InvalidNumber { position: usize },
    #[error("pad index {index} out of range at position {position}")]
    PadOutOfRange { position: usize, index: u32 },
    #[error("pause length must be positive at position {position}")]
    EmptyPause { position: usize },
    #[error("empty container id at position {position}")]
    EmptyId { position: usize },
}

pub fn parse_sequence(src: &str) -> Result<Vec<Item>, NotationError> {
    Parser::new(src).parse_items()
}

/// Parse a single item, e.g. for `insert` commands.
pub fn parse_item(src: &str) -> Result<Item, NotationError> {
    let mut parser = Parser::new(src);
    let item = parser.next_item()?.ok_or(NotationError::UnexpectedEnd)?;
    parser.skip_ws_and_comments();
    match parser.peek() {
        None => Ok(item),
        Some(found) => Err(NotationError::UnexpectedChar {
            position: parser.pos,
            found,
        }),
    }
}

pub fn format_item(item: &Item) -> String {
    match item {
        Item::Pad { pad } => format!("p{}", pad),
        Item::Pause { steps } => format!("~{}", steps),
        Item::Group { id } => format!("[{}]", id),
        Item::Super { id } => format!("{{{}}}", id),
    }
}

pub fn format_sequence(items: &[Item]) -> String {
    items.iter().map(format_item).collect::<Vec<_>>().join(" ")
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn parse_items(mut self) -> Result<Vec<Item>, NotationError> {
        let mut items = Vec::new();
        while let Some(item) = self.next_item()? {
            items.push(item);
        }
        Ok(items)
    }

    fn next_item(&mut self) -> Result<Option<Item>, NotationError> {
        loop {
            self.skip_ws_and_comments();
            match self.peek() {
                None => return Ok(None),
                Some('|') => {
                    self.bump();
                }
                Some('p') | Some('P') => return self.parse_pad().map(Some),
                Some('~') => return self.parse_pause().map(Some),
                Some('[') => {
                    let id = self.parse_id('[', ']')?;
                    return Ok(Some(Item::Group { id }));
                }
                Some('{') => {
                    let id = self.parse_id('{', '}')?;
                    return Ok(Some(Item::Super { id }));
                }
                Some(found) => {
                    return Err(NotationError::UnexpectedChar {
                        position: self.pos,
                        found,
                    });
                }
            }
        }
    }

    fn parse_pad(&mut self) -> Result<Item, NotationError> {
        self.bump();
        let start = self.pos;
        let index = self.parse_unsigned_int()?;
        if index as usize >= PAD_COUNT {
            return Err(NotationError::PadOutOfRange { position: start, index });
        }
        self.expect_boundary()?;
        Ok(Item::Pad { pad: index as u8 })
    }

    fn parse_pause(&mut self) -> Result<Item, NotationError> {
        self.bump();
        let start = self.pos;
        if !matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.expect_boundary()?;
            return Ok(Item::Pause { steps: GRID_QUANTUM });
        }
        let steps = self.parse_unsigned_int()?;
        if steps == 0 {
            return Err(NotationError::EmptyPause { position: start });
        }
        self.expect_boundary()?;
        Ok(Item::Pause { steps })
    }

    fn parse_id(&mut self, open: char, close: char) -> Result<String, NotationError> {
        self.expect(open)?;
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                self.bump();
            } else {
                break;
            }
        }
        let id = &self.src[start..self.pos];
        if id.is_empty() {
            return Err(NotationError::EmptyId { position: start });
        }
        self.expect(close)?;
        Ok(id.to_string())
    }

    fn parse_unsigned_int(&mut self) -> Result<u32, NotationError> {
        let start = self.pos;
        let digits = self.take_digits();
        if digits.is_empty() {
            return Err(NotationError::ExpectedNumber { position: start });
        }
        digits
            .parse()
            .map_err(|_| NotationError::InvalidNumber { position: start })
    }

    /// Items must be followed by whitespace, a bar, a comment or the end.
    fn expect_boundary(&self) -> Result<(), NotationError> {
        match self.peek() {
            None | Some('|') | Some('#') => Ok(()),
            Some(c) if c.is_whitespace() => Ok(()),
            Some(found) => Err(NotationError::UnexpectedChar {
                position: self.pos,
                found,
            }),
        }
    }

    fn take_digits(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.bump();
            } else {
                break;
            }
        }
        &self.src[start..self.pos]
    }

    fn skip_ws_and_comments(&mut self) {
        loop {
            while matches!(self.peek(), Some(c) if c.is_whitespace()) {
                self.bump();
            }
            if matches!(self.peek(), Some('#')) {
                self.skip_comment();
            } else {
                break;
            }
        }
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.bump() {
            if c == '\n' {
                break;
            }
        }
    }

    fn expect(&mut self, ch: char) -> Result<(), NotationError> {
        match self.bump() {
            Some(c) if c == ch => Ok(()),
            Some(found) => Err(NotationError::UnexpectedChar {
                position: self.pos - found.len_utf8(),
                found,
            }),
            None => Err(NotationError::UnexpectedEnd),
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }
}
