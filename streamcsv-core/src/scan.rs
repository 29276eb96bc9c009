// Field scanners.
//
// Both scanners pull from a `Buffer`, append field bytes directly to the
// caller's record storage and report whether another field follows in the
// same record. They are plain loops over buffer windows: a scanner suspends
// only by asking the buffer for a refill, and resumes at offset 0 of the new
// window with all of its state held in locals.

use memchr::{memchr, memchr3};

use crate::buffer::Buffer;
use crate::error::{Error, ParseError, ParseErrorKind, Result};
use crate::source::ByteSource;
use crate::{Dialect, Position};

/// Where a scanner is in the input, for error reporting.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Loc {
    /// The position of the start of the current record.
    pub pos: Position,
    /// The index of the current field.
    pub field: u64,
}

impl Loc {
    fn error(&self, kind: ParseErrorKind) -> Error {
        Error::Parse(ParseError::new(self.pos, self.field, kind))
    }

    fn stray(&self) -> Error {
        self.error(ParseErrorKind::MalformedQuotedField {
            cause: "non-space after closing quote",
        })
    }
}

/// The state of the quoted field scanner.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Quoted {
    /// Inside the quotes.
    Body,
    /// Just after a quote seen in `Body`. It is either the first half of an
    /// escape or the closing quote.
    AfterQuote,
}

/// What the quoted field scanner does with one byte.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Transition {
    /// Consume the byte, append the given byte to the field and continue in
    /// `Body`.
    Emit(u8),
    /// Consume the quote and move to `AfterQuote`.
    Quote,
    /// The previous quote closed the field. The byte is not consumed.
    End,
    /// The byte can't follow a closing quote.
    Stray,
}

impl Quoted {
    /// The transition table of the quoted field scanner.
    pub(crate) fn transition(self, b: u8, dialect: Dialect) -> Transition {
        match self {
            Quoted::Body if b == b'"' => Transition::Quote,
            Quoted::Body => Transition::Emit(b),
            Quoted::AfterQuote => match b {
                b'"' => Transition::Emit(b'"'),
                b'0' if dialect.spreadsheet => Transition::Emit(0),
                b'\r' | b'\n' => Transition::End,
                b if b == dialect.delimiter || dialect.is_blank(b) => {
                    Transition::End
                }
                _ => Transition::Stray,
            },
        }
    }
}

/// Skip spaces and tabs. Returns `false` if the input ran out first.
pub(crate) fn skip_blanks<S: ByteSource>(
    buf: &mut Buffer<S>,
    dialect: Dialect,
) -> Result<bool> {
    loop {
        if !buf.refill()? {
            return Ok(false);
        }
        let (n, all) = {
            let win = buf.window();
            let n = win.iter().take_while(|&&b| dialect.is_blank(b)).count();
            (n, n == win.len())
        };
        buf.consume(n);
        if !all {
            return Ok(true);
        }
    }
}

/// Skip blank lines and whitespace before a record. Returns `false` if the
/// input ran out first.
pub(crate) fn skip_blank_lines<S: ByteSource>(
    buf: &mut Buffer<S>,
    dialect: Dialect,
) -> Result<bool> {
    loop {
        if !buf.refill()? {
            return Ok(false);
        }
        let (n, all) = {
            let win = buf.window();
            let n = win
                .iter()
                .take_while(|&&b| {
                    b == b'\r' || b == b'\n' || dialect.is_blank(b)
                })
                .count();
            (n, n == win.len())
        };
        buf.consume(n);
        if !all {
            return Ok(true);
        }
    }
}

/// Consume a single `\n` if it's next. Used after a `\r`.
fn skip_lf<S: ByteSource>(buf: &mut Buffer<S>) -> Result<()> {
    if buf.peek()? == Some(b'\n') {
        buf.consume(1);
    }
    Ok(())
}

/// Scan an unquoted field.
///
/// Bytes up to the next delimiter, `\r`, `\n` or end of input are appended
/// to `out`. Afterwards, trailing whitespace is stripped from `out`, but
/// never below `start`, the offset at which this field begins.
///
/// Returns `true` if the field ended at a delimiter.
pub(crate) fn unquoted<S: ByteSource>(
    buf: &mut Buffer<S>,
    dialect: Dialect,
    start: usize,
    out: &mut Vec<u8>,
) -> Result<bool> {
    let more = loop {
        if !buf.refill()? {
            break false;
        }
        let (n, term) = {
            let win = buf.window();
            match memchr3(dialect.delimiter, b'\r', b'\n', win) {
                None => {
                    out.extend_from_slice(win);
                    (win.len(), None)
                }
                Some(i) => {
                    out.extend_from_slice(&win[..i]);
                    (i + 1, Some(win[i]))
                }
            }
        };
        buf.consume(n);
        match term {
            None => continue,
            Some(b) if b == dialect.delimiter => break true,
            Some(b'\r') => {
                skip_lf(buf)?;
                break false;
            }
            Some(_) => break false,
        }
    };
    while out.len() > start && dialect.is_blank(out[out.len() - 1]) {
        out.pop();
    }
    Ok(more)
}

/// Scan a quoted field whose opening quote has already been consumed.
///
/// Returns `true` if the field ended at a delimiter.
pub(crate) fn quoted<S: ByteSource>(
    buf: &mut Buffer<S>,
    dialect: Dialect,
    loc: Loc,
    out: &mut Vec<u8>,
) -> Result<bool> {
    let mut state = Quoted::Body;
    loop {
        if !buf.refill()? {
            return match state {
                Quoted::AfterQuote => Ok(false),
                Quoted::Body => {
                    Err(loc.error(ParseErrorKind::UnterminatedQuotedField))
                }
            };
        }
        if state == Quoted::Body {
            // Everything up to the next quote is copied verbatim.
            let (n, found) = {
                let win = buf.window();
                match memchr(b'"', win) {
                    None => {
                        out.extend_from_slice(win);
                        (win.len(), false)
                    }
                    Some(i) => {
                        out.extend_from_slice(&win[..i]);
                        (i, true)
                    }
                }
            };
            buf.consume(n);
            if !found {
                continue;
            }
        }
        let b = buf.window()[0];
        match state.transition(b, dialect) {
            Transition::Emit(byte) => {
                buf.consume(1);
                out.push(byte);
                state = Quoted::Body;
            }
            Transition::Quote => {
                buf.consume(1);
                state = Quoted::AfterQuote;
            }
            Transition::End => return end_quoted(buf, dialect, loc),
            Transition::Stray => return Err(loc.stray()),
        }
    }
}

/// Consume whatever ends a quoted field: optional whitespace followed by a
/// delimiter, a line terminator or the end of input.
fn end_quoted<S: ByteSource>(
    buf: &mut Buffer<S>,
    dialect: Dialect,
    loc: Loc,
) -> Result<bool> {
    if !skip_blanks(buf, dialect)? {
        return Ok(false);
    }
    let b = buf.window()[0];
    if b == dialect.delimiter {
        buf.consume(1);
        Ok(true)
    } else if b == b'\r' {
        buf.consume(1);
        skip_lf(buf)?;
        Ok(false)
    } else if b == b'\n' {
        buf.consume(1);
        Ok(false)
    } else {
        Err(loc.stray())
    }
}
