use std::error;
use std::fmt;
use std::io;
use std::result;

use crate::Position;

/// A type alias for `Result<T, streamcsv_core::Error>`.
pub type Result<T> = result::Result<T, Error>;

/// An error that can occur when reading or writing CSV data.
///
/// Running out of input at a record boundary is not an error. It is
/// reported as `Ok(false)` by `Parser::read_record`.
#[derive(Debug)]
pub enum Error {
    /// An I/O error reported by the underlying byte source or sink. These
    /// are passed through unchanged.
    Io(io::Error),
    /// The CSV data is malformed.
    Parse(ParseError),
    /// The reader or writer was used after it was closed.
    Closed,
}

impl Error {
    /// Returns true if this error is a CSV syntax error.
    pub fn is_parse_error(&self) -> bool {
        match *self {
            Error::Parse(_) => true,
            _ => false,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> io::Error {
        match err {
            Error::Io(err) => err,
            err @ Error::Closed => {
                io::Error::new(io::ErrorKind::NotConnected, err)
            }
            err => io::Error::new(io::ErrorKind::InvalidData, err),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Io(ref err) => Some(err),
            Error::Parse(ref err) => Some(err),
            Error::Closed => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Io(ref err) => write!(f, "{}", err),
            Error::Parse(ref err) => write!(f, "{}", err),
            Error::Closed => write!(f, "CSV error: stream is closed"),
        }
    }
}

/// A syntax error in CSV data.
///
/// A parse error is fatal to the record being read. The record is never
/// returned in part.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParseError {
    pos: Position,
    field: u64,
    kind: ParseErrorKind,
}

/// The kind of a CSV syntax error.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ParseErrorKind {
    /// A quoted field was followed by something other than whitespace, a
    /// delimiter or a line terminator.
    MalformedQuotedField {
        /// A human readable description of what went wrong.
        cause: &'static str,
    },
    /// The input ended inside a quoted field.
    UnterminatedQuotedField,
}

impl ParseError {
    pub(crate) fn new(
        pos: Position,
        field: u64,
        kind: ParseErrorKind,
    ) -> ParseError {
        ParseError { pos, field, kind }
    }

    /// The position of the start of the record in which this error
    /// occurred.
    pub fn position(&self) -> &Position {
        &self.pos
    }

    /// The record number, starting at `1`, in which this error occurred.
    pub fn record(&self) -> u64 {
        self.pos.record()
    }

    /// The field index, starting at `0`, in which this error occurred.
    pub fn field(&self) -> u64 {
        self.field
    }

    /// The kind of this error.
    pub fn kind(&self) -> &ParseErrorKind {
        &self.kind
    }
}

impl error::Error for ParseError {}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "CSV parse error: record {} (line {}, byte {}), field {}: ",
            self.pos.record(),
            self.pos.line(),
            self.pos.byte(),
            self.field
        )?;
        match self.kind {
            ParseErrorKind::MalformedQuotedField { cause } => {
                write!(f, "malformed quoted field: {}", cause)
            }
            ParseErrorKind::UnterminatedQuotedField => {
                write!(f, "unterminated quoted field")
            }
        }
    }
}
