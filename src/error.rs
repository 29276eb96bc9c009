use std::error;
use std::fmt;
use std::io;
use std::result;

use streamcsv_core::{self as csvcore, ParseError, Position};

use crate::byte_record::ByteRecord;
use crate::deserializer::DeserializeError;

/// A type alias for `Result<T, streamcsv::Error>`.
pub type Result<T> = result::Result<T, Error>;

/// An error that can occur when processing CSV data.
///
/// This error can happen when writing or reading CSV data. Running out of
/// records is never an error.
#[derive(Debug)]
pub enum Error {
    /// An I/O error that occurred while reading or writing CSV data.
    Io(io::Error),
    /// The CSV data is malformed.
    Parse(ParseError),
    /// The reader or writer was used after it was closed.
    Closed,
    /// A UTF-8 decoding error that occured while reading CSV data into Rust
    /// `String`s.
    Utf8 {
        /// The position of the record in which this error occurred, if
        /// available.
        pos: Option<Position>,
        /// The corresponding UTF-8 error.
        err: Utf8Error,
    },
    /// An error of this kind occurs only when using the Serde serializer.
    Serialize(String),
    /// An error of this kind occurs only when performing automatic
    /// deserialization with serde.
    Deserialize {
        /// The position of this error, if available.
        pos: Option<Position>,
        /// The deserialization error.
        err: DeserializeError,
    },
}

impl Error {
    /// Returns true if this is an I/O error.
    pub fn is_io_error(&self) -> bool {
        match *self {
            Error::Io(_) => true,
            _ => false,
        }
    }

    /// Returns true if this is a CSV syntax error.
    pub fn is_parse_error(&self) -> bool {
        match *self {
            Error::Parse(_) => true,
            _ => false,
        }
    }

    /// Return the position for this error, if one exists.
    pub fn position(&self) -> Option<&Position> {
        match *self {
            Error::Parse(ref err) => Some(err.position()),
            Error::Utf8 { ref pos, .. } => pos.as_ref(),
            Error::Deserialize { ref pos, .. } => pos.as_ref(),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<csvcore::Error> for Error {
    fn from(err: csvcore::Error) -> Error {
        match err {
            csvcore::Error::Io(err) => Error::Io(err),
            csvcore::Error::Parse(err) => Error::Parse(err),
            csvcore::Error::Closed => Error::Closed,
        }
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
            Error::Utf8 { ref err, .. } => Some(err),
            Error::Deserialize { ref err, .. } => Some(err),
            Error::Closed | Error::Serialize(_) => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Io(ref err) => write!(f, "{}", err),
            Error::Parse(ref err) => write!(f, "{}", err),
            Error::Closed => write!(f, "CSV error: stream is closed"),
            Error::Utf8 { pos: None, ref err } => {
                write!(f, "CSV parse error: field {}: {}", err.field(), err)
            }
            Error::Utf8 { pos: Some(ref pos), ref err } => write!(
                f,
                "CSV parse error: record {} \
                 (line {}, byte {}, field: {}): {}",
                pos.record(),
                pos.line(),
                pos.byte(),
                err.field(),
                err
            ),
            Error::Serialize(ref err) => {
                write!(f, "CSV write error: {}", err)
            }
            Error::Deserialize { pos: None, ref err } => {
                write!(f, "CSV deserialize error: {}", err)
            }
            Error::Deserialize { pos: Some(ref pos), ref err } => write!(
                f,
                "CSV deserialize error: record {} \
                 (line {}, byte {}): {}",
                pos.record(),
                pos.line(),
                pos.byte(),
                err
            ),
        }
    }
}

/// A UTF-8 validation error that occurs when attempting to convert a
/// `ByteRecord` into a `StringRecord`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FromUtf8Error {
    record: ByteRecord,
    err: Utf8Error,
}

impl FromUtf8Error {
    pub(crate) fn new(record: ByteRecord, err: Utf8Error) -> FromUtf8Error {
        FromUtf8Error { record, err }
    }

    /// Access the underlying `ByteRecord` that failed UTF-8 validation.
    pub fn into_byte_record(self) -> ByteRecord {
        self.record
    }

    /// Access the underlying UTF-8 validation error.
    pub fn utf8_error(&self) -> &Utf8Error {
        &self.err
    }
}

impl fmt::Display for FromUtf8Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.err)
    }
}

impl error::Error for FromUtf8Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(&self.err)
    }
}

/// A UTF-8 validation error.
///
/// The error includes the index of the field that failed validation, and the
/// last byte at which valid UTF-8 was verified.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Utf8Error {
    /// The field index of a byte record in which UTF-8 validation failed.
    field: usize,
    /// The index into the given field up to which valid UTF-8 was verified.
    valid_up_to: usize,
}

impl Utf8Error {
    pub(crate) fn new(field: usize, valid_up_to: usize) -> Utf8Error {
        Utf8Error { field, valid_up_to }
    }

    /// The field index of a byte record in which UTF-8 validation failed.
    pub fn field(&self) -> usize {
        self.field
    }

    /// The index into the given field up to which valid UTF-8 was verified.
    pub fn valid_up_to(&self) -> usize {
        self.valid_up_to
    }
}

impl error::Error for Utf8Error {}

impl fmt::Display for Utf8Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "invalid utf-8: invalid UTF-8 in field {} near byte index {}",
            self.field, self.valid_up_to
        )
    }
}
