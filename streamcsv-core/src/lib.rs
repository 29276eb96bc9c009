/*!
`streamcsv-core` provides the streaming pieces of a CSV reader and writer:
a refillable byte buffer over an abstract byte source, an incremental record
tokenizer, and the matching field encoder.

The tokenizer understands a spreadsheet dialect on top of plain CSV. When
`Dialect::spreadsheet` is enabled:

* a field written as `="..."` is read as an ordinary quoted field, which
  lets values such as `007` or `  padded` survive a trip through a
  spreadsheet application;
* inside a quoted field, `"0` stands for a single NUL byte.

Most callers want the higher level `streamcsv` crate. This crate is useful
when you have a byte source that isn't an `std::io::Read`, or when you want
to control buffering and record storage yourself.

# Example

```
use streamcsv_core::{Dialect, Parser};

let data = &b"a,\"b\"\"c\",d\n  x  ,y\n"[..];
let mut parser = Parser::new(Dialect::default(), data);
let (mut fields, mut ends) = (vec![], vec![]);

assert!(parser.read_record(&mut fields, &mut ends).unwrap());
assert_eq!(&fields[..], &b"ab\"cd"[..]);
assert_eq!(ends, vec![1, 4, 5]);

assert!(parser.read_record(&mut fields, &mut ends).unwrap());
assert_eq!(&fields[..], &b"xy"[..]);

assert!(!parser.read_record(&mut fields, &mut ends).unwrap());
```
*/

#![deny(missing_docs)]

pub use crate::buffer::{Buffer, DEFAULT_BUFFER_CAPACITY};
pub use crate::error::{Error, ParseError, ParseErrorKind, Result};
pub use crate::reader::Parser;
pub use crate::sink::{write_all, ByteSink, IoSink};
pub use crate::source::{ByteSource, Fill, IoSource};
pub use crate::writer::{Encoder, Quoting, RecordWriter};

mod buffer;
mod error;
mod reader;
mod scan;
mod sink;
mod source;
mod writer;

/// The dialect used to read or write CSV data.
///
/// A dialect is fixed for the lifetime of a parser or writer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Dialect {
    /// The byte separating fields. The default is `b','`.
    pub delimiter: u8,
    /// Whether to apply the spreadsheet tricks: the `="..."` wrapper that
    /// preserves leading zeros and edge whitespace, and `"0` as an encoding
    /// of NUL inside quoted fields. Disabled by default.
    pub spreadsheet: bool,
}

impl Default for Dialect {
    fn default() -> Dialect {
        Dialect { delimiter: b',', spreadsheet: false }
    }
}

impl Dialect {
    /// Create a dialect with the given delimiter and spreadsheet tricks
    /// disabled.
    pub fn with_delimiter(delimiter: u8) -> Dialect {
        Dialect { delimiter, ..Dialect::default() }
    }

    /// The default dialect with spreadsheet tricks enabled.
    pub fn spreadsheet() -> Dialect {
        Dialect { spreadsheet: true, ..Dialect::default() }
    }

    /// Returns true if `b` is whitespace that the reader strips at field
    /// edges. Tabs are never stripped when the delimiter is a tab.
    #[inline]
    pub(crate) fn is_blank(&self, b: u8) -> bool {
        (b == b' ' || b == b'\t') && b != self.delimiter
    }
}

/// A position in CSV data.
///
/// A position is used to report errors in CSV data. All fields are
/// maintained by the parser and refer to the start of a record.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Position {
    byte: u64,
    line: u64,
    record: u64,
}

impl Default for Position {
    fn default() -> Position {
        Position::new()
    }
}

impl Position {
    /// Returns a new position initialized to the start value.
    pub fn new() -> Position {
        Position { byte: 0, line: 1, record: 0 }
    }

    /// The byte offset, starting at `0`, of this position.
    pub fn byte(&self) -> u64 {
        self.byte
    }

    /// The line number, starting at `1`, of this position.
    ///
    /// Lines are counted by occurrences of `\n`.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// The record number of this position. The first record is `1`. A
    /// position that precedes every record has record number `0`.
    pub fn record(&self) -> u64 {
        self.record
    }

    /// Set the byte offset of this position.
    pub fn set_byte(&mut self, byte: u64) -> &mut Position {
        self.byte = byte;
        self
    }

    /// Set the line number of this position.
    pub fn set_line(&mut self, line: u64) -> &mut Position {
        assert!(line > 0);
        self.line = line;
        self
    }

    /// Set the record number of this position.
    pub fn set_record(&mut self, record: u64) -> &mut Position {
        self.record = record;
        self
    }
}
