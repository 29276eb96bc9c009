use std::fmt;

use log::debug;

use crate::buffer::{Buffer, DEFAULT_BUFFER_CAPACITY};
use crate::error::Result;
use crate::scan::{self, Loc};
use crate::source::ByteSource;
use crate::{Dialect, Position};

/// A pull based CSV record parser.
///
/// A parser owns a `Buffer` over a `ByteSource` and produces one record per
/// call to `read_record`. Records may have any number of fields.
///
/// Parsing rules:
///
/// * Fields are separated by the dialect's delimiter. Records end at `\n`,
///   `\r` or `\r\n`.
/// * Blank lines, and whitespace before the first field of a record, are
///   skipped.
/// * Spaces and tabs around unquoted fields are stripped.
/// * A quoted field keeps its contents exactly. Quotes inside are doubled.
///   Only whitespace, a delimiter or a line terminator may follow the
///   closing quote.
/// * With `Dialect::spreadsheet`, `="` also opens a quoted field and `"0`
///   inside a quoted field is a NUL byte.
/// * A delimiter at the very end of the input is followed by one empty
///   field.
pub struct Parser<S> {
    buf: Buffer<S>,
    dialect: Dialect,
    /// The position of the start of the most recently read record.
    pos: Position,
    /// The number of records read so far.
    record: u64,
}

impl<S: ByteSource> Parser<S> {
    /// Create a parser for the given source using a buffer of the default
    /// capacity.
    pub fn new(dialect: Dialect, src: S) -> Parser<S> {
        Parser::with_capacity(dialect, DEFAULT_BUFFER_CAPACITY, src)
    }

    /// Create a parser for the given source using a buffer of the given
    /// capacity.
    pub fn with_capacity(
        dialect: Dialect,
        capacity: usize,
        src: S,
    ) -> Parser<S> {
        Parser::from_buffer(dialect, Buffer::with_capacity(capacity, src))
    }

    /// Create a parser that continues reading from the given buffer.
    pub fn from_buffer(dialect: Dialect, buf: Buffer<S>) -> Parser<S> {
        Parser { buf, dialect, pos: Position::new(), record: 0 }
    }

    /// Read the next record.
    ///
    /// The record's field data is written contiguously to `fields`, and the
    /// end offset of each field in `fields` is written to `ends`. Both are
    /// cleared first.
    ///
    /// Returns `false`, leaving both empty, when there are no more records.
    /// This is not an error, and every later call returns `false` as well.
    ///
    /// When an error is returned, `fields` and `ends` are cleared: a record
    /// is never returned in part.
    pub fn read_record(
        &mut self,
        fields: &mut Vec<u8>,
        ends: &mut Vec<usize>,
    ) -> Result<bool> {
        fields.clear();
        ends.clear();
        if !scan::skip_blank_lines(&mut self.buf, self.dialect)? {
            return Ok(false);
        }
        self.record += 1;
        self.pos = *Position::new()
            .set_byte(self.buf.byte())
            .set_line(self.buf.line())
            .set_record(self.record);

        let mut loc = Loc { pos: self.pos, field: 0 };
        loop {
            match self.read_field(loc, fields) {
                Ok(more) => {
                    ends.push(fields.len());
                    if !more {
                        return Ok(true);
                    }
                    loc.field += 1;
                }
                Err(err) => {
                    debug!("{}", err);
                    fields.clear();
                    ends.clear();
                    return Err(err);
                }
            }
        }
    }

    /// Read one field, appending its data to `out`. Returns `true` if
    /// another field follows in this record.
    fn read_field(&mut self, loc: Loc, out: &mut Vec<u8>) -> Result<bool> {
        let dialect = self.dialect;
        let start = out.len();
        if !scan::skip_blanks(&mut self.buf, dialect)? {
            // A delimiter right before the end of input.
            return Ok(false);
        }
        let first = self.buf.window()[0];
        match first {
            b'"' => {
                self.buf.consume(1);
                scan::quoted(&mut self.buf, dialect, loc, out)
            }
            b'=' if dialect.spreadsheet => {
                self.buf.consume(1);
                if self.buf.peek()? == Some(b'"') {
                    self.buf.consume(1);
                    scan::quoted(&mut self.buf, dialect, loc, out)
                } else {
                    out.push(b'=');
                    scan::unquoted(&mut self.buf, dialect, start, out)
                }
            }
            _ => scan::unquoted(&mut self.buf, dialect, start, out),
        }
    }

    /// Release the underlying source.
    ///
    /// Every later call to `read_record` fails with `Error::Closed`.
    pub fn close(&mut self) -> Result<()> {
        debug!("closing parser after {} records", self.record);
        self.buf.close()
    }
}

impl<S> Parser<S> {
    /// The dialect of this parser.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// The position of the start of the most recently read record.
    ///
    /// Before any record is read, this is `Position::new()`.
    pub fn position(&self) -> &Position {
        &self.pos
    }

    /// Returns true if the parser has reached the end of its input.
    ///
    /// This only becomes true once a read has run into the end of input,
    /// and is always false for a closed parser.
    pub fn is_done(&self) -> bool {
        self.buf.is_exhausted()
    }

    /// Returns true if `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.buf.is_closed()
    }

    /// Returns a reference to the underlying source, or `None` if this
    /// parser is closed.
    pub fn get_ref(&self) -> Option<&S> {
        self.buf.get_ref()
    }

    /// Returns a mutable reference to the underlying source, or `None` if
    /// this parser is closed.
    ///
    /// Reading from the source directly skips any bytes already buffered by
    /// this parser.
    pub fn get_mut(&mut self) -> Option<&mut S> {
        self.buf.get_mut()
    }

    /// Unwrap this parser into its buffer.
    ///
    /// The buffer still holds any bytes that were read ahead, and is itself
    /// a `ByteSource`, so the rest of the stream can be consumed by
    /// something else.
    pub fn into_buffer(self) -> Buffer<S> {
        self.buf
    }
}

impl<S: fmt::Debug> fmt::Debug for Parser<S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Parser")
            .field("buf", &self.buf)
            .field("dialect", &self.dialect)
            .field("pos", &self.pos)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::str;

    use super::Parser;
    use crate::error::{Error, ParseErrorKind};
    use crate::source::{ByteSource, Fill};
    use crate::Dialect;

    type Csv = Vec<Vec<String>>;

    macro_rules! csv {
        ($([$($field:expr),*]),*) => {{
            #[allow(unused_mut)]
            let mut csv: Csv = vec![];
            $(
                #[allow(unused_mut)]
                let mut row: Vec<String> = vec![];
                $(
                    row.push($field.to_string());
                )*
                csv.push(row);
            )*
            csv
        }};
    }

    /// A source that hands out at most one byte per read, with a "nothing
    /// available yet" answer in between.
    struct Trickle<'a> {
        data: &'a [u8],
        stall: bool,
    }

    impl<'a> ByteSource for Trickle<'a> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<Fill> {
            self.stall = !self.stall;
            if self.stall || buf.is_empty() {
                return Ok(Fill::Bytes(0));
            }
            if self.data.is_empty() {
                return Ok(Fill::Exhausted);
            }
            buf[0] = self.data[0];
            self.data = &self.data[1..];
            Ok(Fill::Bytes(1))
        }
    }

    fn parse<S: ByteSource>(mut parser: Parser<S>) -> Result<Csv, Error> {
        let (mut fields, mut ends) = (vec![], vec![]);
        let mut csv = Csv::new();
        while parser.read_record(&mut fields, &mut ends)? {
            let mut start = 0;
            let mut row: Vec<String> = vec![];
            for &end in &ends {
                row.push(str::from_utf8(&fields[start..end]).unwrap().into());
                start = end;
            }
            csv.push(row);
        }
        Ok(csv)
    }

    /// Parse `data` with several buffer sizes and sources, and check that
    /// they all agree.
    fn parse_all_ways(dialect: Dialect, data: &str) -> Result<Csv, Error> {
        let data = data.as_bytes();
        let expected = parse(Parser::new(dialect, data));
        for &cap in &[1, 2, 3, 7] {
            let got = parse(Parser::with_capacity(dialect, cap, data));
            assert_eq!(
                format!("{:?}", expected),
                format!("{:?}", got),
                "capacity {}",
                cap
            );
        }
        let got = parse(Parser::new(dialect, Trickle { data, stall: false }));
        assert_eq!(format!("{:?}", expected), format!("{:?}", got), "trickle");
        expected
    }

    macro_rules! parses_to {
        ($name:ident, $data:expr, $expected:expr) => {
            parses_to!($name, $data, $expected, Dialect::default());
        };
        ($name:ident, $data:expr, $expected:expr, $dialect:expr) => {
            #[test]
            fn $name() {
                let got = parse_all_ways($dialect, $data).unwrap();
                assert_eq!($expected, got);
            }
        };
    }

    macro_rules! fails_with {
        ($name:ident, $data:expr, $record:expr, $field:expr, $kind:pat) => {
            #[test]
            fn $name() {
                match parse_all_ways(Dialect::spreadsheet(), $data) {
                    Err(Error::Parse(err)) => {
                        assert_eq!(err.record(), $record);
                        assert_eq!(err.field(), $field);
                        assert!(match *err.kind() {
                            $kind => true,
                            _ => false,
                        });
                    }
                    res => panic!("expected parse error, got {:?}", res),
                }
            }
        };
    }

    parses_to!(one_row_one_field, "a", csv![["a"]]);
    parses_to!(one_row_many_fields, "a,b,c", csv![["a", "b", "c"]]);
    parses_to!(one_row_trailing_comma, "a,b,", csv![["a", "b", ""]]);
    parses_to!(one_row_one_field_lf, "a\n", csv![["a"]]);
    parses_to!(one_row_trailing_comma_lf, "a,b,\n", csv![["a", "b", ""]]);
    parses_to!(one_row_one_field_crlf, "a\r\n", csv![["a"]]);
    parses_to!(one_row_trailing_comma_crlf, "a,b,\r\n", csv![["a", "b", ""]]);
    parses_to!(one_row_one_field_cr, "a\r", csv![["a"]]);
    parses_to!(one_row_trailing_comma_cr, "a,b,\r", csv![["a", "b", ""]]);
    parses_to!(only_commas, ",,", csv![["", "", ""]]);

    parses_to!(
        heterogeneous_rows,
        "a,b\nc,d,e\n",
        csv![["a", "b"], ["c", "d", "e"]]
    );
    parses_to!(
        many_rows_crlf,
        "a,b,c\r\nx,y,z\r\n",
        csv![["a", "b", "c"], ["x", "y", "z"]]
    );
    parses_to!(
        many_rows_cr,
        "a,b,c\rx,y,z\r",
        csv![["a", "b", "c"], ["x", "y", "z"]]
    );
    parses_to!(
        crlf_split_across_fields,
        "a\r\n\r\nb",
        csv![["a"], ["b"]]
    );

    parses_to!(empty, "", csv![]);
    parses_to!(empty_lines, "\n\r\n\r\n\n", csv![]);
    parses_to!(whitespace_lines, "  \n\t\n", csv![]);
    parses_to!(
        empty_lines_interspersed,
        "\n\na,b\n\n\nx,y\n\n\nm,n\n",
        csv![["a", "b"], ["x", "y"], ["m", "n"]]
    );

    parses_to!(unquoted_strip, "  hi  ", csv![["hi"]]);
    parses_to!(
        unquoted_strip_each_field,
        " a , b\t,\tc ",
        csv![["a", "b", "c"]]
    );
    parses_to!(unquoted_inner_space, "a  b  ,c", csv![["a  b", "c"]]);
    parses_to!(unquoted_quote_inside, "a\"b,c", csv![["a\"b", "c"]]);
    parses_to!(unquoted_empty_middle, "a, ,c", csv![["a", "", "c"]]);

    parses_to!(quote_empty, "\"\"", csv![[""]]);
    parses_to!(quote_lf, "\"\"\n", csv![[""]]);
    parses_to!(quote_space, "\"  hi  \"", csv![["  hi  "]]);
    parses_to!(quote_doubled, "a,\"b\"\"c\",d", csv![["a", "b\"c", "d"]]);
    parses_to!(quote_only_quotes, "\"\"\"\"", csv![["\""]]);
    parses_to!(
        quote_newlines_and_delimiters,
        "\"a,b\nc\r\nd\",e",
        csv![["a,b\nc\r\nd", "e"]]
    );
    parses_to!(quote_then_space, "\"a\"  ,b", csv![["a", "b"]]);
    parses_to!(quote_then_space_eol, "\"a\" \t\nb", csv![["a"], ["b"]]);
    parses_to!(quote_then_space_eof, "\"a\"   ", csv![["a"]]);
    parses_to!(quote_then_crlf, "\"a\"\r\n\"b\"", csv![["a"], ["b"]]);
    parses_to!(quote_leading_space, "   \"a\",  \"b\"", csv![["a", "b"]]);
    parses_to!(quote_case_preserved, "\"MiXeD Case\"", csv![["MiXeD Case"]]);
    parses_to!(quote_trailing_comma, "\"a\",", csv![["a", ""]]);

    parses_to!(
        equals_is_literal_without_tricks,
        "=\"a\"",
        csv![["=\"a\""]]
    );
    parses_to!(
        equals_quote,
        "=\"007\",=\"  x \"",
        csv![["007", "  x "]],
        Dialect::spreadsheet()
    );
    parses_to!(
        equals_alone,
        "=a,=,b=\"c\"",
        csv![["=a", "=", "b=\"c\""]],
        Dialect::spreadsheet()
    );
    parses_to!(equals_at_eof, "a,=", csv![["a", "="]], Dialect::spreadsheet());
    parses_to!(
        quote_zero_is_nul,
        "\"a\"0b\",\"\"0\"",
        csv![["a\0b", "\0"]],
        Dialect::spreadsheet()
    );
    parses_to!(
        quote_zero_then_quote,
        "=\"0\"\"\"0\"",
        csv![["0\"\0"]],
        Dialect::spreadsheet()
    );

    parses_to!(
        tab_delimited,
        "a\tb\t\tc\n",
        csv![["a", "b", "", "c"]],
        Dialect::with_delimiter(b'\t')
    );
    parses_to!(
        tab_delimited_quoted,
        "\"a\"\t\"b\" \t c ",
        csv![["a", "b", "c"]],
        Dialect::with_delimiter(b'\t')
    );
    parses_to!(
        semicolon_delimited,
        "a;b,c;\"d;e\"",
        csv![["a", "b,c", "d;e"]],
        Dialect::with_delimiter(b';')
    );

    fails_with!(
        stray_after_quote,
        "\"abc\"x",
        1,
        0,
        ParseErrorKind::MalformedQuotedField { .. }
    );
    fails_with!(
        stray_after_quote_and_space,
        "a,b\nc,\"d\" e",
        2,
        1,
        ParseErrorKind::MalformedQuotedField { .. }
    );
    fails_with!(
        unterminated,
        "\"unterminated",
        1,
        0,
        ParseErrorKind::UnterminatedQuotedField
    );
    fails_with!(
        unterminated_later_field,
        "x\n\ny,z,\"abc\"\"",
        2,
        2,
        ParseErrorKind::UnterminatedQuotedField
    );

    #[test]
    fn zero_after_quote_without_tricks() {
        let res = parse(Parser::new(Dialect::default(), &b"\"a\"0\""[..]));
        assert!(match res {
            Err(Error::Parse(ref err)) => err.field() == 0,
            _ => false,
        });
    }

    #[test]
    fn error_clears_record() {
        let mut parser = Parser::new(Dialect::default(), &b"a,\"b\"c"[..]);
        let (mut fields, mut ends) = (vec![], vec![]);
        assert!(parser.read_record(&mut fields, &mut ends).is_err());
        assert!(fields.is_empty());
        assert!(ends.is_empty());
    }

    #[test]
    fn positions() {
        let data = &b"a,b\n\n\"x\ny\",z\nlast"[..];
        let mut parser = Parser::new(Dialect::default(), data);
        let (mut fields, mut ends) = (vec![], vec![]);

        assert_eq!(parser.position().record(), 0);
        assert!(parser.read_record(&mut fields, &mut ends).unwrap());
        assert_eq!(parser.position().record(), 1);
        assert_eq!(parser.position().line(), 1);
        assert_eq!(parser.position().byte(), 0);

        assert!(parser.read_record(&mut fields, &mut ends).unwrap());
        assert_eq!(parser.position().record(), 2);
        assert_eq!(parser.position().line(), 3);
        assert_eq!(parser.position().byte(), 5);

        assert!(parser.read_record(&mut fields, &mut ends).unwrap());
        assert_eq!(parser.position().record(), 3);
        assert_eq!(parser.position().line(), 5);
        assert_eq!(parser.position().byte(), 13);

        assert!(!parser.read_record(&mut fields, &mut ends).unwrap());
        assert!(parser.is_done());
        assert!(!parser.read_record(&mut fields, &mut ends).unwrap());
    }

    #[test]
    fn closed_parser() {
        let mut parser = Parser::new(Dialect::default(), &b"a\nb\n"[..]);
        let (mut fields, mut ends) = (vec![], vec![]);
        assert!(parser.read_record(&mut fields, &mut ends).unwrap());
        parser.close().unwrap();
        assert!(parser.is_closed());
        assert!(match parser.read_record(&mut fields, &mut ends) {
            Err(Error::Closed) => true,
            _ => false,
        });
    }

    #[test]
    fn hand_off_buffer() {
        let data = &b"a,b\nrest of it"[..];
        let mut parser = Parser::with_capacity(Dialect::default(), 16, data);
        let (mut fields, mut ends) = (vec![], vec![]);
        assert!(parser.read_record(&mut fields, &mut ends).unwrap());

        let mut rest = vec![];
        io::Read::read_to_end(&mut parser.into_buffer(), &mut rest).unwrap();
        assert_eq!(rest, b"rest of it");
    }

    #[test]
    fn huge_unquoted_field() {
        let mut data = vec![b'x'; 1 << 20];
        data.extend_from_slice(b"   ,y");
        let mut parser =
            Parser::with_capacity(Dialect::default(), 10, &data[..]);
        let (mut fields, mut ends) = (vec![], vec![]);
        assert!(parser.read_record(&mut fields, &mut ends).unwrap());
        assert_eq!(ends, vec![1 << 20, (1 << 20) + 1]);
    }
}
