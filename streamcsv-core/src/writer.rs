use std::fmt;

use log::debug;
use memchr::{memchr, memchr2};

use crate::error::{Error, Result};
use crate::sink::{write_all, ByteSink};
use crate::Dialect;

/// How a field is written.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Quoting {
    /// The field is written as is.
    Bare,
    /// The field is surrounded by quotes. Quotes inside are doubled and, in
    /// spreadsheet mode, NUL bytes are written as `"0`.
    Quoted,
    /// The field is written as `="..."`, escaped as for `Quoted`. This is
    /// only used in spreadsheet mode, for fields that a spreadsheet
    /// application would otherwise trim or read as a number.
    Formula,
}

/// Encodes fields and records for one dialect.
///
/// An encoder never fails: every field can be written in a way that the
/// `Parser` of the same dialect reads back. The one exception is a record
/// made of a single empty field, which is written as an empty line and so
/// is skipped when read.
#[derive(Clone, Copy, Debug, Default)]
pub struct Encoder {
    dialect: Dialect,
}

impl Encoder {
    /// Create an encoder for the given dialect.
    pub fn new(dialect: Dialect) -> Encoder {
        Encoder { dialect }
    }

    /// The dialect of this encoder.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Decide how `field` must be written.
    pub fn quoting(&self, field: &[u8]) -> Quoting {
        let d = self.dialect;
        let (first, last) = match (field.first(), field.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => return Quoting::Bare,
        };
        let blank_edge = d.is_blank(first) || d.is_blank(last);
        if d.spreadsheet && (blank_edge || first == b'0') {
            return Quoting::Formula;
        }
        let special = field.iter().any(|&b| {
            b == d.delimiter
                || b == b'"'
                || b == b'\r'
                || b == b'\n'
                || (b == 0 && d.spreadsheet)
        });
        if blank_edge || special {
            Quoting::Quoted
        } else {
            Quoting::Bare
        }
    }

    /// Append the encoding of one field to `out`.
    pub fn encode_field(&self, field: &[u8], out: &mut Vec<u8>) {
        match self.quoting(field) {
            Quoting::Bare => {
                out.extend_from_slice(field);
                return;
            }
            Quoting::Quoted => out.push(b'"'),
            Quoting::Formula => out.extend_from_slice(b"=\""),
        }
        let mut rest = field;
        loop {
            let hit = if self.dialect.spreadsheet {
                memchr2(b'"', 0, rest)
            } else {
                memchr(b'"', rest)
            };
            match hit {
                None => {
                    out.extend_from_slice(rest);
                    break;
                }
                Some(i) => {
                    out.extend_from_slice(&rest[..i]);
                    if rest[i] == b'"' {
                        out.extend_from_slice(b"\"\"");
                    } else {
                        out.extend_from_slice(b"\"0");
                    }
                    rest = &rest[i + 1..];
                }
            }
        }
        out.push(b'"');
    }

    /// Append the encoding of a whole record to `out`.
    ///
    /// Fields are separated by the delimiter and the record is terminated
    /// by `\n`. A record without fields is a lone `\n`.
    pub fn encode_record<I, T>(&self, record: I, out: &mut Vec<u8>)
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        for (i, field) in record.into_iter().enumerate() {
            if i > 0 {
                out.push(self.dialect.delimiter);
            }
            self.encode_field(field.as_ref(), out);
        }
        out.push(b'\n');
    }
}

/// Writes encoded records to a `ByteSink`.
///
/// Each record is encoded into an internal buffer and then written to the
/// sink in full, retrying short writes. A `RecordWriter` does no buffering
/// across records; wrap the sink if that is wanted.
pub struct RecordWriter<K> {
    /// The sink. `None` once the writer is closed.
    sink: Option<K>,
    encoder: Encoder,
    buf: Vec<u8>,
    records: u64,
}

impl<K: ByteSink> RecordWriter<K> {
    /// Create a writer for the given sink.
    pub fn new(dialect: Dialect, sink: K) -> RecordWriter<K> {
        RecordWriter {
            sink: Some(sink),
            encoder: Encoder::new(dialect),
            buf: vec![],
            records: 0,
        }
    }

    /// Encode and write one record.
    pub fn write_record<I, T>(&mut self, record: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let sink = match self.sink {
            None => return Err(Error::Closed),
            Some(ref mut sink) => sink,
        };
        self.buf.clear();
        self.encoder.encode_record(record, &mut self.buf);
        write_all(sink, &self.buf)?;
        self.records += 1;
        Ok(())
    }

    /// Close the underlying sink.
    ///
    /// Every later call to `write_record` or `close` fails with
    /// `Error::Closed`.
    pub fn close(&mut self) -> Result<()> {
        match self.sink.take() {
            None => Err(Error::Closed),
            Some(mut sink) => {
                debug!("closing writer after {} records", self.records);
                sink.close()?;
                Ok(())
            }
        }
    }
}

impl<K> RecordWriter<K> {
    /// The encoder used by this writer.
    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    /// The number of records written so far.
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Returns true if `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.sink.is_none()
    }

    /// Returns a reference to the sink, or `None` if this writer is closed.
    pub fn get_ref(&self) -> Option<&K> {
        self.sink.as_ref()
    }

    /// Returns a mutable reference to the sink, or `None` if this writer is
    /// closed.
    pub fn get_mut(&mut self) -> Option<&mut K> {
        self.sink.as_mut()
    }

    /// Unwrap this writer without closing the sink. Returns `None` if this
    /// writer is closed.
    pub fn into_inner(self) -> Option<K> {
        self.sink
    }
}

impl<K: fmt::Debug> fmt::Debug for RecordWriter<K> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RecordWriter")
            .field("sink", &self.sink)
            .field("encoder", &self.encoder)
            .field("records", &self.records)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::{Encoder, Quoting, RecordWriter};
    use crate::error::Error;
    use crate::sink::ByteSink;
    use crate::{Dialect, Parser};

    fn encode(dialect: Dialect, field: &[u8]) -> String {
        let mut out = vec![];
        Encoder::new(dialect).encode_field(field, &mut out);
        String::from_utf8(out).unwrap()
    }

    fn decode_all(dialect: Dialect, data: &[u8]) -> Vec<Vec<Vec<u8>>> {
        let mut parser = Parser::with_capacity(dialect, 3, data);
        let (mut fields, mut ends) = (vec![], vec![]);
        let mut records = vec![];
        while parser.read_record(&mut fields, &mut ends).unwrap() {
            let mut start = 0;
            let mut record = vec![];
            for &end in &ends {
                record.push(fields[start..end].to_vec());
                start = end;
            }
            records.push(record);
        }
        records
    }

    fn roundtrip(dialect: Dialect, record: &[&[u8]]) {
        let mut out = vec![];
        Encoder::new(dialect).encode_record(record, &mut out);
        let got = decode_all(dialect, &out);
        let want: Vec<Vec<u8>> = record.iter().map(|f| f.to_vec()).collect();
        assert_eq!(got, vec![want], "encoded as {:?}", out);
    }

    #[test]
    fn quoting_plain() {
        let enc = Encoder::default();
        assert_eq!(enc.quoting(b""), Quoting::Bare);
        assert_eq!(enc.quoting(b"abc"), Quoting::Bare);
        assert_eq!(enc.quoting(b"a b"), Quoting::Bare);
        assert_eq!(enc.quoting(b"007"), Quoting::Bare);
        assert_eq!(enc.quoting(b"a\0b"), Quoting::Bare);
        assert_eq!(enc.quoting(b" a"), Quoting::Quoted);
        assert_eq!(enc.quoting(b"a\t"), Quoting::Quoted);
        assert_eq!(enc.quoting(b"a,b"), Quoting::Quoted);
        assert_eq!(enc.quoting(b"a\"b"), Quoting::Quoted);
        assert_eq!(enc.quoting(b"a\rb"), Quoting::Quoted);
        assert_eq!(enc.quoting(b"a\nb"), Quoting::Quoted);
    }

    #[test]
    fn quoting_spreadsheet() {
        let enc = Encoder::new(Dialect::spreadsheet());
        assert_eq!(enc.quoting(b"abc"), Quoting::Bare);
        assert_eq!(enc.quoting(b"=abc"), Quoting::Bare);
        assert_eq!(enc.quoting(b"100"), Quoting::Bare);
        assert_eq!(enc.quoting(b"007"), Quoting::Formula);
        assert_eq!(enc.quoting(b" a"), Quoting::Formula);
        assert_eq!(enc.quoting(b"a "), Quoting::Formula);
        assert_eq!(enc.quoting(b"a\0b"), Quoting::Quoted);
        assert_eq!(enc.quoting(b"a,b"), Quoting::Quoted);
    }

    #[test]
    fn quoting_tab_delimiter() {
        let enc = Encoder::new(Dialect::with_delimiter(b'\t'));
        assert_eq!(enc.quoting(b"a\tb"), Quoting::Quoted);
        assert_eq!(enc.quoting(b"\ta"), Quoting::Quoted);
        assert_eq!(enc.quoting(b"a,b"), Quoting::Bare);
    }

    #[test]
    fn encode_fields() {
        let plain = Dialect::default();
        let sheet = Dialect::spreadsheet();
        assert_eq!(encode(plain, b""), "");
        assert_eq!(encode(plain, b"abc"), "abc");
        assert_eq!(encode(plain, b"b\"c"), "\"b\"\"c\"");
        assert_eq!(encode(plain, b"  hi  "), "\"  hi  \"");
        assert_eq!(encode(plain, b"\"\""), "\"\"\"\"\"\"");
        assert_eq!(encode(sheet, b"007"), "=\"007\"");
        assert_eq!(encode(sheet, b" x"), "=\" x\"");
        assert_eq!(encode(sheet, b"\0"), "\"\"0\"");
        assert_eq!(encode(sheet, b"0\"\0"), "=\"0\"\"\"0\"");
        assert_eq!(encode(sheet, b""), "");
    }

    #[test]
    fn encode_records() {
        let enc = Encoder::default();
        let mut out = vec![];
        enc.encode_record(&["a", "b,c", ""], &mut out);
        enc.encode_record(Vec::<&str>::new(), &mut out);
        enc.encode_record(&["x"], &mut out);
        assert_eq!(out, b"a,\"b,c\",\n\nx\n");

        let mut out = vec![];
        Encoder::new(Dialect::with_delimiter(b';'))
            .encode_record(&["a", "b;c"], &mut out);
        assert_eq!(out, b"a;\"b;c\"\n");
    }

    #[test]
    fn roundtrip_plain() {
        let d = Dialect::default();
        roundtrip(d, &[b"a", b"b", b"c"]);
        roundtrip(d, &[b"a b", b"", b"c"]);
        roundtrip(d, &[b"  hi  ", b"x,y", b"line\nbreak", b"cr\rlf\r\n"]);
        roundtrip(d, &[b"\"", b"\"\"", b"a\"", b"\"a"]);
        roundtrip(d, &[b"", b""]);
        roundtrip(d, &[b"=x", b"0\0"]);
    }

    #[test]
    fn roundtrip_spreadsheet() {
        let d = Dialect::spreadsheet();
        roundtrip(d, &[b"\0"]);
        roundtrip(d, &[b"007", b" pad", b"pad\t", b"0"]);
        roundtrip(d, &[b"=abc", b"=\"abc\"", b"="]);
        roundtrip(d, &[b"\0\0", b"a\0b", b"\00", b"0\0", b"\"0"]);
        roundtrip(d, &[b"0\"\0", b" \"\0,\n ", b"0,", b"", b"\0\""]);
    }

    #[test]
    fn roundtrip_nul_exactly_once() {
        let d = Dialect::spreadsheet();
        let mut out = vec![];
        Encoder::new(d).encode_record(&[&b"\0"[..]], &mut out);
        let got = decode_all(d, &out);
        assert_eq!(got, vec![vec![vec![0u8]]]);
    }

    /// Accepts one byte per write.
    struct Drip(Vec<u8>, bool);

    impl ByteSink for Drip {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.push(buf[0]);
            Ok(1)
        }

        fn close(&mut self) -> io::Result<()> {
            self.1 = true;
            Ok(())
        }
    }

    #[test]
    fn record_writer_retries_short_writes() {
        let sink = Drip(vec![], false);
        let mut wtr = RecordWriter::new(Dialect::default(), sink);
        wtr.write_record(&["a", "b c"]).unwrap();
        wtr.write_record(&[" d "]).unwrap();
        assert_eq!(wtr.records(), 2);
        assert_eq!(wtr.get_ref().unwrap().0, b"a,b c\n\" d \"\n");
    }

    #[test]
    fn record_writer_closed() {
        let sink = Drip(vec![], false);
        let mut wtr = RecordWriter::new(Dialect::default(), sink);
        wtr.write_record(&["a"]).unwrap();
        wtr.close().unwrap();
        assert!(wtr.is_closed());
        assert!(wtr.get_ref().is_none());
        assert!(match wtr.write_record(&["b"]) {
            Err(Error::Closed) => true,
            _ => false,
        });
        assert!(match wtr.close() {
            Err(Error::Closed) => true,
            _ => false,
        });
    }

    #[test]
    fn record_writer_close_reaches_sink() {
        let mut sink = Drip(vec![], false);
        {
            let mut wtr = RecordWriter::new(Dialect::default(), &mut sink);
            wtr.write_record(&["x"]).unwrap();
            wtr.close().unwrap();
        }
        assert!(sink.1);
        assert_eq!(sink.0, b"x\n");
    }
}
