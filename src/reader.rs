use std::fs::File;
use std::io;
use std::marker::PhantomData;
use std::path::Path;
use std::result;

use log::debug;
use serde::de::DeserializeOwned;
use streamcsv_core::{
    Buffer, Dialect, IoSource, Parser, DEFAULT_BUFFER_CAPACITY,
};

use crate::byte_record::ByteRecord;
use crate::error::{Error, Result, Utf8Error};
use crate::ParseError;
use crate::string_record::{self, StringRecord};
use crate::Position;

/// Builds a CSV reader with various configuration knobs.
///
/// This builder can be used to tweak the field delimiter, the spreadsheet
/// dialect, header handling and the buffer size. Once a `Reader` is built,
/// its configuration cannot be changed.
#[derive(Debug)]
pub struct ReaderBuilder {
    capacity: usize,
    dialect: Dialect,
    has_headers: bool,
}

impl Default for ReaderBuilder {
    fn default() -> ReaderBuilder {
        ReaderBuilder {
            capacity: DEFAULT_BUFFER_CAPACITY,
            dialect: Dialect::default(),
            has_headers: false,
        }
    }
}

impl ReaderBuilder {
    /// Create a new builder for configuring CSV parsing.
    ///
    /// To convert a builder into a reader, call one of the methods starting
    /// with `from_`.
    ///
    /// # Example
    ///
    /// ```
    /// use std::error::Error;
    /// use streamcsv::{ReaderBuilder, StringRecord};
    ///
    /// # fn main() { example().unwrap(); }
    /// fn example() -> Result<(), Box<dyn Error>> {
    ///     let data = "\
    /// city;country;pop
    /// Boston;United States;4628910
    /// ";
    ///     let mut rdr = ReaderBuilder::new()
    ///         .delimiter(b';')
    ///         .has_headers(true)
    ///         .from_reader(data.as_bytes());
    ///
    ///     let records = rdr.read_table()?;
    ///     assert_eq!(records, vec![
    ///         StringRecord::from(vec!["Boston", "United States", "4628910"]),
    ///     ]);
    ///     assert_eq!(rdr.headers()?, vec!["city", "country", "pop"]);
    ///     Ok(())
    /// }
    /// ```
    pub fn new() -> ReaderBuilder {
        ReaderBuilder::default()
    }

    /// Build a CSV parser from this configuration that reads data from the
    /// given file path.
    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> Result<Reader<File>> {
        let path = path.as_ref();
        debug!("opening {} for reading", path.display());
        Ok(Reader::new(self, File::open(path)?))
    }

    /// Build a CSV parser from this configuration that reads data from
    /// `rdr`.
    ///
    /// The reader is buffered for you automatically.
    pub fn from_reader<R: io::Read>(&self, rdr: R) -> Reader<R> {
        Reader::new(self, rdr)
    }

    /// The field delimiter to use when parsing CSV.
    ///
    /// The default is `b','`.
    pub fn delimiter(&mut self, delimiter: u8) -> &mut ReaderBuilder {
        self.dialect.delimiter = delimiter;
        self
    }

    /// Whether to read the spreadsheet dialect.
    ///
    /// When enabled, a field written as `="..."` is read as a quoted field
    /// and `"0` inside a quoted field is read as a NUL byte.
    ///
    /// This is disabled by default.
    pub fn spreadsheet(&mut self, yes: bool) -> &mut ReaderBuilder {
        self.dialect.spreadsheet = yes;
        self
    }

    /// Whether to treat the first row as a special header row.
    ///
    /// When enabled, the first row is not returned by the record reading
    /// methods and iterators. It is available through `headers`, and is used
    /// to match fields to struct members when deserializing.
    ///
    /// This is disabled by default.
    pub fn has_headers(&mut self, yes: bool) -> &mut ReaderBuilder {
        self.has_headers = yes;
        self
    }

    /// Set the capacity (in bytes) of the buffer used in the CSV reader.
    pub fn buffer_capacity(&mut self, capacity: usize) -> &mut ReaderBuilder {
        self.capacity = capacity;
        self
    }
}

/// A already-configured CSV reader.
///
/// A CSV reader takes as input CSV data and transforms that into standard
/// Rust values. Records may be read as `ByteRecord`s, `StringRecord`s or
/// deserialized into types that implement serde's `Deserialize`.
///
/// Records need not have the same number of fields. Blank lines are
/// skipped, as is whitespace around unquoted fields.
///
/// # Example
///
/// ```
/// use streamcsv::Reader;
///
/// let data = "a, b ,c\n\n  \"  d  \",e\n";
/// let mut rdr = Reader::from_reader(data.as_bytes());
/// let rows = rdr.read_table().unwrap();
/// assert_eq!(rows[0], vec!["a", "b", "c"]);
/// assert_eq!(rows[1], vec!["  d  ", "e"]);
/// ```
#[derive(Debug)]
pub struct Reader<R> {
    parser: Parser<IoSource<R>>,
    has_headers: bool,
    /// The first record of the data, once it has been read.
    headers: Option<Headers>,
    /// Set when `headers` read the first record of data that has no header
    /// row. The next read returns it.
    first_pending: bool,
    /// Set when the header row failed to parse. Every later read fails.
    header_err: Option<ParseError>,
}

#[derive(Debug)]
struct Headers {
    byte_record: ByteRecord,
    string_record: result::Result<StringRecord, Utf8Error>,
}

impl Headers {
    fn new(byte_record: ByteRecord) -> Headers {
        let string_record = StringRecord::from_byte_record(byte_record.clone())
            .map_err(|err| err.utf8_error().clone());
        Headers { byte_record, string_record }
    }
}

impl Reader<File> {
    /// Create a new CSV parser with a default configuration for the given
    /// file path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Reader<File>> {
        ReaderBuilder::new().from_path(path)
    }
}

impl<R: io::Read> Reader<R> {
    fn new(builder: &ReaderBuilder, rdr: R) -> Reader<R> {
        Reader {
            parser: Parser::with_capacity(
                builder.dialect,
                builder.capacity,
                IoSource::new(rdr),
            ),
            has_headers: builder.has_headers,
            headers: None,
            first_pending: false,
            header_err: None,
        }
    }

    /// Create a new CSV parser with a default configuration for the given
    /// reader.
    pub fn from_reader(rdr: R) -> Reader<R> {
        ReaderBuilder::new().from_reader(rdr)
    }

    /// Returns a borrowed iterator over deserialized records.
    ///
    /// When the reader has headers, struct members are matched to fields by
    /// header name.
    ///
    /// The iterator stops after the first error.
    ///
    /// # Example
    ///
    /// ```
    /// use serde::Deserialize;
    /// use streamcsv::ReaderBuilder;
    ///
    /// #[derive(Debug, Deserialize, PartialEq)]
    /// struct Row {
    ///     id: String,
    ///     count: u32,
    /// }
    ///
    /// let data = "count,id\n3,=\"007\"\n";
    /// let mut rdr = ReaderBuilder::new()
    ///     .has_headers(true)
    ///     .spreadsheet(true)
    ///     .from_reader(data.as_bytes());
    /// let rows: Vec<Row> =
    ///     rdr.deserialize().collect::<Result<_, _>>().unwrap();
    /// assert_eq!(rows, vec![Row { id: "007".to_string(), count: 3 }]);
    /// ```
    pub fn deserialize<D>(&mut self) -> DeserializeRecordsIter<R, D>
    where
        D: DeserializeOwned,
    {
        DeserializeRecordsIter::new(self)
    }

    /// Returns an owned iterator over deserialized records.
    pub fn into_deserialize<D>(self) -> DeserializeRecordsIntoIter<R, D>
    where
        D: DeserializeOwned,
    {
        DeserializeRecordsIntoIter::new(self)
    }

    /// Returns a borrowed iterator over all records as strings.
    ///
    /// The iterator stops after the first error.
    pub fn records(&mut self) -> StringRecordsIter<R> {
        StringRecordsIter { rdr: self, done: false }
    }

    /// Returns an owned iterator over all records as strings.
    pub fn into_records(self) -> StringRecordsIntoIter<R> {
        StringRecordsIntoIter { rdr: self, done: false }
    }

    /// Returns a borrowed iterator over all records as raw bytes.
    ///
    /// The iterator stops after the first error.
    pub fn byte_records(&mut self) -> ByteRecordsIter<R> {
        ByteRecordsIter { rdr: self, done: false }
    }

    /// Returns an owned iterator over all records as raw bytes.
    pub fn into_byte_records(self) -> ByteRecordsIntoIter<R> {
        ByteRecordsIntoIter { rdr: self, done: false }
    }

    /// Returns a reference to the first row read by this parser.
    ///
    /// If no row has been read yet, this reads the first row. When the
    /// reader has no header row, that row is still returned by the next
    /// read.
    ///
    /// If the data is empty, the header row is empty.
    pub fn headers(&mut self) -> Result<&StringRecord> {
        self.byte_headers()?;
        match self.headers {
            Some(Headers { string_record: Ok(ref record), .. }) => Ok(record),
            Some(Headers { string_record: Err(ref err), .. }) => {
                Err(Error::Utf8 { pos: None, err: err.clone() })
            }
            None => Err(Error::Closed),
        }
    }

    /// Returns a reference to the first row read by this parser as raw
    /// bytes.
    ///
    /// See `headers`.
    pub fn byte_headers(&mut self) -> Result<&ByteRecord> {
        if self.headers.is_none() {
            let mut record = ByteRecord::new();
            let more = self.read_first(&mut record)?;
            self.first_pending = more && !self.has_headers;
            self.headers = Some(Headers::new(record));
        }
        match self.headers {
            Some(ref headers) => Ok(&headers.byte_record),
            None => Err(Error::Closed),
        }
    }

    /// Read a single row into the given string record.
    ///
    /// Returns `false` when no more records could be read. Reaching the end
    /// of the data is not an error.
    ///
    /// If the record is not valid UTF-8, an error is returned and the record
    /// is cleared.
    pub fn read_record(&mut self, record: &mut StringRecord) -> Result<bool> {
        string_record::read(self, record)
    }

    /// Read a single row into the given byte record.
    ///
    /// Returns `false` when no more records could be read. Reaching the end
    /// of the data is not an error.
    ///
    /// On error, the record is cleared.
    pub fn read_byte_record(
        &mut self,
        record: &mut ByteRecord,
    ) -> Result<bool> {
        if self.first_pending {
            self.first_pending = false;
            if let Some(ref headers) = self.headers {
                record.clone_from(&headers.byte_record);
                return Ok(true);
            }
        }
        if self.headers.is_some() {
            return self.read_raw(record);
        }
        if !self.read_first(record)? {
            return Ok(false);
        }
        self.headers = Some(Headers::new(record.clone()));
        if self.has_headers {
            self.read_raw(record)
        } else {
            Ok(true)
        }
    }

    /// Read all remaining records as strings.
    ///
    /// This buffers the whole table in memory.
    pub fn read_table(&mut self) -> Result<Vec<StringRecord>> {
        let table = self.records().collect::<Result<Vec<_>>>()?;
        debug!("read table of {} records", table.len());
        Ok(table)
    }

    /// Read all remaining records as raw bytes.
    ///
    /// This buffers the whole table in memory.
    pub fn read_byte_table(&mut self) -> Result<Vec<ByteRecord>> {
        let table = self.byte_records().collect::<Result<Vec<_>>>()?;
        debug!("read table of {} records", table.len());
        Ok(table)
    }

    /// Close the underlying reader.
    ///
    /// Every later read fails with `Error::Closed`.
    pub fn close(&mut self) -> Result<()> {
        self.parser.close().map_err(Error::from)
    }

    /// Read the first record of the data.
    ///
    /// A parse error in the header row is kept and returned by every later
    /// read.
    fn read_first(&mut self, record: &mut ByteRecord) -> Result<bool> {
        if let Some(ref err) = self.header_err {
            record.clear();
            return Err(Error::Parse(err.clone()));
        }
        match self.read_raw(record) {
            Err(Error::Parse(err)) => {
                if self.has_headers {
                    self.header_err = Some(err.clone());
                }
                Err(Error::Parse(err))
            }
            res => res,
        }
    }

    fn read_raw(&mut self, record: &mut ByteRecord) -> Result<bool> {
        record.set_position(None);
        let more = {
            let (fields, ends) = record.as_parts();
            self.parser.read_record(fields, ends)?
        };
        if more {
            record.set_position(Some(*self.parser.position()));
        }
        Ok(more)
    }
}

impl<R> Reader<R> {
    /// The position of the start of the most recently read record.
    pub fn position(&self) -> &Position {
        self.parser.position()
    }

    /// Returns true if this reader has exhausted its input.
    pub fn is_done(&self) -> bool {
        self.parser.is_done()
    }

    /// Returns true if this reader has been closed.
    pub fn is_closed(&self) -> bool {
        self.parser.is_closed()
    }

    /// Returns true if the first row is treated as a header row.
    pub fn has_headers(&self) -> bool {
        self.has_headers
    }

    /// Returns a reference to the underlying reader, or `None` once this
    /// reader is closed.
    pub fn get_ref(&self) -> Option<&R> {
        self.parser.get_ref().map(IoSource::get_ref)
    }

    /// Returns a mutable reference to the underlying reader, or `None` once
    /// this reader is closed.
    ///
    /// Reading from the underlying reader directly skips any data already
    /// buffered by this CSV reader.
    pub fn get_mut(&mut self) -> Option<&mut R> {
        self.parser.get_mut().map(IoSource::get_mut)
    }

    /// Unwrap this CSV reader into the rest of its input.
    ///
    /// The returned buffer yields any bytes that were read ahead but not yet
    /// parsed before reading from the underlying reader, and implements
    /// `io::Read`.
    pub fn into_inner_source(self) -> Buffer<IoSource<R>> {
        self.parser.into_buffer()
    }
}

/// An owned iterator over deserialized records.
///
/// The type parameter `R` refers to the underlying `io::Read` type, and `D`
/// refers to the type that this iterator will deserialize a record into.
pub struct DeserializeRecordsIntoIter<R, D> {
    rdr: Reader<R>,
    rec: ByteRecord,
    headers: Option<ByteRecord>,
    err: Option<Error>,
    done: bool,
    _priv: PhantomData<D>,
}

impl<R: io::Read, D: DeserializeOwned> DeserializeRecordsIntoIter<R, D> {
    fn new(mut rdr: Reader<R>) -> DeserializeRecordsIntoIter<R, D> {
        let (headers, err) = deserialize_headers(&mut rdr);
        DeserializeRecordsIntoIter {
            rdr,
            rec: ByteRecord::new(),
            headers,
            err,
            done: false,
            _priv: PhantomData,
        }
    }

    /// Return a reference to the underlying CSV reader.
    pub fn reader(&self) -> &Reader<R> {
        &self.rdr
    }

    /// Drop this iterator and return the underlying CSV reader.
    pub fn into_reader(self) -> Reader<R> {
        self.rdr
    }
}

impl<R: io::Read, D: DeserializeOwned> Iterator
    for DeserializeRecordsIntoIter<R, D>
{
    type Item = Result<D>;

    fn next(&mut self) -> Option<Result<D>> {
        next_deserialized(
            &mut self.rdr,
            &mut self.rec,
            self.headers.as_ref(),
            &mut self.err,
            &mut self.done,
        )
    }
}

/// A borrowed iterator over deserialized records.
///
/// The lifetime parameter `'r` refers to the lifetime of the underlying CSV
/// `Reader`.
pub struct DeserializeRecordsIter<'r, R: 'r, D> {
    rdr: &'r mut Reader<R>,
    rec: ByteRecord,
    headers: Option<ByteRecord>,
    err: Option<Error>,
    done: bool,
    _priv: PhantomData<D>,
}

impl<'r, R: io::Read, D: DeserializeOwned> DeserializeRecordsIter<'r, R, D> {
    fn new(rdr: &'r mut Reader<R>) -> DeserializeRecordsIter<'r, R, D> {
        let (headers, err) = deserialize_headers(rdr);
        DeserializeRecordsIter {
            rdr,
            rec: ByteRecord::new(),
            headers,
            err,
            done: false,
            _priv: PhantomData,
        }
    }

    /// Return a reference to the underlying CSV reader.
    pub fn reader(&self) -> &Reader<R> {
        &self.rdr
    }
}

impl<'r, R: io::Read, D: DeserializeOwned> Iterator
    for DeserializeRecordsIter<'r, R, D>
{
    type Item = Result<D>;

    fn next(&mut self) -> Option<Result<D>> {
        next_deserialized(
            self.rdr,
            &mut self.rec,
            self.headers.as_ref(),
            &mut self.err,
            &mut self.done,
        )
    }
}

/// The header row used to deserialize by name, if the reader has one.
///
/// An error reading the header row is returned separately, to be yielded
/// by the first call to `next`.
fn deserialize_headers<R: io::Read>(
    rdr: &mut Reader<R>,
) -> (Option<ByteRecord>, Option<Error>) {
    if !rdr.has_headers {
        return (None, None);
    }
    match rdr.byte_headers() {
        Ok(headers) => (Some(headers.clone()), None),
        Err(err) => (None, Some(err)),
    }
}

fn next_deserialized<R: io::Read, D: DeserializeOwned>(
    rdr: &mut Reader<R>,
    rec: &mut ByteRecord,
    headers: Option<&ByteRecord>,
    err: &mut Option<Error>,
    done: &mut bool,
) -> Option<Result<D>> {
    if *done {
        return None;
    }
    if let Some(err) = err.take() {
        *done = true;
        return Some(Err(err));
    }
    let res = match rdr.read_byte_record(rec) {
        Err(err) => Err(err),
        Ok(false) => {
            *done = true;
            return None;
        }
        Ok(true) => rec.deserialize(headers),
    };
    if res.is_err() {
        *done = true;
    }
    Some(res)
}

macro_rules! record_iterators {
    ($record:ident, $read:ident, $into_iter:ident, $iter:ident) => {
        /// An owned iterator over records.
        pub struct $into_iter<R> {
            rdr: Reader<R>,
            done: bool,
        }

        impl<R: io::Read> $into_iter<R> {
            /// Return a reference to the underlying CSV reader.
            pub fn reader(&self) -> &Reader<R> {
                &self.rdr
            }

            /// Drop this iterator and return the underlying CSV reader.
            pub fn into_reader(self) -> Reader<R> {
                self.rdr
            }
        }

        impl<R: io::Read> Iterator for $into_iter<R> {
            type Item = Result<$record>;

            fn next(&mut self) -> Option<Result<$record>> {
                next_record(&mut self.rdr, &mut self.done, Reader::$read)
            }
        }

        /// A borrowed iterator over records.
        ///
        /// The lifetime parameter `'r` refers to the lifetime of the
        /// underlying CSV `Reader`.
        pub struct $iter<'r, R: 'r> {
            rdr: &'r mut Reader<R>,
            done: bool,
        }

        impl<'r, R: io::Read> $iter<'r, R> {
            /// Return a reference to the underlying CSV reader.
            pub fn reader(&self) -> &Reader<R> {
                &self.rdr
            }
        }

        impl<'r, R: io::Read> Iterator for $iter<'r, R> {
            type Item = Result<$record>;

            fn next(&mut self) -> Option<Result<$record>> {
                next_record(self.rdr, &mut self.done, Reader::$read)
            }
        }
    };
}

record_iterators!(
    StringRecord,
    read_record,
    StringRecordsIntoIter,
    StringRecordsIter
);
record_iterators!(
    ByteRecord,
    read_byte_record,
    ByteRecordsIntoIter,
    ByteRecordsIter
);

fn next_record<R, T, F>(
    rdr: &mut Reader<R>,
    done: &mut bool,
    read: F,
) -> Option<Result<T>>
where
    T: Default,
    F: FnOnce(&mut Reader<R>, &mut T) -> Result<bool>,
{
    if *done {
        return None;
    }
    let mut record = T::default();
    match read(rdr, &mut record) {
        Ok(true) => Some(Ok(record)),
        Ok(false) => {
            *done = true;
            None
        }
        Err(err) => {
            *done = true;
            Some(Err(err))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use crate::byte_record::ByteRecord;
    use crate::error::Error;
    use crate::string_record::StringRecord;

    use super::{Reader, ReaderBuilder};

    fn b(s: &str) -> &[u8] {
        s.as_bytes()
    }

    #[test]
    fn read_byte_record() {
        let data = b("foo,\"b,ar\",baz\nabc,mno,xyz");
        let mut rdr = Reader::from_reader(data);
        let mut rec = ByteRecord::new();

        assert!(rdr.read_byte_record(&mut rec).unwrap());
        assert_eq!(rec, vec!["foo", "b,ar", "baz"]);
        assert_eq!(rec.position().unwrap().record(), 1);

        assert!(rdr.read_byte_record(&mut rec).unwrap());
        assert_eq!(rec, vec!["abc", "mno", "xyz"]);
        assert_eq!(rec.position().unwrap().line(), 2);
        assert_eq!(rec.position().unwrap().byte(), 15);

        assert!(!rdr.read_byte_record(&mut rec).unwrap());
        assert!(rec.is_empty());
        assert!(rec.position().is_none());
        assert!(rdr.is_done());
    }

    #[test]
    fn read_record_unicode() {
        let data = b("ⓐⓑⓒ,☃\n");
        let mut rdr = Reader::from_reader(data);
        let mut rec = StringRecord::new();
        assert!(rdr.read_record(&mut rec).unwrap());
        assert_eq!(rec, vec!["ⓐⓑⓒ", "☃"]);
    }

    #[test]
    fn read_record_invalid_utf8() {
        let data = &b"a,b\n\xFFz,c\nd\n"[..];
        let mut rdr = Reader::from_reader(data);
        let mut rec = StringRecord::new();
        assert!(rdr.read_record(&mut rec).unwrap());
        match rdr.read_record(&mut rec) {
            Err(Error::Utf8 { pos: Some(pos), err }) => {
                assert_eq!(pos.record(), 2);
                assert_eq!(err.field(), 0);
            }
            res => panic!("expected UTF-8 error, got {:?}", res),
        }
        assert!(rec.is_empty());
        assert!(rdr.read_record(&mut rec).unwrap());
        assert_eq!(rec, vec!["d"]);
    }

    #[test]
    fn headers_are_skipped() {
        let data = b("h1,h2\na,b\n");
        let mut rdr =
            ReaderBuilder::new().has_headers(true).from_reader(data);
        let rows = rdr.read_table().unwrap();
        assert_eq!(rows, vec![StringRecord::from(vec!["a", "b"])]);
        assert_eq!(rdr.headers().unwrap(), &vec!["h1", "h2"]);
    }

    #[test]
    fn headers_before_reading_without_header_row() {
        let data = b("a,b\nc,d\n");
        let mut rdr = Reader::from_reader(data);
        assert_eq!(rdr.headers().unwrap(), &vec!["a", "b"]);
        let rows = rdr.read_table().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["a", "b"]);
        assert_eq!(rows[1], vec!["c", "d"]);
        assert_eq!(rdr.headers().unwrap(), &vec!["a", "b"]);
    }

    #[test]
    fn headers_of_empty_data() {
        let mut rdr =
            ReaderBuilder::new().has_headers(true).from_reader(b(""));
        assert!(rdr.headers().unwrap().is_empty());
        assert!(rdr.read_table().unwrap().is_empty());
    }

    #[test]
    fn only_headers() {
        let mut rdr =
            ReaderBuilder::new().has_headers(true).from_reader(b("x,y\n"));
        let mut rec = ByteRecord::new();
        assert!(!rdr.read_byte_record(&mut rec).unwrap());
        assert_eq!(rdr.byte_headers().unwrap(), &vec!["x", "y"]);
    }

    #[test]
    fn broken_header_row_stays_broken() {
        let data = b("\"h1\"x,h2\na,b\n");
        let mut rdr =
            ReaderBuilder::new().has_headers(true).from_reader(data);
        assert!(rdr.byte_headers().unwrap_err().is_parse_error());
        assert!(rdr.byte_headers().unwrap_err().is_parse_error());

        let mut rec = ByteRecord::from(vec!["stale"]);
        assert!(rdr.read_byte_record(&mut rec).unwrap_err().is_parse_error());
        assert!(rec.is_empty());
    }

    #[test]
    fn broken_header_row_fails_reads() {
        let data = b("\"h1\"x,h2\na,b\n");
        let mut rdr =
            ReaderBuilder::new().has_headers(true).from_reader(data);
        let mut rec = ByteRecord::new();
        match rdr.read_byte_record(&mut rec) {
            Err(Error::Parse(ref err)) => assert_eq!(err.record(), 1),
            ref res => panic!("expected parse error, got {:?}", res),
        }
        assert!(rdr.read_byte_record(&mut rec).is_err());
        assert!(rdr.headers().is_err());
    }

    #[test]
    fn iterators_stop_after_error() {
        let data = b("a\n\"b\"x\nc\n");
        let mut rdr = Reader::from_reader(data);
        let got: Vec<_> = rdr.byte_records().collect();
        assert_eq!(got.len(), 2);
        assert!(got[0].is_ok());
        match got[1] {
            Err(Error::Parse(ref err)) => {
                assert_eq!(err.record(), 2);
                assert_eq!(err.field(), 0);
            }
            ref res => panic!("expected parse error, got {:?}", res),
        }
    }

    #[test]
    fn owned_iterators() {
        let data = b("a,b\nc\n");
        let rows: Vec<StringRecord> = Reader::from_reader(data)
            .into_records()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(rows, vec![
            StringRecord::from(vec!["a", "b"]),
            StringRecord::from(vec!["c"]),
        ]);

        let rows: Vec<ByteRecord> = Reader::from_reader(data)
            .into_byte_records()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(rows[1], vec!["c"]);
    }

    #[test]
    fn closed_reader() {
        let mut rdr = Reader::from_reader(b("a\nb\n"));
        let mut rec = ByteRecord::new();
        assert!(rdr.read_byte_record(&mut rec).unwrap());
        rdr.close().unwrap();
        assert!(rdr.is_closed());
        assert!(rdr.get_ref().is_none());
        match rdr.read_byte_record(&mut rec) {
            Err(Error::Closed) => {}
            res => panic!("expected closed error, got {:?}", res),
        }
        match rdr.close() {
            Err(Error::Closed) => {}
            res => panic!("expected closed error, got {:?}", res),
        }
    }

    #[test]
    fn into_inner_source_keeps_read_ahead() {
        use std::io::Read;

        let data = b("a,b\nrest of the stream");
        let mut rdr = Reader::from_reader(data);
        let mut rec = ByteRecord::new();
        assert!(rdr.read_byte_record(&mut rec).unwrap());

        let mut rest = String::new();
        rdr.into_inner_source().read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "rest of the stream");
    }

    #[test]
    fn io_errors_pass_through() {
        struct Broken;

        impl io::Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
            }
        }

        let mut rdr = Reader::from_reader(Broken);
        match rdr.read_byte_record(&mut ByteRecord::new()) {
            Err(Error::Io(ref err)) => {
                assert_eq!(err.kind(), io::ErrorKind::BrokenPipe)
            }
            res => panic!("expected I/O error, got {:?}", res),
        }
    }

    #[test]
    fn spreadsheet_dialect() {
        let data = &b"=\"007\",\"a\"0b\",=x\n"[..];
        let mut rdr = ReaderBuilder::new().spreadsheet(true).from_reader(data);
        let rows = rdr.read_byte_table().unwrap();
        assert_eq!(rows, vec![ByteRecord::from(vec![
            &b"007"[..],
            &b"a\0b"[..],
            &b"=x"[..],
        ])]);

        // Without the dialect, the wrapper is part of an unquoted field.
        let mut rdr = Reader::from_reader(&b"=\"007\",x\n"[..]);
        let rows = rdr.read_table().unwrap();
        assert_eq!(rows[0], vec!["=\"007\"", "x"]);

        let mut rdr = Reader::from_reader(&b"\"a\"0b\n"[..]);
        match rdr.read_byte_record(&mut ByteRecord::new()) {
            Err(Error::Parse(_)) => {}
            res => panic!("expected parse error, got {:?}", res),
        }
    }

    #[test]
    fn tiny_buffer() {
        let data = b("abc,\"de\"\"f\"\n  ghi  ,jkl\n");
        let mut rdr =
            ReaderBuilder::new().buffer_capacity(1).from_reader(data);
        let rows = rdr.read_table().unwrap();
        assert_eq!(rows[0], vec!["abc", "de\"f"]);
        assert_eq!(rows[1], vec!["ghi", "jkl"]);
    }
}
