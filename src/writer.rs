use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use log::debug;
use serde::Serialize;
use streamcsv_core::{Dialect, IoSink, RecordWriter};

use crate::byte_record::ByteRecord;
use crate::error::{Error, Result};
use crate::serializer::serialize;

type Sink<W> = IoSink<io::BufWriter<W>>;

/// Builds a CSV writer with various configuration knobs.
///
/// This builder can be used to tweak the field delimiter, the spreadsheet
/// dialect, header handling and the buffer size. Once a `Writer` is built,
/// its configuration cannot be changed.
#[derive(Debug)]
pub struct WriterBuilder {
    capacity: usize,
    dialect: Dialect,
    has_headers: bool,
}

impl Default for WriterBuilder {
    fn default() -> WriterBuilder {
        WriterBuilder {
            capacity: 8 * (1 << 10),
            dialect: Dialect::default(),
            has_headers: false,
        }
    }
}

impl WriterBuilder {
    /// Create a new builder for configuring CSV writing.
    ///
    /// To convert a builder into a writer, call one of the methods starting
    /// with `from_`.
    ///
    /// # Example
    ///
    /// ```
    /// use streamcsv::WriterBuilder;
    ///
    /// let mut wtr = WriterBuilder::new()
    ///     .spreadsheet(true)
    ///     .from_writer(vec![]);
    /// wtr.write_record(&["007", "a,b", " padded"]).unwrap();
    ///
    /// let data = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
    /// assert_eq!(data, "=\"007\",\"a,b\",=\" padded\"\n");
    /// ```
    pub fn new() -> WriterBuilder {
        WriterBuilder::default()
    }

    /// Build a CSV writer from this configuration that writes data to the
    /// given file path. The file is truncated if it already exists.
    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> Result<Writer<File>> {
        let path = path.as_ref();
        debug!("creating {} for writing", path.display());
        Ok(Writer::new(self, File::create(path)?))
    }

    /// Build a CSV writer from this configuration that writes data to `wtr`.
    ///
    /// The writer is buffered for you automatically.
    pub fn from_writer<W: io::Write>(&self, wtr: W) -> Writer<W> {
        Writer::new(self, wtr)
    }

    /// The field delimiter to use when writing CSV.
    ///
    /// The default is `b','`.
    pub fn delimiter(&mut self, delimiter: u8) -> &mut WriterBuilder {
        self.dialect.delimiter = delimiter;
        self
    }

    /// Whether to write the spreadsheet dialect.
    ///
    /// When enabled, fields with a leading `0` or with leading or trailing
    /// whitespace are written as `="..."`, and NUL bytes are written as `"0`
    /// inside a quoted field.
    ///
    /// This is disabled by default.
    pub fn spreadsheet(&mut self, yes: bool) -> &mut WriterBuilder {
        self.dialect.spreadsheet = yes;
        self
    }

    /// Whether to write a header row before the first serialized struct.
    ///
    /// When enabled, the first call to `Writer::serialize` with a struct
    /// writes the names of its members as a record before the struct's
    /// values. Other types, and the `write_*` methods, never write headers.
    ///
    /// This is disabled by default.
    pub fn has_headers(&mut self, yes: bool) -> &mut WriterBuilder {
        self.has_headers = yes;
        self
    }

    /// Set the capacity (in bytes) of the internal buffer used in the CSV
    /// writer.
    pub fn buffer_capacity(&mut self, capacity: usize) -> &mut WriterBuilder {
        self.capacity = capacity;
        self
    }
}

/// A already-configured CSV writer.
///
/// A CSV writer takes as input Rust values and writes those values in a
/// valid CSV format as output. Every record ends with `\n`. Fields are
/// quoted only when they must be for the data to read back the same.
///
/// Records with a single empty field are written as an empty line, which
/// readers skip. Use at least two fields, or a non-empty field, to keep such
/// records.
///
/// The writer is flushed when it is dropped, and any error is ignored. Call
/// `flush` or `close` to observe it.
///
/// # Example
///
/// ```
/// use streamcsv::Writer;
///
/// let mut wtr = Writer::from_writer(vec![]);
/// wtr.write_record(&["a", "b c", "say \"hi\""]).unwrap();
/// wtr.write_record(&["", "x"]).unwrap();
///
/// let data = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
/// assert_eq!(data, "a,b c,\"say \"\"hi\"\"\"\n,x\n");
/// ```
pub struct Writer<W: io::Write> {
    /// `None` only once `into_inner` has taken the sink.
    wtr: Option<RecordWriter<Sink<W>>>,
    has_headers: bool,
    /// Set once the first serialized value has been checked for a header
    /// row.
    header_checked: bool,
    rec: ByteRecord,
}

impl<W: io::Write> Drop for Writer<W> {
    fn drop(&mut self) {
        if let Some(sink) = self.wtr.as_mut().and_then(|w| w.get_mut()) {
            let _ = sink.get_mut().flush();
        }
    }
}

impl<W: io::Write + fmt::Debug> fmt::Debug for Writer<W> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Writer")
            .field("wtr", &self.wtr)
            .field("has_headers", &self.has_headers)
            .field("header_checked", &self.header_checked)
            .finish()
    }
}

impl Writer<File> {
    /// Build a CSV writer with a default configuration that writes data to
    /// the given file path. The file is truncated if it already exists.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Writer<File>> {
        WriterBuilder::new().from_path(path)
    }
}

impl<W: io::Write> Writer<W> {
    fn new(builder: &WriterBuilder, wtr: W) -> Writer<W> {
        let sink =
            IoSink::new(io::BufWriter::with_capacity(builder.capacity, wtr));
        Writer {
            wtr: Some(RecordWriter::new(builder.dialect, sink)),
            has_headers: builder.has_headers,
            header_checked: false,
            rec: ByteRecord::new(),
        }
    }

    /// Build a CSV writer with a default configuration that writes data to
    /// `wtr`.
    ///
    /// The writer is buffered for you automatically.
    pub fn from_writer(wtr: W) -> Writer<W> {
        WriterBuilder::new().from_writer(wtr)
    }

    fn record_writer(&mut self) -> Result<&mut RecordWriter<Sink<W>>> {
        self.wtr.as_mut().ok_or(Error::Closed)
    }

    /// Write a single record.
    ///
    /// This may be called with any iterator of byte strings, such as
    /// `&[&str]`, `Vec<String>` or `&ByteRecord`.
    pub fn write_record<I, T>(&mut self, record: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.record_writer()?.write_record(record)?;
        Ok(())
    }

    /// Write a single `ByteRecord`.
    pub fn write_byte_record(&mut self, record: &ByteRecord) -> Result<()> {
        self.write_record(record)
    }

    /// Write every record of `table` in order.
    ///
    /// Writing stops at the first error.
    pub fn write_table<I, R, T>(&mut self, table: I) -> Result<()>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let mut count = 0u64;
        for record in table {
            self.write_record(record)?;
            count += 1;
        }
        debug!("wrote table of {} records", count);
        Ok(())
    }

    /// Serialize a single record using serde.
    ///
    /// Structs, tuples, sequences and scalars are written as one record.
    /// Each integer is formatted with `itoa` and each float with `ryu`.
    /// `None` and `()` are written as an empty field, and enum unit variants
    /// as their name. Maps and enum variants holding data are not
    /// supported.
    ///
    /// If the writer was built with `has_headers` and this is the first
    /// value serialized, a struct's member names are written as a header
    /// row first. Values that are not structs themselves, such as a tuple
    /// holding a struct, get no header row.
    ///
    /// # Example
    ///
    /// ```
    /// use serde::Serialize;
    /// use streamcsv::WriterBuilder;
    ///
    /// #[derive(Serialize)]
    /// struct Row<'a> {
    ///     city: &'a str,
    ///     population: Option<u64>,
    /// }
    ///
    /// let mut wtr =
    ///     WriterBuilder::new().has_headers(true).from_writer(vec![]);
    /// wtr.serialize(Row { city: "Boston", population: Some(4628910) })
    ///     .unwrap();
    /// wtr.serialize(Row { city: "Concord", population: None }).unwrap();
    ///
    /// let data = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
    /// assert_eq!(data, "city,population\nBoston,4628910\nConcord,\n");
    /// ```
    pub fn serialize<S: Serialize>(&mut self, record: S) -> Result<()> {
        let wtr = self.wtr.as_mut().ok_or(Error::Closed)?;
        if self.has_headers && !self.header_checked {
            self.rec.clear();
            if serialize(&mut self.rec, &record, true)? {
                wtr.write_record(&self.rec)?;
            }
            self.header_checked = true;
        }
        self.rec.clear();
        serialize(&mut self.rec, &record, false)?;
        wtr.write_record(&self.rec)?;
        Ok(())
    }

    /// Flush the contents of the internal buffer to the underlying writer.
    pub fn flush(&mut self) -> Result<()> {
        match self.record_writer()?.get_mut() {
            None => Err(Error::Closed),
            Some(sink) => Ok(sink.get_mut().flush()?),
        }
    }

    /// Flush and release the underlying writer.
    ///
    /// Every later write, flush or close fails with `Error::Closed`.
    pub fn close(&mut self) -> Result<()> {
        self.record_writer()?.close()?;
        Ok(())
    }

    /// Returns true if `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.wtr.as_ref().map_or(true, |w| w.is_closed())
    }

    /// Returns a reference to the underlying writer, or `None` if this
    /// writer is closed.
    pub fn get_ref(&self) -> Option<&W> {
        self.wtr
            .as_ref()
            .and_then(|w| w.get_ref())
            .map(|sink| sink.get_ref().get_ref())
    }

    /// Flush the internal buffer and return the underlying writer.
    ///
    /// This fails with `Error::Closed` if the writer was closed.
    pub fn into_inner(mut self) -> Result<W> {
        let sink = match self.wtr.take().and_then(|w| w.into_inner()) {
            None => return Err(Error::Closed),
            Some(sink) => sink,
        };
        sink.into_inner().into_inner().map_err(|err| Error::Io(err.into()))
    }
}
