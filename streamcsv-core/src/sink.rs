use std::io;

/// A sink of bytes to write CSV data to.
///
/// This is the only capability a `RecordWriter` needs from its output. Any
/// `std::io::Write` can be used through `IoSink`.
pub trait ByteSink {
    /// Write some prefix of `buf`, returning how many bytes were written.
    ///
    /// Writing fewer bytes than requested is not an error. Callers that need
    /// everything written use `write_all`.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Flush and release the sink.
    ///
    /// The default implementation does nothing.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Write all of `buf` to `sink`, retrying short writes.
///
/// A sink that accepts zero bytes of a non-empty buffer fails with
/// `io::ErrorKind::WriteZero`. Interrupted writes are retried.
pub fn write_all<K: ByteSink + ?Sized>(
    sink: &mut K,
    mut buf: &[u8],
) -> io::Result<()> {
    while !buf.is_empty() {
        match sink.write(buf) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "byte sink accepted no data",
                ));
            }
            Ok(n) => buf = &buf[n..],
            Err(ref err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

impl ByteSink for Vec<u8> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.extend_from_slice(buf);
        Ok(buf.len())
    }
}

impl<'a, K: ByteSink + ?Sized> ByteSink for &'a mut K {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

impl<K: ByteSink + ?Sized> ByteSink for Box<K> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

/// Adapts any `std::io::Write` into a `ByteSink`.
///
/// Closing an `IoSink` flushes the writer.
#[derive(Debug)]
pub struct IoSink<W> {
    wtr: W,
}

impl<W: io::Write> IoSink<W> {
    /// Wrap the given writer.
    pub fn new(wtr: W) -> IoSink<W> {
        IoSink { wtr }
    }
}

impl<W> IoSink<W> {
    /// Returns a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.wtr
    }

    /// Returns a mutable reference to the underlying writer.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.wtr
    }

    /// Unwraps this sink, returning the underlying writer.
    pub fn into_inner(self) -> W {
        self.wtr
    }
}

impl<W: io::Write> ByteSink for IoSink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.wtr.write(buf)
    }

    fn close(&mut self) -> io::Result<()> {
        self.wtr.flush()
    }
}
