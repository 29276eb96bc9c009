use std::cmp;
use std::io;

/// The outcome of asking a byte source for more data.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Fill {
    /// This many bytes were written to the front of the caller's buffer.
    ///
    /// `Bytes(0)` means nothing is available right now. It does *not* mean
    /// the source is exhausted.
    Bytes(usize),
    /// The source has no more data.
    Exhausted,
}

/// A source of bytes to parse CSV data from.
///
/// This is the only capability a `Parser` needs from its input. Any
/// `std::io::Read` can be used through `IoSource`.
///
/// Once a source has reported `Fill::Exhausted`, the parser never asks it
/// for data again.
pub trait ByteSource {
    /// Read up to `buf.len()` bytes into the front of `buf`.
    ///
    /// To read into a buffer at an offset, pass the tail of the buffer.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<Fill>;

    /// Release the source.
    ///
    /// The default implementation does nothing.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> ByteSource for &'a [u8] {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<Fill> {
        if self.is_empty() {
            return Ok(Fill::Exhausted);
        }
        let n = cmp::min(buf.len(), self.len());
        buf[..n].copy_from_slice(&self[..n]);
        *self = &self[n..];
        Ok(Fill::Bytes(n))
    }
}

impl<'a, S: ByteSource + ?Sized> ByteSource for &'a mut S {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<Fill> {
        (**self).read(buf)
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<Fill> {
        (**self).read(buf)
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

/// Adapts any `std::io::Read` into a `ByteSource`.
///
/// A read of zero bytes into a non-empty buffer is taken as exhaustion.
/// Interrupted reads are retried.
#[derive(Debug)]
pub struct IoSource<R> {
    rdr: R,
}

impl<R: io::Read> IoSource<R> {
    /// Wrap the given reader.
    pub fn new(rdr: R) -> IoSource<R> {
        IoSource { rdr }
    }
}

impl<R> IoSource<R> {
    /// Returns a reference to the underlying reader.
    pub fn get_ref(&self) -> &R {
        &self.rdr
    }

    /// Returns a mutable reference to the underlying reader.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.rdr
    }

    /// Unwraps this source, returning the underlying reader.
    pub fn into_inner(self) -> R {
        self.rdr
    }
}

impl<R: io::Read> ByteSource for IoSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<Fill> {
        if buf.is_empty() {
            return Ok(Fill::Bytes(0));
        }
        loop {
            match self.rdr.read(buf) {
                Ok(0) => return Ok(Fill::Exhausted),
                Ok(n) => return Ok(Fill::Bytes(n)),
                Err(ref err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::{ByteSource, Fill, IoSource};

    #[test]
    fn slice_source() {
        let mut src = &b"abcde"[..];
        let mut buf = [0; 3];
        assert_eq!(src.read(&mut buf).unwrap(), Fill::Bytes(3));
        assert_eq!(&buf, b"abc");
        assert_eq!(src.read(&mut buf).unwrap(), Fill::Bytes(2));
        assert_eq!(&buf[..2], b"de");
        assert_eq!(src.read(&mut buf).unwrap(), Fill::Exhausted);
    }

    #[test]
    fn io_source_eof() {
        let mut src = IoSource::new(io::Cursor::new(b"xy".to_vec()));
        let mut buf = [0; 8];
        assert_eq!(src.read(&mut buf).unwrap(), Fill::Bytes(2));
        assert_eq!(src.read(&mut buf).unwrap(), Fill::Exhausted);
        assert_eq!(src.read(&mut []).unwrap(), Fill::Bytes(0));
    }
}
