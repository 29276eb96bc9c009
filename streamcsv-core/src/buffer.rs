use std::cmp;
use std::fmt;
use std::io;

use log::{debug, trace};

use crate::error::{Error, Result};
use crate::source::{ByteSource, Fill};

/// The default capacity, in bytes, of a `Buffer`.
pub const DEFAULT_BUFFER_CAPACITY: usize = 64 * 1024;

/// A fixed size, refillable buffer over a `ByteSource`.
///
/// The buffer holds a window of unread bytes, `[pos, end)`. When the window
/// is empty, `refill` pulls more bytes from the source into the front of the
/// buffer.
///
/// End of input is sticky: once the source reports exhaustion, the buffer
/// never asks it for data again.
///
/// A buffer is itself a `ByteSource` (and an `io::Read`). Reading from it
/// drains any bytes that were read ahead before pulling fresh ones from the
/// source, so the rest of a stream can be handed to another consumer
/// without losing data. Bytes read this way still count toward `byte` and
/// `line`.
pub struct Buffer<S> {
    /// The source. `None` once the buffer is closed.
    src: Option<S>,
    buf: Vec<u8>,
    pos: usize,
    end: usize,
    /// Set when the source reports exhaustion.
    eof: bool,
    /// The number of bytes consumed so far.
    byte: u64,
    /// The number of `\n` bytes consumed so far, plus one.
    line: u64,
}

impl<S: ByteSource> Buffer<S> {
    /// Create a buffer with the default capacity.
    pub fn new(src: S) -> Buffer<S> {
        Buffer::with_capacity(DEFAULT_BUFFER_CAPACITY, src)
    }

    /// Create a buffer with the given capacity.
    ///
    /// A capacity of `0` is bumped to `1`.
    pub fn with_capacity(capacity: usize, src: S) -> Buffer<S> {
        Buffer {
            src: Some(src),
            buf: vec![0; cmp::max(1, capacity)],
            pos: 0,
            end: 0,
            eof: false,
            byte: 0,
            line: 1,
        }
    }

    /// Make sure the window holds at least one unread byte.
    ///
    /// This is a no-op if the window is non-empty. Otherwise, the window is
    /// reset to the front of the buffer and filled from the source.
    ///
    /// Returns `false` when the source is exhausted. A source reporting
    /// that nothing is available right now is asked again.
    pub fn refill(&mut self) -> Result<bool> {
        let src = match self.src {
            None => return Err(Error::Closed),
            Some(ref mut src) => src,
        };
        if self.pos < self.end {
            return Ok(true);
        }
        if self.eof {
            return Ok(false);
        }
        self.pos = 0;
        self.end = 0;
        loop {
            match src.read(&mut self.buf)? {
                Fill::Exhausted => {
                    debug!("byte source exhausted after {} bytes", self.byte);
                    self.eof = true;
                    return Ok(false);
                }
                Fill::Bytes(0) => continue,
                Fill::Bytes(n) => {
                    trace!("refilled {} bytes", n);
                    self.end = cmp::min(n, self.buf.len());
                    return Ok(true);
                }
            }
        }
    }

    /// Returns the next unread byte without consuming it, refilling if
    /// necessary. `None` means the source is exhausted.
    pub fn peek(&mut self) -> Result<Option<u8>> {
        if self.refill()? {
            Ok(Some(self.buf[self.pos]))
        } else {
            Ok(None)
        }
    }

    /// Release the source.
    ///
    /// Any unread bytes are discarded. Every later operation on this buffer
    /// fails with `Error::Closed`.
    pub fn close(&mut self) -> Result<()> {
        match self.src.take() {
            None => Err(Error::Closed),
            Some(mut src) => {
                debug!("closing byte source after {} bytes", self.byte);
                self.pos = 0;
                self.end = 0;
                src.close()?;
                Ok(())
            }
        }
    }
}

impl<S> Buffer<S> {
    /// The unread bytes currently in the buffer.
    #[inline]
    pub fn window(&self) -> &[u8] {
        &self.buf[self.pos..self.end]
    }

    /// Mark the first `n` bytes of the window as read.
    ///
    /// # Panics
    ///
    /// When `n` exceeds the length of the window.
    #[inline]
    pub fn consume(&mut self, n: usize) {
        assert!(n <= self.end - self.pos);
        let consumed = &self.buf[self.pos..self.pos + n];
        self.line += memchr::memchr_iter(b'\n', consumed).count() as u64;
        self.byte += n as u64;
        self.pos += n;
    }

    /// The capacity of this buffer.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// The number of bytes consumed so far.
    pub fn byte(&self) -> u64 {
        self.byte
    }

    /// One more than the number of `\n` bytes consumed so far.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Returns true when the source is exhausted and every buffered byte
    /// has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.eof && self.pos == self.end
    }

    /// Returns true if `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.src.is_none()
    }

    /// Returns a reference to the source, or `None` if this buffer is
    /// closed.
    pub fn get_ref(&self) -> Option<&S> {
        self.src.as_ref()
    }

    /// Returns a mutable reference to the source, or `None` if this buffer
    /// is closed.
    ///
    /// Reading from the source directly skips any bytes held in this
    /// buffer.
    pub fn get_mut(&mut self) -> Option<&mut S> {
        self.src.as_mut()
    }
}

impl<S: ByteSource> ByteSource for Buffer<S> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<Fill> {
        if self.src.is_none() {
            return Err(Error::Closed.into());
        }
        if self.pos < self.end {
            let n = cmp::min(out.len(), self.end - self.pos);
            out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
            self.consume(n);
            return Ok(Fill::Bytes(n));
        }
        if self.eof {
            return Ok(Fill::Exhausted);
        }
        let res = match self.src {
            None => return Err(Error::Closed.into()),
            Some(ref mut src) => src.read(out)?,
        };
        match res {
            Fill::Exhausted => self.eof = true,
            Fill::Bytes(n) => {
                let passed = &out[..n];
                self.line += memchr::memchr_iter(b'\n', passed).count() as u64;
                self.byte += n as u64;
            }
        }
        Ok(res)
    }

    fn close(&mut self) -> io::Result<()> {
        Buffer::close(self).map_err(io::Error::from)
    }
}

impl<S: ByteSource> io::Read for Buffer<S> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        loop {
            match ByteSource::read(self, out)? {
                Fill::Exhausted => return Ok(0),
                Fill::Bytes(0) => continue,
                Fill::Bytes(n) => return Ok(n),
            }
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for Buffer<S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("src", &self.src)
            .field("window", &(self.pos, self.end))
            .field("capacity", &self.buf.len())
            .field("eof", &self.eof)
            .finish()
    }
}
