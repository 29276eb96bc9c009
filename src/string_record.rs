use std::fmt;
use std::io;
use std::iter::FromIterator;
use std::ops;
use std::result;
use std::str;

use serde::de::Deserialize;

use crate::byte_record::{ByteRecord, ByteRecordIter};
use crate::error::{Error, FromUtf8Error, Result};
use crate::reader::Reader;
use crate::Position;

/// Read the next record of `rdr` into `record`, checking it for UTF-8.
///
/// A record that fails the check is cleared before the error is returned,
/// so a `StringRecord` never holds invalid UTF-8.
pub(crate) fn read<R: io::Read>(
    rdr: &mut Reader<R>,
    record: &mut StringRecord,
) -> Result<bool> {
    let read = rdr.read_byte_record(&mut record.0);
    let utf8 = match record.0.validate() {
        Ok(()) => Ok(()),
        Err(err) => {
            record.0.clear();
            Err(err)
        }
    };
    match (read, utf8) {
        (Err(err), _) => Err(err),
        (Ok(_), Err(err)) => {
            Err(Error::Utf8 { pos: record.0.position().cloned(), err })
        }
        (Ok(more), Ok(())) => Ok(more),
    }
}

/// A single CSV record stored as valid UTF-8 bytes.
#[derive(Clone, Eq)]
pub struct StringRecord(ByteRecord);

impl PartialEq for StringRecord {
    fn eq(&self, other: &StringRecord) -> bool {
        self.0 == other.0
    }
}

impl<T: AsRef<[u8]>> PartialEq<[T]> for StringRecord {
    fn eq(&self, other: &[T]) -> bool {
        self.0.eq(other)
    }
}

impl<T: AsRef<[u8]>> PartialEq<Vec<T>> for StringRecord {
    fn eq(&self, other: &Vec<T>) -> bool {
        self.0.eq(&other[..])
    }
}

impl<'a, T: AsRef<[u8]>> PartialEq<[T]> for &'a StringRecord {
    fn eq(&self, other: &[T]) -> bool {
        self.0.eq(other)
    }
}

impl<'a, T: AsRef<[u8]>> PartialEq<Vec<T>> for &'a StringRecord {
    fn eq(&self, other: &Vec<T>) -> bool {
        self.0.eq(&other[..])
    }
}

impl fmt::Debug for StringRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let fields: Vec<&str> = self.iter().collect();
        write!(f, "StringRecord({:?})", fields)
    }
}

impl Default for StringRecord {
    fn default() -> StringRecord {
        StringRecord::new()
    }
}

impl StringRecord {
    /// Create a new empty `StringRecord`.
    pub fn new() -> StringRecord {
        StringRecord(ByteRecord::new())
    }

    /// Create a new empty `StringRecord` with room for `buffer` bytes of
    /// field data and `fields` fields.
    pub fn with_capacity(buffer: usize, fields: usize) -> StringRecord {
        StringRecord(ByteRecord::with_capacity(buffer, fields))
    }

    /// Create a new `StringRecord` from a `ByteRecord`.
    ///
    /// If the given `ByteRecord` does not contain valid UTF-8, then this
    /// returns an error holding the UTF-8 error and the original record.
    pub fn from_byte_record(
        record: ByteRecord,
    ) -> result::Result<StringRecord, FromUtf8Error> {
        match record.validate() {
            Ok(()) => Ok(StringRecord(record)),
            Err(err) => Err(FromUtf8Error::new(record, err)),
        }
    }

    /// Deserialize this record.
    ///
    /// See `ByteRecord::deserialize`.
    pub fn deserialize<'de, D: Deserialize<'de>>(
        &'de self,
        headers: Option<&'de StringRecord>,
    ) -> Result<D> {
        self.0.deserialize(headers.map(|r| &r.0))
    }

    /// Returns an iterator over all fields in this record.
    pub fn iter(&self) -> StringRecordIter {
        self.into_iter()
    }

    /// Return the field at index `i`.
    ///
    /// If no field at index `i` exists, then this returns `None`.
    pub fn get(&self, i: usize) -> Option<&str> {
        self.0.get(i).map(|bytes| {
            // Every field of a string record is valid UTF-8: records are
            // validated field by field on construction and on every read.
            unsafe { str::from_utf8_unchecked(bytes) }
        })
    }

    /// Returns true if and only if this record is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of fields in this record.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Truncate this record to `n` fields.
    pub fn truncate(&mut self, n: usize) {
        self.0.truncate(n);
    }

    /// Clear this record so that it has zero fields.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Add a new field to this record.
    pub fn push_field(&mut self, field: &str) {
        self.0.push_field(field.as_bytes());
    }

    /// Return the position of this record, if available.
    pub fn position(&self) -> Option<&Position> {
        self.0.position()
    }

    /// Set the position of this record.
    pub fn set_position(&mut self, pos: Option<Position>) {
        self.0.set_position(pos);
    }

    /// Return all fields of this record as a single string slice.
    pub fn as_slice(&self) -> &str {
        // See `get`.
        unsafe { str::from_utf8_unchecked(self.0.as_slice()) }
    }

    /// Return a reference to this record as a byte record.
    pub fn as_byte_record(&self) -> &ByteRecord {
        &self.0
    }

    /// Convert this `StringRecord` into a `ByteRecord`.
    pub fn into_byte_record(self) -> ByteRecord {
        self.0
    }
}

impl ops::Index<usize> for StringRecord {
    type Output = str;

    #[inline]
    fn index(&self, i: usize) -> &str {
        match self.get(i) {
            Some(field) => field,
            None => panic!(
                "index out of bounds: the record has {} fields but the \
                 index is {}",
                self.len(),
                i
            ),
        }
    }
}

impl<T: AsRef<str>> From<Vec<T>> for StringRecord {
    fn from(xs: Vec<T>) -> StringRecord {
        StringRecord::from_iter(&xs)
    }
}

impl<'a, T: AsRef<str>> From<&'a [T]> for StringRecord {
    fn from(xs: &'a [T]) -> StringRecord {
        StringRecord::from_iter(xs)
    }
}

impl<T: AsRef<str>> FromIterator<T> for StringRecord {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> StringRecord {
        let mut record = StringRecord::new();
        record.extend(iter);
        record
    }
}

impl<T: AsRef<str>> Extend<T> for StringRecord {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for x in iter {
            self.push_field(x.as_ref());
        }
    }
}

impl<'r> IntoIterator for &'r StringRecord {
    type IntoIter = StringRecordIter<'r>;
    type Item = &'r str;

    fn into_iter(self) -> StringRecordIter<'r> {
        StringRecordIter(self.0.iter())
    }
}

/// An iterator over the fields in a string record.
#[derive(Clone)]
pub struct StringRecordIter<'r>(ByteRecordIter<'r>);

impl<'r> Iterator for StringRecordIter<'r> {
    type Item = &'r str;

    #[inline]
    fn next(&mut self) -> Option<&'r str> {
        self.0.next().map(|bytes| {
            // See `StringRecord::get`.
            unsafe { str::from_utf8_unchecked(bytes) }
        })
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<'r> ExactSizeIterator for StringRecordIter<'r> {}
