use std::fmt;
use std::iter::FromIterator;
use std::ops::{self, Range};
use std::result;
use std::str;

use bstr::BStr;
use serde::de::Deserialize;

use crate::deserializer::deserialize_byte_record;
use crate::error::{Result, Utf8Error};
use crate::Position;

/// A single CSV record stored as raw bytes.
///
/// A byte record permits reading or writing CSV rows that are not UTF-8.
/// All fields are stored contiguously in one buffer, alongside the end
/// offset of each field, so reusing a record across reads avoids
/// allocation.
///
/// Two records are equal when their fields are equal. Positions are not
/// compared.
#[derive(Clone, Eq)]
pub struct ByteRecord {
    /// All fields in this record, stored contiguously.
    fields: Vec<u8>,
    /// The end offset of each field in `fields`.
    ends: Vec<usize>,
    /// The position of this record in the CSV data it was read from.
    pos: Option<Position>,
}

impl PartialEq for ByteRecord {
    fn eq(&self, other: &ByteRecord) -> bool {
        self.iter().eq(other.iter())
    }
}

impl<T: AsRef<[u8]>> PartialEq<[T]> for ByteRecord {
    fn eq(&self, other: &[T]) -> bool {
        self.iter().eq(other.iter().map(|f| f.as_ref()))
    }
}

impl<'a, T: AsRef<[u8]>> PartialEq<[T]> for &'a ByteRecord {
    fn eq(&self, other: &[T]) -> bool {
        (**self).eq(other)
    }
}

impl<T: AsRef<[u8]>> PartialEq<Vec<T>> for ByteRecord {
    fn eq(&self, other: &Vec<T>) -> bool {
        self.eq(&other[..])
    }
}

impl<'a, T: AsRef<[u8]>> PartialEq<Vec<T>> for &'a ByteRecord {
    fn eq(&self, other: &Vec<T>) -> bool {
        (**self).eq(&other[..])
    }
}

impl fmt::Debug for ByteRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let fields: Vec<&BStr> = self.iter().map(<&BStr>::from).collect();
        write!(f, "ByteRecord({:?})", fields)
    }
}

impl Default for ByteRecord {
    fn default() -> ByteRecord {
        ByteRecord::new()
    }
}

impl ByteRecord {
    /// Create a new empty `ByteRecord`.
    pub fn new() -> ByteRecord {
        ByteRecord::with_capacity(0, 0)
    }

    /// Create a new empty `ByteRecord` with room for `buffer` bytes of
    /// field data and `fields` fields.
    pub fn with_capacity(buffer: usize, fields: usize) -> ByteRecord {
        ByteRecord {
            fields: Vec::with_capacity(buffer),
            ends: Vec::with_capacity(fields),
            pos: None,
        }
    }

    /// Deserialize this record.
    ///
    /// When `headers` is given, structs and maps are filled by matching
    /// header names to field names. Otherwise fields are taken in order.
    ///
    /// # Example
    ///
    /// ```
    /// use serde::Deserialize;
    /// use streamcsv::ByteRecord;
    ///
    /// #[derive(Deserialize)]
    /// struct Row<'a> {
    ///     city: &'a str,
    ///     pop: u64,
    /// }
    ///
    /// let record = ByteRecord::from(vec!["Boston", "4628910"]);
    /// let row: Row = record.deserialize(None).unwrap();
    /// assert_eq!(row.city, "Boston");
    /// assert_eq!(row.pop, 4628910);
    /// ```
    pub fn deserialize<'de, D: Deserialize<'de>>(
        &'de self,
        headers: Option<&'de ByteRecord>,
    ) -> Result<D> {
        deserialize_byte_record(self, headers)
    }

    /// Returns an iterator over all fields in this record.
    pub fn iter(&self) -> ByteRecordIter {
        self.into_iter()
    }

    /// Return the field at index `i`.
    ///
    /// If no field at index `i` exists, then this returns `None`.
    pub fn get(&self, i: usize) -> Option<&[u8]> {
        self.range(i).map(|range| &self.fields[range])
    }

    /// Returns true if and only if this record is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of fields in this record.
    pub fn len(&self) -> usize {
        self.ends.len()
    }

    /// Truncate this record to `n` fields.
    ///
    /// If `n` is greater than the number of fields, this has no effect.
    pub fn truncate(&mut self, n: usize) {
        if n < self.len() {
            let end = if n == 0 { 0 } else { self.ends[n - 1] };
            self.ends.truncate(n);
            self.fields.truncate(end);
        }
    }

    /// Clear this record so that it has zero fields.
    ///
    /// It is not necessary to clear the record to reuse it with a reader.
    pub fn clear(&mut self) {
        self.fields.clear();
        self.ends.clear();
    }

    /// Add a new field to this record.
    pub fn push_field(&mut self, field: &[u8]) {
        self.fields.extend_from_slice(field);
        self.ends.push(self.fields.len());
    }

    /// Return the position of this record, if available.
    ///
    /// Records read by a `Reader` carry the position of their first byte.
    pub fn position(&self) -> Option<&Position> {
        self.pos.as_ref()
    }

    /// Set the position of this record.
    pub fn set_position(&mut self, pos: Option<Position>) {
        self.pos = pos;
    }

    /// Return all fields of this record as a single byte slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.fields
    }

    /// Validate this record as UTF-8.
    pub(crate) fn validate(&self) -> result::Result<(), Utf8Error> {
        // If the entire buffer is ASCII, then we have nothing to fear.
        if self.fields.is_ascii() {
            return Ok(());
        }
        // Otherwise, each field must be checked on its own: two invalid
        // halves can form valid UTF-8 once concatenated.
        for (i, field) in self.iter().enumerate() {
            if let Err(err) = str::from_utf8(field) {
                return Err(Utf8Error::new(i, err.valid_up_to()));
            }
        }
        Ok(())
    }

    /// The storage a `Parser` reads a record into.
    pub(crate) fn as_parts(&mut self) -> (&mut Vec<u8>, &mut Vec<usize>) {
        (&mut self.fields, &mut self.ends)
    }

    fn range(&self, i: usize) -> Option<Range<usize>> {
        let end = *self.ends.get(i)?;
        let start = match i.checked_sub(1) {
            None => 0,
            Some(prev) => self.ends[prev],
        };
        Some(start..end)
    }
}

impl ops::Index<usize> for ByteRecord {
    type Output = [u8];

    #[inline]
    fn index(&self, i: usize) -> &[u8] {
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

impl<T: AsRef<[u8]>> From<Vec<T>> for ByteRecord {
    fn from(xs: Vec<T>) -> ByteRecord {
        ByteRecord::from_iter(&xs)
    }
}

impl<'a, T: AsRef<[u8]>> From<&'a [T]> for ByteRecord {
    fn from(xs: &'a [T]) -> ByteRecord {
        ByteRecord::from_iter(xs)
    }
}

impl<T: AsRef<[u8]>> FromIterator<T> for ByteRecord {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> ByteRecord {
        let mut record = ByteRecord::new();
        record.extend(iter);
        record
    }
}

impl<T: AsRef<[u8]>> Extend<T> for ByteRecord {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for x in iter {
            self.push_field(x.as_ref());
        }
    }
}

impl<'r> IntoIterator for &'r ByteRecord {
    type IntoIter = ByteRecordIter<'r>;
    type Item = &'r [u8];

    fn into_iter(self) -> ByteRecordIter<'r> {
        ByteRecordIter { r: self, i: 0, last_end: 0 }
    }
}

/// An iterator over the fields in a byte record.
///
/// The `'r` lifetime variable refers to the lifetime of the `ByteRecord`
/// that is being iterated over.
#[derive(Clone)]
pub struct ByteRecordIter<'r> {
    r: &'r ByteRecord,
    i: usize,
    last_end: usize,
}

impl<'r> Iterator for ByteRecordIter<'r> {
    type Item = &'r [u8];

    #[inline]
    fn next(&mut self) -> Option<&'r [u8]> {
        let end = *self.r.ends.get(self.i)?;
        let field = &self.r.fields[self.last_end..end];
        self.i += 1;
        self.last_end = end;
        Some(field)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.r.len() - self.i;
        (n, Some(n))
    }
}

impl<'r> ExactSizeIterator for ByteRecordIter<'r> {}

#[cfg(test)]
mod tests {
    use crate::string_record::StringRecord;
    use crate::Position;

    use super::ByteRecord;

    fn b(s: &str) -> &[u8] {
        s.as_bytes()
    }

    #[test]
    fn record_1() {
        let mut rec = ByteRecord::new();
        rec.push_field(b"foo");

        assert_eq!(rec.len(), 1);
        assert_eq!(rec.get(0), Some(b("foo")));
        assert_eq!(rec.get(1), None);
        assert_eq!(rec.get(2), None);
    }

    #[test]
    fn record_2() {
        let mut rec = ByteRecord::new();
        rec.push_field(b"foo");
        rec.push_field(b"quux");

        assert_eq!(rec.len(), 2);
        assert_eq!(rec.get(0), Some(b("foo")));
        assert_eq!(rec.get(1), Some(b("quux")));
        assert_eq!(rec.get(2), None);
        assert_eq!(rec.as_slice(), b"fooquux");
    }

    #[test]
    fn empty_record() {
        let rec = ByteRecord::new();

        assert!(rec.is_empty());
        assert_eq!(rec.get(0), None);
        assert_eq!(rec.iter().count(), 0);
    }

    #[test]
    fn empty_fields() {
        let mut rec = ByteRecord::new();
        rec.push_field(b"foo");
        rec.push_field(b"");
        rec.push_field(b"quux");
        rec.push_field(b"");

        assert_eq!(rec.len(), 4);
        assert_eq!(rec.get(1), Some(b("")));
        assert_eq!(rec.get(3), Some(b("")));
        assert_eq!(rec.get(4), None);
        assert_eq!(rec, vec!["foo", "", "quux", ""]);
    }

    #[test]
    fn truncate_and_clear() {
        let mut rec = ByteRecord::from(vec!["a", "bc", "def"]);
        rec.truncate(5);
        assert_eq!(rec.len(), 3);
        rec.truncate(2);
        assert_eq!(rec, vec!["a", "bc"]);
        rec.push_field(b"g");
        assert_eq!(rec, vec!["a", "bc", "g"]);
        rec.truncate(0);
        assert!(rec.is_empty());
        rec.push_field(b"x");
        rec.clear();
        assert!(rec.is_empty());
        assert_eq!(rec.as_slice(), b"");
    }

    #[test]
    fn equality_ignores_position() {
        let mut a = ByteRecord::from(vec!["x", "y"]);
        let b = ByteRecord::from(vec!["x", "y"]);
        a.set_position(Some(Position::new()));
        assert_eq!(a, b);
        assert_ne!(a, ByteRecord::from(vec!["xy"]));
    }

    #[test]
    fn debug_is_readable() {
        let rec = ByteRecord::from(vec![&b"a"[..], &b"\xFFb"[..]]);
        let got = format!("{:?}", rec);
        assert!(got.starts_with(r#"ByteRecord(["a", ""#), "{}", got);
        assert!(got.ends_with(r#"b"])"#), "{}", got);
    }

    #[test]
    #[should_panic]
    fn index_out_of_bounds() {
        let rec = ByteRecord::from(vec!["a"]);
        let _ = &rec[1];
    }

    #[test]
    fn utf8_error_1() {
        let mut rec = ByteRecord::new();
        rec.push_field(b"foo");
        rec.push_field(b"b\xFFar");

        let err = StringRecord::from_byte_record(rec).unwrap_err();
        assert_eq!(err.utf8_error().field(), 1);
        assert_eq!(err.utf8_error().valid_up_to(), 1);
    }

    #[test]
    fn utf8_error_2() {
        let mut rec = ByteRecord::new();
        rec.push_field(b"\xFF");

        let err = StringRecord::from_byte_record(rec).unwrap_err();
        assert_eq!(err.utf8_error().field(), 0);
        assert_eq!(err.utf8_error().valid_up_to(), 0);
    }

    #[test]
    fn utf8_error_3() {
        let mut rec = ByteRecord::new();
        rec.push_field(b"a");
        rec.push_field(b"b");
        rec.push_field(b"c");
        rec.push_field(b"d");
        rec.push_field(b"xyz\xFF");

        let err = StringRecord::from_byte_record(rec).unwrap_err();
        assert_eq!(err.utf8_error().field(), 4);
        assert_eq!(err.utf8_error().valid_up_to(), 3);
    }

    // A single field on its own isn't valid UTF-8, but the concatenation of
    // all fields is.
    #[test]
    fn utf8_error_split_codepoint() {
        let mut rec = ByteRecord::new();
        rec.push_field(b"a\xc9");
        rec.push_field(b"\x91b");

        let err = StringRecord::from_byte_record(rec).unwrap_err();
        assert_eq!(err.utf8_error().field(), 0);
        assert_eq!(err.utf8_error().valid_up_to(), 1);
    }

    #[test]
    fn utf8_clear_ok() {
        let mut rec = ByteRecord::new();
        rec.push_field(b"\xFF");
        assert!(StringRecord::from_byte_record(rec).is_err());

        let mut rec = ByteRecord::new();
        rec.push_field(b"\xFF");
        rec.clear();
        assert!(StringRecord::from_byte_record(rec).is_ok());
    }
}
