use std::error::Error as StdError;
use std::fmt;
use std::iter;
use std::num;
use std::str;

use serde::de::value::{BorrowedBytesDeserializer, BorrowedStrDeserializer};
use serde::de::{
    Deserialize, DeserializeSeed, Deserializer, EnumAccess,
    Error as SerdeError, MapAccess, SeqAccess, Unexpected, VariantAccess,
    Visitor,
};

use crate::byte_record::{ByteRecord, ByteRecordIter};
use crate::error::Error;

use self::DeserializeErrorKind as DEK;

/// Deserialize `record` into `D`, matching fields to struct members by
/// `headers` when given.
pub(crate) fn deserialize_byte_record<'de, D: Deserialize<'de>>(
    record: &'de ByteRecord,
    headers: Option<&'de ByteRecord>,
) -> Result<D, Error> {
    let mut deser = DeRecord::new(record, headers);
    D::deserialize(&mut deser).map_err(|err| Error::Deserialize {
        pos: record.position().cloned(),
        err,
    })
}

struct DeRecord<'r> {
    it: iter::Peekable<ByteRecordIter<'r>>,
    headers: Option<ByteRecordIter<'r>>,
    field: u64,
}

impl<'r> DeRecord<'r> {
    fn new(
        rec: &'r ByteRecord,
        headers: Option<&'r ByteRecord>,
    ) -> DeRecord<'r> {
        DeRecord {
            it: rec.iter().peekable(),
            headers: headers.map(|r| r.iter()),
            field: 0,
        }
    }

    /// Returns an error corresponding to the most recently extracted field.
    fn error(&self, kind: DeserializeErrorKind) -> DeserializeError {
        DeserializeError { field: Some(self.field.saturating_sub(1)), kind }
    }

    /// Returns an arbitrary catch-all error for the most recently extracted
    /// field.
    fn message(&self, msg: String) -> DeserializeError {
        self.error(DEK::Message(msg))
    }

    #[inline(always)]
    fn next_field_bytes(&mut self) -> Result<&'r [u8], DeserializeError> {
        match self.it.next() {
            Some(field) => {
                self.field += 1;
                Ok(field)
            }
            None => Err(DeserializeError {
                field: None,
                kind: DEK::UnexpectedEndOfRow,
            }),
        }
    }

    /// Extracts the next field as a string. Fields are checked for UTF-8
    /// only when they are asked for as strings.
    #[inline(always)]
    fn next_field(&mut self) -> Result<&'r str, DeserializeError> {
        let bytes = self.next_field_bytes()?;
        str::from_utf8(bytes).map_err(|err| self.error(DEK::InvalidUtf8(err)))
    }

    fn peek_field(&mut self) -> Option<&'r [u8]> {
        self.it.peek().cloned()
    }
}

macro_rules! deserialize_int {
    ($method:ident, $visit:ident) => {
        fn $method<V: Visitor<'de>>(
            self,
            visitor: V,
        ) -> Result<V::Value, Self::Error> {
            let field = self.next_field()?;
            let n =
                field.parse().map_err(|err| self.error(DEK::ParseInt(err)))?;
            visitor.$visit(n)
        }
    };
}

macro_rules! deserialize_float {
    ($method:ident, $visit:ident) => {
        fn $method<V: Visitor<'de>>(
            self,
            visitor: V,
        ) -> Result<V::Value, Self::Error> {
            let field = self.next_field()?;
            let n =
                field.parse().map_err(|err| self.error(DEK::ParseFloat(err)))?;
            visitor.$visit(n)
        }
    };
}

impl<'a, 'de: 'a> Deserializer<'de> for &'a mut DeRecord<'de> {
    type Error = DeserializeError;

    fn deserialize_any<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        let bytes = self.next_field_bytes()?;
        let x = match str::from_utf8(bytes) {
            Ok(x) => x,
            Err(_) => return visitor.visit_borrowed_bytes(bytes),
        };
        if x == "true" {
            visitor.visit_bool(true)
        } else if x == "false" {
            visitor.visit_bool(false)
        } else if is_positive_integer(bytes) {
            let n: u64 = x.parse().map_err(|e| self.error(DEK::ParseInt(e)))?;
            visitor.visit_u64(n)
        } else if is_negative_integer(bytes) {
            let n: i64 = x.parse().map_err(|e| self.error(DEK::ParseInt(e)))?;
            visitor.visit_i64(n)
        } else if let Some(n) = try_float(x) {
            visitor.visit_f64(n)
        } else {
            visitor.visit_borrowed_str(x)
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        let field = self.next_field()?;
        let b = field.parse().map_err(|err| self.error(DEK::ParseBool(err)))?;
        visitor.visit_bool(b)
    }

    deserialize_int!(deserialize_u8, visit_u8);
    deserialize_int!(deserialize_u16, visit_u16);
    deserialize_int!(deserialize_u32, visit_u32);
    deserialize_int!(deserialize_u64, visit_u64);
    deserialize_int!(deserialize_i8, visit_i8);
    deserialize_int!(deserialize_i16, visit_i16);
    deserialize_int!(deserialize_i32, visit_i32);
    deserialize_int!(deserialize_i64, visit_i64);
    deserialize_float!(deserialize_f32, visit_f32);
    deserialize_float!(deserialize_f64, visit_f64);

    fn deserialize_char<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        let field = self.next_field()?;
        let mut chars = field.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => visitor.visit_char(c),
            _ => Err(self.message(format!(
                "expected single character but got {} characters in '{}'",
                field.chars().count(),
                field
            ))),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.next_field().and_then(|f| visitor.visit_borrowed_str(f))
    }

    fn deserialize_string<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.next_field().and_then(|f| visitor.visit_str(f))
    }

    fn deserialize_bytes<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.next_field_bytes().and_then(|f| visitor.visit_borrowed_bytes(f))
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.next_field_bytes()
            .and_then(|f| visitor.visit_byte_buf(f.to_vec()))
    }

    fn deserialize_option<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        match self.peek_field() {
            None => visitor.visit_none(),
            Some(f) if f.is_empty() => {
                self.next_field_bytes()?;
                visitor.visit_none()
            }
            Some(_) => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_seq(self)
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_seq(self)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_seq(self)
    }

    fn deserialize_map<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        if self.headers.is_none() {
            visitor.visit_seq(self)
        } else {
            visitor.visit_map(self)
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        if self.headers.is_none() {
            visitor.visit_seq(self)
        } else {
            visitor.visit_map(self)
        }
    }

    fn deserialize_identifier<V: Visitor<'de>>(
        self,
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        Err(self.error(DEK::Unsupported("deserialize_identifier".into())))
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_enum(self)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        // Reached for a header with no matching struct member.
        self.next_field_bytes()?;
        visitor.visit_unit()
    }
}

impl<'a, 'de: 'a> EnumAccess<'de> for &'a mut DeRecord<'de> {
    type Error = DeserializeError;
    type Variant = Self;

    fn variant_seed<V: DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> Result<(V::Value, Self::Variant), Self::Error> {
        let variant_name = self.next_field()?;
        seed.deserialize(BorrowedStrDeserializer::new(variant_name))
            .map(|v| (v, self))
    }
}

impl<'a, 'de: 'a> VariantAccess<'de> for &'a mut DeRecord<'de> {
    type Error = DeserializeError;

    fn unit_variant(self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(
        self,
        _seed: T,
    ) -> Result<T::Value, Self::Error> {
        let unexp = Unexpected::UnitVariant;
        Err(DeserializeError::invalid_type(unexp, &"newtype variant"))
    }

    fn tuple_variant<V: Visitor<'de>>(
        self,
        _len: usize,
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        let unexp = Unexpected::UnitVariant;
        Err(DeserializeError::invalid_type(unexp, &"tuple variant"))
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        let unexp = Unexpected::UnitVariant;
        Err(DeserializeError::invalid_type(unexp, &"struct variant"))
    }
}

impl<'a, 'de: 'a> SeqAccess<'de> for &'a mut DeRecord<'de> {
    type Error = DeserializeError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, Self::Error> {
        if self.peek_field().is_none() {
            Ok(None)
        } else {
            seed.deserialize(&mut **self).map(Some)
        }
    }
}

impl<'a, 'de: 'a> MapAccess<'de> for &'a mut DeRecord<'de> {
    type Error = DeserializeError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, Self::Error> {
        let header = match self.headers.as_mut().and_then(|it| it.next()) {
            None => return Ok(None),
            Some(header) => header,
        };
        match str::from_utf8(header) {
            Ok(name) => seed.deserialize(BorrowedStrDeserializer::new(name)),
            Err(_) => seed.deserialize(BorrowedBytesDeserializer::new(header)),
        }
        .map(Some)
    }

    fn next_value_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<K::Value, Self::Error> {
        seed.deserialize(&mut **self)
    }
}

/// An error that occurs while deserializing a single record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeserializeError {
    field: Option<u64>,
    kind: DeserializeErrorKind,
}

/// The type of a deserialization error.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DeserializeErrorKind {
    /// A generic serde deserialization error.
    Message(String),
    /// A generic serde error for unsupported methods.
    Unsupported(String),
    /// This error occurs when a Rust type expects to decode another field
    /// from a row, but no more fields exist.
    UnexpectedEndOfRow,
    /// This error occurs when a field that is read as a string is not valid
    /// UTF-8.
    InvalidUtf8(str::Utf8Error),
    /// This error occurs when a boolean value fails to parse.
    ParseBool(str::ParseBoolError),
    /// This error occurs when an integer value fails to parse.
    ParseInt(num::ParseIntError),
    /// This error occurs when a float value fails to parse.
    ParseFloat(num::ParseFloatError),
}

impl SerdeError for DeserializeError {
    fn custom<T: fmt::Display>(msg: T) -> DeserializeError {
        DeserializeError { field: None, kind: DEK::Message(msg.to_string()) }
    }
}

impl StdError for DeserializeError {}

impl fmt::Display for DeserializeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(field) = self.field {
            write!(f, "field {}: {}", field, self.kind)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

impl fmt::Display for DeserializeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            DEK::Message(ref msg) => write!(f, "{}", msg),
            DEK::Unsupported(ref which) => {
                write!(f, "unsupported deserializer method: {}", which)
            }
            DEK::UnexpectedEndOfRow => {
                write!(f, "expected field, but got end of row")
            }
            DEK::InvalidUtf8(ref err) => write!(f, "{}", err),
            DEK::ParseBool(ref err) => write!(f, "{}", err),
            DEK::ParseInt(ref err) => write!(f, "{}", err),
            DEK::ParseFloat(ref err) => write!(f, "{}", err),
        }
    }
}

impl DeserializeError {
    /// Return the field index (starting at 0) of this error, if available.
    pub fn field(&self) -> Option<u64> {
        self.field
    }

    /// Return the underlying error kind.
    pub fn kind(&self) -> &DeserializeErrorKind {
        &self.kind
    }
}

fn is_positive_integer(bs: &[u8]) -> bool {
    !bs.is_empty() && bs.iter().all(|&b| b'0' <= b && b <= b'9')
}

fn is_negative_integer(bs: &[u8]) -> bool {
    bs.len() > 1 && bs[0] == b'-' && is_positive_integer(&bs[1..])
}

fn try_float(s: &str) -> Option<f64> {
    s.parse().ok()
}
