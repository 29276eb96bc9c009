use std::fmt;

use serde::ser::{
    Error as SerdeError, Serialize, SerializeMap, SerializeSeq,
    SerializeStruct, SerializeStructVariant, SerializeTuple,
    SerializeTupleStruct, SerializeTupleVariant, Serializer,
};

use crate::byte_record::ByteRecord;
use crate::error::Error;

/// Serialize `value` as the fields of `rec`.
///
/// If `header` is true, then the serializer will attempt to produce a header
/// row from the member names of a struct. A header row is only produced when
/// `value` itself is a struct, in which case `true` is returned. In all other
/// cases, `rec` holds the fields of `value` and `false` is returned.
pub(crate) fn serialize<S: Serialize + ?Sized>(
    rec: &mut ByteRecord,
    value: &S,
    header: bool,
) -> Result<bool, Error> {
    let mut ser = SeRecord {
        rec,
        header_only: header,
        started: false,
        did_headers: false,
    };
    value.serialize(&mut ser)?;
    Ok(ser.did_headers)
}

struct SeRecord<'w> {
    rec: &'w mut ByteRecord,
    header_only: bool,
    /// Set once the outermost value has begun writing fields.
    started: bool,
    did_headers: bool,
}

impl<'w> SeRecord<'w> {
    fn field<T: AsRef<[u8]>>(&mut self, field: T) -> Result<(), Error> {
        self.started = true;
        self.rec.push_field(field.as_ref());
        Ok(())
    }
}

macro_rules! serialize_int {
    ($method:ident, $ty:ty) => {
        fn $method(self, v: $ty) -> Result<Self::Ok, Self::Error> {
            let mut buf = itoa::Buffer::new();
            self.field(buf.format(v))
        }
    };
}

macro_rules! serialize_float {
    ($method:ident, $ty:ty) => {
        fn $method(self, v: $ty) -> Result<Self::Ok, Self::Error> {
            let mut buf = ryu::Buffer::new();
            self.field(buf.format(v))
        }
    };
}

impl<'a, 'w> Serializer for &'a mut SeRecord<'w> {
    type Ok = ();
    type Error = Error;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    fn serialize_bool(self, v: bool) -> Result<Self::Ok, Self::Error> {
        if v {
            self.field("true")
        } else {
            self.field("false")
        }
    }

    serialize_int!(serialize_i8, i8);
    serialize_int!(serialize_i16, i16);
    serialize_int!(serialize_i32, i32);
    serialize_int!(serialize_i64, i64);
    serialize_int!(serialize_u8, u8);
    serialize_int!(serialize_u16, u16);
    serialize_int!(serialize_u32, u32);
    serialize_int!(serialize_u64, u64);
    serialize_float!(serialize_f32, f32);
    serialize_float!(serialize_f64, f64);

    fn serialize_char(self, v: char) -> Result<Self::Ok, Self::Error> {
        self.field(v.encode_utf8(&mut [0; 4]))
    }

    fn serialize_str(self, value: &str) -> Result<Self::Ok, Self::Error> {
        self.field(value)
    }

    fn serialize_bytes(self, value: &[u8]) -> Result<Self::Ok, Self::Error> {
        self.field(value)
    }

    fn serialize_none(self) -> Result<Self::Ok, Self::Error> {
        self.field(&[])
    }

    fn serialize_some<T: ?Sized + Serialize>(
        self,
        value: &T,
    ) -> Result<Self::Ok, Self::Error> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Self::Ok, Self::Error> {
        None::<()>.serialize(self)
    }

    fn serialize_unit_struct(
        self,
        name: &'static str,
    ) -> Result<Self::Ok, Self::Error> {
        self.field(name)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Self::Ok, Self::Error> {
        self.field(variant)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error> {
        value.serialize(self)
    }

    fn serialize_seq(
        self,
        _len: Option<usize>,
    ) -> Result<Self::SerializeSeq, Self::Error> {
        self.started = true;
        Ok(self)
    }

    fn serialize_tuple(
        self,
        _len: usize,
    ) -> Result<Self::SerializeTuple, Self::Error> {
        self.started = true;
        Ok(self)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, Self::Error> {
        self.started = true;
        Ok(self)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, Self::Error> {
        Err(Error::custom("serializing enum tuple variants is not supported"))
    }

    fn serialize_map(
        self,
        _len: Option<usize>,
    ) -> Result<Self::SerializeMap, Self::Error> {
        // Neither the order nor the header row of a map is fixed.
        Err(Error::custom("serializing maps is not supported"))
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, Self::Error> {
        // Only the outermost struct names the columns.
        if self.header_only && !self.started {
            self.did_headers = true;
        }
        self.started = true;
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, Self::Error> {
        Err(Error::custom("serializing enum struct variants is not supported"))
    }
}

impl<'a, 'w> SerializeSeq for &'a mut SeRecord<'w> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(
        &mut self,
        value: &T,
    ) -> Result<(), Self::Error> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(())
    }
}

impl<'a, 'w> SerializeTuple for &'a mut SeRecord<'w> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(
        &mut self,
        value: &T,
    ) -> Result<(), Self::Error> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(())
    }
}

impl<'a, 'w> SerializeTupleStruct for &'a mut SeRecord<'w> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        value: &T,
    ) -> Result<(), Self::Error> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(())
    }
}

// Never constructed: `serialize_tuple_variant` fails first.
impl<'a, 'w> SerializeTupleVariant for &'a mut SeRecord<'w> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        _value: &T,
    ) -> Result<(), Self::Error> {
        Err(Error::custom("serializing enum tuple variants is not supported"))
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Err(Error::custom("serializing enum tuple variants is not supported"))
    }
}

// Never constructed: `serialize_map` fails first.
impl<'a, 'w> SerializeMap for &'a mut SeRecord<'w> {
    type Ok = ();
    type Error = Error;

    fn serialize_key<T: ?Sized + Serialize>(
        &mut self,
        _key: &T,
    ) -> Result<(), Self::Error> {
        Err(Error::custom("serializing maps is not supported"))
    }

    fn serialize_value<T: ?Sized + Serialize>(
        &mut self,
        _value: &T,
    ) -> Result<(), Self::Error> {
        Err(Error::custom("serializing maps is not supported"))
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Err(Error::custom("serializing maps is not supported"))
    }
}

impl<'a, 'w> SerializeStruct for &'a mut SeRecord<'w> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), Self::Error> {
        if self.did_headers {
            key.serialize(&mut **self)
        } else {
            value.serialize(&mut **self)
        }
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(())
    }
}

// Never constructed: `serialize_struct_variant` fails first.
impl<'a, 'w> SerializeStructVariant for &'a mut SeRecord<'w> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        _key: &'static str,
        _value: &T,
    ) -> Result<(), Self::Error> {
        Err(Error::custom("serializing enum struct variants is not supported"))
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Err(Error::custom("serializing enum struct variants is not supported"))
    }
}

impl SerdeError for Error {
    fn custom<T: fmt::Display>(msg: T) -> Error {
        Error::Serialize(msg.to_string())
    }
}
