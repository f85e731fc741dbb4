//! Key and value validation.
//!
//! Every store operation runs these checks before touching its storage, so a
//! rejected call never leaves a partial effect behind.
//!
//! A value is "nil" when it carries nothing at all: it serializes as `None`
//! or as the unit value `()`. Detection goes through a tiny [`Serializer`]
//! that only looks at the outermost shape of the value, so it works with any
//! [`Codec`](crate::codec::Codec) and never allocates.

use crate::error::{Result, StoreError};
use serde::ser::{Impossible, Serialize, Serializer};
use std::fmt;

/// Returns an error if `key` is empty.
pub fn check_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(StoreError::InvalidKey);
    }
    Ok(())
}

/// Returns an error if `value` is nil (`None`, `()` or a newtype around one).
pub fn check_value<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    if let Ok(true) = value.serialize(NilProbe) {
        return Err(StoreError::InvalidValue);
    }
    Ok(())
}

/// Checks the key first, then the value.
pub fn check_key_and_value<T: Serialize + ?Sized>(key: &str, value: &T) -> Result<()> {
    check_key(key)?;
    check_value(value)
}

/// Serializer answering "is this value nil?".
///
/// Compound values bail out with [`NotNil`] as soon as they start, so the
/// probe never walks a whole structure.
struct NilProbe;

#[derive(Debug)]
struct NotNil;

impl fmt::Display for NotNil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("value is not nil")
    }
}

impl std::error::Error for NotNil {}

impl serde::ser::Error for NotNil {
    fn custom<T: fmt::Display>(_msg: T) -> Self {
        NotNil
    }
}

macro_rules! not_nil {
    ($($method:ident($ty:ty)),* $(,)?) => {
        $(
            fn $method(self, _v: $ty) -> Result<bool, NotNil> {
                Ok(false)
            }
        )*
    };
}

impl Serializer for NilProbe {
    type Ok = bool;
    type Error = NotNil;
    type SerializeSeq = Impossible<bool, NotNil>;
    type SerializeTuple = Impossible<bool, NotNil>;
    type SerializeTupleStruct = Impossible<bool, NotNil>;
    type SerializeTupleVariant = Impossible<bool, NotNil>;
    type SerializeMap = Impossible<bool, NotNil>;
    type SerializeStruct = Impossible<bool, NotNil>;
    type SerializeStructVariant = Impossible<bool, NotNil>;

    not_nil!(
        serialize_bool(bool),
        serialize_i8(i8),
        serialize_i16(i16),
        serialize_i32(i32),
        serialize_i64(i64),
        serialize_u8(u8),
        serialize_u16(u16),
        serialize_u32(u32),
        serialize_u64(u64),
        serialize_f32(f32),
        serialize_f64(f64),
        serialize_char(char),
        serialize_str(&str),
        serialize_bytes(&[u8]),
    );

    fn serialize_none(self) -> Result<bool, NotNil> {
        Ok(true)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<bool, NotNil> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<bool, NotNil> {
        Ok(true)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<bool, NotNil> {
        Ok(false)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
    ) -> Result<bool, NotNil> {
        Ok(false)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<bool, NotNil> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<bool, NotNil> {
        Ok(false)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, NotNil> {
        Err(NotNil)
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, NotNil> {
        Err(NotNil)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, NotNil> {
        Err(NotNil)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, NotNil> {
        Err(NotNil)
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, NotNil> {
        Err(NotNil)
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, NotNil> {
        Err(NotNil)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, NotNil> {
        Err(NotNil)
    }
}
