//! Conversion of native values into XML-RPC values via serde.

#![allow(missing_debug_implementations)]   // mostly useless for all the serializers in here

use crate::error::EncodeError;
use crate::utils::format_datetime;
use crate::value::Members;
use crate::Value;

use serde::ser::{self, Error as _Error, Serialize};

use std::fmt::Display;
use std::iter;

/// Name of the newtype struct `Value::DateTime` serializes as, so that `to_value` can tell
/// timestamps apart from ordinary strings.
const DATETIME_TOKEN: &str = "$xmlrpc_codec::DateTime";

impl ser::Error for EncodeError {
    fn custom<T>(msg: T) -> Self where T: Display {
        EncodeError::Custom(msg.to_string())
    }
}

fn unsupported<T, S: Into<String>>(what: S) -> Result<T> {
    Err(EncodeError::UnsupportedType(what.into()))
}

fn key_must_be_string<T>() -> Result<T> {
    unsupported("a struct member name that is not a string")
}

impl ser::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error> where
        S: ser::Serializer {

        match *self {
            Value::Int(i) => serializer.serialize_i32(i),
            Value::Bool(b) => serializer.serialize_bool(b),
            Value::String(ref s) => serializer.serialize_str(s),
            Value::DateTime(ref date_time) => {
                let text = format_datetime(date_time).map_err(S::Error::custom)?;
                serializer.serialize_newtype_struct(DATETIME_TOKEN, &text)
            }
            Value::Struct(ref members) => serializer.collect_map(members),
            Value::Array(ref values) => serializer.collect_seq(values),
        }
    }
}

pub type Result<T> = ::std::result::Result<T, EncodeError>;

/// Converts a native value into a `Value`.
///
/// The mapping is fixed: booleans become `<boolean>`, integers that fit into 32 bits become
/// `<int>`, characters and strings become `<string>`, sequences and tuples become `<array>`,
/// maps and structs with string keys become `<struct>`, `Some(x)` is encoded like `x`, and unit
/// enum variants are encoded as their name. Newtype, tuple and struct variants turn into a
/// single-member `<struct>` keyed by the variant name. `Value`s, timestamps included, are
/// passed through unchanged.
///
/// # Errors
///
/// Anything else (floats, byte buffers, `None`, `()`, integers outside the 32-bit range, maps
/// with non-string keys) has no XML-RPC representation here and fails with
/// `EncodeError::UnsupportedType` instead of being turned into a string.
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    value.serialize(Serializer)
}

/// A serializer that produces a `Value`.
pub(crate) struct Serializer;

impl ser::Serializer for Serializer {
    type Ok = Value;
    type Error = EncodeError;
    type SerializeSeq = SerializeArray;
    type SerializeTuple = Self::SerializeSeq;
    type SerializeTupleStruct = Self::SerializeSeq;
    type SerializeTupleVariant = SerializeTupleVariant;
    type SerializeMap = SerializeMap;
    type SerializeStruct = Self::SerializeMap;
    type SerializeStructVariant = SerializeStructVariant;

    fn serialize_bool(self, v: bool) -> Result<Self::Ok> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Self::Ok> {
        self.serialize_i32(v.into())
    }

    fn serialize_i16(self, v: i16) -> Result<Self::Ok> {
        self.serialize_i32(v.into())
    }

    fn serialize_i32(self, v: i32) -> Result<Self::Ok> {
        Ok(Value::Int(v))
    }

    fn serialize_i64(self, v: i64) -> Result<Self::Ok> {
        match i32::try_from(v) {
            Ok(v) => Ok(Value::Int(v)),
            Err(_) => unsupported(format!("integer {} (outside the 32-bit range of <int>)", v)),
        }
    }

    fn serialize_u8(self, v: u8) -> Result<Self::Ok> {
        self.serialize_i32(v.into())
    }

    fn serialize_u16(self, v: u16) -> Result<Self::Ok> {
        self.serialize_i32(v.into())
    }

    fn serialize_u32(self, v: u32) -> Result<Self::Ok> {
        self.serialize_i64(v.into())
    }

    fn serialize_u64(self, v: u64) -> Result<Self::Ok> {
        match i32::try_from(v) {
            Ok(v) => Ok(Value::Int(v)),
            Err(_) => unsupported(format!("integer {} (outside the 32-bit range of <int>)", v)),
        }
    }

    fn serialize_f32(self, _v: f32) -> Result<Self::Ok> {
        unsupported("a floating-point number")
    }

    fn serialize_f64(self, _v: f64) -> Result<Self::Ok> {
        unsupported("a floating-point number")
    }

    fn serialize_char(self, v: char) -> Result<Self::Ok> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Self::Ok> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<Self::Ok> {
        unsupported("a byte buffer")
    }

    fn serialize_none(self) -> Result<Self::Ok> {
        unsupported("a missing value (None)")
    }

    fn serialize_some<T: ?Sized>(self, value: &T) -> Result<Self::Ok> where
        T: Serialize {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Self::Ok> {
        unsupported("a unit value")
    }

    fn serialize_unit_struct(self, name: &str) -> Result<Self::Ok> {
        unsupported(format!("unit struct {}", name))
    }

    fn serialize_unit_variant(self, _name: &str, _variant_index: u32, variant: &str) -> Result<Self::Ok> {
        self.serialize_str(variant)
    }

    fn serialize_newtype_struct<T: ?Sized>(self, name: &str, value: &T) -> Result<Self::Ok> where
        T: Serialize {
        let inner = value.serialize(self)?;
        if name != DATETIME_TOKEN {
            return Ok(inner);
        }

        match inner {
            Value::String(ref text) => match iso8601::datetime(text) {
                Ok(date_time) => Ok(Value::from(date_time)),
                Err(_) => Err(EncodeError::custom(format!("invalid timestamp '{}'", text))),
            },
            other => Err(EncodeError::custom(format!("invalid timestamp {:?}", other))),
        }
    }

    fn serialize_newtype_variant<T: ?Sized>(self, _name: &str, _variant_index: u32, variant: &str, value: &T) -> Result<Self::Ok> where
        T: Serialize {
        // enum variant that contains a single, unnamed type
        // we mimic serde_json here and create a struct with a single member
        let value = value.serialize(Serializer)?;

        Ok(Value::Struct(iter::once((variant.to_string(), value)).collect()))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq> {
        Ok(SerializeArray::with_capacity(len.unwrap_or(0)))
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(self, _name: &str, len: usize) -> Result<Self::SerializeTupleStruct> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(self, _name: &str, _variant_index: u32, variant: &'static str, len: usize) -> Result<Self::SerializeTupleVariant> {
        Ok(SerializeTupleVariant::with_name_and_capacity(variant, len))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Ok(SerializeMap::new())
    }

    fn serialize_struct(self, _name: &str, len: usize) -> Result<Self::SerializeStruct> {
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(self, _name: &str, _variant_index: u32, variant: &str, _len: usize) -> Result<Self::SerializeStructVariant> {
        Ok(SerializeStructVariant::new(variant.to_string()))
    }
}

pub struct SerializeArray {
    array: Vec<Value>,
}

impl SerializeArray {
    fn with_capacity(cap: usize) -> Self {
        Self {
            array: Vec::with_capacity(cap),
        }
    }

    fn push<T: ?Sized>(&mut self, value: &T) -> Result<()> where T: Serialize {
        self.array.push(value.serialize(Serializer)?);
        Ok(())
    }
}

impl ser::SerializeSeq for SerializeArray {
    type Ok = Value;
    type Error = EncodeError;

    fn serialize_element<T: ?Sized>(&mut self, value: &T) -> Result<()> where
        T: Serialize {
        self.push(value)
    }

    fn end(self) -> Result<Self::Ok> {
        Ok(Value::Array(self.array))
    }
}

impl ser::SerializeTuple for SerializeArray {
    type Ok = Value;
    type Error = EncodeError;

    fn serialize_element<T: ?Sized>(&mut self, value: &T) -> Result<()> where
        T: Serialize {
        self.push(value)
    }

    fn end(self) -> Result<Self::Ok> {
        Ok(Value::Array(self.array))
    }
}

impl ser::SerializeTupleStruct for SerializeArray {
    type Ok = Value;
    type Error = EncodeError;

    fn serialize_field<T: ?Sized>(&mut self, value: &T) -> Result<()> where
        T: Serialize {
        self.push(value)
    }

    fn end(self) -> Result<Self::Ok> {
        Ok(Value::Array(self.array))
    }
}

pub struct SerializeTupleVariant {
    name: &'static str,
    values: Vec<Value>,
}

impl SerializeTupleVariant {
    fn with_name_and_capacity(name: &'static str, cap: usize) -> Self {
        Self {
            name,
            values: Vec::with_capacity(cap),
        }
    }
}

impl ser::SerializeTupleVariant for SerializeTupleVariant {
    type Ok = Value;
    type Error = EncodeError;

    fn serialize_field<T: ?Sized>(&mut self, value: &T) -> Result<()> where
        T: Serialize {
        self.values.push(value.serialize(Serializer)?);
        Ok(())
    }

    fn end(self) -> Result<Self::Ok> {
        Ok(Value::Struct(iter::once((self.name.to_string(), Value::Array(self.values))).collect()))
    }
}

/// Collects map entries and struct fields into a `<struct>`.
///
/// A key that shows up twice keeps its first position and takes the last value.
pub struct SerializeMap {
    next_key: Option<String>,
    members: Members,
}

impl SerializeMap {
    fn new() -> Self {
        Self {
            next_key: None,
            members: Members::new(),
        }
    }
}

impl ser::SerializeMap for SerializeMap {
    type Ok = Value;
    type Error = EncodeError;

    fn serialize_key<T: ?Sized>(&mut self, key: &T) -> Result<()> where
        T: Serialize {

        if self.next_key.is_some() {
            return Err(EncodeError::custom("serialize_key called twice in a row"));
        }

        match key.serialize(Serializer)? {
            Value::String(key) => {
                self.next_key = Some(key);
                Ok(())
            }
            _ => key_must_be_string(),
        }
    }

    fn serialize_value<T: ?Sized>(&mut self, value: &T) -> Result<()> where
        T: Serialize {

        match self.next_key.take() {
            Some(key) => {
                self.members.insert(key, value.serialize(Serializer)?);
                Ok(())
            }
            None => Err(EncodeError::custom("serialize_value called before serialize_key")),
        }
    }

    fn end(self) -> Result<Self::Ok> {
        if self.next_key.is_some() {
            return Err(EncodeError::custom("serialize_key called without serialize_value"));
        }
        Ok(Value::Struct(self.members))
    }
}

impl ser::SerializeStruct for SerializeMap {
    type Ok = Value;
    type Error = EncodeError;

    fn serialize_field<T: ?Sized>(&mut self, key: &str, value: &T) -> Result<()> where
        T: Serialize {

        self.members.insert(key.to_string(), value.serialize(Serializer)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(Value::Struct(self.members))
    }
}

pub struct SerializeStructVariant {
    variant: String,
    fields: Members,
}

impl SerializeStructVariant {
    fn new(variant: String) -> Self {
        Self {
            variant,
            fields: Members::new(),
        }
    }
}

impl ser::SerializeStructVariant for SerializeStructVariant {
    type Ok = Value;
    type Error = EncodeError;

    fn serialize_field<T: ?Sized>(&mut self, key: &str, value: &T) -> Result<()> where
        T: Serialize {

        self.fields.insert(key.to_string(), value.serialize(Serializer)?);
        Ok(())
    }

    fn end(self) -> Result<Self::Ok> {
        Ok(Value::Struct(iter::once((self.variant, Value::Struct(self.fields))).collect()))
    }
}
