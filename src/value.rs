//! Contains the different types of values understood by XML-RPC.

use crate::error::EncodeError;
use crate::utils::{check_xml_text, escape_xml, format_datetime, normalize_datetime, EntityPolicy, UtcDateTime};

use indexmap::IndexMap;
use iso8601::DateTime;

use std::collections::BTreeMap;
use std::io::Write;

/// Maximum nesting depth of arrays and structs accepted by the encoder and the parser.
pub const MAX_DEPTH: usize = 64;

/// The members of a `<struct>`, in the order they were inserted.
///
/// Inserting a name that is already present replaces its value and keeps its position, so the
/// last write wins. Two structs compare equal when they have the same members, regardless of
/// order.
pub type Members = IndexMap<String, Value>;

/// The possible XML-RPC values.
#[derive(Clone, Debug)]
pub enum Value {
    /// `<int>` or `<i4>`, 32-bit signed integer.
    Int(i32),
    /// `<boolean>`, 0 == `false`, 1 == `true`.
    Bool(bool),
    /// `<string>`, or bare text inside a `<value>`.
    String(String),
    /// `<dateTime.iso8601>`, a point in time in UTC with second precision.
    ///
    /// Use `Value::from` to build this variant: it converts the date/time to UTC and drops
    /// fractional seconds, which is also what the parser produces.
    DateTime(DateTime),

    /// `<struct>`, a mapping of named values.
    Struct(Members),
    /// `<array>`, a list of arbitrary (heterogeneous) values.
    Array(Vec<Value>),
}

impl Value {
    /// Returns the XML-RPC tag name of this value's type.
    pub fn type_name(&self) -> &'static str {
        match *self {
            Value::Int(_) => "int",
            Value::Bool(_) => "boolean",
            Value::String(_) => "string",
            Value::DateTime(_) => "dateTime.iso8601",
            Value::Struct(_) => "struct",
            Value::Array(_) => "array",
        }
    }

    /// If the `Value` is an `Int`, returns the integer.
    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            Value::Int(i) => Some(i),
            _ => None,
        }
    }

    /// If the `Value` is a `Bool`, returns it.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }

    /// If the `Value` is a `String`, returns it as a `&str`.
    pub fn as_str(&self) -> Option<&str> {
        match *self {
            Value::String(ref s) => Some(s),
            _ => None,
        }
    }

    /// If the `Value` is a `DateTime`, returns it.
    pub fn as_datetime(&self) -> Option<DateTime> {
        match *self {
            Value::DateTime(date_time) => Some(date_time),
            _ => None,
        }
    }

    /// If the `Value` is an `Array`, returns its elements.
    pub fn as_array(&self) -> Option<&[Value]> {
        match *self {
            Value::Array(ref array) => Some(array),
            _ => None,
        }
    }

    /// If the `Value` is a `Struct`, returns its members.
    pub fn as_struct(&self) -> Option<&Members> {
        match *self {
            Value::Struct(ref members) => Some(members),
            _ => None,
        }
    }

    /// Looks up a struct member by name.
    ///
    /// Returns `None` if `self` is not a `Struct` or has no such member.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.as_struct().and_then(|members| members.get(name))
    }

    /// Formats this `Value` as an XML `<value>` element.
    ///
    /// # Errors
    ///
    /// Fails with `EncodeError::TooDeep` if arrays and structs are nested more than
    /// [`MAX_DEPTH`] levels deep. Errors reported by the writer are propagated as
    /// `EncodeError::Io`.
    ///
    /// [`MAX_DEPTH`]: constant.MAX_DEPTH.html
    pub fn write_as_xml<W: Write>(&self, fmt: &mut W) -> Result<(), EncodeError> {
        self.write_value(fmt, EntityPolicy::default(), 0)
    }

    pub(crate) fn write_value<W: Write>(
        &self,
        fmt: &mut W,
        policy: EntityPolicy,
        depth: usize,
    ) -> Result<(), EncodeError> {
        write!(fmt, "<value>")?;

        match *self {
            Value::Int(i) => {
                write!(fmt, "<int>{}</int>", i)?;
            }
            Value::Bool(b) => {
                write!(fmt, "<boolean>{}</boolean>", if b { "1" } else { "0" })?;
            }
            Value::String(ref s) => {
                check_xml_text(s)?;
                write!(fmt, "<string>{}</string>", escape_xml(s, policy))?;
            }
            Value::DateTime(ref date_time) => {
                write!(fmt, "<dateTime.iso8601>{}</dateTime.iso8601>", format_datetime(date_time)?)?;
            }
            Value::Struct(ref members) => {
                if depth >= MAX_DEPTH {
                    return Err(EncodeError::TooDeep { limit: MAX_DEPTH });
                }
                write!(fmt, "<struct>")?;
                for (name, value) in members {
                    check_xml_text(name)?;
                    write!(fmt, "<member><name>{}</name>", escape_xml(name, policy))?;
                    value.write_value(fmt, policy, depth + 1)?;
                    write!(fmt, "</member>")?;
                }
                write!(fmt, "</struct>")?;
            }
            Value::Array(ref array) => {
                if depth >= MAX_DEPTH {
                    return Err(EncodeError::TooDeep { limit: MAX_DEPTH });
                }
                write!(fmt, "<array><data>")?;
                for value in array {
                    value.write_value(fmt, policy, depth + 1)?;
                }
                write!(fmt, "</data></array>")?;
            }
        }

        write!(fmt, "</value>")?;
        Ok(())
    }
}

/// Timestamps compare as instants: `DateTime`s built by hand with an offset or milliseconds
/// equal their UTC counterparts. Struct members compare regardless of order.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (&Value::Int(a), &Value::Int(b)) => a == b,
            (&Value::Bool(a), &Value::Bool(b)) => a == b,
            (&Value::String(ref a), &Value::String(ref b)) => a == b,
            (&Value::DateTime(ref a), &Value::DateTime(ref b)) => {
                UtcDateTime::from_iso8601(a) == UtcDateTime::from_iso8601(b)
            }
            (&Value::Struct(ref a), &Value::Struct(ref b)) => a == b,
            (&Value::Array(ref a), &Value::Array(ref b)) => a == b,
            _ => false,
        }
    }
}

impl From<i32> for Value {
    fn from(other: i32) -> Self {
        Value::Int(other)
    }
}

impl From<i16> for Value {
    fn from(other: i16) -> Self {
        Value::Int(other.into())
    }
}

impl From<u16> for Value {
    fn from(other: u16) -> Self {
        Value::Int(other.into())
    }
}

impl From<u8> for Value {
    fn from(other: u8) -> Self {
        Value::Int(other.into())
    }
}

impl From<bool> for Value {
    fn from(other: bool) -> Self {
        Value::Bool(other)
    }
}

impl From<String> for Value {
    fn from(other: String) -> Self {
        Value::String(other)
    }
}

impl<'a> From<&'a str> for Value {
    fn from(other: &'a str) -> Self {
        Value::String(other.to_string())
    }
}

impl From<DateTime> for Value {
    fn from(other: DateTime) -> Self {
        Value::DateTime(normalize_datetime(&other))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(other: Vec<T>) -> Self {
        Value::Array(other.into_iter().map(Into::into).collect())
    }
}

impl From<Members> for Value {
    fn from(other: Members) -> Self {
        Value::Struct(other)
    }
}

impl<T: Into<Value>> From<BTreeMap<String, T>> for Value {
    fn from(other: BTreeMap<String, T>) -> Self {
        Value::Struct(other.into_iter().map(|(name, value)| (name, value.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iso8601;
    use std::str;

    fn to_xml(value: &Value) -> String {
        let mut output: Vec<u8> = Vec::new();
        value.write_as_xml(&mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    fn nested_arrays(levels: usize) -> Value {
        (0..levels).fold(Value::Int(1), |inner, _| Value::Array(vec![inner]))
    }

    #[test]
    fn escapes_strings() {
        assert_eq!(
            to_xml(&Value::from("<xml>&nbsp;\"string\"")),
            "<value><string>&lt;xml&gt;&amp;nbsp;&quot;string&quot;</string></value>"
        );
    }

    #[test]
    fn escapes_struct_member_names() {
        let mut members = Members::new();
        members.insert("x&<x".to_string(), Value::from(true));

        assert_eq!(
            to_xml(&Value::Struct(members)),
            "<value><struct><member><name>x&amp;&lt;x</name><value><boolean>1</boolean></value></member></struct></value>"
        );
    }

    #[test]
    fn encodes_scalars() {
        assert_eq!(to_xml(&Value::Int(-42)), "<value><int>-42</int></value>");
        assert_eq!(to_xml(&Value::Int(7)), "<value><int>7</int></value>");
        assert_eq!(to_xml(&Value::Bool(false)), "<value><boolean>0</boolean></value>");
        assert_eq!(to_xml(&Value::from("")), "<value><string></string></value>");
    }

    #[test]
    fn datetimes_and_booleans_are_tagged_separately() {
        let date_time = iso8601::datetime("2011-11-30T09:45:12Z").unwrap();
        let xml = to_xml(&Value::Array(vec![Value::from(date_time), Value::Bool(true)]));

        assert_eq!(
            xml,
            "<value><array><data>\
             <value><dateTime.iso8601>2011-11-30T09:45:12Z</dateTime.iso8601></value>\
             <value><boolean>1</boolean></value>\
             </data></array></value>"
        );
    }

    #[test]
    fn encodes_empty_compounds() {
        assert_eq!(to_xml(&Value::Array(Vec::new())), "<value><array><data></data></array></value>");
        assert_eq!(to_xml(&Value::Struct(Members::new())), "<value><struct></struct></value>");
    }

    #[test]
    fn preserves_member_order() {
        let mut members = Members::new();
        members.insert("title".to_string(), Value::from("Hello"));
        members.insert("description".to_string(), Value::from("World"));
        members.insert("categories".to_string(), Value::from(vec!["rust"]));

        let xml = to_xml(&Value::Struct(members));
        let title = xml.find("title").unwrap();
        let description = xml.find("description").unwrap();
        let categories = xml.find("categories").unwrap();
        assert!(title < description && description < categories);
    }

    #[test]
    fn last_write_wins() {
        let mut members = Members::new();
        members.insert("a".to_string(), Value::Int(1));
        members.insert("b".to_string(), Value::Int(2));
        members.insert("a".to_string(), Value::Int(3));

        assert_eq!(members.len(), 2);
        assert_eq!(
            to_xml(&Value::Struct(members)),
            "<value><struct>\
             <member><name>a</name><value><int>3</int></value></member>\
             <member><name>b</name><value><int>2</int></value></member>\
             </struct></value>"
        );
    }

    #[test]
    fn struct_equality_ignores_order() {
        let mut ab = Members::new();
        ab.insert("a".to_string(), Value::Int(1));
        ab.insert("b".to_string(), Value::Int(2));
        let mut ba = Members::new();
        ba.insert("b".to_string(), Value::Int(2));
        ba.insert("a".to_string(), Value::Int(1));

        assert_eq!(Value::Struct(ab), Value::Struct(ba));
    }

    #[test]
    fn limits_nesting_depth() {
        let mut output: Vec<u8> = Vec::new();
        assert!(nested_arrays(MAX_DEPTH).write_as_xml(&mut output).is_ok());

        let mut output: Vec<u8> = Vec::new();
        match nested_arrays(MAX_DEPTH + 1).write_as_xml(&mut output) {
            Err(EncodeError::TooDeep { limit }) => assert_eq!(limit, MAX_DEPTH),
            other => panic!("expected TooDeep, got {:?}", other),
        }
    }

    #[test]
    fn normalizes_datetimes_on_conversion() {
        let local = iso8601::datetime("2016-05-02T06:01:05.250-08:30").unwrap();
        let utc = iso8601::datetime("2016-05-02T14:31:05Z").unwrap();

        assert_eq!(Value::from(local), Value::from(utc));
        assert_eq!(Value::from(local).as_datetime().unwrap().time.tz_offset_hours, 0);
    }

    #[test]
    fn hand_built_datetimes_compare_as_instants() {
        let local = iso8601::datetime("2011-11-30T09:45:12.500+01:00").unwrap();
        let utc = iso8601::datetime("2011-11-30T08:45:12Z").unwrap();

        assert_eq!(Value::DateTime(local), Value::from(local));
        assert_eq!(Value::DateTime(local), Value::DateTime(utc));
        assert_ne!(Value::DateTime(local), Value::from(iso8601::datetime("2011-11-30T09:45:12Z").unwrap()));
        assert_ne!(Value::DateTime(utc), Value::from("2011-11-30T08:45:12Z"));
    }

    #[test]
    fn rejects_unencodable_text() {
        let mut output: Vec<u8> = Vec::new();
        assert!(matches!(
            Value::from("bell\u{7}").write_as_xml(&mut output),
            Err(EncodeError::UnsupportedType(_))
        ));

        let mut members = Members::new();
        members.insert("x\u{0}".to_string(), Value::Int(1));
        let mut output: Vec<u8> = Vec::new();
        assert!(matches!(
            Value::Struct(members).write_as_xml(&mut output),
            Err(EncodeError::UnsupportedType(_))
        ));
    }

    #[test]
    fn rejects_years_past_9999() {
        let date_time = iso8601::datetime("9999-12-31T23:30:00-01:00").unwrap();
        let mut output: Vec<u8> = Vec::new();
        assert!(matches!(
            Value::from(date_time).write_as_xml(&mut output),
            Err(EncodeError::UnsupportedType(_))
        ));
    }

    #[test]
    fn accessors() {
        let mut members = Members::new();
        members.insert("postid".to_string(), Value::from("2249012"));
        let post = Value::Struct(members);

        assert_eq!(post.get("postid").and_then(Value::as_str), Some("2249012"));
        assert_eq!(post.get("title"), None);
        assert_eq!(Value::Int(3).get("postid"), None);
        assert_eq!(Value::Int(3).as_i32(), Some(3));
        assert_eq!(Value::Int(3).as_str(), None);
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::from(vec![1, 2]).as_array().map(|a| a.len()), Some(2));
    }

    #[test]
    fn output_is_utf8() {
        let mut output: Vec<u8> = Vec::new();
        Value::from("fawave中文").write_as_xml(&mut output).unwrap();
        assert!(str::from_utf8(&output).unwrap().contains("fawave中文"));
    }
}
