use crate::error::ParseError;
use crate::Value;

use indexmap::IndexMap;

use std::error::Error;
use std::fmt::{self, Display, Formatter};

/// A `<fault>` response, indicating that the server understood the call and rejected it.
///
/// The XML-RPC specification requires that a `<faultCode>` and `<faultString>` is returned in the
/// `<fault>` case, further describing the error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fault {
    code: i32,
    string: String,
}

impl Fault {
    /// Creates a new `Fault` from an error code and a message.
    pub fn new<S: Into<String>>(code: i32, string: S) -> Fault {
        Fault {
            code,
            string: string.into(),
        }
    }

    /// Returns the fault code.
    ///
    /// The meaning of this code is not specified by XML-RPC and depends on the service you are
    /// using. Blog engines commonly reuse HTTP-like codes such as 403 or 404.
    pub fn code(&self) -> i32 {
        self.code
    }

    /// Returns the error message sent by the server.
    pub fn string(&self) -> &str {
        &self.string
    }

    /// Creates a `Fault` from a `Value`.
    ///
    /// The `Value` must be a `Value::Struct` with an integer `faultCode` and a string
    /// `faultString` member. Additional members are ignored.
    pub fn from_value(value: &Value) -> Result<Self, ParseError> {
        let members = match *value {
            Value::Struct(ref members) => members,
            ref other => {
                return Err(ParseError::MalformedFault(format!(
                    "expected a struct, found {}",
                    other.type_name()
                )))
            }
        };

        let code = match members.get("faultCode") {
            Some(&Value::Int(code)) => code,
            Some(other) => {
                return Err(ParseError::MalformedFault(format!(
                    "faultCode must be an int, found {}",
                    other.type_name()
                )))
            }
            None => return Err(ParseError::MalformedFault("missing faultCode".into())),
        };

        match members.get("faultString") {
            Some(&Value::String(ref string)) => Ok(Fault::new(code, string.clone())),
            Some(other) => Err(ParseError::MalformedFault(format!(
                "faultString must be a string, found {}",
                other.type_name()
            ))),
            None => Err(ParseError::MalformedFault("missing faultString".into())),
        }
    }

    /// Turns this `Fault` into an equivalent `Value`.
    ///
    /// The returned value can be parsed back into a `Fault` using `Fault::from_value`.
    pub fn to_value(&self) -> Value {
        let mut members = IndexMap::new();
        members.insert("faultCode".to_string(), Value::from(self.code));
        members.insert("faultString".to_string(), Value::from(self.string.as_str()));

        Value::Struct(members)
    }
}

impl Display for Fault {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.string, self.code)
    }
}

impl Error for Fault {}
