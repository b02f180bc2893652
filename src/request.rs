use crate::error::EncodeError;
use crate::ser::to_value;
use crate::utils::{is_valid_method_name, EntityPolicy};
use crate::Value;

use serde::Serialize;

use std::io::Write;

/// A request to call a procedure.
///
/// Built once per call with [`new`] and [`arg`]; the argument order is the order of the
/// `<param>` elements on the wire.
///
/// [`new`]: #method.new
/// [`arg`]: #method.arg
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    name: String,
    args: Vec<Value>,
    policy: EntityPolicy,
}

impl Request {
    /// Creates a new request to call a function named `name`.
    ///
    /// By default, no arguments are passed. Use the `arg` method to append arguments. The name is
    /// validated when the request is encoded.
    pub fn new<S: Into<String>>(name: S) -> Self {
        Request {
            name: name.into(),
            args: Vec::new(),
            policy: EntityPolicy::default(),
        }
    }

    /// Creates a request with a complete argument list.
    pub fn with_args<S: Into<String>>(name: S, args: Vec<Value>) -> Self {
        Request {
            args,
            ..Request::new(name)
        }
    }

    /// Appends an argument to be passed to the current list of arguments.
    pub fn arg<T: Into<Value>>(mut self, value: T) -> Self {
        self.args.push(value.into());
        self
    }

    /// Appends any serializable native value as an argument.
    ///
    /// # Errors
    ///
    /// Fails with `EncodeError::UnsupportedType` if `value` contains something XML-RPC can't
    /// express (see [`to_value`]).
    ///
    /// [`to_value`]: fn.to_value.html
    pub fn try_arg<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self, EncodeError> {
        self.args.push(to_value(value)?);
        Ok(self)
    }

    /// Sets how `&` characters that already start an XML entity are encoded.
    pub fn entity_policy(mut self, policy: EntityPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the name of the method to call.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the arguments in call order.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Formats this `Request` as a UTF-8 encoded XML document.
    ///
    /// # Errors
    ///
    /// Fails with `EncodeError::InvalidMethodName` before writing anything if the method name is
    /// empty or contains characters outside of `[A-Za-z0-9._:/]`, and with `EncodeError::TooDeep`
    /// for overly nested arguments. Any errors reported by the writer will be propagated to the
    /// caller.
    pub fn write_as_xml<W: Write>(&self, fmt: &mut W) -> Result<(), EncodeError> {
        if !is_valid_method_name(&self.name) {
            return Err(EncodeError::InvalidMethodName(self.name.clone()));
        }

        writeln!(fmt, r#"<?xml version="1.0" encoding="utf-8"?>"#)?;
        writeln!(fmt, "<methodCall>")?;
        writeln!(fmt, "<methodName>{}</methodName>", self.name)?;
        if !self.args.is_empty() {
            writeln!(fmt, "<params>")?;
            for value in &self.args {
                write!(fmt, "<param>")?;
                value.write_value(fmt, self.policy, 0)?;
                writeln!(fmt, "</param>")?;
            }
            writeln!(fmt, "</params>")?;
        }
        writeln!(fmt, "</methodCall>")?;
        Ok(())
    }

    /// Encodes this `Request` into a freshly allocated buffer.
    ///
    /// Nothing is returned if encoding fails halfway through.
    pub fn to_xml(&self) -> Result<Vec<u8>, EncodeError> {
        let mut body = Vec::new();
        self.write_as_xml(&mut body)?;
        Ok(body)
    }
}

/// Encodes a call of `name` with the given arguments as a `methodCall` document.
pub fn encode(name: &str, args: &[Value]) -> Result<Vec<u8>, EncodeError> {
    Request::with_args(name, args.to_vec()).to_xml()
}
