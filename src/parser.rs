//! XML-RPC response parser.

use crate::error::{Error, ParseError};
use crate::utils::normalize_datetime;
use crate::value::{Members, MAX_DEPTH};
use crate::{Fault, Request, Value};

use iso8601::datetime;
use xml::common::{Position, TextPosition};
use xml::name::OwnedName;
use xml::reader::{EventReader, XmlEvent};
use xml::ParserConfig;

use std::io::Read;

pub type ParseResult<T> = Result<T, ParseError>;

/// A decoded `methodResponse`: the returned value, or the fault the server sent instead.
pub type Response = Result<Value, Fault>;

pub struct Parser<'a, R: Read + 'a> {
    reader: EventReader<&'a mut R>,
    depth: usize,
}

impl<'a, R: Read> Parser<'a, R> {
    pub fn new(reader: &'a mut R) -> Self {
        Parser {
            reader: EventReader::new_with_config(
                reader,
                ParserConfig::new().cdata_to_characters(true),
            ),
            depth: 0,
        }
    }

    /// Reads the next `XmlEvent`, including whitespace-only text.
    ///
    /// When encountering a new element, returns an `Err` if it has any attributes or a
    /// namespace.
    fn pull_raw_event(&mut self) -> ParseResult<XmlEvent> {
        loop {
            let event = match self.reader.next() {
                Ok(event) => event,
                Err(e) => {
                    return Err(ParseError::XmlError {
                        message: e.msg().to_string(),
                        position: e.position(),
                    })
                }
            };
            match event {
                XmlEvent::StartDocument { .. }
                | XmlEvent::Comment(_)
                | XmlEvent::ProcessingInstruction { .. } => continue,   // skip these
                XmlEvent::StartElement { ref attributes, ref name, .. } => {
                    if !attributes.is_empty() {
                        return self.expected(format!("tag <{}> without attributes", name), None);
                    }
                    if name.namespace.is_some() || name.prefix.is_some() {
                        return self.expected(format!("tag <{}> without namespace", name.local_name), None);
                    }
                }
                _ => {}
            }

            return Ok(event);
        }
    }

    /// Reads an `XmlEvent`, disposing of whitespace between elements.
    fn pull_event(&mut self) -> ParseResult<XmlEvent> {
        loop {
            match self.pull_raw_event()? {
                XmlEvent::Whitespace(_) => continue,
                event => return Ok(event),
            }
        }
    }

    /// Expects an opening tag like `<tag>`.
    fn expect_open(&mut self, tag: &str) -> ParseResult<()> {
        match self.pull_event()? {
            XmlEvent::StartElement { ref name, .. } if is(name, tag) => Ok(()),
            event => self.expected(format!("<{}>", tag), Some(&event)),
        }
    }

    /// Expects a closing tag like `</tag>`.
    fn expect_close(&mut self, tag: &str) -> ParseResult<()> {
        match self.pull_event()? {
            XmlEvent::EndElement { ref name } if is(name, tag) => Ok(()),
            event => self.expected(format!("</{}>", tag), Some(&event)),
        }
    }

    /// Expects the end of the document after the root element.
    fn expect_end(&mut self) -> ParseResult<()> {
        match self.pull_event()? {
            XmlEvent::EndDocument => Ok(()),
            event => self.expected("end of document", Some(&event)),
        }
    }

    /// Builds and returns an `Err(UnexpectedXml)`.
    fn expected<T, E: ToString>(&self, expected: E, found: Option<&XmlEvent>) -> ParseResult<T> {
        Err(ParseError::UnexpectedXml {
            expected: expected.to_string(),
            found: found.map(describe),
            position: self.position(),
        })
    }

    fn malformed_response<T, E: ToString>(&self, reason: E) -> ParseResult<T> {
        Err(ParseError::MalformedResponse {
            reason: reason.to_string(),
            position: self.position(),
        })
    }

    fn position(&self) -> TextPosition {
        self.reader.position()
    }

    /// Collects the text content of an element up to its closing tag.
    ///
    /// Nested elements are rejected. An empty element yields an empty string.
    fn read_text(&mut self, tag: &str) -> ParseResult<String> {
        let mut text = String::new();
        loop {
            match self.pull_raw_event()? {
                XmlEvent::Characters(s) | XmlEvent::CData(s) | XmlEvent::Whitespace(s) => {
                    text.push_str(&s)
                }
                XmlEvent::EndElement { ref name } if is(name, tag) => return Ok(text),
                event => return self.expected(format!("characters or </{}>", tag), Some(&event)),
            }
        }
    }

    pub fn parse_response(&mut self) -> ParseResult<Response> {
        let response: Response;

        // <methodResponse>
        self.expect_open("methodResponse")?;

        // <fault> / <params>
        let first = match self.pull_event()? {
            XmlEvent::StartElement { name, .. } => name.local_name,
            XmlEvent::EndElement { ref name } if is(name, "methodResponse") => {
                return self.malformed_response("response contains neither <params> nor <fault>");
            }
            event => return self.expected("<fault> or <params>", Some(&event)),
        };

        match first.as_str() {
            "fault" => {
                let value = self.parse_value()?;
                self.expect_close("fault")?;
                response = Err(Fault::from_value(&value)?);
            }
            "params" => {
                // <param>
                match self.pull_event()? {
                    XmlEvent::StartElement { ref name, .. } if is(name, "param") => {}
                    XmlEvent::EndElement { ref name } if is(name, "params") => {
                        return self.malformed_response("<params> contains no <param>");
                    }
                    event => return self.expected("<param>", Some(&event)),
                }

                let value = self.parse_value()?;
                response = Ok(value);

                // </param>
                self.expect_close("param")?;

                // </params>
                match self.pull_event()? {
                    XmlEvent::EndElement { ref name } if is(name, "params") => {}
                    XmlEvent::StartElement { ref name, .. } if is(name, "param") => {
                        return self.malformed_response("<params> contains more than one <param>");
                    }
                    event => return self.expected("</params>", Some(&event)),
                }
            }
            other => {
                return Err(ParseError::UnexpectedXml {
                    expected: "<fault> or <params>".to_string(),
                    found: Some(format!("<{}>", other)),
                    position: self.position(),
                });
            }
        }

        // </methodResponse>
        match self.pull_event()? {
            XmlEvent::EndElement { ref name } if is(name, "methodResponse") => {}
            XmlEvent::StartElement { ref name, .. }
                if is(name, "fault") || is(name, "params") =>
            {
                return self.malformed_response("response contains both <params> and <fault>");
            }
            event => return self.expected("</methodResponse>", Some(&event)),
        }

        self.expect_end()?;
        Ok(response)
    }

    pub fn parse_request(&mut self) -> ParseResult<Request> {
        // <methodCall>
        self.expect_open("methodCall")?;

        // <methodName>NAME</methodName>
        self.expect_open("methodName")?;
        let name = self.read_text("methodName")?;

        let mut args = Vec::new();
        match self.pull_event()? {
            XmlEvent::EndElement { ref name } if is(name, "methodCall") => {}
            XmlEvent::StartElement { ref name, .. } if is(name, "params") => {
                loop {
                    match self.pull_event()? {
                        XmlEvent::EndElement { ref name } if is(name, "params") => break,
                        XmlEvent::StartElement { ref name, .. } if is(name, "param") => {
                            args.push(self.parse_value()?);
                            self.expect_close("param")?;
                        }
                        event => return self.expected("</params> or <param>", Some(&event)),
                    }
                }
                self.expect_close("methodCall")?;
            }
            event => return self.expected("<params> or </methodCall>", Some(&event)),
        }

        self.expect_end()?;
        Ok(Request::with_args(name.trim(), args))
    }

    pub fn parse_value(&mut self) -> ParseResult<Value> {
        // <value>
        self.expect_open("value")?;

        self.parse_value_body()
    }

    /// Parses the content of a `<value>` element whose opening tag was already consumed, up to
    /// and including `</value>`.
    fn parse_value_body(&mut self) -> ParseResult<Value> {
        // Raw string or specific type tag
        let mut text = String::new();
        loop {
            match self.pull_raw_event()? {
                XmlEvent::Characters(s) | XmlEvent::CData(s) | XmlEvent::Whitespace(s) => {
                    text.push_str(&s)
                }
                XmlEvent::EndElement { ref name } if is(name, "value") => {
                    return Ok(Value::String(text));
                }
                XmlEvent::StartElement { ref name, .. } if text.trim().is_empty() => {
                    let tag = name.local_name.clone();
                    let value = self.parse_typed(&tag)?;

                    // </value>
                    self.expect_close("value")?;
                    return Ok(value);
                }
                event => return self.expected("type tag or characters", Some(&event)),
            }
        }
    }

    /// Parses a typed value after its opening tag `<tag>`, up to and including `</tag>`.
    fn parse_typed(&mut self, tag: &str) -> ParseResult<Value> {
        let value = match tag {
            "struct" => {
                self.enter()?;
                let mut members = Members::new();
                loop {
                    match self.pull_event()? {
                        XmlEvent::EndElement { ref name } if is(name, "struct") => break,
                        XmlEvent::StartElement { ref name, .. } if is(name, "member") => {
                            // <member>

                            // <name>NAME</name>
                            self.expect_open("name")?;
                            let name = self.read_text("name")?;

                            // Value
                            let value = self.parse_value()?;

                            // </member>
                            self.expect_close("member")?;

                            // duplicate names: the last one wins
                            members.insert(name, value);
                        }
                        event => return self.expected("</struct> or <member>", Some(&event)),
                    }
                }
                self.depth -= 1;

                Value::Struct(members)
            }
            "array" => {
                self.enter()?;
                let mut elements: Vec<Value> = Vec::new();
                self.expect_open("data")?;
                loop {
                    match self.pull_event()? {
                        XmlEvent::EndElement { ref name } if is(name, "data") => break,
                        XmlEvent::StartElement { ref name, .. } if is(name, "value") => {
                            elements.push(self.parse_value_body()?);
                        }
                        event => return self.expected("</data> or <value>", Some(&event)),
                    }
                }
                self.expect_close("array")?;
                self.depth -= 1;

                Value::Array(elements)
            }
            "string" => Value::String(self.read_text(tag)?),
            // not part of the value model, handed over as text
            "double" => Value::String(self.read_text(tag)?),
            "int" | "i4" => {
                let data = self.read_text(tag)?;
                match data.trim().parse::<i32>() {
                    Ok(i) => Value::Int(i),
                    Err(_) => {
                        return Err(ParseError::MalformedNumber {
                            found: data,
                            position: self.position(),
                        })
                    }
                }
            }
            "boolean" => {
                let data = self.read_text(tag)?;
                match &*data {
                    "0" => Value::Bool(false),
                    "1" => Value::Bool(true),
                    _ => {
                        return Err(ParseError::MalformedBoolean {
                            found: data,
                            position: self.position(),
                        })
                    }
                }
            }
            "dateTime.iso8601" => {
                let data = self.read_text(tag)?;
                match datetime(data.trim()) {
                    Ok(date_time) => Value::DateTime(normalize_datetime(&date_time)),
                    Err(_) => {
                        return Err(ParseError::MalformedDateTime {
                            found: data,
                            position: self.position(),
                        })
                    }
                }
            }
            // a `<value>` directly inside a `<value>` stands for itself
            "value" => {
                self.enter()?;
                let value = self.parse_value_body()?;
                self.depth -= 1;
                value
            }
            other => {
                return Err(ParseError::UnexpectedXml {
                    expected: "valid type tag or characters".to_string(),
                    found: Some(format!("<{}>", other)),
                    position: self.position(),
                });
            }
        };

        Ok(value)
    }

    /// Descends into a struct or array.
    fn enter(&mut self) -> ParseResult<()> {
        if self.depth >= MAX_DEPTH {
            return Err(ParseError::TooDeep {
                limit: MAX_DEPTH,
                position: self.position(),
            });
        }
        self.depth += 1;
        Ok(())
    }
}

/// Whether `name` is the plain local name `tag`.
fn is(name: &OwnedName, tag: &str) -> bool {
    name.local_name == tag && name.namespace.is_none() && name.prefix.is_none()
}

fn describe(event: &XmlEvent) -> String {
    match *event {
        XmlEvent::StartElement { ref name, .. } => format!("<{}>", name.local_name),
        XmlEvent::EndElement { ref name } => format!("</{}>", name.local_name),
        XmlEvent::Characters(ref s) | XmlEvent::CData(ref s) => format!("characters '{}'", s.trim()),
        XmlEvent::Whitespace(_) => "whitespace".to_string(),
        XmlEvent::EndDocument => "end of document".to_string(),
        _ => "XML declaration".to_string(),
    }
}

/// Parses a `methodResponse` from an XML reader.
///
/// The outer `Result` reports documents that aren't valid XML-RPC responses. The inner one holds
/// either the returned value or the `<fault>` sent by the server.
pub fn parse_response<R: Read>(reader: &mut R) -> ParseResult<Response> {
    Parser::new(reader).parse_response()
}

/// Parses a `methodCall` document from an XML reader.
pub fn parse_request<R: Read>(reader: &mut R) -> ParseResult<Request> {
    Parser::new(reader).parse_request()
}

/// Decodes a complete `methodResponse` body, turning a `<fault>` into an [`Error`].
///
/// [`Error`]: struct.Error.html
pub fn decode_response(mut body: &[u8]) -> Result<Value, Error> {
    let value = parse_response(&mut body)??;
    Ok(value)
}
