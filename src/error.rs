//! Defines error types used by this library.

use crate::Fault;

use xml::common::TextPosition;

use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::io;

/// An error that can occur while calling a remote procedure.
///
/// Use [`kind`] to find out what went wrong. Faults returned by the server are reported with
/// [`ErrorKind::Fault`] and can be accessed directly through [`fault`].
///
/// [`kind`]: #method.kind
/// [`fault`]: #method.fault
#[derive(Debug)]
pub struct Error(ErrorKind);

impl Error {
    /// Returns the kind of error that occurred.
    pub fn kind(&self) -> &ErrorKind {
        &self.0
    }

    /// Consumes this error and returns its kind.
    pub fn into_kind(self) -> ErrorKind {
        self.0
    }

    /// If this error was caused by the server responding with a `<fault>` response, returns the
    /// `Fault` in question.
    pub fn fault(&self) -> Option<&Fault> {
        match self.0 {
            ErrorKind::Fault(ref fault) => Some(fault),
            _ => None,
        }
    }

    /// Returns the HTTP status code if the server answered with a non-success status.
    pub fn http_status(&self) -> Option<u16> {
        match self.0 {
            ErrorKind::Transport(TransportError::Status { status, .. }) => Some(status),
            _ => None,
        }
    }

    /// Whether the underlying transport operation was cancelled mid-flight.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.0, ErrorKind::Cancelled)
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind)
    }
}

impl From<EncodeError> for Error {
    fn from(e: EncodeError) -> Self {
        Error(ErrorKind::Encode(e))
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Error(ErrorKind::Parse(e))
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Error(ErrorKind::Transport(e))
    }
}

impl From<Fault> for Error {
    fn from(fault: Fault) -> Self {
        Error(ErrorKind::Fault(fault))
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self.0 {
            ErrorKind::Encode(ref err) => Some(err),
            ErrorKind::Parse(ref err) => Some(err),
            ErrorKind::Transport(ref err) => Some(err),
            ErrorKind::Fault(ref err) => Some(err),
            ErrorKind::Cancelled | ErrorKind::InvalidUrl(_) => None,
        }
    }
}

/// The different ways a call can fail.
#[derive(Debug)]
pub enum ErrorKind {
    /// The request could not be encoded. Nothing was sent.
    Encode(EncodeError),

    /// The response could not be parsed. This can happen when the server doesn't correctly
    /// implement the XML-RPC spec.
    Parse(ParseError),

    /// The HTTP exchange failed, or the server answered with a status other than 200 or 201.
    Transport(TransportError),

    /// The server understood the call and answered with a `<fault>`.
    Fault(Fault),

    /// The transport operation was cancelled before a response arrived.
    Cancelled,

    /// The endpoint URL the client was configured with is unusable.
    InvalidUrl(String),
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match *self {
            ErrorKind::Encode(ref err) => write!(f, "encoding error: {}", err),
            ErrorKind::Parse(ref err) => write!(f, "parse error: {}", err),
            ErrorKind::Transport(ref err) => write!(f, "transport error: {}", err),
            ErrorKind::Fault(ref err) => write!(f, "server returned a fault: {}", err),
            ErrorKind::Cancelled => write!(f, "call was cancelled"),
            ErrorKind::InvalidUrl(ref msg) => write!(f, "invalid endpoint URL: {}", msg),
        }
    }
}

/// A request could not be turned into an XML document.
#[derive(Debug)]
pub enum EncodeError {
    /// The method name is empty or contains characters other than ASCII letters, digits, `.`,
    /// `_`, `:` and `/`.
    InvalidMethodName(String),

    /// Arrays and structs are nested deeper than the encoder allows.
    TooDeep {
        /// The maximum nesting depth.
        limit: usize,
    },

    /// A native value has no XML-RPC representation (for example a float or a byte buffer).
    UnsupportedType(String),

    /// A `Serialize` implementation reported an error of its own.
    Custom(String),

    /// The writer the document was written to reported an error.
    Io(io::Error),
}

impl From<io::Error> for EncodeError {
    fn from(e: io::Error) -> Self {
        EncodeError::Io(e)
    }
}

impl Display for EncodeError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match *self {
            EncodeError::InvalidMethodName(ref name) => write!(f, "invalid method name '{}'", name),
            EncodeError::TooDeep { limit } => {
                write!(f, "values nested deeper than {} levels", limit)
            }
            EncodeError::UnsupportedType(ref what) => {
                write!(f, "cannot encode {} as an XML-RPC value", what)
            }
            EncodeError::Custom(ref msg) => f.write_str(msg),
            EncodeError::Io(ref err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl StdError for EncodeError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self {
            EncodeError::Io(ref err) => Some(err),
            _ => None,
        }
    }
}

/// Describes possible error that can occur when parsing a `methodResponse` or `methodCall`.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Error while parsing (malformed?) XML.
    XmlError {
        /// The parser's description of the problem.
        message: String,
        /// Where the parser gave up.
        position: TextPosition,
    },

    /// The document is well-formed XML, but doesn't have the shape of an XML-RPC response: it
    /// contains neither `<params>` nor `<fault>`, both of them, or not exactly one `<param>`.
    MalformedResponse {
        reason: String,
        position: TextPosition,
    },

    /// A `<fault>` value is missing its `faultCode` (int) or `faultString` (string) member.
    MalformedFault(String),

    /// An `<int>` or `<i4>` did not contain a 32-bit decimal integer.
    MalformedNumber {
        found: String,
        position: TextPosition,
    },

    /// A `<boolean>` contained something other than `0` or `1`.
    MalformedBoolean {
        found: String,
        position: TextPosition,
    },

    /// A `<dateTime.iso8601>` did not contain an ISO 8601 date and time.
    MalformedDateTime {
        found: String,
        position: TextPosition,
    },

    /// Found an unexpected tag, attribute, etc.
    UnexpectedXml {
        /// A short description of the kind of data that was expected.
        expected: String,
        found: Option<String>,
        /// The position of the unexpected data inside the XML document.
        position: TextPosition,
    },

    /// Arrays and structs are nested deeper than the decoder allows.
    TooDeep {
        limit: usize,
        position: TextPosition,
    },
}

impl Display for ParseError {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        match *self {
            ParseError::XmlError { ref message, ref position } => {
                write!(fmt, "malformed XML at {}: {}", position, message)
            }
            ParseError::MalformedResponse { ref reason, ref position } => {
                write!(fmt, "malformed response at {}: {}", position, reason)
            }
            ParseError::MalformedFault(ref reason) => write!(fmt, "malformed <fault>: {}", reason),
            ParseError::MalformedNumber { ref found, ref position } => {
                write!(fmt, "invalid value for type 'int' at {}: {}", position, found)
            }
            ParseError::MalformedBoolean { ref found, ref position } => {
                write!(fmt, "invalid value for type 'boolean' at {}: {}", position, found)
            }
            ParseError::MalformedDateTime { ref found, ref position } => {
                write!(fmt, "invalid value for type 'dateTime.iso8601' at {}: {}", position, found)
            }
            ParseError::UnexpectedXml {
                ref expected,
                ref position,
                found: None,
            } => {
                write!(fmt, "unexpected XML at {} (expected {})", position, expected)
            }
            ParseError::UnexpectedXml {
                ref expected,
                ref position,
                found: Some(ref found),
            } => {
                write!(fmt, "unexpected XML at {} (expected {}, found {})", position, expected, found)
            }
            ParseError::TooDeep { limit, ref position } => {
                write!(fmt, "values nested deeper than {} levels at {}", limit, position)
            }
        }
    }
}

impl StdError for ParseError {}

/// The HTTP exchange did not produce a response body worth parsing.
#[derive(Debug)]
pub enum TransportError {
    /// The server answered with a status other than 200 or 201. The body is kept verbatim and
    /// was not parsed.
    Status {
        status: u16,
        body: Vec<u8>,
    },

    /// The request could not be sent or the response could not be received.
    Io(Box<dyn StdError + Send + Sync>),
}

impl TransportError {
    /// Returns the response body of a `Status` error as (lossily decoded) text.
    pub fn body_text(&self) -> Option<String> {
        match *self {
            TransportError::Status { ref body, .. } => {
                Some(String::from_utf8_lossy(body).into_owned())
            }
            TransportError::Io(_) => None,
        }
    }
}

impl Display for TransportError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match *self {
            TransportError::Status { status, ref body } => {
                write!(f, "server responded with HTTP status {}: {}", status, String::from_utf8_lossy(body))
            }
            TransportError::Io(ref err) => write!(f, "{}", err),
        }
    }
}

impl StdError for TransportError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self {
            TransportError::Io(ref err) => Some(&**err),
            TransportError::Status { .. } => None,
        }
    }
}
