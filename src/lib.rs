//! An XML-RPC client codec for blog-publishing APIs.
//!
//! The `xmlrpc_codec` crate translates between Rust values and the [XML-RPC][spec] wire format
//! and performs calls against MetaWeblog / Blogger style endpoints.
//!
//! * [`Value`] is the closed set of values that can travel over the wire. Native values can be
//!   converted with `Value::from` or, for anything implementing `serde::Serialize`, with
//!   [`to_value`].
//! * [`Request`] and [`encode`] build `methodCall` documents; [`parse_response`] and
//!   [`decode_response`] read `methodResponse` documents and tell values from [`Fault`]s.
//! * [`Client`] POSTs a call through a [`Transport`] and decodes the answer. With the default
//!   `http` feature, [`http::HttpTransport`] does this via reqwest. [`BlockingClient`] does the
//!   same for code that doesn't run on an async executor.
//!
//! ```no_run
//! use xmlrpc_codec::{BlockingClient, Value};
//!
//! let client = BlockingClient::new("http://blog.example.com/xmlrpc.php")?;
//! let deleted = client.call("blogger.deletePost", &[
//!     Value::from("appkey"),
//!     Value::from("2249012"),
//!     Value::from("user"),
//!     Value::from("secret"),
//!     Value::Bool(true),
//! ])?;
//! assert_eq!(deleted, Value::Bool(true));
//! # Ok::<(), xmlrpc_codec::Error>(())
//! ```
//!
//! Binary payloads (`<base64>`), `<nil>` and `<i8>` are not supported. `<double>` values are
//! returned as their text.
//!
//! [spec]: http://xmlrpc.scripting.com/spec.html
//! [`Value`]: enum.Value.html
//! [`to_value`]: fn.to_value.html
//! [`Request`]: struct.Request.html
//! [`encode`]: fn.encode.html
//! [`parse_response`]: fn.parse_response.html
//! [`decode_response`]: fn.decode_response.html
//! [`Fault`]: struct.Fault.html
//! [`Client`]: struct.Client.html
//! [`Transport`]: trait.Transport.html
//! [`http::HttpTransport`]: http/struct.HttpTransport.html
//! [`BlockingClient`]: struct.BlockingClient.html

#![doc(html_root_url = "https://docs.rs/xmlrpc-codec/0.1.0")]
#![warn(missing_debug_implementations)]

mod blocking;
mod client;
mod error;
mod fault;
mod parser;
mod request;
mod ser;
mod transport;
mod utils;
mod value;

pub use crate::blocking::BlockingClient;
pub use crate::client::{Client, Endpoint};
pub use crate::error::{EncodeError, Error, ErrorKind, ParseError, TransportError};
pub use crate::fault::Fault;
pub use crate::parser::{decode_response, parse_request, parse_response, Response};
pub use crate::request::{encode, Request};
pub use crate::ser::to_value;
pub use crate::transport::{Cancelled, HttpResponse, Transport};
pub use crate::utils::EntityPolicy;
pub use crate::value::{Members, Value, MAX_DEPTH};

#[cfg(feature = "http")]
pub use crate::transport::http;
