use crate::client::Endpoint;

use futures::future::BoxFuture;

use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

/// What came back from one HTTP exchange: the status code and the raw body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Request and response transport abstraction.
///
/// The `Transport` trait provides a way to POST an encoded `methodCall` document to an endpoint
/// and to receive the server's answer. A [`Client`] owns a `Transport` and uses it for every call.
///
/// The most commonly used transport is simple HTTP: If the `http` feature is enabled (it is by
/// default), [`http::HttpTransport`] sends the request via reqwest.
///
/// You can implement this trait for your own types if you want to customize how requests are sent.
/// You can modify HTTP headers or wrap requests in a completely different protocol.
///
/// [`Client`]: struct.Client.html
/// [`http::HttpTransport`]: http/struct.HttpTransport.html
pub trait Transport: Send + Sync {
    /// Transmits an XML-RPC request body and returns the server's response.
    ///
    /// The transport must not interpret the status code; the client decides which statuses carry
    /// a parseable body.
    ///
    /// # Errors
    ///
    /// If a transport error occurs, it should be returned as a boxed error. Returning a
    /// [`Cancelled`] error (or a `futures` oneshot `Canceled`) makes the call fail with
    /// `ErrorKind::Cancelled`; anything else becomes `TransportError::Io`.
    ///
    /// [`Cancelled`]: struct.Cancelled.html
    fn transmit<'a>(
        &'a self,
        endpoint: &'a Endpoint,
        body: Vec<u8>,
    ) -> BoxFuture<'a, Result<HttpResponse, Box<dyn Error + Send + Sync>>>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn transmit<'a>(
        &'a self,
        endpoint: &'a Endpoint,
        body: Vec<u8>,
    ) -> BoxFuture<'a, Result<HttpResponse, Box<dyn Error + Send + Sync>>> {
        (**self).transmit(endpoint, body)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn transmit<'a>(
        &'a self,
        endpoint: &'a Endpoint,
        body: Vec<u8>,
    ) -> BoxFuture<'a, Result<HttpResponse, Box<dyn Error + Send + Sync>>> {
        (**self).transmit(endpoint, body)
    }
}

/// Error a `Transport` returns when the exchange was aborted before a response arrived.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cancelled;

impl Display for Cancelled {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str("transport operation was cancelled")
    }
}

impl Error for Cancelled {}

/// Provides an HTTP transport based on reqwest, and helpers for building custom ones.
///
/// This module will be disabled if the `http` feature is not enabled.
///
/// [`HttpTransport`] looks roughly like this:
///
/// ```notrust
/// // `body` is the encoded request (a `Vec<u8>`)
///
/// build_headers(client.post(url), user_agent, body.len());
///
/// // send `body` and wait for the response
///
/// read_response(response)
/// ```
///
/// From this, you can build your own custom transports.
///
/// [`HttpTransport`]: struct.HttpTransport.html
#[cfg(feature = "http")]
pub mod http {
    use super::{HttpResponse, Transport};
    use crate::client::Endpoint;

    use futures::future::BoxFuture;
    use log::warn;
    use mime::Mime;
    use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, USER_AGENT};
    use reqwest::{Client, RequestBuilder, Response};

    use std::error::Error;

    /// The `User-Agent` sent by `HttpTransport` unless configured otherwise.
    pub const DEFAULT_USER_AGENT: &str = "Rust xmlrpc-codec";

    /// Appends all HTTP headers required by the XML-RPC specification to the `RequestBuilder`.
    ///
    /// More specifically, the following headers are set:
    ///
    /// ```notrust
    /// User-Agent: $user_agent
    /// Content-Type: text/xml; charset=utf-8
    /// Content-Length: $body_len
    /// ```
    pub fn build_headers(builder: RequestBuilder, user_agent: &str, body_len: u64) -> RequestBuilder {
        // NB: The `Host` header is also required, but reqwest adds it automatically, since
        // HTTP/1.1 requires it.
        builder
            .header(USER_AGENT, user_agent)
            .header(CONTENT_TYPE, format!("{}; charset=utf-8", mime::TEXT_XML))
            .header(CONTENT_LENGTH, body_len)
    }

    /// Collects the status code and body of a reqwest `Response`.
    ///
    /// The status is not checked here. A successful response that doesn't declare an XML
    /// `Content-Type` is logged but still returned, since plenty of blog engines get this wrong.
    pub async fn read_response(response: Response) -> Result<HttpResponse, reqwest::Error> {
        let status = response.status();

        if status.is_success() {
            if let Some(content) = response.headers().get(CONTENT_TYPE) {
                // (we ignore this if the header is missing completely)
                let mime = content.to_str().ok().and_then(|s| s.parse::<Mime>().ok());
                match mime {
                    Some(ref mime) if mime.subtype() == mime::XML => {}
                    _ => warn!("expected an XML Content-Type, got {:?}", content),
                }
            }
        }

        let body = response.bytes().await?;
        Ok(HttpResponse {
            status: status.as_u16(),
            body: body.to_vec(),
        })
    }

    /// Sends requests as HTTP POSTs using a shared reqwest `Client`.
    ///
    /// Cloning is cheap; clones share the connection pool.
    #[derive(Clone, Debug)]
    pub struct HttpTransport {
        client: Client,
        user_agent: String,
    }

    impl HttpTransport {
        /// Creates a transport with a default reqwest `Client`.
        pub fn new() -> Self {
            Self::from_client(Client::new())
        }

        /// Creates a transport that uses an existing reqwest `Client`, for example one with
        /// timeouts or proxies configured.
        pub fn from_client(client: Client) -> Self {
            HttpTransport {
                client,
                user_agent: DEFAULT_USER_AGENT.to_string(),
            }
        }

        /// Sets the `User-Agent` header sent with every request.
        pub fn with_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
            self.user_agent = user_agent.into();
            self
        }

        pub fn user_agent(&self) -> &str {
            &self.user_agent
        }
    }

    impl Default for HttpTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Transport for HttpTransport {
        fn transmit<'a>(
            &'a self,
            endpoint: &'a Endpoint,
            body: Vec<u8>,
        ) -> BoxFuture<'a, Result<HttpResponse, Box<dyn Error + Send + Sync>>> {
            Box::pin(async move {
                let builder = self.client.post(endpoint.url().clone());
                let response = build_headers(builder, &self.user_agent, body.len() as u64)
                    .body(body)
                    .send()
                    .await?;

                Ok::<_, Box<dyn Error + Send + Sync>>(read_response(response).await?)
            })
        }
    }
}
