use crate::error::{Error, ErrorKind, TransportError};
use crate::parser::parse_response;
use crate::transport::{Cancelled, Transport};
#[cfg(feature = "http")]
use crate::transport::http::HttpTransport;
use crate::{Request, Value};

use futures::channel::oneshot;
use log::{debug, trace};
use url::Url;

use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};

/// The address of an XML-RPC endpoint, resolved once when a client is created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    url: Url,
    host: String,
    port: u16,
    path: String,
}

impl Endpoint {
    /// Parses and validates an endpoint URL.
    ///
    /// The scheme must be `http` or `https` and a host is required. Without an explicit port,
    /// 80 or 443 is used. The path defaults to `/` and includes the query string, if any.
    ///
    /// # Errors
    ///
    /// Fails with `ErrorKind::InvalidUrl` if any of the above doesn't hold.
    pub fn parse(input: &str) -> Result<Self, Error> {
        let url = Url::parse(input).map_err(|e| invalid_url(format!("'{}': {}", input, e)))?;

        match url.scheme() {
            "http" | "https" => {}
            other => return Err(invalid_url(format!("unsupported scheme '{}' in '{}'", other, input))),
        }

        let host = match url.host_str() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => return Err(invalid_url(format!("missing host in '{}'", input))),
        };
        let port = url
            .port_or_known_default()
            .ok_or_else(|| invalid_url(format!("missing port in '{}'", input)))?;

        let mut path = match url.path() {
            "" => "/".to_string(),
            path => path.to_string(),
        };
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }

        Ok(Endpoint { url, host, port, path })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// The request target: path plus query string.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Display::fmt(&self.url, f)
    }
}

fn invalid_url(msg: String) -> Error {
    ErrorKind::InvalidUrl(msg).into()
}

/// An XML-RPC client bound to one endpoint.
///
/// Every call is encoded, POSTed exactly once through the transport and decoded. Calls share no
/// mutable state, so one client can serve many concurrent calls.
///
/// ```no_run
/// # async fn run() -> Result<(), xmlrpc_codec::Error> {
/// use xmlrpc_codec::{Client, Value};
///
/// let client = Client::new("http://blog.example.com/xmlrpc.php")?;
/// let post = client
///     .call("metaWeblog.getPost", &[Value::from("2249012"), Value::from("user"), Value::from("secret")])
///     .await?;
/// println!("{:?}", post.get("title"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Client<T> {
    endpoint: Endpoint,
    transport: T,
}

#[cfg(feature = "http")]
impl Client<HttpTransport> {
    /// Creates a client that talks to `url` over HTTP.
    pub fn new(url: &str) -> Result<Self, Error> {
        Self::with_transport(url, HttpTransport::new())
    }
}

impl<T: Transport> Client<T> {
    /// Creates a client that sends its requests through `transport`.
    pub fn with_transport(url: &str, transport: T) -> Result<Self, Error> {
        Ok(Client {
            endpoint: Endpoint::parse(url)?,
            transport,
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Calls `method` with the given arguments and returns the value the server answered with.
    ///
    /// # Errors
    ///
    /// * `ErrorKind::Encode` if the request can't be encoded. Nothing is sent in that case.
    /// * `ErrorKind::Transport` if the exchange failed or the status wasn't 200 or 201.
    /// * `ErrorKind::Parse` if the response isn't a valid `methodResponse`.
    /// * `ErrorKind::Fault` if the server answered with a `<fault>`.
    /// * `ErrorKind::Cancelled` if the transport was cancelled.
    pub async fn call(&self, method: &str, args: &[Value]) -> Result<Value, Error> {
        self.send(&Request::with_args(method, args.to_vec())).await
    }

    /// Performs a prepared `Request`. Same as [`call`] otherwise.
    ///
    /// [`call`]: #method.call
    pub async fn send(&self, request: &Request) -> Result<Value, Error> {
        let body = request.to_xml()?;

        debug!("calling {} at {}", request.name(), self.endpoint);
        trace!("request body: {}", String::from_utf8_lossy(&body));

        let response = self
            .transport
            .transmit(&self.endpoint, body)
            .await
            .map_err(transport_failure)?;

        trace!("response body ({}): {}", response.status, String::from_utf8_lossy(&response.body));

        if response.status != 200 && response.status != 201 {
            debug!("{} at {} failed with HTTP status {}", request.name(), self.endpoint, response.status);
            return Err(TransportError::Status {
                status: response.status,
                body: response.body,
            }
            .into());
        }

        match parse_response(&mut response.body.as_slice())? {
            Ok(value) => Ok(value),
            Err(fault) => {
                debug!("{} at {} returned a fault: {}", request.name(), self.endpoint, fault);
                Err(fault.into())
            }
        }
    }
}

fn transport_failure(err: Box<dyn StdError + Send + Sync>) -> Error {
    if err.is::<Cancelled>() || err.is::<oneshot::Canceled>() {
        ErrorKind::Cancelled.into()
    } else {
        TransportError::Io(err).into()
    }
}
