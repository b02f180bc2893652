//! A thread-blocking client for programs without an async executor.

use crate::client::{Client, Endpoint};
use crate::error::{Error, TransportError};
#[cfg(feature = "http")]
use crate::transport::http::HttpTransport;
use crate::transport::Transport;
use crate::{Request, Value};

use tokio::runtime::{Builder, Runtime};

/// Wraps a [`Client`] and drives its calls on a private single-threaded tokio runtime.
///
/// The methods block the calling thread until the call has completed. They must not be used from
/// within an async context; use [`Client`] directly there.
///
/// [`Client`]: struct.Client.html
#[derive(Debug)]
pub struct BlockingClient<T> {
    client: Client<T>,
    runtime: Runtime,
}

#[cfg(feature = "http")]
impl BlockingClient<HttpTransport> {
    /// Creates a blocking client that talks to `url` over HTTP.
    pub fn new(url: &str) -> Result<Self, Error> {
        Self::with_transport(url, HttpTransport::new())
    }
}

impl<T: Transport> BlockingClient<T> {
    pub fn with_transport(url: &str, transport: T) -> Result<Self, Error> {
        let client = Client::with_transport(url, transport)?;
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| TransportError::Io(Box::new(e)))?;

        Ok(BlockingClient { client, runtime })
    }

    pub fn endpoint(&self) -> &Endpoint {
        self.client.endpoint()
    }

    /// Returns the async client this one drives.
    pub fn client(&self) -> &Client<T> {
        &self.client
    }

    /// Calls `method` with the given arguments, blocking until the server answered.
    ///
    /// Errors are the same as for [`Client::call`].
    ///
    /// [`Client::call`]: struct.Client.html#method.call
    pub fn call(&self, method: &str, args: &[Value]) -> Result<Value, Error> {
        self.runtime.block_on(self.client.call(method, args))
    }

    pub fn send(&self, request: &Request) -> Result<Value, Error> {
        self.runtime.block_on(self.client.send(request))
    }
}
