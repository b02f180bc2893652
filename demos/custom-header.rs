//! This example shows how to transmit a request with a custom HTTP header.

use xmlrpc_codec::http::{build_headers, read_response, DEFAULT_USER_AGENT};
use xmlrpc_codec::{Client, Endpoint, HttpResponse, Transport, Value};

use futures::future::BoxFuture;
use reqwest::header::COOKIE;

use std::error::Error;

/// Custom transport that adds a cookie header.
struct CookieTransport {
    client: reqwest::Client,
    session: String,
}

impl Transport for CookieTransport {
    fn transmit<'a>(
        &'a self,
        endpoint: &'a Endpoint,
        body: Vec<u8>,
    ) -> BoxFuture<'a, Result<HttpResponse, Box<dyn Error + Send + Sync>>> {
        Box::pin(async move {
            let builder = self.client.post(endpoint.url().clone());
            let response = build_headers(builder, DEFAULT_USER_AGENT, body.len() as u64)
                .header(COOKIE, format!("SESSION={}", self.session)) // Our custom header will be a `Cookie` header
                .body(body)
                .send()
                .await?;

            Ok::<_, Box<dyn Error + Send + Sync>>(read_response(response).await?)
        })
    }
}

#[tokio::main]
async fn main() {
    let transport = CookieTransport {
        client: reqwest::Client::new(),
        session: "123abc".to_string(),
    };
    let client = Client::with_transport("http://localhost/xmlrpc.php", transport).unwrap();

    let result = client.call("pow", &[Value::Int(2), Value::Int(8)]).await;

    println!("Result: {:?}", result);
}
