//! Exercises the reqwest transport against a canned in-process HTTP server.

use xmlrpc_codec::http::HttpTransport;
use xmlrpc_codec::{parse_request, Client, ErrorKind, Request, TransportError, Value};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// What the server received.
struct Captured {
    head: String,
    body: Vec<u8>,
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

fn content_length(head: &str) -> usize {
    head.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

/// Accepts one connection, answers it with `status` and `response`, and reports the request.
async fn serve_once(
    status: &'static str,
    content_type: &'static str,
    response: &'static str,
) -> (String, oneshot::Receiver<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];

        let header_end = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before the headers were complete");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = find(&buf, b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8(buf[..header_end].to_vec()).unwrap();
        let len = content_length(&head);
        while buf.len() < header_end + len {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before the body was complete");
            buf.extend_from_slice(&chunk[..n]);
        }
        let body = buf[header_end..header_end + len].to_vec();

        let answer = format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            content_type,
            response.len(),
            response
        );
        stream.write_all(answer.as_bytes()).await.unwrap();
        stream.shutdown().await.ok();

        let _ = tx.send(Captured { head, body });
    });

    (format!("http://{}/xmlrpc.php", addr), rx)
}

const POST: &str = r#"<?xml version="1.0"?>
<methodResponse>
  <params>
    <param>
      <value><struct>
        <member><name>postid</name><value><string>2249012</string></value></member>
        <member><name>title</name><value><string>Hello &amp; welcome</string></value></member>
        <member><name>dateCreated</name><value><dateTime.iso8601>20111130T09:45:12</dateTime.iso8601></value></member>
        <member><name>categories</name><value><array><data>
          <value><string>rust</string></value>
        </data></array></value></member>
      </struct></value>
    </param>
  </params>
</methodResponse>"#;

const NOT_FOUND: &str = r#"<?xml version="1.0"?>
<methodResponse>
  <fault>
    <value><struct>
      <member><name>faultCode</name><value><int>404</int></value></member>
      <member><name>faultString</name><value><string>Not Found</string></value></member>
    </struct></value>
  </fault>
</methodResponse>"#;

#[tokio::test]
async fn call_roundtrip() {
    let (url, captured) = serve_once("200 OK", "text/xml", POST).await;
    let client = Client::new(&url).unwrap();

    let args = [Value::from("2249012"), Value::from("fengmk2"), Value::from("secret")];
    let post = client.call("metaWeblog.getPost", &args).await.unwrap();

    assert_eq!(post.get("title"), Some(&Value::from("Hello & welcome")));
    assert_eq!(
        post.get("dateCreated"),
        Some(&Value::from(iso8601::datetime("2011-11-30T09:45:12Z").unwrap()))
    );
    assert_eq!(post.get("categories"), Some(&Value::Array(vec![Value::from("rust")])));

    let captured = captured.await.unwrap();
    let head = captured.head.to_ascii_lowercase();
    assert!(head.starts_with("post /xmlrpc.php http/1.1\r\n"), "{}", head);
    assert!(head.contains("content-type: text/xml; charset=utf-8\r\n"), "{}", head);
    assert!(head.contains("user-agent: rust xmlrpc-codec\r\n"), "{}", head);
    assert!(head.contains(&format!("content-length: {}\r\n", captured.body.len())), "{}", head);

    let request = parse_request(&mut captured.body.as_slice()).unwrap();
    assert_eq!(request, Request::with_args("metaWeblog.getPost", args.to_vec()));
}

#[tokio::test]
async fn fault() {
    let (url, _captured) = serve_once("200 OK", "text/xml", NOT_FOUND).await;
    let client = Client::new(&url).unwrap();

    let err = client.call("metaWeblog.getPost", &[Value::from("0")]).await.unwrap_err();
    let fault = err.fault().expect("expected a fault");
    assert_eq!(fault.code(), 404);
    assert_eq!(fault.string(), "Not Found");
}

#[tokio::test]
async fn error_status() {
    let (url, _captured) = serve_once("500 Internal Server Error", "text/plain", "Internal Error").await;
    let client = Client::new(&url).unwrap();

    let err = client.call("blogger.deletePost", &[]).await.unwrap_err();
    match err.into_kind() {
        ErrorKind::Transport(TransportError::Status { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, b"Internal Error");
        }
        other => panic!("expected an HTTP status error, got {:?}", other),
    }
}

#[tokio::test]
async fn lenient_content_type() {
    let (url, _captured) = serve_once(
        "200 OK",
        "text/html; charset=UTF-8",
        "<methodResponse><params><param><value><boolean>1</boolean></value></param></params></methodResponse>",
    )
    .await;
    let client = Client::new(&url).unwrap();

    assert_eq!(client.call("blogger.deletePost", &[]).await.unwrap(), Value::Bool(true));
}

#[tokio::test]
async fn custom_user_agent() {
    let (url, captured) = serve_once(
        "200 OK",
        "text/xml",
        "<methodResponse><params><param><value>ok</value></param></params></methodResponse>",
    )
    .await;
    let transport = HttpTransport::new().with_user_agent("blog-sync/2.0");
    let client = Client::with_transport(&url, transport).unwrap();

    client.call("m", &[]).await.unwrap();

    let head = captured.await.unwrap().head.to_ascii_lowercase();
    assert!(head.contains("user-agent: blog-sync/2.0\r\n"), "{}", head);
}

#[tokio::test]
async fn connection_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = Client::new(&format!("http://{}/", addr)).unwrap();
    match client.call("m", &[]).await.unwrap_err().into_kind() {
        ErrorKind::Transport(TransportError::Io(_)) => {}
        other => panic!("expected an I/O error, got {:?}", other),
    }
}
