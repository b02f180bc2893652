//! You can use this example by executing `python3 -m xmlrpc.server` and then running
//! `cargo run --example client`.

use xmlrpc_codec::{Client, Request, Value};

#[tokio::main]
async fn main() {
    let client = Client::new("http://127.0.0.1:8000").unwrap();

    // The Python example server exports Python's `pow` method. Let's call it!
    let pow_request = Request::new("pow").arg(2).arg(8);    // Compute 2**8

    let result = client.send(&pow_request).await;

    println!("Result: {:?}", result);

    // Faults, transport failures and malformed responses all end up in the `Err` case.
    let pow_result = result.unwrap();
    assert_eq!(pow_result, Value::Int(2i32.pow(8)));
}
