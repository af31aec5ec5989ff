//! End-to-end transfers against a one-shot loopback server.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use flate2::Compression;
use flate2::write::GzEncoder;
use micro_http_message::protocol::{
    DEFAULT_USER_AGENT, HttpMessage, QueryMap, Request, Stream, TIMEOUT, TransferError,
};
use micro_http_message::transfer::{TcpTransport, Transport};

/// Serves one connection: records the raw request and answers with `response`.
fn serve_once(response: Vec<u8>) -> (String, mpsc::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();

        let mut request = Vec::new();
        let mut buf = [0_u8; 1024];
        loop {
            let n = stream.read(&mut buf).unwrap();
            request.extend_from_slice(&buf[..n]);
            if n == 0 || request_complete(&request) {
                break;
            }
        }

        stream.write_all(&response).unwrap();
        tx.send(String::from_utf8_lossy(&request).into_owned()).unwrap();
    });

    (format!("http://{addr}"), rx)
}

fn request_complete(raw: &[u8]) -> bool {
    let text = String::from_utf8_lossy(raw);
    let Some((head, body)) = text.split_once("\r\n\r\n") else {
        return false;
    };
    let length = head
        .lines()
        .find_map(|line| line.to_ascii_lowercase().strip_prefix("content-length:").map(|v| v.trim().parse::<usize>().unwrap()))
        .unwrap_or(0);
    body.len() >= length
}

#[test]
fn get_with_query_payload() {
    let (base, rx) = serve_once(b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 5\r\n\r\nhello".to_vec());

    let mut request = Request::new("get", &format!("{base}/search?page=2")).unwrap().with_option(TIMEOUT, 5_i64);
    let mut response = request.send("q=rust", &["X-Trace: 1", "Expect: 100-continue"]).unwrap();

    assert_eq!(response.status_code(), 200);
    assert_eq!(response.content(), "hello");
    assert_eq!(response.content_type().as_deref(), Some("text/plain"));

    let raw = rx.recv().unwrap();
    assert!(raw.starts_with("GET /search?page=2&q=rust HTTP/1.1\r\n"), "{raw}");
    assert!(raw.contains("X-Trace: 1\r\n"));
    assert!(raw.contains(&format!("User-Agent: {DEFAULT_USER_AGENT}\r\n")));
    assert!(raw.contains("Accept-Encoding: gzip, deflate, br, zstd\r\n"));
    assert!(!raw.to_ascii_lowercase().contains("expect:"));
}

#[test]
fn post_form_body() {
    let (base, rx) = serve_once(b"HTTP/1.1 201 Created\r\nLocation: /users/7\r\nContent-Length: 0\r\n\r\n".to_vec());

    let mut params = QueryMap::new();
    params.insert("name", "jan huang");
    params.insert("roles", QueryMap::parse("0=admin"));

    let mut request = Request::new("POST", &format!("{base}/users")).unwrap();
    let response = request.send(&params, &["Content-Type: application/x-www-form-urlencoded"]).unwrap();

    assert_eq!(response.status_code(), 201);
    assert_eq!(response.header_line("location").as_deref(), Some("/users/7"));

    let raw = rx.recv().unwrap();
    assert!(raw.starts_with("POST /users HTTP/1.1\r\n"));
    assert!(raw.contains("Content-Length: 33\r\n"), "{raw}");
    assert!(raw.ends_with("\r\n\r\nname=jan+huang&roles%5B0%5D=admin"), "{raw}");
}

#[test]
fn put_sends_the_message_body() {
    let (base, rx) = serve_once(b"HTTP/1.1 204 No Content\r\n\r\n".to_vec());

    let mut request = Request::new("PUT", &format!("{base}/doc")).unwrap().with_body(Stream::from_bytes("document"));
    let response = request.send("", &[]).unwrap();

    assert!(response.is_empty());
    assert!(rx.recv().unwrap().ends_with("\r\n\r\ndocument"));
}

#[test]
fn chunked_gzip_response() {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(b"compressed and chunked").unwrap();
    let gzipped = encoder.finish().unwrap();

    let (first, second) = gzipped.split_at(gzipped.len() / 2);
    let mut response = b"HTTP/1.1 200 OK\r\nContent-Encoding: gzip\r\nTransfer-Encoding: chunked\r\nVary: a\r\nvary: b\r\n\r\n".to_vec();
    for part in [first, second] {
        response.extend_from_slice(format!("{:x}\r\n", part.len()).as_bytes());
        response.extend_from_slice(part);
        response.extend_from_slice(b"\r\n");
    }
    response.extend_from_slice(b"0\r\n\r\n");

    let (base, _rx) = serve_once(response);
    let mut response = Request::new("GET", &base).unwrap().send("", &["Accept-Encoding: gzip"]).unwrap();

    assert_eq!(response.content(), "compressed and chunked");
    assert_eq!(response.header_line("vary").as_deref(), Some("a,b"));
}

#[test]
fn close_delimited_error_response() {
    let (base, _rx) = serve_once(b"HTTP/1.0 500 Internal Server Error\r\nServer: legacy\r\n\r\nboom".to_vec());

    let mut response = Request::new("GET", &base).unwrap().send("", &[]).unwrap();

    assert!(response.is_server_error());
    assert_eq!(response.protocol_version(), "1.0");
    assert_eq!(response.content(), "boom");
}

#[test]
fn head_request_reads_no_body() {
    let (base, _rx) = serve_once(b"HTTP/1.1 200 OK\r\nContent-Length: 1024\r\n\r\n".to_vec());

    let mut response = Request::new("HEAD", &base).unwrap().send("", &[]).unwrap();

    assert_eq!(response.header_line("content-length").as_deref(), Some("1024"));
    assert_eq!(response.content(), "");
}

#[test]
fn truncated_response_is_a_transfer_error() {
    let (base, _rx) = serve_once(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\nshort".to_vec());

    let err = Request::new("GET", &base).unwrap().send("", &[]).unwrap_err();
    assert!(matches!(err, TransferError::Response { .. }), "{err}");
}

#[test]
fn refused_connection() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let mut request = Request::new("GET", &format!("http://127.0.0.1:{port}/")).unwrap();
    let err = request.send_with(&TcpTransport::new(), "", &[]).unwrap_err();
    assert!(matches!(err, TransferError::Connect { .. }), "{err}");
}

#[test]
fn transport_trait_object() {
    let (base, _rx) = serve_once(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok".to_vec());
    let transport: Box<dyn Transport> = Box::new(TcpTransport::new().with_read_buffer_size(3));

    let mut response = Request::new("OPTIONS", &base).unwrap().send_with(transport.as_ref(), "", &[]).unwrap();
    assert_eq!(response.content(), "ok");
}
