//! Fetches a URL and prints the response.
//!
//! ```text
//! cargo run --example fetch -- http://127.0.0.1:8080/ "Accept: text/html"
//! ```

use std::env;
use std::process::ExitCode;

use micro_http_message::protocol::{CONNECT_TIMEOUT, HttpMessage, Request, TIMEOUT};
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

fn main() -> ExitCode {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let mut args = env::args().skip(1);
    let Some(url) = args.next() else {
        error!("usage: fetch <url> [header line]...");
        return ExitCode::FAILURE;
    };
    let header_lines: Vec<String> = args.collect();
    let header_lines: Vec<&str> = header_lines.iter().map(String::as_str).collect();

    let mut request = match Request::new("GET", &url) {
        Ok(request) => request.with_option(CONNECT_TIMEOUT, 3_i64).with_option(TIMEOUT, 10_i64),
        Err(e) => {
            error!(cause = %e, url, "invalid request");
            return ExitCode::FAILURE;
        }
    };

    match request.send("", &header_lines) {
        Ok(mut response) => {
            info!(status = response.status_code(), reason = response.reason_phrase(), "received response");
            for (name, value) in response.headers() {
                println!("{name}: {}", value.to_str().unwrap_or("<binary>"));
            }
            println!();
            println!("{}", response.content());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(cause = %e, "request failed");
            ExitCode::FAILURE
        }
    }
}
