//! Minimal HTTP/1.1 server with HEAD + Range GET support for integration
//! tests, plus failure injection: 403-before-refresh, truncated bodies, and
//! stalled transfers.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default)]
pub struct ServerOptions {
    /// HEAD reports this length instead of the body's real size.
    pub content_length_override: Option<u64>,
    /// The first N GETs are answered with 403 (expired link).
    pub reject_gets_with_403: usize,
    /// The first N GETs advertise the full slice but send only half of it.
    pub truncate_gets: usize,
    /// GETs send headers and then no body at all (stalled transfer).
    pub stall_gets: bool,
}

/// One request as seen by the server.
#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub method: String,
    pub range: Option<String>,
    pub referer: Option<String>,
}

pub struct TestServer {
    pub url: String,
    log: Arc<Mutex<Vec<RequestRecord>>>,
}

impl TestServer {
    pub fn requests(&self) -> Vec<RequestRecord> {
        self.log.lock().unwrap().clone()
    }

    pub fn get_count(&self) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method.eq_ignore_ascii_case("GET"))
            .count()
    }
}

/// Serve `body` on a background thread until the test process exits.
pub fn start(body: Vec<u8>) -> TestServer {
    start_with_options(body, ServerOptions::default())
}

pub fn start_with_options(body: Vec<u8>, opts: ServerOptions) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    let log: Arc<Mutex<Vec<RequestRecord>>> = Arc::new(Mutex::new(Vec::new()));
    let gets_rejected = Arc::new(AtomicUsize::new(0));
    let gets_truncated = Arc::new(AtomicUsize::new(0));

    let log_for_server = Arc::clone(&log);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            let log = Arc::clone(&log_for_server);
            let rejected = Arc::clone(&gets_rejected);
            let truncated = Arc::clone(&gets_truncated);
            thread::spawn(move || handle(stream, &body, opts, &log, &rejected, &truncated));
        }
    });

    TestServer {
        url: format!("http://127.0.0.1:{}/product.bin", port),
        log,
    }
}

fn handle(
    mut stream: TcpStream,
    body: &[u8],
    opts: ServerOptions,
    log: &Mutex<Vec<RequestRecord>>,
    rejected: &AtomicUsize,
    truncated: &AtomicUsize,
) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let Ok(request) = std::str::from_utf8(&buf[..n]) else {
        return;
    };
    let record = parse_request(request);
    let method = record.method.clone();
    let range = record.range.clone();
    log.lock().unwrap().push(record);

    let advertised = opts
        .content_length_override
        .unwrap_or(body.len() as u64);

    if method.eq_ignore_ascii_case("HEAD") {
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nAccept-Ranges: bytes\r\n\r\n",
            advertised
        );
        let _ = stream.write_all(response.as_bytes());
        return;
    }
    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\n\r\n");
        return;
    }

    if rejected.fetch_add(1, Ordering::SeqCst) < opts.reject_gets_with_403 {
        let _ = stream.write_all(b"HTTP/1.1 403 Forbidden\r\nContent-Length: 0\r\n\r\n");
        return;
    }

    let total = body.len() as u64;
    let (status, slice, content_range) = match parse_range(range.as_deref()) {
        Some((start, end_incl)) => {
            let start = start.min(total);
            let end_incl = end_incl.min(total.saturating_sub(1));
            if start > end_incl {
                (
                    "416 Range Not Satisfiable",
                    &body[0..0],
                    format!("bytes */{}", total),
                )
            } else {
                (
                    "206 Partial Content",
                    &body[start as usize..=end_incl as usize],
                    format!("bytes {}-{}/{}", start, end_incl, total),
                )
            }
        }
        None => (
            "200 OK",
            body,
            format!("bytes 0-{}/{}", total.saturating_sub(1), total),
        ),
    };

    let header = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nContent-Range: {}\r\nAccept-Ranges: bytes\r\n\r\n",
        status,
        slice.len(),
        content_range
    );
    let _ = stream.write_all(header.as_bytes());

    if opts.stall_gets {
        // Headers only; keep the socket open and starve the client.
        thread::sleep(Duration::from_secs(30));
        return;
    }
    if truncated.fetch_add(1, Ordering::SeqCst) < opts.truncate_gets {
        let half = slice.len() / 2;
        let _ = stream.write_all(&slice[..half]);
        // Closing early leaves the client short of Content-Length.
        return;
    }
    let _ = stream.write_all(slice);
}

fn parse_request(request: &str) -> RequestRecord {
    let mut record = RequestRecord {
        method: String::new(),
        range: None,
        referer: None,
    };
    for (i, line) in request.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if i == 0 {
            record.method = line.split_whitespace().next().unwrap_or("").to_string();
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            let value = value.trim().to_string();
            if name.trim().eq_ignore_ascii_case("range") {
                record.range = Some(value);
            } else if name.trim().eq_ignore_ascii_case("referer") {
                record.referer = Some(value);
            }
        }
    }
    record
}

/// `bytes=X-Y` → (X, Y inclusive).
fn parse_range(value: Option<&str>) -> Option<(u64, u64)> {
    let value = value?.trim();
    let spec = value.strip_prefix("bytes=")?;
    let (a, b) = spec.split_once('-')?;
    let start = a.trim().parse::<u64>().ok()?;
    let end = if b.trim().is_empty() {
        u64::MAX
    } else {
        b.trim().parse::<u64>().ok()?
    };
    Some((start, end))
}
