//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves fixed bodies by path, with per-path redirects and injectable
//! error statuses. Routes can be swapped mid-test to simulate a document
//! changing upstream.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Clone)]
enum Route {
    Body(Vec<u8>),
    Redirect(String),
    Status(u32),
}

#[derive(Clone)]
pub struct DocServer {
    routes: Arc<Mutex<HashMap<String, Route>>>,
    base: String,
}

impl DocServer {
    /// Starts a server in a background thread. The server runs until the
    /// process exits.
    pub fn start() -> DocServer {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let routes: Arc<Mutex<HashMap<String, Route>>> = Arc::new(Mutex::new(HashMap::new()));
        let server_routes = Arc::clone(&routes);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let routes = Arc::clone(&server_routes);
                thread::spawn(move || handle(stream, &routes));
            }
        });
        DocServer {
            routes,
            base: format!("http://127.0.0.1:{}", port),
        }
    }

    /// Absolute URL for a path on this server.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Serve `body` at `path` with status 200.
    pub fn set_body(&self, path: &str, body: impl Into<Vec<u8>>) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), Route::Body(body.into()));
    }

    /// Serve a 302 redirect from `path` to `location` (absolute URL).
    pub fn set_redirect(&self, path: &str, location: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), Route::Redirect(location.to_string()));
    }

    /// Serve a bare status code (e.g. 500) at `path`.
    pub fn set_status(&self, path: &str, code: u32) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), Route::Status(code));
    }
}

fn handle(mut stream: std::net::TcpStream, routes: &Mutex<HashMap<String, Route>>) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let Some((method, path)) = parse_request_line(request) else {
        return;
    };
    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\n\r\n");
        return;
    }

    let route = routes.lock().unwrap().get(path).cloned();
    match route {
        Some(Route::Body(body)) => {
            let header = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nContent-Type: application/pdf\r\n\r\n",
                body.len()
            );
            let _ = stream.write_all(header.as_bytes());
            let _ = stream.write_all(&body);
        }
        Some(Route::Redirect(location)) => {
            let response = format!(
                "HTTP/1.1 302 Found\r\nLocation: {}\r\nContent-Length: 0\r\n\r\n",
                location
            );
            let _ = stream.write_all(response.as_bytes());
        }
        Some(Route::Status(code)) => {
            let response = format!("HTTP/1.1 {} Error\r\nContent-Length: 0\r\n\r\n", code);
            let _ = stream.write_all(response.as_bytes());
        }
        None => {
            let _ = stream.write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n");
        }
    }
}

/// Returns (method, path) from the request line.
fn parse_request_line(request: &str) -> Option<(&str, &str)> {
    let line = request.lines().next()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?;
    let path = parts.next()?;
    Some((method, path))
}
