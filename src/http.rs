//! Minimal HTTP handling
//!
//! Only the request line is looked at. Responses are canned byte strings;
//! there is no general HTTP machinery here.

use crate::stream::mjpeg::STREAM_CONTENT_TYPE;

/// Upper bound on the bytes read for a request
pub const MAX_REQUEST_BYTES: usize = 8 * 1024;

/// Landing page with an `<img>` pointed at the stream
pub const INDEX_HTML: &str = include_str!("../assets/index.html");

/// Method and path of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: String,
    pub path: String,
}

/// Parse the first line of a request.
///
/// Returns `None` for an empty request or a line with fewer than two
/// space-separated tokens.
pub fn parse_request_line(data: &[u8]) -> Option<RequestLine> {
    if data.is_empty() {
        return None;
    }

    let text = String::from_utf8_lossy(data);
    let line = text.split("\r\n").next().unwrap_or_default();
    let mut tokens = line.split(' ');
    let method = tokens.next()?;
    let path = tokens.next()?;

    Some(RequestLine {
        method: method.to_string(),
        path: path.to_string(),
    })
}

/// What a request path resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Index,
    Stream,
    NotFound,
}

impl Route {
    pub fn resolve(path: &str) -> Self {
        if path == "/" || path.starts_with("/index") {
            Route::Index
        } else if path == "/stream.mjpeg" || path == "/stream" {
            Route::Stream
        } else {
            Route::NotFound
        }
    }
}

/// `200 OK` with the landing page; the connection closes afterwards
pub fn index_response() -> Vec<u8> {
    let body = INDEX_HTML.as_bytes();
    let mut response = format!(
        "HTTP/1.1 200 OK\r\n\
         Content-Type: text/html; charset=utf-8\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\r\n",
        body.len()
    )
    .into_bytes();
    response.extend_from_slice(body);
    response
}

/// Response head for the MJPEG stream; parts follow indefinitely
pub fn stream_response_head() -> Vec<u8> {
    format!(
        "HTTP/1.1 200 OK\r\n\
         Content-Type: {}\r\n\
         Cache-Control: no-cache\r\n\
         Connection: keep-alive\r\n\r\n",
        STREAM_CONTENT_TYPE
    )
    .into_bytes()
}

/// `404 Not Found`; the connection closes afterwards
pub fn not_found_response() -> &'static [u8] {
    b"HTTP/1.1 404 Not Found\r\n\
      Content-Type: text/plain\r\n\
      Connection: close\r\n\r\n\
      404 Not Found"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request_line() {
        let req = parse_request_line(b"GET /stream HTTP/1.1\r\nHost: x\r\n\r\n").unwrap();
        assert_eq!(req.method, "GET");
        assert_eq!(req.path, "/stream");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_request_line(b"").is_none());
        assert!(parse_request_line(b"GET\r\n\r\n").is_none());
        assert!(parse_request_line(b"\r\n").is_none());
    }

    #[test]
    fn test_parse_without_version() {
        let req = parse_request_line(b"GET /index.html").unwrap();
        assert_eq!(req.path, "/index.html");
    }

    #[test]
    fn test_routes() {
        assert_eq!(Route::resolve("/"), Route::Index);
        assert_eq!(Route::resolve("/index.html"), Route::Index);
        assert_eq!(Route::resolve("/indexes"), Route::Index);
        assert_eq!(Route::resolve("/stream"), Route::Stream);
        assert_eq!(Route::resolve("/stream.mjpeg"), Route::Stream);
        assert_eq!(Route::resolve("/stream.mjpeg?t=1"), Route::NotFound);
        assert_eq!(Route::resolve("/nope"), Route::NotFound);
        assert_eq!(Route::resolve(""), Route::NotFound);
    }

    #[test]
    fn test_index_content_length_matches_body() {
        let response = String::from_utf8(index_response()).unwrap();
        let (head, body) = response.split_once("\r\n\r\n").unwrap();
        assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(head.contains("Content-Type: text/html; charset=utf-8"));
        assert!(head.contains(&format!("Content-Length: {}", body.len())));
        assert!(body.contains("stream.mjpeg"));
    }

    #[test]
    fn test_stream_head() {
        let head = String::from_utf8(stream_response_head()).unwrap();
        assert_eq!(
            head,
            "HTTP/1.1 200 OK\r\n\
             Content-Type: multipart/x-mixed-replace; boundary=--boundary\r\n\
             Cache-Control: no-cache\r\n\
             Connection: keep-alive\r\n\r\n"
        );
    }

    #[test]
    fn test_not_found_body() {
        let response = std::str::from_utf8(not_found_response()).unwrap();
        assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(response.ends_with("\r\n\r\n404 Not Found"));
    }
}
