//! Raw HTTP request types.
//!
//! # Design
//! A request is described as plain data (`RawRequest`) and only turned into
//! bytes at the transport boundary. HTTP/1.0 is used deliberately: the server
//! closes the connection when the response is complete, so the transport can
//! read to end-of-stream instead of parsing `Content-Length` or chunked
//! framing.

/// HTTP method for a request. The API only speaks GET and POST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// An HTTP/1.0 request described as plain data.
///
/// Built by the request encoder; the transport writes `to_bytes()` to the
/// socket verbatim. `path` already contains the full query string; `body` is
/// empty for GET.
#[derive(Debug, Clone)]
pub struct RawRequest {
    pub method: Method,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawRequest {
    /// Serialize the request line, headers, blank line and body into the
    /// exact byte sequence written to the wire.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut head = format!("{} {} HTTP/1.0\r\n", self.method.as_str(), self.path);
        for (name, value) in &self.headers {
            head.push_str(name);
            head.push_str(": ");
            head.push_str(value);
            head.push_str("\r\n");
        }
        head.push_str("\r\n");

        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(&self.body);
        bytes
    }
}
