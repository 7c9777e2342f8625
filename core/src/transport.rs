//! Blocking socket transport.
//!
//! # Design
//! One fresh connection per call, closed before returning (the owned stream
//! drops on every exit path). The request is HTTP/1.0, so the response is
//! read until the peer closes the connection — no `Content-Length` or
//! chunked parsing. The original client read without any timeout; bounded
//! connect and I/O timeouts are applied here so a stalled peer cannot hang
//! the caller indefinitely.

use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use rustls::pki_types::ServerName;

use crate::error::{Error, Result};
use crate::http::RawRequest;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const IO_TIMEOUT: Duration = Duration::from_secs(60);

/// Write `request` to `host:port` and return every byte the peer sends back
/// before closing the connection.
pub fn send(request: &RawRequest, host: &str, port: u16, secure: bool) -> Result<Vec<u8>> {
    let tcp = connect(host, port)?;
    let bytes = request.to_bytes();

    if secure {
        let mut stream = tls_stream(host, tcp)?;
        exchange(&mut stream, &bytes)
    } else {
        let mut stream = tcp;
        exchange(&mut stream, &bytes)
    }
}

fn connect(host: &str, port: u16) -> Result<TcpStream> {
    let addrs = (host, port)
        .to_socket_addrs()
        .map_err(|e| Error::io(format!("Error while connecting to {host} ({e})")))?;

    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
            Ok(tcp) => {
                tcp.set_read_timeout(Some(IO_TIMEOUT))
                    .and_then(|_| tcp.set_write_timeout(Some(IO_TIMEOUT)))
                    .map_err(|e| Error::io(format!("Error configuring socket ({e})")))?;
                return Ok(tcp);
            }
            Err(e) => last_err = Some(e),
        }
    }

    Err(match last_err {
        Some(e) => Error::io(format!("Error while connecting to {host} ({e})")),
        None => Error::io(format!("Error while connecting to {host} (no address resolved)")),
    })
}

fn tls_stream(
    host: &str,
    tcp: TcpStream,
) -> Result<rustls::StreamOwned<rustls::ClientConnection, TcpStream>> {
    let roots = rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    let server_name = ServerName::try_from(host.to_string())
        .map_err(|_| Error::io(format!("Invalid TLS server name \"{host}\"")))?;
    let conn = rustls::ClientConnection::new(Arc::new(config), server_name)
        .map_err(|e| Error::io(format!("Error while connecting to {host} (TLS: {e})")))?;
    Ok(rustls::StreamOwned::new(conn, tcp))
}

fn exchange<S: Read + Write>(stream: &mut S, bytes: &[u8]) -> Result<Vec<u8>> {
    stream
        .write_all(bytes)
        .and_then(|_| stream.flush())
        .map_err(|e| Error::io(format!("Error writing on stream ({e})")))?;

    let mut response = Vec::new();
    match stream.read_to_end(&mut response) {
        Ok(_) => Ok(response),
        // Some HTTP/1.0 peers close the socket without a TLS close_notify;
        // data already received is still the complete response.
        Err(e) if e.kind() == ErrorKind::UnexpectedEof && !response.is_empty() => Ok(response),
        Err(e) => Err(Error::io(format!("Error reading from stream ({e})"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Method;
    use std::net::TcpListener;

    /// One-shot server: accepts a single connection, reads the request head,
    /// writes `response` and closes, giving HTTP/1.0 end-of-stream semantics.
    fn one_shot_server(response: &'static [u8]) -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4096];
            let mut head = Vec::new();
            loop {
                let n = socket.read(&mut buf).unwrap();
                head.extend_from_slice(&buf[..n]);
                if n == 0 || head.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            socket.write_all(response).unwrap();
        });
        addr
    }

    fn request() -> RawRequest {
        RawRequest {
            method: Method::Get,
            path: "/rest/k/1/m/?recipientlist_id=2&version=1.8.4".to_string(),
            headers: vec![("Host".to_string(), "localhost".to_string())],
            body: Vec::new(),
        }
    }

    #[test]
    fn reads_full_response_until_stream_close() {
        let payload: &[u8] = b"HTTP/1.0 200 OK\r\nContent-Type: text/xml\r\n\r\n<rsp status=\"ok\"></rsp>";
        let addr = one_shot_server(payload);
        let response = send(&request(), "127.0.0.1", addr.port(), false).unwrap();
        assert_eq!(response, payload);
    }

    #[test]
    fn connection_refused_is_an_io_error() {
        // Bind then drop to get a port with nothing listening.
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let err = send(&request(), "127.0.0.1", addr.port(), false).unwrap_err();
        assert!(err.is_io());
        assert!(err.to_string().contains("Error while connecting"));
    }

    #[test]
    fn empty_response_body_is_returned_as_is() {
        let addr = one_shot_server(b"");
        let response = send(&request(), "127.0.0.1", addr.port(), false).unwrap();
        assert!(response.is_empty());
    }
}
