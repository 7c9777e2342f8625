//! Request encoder: parameter maps to raw HTTP/1.0 requests.
//!
//! # Design
//! GET parameters land in the query string; POST parameters become a
//! `multipart/form-data` body. The two paths use different array markers
//! (`key[]=v` in the query string vs `name="key[]"` form fields) — the
//! server's parsing expectations differ per method, so the conventions are
//! kept separate on purpose.
//!
//! Scalar and list part values terminate with a bare `\n`, file parts with
//! `\r\n`; the service has always been fed exactly this framing.

use std::fs;
use std::path::Path;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::http::{Method, RawRequest};
use crate::types::{Endpoint, Params, Value, VERSION};

/// Build the complete raw request for one API call.
///
/// The path is `/rest/{api_key}/{node_id}/{module}/` with `recipientlist_id`
/// and the protocol `version` always appended. File parameters are read
/// fully into the body here; a missing file fails with [`Error::Io`] before
/// any network I/O happens.
pub fn build_request(
    endpoint: &Endpoint,
    module: &str,
    params: &Params,
    method: Method,
) -> Result<RawRequest> {
    let mut path = format!(
        "/rest/{}/{}/{}/?recipientlist_id={}&version={}",
        endpoint.api_key, endpoint.node_id, module, endpoint.recipientlist_id, VERSION
    );

    let mut headers = vec![("Host".to_string(), endpoint.host.clone())];
    let mut body = Vec::new();

    match method {
        Method::Get => {
            for (key, value) in params {
                encode_query_param(&mut path, key, value);
            }
        }
        Method::Post => {
            let boundary = Uuid::new_v4().simple().to_string();
            body = encode_multipart(params, &boundary)?;
            headers.push((
                "Content-Type".to_string(),
                format!("multipart/form-data; boundary={boundary}"),
            ));
            headers.push(("Content-Length".to_string(), body.len().to_string()));
        }
    }

    Ok(RawRequest {
        method,
        path,
        headers,
        body,
    })
}

/// Append one parameter to the query string. Lists emit one `key[]=` entry
/// per element in order; empty lists contribute nothing. A file value has no
/// dedicated GET encoding — its path string is encoded like a scalar (file
/// parameters are only meaningful with POST).
fn encode_query_param(path: &mut String, key: &str, value: &Value) {
    match value {
        Value::Scalar(s) => {
            path.push('&');
            path.push_str(key);
            path.push('=');
            path.push_str(&urlencoding::encode(s));
        }
        Value::List(items) => {
            for item in items {
                path.push('&');
                path.push_str(key);
                path.push_str("[]=");
                path.push_str(&urlencoding::encode(item));
            }
        }
        Value::File(p) => {
            path.push('&');
            path.push_str(key);
            path.push('=');
            path.push_str(&urlencoding::encode(&p.to_string_lossy()));
        }
    }
}

/// Assemble the multipart/form-data body, closing boundary included.
fn encode_multipart(params: &Params, boundary: &str) -> Result<Vec<u8>> {
    let mut body = Vec::new();

    for (key, value) in params {
        match value {
            Value::File(path) => {
                push_file_part(&mut body, boundary, key, path)?;
            }
            Value::List(items) => {
                for item in items {
                    push_boundary(&mut body, boundary);
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{key}[]\"\r\n\r\n")
                            .as_bytes(),
                    );
                    body.extend_from_slice(item.as_bytes());
                    body.push(b'\n');
                }
            }
            Value::Scalar(s) => {
                push_boundary(&mut body, boundary);
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{key}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(s.as_bytes());
                body.push(b'\n');
            }
        }
    }

    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    Ok(body)
}

fn push_boundary(body: &mut Vec<u8>, boundary: &str) {
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
}

fn push_file_part(body: &mut Vec<u8>, boundary: &str, key: &str, path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(Error::io(format!(
            "File \"{}\" not found",
            path.display()
        )));
    }

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let content = fs::read(path)
        .map_err(|e| Error::io(format!("File \"{}\" could not be read: {e}", path.display())))?;

    push_boundary(body, boundary);
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{key}\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\
             Content-Transfer-Encoding: binary\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(&content);
    body.extend_from_slice(b"\r\n");
    Ok(())
}
