//! Mock emailsys API server for integration tests.
//!
//! Serves the `/rest/{apikey}/{node_id}/{module}/` surface and answers with
//! the same XML envelope as the real service: `<rsp status="ok">…</rsp>` on
//! success, `<rsp status="error" status_code="…" status_description="…"/>`
//! on failure. API-level errors always ride on HTTP 200 — the client only
//! looks at the XML status attributes.
//!
//! The multipart parser is deliberately lenient: the client's historical
//! part framing terminates scalar values with a bare `\n` instead of CRLF,
//! which strict RFC 7578 parsers reject.

use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    routing::get,
    Router,
};
use tokio::{net::TcpListener, sync::RwLock};

pub const API_KEY: &str = "testkey";

#[derive(Clone, Debug)]
pub struct Recipient {
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub status: String,
}

#[derive(Debug)]
struct Store {
    recipients: HashMap<String, Recipient>,
    metadata_name: String,
    metadata_description: String,
    next_mailing_id: u64,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            recipients: HashMap::new(),
            metadata_name: "Test list".to_string(),
            metadata_description: String::new(),
            next_mailing_id: 4711,
        }
    }
}

type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route(
            "/rest/{apikey}/{node_id}/{module}/",
            get(handle_get).post(handle_post),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn xml_response(body: String) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/xml")], body)
}

fn ok(inner: &str) -> String {
    format!("<rsp status=\"ok\">{inner}</rsp>")
}

fn error(code: u16, description: &str) -> String {
    format!(
        "<rsp status=\"error\" status_code=\"{code}\" status_description=\"{}\"/>",
        xml_escape(description)
    )
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn recipient_fields_xml(r: &Recipient) -> String {
    format!(
        "<email>{}</email><firstname>{}</firstname><lastname>{}</lastname><status>{}</status>",
        xml_escape(&r.email),
        xml_escape(&r.firstname),
        xml_escape(&r.lastname),
        xml_escape(&r.status)
    )
}

fn recipient_xml(r: &Recipient) -> String {
    format!("<recipient>{}</recipient>", recipient_fields_xml(r))
}

fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

async fn handle_get(
    State(db): State<Db>,
    Path((apikey, _node_id, module)): Path<(String, u32, String)>,
    Query(params): Query<Vec<(String, String)>>,
) -> impl IntoResponse {
    if apikey != API_KEY {
        return xml_response(error(403, "Forbidden"));
    }

    let body = match module.as_str() {
        "echo" => echo(&params),
        "recipient_get" => {
            let email = param(&params, "email").unwrap_or_default();
            let store = db.read().await;
            match store.recipients.get(email) {
                Some(r) => ok(&recipient_xml(r)),
                None => error(404, "Recipient not found"),
            }
        }
        "recipient_get_multi" => {
            let status = param(&params, "status").unwrap_or("active");
            let store = db.read().await;
            let mut inner = String::from("<recipients>");
            for (i, r) in store
                .recipients
                .values()
                .filter(|r| r.status == status)
                .enumerate()
            {
                inner.push_str(&format!(
                    "<recipient_{i}>{}</recipient_{i}>",
                    recipient_fields_xml(r)
                ));
            }
            inner.push_str("</recipients>");
            ok(&inner)
        }
        "recipient_new" => {
            let email = param(&params, "email").unwrap_or_default().to_string();
            if email.is_empty() {
                return xml_response(error(400, "Missing email"));
            }
            let mut store = db.write().await;
            if store.recipients.contains_key(&email) {
                return xml_response(error(400, "Recipient exists"));
            }
            let recipient = Recipient {
                email: email.clone(),
                firstname: param(&params, "firstname").unwrap_or_default().to_string(),
                lastname: param(&params, "lastname").unwrap_or_default().to_string(),
                status: param(&params, "status").unwrap_or("active").to_string(),
            };
            let xml = ok(&recipient_xml(&recipient));
            store.recipients.insert(email, recipient);
            xml
        }
        "recipient_edit" => {
            let email = param(&params, "email").unwrap_or_default();
            let mut store = db.write().await;
            match store.recipients.get_mut(email) {
                Some(r) => {
                    if let Some(firstname) = param(&params, "firstname") {
                        r.firstname = firstname.to_string();
                    }
                    if let Some(lastname) = param(&params, "lastname") {
                        r.lastname = lastname.to_string();
                    }
                    ok(&recipient_xml(r))
                }
                None => error(404, "Recipient not found"),
            }
        }
        "recipient_delete" => {
            let email = param(&params, "email").unwrap_or_default();
            let mut store = db.write().await;
            match store.recipients.remove(email) {
                Some(_) => ok("<deleted>1</deleted>"),
                None => error(404, "Recipient not found"),
            }
        }
        "recipient_delete_multi" => {
            let mut store = db.write().await;
            let count = store.recipients.len();
            store.recipients.clear();
            ok(&format!("<deleted>{count}</deleted>"))
        }
        "metadata_get" => {
            let store = db.read().await;
            ok(&format!(
                "<metadata><name>{}</name><description>{}</description></metadata>",
                xml_escape(&store.metadata_name),
                xml_escape(&store.metadata_description)
            ))
        }
        _ => error(404, "Unknown module"),
    };

    xml_response(body)
}

async fn handle_post(
    State(db): State<Db>,
    Path((apikey, _node_id, module)): Path<(String, u32, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    if apikey != API_KEY {
        return xml_response(error(403, "Forbidden"));
    }

    let parts = match parse_multipart(&headers, &body) {
        Some(parts) => parts,
        None => return xml_response(error(400, "Malformed multipart body")),
    };

    let body = match module.as_str() {
        "recipient_new_multi" => match parts.iter().find(|p| p.name == "file") {
            Some(file) => {
                let imported = file
                    .content
                    .split(|&b| b == b'\n')
                    .filter(|line| !line.is_empty())
                    .count();
                ok(&format!("<import><imported>{imported}</imported></import>"))
            }
            None => error(400, "Missing file"),
        },
        "mailing_new" => {
            let file_ok = parts
                .iter()
                .any(|p| p.name == "file" && p.filename.is_some() && !p.content.is_empty());
            if !file_ok {
                return xml_response(error(400, "Missing file"));
            }
            let mut store = db.write().await;
            let id = store.next_mailing_id;
            store.next_mailing_id += 1;
            ok(&format!("<api_data><mailing_id>{id}</mailing_id></api_data>"))
        }
        "metadata_set" => {
            let mut store = db.write().await;
            for part in &parts {
                let value = String::from_utf8_lossy(&part.content).into_owned();
                match part.name.as_str() {
                    "name" => store.metadata_name = value,
                    "description" => store.metadata_description = value,
                    _ => {}
                }
            }
            ok("<updated>1</updated>")
        }
        _ => error(404, "Unknown module"),
    };

    xml_response(body)
}

/// Echo query parameters back as XML. List keys (trailing `[]`) are grouped
/// under one element with one indexed child per value, so the client's
/// flatten can recover every element despite its last-sibling-wins rule.
fn echo(params: &[(String, String)]) -> String {
    let mut inner = String::new();
    let mut lists: Vec<(String, Vec<&str>)> = Vec::new();

    for (key, value) in params {
        if key == "recipientlist_id" || key == "version" {
            continue;
        }
        if let Some(name) = key.strip_suffix("[]") {
            match lists.iter_mut().find(|(n, _)| n == name) {
                Some((_, items)) => items.push(value.as_str()),
                None => lists.push((name.to_string(), vec![value.as_str()])),
            }
        } else {
            inner.push_str(&format!("<{key}>{}</{key}>", xml_escape(value)));
        }
    }

    for (name, items) in lists {
        inner.push_str(&format!("<{name}>"));
        for (i, item) in items.iter().enumerate() {
            inner.push_str(&format!("<item_{i}>{}</item_{i}>", xml_escape(item)));
        }
        inner.push_str(&format!("</{name}>"));
    }

    ok(&inner)
}

struct Part {
    name: String,
    filename: Option<String>,
    content: Vec<u8>,
}

/// Lenient multipart/form-data parser. Splits on the boundary token and
/// tolerates part values terminated by a bare `\n`.
fn parse_multipart(headers: &HeaderMap, body: &[u8]) -> Option<Vec<Part>> {
    let content_type = headers.get(header::CONTENT_TYPE)?.to_str().ok()?;
    let boundary = content_type.split("boundary=").nth(1)?.trim();
    let delimiter = format!("--{boundary}");

    let mut parts = Vec::new();
    for segment in split_on(body, delimiter.as_bytes()) {
        // Closing marker or the empty preamble before the first boundary.
        if segment.is_empty() || segment.starts_with(b"--") {
            continue;
        }
        let segment = strip_newline_prefix(segment);
        let header_end = find(segment, b"\r\n\r\n")?;
        let head = std::str::from_utf8(&segment[..header_end]).ok()?;
        let content = strip_newline_suffix(&segment[header_end + 4..]);

        let mut name = None;
        let mut filename = None;
        for line in head.split("\r\n") {
            if let Some(rest) = line.strip_prefix("Content-Disposition: form-data;") {
                for attr in rest.split(';') {
                    let attr = attr.trim();
                    if let Some(v) = attr.strip_prefix("name=") {
                        name = Some(v.trim_matches('"').to_string());
                    } else if let Some(v) = attr.strip_prefix("filename=") {
                        filename = Some(v.trim_matches('"').to_string());
                    }
                }
            }
        }

        parts.push(Part {
            name: name?,
            filename,
            content: content.to_vec(),
        });
    }
    Some(parts)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn split_on<'a>(data: &'a [u8], delimiter: &[u8]) -> Vec<&'a [u8]> {
    let mut segments = Vec::new();
    let mut rest = data;
    while let Some(pos) = find(rest, delimiter) {
        segments.push(&rest[..pos]);
        rest = &rest[pos + delimiter.len()..];
    }
    segments.push(rest);
    segments
}

fn strip_newline_prefix(segment: &[u8]) -> &[u8] {
    segment
        .strip_prefix(b"\r\n")
        .or_else(|| segment.strip_prefix(b"\n"))
        .unwrap_or(segment)
}

fn strip_newline_suffix(content: &[u8]) -> &[u8] {
    content
        .strip_suffix(b"\r\n")
        .or_else(|| content.strip_suffix(b"\n"))
        .unwrap_or(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn multipart_headers(boundary: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}")
                .parse()
                .unwrap(),
        );
        headers
    }

    #[test]
    fn parses_scalar_part_with_bare_newline_terminator() {
        let body = b"--B\r\nContent-Disposition: form-data; name=\"email\"\r\n\r\na@b.com\n--B--\r\n";
        let parts = parse_multipart(&multipart_headers("B"), body).unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].name, "email");
        assert!(parts[0].filename.is_none());
        assert_eq!(parts[0].content, b"a@b.com");
    }

    #[test]
    fn parses_file_part_with_filename_and_binary_content() {
        let body = b"--B\r\nContent-Disposition: form-data; name=\"file\"; filename=\"x.zip\"\r\n\
                     Content-Type: application/octet-stream\r\n\
                     Content-Transfer-Encoding: binary\r\n\r\n\x00\x01zip\r\n--B--\r\n";
        let parts = parse_multipart(&multipart_headers("B"), body).unwrap();
        assert_eq!(parts[0].name, "file");
        assert_eq!(parts[0].filename.as_deref(), Some("x.zip"));
        assert_eq!(parts[0].content, b"\x00\x01zip");
    }

    #[test]
    fn parses_repeated_array_parts() {
        let body = b"--B\r\nContent-Disposition: form-data; name=\"fields[]\"\r\n\r\nx\n\
                     --B\r\nContent-Disposition: form-data; name=\"fields[]\"\r\n\r\ny\n\
                     --B--\r\n";
        let parts = parse_multipart(&multipart_headers("B"), body).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].content, b"x");
        assert_eq!(parts[1].content, b"y");
    }

    #[test]
    fn missing_content_type_is_rejected() {
        assert!(parse_multipart(&HeaderMap::new(), b"anything").is_none());
    }

    #[test]
    fn echo_groups_list_keys_and_skips_fixed_params() {
        let params = vec![
            ("recipientlist_id".to_string(), "2".to_string()),
            ("version".to_string(), "1.8.4".to_string()),
            ("email".to_string(), "a@b.com".to_string()),
            ("fields[]".to_string(), "x".to_string()),
            ("fields[]".to_string(), "y".to_string()),
        ];
        let xml = echo(&params);
        assert!(xml.contains("<email>a@b.com</email>"));
        assert!(xml.contains("<fields><item_0>x</item_0><item_1>y</item_1></fields>"));
        assert!(!xml.contains("recipientlist_id"));
    }

    #[test]
    fn xml_escape_covers_markup_characters() {
        assert_eq!(xml_escape(r#"a<b&"c""#), "a&lt;b&amp;&quot;c&quot;");
    }

    #[test]
    fn error_envelope_carries_code_and_description() {
        assert_eq!(
            error(403, "Forbidden"),
            "<rsp status=\"error\" status_code=\"403\" status_description=\"Forbidden\"/>"
        );
    }
}
