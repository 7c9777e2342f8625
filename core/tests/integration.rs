//! Full client lifecycle against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then exercises every client
//! operation over real sockets: the HTTP/1.0 request construction, the
//! blocking read-to-close transport, the XML decode and the status
//! classification all run exactly as they would against production.

use std::io::Write;

use emailsys_core::{
    ApiClient, Endpoint, Error, MailingSettings, Method, Params, RecipientStatus, Value,
};

fn start_mock_server() -> std::net::SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

fn client_for(addr: std::net::SocketAddr, api_key: &str) -> ApiClient {
    let endpoint = Endpoint::new(1, 2, api_key)
        .unwrap()
        .with_host("127.0.0.1", addr.port())
        .plaintext();
    ApiClient::new(endpoint)
}

#[test]
fn recipient_and_mailing_lifecycle() {
    let addr = start_mock_server();
    let client = client_for(addr, mock_server::API_KEY);

    // Step 1: unknown recipient — API-level error, not a transport failure.
    let err = client.get_recipient("ada@example.com").unwrap_err();
    assert!(matches!(err, Error::Api { code: 404, .. }));

    // Step 2: create a recipient, then read it back.
    let mut data = Params::new();
    data.insert("firstname".to_string(), Value::from("Ada"));
    data.insert("lastname".to_string(), Value::from("Lovelace"));
    client.add_recipient("ada@example.com", data).unwrap();

    let response = client.get_recipient("ada@example.com").unwrap();
    let recipient = response.get("recipient").unwrap();
    assert_eq!(recipient.get("email").unwrap().as_str(), Some("ada@example.com"));
    assert_eq!(recipient.get("firstname").unwrap().as_str(), Some("Ada"));
    assert_eq!(recipient.get("status").unwrap().as_str(), Some("active"));

    // Step 3: list active recipients.
    let fields = vec!["firstname".to_string(), "lastname".to_string()];
    let response = client.get_recipients(RecipientStatus::Active, &fields).unwrap();
    let first = response
        .get("recipients")
        .and_then(|r| r.get("recipient_0"))
        .unwrap();
    assert_eq!(first.get("email").unwrap().as_str(), Some("ada@example.com"));

    // Step 4: edit.
    let mut data = Params::new();
    data.insert("firstname".to_string(), Value::from("Augusta"));
    let response = client.edit_recipient("ada@example.com", data).unwrap();
    assert_eq!(
        response
            .get("recipient")
            .and_then(|r| r.get("firstname"))
            .and_then(|n| n.as_str()),
        Some("Augusta")
    );

    // Step 5: delete, then confirm the recipient is gone.
    client.delete_recipient("ada@example.com", false, false).unwrap();
    let err = client.get_recipient("ada@example.com").unwrap_err();
    assert!(matches!(err, Error::Api { code: 404, .. }));

    // Step 6: CSV bulk import via multipart upload.
    let mut csv = tempfile::NamedTempFile::new().unwrap();
    csv.write_all(b"a@example.com;Ada\nb@example.com;Bob\nc@example.com;Cee\n")
        .unwrap();
    let response = client
        .add_recipients(csv.path(), "\"", ";", "stock", "", "")
        .unwrap();
    assert_eq!(
        response
            .get("import")
            .and_then(|i| i.get("imported"))
            .and_then(|n| n.as_str()),
        Some("3")
    );

    // Step 7: dispatch a mailing from a zip upload.
    let mut zip = tempfile::NamedTempFile::with_suffix(".zip").unwrap();
    zip.write_all(b"PK\x03\x04fake zip content").unwrap();
    let mailing_id = client
        .add_mailing(
            "Sender",
            "sender@example.com",
            "Hello",
            Some("2026-09-01 10:00"),
            zip.path(),
            &MailingSettings {
                draft: Some(true),
                ..MailingSettings::default()
            },
        )
        .unwrap();
    assert_eq!(mailing_id, 4711);

    // Step 8: metadata round-trip.
    let response = client.get_metadata().unwrap();
    assert_eq!(
        response
            .get("metadata")
            .and_then(|m| m.get("name"))
            .and_then(|n| n.as_str()),
        Some("Test list")
    );

    let mut data = Params::new();
    data.insert("name".to_string(), Value::from("Renamed list"));
    client.set_metadata(data).unwrap();

    let response = client.get_metadata().unwrap();
    assert_eq!(
        response
            .get("metadata")
            .and_then(|m| m.get("name"))
            .and_then(|n| n.as_str()),
        Some("Renamed list")
    );

    // Step 9: clear the list.
    client.delete_recipients().unwrap();
    let response = client
        .get_recipients(RecipientStatus::Active, &[])
        .unwrap();
    assert_eq!(
        response.get("recipients").and_then(|r| r.get("recipient_0")),
        None
    );
}

#[test]
fn wrong_api_key_is_classified_as_forbidden() {
    let addr = start_mock_server();
    let client = client_for(addr, "wrongkey");

    let err = client.get_recipient("a@example.com").unwrap_err();
    match err {
        Error::Api { code, description } => {
            assert_eq!(code, 403);
            assert!(description.contains("Forbidden"));
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[test]
fn get_roundtrip_recovers_scalar_and_list_values() {
    let addr = start_mock_server();
    let client = client_for(addr, mock_server::API_KEY);

    let mut params = Params::new();
    params.insert("email".to_string(), Value::from("a@b.com"));
    params.insert(
        "fields".to_string(),
        Value::from(vec!["x".to_string(), "y".to_string()]),
    );

    let response = client.api_call("echo", &params, Method::Get).unwrap();
    assert_eq!(response.get("email").unwrap().as_str(), Some("a@b.com"));

    let fields = response.get("fields").unwrap();
    assert_eq!(fields.get("item_0").unwrap().as_str(), Some("x"));
    assert_eq!(fields.get("item_1").unwrap().as_str(), Some("y"));
}
