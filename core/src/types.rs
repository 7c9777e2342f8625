//! Domain types for the emailsys API.
//!
//! # Design
//! `Endpoint` replaces the original client's baked-in host constant with an
//! injected, immutable config so tests can point at a local mock server.
//! Parameter maps are ordered (`IndexMap`) because the wire encoding walks
//! them in insertion order and the remote service is order-sensitive for
//! some modules.

use std::path::PathBuf;

use indexmap::IndexMap;

use crate::error::{Error, Result};

/// Protocol version appended to every request URL.
pub const VERSION: &str = "1.8.4";

/// Production API hostname.
pub const DEFAULT_HOST: &str = "api.emailsys.net";

/// One request parameter value.
///
/// `File` marks a local file whose full binary content is uploaded as a
/// multipart attachment; it is only meaningful for POST calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Scalar(String),
    List(Vec<String>),
    File(PathBuf),
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Scalar(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Scalar(s)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items)
    }
}

impl From<PathBuf> for Value {
    fn from(path: PathBuf) -> Self {
        Value::File(path)
    }
}

/// Ordered parameter map, built fresh per call.
pub type Params = IndexMap<String, Value>;

/// Recipient lifecycle states known to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientStatus {
    Active,
    Bounced,
    Deleted,
    New,
}

impl RecipientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecipientStatus::Active => "active",
            RecipientStatus::Bounced => "bounced",
            RecipientStatus::Deleted => "deleted",
            RecipientStatus::New => "new",
        }
    }
}

/// Optional settings for [`ApiClient::add_mailing`](crate::ApiClient::add_mailing).
///
/// `draft`, `robinson` and `ecg` are yes/no switches on the wire; omitted
/// fields are not sent (except `charset`, which the service expects to be
/// present even when empty).
#[derive(Debug, Clone, Default)]
pub struct MailingSettings {
    pub charset: Option<String>,
    pub draft: Option<bool>,
    pub robinson: Option<bool>,
    pub ecg: Option<bool>,
    pub domain: Option<String>,
}

/// Immutable per-client endpoint configuration.
///
/// Created once at client construction and never mutated; safe to share
/// across threads by cloning. `host` and `port` default to the production
/// endpoint but can be overridden for testing.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub node_id: u32,
    pub recipientlist_id: u32,
    pub api_key: String,
    pub use_tls: bool,
    pub debug: bool,
}

impl Endpoint {
    /// Build a config for the production host with TLS enabled.
    ///
    /// Fails with [`Error::Parameter`] if `node_id` or `recipientlist_id`
    /// is zero or `api_key` is empty.
    pub fn new(node_id: u32, recipientlist_id: u32, api_key: &str) -> Result<Self> {
        if node_id == 0 {
            return Err(Error::parameter("node_id", "is not allowed to be zero"));
        }
        if recipientlist_id == 0 {
            return Err(Error::parameter(
                "recipientlist_id",
                "is not allowed to be zero",
            ));
        }
        if api_key.is_empty() {
            return Err(Error::parameter("api_key", "must not be empty"));
        }
        Ok(Self {
            host: DEFAULT_HOST.to_string(),
            port: 443,
            node_id,
            recipientlist_id,
            api_key: api_key.to_string(),
            use_tls: true,
            debug: false,
        })
    }

    /// Point the client at a different host and port, e.g. a mock server.
    pub fn with_host(mut self, host: &str, port: u16) -> Self {
        self.host = host.to_string();
        self.port = port;
        self
    }

    /// Disable TLS and switch to the plaintext port.
    pub fn plaintext(mut self) -> Self {
        self.use_tls = false;
        if self.port == 443 {
            self.port = 80;
        }
        self
    }

    /// Enable debug logging of request and connection details.
    pub fn with_debug(mut self) -> Self {
        self.debug = true;
        self
    }
}
