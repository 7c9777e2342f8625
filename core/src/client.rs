//! API client: validated parameters in, decoded response maps out.
//!
//! # Design
//! `ApiClient` owns an immutable [`Endpoint`] and carries no other state.
//! Every call runs the same pipeline: validate → encode → send → decode →
//! classify, one fresh blocking connection per call. The convenience methods
//! are thin wrappers that assemble a parameter map and delegate to
//! [`ApiClient::api_call`].

use std::path::Path;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::http::Method;
use crate::response::Node;
use crate::types::{Endpoint, MailingSettings, Params, RecipientStatus, Value};
use crate::{encode, response, transport, validate};

/// Synchronous client for the emailsys REST API.
///
/// Safe to share across threads (the endpoint is immutable); each call is
/// independent and blocks until the full response has been read.
#[derive(Debug, Clone)]
pub struct ApiClient {
    endpoint: Endpoint,
}

impl ApiClient {
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Invoke a remote module directly. Used by every convenience method;
    /// public so callers can reach modules without a dedicated wrapper.
    pub fn api_call(&self, module: &str, params: &Params, method: Method) -> Result<Node> {
        validate::non_empty("module", module)?;

        let request = encode::build_request(&self.endpoint, module, params, method)?;

        if self.endpoint.debug {
            debug!(
                node_id = self.endpoint.node_id,
                recipientlist_id = self.endpoint.recipientlist_id,
                host = %self.endpoint.host,
                port = self.endpoint.port,
                method = request.method.as_str(),
                url = %request.path,
                "api call"
            );
            if !self.endpoint.use_tls {
                warn!("TLS disabled, request will be transferred in plaintext");
            }
        }

        let raw = transport::send(
            &request,
            &self.endpoint.host,
            self.endpoint.port,
            self.endpoint.use_tls,
        )?;

        response::classify(response::decode(&raw)?)
    }

    /// Get one recipient of the current recipient list by email.
    pub fn get_recipient(&self, email: &str) -> Result<Node> {
        validate::non_empty("email", email)?;

        let mut params = Params::new();
        params.insert("email".to_string(), Value::from(email));
        self.api_call("recipient_get", &params, Method::Get)
    }

    /// Get all recipients of the current recipient list in the given status,
    /// optionally restricted to the named fields.
    pub fn get_recipients(&self, status: RecipientStatus, fields: &[String]) -> Result<Node> {
        let mut params = Params::new();
        params.insert("status".to_string(), Value::from(status.as_str()));
        params.insert("fields".to_string(), Value::List(fields.to_vec()));
        self.api_call("recipient_get_multi", &params, Method::Get)
    }

    /// Add one recipient. When `recipient_data` carries no status (or status
    /// `active`), the recipient is created active with the activation mail
    /// suppressed.
    pub fn add_recipient(&self, email: &str, recipient_data: Params) -> Result<Node> {
        validate::non_empty("email", email)?;

        let mut params = recipient_data;
        params.insert("email".to_string(), Value::from(email));

        let is_active = match params.get("status") {
            None => true,
            Some(Value::Scalar(s)) => s.is_empty() || s == "active",
            Some(_) => false,
        };
        if is_active {
            params.insert("status".to_string(), Value::from("active"));
            params.insert("activationmail".to_string(), Value::from("no"));
        }

        self.api_call("recipient_new", &params, Method::Get)
    }

    /// Bulk-import recipients from a CSV file upload.
    ///
    /// `recipient_missing` decides what happens to list members absent from
    /// the file (`delete`, `softdelete` or empty for no action);
    /// `recipient_deleted` whether previously deleted recipients are
    /// re-imported (`import` or empty).
    pub fn add_recipients(
        &self,
        csv_file: &Path,
        enclosure: &str,
        delimiter: &str,
        recipient_exist: &str,
        recipient_missing: &str,
        recipient_deleted: &str,
    ) -> Result<Node> {
        validate::non_empty("enclosure", enclosure)?;
        validate::non_empty("delimiter", delimiter)?;
        validate::non_empty("recipient_exist", recipient_exist)?;
        validate::one_of(
            "recipient_missing",
            recipient_missing,
            &["delete", "softdelete", ""],
        )?;
        validate::one_of("recipient_deleted", recipient_deleted, &["import", ""])?;

        let mut params = Params::new();
        params.insert("file".to_string(), Value::File(csv_file.to_path_buf()));
        params.insert("enclosure".to_string(), Value::from(enclosure));
        params.insert("delimiter".to_string(), Value::from(delimiter));
        params.insert("recipient_exist".to_string(), Value::from(recipient_exist));
        params.insert("recipient_missing".to_string(), Value::from(recipient_missing));
        params.insert("recipient_deleted".to_string(), Value::from(recipient_deleted));

        self.api_call("recipient_new_multi", &params, Method::Post)
    }

    /// Update an existing recipient.
    pub fn edit_recipient(&self, email: &str, recipient_data: Params) -> Result<Node> {
        validate::non_empty("email", email)?;
        if recipient_data.is_empty() {
            return Err(Error::parameter("recipient_data", "must not be empty"));
        }

        let mut params = recipient_data;
        params.insert("email".to_string(), Value::from(email));
        self.api_call("recipient_edit", &params, Method::Get)
    }

    /// Delete one recipient, optionally sending a goodbye mail and keeping
    /// the deletion in the statistics.
    pub fn delete_recipient(
        &self,
        email: &str,
        send_goodbye: bool,
        track_stats: bool,
    ) -> Result<Node> {
        validate::non_empty("email", email)?;

        let mut params = Params::new();
        params.insert("email".to_string(), Value::from(email));
        params.insert("sendgoodbye".to_string(), Value::from(yes_no(send_goodbye)));
        params.insert("track_stats".to_string(), Value::from(yes_no(track_stats)));
        self.api_call("recipient_delete", &params, Method::Get)
    }

    /// Delete every recipient of the current recipient list.
    pub fn delete_recipients(&self) -> Result<Node> {
        self.api_call("recipient_delete_multi", &Params::new(), Method::Get)
    }

    /// Dispatch a new mailing from a zipped content package and return the
    /// created mailing id.
    ///
    /// `send_at` is an ISO datetime (`yyyy-mm-dd hh:mm`); `None` sends
    /// immediately.
    pub fn add_mailing(
        &self,
        sender_name: &str,
        sender_email: &str,
        subject: &str,
        send_at: Option<&str>,
        zip_file: &Path,
        settings: &MailingSettings,
    ) -> Result<u64> {
        validate::non_empty("sender_name", sender_name)?;
        validate::non_empty("sender_email", sender_email)?;
        validate::non_empty("subject", subject)?;
        if let Some(send_at) = send_at {
            validate::non_empty("send_at", send_at)?;
        }

        let mut params = Params::new();
        params.insert("sender_name".to_string(), Value::from(sender_name));
        params.insert("sender_email".to_string(), Value::from(sender_email));
        params.insert("subject".to_string(), Value::from(subject));
        params.insert("send_at".to_string(), Value::from(send_at.unwrap_or("")));
        params.insert("file".to_string(), Value::File(zip_file.to_path_buf()));
        params.insert(
            "charset".to_string(),
            Value::from(settings.charset.as_deref().unwrap_or("")),
        );
        if let Some(draft) = settings.draft {
            params.insert("draft".to_string(), Value::from(yes_no(draft)));
        }
        if let Some(robinson) = settings.robinson {
            params.insert("robinson".to_string(), Value::from(yes_no(robinson)));
        }
        if let Some(ecg) = settings.ecg {
            params.insert("ecg".to_string(), Value::from(yes_no(ecg)));
        }
        if let Some(domain) = &settings.domain {
            validate::non_empty("domain", domain)?;
            params.insert("domain".to_string(), Value::from(domain.clone()));
        }

        let data = self.api_call("mailing_new", &params, Method::Post)?;

        data.get("api_data")
            .and_then(|d| d.get("mailing_id"))
            .and_then(Node::as_str)
            .and_then(|id| id.parse::<u64>().ok())
            .ok_or_else(|| Error::io("Response did not contain api_data/mailing_id"))
    }

    /// Statistics for one mailing; `publiclink_validity` is the validity of
    /// the public report link in days (1 to 30).
    pub fn get_mailing_statistics(
        &self,
        mailing_id: u64,
        publiclink_validity: u32,
    ) -> Result<Node> {
        if mailing_id == 0 {
            return Err(Error::parameter("mailing_id", "is not allowed to be zero"));
        }
        validate::in_range("publiclink_validity", publiclink_validity, 1, 30)?;

        let mut params = Params::new();
        params.insert("mailing_id".to_string(), Value::from(mailing_id.to_string()));
        params.insert(
            "publiclink_validity".to_string(),
            Value::from(publiclink_validity.to_string()),
        );
        self.api_call("statistics_mailing_get", &params, Method::Get)
    }

    /// List all mailings of the current node.
    pub fn get_mailings(&self) -> Result<Node> {
        self.api_call("mailings_get", &Params::new(), Method::Get)
    }

    /// Read recipient list metadata (name, description, ...).
    pub fn get_metadata(&self) -> Result<Node> {
        self.api_call("metadata_get", &Params::new(), Method::Get)
    }

    /// Change recipient list metadata.
    pub fn set_metadata(&self, data: Params) -> Result<Node> {
        if data.is_empty() {
            return Err(Error::parameter("data", "must not be empty"));
        }
        self.api_call("metadata_set", &data, Method::Post)
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Client pointed at a host nothing listens on; every test here must
    /// fail before the transport is reached.
    fn offline_client() -> ApiClient {
        let endpoint = Endpoint::new(1, 2, "key")
            .unwrap()
            .with_host("127.0.0.1", 9)
            .plaintext();
        ApiClient::new(endpoint)
    }

    #[test]
    fn empty_email_is_rejected_before_io() {
        let err = offline_client().get_recipient("").unwrap_err();
        assert!(matches!(err, Error::Parameter { .. }));
    }

    #[test]
    fn empty_module_is_rejected() {
        let err = offline_client()
            .api_call("", &Params::new(), Method::Get)
            .unwrap_err();
        assert!(matches!(err, Error::Parameter { .. }));
    }

    #[test]
    fn edit_recipient_requires_data() {
        let err = offline_client()
            .edit_recipient("a@b.com", Params::new())
            .unwrap_err();
        assert!(matches!(err, Error::Parameter { .. }));
    }

    #[test]
    fn add_recipients_checks_allowed_values() {
        let err = offline_client()
            .add_recipients(Path::new("/tmp/x.csv"), "\"", ";", "stock", "purge", "")
            .unwrap_err();
        assert!(matches!(err, Error::Parameter { .. }));
        assert!(err.to_string().contains("recipient_missing"));
    }

    #[test]
    fn statistics_validity_range_is_enforced() {
        let err = offline_client().get_mailing_statistics(5, 31).unwrap_err();
        assert!(matches!(err, Error::Parameter { .. }));
        let err = offline_client().get_mailing_statistics(0, 3).unwrap_err();
        assert!(matches!(err, Error::Parameter { .. }));
    }

    #[test]
    fn add_mailing_missing_zip_fails_before_network() {
        let err = offline_client()
            .add_mailing(
                "Sender",
                "s@example.com",
                "Subject",
                None,
                Path::new("/no/such/package.zip"),
                &MailingSettings::default(),
            )
            .unwrap_err();
        // Encoder error, not a connection error: the file check runs first.
        assert!(err.is_io());
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn set_metadata_requires_data() {
        let err = offline_client().set_metadata(Params::new()).unwrap_err();
        assert!(matches!(err, Error::Parameter { .. }));
    }
}
