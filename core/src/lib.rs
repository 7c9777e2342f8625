//! Synchronous client for the emailsys email-marketing REST API.
//!
//! # Overview
//! Validates caller-supplied parameters, builds raw HTTP/1.0 requests (GET
//! query strings or multipart/form-data POST bodies including file uploads),
//! sends them over a fresh TCP or TLS socket, decodes the XML response into
//! a generic ordered mapping ([`Node`]) and classifies the result by the
//! top-level status attributes.
//!
//! # Design
//! - One blocking call per invocation: fresh connection, read to
//!   end-of-stream (HTTP/1.0 close semantics), connection dropped.
//! - [`Endpoint`] is immutable and injected at construction; tests point it
//!   at a local mock server.
//! - Every failure is exactly one of [`Error::Parameter`], [`Error::Io`] or
//!   [`Error::Api`].
//!
//! ```no_run
//! use emailsys_core::{ApiClient, Endpoint};
//!
//! fn main() -> emailsys_core::Result<()> {
//!     let client = ApiClient::new(Endpoint::new(1, 2, "apikey")?);
//!     let recipient = client.get_recipient("a@example.com")?;
//!     println!("{:?}", recipient.get("recipient"));
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod encode;
pub mod error;
pub mod http;
pub mod response;
pub mod transport;
pub mod types;
pub mod validate;

pub use client::ApiClient;
pub use error::{Error, Result};
pub use http::{Method, RawRequest};
pub use response::{Node, ATTRIBUTES_KEY};
pub use types::{Endpoint, MailingSettings, Params, RecipientStatus, Value, DEFAULT_HOST, VERSION};
