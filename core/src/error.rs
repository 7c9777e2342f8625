//! Error types for the emailsys API client.
//!
//! # Design
//! A failed call surfaces exactly one of three kinds: the caller handed us a
//! bad parameter (`Parameter`), something went wrong between the socket and
//! the decoded response (`Io`), or the service itself answered with
//! `status="error"` (`Api`). Transport failures, a missing `<rsp` marker and
//! malformed XML all collapse into `Io` — from the caller's perspective they
//! are the same "no usable response" outcome, distinguished only by message.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by [`ApiClient`](crate::ApiClient) calls.
#[derive(Debug, Error)]
pub enum Error {
    /// A caller-supplied parameter failed validation before any I/O.
    #[error("parameter `{name}` {reason}")]
    Parameter { name: String, reason: String },

    /// Connection, write or read failure, no response received, or a
    /// response that could not be parsed as XML.
    #[error("{0}")]
    Io(String),

    /// The service returned `status="error"` with a code and description.
    #[error("({code}) {description}")]
    Api { code: i32, description: String },
}

impl Error {
    pub(crate) fn parameter(name: &str, reason: impl Into<String>) -> Self {
        Error::Parameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(message: impl Into<String>) -> Self {
        Error::Io(message.into())
    }

    /// True for the `Io` kind; handy when callers only care whether the
    /// failure happened below the API layer.
    pub fn is_io(&self) -> bool {
        matches!(self, Error::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_displays_code_and_description() {
        let err = Error::Api {
            code: 403,
            description: "Forbidden".to_string(),
        };
        assert_eq!(err.to_string(), "(403) Forbidden");
    }

    #[test]
    fn parameter_error_names_the_offender() {
        let err = Error::parameter("email", "must not be empty");
        assert_eq!(err.to_string(), "parameter `email` must not be empty");
    }

    #[test]
    fn io_kind_is_detectable() {
        assert!(Error::io("No response received").is_io());
        assert!(!Error::Api { code: 1, description: String::new() }.is_io());
    }
}
