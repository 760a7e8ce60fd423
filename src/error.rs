use reqwest::StatusCode;
use thiserror::Error;

/// Errors returned by Studio client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Base URL is not a valid absolute URL.
    #[error("invalid base URL '{0}'")]
    InvalidBaseUrl(String),

    /// Endpoint path could not be joined to the base URL.
    #[error("invalid endpoint path '{0}'")]
    InvalidPath(String),

    /// A prefix parameter of a resource path template was not provided.
    #[error("missing path parameter '{parameter}' for resource '{resource}'")]
    MissingPathParameter {
        resource: &'static str,
        parameter: &'static str,
    },

    /// HTTP transport-layer request failure.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Response body is not well-formed XML.
    #[error("failed to parse XML: {0}")]
    Xml(#[from] roxmltree::Error),

    /// Response XML is well-formed but does not have the expected shape.
    #[error("unexpected shape of '{element}': {reason}")]
    Decode { element: String, reason: String },

    /// Non-success HTTP status with response payload.
    #[error("server returned status {status}: {body}")]
    HttpStatus { status: StatusCode, body: String },

    /// A build of the same appliance version already exists and `force` was not set.
    #[error("image already exists: {0}")]
    ImageAlreadyExists(String),

    /// Local I/O failure, e.g. while reading a key file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    pub(crate) fn decode(element: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            element: element.into(),
            reason: reason.into(),
        }
    }

    /// HTTP status of a rejected request, if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            Self::Request(error) => error.status(),
            _ => None,
        }
    }

    /// Returns `true` when the server answered `404 Not Found`.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}

/// Error document Studio sends with rejected requests:
/// `<error><code>...</code><message>...</message></error>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct RemoteError {
    pub(crate) code: String,
    pub(crate) message: String,
}

impl RemoteError {
    /// Returns `None` when `body` is not a Studio error document.
    pub(crate) fn parse(body: &str) -> Option<Self> {
        let content = crate::xml::parse_element(body, "error").ok()?;
        let fields = crate::xml::Fields::new("error", &content).ok()?;
        Some(Self {
            code: fields.string("code")?,
            message: fields.string("message").unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::{ClientError, RemoteError};

    #[test]
    fn parses_error_document() {
        let remote = RemoteError::parse(
            "<error><code>image_already_exists</code><message>Version 0.0.1 exists</message></error>",
        )
        .expect("error document");
        assert_eq!(remote.code, "image_already_exists");
        assert_eq!(remote.message, "Version 0.0.1 exists");
    }

    #[test]
    fn ignores_non_error_documents() {
        assert_eq!(RemoteError::parse("<html>Bad Request</html>"), None);
        assert_eq!(RemoteError::parse("not xml"), None);
    }

    #[test]
    fn not_found_is_detected_from_status() {
        let error = ClientError::HttpStatus {
            status: StatusCode::NOT_FOUND,
            body: String::new(),
        };
        assert!(error.is_not_found());
        assert!(!ClientError::ImageAlreadyExists(String::new()).is_not_found());
    }
}
