use serde::{Deserialize, Serialize};

/// Error payload returned by the Sibyl API inside a failed response envelope.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteError {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub date: String,
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = reqwest::StatusCode::from_u16(self.code)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("");
        write!(f, "{reason} [{}]: {}", self.code, self.message)
    }
}

impl std::error::Error for RemoteError {}

/// Core error type shared by the dispatcher and the transport adapters.
///
/// Adapter crates map their own failures into this type. The poll loop only
/// cares about one distinction: [`Error::TransportRefused`] triggers a
/// reconnect, everything else is reported through the failure callbacks.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("remote error: {0}")]
    Remote(RemoteError),

    /// The endpoint could not be reached at all (connection refused, DNS, ...).
    #[error("connection refused: {0}")]
    TransportRefused(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to decode {update_type} update: {reason}")]
    Decode { update_type: String, reason: String },

    #[error("handler error: {0}")]
    Handler(String),

    #[error("handler panicked: {0}")]
    HandlerPanicked(String),

    #[error("a polling session is already active")]
    AlreadyListening,

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    pub fn is_connection_refused(&self) -> bool {
        matches!(self, Error::TransportRefused(_))
    }

    /// Borrow the remote error payload, if this error came from the API itself.
    pub fn as_remote(&self) -> Option<&RemoteError> {
        match self {
            Error::Remote(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RemoteError> for Error {
    fn from(e: RemoteError) -> Self {
        Error::Remote(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_display_uses_status_reason() {
        let e = RemoteError {
            code: 404,
            message: "user not found".to_string(),
            ..Default::default()
        };
        assert_eq!(e.to_string(), "Not Found [404]: user not found");
    }

    #[test]
    fn remote_error_display_with_unknown_code() {
        let e = RemoteError {
            code: 599,
            message: "odd".to_string(),
            ..Default::default()
        };
        assert_eq!(e.to_string(), " [599]: odd");
    }

    #[test]
    fn only_transport_refused_counts_as_refused() {
        assert!(Error::TransportRefused("tcp connect".to_string()).is_connection_refused());
        assert!(!Error::Transport("timed out".to_string()).is_connection_refused());
        assert!(!Error::Remote(RemoteError::default()).is_connection_refused());
    }

    #[test]
    fn as_remote_extracts_payload() {
        let err: Error = RemoteError {
            code: 403,
            message: "forbidden".to_string(),
            origin: "getUpdates".to_string(),
            date: String::new(),
        }
        .into();
        assert_eq!(err.as_remote().map(|r| r.code), Some(403));
        assert!(Error::AlreadyListening.as_remote().is_none());
    }

    #[test]
    fn remote_error_deserializes_with_missing_fields() {
        let e: RemoteError = serde_json::from_str(r#"{"code":401,"message":"bad token"}"#).unwrap();
        assert_eq!(e.code, 401);
        assert_eq!(e.message, "bad token");
        assert!(e.origin.is_empty());
    }
}
