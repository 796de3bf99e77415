use thiserror::Error;

use crate::notify::Toast;

// Structured code the backend attaches when its capture decoder is missing
pub const DECODER_MISSING_CODE: &str = "decoder_missing";
// Older backends only report the condition in the message text
const DECODER_MISSING_TEXT: &str = "tshark not found";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("capture decoder unavailable on server: {message}")]
    DecoderMissing { message: String },
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

impl ClientError {
    /// Classify a non-2xx response body from the backend.
    ///
    /// The body is expected to be `{"error": "...", "code": "..."}`; anything
    /// else falls back to the raw text (or the status line when empty).
    pub fn from_response(status: u16, body: &str) -> Self {
        let payload: Option<ErrorPayload> = serde_json::from_str(body).ok();
        let (message, code) = match payload {
            Some(p) => (p.error.unwrap_or_default(), p.code),
            None => (body.trim().to_string(), None),
        };
        let message = if message.is_empty() {
            format!("HTTP {}", status)
        } else {
            message
        };

        let decoder_missing = code.as_deref() == Some(DECODER_MISSING_CODE)
            || message.contains(DECODER_MISSING_TEXT);
        if decoder_missing {
            ClientError::DecoderMissing { message }
        } else {
            ClientError::Server { status, message }
        }
    }

    pub fn is_decoder_missing(&self) -> bool {
        matches!(self, ClientError::DecoderMissing { .. })
    }

    /// The notification shown to the user for this failure.
    pub fn to_toast(&self) -> Toast {
        match self {
            ClientError::DecoderMissing { .. } => Toast::actionable(
                "tshark is not installed on the server. Install it (macOS: brew install wireshark, \
                 Debian/Ubuntu: sudo apt install tshark) and restart the server.",
            ),
            ClientError::Server { message, .. } => Toast::error(message.clone()),
            other => Toast::error(other.to_string()),
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::ToastLevel;

    #[test]
    fn test_structured_decoder_code() {
        let err = ClientError::from_response(
            422,
            r#"{"error":"cannot read capture","code":"decoder_missing"}"#,
        );
        assert!(err.is_decoder_missing());
        assert_eq!(err.to_toast().level, ToastLevel::Actionable);
    }

    #[test]
    fn test_legacy_decoder_message() {
        let err = ClientError::from_response(
            422,
            r#"{"error":"tshark not found in PATH"}"#,
        );
        assert!(err.is_decoder_missing());
    }

    #[test]
    fn test_generic_server_error() {
        let err = ClientError::from_response(404, r#"{"error":"No session"}"#);
        match &err {
            ClientError::Server { status, message } => {
                assert_eq!(*status, 404);
                assert_eq!(message, "No session");
            }
            other => panic!("unexpected {:?}", other),
        }
        let toast = err.to_toast();
        assert_eq!(toast.level, ToastLevel::Error);
        assert_eq!(toast.message, "No session");
    }

    #[test]
    fn test_non_json_body() {
        let err = ClientError::from_response(405, "Method not allowed\n");
        assert!(matches!(err, ClientError::Server { ref message, .. } if message == "Method not allowed"));

        let err = ClientError::from_response(500, "");
        assert!(matches!(err, ClientError::Server { ref message, .. } if message == "HTTP 500"));
    }
}
