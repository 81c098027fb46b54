/// Errors surfaced by the REST client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
  /// Transport failure: connection refused, timeout, TLS, ...
  #[error("network: {0}")]
  Network(#[from] reqwest::Error),

  /// The requested record does not exist.
  #[error("not found: {0}")]
  NotFound(String),

  /// The server rejected the payload (400/422). The message is the server's.
  #[error("{0}")]
  Validation(String),

  #[error("HTTP {status}: {message}")]
  Server { status: u16, message: String },

  #[error("decode: {0}")]
  Decode(String),

  /// The caller cancelled the request before it completed.
  #[error("request cancelled")]
  Cancelled,

  #[error("invalid url: {0}")]
  InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
  /// Message suitable for a toast or status line.
  ///
  /// Server-provided messages are returned verbatim.
  pub fn user_message(&self) -> String {
    match self {
      ApiError::Validation(message) | ApiError::Server { message, .. } => message.clone(),
      other => other.to_string(),
    }
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, ApiError::NotFound(_))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_user_message_is_verbatim_for_server_errors() {
    let err = ApiError::Validation("Email is invalid".to_string());
    assert_eq!(err.user_message(), "Email is invalid");

    let err = ApiError::Server {
      status: 500,
      message: "Database unavailable".to_string(),
    };
    assert_eq!(err.user_message(), "Database unavailable");
    assert_eq!(err.to_string(), "HTTP 500: Database unavailable");
  }

  #[test]
  fn test_not_found() {
    assert!(ApiError::NotFound("student/42".to_string()).is_not_found());
    assert!(!ApiError::Cancelled.is_not_found());
  }
}
