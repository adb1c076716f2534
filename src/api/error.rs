/// Everything that can go wrong fetching one resource.
///
/// Exactly one of these (or a decoded resource) comes back from each client
/// call; nothing is thrown past the client boundary.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
  #[error("invalid endpoint: {0}")]
  InvalidEndpoint(String),

  #[error("transport failure: {0}")]
  Transport(#[source] reqwest::Error),

  #[error("server responded with HTTP {0}")]
  HttpStatus(u16),

  #[error("response did not decode: {0}")]
  Decode(#[source] serde_json::Error),
}

impl ApiError {
  /// Short stable label for log fields and reports.
  pub fn kind_label(&self) -> &'static str {
    match self {
      ApiError::InvalidEndpoint(_) => "invalid_endpoint",
      ApiError::Transport(_) => "transport",
      ApiError::HttpStatus(_) => "http_status",
      ApiError::Decode(_) => "decode",
    }
  }
}
