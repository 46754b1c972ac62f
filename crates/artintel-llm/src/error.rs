use thiserror::Error;

/// Errors returned by the model-server client.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The request did not complete within the configured timeout.
    #[error("model request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// Nothing is listening at the configured base URL.
    #[error("cannot connect to model server at {0}")]
    Unreachable(String),

    /// The server answered with a non-2xx status.
    #[error("model server returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The server answered successfully but without usable content.
    #[error("empty response from {0}")]
    EmptyResponse(String),

    #[error("invalid model server URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}
