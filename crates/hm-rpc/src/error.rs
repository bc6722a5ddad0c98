//! Error types for remote calls

use thiserror::Error;

/// Result type for remote calls
pub type RpcResult<T> = Result<T, RpcError>;

/// Errors that can occur while talking to the controller
#[derive(Debug, Error)]
pub enum RpcError {
    /// The HTTP request could not be completed
    #[error("transport error calling {method}: {source}")]
    Transport {
        method: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success HTTP status
    #[error("HTTP status {status} calling {method}")]
    Status { method: String, status: u16 },

    /// The server answered with an XML-RPC fault
    #[error("fault {code} calling {method}: {message}")]
    Fault {
        method: String,
        code: i64,
        message: String,
    },

    /// The response could not be decoded into the expected shape
    #[error("malformed response to {method}: {reason}")]
    Decode { method: String, reason: String },
}

impl RpcError {
    /// Name of the remote method that failed
    pub fn method(&self) -> &str {
        match self {
            RpcError::Transport { method, .. }
            | RpcError::Status { method, .. }
            | RpcError::Fault { method, .. }
            | RpcError::Decode { method, .. } => method,
        }
    }

    pub(crate) fn decode(method: &str, reason: impl Into<String>) -> Self {
        RpcError::Decode {
            method: method.to_string(),
            reason: reason.into(),
        }
    }
}
