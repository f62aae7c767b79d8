use reqwest::{Method, StatusCode};

use crate::api::Problem;

/// Boxed error produced by an [`HttpTransport`](crate::HttpTransport) implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every fatal condition of the request engine.
///
/// Protocol soft errors (bad nonce, rate limiting) never show up here; they are absorbed by the
/// retry loop in [`Client::post()`](crate::Client::post). Server-reported errors other than those
/// are not errors either: they come back as ordinary responses.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The caller passed an argument that can never produce a valid request.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The account key can not sign ACME requests.
    #[error("unsupported account key type ({0}); only RSA keys can sign requests")]
    UnsupportedKey(String),

    /// The directory was loaded but has no entry for the resource.
    #[error("resource not found in directory: {0}")]
    ResourceNotFound(String),

    /// The directory request returned a non-200 status.
    #[error("failed to fetch directory from {uri}: {message}")]
    Directory { uri: String, message: String },

    /// The directory request succeeded but carried no usable mapping.
    #[error("empty directory returned from {0}")]
    EmptyDirectory(String),

    /// The dedicated nonce request failed at the transport level.
    #[error("could not obtain a replay nonce from {uri}")]
    NonceUnavailable {
        uri: String,
        #[source]
        source: BoxError,
    },

    /// The dedicated nonce request returned no usable `replay-nonce` header.
    #[error("no valid replay-nonce header in response from {uri}")]
    MissingNonce { uri: String },

    /// The transport failed before an HTTP status was received.
    #[error("{method} request to {uri} failed")]
    Transport {
        method: Method,
        uri: String,
        #[source]
        source: BoxError,
    },

    /// Every attempt of a signed POST was answered with a retryable status.
    #[error("giving up on {uri} after {attempts} attempts; last status was {status}")]
    RetriesExhausted {
        uri: String,
        attempts: u32,
        status: StatusCode,
    },

    /// The default HTTP transport could not be constructed.
    #[error("failed to set up HTTP client")]
    HttpClient(#[source] BoxError),

    #[error("crypto error: {0}")]
    Crypto(#[from] openssl::error::ErrorStack),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn directory(uri: &str, status: StatusCode, problem: Option<Problem>) -> Self {
        let message = match problem {
            Some(Problem {
                _type: Some(ty),
                detail: Some(detail),
                ..
            }) => format!("{ty}: {detail}"),
            _ => format!("status {}", status.as_u16()),
        };

        Error::Directory {
            uri: uri.to_owned(),
            message,
        }
    }
}
