use std::{fmt, time::Duration};

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE},
    Method, StatusCode,
};
use serde::de;

use crate::{api::Problem, error::BoxError};

pub(crate) const REPLAY_NONCE: &str = "replay-nonce";
pub(crate) const JOSE_JSON: &str = "application/jose+json";

/// A single HTTP exchange handed to an [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

impl HttpRequest {
    pub(crate) fn new(method: Method, uri: &str) -> Self {
        HttpRequest {
            method,
            uri: uri.to_owned(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub(crate) fn jose_body(mut self, body: String) -> Self {
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(JOSE_JSON));
        self.body = Some(body);
        self
    }
}

/// Raw response as received from the ACME server.
///
/// Any status is a valid response; interpreting non-2xx bodies is left to the caller.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Returns the value of header `name` if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|val| val.to_str().ok())
    }

    /// The `replay-nonce` header, if the server granted a fresh nonce.
    pub fn replay_nonce(&self) -> Option<&str> {
        self.header(REPLAY_NONCE)
    }

    /// Body decoded lossily as UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserializes the body as JSON.
    pub fn json<T: de::DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }

    /// Parses the body as a problem document.
    ///
    /// Content type is not checked; some servers send problems as plain `application/json`.
    pub fn problem(&self) -> Option<Problem> {
        if self.body.is_empty() {
            return None;
        }

        self.json::<Problem>().ok()
    }
}

/// Asynchronous HTTP exchange used by the request engine.
///
/// Implementations return `Err` only for failures that produced no HTTP status at all
/// (connection refused, timeouts, TLS errors, malformed responses). Error statuses are `Ok`.
#[async_trait]
pub trait HttpTransport: fmt::Debug + Send + Sync {
    async fn execute(&self, req: HttpRequest) -> Result<HttpResponse, BoxError>;
}

/// [`HttpTransport`] backed by a [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    const TIMEOUT: Duration = Duration::from_secs(30);

    /// Builds a client with a 30 second timeout and this crate's user agent.
    pub fn new() -> Result<Self, BoxError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Self::TIMEOUT)
            .timeout(Self::TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    /// Wraps a preconfigured client (proxies, custom roots, etc).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, req: HttpRequest) -> Result<HttpResponse, BoxError> {
        log::trace!("{} {}", req.method, req.uri);

        let mut builder = self
            .client
            .request(req.method, &req.uri)
            .headers(req.headers);

        if let Some(body) = req.body {
            builder = builder.body(body);
        }

        let res = builder.send().await?;

        let status = res.status();
        let headers = res.headers().clone();
        let body = res.bytes().await?.to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
