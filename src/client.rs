use std::{sync::Arc, time::Duration};

use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::{
    api::resource,
    dir::{Directory, DirectoryResolver, DirectoryUrl},
    error::{Error, Result},
    jws,
    key::AccountKey,
    nonce::NoncePool,
    req::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport},
};

/// How signed POSTs recover from bad nonces and rate limiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of signed POST attempts, including the first one.
    pub max_attempts: u32,

    /// Pause before retrying a rate limited (429) request.
    pub rate_limit_backoff: Duration,
}

impl Default for RetryPolicy {
    /// Three retries (four attempts in total) with a one second rate limit back-off.
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 4,
            rate_limit_backoff: Duration::from_secs(1),
        }
    }
}

/// What to do with the response to a signed POST.
#[derive(Debug)]
enum Outcome {
    /// Hand the response to the caller, whatever its status.
    Done(HttpResponse),

    /// Retry with a fresh nonce, optionally after a pause.
    Retry {
        status: StatusCode,
        backoff: Option<Duration>,
    },
}

impl Outcome {
    fn classify(res: HttpResponse, policy: &RetryPolicy) -> Outcome {
        let status = res.status;

        match status {
            StatusCode::BAD_REQUEST if res.problem().is_some_and(|p| p.is_bad_nonce()) => {
                Outcome::Retry {
                    status,
                    backoff: None,
                }
            }

            StatusCode::TOO_MANY_REQUESTS => Outcome::Retry {
                status,
                backoff: Some(policy.rate_limit_backoff),
            },

            _ => Outcome::Done(res),
        }
    }
}

/// Builder for [`Client`].
#[derive(Debug)]
pub struct ClientBuilder<'a> {
    directory_url: DirectoryUrl<'a>,
    key: AccountKey,
    transport: Option<Arc<dyn HttpTransport>>,
    retry_policy: RetryPolicy,
}

impl<'a> ClientBuilder<'a> {
    /// Uses `transport` instead of the default reqwest based one.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn build(self) -> Result<Client> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new().map_err(Error::HttpClient)?),
        };

        let mut retry_policy = self.retry_policy;
        retry_policy.max_attempts = retry_policy.max_attempts.max(1);

        Ok(Client {
            inner: Arc::new(ClientInner {
                transport,
                key: self.key,
                directory: DirectoryResolver::new(self.directory_url.to_url()),
                nonce_pool: NoncePool::new(),
                retry_policy,
            }),
        })
    }
}

#[derive(Debug)]
struct ClientInner {
    transport: Arc<dyn HttpTransport>,
    key: AccountKey,
    directory: DirectoryResolver,
    nonce_pool: NoncePool,
    retry_policy: RetryPolicy,
}

/// Signed, replay-protected access to an ACME server.
///
/// Resources are addressed by directory name (`"new-reg"`, `"newOrder"`, ...) or by absolute URI.
/// The directory is fetched lazily on first use and nonces are managed transparently.
///
/// Cloning is cheap; clones share the directory and the nonce pool.
///
/// # Errors
///
/// Responses with an error status are not errors: only bad nonces and rate limiting are handled
/// here, anything else is returned for the caller to interpret.
#[derive(Debug, Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Creates a client for the ACME server at `url` using the default transport.
    pub fn new(url: DirectoryUrl<'_>, key: AccountKey) -> Result<Client> {
        Client::builder(url, key).build()
    }

    pub fn builder(url: DirectoryUrl<'_>, key: AccountKey) -> ClientBuilder<'_> {
        ClientBuilder {
            directory_url: url,
            key,
            transport: None,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// The key signing every POST.
    pub fn account_key(&self) -> &AccountKey {
        &self.inner.key
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.inner.retry_policy
    }

    /// Returns the server's directory, fetching it if needed.
    pub async fn directory(&self) -> Result<&Directory> {
        let inner = &*self.inner;

        inner
            .directory
            .directory(inner.transport.as_ref(), &inner.nonce_pool)
            .await
    }

    /// Resolves a resource name (or absolute URI) to the URI requests are sent to.
    pub async fn resolve(&self, resource: &str) -> Result<String> {
        ensure_resource(resource)?;

        let inner = &*self.inner;

        inner
            .directory
            .resolve(inner.transport.as_ref(), &inner.nonce_pool, resource)
            .await
    }

    /// Unsigned GET of `resource`.
    ///
    /// The response is returned whatever its status; only transport failures are errors.
    pub async fn get(&self, resource: &str) -> Result<HttpResponse> {
        let uri = self.resolve(resource).await?;

        log::debug!("GET {uri}");

        let res = self
            .inner
            .transport
            .execute(HttpRequest::new(Method::GET, &uri))
            .await
            .map_err(|source| Error::Transport {
                method: Method::GET,
                uri,
                source,
            })?;

        self.inner.nonce_pool.harvest(&res);

        Ok(res)
    }

    /// Signed POST of `payload` to `resource`.
    ///
    /// `payload` must serialize to a JSON object. Its `resource` member defaults to `resource`.
    ///
    /// Bad nonce rejections and rate limiting are retried transparently, up to
    /// [`RetryPolicy::max_attempts`] attempts in total. Any other response is returned as is.
    pub async fn post<T>(&self, resource: &str, payload: &T) -> Result<HttpResponse>
    where
        T: Serialize + ?Sized,
    {
        ensure_resource(resource)?;
        let payload = jws::payload_object(serde_json::to_value(payload)?)?;
        self.inner.key.ensure_rsa()?;

        let uri = self.resolve(resource).await?;
        let policy = self.inner.retry_policy;

        let mut attempt = 0;

        loop {
            attempt += 1;

            let res = self.post_once(resource, &uri, payload.clone()).await?;

            match Outcome::classify(res, &policy) {
                Outcome::Done(res) => return Ok(res),

                Outcome::Retry { status, .. } if attempt >= policy.max_attempts => {
                    return Err(Error::RetriesExhausted {
                        uri,
                        attempts: attempt,
                        status,
                    });
                }

                Outcome::Retry {
                    status,
                    backoff: None,
                } => {
                    log::debug!("Retrying on bad nonce ({status}), attempt {attempt}");
                }

                Outcome::Retry {
                    status,
                    backoff: Some(backoff),
                } => {
                    log::warn!("Rate limited ({status}) by {uri}, retrying in {backoff:?}");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    /// One signed POST attempt with a freshly acquired nonce.
    async fn post_once(
        &self,
        resource: &str,
        uri: &str,
        payload: Map<String, Value>,
    ) -> Result<HttpResponse> {
        let inner = &*self.inner;

        let nonce = inner
            .nonce_pool
            .acquire(inner.transport.as_ref(), self.nonce_uri(uri))
            .await?;

        let body = jws::sign_request(payload, resource, uri, nonce, &inner.key)?;

        log::debug!("Call endpoint: {uri}");

        let res = inner
            .transport
            .execute(HttpRequest::new(Method::POST, uri).jose_body(body))
            .await
            .map_err(|source| Error::Transport {
                method: Method::POST,
                uri: uri.to_owned(),
                source,
            })?;

        inner.nonce_pool.harvest(&res);

        Ok(res)
    }

    /// Where to send HEAD requests when the nonce pool is empty.
    fn nonce_uri<'u>(&'u self, target: &'u str) -> &'u str {
        self.inner
            .directory
            .loaded()
            .and_then(|dir| dir.get(resource::NEW_NONCE))
            .unwrap_or(target)
    }
}

fn ensure_resource(resource: &str) -> Result<()> {
    if resource.trim().is_empty() {
        return Err(Error::InvalidArgument(
            "resource name must not be empty".to_owned(),
        ));
    }

    Ok(())
}
