use std::collections::{HashSet, VecDeque};

use parking_lot::Mutex;
use reqwest::Method;

use crate::{
    error::{Error, Result},
    req::{HttpRequest, HttpResponse, HttpTransport},
    util::is_base64url,
};

/// Shared pool of nonces.
///
/// Every nonce is handed out at most once. Nonces are harvested from every response that carries
/// a `replay-nonce` header, so a dedicated HEAD request is only needed when the pool runs dry.
#[derive(Default, Debug)]
pub(crate) struct NoncePool {
    inner: Mutex<PoolInner>,
}

#[derive(Default, Debug)]
struct PoolInner {
    /// Unused nonces, oldest first.
    pool: VecDeque<String>,

    /// Every nonce handed out so far, refused on deposit.
    issued: HashSet<String>,
}

impl PoolInner {
    const MAX_POOLED: usize = 10;
}

impl NoncePool {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds `nonce` to the pool.
    ///
    /// Invalid values, values already pooled and values issued before are ignored. Returns true if
    /// the nonce was added.
    pub(crate) fn deposit(&self, nonce: &str) -> bool {
        if !is_base64url(nonce) {
            log::debug!("Ignoring invalid replay-nonce: {nonce:?}");
            return false;
        }

        let mut inner = self.inner.lock();

        if inner.issued.contains(nonce) || inner.pool.iter().any(|n| n == nonce) {
            log::trace!("Ignoring reused nonce");
            return false;
        }

        log::trace!("Extracting new nonce");
        inner.pool.push_back(nonce.to_owned());

        if inner.pool.len() > PoolInner::MAX_POOLED {
            inner.pool.pop_front();
        }

        true
    }

    /// Regardless of the request being a success or not, there might be a nonce in the response.
    pub(crate) fn harvest(&self, res: &HttpResponse) {
        if let Some(nonce) = res.replay_nonce() {
            self.deposit(nonce);
        }
    }

    /// Takes a pooled nonce, or requests a new one with a HEAD to `uri` when the pool is empty.
    pub(crate) async fn acquire(&self, transport: &dyn HttpTransport, uri: &str) -> Result<String> {
        {
            let mut inner = self.inner.lock();

            if let Some(nonce) = inner.pool.pop_front() {
                log::trace!("Use previous nonce");
                inner.issued.insert(nonce.clone());
                return Ok(nonce);
            }
        }

        log::debug!("Request new nonce from {uri}");

        let res = transport
            .execute(HttpRequest::new(Method::HEAD, uri))
            .await
            .map_err(|source| Error::NonceUnavailable {
                uri: uri.to_owned(),
                source,
            })?;

        let nonce = res
            .replay_nonce()
            .filter(|nonce| is_base64url(nonce))
            .ok_or_else(|| Error::MissingNonce {
                uri: uri.to_owned(),
            })?
            .to_owned();

        self.inner.lock().issued.insert(nonce.clone());

        Ok(nonce)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.inner.lock().pool.len()
    }
}
