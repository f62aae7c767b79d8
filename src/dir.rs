use std::collections::HashMap;

use reqwest::{Method, StatusCode, Url};
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::{
    api::{resource, DirectoryMeta},
    error::{Error, Result},
    nonce::NoncePool,
    req::{HttpRequest, HttpTransport},
};

const LETSENCRYPT_URL: &str = "https://acme-v02.api.letsencrypt.org/directory";
const LETSENCRYPT_STAGING_URL: &str = "https://acme-staging-v02.api.letsencrypt.org/directory";

/// Enumeration of known ACME API directories.
#[derive(Debug, Clone)]
pub enum DirectoryUrl<'a> {
    /// The main Let's Encrypt directory.
    ///
    /// Not appropriate for testing / development.
    LetsEncrypt,

    /// The staging Let's Encrypt directory.
    ///
    /// Use for testing and development. Doesn't issue "valid" certificates. The root signing
    /// certificate is not supposed to be in any trust chains.
    LetsEncryptStaging,

    /// Provide an arbitrary director URL to connect to.
    Other(&'a str),
}

impl<'a> DirectoryUrl<'a> {
    pub(crate) fn to_url(&self) -> &str {
        match self {
            DirectoryUrl::LetsEncrypt => LETSENCRYPT_URL,
            DirectoryUrl::LetsEncryptStaging => LETSENCRYPT_STAGING_URL,
            DirectoryUrl::Other(url) => url,
        }
    }
}

/// Resource directory published by the ACME server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directory {
    resources: HashMap<String, String>,
    meta: Option<DirectoryMeta>,
}

impl Directory {
    /// Builds a directory from the JSON document served by the ACME server.
    ///
    /// Top-level string members become resources; `meta` is parsed as [`DirectoryMeta`]. Anything
    /// else is ignored. Returns `None` if no resources are present.
    pub(crate) fn from_json(doc: Value) -> Option<Directory> {
        let Value::Object(members) = doc else {
            return None;
        };

        let mut dir = Directory::default();

        for (name, val) in members {
            match val {
                Value::String(uri) => {
                    dir.resources.insert(name, uri);
                }

                val if name == resource::META => match serde_json::from_value(val) {
                    Ok(meta) => dir.meta = Some(meta),
                    Err(err) => log::debug!("Ignoring malformed directory meta: {err}"),
                },

                _ => {}
            }
        }

        (!dir.resources.is_empty()).then_some(dir)
    }

    /// URI of `resource`, if the server lists it.
    pub fn get(&self, resource: &str) -> Option<&str> {
        self.resources.get(resource).map(String::as_str)
    }

    /// All listed resources by name.
    pub fn resources(&self) -> &HashMap<String, String> {
        &self.resources
    }

    pub fn meta(&self) -> Option<&DirectoryMeta> {
        self.meta.as_ref()
    }
}

/// Maps resource names to URIs, fetching the directory on first use.
#[derive(Debug)]
pub(crate) struct DirectoryResolver {
    url: String,
    directory: OnceCell<Directory>,
}

impl DirectoryResolver {
    pub(crate) fn new(url: &str) -> Self {
        DirectoryResolver {
            url: url.to_owned(),
            directory: OnceCell::new(),
        }
    }

    /// The directory, if it has been fetched already.
    pub(crate) fn loaded(&self) -> Option<&Directory> {
        self.directory.get()
    }

    /// Returns the directory, fetching it if needed.
    ///
    /// Concurrent callers share a single in-flight fetch. A failed fetch is not cached.
    pub(crate) async fn directory(
        &self,
        transport: &dyn HttpTransport,
        nonce_pool: &NoncePool,
    ) -> Result<&Directory> {
        self.directory
            .get_or_try_init(|| self.fetch(transport, nonce_pool))
            .await
    }

    /// Resolves a resource name to a URI.
    ///
    /// Absolute `http` or `https` URIs are returned unchanged, without touching the directory.
    pub(crate) async fn resolve(
        &self,
        transport: &dyn HttpTransport,
        nonce_pool: &NoncePool,
        resource: &str,
    ) -> Result<String> {
        if is_absolute_http_uri(resource) {
            return Ok(resource.to_owned());
        }

        let dir = self.directory(transport, nonce_pool).await?;

        dir.get(resource)
            .map(str::to_owned)
            .ok_or_else(|| Error::ResourceNotFound(resource.to_owned()))
    }

    async fn fetch(
        &self,
        transport: &dyn HttpTransport,
        nonce_pool: &NoncePool,
    ) -> Result<Directory> {
        log::debug!("Fetch directory: {}", self.url);

        let res = transport
            .execute(HttpRequest::new(Method::GET, &self.url))
            .await
            .map_err(|source| Error::Transport {
                method: Method::GET,
                uri: self.url.clone(),
                source,
            })?;

        if res.status != StatusCode::OK {
            return Err(Error::directory(&self.url, res.status, res.problem()));
        }

        let dir = res
            .json::<Value>()
            .ok()
            .and_then(Directory::from_json)
            .ok_or_else(|| Error::EmptyDirectory(self.url.clone()))?;

        // saves a HEAD round trip for the first signed request
        nonce_pool.harvest(&res);

        Ok(dir)
    }
}

fn is_absolute_http_uri(input: &str) -> bool {
    Url::parse(input).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}
