//! Signed, replay-protected requests to ACME (Automatic Certificate Management Environment)
//! providers such as [Let's Encrypt](https://letsencrypt.org/).
//!
//! This crate is the request engine underneath ACME account, order and certificate workflows. It
//! turns a resource name into a correctly nonced, correctly signed HTTP exchange and hands the raw
//! response back. What an "order" or a "challenge" means is up to the caller.
//!
//! # Usage
//!
//! ```no_run
//! # async fn run() -> Result<(), acme_core::Error> {
//! use acme_core::{AccountKey, Client, DirectoryUrl};
//!
//! let key = AccountKey::generate_rsa(2048)?;
//! let client = Client::new(DirectoryUrl::LetsEncryptStaging, key)?;
//!
//! let res = client
//!     .post("newAccount", &serde_json::json!({ "termsOfServiceAgreed": true }))
//!     .await?;
//!
//! if !res.status.is_success() {
//!     eprintln!("server said no: {:?}", res.problem());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Resources
//!
//! Requests address resources by the name the server's directory lists them under (see
//! [`api::resource`]) or by absolute `http`/`https` URI. The directory is fetched once per
//! [`Client`], on first use.
//!
//! # Nonces
//!
//! Every signed request consumes a single-use nonce issued by the server. Nonces are collected
//! from every response; a dedicated `HEAD` request is only sent when none are left.
//!
//! # Retries
//!
//! Signed POSTs rejected for a bad nonce, or rate limited with a 429, are retried with a fresh
//! nonce, up to four attempts in total (see [`RetryPolicy`]). Every other response, error statuses
//! included, is returned to the caller unmodified.
//!
//! ## Use Staging For Development!
//!
//! Especially take care to use the Let's Encrypt staging environment for development where the rate
//! limits are more relaxed. See [`DirectoryUrl::LetsEncryptStaging`].

#![deny(rust_2018_idioms, nonstandard_style, future_incompatible)]

mod client;
mod dir;
mod error;
mod jws;
mod key;
mod nonce;
mod req;
mod util;

pub mod api;


pub use crate::{
    client::{Client, ClientBuilder, RetryPolicy},
    dir::{Directory, DirectoryUrl},
    error::{BoxError, Error, Result},
    key::{AccountKey, Jwk},
    req::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport},
};
