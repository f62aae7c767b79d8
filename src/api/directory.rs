use serde::{Deserialize, Serialize};

/// Well-known directory resource names.
///
/// RFC 8555 names are camel-cased; the pre-standard (ACME v1) names are kebab-cased. Any other
/// name present in a server's directory resolves just as well.
pub mod resource {
    pub const NEW_NONCE: &str = "newNonce";
    pub const NEW_ACCOUNT: &str = "newAccount";
    pub const NEW_ORDER: &str = "newOrder";
    pub const NEW_AUTHZ: &str = "newAuthz";
    pub const REVOKE_CERT: &str = "revokeCert";
    pub const KEY_CHANGE: &str = "keyChange";

    pub const NEW_REG: &str = "new-reg";
    pub const NEW_CERT: &str = "new-cert";
    pub const REVOKE_CERT_V1: &str = "revoke-cert";
    pub const KEY_CHANGE_V1: &str = "key-change";

    /// Directory member holding metadata instead of a URI.
    pub(crate) const META: &str = "meta";
}

/// <https://datatracker.ietf.org/doc/html/rfc8555#section-9.7.6>
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryMeta {
    /// URL identifying the current terms of service.
    #[serde(
        skip_serializing_if = "Option::is_none",
        alias = "terms-of-service"
    )]
    pub terms_of_service: Option<String>,

    /// URL locating a website providing more information about the ACME server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,

    /// The hostnames that the ACME server recognizes as referring to itself for the purposes of
    /// Certification Authority Authorization (CAA) record validation as defined in [RFC 6844].
    ///
    /// [RFC 6844]: https://datatracker.ietf.org/doc/html/rfc6844
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caa_identities: Option<Vec<String>>,

    /// If true, then the CA requires that all newAccount requests include an
    /// `externalAccountBinding` field associating the new account with an external account.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_account_required: Option<bool>,
}

impl DirectoryMeta {
    pub fn external_account_required(&self) -> bool {
        self.external_account_required.unwrap_or(false)
    }
}
