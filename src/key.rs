use std::fmt;

use openssl::{
    pkey::{Id, PKey, Private},
    rsa::Rsa,
    sha::sha256,
};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::{
    error::{Error, Result},
    util::base64url,
};

/// Account key pair used to sign every POST.
///
/// Cloning is cheap: the underlying key is reference counted, never copied.
#[derive(Clone)]
pub struct AccountKey {
    pkey: PKey<Private>,
}

impl AccountKey {
    /// Generates a fresh RSA key with the given modulus size.
    pub fn generate_rsa(bits: u32) -> Result<AccountKey> {
        let rsa = Rsa::generate(bits)?;
        Ok(Self::from_pkey(PKey::from_rsa(rsa)?))
    }

    /// Reads a PEM encoded private key (PKCS#8 or PKCS#1).
    ///
    /// Any key type openssl understands is accepted here; non-RSA keys fail later, when a request
    /// is signed.
    pub fn from_pem(pem: &str) -> Result<AccountKey> {
        let pkey = PKey::private_key_from_pem(pem.as_bytes())?;
        Ok(Self::from_pkey(pkey))
    }

    pub fn from_pkey(pkey: PKey<Private>) -> AccountKey {
        AccountKey { pkey }
    }

    /// PKCS#8 PEM encoding of the private key.
    pub fn to_pem(&self) -> Result<Zeroizing<String>> {
        let pem = self.pkey.private_key_to_pem_pkcs8()?;
        let pem = Zeroizing::new(pem);

        // PEM output is always ASCII
        Ok(Zeroizing::new(String::from_utf8_lossy(&pem).into_owned()))
    }

    pub(crate) fn pkey(&self) -> &PKey<Private> {
        &self.pkey
    }

    pub fn is_rsa(&self) -> bool {
        self.pkey.id() == Id::RSA
    }

    /// Fails with [`Error::UnsupportedKey`] unless this is an RSA key.
    pub(crate) fn ensure_rsa(&self) -> Result<()> {
        if self.is_rsa() {
            Ok(())
        } else {
            Err(Error::UnsupportedKey(key_type_name(self.pkey.id()).to_owned()))
        }
    }

    /// Public key as a JSON Web Key.
    pub fn jwk(&self) -> Result<Jwk> {
        Jwk::try_from(self)
    }

    /// [RFC 7638] thumbprint of the public key, base64url encoded.
    ///
    /// [RFC 7638]: https://datatracker.ietf.org/doc/html/rfc7638
    pub fn thumbprint(&self) -> Result<String> {
        let jwk = self.jwk()?;
        let thumb = serde_json::to_string(&JwkThumb::from(&jwk))?;
        Ok(base64url(&sha256(thumb.as_bytes())))
    }
}

impl fmt::Debug for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountKey")
            .field("type", &key_type_name(self.pkey.id()))
            .field("bits", &self.pkey.bits())
            .finish_non_exhaustive()
    }
}

fn key_type_name(id: Id) -> &'static str {
    match id {
        Id::RSA => "RSA",
        Id::EC => "EC",
        Id::ED25519 => "Ed25519",
        Id::DSA => "DSA",
        _ => "unknown",
    }
}

/// RSA public key in JSON Web Key form, [RFC 7518 §6.3.1].
///
/// [RFC 7518 §6.3.1]: https://datatracker.ietf.org/doc/html/rfc7518#section-6.3.1
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Jwk {
    pub kty: String,
    pub n: String,
    pub e: String,
}

impl TryFrom<&AccountKey> for Jwk {
    type Error = Error;

    fn try_from(key: &AccountKey) -> Result<Self> {
        key.ensure_rsa()?;
        let rsa = key.pkey().rsa()?;

        Ok(Jwk {
            kty: "RSA".to_owned(),
            n: base64url(&rsa.n().to_vec()),
            e: base64url(&rsa.e().to_vec()),
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
// LEXICAL ORDER OF FIELDS MATTER!
struct JwkThumb {
    e: String,
    kty: String,
    n: String,
}

impl From<&Jwk> for JwkThumb {
    fn from(a: &Jwk) -> Self {
        JwkThumb {
            e: a.e.clone(),
            kty: a.kty.clone(),
            n: a.n.clone(),
        }
    }
}
