//! Signed request envelopes, see [RFC 8555 §6.2](https://datatracker.ietf.org/doc/html/rfc8555#section-6.2).

use openssl::{hash::MessageDigest, sign::Signer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    error::{Error, Result},
    key::{AccountKey, Jwk},
    util::base64url,
};

const RS256: &str = "RS256";

/// JWS Protected Header as defined in [RFC 8555 §6.2].
///
/// The request engine always embeds the full public key (`jwk`) so that the same envelope works
/// for account creation and for servers that predate key IDs.
///
/// [RFC 8555 §6.2]: https://datatracker.ietf.org/doc/html/rfc8555#section-6.2
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub(crate) struct JwsProtectedHeader {
    /// Algorithm. Always `RS256` since only RSA account keys are supported.
    alg: String,

    /// Public key of the account key pair.
    jwk: Jwk,

    /// Anti-replay nonce consumed by this request.
    nonce: String,

    /// Target URL of the request.
    url: String,
}

/// Everything that goes into a single signed POST attempt.
///
/// Built per attempt and dropped after signing.
#[derive(Debug)]
pub(crate) struct SignedRequestEnvelope {
    protected: JwsProtectedHeader,
    payload: Map<String, Value>,
}

impl SignedRequestEnvelope {
    /// Builds the envelope, defaulting `payload.resource` to `resource`.
    ///
    /// A `resource` member already set by the caller is left alone.
    pub(crate) fn new(
        mut payload: Map<String, Value>,
        resource: &str,
        url: &str,
        nonce: String,
        key: &AccountKey,
    ) -> Result<Self> {
        payload
            .entry("resource")
            .or_insert_with(|| Value::String(resource.to_owned()));

        let protected = JwsProtectedHeader {
            alg: RS256.to_owned(),
            jwk: Jwk::try_from(key)?,
            nonce,
            url: url.to_owned(),
        };

        Ok(SignedRequestEnvelope { protected, payload })
    }

    /// Signs the envelope and serializes it as a flattened JWS.
    pub(crate) fn sign(self, key: &AccountKey) -> Result<String> {
        key.ensure_rsa()?;

        let protected = base64url(&serde_json::to_vec(&self.protected)?);
        let payload = base64url(&serde_json::to_vec(&self.payload)?);

        let to_sign = format!("{protected}.{payload}");

        let mut signer = Signer::new(MessageDigest::sha256(), key.pkey())?;
        signer.update(to_sign.as_bytes())?;
        let signature = base64url(&signer.sign_to_vec()?);

        let jws = FlattenedJsonJws {
            protected,
            payload,
            signature,
        };

        Ok(serde_json::to_string(&jws)?)
    }
}

/// Checks that `payload` is a JSON object; `null` counts as an empty one.
pub(crate) fn payload_object(payload: Value) -> Result<Map<String, Value>> {
    match payload {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(Error::InvalidArgument(format!(
            "request payload must be a JSON object, got {}",
            json_type_name(&other)
        ))),
    }
}

/// Builds and signs the body of a POST to `url` for `resource`.
pub(crate) fn sign_request(
    payload: Map<String, Value>,
    resource: &str,
    url: &str,
    nonce: String,
    key: &AccountKey,
) -> Result<String> {
    SignedRequestEnvelope::new(payload, resource, url, nonce, key)?.sign(key)
}

/// <https://datatracker.ietf.org/doc/html/rfc7515#section-7.2.2>
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct FlattenedJsonJws {
    pub(crate) protected: String,
    pub(crate) payload: String,
    pub(crate) signature: String,
}

fn json_type_name(val: &Value) -> &'static str {
    match val {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use base64::prelude::*;
    use openssl::{ec::EcGroup, ec::EcKey, nid::Nid, pkey::PKey, sign::Verifier};
    use serde_json::json;

    use super::*;

    const URL: &str = "https://example.com/acme/new-reg";

    fn obj(payload: Value) -> Map<String, Value> {
        payload_object(payload).unwrap()
    }

    fn decode<T: serde::de::DeserializeOwned>(part: &str) -> T {
        serde_json::from_slice(&BASE64_URL_SAFE_NO_PAD.decode(part).unwrap()).unwrap()
    }

    #[test]
    fn resource_is_defaulted() {
        let key = crate::test::rsa_key();

        let body = sign_request(
            obj(json!({ "contact": ["mailto:foo@bar.com"] })),
            "new-reg",
            URL,
            "nonce-1".to_owned(),
            key,
        )
        .unwrap();

        let jws = serde_json::from_str::<FlattenedJsonJws>(&body).unwrap();
        let payload = decode::<Value>(&jws.payload);
        assert_eq!(payload["resource"], "new-reg");
        assert_eq!(payload["contact"][0], "mailto:foo@bar.com");
    }

    #[test]
    fn explicit_resource_wins() {
        let key = crate::test::rsa_key();

        let body = sign_request(
            obj(json!({ "resource": "reg" })),
            "new-reg",
            URL,
            "nonce-1".to_owned(),
            key,
        )
        .unwrap();

        let jws = serde_json::from_str::<FlattenedJsonJws>(&body).unwrap();
        assert_eq!(decode::<Value>(&jws.payload)["resource"], "reg");
    }

    #[test]
    fn protected_header_shape() {
        let key = crate::test::rsa_key();

        let body = sign_request(obj(Value::Null), "new-reg", URL, "nonce-2".to_owned(), key).unwrap();
        let jws = serde_json::from_str::<FlattenedJsonJws>(&body).unwrap();

        let protected = decode::<JwsProtectedHeader>(&jws.protected);
        assert_eq!(protected.alg, "RS256");
        assert_eq!(protected.nonce, "nonce-2");
        assert_eq!(protected.url, URL);
        assert_eq!(protected.jwk, key.jwk().unwrap());

        let header = decode::<Value>(&jws.protected);
        assert_eq!(header["jwk"]["kty"], "RSA");
        assert_eq!(header["jwk"]["e"], "AQAB");

        assert_eq!(decode::<Value>(&jws.payload), json!({ "resource": "new-reg" }));
    }

    #[test]
    fn signature_verifies() {
        let key = crate::test::rsa_key();

        let body = sign_request(Map::new(), "new-reg", URL, "nonce-3".to_owned(), key).unwrap();
        let jws = serde_json::from_str::<FlattenedJsonJws>(&body).unwrap();

        let signature = BASE64_URL_SAFE_NO_PAD.decode(&jws.signature).unwrap();
        let public = PKey::public_key_from_pem(&key.pkey().public_key_to_pem().unwrap()).unwrap();

        let mut verifier = Verifier::new(MessageDigest::sha256(), &public).unwrap();
        verifier
            .update(format!("{}.{}", jws.protected, jws.payload).as_bytes())
            .unwrap();
        assert!(verifier.verify(&signature).unwrap());
    }

    #[test]
    fn non_object_payload_is_rejected() {
        for payload in [json!("str"), json!([1, 2]), json!(42), json!(true)] {
            let err = payload_object(payload).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)), "{err}");
        }
    }

    #[test]
    fn non_rsa_key_is_rejected() {
        let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
        let key = AccountKey::from_pkey(PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap());

        let err = sign_request(Map::new(), "new-reg", URL, "n".to_owned(), &key).unwrap_err();
        assert!(matches!(err, Error::UnsupportedKey(_)));
    }
}
