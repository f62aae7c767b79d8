//! JSON documents exchanged with the ACME server that the request engine itself inspects.

use std::fmt;

use serde::{Deserialize, Serialize};

mod directory;

pub use self::directory::{resource, DirectoryMeta};

/// Problem document, see [RFC 7807] and [RFC 8555 §6.7].
///
/// Only `type` and `detail` are read. Both are optional on the wire and any other member, `status`
/// included, is ignored whatever its shape.
///
/// [RFC 7807]: https://datatracker.ietf.org/doc/html/rfc7807
/// [RFC 8555 §6.7]: https://datatracker.ietf.org/doc/html/rfc8555#section-6.7
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub _type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Problem {
    /// Returns true if problem type is "badNonce".
    ///
    /// Accepts the RFC 8555 URN, the pre-standard `urn:acme:error:` namespace and the bare name.
    pub fn is_bad_nonce(&self) -> bool {
        self._type.as_deref().is_some_and(|ty| {
            ty == "badNonce"
                || ty == "urn:ietf:params:acme:error:badNonce"
                || ty == "urn:acme:error:badNonce"
        })
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ty = self._type.as_deref().unwrap_or("about:blank");

        match &self.detail {
            Some(detail) => write!(f, "{ty}: {detail}"),
            _ => write!(f, "{ty}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_nonce_types() {
        for ty in [
            "badNonce",
            "urn:ietf:params:acme:error:badNonce",
            "urn:acme:error:badNonce",
        ] {
            let problem: Problem = serde_json::from_value(serde_json::json!({ "type": ty })).unwrap();
            assert!(problem.is_bad_nonce(), "{ty}");
        }

        let problem: Problem = serde_json::from_str(
            r#"{"type":"urn:ietf:params:acme:error:malformed","detail":"JWS verification error"}"#,
        )
        .unwrap();
        assert!(!problem.is_bad_nonce());

        assert!(!Problem::default().is_bad_nonce());
    }

    #[test]
    fn problem_tolerates_missing_fields() {
        let problem: Problem = serde_json::from_str("{}").unwrap();
        assert_eq!(problem, Problem::default());
        assert_eq!(problem.to_string(), "about:blank");

        let problem: Problem = serde_json::from_str(r#"{"detail":"nope","extra":1}"#).unwrap();
        assert_eq!(problem.to_string(), "about:blank: nope");
    }

    #[test]
    fn problem_ignores_unexpected_status_shapes() {
        for body in [
            r#"{"type":"urn:ietf:params:acme:error:badNonce","detail":"x","status":"400"}"#,
            r#"{"type":"urn:ietf:params:acme:error:badNonce","status":400.5}"#,
            r#"{"type":"urn:ietf:params:acme:error:badNonce","status":null,"subproblems":[]}"#,
        ] {
            let problem: Problem = serde_json::from_str(body).unwrap();
            assert!(problem.is_bad_nonce(), "{body}");
        }
    }
}
