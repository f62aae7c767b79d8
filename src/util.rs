use base64::prelude::*;

pub(crate) fn base64url<T: ?Sized + AsRef<[u8]>>(input: &T) -> String {
    BASE64_URL_SAFE_NO_PAD.encode(input)
}

/// True for a non-empty string made only of the base64url alphabet (no padding).
///
/// See <https://datatracker.ietf.org/doc/html/rfc8555#section-6.5.1>.
pub(crate) fn is_base64url(input: &str) -> bool {
    !input.is_empty()
        && input
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
