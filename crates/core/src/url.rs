//! Public URL construction.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters left unescaped in object keys: unreserved characters plus `/`.
const KEY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// Build the public URL for an object key.
///
/// `base` is used verbatim and is expected to end with `/`.
pub fn serve_url(base: &str, key: &str) -> String {
    format!("{}{}", base, utf8_percent_encode(key, KEY_ENCODE_SET))
}
