//! Form-style query string encoding
//!
//! Spaces become `+`, unreserved characters (`A-Z a-z 0-9 - . _ ~`) are kept
//! and everything else is percent-encoded with uppercase hex digits.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters escaped in query keys and values
pub const QUERY: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Like [`QUERY`] but leaves `%` alone, for values that are already partly escaped
pub const QUERY_KEEP_PERCENT: &AsciiSet = &QUERY.remove(b'%');

/// Encode a single key or value
pub fn quote_plus(input: &str, set: &'static AsciiSet) -> String {
    input
        .split(' ')
        .map(|part| utf8_percent_encode(part, set).to_string())
        .collect::<Vec<_>>()
        .join("+")
}

/// Encode `key=value` pairs joined with `&`
pub fn urlencode<'a, I>(pairs: I, set: &'static AsciiSet) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", quote_plus(k, set), quote_plus(v, set)))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comma_is_escaped() {
        assert_eq!(quote_plus("1,2,3", QUERY), "1%2C2%2C3");
    }

    #[test]
    fn test_space_becomes_plus() {
        assert_eq!(quote_plus("gamma r 1.5", QUERY), "gamma+r+1.5");
    }

    #[test]
    fn test_percent_kept_when_requested() {
        assert_eq!(quote_plus("a%2fb", QUERY_KEEP_PERCENT), "a%2fb");
        assert_eq!(quote_plus("a%2fb", QUERY), "a%252fb");
    }

    #[test]
    fn test_unreserved_untouched() {
        assert_eq!(quote_plus("abc-1.0_x~", QUERY), "abc-1.0_x~");
        assert_eq!(quote_plus("a/b:c", QUERY), "a%2Fb%3Ac");
    }

    #[test]
    fn test_urlencode_pairs() {
        let encoded = urlencode([("a b", "c&d"), ("e", "")], QUERY);
        assert_eq!(encoded, "a+b=c%26d&e=");
    }
}
