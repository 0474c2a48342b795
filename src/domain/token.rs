use serde::Serialize;
use std::borrow::Cow;
use std::fmt;
use url::Url;

/// Path segments that introduce a token, matched case-insensitively.
///
/// Both prefixes share one token space for extraction purposes only; whether
/// a token minted for one is redeemable through the other is up to the
/// redemption service.
const ROUTE_PREFIXES: [&str; 2] = ["scan", "redeem"];

/// Query parameters that may carry a token, in lookup order.
const QUERY_KEYS: [&str; 3] = ["hash", "qr", "code"];

/// An opaque identifier for one redemption opportunity.
///
/// Only [`canonicalize`] builds one, so a `CanonicalToken` is never empty and
/// never carries percent-escapes, a leading `#` or trailing slashes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CanonicalToken(String);

impl CanonicalToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CanonicalToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reduces whatever a QR code decoded to into a canonical redemption token.
///
/// Accepted encodings, tried in order:
///
/// 1. an absolute URL whose path contains `/scan/<token>` or `/redeem/<token>`,
/// 2. an absolute URL with a `hash`, `qr` or `code` query parameter,
/// 3. a path-like string such as `/redeem/<token>/`,
/// 4. the bare token, optionally prefixed with `#`.
///
/// Returns `None` only when nothing non-empty is left. Pure and idempotent.
pub fn canonicalize(raw: &str) -> Option<CanonicalToken> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(url) = Url::parse(trimmed)
        && let Some(token) = from_url(&url)
    {
        return Some(token);
    }

    // Escaped segments are matched before decoding so that an escaped `/`,
    // `?` or `#` inside a token stays part of it.
    let raw_path = trimmed.trim_end_matches('/');
    if let Some(token) = match_route(raw_path.split('/'), Segments::Escaped) {
        return Some(token);
    }

    let unescaped = unescape(trimmed);
    let path_like = unescaped.trim_end_matches('/');
    if let Some(token) = match_route(path_like.split('/'), Segments::Decoded) {
        return Some(token);
    }

    finish(path_like)
}

fn from_url(url: &Url) -> Option<CanonicalToken> {
    if let Some(segments) = url.path_segments()
        && let Some(token) = match_route(segments, Segments::Escaped)
    {
        return Some(token);
    }

    QUERY_KEYS.iter().find_map(|key| {
        url.query_pairs()
            .find(|(name, _)| &**name == *key)
            .and_then(|(_, value)| finish(&value))
    })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Segments {
    /// Still percent-encoded; each segment is decoded after splitting.
    Escaped,
    Decoded,
}

/// Finds the first `<prefix>/<token>` pair among the path segments.
fn match_route<'a, I>(segments: I, form: Segments) -> Option<CanonicalToken>
where
    I: IntoIterator<Item = &'a str>,
{
    let decode = |segment: &'a str| match form {
        Segments::Escaped => unescape(segment),
        Segments::Decoded => Cow::Borrowed(segment),
    };

    let mut previous_was_prefix = false;
    for segment in segments {
        if previous_was_prefix {
            // Path-like input keeps its query and fragment attached.
            let candidate = segment
                .trim_start_matches('#')
                .split(['?', '#'])
                .next()
                .unwrap_or_default();
            if let Some(token) = finish(&decode(candidate)) {
                return Some(token);
            }
        }
        let segment = decode(segment);
        previous_was_prefix = ROUTE_PREFIXES
            .iter()
            .any(|prefix| segment.eq_ignore_ascii_case(prefix));
    }
    None
}

fn unescape(value: &str) -> Cow<'_, str> {
    urlencoding::decode(value).unwrap_or(Cow::Borrowed(value))
}

fn finish(candidate: &str) -> Option<CanonicalToken> {
    let token = candidate
        .trim()
        .trim_start_matches('#')
        .trim_end_matches('/')
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(CanonicalToken(token.to_string()))
    }
}
