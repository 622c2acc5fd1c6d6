//! Cache-key normalization for URLs.

use url::Url;

/// Canonicalizes a URL for use as a cache key.
///
/// The scheme and host are lowercased; everything after the authority (path,
/// query and fragment) is kept byte-for-byte, since servers are free to treat
/// path casing as significant. Anything that doesn't parse as an absolute URL
/// with a host is returned unchanged.
///
/// Only ever use the result as a lookup key. Messages shown to the user should
/// quote the URL exactly as it was written.
///
/// # Examples
///
/// ```
/// use weblint_probe::normalize;
///
/// assert_eq!(normalize("HTTP://Example.COM/Path?x=1"), "http://example.com/Path?x=1");
/// assert_eq!(normalize("not a url"), "not a url");
/// ```
pub fn normalize(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return url.to_string();
    };
    let Some(host) = parsed.host_str() else {
        return url.to_string();
    };
    let Some((_, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    // A backslash ends the authority as well, the way `Url` parses http(s).
    let (authority, tail) = rest.split_at(rest.find(['/', '\\', '?', '#']).unwrap_or(rest.len()));
    let userinfo = authority.rfind('@').map(|at| &authority[..=at]).unwrap_or_default();
    let port = parsed.port().map(|port| format!(":{port}")).unwrap_or_default();
    format!("{}://{userinfo}{host}{port}{tail}", parsed.scheme())
}
