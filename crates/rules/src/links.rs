//! Small helpers for reading link targets out of attribute values.
//!
//! Attribute values arrive here already entity-decoded by the HTML parser.

use crate::consts;
use url::Url;

/// `true` for absolute `http://` and `https://` URLs.
pub fn is_http(url: &str) -> bool {
    starts_with_ignore_case(url, "http://") || starts_with_ignore_case(url, "https://")
}

/// `true` for anything that isn't resolved against the local filesystem:
/// any URL scheme (`https:`, `mailto:`, `data:`…) or a protocol-relative `//host`.
pub fn is_external(link: &str) -> bool {
    link.starts_with("//") || consts::URL_SCHEME_REGEX.is_match(link)
}

pub(crate) fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value.get(..prefix.len()).is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Split a link into its path and fragment, discarding any query string.
///
/// ```
/// use weblint_rules::links::split_link;
///
/// assert_eq!(split_link("about.html?x=1#team"), ("about.html", Some("team")));
/// assert_eq!(split_link("#top"), ("", Some("top")));
/// ```
pub fn split_link(link: &str) -> (&str, Option<&str>) {
    let (before, fragment) = match link.split_once('#') {
        Some((before, fragment)) => (before, Some(fragment)),
        None => (link, None),
    };
    let path = before.split_once('?').map_or(before, |(path, _)| path);
    (path, fragment)
}

/// Make a `Location` value absolute relative to the URL that returned it.
pub(crate) fn absolutize(base: &str, location: &str) -> String {
    if consts::URL_SCHEME_REGEX.is_match(location) {
        return location.to_string();
    }
    Url::parse(base)
        .and_then(|base| base.join(location))
        .map(|url| url.to_string())
        .unwrap_or_else(|_| location.to_string())
}
