use regex::Regex;
use scraper::Selector;
use std::sync::LazyLock;

macro_rules! selector {
    ($name:ident, $css:expr) => {
        pub(crate) static $name: LazyLock<Selector> = LazyLock::new(|| Selector::parse($css).unwrap());
    };
}

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

selector!(HEAD_SELECTOR, "head");
selector!(ALTERNATE_SELECTOR, r#"head link[rel~="alternate"][hreflang]"#);
selector!(CANONICAL_SELECTOR, r#"link[rel~="canonical"]"#);
selector!(HEAD_CANONICAL_SELECTOR, r#"head link[rel~="canonical"]"#);

// Package name (optionally `@scope/`-prefixed) and the pinned version.
regex!(
    CDN_PACKAGE_REGEX,
    r"^https?://(?:cdn\.jsdelivr\.net/npm|unpkg\.com)/((?:@[^/@]+/)?[^/@]+)@([^/?#]+)"
);
regex!(URL_SCHEME_REGEX, r"^[a-zA-Z][a-zA-Z0-9+.\-]*:");
// Plain text scan; doesn't know about comments, CDATA or script bodies.
regex!(ID_ATTRIBUTE_REGEX, r#"(?:^|\s)id\s*=\s*(?:"([^"]*)"|'([^']*)')"#);
