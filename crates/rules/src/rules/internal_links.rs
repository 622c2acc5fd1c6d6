//! Relative and root-relative links resolved against the filesystem.

use crate::consts;
use crate::error::{ErrorKind, Result};
use crate::host::{Element, Report, Rule};
use crate::links;
use async_trait::async_trait;
use exn::ResultExt;
use percent_encoding::percent_decode_str;
use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};
use tracing::instrument;
use weblint_config::InternalLinksOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    File,
    Directory,
}

/// Resolves link targets to files, memoizing every filesystem answer.
///
/// The filesystem is assumed not to change during a run, so nothing is ever
/// invalidated. Errors (permissions, missing parents) count as "absent".
#[derive(Debug)]
pub struct Resolver {
    web_root: PathBuf,
    alternative_extensions: Vec<String>,
    index_file: String,
    entries: HashMap<PathBuf, Option<Entry>>,
    listings: HashMap<PathBuf, HashSet<OsString>>,
    fragments: HashMap<PathBuf, HashSet<String>>,
}

impl Resolver {
    pub fn new(options: &InternalLinksOptions) -> Result<Self> {
        let web_root = std::path::absolute(&options.web_root)
            .or_raise(|| ErrorKind::InvalidOption(format!("web_root {}", options.web_root.display())))?;
        Ok(Self {
            web_root: normalize_path(&web_root),
            alternative_extensions: options.alternative_extensions.clone(),
            index_file: options.index_file.clone(),
            entries: HashMap::new(),
            listings: HashMap::new(),
            fragments: HashMap::new(),
        })
    }

    /// Resolve `link` (query and fragment already stripped) as referenced
    /// from `source`, returning the file it lands on.
    ///
    /// Root-relative links start at the web root; anything else starts at
    /// the directory containing `source`. A trailing `/` demands a directory
    /// index; otherwise the direct file wins, then each alternative extension
    /// in order, then the directory index.
    ///
    /// A link that climbs out of the web root never resolves, unless its
    /// source document already sits outside it.
    #[instrument(level = "trace", skip(self), ret)]
    pub fn resolve(&mut self, link: &str, source: &Path) -> Option<PathBuf> {
        let decoded = percent_decode_str(link).decode_utf8_lossy();
        let (base, confined) = match decoded.strip_prefix('/') {
            Some(rooted) => (self.web_root.join(rooted), true),
            None => {
                let directory = absolute(source).parent().map_or_else(|| PathBuf::from("/"), Path::to_path_buf);
                let confined = directory.starts_with(&self.web_root);
                (directory.join(decoded.as_ref()), confined)
            },
        };
        let target = normalize_path(&base);
        if confined && !target.starts_with(&self.web_root) {
            tracing::debug!(link, target = %target.display(), "Link escapes the web root");
            return None;
        }
        if decoded.is_empty() || decoded.ends_with('/') {
            return self.index_of(&target);
        }
        if self.entry(&target) == Some(Entry::File) {
            return Some(target);
        }
        for extension in &self.alternative_extensions.clone() {
            let mut candidate = target.clone().into_os_string();
            candidate.push(extension);
            let candidate = PathBuf::from(candidate);
            if self.entry(&candidate) == Some(Entry::File) {
                return Some(candidate);
            }
        }
        if self.entry(&target) == Some(Entry::Directory) {
            return self.index_of(&target);
        }
        None
    }

    /// Whether `file` contains an element with `id="fragment"`.
    pub fn has_fragment(&mut self, file: &Path, fragment: &str) -> bool {
        let file = absolute(file);
        let ids = self.fragments.entry(file).or_insert_with_key(|file| scan_ids(file));
        ids.contains(fragment)
    }

    fn index_of(&mut self, directory: &Path) -> Option<PathBuf> {
        if self.entry(directory) != Some(Entry::Directory) {
            return None;
        }
        let index = directory.join(&self.index_file);
        (self.entry(&index) == Some(Entry::File)).then_some(index)
    }

    /// What exists at `path`, with every component below the web root
    /// matched case-sensitively against its parent's listing.
    fn entry(&mut self, path: &Path) -> Option<Entry> {
        if let Some(known) = self.entries.get(path) {
            return *known;
        }
        let found = self.lookup(path);
        self.entries.insert(path.to_path_buf(), found);
        found
    }

    fn lookup(&mut self, path: &Path) -> Option<Entry> {
        let metadata = std::fs::metadata(path).ok()?;
        let kind = if metadata.is_dir() { Entry::Directory } else { Entry::File };
        let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
            return Some(kind);
        };
        if parent.starts_with(&self.web_root) && parent != self.web_root && self.entry(parent) != Some(Entry::Directory)
        {
            return None;
        }
        let listing = self.listings.entry(parent.to_path_buf()).or_insert_with_key(|parent| list(parent));
        listing.contains(name).then_some(kind)
    }
}

fn absolute(path: &Path) -> PathBuf {
    normalize_path(&std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf()))
}

/// Lexically resolve `.` and `..` without touching the filesystem.
fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => {
                normalized.pop();
            },
            other => normalized.push(other),
        }
    }
    normalized
}

fn list(directory: &Path) -> HashSet<OsString> {
    match std::fs::read_dir(directory) {
        Ok(entries) => entries.filter_map(|entry| entry.ok().map(|entry| entry.file_name())).collect(),
        Err(error) => {
            tracing::debug!(directory = %directory.display(), %error, "Could not list directory");
            HashSet::new()
        },
    }
}

fn scan_ids(file: &Path) -> HashSet<String> {
    let Ok(text) = std::fs::read_to_string(file) else {
        return HashSet::new();
    };
    consts::ID_ATTRIBUTE_REGEX
        .captures_iter(&text)
        .filter_map(|captures| captures.get(1).or_else(|| captures.get(2)))
        .map(|id| id.as_str().to_string())
        .collect()
}

/// Reports links to files (or fragments) that don't exist.
pub struct InternalLinks {
    check_fragments: bool,
    resolver: Resolver,
}

impl InternalLinks {
    pub const NAME: &'static str = "internal-links";

    pub fn new(options: InternalLinksOptions) -> Result<Self> {
        Ok(Self { check_fragments: options.check_fragments, resolver: Resolver::new(&options)? })
    }

    fn target(element: &Element) -> Option<&str> {
        match element.tag() {
            "a" | "link" => element.attr("href"),
            "script" | "img" | "iframe" => element.attr("src"),
            _ => None,
        }
    }
}

#[async_trait(?Send)]
impl Rule for InternalLinks {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn element_ready(&mut self, element: &Element, report: &mut Report) {
        let Some(link) = Self::target(element).map(str::trim) else {
            return;
        };
        if link.is_empty() || links::is_external(link) {
            return;
        }
        let (path, fragment) = links::split_link(link);
        let file = if path.is_empty() {
            Some(element.source().to_path_buf())
        } else {
            self.resolver.resolve(path, element.source())
        };
        let Some(file) = file else {
            report.add(Self::NAME, element, format!("Internal link {link} is broken"));
            return;
        };
        let Some(fragment) = fragment.filter(|fragment| self.check_fragments && !fragment.is_empty()) else {
            return;
        };
        let fragment = percent_decode_str(fragment).decode_utf8_lossy();
        if !self.resolver.has_fragment(&file, &fragment) {
            report.add(Self::NAME, element, format!("Internal link {link} points to missing fragment #{fragment}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::Arc;

    fn site(files: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for file in files {
            let path = dir.path().join(file);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, "<h1 id=\"top\">x</h1>").unwrap();
        }
        dir
    }

    fn resolver(root: &Path) -> Resolver {
        Resolver::new(&InternalLinksOptions { web_root: root.to_path_buf(), ..Default::default() }).unwrap()
    }

    #[rstest]
    #[case(&["about"], Some("about"))]
    #[case(&["about.html"], Some("about.html"))]
    #[case(&["about/index.html"], Some("about/index.html"))]
    #[case(&["about.html", "about/index.html"], Some("about.html"))]
    #[case(&["about", "about.html"], Some("about"))]
    #[case(&["about/other.html"], None)]
    #[case(&[], None)]
    fn test_resolution_order(#[case] files: &[&str], #[case] expected: Option<&str>) {
        let dir = site(files);
        let root = normalize_path(&std::path::absolute(dir.path()).unwrap());
        let source = root.join("index.html");
        let resolved = resolver(dir.path()).resolve("/about", &source);
        assert_eq!(resolved, expected.map(|file| root.join(file)));
    }

    #[test]
    fn test_case_mismatch_is_broken() {
        let dir = site(&["About", "Docs/guide.html"]);
        let source = dir.path().join("index.html");
        let mut resolver = resolver(dir.path());
        assert_eq!(resolver.resolve("/about", &source), None);
        assert_eq!(resolver.resolve("/docs/guide.html", &source), None);
        assert!(resolver.resolve("/About", &source).is_some());
        assert!(resolver.resolve("/Docs/guide", &source).is_some());
    }

    #[rstest]
    #[case("docs/", true)]
    #[case("blog/", false)]
    #[case("blog", false)]
    #[case("docs", true)]
    #[case("../docs/guide.html", true)]
    #[case("./guide", false)]
    fn test_relative_links(#[case] link: &str, #[case] resolves: bool) {
        let dir = site(&["docs/index.html", "docs/guide.html", "blog/post.html"]);
        let source = dir.path().join("index.html");
        let source = if link.starts_with("..") { dir.path().join("blog/post.html") } else { source };
        assert_eq!(resolver(dir.path()).resolve(link, &source).is_some(), resolves);
    }

    #[rstest]
    #[case("/../outside.html", "site/index.html")]
    #[case("/../../etc/hosts", "site/index.html")]
    #[case("/%2E%2E/outside.html", "site/index.html")]
    #[case("../outside.html", "site/index.html")]
    #[case("../../outside.html", "site/docs/page.html")]
    fn test_escaping_the_web_root_is_broken(#[case] link: &str, #[case] source: &str) {
        let dir = site(&["outside.html", "site/index.html", "site/docs/page.html"]);
        let root = dir.path().join("site");
        let source = dir.path().join(source);
        assert_eq!(resolver(&root).resolve(link, &source), None);
        assert!(resolver(&root).resolve("/docs/page.html", &source).is_some());
    }

    #[tokio::test]
    async fn test_rule_reports_escape_as_broken() {
        let dir = site(&["outside.html", "site/index.html"]);
        let root = dir.path().join("site");
        let options = InternalLinksOptions { web_root: root.clone(), ..Default::default() };
        let mut rule = InternalLinks::new(options).unwrap();
        let source = root.join("index.html");
        assert_eq!(check(&mut rule, &source, "/../outside.html").await, ["Internal link /../outside.html is broken"]);
    }

    #[test]
    fn test_percent_encoded_path() {
        let dir = site(&["my page.html"]);
        let source = dir.path().join("index.html");
        assert!(resolver(dir.path()).resolve("my%20page", &source).is_some());
    }

    async fn check(rule: &mut InternalLinks, source: &Path, href: &str) -> Vec<String> {
        let element = Element::new("a", Arc::from(source)).with_attr("href", href);
        let mut report = Report::default();
        rule.element_ready(&element, &mut report).await;
        report.into_violations().into_iter().map(|v| v.message).collect()
    }

    #[tokio::test]
    async fn test_rule_reports_broken_links_and_fragments() {
        let dir = site(&["index.html", "about.html"]);
        std::fs::write(dir.path().join("index.html"), "<a href='#team'>t</a><section id='team'></section>").unwrap();
        let source = dir.path().join("index.html");
        let options = InternalLinksOptions { web_root: dir.path().to_path_buf(), ..Default::default() };
        let mut rule = InternalLinks::new(options).unwrap();

        assert!(check(&mut rule, &source, "/about").await.is_empty());
        assert!(check(&mut rule, &source, "/about?lang=en#top").await.is_empty());
        assert!(check(&mut rule, &source, "#team").await.is_empty());
        assert!(check(&mut rule, &source, "#").await.is_empty());
        assert!(check(&mut rule, &source, "https://example.com/missing").await.is_empty());
        assert!(check(&mut rule, &source, "mailto:someone@example.com").await.is_empty());
        assert_eq!(check(&mut rule, &source, "/contact").await, ["Internal link /contact is broken"]);
        assert_eq!(check(&mut rule, &source, "/about#nobody").await, [
            "Internal link /about#nobody points to missing fragment #nobody"
        ]);
        assert_eq!(check(&mut rule, &source, "#history").await, [
            "Internal link #history points to missing fragment #history"
        ]);
    }

    #[tokio::test]
    async fn test_fragments_can_be_disabled() {
        let dir = site(&["index.html"]);
        let source = dir.path().join("index.html");
        let options =
            InternalLinksOptions { web_root: dir.path().to_path_buf(), check_fragments: false, ..Default::default() };
        let mut rule = InternalLinks::new(options).unwrap();
        assert!(check(&mut rule, &source, "/index.html#nowhere").await.is_empty());
    }

    #[rstest]
    #[case("/a/./b/../c", "/a/c")]
    #[case("/a/b/../../..", "/")]
    #[case("/a//b/", "/a/b")]
    fn test_normalize_path(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_path(Path::new(input)), PathBuf::from(expected));
    }
}
