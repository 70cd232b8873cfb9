//! Extraction rules for search and repository pages.
//!
//! Everything here is a pure function of a response body, so rules can be
//! tested and swapped without any network code.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::result::{LanguageStats, RepoResult};
use crate::{CrawlError, Result};

/// Repository identifiers embedded as an escaped JSON string field.
static REPO_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"hl_name":"([^"]+)"#).expect("valid regex"));

static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<.*?>").expect("valid regex"));

const LANGUAGE_ANCHOR: &str =
    r#"a[data-ga-click="Repository, language stats search click, location:repo overview"]"#;
const LANGUAGE_NAME: &str = r#"span[class="color-fg-default text-bold mr-1"]"#;
const LANGUAGE_PERCENT: &str = "span:not([class])";

/// A repository found on a search page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoLink {
    /// Path fragment such as `owner/name`.
    pub path: String,
    /// Absolute URL joined onto the site base.
    pub url: String,
}

impl RepoLink {
    /// First segment of the path.
    pub fn owner(&self) -> &str {
        self.path.split('/').next().unwrap_or_default()
    }

    /// The result for this link without detail.
    pub fn into_result(self) -> RepoResult {
        RepoResult::new(self.url)
    }
}

/// Decodes one raw `hl_name` fragment into a plain path.
///
/// Applies JSON unicode-escape decoding, then HTML entity decoding, then
/// strips highlight markup such as `<em>`.
pub fn clean_fragment(raw: &str) -> String {
    let unescaped = serde_json::from_str::<String>(&format!("\"{}\"", raw))
        .unwrap_or_else(|_| raw.to_string());
    let decoded = html_escape::decode_html_entities(&unescaped);
    TAG_PATTERN.replace_all(&decoded, "").trim().to_string()
}

/// Extracts repository links from a search page, deduplicated by URL in
/// first-seen order.
pub fn extract_repo_links(base: &Url, body: &str) -> Vec<RepoLink> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for caps in REPO_NAME_PATTERN.captures_iter(body) {
        let path = clean_fragment(&caps[1]);
        if path.is_empty() {
            continue;
        }
        let Ok(url) = base.join(&path) else {
            continue;
        };
        let url = url.to_string();
        if seen.insert(url.clone()) {
            links.push(RepoLink { path, url });
        }
    }

    links
}

/// A rule turning a repository page into language statistics.
pub trait DetailRule: Send + Sync {
    fn extract(&self, html: &str) -> LanguageStats;
}

/// Reads the language bar of a repository overview page.
#[derive(Debug, Clone)]
pub struct LanguageStatsRule {
    anchor: Selector,
    name: Selector,
    percent: Selector,
}

impl LanguageStatsRule {
    /// Builds the rule from the site's current markup.
    pub fn new() -> Result<Self> {
        Self::with_selectors(LANGUAGE_ANCHOR, LANGUAGE_NAME, LANGUAGE_PERCENT)
    }

    /// Builds the rule from custom CSS selectors.
    pub fn with_selectors(anchor: &str, name: &str, percent: &str) -> Result<Self> {
        Ok(Self {
            anchor: parse_selector(anchor)?,
            name: parse_selector(name)?,
            percent: parse_selector(percent)?,
        })
    }
}

impl DetailRule for LanguageStatsRule {
    fn extract(&self, html: &str) -> LanguageStats {
        let document = Html::parse_document(html);
        let mut stats = LanguageStats::new();

        for anchor in document.select(&self.anchor) {
            let name = anchor.select(&self.name).next().and_then(first_text);
            let percent = anchor.select(&self.percent).next().and_then(first_text);

            if let (Some(name), Some(percent)) = (name, percent) {
                stats.insert(name, percent);
            }
        }

        stats
    }
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| CrawlError::Parse(format!("Failed to parse selector {}: {:?}", css, e)))
}

fn first_text(element: ElementRef<'_>) -> Option<String> {
    element
        .text()
        .map(str::trim)
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://github.com").unwrap()
    }

    #[test]
    fn test_clean_fragment_plain() {
        assert_eq!(clean_fragment("python/cpython"), "python/cpython");
    }

    #[test]
    fn test_clean_fragment_unicode_and_markup() {
        let raw = r"\u003cem\u003epython\u003c/em\u003e/cpython";
        assert_eq!(clean_fragment(raw), "python/cpython");
    }

    #[test]
    fn test_clean_fragment_html_entities() {
        assert_eq!(clean_fragment("a&amp;b/repo"), "a&b/repo");
        assert_eq!(clean_fragment("&lt;em&gt;nova&lt;/em&gt;/nova"), "nova/nova");
    }

    #[test]
    fn test_clean_fragment_invalid_escape_kept() {
        assert_eq!(clean_fragment(r"owner/re\po"), r"owner/re\po");
    }

    #[test]
    fn test_extract_repo_links_dedup_and_order() {
        let body = r#"
            {"hl_name":"<em>foo</em>/repo2","id":2}
            {"hl_name":"owner/repo1","id":1}
            {"hl_name":"<em>foo</em>/repo2","id":3}
        "#;
        let links = extract_repo_links(&base(), body);
        let urls: Vec<_> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://github.com/foo/repo2", "https://github.com/owner/repo1"]
        );
        assert_eq!(links[0].owner(), "foo");
        assert_eq!(links[1].path, "owner/repo1");
        assert_eq!(
            links[1].clone().into_result(),
            RepoResult::new("https://github.com/owner/repo1")
        );
    }

    #[test]
    fn test_extract_repo_links_idempotent() {
        let body = r#"{"hl_name":"a/b"},{"hl_name":"c/d"},{"hl_name":"a/b"}"#;
        assert_eq!(
            extract_repo_links(&base(), body),
            extract_repo_links(&base(), body)
        );
    }

    #[test]
    fn test_extract_repo_links_none() {
        assert!(extract_repo_links(&base(), "<html><body>No results</body></html>").is_empty());
    }

    #[test]
    fn test_extract_repo_links_skips_empty_paths() {
        let body = r#"{"hl_name":"<em></em>"},{"hl_name":"x/y"}"#;
        let links = extract_repo_links(&base(), body);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://github.com/x/y");
    }

    #[test]
    fn test_language_stats_rule() {
        let html = r#"
            <html><body><ul>
              <li><a data-ga-click="Repository, language stats search click, location:repo overview" href="/x">
                <svg></svg>
                <span class="color-fg-default text-bold mr-1">Python</span>
                <span>98.2%</span>
              </a></li>
              <li><a data-ga-click="Repository, language stats search click, location:repo overview" href="/y">
                <span class="color-fg-default text-bold mr-1">Shell</span>
                <span>1.8%</span>
              </a></li>
              <li><a data-ga-click="Repository, language stats search click, location:repo overview" href="/z">
                <span class="color-fg-default text-bold mr-1">Orphan</span>
              </a></li>
              <li><a href="/other"><span class="color-fg-default text-bold mr-1">Ignored</span><span>5%</span></a></li>
            </ul></body></html>
        "#;
        let rule = LanguageStatsRule::new().unwrap();
        let stats = rule.extract(html);
        assert_eq!(stats.len(), 2);
        let entries: Vec<_> = stats.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(entries, vec![("Python", "98.2%"), ("Shell", "1.8%")]);
    }

    #[test]
    fn test_language_stats_rule_empty_page() {
        let rule = LanguageStatsRule::new().unwrap();
        assert!(rule.extract("<html></html>").is_empty());
    }

    #[test]
    fn test_language_stats_rule_bad_selector() {
        let result = LanguageStatsRule::with_selectors("a[", "span", "span");
        assert!(matches!(result, Err(CrawlError::Parse(_))));
    }
}
