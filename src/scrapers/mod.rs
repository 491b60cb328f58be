//! Source scrapers and the markup helpers they share.
//!
//! Sources are dispatched by configuration tag through [`SourceScraper`]:
//! structured sources use fixed anchors ([`LinkedinScraper`]), custom pages
//! use cascading heuristics ([`CustomScraper`]).

pub mod custom;
pub mod linkedin;

use async_trait::async_trait;
use reqwest::Url;
use scraper::{ElementRef, Selector};

use crate::config::SourceSpec;
use crate::error::ParseError;
use crate::fetcher::{Fetcher, RawDocument};
use crate::models::JobPosting;
use crate::traits::{JobScraper, ScrapeReport, ScrapeTarget};

pub use custom::CustomScraper;
pub use linkedin::LinkedinScraper;

/// A configured source, selected by its configuration tag.
pub enum SourceScraper {
    Structured(LinkedinScraper),
    Heuristic(CustomScraper),
}

impl SourceScraper {
    pub fn for_source(spec: &SourceSpec) -> Result<Self, ParseError> {
        match spec {
            SourceSpec::Structured { params, .. } => Ok(Self::Structured(LinkedinScraper::new(params.clone())?)),
            SourceSpec::Heuristic(target) => Ok(Self::Heuristic(CustomScraper::new(target.clone())?)),
        }
    }

    fn inner(&self) -> &dyn JobScraper {
        match self {
            Self::Structured(scraper) => scraper,
            Self::Heuristic(scraper) => scraper,
        }
    }
}

#[async_trait]
impl JobScraper for SourceScraper {
    fn source(&self) -> &str {
        self.inner().source()
    }

    fn targets(&self) -> Vec<ScrapeTarget> {
        self.inner().targets()
    }

    fn extract(&self, document: &RawDocument, target: &ScrapeTarget) -> Vec<Result<JobPosting, ParseError>> {
        self.inner().extract(document, target)
    }

    async fn scrape(&self, fetcher: &Fetcher) -> ScrapeReport {
        self.inner().scrape(fetcher).await
    }
}

pub(crate) fn compile(selector: &str) -> Result<Selector, ParseError> {
    Selector::parse(selector).map_err(|_| ParseError::Selector(selector.to_string()))
}

pub(crate) fn compile_all(selectors: &[&str]) -> Result<Vec<Selector>, ParseError> {
    selectors.iter().map(|s| compile(s)).collect()
}

/// Visible text of an element, whitespace-normalized.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the first descendant matched by `selector`, if it is non-empty.
pub(crate) fn select_text(element: ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(element_text)
        .filter(|text| !text.is_empty())
}

/// First non-empty text across a cascade of selectors.
pub(crate) fn first_text(element: ElementRef<'_>, selectors: &[Selector]) -> Option<String> {
    selectors.iter().find_map(|selector| select_text(element, selector))
}

/// Resolves a card link against the page it was found on.
///
/// Absolute links are kept, protocol-relative links get `https:`,
/// root-relative links are joined to the base URL's origin and anything
/// else is appended to the base URL as a path segment.
pub(crate) fn resolve_url(href: &str, base_url: &str) -> Result<String, ParseError> {
    let href = href.trim();

    if href.starts_with("http://") || href.starts_with("https://") {
        return Ok(href.to_string());
    }

    if href.starts_with("//") {
        return Ok(format!("https:{href}"));
    }

    if href.starts_with('/') {
        let base = Url::parse(base_url).map_err(|e| ParseError::Url {
            href: href.to_string(),
            reason: format!("invalid base url `{base_url}`: {e}"),
        })?;
        let origin = base.origin();
        if !origin.is_tuple() {
            return Err(ParseError::Url {
                href: href.to_string(),
                reason: format!("base url `{base_url}` has no origin"),
            });
        }
        return Ok(format!("{}{href}", origin.ascii_serialization()));
    }

    Ok(format!("{}/{href}", base_url.trim_end_matches('/')))
}

#[cfg(test)]
mod tests {
    use scraper::Html;

    use super::*;

    #[test]
    fn absolute_links_are_kept() {
        assert_eq!(
            resolve_url("https://jobs.example/1", "https://acme.example/careers").unwrap(),
            "https://jobs.example/1"
        );
    }

    #[test]
    fn root_relative_links_join_origin() {
        assert_eq!(
            resolve_url("/jobs/42", "https://acme.example/careers/").unwrap(),
            "https://acme.example/jobs/42"
        );
        assert_eq!(
            resolve_url("/jobs/42", "http://acme.example:8080/careers").unwrap(),
            "http://acme.example:8080/jobs/42"
        );
    }

    #[test]
    fn bare_links_append_to_base() {
        assert_eq!(
            resolve_url("posting?id=7", "https://acme.example/careers/").unwrap(),
            "https://acme.example/careers/posting?id=7"
        );
    }

    #[test]
    fn protocol_relative_links_use_https() {
        assert_eq!(
            resolve_url("//cdn.example/job", "https://acme.example").unwrap(),
            "https://cdn.example/job"
        );
    }

    #[test]
    fn root_relative_link_needs_valid_base() {
        let err = resolve_url("/jobs/1", "not a url").unwrap_err();
        assert!(matches!(err, ParseError::Url { .. }));
    }

    #[test]
    fn first_text_skips_empty_matches() {
        let html = Html::parse_fragment(r#"<div><h2>  </h2><span class="title">  Data   Intern </span></div>"#);
        let root = html.root_element();
        let selectors = compile_all(&["h2", "[class*=\"title\"]"]).unwrap();
        assert_eq!(first_text(root, &selectors).as_deref(), Some("Data Intern"));
    }

    #[test]
    fn rejects_invalid_selector() {
        assert!(matches!(compile("div[[["), Err(ParseError::Selector(_))));
    }
}
