//! LinkedIn public job search scraper

use chrono::Utc;
use scraper::{ElementRef, Html, Selector};

use crate::config::SearchParams;
use crate::config::sources::LINKEDIN;
use crate::error::ParseError;
use crate::fetcher::RawDocument;
use crate::models::{JobPosting, NOT_AVAILABLE};
use crate::scrapers::{compile, resolve_url, select_text};
use crate::traits::{JobScraper, ScrapeTarget};

const BASE_URL: &str = "https://www.linkedin.com";
const SEARCH_URL: &str = "https://www.linkedin.com/jobs/search";

/// Cards read from a single search results page
pub const MAX_CARDS_PER_PAGE: usize = 20;

struct CardSelectors {
    card: Selector,
    title: Selector,
    company: Selector,
    location: Selector,
    link: Selector,
    posted: Selector,
}

impl CardSelectors {
    fn new() -> Result<Self, ParseError> {
        Ok(Self {
            card: compile("div.base-card")?,
            title: compile("h3.base-search-card__title")?,
            company: compile("h4.base-search-card__subtitle")?,
            location: compile("span.job-search-card__location")?,
            link: compile("a.base-card__full-link")?,
            posted: compile("time")?,
        })
    }
}

/// Scraper for LinkedIn's guest search pages, one page per keyword.
pub struct LinkedinScraper {
    params: SearchParams,
    selectors: CardSelectors,
}

impl LinkedinScraper {
    pub fn new(params: SearchParams) -> Result<Self, ParseError> {
        Ok(Self {
            params,
            selectors: CardSelectors::new()?,
        })
    }

    /// Internship search, entry level by default, on-site and remote.
    pub fn build_search_url(&self, keyword: &str) -> String {
        format!(
            "{SEARCH_URL}?keywords={}&location={}&f_E={}&f_JT=I&f_WT={}&start=0",
            urlencoding::encode(keyword),
            urlencoding::encode(&self.params.location),
            urlencoding::encode(&self.params.experience_level),
            urlencoding::encode("1,2"),
        )
    }

    fn parse_card(&self, card: ElementRef<'_>, keyword: &str) -> Result<JobPosting, ParseError> {
        let s = &self.selectors;

        let title = select_text(card, &s.title).unwrap_or_else(|| NOT_AVAILABLE.to_string());
        let company = select_text(card, &s.company).unwrap_or_else(|| NOT_AVAILABLE.to_string());
        let location = select_text(card, &s.location).unwrap_or_else(|| NOT_AVAILABLE.to_string());

        let url = match card
            .select(&s.link)
            .next()
            .and_then(|link| link.value().attr("href"))
            .map(str::trim)
            .filter(|href| !href.is_empty())
        {
            Some(href) => strip_tracking(&resolve_url(href, BASE_URL)?),
            None => String::new(),
        };

        let posted_date = card
            .select(&s.posted)
            .next()
            .and_then(|time| time.value().attr("datetime"))
            .map(|date| date.trim().to_string())
            .unwrap_or_default();

        let mut job = JobPosting::new(title, company, url, LINKEDIN);
        job.location = Some(location);
        job.posted_date = Some(posted_date);
        job.metadata.insert("keyword".to_string(), keyword.to_string());
        job.metadata.insert("scraped_at".to_string(), Utc::now().to_rfc3339());

        Ok(job)
    }
}

/// Drops query and fragment; search result links carry per-request tracking ids.
fn strip_tracking(url: &str) -> String {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    url[..end].to_string()
}

impl JobScraper for LinkedinScraper {
    fn source(&self) -> &str {
        LINKEDIN
    }

    fn targets(&self) -> Vec<ScrapeTarget> {
        self.params
            .keywords
            .iter()
            .map(|keyword| ScrapeTarget {
                url: self.build_search_url(keyword),
                context: keyword.clone(),
            })
            .collect()
    }

    fn extract(&self, document: &RawDocument, target: &ScrapeTarget) -> Vec<Result<JobPosting, ParseError>> {
        let html = Html::parse_document(&document.body);

        html.select(&self.selectors.card)
            .take(MAX_CARDS_PER_PAGE)
            .map(|card| self.parse_card(card, &target.context))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scraper() -> LinkedinScraper {
        LinkedinScraper::new(SearchParams {
            keywords: vec!["software intern".to_string()],
            location: "Toronto, ON".to_string(),
            experience_level: "1".to_string(),
        })
        .unwrap()
    }

    fn page(body: String) -> RawDocument {
        RawDocument {
            url: SEARCH_URL.to_string(),
            status: 200,
            body,
        }
    }

    fn target() -> ScrapeTarget {
        ScrapeTarget {
            url: SEARCH_URL.to_string(),
            context: "software intern".to_string(),
        }
    }

    fn card(n: usize) -> String {
        format!(
            r#"<div class="base-card">
                <a class="base-card__full-link" href="https://ca.linkedin.com/jobs/view/intern-{n}?refId=abc&trackingId=xyz"></a>
                <h3 class="base-search-card__title"> Software Intern {n} </h3>
                <h4 class="base-search-card__subtitle"><a>Company {n}</a></h4>
                <span class="job-search-card__location">Toronto, Ontario, Canada</span>
                <time class="job-search-card__listdate" datetime="2025-08-0{d}">1 day ago</time>
            </div>"#,
            d = n % 9 + 1
        )
    }

    #[test]
    fn builds_encoded_search_url() {
        assert_eq!(
            scraper().build_search_url("software intern"),
            "https://www.linkedin.com/jobs/search?keywords=software%20intern&location=Toronto%2C%20ON&f_E=1&f_JT=I&f_WT=1%2C2&start=0"
        );
    }

    #[test]
    fn one_target_per_keyword() {
        let scraper = LinkedinScraper::new(SearchParams {
            keywords: vec!["a".to_string(), "b".to_string()],
            ..SearchParams::default()
        })
        .unwrap();
        let targets = scraper.targets();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[1].context, "b");
        assert!(targets[0].url.contains("location=Canada"));
    }

    #[test]
    fn extracts_card_fields() {
        let results = scraper().extract(&page(format!("<ul><li>{}</li></ul>", card(1))), &target());
        assert_eq!(results.len(), 1);

        let job = results[0].as_ref().unwrap();
        assert_eq!(job.title, "Software Intern 1");
        assert_eq!(job.company, "Company 1");
        assert_eq!(job.location.as_deref(), Some("Toronto, Ontario, Canada"));
        assert_eq!(job.url, "https://ca.linkedin.com/jobs/view/intern-1");
        assert_eq!(job.posted_date.as_deref(), Some("2025-08-02"));
        assert_eq!(job.source, "linkedin");
        assert_eq!(job.metadata.get("keyword").map(String::as_str), Some("software intern"));
        assert!(job.metadata.contains_key("scraped_at"));
        assert_eq!(
            job.job_id,
            crate::identity::job_id("Software Intern 1", "Company 1", "https://ca.linkedin.com/jobs/view/intern-1")
        );
    }

    #[test]
    fn missing_fields_use_sentinels() {
        let results = scraper().extract(&page(r#"<div class="base-card"><p>empty</p></div>"#.to_string()), &target());
        let job = results[0].as_ref().unwrap();
        assert_eq!(job.title, "N/A");
        assert_eq!(job.company, "N/A");
        assert_eq!(job.location.as_deref(), Some("N/A"));
        assert_eq!(job.url, "");
        assert_eq!(job.posted_date.as_deref(), Some(""));
    }

    #[test]
    fn relative_links_resolve_against_site() {
        let body = r#"<div class="base-card"><a class="base-card__full-link" href="/jobs/view/9?trk=x"></a></div>"#;
        let results = scraper().extract(&page(body.to_string()), &target());
        assert_eq!(results[0].as_ref().unwrap().url, "https://www.linkedin.com/jobs/view/9");
    }

    #[test]
    fn caps_cards_per_page() {
        let body: String = (0..35).map(card).collect();
        let results = scraper().extract(&page(body), &target());
        assert_eq!(results.len(), MAX_CARDS_PER_PAGE);
        assert!(results.iter().all(Result::is_ok));
    }

    #[test]
    fn layout_change_yields_no_postings() {
        let body = r#"<div class="job-card-v2"><h3>Intern</h3></div>"#;
        assert!(scraper().extract(&page(body.to_string()), &target()).is_empty());
    }

    #[test]
    fn same_posting_keeps_identity_across_scrapes() {
        let first = scraper().extract(&page(card(3)), &target());
        let second = scraper().extract(&page(card(3).replace("abc", "def")), &target());
        assert_eq!(
            first[0].as_ref().unwrap().job_id,
            second[0].as_ref().unwrap().job_id
        );
    }
}
