//! Heuristic scraper for arbitrary careers pages.
//!
//! Page layouts are unknown ahead of time, so cards are discovered in two
//! stages. First an ordered list of listing selectors is tried and the first
//! selector with any match wins. If none match, every `div`, `li` and
//! `article` whose text mentions a job keyword becomes a candidate. The
//! keyword scan can pick up navigation or footer chrome that says "careers";
//! there is no confidence scoring.
//!
//! Fields are resolved per card with their own selector cascades, falling
//! back to `"N/A"`.

use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::config::CustomTarget;
use crate::error::ParseError;
use crate::fetcher::RawDocument;
use crate::models::{JobPosting, NOT_AVAILABLE};
use crate::scrapers::{compile, compile_all, element_text, first_text, resolve_url};
use crate::traits::{JobScraper, ScrapeTarget};

/// Postings kept per custom page
pub const MAX_CARDS_PER_PAGE: usize = 10;
/// Candidate elements considered before per-card parsing
pub const MAX_CANDIDATES: usize = 20;

const LISTING_SELECTORS: [&str; 8] = [
    r#"div[class*="job"]"#,
    r#"div[class*="position"]"#,
    r#"div[class*="career"]"#,
    r#"li[class*="job"]"#,
    r#"article[class*="job"]"#,
    ".job-listing",
    ".position-listing",
    ".career-listing",
];

const FALLBACK_ELEMENTS: &str = "div, li, article";
const JOB_KEYWORDS: [&str; 4] = ["job", "position", "career", "opportunity"];

const TITLE_SELECTORS: [&str; 7] = [
    "h1",
    "h2",
    "h3",
    "h4",
    r#"[class*="title"]"#,
    r#"[class*="position"]"#,
    r#"[class*="job-title"]"#,
];
const COMPANY_SELECTORS: [&str; 3] = [
    r#"[class*="company"]"#,
    r#"[class*="employer"]"#,
    r#"[class*="organization"]"#,
];
const LOCATION_SELECTORS: [&str; 3] = [
    r#"[class*="location"]"#,
    r#"[class*="place"]"#,
    r#"[class*="city"]"#,
];
const SALARY_SELECTORS: [&str; 3] = [
    r#"[class*="salary"]"#,
    r#"[class*="compensation"]"#,
    r#"[class*="pay"]"#,
];

static SALARY_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$?(\d+(?:,\d{3})*(?:\.\d{2})?)").expect("salary pattern is valid"));

struct HeuristicSelectors {
    listings: Vec<Selector>,
    fallback: Selector,
    title: Vec<Selector>,
    company: Vec<Selector>,
    location: Vec<Selector>,
    salary: Vec<Selector>,
    link: Selector,
}

impl HeuristicSelectors {
    fn new() -> Result<Self, ParseError> {
        Ok(Self {
            listings: compile_all(&LISTING_SELECTORS)?,
            fallback: compile(FALLBACK_ELEMENTS)?,
            title: compile_all(&TITLE_SELECTORS)?,
            company: compile_all(&COMPANY_SELECTORS)?,
            location: compile_all(&LOCATION_SELECTORS)?,
            salary: compile_all(&SALARY_SELECTORS)?,
            link: compile("a[href]")?,
        })
    }
}

pub struct CustomScraper {
    target: CustomTarget,
    source: String,
    selectors: HeuristicSelectors,
}

impl CustomScraper {
    pub fn new(target: CustomTarget) -> Result<Self, ParseError> {
        let source = format!("custom_{}", target.name);
        Ok(Self {
            target,
            source,
            selectors: HeuristicSelectors::new()?,
        })
    }

    fn find_job_elements<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        for selector in &self.selectors.listings {
            let elements: Vec<_> = document.select(selector).take(MAX_CANDIDATES).collect();
            if !elements.is_empty() {
                return elements;
            }
        }

        document
            .select(&self.selectors.fallback)
            .filter(|element| {
                let text = element_text(*element).to_lowercase();
                JOB_KEYWORDS.iter().any(|keyword| text.contains(keyword))
            })
            .take(MAX_CANDIDATES)
            .collect()
    }

    fn parse_card(&self, card: ElementRef<'_>) -> Result<JobPosting, ParseError> {
        let s = &self.selectors;

        let title = first_text(card, &s.title).unwrap_or_else(|| NOT_AVAILABLE.to_string());
        let company = first_text(card, &s.company)
            .or_else(|| self.target.company.clone().filter(|c| !c.trim().is_empty()))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());
        let location = first_text(card, &s.location).unwrap_or_else(|| NOT_AVAILABLE.to_string());

        let url = match card
            .select(&s.link)
            .next()
            .and_then(|link| link.value().attr("href"))
            .filter(|href| !href.trim().is_empty())
        {
            Some(href) => resolve_url(href, &self.target.url)?,
            None => self.target.url.clone(),
        };

        let (salary_min, salary_max) = first_text(card, &s.salary)
            .map_or((None, None), |text| parse_salary(&text));

        let mut job = JobPosting::new(title, company, url, self.source.clone());
        job.location = Some(location);
        job.salary_min = salary_min;
        job.salary_max = salary_max;
        job.metadata.insert("source_url".to_string(), self.target.url.clone());
        job.metadata.insert("scraped_at".to_string(), Utc::now().to_rfc3339());

        Ok(job)
    }
}

impl JobScraper for CustomScraper {
    fn source(&self) -> &str {
        &self.source
    }

    fn targets(&self) -> Vec<ScrapeTarget> {
        vec![ScrapeTarget {
            url: self.target.url.clone(),
            context: self.target.name.clone(),
        }]
    }

    fn extract(&self, document: &RawDocument, _target: &ScrapeTarget) -> Vec<Result<JobPosting, ParseError>> {
        let html = Html::parse_document(&document.body);

        self.find_job_elements(&html)
            .into_iter()
            .take(MAX_CARDS_PER_PAGE)
            .map(|card| self.parse_card(card))
            .collect()
    }
}

/// Salary bounds from free text such as `"$60,000 - $75,000"`.
///
/// The first two amounts are `(min, max)`, a single amount is a minimum
/// only. Currency and period are not interpreted.
pub fn parse_salary(text: &str) -> (Option<f64>, Option<f64>) {
    let mut amounts = SALARY_AMOUNT
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| m.as_str().replace(',', "").parse::<f64>().ok());

    match (amounts.next(), amounts.next()) {
        (Some(min), Some(max)) => (Some(min), Some(max)),
        (Some(min), None) => (Some(min), None),
        _ => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::fetcher::Fetcher;
    use crate::fetcher::tests::{StaticSite, quiet_config};

    fn target(company: Option<&str>) -> CustomTarget {
        CustomTarget {
            name: "acme".to_string(),
            url: "https://acme.example/careers".to_string(),
            company: company.map(ToString::to_string),
            enabled: true,
        }
    }

    fn extract(body: &str, company: Option<&str>) -> Vec<Result<JobPosting, ParseError>> {
        let scraper = CustomScraper::new(target(company)).unwrap();
        let document = RawDocument {
            url: "https://acme.example/careers".to_string(),
            status: 200,
            body: body.to_string(),
        };
        let targets = scraper.targets();
        scraper.extract(&document, &targets[0])
    }

    fn ok(results: Vec<Result<JobPosting, ParseError>>) -> Vec<JobPosting> {
        results.into_iter().map(Result::unwrap).collect()
    }

    #[test]
    fn parses_salary_ranges() {
        assert_eq!(parse_salary("$60,000 - $75,000"), (Some(60000.0), Some(75000.0)));
        assert_eq!(parse_salary("$50,000+"), (Some(50000.0), None));
        assert_eq!(parse_salary(""), (None, None));
        assert_eq!(parse_salary("Competitive"), (None, None));
        assert_eq!(parse_salary("$22.50 - $28.75 / hour"), (Some(22.5), Some(28.75)));
        assert_eq!(parse_salary("40000 to 50000 to 60000"), (Some(40000.0), Some(50000.0)));
    }

    #[test]
    fn listing_selectors_extract_fields() {
        let body = r#"
            <div class="job-card">
                <h3>Backend Intern</h3>
                <span class="company-name">Acme Robotics</span>
                <span class="job-location">Remote</span>
                <span class="salary-range">$60,000 - $75,000</span>
                <a href="/careers/backend-intern">Apply</a>
            </div>"#;

        let jobs = ok(extract(body, None));
        assert_eq!(jobs.len(), 1);
        let job = &jobs[0];
        assert_eq!(job.title, "Backend Intern");
        assert_eq!(job.company, "Acme Robotics");
        assert_eq!(job.location.as_deref(), Some("Remote"));
        assert_eq!(job.salary_min, Some(60000.0));
        assert_eq!(job.salary_max, Some(75000.0));
        assert_eq!(job.url, "https://acme.example/careers/backend-intern");
        assert_eq!(job.source, "custom_acme");
        assert_eq!(
            job.metadata.get("source_url").map(String::as_str),
            Some("https://acme.example/careers")
        );
    }

    #[test]
    fn first_matching_listing_selector_wins() {
        let body = r#"
            <div class="position-row"><h2>Ignored</h2></div>
            <div class="job-row"><h2>Picked</h2></div>"#;
        let jobs = ok(extract(body, None));
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].title, "Picked");
    }

    #[test]
    fn company_falls_back_to_configured_then_sentinel() {
        let body = r#"<div class="job"><h2>Designer</h2></div>"#;
        assert_eq!(ok(extract(body, Some("Acme")))[0].company, "Acme");
        assert_eq!(ok(extract(body, None))[0].company, "N/A");
    }

    #[test]
    fn missing_fields_default_to_sentinel() {
        let jobs = ok(extract(r#"<li class="job-item"></li>"#, None));
        let job = &jobs[0];
        assert_eq!(job.title, "N/A");
        assert_eq!(job.location.as_deref(), Some("N/A"));
        assert_eq!((job.salary_min, job.salary_max), (None, None));
        assert_eq!(job.url, "https://acme.example/careers");
    }

    #[test]
    fn relative_and_absolute_links() {
        let body = r#"
            <article class="job"><h2>A</h2><a href="openings/a">a</a></article>
            <article class="job"><h2>B</h2><a href="https://boards.example/b">b</a></article>"#;
        let jobs = ok(extract(body, None));
        assert_eq!(jobs[0].url, "https://acme.example/careers/openings/a");
        assert_eq!(jobs[1].url, "https://boards.example/b");
    }

    #[test]
    fn falls_back_to_keyword_scan() {
        let body = r#"
            <section>
                <p>Welcome</p>
                <li><h4>Open position: QA Intern</h4></li>
                <li><h4>About us</h4></li>
            </section>"#;
        let jobs = ok(extract(body, None));
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].title, "Open position: QA Intern");
    }

    #[test]
    fn keyword_scan_without_matches_is_empty() {
        let body = "<div><p>Our team</p></div><ul><li>Contact</li></ul>";
        assert!(extract(body, None).is_empty());
    }

    #[test]
    fn caps_postings_per_page() {
        let body: String = (0..25)
            .map(|i| format!(r#"<div class="job"><h3>Role {i}</h3></div>"#))
            .collect();
        let jobs = extract(&body, None);
        assert_eq!(jobs.len(), MAX_CARDS_PER_PAGE);
    }

    #[test]
    fn keyword_scan_caps_candidates() {
        let scraper = CustomScraper::new(target(None)).unwrap();
        let body: String = (0..40).map(|i| format!("<li>Job opening {i}</li>")).collect();
        let html = Html::parse_document(&body);
        assert_eq!(scraper.find_job_elements(&html).len(), MAX_CANDIDATES);
    }

    #[test]
    fn bad_base_url_drops_only_affected_cards() {
        let scraper = CustomScraper::new(CustomTarget {
            url: "careers".to_string(),
            ..target(None)
        })
        .unwrap();
        let document = RawDocument {
            url: "careers".to_string(),
            status: 200,
            body: r#"
                <div class="job"><h2>Root link</h2><a href="/jobs/1">x</a></div>
                <div class="job"><h2>No link</h2></div>"#
                .to_string(),
        };
        let results = scraper.extract(&document, &scraper.targets()[0]);
        assert_eq!(results.len(), 2);
        assert!(results[0].is_err());
        assert_eq!(results[1].as_ref().unwrap().title, "No link");
    }

    #[tokio::test]
    async fn scrape_keeps_good_cards_past_a_bad_one() {
        let scraper = CustomScraper::new(CustomTarget {
            url: "careers".to_string(),
            ..target(None)
        })
        .unwrap();
        let site = StaticSite::new([(
            "careers",
            r#"
                <div class="job"><h2>Bad</h2><a href="/jobs/1">x</a></div>
                <div class="job"><h2>Good</h2></div>"#,
        )]);
        let fetcher = Fetcher::with_client(quiet_config(), Arc::new(site));

        let report = scraper.scrape(&fetcher).await;

        assert!(report.failures.is_empty());
        assert_eq!(report.postings.len(), 1);
        assert_eq!(report.postings[0].title, "Good");
        assert_eq!(report.postings[0].source, "custom_acme");
    }
}
