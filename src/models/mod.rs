//! Data models for scraped job postings

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity;

/// Sentinel stored when a required text field could not be extracted.
pub const NOT_AVAILABLE: &str = "N/A";

/// A job posting scraped from a source.
///
/// `job_id` is derived from `(title, company, url)` and is the dedup key.
/// Once stored, only `is_new` ever changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub job_id: String,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub description: Option<String>,
    pub url: String,
    pub source: String,
    pub posted_date: Option<String>,
    pub scraped_at: DateTime<Utc>,
    pub is_new: bool,
    pub applied: bool,
    pub metadata: BTreeMap<String, String>,
}

impl JobPosting {
    /// Builds a fresh posting and computes its identity.
    pub fn new(title: String, company: String, url: String, source: impl Into<String>) -> Self {
        let job_id = identity::job_id(&title, &company, &url);
        Self {
            job_id,
            title,
            company,
            location: None,
            salary_min: None,
            salary_max: None,
            description: None,
            url,
            source: source.into(),
            posted_date: None,
            scraped_at: Utc::now(),
            is_new: true,
            applied: false,
            metadata: BTreeMap::new(),
        }
    }

    /// Human-readable salary range, if any bound is known.
    ///
    /// Both bounds give `$60,000 - $75,000`, a lone minimum gives `$50,000+`.
    pub fn salary_range(&self) -> Option<String> {
        match (self.salary_min, self.salary_max) {
            (Some(min), Some(max)) => Some(format!("${} - ${}", group_thousands(min), group_thousands(max))),
            (Some(min), None) => Some(format!("${}+", group_thousands(min))),
            _ => None,
        }
    }
}

/// Aggregate counts over the stored postings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JobStats {
    pub total: i64,
    pub new: i64,
    pub by_source: Vec<(String, i64)>,
}

fn group_thousands(value: f64) -> String {
    #[allow(clippy::cast_possible_truncation)]
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting() -> JobPosting {
        JobPosting::new(
            "Backend Intern".to_string(),
            "Acme".to_string(),
            "https://acme.example/jobs/1".to_string(),
            "custom_acme",
        )
    }

    #[test]
    fn new_posting_is_marked_new_with_identity() {
        let job = posting();
        assert!(job.is_new);
        assert!(!job.applied);
        assert_eq!(
            job.job_id,
            identity::job_id("Backend Intern", "Acme", "https://acme.example/jobs/1")
        );
    }

    #[test]
    fn salary_range_formats_bounds() {
        let mut job = posting();
        assert_eq!(job.salary_range(), None);

        job.salary_min = Some(50_000.0);
        assert_eq!(job.salary_range().as_deref(), Some("$50,000+"));

        job.salary_max = Some(1_250_000.0);
        assert_eq!(job.salary_range().as_deref(), Some("$50,000 - $1,250,000"));
    }

    #[test]
    fn max_without_min_is_omitted() {
        let mut job = posting();
        job.salary_max = Some(80_000.0);
        assert_eq!(job.salary_range(), None);
    }

    #[test]
    fn groups_small_numbers_untouched() {
        assert_eq!(group_thousands(950.0), "950");
        assert_eq!(group_thousands(1000.0), "1,000");
        assert_eq!(group_thousands(123_456.4), "123,456");
    }
}
