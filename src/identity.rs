//! Posting identity.
//!
//! A posting is identified by the MD5 digest of its title, company and url.
//! The same triple always yields the same 32-char lowercase hex id, across
//! runs and restarts, which is what lets the store drop re-scraped postings.

/// ASCII unit separator, never produced by the text extractors.
const FIELD_SEPARATOR: char = '\u{1f}';

pub fn job_id(title: &str, company: &str, url: &str) -> String {
    let content = format!("{title}{FIELD_SEPARATOR}{company}{FIELD_SEPARATOR}{url}");
    format!("{:x}", md5::compute(content.as_bytes()))
}
