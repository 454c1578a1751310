//! URL harvesting from raw resume text.
//!
//! Models regularly drop or mangle profile links, so the parser re-reads the
//! source text and fills whatever the model left empty.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::models::resume::ParsedResume;

static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)(?:https?://|www\.)[^\s<>"']+"#).unwrap());
static LINKEDIN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:https?://)?(?:www\.)?linkedin\.com/(?:in|pub|company)/[\w\-]+").unwrap()
});
static GITHUB_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:https?://)?(?:www\.)?github\.com/[\w\-]+").unwrap());
static TWITTER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:https?://)?(?:www\.)?(?:twitter|x)\.com/\w+").unwrap());

const PORTFOLIO_KEYWORDS: &[&str] = &[
    "portfolio",
    "about",
    "me",
    "dev",
    "design",
    "blog",
    "projects",
    "github.io",
    "behance",
    "dribbble",
];

/// Links classified from a resume's text.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ExtractedLinks {
    pub linkedin_url: Option<String>,
    pub github_url: Option<String>,
    pub twitter_url: Option<String>,
    pub portfolio_url: Option<String>,
    /// Sorted, deduplicated leftovers.
    pub other: Vec<String>,
}

/// Finds and classifies every URL in `text`. The first match of each profile
/// kind wins.
pub fn extract_links(text: &str) -> ExtractedLinks {
    let mut seen = BTreeSet::new();
    let mut urls = Vec::new();
    for m in URL_REGEX.find_iter(text) {
        let url = clean(m.as_str());
        if !url.is_empty() && seen.insert(url.to_string()) {
            urls.push(url.to_string());
        }
    }

    let mut links = ExtractedLinks::default();
    let mut remaining = Vec::new();
    for url in urls {
        if links.linkedin_url.is_none() && LINKEDIN_REGEX.is_match(&url) {
            links.linkedin_url = Some(url);
        } else if links.github_url.is_none() && GITHUB_REGEX.is_match(&url) {
            links.github_url = Some(url);
        } else if links.twitter_url.is_none() && TWITTER_REGEX.is_match(&url) {
            links.twitter_url = Some(url);
        } else {
            remaining.push(url);
        }
    }

    let mut other = BTreeSet::new();
    for url in remaining {
        if links.portfolio_url.is_none() && is_portfolio(&url) {
            links.portfolio_url = Some(url);
        } else if !url.contains('@') {
            other.insert(url);
        }
    }
    links.other = other.into_iter().collect();

    debug!(
        linkedin = links.linkedin_url.is_some(),
        github = links.github_url.is_some(),
        portfolio = links.portfolio_url.is_some(),
        other = links.other.len(),
        "Links extracted from resume text"
    );
    links
}

/// Fills profile URLs the model left empty and attaches leftover links to
/// projects whose squashed name appears in the URL.
pub fn enrich(resume: &mut ParsedResume, links: &ExtractedLinks) {
    let info = &mut resume.personal_info;
    fill(&mut info.linkedin_url, &links.linkedin_url);
    fill(&mut info.github_url, &links.github_url);
    fill(&mut info.portfolio_url, &links.portfolio_url);

    for project in resume.projects.iter_mut().filter(|p| p.url.is_none()) {
        let squashed: String = project
            .name
            .chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();
        if squashed.is_empty() {
            continue;
        }
        project.url = links
            .other
            .iter()
            .find(|url| url.to_lowercase().contains(&squashed))
            .cloned();
    }
}

fn fill(slot: &mut Option<String>, found: &Option<String>) {
    let missing = slot.as_deref().map_or(true, |s| s.trim().is_empty());
    if missing {
        if let Some(found) = found {
            *slot = Some(found.clone());
        }
    }
}

fn clean(raw: &str) -> &str {
    raw.trim()
        .trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ':' | ')' | ']' | '|'))
        .trim_end_matches('/')
}

fn is_portfolio(url: &str) -> bool {
    let lower = url.to_lowercase();
    PORTFOLIO_KEYWORDS.iter().any(|k| lower.contains(k))
}
