//! Candidate scoring: measures a parsed resume against a job's requirements
//! and decides whether the application is auto-rejected.
//!
//! `AppState` holds an `Arc<dyn CandidateScorer>`; the default backend is
//! `SkillMatchScorer` (deterministic, no network). Scores are kept per
//! candidate and job behind `ScoreRepository`.

pub mod handlers;
#[cfg(test)]
pub mod memory;
pub mod postgres;
pub mod repository;
pub mod similarity;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::resume::{Experience, ParsedResume};
use crate::scoring::similarity::skill_similarity;

/// Minimum similarity for a candidate skill to count as a match.
pub const MATCH_THRESHOLD: f32 = 0.7;

const AUTO_REJECT_OVERALL_BELOW: u32 = 40;
const AUTO_REJECT_REQUIRED_BELOW: u32 = 50;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequirements {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub nice_to_have_skills: Vec<String>,
    #[serde(default)]
    pub min_experience_years: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillMatch {
    pub skill: String,
    pub required: bool,
    pub found: bool,
    /// Best similarity among the candidate's skills, 0.0 when not found.
    pub confidence: f32,
    /// The candidate skill that matched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateScore {
    pub job_id: Uuid,
    pub overall_score: u32,
    pub required_skills_score: u32,
    pub experience_score: u32,
    pub education_score: u32,
    pub skill_matches: Vec<SkillMatch>,
    pub missing_required_skills: Vec<String>,
    pub recommendations: Vec<String>,
    pub scorer_backend: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait CandidateScorer: Send + Sync {
    async fn score(
        &self,
        resume: &ParsedResume,
        job: &JobRequirements,
    ) -> Result<CandidateScore, AppError>;
}

/// Fuzzy skill matching plus experience and education heuristics.
pub struct SkillMatchScorer;

#[async_trait]
impl CandidateScorer for SkillMatchScorer {
    async fn score(
        &self,
        resume: &ParsedResume,
        job: &JobRequirements,
    ) -> Result<CandidateScore, AppError> {
        Ok(score_candidate(resume, job, Utc::now().date_naive()))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Scoring
// ────────────────────────────────────────────────────────────────────────────

/// Scores `resume` against `job`; open-ended positions count up to `today`.
pub fn score_candidate(resume: &ParsedResume, job: &JobRequirements, today: NaiveDate) -> CandidateScore {
    debug!(
        job_id = %job.id,
        candidate_skills = resume.skills.len(),
        required_skills = job.required_skills.len(),
        "Scoring candidate"
    );

    let skill_matches = match_skills(&resume.skills, &job.required_skills, &job.nice_to_have_skills);

    let found_required = skill_matches.iter().filter(|m| m.required && m.found).count();
    let required_skills_score = if job.required_skills.is_empty() {
        0
    } else {
        percent(found_required as f32 / job.required_skills.len() as f32)
    };
    let missing_required_skills: Vec<String> = skill_matches
        .iter()
        .filter(|m| m.required && !m.found)
        .map(|m| m.skill.clone())
        .collect();

    let experience_score = experience_score(&resume.experience, job.min_experience_years, today);
    let education_score = education_score(resume);
    let overall_score = (required_skills_score as f32 * 0.4
        + experience_score as f32 * 0.4
        + education_score as f32 * 0.2)
        .round() as u32;

    let mut score = CandidateScore {
        job_id: job.id,
        overall_score,
        required_skills_score,
        experience_score,
        education_score,
        skill_matches,
        missing_required_skills,
        recommendations: vec![],
        scorer_backend: "skill_match".to_string(),
    };
    score.recommendations = recommendations(resume, &score);
    score
}

/// Every job skill, required first, against the candidate's best-matching skill.
pub fn match_skills(candidate: &[String], required: &[String], nice_to_have: &[String]) -> Vec<SkillMatch> {
    let candidate: Vec<&str> = candidate
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    required
        .iter()
        .map(|s| (s, true))
        .chain(nice_to_have.iter().map(|s| (s, false)))
        .filter(|(skill, _)| !skill.trim().is_empty())
        .map(|(skill, required)| {
            let best = candidate
                .iter()
                .map(|c| (*c, skill_similarity(skill, c)))
                .max_by(|a, b| a.1.total_cmp(&b.1));
            match best {
                Some((matched, confidence)) if confidence >= MATCH_THRESHOLD => SkillMatch {
                    skill: skill.clone(),
                    required,
                    found: true,
                    confidence,
                    matched: Some(matched.to_string()),
                },
                _ => SkillMatch {
                    skill: skill.clone(),
                    required,
                    found: false,
                    confidence: 0.0,
                    matched: None,
                },
            }
        })
        .collect()
}

fn percent(ratio: f32) -> u32 {
    (ratio * 100.0).round() as u32
}

/// Parses `YYYY-MM` (a trailing `-DD` is ignored).
fn parse_year_month(raw: &str) -> Option<(i32, u32)> {
    let mut parts = raw.trim().splitn(3, '-');
    let year = parts.next()?.parse::<i32>().ok()?;
    let month = parts.next()?.parse::<u32>().ok()?;
    (1..=12).contains(&month).then_some((year, month))
}

fn months_between(start: (i32, u32), end: (i32, u32)) -> i64 {
    let months = i64::from(end.0 - start.0) * 12 + i64::from(end.1) - i64::from(start.1);
    months.max(0)
}

fn total_experience_months(experience: &[Experience], today: NaiveDate) -> i64 {
    let now = (today.year(), today.month());
    experience
        .iter()
        .filter_map(|exp| {
            let start = parse_year_month(&exp.start_date)?;
            let end = exp
                .end_date
                .as_deref()
                .and_then(parse_year_month)
                .unwrap_or(now);
            Some(months_between(start, end))
        })
        .sum()
}

fn experience_score(experience: &[Experience], min_years: f32, today: NaiveDate) -> u32 {
    if experience.is_empty() {
        return 0;
    }
    let years = total_experience_months(experience, today) as f32 / 12.0;
    let min_years = min_years.max(0.0);

    if years >= min_years * 1.5 {
        100
    } else if years >= min_years {
        80
    } else if years >= min_years * 0.75 {
        60
    } else {
        percent(years / min_years * 0.4)
    }
}

fn education_score(resume: &ParsedResume) -> u32 {
    const RELEVANT_FIELDS: [&str; 4] = ["computer", "software", "engineering", "technology"];
    const DEGREES: [&str; 4] = ["bachelor", "master", "phd", "doctorate"];

    let relevant_field = resume.education.iter().any(|edu| {
        let field = edu.field.to_lowercase();
        RELEVANT_FIELDS.iter().any(|k| field.contains(k))
    });
    let degree = resume.education.iter().any(|edu| {
        let degree = edu.degree.to_lowercase();
        DEGREES.iter().any(|k| degree.contains(k))
    });

    let mut score = 50;
    if relevant_field {
        score += 30;
    }
    if degree {
        score += 20;
    }
    score.min(100)
}

fn recommendations(resume: &ParsedResume, score: &CandidateScore) -> Vec<String> {
    let mut out = Vec::new();

    let band = if score.overall_score >= 85 {
        "Excellent candidate, highly recommended for interview"
    } else if score.overall_score >= 70 {
        "Good candidate, recommended for consideration"
    } else if score.overall_score >= 50 {
        "Marginal candidate, may need additional evaluation"
    } else {
        "Below threshold, consider rejection"
    };
    out.push(band.to_string());

    if score.required_skills_score >= 90 {
        out.push("Has all required technical skills".to_string());
    } else if !score.missing_required_skills.is_empty() {
        let top: Vec<&str> = score
            .missing_required_skills
            .iter()
            .take(3)
            .map(String::as_str)
            .collect();
        out.push(format!(
            "Missing {} required skill(s): {}",
            score.missing_required_skills.len(),
            top.join(", ")
        ));
    }

    if score.experience_score >= 80 {
        out.push("Strong relevant experience".to_string());
    }
    if !resume.certifications.is_empty() {
        out.push(format!(
            "Has {} professional certification(s)",
            resume.certifications.len()
        ));
    }
    if resume.projects.len() >= 3 {
        out.push("Strong project portfolio".to_string());
    }
    out
}

/// Why the application should be auto-rejected, if it should. Rules are checked
/// in order and the first hit is reported. The required-skill rules only apply
/// when the job lists required skills.
pub fn auto_rejection_reason(score: &CandidateScore, job: &JobRequirements) -> Option<String> {
    if score.overall_score < AUTO_REJECT_OVERALL_BELOW {
        return Some(format!(
            "Overall score {} is below the minimum of {AUTO_REJECT_OVERALL_BELOW}",
            score.overall_score
        ));
    }
    if job.required_skills.is_empty() {
        return None;
    }
    if score.required_skills_score < AUTO_REJECT_REQUIRED_BELOW {
        return Some(format!(
            "Required skills score {} is below the minimum of {AUTO_REJECT_REQUIRED_BELOW}",
            score.required_skills_score
        ));
    }
    if score.missing_required_skills.len() * 2 > job.required_skills.len() {
        return Some(format!(
            "Missing {} of {} required skills",
            score.missing_required_skills.len(),
            job.required_skills.len()
        ));
    }
    None
}
