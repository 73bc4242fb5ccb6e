//! The structured evaluation returned by the completion API.
//!
//! Field names are bit-exact with what the renderer expects (camelCase).
//! Missing fields take neutral defaults so a sparse but well-formed object
//! still parses; scores outside [0, 100] never do.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm_client::strip_json_fences;

/// Used when the résumé has no recognizable name.
pub const DEFAULT_CANDIDATE_NAME: &str = "Candidato";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report is not a valid JSON object: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{field} must be an integer between 0 and 100, got {value}")]
    ScoreOutOfRange { field: &'static str, value: i64 },
}

/// A fully parsed evaluation. Only ever built from a complete buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawReport")]
pub struct AssembledReport {
    pub candidate_name: String,
    pub overall_score: u8,
    pub technical_skills_score: u8,
    pub experience_score: u8,
    pub projects_score: u8,
    pub ats_compatibility_score: u8,
    pub presentation_score: u8,
    pub education_score: u8,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendations: Vec<String>,
    pub technical_analysis: String,
    pub market_comparison: String,
}

/// Wire form before defaults and range checks are applied.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReport {
    candidate_name: Option<String>,
    overall_score: Option<i64>,
    technical_skills_score: Option<i64>,
    experience_score: Option<i64>,
    projects_score: Option<i64>,
    ats_compatibility_score: Option<i64>,
    presentation_score: Option<i64>,
    education_score: Option<i64>,
    strengths: Option<Vec<String>>,
    weaknesses: Option<Vec<String>>,
    recommendations: Option<Vec<String>>,
    technical_analysis: Option<String>,
    market_comparison: Option<String>,
}

fn score(field: &'static str, value: Option<i64>) -> Result<u8, ReportError> {
    let value = value.unwrap_or(0);
    u8::try_from(value)
        .ok()
        .filter(|v| *v <= 100)
        .ok_or(ReportError::ScoreOutOfRange { field, value })
}

impl TryFrom<RawReport> for AssembledReport {
    type Error = ReportError;

    fn try_from(raw: RawReport) -> Result<Self, Self::Error> {
        let candidate_name = raw
            .candidate_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_CANDIDATE_NAME.to_string());

        Ok(Self {
            candidate_name,
            overall_score: score("overallScore", raw.overall_score)?,
            technical_skills_score: score("technicalSkillsScore", raw.technical_skills_score)?,
            experience_score: score("experienceScore", raw.experience_score)?,
            projects_score: score("projectsScore", raw.projects_score)?,
            ats_compatibility_score: score("atsCompatibilityScore", raw.ats_compatibility_score)?,
            presentation_score: score("presentationScore", raw.presentation_score)?,
            education_score: score("educationScore", raw.education_score)?,
            strengths: raw.strengths.unwrap_or_default(),
            weaknesses: raw.weaknesses.unwrap_or_default(),
            recommendations: raw.recommendations.unwrap_or_default(),
            technical_analysis: raw.technical_analysis.unwrap_or_default(),
            market_comparison: raw.market_comparison.unwrap_or_default(),
        })
    }
}

/// Parses one complete buffer into a report. Single-shot: callers hand over
/// the whole concatenation, never a prefix.
pub fn parse_report(text: &str) -> Result<AssembledReport, ReportError> {
    let raw: RawReport = serde_json::from_str(strip_json_fences(text))?;
    AssembledReport::try_from(raw)
}

/// Traffic-light bucket used when presenting a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Strong,
    Fair,
    Weak,
}

impl ScoreBand {
    pub fn of(score: u8) -> Self {
        match score {
            80..=u8::MAX => ScoreBand::Strong,
            60..=79 => ScoreBand::Fair,
            _ => ScoreBand::Weak,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScoreBand::Strong => "Excelente",
            ScoreBand::Fair => "Mejorable",
            ScoreBand::Weak => "Deficiente",
        }
    }
}

impl AssembledReport {
    /// The six rubric categories in display order, with their labels.
    pub fn category_scores(&self) -> [(&'static str, u8); 6] {
        [
            ("Habilidades Técnicas", self.technical_skills_score),
            ("Experiencia Profesional", self.experience_score),
            ("Proyectos", self.projects_score),
            ("Compatibilidad ATS", self.ats_compatibility_score),
            ("Presentación", self.presentation_score),
            ("Formación", self.education_score),
        ]
    }
}
