use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Integer score in `0..=100`; anything else fails deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct HealthScore(u8);

impl HealthScore {
    pub const MAX: u8 = 100;

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn band(self) -> HealthBand {
        match self.0 {
            70.. => HealthBand::Healthy,
            40..=69 => HealthBand::AtRisk,
            _ => HealthBand::Critical,
        }
    }
}

impl TryFrom<i64> for HealthScore {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .filter(|v| *v <= Self::MAX)
            .map(HealthScore)
            .ok_or_else(|| format!("healthScore must be between 0 and 100, got {value}"))
    }
}

impl From<HealthScore> for u8 {
    fn from(score: HealthScore) -> Self {
        score.0
    }
}

impl fmt::Display for HealthScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/100", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthBand {
    Healthy,
    AtRisk,
    Critical,
}

impl HealthBand {
    pub fn label(self) -> &'static str {
        match self {
            HealthBand::Healthy => "Healthy",
            HealthBand::AtRisk => "At Risk",
            HealthBand::Critical => "Critical",
        }
    }
}

/// Declared most severe first, so sorting puts critical flags on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitiveIntelligence {
    pub market_reality: String,
    pub industry_benchmarks: String,
    pub competitive_set: String,
    pub research_sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedFlag {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Implications {
    pub short_term: String,
    pub long_term: String,
}

/// The model-authored part of a report. Straight out of extraction it is a
/// candidate: shape-valid, not yet sanitized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportBody {
    pub health_score: HealthScore,
    pub competitive_intelligence: CompetitiveIntelligence,
    pub red_flags: Vec<RedFlag>,
    pub hidden_pattern: String,
    pub implications: Implications,
    pub recommendations: Vec<String>,
    pub next_steps: String,
}

/// A finished diagnostic report. Built once by the assembler and only read afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    subject_name: String,
    generated_at: DateTime<Utc>,
    #[serde(flatten)]
    body: ReportBody,
}

impl Report {
    pub(crate) fn new(subject_name: String, generated_at: DateTime<Utc>, body: ReportBody) -> Self {
        Self {
            subject_name,
            generated_at,
            body,
        }
    }

    pub fn subject_name(&self) -> &str {
        &self.subject_name
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn body(&self) -> &ReportBody {
        &self.body
    }

    pub fn health_score(&self) -> HealthScore {
        self.body.health_score
    }

    pub fn health_band(&self) -> HealthBand {
        self.body.health_score.band()
    }

    /// Red flags ordered critical first; ties keep the model's order.
    pub fn red_flags_by_severity(&self) -> Vec<&RedFlag> {
        let mut flags: Vec<&RedFlag> = self.body.red_flags.iter().collect();
        flags.sort_by_key(|flag| flag.severity);
        flags
    }
}
