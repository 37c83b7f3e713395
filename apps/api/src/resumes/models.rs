use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ordinal education tier. Comparison is by rank only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EducationLevel {
    Elementary = 1,
    Middle = 2,
    HighSchool = 3,
    Bachelor = 4,
    Master = 5,
    Doctorate = 6,
}

impl EducationLevel {
    pub const ALL: [EducationLevel; 6] = [
        EducationLevel::Elementary,
        EducationLevel::Middle,
        EducationLevel::HighSchool,
        EducationLevel::Bachelor,
        EducationLevel::Master,
        EducationLevel::Doctorate,
    ];

    pub fn rank(self) -> u8 {
        self as u8
    }

    /// Maps a rank in 1..=6 to its tier. 0 and anything above 6 have no tier.
    pub fn from_rank(rank: u8) -> Option<Self> {
        Self::ALL.get(usize::from(rank).checked_sub(1)?).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EducationLevel::Elementary => "elementary",
            EducationLevel::Middle => "middle",
            EducationLevel::HighSchool => "high_school",
            EducationLevel::Bachelor => "bachelor",
            EducationLevel::Master => "master",
            EducationLevel::Doctorate => "doctorate",
        }
    }

    /// Every tier ranked at or above `self`, lowest first.
    pub fn at_or_above(self) -> Vec<EducationLevel> {
        Self::ALL.into_iter().filter(|l| *l >= self).collect()
    }
}

impl fmt::Display for EducationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EducationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|l| l.as_str() == s)
            .ok_or_else(|| format!("unknown education level '{s}'"))
    }
}

/// Processing status of an uploaded resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeStatus {
    Uploading,
    Parsing,
    Analyzing,
    Completed,
    Failed,
}

impl ResumeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ResumeStatus::Uploading => "uploading",
            ResumeStatus::Parsing => "parsing",
            ResumeStatus::Analyzing => "analyzing",
            ResumeStatus::Completed => "completed",
            ResumeStatus::Failed => "failed",
        }
    }

    #[cfg(test)]
    fn is_terminal(self) -> bool {
        matches!(self, ResumeStatus::Completed | ResumeStatus::Failed)
    }

    /// Progression is forward-only; `Failed` is reachable from any non-terminal state.
    #[cfg(test)]
    fn can_transition_to(self, next: ResumeStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            ResumeStatus::Failed => true,
            _ => next.step() > self.step(),
        }
    }

    #[cfg(test)]
    fn step(self) -> u8 {
        match self {
            ResumeStatus::Uploading => 0,
            ResumeStatus::Parsing => 1,
            ResumeStatus::Analyzing => 2,
            ResumeStatus::Completed => 3,
            ResumeStatus::Failed => 4,
        }
    }
}

impl fmt::Display for ResumeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResumeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploading" => Ok(ResumeStatus::Uploading),
            "parsing" => Ok(ResumeStatus::Parsing),
            "analyzing" => Ok(ResumeStatus::Analyzing),
            "completed" => Ok(ResumeStatus::Completed),
            "failed" => Ok(ResumeStatus::Failed),
            other => Err(format!("unknown resume status '{other}'")),
        }
    }
}

/// One education entry after level resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedEducation {
    pub institution_name: String,
    pub level: EducationLevel,
    pub level_number: u8,
}

/// The highest resolved entry of a resume, with its index into the raw education list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalEducation {
    pub source_index: usize,
    pub education: ResolvedEducation,
}

/// The aggregate root persisted per uploaded resume.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResumeRecord {
    pub id: Uuid,
    pub status: ResumeStatus,
    pub original_filename: String,
    pub file_path: String,
    pub file_size: i64,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub birth_year: Option<i32>,
    pub total_experience_years: f64,
    pub current_position: Option<String>,
    pub current_company: Option<String>,
    /// JSON array of company names, most recent first.
    pub previous_companies: Option<String>,
    pub education_level: Option<EducationLevel>,
    pub university: Option<String>,
    pub major: Option<String>,
    pub graduation_year: Option<i32>,
    pub certifications: String,
    pub languages: String,
    pub parsed_data: String,
    pub uploaded_by: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ResumeRecord {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Per-entry education row. `id` is assigned by the store on insert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResumeEducationDetail {
    pub id: Option<i64>,
    pub resume_id: Uuid,
    pub position: i32,
    pub institution_name: String,
    pub education_level: EducationLevel,
}

impl ResumeEducationDetail {
    pub fn level_number(&self) -> u8 {
        self.education_level.rank()
    }
}
