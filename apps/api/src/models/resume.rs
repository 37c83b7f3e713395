use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::resumes::models::{ResumeEducationDetail, ResumeRecord};
use crate::resumes::store::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeRow {
    pub id: Uuid,
    pub status: String,
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
    pub previous_companies: Option<String>,
    pub education_level: Option<String>,
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

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeEducationRow {
    pub id: i64,
    pub resume_id: Uuid,
    pub position: i32,
    pub institution_name: String,
    pub education_level: String,
}

impl TryFrom<ResumeRow> for ResumeRecord {
    type Error = StoreError;

    fn try_from(row: ResumeRow) -> Result<Self, Self::Error> {
        let status = row.status.parse().map_err(StoreError::CorruptRow)?;
        let education_level = row
            .education_level
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(StoreError::CorruptRow)?;

        Ok(ResumeRecord {
            id: row.id,
            status,
            original_filename: row.original_filename,
            file_path: row.file_path,
            file_size: row.file_size,
            name: row.name,
            email: row.email,
            phone: row.phone,
            address: row.address,
            birth_year: row.birth_year,
            total_experience_years: row.total_experience_years,
            current_position: row.current_position,
            current_company: row.current_company,
            previous_companies: row.previous_companies,
            education_level,
            university: row.university,
            major: row.major,
            graduation_year: row.graduation_year,
            certifications: row.certifications,
            languages: row.languages,
            parsed_data: row.parsed_data,
            uploaded_by: row.uploaded_by,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

impl TryFrom<ResumeEducationRow> for ResumeEducationDetail {
    type Error = StoreError;

    fn try_from(row: ResumeEducationRow) -> Result<Self, Self::Error> {
        Ok(ResumeEducationDetail {
            id: Some(row.id),
            resume_id: row.resume_id,
            position: row.position,
            institution_name: row.institution_name,
            education_level: row.education_level.parse().map_err(StoreError::CorruptRow)?,
        })
    }
}
