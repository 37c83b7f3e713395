//! Resume aggregation: turns one extraction payload into a persistence-ready
//! `ResumeRecord` plus its per-entry education detail rows.

use chrono::Utc;
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::extraction::payload::{ExtractedResume, ExtractedWorkExperience};
use crate::resumes::education::{resolve_all, EducationResolution};
use crate::resumes::models::{ResumeEducationDetail, ResumeRecord, ResumeStatus};

/// Months credited to a work entry whose period cannot be parsed.
pub const FALLBACK_MONTHS: i64 = 12;

/// Output of [`build`]: the record and one detail row per resolved education entry.
#[derive(Debug, Clone)]
pub struct BuiltResume {
    pub record: ResumeRecord,
    pub details: Vec<ResumeEducationDetail>,
}

/// Builds a resume record from an already-successful extraction.
pub fn build(
    extraction: &ExtractedResume,
    filename: &str,
    file_size: i64,
    uploaded_by: Option<&str>,
) -> Result<BuiltResume, serde_json::Error> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let resolution = resolve_all(&extraction.education);

    let (current_position, current_company) = current_job(&extraction.work_experience);

    let final_raw = resolution
        .final_education
        .as_ref()
        .and_then(|f| extraction.education.get(f.source_index));
    let graduation_year = final_raw.and_then(|e| graduation_year(&e.period));
    let major = final_raw.and_then(|e| non_empty(&e.major));

    let record = ResumeRecord {
        id,
        status: ResumeStatus::Completed,
        original_filename: filename.to_string(),
        file_path: storage_key(id, filename),
        file_size,
        name: non_empty(&extraction.name),
        email: non_empty(&extraction.email),
        phone: non_empty(&extraction.phone_number),
        address: non_empty(&extraction.address),
        birth_year: extraction.birth_year,
        total_experience_years: total_experience_years(&extraction.work_experience),
        current_position,
        current_company,
        previous_companies: previous_companies(&extraction.work_experience)?,
        education_level: resolution
            .final_education
            .as_ref()
            .map(|f| f.education.level),
        university: resolution
            .final_education
            .as_ref()
            .map(|f| f.education.institution_name.clone()),
        major,
        graduation_year,
        certifications: certifications_json(extraction)?,
        languages: languages_json(extraction)?,
        parsed_data: parsed_data_json(extraction, &resolution)?,
        uploaded_by: uploaded_by.and_then(non_empty),
        notes: Some(format!(
            "Extracted automatically at {}",
            now.format("%Y-%m-%d %H:%M:%S")
        )),
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };

    let details = resolution
        .entries
        .iter()
        .enumerate()
        .map(|(position, (_, education))| ResumeEducationDetail {
            id: None,
            resume_id: id,
            position: position as i32,
            institution_name: education.institution_name.clone(),
            education_level: education.level,
        })
        .collect();

    Ok(BuiltResume { record, details })
}

/// Object-storage key of the original upload.
pub fn storage_key(id: Uuid, filename: &str) -> String {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    format!("resumes/{id}/{name}")
}

/// Total tenure in years, rounded to one decimal place.
pub fn total_experience_years(work: &[ExtractedWorkExperience]) -> f64 {
    let total_months: i64 = work
        .iter()
        .map(|w| match period_months(&w.period) {
            Some(months) => months,
            None => {
                warn!(
                    "Unparsable work period '{}' at '{}', counting {FALLBACK_MONTHS} months",
                    w.period, w.company
                );
                FALLBACK_MONTHS
            }
        })
        .fold(0i64, i64::saturating_add);
    (total_months as f64 / 12.0 * 10.0).round() / 10.0
}

/// Months covered by a `"<start>-<end>"` period, using only the year of each side.
fn period_months(period: &str) -> Option<i64> {
    let mut sides = period.split('-');
    let (start, end) = (sides.next()?, sides.next()?);
    if sides.next().is_some() {
        return None;
    }
    let start_year = leading_year(start)?;
    let end_year = leading_year(end)?;
    end_year.checked_sub(start_year)?.checked_mul(12)
}

/// `"2018.01"` → 2018, `" 2020 "` → 2020.
fn leading_year(side: &str) -> Option<i64> {
    side.trim().split('.').next()?.trim().parse().ok()
}

/// Year of the last side of an education period, e.g. `"2011.03-2015.02"` → 2015.
fn graduation_year(period: &str) -> Option<i32> {
    let last = period.rsplit('-').next()?;
    leading_year(last).and_then(|y| i32::try_from(y).ok())
}

/// Position and company of the first (most recent) work entry.
fn current_job(work: &[ExtractedWorkExperience]) -> (Option<String>, Option<String>) {
    match work.first() {
        Some(latest) => (non_empty(&latest.position), non_empty(&latest.company)),
        None => (None, None),
    }
}

/// JSON array of companies from every entry after the first; `None` when there are none.
fn previous_companies(work: &[ExtractedWorkExperience]) -> Result<Option<String>, serde_json::Error> {
    let companies: Vec<&str> = work
        .iter()
        .skip(1)
        .map(|w| w.company.trim())
        .filter(|c| !c.is_empty())
        .collect();
    if companies.is_empty() {
        return Ok(None);
    }
    serde_json::to_string(&companies).map(Some)
}

fn certifications_json(extraction: &ExtractedResume) -> Result<String, serde_json::Error> {
    serde_json::to_string(&certifications_value(extraction))
}

fn languages_json(extraction: &ExtractedResume) -> Result<String, serde_json::Error> {
    serde_json::to_string(&languages_value(extraction))
}

fn certifications_value(extraction: &ExtractedResume) -> serde_json::Value {
    extraction
        .certifications
        .iter()
        .map(|c| json!({"name": c.name, "issuer": c.issuer, "date": c.date}))
        .collect()
}

fn languages_value(extraction: &ExtractedResume) -> serde_json::Value {
    extraction
        .language_skills
        .iter()
        .map(|l| json!({"language": l.language, "proficiency": l.proficiency}))
        .collect()
}

fn parsed_data_json(
    extraction: &ExtractedResume,
    resolution: &EducationResolution,
) -> Result<String, serde_json::Error> {
    let education: serde_json::Value = extraction
        .education
        .iter()
        .enumerate()
        .map(|(idx, e)| {
            let level = resolution.level_for(idx);
            json!({
                "period": e.period,
                "institution": e.institution,
                "major": e.major,
                "degree": e.degree,
                "grade": e.grade,
                "education_level": level,
                "level_number": level.map(|l| l.rank()),
            })
        })
        .collect();

    let work_experience: serde_json::Value = extraction
        .work_experience
        .iter()
        .map(|w| {
            json!({
                "period": w.period,
                "company": w.company,
                "position": w.position,
                "description": w.description,
            })
        })
        .collect();

    serde_json::to_string(&json!({
        "education": education,
        "work_experience": work_experience,
        "certifications": certifications_value(extraction),
        "language_skills": languages_value(extraction),
    }))
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}
