use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction::payload::ExtractedResume;
use crate::resumes::builder::build;
use crate::resumes::models::{
    EducationLevel, ResumeEducationDetail, ResumeRecord, ResumeStatus,
};
use crate::resumes::store::{current_year, ListFilters, ListQuery};
use crate::state::AppState;
use crate::uploads::{self, PdfValidation, SUPPORTED_EXTENSIONS};

/// `current_year - birth_year`, or `None` when that would be negative.
pub fn calculate_age(birth_year: Option<i32>, current_year: i32) -> Option<i32> {
    birth_year
        .and_then(|year| current_year.checked_sub(year))
        .filter(|age| *age >= 0)
}

// ────────────────────────────────────────────────────────────────────────────
// Query parameters
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateParams {
    pub uploaded_by: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// Maximum age in years.
    pub age: Option<i32>,
    /// Minimum education tier, 1..=6.
    pub education_level: Option<u8>,
}

impl ListParams {
    fn into_query(self) -> Result<ListQuery, AppError> {
        if let Some(age) = self.age {
            if age < 0 {
                return Err(AppError::Validation(
                    "age must not be negative".to_string(),
                ));
            }
        }
        let min_education_level = self
            .education_level
            .map(|rank| {
                EducationLevel::from_rank(rank).ok_or_else(|| {
                    AppError::Validation(format!(
                        "education_level must be between 1 and 6, got {rank}"
                    ))
                })
            })
            .transpose()?;

        Ok(ListQuery::new(
            self.limit,
            self.offset,
            ListFilters {
                max_age: self.age,
                min_education_level,
            },
        ))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteParams {
    #[serde(default)]
    pub hard: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Response bodies
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ResumeSummary {
    pub id: Uuid,
    pub status: ResumeStatus,
    pub original_filename: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub birth_year: Option<i32>,
    pub age: Option<i32>,
    pub education_level: Option<EducationLevel>,
    pub level_number: Option<u8>,
    pub university: Option<String>,
    pub major: Option<String>,
    pub total_experience_years: f64,
    pub current_company: Option<String>,
    pub current_position: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ResumeSummary {
    fn from_record(record: ResumeRecord, current_year: i32) -> Self {
        Self {
            age: calculate_age(record.birth_year, current_year),
            level_number: record.education_level.map(EducationLevel::rank),
            id: record.id,
            status: record.status,
            original_filename: record.original_filename,
            name: record.name,
            email: record.email,
            phone: record.phone,
            birth_year: record.birth_year,
            education_level: record.education_level,
            university: record.university,
            major: record.major,
            total_experience_years: record.total_experience_years,
            current_company: record.current_company,
            current_position: record.current_position,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResumeDetailResponse {
    #[serde(flatten)]
    pub record: ResumeRecord,
    pub age: Option<i32>,
    pub level_number: Option<u8>,
}

impl ResumeDetailResponse {
    fn new(record: ResumeRecord) -> Self {
        Self {
            age: calculate_age(record.birth_year, current_year()),
            level_number: record.education_level.map(EducationLevel::rank),
            record,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResumeListResponse {
    pub success: bool,
    pub total_count: usize,
    pub limit: i64,
    pub offset: i64,
    pub filter: String,
    pub resumes: Vec<ResumeSummary>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub success: bool,
    pub query: String,
    pub total_count: usize,
    pub resumes: Vec<ResumeSummary>,
}

#[derive(Debug, Serialize)]
pub struct EducationDetailView {
    pub position: i32,
    pub institution_name: String,
    pub education_level: EducationLevel,
    pub level_number: u8,
}

impl From<ResumeEducationDetail> for EducationDetailView {
    fn from(detail: ResumeEducationDetail) -> Self {
        Self {
            level_number: detail.level_number(),
            position: detail.position,
            institution_name: detail.institution_name,
            education_level: detail.education_level,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EducationListResponse {
    pub resume_id: Uuid,
    pub educations: Vec<EducationDetailView>,
}

#[derive(Debug, Serialize)]
pub struct FinalEducationResponse {
    pub resume_id: Uuid,
    pub final_education: Option<EducationDetailView>,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub success: bool,
    pub filename: String,
    pub data: ExtractedResume,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub resume_id: Uuid,
    pub hard: bool,
}

#[derive(Debug, Serialize)]
pub struct DeleteAllResponse {
    pub success: bool,
    pub deleted_count: u64,
    pub hard: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/resumes/supported-extensions
pub async fn handle_supported_extensions() -> Json<Vec<&'static str>> {
    Json(SUPPORTED_EXTENSIONS.to_vec())
}

/// POST /api/v1/resumes/validate-pdf
pub async fn handle_validate_pdf(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<PdfValidation>, AppError> {
    let file = uploads::read_file_field(multipart).await?;
    Ok(Json(uploads::validate(&file, state.config.max_upload_bytes)))
}

/// POST /api/v1/resumes/extract
pub async fn handle_extract(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ExtractResponse>, AppError> {
    let file = uploads::read_file_field(multipart).await?;
    uploads::require_pdf(&file, state.config.max_upload_bytes)?;
    let extraction = state.extractor.extract(&file.filename, &file.bytes).await?;
    Ok(Json(ExtractResponse {
        success: true,
        filename: file.filename,
        data: extraction.data,
    }))
}

/// POST /api/v1/resumes/extract/raw
pub async fn handle_extract_raw(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    let file = uploads::read_file_field(multipart).await?;
    uploads::require_pdf(&file, state.config.max_upload_bytes)?;
    let extraction = state.extractor.extract(&file.filename, &file.bytes).await?;
    Ok(Json(extraction.raw))
}

/// POST /api/v1/resumes
/// Extracts, aggregates, archives the PDF and persists the record.
pub async fn handle_create(
    State(state): State<AppState>,
    Query(params): Query<CreateParams>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ResumeDetailResponse>), AppError> {
    let file = uploads::read_file_field(multipart).await?;
    uploads::require_pdf(&file, state.config.max_upload_bytes)?;

    let extraction = state.extractor.extract(&file.filename, &file.bytes).await?;
    let built = build(
        &extraction.data,
        &file.filename,
        file.size(),
        params.uploaded_by.as_deref(),
    )
    .map_err(|e| AppError::Internal(e.into()))?;

    let key = &built.record.file_path;
    state.archive.put(key, file.bytes.clone()).await?;
    if let Err(e) = state.store.insert(&built.record, &built.details).await {
        // No record points at the upload; take it back out.
        if let Err(cleanup) = state.archive.remove(key).await {
            warn!("Orphaned resume PDF left at {key}: {cleanup}");
        }
        return Err(e.into());
    }

    info!(
        "Created resume {} from {} (education_level: {})",
        built.record.id,
        file.filename,
        built
            .record
            .education_level
            .map(|l| l.as_str())
            .unwrap_or("none")
    );

    Ok((
        StatusCode::CREATED,
        Json(ResumeDetailResponse::new(built.record)),
    ))
}

/// GET /api/v1/resumes
pub async fn handle_list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ResumeListResponse>, AppError> {
    let query = params.into_query()?;
    let records = state.store.list(&query).await?;
    let year = current_year();

    let resumes: Vec<ResumeSummary> = records
        .into_iter()
        .map(|r| ResumeSummary::from_record(r, year))
        .collect();

    Ok(Json(ResumeListResponse {
        success: true,
        total_count: resumes.len(),
        limit: query.limit,
        offset: query.offset,
        filter: query.filters.describe(),
        resumes,
    }))
}

/// GET /api/v1/resumes/search/:name
pub async fn handle_search(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<SearchResponse>, AppError> {
    let records = state.store.search_by_name(&name).await?;
    let year = current_year();

    let resumes: Vec<ResumeSummary> = records
        .into_iter()
        .map(|r| ResumeSummary::from_record(r, year))
        .collect();

    Ok(Json(SearchResponse {
        success: true,
        query: name,
        total_count: resumes.len(),
        resumes,
    }))
}

async fn require_resume(state: &AppState, id: Uuid) -> Result<ResumeRecord, AppError> {
    state
        .store
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {id} not found")))
}

/// GET /api/v1/resumes/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResumeDetailResponse>, AppError> {
    let record = require_resume(&state, id).await?;
    Ok(Json(ResumeDetailResponse::new(record)))
}

/// GET /api/v1/resumes/:id/education
pub async fn handle_education(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EducationListResponse>, AppError> {
    require_resume(&state, id).await?;
    let details = state.store.education_details(id).await?;
    Ok(Json(EducationListResponse {
        resume_id: id,
        educations: details.into_iter().map(EducationDetailView::from).collect(),
    }))
}

/// GET /api/v1/resumes/:id/education/final
pub async fn handle_final_education(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FinalEducationResponse>, AppError> {
    require_resume(&state, id).await?;
    let final_education = state.store.final_education(id).await?;
    Ok(Json(FinalEducationResponse {
        resume_id: id,
        final_education: final_education.map(EducationDetailView::from),
    }))
}

/// DELETE /api/v1/resumes/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<DeleteParams>,
) -> Result<Json<DeleteResponse>, AppError> {
    if !state.store.delete(id, params.hard).await? {
        return Err(AppError::NotFound(format!("Resume {id} not found")));
    }
    Ok(Json(DeleteResponse {
        success: true,
        resume_id: id,
        hard: params.hard,
    }))
}

/// DELETE /api/v1/resumes
pub async fn handle_delete_all(
    State(state): State<AppState>,
    Query(params): Query<DeleteParams>,
) -> Result<Json<DeleteAllResponse>, AppError> {
    let deleted_count = state.store.delete_all(params.hard).await?;
    Ok(Json(DeleteAllResponse {
        success: true,
        deleted_count,
        hard: params.hard,
    }))
}
