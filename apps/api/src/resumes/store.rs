//! Resume store: CRUD, filtered search and soft/hard delete over resume records
//! and their education detail rows.
//!
//! `AppState` carries an `Arc<dyn ResumeStore>`; `PgResumeStore` is the
//! production backend, `MemoryResumeStore` mirrors its semantics in-process.
//!
//! Policy shared by every backend:
//! - `get_by_id` returns soft-deleted records (with `deleted_at` set).
//! - `list` and `search_by_name` only return active records.

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::models::resume::{ResumeEducationRow, ResumeRow};
use crate::resumes::education::select_final;
use crate::resumes::models::{EducationLevel, ResumeEducationDetail, ResumeRecord};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt row: {0}")]
    CorruptRow(String),

    #[error("resume {0} already exists")]
    Duplicate(Uuid),
}

/// Optional predicates for [`ResumeStore::list`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ListFilters {
    /// Keep records whose owner is at most this old this calendar year.
    pub max_age: Option<i32>,
    /// Keep records whose final education is at or above this tier.
    pub min_education_level: Option<EducationLevel>,
}

impl ListFilters {
    /// Age is resolved against the year of the query, not stored.
    pub fn min_birth_year(&self, current_year: i32) -> Option<i32> {
        self.max_age.map(|age| current_year - age)
    }

    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(age) = self.max_age {
            parts.push(format!("age <= {age}"));
        }
        if let Some(level) = self.min_education_level {
            parts.push(format!("education_level >= {}", level.rank()));
        }
        if parts.is_empty() {
            "all".to_string()
        } else {
            parts.join(", ")
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListQuery {
    pub limit: i64,
    pub offset: i64,
    pub filters: ListFilters,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
            filters: ListFilters::default(),
        }
    }
}

impl ListQuery {
    pub fn new(limit: Option<i64>, offset: Option<i64>, filters: ListFilters) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            offset: offset.unwrap_or(0).max(0),
            filters,
        }
    }
}

pub fn current_year() -> i32 {
    Utc::now().year()
}

/// Storage backend for resumes. Every mutating call is a single transaction.
#[async_trait]
pub trait ResumeStore: Send + Sync {
    /// Persists the record and all of its detail rows atomically.
    async fn insert(
        &self,
        record: &ResumeRecord,
        details: &[ResumeEducationDetail],
    ) -> Result<(), StoreError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<ResumeRecord>, StoreError>;

    /// Case-insensitive substring match on name.
    async fn search_by_name(&self, name: &str) -> Result<Vec<ResumeRecord>, StoreError>;

    /// Newest first.
    async fn list(&self, query: &ListQuery) -> Result<Vec<ResumeRecord>, StoreError>;

    /// Detail rows of one resume in their original order.
    async fn education_details(&self, id: Uuid)
        -> Result<Vec<ResumeEducationDetail>, StoreError>;

    /// Returns `false` when no record has this id.
    async fn delete(&self, id: Uuid, hard: bool) -> Result<bool, StoreError>;

    /// Returns the number of records affected.
    async fn delete_all(&self, hard: bool) -> Result<u64, StoreError>;

    /// Highest-level detail row; the earliest one on ties.
    async fn final_education(
        &self,
        id: Uuid,
    ) -> Result<Option<ResumeEducationDetail>, StoreError> {
        let details = self.education_details(id).await?;
        Ok(select_final(details, |d| d.level_number()))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// PostgreSQL backend
// ────────────────────────────────────────────────────────────────────────────

const RESUME_COLUMNS: &str = "id, status, original_filename, file_path, file_size, name, email, \
    phone, address, birth_year, total_experience_years, current_position, current_company, \
    previous_companies, education_level, university, major, graduation_year, certifications, \
    languages, parsed_data, uploaded_by, notes, created_at, updated_at, deleted_at";

#[derive(Clone)]
pub struct PgResumeStore {
    pool: PgPool,
}

impl PgResumeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn into_records(rows: Vec<ResumeRow>) -> Result<Vec<ResumeRecord>, StoreError> {
    rows.into_iter().map(ResumeRecord::try_from).collect()
}

/// Builds the filtered, paginated listing query.
fn list_query_builder(query: &ListQuery, current_year: i32) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT {RESUME_COLUMNS} FROM resumes WHERE deleted_at IS NULL"
    ));
    if let Some(min_birth_year) = query.filters.min_birth_year(current_year) {
        qb.push(" AND birth_year >= ").push_bind(min_birth_year);
    }
    if let Some(level) = query.filters.min_education_level {
        let tiers: Vec<String> = level
            .at_or_above()
            .into_iter()
            .map(|l| l.as_str().to_string())
            .collect();
        qb.push(" AND education_level = ANY(").push_bind(tiers).push(")");
    }
    qb.push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(query.limit)
        .push(" OFFSET ")
        .push_bind(query.offset);
    qb
}

#[async_trait]
impl ResumeStore for PgResumeStore {
    async fn insert(
        &self,
        record: &ResumeRecord,
        details: &[ResumeEducationDetail],
    ) -> Result<(), StoreError> {
        // Dropping the transaction on any early return rolls it back.
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO resumes
                (id, status, original_filename, file_path, file_size, name, email, phone,
                 address, birth_year, total_experience_years, current_position,
                 current_company, previous_companies, education_level, university, major,
                 graduation_year, certifications, languages, parsed_data, uploaded_by, notes,
                 created_at, updated_at, deleted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    $17, $18, $19, $20, $21, $22, $23, $24, $25, $26)
            "#,
        )
        .bind(record.id)
        .bind(record.status.as_str())
        .bind(&record.original_filename)
        .bind(&record.file_path)
        .bind(record.file_size)
        .bind(&record.name)
        .bind(&record.email)
        .bind(&record.phone)
        .bind(&record.address)
        .bind(record.birth_year)
        .bind(record.total_experience_years)
        .bind(&record.current_position)
        .bind(&record.current_company)
        .bind(&record.previous_companies)
        .bind(record.education_level.map(|l| l.as_str()))
        .bind(&record.university)
        .bind(&record.major)
        .bind(record.graduation_year)
        .bind(&record.certifications)
        .bind(&record.languages)
        .bind(&record.parsed_data)
        .bind(&record.uploaded_by)
        .bind(&record.notes)
        .bind(record.created_at)
        .bind(record.updated_at)
        .bind(record.deleted_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Duplicate(record.id)
            }
            other => StoreError::Database(other),
        })?;

        if !details.is_empty() {
            let mut qb = QueryBuilder::<Postgres>::new(
                "INSERT INTO resume_educations (resume_id, position, institution_name, education_level) ",
            );
            qb.push_values(details, |mut b, detail| {
                b.push_bind(detail.resume_id)
                    .push_bind(detail.position)
                    .push_bind(detail.institution_name.clone())
                    .push_bind(detail.education_level.as_str());
            });
            qb.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        info!(
            "Inserted resume {} with {} education rows",
            record.id,
            details.len()
        );
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<ResumeRecord>, StoreError> {
        let row: Option<ResumeRow> =
            sqlx::query_as(&format!("SELECT {RESUME_COLUMNS} FROM resumes WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(ResumeRecord::try_from).transpose()
    }

    async fn search_by_name(&self, name: &str) -> Result<Vec<ResumeRecord>, StoreError> {
        let rows: Vec<ResumeRow> = sqlx::query_as(&format!(
            "SELECT {RESUME_COLUMNS} FROM resumes WHERE deleted_at IS NULL AND name ILIKE $1"
        ))
        .bind(format!("%{}%", escape_like(name)))
        .fetch_all(&self.pool)
        .await?;
        into_records(rows)
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<ResumeRecord>, StoreError> {
        let mut qb = list_query_builder(query, current_year());
        let rows: Vec<ResumeRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        into_records(rows)
    }

    async fn education_details(
        &self,
        id: Uuid,
    ) -> Result<Vec<ResumeEducationDetail>, StoreError> {
        let rows: Vec<ResumeEducationRow> = sqlx::query_as(
            "SELECT id, resume_id, position, institution_name, education_level \
             FROM resume_educations WHERE resume_id = $1 ORDER BY position ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(ResumeEducationDetail::try_from)
            .collect()
    }

    async fn delete(&self, id: Uuid, hard: bool) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        let affected = if hard {
            sqlx::query("DELETE FROM resume_educations WHERE resume_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM resumes WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?
                .rows_affected()
        } else {
            sqlx::query(
                "UPDATE resumes SET deleted_at = COALESCE(deleted_at, NOW()), updated_at = NOW() \
                 WHERE id = $1",
            )
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
        };
        tx.commit().await?;

        if affected > 0 {
            info!("Deleted resume {id} (hard={hard})");
        }
        Ok(affected > 0)
    }

    async fn delete_all(&self, hard: bool) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let affected = if hard {
            sqlx::query("DELETE FROM resume_educations")
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM resumes")
                .execute(&mut *tx)
                .await?
                .rows_affected()
        } else {
            sqlx::query(
                "UPDATE resumes SET deleted_at = NOW(), updated_at = NOW() WHERE deleted_at IS NULL",
            )
            .execute(&mut *tx)
            .await?
            .rows_affected()
        };
        tx.commit().await?;

        info!("Deleted {affected} resumes (hard={hard})");
        Ok(affected)
    }
}

/// Escapes LIKE wildcards so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
