use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::resumes::models::{ResumeEducationDetail, ResumeRecord};
use crate::resumes::store::{current_year, ListQuery, ResumeStore, StoreError};

#[derive(Default)]
struct Tables {
    /// Insertion order.
    resumes: Vec<ResumeRecord>,
    educations: Vec<ResumeEducationDetail>,
    next_education_id: i64,
}

/// In-process `ResumeStore` with the same semantics as the PostgreSQL backend.
/// Each call holds the lock for its whole duration, which makes it atomic.
#[derive(Default)]
pub struct MemoryResumeStore {
    tables: RwLock<Tables>,
}

impl MemoryResumeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResumeStore for MemoryResumeStore {
    async fn insert(
        &self,
        record: &ResumeRecord,
        details: &[ResumeEducationDetail],
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.resumes.iter().any(|r| r.id == record.id) {
            return Err(StoreError::Duplicate(record.id));
        }

        tables.resumes.push(record.clone());
        for detail in details {
            tables.next_education_id += 1;
            let id = tables.next_education_id;
            tables.educations.push(ResumeEducationDetail {
                id: Some(id),
                ..detail.clone()
            });
        }
        info!(
            "Inserted resume {} with {} education rows",
            record.id,
            details.len()
        );
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<ResumeRecord>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.resumes.iter().find(|r| r.id == id).cloned())
    }

    async fn search_by_name(&self, name: &str) -> Result<Vec<ResumeRecord>, StoreError> {
        let needle = name.to_lowercase();
        let tables = self.tables.read().await;
        Ok(tables
            .resumes
            .iter()
            .filter(|r| !r.is_deleted())
            .filter(|r| {
                r.name
                    .as_deref()
                    .is_some_and(|n| n.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect())
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<ResumeRecord>, StoreError> {
        let min_birth_year = query.filters.min_birth_year(current_year());
        let tiers = query.filters.min_education_level.map(|l| l.at_or_above());

        let tables = self.tables.read().await;
        // Newest insert first among equal timestamps.
        let mut matching: Vec<&ResumeRecord> = tables
            .resumes
            .iter()
            .rev()
            .filter(|r| !r.is_deleted())
            .filter(|r| match min_birth_year {
                Some(min) => r.birth_year.is_some_and(|y| y >= min),
                None => true,
            })
            .filter(|r| match &tiers {
                Some(tiers) => r.education_level.is_some_and(|l| tiers.contains(&l)),
                None => true,
            })
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(matching
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .cloned()
            .collect())
    }

    async fn education_details(
        &self,
        id: Uuid,
    ) -> Result<Vec<ResumeEducationDetail>, StoreError> {
        let tables = self.tables.read().await;
        let mut details: Vec<ResumeEducationDetail> = tables
            .educations
            .iter()
            .filter(|d| d.resume_id == id)
            .cloned()
            .collect();
        details.sort_by_key(|d| d.position);
        Ok(details)
    }

    async fn delete(&self, id: Uuid, hard: bool) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(index) = tables.resumes.iter().position(|r| r.id == id) else {
            return Ok(false);
        };

        if hard {
            tables.educations.retain(|d| d.resume_id != id);
            tables.resumes.remove(index);
        } else {
            let now = Utc::now();
            let record = &mut tables.resumes[index];
            record.deleted_at.get_or_insert(now);
            record.updated_at = now;
        }
        info!("Deleted resume {id} (hard={hard})");
        Ok(true)
    }

    async fn delete_all(&self, hard: bool) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        let affected = if hard {
            let count = tables.resumes.len() as u64;
            tables.resumes.clear();
            tables.educations.clear();
            count
        } else {
            let now = Utc::now();
            let mut count = 0;
            for record in tables.resumes.iter_mut().filter(|r| r.deleted_at.is_none()) {
                record.deleted_at = Some(now);
                record.updated_at = now;
                count += 1;
            }
            count
        };
        info!("Deleted {affected} resumes (hard={hard})");
        Ok(affected)
    }
}
