pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::resumes::handlers;
use crate::state::AppState;

/// Room for multipart boundaries and headers around the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health::health_handler))
        // Intake
        .route(
            "/api/v1/resumes/supported-extensions",
            get(handlers::handle_supported_extensions),
        )
        .route(
            "/api/v1/resumes/validate-pdf",
            post(handlers::handle_validate_pdf),
        )
        .route("/api/v1/resumes/extract", post(handlers::handle_extract))
        .route(
            "/api/v1/resumes/extract/raw",
            post(handlers::handle_extract_raw),
        )
        // Records
        .route(
            "/api/v1/resumes",
            post(handlers::handle_create)
                .get(handlers::handle_list)
                .delete(handlers::handle_delete_all),
        )
        .route(
            "/api/v1/resumes/search/:name",
            get(handlers::handle_search),
        )
        .route(
            "/api/v1/resumes/:id",
            get(handlers::handle_get).delete(handlers::handle_delete),
        )
        .route(
            "/api/v1/resumes/:id/education",
            get(handlers::handle_education),
        )
        .route(
            "/api/v1/resumes/:id/education/final",
            get(handlers::handle_final_education),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use bytes::Bytes;
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::{Config, StoreBackend};
    use crate::errors::AppError;
    use crate::extraction::payload::{ExtractedEducation, ExtractedResume};
    use crate::extraction::{Extraction, ExtractionError, ResumeExtractor};
    use crate::resumes::builder::{build, BuiltResume};
    use crate::resumes::memory_store::MemoryResumeStore;
    use crate::resumes::models::{ResumeEducationDetail, ResumeRecord};
    use crate::resumes::store::{ListQuery, ResumeStore, StoreError};
    use crate::uploads::PdfArchive;
    use uuid::Uuid;

    const BOUNDARY: &str = "resume-test-boundary";

    /// Answers every call with the same payload, or with empty content when `None`.
    struct StubExtractor {
        payload: Option<Value>,
    }

    #[async_trait]
    impl ResumeExtractor for StubExtractor {
        async fn extract(
            &self,
            _filename: &str,
            _pdf: &[u8],
        ) -> Result<Extraction, ExtractionError> {
            match &self.payload {
                Some(raw) => Extraction::from_json(raw.clone()),
                None => Err(ExtractionError::EmptyContent),
            }
        }
    }

    fn test_config() -> Config {
        Config {
            store_backend: StoreBackend::Memory,
            database_url: None,
            upstage_api_key: "test-key".to_string(),
            upstage_base_url: "http://127.0.0.1:1".to_string(),
            extraction_timeout: Duration::from_secs(1),
            max_upload_bytes: 1024 * 1024,
            s3_bucket: "resumes".to_string(),
            s3_endpoint: "http://127.0.0.1:1".to_string(),
            aws_access_key_id: "test".to_string(),
            aws_secret_access_key: "test".to_string(),
            port: 0,
            rust_log: "info".to_string(),
        }
    }

    /// Keeps archived PDFs in a map.
    #[derive(Default)]
    struct MemoryArchive {
        objects: Mutex<HashMap<String, Bytes>>,
    }

    impl MemoryArchive {
        fn keys(&self) -> Vec<String> {
            self.objects.lock().unwrap().keys().cloned().collect()
        }
    }

    #[async_trait]
    impl PdfArchive for MemoryArchive {
        async fn put(&self, key: &str, bytes: Bytes) -> Result<(), AppError> {
            self.objects.lock().unwrap().insert(key.to_string(), bytes);
            Ok(())
        }

        async fn remove(&self, key: &str) -> Result<(), AppError> {
            self.objects.lock().unwrap().remove(key);
            Ok(())
        }
    }

    /// Reads from an inner store but refuses every insert.
    #[derive(Default)]
    struct RejectingStore {
        inner: MemoryResumeStore,
    }

    #[async_trait]
    impl ResumeStore for RejectingStore {
        async fn insert(
            &self,
            record: &ResumeRecord,
            _details: &[ResumeEducationDetail],
        ) -> Result<(), StoreError> {
            Err(StoreError::Duplicate(record.id))
        }

        async fn get_by_id(&self, id: Uuid) -> Result<Option<ResumeRecord>, StoreError> {
            self.inner.get_by_id(id).await
        }

        async fn search_by_name(&self, name: &str) -> Result<Vec<ResumeRecord>, StoreError> {
            self.inner.search_by_name(name).await
        }

        async fn list(&self, query: &ListQuery) -> Result<Vec<ResumeRecord>, StoreError> {
            self.inner.list(query).await
        }

        async fn education_details(
            &self,
            id: Uuid,
        ) -> Result<Vec<ResumeEducationDetail>, StoreError> {
            self.inner.education_details(id).await
        }

        async fn delete(&self, id: Uuid, hard: bool) -> Result<bool, StoreError> {
            self.inner.delete(id, hard).await
        }

        async fn delete_all(&self, hard: bool) -> Result<u64, StoreError> {
            self.inner.delete_all(hard).await
        }
    }

    fn app_with(
        store: Arc<dyn ResumeStore>,
        archive: Arc<MemoryArchive>,
        payload: Option<Value>,
    ) -> Router {
        build_router(AppState {
            store,
            extractor: Arc::new(StubExtractor { payload }),
            archive,
            config: test_config(),
        })
    }

    fn app(store: Arc<MemoryResumeStore>, payload: Option<Value>) -> Router {
        app_with(store, Arc::new(MemoryArchive::default()), payload)
    }

    fn multipart_request(uri: &str, filename: &str, content: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn request(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        // Extractor rejections answer in plain text.
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn seed(
        store: &MemoryResumeStore,
        name: &str,
        birth_year: Option<i32>,
        degrees: &[(&str, &str)],
    ) -> BuiltResume {
        let extraction = ExtractedResume {
            name: name.to_string(),
            birth_year,
            education: degrees
                .iter()
                .map(|(institution, degree)| ExtractedEducation {
                    institution: institution.to_string(),
                    degree: degree.to_string(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };
        let built = build(&extraction, "cv.pdf", 1024, None).unwrap();
        store.insert(&built.record, &built.details).await.unwrap();
        built
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(
            app(Arc::new(MemoryResumeStore::new()), None),
            request(Method::GET, "/health"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_supported_extensions() {
        let (status, body) = send(
            app(Arc::new(MemoryResumeStore::new()), None),
            request(Method::GET, "/api/v1/resumes/supported-extensions"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([".pdf"]));
    }

    #[tokio::test]
    async fn test_validate_pdf_reports_invalid_upload() {
        let (status, body) = send(
            app(Arc::new(MemoryResumeStore::new()), None),
            multipart_request("/api/v1/resumes/validate-pdf", "notes.txt", b"hello"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], false);
        assert_eq!(body["file_size"], 5);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_validate_pdf_accepts_pdf() {
        let (status, body) = send(
            app(Arc::new(MemoryResumeStore::new()), None),
            multipart_request("/api/v1/resumes/validate-pdf", "cv.pdf", b"%PDF-1.7 ..."),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], true);
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn test_extract_returns_typed_payload() {
        let payload = json!({ "name": "Jane Doe", "birth_year": 1991, "education": [] });
        let (status, body) = send(
            app(Arc::new(MemoryResumeStore::new()), Some(payload)),
            multipart_request("/api/v1/resumes/extract", "cv.pdf", b"%PDF-1.7"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "Jane Doe");
        assert_eq!(body["data"]["work_experience"], json!([]));
    }

    #[tokio::test]
    async fn test_extract_raw_passes_json_through() {
        let payload = json!({ "name": "Jane Doe", "extra": { "kept": true } });
        let (status, body) = send(
            app(Arc::new(MemoryResumeStore::new()), Some(payload.clone())),
            multipart_request("/api/v1/resumes/extract/raw", "cv.pdf", b"%PDF-1.7"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, payload);
    }

    #[tokio::test]
    async fn test_empty_extraction_is_unprocessable() {
        let (status, body) = send(
            app(Arc::new(MemoryResumeStore::new()), None),
            multipart_request("/api/v1/resumes/extract", "cv.pdf", b"%PDF-1.7"),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "UNPROCESSABLE_ENTITY");
    }

    #[tokio::test]
    async fn test_create_rejects_non_pdf_before_extraction() {
        let store = Arc::new(MemoryResumeStore::new());
        let (status, body) = send(
            app(store.clone(), None),
            multipart_request("/api/v1/resumes", "cv.docx", b"PK\x03\x04"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(store.delete_all(true).await.unwrap(), 0);
    }

    fn jane_payload() -> Value {
        json!({
            "name": "Jane Doe",
            "birth_year": 1990,
            "email": "jane@example.com",
            "education": [
                { "institution": "Springfield High School", "period": "2005-2008" },
                { "institution": "MIT", "degree": "PhD", "major": "Physics", "period": "2012.09-2017.05" },
                { "institution": "Harvard", "degree": "Bachelor", "period": "2008-2012" }
            ],
            "work_experience": [
                { "period": "2020-2023", "company": "Acme", "position": "Engineer" },
                { "period": "2017-2020", "company": "Globex", "position": "Analyst" }
            ]
        })
    }

    #[tokio::test]
    async fn test_create_persists_record_and_archives_pdf() {
        let store = Arc::new(MemoryResumeStore::new());
        let archive = Arc::new(MemoryArchive::default());

        let (status, body) = send(
            app_with(store.clone(), archive.clone(), Some(jane_payload())),
            multipart_request("/api/v1/resumes?uploaded_by=alice", "cv.pdf", b"%PDF-1.7 body"),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["name"], "Jane Doe");
        assert_eq!(body["status"], "completed");
        assert_eq!(body["uploaded_by"], "alice");
        assert_eq!(body["education_level"], "doctorate");
        assert_eq!(body["level_number"], 6);
        assert_eq!(body["university"], "MIT");
        assert_eq!(body["major"], "Physics");
        assert_eq!(body["graduation_year"], 2017);
        assert_eq!(body["total_experience_years"], 6.0);
        assert_eq!(body["current_company"], "Acme");
        assert_eq!(body["file_size"], 13);

        let id = body["id"].as_str().unwrap().to_string();
        let file_path = body["file_path"].as_str().unwrap().to_string();
        assert_eq!(file_path, format!("resumes/{id}/cv.pdf"));
        assert_eq!(archive.keys(), vec![file_path]);

        let (status, fetched) = send(
            app_with(store.clone(), archive.clone(), None),
            request(Method::GET, &format!("/api/v1/resumes/{id}")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["name"], "Jane Doe");
        assert_eq!(fetched["uploaded_by"], "alice");
        assert_eq!(fetched["education_level"], "doctorate");

        let (status, educations) = send(
            app_with(store, archive, None),
            request(Method::GET, &format!("/api/v1/resumes/{id}/education")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let rows: Vec<(String, u64)> = educations["educations"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| {
                (
                    e["institution_name"].as_str().unwrap().to_string(),
                    e["level_number"].as_u64().unwrap(),
                )
            })
            .collect();
        assert_eq!(
            rows,
            vec![
                ("Springfield High School".to_string(), 3),
                ("MIT".to_string(), 6),
                ("Harvard".to_string(), 4),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_insert_removes_archived_pdf() {
        let store = Arc::new(RejectingStore::default());
        let archive = Arc::new(MemoryArchive::default());

        let (status, body) = send(
            app_with(store, archive.clone(), Some(jane_payload())),
            multipart_request("/api/v1/resumes", "cv.pdf", b"%PDF-1.7 body"),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CONFLICT");
        assert!(archive.keys().is_empty());
    }

    #[tokio::test]
    async fn test_get_returns_detail_with_age() {
        let store = Arc::new(MemoryResumeStore::new());
        let built = seed(&store, "Jane Doe", Some(1990), &[("MIT", "PhD")]).await;

        let uri = format!("/api/v1/resumes/{}", built.record.id);
        let (status, body) = send(app(store, None), request(Method::GET, &uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Jane Doe");
        assert_eq!(body["education_level"], "doctorate");
        assert_eq!(body["level_number"], 6);
        assert_eq!(
            body["age"],
            json!(crate::resumes::store::current_year() - 1990)
        );
    }

    #[tokio::test]
    async fn test_get_missing_is_404_and_bad_id_is_400() {
        let store = Arc::new(MemoryResumeStore::new());
        let uri = format!("/api/v1/resumes/{}", Uuid::new_v4());
        let (status, _) = send(app(store.clone(), None), request(Method::GET, &uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            app(store, None),
            request(Method::GET, "/api/v1/resumes/not-a-uuid"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_filters_by_education_level() {
        let store = Arc::new(MemoryResumeStore::new());
        seed(&store, "High", None, &[("Springfield High School", "")]).await;
        seed(&store, "Master", None, &[("KAIST", "Master of Science")]).await;
        seed(&store, "Doctor", None, &[("MIT", "PhD")]).await;

        let (status, body) = send(
            app(store, None),
            request(Method::GET, "/api/v1/resumes?education_level=5"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_count"], 2);
        assert_eq!(body["filter"], "education_level >= 5");
        let names: Vec<&str> = body["resumes"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|r| r["name"].as_str())
            .collect();
        assert!(names.contains(&"Master"));
        assert!(names.contains(&"Doctor"));
    }

    #[tokio::test]
    async fn test_list_rejects_out_of_range_level() {
        let (status, _) = send(
            app(Arc::new(MemoryResumeStore::new()), None),
            request(Method::GET, "/api/v1/resumes?education_level=7"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_search_by_name() {
        let store = Arc::new(MemoryResumeStore::new());
        seed(&store, "Jane Doe", None, &[]).await;
        seed(&store, "John Smith", None, &[]).await;

        let (status, body) = send(
            app(store, None),
            request(Method::GET, "/api/v1/resumes/search/jane"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_count"], 1);
        assert_eq!(body["resumes"][0]["name"], "Jane Doe");
    }

    #[tokio::test]
    async fn test_education_endpoints() {
        let store = Arc::new(MemoryResumeStore::new());
        let built = seed(
            &store,
            "Jane Doe",
            None,
            &[("Springfield High School", ""), ("MIT", "PhD"), ("Harvard", "Bachelor")],
        )
        .await;
        let id = built.record.id;

        let (status, body) = send(
            app(store.clone(), None),
            request(Method::GET, &format!("/api/v1/resumes/{id}/education")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let levels: Vec<u64> = body["educations"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|e| e["level_number"].as_u64())
            .collect();
        assert_eq!(levels, vec![3, 6, 4]);

        let (status, body) = send(
            app(store, None),
            request(Method::GET, &format!("/api/v1/resumes/{id}/education/final")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["final_education"]["institution_name"], "MIT");
        assert_eq!(body["final_education"]["education_level"], "doctorate");
    }

    #[tokio::test]
    async fn test_final_education_is_null_without_entries() {
        let store = Arc::new(MemoryResumeStore::new());
        let built = seed(&store, "No School", None, &[]).await;

        let uri = format!("/api/v1/resumes/{}/education/final", built.record.id);
        let (status, body) = send(app(store, None), request(Method::GET, &uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["final_education"].is_null());
    }

    #[tokio::test]
    async fn test_soft_delete_hides_from_list_but_not_get() {
        let store = Arc::new(MemoryResumeStore::new());
        let built = seed(&store, "Jane Doe", None, &[]).await;
        let uri = format!("/api/v1/resumes/{}", built.record.id);

        let (status, body) = send(app(store.clone(), None), request(Method::DELETE, &uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["hard"], false);

        let (_, body) = send(
            app(store.clone(), None),
            request(Method::GET, "/api/v1/resumes"),
        )
        .await;
        assert_eq!(body["total_count"], 0);

        let (status, body) = send(app(store, None), request(Method::GET, &uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["deleted_at"].is_string());
    }

    #[tokio::test]
    async fn test_hard_delete_then_404() {
        let store = Arc::new(MemoryResumeStore::new());
        let built = seed(&store, "Jane Doe", None, &[("MIT", "PhD")]).await;
        let uri = format!("/api/v1/resumes/{}", built.record.id);

        let (status, _) = send(
            app(store.clone(), None),
            request(Method::DELETE, &format!("{uri}?hard=true")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(app(store.clone(), None), request(Method::GET, &uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(app(store, None), request(Method::DELETE, &uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_all_reports_count() {
        let store = Arc::new(MemoryResumeStore::new());
        seed(&store, "A", None, &[]).await;
        seed(&store, "B", None, &[]).await;

        let (status, body) = send(
            app(store, None),
            request(Method::DELETE, "/api/v1/resumes?hard=true"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deleted_count"], 2);
        assert_eq!(body["hard"], true);
    }
}
