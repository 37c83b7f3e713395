use std::sync::Arc;

use crate::config::Config;
use crate::extraction::ResumeExtractor;
use crate::resumes::store::ResumeStore;
use crate::uploads::PdfArchive;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL or in-memory, per `STORE_BACKEND`.
    pub store: Arc<dyn ResumeStore>,
    pub extractor: Arc<dyn ResumeExtractor>,
    /// Archive of the original PDFs.
    pub archive: Arc<dyn PdfArchive>,
    pub config: Config,
}
