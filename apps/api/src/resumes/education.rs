//! Education level resolution. Maps free-text institution/degree strings onto
//! the six-tier `EducationLevel` scale and picks the final (highest) education.
//!
//! Lookup order for a single text fragment:
//! 1. Keyword table. Of all keywords contained in the text, the longest wins;
//!    equal lengths go to the higher tier (`서울대학교 대학원` → master).
//! 2. Regex patterns, lowest tier first. First match wins.
//! 3. Nothing matched → 0.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::extraction::payload::ExtractedEducation;
use crate::resumes::models::{EducationLevel, FinalEducation, ResolvedEducation};

/// Tier substituted when neither institution nor degree classifies.
/// This silently assumes a bachelor's degree; callers see only a warning.
pub const DEFAULT_LEVEL: EducationLevel = EducationLevel::Bachelor;

const EDUCATION_KEYWORDS: &[(&str, u8)] = &[
    // elementary
    ("초등학교", 1),
    ("초등", 1),
    ("elementary", 1),
    // middle
    ("중학교", 2),
    ("중등", 2),
    ("middle", 2),
    // high school
    ("고등학교", 3),
    ("고등", 3),
    ("고교", 3),
    ("high school", 3),
    ("highschool", 3),
    // bachelor
    ("대학교", 4),
    ("대학", 4),
    ("학사", 4),
    ("bachelor", 4),
    ("university", 4),
    ("college", 4),
    ("학부", 4),
    ("4년제", 4),
    ("4년", 4),
    // master
    ("석사", 5),
    ("master", 5),
    ("대학원", 5),
    ("석사과정", 5),
    ("masters", 5),
    // doctorate
    ("박사", 6),
    ("doctorate", 6),
    ("phd", 6),
    ("박사과정", 6),
    ("doctor", 6),
];

const EDUCATION_PATTERNS: &[(&str, u8)] = &[
    (r"초등|primary\s*school|grade\s*school", 1),
    (r"중등|중학|junior\s*high|middle\s*school", 2),
    (r"고등|고교|검정고시|high\s*school|secondary\s*school|\bged\b", 3),
    (
        r"대학|학사|4년제|undergraduate|baccalaureate|\bb\.?(a|s|sc|eng)\b",
        4,
    ),
    (
        r"석사|master|graduate\s*school|\bmba\b|\bm\.?(a|s|sc|eng|phil)\b",
        5,
    ),
    (r"박사|doctor|ph\.?\s?d|d\.\s?phil|sc\.\s?d", 6),
];

fn compiled_patterns() -> &'static [(Regex, u8)] {
    static PATTERNS: OnceLock<Vec<(Regex, u8)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        EDUCATION_PATTERNS
            .iter()
            .filter_map(|(pattern, level)| match Regex::new(pattern) {
                Ok(re) => Some((re, *level)),
                Err(e) => {
                    warn!("Skipping invalid education pattern '{pattern}': {e}");
                    None
                }
            })
            .collect()
    })
}

/// Extracts an education rank (1–6) from a text fragment, or 0 when nothing matches.
pub fn extract_level(text: &str) -> u8 {
    let text = text.trim().to_lowercase();
    if text.is_empty() {
        return 0;
    }

    let keyword_hit = EDUCATION_KEYWORDS
        .iter()
        .filter(|(keyword, _)| text.contains(keyword))
        .max_by_key(|(keyword, level)| (keyword.chars().count(), *level));
    if let Some((keyword, level)) = keyword_hit {
        debug!("Education keyword match: '{keyword}' -> level {level}");
        return *level;
    }

    for (re, level) in compiled_patterns() {
        if re.is_match(&text) {
            debug!("Education pattern match: '{}' -> level {level}", re.as_str());
            return *level;
        }
    }

    debug!("No education level found in '{text}'");
    0
}

/// Resolves one entry: the higher of the institution and degree ranks,
/// falling back to [`DEFAULT_LEVEL`] when neither classifies.
pub fn resolve_entry(institution: &str, degree: &str) -> ResolvedEducation {
    let from_institution = extract_level(institution);
    let from_degree = extract_level(degree);

    let level = match EducationLevel::from_rank(from_institution.max(from_degree)) {
        Some(level) => level,
        None => {
            warn!(
                institution = %institution,
                degree = %degree,
                "Education level unclassified, defaulting to {DEFAULT_LEVEL}"
            );
            DEFAULT_LEVEL
        }
    };

    ResolvedEducation {
        institution_name: institution.trim().to_string(),
        level,
        level_number: level.rank(),
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum EducationEntryError {
    #[error("education entry has neither institution nor degree")]
    Blank,
}

fn try_resolve(entry: &ExtractedEducation) -> Result<ResolvedEducation, EducationEntryError> {
    if entry.institution.trim().is_empty() && entry.degree.trim().is_empty() {
        return Err(EducationEntryError::Blank);
    }
    Ok(resolve_entry(&entry.institution, &entry.degree))
}

/// Resolved entries paired with their index in the raw list, plus the final education.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EducationResolution {
    pub entries: Vec<(usize, ResolvedEducation)>,
    pub final_education: Option<FinalEducation>,
}

impl EducationResolution {
    /// Resolved level for the raw entry at `source_index`, if it was resolved.
    pub fn level_for(&self, source_index: usize) -> Option<EducationLevel> {
        self.entries
            .iter()
            .find(|(idx, _)| *idx == source_index)
            .map(|(_, e)| e.level)
    }
}

/// Resolves every raw entry, skipping malformed ones, and selects the final education.
pub fn resolve_all(entries: &[ExtractedEducation]) -> EducationResolution {
    let mut resolved = Vec::with_capacity(entries.len());
    for (idx, entry) in entries.iter().enumerate() {
        match try_resolve(entry) {
            Ok(education) => {
                debug!(
                    "Resolved education '{}' -> {}",
                    education.institution_name, education.level
                );
                resolved.push((idx, education));
            }
            Err(e) => warn!("Skipping education entry {idx}: {e}"),
        }
    }

    let final_education = select_final(resolved.iter(), |(_, e)| e.level_number).map(
        |(idx, education)| FinalEducation {
            source_index: *idx,
            education: education.clone(),
        },
    );
    if let Some(f) = &final_education {
        info!(
            "Final education: {} ({})",
            f.education.institution_name, f.education.level
        );
    }

    EducationResolution {
        entries: resolved,
        final_education,
    }
}

/// Returns the item with the highest level; on ties the earliest item wins.
pub fn select_final<T>(items: impl IntoIterator<Item = T>, level: impl Fn(&T) -> u8) -> Option<T> {
    let mut best: Option<(u8, T)> = None;
    for item in items {
        let rank = level(&item);
        match &best {
            Some((best_rank, _)) if rank <= *best_rank => {}
            _ => best = Some((rank, item)),
        }
    }
    best.map(|(_, item)| item)
}
