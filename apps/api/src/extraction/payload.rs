use serde::{Deserialize, Serialize};

/// One education entry as returned by the extraction service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedEducation {
    pub period: String,
    pub institution: String,
    pub major: String,
    pub degree: String,
    pub grade: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedWorkExperience {
    pub period: String,
    pub company: String,
    pub position: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedCertification {
    pub date: String,
    pub name: String,
    pub issuer: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedLanguageSkill {
    pub language: String,
    pub proficiency: String,
}

/// Structured resume fields produced from one uploaded document.
///
/// Work experience is expected most-recent-first; nothing here re-sorts it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedResume {
    pub name: String,
    pub gender: String,
    pub birth_year: Option<i32>,
    pub phone_number: String,
    pub email: String,
    pub address: String,
    pub education: Vec<ExtractedEducation>,
    pub work_experience: Vec<ExtractedWorkExperience>,
    pub certifications: Vec<ExtractedCertification>,
    pub language_skills: Vec<ExtractedLanguageSkill>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracted_resume_deserializes_full_payload() {
        let json = r#"{
            "name": "김민수",
            "gender": "male",
            "birth_year": 1992,
            "phone_number": "010-1234-5678",
            "email": "minsu@example.com",
            "address": "Seoul",
            "education": [
                {"period": "2011.03-2015.02", "institution": "서울대학교", "major": "컴퓨터공학", "degree": "학사", "grade": "3.8/4.5"}
            ],
            "work_experience": [
                {"period": "2019.01-2024.06", "company": "Kakao", "position": "Backend Engineer", "description": "Payments"}
            ],
            "certifications": [{"date": "2016.05", "name": "정보처리기사", "issuer": "HRDK"}],
            "language_skills": [{"language": "English", "proficiency": "TOEIC 900"}]
        }"#;
        let resume: ExtractedResume = serde_json::from_str(json).unwrap();
        assert_eq!(resume.birth_year, Some(1992));
        assert_eq!(resume.education[0].institution, "서울대학교");
        assert_eq!(resume.work_experience[0].company, "Kakao");
        assert_eq!(resume.certifications.len(), 1);
        assert_eq!(resume.language_skills[0].proficiency, "TOEIC 900");
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let resume: ExtractedResume =
            serde_json::from_str(r#"{"name": "Jane", "education": [{"institution": "MIT"}]}"#)
                .unwrap();
        assert_eq!(resume.birth_year, None);
        assert!(resume.work_experience.is_empty());
        assert_eq!(resume.education[0].degree, "");
    }
}
