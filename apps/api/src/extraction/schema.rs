use serde_json::{json, Value};

/// Model name of the Upstage information-extraction endpoint.
pub const EXTRACTION_MODEL: &str = "information-extract";

pub const SCHEMA_NAME: &str = "document_schema";

fn string_field(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

fn array_of(properties: Value) -> Value {
    json!({
        "type": "array",
        "items": { "type": "object", "properties": properties }
    })
}

/// JSON schema the extraction service fills in. Mirrors `ExtractedResume`.
pub fn resume_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": string_field("The full name of the individual."),
            "gender": string_field("The gender of the individual."),
            "birth_year": {
                "type": "integer",
                "description": "The birth year of the individual."
            },
            "phone_number": string_field("The contact phone number of the individual."),
            "email": string_field("The email address of the individual."),
            "address": string_field("The residential address of the individual."),
            "education": array_of(json!({
                "period": string_field("The time period during which the education was pursued."),
                "institution": string_field("The name of the educational institution."),
                "major": string_field("The major or field of study."),
                "degree": string_field("The degree or qualification obtained."),
                "grade": string_field("The academic grade or GPA.")
            })),
            "work_experience": array_of(json!({
                "period": string_field("The time period of the employment."),
                "company": string_field("The name of the company or organization."),
                "position": string_field("The job title or position held."),
                "description": string_field("A brief description of the job duties or responsibilities.")
            })),
            "certifications": array_of(json!({
                "date": string_field("The date when the certification was obtained."),
                "name": string_field("The name of the certification."),
                "issuer": string_field("The organization that issued the certification.")
            })),
            "language_skills": array_of(json!({
                "language": string_field("The language name."),
                "proficiency": string_field("The level of proficiency in the language.")
            }))
        }
    })
}

/// `response_format` block of the chat-completions request.
pub fn response_format() -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": SCHEMA_NAME,
            "schema": resume_schema()
        }
    })
}
