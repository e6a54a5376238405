//! Structured medical entity extraction.
//!
//! The model is asked for a fenced JSON object with a fixed set of keys;
//! `parse_entities` accepts the fenced form or a bare object.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const NOT_EXTRACTED: &str = "Not extracted";

/// `(key, description)` pairs the model is asked to fill.
pub const RESPONSE_SCHEMAS: [(&str, &str); 7] = [
    ("patient_info", "Patient demographic information (name, age, gender, ID)"),
    ("chief_complaint", "Main reason for visit or primary symptoms"),
    ("symptoms", "List of symptoms mentioned in the document"),
    ("diagnosis", "Medical diagnosis or provisional diagnosis"),
    ("medications", "Prescribed medications with dosage if mentioned"),
    ("treatment_plan", "Treatment recommendations and follow-up instructions"),
    ("vitals", "Vital signs if mentioned (BP, pulse, temperature, etc.)"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicalEntities {
    pub patient_info: String,
    pub chief_complaint: String,
    pub symptoms: String,
    pub diagnosis: String,
    pub medications: String,
    pub treatment_plan: String,
    pub vitals: String,
}

impl MedicalEntities {
    /// Placeholder stored when extraction fails.
    pub fn not_extracted() -> Self {
        let v = || NOT_EXTRACTED.to_string();
        Self {
            patient_info: v(),
            chief_complaint: v(),
            symptoms: v(),
            diagnosis: v(),
            medications: v(),
            treatment_plan: v(),
            vitals: v(),
        }
    }

    /// `(label, value)` rows in schema order, for display.
    pub fn rows(&self) -> [(&'static str, &str); 7] {
        [
            ("Patient info", self.patient_info.as_str()),
            ("Chief complaint", self.chief_complaint.as_str()),
            ("Symptoms", self.symptoms.as_str()),
            ("Diagnosis", self.diagnosis.as_str()),
            ("Medications", self.medications.as_str()),
            ("Treatment plan", self.treatment_plan.as_str()),
            ("Vitals", self.vitals.as_str()),
        ]
    }
}

#[derive(Debug, Error)]
pub enum EntityParseError {
    #[error("no JSON object found in model output")]
    NoJson,
    #[error("invalid JSON in model output: {0}")]
    Json(#[from] serde_json::Error),
    #[error("model output is missing key '{0}'")]
    MissingKey(&'static str),
}

pub fn format_instructions() -> String {
    let mut s = String::from(
        "The output should be a markdown code snippet formatted in the following schema, \
         including the leading and trailing \"```json\" and \"```\":\n\n```json\n{\n",
    );
    for (key, description) in RESPONSE_SCHEMAS {
        s.push_str(&format!("\t\"{key}\": string  // {description}\n"));
    }
    s.push_str("}\n```");
    s
}

/// Parse the model's reply into entities. Array values are joined with ", ".
pub fn parse_entities(output: &str) -> Result<MedicalEntities, EntityParseError> {
    let json_text = extract_json_block(output).ok_or(EntityParseError::NoJson)?;
    let value: serde_json::Value = serde_json::from_str(json_text)?;
    let obj = value.as_object().ok_or(EntityParseError::NoJson)?;

    let field = |key: &'static str| -> Result<String, EntityParseError> {
        let v = obj.get(key).ok_or(EntityParseError::MissingKey(key))?;
        Ok(match v {
            serde_json::Value::String(s) => s.trim().to_string(),
            serde_json::Value::Array(items) => items
                .iter()
                .map(|i| i.as_str().map(str::to_string).unwrap_or_else(|| i.to_string()))
                .collect::<Vec<_>>()
                .join(", "),
            serde_json::Value::Null => "Not mentioned".to_string(),
            other => other.to_string(),
        })
    };

    Ok(MedicalEntities {
        patient_info: field("patient_info")?,
        chief_complaint: field("chief_complaint")?,
        symptoms: field("symptoms")?,
        diagnosis: field("diagnosis")?,
        medications: field("medications")?,
        treatment_plan: field("treatment_plan")?,
        vitals: field("vitals")?,
    })
}

fn extract_json_block(output: &str) -> Option<&str> {
    if let Some(start) = output.find("```json") {
        let body = &output[start + "```json".len()..];
        if let Some(end) = body.find("```") {
            return Some(body[..end].trim());
        }
    }
    let start = output.find('{')?;
    let end = output.rfind('}')?;
    (end > start).then(|| &output[start..=end])
}
