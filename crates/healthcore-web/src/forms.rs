//! Agent form definitions and validation.
//!
//! Every agent has a fixed, ordered field set. Validation trims values,
//! checks required/length/date/choice rules and yields either the clean
//! input (in field order) or per-field error messages.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use healthcore_common::AgentKind;
use healthcore_llm::AgentInput;
use serde::Serialize;

pub const MSG_REQUIRED: &str = "This field is required.";
pub const MSG_INVALID_DATE: &str = "Enter a valid date (YYYY-MM-DD).";
pub const MSG_INVALID_CHOICE: &str = "Select a valid choice.";
pub const MSG_DISCHARGE_BEFORE_ADMISSION: &str = "Discharge date cannot be earlier than the admission date.";

const NAME_MAX: usize = 200;
const SHORT_MAX: usize = 300;
const NOTES_MAX: usize = 20_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "choices", rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    TextArea,
    Date,
    /// `(value, label)` pairs.
    Choice(&'static [(&'static str, &'static str)]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub required: bool,
    pub max_len: usize,
    pub kind: FieldKind,
}

const fn field(name: &'static str, label: &'static str, required: bool, max_len: usize, kind: FieldKind) -> FieldSpec {
    FieldSpec { name, label, required, max_len, kind }
}

const REFERRAL_URGENCY: &[(&str, &str)] = &[
    ("routine", "Routine"),
    ("urgent", "Urgent"),
    ("emergency", "Emergency"),
];

const AUTHORIZATION_URGENCY: &[(&str, &str)] = &[
    ("standard", "Standard"),
    ("expedited", "Expedited"),
    ("emergency", "Emergency"),
];

const DISCHARGE_FIELDS: &[FieldSpec] = &[
    field("patient_name", "Patient name", true, NAME_MAX, FieldKind::Text),
    field("admission_date", "Admission date", false, 10, FieldKind::Date),
    field("discharge_date", "Discharge date", false, 10, FieldKind::Date),
    field("clinical_notes", "Clinical notes", true, NOTES_MAX, FieldKind::TextArea),
];

const REFERRAL_FIELDS: &[FieldSpec] = &[
    field("patient_name", "Patient name", true, NAME_MAX, FieldKind::Text),
    field("referring_physician", "Referring physician", false, NAME_MAX, FieldKind::Text),
    field("specialty", "Specialty requested", true, NAME_MAX, FieldKind::Text),
    field("urgency", "Urgency", true, 20, FieldKind::Choice(REFERRAL_URGENCY)),
    field("clinical_notes", "Clinical notes", true, NOTES_MAX, FieldKind::TextArea),
];

const INSURANCE_FIELDS: &[FieldSpec] = &[
    field("patient_name", "Patient name", true, NAME_MAX, FieldKind::Text),
    field("insurance_id", "Insurance ID", false, 100, FieldKind::Text),
    field("requested_service", "Requested service / procedure", true, SHORT_MAX, FieldKind::Text),
    field("urgency", "Urgency", true, 20, FieldKind::Choice(AUTHORIZATION_URGENCY)),
    field("clinical_notes", "Clinical notes", true, NOTES_MAX, FieldKind::TextArea),
];

const LAB_FIELDS: &[FieldSpec] = &[
    field("patient_name", "Patient name", true, NAME_MAX, FieldKind::Text),
    field("ordering_physician", "Ordering physician", false, NAME_MAX, FieldKind::Text),
    field("collection_date", "Collection date", false, 10, FieldKind::Date),
    field("lab_results", "Lab results", true, NOTES_MAX, FieldKind::TextArea),
];

pub fn fields_for(kind: AgentKind) -> &'static [FieldSpec] {
    match kind {
        AgentKind::DischargeSummary       => DISCHARGE_FIELDS,
        AgentKind::ReferralLetter         => REFERRAL_FIELDS,
        AgentKind::InsuranceAuthorization => INSURANCE_FIELDS,
        AgentKind::LabReport              => LAB_FIELDS,
    }
}

/// Clean values in field order.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedForm {
    pub kind: AgentKind,
    pub values: Vec<(&'static FieldSpec, String)>,
}

impl ValidatedForm {
    /// Short fields become labelled context; the text area is the notes body.
    pub fn to_agent_input(&self) -> AgentInput {
        let mut input = AgentInput::default();
        for (spec, value) in &self.values {
            match spec.kind {
                FieldKind::TextArea => input.notes = value.clone(),
                FieldKind::Choice(choices) => {
                    let label = choices
                        .iter()
                        .find(|(v, _)| *v == value.as_str())
                        .map(|(_, l)| l.to_string())
                        .unwrap_or_else(|| value.clone());
                    input.context.push((spec.label.to_string(), label));
                }
                FieldKind::Text | FieldKind::Date => {
                    input.context.push((spec.label.to_string(), value.clone()));
                }
            }
        }
        input
    }

    /// JSON object keyed by field name, in field order.
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .values
            .iter()
            .map(|(spec, value)| (spec.name.to_string(), serde_json::Value::String(value.clone())))
            .collect();
        serde_json::Value::Object(map)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.iter().find(|(s, _)| s.name == name).map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormErrors {
    pub errors: BTreeMap<&'static str, String>,
    /// Submitted (trimmed) values for re-rendering the form.
    pub values: BTreeMap<&'static str, String>,
}

pub fn validate(kind: AgentKind, submitted: &HashMap<String, String>) -> Result<ValidatedForm, FormErrors> {
    let mut errors = BTreeMap::new();
    let mut values = Vec::new();

    for spec in fields_for(kind) {
        let value = submitted.get(spec.name).map(|v| v.trim()).unwrap_or_default().to_string();
        if let Some(msg) = check_field(spec, &value) {
            errors.insert(spec.name, msg);
        }
        values.push((spec, value));
    }

    let form = ValidatedForm { kind, values };

    if kind == AgentKind::DischargeSummary && !errors.contains_key("admission_date") && !errors.contains_key("discharge_date") {
        let admission = form.get("admission_date").and_then(parse_date);
        let discharge = form.get("discharge_date").and_then(parse_date);
        if let (Some(a), Some(d)) = (admission, discharge) {
            if d < a {
                errors.insert("discharge_date", MSG_DISCHARGE_BEFORE_ADMISSION.to_string());
            }
        }
    }

    if errors.is_empty() {
        Ok(form)
    } else {
        let values = form.values.iter().map(|(s, v)| (s.name, v.clone())).collect();
        Err(FormErrors { errors, values })
    }
}

fn check_field(spec: &FieldSpec, value: &str) -> Option<String> {
    if value.is_empty() {
        return spec.required.then(|| MSG_REQUIRED.to_string());
    }
    if value.chars().count() > spec.max_len {
        return Some(format!("Ensure this value has at most {} characters.", spec.max_len));
    }
    match spec.kind {
        FieldKind::Date if parse_date(value).is_none() => Some(MSG_INVALID_DATE.to_string()),
        FieldKind::Choice(choices) if !choices.iter().any(|(v, _)| *v == value) => {
            Some(MSG_INVALID_CHOICE.to_string())
        }
        _ => None,
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}
