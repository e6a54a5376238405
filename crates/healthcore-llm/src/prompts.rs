//! Prompt template store.
//!
//! Each agent owns one static template with a `{text}` slot. Templates use
//! `{name}` placeholders; `{{` and `}}` produce literal braces.

use std::collections::BTreeMap;

use healthcore_common::{truncate_chars, AgentKind};
use thiserror::Error;

/// Source text cap for summaries and agent documents.
pub const MAX_SOURCE_CHARS: usize = 5000;
/// Source text cap for entity extraction.
pub const MAX_ENTITY_SOURCE_CHARS: usize = 4000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromptError {
    #[error("missing template variable: {0}")]
    MissingVariable(String),
    #[error("unterminated placeholder starting at byte {0}")]
    UnterminatedPlaceholder(usize),
}

#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    pub template: &'static str,
    pub input_variables: &'static [&'static str],
}

impl PromptTemplate {
    pub const fn new(template: &'static str, input_variables: &'static [&'static str]) -> Self {
        Self { template, input_variables }
    }

    pub fn render(&self, values: &BTreeMap<&str, String>) -> Result<String, PromptError> {
        if let Some(missing) = self.input_variables.iter().find(|v| !values.contains_key(*v)) {
            return Err(PromptError::MissingVariable(missing.to_string()));
        }

        let src = self.template;
        let mut out = String::with_capacity(src.len() + values.values().map(String::len).sum::<usize>());
        let mut chars = src.char_indices().peekable();

        while let Some((idx, c)) = chars.next() {
            match c {
                '{' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    out.push('{');
                }
                '}' if matches!(chars.peek(), Some((_, '}'))) => {
                    chars.next();
                    out.push('}');
                }
                '{' => {
                    let rest = &src[idx + 1..];
                    let end = rest.find('}').ok_or(PromptError::UnterminatedPlaceholder(idx))?;
                    let name = &rest[..end];
                    let value = values
                        .get(name)
                        .ok_or_else(|| PromptError::MissingVariable(name.to_string()))?;
                    out.push_str(value);
                    // skip past the placeholder name and closing brace
                    for _ in 0..name.chars().count() + 1 {
                        chars.next();
                    }
                }
                _ => out.push(c),
            }
        }
        Ok(out)
    }

    /// Convenience for the common single-`{text}` templates.
    pub fn render_text(&self, text: &str) -> Result<String, PromptError> {
        let values = BTreeMap::from([("text", text.to_string())]);
        self.render(&values)
    }
}

// ── Agent input ──────────────────────────────────────────────────────────────

/// Validated form content handed to an agent template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentInput {
    /// Short labelled fields (patient name, dates, urgency, …), in form order.
    pub context: Vec<(String, String)>,
    /// Free-text clinical notes or lab results.
    pub notes: String,
}

impl AgentInput {
    /// Lays out the context block followed by the notes, capped at
    /// [`MAX_SOURCE_CHARS`].
    pub fn to_source_text(&self) -> String {
        let mut text = String::new();
        let filled: Vec<_> = self.context.iter().filter(|(_, v)| !v.is_empty()).collect();
        if !filled.is_empty() {
            text.push_str("Clinical context:\n");
            for (label, value) in filled {
                text.push_str(&format!("- {label}: {value}\n"));
            }
            text.push('\n');
        }
        text.push_str("Clinical notes:\n");
        text.push_str(self.notes.trim());
        truncate_chars(&text, MAX_SOURCE_CHARS).to_string()
    }
}

pub fn agent_template(kind: AgentKind) -> &'static PromptTemplate {
    match kind {
        AgentKind::DischargeSummary       => &DISCHARGE_SUMMARY,
        AgentKind::ReferralLetter         => &REFERRAL_LETTER,
        AgentKind::InsuranceAuthorization => &INSURANCE_AUTHORIZATION,
        AgentKind::LabReport              => &LAB_REPORT_SUMMARY,
    }
}

pub fn build_agent_prompt(kind: AgentKind, input: &AgentInput) -> Result<String, PromptError> {
    agent_template(kind).render_text(&input.to_source_text())
}

/// Prompt for summarising an uploaded document's extracted text.
pub fn build_document_prompt(
    agent: Option<AgentKind>,
    document_label: &str,
    text: &str,
) -> Result<String, PromptError> {
    let text = truncate_chars(text, MAX_SOURCE_CHARS);
    match agent {
        Some(kind) => agent_template(kind).render_text(text),
        None => {
            let values = BTreeMap::from([
                ("document_type", document_label.to_string()),
                ("text", text.to_string()),
            ]);
            GENERAL_SUMMARY.render(&values)
        }
    }
}

// ── Templates ────────────────────────────────────────────────────────────────

pub const GENERAL_SUMMARY: PromptTemplate = PromptTemplate::new(
    r#"You are an expert medical documentation assistant.
Generate a clear, professional summary of this {document_type} document.

**Instructions:**
- Write in clear medical terminology
- Organize information logically (Patient Info → Chief Complaint → Diagnosis → Treatment)
- Be concise but comprehensive
- Highlight critical information
- Use bullet points for lists
- Include medication names and dosages accurately

**Medical Document:**
{text}

**Professional Medical Summary:**"#,
    &["document_type", "text"],
);

pub const ENTITY_EXTRACTION: PromptTemplate = PromptTemplate::new(
    r#"You are a medical AI assistant analyzing clinical documents.
Extract the following information from the medical document below.
If any information is not present, write "Not mentioned".

{format_instructions}

Medical Document:
{text}

Output:"#,
    &["format_instructions", "text"],
);

pub const DISCHARGE_SUMMARY: PromptTemplate = PromptTemplate::new(
    r#"You are a hospital discharge summary generator.
Create a professional discharge summary with these sections:

**DISCHARGE SUMMARY**

**1. PATIENT INFORMATION**
[Extract patient demographics]

**2. ADMISSION DATE & DISCHARGE DATE**
[Extract dates if available]

**3. PRINCIPAL DIAGNOSIS**
[Main diagnosis]

**4. HOSPITAL COURSE**
[Brief narrative of treatment received]

**5. MEDICATIONS AT DISCHARGE**
[List medications with dosage]

**6. DISCHARGE INSTRUCTIONS**
[Follow-up care, activity restrictions, diet]

**7. FOLLOW-UP**
[Appointment information]

---

**Source Document:**
{text}

**Generate Discharge Summary:**"#,
    &["text"],
);

pub const REFERRAL_LETTER: PromptTemplate = PromptTemplate::new(
    r#"You are a medical referral letter processor.
Create a professional referral letter with these sections:

**REFERRAL LETTER**

**1. REFERRING PHYSICIAN INFORMATION**
[Extract referring doctor's name, specialty, contact]

**2. PATIENT INFORMATION**
[Patient demographics and identification]

**3. DATE OF REFERRAL**
[Extract date if available]

**4. REASON FOR REFERRAL**
[Primary reason patient is being referred]

**5. RELEVANT MEDICAL HISTORY**
[Past medical history, current conditions, medications]

**6. CLINICAL FINDINGS**
[Physical exam findings, test results, symptoms]

**7. SPECIALIST REQUESTED**
[Type of specialist needed - cardiology, orthopedics, etc.]

**8. URGENCY LEVEL**
[Routine, urgent, or emergency referral]

**9. SPECIFIC QUESTIONS/REQUESTS**
[What the referring physician wants addressed]

---

**Source Document:**
{text}

**Generate Referral Letter:**"#,
    &["text"],
);

pub const INSURANCE_AUTHORIZATION: PromptTemplate = PromptTemplate::new(
    r#"You are an insurance prior authorization specialist.
Create a structured prior authorization request with these sections:

**PRIOR AUTHORIZATION REQUEST**

**1. PATIENT INFORMATION**
[Patient name, DOB, insurance ID, policy number]

**2. PROVIDER INFORMATION**
[Requesting physician name, NPI number, specialty, contact]

**3. REQUESTED SERVICE/PROCEDURE**
[Specific procedure, treatment, or medication requested]

**4. DIAGNOSIS CODES (ICD-10)**
[Primary and secondary diagnosis codes with descriptions]

**5. PROCEDURE CODES (CPT/HCPCS)**
[Relevant procedure codes for requested service]

**6. CLINICAL JUSTIFICATION**
[Medical necessity, why this treatment is required]

**7. SUPPORTING DOCUMENTATION**
[Lab results, imaging, previous treatments tried]

**8. URGENCY LEVEL**
[Standard, expedited, or emergency authorization needed]

**9. DURATION OF APPROVAL REQUESTED**
[Time period or number of treatments/sessions]

**10. ALTERNATIVE TREATMENTS CONSIDERED**
[Other options tried or reasons why alternatives are unsuitable]

---

**Source Document:**
{text}

**Generate Prior Authorization Request:**"#,
    &["text"],
);

pub const LAB_REPORT_SUMMARY: PromptTemplate = PromptTemplate::new(
    r#"You are a clinical laboratory specialist summarizing lab reports for physician consultations.
Create a clear lab report summary with these sections:

**LABORATORY REPORT SUMMARY**

**1. PATIENT INFORMATION**
[Patient name, age, gender, medical record number]

**2. TEST DATE & COLLECTION TIME**
[When specimens were collected]

**3. ORDERING PHYSICIAN**
[Physician who ordered the tests]

**4. TESTS PERFORMED**
[List of all laboratory tests conducted]

**5. CRITICAL/ABNORMAL FINDINGS**
[Highlight any values outside normal ranges - use ⚠️ for critical values]

**6. NORMAL FINDINGS**
[Results within normal reference ranges]

**7. CLINICAL SIGNIFICANCE**
[Interpretation of what abnormal results may indicate]

**8. TRENDING (if applicable)**
[Comparison with previous results if mentioned]

**9. RECOMMENDATIONS**
[Suggested follow-up tests or clinical actions]

**10. REFERENCE RANGES**
[Include normal ranges for key tests]

---

**Source Lab Report:**
{text}

**Generate Lab Report Summary:**"#,
    &["text"],
);

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_substitutes_and_unescapes() {
        let t = PromptTemplate::new("Type: {kind}. JSON: {{\"a\": 1}}. Body: {text}", &["kind", "text"]);
        let values = BTreeMap::from([("kind", "lab".to_string()), ("text", "Hb 9.1".to_string())]);
        assert_eq!(t.render(&values).unwrap(), "Type: lab. JSON: {\"a\": 1}. Body: Hb 9.1");
    }

    #[test]
    fn test_substituted_values_are_not_reparsed() {
        let t = PromptTemplate::new("{text}", &["text"]);
        assert_eq!(t.render_text("{not_a_var}").unwrap(), "{not_a_var}");
    }

    #[test]
    fn test_missing_declared_variable() {
        let err = GENERAL_SUMMARY.render_text("only text").unwrap_err();
        assert_eq!(err, PromptError::MissingVariable("document_type".to_string()));
    }

    #[test]
    fn test_unterminated_placeholder() {
        let t = PromptTemplate::new("Hello {text", &[]);
        let values = BTreeMap::from([("text", String::new())]);
        assert_eq!(t.render(&values).unwrap_err(), PromptError::UnterminatedPlaceholder(6));
    }

    #[test]
    fn test_every_agent_template_lists_its_sections() {
        for kind in AgentKind::ALL {
            let template = agent_template(kind).template;
            assert!(template.contains(kind.document_heading()), "{kind}: heading");
            for heading in kind.section_headings() {
                assert!(template.contains(heading), "{kind}: missing {heading}");
            }
        }
    }

    #[test]
    fn test_agent_input_layout() {
        let input = AgentInput {
            context: vec![
                ("Patient name".to_string(), "John Doe".to_string()),
                ("Insurance ID".to_string(), String::new()),
            ],
            notes: "  Chest pain for 2 days.  ".to_string(),
        };
        assert_eq!(
            input.to_source_text(),
            "Clinical context:\n- Patient name: John Doe\n\nClinical notes:\nChest pain for 2 days."
        );
    }

    #[test]
    fn test_agent_prompt_is_capped() {
        let input = AgentInput { context: vec![], notes: "x".repeat(MAX_SOURCE_CHARS * 2) };
        let prompt = build_agent_prompt(AgentKind::LabReport, &input).unwrap();
        let template_len = LAB_REPORT_SUMMARY.template.chars().count() - "{text}".len();
        assert_eq!(prompt.chars().count(), template_len + MAX_SOURCE_CHARS);
    }

    #[test]
    fn test_document_prompt_general_uses_label() {
        let prompt = build_document_prompt(None, "consultation note", "BP 145/95").unwrap();
        assert!(prompt.contains("summary of this consultation note document"));
        assert!(prompt.contains("BP 145/95"));
    }

    #[test]
    fn test_document_prompt_with_agent() {
        let prompt = build_document_prompt(Some(AgentKind::ReferralLetter), "ignored", "Refer to cardiology").unwrap();
        assert!(prompt.starts_with("You are a medical referral letter processor."));
        assert!(prompt.contains("Refer to cardiology"));
    }
}
