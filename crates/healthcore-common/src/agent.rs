//! Agent and document-type identifiers.
//!
//! An agent is one document-generation workflow (form + prompt template +
//! renderer). A document type is what the uploader declares for a stored
//! document; every type except `General` maps onto an agent.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {what}: {value}")]
pub struct ParseKindError {
    pub what: &'static str,
    pub value: String,
}

// ── AgentKind ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentKind {
    DischargeSummary,
    ReferralLetter,
    InsuranceAuthorization,
    LabReport,
}

impl AgentKind {
    pub const ALL: [AgentKind; 4] = [
        AgentKind::DischargeSummary,
        AgentKind::ReferralLetter,
        AgentKind::InsuranceAuthorization,
        AgentKind::LabReport,
    ];

    /// URL path segment, also the value stored in `audit_records.agent`.
    pub fn slug(&self) -> &'static str {
        match self {
            AgentKind::DischargeSummary       => "discharge-summary",
            AgentKind::ReferralLetter         => "referral-letter",
            AgentKind::InsuranceAuthorization => "insurance-authorization",
            AgentKind::LabReport              => "lab-report",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            AgentKind::DischargeSummary       => "Discharge Summary Agent",
            AgentKind::ReferralLetter         => "Referral Letter Agent",
            AgentKind::InsuranceAuthorization => "Insurance Authorization Agent",
            AgentKind::LabReport              => "Lab Report Agent",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AgentKind::DischargeSummary =>
                "Hospital discharge summary with diagnosis, hospital course, medications and follow-up.",
            AgentKind::ReferralLetter =>
                "Specialist referral letter with reason, history, findings and urgency.",
            AgentKind::InsuranceAuthorization =>
                "Prior authorization request with codes, clinical justification and alternatives.",
            AgentKind::LabReport =>
                "Laboratory report summary highlighting abnormal findings and recommendations.",
        }
    }

    /// Top-level heading the generated document opens with.
    pub fn document_heading(&self) -> &'static str {
        match self {
            AgentKind::DischargeSummary       => "DISCHARGE SUMMARY",
            AgentKind::ReferralLetter         => "REFERRAL LETTER",
            AgentKind::InsuranceAuthorization => "PRIOR AUTHORIZATION REQUEST",
            AgentKind::LabReport              => "LABORATORY REPORT SUMMARY",
        }
    }

    /// Numbered section headings, in template order.
    pub fn section_headings(&self) -> &'static [&'static str] {
        match self {
            AgentKind::DischargeSummary => &[
                "PATIENT INFORMATION",
                "ADMISSION DATE & DISCHARGE DATE",
                "PRINCIPAL DIAGNOSIS",
                "HOSPITAL COURSE",
                "MEDICATIONS AT DISCHARGE",
                "DISCHARGE INSTRUCTIONS",
                "FOLLOW-UP",
            ],
            AgentKind::ReferralLetter => &[
                "REFERRING PHYSICIAN INFORMATION",
                "PATIENT INFORMATION",
                "DATE OF REFERRAL",
                "REASON FOR REFERRAL",
                "RELEVANT MEDICAL HISTORY",
                "CLINICAL FINDINGS",
                "SPECIALIST REQUESTED",
                "URGENCY LEVEL",
                "SPECIFIC QUESTIONS/REQUESTS",
            ],
            AgentKind::InsuranceAuthorization => &[
                "PATIENT INFORMATION",
                "PROVIDER INFORMATION",
                "REQUESTED SERVICE/PROCEDURE",
                "DIAGNOSIS CODES (ICD-10)",
                "PROCEDURE CODES (CPT/HCPCS)",
                "CLINICAL JUSTIFICATION",
                "SUPPORTING DOCUMENTATION",
                "URGENCY LEVEL",
                "DURATION OF APPROVAL REQUESTED",
                "ALTERNATIVE TREATMENTS CONSIDERED",
            ],
            AgentKind::LabReport => &[
                "PATIENT INFORMATION",
                "TEST DATE & COLLECTION TIME",
                "ORDERING PHYSICIAN",
                "TESTS PERFORMED",
                "CRITICAL/ABNORMAL FINDINGS",
                "NORMAL FINDINGS",
                "CLINICAL SIGNIFICANCE",
                "TRENDING (if applicable)",
                "RECOMMENDATIONS",
                "REFERENCE RANGES",
            ],
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for AgentKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentKind::ALL
            .into_iter()
            .find(|k| k.slug() == s)
            .ok_or_else(|| ParseKindError { what: "agent", value: s.to_string() })
    }
}

// ── DocumentType ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    #[default]
    General,
    Discharge,
    Referral,
    Insurance,
    LabReport,
}

impl DocumentType {
    pub const ALL: [DocumentType; 5] = [
        DocumentType::General,
        DocumentType::Discharge,
        DocumentType::Referral,
        DocumentType::Insurance,
        DocumentType::LabReport,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::General   => "general",
            DocumentType::Discharge => "discharge",
            DocumentType::Referral  => "referral",
            DocumentType::Insurance => "insurance",
            DocumentType::LabReport => "lab_report",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DocumentType::General   => "General medical document",
            DocumentType::Discharge => "Discharge summary",
            DocumentType::Referral  => "Referral letter",
            DocumentType::Insurance => "Insurance authorization",
            DocumentType::LabReport => "Lab report",
        }
    }

    /// The agent whose template summarises this type, if any.
    pub fn agent(&self) -> Option<AgentKind> {
        match self {
            DocumentType::General   => None,
            DocumentType::Discharge => Some(AgentKind::DischargeSummary),
            DocumentType::Referral  => Some(AgentKind::ReferralLetter),
            DocumentType::Insurance => Some(AgentKind::InsuranceAuthorization),
            DocumentType::LabReport => Some(AgentKind::LabReport),
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ParseKindError { what: "document type", value: s.to_string() })
    }
}
