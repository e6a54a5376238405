//! Output rendering: HTML templates, Markdown and PDF.

pub mod markdown;
pub mod pdf;
pub mod templates;

pub use markdown::markdown_to_html;
pub use pdf::{render_pdf, PdfContent};

use healthcore_common::AgentKind;

/// Section headings the agent's template asks for that do not appear in
/// `output`. Matching is case-insensitive and ignores Markdown markers.
pub fn missing_sections(kind: AgentKind, output: &str) -> Vec<&'static str> {
    let haystack = normalize(output);
    kind.section_headings()
        .iter()
        .copied()
        .filter(|heading| !haystack.contains(&normalize(heading)))
        .collect()
}

fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '*' | '#' | '_'))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}
