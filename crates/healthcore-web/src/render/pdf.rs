//! Plain A4 PDF rendering with the built-in Helvetica faces.
//!
//! Markdown markers are stripped line by line, text is word-wrapped to a
//! fixed column count, and a new page starts whenever the cursor reaches
//! the bottom margin.

use std::io::BufWriter;

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};

use crate::error::WebError;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const LEFT: f32 = 20.0;
const TOP: f32 = 280.0;
const BOTTOM: f32 = 20.0;

const BODY_SIZE: f32 = 10.0;
const BODY_LEADING: f32 = 5.0;
const BODY_COLUMNS: usize = 95;
const HEADING_SIZE: f32 = 11.0;
const HEADING_COLUMNS: usize = 85;
const TITLE_SIZE: f32 = 14.0;
const META_SIZE: f32 = 9.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Title,
    Meta,
    Heading,
    Body,
    Blank,
}

impl LineStyle {
    fn size(self) -> f32 {
        match self {
            LineStyle::Title => TITLE_SIZE,
            LineStyle::Meta => META_SIZE,
            LineStyle::Heading => HEADING_SIZE,
            LineStyle::Body | LineStyle::Blank => BODY_SIZE,
        }
    }

    fn advance(self) -> f32 {
        match self {
            LineStyle::Title => 8.0,
            LineStyle::Meta => 4.5,
            LineStyle::Heading => 6.5,
            LineStyle::Body => BODY_LEADING,
            LineStyle::Blank => 3.0,
        }
    }

    fn bold(self) -> bool {
        matches!(self, LineStyle::Title | LineStyle::Heading)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub style: LineStyle,
    /// Baseline, in millimetres from the bottom edge.
    pub y: f32,
}

/// Title, metadata lines and a Markdown body, ready to lay out.
#[derive(Debug, Clone)]
pub struct PdfContent {
    pub title: String,
    pub meta: Vec<String>,
    pub body: String,
}

impl PdfContent {
    /// Split the content into pages of positioned lines.
    pub fn layout(&self) -> Vec<Vec<PlacedLine>> {
        let mut lines = Vec::new();
        for line in wrap_text(&sanitize(&self.title), HEADING_COLUMNS) {
            lines.push((line, LineStyle::Title));
        }
        for meta in &self.meta {
            for line in wrap_text(&sanitize(meta), BODY_COLUMNS) {
                lines.push((line, LineStyle::Meta));
            }
        }
        lines.push((String::new(), LineStyle::Blank));
        for (text, heading) in strip_markdown(&self.body) {
            if text.is_empty() {
                lines.push((String::new(), LineStyle::Blank));
                continue;
            }
            let (style, columns) = if heading {
                (LineStyle::Heading, HEADING_COLUMNS)
            } else {
                (LineStyle::Body, BODY_COLUMNS)
            };
            for wrapped in wrap_text(&sanitize(&text), columns) {
                lines.push((wrapped, style));
            }
        }

        let mut pages = vec![Vec::new()];
        let mut y = TOP;
        for (text, style) in lines {
            if y < BOTTOM {
                pages.push(Vec::new());
                y = TOP;
            }
            if let Some(page) = pages.last_mut() {
                page.push(PlacedLine { text, style, y });
            }
            y -= style.advance();
        }
        pages
    }
}

pub fn render_pdf(content: &PdfContent) -> Result<Vec<u8>, WebError> {
    let pages = content.layout();

    let (doc, page1, layer1) = PdfDocument::new(
        sanitize(&content.title),
        Mm(PAGE_WIDTH),
        Mm(PAGE_HEIGHT),
        "Layer 1",
    );
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| WebError::Internal(format!("PDF font error: {e}")))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| WebError::Internal(format!("PDF font error: {e}")))?;

    for (index, page) in pages.iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(page1).get_layer(layer1)
        } else {
            new_page(&doc)
        };
        for line in page.iter().filter(|l| !l.text.is_empty()) {
            let face = if line.style.bold() { &bold } else { &font };
            draw(&layer, line, face);
        }
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| WebError::Internal(format!("PDF save error: {e}")))?;
    buf.into_inner()
        .map_err(|e| WebError::Internal(format!("PDF buffer error: {e}")))
}

fn new_page(doc: &PdfDocumentReference) -> PdfLayerReference {
    let (page, layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    doc.get_page(page).get_layer(layer)
}

fn draw(layer: &PdfLayerReference, line: &PlacedLine, font: &IndirectFontRef) {
    layer.use_text(line.text.as_str(), line.style.size(), Mm(LEFT), Mm(line.y), font);
}

/// Strip Markdown markers. Returns `(text, is_heading)` per source line;
/// blank lines are kept as paragraph breaks, table rules are dropped.
pub fn strip_markdown(markdown: &str) -> Vec<(String, bool)> {
    let mut out = Vec::new();
    for raw in markdown.lines() {
        let line = raw.trim();
        if line.is_empty() || is_rule(line) {
            out.push((String::new(), false));
            continue;
        }
        if is_table_separator(line) {
            continue;
        }

        let (line, mut heading) = match line.trim_start_matches('#') {
            rest if rest.len() < line.len() && (rest.is_empty() || rest.starts_with(' ')) => (rest.trim(), true),
            _ => (line, false),
        };

        let line = if let Some(item) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")).or_else(|| line.strip_prefix("+ ")) {
            format!("- {}", item.trim())
        } else if line.starts_with('|') {
            line.trim_matches('|')
                .split('|')
                .map(str::trim)
                .collect::<Vec<_>>()
                .join(" | ")
        } else {
            line.to_string()
        };

        // A line that is bold end to end reads as a heading.
        if line.len() > 4 && line.starts_with("**") && line.ends_with("**") && !line[2..line.len() - 2].contains("**") {
            heading = true;
        }

        let text = strip_inline(&line);
        out.push((text, heading));
    }
    out
}

fn strip_inline(line: &str) -> String {
    let without_strong = line.replace("**", "").replace("__", "").replace('`', "");
    // Single `*`/`_` emphasis markers hug a word; keep arithmetic like `2 * 3`.
    let chars: Vec<char> = without_strong.chars().collect();
    let mut out = String::with_capacity(chars.len());
    for (i, &c) in chars.iter().enumerate() {
        if c == '*' || (c == '_' && !is_word_joined(&chars, i)) {
            let prev_space = i == 0 || chars[i - 1].is_whitespace();
            let next_space = i + 1 >= chars.len() || chars[i + 1].is_whitespace();
            if !(prev_space && next_space) {
                continue;
            }
        }
        out.push(c);
    }
    out
}

fn is_word_joined(chars: &[char], i: usize) -> bool {
    i > 0 && i + 1 < chars.len() && chars[i - 1].is_alphanumeric() && chars[i + 1].is_alphanumeric()
}

fn is_rule(line: &str) -> bool {
    line.len() >= 3 && (line.chars().all(|c| c == '-') || line.chars().all(|c| c == '*') || line.chars().all(|c| c == '_'))
}

fn is_table_separator(line: &str) -> bool {
    line.starts_with('|') && line.contains('-') && line.chars().all(|c| matches!(c, '|' | '-' | ':' | ' '))
}

/// Greedy word wrap at `max_chars`; words longer than a line are split.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
        if needed > max_chars {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current_len += word.len();
        current.extend(word);
    }
    if current_len > 0 {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// The built-in fonts only cover WinAnsi; map common typography to ASCII
/// and replace anything else with `?`.
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{2013}' | '\u{2014}' | '\u{2212}' => out.push('-'),
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2022}' | '\u{00B7}' => out.push('-'),
            '\u{2026}' => out.push_str("..."),
            '\u{2265}' => out.push_str(">="),
            '\u{2264}' => out.push_str("<="),
            '\u{00B5}' | '\u{03BC}' => out.push('u'),
            '\u{00B0}' => out.push_str(" deg"),
            '\u{00A0}' | '\t' => out.push(' '),
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}
