//! Export Layout — places one report onto fixed-height pages.
//!
//! # Section order
//! Candidate name → FORTALEZAS → ÁREAS DE MEJORA → RECOMENDACIONES → ANÁLISIS TÉCNICO.
//!
//! # Page rules
//! - Bullets wrap greedily at the text width and flow onto new pages.
//! - A section heading never sits alone at the bottom of a page.
//! - The technical analysis only uses what is left of the current page:
//!   fewer than `min_analysis_lines` free → a pointer to the web platform;
//!   too long to fit → truncated, followed by a marker line.

use serde::Serialize;

use crate::export::font_metrics::{FontMetricTable, PageConfig};
use crate::report::AssembledReport;

pub const REPORT_TITLE: &str = "Reporte de Evaluación de Currículum";
pub const BULLET: &str = "• ";
const CONTINUATION: &str = "  ";

pub const ANALYSIS_ELSEWHERE: &str = "Análisis técnico detallado disponible en la plataforma web.";
pub const ANALYSIS_TRUNCATED: &str = "... (análisis completo disponible en la plataforma)";
pub const ANALYSIS_MISSING: &str = "Análisis técnico no disponible para este currículum.";

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportPage {
    /// 1-based.
    pub number: usize,
    pub lines: Vec<String>,
}

/// How the technical analysis ended up on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisPlacement {
    Full,
    Truncated { shown_lines: usize },
    Deferred,
    Missing,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportDocument {
    pub title: &'static str,
    pub candidate_name: String,
    pub pages: Vec<ExportPage>,
    pub analysis: AnalysisPlacement,
}

// ────────────────────────────────────────────────────────────────────────────
// Word wrap
// ────────────────────────────────────────────────────────────────────────────

/// Greedy word wrap at `max_width_em`. Words wider than a whole line are
/// split at character boundaries. Empty or blank text yields no lines.
pub fn wrap_text(text: &str, metrics: &FontMetricTable, max_width_em: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0.0_f32;

    for word in text.split_whitespace() {
        let word_w = metrics.measure_str(word);

        if word_w > max_width_em {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_width = 0.0;
            }
            for c in word.chars() {
                let char_w = metrics.measure_char(c);
                if current_width + char_w > max_width_em && !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                    current_width = 0.0;
                }
                current.push(c);
                current_width += char_w;
            }
            continue;
        }

        if current.is_empty() {
            current.push_str(word);
            current_width = word_w;
        } else if current_width + metrics.space_width + word_w > max_width_em {
            lines.push(std::mem::replace(&mut current, word.to_string()));
            current_width = word_w;
        } else {
            current.push(' ');
            current.push_str(word);
            current_width += metrics.space_width + word_w;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Wraps one list item as `• first line` with indented continuation lines.
fn wrap_bullet(item: &str, metrics: &FontMetricTable, config: &PageConfig) -> Vec<String> {
    let indent = metrics.measure_str(BULLET);
    wrap_text(item, metrics, config.text_width_em - indent)
        .into_iter()
        .enumerate()
        .map(|(i, line)| {
            let prefix = if i == 0 { BULLET } else { CONTINUATION };
            format!("{prefix}{line}")
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Pagination
// ────────────────────────────────────────────────────────────────────────────

struct PageBuilder<'a> {
    config: &'a PageConfig,
    pages: Vec<ExportPage>,
    current: Vec<String>,
}

impl<'a> PageBuilder<'a> {
    fn new(config: &'a PageConfig) -> Self {
        Self {
            config,
            pages: Vec::new(),
            current: Vec::new(),
        }
    }

    fn remaining(&self) -> usize {
        (self.config.usable_height_lines as usize).saturating_sub(self.current.len())
    }

    fn break_page(&mut self) {
        let lines = std::mem::take(&mut self.current);
        self.pages.push(ExportPage {
            number: self.pages.len() + 1,
            lines,
        });
    }

    fn push(&mut self, line: String) {
        if self.remaining() == 0 {
            self.break_page();
        }
        self.current.push(line);
    }

    /// Blank separator, dropped at the top of a fresh page.
    fn gap(&mut self) {
        if !self.current.is_empty() && self.remaining() > 0 {
            self.current.push(String::new());
        }
    }

    /// Heading plus at least one following line must fit, else start a new page.
    fn heading(&mut self, text: &str) {
        if self.remaining() < 2 {
            self.break_page();
        }
        self.current.push(text.to_string());
    }

    fn finish(mut self) -> Vec<ExportPage> {
        if !self.current.is_empty() || self.pages.is_empty() {
            self.break_page();
        }
        self.pages
    }
}

/// Lays out the whole report. Pure: same report and config, same pages.
pub fn layout_report(
    report: &AssembledReport,
    metrics: &FontMetricTable,
    config: &PageConfig,
) -> ExportDocument {
    let mut pages = PageBuilder::new(config);

    for line in wrap_text(
        &format!("Candidato: {}", report.candidate_name),
        metrics,
        config.text_width_em,
    ) {
        pages.push(line);
    }

    let sections = [
        ("FORTALEZAS", &report.strengths),
        ("ÁREAS DE MEJORA", &report.weaknesses),
        ("RECOMENDACIONES", &report.recommendations),
    ];
    for (title, items) in sections {
        pages.gap();
        pages.heading(title);
        for item in items.iter() {
            for line in wrap_bullet(item, metrics, config) {
                pages.push(line);
            }
        }
    }

    pages.gap();
    pages.heading("ANÁLISIS TÉCNICO");
    let analysis = place_analysis(&mut pages, &report.technical_analysis, metrics);

    ExportDocument {
        title: REPORT_TITLE,
        candidate_name: report.candidate_name.clone(),
        pages: pages.finish(),
        analysis,
    }
}

fn place_analysis(
    pages: &mut PageBuilder<'_>,
    analysis: &str,
    metrics: &FontMetricTable,
) -> AnalysisPlacement {
    let wrapped = wrap_text(analysis, metrics, pages.config.text_width_em);
    if wrapped.is_empty() {
        pages.push(ANALYSIS_MISSING.to_string());
        return AnalysisPlacement::Missing;
    }

    let available = pages.remaining();
    if available == 0 || available < pages.config.min_analysis_lines as usize {
        pages.push(ANALYSIS_ELSEWHERE.to_string());
        return AnalysisPlacement::Deferred;
    }

    if wrapped.len() <= available {
        for line in wrapped {
            pages.push(line);
        }
        return AnalysisPlacement::Full;
    }

    // Keep one slot for the marker.
    let shown_lines = available - 1;
    for line in wrapped.into_iter().take(shown_lines) {
        pages.push(line);
    }
    pages.push(ANALYSIS_TRUNCATED.to_string());
    AnalysisPlacement::Truncated { shown_lines }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
