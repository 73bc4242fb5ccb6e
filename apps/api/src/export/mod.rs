//! Report Exporter: lays an `AssembledReport` out on A4 pages and renders it
//! as a downloadable text document.

pub mod font_metrics;
pub mod handlers;
pub mod layout;
pub mod render;

pub use font_metrics::{a4_page_config, PageConfig, HELVETICA};
pub use layout::{layout_report, AnalysisPlacement, ExportDocument, ExportPage};
pub use render::{export_filename, render_text};

use crate::report::AssembledReport;

/// Layout plus rendering with the default A4 page. Returns `(filename, body)`.
pub fn export_report(report: &AssembledReport) -> (String, String) {
    let doc = layout_report(report, &HELVETICA, &a4_page_config());
    (export_filename(&doc.candidate_name), render_text(&doc))
}
