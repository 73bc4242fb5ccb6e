//! Plain-text rendering of an `ExportDocument`.
//!
//! Each page: title header, rule, body lines, rule, page footer. Pages are
//! separated by a form feed so printers and pagers break them.

use crate::export::layout::ExportDocument;

const PAGE_BREAK: char = '\u{0C}';
const RULE_WIDTH: usize = 72;
const FALLBACK_SLUG: &str = "candidato";

pub fn render_text(doc: &ExportDocument) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let total = doc.pages.len();
    let mut out = String::new();

    for (i, page) in doc.pages.iter().enumerate() {
        if i > 0 {
            out.push(PAGE_BREAK);
        }
        out.push_str(doc.title);
        out.push('\n');
        out.push_str(&rule);
        out.push_str("\n\n");
        for line in &page.lines {
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&rule);
        out.push('\n');
        out.push_str(&format!("Página {} de {total}\n", page.number));
    }
    out
}

/// `reporte-cv-<slug>.txt`, where the slug is the lower-cased name with
/// whitespace runs turned into `-`. Accents are folded and anything else
/// outside `[a-z0-9-]` dropped, so the name is safe in a header.
pub fn export_filename(candidate_name: &str) -> String {
    let lowered = candidate_name.trim().to_lowercase();
    let slug = lowered
        .split_whitespace()
        .map(|word| word.chars().filter_map(fold_char).collect::<String>())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    let slug = if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    };
    format!("reporte-cv-{slug}.txt")
}

fn fold_char(c: char) -> Option<char> {
    let folded = match c {
        'á' | 'à' | 'ä' | 'â' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        other => other,
    };
    (folded.is_ascii_alphanumeric() || folded == '-').then_some(folded)
}
