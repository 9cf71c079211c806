use crate::{
    config::Source,
    error::ExtractionError,
    model::{Magnitude, Report, RunStamp},
    render::RenderedPage,
};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;
use url::Url;

/// Cells a row needs to become a report: label, reference, datetime, magnitude, link.
pub const REPORT_COLUMNS: usize = 5;

static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

pub struct Extractor {
    table: Selector,
    rows: Selector,
    table_selector: String,
}

/// One `tr` as rendered; lives only for the duration of an extract call.
struct RawRow<'a> {
    cells: Vec<ElementRef<'a>>,
}

impl Extractor {
    pub fn new(table_selector: &str, row_selector: &str) -> Result<Self, ExtractionError> {
        Ok(Self {
            table: parse_selector(table_selector)?,
            rows: parse_selector(row_selector)?,
            table_selector: table_selector.to_string(),
        })
    }

    pub fn from_config(source: &Source) -> Result<Self, ExtractionError> {
        Self::new(&source.table_selector, &source.row_selector)
    }

    pub fn extract(&self, page: &RenderedPage, run: &RunStamp) -> Result<Vec<Report>, ExtractionError> {
        let doc = Html::parse_document(&page.html);
        let base = Url::parse(&page.url).ok();
        self.extract_document(&doc, base.as_ref(), run)
    }

    /// Reports for every row with at least [`REPORT_COLUMNS`] cells, in
    /// document order. Shorter rows are skipped.
    pub fn extract_document(
        &self,
        doc: &Html,
        base: Option<&Url>,
        run: &RunStamp,
    ) -> Result<Vec<Report>, ExtractionError> {
        if doc.select(&self.table).next().is_none() {
            return Err(ExtractionError::TableMissing(self.table_selector.clone()));
        }

        let scraped_at = run.rfc3339();
        let mut skipped = 0usize;
        let mut reports = Vec::new();

        for row in doc.select(&self.rows).map(RawRow::read) {
            match row.into_report(base, &scraped_at) {
                Some(r) => reports.push(r),
                None => skipped += 1,
            }
        }

        debug!(kept = reports.len(), skipped, "extracted table rows");
        Ok(reports)
    }
}

impl<'a> RawRow<'a> {
    fn read(tr: ElementRef<'a>) -> Self {
        let cells = tr
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().name() == "td")
            .collect();
        Self { cells }
    }

    fn into_report(self, base: Option<&Url>, scraped_at: &str) -> Option<Report> {
        if self.cells.len() < REPORT_COLUMNS {
            return None;
        }
        let c = &self.cells;
        Some(Report {
            report_label: cell_text(c[0]),
            reference: cell_text(c[1]),
            local_datetime: cell_text(c[2]),
            magnitude: Magnitude::parse(&raw_text(c[3])),
            report_link: cell_link(c[4], base),
            scraped_at: scraped_at.to_string(),
        })
    }
}

fn parse_selector(raw: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(raw).map_err(|_| ExtractionError::Selector(raw.to_string()))
}

pub fn normalize_text(raw: &str) -> String {
    let nfc: String = raw.nfc().collect();
    nfc.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn raw_text(cell: ElementRef<'_>) -> String {
    cell.text().collect()
}

fn cell_text(cell: ElementRef<'_>) -> String {
    normalize_text(&raw_text(cell))
}

/// Absolute URL of the first anchor in the cell, resolved like a browser
/// resolves `anchor.href`; `""` when there is none.
fn cell_link(cell: ElementRef<'_>, base: Option<&Url>) -> String {
    let Some(href) = cell.select(&ANCHOR).find_map(|a| a.value().attr("href")) else {
        return String::new();
    };
    let href = href.trim();
    if href.is_empty() {
        return String::new();
    }

    let resolved = match base {
        Some(base) => base.join(href),
        None => Url::parse(href),
    };
    resolved.map(|u| u.to_string()).unwrap_or_default()
}
