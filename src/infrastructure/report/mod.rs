// ============================================================
// PDF REPORT RENDERING
// ============================================================
// document -> layout -> pdf_writer

pub mod document;
pub mod font_metrics;
pub mod layout;
pub mod pdf_writer;

pub use document::{Block, ReportDocument, TableBlock};
pub use layout::{paginate, DrawOp, Page, PageLayout};

use tracing::debug;

use crate::domain::equipment::StoredDataset;
use crate::domain::error::Result;
use crate::infrastructure::config::REPORT_SAMPLE_ROWS;

#[derive(Debug, Clone, Copy)]
pub struct ReportRenderer {
    sample_rows: usize,
    page: PageLayout,
}

impl Default for ReportRenderer {
    fn default() -> Self {
        Self::new(REPORT_SAMPLE_ROWS)
    }
}

impl ReportRenderer {
    pub fn new(sample_rows: usize) -> Self {
        Self {
            sample_rows,
            page: PageLayout::default(),
        }
    }

    /// Render the report for `dataset` as PDF bytes.
    pub fn render(&self, dataset: &StoredDataset) -> Result<Vec<u8>> {
        let document = ReportDocument::build(dataset, self.sample_rows);
        let pages = paginate(&document, self.page);
        let bytes = pdf_writer::write_pdf(&pages, self.page, document::REPORT_TITLE)?;

        debug!(
            dataset_id = %dataset.id,
            pages = pages.len(),
            bytes = bytes.len(),
            "Rendered report"
        );
        Ok(bytes)
    }
}
