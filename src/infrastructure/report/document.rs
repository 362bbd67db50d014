// ============================================================
// REPORT DOCUMENT MODEL
// ============================================================
// The four report sections as layout-independent blocks

use crate::domain::equipment::{format_number, StoredDataset};

pub const REPORT_TITLE: &str = "Chemical Equipment Parameter Report";
pub const SUMMARY_HEADING: &str = "Summary Statistics";
pub const DISTRIBUTION_HEADING: &str = "Equipment Type Distribution";
pub const SAMPLE_HEADING: &str = "Data Table (Sample)";
pub const NO_ROWS_PLACEHOLDER: &str = "No data rows.";
pub const MISSING_VALUE: &str = "N/A";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Clone, PartialEq)]
pub struct TableBlock {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub font_size: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Title(String),
    Heading(String),
    Paragraph(String),
    Table(TableBlock),
    Spacer(f32),
}

/// Ordered report content for one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    pub blocks: Vec<Block>,
}

impl ReportDocument {
    /// Build header, summary, distribution and sample sections, in that order.
    pub fn build(dataset: &StoredDataset, sample_rows: usize) -> Self {
        let mut blocks = Vec::new();

        blocks.push(Block::Title(REPORT_TITLE.to_string()));
        blocks.push(Block::Spacer(20.0));
        blocks.push(Block::Heading(format!("Dataset: {}", dataset.name)));
        blocks.push(Block::Paragraph(format!(
            "Generated: {}",
            dataset.created_at.format(TIMESTAMP_FORMAT)
        )));
        blocks.push(Block::Spacer(14.0));

        blocks.push(Block::Heading(SUMMARY_HEADING.to_string()));
        blocks.push(Block::Table(summary_table(dataset)));
        blocks.push(Block::Spacer(20.0));

        blocks.push(Block::Heading(DISTRIBUTION_HEADING.to_string()));
        blocks.push(Block::Table(distribution_table(dataset)));
        blocks.push(Block::Spacer(20.0));

        blocks.push(Block::Heading(SAMPLE_HEADING.to_string()));
        match sample_table(dataset, sample_rows) {
            Some(table) => blocks.push(Block::Table(table)),
            None => blocks.push(Block::Paragraph(NO_ROWS_PLACEHOLDER.to_string())),
        }

        Self { blocks }
    }

    pub fn headings(&self) -> Vec<&str> {
        self.blocks
            .iter()
            .filter_map(|block| match block {
                Block::Heading(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn tables(&self) -> Vec<&TableBlock> {
        self.blocks
            .iter()
            .filter_map(|block| match block {
                Block::Table(table) => Some(table),
                _ => None,
            })
            .collect()
    }

    pub fn contains_paragraph(&self, text: &str) -> bool {
        self.blocks
            .iter()
            .any(|block| matches!(block, Block::Paragraph(p) if p == text))
    }
}

fn optional_metric(value: Option<f64>) -> String {
    value
        .map(format_number)
        .unwrap_or_else(|| MISSING_VALUE.to_string())
}

fn summary_table(dataset: &StoredDataset) -> TableBlock {
    let summary = &dataset.summary;
    TableBlock {
        headers: vec!["Metric".to_string(), "Value".to_string()],
        rows: vec![
            vec![
                "Total Equipment Count".to_string(),
                summary.total_count.to_string(),
            ],
            vec!["Average Flowrate".to_string(), optional_metric(summary.avg_flowrate)],
            vec!["Average Pressure".to_string(), optional_metric(summary.avg_pressure)],
            vec![
                "Average Temperature".to_string(),
                optional_metric(summary.avg_temperature),
            ],
        ],
        font_size: 10.0,
    }
}

fn distribution_table(dataset: &StoredDataset) -> TableBlock {
    TableBlock {
        headers: vec!["Type".to_string(), "Count".to_string()],
        rows: dataset
            .summary
            .type_distribution
            .iter()
            .map(|(label, count)| vec![label.to_string(), count.to_string()])
            .collect(),
        font_size: 10.0,
    }
}

/// First `limit` rows under the first row's columns; `None` when there is
/// nothing to tabulate.
fn sample_table(dataset: &StoredDataset, limit: usize) -> Option<TableBlock> {
    let first = dataset.rows.first()?;
    let headers: Vec<String> = first.columns().map(str::to_string).collect();
    if headers.is_empty() {
        return None;
    }

    let rows = dataset
        .rows
        .iter()
        .take(limit)
        .map(|row| {
            headers
                .iter()
                .map(|header| row.get(header).map(|v| v.to_string()).unwrap_or_default())
                .collect()
        })
        .collect();

    Some(TableBlock {
        headers,
        rows,
        font_size: 8.0,
    })
}
