//! Flows report blocks onto fixed-size pages.
//!
//! Coordinates are PDF user space: origin bottom-left, y grows upward. Text
//! positions are baselines.

use super::document::{Block, ReportDocument, TableBlock};
use super::font_metrics::{fit_text, text_width, wrap_text};

const TITLE_SIZE: f32 = 18.0;
const HEADING_SIZE: f32 = 13.0;
const PARAGRAPH_SIZE: f32 = 10.0;
const LINE_SPACING: f32 = 1.4;
const CELL_PADDING: f32 = 4.0;
const HEADER_FILL_GRAY: f32 = 0.85;
const GRID_GRAY: f32 = 0.0;
const GRID_LINE_WIDTH: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

impl Default for PageLayout {
    /// A4 portrait with one-inch margins.
    fn default() -> Self {
        Self {
            width: 595.0,
            height: 842.0,
            margin: 72.0,
        }
    }
}

impl PageLayout {
    pub fn content_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    fn top(&self) -> f32 {
        self.height - self.margin
    }

    fn bottom(&self) -> f32 {
        self.margin
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        x: f32,
        y: f32,
        size: f32,
        bold: bool,
        gray: f32,
        text: String,
    },
    FillRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        gray: f32,
    },
    StrokeRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        gray: f32,
        line_width: f32,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub ops: Vec<DrawOp>,
}

impl Page {
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

fn line_height(size: f32) -> f32 {
    size * LINE_SPACING
}

fn row_height(table: &TableBlock) -> f32 {
    table.font_size + 2.0 * CELL_PADDING
}

struct Cursor {
    layout: PageLayout,
    pages: Vec<Page>,
    y: f32,
}

impl Cursor {
    fn new(layout: PageLayout) -> Self {
        Self {
            layout,
            pages: vec![Page::default()],
            y: layout.top(),
        }
    }

    fn remaining(&self) -> f32 {
        self.y - self.layout.bottom()
    }

    fn new_page(&mut self) {
        self.pages.push(Page::default());
        self.y = self.layout.top();
    }

    /// Break the page unless `height` still fits. A fresh page never breaks.
    fn ensure(&mut self, height: f32) {
        let fresh = (self.y - self.layout.top()).abs() < f32::EPSILON;
        if !fresh && height > self.remaining() {
            self.new_page();
        }
    }

    fn push(&mut self, op: DrawOp) {
        if let Some(page) = self.pages.last_mut() {
            page.ops.push(op);
        }
    }

    fn text_line(&mut self, x: f32, size: f32, bold: bool, text: String) {
        let height = line_height(size);
        self.ensure(height);
        let baseline = self.y - size;
        self.push(DrawOp::Text {
            x,
            y: baseline,
            size,
            bold,
            gray: 0.0,
            text,
        });
        self.y -= height;
    }
}

/// Lay out `document` into one or more pages.
pub fn paginate(document: &ReportDocument, layout: PageLayout) -> Vec<Page> {
    let mut cursor = Cursor::new(layout);
    let left = layout.margin;
    let width = layout.content_width();

    for (index, block) in document.blocks.iter().enumerate() {
        match block {
            Block::Title(text) => {
                let text = fit_text(text, TITLE_SIZE, true, width);
                let x = left + (width - text_width(&text, TITLE_SIZE, true)) / 2.0;
                cursor.text_line(x, TITLE_SIZE, true, text);
            }
            Block::Heading(text) => {
                // Keep a heading on the same page as the start of its content.
                let following = document
                    .blocks
                    .get(index + 1)
                    .map(leading_height)
                    .unwrap_or(0.0);
                cursor.ensure(line_height(HEADING_SIZE) + following);
                for line in wrap_text(text, HEADING_SIZE, true, width) {
                    cursor.text_line(left, HEADING_SIZE, true, line);
                }
            }
            Block::Paragraph(text) => {
                for line in wrap_text(text, PARAGRAPH_SIZE, false, width) {
                    cursor.text_line(left, PARAGRAPH_SIZE, false, line);
                }
            }
            Block::Table(table) => layout_table(&mut cursor, table),
            Block::Spacer(amount) => {
                if *amount >= cursor.remaining() {
                    cursor.new_page();
                } else {
                    cursor.y -= amount;
                }
            }
        }
    }

    cursor.pages
}

/// Height a block needs before a page break is acceptable inside it.
fn leading_height(block: &Block) -> f32 {
    match block {
        Block::Title(_) => line_height(TITLE_SIZE),
        Block::Heading(_) => line_height(HEADING_SIZE),
        Block::Paragraph(_) => line_height(PARAGRAPH_SIZE),
        Block::Table(table) if table.headers.is_empty() => 0.0,
        Block::Table(table) => {
            let rows = if table.rows.is_empty() { 1.0 } else { 2.0 };
            rows * row_height(table)
        }
        Block::Spacer(_) => 0.0,
    }
}

fn layout_table(cursor: &mut Cursor, table: &TableBlock) {
    if table.headers.is_empty() {
        return;
    }

    let height = row_height(table);
    let min_start = if table.rows.is_empty() { height } else { 2.0 * height };
    cursor.ensure(min_start);
    draw_row(cursor, table, &table.headers, true);

    for row in &table.rows {
        if height > cursor.remaining() {
            cursor.new_page();
            draw_row(cursor, table, &table.headers, true);
        }
        draw_row(cursor, table, row, false);
    }
}

fn draw_row(cursor: &mut Cursor, table: &TableBlock, cells: &[String], header: bool) {
    let layout = cursor.layout;
    let columns = table.headers.len();
    let column_width = layout.content_width() / columns as f32;
    let height = row_height(table);
    let bottom = cursor.y - height;
    let baseline = bottom + CELL_PADDING + table.font_size * 0.2;
    let text_room = column_width - 2.0 * CELL_PADDING;

    if header {
        cursor.push(DrawOp::FillRect {
            x: layout.margin,
            y: bottom,
            width: layout.content_width(),
            height,
            gray: HEADER_FILL_GRAY,
        });
    }

    for column in 0..columns {
        let x = layout.margin + column as f32 * column_width;
        cursor.push(DrawOp::StrokeRect {
            x,
            y: bottom,
            width: column_width,
            height,
            gray: GRID_GRAY,
            line_width: GRID_LINE_WIDTH,
        });

        let value = cells.get(column).map(String::as_str).unwrap_or("");
        let text = fit_text(value, table.font_size, header, text_room);
        if !text.is_empty() {
            cursor.push(DrawOp::Text {
                x: x + CELL_PADDING,
                y: baseline,
                size: table.font_size,
                bold: header,
                gray: 0.0,
                text,
            });
        }
    }

    cursor.y = bottom;
}
