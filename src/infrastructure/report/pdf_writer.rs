use encoding_rs::WINDOWS_1252;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream, StringFormat};

use super::layout::{DrawOp, Page, PageLayout};
use crate::domain::error::{AppError, Result};

const REGULAR_FONT: &str = "F1";
const BOLD_FONT: &str = "F2";

fn real(value: f32) -> Object {
    Object::Real(value.into())
}

fn name(value: &str) -> Object {
    Object::Name(value.as_bytes().to_vec())
}

/// Windows-1252 bytes for the standard fonts; unmappable characters become `?`.
fn encode_text(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut buf = [0u8; 4];
    for ch in text.chars() {
        let (bytes, _, had_errors) = WINDOWS_1252.encode(ch.encode_utf8(&mut buf));
        if had_errors {
            out.push(b'?');
        } else {
            out.extend_from_slice(&bytes);
        }
    }
    out
}

fn font(base: &str) -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => name(base),
        "Encoding" => "WinAnsiEncoding",
    }
}

fn page_operations(page: &Page) -> Vec<Operation> {
    let mut operations = Vec::new();

    for op in &page.ops {
        match op {
            DrawOp::Text {
                x,
                y,
                size,
                bold,
                gray,
                text,
            } => {
                let font = if *bold { BOLD_FONT } else { REGULAR_FONT };
                operations.push(Operation::new("BT", vec![]));
                operations.push(Operation::new("g", vec![real(*gray)]));
                operations.push(Operation::new("Tf", vec![name(font), real(*size)]));
                operations.push(Operation::new("Td", vec![real(*x), real(*y)]));
                operations.push(Operation::new(
                    "Tj",
                    vec![Object::String(encode_text(text), StringFormat::Literal)],
                ));
                operations.push(Operation::new("ET", vec![]));
            }
            DrawOp::FillRect {
                x,
                y,
                width,
                height,
                gray,
            } => {
                operations.push(Operation::new("g", vec![real(*gray)]));
                operations.push(Operation::new(
                    "re",
                    vec![real(*x), real(*y), real(*width), real(*height)],
                ));
                operations.push(Operation::new("f", vec![]));
            }
            DrawOp::StrokeRect {
                x,
                y,
                width,
                height,
                gray,
                line_width,
            } => {
                operations.push(Operation::new("G", vec![real(*gray)]));
                operations.push(Operation::new("w", vec![real(*line_width)]));
                operations.push(Operation::new(
                    "re",
                    vec![real(*x), real(*y), real(*width), real(*height)],
                ));
                operations.push(Operation::new("S", vec![]));
            }
        }
    }

    operations
}

/// Serialize laid-out pages into a PDF 1.5 file using the standard Helvetica
/// fonts. Output depends only on the input pages.
pub fn write_pdf(pages: &[Page], layout: PageLayout, title: &str) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(font("Helvetica"));
    let bold_id = doc.add_object(font("Helvetica-Bold"));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            REGULAR_FONT => regular_id,
            BOLD_FONT => bold_id,
        },
    });

    let mut kids = Vec::with_capacity(pages.len());
    for page in pages {
        let content = Content {
            operations: page_operations(page),
        };
        let encoded = content
            .encode()
            .map_err(|e| AppError::Internal(format!("Failed to encode page content: {}", e)))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "Resources" => resources_id,
            "MediaBox" => vec![real(0.0), real(0.0), real(layout.width), real(layout.height)],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::String(encode_text(title), StringFormat::Literal),
        "Producer" => Object::string_literal("equipment-visualizer"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| AppError::IoError(format!("Failed to write PDF: {}", e)))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_page(text: &str) -> Page {
        Page {
            ops: vec![DrawOp::Text {
                x: 72.0,
                y: 700.0,
                size: 10.0,
                bold: false,
                gray: 0.0,
                text: text.to_string(),
            }],
        }
    }

    #[test]
    fn test_encode_text_maps_to_windows_1252() {
        assert_eq!(encode_text("Caf\u{e9}"), b"Caf\xe9".to_vec());
        assert_eq!(encode_text("\u{20ac}5"), vec![0x80, b'5']);
        assert_eq!(encode_text("\u{4e2d}x"), b"?x".to_vec());
    }

    #[test]
    fn test_writes_loadable_pdf() {
        let pages = vec![text_page("first"), text_page("second")];
        let bytes = write_pdf(&pages, PageLayout::default(), "Report").unwrap();

        assert!(bytes.starts_with(b"%PDF-1.5"));
        let loaded = Document::load_mem(&bytes).unwrap();
        assert_eq!(loaded.get_pages().len(), 2);
    }

    #[test]
    fn test_text_is_stored_uncompressed() {
        let bytes = write_pdf(&[text_page("Pump P-101")], PageLayout::default(), "Report").unwrap();
        let haystack = String::from_utf8_lossy(&bytes);

        assert!(haystack.contains("(Pump P-101)"));
        assert!(haystack.contains("Helvetica-Bold"));
    }

    #[test]
    fn test_zero_pages_still_produces_a_file() {
        let bytes = write_pdf(&[], PageLayout::default(), "Report").unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
