//! Output generation: burn redactions into a new PDF
//!
//! Each redacted page gets a single rewritten content stream:
//! `q <original content> Q` followed by one opaque black rectangle per
//! redaction. For text redactions the covered glyphs are removed from the
//! content first, so the text cannot be recovered by selecting or extracting
//! it from the output.

mod fonts;
mod strip;

use std::collections::BTreeMap;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

use crate::coords::{canonical_to_output, OutputRect};
use crate::error::{GenerationError, PdfError};
use crate::page::inspect_document;
use crate::redaction::{Redaction, RedactionKind};

use fonts::FontTable;
use strip::TextStripper;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Also remove the text underneath area redactions
    pub strip_area_text: bool,
}

/// A generated PDF and what was done to produce it
#[derive(Debug, Clone)]
pub struct RedactedPdf {
    pub bytes: Vec<u8>,
    pub pages_modified: usize,
    pub rects_painted: usize,
    pub glyphs_removed: usize,
}

/// Apply every redaction to a copy of `pdf_bytes`.
///
/// Redactions may arrive in any order; they are grouped by page. On error no
/// output is produced.
pub fn generate_redacted(
    pdf_bytes: &[u8],
    redactions: &[Redaction],
    options: &GeneratorOptions,
) -> Result<RedactedPdf, GenerationError> {
    if !pdf_bytes.starts_with(b"%PDF-") {
        return Err(PdfError::NotPdf.into());
    }
    let mut doc =
        Document::load_mem(pdf_bytes).map_err(|e| PdfError::ParseError(e.to_string()))?;
    let info = inspect_document(&doc)?;
    let page_ids = doc.get_pages();

    let mut by_page: BTreeMap<u32, Vec<&Redaction>> = BTreeMap::new();
    for redaction in redactions {
        if redaction.page == 0 || redaction.page > info.page_count {
            return Err(GenerationError::PageOutOfRange {
                page: redaction.page,
                page_count: info.page_count,
            });
        }
        by_page.entry(redaction.page).or_default().push(redaction);
    }

    let mut glyphs_removed = 0;
    let mut rects_painted = 0;
    for (page, page_redactions) in &by_page {
        let (Some(&page_id), Some(geometry)) = (page_ids.get(page), info.page(*page)) else {
            return Err(GenerationError::PageOutOfRange {
                page: *page,
                page_count: info.page_count,
            });
        };

        let painted: Vec<OutputRect> = page_redactions
            .iter()
            .map(|r| canonical_to_output(r.rect, geometry.crop_box))
            .collect();
        let strip_regions: Vec<OutputRect> = page_redactions
            .iter()
            .zip(&painted)
            .filter(|(r, _)| r.kind == RedactionKind::Text || options.strip_area_text)
            .map(|(_, rect)| *rect)
            .collect();

        let removed = redact_page(&mut doc, *page, page_id, &painted, &strip_regions)?;
        debug!(
            page = *page,
            rects = painted.len(),
            glyphs_removed = removed,
            "Redacted page"
        );
        glyphs_removed += removed;
        rects_painted += painted.len();
    }

    // Drop the replaced content streams so the original text is not carried over
    doc.prune_objects();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| GenerationError::Write(e.to_string()))?;

    Ok(RedactedPdf {
        bytes,
        pages_modified: by_page.len(),
        rects_painted,
        glyphs_removed,
    })
}

fn redact_page(
    doc: &mut Document,
    page: u32,
    page_id: ObjectId,
    painted: &[OutputRect],
    strip_regions: &[OutputRect],
) -> Result<usize, GenerationError> {
    let content_error = |message: String| GenerationError::Content { page, message };

    let raw = doc
        .get_page_content(page_id)
        .map_err(|e| content_error(e.to_string()))?;
    let original = Content::decode(&raw).map_err(|e| content_error(e.to_string()))?;

    let fonts = FontTable::for_page(doc, page_id);
    let rewritten = TextStripper::new(&fonts, strip_regions).rewrite(original.operations);

    let mut operations = Vec::with_capacity(rewritten.operations.len() + 4 + painted.len() * 2);
    operations.push(Operation::new("q", vec![]));
    operations.extend(rewritten.operations);
    operations.push(Operation::new("Q", vec![]));
    operations.extend(paint_operations(painted));

    let encoded = Content { operations }
        .encode()
        .map_err(|e| content_error(e.to_string()))?;
    let stream_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

    let page_dict = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| content_error(e.to_string()))?;
    page_dict.set("Contents", Object::Reference(stream_id));

    Ok(rewritten.glyphs_removed)
}

/// Opaque black fill for every rectangle, in default user space
fn paint_operations(rects: &[OutputRect]) -> Vec<Operation> {
    let mut ops = vec![
        Operation::new("q", vec![]),
        Operation::new("rg", vec![0.into(), 0.into(), 0.into()]),
    ];
    for rect in rects {
        ops.push(Operation::new(
            "re",
            vec![
                Object::Real(rect.x as f32),
                Object::Real(rect.y as f32),
                Object::Real(rect.width as f32),
                Object::Real(rect.height as f32),
            ],
        ));
        ops.push(Operation::new("f", vec![]));
    }
    ops.push(Operation::new("Q", vec![]));
    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::CanonicalRect;
    use crate::sample::{simple_pdf, TextRun};
    use chrono::Utc;

    fn redaction(id: i64, kind: RedactionKind, page: u32, rect: CanonicalRect) -> Redaction {
        Redaction {
            id,
            document_id: 1,
            kind,
            page,
            rect,
            created_at: Utc::now(),
        }
    }

    fn page_operations(pdf: &[u8], page: u32) -> Vec<Operation> {
        let doc = Document::load_mem(pdf).unwrap();
        let page_id = doc.get_pages()[&page];
        let content = doc.get_page_content(page_id).unwrap();
        Content::decode(&content).unwrap().operations
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    fn fixture() -> Vec<u8> {
        simple_pdf(&[
            vec![
                TextRun::new(110.0, 580.0, 12.0, "SECRET and PUBLIC"),
                TextRun::new(72.0, 100.0, 12.0, "Footer line"),
            ],
            vec![TextRun::new(72.0, 700.0, 12.0, "Second page")],
        ])
        .unwrap()
    }

    fn with_page_entries(pdf: &[u8], page: u32, entries: Vec<(&str, Object)>) -> Vec<u8> {
        let mut doc = Document::load_mem(pdf).unwrap();
        let page_id = doc.get_pages()[&page];
        let dict = doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .unwrap();
        for (key, value) in entries {
            dict.set(key, value);
        }
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    fn painted_rect(pdf: &[u8], page: u32) -> Vec<f32> {
        let ops = page_operations(pdf, page);
        let re = ops.iter().find(|op| op.operator == "re").unwrap();
        re.operands.iter().map(|o| o.as_float().unwrap()).collect()
    }

    fn number_box(values: [i64; 4]) -> Object {
        Object::Array(values.iter().map(|v| Object::Integer(*v)).collect())
    }

    #[test]
    fn test_no_redactions_keeps_pages() {
        let pdf = fixture();
        let out = generate_redacted(&pdf, &[], &GeneratorOptions::default()).unwrap();
        assert_eq!(out.pages_modified, 0);
        let doc = Document::load_mem(&out.bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }

    #[test]
    fn test_area_redaction_paints_exact_region() {
        let pdf = fixture();
        let redactions = [redaction(
            1,
            RedactionKind::Area,
            1,
            CanonicalRect::new(100.0, 200.0, 150.0, 20.0),
        )];
        let out = generate_redacted(&pdf, &redactions, &GeneratorOptions::default()).unwrap();
        assert_eq!(out.pages_modified, 1);
        assert_eq!(out.rects_painted, 1);
        assert_eq!(out.glyphs_removed, 0);

        let ops = page_operations(&out.bytes, 1);
        let re_index = ops.iter().position(|op| op.operator == "re").unwrap();
        let values: Vec<f32> = ops[re_index]
            .operands
            .iter()
            .map(|o| o.as_float().unwrap())
            .collect();
        assert_eq!(values, vec![100.0, 572.0, 150.0, 20.0]);
        assert_eq!(ops[re_index + 1].operator, "f");

        // Fill colour is opaque black and the original content is isolated
        let rg = ops[..re_index].iter().rev().find(|op| op.operator == "rg").unwrap();
        assert!(rg.operands.iter().all(|o| o.as_float().unwrap() == 0.0));
        assert_eq!(ops.first().unwrap().operator, "q");
    }

    #[test]
    fn test_text_redaction_removes_covered_text() {
        let pdf = fixture();
        // Covers "SECRET " on the first line: x 100..160, PDF y 572..592
        let redactions = [redaction(
            1,
            RedactionKind::Text,
            1,
            CanonicalRect::new(100.0, 200.0, 60.0, 20.0),
        )];
        let out = generate_redacted(&pdf, &redactions, &GeneratorOptions::default()).unwrap();
        assert_eq!(out.glyphs_removed, 7);
        assert!(!contains(&out.bytes, b"SECRET"));
        assert!(contains(&out.bytes, b"and PUBLIC"));
        assert!(contains(&out.bytes, b"Footer line"));

        // The removed glyphs are replaced by their Helvetica advance: 4056 + 278
        let ops = page_operations(&out.bytes, 1);
        let tj = ops.iter().find(|op| op.operator == "TJ").unwrap();
        let items = tj.operands[0].as_array().unwrap();
        assert_eq!(items[0].as_float().unwrap(), -4334.0);
        assert_eq!(items[1].as_str().unwrap(), b"and PUBLIC");
    }

    #[test]
    fn test_area_text_is_kept_unless_configured() {
        let pdf = fixture();
        let redactions = [redaction(
            1,
            RedactionKind::Area,
            1,
            CanonicalRect::new(100.0, 200.0, 60.0, 20.0),
        )];
        let kept = generate_redacted(&pdf, &redactions, &GeneratorOptions::default()).unwrap();
        assert!(contains(&kept.bytes, b"SECRET"));

        let options = GeneratorOptions {
            strip_area_text: true,
        };
        let stripped = generate_redacted(&pdf, &redactions, &options).unwrap();
        assert!(!contains(&stripped.bytes, b"SECRET"));
    }

    #[test]
    fn test_only_targeted_pages_change() {
        let pdf = fixture();
        let redactions = [
            redaction(1, RedactionKind::Area, 2, CanonicalRect::new(10.0, 10.0, 5.0, 5.0)),
            redaction(2, RedactionKind::Area, 2, CanonicalRect::new(20.0, 20.0, 5.0, 5.0)),
        ];
        let out = generate_redacted(&pdf, &redactions, &GeneratorOptions::default()).unwrap();
        assert_eq!(out.pages_modified, 1);
        assert_eq!(out.rects_painted, 2);

        let first = page_operations(&out.bytes, 1);
        assert!(first.iter().all(|op| op.operator != "re"));
        let second = page_operations(&out.bytes, 2);
        assert_eq!(second.iter().filter(|op| op.operator == "re").count(), 2);
    }

    #[test]
    fn test_page_out_of_range_fails() {
        let pdf = fixture();
        let redactions = [redaction(
            1,
            RedactionKind::Area,
            3,
            CanonicalRect::new(10.0, 10.0, 5.0, 5.0),
        )];
        let err = generate_redacted(&pdf, &redactions, &GeneratorOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            GenerationError::PageOutOfRange {
                page: 3,
                page_count: 2
            }
        ));
    }

    #[test]
    fn test_unreadable_source_fails() {
        let err = generate_redacted(b"not a pdf", &[], &GeneratorOptions::default()).unwrap_err();
        assert!(matches!(err, GenerationError::Pdf(PdfError::NotPdf)));
    }

    #[test]
    fn test_source_bytes_are_untouched() {
        let pdf = fixture();
        let before = pdf.clone();
        let redactions = [redaction(
            1,
            RedactionKind::Text,
            1,
            CanonicalRect::new(0.0, 0.0, 612.0, 792.0),
        )];
        generate_redacted(&pdf, &redactions, &GeneratorOptions::default()).unwrap();
        assert_eq!(pdf, before);
    }

    #[test]
    fn test_offset_media_box_and_rotation() {
        // Rotation is a display property: canonical space stays unrotated
        let pdf = with_page_entries(
            &fixture(),
            1,
            vec![
                ("MediaBox", number_box([10, 20, 622, 812])),
                ("Rotate", Object::Integer(90)),
            ],
        );
        let redactions = [redaction(
            1,
            RedactionKind::Area,
            1,
            CanonicalRect::new(0.0, 0.0, 50.0, 50.0),
        )];
        let out = generate_redacted(&pdf, &redactions, &GeneratorOptions::default()).unwrap();
        assert_eq!(painted_rect(&out.bytes, 1), vec![10.0, 762.0, 50.0, 50.0]);
    }

    #[test]
    fn test_crop_box_sets_canonical_origin() {
        let pdf = with_page_entries(&fixture(), 1, vec![("CropBox", number_box([50, 500, 400, 700]))]);
        // Visible page is 350 x 200; this covers "SECRET " at user space 100..160, 572..592
        let redactions = [redaction(
            1,
            RedactionKind::Text,
            1,
            CanonicalRect::new(50.0, 108.0, 60.0, 20.0),
        )];
        let out = generate_redacted(&pdf, &redactions, &GeneratorOptions::default()).unwrap();
        assert_eq!(painted_rect(&out.bytes, 1), vec![100.0, 572.0, 60.0, 20.0]);
        assert_eq!(out.glyphs_removed, 7);
        assert!(!contains(&out.bytes, b"SECRET"));
    }
}
