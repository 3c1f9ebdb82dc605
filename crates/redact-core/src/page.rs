//! Page-level geometry extraction
//!
//! Reads the MediaBox, CropBox and rotation of every page so that redactions
//! can be validated against, and burned into, the right page bounds.
//!
//! The page box is the CropBox clipped to the MediaBox, the region a viewer
//! actually displays. Canonical coordinates are relative to its top-left corner.

use lopdf::{Dictionary, Document, Object, ObjectId};
use serde::Serialize;

use crate::coords::{PageSize, Rotation};
use crate::error::PdfError;

const LETTER_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// Geometry of a single PDF page
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageGeometry {
    /// Page number (1-indexed)
    pub page: u32,
    /// MediaBox `[x0, y0, x1, y1]` in points, normalized so x0 <= x1 and y0 <= y1
    pub media_box: [f64; 4],
    /// Visible region: CropBox intersected with the MediaBox
    pub crop_box: [f64; 4],
    pub rotation: Rotation,
}

impl PageGeometry {
    pub fn new(page: u32, media_box: [f64; 4], rotation: Rotation) -> Self {
        Self {
            page,
            media_box,
            crop_box: media_box,
            rotation,
        }
    }

    /// Unrotated size of the visible page in points
    pub fn size(&self) -> PageSize {
        PageSize::new(
            self.crop_box[2] - self.crop_box[0],
            self.crop_box[3] - self.crop_box[1],
        )
    }

    pub(crate) fn from_page(doc: &Document, page: u32, page_id: ObjectId) -> Result<Self, PdfError> {
        let page_dict = doc
            .get_dictionary(page_id)
            .map_err(|e| PdfError::MalformedPage {
                page,
                message: e.to_string(),
            })?;

        let malformed = |message| PdfError::MalformedPage { page, message };
        let media_box = match inherited(doc, page_dict, b"MediaBox") {
            Some(obj) => parse_box(doc, obj, "MediaBox").map_err(malformed)?,
            None => LETTER_MEDIA_BOX,
        };
        // An unusable CropBox falls back to the MediaBox
        let crop_box = inherited(doc, page_dict, b"CropBox")
            .and_then(|obj| parse_box(doc, obj, "CropBox").ok())
            .and_then(|crop| intersect(crop, media_box))
            .unwrap_or(media_box);

        let rotation = inherited(doc, page_dict, b"Rotate")
            .and_then(|obj| resolve(doc, obj).as_i64().ok())
            .map(Rotation::from_degrees)
            .unwrap_or_default();

        Ok(Self {
            page,
            media_box,
            crop_box,
            rotation,
        })
    }
}

/// Summary of a PDF file used when importing and serving documents
#[derive(Debug, Clone, Serialize)]
pub struct DocumentInfo {
    pub page_count: u32,
    pub pages: Vec<PageGeometry>,
}

impl DocumentInfo {
    pub fn page(&self, page: u32) -> Option<&PageGeometry> {
        page.checked_sub(1)
            .and_then(|index| self.pages.get(index as usize))
    }
}

/// Validate PDF bytes and read the geometry of every page
pub fn inspect_pdf(bytes: &[u8]) -> Result<DocumentInfo, PdfError> {
    if !bytes.starts_with(b"%PDF-") {
        return Err(PdfError::NotPdf);
    }
    let doc = Document::load_mem(bytes).map_err(|e| PdfError::ParseError(e.to_string()))?;
    inspect_document(&doc)
}

pub(crate) fn inspect_document(doc: &Document) -> Result<DocumentInfo, PdfError> {
    if doc.is_encrypted() {
        return Err(PdfError::Encrypted);
    }

    let pages = doc
        .get_pages()
        .into_iter()
        .map(|(page, page_id)| PageGeometry::from_page(doc, page, page_id))
        .collect::<Result<Vec<_>, _>>()?;

    if pages.is_empty() {
        return Err(PdfError::NoPages);
    }

    Ok(DocumentInfo {
        page_count: pages.len() as u32,
        pages,
    })
}

/// Follow a reference to the object it points at, if any
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Look up a page attribute, walking up the page tree for inheritable keys
pub(crate) fn inherited<'a>(
    doc: &'a Document,
    page_dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = page_dict;
    // Bounded walk: malformed files can contain Parent cycles
    for _ in 0..32 {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        let parent_id = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_dictionary(parent_id).ok()?;
    }
    None
}

pub(crate) fn as_number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(n) => Some(*n as f64),
        Object::Real(n) => Some(f64::from(*n)),
        _ => None,
    }
}

/// Parse a box array [x1, y1, x2, y2]
fn parse_box(doc: &Document, obj: &Object, name: &str) -> Result<[f64; 4], String> {
    let array = resolve(doc, obj)
        .as_array()
        .map_err(|_| format!("{} is not an array", name))?;
    if array.len() != 4 {
        return Err(format!("{} must have 4 elements", name));
    }

    let mut values = [0.0; 4];
    for (i, item) in array.iter().enumerate() {
        values[i] = as_number(resolve(doc, item))
            .ok_or_else(|| format!("{} element {} is not a number", name, i))?;
    }

    let [x0, y0, x1, y1] = values;
    let normalized = [x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)];
    if normalized[2] - normalized[0] <= 0.0 || normalized[3] - normalized[1] <= 0.0 {
        return Err(format!("{} has no area", name));
    }
    Ok(normalized)
}

fn intersect(a: [f64; 4], b: [f64; 4]) -> Option<[f64; 4]> {
    let clipped = [a[0].max(b[0]), a[1].max(b[1]), a[2].min(b[2]), a[3].min(b[3])];
    (clipped[2] > clipped[0] && clipped[3] > clipped[1]).then_some(clipped)
}
