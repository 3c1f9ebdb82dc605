//! Glyph widths for the fonts a page's content stream refers to
//!
//! Only what is needed to locate glyphs is read: how many bytes a character
//! code takes and how far each glyph advances.

use std::collections::HashMap;
use std::ops::RangeInclusive;

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::page::{as_number, inherited, resolve};

/// Width used when a simple font carries no `/Widths` (e.g. standard 14 fonts)
const FALLBACK_SIMPLE_WIDTH: f64 = 500.0;
/// Default `/DW` of CID fonts
const FALLBACK_CID_WIDTH: f64 = 1000.0;

/// Widths in thousandths of text space units
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FontMetrics {
    /// Type0 fonts use two-byte codes (Identity-H and friends)
    pub two_byte: bool,
    first_char: i64,
    widths: Vec<f64>,
    default_width: f64,
    /// `/W` entries as CID ranges; later entries win
    cid_widths: Vec<(RangeInclusive<u32>, f64)>,
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self {
            two_byte: false,
            first_char: 0,
            widths: Vec::new(),
            default_width: FALLBACK_SIMPLE_WIDTH,
            cid_widths: Vec::new(),
        }
    }
}

impl FontMetrics {
    pub fn width(&self, code: u32) -> f64 {
        if self.two_byte {
            return self
                .cid_widths
                .iter()
                .rev()
                .find(|(cids, _)| cids.contains(&code))
                .map(|(_, w)| *w)
                .unwrap_or(self.default_width);
        }
        let index = i64::from(code) - self.first_char;
        usize::try_from(index)
            .ok()
            .and_then(|i| self.widths.get(i))
            .copied()
            .unwrap_or(self.default_width)
    }

    /// Split a shown string into `(code, byte range)` glyphs
    pub fn glyphs(&self, bytes: &[u8]) -> Vec<(u32, std::ops::Range<usize>)> {
        let step = if self.two_byte { 2 } else { 1 };
        (0..bytes.len())
            .step_by(step)
            .map(|start| {
                let end = (start + step).min(bytes.len());
                let code = bytes[start..end]
                    .iter()
                    .fold(0u32, |acc, b| (acc << 8) | u32::from(*b));
                (code, start..end)
            })
            .collect()
    }

    fn from_dict(doc: &Document, font: &Dictionary) -> Self {
        let subtype = font.get(b"Subtype").ok().and_then(|o| o.as_name().ok());
        if subtype == Some(b"Type0".as_slice()) {
            return Self::from_type0(doc, font);
        }

        let first_char = font
            .get(b"FirstChar")
            .ok()
            .and_then(|o| resolve(doc, o).as_i64().ok())
            .unwrap_or(0);
        let widths = font
            .get(b"Widths")
            .ok()
            .and_then(|o| resolve(doc, o).as_array().ok())
            .map(|arr| {
                arr.iter()
                    .map(|w| as_number(resolve(doc, w)).unwrap_or(0.0))
                    .collect()
            })
            .unwrap_or_default();
        let missing_width = font
            .get(b"FontDescriptor")
            .ok()
            .and_then(|o| resolve(doc, o).as_dict().ok())
            .and_then(|d| d.get(b"MissingWidth").ok())
            .and_then(|o| as_number(resolve(doc, o)));

        Self {
            two_byte: false,
            first_char,
            widths,
            default_width: missing_width.unwrap_or(FALLBACK_SIMPLE_WIDTH),
            cid_widths: Vec::new(),
        }
    }

    fn from_type0(doc: &Document, font: &Dictionary) -> Self {
        let descendant = font
            .get(b"DescendantFonts")
            .ok()
            .and_then(|o| resolve(doc, o).as_array().ok())
            .and_then(|arr| arr.first())
            .and_then(|o| resolve(doc, o).as_dict().ok());

        let mut metrics = Self {
            two_byte: true,
            default_width: FALLBACK_CID_WIDTH,
            ..Self::default()
        };
        let Some(cid_font) = descendant else {
            return metrics;
        };

        if let Some(dw) = cid_font
            .get(b"DW")
            .ok()
            .and_then(|o| as_number(resolve(doc, o)))
        {
            metrics.default_width = dw;
        }
        if let Some(w) = cid_font
            .get(b"W")
            .ok()
            .and_then(|o| resolve(doc, o).as_array().ok())
        {
            metrics.cid_widths = parse_cid_widths(doc, w);
        }
        metrics
    }
}

/// Parse a CIDFont `/W` array: `c [w1 w2 ...]` and `c_first c_last w` entries
fn parse_cid_widths(doc: &Document, entries: &[Object]) -> Vec<(RangeInclusive<u32>, f64)> {
    let mut widths = Vec::new();
    let mut i = 0;
    while i + 1 < entries.len() {
        let Some(first) = as_number(resolve(doc, &entries[i])) else {
            break;
        };
        let first = first as u32;
        match resolve(doc, &entries[i + 1]) {
            Object::Array(run) => {
                for (offset, w) in run.iter().enumerate() {
                    let cid = u32::try_from(offset)
                        .ok()
                        .and_then(|offset| first.checked_add(offset));
                    if let (Some(cid), Some(w)) = (cid, as_number(resolve(doc, w))) {
                        widths.push((cid..=cid, w));
                    }
                }
                i += 2;
            }
            last => {
                let (Some(last), Some(w)) = (
                    as_number(last),
                    entries.get(i + 2).and_then(|o| as_number(resolve(doc, o))),
                ) else {
                    break;
                };
                let last = last as u32;
                if first <= last {
                    widths.push((first..=last, w));
                }
                i += 3;
            }
        }
    }
    widths
}

/// Fonts available to one page, keyed by resource name
#[derive(Debug, Default)]
pub(crate) struct FontTable {
    fonts: HashMap<Vec<u8>, FontMetrics>,
    fallback: FontMetrics,
}

impl FontTable {
    pub fn for_page(doc: &Document, page_id: ObjectId) -> Self {
        let mut table = Self::default();

        let font_dict = doc
            .get_dictionary(page_id)
            .ok()
            .and_then(|page| inherited(doc, page, b"Resources"))
            .and_then(|o| resolve(doc, o).as_dict().ok())
            .and_then(|resources| resources.get(b"Font").ok())
            .and_then(|o| resolve(doc, o).as_dict().ok());

        if let Some(fonts) = font_dict {
            for (name, obj) in fonts.iter() {
                if let Ok(font) = resolve(doc, obj).as_dict() {
                    table
                        .fonts
                        .insert(name.clone(), FontMetrics::from_dict(doc, font));
                }
            }
        }
        table
    }

    pub fn get(&self, name: Option<&[u8]>) -> &FontMetrics {
        name.and_then(|n| self.fonts.get(n))
            .unwrap_or(&self.fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    #[test]
    fn test_simple_font_widths() {
        let doc = Document::with_version("1.7");
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "FirstChar" => 65,
            "Widths" => vec![Object::Integer(667), Object::Integer(611)],
        };
        let metrics = FontMetrics::from_dict(&doc, &font);
        assert!(!metrics.two_byte);
        assert_eq!(metrics.width(65), 667.0);
        assert_eq!(metrics.width(66), 611.0);
        assert_eq!(metrics.width(67), FALLBACK_SIMPLE_WIDTH);
        assert_eq!(metrics.width(10), FALLBACK_SIMPLE_WIDTH);
    }

    #[test]
    fn test_type0_font_widths() {
        let mut doc = Document::with_version("1.7");
        let cid_font = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "DW" => 900,
            "W" => vec![
                Object::Integer(1),
                Object::Array(vec![Object::Integer(400), Object::Integer(450)]),
                Object::Integer(10),
                Object::Integer(12),
                Object::Integer(300),
            ],
        });
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "DescendantFonts" => vec![Object::Reference(cid_font)],
        };
        let metrics = FontMetrics::from_dict(&doc, &font);
        assert!(metrics.two_byte);
        assert_eq!(metrics.width(1), 400.0);
        assert_eq!(metrics.width(2), 450.0);
        assert_eq!(metrics.width(11), 300.0);
        assert_eq!(metrics.width(5), 900.0);
    }

    #[test]
    fn test_huge_cid_range_is_stored_as_range() {
        let mut doc = Document::with_version("1.7");
        let cid_font = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "W" => vec![
                Object::Integer(0),
                Object::Integer(4_294_967_295),
                Object::Integer(500),
                Object::Integer(4_294_967_290),
                Object::Array(vec![
                    Object::Integer(1),
                    Object::Integer(2),
                    Object::Integer(3),
                    Object::Integer(4),
                    Object::Integer(5),
                    Object::Integer(6),
                    Object::Integer(7),
                ]),
            ],
        });
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "DescendantFonts" => vec![Object::Reference(cid_font)],
        };
        let metrics = FontMetrics::from_dict(&doc, &font);
        // One range plus the six run entries that fit in u32
        assert_eq!(metrics.cid_widths.len(), 7);
        assert_eq!(metrics.width(0), 500.0);
        assert_eq!(metrics.width(3_000_000_000), 500.0);
        assert_eq!(metrics.width(4_294_967_290), 1.0);
        assert_eq!(metrics.width(u32::MAX), 6.0);
    }

    #[test]
    fn test_glyph_splitting() {
        let simple = FontMetrics::default();
        assert_eq!(simple.glyphs(b"AB").len(), 2);

        let cid = FontMetrics {
            two_byte: true,
            ..FontMetrics::default()
        };
        let glyphs = cid.glyphs(&[0x00, 0x41, 0x01, 0x02]);
        assert_eq!(glyphs, vec![(0x41, 0..2), (0x0102, 2..4)]);
    }
}
