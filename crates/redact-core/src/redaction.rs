//! Redaction model and creation-time validation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::coords::{CanonicalRect, PageSize};
use crate::error::ValidationError;
use crate::page::DocumentInfo;
use crate::protocol::Coordinates;

/// How a redaction was created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedactionKind {
    /// Drawn from the text layer's selection
    Text,
    /// Drawn freehand as a rectangle
    Area,
}

impl RedactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RedactionKind::Text => "text",
            RedactionKind::Area => "area",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(RedactionKind::Text),
            "area" => Some(RedactionKind::Area),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RedactionKind::Text => "Text Selection",
            RedactionKind::Area => "Area Drawing",
        }
    }
}

impl std::fmt::Display for RedactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted redaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "RedactionWire", try_from = "RedactionWire")]
pub struct Redaction {
    pub id: i64,
    pub document_id: i64,
    pub kind: RedactionKind,
    /// 1-indexed
    pub page: u32,
    pub rect: CanonicalRect,
    pub created_at: DateTime<Utc>,
}

impl Redaction {
    /// Human-readable summary, e.g. `Page 1: (100, 200) - 150x20`
    pub fn coordinates_display(&self) -> String {
        format!(
            "Page {}: ({}, {}) - {}x{}",
            self.page, self.rect.x, self.rect.y, self.rect.width, self.rect.height
        )
    }
}

/// JSON shape of a redaction, matching the submission body's `coordinates`
#[derive(Serialize, Deserialize)]
struct RedactionWire {
    id: i64,
    document_id: i64,
    #[serde(rename = "type")]
    kind: RedactionKind,
    coordinates: Coordinates,
    created_at: DateTime<Utc>,
}

impl From<Redaction> for RedactionWire {
    fn from(r: Redaction) -> Self {
        Self {
            id: r.id,
            document_id: r.document_id,
            kind: r.kind,
            coordinates: Coordinates {
                x: r.rect.x,
                y: r.rect.y,
                width: r.rect.width,
                height: r.rect.height,
                page: i64::from(r.page),
            },
            created_at: r.created_at,
        }
    }
}

impl TryFrom<RedactionWire> for Redaction {
    type Error = String;

    fn try_from(w: RedactionWire) -> Result<Self, Self::Error> {
        let page = u32::try_from(w.coordinates.page)
            .ok()
            .filter(|page| *page >= 1)
            .ok_or_else(|| format!("invalid page number {}", w.coordinates.page))?;
        Ok(Self {
            id: w.id,
            document_id: w.document_id,
            kind: w.kind,
            page,
            rect: CanonicalRect::new(
                w.coordinates.x,
                w.coordinates.y,
                w.coordinates.width,
                w.coordinates.height,
            ),
            created_at: w.created_at,
        })
    }
}

/// A redaction that passed validation and is ready to be stored
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewRedaction {
    pub kind: RedactionKind,
    pub page: u32,
    pub rect: CanonicalRect,
}

impl NewRedaction {
    /// Check the request against the document's pages.
    ///
    /// Checks run in order: page range, positive size, then page bounds.
    pub fn validate(
        kind: RedactionKind,
        coordinates: &Coordinates,
        document: &DocumentInfo,
    ) -> Result<Self, ValidationError> {
        let geometry = u32::try_from(coordinates.page)
            .ok()
            .and_then(|page| document.page(page))
            .ok_or(ValidationError::InvalidPage {
                page: coordinates.page,
                page_count: document.page_count,
            })?;

        let rect = CanonicalRect::new(
            coordinates.x,
            coordinates.y,
            coordinates.width,
            coordinates.height,
        );
        check_rect(rect, geometry.size())?;

        Ok(Self {
            kind,
            page: geometry.page,
            rect,
        })
    }
}

/// Validate a rectangle against a page size without clamping
pub fn check_rect(rect: CanonicalRect, page: PageSize) -> Result<(), ValidationError> {
    // `!(a > 0)` also rejects NaN
    if !(rect.width > 0.0 && rect.height > 0.0) || !rect.width.is_finite() || !rect.height.is_finite()
    {
        return Err(ValidationError::InvalidDimensions {
            width: rect.width,
            height: rect.height,
        });
    }

    let inside = rect.x >= 0.0
        && rect.y >= 0.0
        && rect.right() <= page.width
        && rect.bottom() <= page.height;
    if !inside {
        return Err(ValidationError::OutOfBounds {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            page_width: page.width,
            page_height: page.height,
        });
    }

    Ok(())
}
