//! Client-side viewer state
//!
//! `ViewerState` owns everything the page viewer needs between events: the
//! interaction mode, an in-progress area drag, how each page is rendered and
//! the authoritative redaction list last received from the server. Screen
//! input is converted to canonical space here, so overlays stay put when the
//! page is re-rendered at another zoom level.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::coords::{
    canonical_to_screen, screen_to_canonical, CanonicalRect, PageViewport, Rotation, ScreenPoint,
    ScreenRect,
};
use crate::page::{DocumentInfo, PageGeometry};
use crate::protocol::{create_path, Coordinates, CreateRedactionRequest, ErrorBody};
use crate::redaction::{Redaction, RedactionKind};

/// Drags smaller than this in either direction are treated as clicks
pub const MIN_DRAG_PX: f64 = 2.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionMode {
    /// Redactions come from the text layer's selection
    #[default]
    TextSelect,
    /// Redactions are drawn as rectangles
    AreaDraw,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Drag {
    page: u32,
    origin: ScreenPoint,
    current: ScreenPoint,
}

/// A create request ready to be sent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingSubmission {
    pub path: String,
    pub request: CreateRedactionRequest,
}

/// Overlay keys touched by replacing the redaction list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OverlayDiff {
    pub added: Vec<i64>,
    pub removed: Vec<i64>,
    pub retained: Vec<i64>,
}

impl OverlayDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// A redaction placed on the rendered page
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Overlay {
    pub redaction_id: i64,
    pub kind: RedactionKind,
    pub rect: ScreenRect,
}

#[derive(Debug, Clone)]
pub struct ViewerState {
    document_id: i64,
    pages: Vec<PageGeometry>,
    scale: f64,
    /// Extra rotation applied by the viewer on top of each page's `/Rotate`
    view_rotation: Rotation,
    mode: InteractionMode,
    drag: Option<Drag>,
    redactions: Vec<Redaction>,
    error: Option<ErrorBody>,
}

impl ViewerState {
    pub fn new(document_id: i64, document: &DocumentInfo) -> Self {
        Self {
            document_id,
            pages: document.pages.clone(),
            scale: 1.0,
            view_rotation: Rotation::Deg0,
            mode: InteractionMode::default(),
            drag: None,
            redactions: Vec::new(),
            error: None,
        }
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn redactions(&self) -> &[Redaction] {
        &self.redactions
    }

    /// Reason of the last rejected submission, cleared by the next list
    pub fn error(&self) -> Option<&ErrorBody> {
        self.error.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Switching mode abandons any drag in progress
    pub fn set_mode(&mut self, mode: InteractionMode) {
        if mode != self.mode {
            self.drag = None;
            self.mode = mode;
        }
    }

    /// Re-render at another zoom. Non-positive or non-finite scales are ignored.
    pub fn set_scale(&mut self, scale: f64) {
        if scale.is_finite() && scale > 0.0 {
            self.scale = scale;
            self.drag = None;
        }
    }

    pub fn set_rotation(&mut self, rotation: Rotation) {
        self.view_rotation = rotation;
        self.drag = None;
    }

    pub fn viewport(&self, page: u32) -> Option<PageViewport> {
        let geometry = self.geometry(page)?;
        Some(PageViewport::new(
            geometry.size(),
            self.scale,
            geometry.rotation.then(self.view_rotation),
        ))
    }

    fn geometry(&self, page: u32) -> Option<&PageGeometry> {
        let index = usize::try_from(page).ok()?.checked_sub(1)?;
        self.pages.get(index)
    }

    /// Start an area drag. Returns false when the event is ignored.
    pub fn pointer_down(&mut self, page: u32, point: ScreenPoint) -> bool {
        if self.mode != InteractionMode::AreaDraw {
            return false;
        }
        let Some(viewport) = self.viewport(page) else {
            return false;
        };
        let point = clamp_point(point, &viewport);
        self.drag = Some(Drag {
            page,
            origin: point,
            current: point,
        });
        true
    }

    /// Live preview of the drag in screen space; nothing is persisted
    pub fn pointer_move(&mut self, point: ScreenPoint) -> Option<ScreenRect> {
        let drag = self.drag?;
        let viewport = self.viewport(drag.page)?;
        let current = clamp_point(point, &viewport);
        self.drag = Some(Drag { current, ..drag });
        Some(ScreenRect::from_corners(drag.origin, current))
    }

    /// Finish the drag, producing an `area` submission unless it was too small
    pub fn pointer_up(&mut self, point: ScreenPoint) -> Option<PendingSubmission> {
        let drag = self.drag.take()?;
        let viewport = self.viewport(drag.page)?;
        let rect = ScreenRect::from_corners(drag.origin, clamp_point(point, &viewport));
        if rect.width < MIN_DRAG_PX || rect.height < MIN_DRAG_PX {
            return None;
        }
        Some(self.submission(RedactionKind::Area, drag.page, rect, &viewport))
    }

    /// Escape pressed or pointer left the page
    pub fn cancel_drag(&mut self) {
        self.drag = None;
    }

    /// Turn a text selection's client rectangles, relative to the page, into
    /// one `text` submission covering all of them
    pub fn select_text(&mut self, page: u32, rects: &[ScreenRect]) -> Option<PendingSubmission> {
        if self.mode != InteractionMode::TextSelect {
            return None;
        }
        let viewport = self.viewport(page)?;
        let (page_w, page_h) = viewport.pixel_size();
        let covered = rects
            .iter()
            .filter_map(|r| clip(r, page_w, page_h))
            .reduce(|acc, r| acc.union(&r))?;
        Some(self.submission(RedactionKind::Text, page, covered, &viewport))
    }

    fn submission(
        &self,
        kind: RedactionKind,
        page: u32,
        rect: ScreenRect,
        viewport: &PageViewport,
    ) -> PendingSubmission {
        let rect = clamp_to_page(screen_to_canonical(rect, viewport), viewport);
        PendingSubmission {
            path: create_path(self.document_id),
            request: CreateRedactionRequest {
                kind,
                coordinates: Coordinates {
                    x: rect.x,
                    y: rect.y,
                    width: rect.width,
                    height: rect.height,
                    page: i64::from(page),
                },
            },
        }
    }

    /// Replace the list with the server's authoritative one.
    ///
    /// Entries for other documents are dropped.
    pub fn apply_list(&mut self, redactions: Vec<Redaction>) -> OverlayDiff {
        let before: BTreeSet<i64> = self.redactions.iter().map(|r| r.id).collect();
        let document_id = self.document_id;
        self.redactions = redactions
            .into_iter()
            .filter(|r| r.document_id == document_id)
            .collect();
        self.error = None;

        let mut diff = OverlayDiff::default();
        let mut after = BTreeSet::new();
        for redaction in &self.redactions {
            after.insert(redaction.id);
            if before.contains(&redaction.id) {
                diff.retained.push(redaction.id);
            } else {
                diff.added.push(redaction.id);
            }
        }
        diff.removed = before.difference(&after).copied().collect();
        diff
    }

    /// Record a rejected submission; the list is left as it was
    pub fn apply_failure(&mut self, error: ErrorBody) {
        self.error = Some(error);
    }

    /// Screen rectangles of every redaction on `page` at the current scale
    pub fn overlays(&self, page: u32) -> Vec<Overlay> {
        let Some(viewport) = self.viewport(page) else {
            return Vec::new();
        };
        self.redactions
            .iter()
            .filter(|r| r.page == page)
            .map(|r| Overlay {
                redaction_id: r.id,
                kind: r.kind,
                rect: canonical_to_screen(r.rect, &viewport),
            })
            .collect()
    }
}

fn clamp_point(point: ScreenPoint, viewport: &PageViewport) -> ScreenPoint {
    let (w, h) = viewport.pixel_size();
    ScreenPoint::new(point.x.clamp(0.0, w), point.y.clamp(0.0, h))
}

/// Intersection with the rendered page, `None` when nothing is left
fn clip(rect: &ScreenRect, page_w: f64, page_h: f64) -> Option<ScreenRect> {
    let x = rect.x.max(0.0);
    let y = rect.y.max(0.0);
    let right = (rect.x + rect.width).min(page_w);
    let bottom = (rect.y + rect.height).min(page_h);
    (right > x && bottom > y).then(|| ScreenRect::new(x, y, right - x, bottom - y))
}

/// Absorb float drift from the scale division so the rectangle validates
fn clamp_to_page(rect: CanonicalRect, viewport: &PageViewport) -> CanonicalRect {
    let x = rect.x.max(0.0);
    let y = rect.y.max(0.0);
    let right = rect.right().min(viewport.size.width);
    let bottom = rect.bottom().min(viewport.size.height);
    CanonicalRect::new(x, y, right - x, bottom - y)
}
