//! Redaction core
//!
//! This crate holds everything about a redaction that is independent of the
//! HTTP service that stores it:
//! - `coords`: the canonical, render-scale-independent rectangle space and the
//!   transforms between screen pixels, canonical points and PDF user space
//! - `page`: page geometry (MediaBox, CropBox, rotation) read with lopdf
//! - `redaction`: the Redaction model and its creation-time validation
//! - `protocol`: request/response bodies of the submission protocol
//! - `viewer`: the client-side state owner that reconciles overlays
//! - `redact`: burns redactions into a new PDF and strips covered text
//! - `sample`: builds simple text PDFs for seeding and fixtures

pub mod coords;
pub mod error;
pub mod page;
pub mod protocol;
pub mod redact;
pub mod redaction;
pub mod sample;
pub mod viewer;

pub use coords::{
    canonical_to_output, canonical_to_screen, output_to_canonical, screen_to_canonical,
    CanonicalRect, OutputRect, PageSize, PageViewport, Rotation, ScreenPoint, ScreenRect,
};
pub use error::{GenerationError, PdfError, ValidationError};
pub use page::{inspect_pdf, DocumentInfo, PageGeometry};
pub use protocol::{Coordinates, CreateRedactionRequest, ErrorBody, RedactionListResponse};
pub use redact::{generate_redacted, GeneratorOptions, RedactedPdf};
pub use redaction::{NewRedaction, Redaction, RedactionKind};
pub use viewer::{InteractionMode, OverlayDiff, PendingSubmission, ViewerState};
