use thiserror::Error;

/// A redaction rectangle that violates the model invariants.
///
/// Raised at creation time; nothing is persisted and nothing is clamped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Page {page} is out of range (document has {page_count} pages)")]
    InvalidPage { page: i64, page_count: u32 },

    #[error("Width and height must be positive (got {width} x {height})")]
    InvalidDimensions { width: f64, height: f64 },

    #[error(
        "Rectangle ({x}, {y}, {width} x {height}) exceeds the page bounds ({page_width} x {page_height})"
    )]
    OutOfBounds {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        page_width: f64,
        page_height: f64,
    },
}

impl ValidationError {
    /// Stable machine-readable code used in error bodies
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::InvalidPage { .. } => "INVALID_PAGE",
            ValidationError::InvalidDimensions { .. } => "INVALID_DIMENSIONS",
            ValidationError::OutOfBounds { .. } => "OUT_OF_BOUNDS",
        }
    }
}

/// Failure to read a PDF's structure
#[derive(Error, Debug)]
pub enum PdfError {
    #[error("Not a PDF file (missing %PDF- header)")]
    NotPdf,

    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("PDF is encrypted")]
    Encrypted,

    #[error("PDF has no pages")]
    NoPages,

    #[error("Page {page} is malformed: {message}")]
    MalformedPage { page: u32, message: String },
}

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error(transparent)]
    Pdf(#[from] PdfError),

    #[error("Redaction targets page {page} but the document has {page_count} pages")]
    PageOutOfRange { page: u32, page_count: u32 },

    #[error("Failed to rewrite content of page {page}: {message}")]
    Content { page: u32, message: String },

    #[error("Failed to write PDF: {0}")]
    Write(String),
}
