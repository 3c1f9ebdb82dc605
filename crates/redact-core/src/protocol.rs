//! Request and response bodies of the redaction submission protocol
//!
//! ```json
//! POST /document/{document_id}/redactions/create/
//! {"type": "area", "coordinates": {"x": 100, "y": 200, "width": 150, "height": 20, "page": 1}}
//! ```

use serde::{Deserialize, Serialize};

use crate::redaction::{Redaction, RedactionKind};

/// Rectangle plus page, in canonical page space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Kept signed so that `0` and negative pages report `INVALID_PAGE`
    /// instead of failing deserialization
    pub page: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CreateRedactionRequest {
    #[serde(rename = "type")]
    pub kind: RedactionKind,
    pub coordinates: Coordinates,
}

/// Authoritative list of a document's redactions, in creation order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedactionListResponse {
    pub success: bool,
    pub document_id: i64,
    pub redactions: Vec<Redaction>,
    pub count: usize,
}

impl RedactionListResponse {
    pub fn new(document_id: i64, redactions: Vec<Redaction>) -> Self {
        Self {
            success: true,
            document_id,
            count: redactions.len(),
            redactions,
        }
    }
}

/// Structured failure body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    /// Machine-readable reason, e.g. `OUT_OF_BOUNDS`
    pub code: String,
    pub status: u16,
}

/// Path the create request is sent to
pub fn create_path(document_id: i64) -> String {
    format!("/document/{}/redactions/create/", document_id)
}

/// Path the delete request is sent to
pub fn delete_path(redaction_id: i64) -> String {
    format!("/redactions/{}/", redaction_id)
}
