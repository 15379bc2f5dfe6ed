//! PDF Form - fill interactive form fields and draw on pages
//!
//! This crate provides:
//! - A typed widget model built from a document's annotations
//! - Value filling with per-widget validation and optional read-only marking
//! - JSON schema and sample data derived from the widget model
//! - Overlays of text, images and lines merged onto page content
//! - Page extraction, concatenation and header version handling
//!
//! # Example
//!
//! ```ignore
//! use pdf_form::PdfForm;
//! use serde_json::json;
//!
//! let form = PdfForm::new(&template_bytes)?;
//! let filled = form
//!     .fill(&json!({ "name": "Ada", "subscribe": true, "plan": 1 }), false)?
//!     .draw_text("Approved", 1, 72.0, 72.0)?;
//! let pdf_bytes = filled.to_bytes()?;
//! ```

mod appearance;
mod assembly;
mod filler;
mod fonts;
mod form;
mod options;
mod overlay;
mod schema;
mod template;
mod widget;

pub use assembly::{change_version, concatenate, extract_page, version, SUPPORTED_VERSIONS};
pub use filler::{fill, set_need_appearances};
pub use fonts::{is_known_font, register_font, registered_font};
pub use form::PdfForm;
pub use options::FormOptions;
pub use overlay::{create_overlays, generate_coordinate_grid, merge, OverlayInstruction};
pub use schema::{generate_schema, sample_data, validate_data};
pub use template::build_widgets;
pub use widget::{Constants, FieldValue, TextStyle, Widget, WidgetKind};

pub use pdf_core::{Align, Color};

use thiserror::Error;

/// Errors that can occur while reading, filling or drawing on a form
#[derive(Debug, Error)]
pub enum FormError {
    #[error("Invalid form data: {0}")]
    InvalidFormData(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Invalid page number: {0} (document has {1} pages)")]
    InvalidPage(usize, usize),

    #[error("Unsupported PDF version: {0}")]
    InvalidVersion(String),

    #[error("Field '{key}' violates a document constraint: {reason}")]
    ConstraintViolation { key: String, reason: String },

    #[error("Invalid value for field '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Unknown font '{font}' for field '{key}'")]
    InvalidFont { key: String, font: String },

    #[error("Font size for field '{key}' must be positive, got {size}")]
    InvalidFontSize { key: String, size: f32 },

    #[error("Font color for field '{key}' has a channel outside [0, 1]")]
    InvalidColor { key: String },

    #[error("Wrap length for field '{key}' must be positive")]
    InvalidWrapLength { key: String },

    #[error("PDF error: {0}")]
    Pdf(#[from] pdf_core::PdfError),

    #[error("Lopdf error: {0}")]
    Lopdf(#[from] lopdf::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for form operations
pub type Result<T> = std::result::Result<T, FormError>;

/// Map a core page lookup failure onto the form error of the same meaning
pub(crate) fn page_error(err: pdf_core::PdfError) -> FormError {
    match err {
        pdf_core::PdfError::InvalidPage(page, count) => FormError::InvalidPage(page, count),
        other => FormError::Pdf(other),
    }
}
