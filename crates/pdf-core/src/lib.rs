//! PDF Core - Low-level PDF manipulation
//!
//! This crate provides functionality for:
//! - Navigating a PDF object graph (pages, annotations, inherited attributes)
//! - Drawing text, images and lines onto page-sized canvases
//! - Embedding TrueType fonts or referencing the 14 standard fonts
//! - Decoding and rotating images (JPEG, PNG)
//! - Copying object subgraphs between documents
//!
//! # Example
//!
//! ```ignore
//! use pdf_core::{Canvas, Color, PdfDocument, StandardFont};
//!
//! let doc = PdfDocument::open_from_bytes(&bytes)?;
//! let (width, height) = doc.page_size(doc.page_ids()[0])?;
//!
//! let mut canvas = Canvas::new(width, height);
//! canvas.draw_text(72.0, 720.0, "Hello", &StandardFont::Helvetica.into(), 12.0, Color::black())?;
//! let overlay = canvas.to_bytes()?;
//! ```

mod canvas;
mod copy;
mod document;
mod font;
mod image;
mod text;

pub use canvas::{Canvas, CanvasFont};
pub use copy::ObjectCopier;
pub use document::{Color, PdfDocument, DEFAULT_PAGE_SIZE};
pub use font::{FontData, FontObjects, StandardFont};
pub use image::{detect_format, is_image, rotate, ImageFormat, ImageXObject};
pub use text::{
    calculate_x_offset, encode_literal, generate_text_operators, simple_word_wrap,
    TextRenderContext,
};

use thiserror::Error;

/// Errors that can occur during PDF operations
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Failed to open PDF: {0}")]
    OpenError(String),

    #[error("Failed to save PDF: {0}")]
    SaveError(String),

    #[error("Font not found: {0}")]
    FontNotFound(String),

    #[error("Failed to parse font: {0}")]
    FontParseError(String),

    #[error("Invalid page number: {0} (document has {1} pages)")]
    InvalidPage(usize, usize),

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("PDF parsing error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Lopdf error: {0}")]
    LopdfError(#[from] lopdf::Error),
}

/// Result type for PDF operations
pub type Result<T> = std::result::Result<T, PdfError>;

/// Text alignment options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

impl Align {
    /// Quadding value (`/Q`) used by form fields for this alignment
    pub fn quadding(self) -> i64 {
        match self {
            Align::Left => 0,
            Align::Center => 1,
            Align::Right => 2,
        }
    }

    /// Alignment for a `/Q` value, defaulting to left for anything unknown
    pub fn from_quadding(q: i64) -> Self {
        match q {
            1 => Align::Center,
            2 => Align::Right,
            _ => Align::Left,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_default() {
        assert_eq!(Align::default(), Align::Left);
    }

    #[test]
    fn test_quadding_round_trip() {
        for align in [Align::Left, Align::Center, Align::Right] {
            assert_eq!(Align::from_quadding(align.quadding()), align);
        }
        assert_eq!(Align::from_quadding(7), Align::Left);
    }
}
