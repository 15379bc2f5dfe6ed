//! Drawing on pages through transparent overlays
//!
//! Instructions for a page are drawn onto a canvas the size of that page
//! and serialized as a one-page PDF. Merging imports that page as a Form
//! XObject and paints it over the base page's content.

use crate::fonts::resolve_font;
use crate::{page_error, FormError, Result};
use lopdf::{dictionary, Object, ObjectId, Stream};
use pdf_core::{is_image, rotate, Canvas, Color, ObjectCopier, PdfDocument};

/// Line width of the coordinate grid, in points
const GRID_LINE_WIDTH: f64 = 0.5;

/// One drawing operation, in page coordinates (origin bottom-left, Y up)
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayInstruction {
    /// Text with its baseline starting at `(x, y)`
    Text {
        page: usize,
        x: f64,
        y: f64,
        text: String,
        font: String,
        font_size: f32,
        color: Color,
    },
    /// JPEG or PNG image with its lower-left corner at `(x, y)`, rotated
    /// clockwise by `rotation` degrees about its center, then scaled to
    /// `width` x `height`
    Image {
        page: usize,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        data: Vec<u8>,
        rotation: f64,
    },
    /// Straight line from `(x1, y1)` to `(x2, y2)`
    Line {
        page: usize,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        color: Color,
        width: f64,
    },
}

impl OverlayInstruction {
    /// Target page, 1-indexed
    pub fn page(&self) -> usize {
        match self {
            OverlayInstruction::Text { page, .. }
            | OverlayInstruction::Image { page, .. }
            | OverlayInstruction::Line { page, .. } => *page,
        }
    }

    fn draw(&self, canvas: &mut Canvas) -> Result<()> {
        match self {
            OverlayInstruction::Text {
                page,
                x,
                y,
                text,
                font,
                font_size,
                color,
            } => {
                let key = format!("text on page {page}");
                if !(*font_size > 0.0 && font_size.is_finite()) {
                    return Err(FormError::InvalidFontSize {
                        key,
                        size: *font_size,
                    });
                }
                if !color.is_valid() {
                    return Err(FormError::InvalidColor { key });
                }
                let font = resolve_font(&key, font)?;
                canvas.draw_text(*x, *y, text, &font, *font_size, *color)?;
            }
            OverlayInstruction::Image {
                page,
                x,
                y,
                width,
                height,
                data,
                rotation,
            } => {
                if !is_image(data) {
                    return Err(FormError::InvalidImage(format!(
                        "image on page {page} is neither JPEG nor PNG"
                    )));
                }
                let rotated = rotate(data, *rotation)?;
                canvas.draw_image(*x, *y, *width, *height, &rotated)?;
            }
            OverlayInstruction::Line {
                page,
                x1,
                y1,
                x2,
                y2,
                color,
                width,
            } => {
                if !color.is_valid() {
                    return Err(FormError::InvalidColor {
                        key: format!("line on page {page}"),
                    });
                }
                canvas.draw_line(*x1, *y1, *x2, *y2, *color, *width);
            }
        }
        Ok(())
    }
}

/// Draw `instructions` onto one transparent page-sized overlay per page
///
/// The result has one entry per page of `document`; pages without
/// instructions (or other than `page`, when given) get `None`.
pub fn create_overlays(
    document: &PdfDocument,
    page: Option<usize>,
    instructions: &[OverlayInstruction],
) -> Result<Vec<Option<Vec<u8>>>> {
    let page_ids = document.page_ids();
    let count = page_ids.len();
    for target in page.into_iter().chain(instructions.iter().map(|i| i.page())) {
        if target == 0 || target > count {
            return Err(FormError::InvalidPage(target, count));
        }
    }

    let mut overlays = vec![None; count];
    for (index, page_id) in page_ids.into_iter().enumerate() {
        let number = index + 1;
        if page.is_some_and(|p| p != number) {
            continue;
        }
        let on_page: Vec<&OverlayInstruction> =
            instructions.iter().filter(|i| i.page() == number).collect();
        if on_page.is_empty() {
            continue;
        }

        let (width, height) = document.page_size(page_id)?;
        let mut canvas = Canvas::new(width, height);
        for instruction in on_page {
            instruction.draw(&mut canvas)?;
        }
        overlays[index] = Some(canvas.to_bytes()?);
        log::debug!("built overlay for page {number}");
    }
    Ok(overlays)
}

/// Paint each overlay over the matching page of a copy of `document`
///
/// Only the content and resources of pages with an overlay change;
/// annotations, fields and every other page are left as they are.
pub fn merge(document: &PdfDocument, overlays: &[Option<Vec<u8>>]) -> Result<PdfDocument> {
    let page_ids = document.page_ids();
    if overlays.len() > page_ids.len() {
        return Err(FormError::InvalidPage(overlays.len(), page_ids.len()));
    }

    let mut doc = document.clone();
    let mut merged = 0;
    for (page_id, overlay) in page_ids.into_iter().zip(overlays) {
        let Some(bytes) = overlay else { continue };
        let overlay = PdfDocument::open_from_bytes(bytes)?;
        let xobject_id = import_page(&overlay, &mut doc)?;

        let name = doc.add_page_xobject(page_id, "Ov", xobject_id)?;
        let [x1, y1, _, _] = doc.media_box(page_id)?;
        let ops = format!("q\n1 0 0 1 {x1} {y1} cm\n/{name} Do\nQ\n");
        doc.append_page_content(page_id, ops.into_bytes())?;
        merged += 1;
    }

    log::info!("merged overlays onto {merged} pages");
    Ok(doc)
}

/// Copy the first page of `overlay` into `target` as a Form XObject
fn import_page(overlay: &PdfDocument, target: &mut PdfDocument) -> Result<ObjectId> {
    let page_id = overlay.page_id(1).map_err(page_error)?;
    let [x1, y1, x2, y2] = overlay.media_box(page_id)?;
    let content = overlay.page_content(page_id);
    let resources = Object::Dictionary(overlay.page_resources(page_id));

    let resources = ObjectCopier::new(overlay.inner(), target.inner_mut()).copy_value(&resources)?;
    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Form",
        "BBox" => vec![
            Object::Real(x1 as f32),
            Object::Real(y1 as f32),
            Object::Real(x2 as f32),
            Object::Real(y2 as f32),
        ],
        "Resources" => resources,
    };
    Ok(target.add_object(Stream::new(dict, content)))
}

/// Overlay a labelled grid with lines every `margin` points on every page
pub fn generate_coordinate_grid(
    document: &PdfDocument,
    color: Color,
    margin: f64,
) -> Result<PdfDocument> {
    if !(margin > 0.0 && margin.is_finite()) {
        return Err(FormError::InvalidFormData(format!(
            "grid margin must be positive, got {margin}"
        )));
    }
    if !color.is_valid() {
        return Err(FormError::InvalidColor {
            key: "grid".to_string(),
        });
    }

    let font_size = (margin / 10.0).clamp(4.0, 10.0) as f32;
    let mut instructions = Vec::new();
    for (index, page_id) in document.page_ids().into_iter().enumerate() {
        let page = index + 1;
        let (width, height) = document.page_size(page_id)?;

        let xs = steps(margin, width);
        let ys = steps(margin, height);
        for &x in &xs {
            instructions.push(OverlayInstruction::Line {
                page,
                x1: x,
                y1: 0.0,
                x2: x,
                y2: height,
                color,
                width: GRID_LINE_WIDTH,
            });
        }
        for &y in &ys {
            instructions.push(OverlayInstruction::Line {
                page,
                x1: 0.0,
                y1: y,
                x2: width,
                y2: y,
                color,
                width: GRID_LINE_WIDTH,
            });
        }
        for &x in &xs {
            for &y in &ys {
                instructions.push(OverlayInstruction::Text {
                    page,
                    x: x + 2.0,
                    y: y + 2.0,
                    text: format!("({x}, {y})"),
                    font: "Helvetica".to_string(),
                    font_size,
                    color,
                });
            }
        }
    }

    let overlays = create_overlays(document, None, &instructions)?;
    merge(document, &overlays)
}

/// Multiples of `margin` strictly inside `(0, limit)`
fn steps(margin: f64, limit: f64) -> Vec<f64> {
    (1..)
        .map(|i| i as f64 * margin)
        .take_while(|v| *v < limit)
        .collect()
}
