//! Page-sized drawing surface
//!
//! A [`Canvas`] collects content operators and the resources they need. It
//! can be serialized as a standalone one-page PDF (an overlay) or written
//! into an existing document as a Form XObject (a field appearance).

use crate::document::Color;
use crate::font::{FontData, StandardFont};
use crate::image::{generate_image_operators, ImageXObject};
use crate::text::{encode_literal, generate_text_operators, TextRenderContext};
use crate::{Align, PdfDocument, PdfError, Result};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Font usable on a canvas
#[derive(Debug, Clone)]
pub enum CanvasFont {
    /// One of the 14 standard fonts, referenced but never embedded
    Standard(StandardFont),
    /// A TrueType font embedded as a Type0/CIDFontType2 font
    Embedded(Arc<FontData>),
}

impl CanvasFont {
    fn key(&self) -> &str {
        match self {
            CanvasFont::Standard(font) => font.base_font(),
            CanvasFont::Embedded(font) => &font.name,
        }
    }

    /// Text width in points for a given font size
    pub fn text_width_points(&self, text: &str, font_size: f32) -> f32 {
        match self {
            CanvasFont::Standard(font) => font.text_width_points(text, font_size),
            CanvasFont::Embedded(font) => font.text_width_points(text, font_size),
        }
    }

    fn encode(&self, text: &str) -> String {
        match self {
            CanvasFont::Standard(_) => encode_literal(text),
            CanvasFont::Embedded(font) => font.encode_text_hex(text),
        }
    }
}

impl From<StandardFont> for CanvasFont {
    fn from(font: StandardFont) -> Self {
        CanvasFont::Standard(font)
    }
}

/// A font registered on a canvas together with the characters drawn in it
struct UsedFont {
    resource_name: String,
    font: CanvasFont,
    used: String,
}

/// Transparent drawing surface in PDF user space (bottom-left origin)
pub struct Canvas {
    width: f64,
    height: f64,
    content: Vec<u8>,
    fonts: Vec<UsedFont>,
    images: Vec<(u64, String, ImageXObject)>,
}

impl Canvas {
    /// Create an empty canvas of `width` x `height` points
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            content: Vec::new(),
            fonts: Vec::new(),
            images: Vec::new(),
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Whether nothing has been drawn yet
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Raw content operators drawn so far
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Append raw content operators
    pub fn push_operators(&mut self, ops: &[u8]) {
        self.content.extend_from_slice(ops);
    }

    /// Draw left-aligned text with its baseline starting at `(x, y)`
    pub fn draw_text(
        &mut self,
        x: f64,
        y: f64,
        text: &str,
        font: &CanvasFont,
        font_size: f32,
        color: Color,
    ) -> Result<()> {
        self.draw_text_aligned(x, y, text, font, font_size, color, Align::Left)
    }

    /// Draw text aligned relative to `x`
    #[allow(clippy::too_many_arguments)]
    pub fn draw_text_aligned(
        &mut self,
        x: f64,
        y: f64,
        text: &str,
        font: &CanvasFont,
        font_size: f32,
        color: Color,
        align: Align,
    ) -> Result<()> {
        if !(font_size > 0.0 && font_size.is_finite()) {
            return Err(PdfError::ParseError(format!(
                "Font size must be positive, got {font_size}"
            )));
        }
        if text.is_empty() {
            return Ok(());
        }

        let resource_name = self.font_resource(font, text);
        let ctx = TextRenderContext {
            font_name: resource_name,
            font_size,
            text_width: font.text_width_points(text, font_size) as f64,
            color,
        };
        let ops = generate_text_operators(&font.encode(text), x, y, align, &ctx);
        self.content.extend_from_slice(&ops);
        Ok(())
    }

    /// Draw an image stretched to `width` x `height` with its lower-left
    /// corner at `(x, y)`
    pub fn draw_image(&mut self, x: f64, y: f64, width: f64, height: f64, data: &[u8]) -> Result<()> {
        let mut hasher = DefaultHasher::new();
        data.hash(&mut hasher);
        let hash = hasher.finish();

        let name = match self.images.iter().find(|(h, _, _)| *h == hash) {
            Some((_, name, _)) => name.clone(),
            None => {
                let xobject = ImageXObject::from_bytes(data)?;
                let name = format!("Im{}", self.images.len() + 1);
                self.images.push((hash, name.clone(), xobject));
                name
            }
        };

        self.content
            .extend_from_slice(&generate_image_operators(&name, x, y, width, height));
        Ok(())
    }

    /// Stroke a straight line
    pub fn draw_line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, color: Color, line_width: f64) {
        let ops = format!(
            "q\n{} {} {} RG\n{line_width} w\n{x1} {y1} m\n{x2} {y2} l\nS\nQ\n",
            color.r, color.g, color.b
        );
        self.content.extend_from_slice(ops.as_bytes());
    }

    fn font_resource(&mut self, font: &CanvasFont, text: &str) -> String {
        if let Some(used) = self.fonts.iter_mut().find(|f| f.font.key() == font.key()) {
            used.used.push_str(text);
            return used.resource_name.clone();
        }

        let resource_name = format!("F{}", self.fonts.len() + 1);
        self.fonts.push(UsedFont {
            resource_name: resource_name.clone(),
            font: font.clone(),
            used: text.to_string(),
        });
        resource_name
    }

    /// Add the fonts and images this canvas uses to `doc`, returning the
    /// resource dictionary that refers to them
    pub fn write_resources(&self, doc: &mut Document) -> Dictionary {
        let mut fonts = Dictionary::new();
        for used in &self.fonts {
            let font_obj = match &used.font {
                CanvasFont::Standard(font) => Object::Dictionary(font.to_dict()),
                CanvasFont::Embedded(font) => {
                    let mut font = (**font).clone();
                    font.add_chars(&used.used);
                    Object::Reference(embed_font(doc, &font))
                }
            };
            fonts.set(used.resource_name.as_bytes(), font_obj);
        }

        let mut xobjects = Dictionary::new();
        for (_, name, xobject) in &self.images {
            xobjects.set(name.as_bytes(), Object::Reference(xobject.add_to(doc)));
        }

        let mut resources = Dictionary::new();
        if !fonts.is_empty() {
            resources.set("Font", Object::Dictionary(fonts));
        }
        if !xobjects.is_empty() {
            resources.set("XObject", Object::Dictionary(xobjects));
        }
        resources
    }

    /// Write the canvas into `doc` as a Form XObject with a
    /// `[0 0 width height]` bounding box
    pub fn into_form_xobject(self, doc: &mut Document) -> ObjectId {
        let resources = self.write_resources(doc);
        let dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(self.width as f32),
                Object::Real(self.height as f32),
            ],
            "Resources" => resources,
        };
        doc.add_object(Stream::new(dict, self.content))
    }

    /// Serialize the canvas as a standalone one-page PDF
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut pdf = PdfDocument::with_version("1.7");
        let resources = self.write_resources(pdf.inner_mut());
        let content_id = pdf.add_object(Stream::new(Dictionary::new(), self.content.clone()));
        let page_id = pdf.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(self.width as f32),
                Object::Real(self.height as f32),
            ],
            "Resources" => resources,
            "Contents" => content_id,
        });
        pdf.push_page(page_id)?;
        pdf.to_bytes()
    }
}

/// Embed a TrueType font into `doc`, returning the Type0 font ID
fn embed_font(doc: &mut Document, font_data: &FontData) -> ObjectId {
    let font_objects = match font_data.to_pdf_objects() {
        Ok(objects) => objects,
        Err(e) => {
            log::warn!("falling back to Helvetica for {}: {e}", font_data.name);
            return doc.add_object(StandardFont::Helvetica.to_dict());
        }
    };

    let font_file_id = doc.add_object(font_objects.font_file_stream);

    let mut font_descriptor = font_objects.font_descriptor;
    font_descriptor.set("FontFile2", Object::Reference(font_file_id));
    let font_descriptor_id = doc.add_object(font_descriptor);

    let mut cid_font = font_objects.cid_font;
    cid_font.set("FontDescriptor", Object::Reference(font_descriptor_id));
    let cid_font_id = doc.add_object(cid_font);

    let tounicode_id = doc.add_object(font_objects.tounicode_stream);

    let mut type0_font = font_objects.type0_font;
    type0_font.set(
        "DescendantFonts",
        Object::Array(vec![Object::Reference(cid_font_id)]),
    );
    type0_font.set("ToUnicode", Object::Reference(tounicode_id));

    doc.add_object(type0_font)
}
