//! Writing widget values into field dictionaries

use crate::appearance::text_appearance;
use crate::fonts::resolve_font;
use crate::overlay::{create_overlays, merge, OverlayInstruction};
use crate::template::{rect, READ_ONLY};
use crate::widget::{decode_image, FieldValue, Widget, WidgetKind};
use crate::Result;
use indexmap::IndexMap;
use lopdf::{dictionary, Dictionary, Object, ObjectId, StringFormat};
use pdf_core::{CanvasFont, Color, PdfDocument};

/// Font used when neither the widget nor the form sets one
const DEFAULT_FONT: &str = "Helvetica";
const DEFAULT_FONT_SIZE: f32 = 12.0;

/// Write every widget that has a value into a copy of `document`
///
/// All widgets are validated before anything is written, so a failed fill
/// leaves no partial changes. `flatten` marks each filled field read-only
/// when true and clears that flag when false. Signature and image widgets
/// are drawn onto their page.
pub fn fill(
    document: &PdfDocument,
    widgets: &IndexMap<String, Widget>,
    flatten: bool,
) -> Result<PdfDocument> {
    let filled: Vec<&Widget> = widgets.values().filter(|w| w.has_value()).collect();
    for widget in &filled {
        widget.validate()?;
    }

    let mut doc = document.clone();
    let mut dr_fonts = Dictionary::new();
    let mut images = Vec::new();

    for widget in &filled {
        match widget.kind {
            WidgetKind::Checkbox => write_checkbox(&mut doc, widget)?,
            WidgetKind::Radio => write_radio(&mut doc, widget)?,
            WidgetKind::Text | WidgetKind::Dropdown => write_text(&mut doc, widget, &mut dr_fonts)?,
            WidgetKind::Signature | WidgetKind::Image => {
                if let Some(instruction) = image_instruction(widget)? {
                    images.push(instruction);
                }
            }
        }
        set_read_only(&mut doc, widget, flatten)?;
    }

    if !dr_fonts.is_empty() {
        add_dr_fonts(&mut doc, dr_fonts)?;
    }
    if !images.is_empty() {
        let overlays = create_overlays(&doc, None, &images)?;
        doc = merge(&doc, &overlays)?;
    }

    log::info!("filled {} of {} fields (flatten: {flatten})", filled.len(), widgets.len());
    Ok(doc)
}

/// Set `/NeedAppearances` on the interactive form
pub fn set_need_appearances(document: &mut PdfDocument, need_appearances: bool) -> Result<()> {
    let acroform_id = document.ensure_acroform()?;
    document.set(acroform_id, "NeedAppearances", need_appearances)?;
    Ok(())
}

fn write_checkbox(doc: &mut PdfDocument, widget: &Widget) -> Result<()> {
    let Some(FieldValue::Bool(checked)) = widget.value else {
        return Ok(());
    };
    let state = if checked { "Yes" } else { "Off" };

    doc.set(widget.field_id, "V", Object::Name(state.into()))?;
    for annot in &widget.annotations {
        doc.set(*annot, "AS", Object::Name(state.into()))?;
    }
    Ok(())
}

fn write_radio(doc: &mut PdfDocument, widget: &Widget) -> Result<()> {
    let Some(FieldValue::Index(selected)) = widget.value else {
        return Ok(());
    };

    for (i, (annot, state)) in widget
        .annotations
        .iter()
        .zip(&widget.constants.options)
        .enumerate()
    {
        let state = if i == selected { state.as_str() } else { "Off" };
        doc.set(*annot, "AS", Object::Name(state.into()))?;
    }
    if let Some(state) = widget.constants.options.get(selected) {
        doc.set(widget.field_id, "V", Object::Name(state.as_bytes().to_vec()))?;
    }
    Ok(())
}

/// Text and dropdown fields: value, default appearance and a generated
/// appearance stream per annotation
fn write_text(doc: &mut PdfDocument, widget: &Widget, dr_fonts: &mut Dictionary) -> Result<()> {
    let text = match &widget.value {
        Some(FieldValue::Text(text)) => text.clone(),
        Some(FieldValue::Index(i)) => match widget.constants.options.get(*i) {
            Some(option) => option.clone(),
            None => return Ok(()),
        },
        _ => return Ok(()),
    };

    let font_name = widget.style.font.as_deref().unwrap_or(DEFAULT_FONT);
    let font = resolve_font(&widget.key, font_name)?;
    let font_size = widget.style.font_size.unwrap_or(DEFAULT_FONT_SIZE);
    let color = widget.style.font_color.unwrap_or_default();
    let resource = resource_name(font_name);

    doc.set(widget.field_id, "V", encode_text(&text))?;
    doc.set(
        widget.field_id,
        "DA",
        Object::string_literal(default_appearance(&resource, font_size, color)),
    )?;
    doc.set(widget.field_id, "Q", widget.style.alignment.quadding())?;

    for annot in &widget.annotations {
        let mut placed = widget.clone();
        placed.rect = rect(doc, *annot);
        let canvas = text_appearance(&placed, &text, &font, font_size, color)?;
        let appearance_id = canvas.into_form_xobject(doc.inner_mut());
        doc.set(*annot, "AP", dictionary! { "N" => appearance_id })?;

        if !dr_fonts.has(resource.as_bytes()) {
            if let Some(entry) = dr_font_entry(doc, &font, appearance_id) {
                dr_fonts.set(resource.as_bytes(), entry);
            }
        }
    }
    Ok(())
}

fn image_instruction(widget: &Widget) -> Result<Option<OverlayInstruction>> {
    let Some(FieldValue::Text(data)) = &widget.value else {
        return Ok(None);
    };
    let (x, y) = widget.position();
    Ok(Some(OverlayInstruction::Image {
        page: widget.page_number,
        x,
        y,
        width: widget.width(),
        height: widget.height(),
        data: decode_image(&widget.key, data)?,
        rotation: 0.0,
    }))
}

/// Toggle the read-only bit on the field and on every annotation that
/// carries flags of its own
fn set_read_only(doc: &mut PdfDocument, widget: &Widget, read_only: bool) -> Result<()> {
    let toggle = |flags: i64| {
        if read_only {
            flags | READ_ONLY
        } else {
            flags & !READ_ONLY
        }
    };

    let flags = doc
        .inherited(widget.field_id, b"Ff")
        .and_then(|ff| ff.as_i64().ok())
        .unwrap_or(0);
    doc.set(widget.field_id, "Ff", toggle(flags))?;

    for &annot in &widget.annotations {
        if annot == widget.field_id {
            continue;
        }
        if let Some(flags) = doc.get(annot, b"Ff").and_then(|ff| ff.as_i64().ok()) {
            doc.set(annot, "Ff", toggle(flags))?;
        }
    }
    Ok(())
}

/// Encode a field value: ASCII as a literal string, anything else as
/// UTF-16BE with a byte order mark
pub(crate) fn encode_text(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

fn default_appearance(resource: &str, font_size: f32, color: Color) -> String {
    format!(
        "/{resource} {font_size} Tf {} {} {} rg",
        color.r, color.g, color.b
    )
}

/// PDF name for a font in `/DR`
fn resource_name(font_name: &str) -> String {
    font_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

/// `/DR` entry for a font: standard fonts inline, embedded fonts shared
/// with the appearance stream that first used them
fn dr_font_entry(doc: &PdfDocument, font: &CanvasFont, appearance_id: ObjectId) -> Option<Object> {
    match font {
        CanvasFont::Standard(font) => Some(Object::Dictionary(font.to_dict())),
        CanvasFont::Embedded(_) => doc
            .get(appearance_id, b"Resources")?
            .as_dict()
            .ok()?
            .get(b"Font")
            .ok()?
            .as_dict()
            .ok()?
            .get(b"F1")
            .ok()
            .cloned(),
    }
}

fn add_dr_fonts(doc: &mut PdfDocument, fonts: Dictionary) -> Result<()> {
    let acroform_id = doc.ensure_acroform()?;
    let mut dr = match doc.get(acroform_id, b"DR") {
        Some(Object::Dictionary(dr)) => dr.clone(),
        _ => Dictionary::new(),
    };
    let mut font_dict = match dr.get(b"Font").map(|f| doc.resolve(f)) {
        Ok(Object::Dictionary(existing)) => existing.clone(),
        _ => Dictionary::new(),
    };

    for (name, font) in fonts.iter() {
        if !font_dict.has(name) {
            font_dict.set(name.clone(), font.clone());
        }
    }
    dr.set("Font", Object::Dictionary(font_dict));
    doc.set(acroform_id, "DR", Object::Dictionary(dr))?;
    Ok(())
}
