//! Building the widget model from a document's annotations

use crate::fonts::is_known_font;
use crate::widget::{Constants, TextStyle, Widget, WidgetKind};
use indexmap::IndexMap;
use lopdf::{Dictionary, Object, ObjectId};
use pdf_core::{Align, Color, PdfDocument, StandardFont};

/// `/Ff` bit 1: the field cannot be changed by the user
pub(crate) const READ_ONLY: i64 = 1;
/// `/Ff` bit 16: button is a radio button
const RADIO: i64 = 1 << 15;
/// `/Ff` bit 17: button is a push button
const PUSHBUTTON: i64 = 1 << 16;
/// `/Ff` bit 25: text is laid out in `/MaxLen` equal cells
const COMB: i64 = 1 << 24;

/// Scan every page's widget annotations into typed widgets keyed by field
/// name, in page then annotation order
///
/// With `sejda` set, names, flags and values are read from the
/// annotation's parent even when the annotation carries its own name.
/// When two distinct fields share a name the first one wins.
pub fn build_widgets(document: &PdfDocument, sejda: bool) -> IndexMap<String, Widget> {
    let acroform = document.acroform();
    let dr_fonts = acroform
        .and_then(|acro| acro.get(b"DR").ok())
        .and_then(|dr| document.resolve(dr).as_dict().ok())
        .and_then(|dr| dr.get(b"Font").ok())
        .and_then(|fonts| document.resolve(fonts).as_dict().ok());
    let default_da = acroform
        .and_then(|acro| acro.get(b"DA").ok())
        .map(|da| document.resolve(da))
        .and_then(text_of);

    let mut widgets: IndexMap<String, Widget> = IndexMap::new();

    for (index, page_id) in document.page_ids().into_iter().enumerate() {
        for annot in document.annotations(page_id) {
            let is_widget = document
                .get(annot, b"Subtype")
                .and_then(|s| s.as_name().ok())
                .map(|s| s == b"Widget")
                .unwrap_or(false);
            if !is_widget {
                continue;
            }

            let field_id = field_dict(document, annot, sejda);
            let Some(key) = document.get(field_id, b"T").and_then(text_of) else {
                log::debug!("skipping unnamed widget {annot:?}");
                continue;
            };
            let Some(kind) = classify(document, annot, field_id) else {
                log::debug!("skipping {key}: not a fillable field");
                continue;
            };

            match widgets.get_mut(&key) {
                Some(existing) if existing.field_id == field_id => {
                    if existing.kind == WidgetKind::Radio {
                        let state = on_state(document, annot)
                            .unwrap_or_else(|| existing.annotations.len().to_string());
                        existing.constants.options.push(state);
                    }
                    existing.annotations.push(annot);
                }
                Some(_) => {
                    log::warn!("duplicate field name {key} on page {}, keeping the first", index + 1);
                }
                None => {
                    let mut widget = Widget::new(key.clone(), kind);
                    widget.page_number = index + 1;
                    widget.rect = rect(document, annot);
                    widget.field_id = field_id;
                    widget.constants = constants(document, annot, field_id, kind);
                    widget.style = text_style(
                        document,
                        field_id,
                        dr_fonts,
                        default_da.as_deref(),
                    );
                    widget.annotations.push(annot);
                    log::debug!("found {kind:?} field {key} on page {}", index + 1);
                    widgets.insert(key, widget);
                }
            }
        }
    }

    log::info!("built {} widgets from {} pages", widgets.len(), document.page_count());
    widgets
}

/// Dictionary holding the field's name, flags and value
fn field_dict(document: &PdfDocument, annot: ObjectId, sejda: bool) -> ObjectId {
    let parent = document.parent(annot);
    if sejda {
        return parent.unwrap_or(annot);
    }

    let named = document
        .dict(annot)
        .map(|dict| dict.has(b"T"))
        .unwrap_or(false);
    if named {
        annot
    } else {
        parent.unwrap_or(annot)
    }
}

fn flags(document: &PdfDocument, field_id: ObjectId) -> i64 {
    document
        .inherited(field_id, b"Ff")
        .and_then(|ff| ff.as_i64().ok())
        .unwrap_or(0)
}

fn classify(document: &PdfDocument, annot: ObjectId, field_id: ObjectId) -> Option<WidgetKind> {
    let field_type = document
        .inherited(field_id, b"FT")
        .or_else(|| document.inherited(annot, b"FT"))?
        .as_name()
        .ok()?;
    // Some writers put the flags on each kid annotation instead of the field
    let own_flags = document
        .get(annot, b"Ff")
        .and_then(|ff| ff.as_i64().ok())
        .unwrap_or(0);
    let flags = flags(document, field_id) | own_flags;

    let kind = match field_type {
        b"Btn" if flags & PUSHBUTTON != 0 => {
            // Icon-only push buttons are image placeholders
            return icon_only(document, annot).then_some(WidgetKind::Image);
        }
        b"Btn" if flags & RADIO != 0 || unnamed_kids(document, field_id) > 1 => WidgetKind::Radio,
        b"Btn" => {
            let states = appearance_states(document, annot);
            if !states.is_empty() && states != ["Off", "Yes"] {
                log::debug!("checkbox {field_id:?} uses states {states:?}");
            }
            WidgetKind::Checkbox
        }
        b"Ch" => WidgetKind::Dropdown,
        b"Sig" => WidgetKind::Signature,
        _ => WidgetKind::Text,
    };
    Some(kind)
}

fn icon_only(document: &PdfDocument, annot: ObjectId) -> bool {
    document
        .get(annot, b"MK")
        .and_then(|mk| mk.as_dict().ok())
        .and_then(|mk| mk.get(b"TP").ok())
        .and_then(|tp| document.resolve(tp).as_i64().ok())
        == Some(1)
}

fn unnamed_kids(document: &PdfDocument, field_id: ObjectId) -> usize {
    let Some(Object::Array(kids)) = document.get(field_id, b"Kids") else {
        return 0;
    };
    kids.iter()
        .filter(|kid| {
            document
                .resolve(kid)
                .as_dict()
                .map(|dict| !dict.has(b"T"))
                .unwrap_or(false)
        })
        .count()
}

/// Sorted names of the annotation's normal appearance states
fn appearance_states(document: &PdfDocument, annot: ObjectId) -> Vec<String> {
    let normal = document
        .get(annot, b"AP")
        .and_then(|ap| ap.as_dict().ok())
        .and_then(|ap| ap.get(b"N").ok())
        .map(|n| document.resolve(n));

    let mut states: Vec<String> = match normal {
        Some(Object::Dictionary(dict)) => dict
            .iter()
            .map(|(name, _)| String::from_utf8_lossy(name).into_owned())
            .collect(),
        _ => Vec::new(),
    };
    states.sort();
    states
}

/// Name of the state that turns a button annotation on
fn on_state(document: &PdfDocument, annot: ObjectId) -> Option<String> {
    appearance_states(document, annot)
        .into_iter()
        .find(|state| state != "Off")
}

pub(crate) fn rect(document: &PdfDocument, annot: ObjectId) -> [f64; 4] {
    let values: Vec<f64> = match document.get(annot, b"Rect") {
        Some(Object::Array(arr)) => arr
            .iter()
            .filter_map(|v| number(document.resolve(v)))
            .collect(),
        _ => Vec::new(),
    };

    match values.as_slice() {
        [x1, y1, x2, y2] => [x1.min(*x2), y1.min(*y2), x1.max(*x2), y1.max(*y2)],
        _ => {
            log::warn!("widget {annot:?} has no usable Rect");
            [0.0; 4]
        }
    }
}

fn constants(
    document: &PdfDocument,
    annot: ObjectId,
    field_id: ObjectId,
    kind: WidgetKind,
) -> Constants {
    let mut constants = Constants::default();
    match kind {
        WidgetKind::Text => {
            constants.max_length = document
                .inherited(field_id, b"MaxLen")
                .and_then(|m| m.as_i64().ok())
                .and_then(|m| usize::try_from(m).ok());
            constants.comb = flags(document, field_id) & COMB != 0 && constants.max_length.is_some();
        }
        WidgetKind::Radio => {
            constants
                .options
                .push(on_state(document, annot).unwrap_or_else(|| "0".to_string()));
        }
        WidgetKind::Dropdown => {
            if let Some(Object::Array(opts)) = document.inherited(field_id, b"Opt") {
                constants.options = opts
                    .iter()
                    .filter_map(|opt| match document.resolve(opt) {
                        // [export display] pairs
                        Object::Array(pair) => pair.first().and_then(|e| text_of(document.resolve(e))),
                        other => text_of(other),
                    })
                    .collect();
            }
        }
        WidgetKind::Checkbox | WidgetKind::Signature | WidgetKind::Image => {}
    }
    constants
}

fn text_style(
    document: &PdfDocument,
    field_id: ObjectId,
    dr_fonts: Option<&Dictionary>,
    default_da: Option<&str>,
) -> TextStyle {
    let da = document.inherited(field_id, b"DA").and_then(text_of);
    let mut style = TextStyle {
        alignment: document
            .inherited(field_id, b"Q")
            .and_then(|q| q.as_i64().ok())
            .map(Align::from_quadding)
            .unwrap_or_default(),
        ..TextStyle::default()
    };

    let Some(da) = da.as_deref().or(default_da) else {
        return style;
    };
    let appearance = parse_da(da);

    style.font = appearance.font.and_then(|resource| {
        let base_font = dr_fonts
            .and_then(|fonts| fonts.get(resource.as_bytes()).ok())
            .and_then(|font| document.resolve(font).as_dict().ok())
            .and_then(|font| font.get(b"BaseFont").ok())
            .and_then(|name| name.as_name_str().ok());
        match base_font {
            Some(base) if StandardFont::from_name(base).is_some() => Some(base.to_string()),
            _ if is_known_font(&resource) => Some(resource),
            _ => None,
        }
    });
    // Size 0 means auto-size
    style.font_size = appearance.font_size.filter(|size| *size > 0.0);
    style.font_color = appearance.color;
    style
}

/// Pieces of a default appearance string (`/Helv 12 Tf 0 g`)
#[derive(Debug, Default, PartialEq)]
struct DefaultAppearance {
    font: Option<String>,
    font_size: Option<f32>,
    color: Option<Color>,
}

fn parse_da(da: &str) -> DefaultAppearance {
    let mut result = DefaultAppearance::default();
    let mut operands: Vec<&str> = Vec::new();

    for token in da.split_whitespace() {
        match token {
            "Tf" => {
                if let [.., font, size] = operands.as_slice() {
                    result.font = font.strip_prefix('/').map(str::to_string);
                    result.font_size = size.parse().ok();
                }
            }
            "g" => {
                if let Some(v) = trailing_numbers(&operands, 1) {
                    result.color = Some(Color::rgb(v[0], v[0], v[0]));
                }
            }
            "rg" => {
                if let Some(v) = trailing_numbers(&operands, 3) {
                    result.color = Some(Color::rgb(v[0], v[1], v[2]));
                }
            }
            "k" => {
                if let Some(v) = trailing_numbers(&operands, 4) {
                    let (c, m, y, k) = (v[0], v[1], v[2], v[3]);
                    result.color = Some(Color::rgb(
                        (1.0 - c) * (1.0 - k),
                        (1.0 - m) * (1.0 - k),
                        (1.0 - y) * (1.0 - k),
                    ));
                }
            }
            operand => {
                operands.push(operand);
                continue;
            }
        }
        operands.clear();
    }
    result
}

fn trailing_numbers(operands: &[&str], n: usize) -> Option<Vec<f32>> {
    let start = operands.len().checked_sub(n)?;
    operands[start..].iter().map(|v| v.parse().ok()).collect()
}

/// Decode a PDF text string (UTF-16BE with BOM, otherwise single-byte)
pub(crate) fn text_of(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => Some(decode_text(bytes)),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

fn decode_text(bytes: &[u8]) -> String {
    match bytes.strip_prefix(&[0xFE, 0xFF]) {
        Some(utf16) => {
            let units: Vec<u16> = utf16
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        None => bytes.iter().map(|&b| b as char).collect(),
    }
}

pub(crate) fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}
