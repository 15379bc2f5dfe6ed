//! Widget model: one typed entry per form field

use crate::fonts::is_known_font;
use crate::{FormError, Result};
use base64::Engine;
use lopdf::ObjectId;
use pdf_core::{Align, Color};

/// Kind of form field a widget represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetKind {
    Text,
    Checkbox,
    Radio,
    Dropdown,
    Signature,
    Image,
}

/// A value assigned to a widget
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Text content, or a base64 image for signature and image widgets
    Text(String),
    /// Checkbox state
    Bool(bool),
    /// Selected option of a radio group or dropdown
    Index(usize),
}

impl FieldValue {
    /// Convert a JSON fill value
    ///
    /// Strings, booleans and non-negative integers are accepted; anything
    /// else is rejected for `key`.
    pub fn from_json(key: &str, value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::String(s) => Ok(FieldValue::Text(s.clone())),
            serde_json::Value::Bool(b) => Ok(FieldValue::Bool(*b)),
            serde_json::Value::Number(n) => n
                .as_u64()
                .map(|n| FieldValue::Index(n as usize))
                .ok_or_else(|| FormError::InvalidValue {
                    key: key.to_string(),
                    reason: format!("expected a non-negative integer, got {n}"),
                }),
            other => Err(FormError::InvalidValue {
                key: key.to_string(),
                reason: format!("unsupported value {other}"),
            }),
        }
    }

    /// JSON form of the value
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FieldValue::Text(s) => serde_json::Value::from(s.as_str()),
            FieldValue::Bool(b) => serde_json::Value::from(*b),
            FieldValue::Index(i) => serde_json::Value::from(*i),
        }
    }
}

/// Appearance of a text widget's value
///
/// `None` entries fall back to the form's global style.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextStyle {
    pub font: Option<String>,
    pub font_size: Option<f32>,
    pub font_color: Option<Color>,
    /// Horizontal shift of the text inside the widget, in points
    pub x_offset: f64,
    /// Vertical shift of the text inside the widget, in points
    pub y_offset: f64,
    /// Maximum characters per line before wrapping
    pub wrap_length: Option<usize>,
    pub alignment: Align,
}

/// Attributes read from the document that callers cannot override
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Constants {
    /// `/MaxLen` of a text field
    pub max_length: Option<usize>,
    /// Comb layout: one character per `max_length` cell
    pub comb: bool,
    /// Radio on-state names or dropdown export values, in option order
    pub options: Vec<String>,
}

/// One form field
#[derive(Debug, Clone, PartialEq)]
pub struct Widget {
    pub key: String,
    pub kind: WidgetKind,
    pub value: Option<FieldValue>,
    /// 1-indexed page of the field's first annotation
    pub page_number: usize,
    pub style: TextStyle,
    pub(crate) rect: [f64; 4],
    pub(crate) constants: Constants,
    pub(crate) field_id: ObjectId,
    pub(crate) annotations: Vec<ObjectId>,
}

impl Widget {
    /// Create an unplaced widget with no value
    pub fn new(key: impl Into<String>, kind: WidgetKind) -> Self {
        Self {
            key: key.into(),
            kind,
            value: None,
            page_number: 1,
            style: TextStyle::default(),
            rect: [0.0; 4],
            constants: Constants::default(),
            field_id: (0, 0),
            annotations: Vec::new(),
        }
    }

    /// Lower-left corner of the first annotation
    pub fn position(&self) -> (f64, f64) {
        (self.rect[0], self.rect[1])
    }

    pub fn width(&self) -> f64 {
        self.rect[2] - self.rect[0]
    }

    pub fn height(&self) -> f64 {
        self.rect[3] - self.rect[1]
    }

    pub fn constants(&self) -> &Constants {
        &self.constants
    }

    /// Tighten or relax document constraints before a fill
    pub fn constants_mut(&mut self) -> &mut Constants {
        &mut self.constants
    }

    /// Number of selectable options (radio kids or dropdown entries)
    pub fn option_count(&self) -> usize {
        self.constants.options.len()
    }

    /// Field dictionary carrying the name, flags and value
    pub fn field_id(&self) -> ObjectId {
        self.field_id
    }

    /// Widget annotations of the field, in page order
    pub fn annotation_ids(&self) -> &[ObjectId] {
        &self.annotations
    }

    /// Whether the value is set and not the empty image placeholder
    pub fn has_value(&self) -> bool {
        match (&self.value, self.kind) {
            (None, _) => false,
            (Some(FieldValue::Text(s)), WidgetKind::Signature | WidgetKind::Image) => !s.is_empty(),
            (Some(_), _) => true,
        }
    }

    /// Check that the value has the type this kind of widget takes
    pub fn validate_value(&self) -> Result<()> {
        let Some(value) = &self.value else {
            return Ok(());
        };

        let expected = match (self.kind, value) {
            (WidgetKind::Text, FieldValue::Text(_)) => return Ok(()),
            (WidgetKind::Checkbox, FieldValue::Bool(_)) => return Ok(()),
            (WidgetKind::Radio | WidgetKind::Dropdown, FieldValue::Index(_)) => return Ok(()),
            (WidgetKind::Signature | WidgetKind::Image, FieldValue::Text(data)) => {
                if data.is_empty() {
                    return Ok(());
                }
                return decode_image(&self.key, data).map(|_| ());
            }
            (WidgetKind::Text, _) => "a string",
            (WidgetKind::Checkbox, _) => "a boolean",
            (WidgetKind::Radio | WidgetKind::Dropdown, _) => "an option index",
            (WidgetKind::Signature | WidgetKind::Image, _) => "a base64 encoded image",
        };

        Err(FormError::InvalidValue {
            key: self.key.clone(),
            reason: format!("expected {expected}, got {}", value.to_json()),
        })
    }

    /// Check the value against constraints declared by the document
    pub fn validate_constants(&self) -> Result<()> {
        let violation = match (self.kind, &self.value) {
            (WidgetKind::Text, Some(FieldValue::Text(text))) => {
                match self.constants.max_length {
                    Some(max) if text.chars().count() > max => Some(format!(
                        "{} characters exceed the maximum length of {max}",
                        text.chars().count()
                    )),
                    _ => None,
                }
            }
            (WidgetKind::Radio | WidgetKind::Dropdown, Some(FieldValue::Index(index))) => {
                let count = self.option_count();
                (*index >= count)
                    .then(|| format!("option {index} is out of range for {count} options"))
            }
            _ => None,
        };

        match violation {
            Some(reason) => Err(FormError::ConstraintViolation {
                key: self.key.clone(),
                reason,
            }),
            None => Ok(()),
        }
    }

    /// Check font, size, color and wrap length of a text widget
    pub fn validate_text_attributes(&self) -> Result<()> {
        match self.kind {
            WidgetKind::Text | WidgetKind::Dropdown => {}
            WidgetKind::Checkbox
            | WidgetKind::Radio
            | WidgetKind::Signature
            | WidgetKind::Image => return Ok(()),
        }

        if let Some(font) = &self.style.font {
            if !is_known_font(font) {
                return Err(FormError::InvalidFont {
                    key: self.key.clone(),
                    font: font.clone(),
                });
            }
        }
        if let Some(size) = self.style.font_size {
            if !(size > 0.0 && size.is_finite()) {
                return Err(FormError::InvalidFontSize {
                    key: self.key.clone(),
                    size,
                });
            }
        }
        if let Some(color) = self.style.font_color {
            if !color.is_valid() {
                return Err(FormError::InvalidColor {
                    key: self.key.clone(),
                });
            }
        }
        if self.style.wrap_length == Some(0) {
            return Err(FormError::InvalidWrapLength {
                key: self.key.clone(),
            });
        }
        Ok(())
    }

    /// Run every validation
    pub fn validate(&self) -> Result<()> {
        self.validate_value()?;
        self.validate_constants()?;
        self.validate_text_attributes()
    }
}

/// Decode a base64 image value, checking the result is JPEG or PNG
pub(crate) fn decode_image(key: &str, data: &str) -> Result<Vec<u8>> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| FormError::InvalidImage(format!("{key}: {e}")))?;
    if !pdf_core::is_image(&bytes) {
        return Err(FormError::InvalidImage(format!(
            "{key}: data is neither JPEG nor PNG"
        )));
    }
    Ok(bytes)
}
