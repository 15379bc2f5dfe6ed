//! Form-wide options

use crate::fonts::is_known_font;
use crate::{FormError, Result};
use pdf_core::Color;
use serde::{Deserialize, Serialize};

/// Options applied when a form is loaded
///
/// The global text style fills in whatever a text widget's own default
/// appearance string leaves unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormOptions {
    /// Font for text widgets: a standard PDF font or a registered font name
    pub global_font: String,
    /// Font size for text widgets in points
    pub global_font_size: f32,
    /// Text color for text widgets
    pub global_font_color: Color,
    /// Read field names and flags one level up, on the annotation's parent
    pub sejda: bool,
    /// Ask viewers to regenerate field appearances
    pub need_appearances: bool,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            global_font: "Helvetica".to_string(),
            global_font_size: 12.0,
            global_font_color: Color::black(),
            sejda: false,
            need_appearances: true,
        }
    }
}

impl FormOptions {
    /// Parse options from JSON; missing keys take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Check the global text style
    pub fn validate(&self) -> Result<()> {
        const KEY: &str = "<global>";
        if !is_known_font(&self.global_font) {
            return Err(FormError::InvalidFont {
                key: KEY.to_string(),
                font: self.global_font.clone(),
            });
        }
        if !(self.global_font_size > 0.0 && self.global_font_size.is_finite()) {
            return Err(FormError::InvalidFontSize {
                key: KEY.to_string(),
                size: self.global_font_size,
            });
        }
        if !self.global_font_color.is_valid() {
            return Err(FormError::InvalidColor {
                key: KEY.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_json_fills_defaults() {
        let options = FormOptions::from_json(r#"{ "sejda": true, "global_font_size": 9 }"#)
            .expect("Failed to parse options");

        assert_eq!(
            options,
            FormOptions {
                sejda: true,
                global_font_size: 9.0,
                ..FormOptions::default()
            }
        );
    }

    #[test]
    fn test_from_json_rejects_bad_style() {
        assert!(matches!(
            FormOptions::from_json(r#"{ "global_font": "Comic Sans" }"#),
            Err(FormError::InvalidFont { .. })
        ));
        assert!(matches!(
            FormOptions::from_json(r#"{ "global_font_size": 0 }"#),
            Err(FormError::InvalidFontSize { .. })
        ));
        assert!(matches!(
            FormOptions::from_json(r#"{ "global_font_color": { "r": 2, "g": 0, "b": 0 } }"#),
            Err(FormError::InvalidColor { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_nan_and_infinite_sizes() {
        for size in [f32::NAN, f32::INFINITY, -0.0] {
            let options = FormOptions {
                global_font_size: size,
                ..FormOptions::default()
            };
            assert!(matches!(
                options.validate(),
                Err(FormError::InvalidFontSize { .. })
            ));
        }
    }

    #[test]
    fn test_from_json_rejects_malformed() {
        assert!(matches!(
            FormOptions::from_json("[1, 2]"),
            Err(FormError::Json(_))
        ));
    }
}
