//! Process-wide font registry
//!
//! The 14 standard PDF fonts are always available. TrueType fonts can be
//! registered under a name and are embedded wherever they are drawn.
//! Registering the same name twice replaces the earlier font: concurrent
//! registrations of one name race and the last writer wins.

use crate::{FormError, Result};
use once_cell::sync::Lazy;
use pdf_core::{CanvasFont, FontData, StandardFont};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

static REGISTRY: Lazy<RwLock<HashMap<String, Arc<FontData>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Register a TrueType font program under `name`
///
/// Returns `false`, leaving the registry untouched, when the bytes do not
/// parse as a font.
pub fn register_font(name: &str, ttf_data: &[u8]) -> bool {
    let font = match FontData::from_ttf(name, ttf_data) {
        Ok(font) => font,
        Err(e) => {
            log::warn!("not registering font {name}: {e}");
            return false;
        }
    };

    let mut registry = REGISTRY.write().unwrap_or_else(|e| e.into_inner());
    if registry.insert(name.to_string(), Arc::new(font)).is_some() {
        log::debug!("font {name} re-registered, replacing the previous program");
    }
    true
}

/// Registered TrueType font for `name`
pub fn registered_font(name: &str) -> Option<Arc<FontData>> {
    let registry = REGISTRY.read().unwrap_or_else(|e| e.into_inner());
    registry.get(name).cloned()
}

/// Whether `name` is a standard PDF font or a registered font
pub fn is_known_font(name: &str) -> bool {
    StandardFont::from_name(name).is_some() || registered_font(name).is_some()
}

/// Drawing font for `name`; `key` names the field or instruction in errors
pub(crate) fn resolve_font(key: &str, name: &str) -> Result<CanvasFont> {
    if let Some(font) = StandardFont::from_name(name) {
        return Ok(CanvasFont::Standard(font));
    }
    registered_font(name)
        .map(CanvasFont::Embedded)
        .ok_or_else(|| FormError::InvalidFont {
            key: key.to_string(),
            font: name.to_string(),
        })
}
