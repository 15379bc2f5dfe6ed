//! JSON schema and sample data derived from the widget model

use crate::widget::{Widget, WidgetKind};
use crate::{FormError, Result};
use indexmap::IndexMap;
use serde_json::{json, Map, Value};

/// Placeholder used for text samples, cut to the field's maximum length
const SAMPLE_TEXT: &str = "sample";

/// Object schema with one property per widget
///
/// Text fields are strings (with `maxLength` when the document limits
/// them), checkboxes booleans, radio groups and dropdowns integers indexing
/// their options, and signature or image fields base64 strings.
pub fn generate_schema(widgets: &IndexMap<String, Widget>) -> Value {
    let properties: Map<String, Value> = widgets
        .iter()
        .map(|(key, widget)| (key.clone(), property(widget)))
        .collect();

    json!({
        "type": "object",
        "properties": properties,
    })
}

fn property(widget: &Widget) -> Value {
    match widget.kind {
        WidgetKind::Text => match widget.constants.max_length {
            Some(max) => json!({ "type": "string", "maxLength": max }),
            None => json!({ "type": "string" }),
        },
        WidgetKind::Checkbox => json!({ "type": "boolean" }),
        WidgetKind::Radio | WidgetKind::Dropdown => json!({
            "type": "integer",
            "minimum": 0,
            // -1 when there are no options, so no index validates
            "maximum": widget.option_count() as i64 - 1,
        }),
        WidgetKind::Signature | WidgetKind::Image => json!({ "type": "string" }),
    }
}

/// One legal value per widget
///
/// Choice widgets without options have no legal value and are left out.
pub fn sample_data(widgets: &IndexMap<String, Widget>) -> Map<String, Value> {
    widgets
        .iter()
        .filter_map(|(key, widget)| Some((key.clone(), sample(widget)?)))
        .collect()
}

fn sample(widget: &Widget) -> Option<Value> {
    let value = match widget.kind {
        WidgetKind::Text => {
            let limit = widget.constants.max_length.unwrap_or(usize::MAX);
            Value::from(SAMPLE_TEXT.chars().take(limit).collect::<String>())
        }
        WidgetKind::Checkbox => Value::from(false),
        WidgetKind::Radio | WidgetKind::Dropdown if widget.option_count() == 0 => return None,
        WidgetKind::Radio | WidgetKind::Dropdown => Value::from(0),
        WidgetKind::Signature | WidgetKind::Image => Value::from(""),
    };
    Some(value)
}

/// Check `data` against a schema from [`generate_schema`]
///
/// Keys the schema does not describe are accepted; filling ignores them.
pub fn validate_data(schema: &Value, data: &Value) -> Result<()> {
    let Some(data) = data.as_object() else {
        return Err(FormError::InvalidFormData(format!(
            "expected a JSON object, got {data}"
        )));
    };
    let properties = schema.get("properties").and_then(Value::as_object);

    for (key, value) in data {
        let Some(property) = properties.and_then(|p| p.get(key)) else {
            continue;
        };
        check_property(key, property, value)?;
    }
    Ok(())
}

fn check_property(key: &str, property: &Value, value: &Value) -> Result<()> {
    let invalid = |reason: String| FormError::InvalidValue {
        key: key.to_string(),
        reason,
    };
    let violation = |reason: String| FormError::ConstraintViolation {
        key: key.to_string(),
        reason,
    };

    match property.get("type").and_then(Value::as_str) {
        Some("string") => {
            let text = value
                .as_str()
                .ok_or_else(|| invalid(format!("expected a string, got {value}")))?;
            if let Some(max) = property.get("maxLength").and_then(Value::as_u64) {
                let length = text.chars().count() as u64;
                if length > max {
                    return Err(violation(format!("length {length} exceeds maxLength {max}")));
                }
            }
        }
        Some("boolean") => {
            if !value.is_boolean() {
                return Err(invalid(format!("expected a boolean, got {value}")));
            }
        }
        Some("integer") => {
            let number = value
                .as_i64()
                .ok_or_else(|| invalid(format!("expected an integer, got {value}")))?;
            let minimum = property.get("minimum").and_then(Value::as_i64);
            let maximum = property.get("maximum").and_then(Value::as_i64);
            if minimum.is_some_and(|min| number < min) || maximum.is_some_and(|max| number > max) {
                return Err(violation(format!(
                    "{number} is outside [{}, {}]",
                    minimum.unwrap_or(i64::MIN),
                    maximum.unwrap_or(i64::MAX)
                )));
            }
        }
        _ => {}
    }
    Ok(())
}
