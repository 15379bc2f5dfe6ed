//! Page extraction, concatenation and version handling

use crate::{page_error, FormError, Result};
use lopdf::{Dictionary, Object, ObjectId};
use pdf_core::{ObjectCopier, PdfDocument};

/// Header versions recognized by [`version`] and accepted by
/// [`change_version`]
pub const SUPPORTED_VERSIONS: [&str; 9] = [
    "1.0", "1.1", "1.2", "1.3", "1.4", "1.5", "1.6", "1.7", "2.0",
];

/// Page attributes a page may inherit from the page tree
const INHERITABLE: [&str; 4] = ["MediaBox", "CropBox", "Resources", "Rotate"];

/// Maximum `/Parent` hops when looking for a field's root
const MAX_FIELD_DEPTH: usize = 32;

/// Document version: the catalog `/Version` when present and recognized,
/// otherwise the header token
pub fn version(document: &PdfDocument) -> Option<String> {
    let catalog_version = document
        .catalog_id()
        .ok()
        .and_then(|catalog| document.get(catalog, b"Version"))
        .and_then(|v| v.as_name_str().ok())
        .filter(|v| SUPPORTED_VERSIONS.contains(v));

    catalog_version
        .or_else(|| Some(document.version()).filter(|v| SUPPORTED_VERSIONS.contains(v)))
        .map(str::to_string)
}

/// Copy of `document` with its version token rewritten to `target`
pub fn change_version(document: &PdfDocument, target: &str) -> Result<PdfDocument> {
    if !SUPPORTED_VERSIONS.contains(&target) {
        return Err(FormError::InvalidVersion(target.to_string()));
    }

    let mut doc = document.clone();
    doc.inner_mut().version = target.to_string();
    let catalog = doc.catalog_id()?;
    if doc.dict(catalog)?.has(b"Version") {
        doc.set(catalog, "Version", Object::Name(target.as_bytes().to_vec()))?;
    }
    Ok(doc)
}

/// Single-page document holding page `page` (1-indexed) with its
/// annotations and the fields they belong to
///
/// Objects are copied in a fixed depth-first order, so the same page
/// extracted from two documents with identical page graphs serializes to
/// identical bytes.
pub fn extract_page(document: &PdfDocument, page: usize) -> Result<PdfDocument> {
    let page_id = document.page_id(page).map_err(page_error)?;
    let annotations = document.annotations(page_id);

    let mut out = PdfDocument::with_version(document.version());
    let root = out.pages_root_id()?;

    let (new_page, inherited, fields, form_entries) = {
        let mut copier = ObjectCopier::new(document.inner(), out.inner_mut());
        for node in document.page_tree_nodes() {
            copier.redirect(node, root);
        }
        for other in document.page_ids().into_iter().filter(|id| *id != page_id) {
            copier.drop_object(other);
            for annot in document.annotations(other) {
                if !annotations.contains(&annot) {
                    copier.drop_object(annot);
                }
            }
        }

        let new_page = copier.copy_object(page_id)?;
        let inherited = inherited_attributes(document, page_id, &mut copier)?;
        let fields = copied_fields(document, page_id, &copier);

        let mut form_entries = Vec::new();
        if let Some(acroform) = document.acroform() {
            for (key, value) in acroform.iter() {
                if key.as_slice() == b"Fields" || key.as_slice() == b"CO" {
                    continue;
                }
                form_entries.push((key.clone(), copier.copy_value(value)?));
            }
        }
        (new_page, inherited, fields, form_entries)
    };

    for (key, value) in inherited {
        out.set(new_page, key, value)?;
    }
    out.push_page(new_page)?;

    if document.acroform().is_some() || !fields.is_empty() {
        let mut acroform = Dictionary::new();
        acroform.set("Fields", fields.into_iter().map(Object::Reference).collect::<Vec<_>>());
        for (key, value) in form_entries {
            acroform.set(key, value);
        }
        let acroform_id = out.add_object(acroform);
        let catalog = out.catalog_id()?;
        out.set(catalog, "AcroForm", acroform_id)?;
    }

    log::debug!("extracted page {page} of {}", document.page_count());
    Ok(out)
}

/// `first` followed by every page of `second`, fields included
///
/// Field names are not made unique: a name present in both documents is
/// ambiguous for later fills, and the widget model keeps the first.
pub fn concatenate(first: &PdfDocument, second: &PdfDocument) -> Result<PdfDocument> {
    if second.page_count() == 0 {
        return Ok(first.clone());
    }
    if first.page_count() == 0 {
        return Ok(second.clone());
    }

    let mut out = first.clone();
    let root = out.pages_root_id()?;

    let (pages, fields, form_entries) = {
        let mut copier = ObjectCopier::new(second.inner(), out.inner_mut());
        for node in second.page_tree_nodes() {
            copier.redirect(node, root);
        }

        let mut pages = Vec::new();
        let mut fields: Vec<ObjectId> = Vec::new();
        for page_id in second.page_ids() {
            let new_page = copier.copy_object(page_id)?;
            let inherited = inherited_attributes(second, page_id, &mut copier)?;
            pages.push((new_page, inherited));
            for field in copied_fields(second, page_id, &copier) {
                if !fields.contains(&field) {
                    fields.push(field);
                }
            }
        }

        let mut form_entries = Vec::new();
        if let Some(acroform) = second.acroform() {
            for key in [&b"DR"[..], b"NeedAppearances"] {
                if let Ok(value) = acroform.get(key) {
                    form_entries.push((key.to_vec(), copier.copy_value(second.resolve(value))?));
                }
            }
        }
        (pages, fields, form_entries)
    };

    for (page_id, inherited) in pages {
        for (key, value) in inherited {
            out.set(page_id, key, value)?;
        }
        out.push_page(page_id)?;
    }

    if !fields.is_empty() || !form_entries.is_empty() {
        merge_acroform(&mut out, fields, form_entries)?;
    }

    log::info!(
        "concatenated {} + {} pages",
        first.page_count(),
        second.page_count()
    );
    Ok(out)
}

/// Inheritable attributes the page does not carry itself, copied into the
/// target so the page keeps its geometry and resources outside its tree
fn inherited_attributes(
    document: &PdfDocument,
    page_id: ObjectId,
    copier: &mut ObjectCopier,
) -> Result<Vec<(&'static str, Object)>> {
    let own = document.dict(page_id)?;
    let mut attributes = Vec::new();
    for key in INHERITABLE {
        if own.has(key.as_bytes()) {
            continue;
        }
        if let Some(value) = document.inherited(page_id, key.as_bytes()) {
            attributes.push((key, copier.copy_value(value)?));
        }
    }
    Ok(attributes)
}

/// Copied root fields of the page's widget annotations, in annotation order
fn copied_fields(document: &PdfDocument, page_id: ObjectId, copier: &ObjectCopier) -> Vec<ObjectId> {
    let mut fields = Vec::new();
    for annot in document.annotations(page_id) {
        let is_widget = document
            .get(annot, b"Subtype")
            .and_then(|s| s.as_name().ok())
            .map(|s| s == b"Widget")
            .unwrap_or(false);
        if !is_widget {
            continue;
        }

        let mut root = annot;
        for _ in 0..MAX_FIELD_DEPTH {
            match document.parent(root) {
                Some(parent) => root = parent,
                None => break,
            }
        }
        if let Some(copied) = copier.mapped(root) {
            if !fields.contains(&copied) {
                fields.push(copied);
            }
        }
    }
    fields
}

fn merge_acroform(
    out: &mut PdfDocument,
    fields: Vec<ObjectId>,
    entries: Vec<(Vec<u8>, Object)>,
) -> Result<()> {
    let acroform_id = out.ensure_acroform()?;
    let mut acroform = out.dict(acroform_id)?.clone();

    let mut all_fields = match acroform.get(b"Fields").map(|f| out.resolve(f)) {
        Ok(Object::Array(existing)) => existing.clone(),
        _ => Vec::new(),
    };
    all_fields.extend(fields.into_iter().map(Object::Reference));
    acroform.set("Fields", all_fields);

    for (key, value) in entries {
        if key == b"DR" {
            if let Object::Dictionary(incoming) = value {
                let dr = match acroform.get(b"DR").map(|dr| out.resolve(dr)) {
                    Ok(Object::Dictionary(existing)) => merge_resources(out, existing.clone(), &incoming),
                    _ => incoming,
                };
                acroform.set("DR", dr);
            }
        } else if !acroform.has(&key) {
            acroform.set(key, value);
        }
    }

    *out.dict_mut(acroform_id)? = acroform;
    Ok(())
}

/// Add entries of `incoming` resource categories missing from `existing`
fn merge_resources(out: &PdfDocument, mut existing: Dictionary, incoming: &Dictionary) -> Dictionary {
    for (category, entries) in incoming.iter() {
        let Ok(entries) = out.resolve(entries).as_dict() else {
            continue;
        };
        let mut merged = match existing.get(category).map(|c| out.resolve(c)) {
            Ok(Object::Dictionary(current)) => current.clone(),
            _ => Dictionary::new(),
        };
        for (name, value) in entries.iter() {
            if !merged.has(name) {
                merged.set(name.clone(), value.clone());
            }
        }
        existing.set(category.clone(), merged);
    }
    existing
}
