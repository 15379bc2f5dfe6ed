//! Deep copying of object subgraphs between documents

use crate::{PdfError, Result};
use lopdf::{Document, Object, ObjectId};
use std::collections::{HashMap, HashSet};

/// Copies objects from a source document into a target document,
/// renumbering them and following every reference.
///
/// Objects are copied depth-first in dictionary order, so copying the same
/// subgraph into two empty documents produces identical numbering. Each
/// source object is copied once; cycles are broken by reserving the target
/// ID before recursing.
pub struct ObjectCopier<'a> {
    source: &'a Document,
    target: &'a mut Document,
    id_map: HashMap<ObjectId, ObjectId>,
    dropped: HashSet<ObjectId>,
}

impl<'a> ObjectCopier<'a> {
    pub fn new(source: &'a Document, target: &'a mut Document) -> Self {
        Self {
            source,
            target,
            id_map: HashMap::new(),
            dropped: HashSet::new(),
        }
    }

    /// Make references to `source_id` point at an existing target object
    /// instead of copying it
    pub fn redirect(&mut self, source_id: ObjectId, target_id: ObjectId) {
        self.id_map.insert(source_id, target_id);
    }

    /// Never copy `source_id`; references to it are removed from arrays
    /// and dictionaries
    pub fn drop_object(&mut self, source_id: ObjectId) {
        self.dropped.insert(source_id);
    }

    /// Target ID of an already copied (or redirected) object
    pub fn mapped(&self, source_id: ObjectId) -> Option<ObjectId> {
        self.id_map.get(&source_id).copied()
    }

    /// Deep copy an object, returning its ID in the target document
    pub fn copy_object(&mut self, source_id: ObjectId) -> Result<ObjectId> {
        if let Some(target_id) = self.id_map.get(&source_id) {
            return Ok(*target_id);
        }
        if self.dropped.contains(&source_id) {
            return Err(PdfError::ParseError(format!(
                "Object {source_id:?} is excluded from the copy"
            )));
        }

        // Reserve the ID first: page -> annotation -> page cycles come back here
        let new_id = self.target.add_object(Object::Null);
        self.id_map.insert(source_id, new_id);

        let obj = match self.source.get_object(source_id) {
            Ok(obj) => obj.clone(),
            Err(_) => {
                log::warn!("dangling reference {source_id:?} copied as null");
                Object::Null
            }
        };
        let new_obj = self.remap(obj)?.unwrap_or(Object::Null);

        match self.target.objects.get_mut(&new_id) {
            Some(slot) => *slot = new_obj,
            None => {
                return Err(PdfError::ParseError(format!(
                    "Reserved object {new_id:?} vanished during copy"
                )))
            }
        }

        Ok(new_id)
    }

    /// Copy a direct value, remapping any references inside it
    pub fn copy_value(&mut self, obj: &Object) -> Result<Object> {
        Ok(self.remap(obj.clone())?.unwrap_or(Object::Null))
    }

    /// Remap references inside `obj`; `None` means the value referred to
    /// a dropped object and must be removed from its container
    fn remap(&mut self, obj: Object) -> Result<Option<Object>> {
        match obj {
            Object::Reference(id) => {
                if self.dropped.contains(&id) {
                    return Ok(None);
                }
                Ok(Some(Object::Reference(self.copy_object(id)?)))
            }
            Object::Array(arr) => {
                let mut new_arr = Vec::with_capacity(arr.len());
                for item in arr {
                    if let Some(item) = self.remap(item)? {
                        new_arr.push(item);
                    }
                }
                Ok(Some(Object::Array(new_arr)))
            }
            Object::Dictionary(dict) => {
                let mut new_dict = lopdf::Dictionary::new();
                for (key, value) in dict.iter() {
                    if let Some(value) = self.remap(value.clone())? {
                        new_dict.set(key.clone(), value);
                    }
                }
                Ok(Some(Object::Dictionary(new_dict)))
            }
            Object::Stream(mut stream) => {
                let mut new_dict = lopdf::Dictionary::new();
                for (key, value) in stream.dict.iter() {
                    if let Some(value) = self.remap(value.clone())? {
                        new_dict.set(key.clone(), value);
                    }
                }
                stream.dict = new_dict;
                Ok(Some(Object::Stream(stream)))
            }
            other => Ok(Some(other)),
        }
    }
}
