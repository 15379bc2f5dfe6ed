//! PDF Document wrapper

use crate::{PdfError, Result};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use serde::{Deserialize, Serialize};

/// Page size used when no `/MediaBox` can be found (A4, in points)
pub const DEFAULT_PAGE_SIZE: (f64, f64) = (595.28, 841.89);

/// Maximum number of `/Parent` or reference hops followed before giving up
const MAX_CHAIN_DEPTH: usize = 32;

/// RGB Color (values 0.0 - 1.0)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    /// Create a new RGB color (values 0.0 - 1.0)
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Create color from RGB values (0-255)
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }

    /// Black color
    pub fn black() -> Self {
        Self::rgb(0.0, 0.0, 0.0)
    }

    /// White color
    pub fn white() -> Self {
        Self::rgb(1.0, 1.0, 1.0)
    }

    /// Red color
    pub fn red() -> Self {
        Self::rgb(1.0, 0.0, 0.0)
    }

    /// Green color
    pub fn green() -> Self {
        Self::rgb(0.0, 1.0, 0.0)
    }

    /// Blue color
    pub fn blue() -> Self {
        Self::rgb(0.0, 0.0, 1.0)
    }

    /// Whether every channel lies in `[0, 1]`
    pub fn is_valid(&self) -> bool {
        [self.r, self.g, self.b]
            .iter()
            .all(|c| (0.0..=1.0).contains(c))
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}

/// Read a numeric PDF object as `f64`
pub(crate) fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

/// PDF Document wrapper exposing the object graph as pages, annotations
/// and dictionaries with get/set access.
///
/// The wrapper is a value: cloning it clones the whole object graph, and
/// serialization never mutates it.
#[derive(Debug, Clone)]
pub struct PdfDocument {
    /// The underlying lopdf document
    inner: Document,
}

impl PdfDocument {
    /// Open a PDF document from bytes
    ///
    /// # Arguments
    /// * `data` - PDF file bytes
    pub fn open_from_bytes(data: &[u8]) -> Result<Self> {
        let inner = Document::load_mem(data).map_err(|e| PdfError::OpenError(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Wrap an already loaded lopdf document
    pub fn from_document(inner: Document) -> Self {
        Self { inner }
    }

    /// Create an empty document (catalog plus an empty page tree)
    pub fn with_version(version: &str) -> Self {
        let mut inner = Document::with_version(version);
        let pages_id = inner.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => Vec::<Object>::new(),
            "Count" => 0,
        });
        let catalog_id = inner.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        inner.trailer.set("Root", catalog_id);
        Self { inner }
    }

    /// Get a reference to the underlying lopdf document
    pub fn inner(&self) -> &Document {
        &self.inner
    }

    /// Get a mutable reference to the underlying lopdf document
    pub fn inner_mut(&mut self) -> &mut Document {
        &mut self.inner
    }

    /// Header version token as parsed by lopdf (e.g. "1.7")
    pub fn version(&self) -> &str {
        &self.inner.version
    }

    /// Serialize the document to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut doc = self.inner.clone();
        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)
            .map_err(|e| PdfError::SaveError(e.to_string()))?;
        Ok(buffer)
    }

    /// Get the number of pages in the document
    pub fn page_count(&self) -> usize {
        self.inner.get_pages().len()
    }

    /// Get all page object IDs in order
    pub fn page_ids(&self) -> Vec<ObjectId> {
        self.inner.get_pages().values().copied().collect()
    }

    /// Object ID of a page (1-indexed)
    pub fn page_id(&self, page: usize) -> Result<ObjectId> {
        let pages = self.inner.get_pages();
        u32::try_from(page)
            .ok()
            .and_then(|number| pages.get(&number).copied())
            .ok_or(PdfError::InvalidPage(page, pages.len()))
    }

    /// Widget and other annotations of a page, in `/Annots` order
    ///
    /// Only indirect annotations are returned; inline annotation
    /// dictionaries cannot be addressed and are skipped.
    pub fn annotations(&self, page_id: ObjectId) -> Vec<ObjectId> {
        let Some(annots) = self.get(page_id, b"Annots") else {
            return Vec::new();
        };
        let Ok(array) = annots.as_array() else {
            return Vec::new();
        };

        array
            .iter()
            .filter_map(|obj| match obj {
                Object::Reference(id) => Some(*id),
                _ => {
                    log::warn!("skipping inline annotation on page {page_id:?}");
                    None
                }
            })
            .collect()
    }

    /// Follow references until a direct object is reached
    pub fn resolve<'a>(&'a self, obj: &'a Object) -> &'a Object {
        let mut current = obj;
        for _ in 0..MAX_CHAIN_DEPTH {
            match current {
                Object::Reference(id) => match self.inner.get_object(*id) {
                    Ok(next) => current = next,
                    Err(_) => return &Object::Null,
                },
                _ => return current,
            }
        }
        current
    }

    /// Dictionary stored under `id`
    pub fn dict(&self, id: ObjectId) -> Result<&Dictionary> {
        match self.inner.get_object(id)? {
            Object::Dictionary(dict) => Ok(dict),
            Object::Stream(stream) => Ok(&stream.dict),
            _ => Err(PdfError::ParseError(format!(
                "Object {id:?} is not a dictionary"
            ))),
        }
    }

    /// Mutable dictionary stored under `id`
    pub fn dict_mut(&mut self, id: ObjectId) -> Result<&mut Dictionary> {
        match self.inner.get_object_mut(id)? {
            Object::Dictionary(dict) => Ok(dict),
            Object::Stream(stream) => Ok(&mut stream.dict),
            _ => Err(PdfError::ParseError(format!(
                "Object {id:?} is not a dictionary"
            ))),
        }
    }

    /// Entry `key` of the dictionary `id`, with references resolved
    pub fn get(&self, id: ObjectId, key: &[u8]) -> Option<&Object> {
        let dict = self.dict(id).ok()?;
        dict.get(key).ok().map(|obj| self.resolve(obj))
    }

    /// Entry `key` of the dictionary `id` or of its nearest `/Parent`
    /// ancestor carrying it
    pub fn inherited(&self, id: ObjectId, key: &[u8]) -> Option<&Object> {
        let mut current = id;
        for _ in 0..MAX_CHAIN_DEPTH {
            let dict = self.dict(current).ok()?;
            if let Ok(value) = dict.get(key) {
                return Some(self.resolve(value));
            }
            current = dict.get(b"Parent").ok()?.as_reference().ok()?;
        }
        None
    }

    /// `/Parent` reference of a dictionary, if any
    pub fn parent(&self, id: ObjectId) -> Option<ObjectId> {
        self.dict(id).ok()?.get(b"Parent").ok()?.as_reference().ok()
    }

    /// Set `key` to `value` on the dictionary `id`
    pub fn set<K, V>(&mut self, id: ObjectId, key: K, value: V) -> Result<()>
    where
        K: Into<Vec<u8>>,
        V: Into<Object>,
    {
        self.dict_mut(id)?.set(key, value);
        Ok(())
    }

    /// Add a new indirect object
    pub fn add_object<T: Into<Object>>(&mut self, object: T) -> ObjectId {
        self.inner.add_object(object)
    }

    /// Catalog (`/Root`) object ID
    pub fn catalog_id(&self) -> Result<ObjectId> {
        self.inner
            .trailer
            .get(b"Root")
            .and_then(|root| root.as_reference())
            .map_err(|_| PdfError::ParseError("Document trailer missing Root entry".to_string()))
    }

    /// Root of the page tree
    pub fn pages_root_id(&self) -> Result<ObjectId> {
        let catalog = self.dict(self.catalog_id()?)?;
        catalog
            .get(b"Pages")
            .and_then(|pages| pages.as_reference())
            .map_err(|_| PdfError::ParseError("Catalog missing Pages entry".to_string()))
    }

    /// Every `/Type /Pages` node reachable from the page tree root
    pub fn page_tree_nodes(&self) -> Vec<ObjectId> {
        let mut nodes = Vec::new();
        let Ok(root) = self.pages_root_id() else {
            return nodes;
        };

        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if nodes.contains(&id) || nodes.len() > self.inner.objects.len() {
                continue;
            }
            let Ok(dict) = self.dict(id) else { continue };
            let is_node = dict
                .get(b"Type")
                .and_then(|t| t.as_name())
                .map(|t| t == b"Pages")
                .unwrap_or(false);
            if !is_node {
                continue;
            }
            nodes.push(id);
            if let Ok(kids) = dict.get(b"Kids").and_then(|k| k.as_array()) {
                stack.extend(kids.iter().filter_map(|k| k.as_reference().ok()));
            }
        }
        nodes
    }

    /// Interactive form dictionary, if the document has one
    pub fn acroform(&self) -> Option<&Dictionary> {
        let catalog_id = self.catalog_id().ok()?;
        self.get(catalog_id, b"AcroForm")?.as_dict().ok()
    }

    /// Object ID of the interactive form dictionary, creating it when
    /// missing and moving an inline one into its own object
    pub fn ensure_acroform(&mut self) -> Result<ObjectId> {
        let catalog_id = self.catalog_id()?;
        let existing = self.dict(catalog_id)?.get(b"AcroForm").ok().cloned();

        let acroform_id = match existing {
            Some(Object::Reference(id)) => return Ok(id),
            Some(Object::Dictionary(dict)) => self.inner.add_object(dict),
            _ => self.inner.add_object(dictionary! {
                "Fields" => Vec::<Object>::new(),
            }),
        };
        self.set(catalog_id, "AcroForm", acroform_id)?;
        Ok(acroform_id)
    }

    /// Page size in points (width, height), following `/MediaBox`
    /// inheritance through the page tree
    pub fn page_size(&self, page_id: ObjectId) -> Result<(f64, f64)> {
        let [x1, y1, x2, y2] = self.media_box(page_id)?;
        Ok(((x2 - x1).abs(), (y2 - y1).abs()))
    }

    /// Inherited `/MediaBox` of a page, falling back to A4
    pub fn media_box(&self, page_id: ObjectId) -> Result<[f64; 4]> {
        let Some(media_box) = self
            .inherited(page_id, b"MediaBox")
            .or_else(|| self.inherited(page_id, b"CropBox"))
        else {
            log::warn!("page {page_id:?} has no MediaBox, assuming A4");
            return Ok([0.0, 0.0, DEFAULT_PAGE_SIZE.0, DEFAULT_PAGE_SIZE.1]);
        };

        let values: Vec<f64> = media_box
            .as_array()
            .map_err(|_| PdfError::ParseError("MediaBox is not an array".to_string()))?
            .iter()
            .filter_map(|v| number(self.resolve(v)))
            .collect();

        match values.as_slice() {
            [x1, y1, x2, y2] => Ok([*x1, *y1, *x2, *y2]),
            _ => Err(PdfError::ParseError("Invalid MediaBox format".to_string())),
        }
    }

    /// Resolved copy of a page's (possibly inherited) `/Resources`
    ///
    /// Nested resource categories stored as references are resolved to
    /// owned dictionaries so the copy can be modified and written back
    /// to the page without touching objects shared with other pages.
    pub fn page_resources(&self, page_id: ObjectId) -> Dictionary {
        let mut resources = match self.inherited(page_id, b"Resources") {
            Some(Object::Dictionary(dict)) => dict.clone(),
            _ => Dictionary::new(),
        };

        for (_, value) in resources.iter_mut() {
            if let Object::Reference(id) = *value {
                if let Ok(Object::Dictionary(dict)) = self.inner.get_object(id) {
                    *value = Object::Dictionary(dict.clone());
                }
            }
        }
        resources
    }

    /// Register an XObject in the page's own `/Resources` under a fresh
    /// name starting with `prefix`, returning that name
    pub fn add_page_xobject(
        &mut self,
        page_id: ObjectId,
        prefix: &str,
        xobject_id: ObjectId,
    ) -> Result<String> {
        let mut resources = self.page_resources(page_id);
        let mut xobjects = match resources.get(b"XObject") {
            Ok(Object::Dictionary(dict)) => dict.clone(),
            _ => Dictionary::new(),
        };

        let mut n = 1;
        let name = loop {
            let candidate = format!("{prefix}{n}");
            if !xobjects.has(candidate.as_bytes()) {
                break candidate;
            }
            n += 1;
        };

        xobjects.set(name.as_bytes(), Object::Reference(xobject_id));
        resources.set("XObject", Object::Dictionary(xobjects));
        self.set(page_id, "Resources", Object::Dictionary(resources))?;

        Ok(name)
    }

    /// Decompressed content of a page, all content streams concatenated
    pub fn page_content(&self, page_id: ObjectId) -> Vec<u8> {
        let Some(contents) = self.get(page_id, b"Contents") else {
            return Vec::new();
        };

        let streams: Vec<&Object> = match contents {
            Object::Array(arr) => arr.iter().map(|o| self.resolve(o)).collect(),
            other => vec![other],
        };

        let mut combined = Vec::new();
        for obj in streams {
            if let Object::Stream(stream) = obj {
                let data = stream
                    .decompressed_content()
                    .unwrap_or_else(|_| stream.content.clone());
                combined.extend_from_slice(&data);
                combined.push(b'\n');
            }
        }
        combined
    }

    /// Draw `content` on top of a page
    ///
    /// The existing content is wrapped in `q ... Q` so graphics state it
    /// leaves behind cannot leak into the new layer. Existing streams are
    /// referenced, not rewritten.
    pub fn append_page_content(&mut self, page_id: ObjectId, content: Vec<u8>) -> Result<()> {
        let current = self.dict(page_id)?.get(b"Contents").ok().cloned();
        let existing: Vec<Object> = match current {
            Some(Object::Array(arr)) => arr,
            Some(Object::Reference(id)) => match self.inner.get_object(id) {
                Ok(Object::Array(arr)) => arr.clone(),
                _ => vec![Object::Reference(id)],
            },
            Some(Object::Stream(stream)) => vec![Object::Reference(self.inner.add_object(stream))],
            _ => Vec::new(),
        };

        let mut contents = Vec::with_capacity(existing.len() + 3);
        if !existing.is_empty() {
            let save = self
                .inner
                .add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
            let restore = self
                .inner
                .add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));
            contents.push(Object::Reference(save));
            contents.extend(existing);
            contents.push(Object::Reference(restore));
        }
        let overlay = self.inner.add_object(Stream::new(Dictionary::new(), content));
        contents.push(Object::Reference(overlay));

        self.set(page_id, "Contents", Object::Array(contents))
    }

    /// Append a page (already present as an object) to the page tree root
    pub fn push_page(&mut self, page_id: ObjectId) -> Result<()> {
        let pages_id = self.pages_root_id()?;
        let pages_dict = self.dict_mut(pages_id)?;

        let mut kids = pages_dict
            .get(b"Kids")
            .and_then(|k| k.as_array())
            .cloned()
            .unwrap_or_default();
        kids.push(Object::Reference(page_id));
        let count = pages_dict
            .get(b"Count")
            .and_then(|c| c.as_i64())
            .unwrap_or(0);

        pages_dict.set("Kids", Object::Array(kids));
        pages_dict.set("Count", count + 1);
        self.set(page_id, "Parent", pages_id)
    }
}
