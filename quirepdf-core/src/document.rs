//! Document lifecycle and object handles
//!
//! A [`Document`] is a cheap handle over shared inner state (the object
//! store, the page tree root, pending foreign imports, metadata). Interior
//! mutability lets a page list, any number of object handles, and the
//! document itself be live at once, and `Rc::strong_count` doubles as the
//! observable outstanding-reference count that the cross-document import
//! protocol relies on.

use crate::error::{PdfError, Result};
use crate::import::{self, DeferredImport};
use crate::objects::{Dictionary, Object, ObjectId, Stream};
use crate::pages::PageList;
use crate::store::ObjectStore;
use crate::{reader, tree, writer};
use chrono::{DateTime, Utc};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::rc::Rc;
use tracing::debug;

pub(crate) struct DocumentInner {
    pub(crate) store: ObjectStore,
    pub(crate) catalog_id: ObjectId,
    pub(crate) pages_root: ObjectId,
    pub(crate) deferred: HashMap<ObjectId, DeferredImport>,
    pub(crate) metadata: DocumentMetadata,
}

/// Metadata written to the document's Info dictionary.
#[derive(Debug, Clone)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<DateTime<Utc>>,
    pub modification_date: Option<DateTime<Utc>>,
}

impl Default for DocumentMetadata {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            title: None,
            author: None,
            subject: None,
            keywords: None,
            creator: Some("quirepdf".to_string()),
            producer: Some(format!("quirepdf v{}", env!("CARGO_PKG_VERSION"))),
            creation_date: Some(now),
            modification_date: Some(now),
        }
    }
}

/// A PDF document: an indirect object store plus the page tree built on
/// top of it.
///
/// # Example
///
/// ```rust
/// use quirepdf::Document;
///
/// let doc = Document::new();
/// doc.add_blank_page(612.0, 792.0).unwrap();
/// assert_eq!(doc.pages().len(), 1);
/// ```
pub struct Document {
    pub(crate) inner: Rc<RefCell<DocumentInner>>,
}

impl Clone for Document {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document: a catalog and a pageless tree root.
    pub fn new() -> Self {
        let mut store = ObjectStore::new();

        let pages_root = store.allocate();
        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name("Pages".to_string()));
        pages.set("Kids", Object::Array(Vec::new()));
        pages.set("Count", 0i64);
        store.insert_at(pages_root, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name("Catalog".to_string()));
        catalog.set("Pages", Object::Reference(pages_root));
        let catalog_id = store.put(Object::Dictionary(catalog));

        Self::from_parts(store, catalog_id, pages_root, DocumentMetadata::default())
    }

    /// Open a document from a file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }

    /// Open a document from serialized bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let (store, trailer) = reader::parse_document(data)?;

        let catalog_id = trailer
            .get("Root")
            .ok_or_else(|| PdfError::InvalidStructure("trailer has no Root entry".to_string()))?
            .expect_reference()?;

        let catalog = store
            .get(catalog_id)
            .ok_or(PdfError::InvalidReference(
                catalog_id.number(),
                catalog_id.generation(),
            ))?
            .expect_dict()?;

        let pages_root = catalog
            .get("Pages")
            .ok_or_else(|| {
                PdfError::InvalidStructure("catalog has no Pages entry".to_string())
            })?
            .expect_reference()?;

        let metadata = metadata_from_trailer(&store, &trailer);
        let mut store = store;
        // Metadata lives on the document from here on; the serializer
        // regenerates the Info dictionary at save time.
        if let Some(info_id) = trailer.get("Info").and_then(|obj| obj.as_reference()) {
            store.remove(info_id);
        }
        debug!(objects = store.len(), "opened document");
        Ok(Self::from_parts(store, catalog_id, pages_root, metadata))
    }

    fn from_parts(
        store: ObjectStore,
        catalog_id: ObjectId,
        pages_root: ObjectId,
        metadata: DocumentMetadata,
    ) -> Self {
        Self {
            inner: Rc::new(RefCell::new(DocumentInner {
                store,
                catalog_id,
                pages_root,
                deferred: HashMap::new(),
                metadata,
            })),
        }
    }

    /// The mutable page sequence of this document.
    pub fn pages(&self) -> PageList {
        PageList::new(Rc::clone(&self.inner))
    }

    /// Save the document to a file.
    ///
    /// Every outstanding foreign import is materialized first; the pins on
    /// their source documents are released here.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        import::materialize_all(&self.inner)?;
        let file = File::create(path)?;
        let inner = self.inner.borrow();
        let mut pdf_writer = writer::PdfWriter::new_with_writer(BufWriter::new(file));
        pdf_writer.write_document(&inner)
    }

    /// Serialize the document to bytes. Same materialization behavior as
    /// [`Document::save`].
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        import::materialize_all(&self.inner)?;
        let inner = self.inner.borrow();
        let mut buffer = Vec::new();
        {
            let mut pdf_writer = writer::PdfWriter::new_with_writer(&mut buffer);
            pdf_writer.write_document(&inner)?;
        }
        Ok(buffer)
    }

    /// Number of live strong handles on this document's state: documents,
    /// page lists, object handles, and pins held by other documents'
    /// deferred imports.
    pub fn handle_count(&self) -> usize {
        Rc::strong_count(&self.inner)
    }

    /// Create a stream object in this document's store.
    pub fn make_stream(&self, data: &[u8]) -> ObjectHandle {
        let id = self
            .inner
            .borrow_mut()
            .store
            .put(Stream::new(data.to_vec()).into_object());
        ObjectHandle {
            doc: Rc::clone(&self.inner),
            id,
        }
    }

    /// Append a new empty page of the given size and return a handle to
    /// it.
    pub fn add_blank_page(&self, width: f64, height: f64) -> Result<ObjectHandle> {
        let id = {
            let mut inner = self.inner.borrow_mut();

            let mut page = Dictionary::new();
            page.set("Type", Object::Name("Page".to_string()));
            page.set(
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(width),
                    Object::Real(height),
                ]),
            );
            page.set("Contents", Object::Array(Vec::new()));
            let id = inner.store.put(Object::Dictionary(page));

            let root = inner.pages_root;
            let mut ids = tree::flatten(&mut inner.store, root)?;
            ids.push(id);
            tree::rebuild(&mut inner.store, root, &ids)?;
            id
        };
        Ok(ObjectHandle {
            doc: Rc::clone(&self.inner),
            id,
        })
    }

    /// Handle to an arbitrary object in this document's store.
    pub fn object_handle(&self, id: ObjectId) -> ObjectHandle {
        ObjectHandle {
            doc: Rc::clone(&self.inner),
            id,
        }
    }

    pub fn metadata(&self) -> DocumentMetadata {
        self.inner.borrow().metadata.clone()
    }

    pub fn set_title(&self, title: impl Into<String>) {
        self.inner.borrow_mut().metadata.title = Some(title.into());
    }

    pub fn set_author(&self, author: impl Into<String>) {
        self.inner.borrow_mut().metadata.author = Some(author.into());
    }

    pub fn set_subject(&self, subject: impl Into<String>) {
        self.inner.borrow_mut().metadata.subject = Some(subject.into());
    }

    pub fn set_keywords(&self, keywords: impl Into<String>) {
        self.inner.borrow_mut().metadata.keywords = Some(keywords.into());
    }
}

fn metadata_from_trailer(store: &ObjectStore, trailer: &Dictionary) -> DocumentMetadata {
    let mut metadata = DocumentMetadata {
        creation_date: None,
        modification_date: None,
        ..DocumentMetadata::default()
    };

    let info = trailer
        .get("Info")
        .and_then(|obj| obj.as_reference())
        .and_then(|id| store.get(id))
        .and_then(|obj| obj.as_dict());

    if let Some(info) = info {
        let read = |key: &str| info.get(key).and_then(|o| o.as_string()).map(String::from);
        metadata.title = read("Title");
        metadata.author = read("Author");
        metadata.subject = read("Subject");
        metadata.keywords = read("Keywords");
        if let Some(creator) = read("Creator") {
            metadata.creator = Some(creator);
        }
        if let Some(producer) = read("Producer") {
            metadata.producer = Some(producer);
        }
    }

    metadata
}

/// A handle to one indirect object of one document.
///
/// Holding a handle keeps the owning document alive. Reads through the
/// handle materialize the object first if it is a foreign copy whose
/// import is still pending, so callers never observe the placeholder.
pub struct ObjectHandle {
    pub(crate) doc: Rc<RefCell<DocumentInner>>,
    pub(crate) id: ObjectId,
}

impl Clone for ObjectHandle {
    fn clone(&self) -> Self {
        Self {
            doc: Rc::clone(&self.doc),
            id: self.id,
        }
    }
}

impl PartialEq for ObjectHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.doc, &other.doc) && self.id == other.id
    }
}

impl fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectHandle").field("id", &self.id).finish()
    }
}

impl ObjectHandle {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// A document handle for the owner of this object.
    pub fn document(&self) -> Document {
        Document {
            inner: Rc::clone(&self.doc),
        }
    }

    /// The object's value. Materializes a pending foreign import first.
    pub fn object(&self) -> Result<Object> {
        import::materialize(&self.doc, self.id)?;
        let inner = self.doc.borrow();
        inner
            .store
            .get(self.id)
            .cloned()
            .ok_or(PdfError::InvalidReference(
                self.id.number(),
                self.id.generation(),
            ))
    }

    /// The object's dictionary. Fails with a type mismatch for non-dict,
    /// non-stream objects.
    pub fn dict(&self) -> Result<Dictionary> {
        let object = self.object()?;
        Ok(object.expect_dict()?.clone())
    }

    /// Whether this object is page-shaped.
    pub fn is_page(&self) -> Result<bool> {
        match self.object()? {
            Object::Dictionary(dict) => Ok(tree::is_page_dict(&dict)),
            _ => Ok(false),
        }
    }

    /// The resolved value of a dictionary entry (references are followed
    /// through the store). `None` when the key is absent.
    pub fn get(&self, key: &str) -> Result<Option<Object>> {
        let object = self.object()?;
        let dict = object.expect_dict()?;
        match dict.get(key) {
            None => Ok(None),
            Some(value) => {
                let inner = self.doc.borrow();
                Ok(Some(inner.store.resolve(value)?.clone()))
            }
        }
    }

    /// Set a dictionary entry in place.
    pub fn set_value(&self, key: &str, value: Object) -> Result<()> {
        import::materialize(&self.doc, self.id)?;
        let mut inner = self.doc.borrow_mut();
        match inner.store.get_mut(self.id) {
            Some(Object::Dictionary(dict)) | Some(Object::Stream(dict, _)) => {
                dict.set(key, value);
                Ok(())
            }
            Some(other) => Err(PdfError::TypeMismatch(format!(
                "cannot set {key} on a {}",
                other.type_name()
            ))),
            None => Err(PdfError::InvalidReference(
                self.id.number(),
                self.id.generation(),
            )),
        }
    }

    /// The page's effective Resources dictionary (empty if absent).
    pub fn resources(&self) -> Result<Dictionary> {
        match self.get("Resources")? {
            Some(Object::Dictionary(dict)) => Ok(dict),
            Some(other) => Err(PdfError::TypeMismatch(format!(
                "Resources is a {}, expected dictionary",
                other.type_name()
            ))),
            None => Ok(Dictionary::new()),
        }
    }

    /// Total byte length of the page's content streams.
    pub fn content_length(&self) -> Result<usize> {
        let contents = match self.get("Contents")? {
            None => return Ok(0),
            Some(contents) => contents,
        };
        let inner = self.doc.borrow();
        match contents {
            Object::Stream(_, data) => Ok(data.len()),
            Object::Array(items) => {
                let mut total = 0;
                for item in &items {
                    match inner.store.resolve(item)? {
                        Object::Stream(_, data) => total += data.len(),
                        other => {
                            return Err(PdfError::InvalidStructure(format!(
                                "Contents entry is a {}, expected stream",
                                other.type_name()
                            )))
                        }
                    }
                }
                Ok(total)
            }
            other => Err(PdfError::InvalidStructure(format!(
                "Contents is a {}, expected stream or array",
                other.type_name()
            ))),
        }
    }

    /// Splice a stream object into the page's content stream list, before
    /// the existing content when `prepend` is set, after it otherwise.
    ///
    /// The stream must already live in the same document (see
    /// [`Document::make_stream`]).
    pub fn append_content_stream(&self, stream: &ObjectHandle, prepend: bool) -> Result<()> {
        if !self.is_page()? {
            return Err(PdfError::TypeMismatch(
                "content fragments can only be appended to pages".to_string(),
            ));
        }
        if !Rc::ptr_eq(&self.doc, &stream.doc) {
            return Err(PdfError::InvalidOperation(
                "content stream must belong to the page's document".to_string(),
            ));
        }
        if !matches!(stream.object()?, Object::Stream(..)) {
            return Err(PdfError::TypeMismatch(
                "only stream objects can be spliced into page contents".to_string(),
            ));
        }

        let mut inner = self.doc.borrow_mut();
        let existing = match inner.store.get(self.id) {
            Some(Object::Dictionary(dict)) => dict.get("Contents").cloned(),
            _ => {
                return Err(PdfError::InvalidReference(
                    self.id.number(),
                    self.id.generation(),
                ))
            }
        };
        let mut contents = match existing {
            None => Vec::new(),
            Some(Object::Array(items)) => items,
            Some(reference @ Object::Reference(_)) => vec![reference],
            Some(other) => {
                return Err(PdfError::InvalidStructure(format!(
                    "Contents is a {}, expected stream reference or array",
                    other.type_name()
                )))
            }
        };

        if prepend {
            contents.insert(0, Object::Reference(stream.id));
        } else {
            contents.push(Object::Reference(stream.id));
        }

        match inner.store.get_mut(self.id) {
            Some(Object::Dictionary(dict)) => {
                dict.set("Contents", Object::Array(contents));
                Ok(())
            }
            _ => Err(PdfError::InvalidReference(
                self.id.number(),
                self.id.generation(),
            )),
        }
    }

    /// Wrap raw bytes in a new stream object and splice it into the
    /// page's content stream list.
    pub fn append_content(&self, fragment: &[u8], prepend: bool) -> Result<()> {
        if !self.is_page()? {
            return Err(PdfError::TypeMismatch(
                "content fragments can only be appended to pages".to_string(),
            ));
        }
        let stream = self.document().make_stream(fragment);
        self.append_content_stream(&stream, prepend)
    }
}
