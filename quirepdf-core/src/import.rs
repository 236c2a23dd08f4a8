//! Foreign object importer
//!
//! Accepting a page from another document does not copy it immediately.
//! The destination reserves an object id with a placeholder and records a
//! [`DeferredImport`] holding a strong handle on the source document; the
//! copy runs when the page's content is first needed or at save time,
//! whichever comes first. The strong handle is the pin that keeps the
//! source alive until then; discarding the deferred entry (for example by
//! deleting the page again before materialization) releases it.

use crate::document::DocumentInner;
use crate::error::Result;
use crate::objects::{Object, ObjectId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

/// A recorded cross-document copy that has not been performed yet.
pub(crate) struct DeferredImport {
    /// Pins the source document until the copy is materialized or
    /// discarded.
    pub(crate) source: Rc<RefCell<DocumentInner>>,
    pub(crate) source_page: ObjectId,
}

/// Reserve a destination id for a foreign page and record the deferred
/// copy. The placeholder is replaced when the import materializes.
pub(crate) fn accept_foreign(
    dest: &Rc<RefCell<DocumentInner>>,
    source: &Rc<RefCell<DocumentInner>>,
    source_page: ObjectId,
) -> ObjectId {
    let mut inner = dest.borrow_mut();
    let dest_id = inner.store.allocate();
    inner.store.insert_at(dest_id, Object::Null);
    inner.deferred.insert(
        dest_id,
        DeferredImport {
            source: Rc::clone(source),
            source_page,
        },
    );
    debug!(dest = %dest_id, source = %source_page, "accepted foreign page, copy deferred");
    dest_id
}

/// Perform the deferred copy for `dest_id`, if one is outstanding.
///
/// The object subgraph reachable from the source page is copied with a
/// fresh dedup map (one import transaction per page), the placeholder is
/// replaced, and the pin on the source document is released. A no-op for
/// ids without a pending import.
pub(crate) fn materialize(doc: &Rc<RefCell<DocumentInner>>, dest_id: ObjectId) -> Result<()> {
    let import = { doc.borrow_mut().deferred.remove(&dest_id) };
    let Some(import) = import else {
        return Ok(());
    };

    // The source page may itself be an unmaterialized copy from a third
    // document; resolve that chain first.
    materialize(&import.source, import.source_page)?;

    let mut remap = HashMap::new();
    remap.insert(import.source_page, dest_id);
    {
        let source = import.source.borrow();
        let mut inner = doc.borrow_mut();
        inner
            .store
            .deep_copy_from(&source.store, import.source_page, &mut remap)?;

        // The copy arrives without a Parent (stripped during the graph
        // walk); attach it to this document's tree root.
        let pages_root = inner.pages_root;
        if let Some(Object::Dictionary(dict)) = inner.store.get_mut(dest_id) {
            dict.set("Parent", Object::Reference(pages_root));
        }
    }

    debug!(dest = %dest_id, objects = remap.len(), "materialized foreign page");
    Ok(())
}

/// Materialize every outstanding deferred import. Called by save.
pub(crate) fn materialize_all(doc: &Rc<RefCell<DocumentInner>>) -> Result<()> {
    loop {
        let next = { doc.borrow().deferred.keys().next().copied() };
        match next {
            Some(dest_id) => materialize(doc, dest_id)?,
            None => return Ok(()),
        }
    }
}
