//! Indirect object store
//!
//! Each document owns one `ObjectStore`: an arena of objects addressed by
//! (number, generation). Cross-document copying goes through
//! [`ObjectStore::deep_copy_from`], which rewrites every internal reference
//! to destination ids and deduplicates shared objects within one call.

use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Object, ObjectId};
use std::collections::HashMap;
use tracing::warn;

#[derive(Debug, Default)]
pub struct ObjectStore {
    objects: HashMap<ObjectId, Object>,
    next_number: u32,
}

impl ObjectStore {
    pub fn new() -> Self {
        Self {
            objects: HashMap::new(),
            next_number: 1,
        }
    }

    pub fn get(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(&id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.objects.get_mut(&id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    /// Reserve the next object number without storing anything yet.
    pub fn allocate(&mut self) -> ObjectId {
        let id = ObjectId::new(self.next_number, 0);
        self.next_number += 1;
        id
    }

    pub fn put(&mut self, object: Object) -> ObjectId {
        let id = self.allocate();
        self.objects.insert(id, object);
        id
    }

    /// Store an object under a specific id, replacing any previous value.
    /// Keeps the allocation counter ahead of the highest number seen.
    pub fn insert_at(&mut self, id: ObjectId, object: Object) {
        if id.number() >= self.next_number {
            self.next_number = id.number() + 1;
        }
        self.objects.insert(id, object);
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<Object> {
        self.objects.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// All ids in ascending order.
    pub fn ids(&self) -> Vec<ObjectId> {
        let mut ids: Vec<_> = self.objects.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Follow a reference chain to the underlying value. Plain values pass
    /// through unchanged. Chains longer than a small bound are treated as
    /// reference loops.
    pub fn resolve<'a>(&'a self, object: &'a Object) -> Result<&'a Object> {
        let mut current = object;
        for _ in 0..32 {
            match current {
                Object::Reference(id) => {
                    current = self
                        .get(*id)
                        .ok_or(PdfError::InvalidReference(id.number(), id.generation()))?;
                }
                _ => return Ok(current),
            }
        }
        Err(PdfError::InvalidStructure(
            "reference chain does not terminate".to_string(),
        ))
    }

    /// Copy the object subgraph reachable from `root` in `source` into this
    /// store, rewriting every internal reference to the new ids.
    ///
    /// `remap` is the dedup map for this import call: objects reached via
    /// multiple paths are copied once, and pre-seeded entries (e.g. a
    /// placeholder already reserved for the root) are honored. The `Parent`
    /// entry of the root page dictionary is dropped so the copy does not
    /// drag the source's page tree along; the destination tree re-parents
    /// the page when it is attached.
    ///
    /// A reference to an object missing from `source` copies as `Null`.
    pub fn deep_copy_from(
        &mut self,
        source: &ObjectStore,
        root: ObjectId,
        remap: &mut HashMap<ObjectId, ObjectId>,
    ) -> Result<ObjectId> {
        let root_dest = match remap.get(&root) {
            Some(&id) => id,
            None => {
                let id = self.allocate();
                remap.insert(root, id);
                id
            }
        };

        let mut queue = vec![root];
        while let Some(src_id) = queue.pop() {
            let dest_id = remap[&src_id];
            let copied = match source.get(src_id) {
                Some(value) => {
                    let strip_parent = src_id == root;
                    self.rewrite_value(value, strip_parent, remap, &mut queue)
                }
                None => {
                    warn!(object = %src_id, "dangling reference in source document, copying as null");
                    Object::Null
                }
            };
            self.insert_at(dest_id, copied);
        }

        Ok(root_dest)
    }

    fn rewrite_value(
        &mut self,
        value: &Object,
        strip_parent: bool,
        remap: &mut HashMap<ObjectId, ObjectId>,
        queue: &mut Vec<ObjectId>,
    ) -> Object {
        match value {
            Object::Reference(id) => {
                let dest = match remap.get(id) {
                    Some(&d) => d,
                    None => {
                        let d = self.allocate();
                        remap.insert(*id, d);
                        queue.push(*id);
                        d
                    }
                };
                Object::Reference(dest)
            }
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.rewrite_value(item, false, remap, queue))
                    .collect(),
            ),
            Object::Dictionary(dict) => {
                Object::Dictionary(self.rewrite_dict(dict, strip_parent, remap, queue))
            }
            Object::Stream(dict, data) => Object::Stream(
                self.rewrite_dict(dict, false, remap, queue),
                data.clone(),
            ),
            other => other.clone(),
        }
    }

    fn rewrite_dict(
        &mut self,
        dict: &Dictionary,
        strip_parent: bool,
        remap: &mut HashMap<ObjectId, ObjectId>,
        queue: &mut Vec<ObjectId>,
    ) -> Dictionary {
        let mut copied = Dictionary::with_capacity(dict.len());
        for (key, value) in dict.entries() {
            if strip_parent && key == "Parent" {
                continue;
            }
            copied.set(key.clone(), self.rewrite_value(value, false, remap, queue));
        }
        copied
    }
}
