//! Page tree walker
//!
//! Translates between the hierarchical page tree (`Pages` container nodes
//! with inheritable attributes, `Page` leaves) and the flat ordered view the
//! page list exposes. Structural mutation always goes through
//! [`rebuild`], which collapses the tree to a single container level; the
//! inheritable attributes a leaf would lose that way are resolved into the
//! leaf during [`flatten`].

use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Object, ObjectId};
use crate::store::ObjectStore;
use lazy_static::lazy_static;
use std::collections::HashSet;

lazy_static! {
    /// Attributes a page inherits from ancestor container nodes.
    static ref INHERITABLE_ATTRIBUTES: Vec<&'static str> =
        vec!["Resources", "MediaBox", "CropBox", "Rotate"];
}

/// Whether a dictionary is a page leaf. Falls back to content-based
/// inference when `Type` is missing: a node carrying `Contents` or
/// `MediaBox` but no `Kids` is treated as a page.
pub fn is_page_dict(dict: &Dictionary) -> bool {
    match dict.type_name() {
        Some("Page") => true,
        Some(_) => false,
        None => {
            !dict.contains_key("Kids")
                && (dict.contains_key("Contents") || dict.contains_key("MediaBox"))
        }
    }
}

fn is_container_dict(dict: &Dictionary) -> bool {
    match dict.type_name() {
        Some("Pages") => true,
        Some(_) => false,
        None => dict.contains_key("Kids"),
    }
}

/// Flatten the tree rooted at `root` into the ordered list of leaf page
/// ids (depth-first, left to right).
///
/// While descending, the inheritable attributes of container nodes are
/// accumulated (nearest ancestor wins) and written into any leaf that does
/// not set them itself, so the flat view sees fully resolved pages.
pub fn flatten(store: &mut ObjectStore, root: ObjectId) -> Result<Vec<ObjectId>> {
    let mut leaves = Vec::new();
    let mut resolved: Vec<(ObjectId, Vec<(String, Object)>)> = Vec::new();
    let mut visited = HashSet::new();

    walk(
        store,
        root,
        &Dictionary::new(),
        &mut visited,
        &mut leaves,
        &mut resolved,
    )?;

    for (leaf, updates) in resolved {
        if let Some(Object::Dictionary(dict)) = store.get_mut(leaf) {
            for (key, value) in updates {
                dict.set(key, value);
            }
        }
    }

    Ok(leaves)
}

fn walk(
    store: &ObjectStore,
    node_id: ObjectId,
    inherited: &Dictionary,
    visited: &mut HashSet<ObjectId>,
    leaves: &mut Vec<ObjectId>,
    resolved: &mut Vec<(ObjectId, Vec<(String, Object)>)>,
) -> Result<()> {
    if !visited.insert(node_id) {
        return Err(PdfError::InvalidStructure(format!(
            "page tree contains a cycle through {node_id}"
        )));
    }

    let dict = match store.get(node_id) {
        Some(Object::Dictionary(dict)) => dict,
        // A null node is the placeholder of a foreign page whose copy is
        // still deferred; it holds a leaf position until materialization.
        Some(Object::Null) => {
            leaves.push(node_id);
            return Ok(());
        }
        Some(other) => {
            return Err(PdfError::InvalidStructure(format!(
                "page tree node {node_id} is a {}, expected dictionary",
                other.type_name()
            )))
        }
        None => return Err(PdfError::InvalidReference(node_id.number(), node_id.generation())),
    };

    if is_container_dict(dict) {
        let mut merged = inherited.clone();
        for &key in INHERITABLE_ATTRIBUTES.iter() {
            if let Some(value) = dict.get(key) {
                merged.set(key, value.clone());
            }
        }

        let kids = match dict.get("Kids") {
            Some(Object::Array(kids)) => kids.clone(),
            Some(other) => {
                return Err(PdfError::InvalidStructure(format!(
                    "Kids of {node_id} is a {}, expected array",
                    other.type_name()
                )))
            }
            None => Vec::new(),
        };

        for kid in kids {
            let kid_id = kid.expect_reference()?;
            walk(store, kid_id, &merged, visited, leaves, resolved)?;
        }
    } else if is_page_dict(dict) {
        let mut updates = Vec::new();
        for &key in INHERITABLE_ATTRIBUTES.iter() {
            if !dict.contains_key(key) {
                if let Some(value) = inherited.get(key) {
                    updates.push((key.to_string(), value.clone()));
                }
            }
        }
        leaves.push(node_id);
        if !updates.is_empty() {
            resolved.push((node_id, updates));
        }
    } else {
        return Err(PdfError::InvalidStructure(format!(
            "page tree node {node_id} is neither a container nor a page"
        )));
    }

    Ok(())
}

/// Regenerate the tree under `root` so that it flattens to exactly
/// `leaves`: a single container holding every leaf directly. Intermediate
/// container nodes from the previous shape are removed from the store, and
/// every leaf's `Parent` is rewritten to `root`.
pub fn rebuild(store: &mut ObjectStore, root: ObjectId, leaves: &[ObjectId]) -> Result<()> {
    for orphan in collect_containers(store, root)? {
        store.remove(orphan);
    }

    let mut root_dict = Dictionary::new();
    root_dict.set("Type", Object::Name("Pages".to_string()));
    root_dict.set(
        "Kids",
        Object::Array(leaves.iter().map(|id| Object::Reference(*id)).collect()),
    );
    root_dict.set("Count", leaves.len() as i64);
    store.insert_at(root, Object::Dictionary(root_dict));

    for leaf in leaves {
        match store.get_mut(*leaf) {
            Some(Object::Dictionary(dict)) => {
                dict.set("Parent", Object::Reference(root));
            }
            // Deferred placeholder; its Parent is written when the foreign
            // copy materializes.
            Some(Object::Null) => {}
            _ => {
                return Err(PdfError::InvalidReference(
                    leaf.number(),
                    leaf.generation(),
                ))
            }
        }
    }

    Ok(())
}

/// Container nodes reachable below `root` (excluding `root` itself).
fn collect_containers(store: &ObjectStore, root: ObjectId) -> Result<Vec<ObjectId>> {
    let mut containers = Vec::new();
    let mut stack = vec![root];
    let mut visited = HashSet::new();

    while let Some(node_id) = stack.pop() {
        if !visited.insert(node_id) {
            continue;
        }
        let dict = match store.get(node_id) {
            Some(Object::Dictionary(dict)) => dict,
            _ => continue,
        };
        if !is_container_dict(dict) {
            continue;
        }
        if node_id != root {
            containers.push(node_id);
        }
        if let Some(Object::Array(kids)) = dict.get("Kids") {
            for kid in kids {
                if let Some(id) = kid.as_reference() {
                    stack.push(id);
                }
            }
        }
    }

    Ok(containers)
}
