//! Page sequence behavior: indexing, slicing, mutation, and the
//! cross-document copy protocol with its lifetime pins.

use quirepdf::{Dictionary, Document, Object, PdfError};

/// A document with `count` pages. Page `i` carries `i + 1` bytes of
/// content and a Resources dictionary whose XObject key names the page,
/// so pages can be told apart after copying and reordering.
fn build_document(count: usize) -> Document {
    let doc = Document::new();
    for i in 0..count {
        let page = doc.add_blank_page(612.0, 792.0).unwrap();
        page.append_content(&vec![b'q'; i + 1], false).unwrap();

        let mut xobjects = Dictionary::new();
        xobjects.set(format!("Im{i}"), Object::Null);
        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));
        page.set_value("Resources", Object::Dictionary(resources))
            .unwrap();
    }
    doc
}

fn content_lengths(doc: &Document) -> Vec<usize> {
    doc.pages()
        .iter()
        .map(|page| page.content_length().unwrap())
        .collect()
}

fn xobject_keys(page: &quirepdf::ObjectHandle) -> Vec<String> {
    let resources = page.resources().unwrap();
    let mut keys: Vec<String> = resources
        .get_dict("XObject")
        .map(|xo| xo.keys().cloned().collect())
        .unwrap_or_default();
    keys.sort();
    keys
}

#[test]
fn split_into_single_page_documents() {
    let source = build_document(4);
    let outdir = tempfile::tempdir().unwrap();

    for (n, page) in source.pages().iter().enumerate() {
        let out = Document::new();
        out.pages().append(&page).unwrap();
        out.save(outdir.path().join(format!("page{}.pdf", n + 1)))
            .unwrap();
    }

    let written = std::fs::read_dir(outdir.path()).unwrap().count();
    assert_eq!(written, 4);

    let reopened = Document::open(outdir.path().join("page3.pdf")).unwrap();
    assert_eq!(reopened.pages().len(), 1);
    assert_eq!(reopened.pages().get(0).unwrap().content_length().unwrap(), 3);
}

#[test]
fn empty_document_saves_but_does_not_index() {
    let doc = Document::new();
    assert!(doc.pages().get(0).is_err());

    let outdir = tempfile::tempdir().unwrap();
    doc.save(outdir.path().join("empty.pdf")).unwrap();

    let reopened = Document::open(outdir.path().join("empty.pdf")).unwrap();
    assert_eq!(reopened.pages().len(), 0);
}

#[test]
fn delete_last_remaining_page() {
    let doc = build_document(1);
    doc.pages().delete(0).unwrap();
    assert_eq!(doc.pages().len(), 0);

    let outdir = tempfile::tempdir().unwrap();
    doc.save(outdir.path().join("empty.pdf")).unwrap();
}

#[test]
fn replace_page_copies_foreign_content() {
    let target = build_document(4);
    let source = build_document(2);

    assert_eq!(target.pages().len(), 4);
    target
        .pages()
        .set(1, &source.pages().get(0).unwrap())
        .unwrap();
    assert_eq!(target.pages().len(), 4);

    assert_eq!(
        xobject_keys(&target.pages().get(1).unwrap()),
        xobject_keys(&source.pages().get(0).unwrap())
    );
}

#[test]
fn replace_page_after_source_document_dropped() {
    let target = build_document(4);

    let held_page = {
        let source = build_document(1);
        source.pages().get(0).unwrap()
        // The source Document handle drops here; the page handle keeps
        // the underlying document alive.
    };

    target.pages().set(1, &held_page).unwrap();
    drop(held_page);

    let outdir = tempfile::tempdir().unwrap();
    target.save(outdir.path().join("out.pdf")).unwrap();

    let reopened = Document::open(outdir.path().join("out.pdf")).unwrap();
    assert_eq!(reopened.pages().len(), 4);
    assert_eq!(reopened.pages().get(1).unwrap().content_length().unwrap(), 1);
}

#[test]
fn materialized_copy_is_independent_of_source() {
    let target = build_document(1);
    let source = build_document(1);

    target
        .pages()
        .append(&source.pages().get(0).unwrap())
        .unwrap();

    // Force materialization, then mutate the original.
    let copy = target.pages().get(1).unwrap();
    assert_eq!(xobject_keys(&copy), vec!["Im0"]);

    source
        .pages()
        .get(0)
        .unwrap()
        .set_value("Resources", Object::Dictionary(Dictionary::new()))
        .unwrap();

    assert_eq!(xobject_keys(&copy), vec!["Im0"]);
}

#[test]
fn reverse_pages_keeps_content() {
    let doc = build_document(4);
    let reference = build_document(4);

    let lengths = content_lengths(&reference);

    doc.pages().reverse().unwrap();

    for (n, length) in lengths.iter().enumerate() {
        assert_eq!(
            reference.pages().get(n as i64).unwrap().content_length().unwrap(),
            *length
        );
    }
    let mut reversed = lengths.clone();
    reversed.reverse();
    assert_eq!(content_lengths(&doc), reversed);
}

#[test]
fn import_pins_source_until_save() {
    let outdir = tempfile::tempdir().unwrap();

    let source = build_document(1);
    let target = build_document(1);

    let baseline = source.handle_count();

    target
        .pages()
        .append(&source.pages().get(0).unwrap())
        .unwrap();
    // One pin per imported page, held by the deferred copy.
    assert_eq!(source.handle_count(), baseline + 1);

    // A local alias of the source going away does not release the pin.
    let alias = source.clone();
    drop(alias);
    assert_eq!(source.handle_count(), baseline + 1);

    // Deleting the page from the source does not disturb the pin either:
    // the page's objects stay in the source store.
    source.pages().delete(0).unwrap();
    assert_eq!(source.handle_count(), baseline + 1);

    target.save(outdir.path().join("out.pdf")).unwrap();
    assert_eq!(source.handle_count(), baseline);

    let reopened = Document::open(outdir.path().join("out.pdf")).unwrap();
    assert_eq!(reopened.pages().len(), 2);
}

#[test]
fn discarding_unmaterialized_copy_releases_pin() {
    let source = build_document(1);
    let target = build_document(1);

    let baseline = source.handle_count();
    target
        .pages()
        .append(&source.pages().get(0).unwrap())
        .unwrap();
    assert_eq!(source.handle_count(), baseline + 1);

    // Deleting the still-unmaterialized copy discards the import.
    target.pages().delete(1).unwrap();
    assert_eq!(source.handle_count(), baseline);
}

#[test]
fn append_all_pages_one_by_one() {
    let target = build_document(1);
    let source = build_document(4);

    for page in source.pages().iter() {
        target.pages().append(&page).unwrap();
    }

    assert_eq!(target.pages().len(), 5);
}

#[test]
fn extend_then_delete_slice() {
    let target = build_document(1);
    let source = build_document(4);

    target.pages().extend(&source.pages()).unwrap();
    assert_eq!(target.pages().len(), 5);

    target.pages().delete_slice(Some(2), Some(4), 1).unwrap();
    assert_eq!(target.pages().len(), 3);
    assert_eq!(content_lengths(&target), vec![1, 1, 4]);
}

#[test]
fn simple_slice_assignment_changes_length() {
    let target = build_document(4);
    let source = build_document(1);

    let page0_length = target.pages().get(0).unwrap().content_length().unwrap();
    let page1_length = target.pages().get(1).unwrap().content_length().unwrap();

    let replacement: Vec<_> = source.pages().iter().collect();
    target
        .pages()
        .set_slice(Some(1), None, 1, &replacement)
        .unwrap();

    assert_eq!(target.pages().len(), 2, "number of pages must be changed");
    assert_eq!(
        target.pages().get(0).unwrap().content_length().unwrap(),
        page0_length,
        "page 0 should be unchanged"
    );
    assert_ne!(
        target.pages().get(1).unwrap().content_length().unwrap(),
        page1_length,
        "page 1's contents should have changed"
    );
}

#[test]
fn extended_slice_assignment_equal_length() {
    let target = build_document(4);
    let source = build_document(2);

    let replacement: Vec<_> = source.pages().iter().collect();
    target
        .pages()
        .set_slice(Some(0), None, 2, &replacement)
        .unwrap();

    assert_eq!(target.pages().len(), 4);
    assert_eq!(content_lengths(&target), vec![1, 2, 2, 4]);
}

#[test]
fn extended_slice_assignment_length_mismatch() {
    let target = build_document(4);
    let source = build_document(1);

    let before = content_lengths(&target);
    let replacement: Vec<_> = source.pages().iter().collect();
    let result = target.pages().set_slice(Some(0), None, 2, &replacement);

    match result {
        Err(PdfError::InvalidOperation(message)) => {
            assert_eq!(
                message,
                "attempt to assign sequence of length 1 to extended slice of size 2"
            );
        }
        other => panic!("Expected InvalidOperation, got {other:?}"),
    }
    assert_eq!(content_lengths(&target), before);
}

#[test]
fn self_extend_fails_fast() {
    let doc = build_document(4);
    let result = doc.pages().extend(&doc.pages());
    assert!(matches!(result, Err(PdfError::InvalidOperation(_))));
    assert_eq!(doc.pages().len(), 4);
}

#[test]
fn one_based_page_lookup() {
    let doc = build_document(4);
    let pages = doc.pages();

    assert_eq!(pages.get_one_based(1).unwrap(), pages.get(0).unwrap());
    assert_eq!(pages.get_one_based(4).unwrap(), pages.get(-1).unwrap());
    assert!(pages.get_one_based(5).is_err());
    assert!(pages.get_one_based(0).is_err());
}

#[test]
fn insert_before_second_to_last() {
    let target = build_document(4);
    let source = build_document(1);
    let page = source.pages().get(-1).unwrap();
    page.append_content(&vec![b'q'; 99], false).unwrap();

    target.pages().insert(-2, &page).unwrap();

    assert_eq!(content_lengths(&target), vec![1, 2, 100, 3, 4]);
}

#[test]
fn insert_rejects_non_page_object() {
    let doc = build_document(4);
    let not_a_page = doc.make_stream(b"this is a stream, not a page");

    let result = doc.pages().insert(0, &not_a_page);
    assert!(matches!(result, Err(PdfError::TypeMismatch(_))));
    assert_eq!(doc.pages().len(), 4);
}

#[test]
fn negative_indexing_end_to_end() {
    let target = build_document(4);
    let source = build_document(2);

    target.pages().get(-1).unwrap();
    target
        .pages()
        .set(-1, &source.pages().get(-1).unwrap())
        .unwrap();
    target.pages().delete(-1).unwrap();
    target
        .pages()
        .insert(-2, &source.pages().get(-1).unwrap())
        .unwrap();

    assert!(target.pages().get(-42).is_err());
    assert!(target
        .pages()
        .set(-42, &source.pages().get(0).unwrap())
        .is_err());
    assert!(target.pages().delete(-42).is_err());
}

#[test]
fn concatenate_same_source_repeatedly() {
    let outdir = tempfile::tempdir().unwrap();
    let output = Document::new();

    for _ in 0..5 {
        let source = build_document(1);
        output.pages().extend(&source.pages()).unwrap();
    }

    assert_eq!(output.pages().len(), 5);
    output.save(outdir.path().join("concatenated.pdf")).unwrap();

    let reopened = Document::open(outdir.path().join("concatenated.pdf")).unwrap();
    assert_eq!(reopened.pages().len(), 5);
}

#[test]
fn wrap_page_content_in_transform() {
    use quirepdf::Matrix;

    let doc = build_document(1);
    let page = doc.pages().get(0).unwrap();
    let original_length = page.content_length().unwrap();

    let matrix = Matrix::identity().rotated(45.0);
    let mut opening_bytes = b"q ".to_vec();
    opening_bytes.extend_from_slice(&matrix.encode());
    let opening = doc.make_stream(&opening_bytes);
    let closing = doc.make_stream(b"Q");

    page.append_content_stream(&opening, true).unwrap();
    page.append_content_stream(&closing, false).unwrap();

    assert_eq!(
        page.content_length().unwrap(),
        original_length + opening_bytes.len() + 1
    );

    let outdir = tempfile::tempdir().unwrap();
    doc.save(outdir.path().join("rotated.pdf")).unwrap();
}

#[test]
fn content_stream_from_other_document_is_rejected() {
    let doc = build_document(1);
    let other = build_document(1);
    let foreign_stream = other.make_stream(b"Q");

    let result = doc
        .pages()
        .get(0)
        .unwrap()
        .append_content_stream(&foreign_stream, false);
    assert!(matches!(result, Err(PdfError::InvalidOperation(_))));
}
