//! Document serializer
//!
//! Writes the whole object store: header, every object in ascending id
//! order, a single-subsection xref table (gaps become free entries), the
//! trailer, and the Info dictionary generated from document metadata.
//! Dictionary keys are emitted in sorted order so output is deterministic.

use crate::document::DocumentInner;
use crate::error::Result;
use crate::objects::{Dictionary, Object, ObjectId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::io::Write;

pub(crate) struct PdfWriter<W: Write> {
    writer: W,
    xref_positions: HashMap<ObjectId, u64>,
    current_position: u64,
}

impl<W: Write> PdfWriter<W> {
    pub fn new_with_writer(writer: W) -> Self {
        Self {
            writer,
            xref_positions: HashMap::new(),
            current_position: 0,
        }
    }

    pub fn write_document(&mut self, document: &DocumentInner) -> Result<()> {
        self.write_header()?;

        let ids = document.store.ids();
        for id in &ids {
            if let Some(object) = document.store.get(*id) {
                self.write_object(*id, object)?;
            }
        }

        let max_number = ids.last().map(|id| id.number()).unwrap_or(0);
        let info_id = ObjectId::new(max_number + 1, 0);
        let info = info_dictionary(&document.metadata);
        self.write_object(info_id, &Object::Dictionary(info))?;

        let xref_position = self.current_position;
        self.write_xref()?;
        self.write_trailer(document.catalog_id, info_id, xref_position)?;

        self.writer.flush()?;
        Ok(())
    }

    fn write_header(&mut self) -> Result<()> {
        self.write_bytes(b"%PDF-1.7\n")?;
        // Binary comment so transports treat the file as binary.
        self.write_bytes(&[b'%', 0xE2, 0xE3, 0xCF, 0xD3, b'\n'])?;
        Ok(())
    }

    fn write_object(&mut self, id: ObjectId, object: &Object) -> Result<()> {
        self.xref_positions.insert(id, self.current_position);

        let header = format!("{} {} obj\n", id.number(), id.generation());
        self.write_bytes(header.as_bytes())?;
        self.write_object_value(object)?;
        self.write_bytes(b"\nendobj\n")?;
        Ok(())
    }

    fn write_object_value(&mut self, object: &Object) -> Result<()> {
        match object {
            Object::Null => self.write_bytes(b"null")?,
            Object::Boolean(b) => self.write_bytes(if *b { b"true" } else { b"false" })?,
            Object::Integer(i) => self.write_bytes(i.to_string().as_bytes())?,
            Object::Real(f) => self.write_bytes(
                format!("{f:.6}")
                    .trim_end_matches('0')
                    .trim_end_matches('.')
                    .as_bytes(),
            )?,
            Object::String(s) => {
                self.write_bytes(b"(")?;
                self.write_bytes(escape_string(s).as_bytes())?;
                self.write_bytes(b")")?;
            }
            Object::Name(n) => {
                self.write_bytes(b"/")?;
                self.write_bytes(n.as_bytes())?;
            }
            Object::Array(arr) => {
                self.write_bytes(b"[")?;
                for (i, obj) in arr.iter().enumerate() {
                    if i > 0 {
                        self.write_bytes(b" ")?;
                    }
                    self.write_object_value(obj)?;
                }
                self.write_bytes(b"]")?;
            }
            Object::Dictionary(dict) => self.write_dictionary(dict)?,
            Object::Stream(dict, data) => {
                self.write_dictionary(dict)?;
                self.write_bytes(b"\nstream\n")?;
                self.write_bytes(data)?;
                self.write_bytes(b"\nendstream")?;
            }
            Object::Reference(id) => {
                let ref_str = format!("{} {} R", id.number(), id.generation());
                self.write_bytes(ref_str.as_bytes())?;
            }
        }
        Ok(())
    }

    fn write_dictionary(&mut self, dict: &Dictionary) -> Result<()> {
        self.write_bytes(b"<<")?;
        for (key, value) in dict.sorted_entries() {
            self.write_bytes(b"\n/")?;
            self.write_bytes(key.as_bytes())?;
            self.write_bytes(b" ")?;
            self.write_object_value(value)?;
        }
        self.write_bytes(b"\n>>")?;
        Ok(())
    }

    fn write_xref(&mut self) -> Result<()> {
        self.write_bytes(b"xref\n")?;

        let max_obj_num = self
            .xref_positions
            .keys()
            .map(|id| id.number())
            .max()
            .unwrap_or(0);

        self.write_bytes(b"0 ")?;
        self.write_bytes((max_obj_num + 1).to_string().as_bytes())?;
        self.write_bytes(b"\n")?;

        // Object 0 is the head of the free list.
        self.write_bytes(b"0000000000 65535 f \n")?;

        for obj_num in 1..=max_obj_num {
            let position = self
                .xref_positions
                .iter()
                .find(|(id, _)| id.number() == obj_num)
                .map(|(_, position)| *position);
            match position {
                Some(position) => {
                    let entry = format!("{position:010} {:05} n \n", 0);
                    self.write_bytes(entry.as_bytes())?;
                }
                None => {
                    self.write_bytes(b"0000000000 00000 f \n")?;
                }
            }
        }

        Ok(())
    }

    fn write_trailer(
        &mut self,
        catalog_id: ObjectId,
        info_id: ObjectId,
        xref_position: u64,
    ) -> Result<()> {
        let max_obj_num = self
            .xref_positions
            .keys()
            .map(|id| id.number())
            .max()
            .unwrap_or(0);

        let mut trailer = Dictionary::new();
        trailer.set("Size", Object::Integer((max_obj_num + 1) as i64));
        trailer.set("Root", Object::Reference(catalog_id));
        trailer.set("Info", Object::Reference(info_id));

        self.write_bytes(b"trailer\n")?;
        self.write_object_value(&Object::Dictionary(trailer))?;
        self.write_bytes(b"\nstartxref\n")?;
        self.write_bytes(xref_position.to_string().as_bytes())?;
        self.write_bytes(b"\n%%EOF\n")?;

        Ok(())
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        self.current_position += data.len() as u64;
        Ok(())
    }
}

fn info_dictionary(metadata: &crate::document::DocumentMetadata) -> Dictionary {
    let mut info = Dictionary::new();
    if let Some(title) = &metadata.title {
        info.set("Title", Object::String(title.clone()));
    }
    if let Some(author) = &metadata.author {
        info.set("Author", Object::String(author.clone()));
    }
    if let Some(subject) = &metadata.subject {
        info.set("Subject", Object::String(subject.clone()));
    }
    if let Some(keywords) = &metadata.keywords {
        info.set("Keywords", Object::String(keywords.clone()));
    }
    if let Some(creator) = &metadata.creator {
        info.set("Creator", Object::String(creator.clone()));
    }
    if let Some(producer) = &metadata.producer {
        info.set("Producer", Object::String(producer.clone()));
    }
    if let Some(date) = metadata.creation_date {
        info.set("CreationDate", Object::String(format_pdf_date(date)));
    }
    if let Some(date) = metadata.modification_date {
        info.set("ModDate", Object::String(format_pdf_date(date)));
    }
    info
}

/// Escape a literal string body: backslash and unbalanced parentheses.
fn escape_string(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '(' => escaped.push_str("\\("),
            ')' => escaped.push_str("\\)"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Format a DateTime as a PDF date string (D:YYYYMMDDHHmmSS+00'00).
fn format_pdf_date(date: DateTime<Utc>) -> String {
    let formatted = date.format("D:%Y%m%d%H%M%S");
    format!("{formatted}+00'00")
}
