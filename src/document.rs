//! Documents going into the index and coming back out of searches.

use std::collections::{BTreeMap, HashMap};

use crate::error::Result;
use crate::protocol::Unpacker;

/// Byte size of the packed rating header attached to result documents.
pub const META_SIZE: usize = 20;

/// A document. On ingestion only `fields` (plus any extra terms and
/// index texts) matter; search results additionally carry the rating
/// header values and the matched terms.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub docid: u32,
    pub rank: u32,
    pub ccount: u32,
    pub percent: i32,
    pub weight: f32,
    pub charset: String,
    pub fields: HashMap<String, String>,
    pub matched: Vec<String>,
    terms: HashMap<String, BTreeMap<String, u8>>,
    indexes: HashMap<String, String>,
}

impl Document {
    pub fn new() -> Document {
        Document::default()
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) -> &mut Document {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Attach an extra term to a field; repeated terms accumulate weight.
    pub fn add_term(&mut self, field: &str, term: &str, weight: u8) -> &mut Document {
        let weight = if weight == 0 { 1 } else { weight };
        let terms = self.terms.entry(field.to_string()).or_default();
        *terms.entry(term.to_string()).or_insert(0) += weight;
        self
    }

    /// Attach an extra index text to a field; texts are newline-joined.
    pub fn add_index(&mut self, field: &str, text: &str) -> &mut Document {
        if text.is_empty() {
            return self;
        }
        let slot = self.indexes.entry(field.to_string()).or_default();
        if slot.is_empty() {
            slot.push_str(text);
        } else {
            slot.push('\n');
            slot.push_str(text);
        }
        self
    }

    pub(crate) fn terms(&self, field: &str) -> Option<&BTreeMap<String, u8>> {
        self.terms.get(field)
    }

    pub(crate) fn index_text(&self, field: &str) -> Option<&str> {
        self.indexes.get(field).map(String::as_str)
    }

    /// Apply a rating payload from the result stream. Exactly 20 bytes
    /// form the packed header; anything else announces the charset.
    pub(crate) fn apply_meta(&mut self, buf: &[u8]) -> Result<()> {
        if buf.len() != META_SIZE {
            self.charset = String::from_utf8_lossy(buf).into_owned();
            return Ok(());
        }
        let mut r = Unpacker::new(buf);
        self.docid = r.u32_le()?;
        self.rank = r.u32_le()?;
        self.ccount = r.u32_le()?;
        self.percent = r.i32_le()?;
        self.weight = r.f32_le()?;
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Document {
        let mut doc = Document::new();
        for (field, value) in iter {
            doc.set(field, value);
        }
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_meta_header() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&1018u32.to_le_bytes());
        buf.extend_from_slice(&3u32.to_le_bytes());
        buf.extend_from_slice(&7u32.to_le_bytes());
        buf.extend_from_slice(&95i32.to_le_bytes());
        buf.extend_from_slice(&0.5f32.to_le_bytes());
        let mut doc = Document::new();
        doc.apply_meta(&buf).unwrap();
        assert_eq!(doc.docid, 1018);
        assert_eq!(doc.rank, 3);
        assert_eq!(doc.ccount, 7);
        assert_eq!(doc.percent, 95);
        assert_eq!(doc.weight, 0.5);
        assert!(doc.charset.is_empty());
    }

    #[test]
    fn test_apply_meta_charset() {
        let mut doc = Document::new();
        doc.apply_meta(b"UTF-8").unwrap();
        assert_eq!(doc.charset, "UTF-8");
        assert_eq!(doc.docid, 0);
    }

    #[test]
    fn test_add_term_accumulates() {
        let mut doc = Document::new();
        doc.add_term("subject", "hello", 1);
        doc.add_term("subject", "hello", 1);
        doc.add_term("subject", "world", 0);
        let terms = doc.terms("subject").unwrap();
        assert_eq!(terms["hello"], 2);
        assert_eq!(terms["world"], 1);
    }

    #[test]
    fn test_add_index_joins_lines() {
        let mut doc = Document::new();
        doc.add_index("subject", "hello");
        doc.add_index("subject", "world");
        doc.add_index("subject", "");
        assert_eq!(doc.index_text("subject"), Some("hello\nworld"));
    }

    #[test]
    fn test_from_iter() {
        let doc: Document = [("id", "1018"), ("message", "hi")].into_iter().collect();
        assert_eq!(doc.get("id"), Some("1018"));
        assert_eq!(doc.get("message"), Some("hi"));
    }
}
