//! Project schema: field declarations compiled into wire-level metadata.

pub mod config;
mod field;

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};

pub use config::{Config, Setting};
pub use field::{
    FieldDef, FieldKind, FieldMeta, IndexMode, FLAG_INDEX_BOTH, FLAG_INDEX_MIXED, FLAG_INDEX_SELF,
    FLAG_NON_BOOL, FLAG_WITH_POSITION, MAX_WDF, MIXED_VNO,
};

/// Compiled schema of one project.
///
/// Exactly one id field is required; title and body are optional and
/// unique. Virtual field numbers come from an explicit `fid` (minus
/// one), from the body's fixed mixed-area number, or from the field's
/// position in lexicographic name order.
#[derive(Debug, Clone)]
pub struct Schema {
    fields: BTreeMap<String, FieldMeta>,
    vno_map: FxHashMap<u8, String>,
    id: String,
    title: Option<String>,
    body: Option<String>,
}

impl Schema {
    pub fn new(defs: &BTreeMap<String, FieldDef>) -> Result<Schema> {
        let mut schema = Schema {
            fields: BTreeMap::new(),
            vno_map: FxHashMap::default(),
            id: String::new(),
            title: None,
            body: None,
        };
        for (pos, (name, def)) in defs.iter().enumerate() {
            let mut meta = FieldMeta::new(name, def);
            match def.kind {
                FieldKind::Id => {
                    if !schema.id.is_empty() {
                        return Err(Error::Schema(format!(
                            "duplicated id field: {} and {}",
                            name, schema.id
                        )));
                    }
                    schema.id = name.clone();
                }
                FieldKind::Title => {
                    if let Some(ref title) = schema.title {
                        return Err(Error::Schema(format!(
                            "duplicated title field: {} and {}",
                            name, title
                        )));
                    }
                    schema.title = Some(name.clone());
                }
                FieldKind::Body => {
                    if let Some(ref body) = schema.body {
                        return Err(Error::Schema(format!(
                            "duplicated body field: {} and {}",
                            name, body
                        )));
                    }
                    schema.body = Some(name.clone());
                }
                _ => {}
            }
            meta.vno = if def.kind == FieldKind::Body {
                MIXED_VNO
            } else if def.fid > 0 {
                def.fid - 1
            } else {
                pos as u8
            };
            schema.vno_map.insert(meta.vno, name.clone());
            schema.fields.insert(name.clone(), meta);
        }
        if schema.id.is_empty() {
            return Err(Error::Schema("missing field of type id".to_string()));
        }
        Ok(schema)
    }

    pub fn id_name(&self) -> &str {
        &self.id
    }

    pub fn id_field(&self) -> &FieldMeta {
        &self.fields[&self.id]
    }

    pub fn field(&self, name: &str) -> Option<&FieldMeta> {
        self.fields.get(name)
    }

    pub fn by_vno(&self, vno: u8) -> Option<&str> {
        self.vno_map.get(&vno).map(String::as_str)
    }

    /// Fields in lexicographic name order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldMeta> {
        self.fields.values()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defs(entries: &[(&str, FieldDef)]) -> BTreeMap<String, FieldDef> {
        entries
            .iter()
            .map(|(name, def)| (name.to_string(), def.clone()))
            .collect()
    }

    #[test]
    fn test_vno_assignment_by_name_order() {
        let schema = Schema::new(&defs(&[
            (
                "id",
                FieldDef {
                    kind: FieldKind::Id,
                    ..Default::default()
                },
            ),
            ("message", FieldDef::default()),
            ("author", FieldDef::default()),
        ]))
        .unwrap();
        // sorted: author, id, message
        assert_eq!(schema.field("author").unwrap().vno, 0);
        assert_eq!(schema.field("id").unwrap().vno, 1);
        assert_eq!(schema.field("message").unwrap().vno, 2);
        assert_eq!(schema.by_vno(2), Some("message"));
        assert_eq!(schema.id_name(), "id");
    }

    #[test]
    fn test_explicit_fid_and_body_vno() {
        let schema = Schema::new(&defs(&[
            (
                "id",
                FieldDef {
                    kind: FieldKind::Id,
                    fid: 1,
                    ..Default::default()
                },
            ),
            (
                "content",
                FieldDef {
                    kind: FieldKind::Body,
                    fid: 3,
                    ..Default::default()
                },
            ),
            (
                "tag",
                FieldDef {
                    fid: 7,
                    ..Default::default()
                },
            ),
        ]))
        .unwrap();
        assert_eq!(schema.field("id").unwrap().vno, 0);
        assert_eq!(schema.field("content").unwrap().vno, MIXED_VNO);
        assert_eq!(schema.field("tag").unwrap().vno, 6);
        assert_eq!(schema.by_vno(MIXED_VNO), Some("content"));
    }

    #[test]
    fn test_single_id_required() {
        let err = Schema::new(&defs(&[("title", FieldDef::default())])).unwrap_err();
        assert!(matches!(err, Error::Schema(_)));

        let err = Schema::new(&defs(&[
            (
                "a",
                FieldDef {
                    kind: FieldKind::Id,
                    ..Default::default()
                },
            ),
            (
                "b",
                FieldDef {
                    kind: FieldKind::Id,
                    ..Default::default()
                },
            ),
        ]))
        .unwrap_err();
        match err {
            Error::Schema(msg) => assert!(msg.contains("duplicated id")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_title_and_body() {
        let err = Schema::new(&defs(&[
            (
                "id",
                FieldDef {
                    kind: FieldKind::Id,
                    ..Default::default()
                },
            ),
            (
                "t1",
                FieldDef {
                    kind: FieldKind::Title,
                    ..Default::default()
                },
            ),
            (
                "t2",
                FieldDef {
                    kind: FieldKind::Title,
                    ..Default::default()
                },
            ),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }
}
