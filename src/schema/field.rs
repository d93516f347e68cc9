//! Field metadata and indexing flags.

use serde::Deserialize;

pub const MAX_WDF: u16 = 0x3f;
/// Virtual field number of the mixed index area (and of the body field).
pub const MIXED_VNO: u8 = 255;

pub const FLAG_INDEX_SELF: u8 = 0x01;
pub const FLAG_INDEX_MIXED: u8 = 0x02;
pub const FLAG_INDEX_BOTH: u8 = 0x03;
pub const FLAG_WITH_POSITION: u8 = 0x10;
pub const FLAG_NON_BOOL: u8 = 0x80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    #[serde(alias = "string")]
    Plain,
    Numeric,
    Date,
    Id,
    Title,
    Body,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexMode {
    #[serde(rename = "self")]
    SelfOnly,
    Mixed,
    Both,
}

impl IndexMode {
    fn flag(self) -> u8 {
        match self {
            IndexMode::SelfOnly => FLAG_INDEX_SELF,
            IndexMode::Mixed => FLAG_INDEX_MIXED,
            IndexMode::Both => FLAG_INDEX_BOTH,
        }
    }
}

/// A field as declared in the project config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FieldDef {
    #[serde(rename = "type")]
    pub kind: FieldKind,
    pub index: Option<IndexMode>,
    pub cutlen: u32,
    pub weight: u16,
    pub phrase: Option<bool>,
    #[serde(rename = "no_bool")]
    pub non_bool: Option<bool>,
    pub fid: u8,
}

/// A compiled field: declaration plus the derived flag byte and its
/// virtual field number on the wire.
#[derive(Debug, Clone)]
pub struct FieldMeta {
    pub name: String,
    pub kind: FieldKind,
    pub flag: u8,
    pub vno: u8,
    pub cutlen: u32,
    pub weight: u16,
}

impl FieldMeta {
    pub(crate) fn new(name: &str, def: &FieldDef) -> FieldMeta {
        let mut meta = FieldMeta {
            name: name.to_string(),
            kind: def.kind,
            flag: 0,
            vno: 0,
            cutlen: def.cutlen,
            weight: def.weight,
        };
        match def.kind {
            FieldKind::Id => {
                meta.flag = FLAG_INDEX_SELF;
            }
            FieldKind::Title => {
                meta.flag = FLAG_INDEX_BOTH | FLAG_WITH_POSITION;
                meta.weight = 5;
            }
            FieldKind::Body => {
                meta.vno = MIXED_VNO;
                meta.flag = FLAG_INDEX_SELF | FLAG_WITH_POSITION;
                meta.cutlen = 300;
            }
            _ => {}
        }
        // explicit index mode overrides the kind default; the body field
        // always stays self-indexed and the id field keeps its self index
        if let Some(mode) = def.index {
            if def.kind != FieldKind::Body {
                meta.flag = (meta.flag & !FLAG_INDEX_BOTH) | mode.flag();
                if def.kind == FieldKind::Id {
                    meta.flag |= FLAG_INDEX_SELF;
                }
            }
        }
        if meta.weight == 0 {
            meta.weight = 1;
        }
        if def.kind == FieldKind::Body {
            meta.weight &= MAX_WDF;
        }
        match def.phrase {
            Some(true) => meta.flag |= FLAG_WITH_POSITION,
            Some(false) => meta.flag &= !FLAG_WITH_POSITION,
            None => {}
        }
        match def.non_bool {
            Some(true) => meta.flag |= FLAG_NON_BOOL,
            Some(false) => meta.flag &= !FLAG_NON_BOOL,
            None => {}
        }
        meta
    }

    pub fn has_index(&self) -> bool {
        self.flag & FLAG_INDEX_BOTH != 0
    }

    pub fn has_index_self(&self) -> bool {
        self.flag & FLAG_INDEX_SELF != 0
    }

    pub fn has_index_mixed(&self) -> bool {
        self.flag & FLAG_INDEX_MIXED != 0
    }

    pub fn with_pos(&self) -> bool {
        self.flag & FLAG_WITH_POSITION != 0
    }

    pub fn is_numeric(&self) -> bool {
        self.kind == FieldKind::Numeric
    }

    pub fn is_special(&self) -> bool {
        matches!(self.kind, FieldKind::Id | FieldKind::Title | FieldKind::Body)
    }

    /// An id field is indexed as a boolean term unless `no_bool` was set.
    pub fn is_bool_index(&self) -> bool {
        self.flag & FLAG_NON_BOOL == 0 && self.kind == FieldKind::Id
    }
}
