//! Client for the scout full-text search engine.
//!
//! A project is described by a TOML file naming its fields and the two
//! server endpoints. [`Indexer`] talks to the index server and handles
//! document ingestion, synonyms and index maintenance; [`Searcher`]
//! talks to the search server and covers retrieval, query assembly and
//! the suggestion endpoints. Both ride the same binary frame protocol
//! implemented in [`protocol`].
//!
//! ```no_run
//! use scout_client::{Document, Indexer, Searcher};
//!
//! # fn main() -> scout_client::Result<()> {
//! let mut indexer = Indexer::open("demo.toml")?;
//! let doc: Document = [("id", "1"), ("message", "hello world")]
//!     .into_iter()
//!     .collect();
//! indexer.add(&doc)?;
//!
//! let mut searcher = Searcher::open("demo.toml")?;
//! for doc in searcher.search(&["hello"])? {
//!     println!("{} ({}%)", doc.docid, doc.percent);
//! }
//! # Ok(())
//! # }
//! ```

pub mod conn;
pub mod document;
pub mod error;
pub mod indexer;
pub mod protocol;
mod query;
pub mod schema;
pub mod searcher;
pub mod tokenizer;

#[cfg(test)]
pub(crate) mod testutil;

pub use conn::Connection;
pub use document::Document;
pub use error::{Error, Result};
pub use indexer::Indexer;
pub use protocol::{codes, Command};
pub use schema::config::{DEFAULT_INDEX_SERVER, DEFAULT_SEARCH_SERVER, LOG_DB};
pub use schema::{
    Config, FieldDef, FieldKind, FieldMeta, IndexMode, Schema, Setting, MAX_WDF, MIXED_VNO,
};
pub use searcher::{Facet, HotKind, Searcher};
pub use tokenizer::{default_tokenizer, Tokenizer, TokenizerRef, WhitespaceTokenizer};
