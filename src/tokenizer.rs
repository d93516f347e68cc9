//! Pluggable tokenization.
//!
//! The servers do their own heavy-duty text analysis; the client only
//! needs to split field values and query fragments into terms before
//! they go on the wire. The splitter is injected per facade instance.

use std::sync::Arc;

pub trait Tokenizer: Send + Sync {
    fn tokens(&self, text: &str) -> Vec<String>;
}

/// Shared handle to a tokenizer.
pub type TokenizerRef = Arc<dyn Tokenizer>;

/// Splits on ASCII spaces, dropping empty fragments.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn tokens(&self, text: &str) -> Vec<String> {
        text.split(' ')
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect()
    }
}

pub fn default_tokenizer() -> TokenizerRef {
    Arc::new(WhitespaceTokenizer)
}
