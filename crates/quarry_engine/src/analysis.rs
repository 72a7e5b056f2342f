//! Text analysis for tokenized fields.

use tantivy::tokenizer::{LowerCaser, RemoveLongFilter, SimpleTokenizer, TextAnalyzer, TokenStream};

/// Tokens longer than this are dropped.
pub const MAX_TOKEN_LEN: usize = 255;

/// Splits text on non-alphanumeric characters and lowercases each token.
///
/// The same analyzer is applied at index time and when building
/// [`Query::Text`](crate::Query::Text), so a query matches exactly the
/// tokens that were indexed.
#[derive(Clone)]
pub struct Analyzer {
    inner: TextAnalyzer,
}

impl Analyzer {
    /// Creates the standard analyzer.
    pub fn new() -> Self {
        let inner = TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(RemoveLongFilter::limit(MAX_TOKEN_LEN))
            .filter(LowerCaser)
            .build();
        Self { inner }
    }

    /// Returns the tokens of `text` in order, duplicates included.
    pub fn tokens(&self, text: &str) -> Vec<String> {
        let mut analyzer = self.inner.clone();
        let mut stream = analyzer.token_stream(text);
        let mut tokens = Vec::new();
        while stream.advance() {
            tokens.push(stream.token().text.clone());
        }
        tokens
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer").finish_non_exhaustive()
    }
}
