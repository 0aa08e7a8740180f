use crate::bigram::BigramTable;
use crate::errors::{QuerynetError, Result};
use crate::tensor::Tensor;

/// Default number of words encoded per sentence.
pub const DEFAULT_MAX_WORDS: usize = 10;

/// Encoder that converts a sentence into bigram count features.
pub struct SentenceEncoder<'a> {
    table: &'a BigramTable,
    max_words: usize,
}

impl<'a> SentenceEncoder<'a> {
    /// Creates a new encoder.
    ///
    /// # Arguments
    ///
    /// * `table` - A bigram table.
    /// * `max_words` - Number of rows in the encoded tensor.
    pub const fn new(table: &'a BigramTable, max_words: usize) -> Self {
        Self { table, max_words }
    }

    /// Encodes a sentence.
    ///
    /// The sentence is split on whitespace, and the `i`-th word fills the `i`-th row. Rows for
    /// missing words stay zero.
    ///
    /// # Returns
    ///
    /// A tensor of shape `(1, max_words, table.len())`.
    ///
    /// # Errors
    ///
    /// If the sentence contains more than `max_words` words, an error variant will be returned.
    pub fn encode(&self, text: &str) -> Result<Tensor> {
        let n_words = text.split_whitespace().count();
        if n_words > self.max_words {
            return Err(QuerynetError::invalid_argument(
                "text",
                format!(
                    "contains {} words, but at most {} can be encoded",
                    n_words, self.max_words
                ),
            ));
        }
        let mut data = Tensor::zeros(vec![1, self.max_words, self.table.len()]);
        for (i, word) in text.split_whitespace().enumerate() {
            self.table.vectorize(word, data.row_mut(i));
        }
        Ok(data)
    }
}
