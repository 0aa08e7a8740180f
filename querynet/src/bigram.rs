use std::io::BufRead;

use hashbrown::HashMap;

use crate::errors::{QuerynetError, Result};

/// Sentinel character placed on both ends of a word before bigrams are extracted.
pub const BOUNDARY: char = '#';

/// Lookup table from bigrams to feature indices.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BigramTable {
    bigrams: Vec<String>,
    ids: HashMap<String, usize>,
}

impl BigramTable {
    /// Loads a table from a reader.
    ///
    /// The first whitespace-delimited token of each line is used as a bigram, and the line
    /// number becomes its index.
    ///
    /// # Arguments
    ///
    /// * `rdr` - A data source.
    ///
    /// # Errors
    ///
    /// When `rdr` generates an error, it will be returned as is. If a line has no token or a
    /// bigram appears twice, an error variant will be returned.
    pub fn read<R>(rdr: R) -> Result<Self>
    where
        R: BufRead,
    {
        let mut table = Self::default();
        for (i, line) in rdr.lines().enumerate() {
            let line = line?;
            let bigram = line.split_whitespace().next().ok_or_else(|| {
                QuerynetError::invalid_argument("bigrams", format!("line {} is empty", i + 1))
            })?;
            table.push(bigram)?;
        }
        Ok(table)
    }

    fn push(&mut self, bigram: &str) -> Result<()> {
        if self.ids.contains_key(bigram) {
            return Err(QuerynetError::invalid_argument(
                "bigrams",
                format!("{bigram:?} is duplicated"),
            ));
        }
        self.ids.insert(bigram.to_string(), self.bigrams.len());
        self.bigrams.push(bigram.to_string());
        Ok(())
    }

    /// Number of bigrams, which is also the number of features.
    pub fn len(&self) -> usize {
        self.bigrams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bigrams.is_empty()
    }

    /// Gets the index of a bigram.
    pub fn get(&self, bigram: &str) -> Option<usize> {
        self.ids.get(bigram).copied()
    }

    /// Iterates bigrams in index order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.bigrams.iter().map(String::as_str)
    }

    /// Counts the bigrams of a word.
    ///
    /// The word is surrounded by [`BOUNDARY`], and every pair of adjacent characters found in
    /// the table increments the corresponding slot of `row`. Unknown pairs are ignored.
    ///
    /// # Arguments
    ///
    /// * `word` - A word without whitespace.
    /// * `row` - Feature counts with at least [`BigramTable::len`] slots.
    ///
    /// # Returns
    ///
    /// `true` if at least one bigram was found.
    pub fn vectorize(&self, word: &str, row: &mut [f32]) -> bool {
        debug_assert!(row.len() >= self.len());
        let chars: Vec<char> = std::iter::once(BOUNDARY)
            .chain(word.chars())
            .chain(std::iter::once(BOUNDARY))
            .collect();
        let mut found = false;
        let mut bigram = String::with_capacity(8);
        for pair in chars.windows(2) {
            bigram.clear();
            bigram.extend(pair);
            if let Some(id) = self.get(&bigram) {
                row[id] += 1.0;
                found = true;
            }
        }
        found
    }
}
