use std::io::{self, BufRead};

use hashbrown::HashSet;

use crate::TokenFilter;

/// Drops the words of a stop-word list.
#[derive(Clone, Debug, Default)]
pub struct StopWordFilter {
    words: HashSet<String>,
}

impl StopWordFilter {
    /// Creates a new StopWordFilter.
    ///
    /// # Arguments
    ///
    /// * `words` - Stop words.
    ///
    /// # Returns
    ///
    /// A new StopWordFilter.
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            words: words.into_iter().map(Into::into).collect(),
        }
    }

    /// Reads one stop word per line. Surrounding whitespace and blank lines are ignored.
    ///
    /// # Errors
    ///
    /// When `rdr` generates an error, it will be returned as is.
    pub fn from_reader<R>(rdr: R) -> io::Result<Self>
    where
        R: BufRead,
    {
        let mut words = HashSet::new();
        for line in rdr.lines() {
            let line = line?;
            let word = line.trim();
            if !word.is_empty() {
                words.insert(word.to_string());
            }
        }
        Ok(Self { words })
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl TokenFilter for StopWordFilter {
    fn keep(&self, token: &str) -> bool {
        !self.words.contains(token)
    }
}
