use tagnet::WordCounts;

use crate::string_filters::{HtmlStripFilter, LowercaseFilter, PunctuationFilter};
use crate::token_filters::{NumericTokenFilter, StopWordFilter};
use crate::{StringFilter, TokenFilter};

/// Filter pipeline turning raw text into words.
///
/// String filters run in insertion order over the whole text. The result is split on
/// whitespace, and a token is kept only if every token filter keeps it.
#[derive(Default)]
pub struct TextCleaner {
    string_filters: Vec<Box<dyn StringFilter + Send + Sync>>,
    token_filters: Vec<Box<dyn TokenFilter + Send + Sync>>,
}

impl TextCleaner {
    /// Creates an empty pipeline that only splits on whitespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the usual pipeline: markup removal, lower-casing, punctuation removal, numeric
    /// tokens removal, and `stop_words`.
    pub fn standard(stop_words: StopWordFilter) -> Self {
        Self::new()
            .string_filter(HtmlStripFilter::new())
            .string_filter(LowercaseFilter)
            .string_filter(PunctuationFilter)
            .token_filter(NumericTokenFilter)
            .token_filter(stop_words)
    }

    pub fn string_filter<F>(mut self, filter: F) -> Self
    where
        F: StringFilter + Send + Sync + 'static,
    {
        self.string_filters.push(Box::new(filter));
        self
    }

    pub fn token_filter<F>(mut self, filter: F) -> Self
    where
        F: TokenFilter + Send + Sync + 'static,
    {
        self.token_filters.push(Box::new(filter));
        self
    }

    /// Returns the kept tokens in text order.
    pub fn clean(&self, text: &str) -> Vec<String> {
        let mut s = text.to_string();
        for filter in &self.string_filters {
            s = filter.filter(&s);
        }
        s.split_whitespace()
            .filter(|token| self.token_filters.iter().all(|f| f.keep(token)))
            .map(str::to_string)
            .collect()
    }

    /// Counts the kept tokens.
    pub fn word_counts(&self, text: &str) -> WordCounts {
        WordCounts::from_tokens(self.clean(text))
    }
}
