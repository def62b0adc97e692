//! Rule base text cleanup for Tagnet.
//!
//! ## Examples
//!
//! ```
//! use tagnet_rules::string_filters::{HtmlStripFilter, LowercaseFilter, PunctuationFilter};
//! use tagnet_rules::token_filters::{NumericTokenFilter, StopWordFilter};
//! use tagnet_rules::TextCleaner;
//!
//! let cleaner = TextCleaner::new()
//!     .string_filter(HtmlStripFilter::new())
//!     .string_filter(LowercaseFilter)
//!     .string_filter(PunctuationFilter)
//!     .token_filter(NumericTokenFilter)
//!     .token_filter(StopWordFilter::new(["the", "on"]));
//!
//! let words = cleaner.word_counts("<p>The cat sat on the <b>mat</b>, 42 times!</p>");
//!
//! assert_eq!(1, words.count("cat"));
//! assert_eq!(1, words.count("mat"));
//! assert_eq!(0, words.count("the"));
//! assert_eq!(0, words.count("42"));
//! ```

mod cleaner;

pub mod string_filters;
pub mod token_filters;

pub use cleaner::TextCleaner;

/// Rewrites a whole text before it is split into tokens.
pub trait StringFilter {
    /// Filters the specified string.
    ///
    /// # Arguments
    ///
    /// * `string` - Input text.
    ///
    /// # Returns
    ///
    /// A processed text.
    fn filter(&self, string: &str) -> String;
}

/// Decides whether a token is kept.
pub trait TokenFilter {
    /// Returns `true` if `token` must be kept.
    fn keep(&self, token: &str) -> bool;
}
