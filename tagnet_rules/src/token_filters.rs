//! Filters for tokens.

mod numeric;
mod stop_words;

pub use numeric::NumericTokenFilter;
pub use stop_words::StopWordFilter;
