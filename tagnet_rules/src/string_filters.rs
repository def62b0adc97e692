//! Filters for raw text.

mod html_strip;
mod lowercase;
mod punctuation;

pub use html_strip::HtmlStripFilter;
pub use lowercase::LowercaseFilter;
pub use punctuation::PunctuationFilter;
