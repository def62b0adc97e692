use crate::StringFilter;

/// Lower-case filter.
#[derive(Clone, Copy, Debug, Default)]
pub struct LowercaseFilter;

impl StringFilter for LowercaseFilter {
    fn filter(&self, string: &str) -> String {
        string.to_lowercase()
    }
}
