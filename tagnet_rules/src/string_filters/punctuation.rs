use crate::StringFilter;

/// Removes ASCII punctuation characters. Neighboring characters are joined, so `"don't"`
/// becomes `"dont"`.
#[derive(Clone, Copy, Debug, Default)]
pub struct PunctuationFilter;

impl StringFilter for PunctuationFilter {
    fn filter(&self, string: &str) -> String {
        string
            .chars()
            .filter(|c| !c.is_ascii_punctuation())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_punctuation() {
        assert_eq!(
            "dont use c or objc",
            PunctuationFilter.filter("don't use c++, or obj-c!")
        );
    }

    #[test]
    fn test_keep_non_ascii() {
        assert_eq!("日本語。", PunctuationFilter.filter("日本語。"));
    }
}
