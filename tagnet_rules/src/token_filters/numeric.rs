use crate::TokenFilter;

/// Drops tokens made only of ASCII digits.
#[derive(Clone, Copy, Debug, Default)]
pub struct NumericTokenFilter;

impl TokenFilter for NumericTokenFilter {
    fn keep(&self, token: &str) -> bool {
        token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric() {
        assert!(!NumericTokenFilter.keep("2014"));
        assert!(NumericTokenFilter.keep("x86"));
        assert!(NumericTokenFilter.keep("3d"));
        assert!(NumericTokenFilter.keep("１２"));
    }
}
