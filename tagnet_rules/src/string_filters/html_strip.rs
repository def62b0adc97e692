use regex::Regex;

use crate::StringFilter;

/// Markup remover.
///
/// Drops `<script>` and `<style>` blocks and comments, replaces every other tag and `&nbsp;`
/// with a space, and collapses double spaces.
#[derive(Clone, Debug)]
pub struct HtmlStripFilter {
    script_re: Regex,
    style_re: Regex,
    comment_re: Regex,
    tag_re: Regex,
}

impl HtmlStripFilter {
    /// Creates a new HtmlStripFilter.
    ///
    /// # Returns
    ///
    /// A new HtmlStripFilter.
    pub fn new() -> Self {
        Self {
            script_re: Regex::new(r"(?is)<script.*?>.*?</script>").expect("compile script regex"),
            style_re: Regex::new(r"(?is)<style.*?>.*?</style>").expect("compile style regex"),
            comment_re: Regex::new(r"(?s)<!--.*?-->\n?").expect("compile comment regex"),
            tag_re: Regex::new(r"(?s)<.*?>").expect("compile tag regex"),
        }
    }
}

impl Default for HtmlStripFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl StringFilter for HtmlStripFilter {
    fn filter(&self, string: &str) -> String {
        let s = self.script_re.replace_all(string.trim(), "");
        let s = self.style_re.replace_all(&s, "");
        let s = self.comment_re.replace_all(&s, "");
        let s = self.tag_re.replace_all(&s, " ");
        s.replace("&nbsp;", " ").replace("  ", " ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_tags() {
        let filter = HtmlStripFilter::new();

        assert_eq!(
            " How do I sort a list ? ",
            filter.filter("<p>How do I sort a <code>list</code>?</p>")
        );
    }

    #[test]
    fn test_strip_script_and_comment() {
        let filter = HtmlStripFilter::new();

        assert_eq!(
            "a b",
            filter.filter("a<SCRIPT type=\"x\">var x = 1;</SCRIPT><!-- note\n-->\n b")
        );
    }

    #[test]
    fn test_strip_nbsp() {
        let filter = HtmlStripFilter::new();

        assert_eq!("a b", filter.filter("a&nbsp;b"));
    }

    #[test]
    fn test_plain_text() {
        let filter = HtmlStripFilter::new();

        assert_eq!("plain text", filter.filter("  plain text\n"));
    }
}
