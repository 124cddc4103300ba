use regex::Regex;

const COMMENT_LINK_PATTERN: &str = concat!(
    r"https?://[^/\s]+/(?:projects|users)/[^/\s]+/repos/[^/\s]+/",
    r"pull-requests/\d+/overview\?commentId=(\d+)",
);

/// A review comment mentioned in a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentReference {
    pub review_url: String,
    pub comment_id: String,
}

/// Finds Stash review-comment links in free-form text.
///
/// Compiled once at startup and shared by reference.
#[derive(Debug, Clone)]
pub struct ReferenceExtractor {
    pattern: Regex,
}

impl ReferenceExtractor {
    pub fn new() -> Self {
        let pattern = Regex::new(COMMENT_LINK_PATTERN).expect("comment link pattern is valid");
        Self { pattern }
    }

    /// Returns the first link in `text`, if any.
    pub fn extract(&self, text: &str) -> Option<CommentReference> {
        let caps = self.pattern.captures(text)?;
        Some(CommentReference {
            review_url: caps.get(0)?.as_str().to_string(),
            comment_id: caps.get(1)?.as_str().to_string(),
        })
    }
}

impl Default for ReferenceExtractor {
    fn default() -> Self {
        Self::new()
    }
}
