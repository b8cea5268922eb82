//! Validation and pagination limits for interactions.

use serde::Deserialize;

use crate::model::PageRequest;

/// Default maximum reply depth. 1 allows replies to top-level comments only.
pub const DEFAULT_MAX_COMMENT_DEPTH: u32 = 1;

/// Default maximum comment length, in characters after trimming.
pub const DEFAULT_MAX_COMMENT_LENGTH: usize = 5000;

/// Default page size when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Default upper bound on any requested page size.
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

/// Default length, in characters, client signatures are truncated to.
pub const DEFAULT_MAX_CLIENT_SIGNATURE_LENGTH: usize = 255;

/// Default suffix appended to a forked snippet's title.
pub const DEFAULT_FORK_TITLE_SUFFIX: &str = "(Fork)";

/// Default capacity of background delivery queues.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InteractionLimits {
    /// Deepest allowed comment. Top-level comments have depth 0.
    pub max_comment_depth: u32,
    pub max_comment_length: usize,
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub max_client_signature_length: usize,
    pub fork_title_suffix: String,
}

impl Default for InteractionLimits {
    fn default() -> Self {
        Self {
            max_comment_depth: DEFAULT_MAX_COMMENT_DEPTH,
            max_comment_length: DEFAULT_MAX_COMMENT_LENGTH,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            max_client_signature_length: DEFAULT_MAX_CLIENT_SIGNATURE_LENGTH,
            fork_title_suffix: DEFAULT_FORK_TITLE_SUFFIX.to_string(),
        }
    }
}

impl InteractionLimits {
    /// Resolve an optional caller page request against these limits.
    pub fn page(&self, request: Option<PageRequest>) -> PageRequest {
        request
            .unwrap_or(PageRequest::new(1, self.default_page_size))
            .normalized(self.max_page_size)
    }
}
