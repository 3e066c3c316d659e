//! Categorized tag generation under a per-category quota.

mod categories;
mod generator;
mod prompt;

pub use categories::{quota_for, CategorizedTags, TagCategory, TaggingConfig, DEFAULT_TAG_LIMIT};
pub use generator::{
    parse_tag_response, LlmTagBackend, MockTagBackend, TagBackend, TagGenerator, TagParseError,
};
pub use prompt::{build_prompt, response_schema};
