//! Action metadata variants.

use serde::{Deserialize, Serialize};

/// Polymorphic metadata attached to an action.
///
/// Serialized untagged: the variant's fields appear inline in the action
/// JSON, matching the output schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Metadata {
    SocialPost(SocialPost),
}

/// A media asset referenced by a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub address: String,
    pub mime_type: String,
}

/// Metadata of a social publishing event (post or revise).
///
/// Empty fields are omitted from the serialized form; platforms populate
/// different subsets of this schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialPost {
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub handle: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub summary: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub body: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub media: Vec<Media>,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub profile_id: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub publication_id: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub content_uri: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "is_zero", default)]
    pub timestamp: u64,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(value: &u64) -> bool {
    *value == 0
}
