//! Worker for the Paragraph publishing platform.
//!
//! Paragraph stores each post as an Arweave transaction tagged with the
//! application name and carrying the full post document as embedded JSON.
//! A revision is a fresh transaction whose document references the original
//! post's transaction id in `arweaveId`.

use crate::engine::{DataSourceFilter, Task, Worker};
use crate::provider::arweave;
use crate::schema::{
    Action, Activity, ActivityType, Media, Metadata, Network, Platform, SocialPost, Tag, WorkerId,
};
use crate::utils::error::{IndexerError, Result};
use crate::utils::json;
use async_trait::async_trait;
use serde_json::Value;

const APP_NAME: &str = "Paragraph";

// Decoded tag names. Paragraph has written its application tag both with
// and without the separator over time.
const TAG_APP_NAME: &str = "App-Name";
const TAG_APP_NAME_COMPACT: &str = "AppName";
const TAG_CONTRIBUTOR: &str = "Contributor";
const TAG_PUBLICATION_SLUG: &str = "PublicationSlug";

const CONTENT_URI_PREFIX: &str = "https://arweave.net/";

/// Worker normalizing Paragraph posts and revisions.
#[derive(Debug, Default)]
pub struct ParagraphWorker;

impl ParagraphWorker {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Worker for ParagraphWorker {
    fn name(&self) -> WorkerId {
        WorkerId::Paragraph
    }

    fn platform(&self) -> Platform {
        Platform::Paragraph
    }

    fn networks(&self) -> Vec<Network> {
        vec![Network::Arweave]
    }

    fn tags(&self) -> Vec<Tag> {
        vec![Tag::Social]
    }

    fn types(&self) -> Vec<ActivityType> {
        vec![ActivityType::SocialPost, ActivityType::SocialRevise]
    }

    fn filter(&self) -> DataSourceFilter {
        // Paragraph posts come from arbitrary owners; nothing to prune on.
        DataSourceFilter::Arweave {
            owner_addresses: vec![],
        }
    }

    async fn match_task(&self, task: &Task) -> Result<bool> {
        if !self.networks().contains(&task.network()) {
            return Err(IndexerError::UnsupportedTask(format!(
                "network {} is not served by worker {}",
                task.network(),
                self.name()
            )));
        }

        let Task::Arweave(task) = task;

        let tags = task.transaction.decoded_tags()?;

        Ok(tags.iter().any(|(name, value)| {
            (name == TAG_APP_NAME || name == TAG_APP_NAME_COMPACT) && value == APP_NAME
        }))
    }

    async fn transform(&self, task: &Task) -> Result<Activity> {
        let Task::Arweave(task) = task;

        let tags = task.transaction.decoded_tags()?;
        let data = arweave::base64_decode(&task.transaction.data)?;
        let document: Value = serde_json::from_slice(&data)
            .map_err(|error| IndexerError::Decoding(format!("parse post document: {error}")))?;

        let contributor = tag_value(&tags, TAG_CONTRIBUTOR).unwrap_or_default().to_string();

        let publication_slug = tag_value(&tags, TAG_PUBLICATION_SLUG).unwrap_or_default();
        let handle = publication_slug
            .strip_prefix('@')
            .unwrap_or(publication_slug)
            .to_string();

        let owner = arweave::owner_address(&task.transaction.owner)?;

        // A revision's document names the original post's transaction.
        let kind = if json::get_string(&document, "arweaveId").is_empty() {
            ActivityType::SocialPost
        } else {
            ActivityType::SocialRevise
        };

        let metadata = SocialPost {
            handle,
            title: json::get_string(&document, "title"),
            subtitle: subtitle(&document),
            summary: json::get_string(&document, "post_preview"),
            body: body(&document),
            media: media(&document),
            profile_id: json::get_string(&document, "authors.0"),
            publication_id: json::get_string(&document, "slug"),
            content_uri: format!("{CONTENT_URI_PREFIX}{}", task.transaction.id),
            tags: json::get_string_array(&document, "categories"),
            timestamp: timestamp(&document),
        };

        let mut activity = task.build_activity()?;
        activity.platform = Some(self.platform());
        activity.kind = kind;
        activity.actions = vec![Action {
            kind,
            tag: Tag::Social,
            platform: self.platform().to_string(),
            from: contributor,
            to: owner,
            metadata: Metadata::SocialPost(metadata),
        }];

        Ok(activity)
    }
}

fn tag_value<'a>(tags: &'a [(String, String)], name: &str) -> Option<&'a str> {
    tags.iter()
        .find(|(tag_name, _)| tag_name == name)
        .map(|(_, value)| value.as_str())
}

fn subtitle(document: &Value) -> Option<String> {
    let subtitle = json::get_string(document, "subtitle");
    (!subtitle.is_empty()).then_some(subtitle)
}

/// Prefers the markdown rendition of the post, falling back to the static
/// HTML one.
fn body(document: &Value) -> String {
    let markdown = json::get_string(document, "markdown");
    if markdown.is_empty() {
        json::get_string(document, "staticHtml")
    } else {
        markdown
    }
}

/// Post timestamp in seconds: `updatedAt` wins over `publishedAt`, both
/// epoch milliseconds.
fn timestamp(document: &Value) -> u64 {
    let mut milliseconds = json::get_u64(document, "updatedAt");
    if milliseconds == 0 {
        milliseconds = json::get_u64(document, "publishedAt");
    }

    milliseconds / 1000
}

fn media(document: &Value) -> Vec<Media> {
    let src = json::get_string(document, "cover_img.img.src");
    if src.is_empty() {
        return Vec::new();
    }

    vec![Media {
        address: src,
        mime_type: "image/jpeg".to_string(),
    }]
}
