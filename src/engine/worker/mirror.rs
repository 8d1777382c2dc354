//! Worker for the Mirror publishing platform.
//!
//! Mirror uploads every entry from a single well-known Arweave account. The
//! entry document carries the author, an optional wrapped-NFT image on
//! IPFS, and content digests that link revisions to the post they revise.
//! The first transaction seen with a given origin digest is the post; later
//! ones are revisions. That first-seen record lives in the
//! `DatasetMirrorPost` side-table.

use crate::config::Module;
use crate::engine::{DataSourceFilter, Task, Worker};
use crate::provider::arweave;
use crate::provider::ipfs::{self, FetchMode};
use crate::schema::{
    Action, Activity, ActivityType, DatasetMirrorPost, Media, Metadata, Network, Platform,
    SocialPost, Tag, WorkerId,
};
use crate::storage::DatabaseClient;
use crate::utils::error::{IndexerError, Result};
use crate::utils::json;
use crate::utils::logging::{self, LogLevel};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// The Arweave account Mirror publishes from.
pub const ADDRESS_MIRROR: &str = "Ky1c1Kkt-jZ9sY1hvLF5nCf6WWdBhIU5Un_BMYh-t3c";

const TAG_CONTENT_DIGEST: &str = "Content-Digest";
const TAG_ORIGINAL_CONTENT_DIGEST: &str = "Original-Content-Digest";

const CONTENT_URI_PREFIX: &str = "ar://";
const DEFAULT_IPFS_TIMEOUT: Duration = Duration::from_secs(30);

/// Worker normalizing Mirror posts and revisions.
pub struct MirrorWorker {
    ipfs: ipfs::HttpClient,
    database: Arc<dyn DatabaseClient>,
}

impl MirrorWorker {
    /// Creates the worker with its IPFS client and database handle.
    ///
    /// # Errors
    ///
    /// Returns `IndexerError::Config` when the gateway list is empty.
    pub fn new(config: &Module, database: Arc<dyn DatabaseClient>) -> Result<Self> {
        let timeout = config
            .parameters
            .ipfs_timeout_secs
            .map_or(DEFAULT_IPFS_TIMEOUT, Duration::from_secs);

        let ipfs = ipfs::HttpClient::new(&config.parameters.ipfs_gateways, timeout)?;

        Ok(Self { ipfs, database })
    }

    /// Fetches the wrapped-NFT image and sniffs its MIME type.
    ///
    /// When no gateway can serve the blob the media entry is omitted and
    /// the transform continues.
    async fn fetch_media(&self, image_uri: &str) -> Option<Media> {
        match self.ipfs.fetch(image_uri, FetchMode::Quick).await {
            Ok(bytes) => Some(Media {
                address: format!("ipfs://{image_uri}"),
                mime_type: ipfs::sniff_mime(&bytes).to_string(),
            }),
            Err(error) => {
                logging::log(
                    LogLevel::Warning,
                    &format!("omitting media, nft image unavailable: {error}"),
                );
                None
            }
        }
    }

    /// Decides whether the entry is a post or a revision.
    ///
    /// A revision either carries an empty origin digest, or a non-empty one
    /// already recorded in the side-table under a different transaction.
    async fn decide_type(
        &self,
        transaction_id: &str,
        origin_content_digest: &str,
        empty_origin_digest: bool,
    ) -> Result<ActivityType> {
        if empty_origin_digest {
            return Ok(ActivityType::SocialRevise);
        }

        if !origin_content_digest.is_empty() {
            if let Some(post) = self
                .database
                .load_dataset_mirror_post(origin_content_digest)
                .await?
            {
                if post.transaction_id != transaction_id {
                    return Ok(ActivityType::SocialRevise);
                }
            }
        }

        Ok(ActivityType::SocialPost)
    }
}

#[async_trait]
impl Worker for MirrorWorker {
    fn name(&self) -> WorkerId {
        WorkerId::Mirror
    }

    fn platform(&self) -> Platform {
        Platform::Mirror
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
        DataSourceFilter::Arweave {
            owner_addresses: vec![ADDRESS_MIRROR.to_string()],
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

        Ok(arweave::owner_address(&task.transaction.owner)? == ADDRESS_MIRROR)
    }

    async fn transform(&self, task: &Task) -> Result<Activity> {
        let Task::Arweave(task) = task;
        let transaction_id = task.transaction.id.clone();

        let mut content_digest = String::new();
        let mut origin_content_digest = String::new();
        let mut empty_origin_digest = false;

        for (name, value) in task.transaction.decoded_tags()? {
            match name.as_str() {
                TAG_CONTENT_DIGEST => content_digest = value,
                TAG_ORIGINAL_CONTENT_DIGEST => {
                    empty_origin_digest = value.is_empty();
                    origin_content_digest = value;
                }
                _ => {}
            }
        }

        let data = arweave::base64_decode(&task.transaction.data)?;
        let document: Value = serde_json::from_slice(&data)
            .map_err(|error| IndexerError::Decoding(format!("parse entry document: {error}")))?;

        let author = json::get_string(&document, "authorship.contributor");

        let mut media = Vec::new();
        let image_uri = json::get_string(&document, "wnft.imageURI");
        if !image_uri.is_empty() {
            media.extend(self.fetch_media(&image_uri).await);
        }

        // Digest precedence: origin digest, then content digest, then the
        // digest embedded in the document.
        let publication_id = if !origin_content_digest.is_empty() {
            origin_content_digest.clone()
        } else if !content_digest.is_empty() {
            content_digest
        } else {
            json::get_string(&document, "digest")
        };

        let kind = self
            .decide_type(&transaction_id, &origin_content_digest, empty_origin_digest)
            .await?;

        let metadata = SocialPost {
            title: json::get_string(&document, "content.title"),
            body: json::get_string(&document, "content.body"),
            media,
            publication_id,
            content_uri: format!("{CONTENT_URI_PREFIX}{transaction_id}"),
            timestamp: json::get_u64(&document, "content.timestamp"),
            ..SocialPost::default()
        };

        // Record the first-seen transaction for this digest.
        self.database
            .save_dataset_mirror_post(&DatasetMirrorPost {
                transaction_id: transaction_id.clone(),
                origin_content_digest,
            })
            .await?;

        let mut activity = task.build_activity()?;
        activity.platform = Some(self.platform());
        activity.to = ADDRESS_MIRROR.to_string();
        activity.kind = kind;
        activity.actions = vec![Action {
            kind,
            tag: Tag::Social,
            platform: self.platform().to_string(),
            from: author,
            to: ADDRESS_MIRROR.to_string(),
            metadata: Metadata::SocialPost(metadata),
        }];

        Ok(activity)
    }
}
