//! Activity and action records, the canonical output of the engine.

use crate::schema::metadata::Metadata;
use crate::schema::network::Network;
use crate::utils::error::IndexerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The publishing platform that produced a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Paragraph,
    Mirror,
}

impl Platform {
    /// Platform display name, as emitted in activity JSON.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Paragraph => "Paragraph",
            Platform::Mirror => "Mirror",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category tag of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tag {
    Social,
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Social => f.write_str("social"),
        }
    }
}

/// Type of an activity or action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityType {
    #[serde(rename = "post")]
    SocialPost,
    #[serde(rename = "revise")]
    SocialRevise,
}

const ACTIVITY_TYPE_NAMES: &[(ActivityType, &str)] = &[
    (ActivityType::SocialPost, "post"),
    (ActivityType::SocialRevise, "revise"),
];

impl ActivityType {
    /// Stable string form, as emitted in activity JSON.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityType::SocialPost => "post",
            ActivityType::SocialRevise => "revise",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityType {
    type Err = IndexerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ACTIVITY_TYPE_NAMES
            .iter()
            .find(|(_, name)| value.eq_ignore_ascii_case(name))
            .map(|(kind, _)| *kind)
            .ok_or_else(|| IndexerError::Config(format!("unknown activity type: {value}")))
    }
}

/// Fee paid for a transaction, in the network's native unit.
///
/// The amount is a decimal integer kept as a string so it serializes
/// bit-exactly regardless of magnitude.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
    pub amount: String,
    pub decimal: u32,
}

/// A typed sub-event within an activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: ActivityType,
    pub tag: Tag,
    pub platform: String,
    pub from: String,
    pub to: String,
    pub metadata: Metadata,
}

/// A normalized record of one on-chain event.
///
/// Invariants: `id` is unique within `(network, worker)`, `timestamp`
/// matches the originating block, and when `actions` is non-empty the
/// activity type equals the type of the first action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub network: Network,
    #[serde(default)]
    pub index: u64,
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: ActivityType,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub platform: Option<Platform>,
    pub fee: Fee,
    pub actions: Vec<Action>,
    pub status: bool,
    pub timestamp: i64,
}
