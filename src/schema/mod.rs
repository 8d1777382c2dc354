//! Canonical data model: activities, actions, metadata, and checkpoints.
//!
//! Everything the engine persists or exchanges between components lives
//! here. The small identifier enums ([`Network`], [`WorkerId`],
//! [`Platform`], [`Tag`], [`ActivityType`]) carry stable lowercase string
//! forms that round-trip through JSON, YAML, and SQL column values; they are
//! implemented as lookup tables with validating parsers rather than
//! generated code.

pub mod activity;
pub mod checkpoint;
pub mod metadata;
pub mod network;
pub mod worker;

pub use activity::{Action, Activity, ActivityType, Fee, Platform, Tag};
pub use checkpoint::{Checkpoint, DatasetMirrorPost};
pub use metadata::{Media, Metadata, SocialPost};
pub use network::Network;
pub use worker::WorkerId;
