use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single unit of conversational or documentary input handed to the
/// ingestion pipeline. Episodes are produced by a stream segmenter that
/// lives outside this crate; the pipeline never persists this struct, only
/// the `EpisodeEntityMention`/`EpisodeRelationshipMention` provenance rows
/// that reference its `id`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Episode {
  /// Caller-assigned identifier, unique within a channel. Must be non-empty.
  pub id: String,
  /// Logical conversation/document stream this episode belongs to. Used by
  /// the entity resolver's channel-recency context score.
  pub channel_id: String,
  pub content: String,
  pub occurred_at: DateTime<Utc>,
}

impl Episode {
  pub fn is_valid(&self) -> bool {
    !self.id.trim().is_empty()
  }
}
