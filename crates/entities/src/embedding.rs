use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A stored embedding vector for some target (currently only entities).
/// `vector` is a little-endian `f64` sequence, not a pgvector column — the
/// embedding store compares vectors in application code so it stays
/// testable without a live database. `content_hash` is the SHA-256 of
/// `source_text`, used to detect staleness without re-embedding unchanged
/// text.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "embedding")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: Uuid,
  pub target_type: String,
  pub target_id: Uuid,
  pub model: String,
  #[serde(skip)]
  pub vector: Vec<u8>,
  pub content_hash: String,
  pub source_text: String,
  pub created_at: DateTimeWithTimeZone,
  pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
