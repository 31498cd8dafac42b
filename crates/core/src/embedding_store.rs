//! C3: embedding persistence and nearest-neighbor search.
//!
//! Vectors are stored as a little-endian `f64` sequence rather than a
//! native vector column, so similarity search runs in application code and
//! stays testable without a live database (see the concurrency model: at
//! most one streaming query at a time, collect-then-process).

use epigraph_entities::embedding;
use epigraph_llm::cosine_similarity;
use epigraph_shared::AppError;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub fn vector_to_blob(vector: &[f64]) -> Vec<u8> {
  let mut bytes = Vec::with_capacity(vector.len() * 8);
  for v in vector {
    bytes.extend_from_slice(&v.to_le_bytes());
  }
  bytes
}

pub fn blob_to_vector(blob: &[u8]) -> Vec<f64> {
  blob
    .chunks_exact(8)
    .map(|chunk| f64::from_le_bytes(chunk.try_into().expect("chunks_exact(8) yields 8-byte slices")))
    .collect()
}

pub fn hash_source_text(source_text: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(source_text.as_bytes());
  format!("{:x}", hasher.finalize())
}

/// Does the stored embedding for this target/model need re-computing?
/// True when there is no row yet, or the stored content hash no longer
/// matches `source_text`.
pub async fn needs_refresh<C: ConnectionTrait>(
  db: &C,
  target_type: &str,
  target_id: Uuid,
  model: &str,
  source_text: &str,
) -> Result<bool, AppError> {
  let existing = find(db, target_type, target_id, model).await?;
  Ok(match existing {
    Some(row) => row.content_hash != hash_source_text(source_text),
    None => true,
  })
}

async fn find<C: ConnectionTrait>(
  db: &C,
  target_type: &str,
  target_id: Uuid,
  model: &str,
) -> Result<Option<embedding::Model>, AppError> {
  embedding::Entity::find()
    .filter(embedding::Column::TargetType.eq(target_type))
    .filter(embedding::Column::TargetId.eq(target_id))
    .filter(embedding::Column::Model.eq(model))
    .one(db)
    .await
    .map_err(AppError::new)
}

/// Insert or refresh the embedding for a target. No-ops (returns the
/// existing row untouched) when `source_text`'s hash hasn't changed, so
/// repeated calls for unchanged content never re-embed or rewrite.
pub async fn upsert<C: ConnectionTrait>(
  db: &C,
  target_type: &str,
  target_id: Uuid,
  model: &str,
  vector: &[f64],
  source_text: &str,
) -> Result<embedding::Model, AppError> {
  let content_hash = hash_source_text(source_text);

  if let Some(existing) = find(db, target_type, target_id, model).await? {
    if existing.content_hash == content_hash {
      return Ok(existing);
    }
    let mut active: embedding::ActiveModel = existing.into();
    active.vector = Set(vector_to_blob(vector));
    active.content_hash = Set(content_hash);
    active.source_text = Set(source_text.to_owned());
    active.updated_at = Set(chrono::Utc::now().into());
    return active.update(db).await.map_err(AppError::new);
  }

  let now = chrono::Utc::now().into();
  let active = embedding::ActiveModel {
    id: Set(Uuid::now_v7()),
    target_type: Set(target_type.to_owned()),
    target_id: Set(target_id),
    model: Set(model.to_owned()),
    vector: Set(vector_to_blob(vector)),
    content_hash: Set(content_hash),
    source_text: Set(source_text.to_owned()),
    created_at: Set(now),
    updated_at: Set(now),
  };
  active.insert(db).await.map_err(AppError::new)
}

/// One search hit: the embedding row and its similarity score mapped to
/// `[0.0, 1.0]` via `(cosine + 1) / 2`.
#[derive(Debug, Clone)]
pub struct SearchHit {
  pub target_id: Uuid,
  pub score: f64,
}

/// Search every embedding for `target_type`/`model` against `query_vector`,
/// returning hits scoring at or above `min_score`, highest first.
pub async fn search<C: ConnectionTrait>(
  db: &C,
  target_type: &str,
  model: &str,
  query_vector: &[f64],
  min_score: f64,
) -> Result<Vec<SearchHit>, AppError> {
  let rows = embedding::Entity::find()
    .filter(embedding::Column::TargetType.eq(target_type))
    .filter(embedding::Column::Model.eq(model))
    .all(db)
    .await
    .map_err(AppError::new)?;

  let mut hits: Vec<SearchHit> = rows
    .into_iter()
    .map(|row| {
      let vector = blob_to_vector(&row.vector);
      let cosine = cosine_similarity(query_vector, &vector);
      SearchHit {
        target_id: row.target_id,
        score: (cosine + 1.0) / 2.0,
      }
    })
    .filter(|hit| hit.score >= min_score)
    .collect();

  hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
  Ok(hits)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn blob_round_trips_vectors() {
    let v = vec![0.1, -2.5, 3.0, 0.0];
    assert_eq!(blob_to_vector(&vector_to_blob(&v)), v);
  }

  #[test]
  fn empty_vector_round_trips() {
    let v: Vec<f64> = vec![];
    assert_eq!(blob_to_vector(&vector_to_blob(&v)), v);
  }

  #[test]
  fn hash_is_stable_and_content_sensitive() {
    assert_eq!(hash_source_text("hello"), hash_source_text("hello"));
    assert_ne!(hash_source_text("hello"), hash_source_text("world"));
  }
}
