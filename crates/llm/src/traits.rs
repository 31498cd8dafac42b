use async_trait::async_trait;
use epigraph_shared::AppError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// An entity the extractor believes the episode text mentions. Resolution
/// against the existing graph (alias/embedding/context scoring) happens
/// entirely downstream — the extractor only reports what it read.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ExtractedEntity {
  pub name: String,
  pub entity_type_id: String,
}

/// A relationship the extractor believes the episode text asserts between
/// two already-extracted entity names, or between an entity and a literal
/// value (e.g. `HAS_EMAIL` to `"a@example.com"`).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ExtractedRelationship {
  pub source_name: String,
  pub target_name: Option<String>,
  pub target_literal: Option<String>,
  pub relation_type: String,
  pub fact: String,
  /// ISO-8601 partial date, if the text asserts one.
  pub valid_at: Option<String>,
  /// True when the speaker is asserting this fact about themself (e.g. "my
  /// email is..."), as opposed to reporting it about someone else.
  pub self_disclosed: bool,
}

#[async_trait]
pub trait EntityExtractor: Send + Sync {
  async fn extract_entities(
    &self,
    content: &str,
    prior_entity_names: &[String],
  ) -> Result<Vec<ExtractedEntity>, AppError>;
}

#[async_trait]
pub trait RelationshipExtractor: Send + Sync {
  async fn extract_relationships(
    &self,
    content: &str,
    known_entity_names: &[String],
  ) -> Result<Vec<ExtractedRelationship>, AppError>;
}

#[async_trait]
pub trait Embedder: Send + Sync {
  /// Embedding model identifier, stored alongside the vector so a later
  /// model change is detectable rather than silently compared cross-model.
  fn model_name(&self) -> &str;

  async fn embed(&self, text: &str) -> Result<Vec<f64>, AppError>;
}
