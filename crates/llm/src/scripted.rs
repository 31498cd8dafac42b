use std::collections::HashMap;

use async_trait::async_trait;
use epigraph_shared::AppError;

use crate::traits::{Embedder, EntityExtractor, ExtractedEntity, ExtractedRelationship, RelationshipExtractor};

/// A deterministic, fixture-driven stand-in for the real LLM boundary.
/// Episode content is looked up verbatim; content with no script entry
/// yields no entities/relationships and a hash-derived embedding, so tests
/// that don't care about extraction can still exercise the embedding store.
#[derive(Debug, Default, Clone)]
pub struct ScriptedLlm {
  pub entities: HashMap<String, Vec<ExtractedEntity>>,
  pub relationships: HashMap<String, Vec<ExtractedRelationship>>,
  pub embeddings: HashMap<String, Vec<f64>>,
}

impl ScriptedLlm {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_entities(mut self, content: impl Into<String>, entities: Vec<ExtractedEntity>) -> Self {
    self.entities.insert(content.into(), entities);
    self
  }

  pub fn with_relationships(
    mut self,
    content: impl Into<String>,
    relationships: Vec<ExtractedRelationship>,
  ) -> Self {
    self.relationships.insert(content.into(), relationships);
    self
  }

  pub fn with_embedding(mut self, text: impl Into<String>, vector: Vec<f64>) -> Self {
    self.embeddings.insert(text.into(), vector);
    self
  }
}

/// A stable embedding derived from the text's bytes, so two scripted runs
/// over the same unregistered text produce the same vector without
/// depending on wall-clock or RNG state.
fn fallback_embedding(text: &str) -> Vec<f64> {
  const DIM: usize = 16;
  let mut acc = [0u64; DIM];
  for (i, byte) in text.bytes().enumerate() {
    acc[i % DIM] = acc[i % DIM].wrapping_add(u64::from(byte) + 1);
  }
  let raw: Vec<f64> = acc.iter().map(|&v| v as f64).collect();
  let norm = raw.iter().map(|v| v * v).sum::<f64>().sqrt();
  if norm < 1e-12 {
    return vec![0.0; DIM];
  }
  raw.into_iter().map(|v| v / norm).collect()
}

#[async_trait]
impl EntityExtractor for ScriptedLlm {
  async fn extract_entities(
    &self,
    content: &str,
    _prior_entity_names: &[String],
  ) -> Result<Vec<ExtractedEntity>, AppError> {
    Ok(self.entities.get(content).cloned().unwrap_or_default())
  }
}

#[async_trait]
impl RelationshipExtractor for ScriptedLlm {
  async fn extract_relationships(
    &self,
    content: &str,
    _known_entity_names: &[String],
  ) -> Result<Vec<ExtractedRelationship>, AppError> {
    Ok(self.relationships.get(content).cloned().unwrap_or_default())
  }
}

#[async_trait]
impl Embedder for ScriptedLlm {
  fn model_name(&self) -> &str {
    "scripted-fallback"
  }

  async fn embed(&self, text: &str) -> Result<Vec<f64>, AppError> {
    Ok(self.embeddings.get(text).cloned().unwrap_or_else(|| fallback_embedding(text)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn fallback_embedding_is_deterministic() {
    let llm = ScriptedLlm::new();
    let a = llm.embed("hello world").await.unwrap();
    let b = llm.embed("hello world").await.unwrap();
    assert_eq!(a, b);
  }

  #[tokio::test]
  async fn registered_entities_are_returned_verbatim() {
    let llm = ScriptedLlm::new().with_entities(
      "Alice works at Acme",
      vec![ExtractedEntity {
        name: "Alice".to_owned(),
        entity_type_id: "person".to_owned(),
      }],
    );
    let entities = llm.extract_entities("Alice works at Acme", &[]).await.unwrap();
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].name, "Alice");
  }
}
