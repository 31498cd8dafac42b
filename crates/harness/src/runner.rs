//! Runs one fixture's episodes through the orchestrator against a real
//! connection, then diffs the resulting graph against `expectations.yaml`.

use std::collections::BTreeMap;

use epigraph_core::ingest_episode;
use epigraph_entities::{alias, entity, episode_entity_mention, episode_relationship_mention, merge_candidate, relationship};
use epigraph_shared::AppError;
use sea_orm::{DatabaseConnection, EntityTrait};

use crate::fixture::{Fixture, Section};
use crate::matcher::{Row, row_matches};

#[derive(Debug, Clone)]
pub struct Failure {
  pub category: String,
  pub kind: String,
  pub message: String,
}

#[derive(Debug, Clone)]
pub struct FixtureResult {
  pub name: String,
  pub failures: Vec<Failure>,
}

impl FixtureResult {
  #[must_use]
  pub fn passed(&self) -> bool {
    self.failures.is_empty()
  }
}

pub async fn run_fixture(db: &DatabaseConnection, fixture: &Fixture) -> Result<FixtureResult, AppError> {
  for episode in &fixture.episodes {
    ingest_episode(db, episode, &fixture.scripted_llm, &fixture.scripted_llm, &fixture.scripted_llm).await?;
  }

  let mut failures = Vec::new();

  check_section("entities", &fixture.expectations.entities, &entity_rows(db).await?, &mut failures);
  check_section(
    "relationships",
    &fixture.expectations.relationships,
    &relationship_rows(db).await?,
    &mut failures,
  );
  check_section("aliases", &fixture.expectations.aliases, &alias_rows(db).await?, &mut failures);
  check_section(
    "episode_entity_mentions",
    &fixture.expectations.episode_entity_mentions,
    &episode_entity_mention_rows(db).await?,
    &mut failures,
  );
  check_section(
    "episode_relationship_mentions",
    &fixture.expectations.episode_relationship_mentions,
    &episode_relationship_mention_rows(db).await?,
    &mut failures,
  );
  check_section(
    "merge_candidates",
    &fixture.expectations.merge_candidates,
    &merge_candidate_rows(db).await?,
    &mut failures,
  );

  Ok(FixtureResult {
    name: fixture.name.clone(),
    failures,
  })
}

fn check_section(category: &str, section: &Section, rows: &[Row], failures: &mut Vec<Failure>) {
  for matcher in &section.must_have {
    if !rows.iter().any(|row| row_matches(matcher, row)) {
      failures.push(Failure {
        category: category.to_owned(),
        kind: "must_have".to_owned(),
        message: format!("no {category} row matched {matcher:?}"),
      });
    }
  }
  for matcher in &section.must_not_have {
    if rows.iter().any(|row| row_matches(matcher, row)) {
      failures.push(Failure {
        category: category.to_owned(),
        kind: "must_not_have".to_owned(),
        message: format!("a {category} row unexpectedly matched {matcher:?}"),
      });
    }
  }
  // `optional` matchers never affect pass/fail — they document expected
  // variance without gating on it.
}

async fn entity_rows(db: &DatabaseConnection) -> Result<Vec<Row>, AppError> {
  let rows = entity::Entity::find().all(db).await.map_err(AppError::new)?;
  Ok(
    rows
      .into_iter()
      .filter(|e| e.merged_into.is_none())
      .map(|e| {
        Row::from([
          ("name".to_owned(), serde_json::Value::String(e.canonical_name)),
          ("entity_type".to_owned(), serde_json::Value::String(e.entity_type_id)),
        ])
      })
      .collect(),
  )
}

async fn alias_rows(db: &DatabaseConnection) -> Result<Vec<Row>, AppError> {
  let entities: BTreeMap<uuid::Uuid, entity::Model> = entity::Entity::find()
    .all(db)
    .await
    .map_err(AppError::new)?
    .into_iter()
    .map(|e| (e.id, e))
    .collect();

  let rows = alias::Entity::find().all(db).await.map_err(AppError::new)?;
  Ok(
    rows
      .into_iter()
      .filter_map(|a| {
        let owner = entities.get(&a.entity_id)?;
        if owner.merged_into.is_some() {
          return None;
        }
        Some(Row::from([
          ("name".to_owned(), serde_json::Value::String(a.alias)),
          ("alias_type".to_owned(), serde_json::Value::String(a.alias_type)),
          ("is_shared".to_owned(), serde_json::Value::Bool(a.is_shared)),
          ("entity_name".to_owned(), serde_json::Value::String(owner.canonical_name.clone())),
        ]))
      })
      .collect(),
  )
}

async fn relationship_rows(db: &DatabaseConnection) -> Result<Vec<Row>, AppError> {
  let entities: BTreeMap<uuid::Uuid, entity::Model> = entity::Entity::find()
    .all(db)
    .await
    .map_err(AppError::new)?
    .into_iter()
    .map(|e| (e.id, e))
    .collect();

  let rows = relationship::Entity::find().all(db).await.map_err(AppError::new)?;
  Ok(
    rows
      .into_iter()
      .filter_map(|r| {
        let source = entities.get(&r.source_entity_id)?;
        let target = r.target_entity_id.and_then(|id| entities.get(&id)).map(|e| e.canonical_name.clone());
        let mut row = Row::from([
          ("source_name".to_owned(), serde_json::Value::String(source.canonical_name.clone())),
          ("relation_type".to_owned(), serde_json::Value::String(r.relation_type)),
          ("fact".to_owned(), serde_json::Value::String(r.fact)),
        ]);
        if let Some(target) = target {
          row.insert("target".to_owned(), serde_json::Value::String(target));
        }
        if let Some(literal) = r.target_literal {
          row.insert("target_literal".to_owned(), serde_json::Value::String(literal));
        }
        if let Some(valid_at) = r.valid_at {
          row.insert("valid_at".to_owned(), serde_json::Value::String(valid_at));
        }
        if let Some(invalid_at) = r.invalid_at {
          row.insert("invalid_at".to_owned(), serde_json::Value::String(invalid_at));
        }
        Some(row)
      })
      .collect(),
  )
}

async fn episode_entity_mention_rows(db: &DatabaseConnection) -> Result<Vec<Row>, AppError> {
  let entities: BTreeMap<uuid::Uuid, entity::Model> = entity::Entity::find()
    .all(db)
    .await
    .map_err(AppError::new)?
    .into_iter()
    .map(|e| (e.id, e))
    .collect();

  let rows = episode_entity_mention::Entity::find().all(db).await.map_err(AppError::new)?;
  Ok(
    rows
      .into_iter()
      .filter_map(|m| {
        let entity = entities.get(&m.entity_id)?;
        Some(Row::from([
          ("episode_id".to_owned(), serde_json::Value::String(m.episode_id)),
          ("name".to_owned(), serde_json::Value::String(entity.canonical_name.clone())),
          ("mention_count".to_owned(), serde_json::Value::Number(m.mention_count.into())),
        ]))
      })
      .collect(),
  )
}

async fn merge_candidate_rows(db: &DatabaseConnection) -> Result<Vec<Row>, AppError> {
  let entities: BTreeMap<uuid::Uuid, entity::Model> = entity::Entity::find()
    .all(db)
    .await
    .map_err(AppError::new)?
    .into_iter()
    .map(|e| (e.id, e))
    .collect();

  let rows = merge_candidate::Entity::find().all(db).await.map_err(AppError::new)?;
  Ok(
    rows
      .into_iter()
      .filter_map(|c| {
        let a = entities.get(&c.entity_a_id)?;
        let b = entities.get(&c.entity_b_id)?;
        let confidence = serde_json::Number::from_f64(f64::from(c.confidence)).map(serde_json::Value::Number);
        Some(Row::from([
          ("entity_a_name".to_owned(), serde_json::Value::String(a.canonical_name.clone())),
          ("entity_b_name".to_owned(), serde_json::Value::String(b.canonical_name.clone())),
          ("reason".to_owned(), serde_json::Value::String(c.reason)),
          ("status".to_owned(), serde_json::Value::String(c.status)),
          ("auto_eligible".to_owned(), serde_json::Value::Bool(c.auto_eligible)),
          ("confidence".to_owned(), confidence.unwrap_or(serde_json::Value::Null)),
        ]))
      })
      .collect(),
  )
}

async fn episode_relationship_mention_rows(db: &DatabaseConnection) -> Result<Vec<Row>, AppError> {
  let rows = episode_relationship_mention::Entity::find().all(db).await.map_err(AppError::new)?;
  Ok(
    rows
      .into_iter()
      .map(|m| {
        Row::from([
          ("episode_id".to_owned(), serde_json::Value::String(m.episode_id)),
          ("relationship_id".to_owned(), serde_json::Value::Bool(m.relationship_id.is_some())),
          ("extracted_fact".to_owned(), serde_json::Value::String(m.extracted_fact)),
          ("source_type".to_owned(), serde_json::Value::String(m.source_type)),
          ("alias_id".to_owned(), serde_json::Value::Bool(m.alias_id.is_some())),
        ])
      })
      .collect(),
  )
}
