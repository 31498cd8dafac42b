//! Fixture loading: `<source>/<fixture-name>/episode.json` +
//! `expectations.yaml`, plus an optional `extractions.json` that scripts
//! the out-of-scope LLM boundary deterministically for this fixture.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use epigraph_llm::{ExtractedEntity, ExtractedRelationship, ScriptedLlm};
use epigraph_shared::{AppError, Episode};
use serde::Deserialize;

pub type Matcher = BTreeMap<String, serde_yaml::Value>;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Section {
  #[serde(default)]
  pub must_have: Vec<Matcher>,
  #[serde(default)]
  pub must_not_have: Vec<Matcher>,
  #[serde(default)]
  pub optional: Vec<Matcher>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Expectations {
  #[serde(default)]
  pub entities: Section,
  #[serde(default)]
  pub relationships: Section,
  #[serde(default)]
  pub aliases: Section,
  #[serde(default)]
  pub episode_entity_mentions: Section,
  #[serde(default)]
  pub episode_relationship_mentions: Section,
  #[serde(default)]
  pub merge_candidates: Section,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
  #[allow(dead_code)]
  sender: String,
  content: String,
  timestamp: serde_json::Value,
  #[serde(default)]
  reference_time: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, Default)]
struct ExtractionScript {
  #[serde(default)]
  entities: Vec<ExtractedEntity>,
  #[serde(default)]
  relationships: Vec<ExtractedRelationship>,
}

pub struct Fixture {
  pub name: String,
  pub episodes: Vec<Episode>,
  pub expectations: Expectations,
  pub scripted_llm: ScriptedLlm,
}

pub fn load_fixture(dir: &Path) -> Result<Fixture, AppError> {
  let name = dir
    .file_name()
    .and_then(|n| n.to_str())
    .ok_or_else(|| AppError::configuration(anyhow::anyhow!("fixture path has no directory name: {}", dir.display())))?
    .to_owned();

  let episode_path = dir.join("episode.json");
  let raw = std::fs::read_to_string(&episode_path)
    .map_err(|e| AppError::configuration(anyhow::anyhow!("reading {}: {e}", episode_path.display())))?;
  let events: Vec<RawEvent> = serde_json::from_str(&raw)
    .map_err(|e| AppError::configuration(anyhow::anyhow!("parsing {}: {e}", episode_path.display())))?;

  let expectations_path = dir.join("expectations.yaml");
  let raw = std::fs::read_to_string(&expectations_path)
    .map_err(|e| AppError::configuration(anyhow::anyhow!("reading {}: {e}", expectations_path.display())))?;
  let expectations: Expectations = serde_yaml::from_str(&raw)
    .map_err(|e| AppError::configuration(anyhow::anyhow!("parsing {}: {e}", expectations_path.display())))?;

  let extractions_path = dir.join("extractions.json");
  let scripts: BTreeMap<String, ExtractionScript> = if extractions_path.exists() {
    let raw = std::fs::read_to_string(&extractions_path)
      .map_err(|e| AppError::configuration(anyhow::anyhow!("reading {}: {e}", extractions_path.display())))?;
    serde_json::from_str(&raw)
      .map_err(|e| AppError::configuration(anyhow::anyhow!("parsing {}: {e}", extractions_path.display())))?
  } else {
    BTreeMap::new()
  };

  let mut episodes = Vec::with_capacity(events.len());
  let mut scripted_llm = ScriptedLlm::new();

  for (index, event) in events.iter().enumerate() {
    let occurred_at = parse_timestamp(event.reference_time.as_ref().unwrap_or(&event.timestamp))?;
    episodes.push(Episode {
      id: format!("{name}-{index}"),
      channel_id: name.clone(),
      content: event.content.clone(),
      occurred_at,
    });

    if let Some(script) = scripts.get(&event.content) {
      scripted_llm = scripted_llm
        .with_entities(event.content.clone(), script.entities.clone())
        .with_relationships(event.content.clone(), script.relationships.clone());
    }
  }

  Ok(Fixture {
    name,
    episodes,
    expectations,
    scripted_llm,
  })
}

/// Episode times accept ISO-8601 text or UNIX epoch seconds.
fn parse_timestamp(value: &serde_json::Value) -> Result<DateTime<Utc>, AppError> {
  match value {
    serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s)
      .map(|dt| dt.with_timezone(&Utc))
      .map_err(|e| AppError::configuration(anyhow::anyhow!("invalid timestamp {s}: {e}"))),
    serde_json::Value::Number(n) => {
      let secs = n
        .as_i64()
        .ok_or_else(|| AppError::configuration(anyhow::anyhow!("timestamp {n} is not a valid epoch second count")))?;
      Utc
        .timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| AppError::configuration(anyhow::anyhow!("timestamp {secs} out of range")))
    }
    other => Err(AppError::configuration(anyhow::anyhow!(
      "timestamp must be a string or number, got {other}"
    ))),
  }
}
