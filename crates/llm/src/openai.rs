use anyhow::anyhow;
use async_openai::{
  Client,
  config::OpenAIConfig,
  types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
    CreateChatCompletionRequestArgs, ResponseFormat, ResponseFormatJsonSchema,
  },
  types::embeddings::CreateEmbeddingRequestArgs,
};
use async_trait::async_trait;
use epigraph_shared::{APP_ENV, AppError};
use schemars::JsonSchema;
use serde::{Deserialize, de::DeserializeOwned};

use crate::traits::{Embedder, EntityExtractor, ExtractedEntity, ExtractedRelationship, RelationshipExtractor};

/// Recursively fix a JSON schema for OpenAI strict mode:
/// - `$ref` must be the only key on its object
/// - `oneOf` of const strings becomes `enum`
/// - `anyOf` of `[T, null]` (how `Option<T>` renders) unwraps to `T`
/// - every object gets `additionalProperties: false` and `required` listing all keys
fn fix_schema_for_strict(schema: &mut serde_json::Value) {
  let Some(obj) = schema.as_object_mut() else { return };

  if obj.contains_key("$ref") {
    obj.retain(|k, _| k == "$ref");
    return;
  }

  if let Some(one_of) = obj.get("oneOf").and_then(|v| v.as_array()).cloned() {
    let consts: Option<Vec<serde_json::Value>> = one_of.iter().map(|v| v.get("const").cloned()).collect();
    if let Some(values) = consts {
      obj.clear();
      obj.insert("type".to_owned(), serde_json::Value::String("string".to_owned()));
      obj.insert("enum".to_owned(), serde_json::Value::Array(values));
      return;
    }
  }

  if let Some(any_of) = obj.get("anyOf").and_then(|v| v.as_array()).cloned() {
    let non_null: Vec<&serde_json::Value> = any_of
      .iter()
      .filter(|v| v.get("type").and_then(|t| t.as_str()) != Some("null"))
      .collect();
    if non_null.len() == 1 {
      let inner = non_null[0].clone();
      obj.clear();
      obj.extend(inner.as_object().cloned().unwrap_or_default());
      fix_schema_for_strict(schema);
      return;
    }
  }

  if obj.contains_key("properties") {
    let keys: Vec<serde_json::Value> = obj["properties"]
      .as_object()
      .map(|p| p.keys().map(|k| serde_json::Value::String(k.clone())).collect())
      .unwrap_or_default();
    obj.insert("required".to_owned(), serde_json::Value::Array(keys));
    obj.insert("additionalProperties".to_owned(), serde_json::Value::Bool(false));

    if let Some(props) = obj.get_mut("properties").and_then(|p| p.as_object_mut()) {
      for v in props.values_mut() {
        fix_schema_for_strict(v);
      }
    }
  }

  if let Some(items) = obj.get_mut("items") {
    fix_schema_for_strict(items);
  }

  if let Some(defs) = obj.get_mut("definitions").and_then(|d| d.as_object_mut()) {
    for v in defs.values_mut() {
      fix_schema_for_strict(v);
    }
  }

  if let Some(defs) = obj.get_mut("$defs").and_then(|d| d.as_object_mut()) {
    for v in defs.values_mut() {
      fix_schema_for_strict(v);
    }
  }
}

async fn generate_object<T>(
  messages: Vec<ChatCompletionRequestMessage>,
  schema_name: &str,
  schema_description: Option<String>,
) -> Result<T, AppError>
where
  T: DeserializeOwned + JsonSchema,
{
  let config = OpenAIConfig::new()
    .with_api_key(&APP_ENV.openai_api_key)
    .with_api_base(&APP_ENV.openai_base_url);
  let client = Client::with_config(config);

  let schema = schemars::schema_for!(T);
  let mut schema = serde_json::to_value(&schema)?;
  fix_schema_for_strict(&mut schema);

  let request = CreateChatCompletionRequestArgs::default()
    .model(&APP_ENV.openai_chat_model)
    .messages(messages)
    .response_format(ResponseFormat::JsonSchema {
      json_schema: ResponseFormatJsonSchema {
        description: schema_description,
        name: schema_name.to_owned(),
        schema: Some(schema),
        strict: Some(true),
      },
    })
    .build()
    .map_err(AppError::external_service)?;

  let response = client
    .chat()
    .create(request)
    .await
    .map_err(AppError::external_service)?
    .choices
    .into_iter()
    .find_map(|c| c.message.content)
    .ok_or_else(|| AppError::external_service(anyhow!("empty message content")))?;

  serde_json::from_str(&response).map_err(AppError::external_service)
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ExtractedEntities {
  entities: Vec<ExtractedEntity>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ExtractedRelationships {
  relationships: Vec<ExtractedRelationship>,
}

/// The production LLM boundary implementation, backed by any
/// OpenAI-compatible chat-completions and embeddings endpoint.
pub struct OpenAiClient;

#[async_trait]
impl EntityExtractor for OpenAiClient {
  async fn extract_entities(
    &self,
    content: &str,
    prior_entity_names: &[String],
  ) -> Result<Vec<ExtractedEntity>, AppError> {
    let system = ChatCompletionRequestSystemMessage::from(
      "Extract every named entity (person, organization, location, or other concrete \
       referent) mentioned in the conversation snippet below. Use entity_type_id values \
       from the closed set: person, organization, location, product, event, other. Do not \
       invent entities the text doesn't support.",
    );
    let context = if prior_entity_names.is_empty() {
      String::new()
    } else {
      format!("\nEntities already known in this conversation: {}", prior_entity_names.join(", "))
    };
    let user = ChatCompletionRequestUserMessage::from(format!("{content}{context}"));

    let result: ExtractedEntities = generate_object(
      vec![
        ChatCompletionRequestMessage::System(system),
        ChatCompletionRequestMessage::User(user),
      ],
      "extracted_entities",
      None,
    )
    .await?;

    Ok(result.entities)
  }
}

#[async_trait]
impl RelationshipExtractor for OpenAiClient {
  async fn extract_relationships(
    &self,
    content: &str,
    known_entity_names: &[String],
  ) -> Result<Vec<ExtractedRelationship>, AppError> {
    let system = ChatCompletionRequestSystemMessage::from(
      "Extract every factual relationship asserted in the conversation snippet below, \
       between the known entities or between a known entity and a literal value (e.g. an \
       email address). Mark self_disclosed true only when the speaker is asserting the fact \
       about themself.",
    );
    let user = ChatCompletionRequestUserMessage::from(format!(
      "Known entities: {}\n\n{content}",
      known_entity_names.join(", ")
    ));

    let result: ExtractedRelationships = generate_object(
      vec![
        ChatCompletionRequestMessage::System(system),
        ChatCompletionRequestMessage::User(user),
      ],
      "extracted_relationships",
      None,
    )
    .await?;

    Ok(result.relationships)
  }
}

#[async_trait]
impl Embedder for OpenAiClient {
  fn model_name(&self) -> &str {
    &APP_ENV.openai_embedding_model
  }

  async fn embed(&self, text: &str) -> Result<Vec<f64>, AppError> {
    let config = OpenAIConfig::new()
      .with_api_key(&APP_ENV.openai_api_key)
      .with_api_base(&APP_ENV.openai_base_url);
    let client = Client::with_config(config);

    let request = CreateEmbeddingRequestArgs::default()
      .model(&APP_ENV.openai_embedding_model)
      .input(text)
      .build()
      .map_err(AppError::external_service)?;

    let embedding = client
      .embeddings()
      .create(request)
      .await
      .map_err(AppError::external_service)?
      .data
      .into_iter()
      .next()
      .ok_or_else(|| AppError::external_service(anyhow!("empty embedding")))?
      .embedding;

    Ok(embedding.into_iter().map(f64::from).collect())
  }
}
