use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use hindsight_core::document::{Document, DocumentMetadata};
use hindsight_core::scope::{Filter, Operator};

use super::engine::{IndexError, VectorIndexEngine};

/// Metadata attributes stored and queried alongside `content`.
const ATTRIBUTES: &[&str] = &[
    "file_or_attachment_id",
    "content_type",
    "channel_type",
    "channel_id",
    "thread_ts",
    "ts",
    "permalink",
    "timestamp",
];

/// Weaviate REST/GraphQL client implementing [`VectorIndexEngine`].
pub struct WeaviateEngine {
    base_url: String,
    http: reqwest::Client,
}

impl WeaviateEngine {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, IndexError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .map_err(|err| IndexError::Transport(err.to_string()))?;
        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), http })
    }

    fn class_schema(collection: &str, description: &str) -> Value {
        let mut properties = vec![json!({
            "dataType": ["text"],
            "description": "The content of the message",
            "moduleConfig": {
                "text2vec-transformers": {"skip": false, "vectorizePropertyName": false}
            },
            "name": "content",
        })];
        for attribute in ATTRIBUTES {
            let data_type = if *attribute == "timestamp" { "date" } else { "string" };
            properties.push(json!({
                "dataType": [data_type],
                "name": attribute,
            }));
        }
        json!({
            "class": collection,
            "description": description,
            "vectorizer": "text2vec-transformers",
            "moduleConfig": {
                "text2vec-transformers": {
                    "poolingStrategy": "masked_mean",
                    "vectorizeClassName": false
                }
            },
            "properties": properties,
        })
    }

    async fn graphql(&self, query: String) -> Result<Value, IndexError> {
        let response = self
            .http
            .post(format!("{}/v1/graphql", self.base_url))
            .json(&json!({ "query": query }))
            .send()
            .await
            .map_err(|err| IndexError::Transport(err.to_string()))?;
        let body: Value = response
            .json()
            .await
            .map_err(|err| IndexError::Decode(err.to_string()))?;
        if let Some(errors) = body.get("errors").filter(|errors| !errors.is_null()) {
            return Err(IndexError::Rejected(errors.to_string()));
        }
        Ok(body)
    }

    fn parse_get_response(&self, collection: &str, body: &Value) -> Result<Vec<Document>, IndexError> {
        let objects = body["data"]["Get"][collection]
            .as_array()
            .cloned()
            .unwrap_or_default();
        objects.iter().map(decode_document).collect()
    }
}

/// Renders a filter as a Weaviate JSON `where` clause.
pub fn where_clause(filter: &Filter) -> Value {
    match filter {
        Filter::And(operands) => json!({
            "operator": "And",
            "operands": operands.iter().map(where_clause).collect::<Vec<_>>(),
        }),
        Filter::Or(operands) => json!({
            "operator": "Or",
            "operands": operands.iter().map(where_clause).collect::<Vec<_>>(),
        }),
        Filter::Cond { path, operator, value } => json!({
            "path": [path],
            "operator": operator_name(*operator),
            "valueString": value,
        }),
    }
}

fn operator_name(operator: Operator) -> &'static str {
    match operator {
        Operator::Equal => "Equal",
        Operator::NotEqual => "NotEqual",
    }
}

/// Renders a filter inline for GraphQL, where enum values are unquoted.
fn graphql_where(filter: &Filter) -> String {
    match filter {
        Filter::And(operands) => format!(
            "{{operator: And, operands: [{}]}}",
            operands.iter().map(graphql_where).collect::<Vec<_>>().join(", ")
        ),
        Filter::Or(operands) => format!(
            "{{operator: Or, operands: [{}]}}",
            operands.iter().map(graphql_where).collect::<Vec<_>>().join(", ")
        ),
        Filter::Cond { path, operator, value } => format!(
            "{{path: [{}], operator: {}, valueString: {}}}",
            Value::from(path.as_str()),
            operator_name(*operator),
            Value::from(value.as_str()),
        ),
    }
}

fn decode_document(object: &Value) -> Result<Document, IndexError> {
    let field = |name: &str| -> String {
        object.get(name).and_then(Value::as_str).unwrap_or_default().to_string()
    };
    let raw_timestamp = field("timestamp");
    let timestamp: DateTime<Utc> = DateTime::parse_from_rfc3339(&raw_timestamp)
        .map_err(|err| IndexError::Decode(format!("bad timestamp `{raw_timestamp}`: {err}")))?
        .with_timezone(&Utc);
    Ok(Document {
        content: field("content"),
        metadata: DocumentMetadata {
            file_or_attachment_id: field("file_or_attachment_id"),
            content_type: field("content_type"),
            channel_type: field("channel_type"),
            channel_id: field("channel_id"),
            thread_ts: field("thread_ts"),
            ts: field("ts"),
            permalink: field("permalink"),
            timestamp,
        },
    })
}

#[async_trait]
impl VectorIndexEngine for WeaviateEngine {
    async fn collection_exists(&self, collection: &str) -> Result<bool, IndexError> {
        let response = self
            .http
            .get(format!("{}/v1/schema/{collection}", self.base_url))
            .send()
            .await
            .map_err(|err| IndexError::Transport(err.to_string()))?;
        match response.status() {
            status if status.is_success() => Ok(true),
            reqwest::StatusCode::NOT_FOUND => Ok(false),
            status => Err(IndexError::Rejected(format!(
                "schema lookup for {collection} returned {status}"
            ))),
        }
    }

    async fn create_collection(
        &self,
        collection: &str,
        description: &str,
    ) -> Result<(), IndexError> {
        let response = self
            .http
            .post(format!("{}/v1/schema", self.base_url))
            .json(&Self::class_schema(collection, description))
            .send()
            .await
            .map_err(|err| IndexError::Transport(err.to_string()))?;
        if !response.status().is_success() {
            return Err(IndexError::Rejected(format!(
                "schema creation for {collection} returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn delete_collection(&self, collection: &str) -> Result<(), IndexError> {
        let response = self
            .http
            .delete(format!("{}/v1/schema/{collection}", self.base_url))
            .send()
            .await
            .map_err(|err| IndexError::Transport(err.to_string()))?;
        match response.status() {
            status if status.is_success() => Ok(()),
            reqwest::StatusCode::NOT_FOUND => Ok(()),
            status => Err(IndexError::Rejected(format!(
                "schema deletion for {collection} returned {status}"
            ))),
        }
    }

    async fn add_document(
        &self,
        collection: &str,
        document: &Document,
        id: Option<Uuid>,
    ) -> Result<Uuid, IndexError> {
        let id = id.unwrap_or_else(Uuid::new_v4);
        let mut properties = document.metadata.to_properties();
        properties.insert("content".into(), document.content.clone().into());

        // PUT with an explicit id so deterministic ids upsert in place.
        let response = self
            .http
            .put(format!("{}/v1/objects/{collection}/{id}", self.base_url))
            .json(&json!({ "class": collection, "id": id, "properties": properties }))
            .send()
            .await
            .map_err(|err| IndexError::Transport(err.to_string()))?;
        if !response.status().is_success() {
            // object does not exist yet; fall back to create
            let response = self
                .http
                .post(format!("{}/v1/objects", self.base_url))
                .json(&json!({ "class": collection, "id": id, "properties": properties }))
                .send()
                .await
                .map_err(|err| IndexError::Transport(err.to_string()))?;
            if !response.status().is_success() {
                return Err(IndexError::Rejected(format!(
                    "object insert into {collection} returned {}",
                    response.status()
                )));
            }
        }
        Ok(id)
    }

    async fn delete_where(&self, collection: &str, filter: &Filter) -> Result<(), IndexError> {
        let response = self
            .http
            .delete(format!("{}/v1/batch/objects", self.base_url))
            .json(&json!({
                "match": { "class": collection, "where": where_clause(filter) }
            }))
            .send()
            .await
            .map_err(|err| IndexError::Transport(err.to_string()))?;
        if !response.status().is_success() {
            return Err(IndexError::Rejected(format!(
                "batch delete from {collection} returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        filter: &Filter,
        limit: usize,
    ) -> Result<Vec<Document>, IndexError> {
        let query = format!(
            "{{ Get {{ {collection}(where: {}, limit: {limit}) {{ content {} }} }} }}",
            graphql_where(filter),
            ATTRIBUTES.join(" "),
        );
        let body = self.graphql(query).await?;
        self.parse_get_response(collection, &body)
    }

    async fn similarity_search(
        &self,
        collection: &str,
        query: &str,
        filter: &Filter,
        limit: usize,
    ) -> Result<Vec<Document>, IndexError> {
        let query = format!(
            "{{ Get {{ {collection}(nearText: {{concepts: [{}]}}, where: {}, limit: {limit}) {{ content {} }} }} }}",
            Value::from(query),
            graphql_where(filter),
            ATTRIBUTES.join(" "),
        );
        let body = self.graphql(query).await?;
        self.parse_get_response(collection, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hindsight_core::scope::retrieval_filter;

    #[test]
    fn where_clause_matches_engine_shape() {
        let clause = where_clause(&retrieval_filter(false, "C1", "1.0"));
        assert_eq!(
            clause,
            json!({
                "operator": "And",
                "operands": [
                    {"path": ["channel_type"], "operator": "Equal", "valueString": "channel"},
                    {"path": ["thread_ts"], "operator": "NotEqual", "valueString": "1.0"},
                ]
            })
        );
    }

    #[test]
    fn graphql_where_quotes_values_not_enums() {
        let rendered = graphql_where(&retrieval_filter(true, "G1", "1.0"));
        assert!(rendered.contains("operator: And"));
        assert!(rendered.contains("operator: NotEqual"));
        assert!(rendered.contains("valueString: \"G1\""));
        assert!(!rendered.contains("\"Equal\""));
    }

    #[test]
    fn class_schema_has_content_and_all_attributes() {
        let schema = WeaviateEngine::class_schema("MessageT1", "A Slack message index for T1");
        let properties = schema["properties"].as_array().unwrap();
        assert_eq!(properties.len(), 1 + ATTRIBUTES.len());
        assert_eq!(properties[0]["name"], "content");
        let timestamp = properties.iter().find(|p| p["name"] == "timestamp").unwrap();
        assert_eq!(timestamp["dataType"][0], "date");
    }
}
