//! JSON schema builders for the per-index query tools.

use serde_json::{Map, Value};

/// Input schema shared by every `query-<index>` tool.
pub(crate) fn query_input_schema(default_top_k: i64) -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert(
        "query".into(),
        string_schema("Natural-language question or keywords to search for"),
    );

    let mut top_k_schema = Map::new();
    top_k_schema.insert("type".into(), Value::String("integer".into()));
    top_k_schema.insert(
        "description".into(),
        Value::String("Maximum number of chunks to return; zero or less returns none".into()),
    );
    top_k_schema.insert("default".into(), Value::Number(default_top_k.into()));
    properties.insert("top_k".into(), Value::Object(top_k_schema));

    finalize_object_schema(properties, &["query"])
}

/// Output schema describing the structured `{"results": [...]}` payload.
pub(crate) fn query_output_schema() -> Map<String, Value> {
    let mut row = Map::new();
    row.insert("filename".into(), string_schema("Document the chunk came from"));
    row.insert("chunk_index".into(), integer_schema("Position of the chunk in its document"));
    row.insert("chunk_text".into(), string_schema("Chunk contents"));
    let mut similarity = Map::new();
    similarity.insert("type".into(), Value::String("number".into()));
    similarity.insert(
        "description".into(),
        Value::String("Cosine similarity rounded to four decimal places".into()),
    );
    row.insert("similarity".into(), Value::Object(similarity));
    let row = finalize_object_schema(row, &["filename", "chunk_index", "chunk_text", "similarity"]);

    let mut results = Map::new();
    results.insert("type".into(), Value::String("array".into()));
    results.insert("items".into(), Value::Object(row));

    let mut properties = Map::new();
    properties.insert("results".into(), Value::Object(results));
    finalize_object_schema(properties, &["results"])
}

fn string_schema(description: &str) -> Value {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("string".into()));
    schema.insert("description".into(), Value::String(description.into()));
    Value::Object(schema)
}

fn integer_schema(description: &str) -> Value {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("integer".into()));
    schema.insert("description".into(), Value::String(description.into()));
    Value::Object(schema)
}

fn finalize_object_schema(properties: Map<String, Value>, required: &[&str]) -> Map<String, Value> {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("object".into()));
    schema.insert("properties".into(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert(
            "required".into(),
            Value::Array(
                required
                    .iter()
                    .map(|&key| Value::String(key.into()))
                    .collect(),
            ),
        );
    }
    schema.insert("additionalProperties".into(), Value::Bool(false));
    schema
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_schema_requires_query_and_defaults_top_k() {
        let schema = Value::Object(query_input_schema(7));
        assert_eq!(schema["required"], serde_json::json!(["query"]));
        assert_eq!(schema["properties"]["top_k"]["default"], 7);
        assert_eq!(schema["additionalProperties"], false);
    }

    #[test]
    fn output_schema_lists_row_fields() {
        let schema = Value::Object(query_output_schema());
        let row = &schema["properties"]["results"]["items"];
        assert_eq!(row["properties"]["similarity"]["type"], "number");
        assert_eq!(row["required"].as_array().map(Vec::len), Some(4));
    }
}
