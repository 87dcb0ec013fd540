use serde_json::{Map, Value};

use super::ConfigError;

pub fn validate_config(config: &Value) -> Result<(), ConfigError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 1, 65_535)?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
        validate_optional_string_field(server, "server.secret_key", "secret_key")?;
    }

    if let Some(index) = expect_optional_object(root, "index")? {
        validate_enum_field(index, "index.backend", "backend", &["pinecone", "memory"])?;
        validate_required_string_field(index, "index.documents_dir", "documents_dir")?;
    }

    if let Some(pinecone) = expect_optional_object(root, "pinecone")? {
        validate_required_string_field(pinecone, "pinecone.index_name", "index_name")?;
        validate_optional_string_field(pinecone, "pinecone.api_key", "api_key")?;
        validate_optional_string_field(pinecone, "pinecone.host", "host")?;
    }

    if let Some(openai) = expect_optional_object(root, "openai")? {
        validate_required_string_field(openai, "openai.model", "model")?;
        validate_required_string_field(openai, "openai.base_url", "base_url")?;
        validate_optional_string_field(openai, "openai.api_key", "api_key")?;
        validate_u64_field(openai, "openai.max_tokens", "max_tokens", 1, 1_000_000)?;
    }

    if let Some(embedding) = expect_optional_object(root, "embedding")? {
        validate_required_string_field(embedding, "embedding.base_url", "base_url")?;
        validate_required_string_field(embedding, "embedding.model", "model")?;
        validate_u64_field(embedding, "embedding.dimension", "dimension", 1, 65_536)?;
        validate_u64_field(embedding, "embedding.batch_size", "batch_size", 1, 2_048)?;
    }

    if let Some(rag) = expect_optional_object(root, "rag")? {
        validate_enum_field(
            rag,
            "rag.retrieval_query",
            "retrieval_query",
            &["message", "conversation"],
        )?;
        validate_u64_field(rag, "rag.chunk_size", "chunk_size", 1, 1_000_000)?;
        validate_u64_field(rag, "rag.chunk_overlap", "chunk_overlap", 0, 1_000_000)?;
        let size = rag.get("chunk_size").and_then(Value::as_u64);
        let overlap = rag.get("chunk_overlap").and_then(Value::as_u64);
        if let (Some(size), Some(overlap)) = (size, overlap) {
            if overlap >= size {
                return Err(ConfigError::InvalidValue {
                    path: "rag.chunk_overlap".to_string(),
                    reason: format!("must be smaller than chunk_size ({})", size),
                });
            }
        }
    }

    if let Some(history) = expect_optional_object(root, "history")? {
        validate_enum_field(history, "history.backend", "backend", &["memory", "sqlite"])?;
    }

    if let Some(http) = expect_optional_object(root, "http")? {
        validate_u64_field(http, "http.timeout_secs", "timeout_secs", 1, 86_400)?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ConfigError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
        None => Ok(None),
    }
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() {
        return Ok(());
    }
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ConfigError::InvalidValue {
            path: path.to_string(),
            reason: format!("must be between {} and {}", min, max),
        });
    }
    Ok(())
}

fn validate_required_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    let value = section.get(key).ok_or_else(|| ConfigError::InvalidValue {
        path: path.to_string(),
        reason: "value is required".to_string(),
    })?;
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if text.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            path: path.to_string(),
            reason: "value cannot be empty".to_string(),
        });
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() || value.as_str().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "string"))
}

fn validate_enum_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    allowed: &[&str],
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if allowed.contains(&text) {
        return Ok(());
    }
    Err(ConfigError::InvalidValue {
        path: path.to_string(),
        reason: format!("must be one of {}", allowed.join(", ")),
    })
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                path: format!("{}[{}]", path, index),
                reason: "value cannot be empty".to_string(),
            });
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &'static str) -> ConfigError {
    ConfigError::InvalidType {
        path: path.to_string(),
        expected,
    }
}
