use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{json, Map, Value};

use super::paths::AppPaths;
use super::settings::Settings;
use super::validation::validate_config;
use super::ConfigError;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 6] = [
    "api_key",
    "secret",
    "password",
    "_token",
    "credential",
    "access_key",
];

const SENSITIVE_WHITELIST: [&str; 2] = ["max_tokens", "total_tokens"];

/// Environment variables layered over the YAML files, as
/// `(variable, path inside the settings tree)`.
const ENV_OVERRIDES: [(&str, &[&str]); 15] = [
    ("INDEX_BACKEND", &["index", "backend"]),
    ("DOCUMENTS_DIR", &["index", "documents_dir"]),
    ("PINECONE_API_KEY", &["pinecone", "api_key"]),
    ("PINECONE_INDEX", &["pinecone", "index_name"]),
    ("PINECONE_HOST", &["pinecone", "host"]),
    ("OPENAI_API_KEY", &["openai", "api_key"]),
    ("OPENAI_MODEL", &["openai", "model"]),
    ("OPENAI_BASE_URL", &["openai", "base_url"]),
    ("EMBEDDING_BASE_URL", &["embedding", "base_url"]),
    ("EMBEDDING_API_KEY", &["embedding", "api_key"]),
    ("EMBEDDING_MODEL", &["embedding", "model"]),
    ("SECRET_KEY", &["server", "secret_key"]),
    ("HOST", &["server", "host"]),
    ("PORT", &["server", "port"]),
    ("RETRIEVAL_QUERY", &["rag", "retrieval_query"]),
];

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("AARIV_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        self.paths.project_root.join("config.yml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.paths.secrets_path.clone()
    }

    /// Loads defaults, then `config.yml`, `secrets.yaml` and the process
    /// environment, in that order of precedence.
    pub fn load_settings(&self) -> Result<Settings, ConfigError> {
        self.load_settings_with(|name| env::var(name).ok())
    }

    pub fn load_settings_with<F>(&self, lookup: F) -> Result<Settings, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = serde_json::to_value(Settings::default())?;
        let public_config = load_yaml_file(&self.config_path());
        let secrets_config = load_yaml_file(&self.secrets_path());
        let env_config = env_overrides(lookup);

        let merged = [public_config, secrets_config, env_config]
            .iter()
            .fold(defaults, |acc, layer| deep_merge(&acc, layer));

        validate_config(&merged)?;
        Ok(serde_json::from_value(merged)?)
    }

    pub fn redact_sensitive_values(&self, value: &Value) -> Value {
        redact_sensitive_values(value)
    }
}

fn load_yaml_file(path: &Path) -> Value {
    if !path.exists() {
        return Value::Object(Map::new());
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<Value>(&contents) {
            Ok(value @ Value::Object(_)) => value,
            Ok(_) => Value::Object(Map::new()),
            Err(err) => {
                tracing::warn!("Ignoring unparsable config file {}: {}", path.display(), err);
                Value::Object(Map::new())
            }
        },
        Err(_) => Value::Object(Map::new()),
    }
}

fn env_overrides<F>(lookup: F) -> Value
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = Value::Object(Map::new());
    for (name, path) in ENV_OVERRIDES {
        let Some(raw) = lookup(name) else {
            continue;
        };
        let raw = raw.trim().to_string();
        if raw.is_empty() {
            continue;
        }
        let value = if name == "PORT" {
            raw.parse::<u16>()
                .map(|port| json!(port))
                .unwrap_or_else(|_| json!(raw))
        } else {
            json!(raw)
        };
        ensure_object_path(&mut config, path, value);
    }
    config
}

fn ensure_object_path(config: &mut Value, path: &[&str], value: Value) {
    if path.is_empty() {
        return;
    }

    let mut current = config;
    for (index, key) in path.iter().enumerate() {
        if index == path.len() - 1 {
            if let Some(map) = current.as_object_mut() {
                map.insert(key.to_string(), value);
            }
            return;
        }

        if !current.get(*key).map(|v| v.is_object()).unwrap_or(false) {
            let Some(map) = current.as_object_mut() else {
                return;
            };
            map.insert((*key).to_string(), Value::Object(Map::new()));
        }

        let Some(next) = current.get_mut(*key) else {
            return;
        };
        current = next;
    }
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

fn redact_sensitive_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let redacted = map
                .iter()
                .map(|(key, item)| {
                    let is_secret = is_sensitive_key(key) && !item.is_null() && !item.is_object();
                    let replacement = if is_secret {
                        Value::String(REDACT_PLACEHOLDER.to_string())
                    } else {
                        redact_sensitive_values(item)
                    };
                    (key.clone(), replacement)
                })
                .collect();
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_values).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lower = key.to_lowercase();
    if SENSITIVE_WHITELIST
        .iter()
        .any(|allowed| *allowed == key_lower)
    {
        return false;
    }
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| key_lower.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{HistoryBackend, IndexBackend, RetrievalQuery};
    use std::collections::HashMap;

    fn service_in(dir: &Path) -> ConfigService {
        ConfigService::new(Arc::new(AppPaths::from_root(dir)))
    }

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn deep_merge_merges_objects_and_overrides_scalars() {
        let base = json!({
            "a": 1,
            "b": { "c": 2, "d": 3 },
            "arr": [1, 2]
        });
        let override_value = json!({
            "b": { "c": 99 },
            "arr": [3],
            "e": "x"
        });

        let merged = deep_merge(&base, &override_value);

        assert_eq!(
            merged,
            json!({
                "a": 1,
                "b": { "c": 99, "d": 3 },
                "arr": [3],
                "e": "x"
            })
        );
    }

    #[test]
    fn environment_overrides_yaml_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join("config.yml"),
            "server:\n  port: 9000\nopenai:\n  model: gpt-4o-mini\nhistory:\n  backend: sqlite\n",
        )
        .expect("write config");
        fs::write(
            dir.path().join("secrets.yaml"),
            "pinecone:\n  api_key: from-file\n",
        )
        .expect("write secrets");

        let settings = service_in(dir.path())
            .load_settings_with(lookup_from(&[
                ("PORT", "7000"),
                ("OPENAI_API_KEY", "sk-test"),
                ("RETRIEVAL_QUERY", "conversation"),
                ("INDEX_BACKEND", "memory"),
            ]))
            .expect("settings");

        assert_eq!(settings.server.port, 7000);
        assert_eq!(settings.openai.model, "gpt-4o-mini");
        assert_eq!(settings.openai.api_key.as_deref(), Some("sk-test"));
        assert_eq!(settings.pinecone.api_key.as_deref(), Some("from-file"));
        assert_eq!(settings.history.backend, HistoryBackend::Sqlite);
        assert_eq!(settings.rag.retrieval_query, RetrievalQuery::Conversation);
        assert_eq!(settings.index.backend, IndexBackend::Memory);
    }

    #[test]
    fn invalid_port_is_a_config_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = service_in(dir.path()).load_settings_with(lookup_from(&[("PORT", "http")]));
        assert!(matches!(result, Err(ConfigError::InvalidType { .. })));
    }

    #[test]
    fn blank_environment_values_are_ignored() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = service_in(dir.path())
            .load_settings_with(lookup_from(&[("PINECONE_INDEX", "  ")]))
            .expect("settings");
        assert_eq!(settings.pinecone.index_name, "aariv-medical-chatbot");
    }

    #[test]
    fn redact_sensitive_values_replaces_secrets_only() {
        let input = json!({
            "openai": { "api_key": "sk-live", "max_tokens": 42 },
            "server": { "secret_key": "cookie", "port": 8081 },
            "pinecone": { "api_key": null }
        });

        let redacted = redact_sensitive_values(&input);

        assert_eq!(
            redacted,
            json!({
                "openai": { "api_key": "****", "max_tokens": 42 },
                "server": { "secret_key": "****", "port": 8081 },
                "pinecone": { "api_key": null }
            })
        );
    }
}
